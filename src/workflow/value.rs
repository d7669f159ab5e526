//! Typed parameter values.
//!
//! Parameter files store values as text. They are interpreted with a small
//! fixed grammar:
//!
//! ```text
//! value  := list | string | atom
//! list   := '[' items ']' | '(' items ')'
//! items  := (value (',' value)* ','?)?
//! string := '\'' chars '\'' | '"' chars '"'      (backslash escapes the next char)
//! atom   := bool | int | float | bare
//! bool   := True | False | true | false | T | F | t | f
//! ```
//!
//! A bare word that is neither a bool nor a number is kept as a string. At the
//! top level a bare atom runs to the end of the input, so `hello world` is one
//! string; inside a list it ends at whitespace, `,` or the closing bracket.

use serde::Serialize;

use crate::error::SadError;

/// A parameter value after parsing.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ParamValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    List(Vec<ParamValue>),
}

impl ParamValue {
    /// Parse text with the parameter grammar.
    ///
    /// # Examples
    ///
    /// ```
    /// use macroeco_sad::workflow::ParamValue;
    ///
    /// let value = ParamValue::parse("['a.csv', 2, 0.5, True]").unwrap();
    /// assert_eq!(
    ///     value,
    ///     ParamValue::List(vec![
    ///         ParamValue::Str("a.csv".into()),
    ///         ParamValue::Int(2),
    ///         ParamValue::Float(0.5),
    ///         ParamValue::Bool(true),
    ///     ])
    /// );
    /// ```
    pub fn parse(input: &str) -> Result<Self, SadError> {
        let mut parser = Parser {
            chars: input.chars().collect(),
            pos: 0,
        };
        let value = parser.value(true)?;
        parser.skip_whitespace();
        if parser.pos < parser.chars.len() {
            return Err(SadError::ParseError(format!(
                "unexpected '{}' at position {} in parameter value '{input}'",
                parser.chars[parser.pos], parser.pos
            )));
        }
        Ok(value)
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            ParamValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            ParamValue::Int(i) => Some(*i),
            _ => None,
        }
    }

    /// Numeric value; integers widen to floats.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            ParamValue::Int(i) => Some(*i as f64),
            ParamValue::Float(f) => Some(*f),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            ParamValue::Str(s) => Some(s.as_str()),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[ParamValue]> {
        match self {
            ParamValue::List(items) => Some(items),
            _ => None,
        }
    }

    /// A list of strings; a lone string counts as a one-item list.
    pub fn as_str_list(&self) -> Option<Vec<&str>> {
        match self {
            ParamValue::Str(s) => Some(vec![s.as_str()]),
            ParamValue::List(items) => items.iter().map(ParamValue::as_str).collect(),
            _ => None,
        }
    }

    /// Name of the variant, for log messages.
    pub fn type_name(&self) -> &'static str {
        match self {
            ParamValue::Bool(_) => "bool",
            ParamValue::Int(_) => "int",
            ParamValue::Float(_) => "float",
            ParamValue::Str(_) => "str",
            ParamValue::List(_) => "list",
        }
    }
}

impl std::fmt::Display for ParamValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ParamValue::Bool(b) => write!(f, "{}", if *b { "True" } else { "False" }),
            ParamValue::Int(i) => write!(f, "{i}"),
            ParamValue::Float(x) => write!(f, "{x:?}"),
            ParamValue::Str(s) => write!(f, "'{}'", s.replace('\\', "\\\\").replace('\'', "\\'")),
            ParamValue::List(items) => {
                write!(f, "[")?;
                for (idx, item) in items.iter().enumerate() {
                    if idx > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{item}")?;
                }
                write!(f, "]")
            }
        }
    }
}

impl TryFrom<toml::Value> for ParamValue {
    type Error = SadError;

    /// TOML strings go through the grammar; native TOML values map directly.
    fn try_from(value: toml::Value) -> Result<Self, Self::Error> {
        match value {
            toml::Value::String(s) => ParamValue::parse(&s),
            toml::Value::Integer(i) => Ok(ParamValue::Int(i)),
            toml::Value::Float(x) => Ok(ParamValue::Float(x)),
            toml::Value::Boolean(b) => Ok(ParamValue::Bool(b)),
            toml::Value::Datetime(d) => Ok(ParamValue::Str(d.to_string())),
            toml::Value::Array(items) => Ok(ParamValue::List(
                items
                    .into_iter()
                    .map(ParamValue::try_from)
                    .collect::<Result<_, _>>()?,
            )),
            toml::Value::Table(_) => Err(SadError::ParseError(
                "parameter values cannot be tables".to_string(),
            )),
        }
    }
}

struct Parser {
    chars: Vec<char>,
    pos: usize,
}

impl Parser {
    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn skip_whitespace(&mut self) {
        while self.peek().is_some_and(char::is_whitespace) {
            self.pos += 1;
        }
    }

    fn value(&mut self, top_level: bool) -> Result<ParamValue, SadError> {
        self.skip_whitespace();
        match self.peek() {
            Some('[') => self.list(']'),
            Some('(') => self.list(')'),
            Some(quote @ ('\'' | '"')) => self.string(quote),
            _ => Ok(self.atom(top_level)),
        }
    }

    fn list(&mut self, close: char) -> Result<ParamValue, SadError> {
        let open_pos = self.pos;
        self.pos += 1;
        let mut items = Vec::new();
        let mut saw_comma = false;

        loop {
            self.skip_whitespace();
            match self.peek() {
                None => {
                    return Err(SadError::ParseError(format!(
                        "unclosed '{}' opened at position {open_pos}",
                        self.chars[open_pos]
                    )))
                }
                Some(c) if c == close => {
                    self.pos += 1;
                    break;
                }
                _ => {}
            }

            items.push(self.value(false)?);
            self.skip_whitespace();
            match self.peek() {
                Some(',') => {
                    saw_comma = true;
                    self.pos += 1;
                }
                Some(c) if c == close => {}
                Some(c) => {
                    return Err(SadError::ParseError(format!(
                        "expected ',' or '{close}' at position {}, found '{c}'",
                        self.pos
                    )))
                }
                None => {
                    return Err(SadError::ParseError(format!(
                        "unclosed '{}' opened at position {open_pos}",
                        self.chars[open_pos]
                    )))
                }
            }
        }

        // `(x)` is grouping, not a one-item tuple
        if close == ')' && items.len() == 1 && !saw_comma {
            return Ok(items.remove(0));
        }
        Ok(ParamValue::List(items))
    }

    fn string(&mut self, quote: char) -> Result<ParamValue, SadError> {
        let open_pos = self.pos;
        self.pos += 1;
        let mut text = String::new();
        while let Some(c) = self.peek() {
            self.pos += 1;
            match c {
                '\\' => {
                    if let Some(escaped) = self.peek() {
                        text.push(escaped);
                        self.pos += 1;
                    }
                }
                c if c == quote => return Ok(ParamValue::Str(text)),
                c => text.push(c),
            }
        }
        Err(SadError::ParseError(format!(
            "unterminated string opened at position {open_pos}"
        )))
    }

    fn atom(&mut self, top_level: bool) -> ParamValue {
        let start = self.pos;
        while let Some(c) = self.peek() {
            if !top_level && (matches!(c, ',' | ']' | ')') || c.is_whitespace()) {
                break;
            }
            self.pos += 1;
        }
        let text: String = self.chars[start..self.pos].iter().collect();
        classify_atom(text.trim())
    }
}

fn classify_atom(text: &str) -> ParamValue {
    match text {
        "True" | "true" | "T" | "t" => return ParamValue::Bool(true),
        "False" | "false" | "F" | "f" => return ParamValue::Bool(false),
        _ => {}
    }

    let numeric = !text.is_empty()
        && text.chars().any(|c| c.is_ascii_digit())
        && text
            .chars()
            .all(|c| c.is_ascii_digit() || matches!(c, '+' | '-' | '.' | 'e' | 'E'));
    if numeric {
        if let Ok(i) = text.parse::<i64>() {
            return ParamValue::Int(i);
        }
        if let Ok(x) = text.parse::<f64>() {
            return ParamValue::Float(x);
        }
    }
    ParamValue::Str(text.to_string())
}
