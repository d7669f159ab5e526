use std::collections::BTreeMap;
use std::path::Path;

use serde::Deserialize;
use tracing::debug;

use super::value::ParamValue;
use crate::error::SadError;

#[derive(Debug, Deserialize)]
struct ParameterFile {
    #[serde(default)]
    analysis: Vec<AnalysisEntry>,
}

#[derive(Debug, Deserialize)]
struct AnalysisEntry {
    script_name: String,
    #[serde(default)]
    interactive: Option<toml::Value>,
    #[serde(default)]
    run: Vec<RunEntry>,
}

#[derive(Debug, Deserialize)]
struct RunEntry {
    name: String,
    #[serde(default)]
    params: toml::Table,
}

/// Named parameters of one run.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RunParams {
    values: BTreeMap<String, ParamValue>,
}

impl RunParams {
    pub fn get(&self, name: &str) -> Option<&ParamValue> {
        self.values.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &ParamValue)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// A parameter that must be a string or list of strings.
    pub fn str_list(&self, name: &str) -> Result<Vec<&str>, SadError> {
        let value = self
            .get(name)
            .ok_or_else(|| SadError::MissingParameters(name.to_string()))?;
        value.as_str_list().ok_or_else(|| {
            SadError::InvalidParameters(format!(
                "parameter '{name}' must be a list of strings, got {}",
                value.type_name()
            ))
        })
    }
}

impl FromIterator<(String, ParamValue)> for RunParams {
    fn from_iter<I: IntoIterator<Item = (String, ParamValue)>>(iter: I) -> Self {
        RunParams {
            values: iter.into_iter().collect(),
        }
    }
}

/// One named run of an analysis.
#[derive(Debug, Clone, PartialEq)]
pub struct Run {
    pub name: String,
    pub params: RunParams,
}

/// The analysis selected from a parameter file for one script.
#[derive(Debug, Clone)]
pub struct Parameters {
    pub script_name: String,
    pub interactive: bool,
    /// Runs in file order
    pub runs: Vec<Run>,
}

impl Parameters {
    /// Load the analysis for `script_name` from a TOML parameter file.
    pub fn load(
        path: impl AsRef<Path>,
        script_name: &str,
        required: &[(&str, &str)],
    ) -> Result<Self, SadError> {
        let content = std::fs::read_to_string(path.as_ref())?;
        Self::from_toml_str(&content, script_name, required)
    }

    pub fn from_toml_str(
        content: &str,
        script_name: &str,
        required: &[(&str, &str)],
    ) -> Result<Self, SadError> {
        let file: ParameterFile = toml::from_str(content)?;
        if file.analysis.is_empty() {
            return Err(SadError::WorkflowError(
                "parameter file contains no analyses".to_string(),
            ));
        }

        let entry = file
            .analysis
            .into_iter()
            .find(|a| a.script_name == script_name)
            .ok_or_else(|| {
                SadError::WorkflowError(format!(
                    "parameter file has no analysis for script '{script_name}'"
                ))
            })?;
        if entry.run.is_empty() {
            return Err(SadError::WorkflowError(format!(
                "analysis '{script_name}' has no runs"
            )));
        }

        let interactive = match entry.interactive {
            Some(value) => ParamValue::try_from(value)?.as_bool().unwrap_or(false),
            None => false,
        };

        let mut runs: Vec<Run> = Vec::with_capacity(entry.run.len());
        for run in entry.run {
            if runs.iter().any(|r| r.name == run.name) {
                return Err(SadError::WorkflowError(format!(
                    "duplicate run name '{}' in analysis '{script_name}'",
                    run.name
                )));
            }
            let params = run
                .params
                .into_iter()
                .map(|(key, raw)| {
                    let value = ParamValue::try_from(raw)?;
                    debug!(run = %run.name, param = %key, kind = value.type_name(), "parameter");
                    Ok::<_, SadError>((key, value))
                })
                .collect::<Result<RunParams, SadError>>()?;
            runs.push(Run {
                name: run.name,
                params,
            });
        }

        let parameters = Parameters {
            script_name: script_name.to_string(),
            interactive,
            runs,
        };
        parameters.check_required(required)?;
        Ok(parameters)
    }

    /// Every run must carry every required parameter.
    fn check_required(&self, required: &[(&str, &str)]) -> Result<(), SadError> {
        let missing: Vec<String> = self
            .runs
            .iter()
            .flat_map(|run| {
                required
                    .iter()
                    .filter(move |(name, _)| !run.params.contains(name))
                    .map(move |(name, description)| {
                        format!("run '{}' lacks '{name}' ({description})", run.name)
                    })
            })
            .collect();

        if missing.is_empty() {
            Ok(())
        } else {
            Err(SadError::MissingParameters(missing.join("; ")))
        }
    }
}
