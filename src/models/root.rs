use serde::{Deserialize, Serialize};

use crate::error::SadError;

/// Which root to keep when a constraint equation has two roots in its interval.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum RootSelector {
    /// Root left of the sampled maximum
    First,
    /// Root right of the sampled maximum
    #[default]
    Second,
}

impl std::fmt::Display for RootSelector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RootSelector::First => write!(f, "first"),
            RootSelector::Second => write!(f, "second"),
        }
    }
}

impl std::str::FromStr for RootSelector {
    type Err = SadError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "first" | "1" => Ok(RootSelector::First),
            "second" | "2" => Ok(RootSelector::Second),
            _ => Err(SadError::ParseError(format!(
                "Unknown root selector: '{s}' (use first/1 or second/2)"
            ))),
        }
    }
}

/// Admissible range of a model's latent parameter.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SearchInterval {
    pub start: f64,
    pub stop: f64,
}

impl SearchInterval {
    pub const fn new(start: f64, stop: f64) -> Self {
        Self { start, stop }
    }

    /// `count` evenly spaced points from `start` to `stop`, both included.
    pub fn grid(&self, count: usize) -> Vec<f64> {
        match count {
            0 => Vec::new(),
            1 => vec![self.start],
            _ => {
                let step = (self.stop - self.start) / (count - 1) as f64;
                (0..count)
                    .map(|i| {
                        if i == count - 1 {
                            self.stop
                        } else {
                            self.start + step * i as f64
                        }
                    })
                    .collect()
            }
        }
    }
}

impl std::fmt::Display for SearchInterval {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}, {}]", self.start, self.stop)
    }
}
