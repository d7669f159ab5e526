use serde::{Deserialize, Serialize};

use super::{AbundanceProblem, RootSelector};
use crate::error::SadError;

/// Species-abundance distribution models.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SadModel {
    /// Fisher's log-series (Fisher et al. 1943)
    LogSeries,
    /// Truncated log-series solved exactly (Harte 2011, eq. 7.27)
    TruncatedLogSeries,
    /// Truncated log-series via the approximate constraint (Harte 2011, eq. 7.30)
    TruncatedLogSeriesApprox,
    /// Poisson-lognormal fitted to log-abundance moments
    Lognormal,
}

impl SadModel {
    pub const ALL: [SadModel; 4] = [
        SadModel::LogSeries,
        SadModel::TruncatedLogSeries,
        SadModel::TruncatedLogSeriesApprox,
        SadModel::Lognormal,
    ];

    /// Short name used on the command line and in output file names.
    pub fn code(&self) -> &'static str {
        match self {
            SadModel::LogSeries => "logser",
            SadModel::TruncatedLogSeries => "trunc",
            SadModel::TruncatedLogSeriesApprox => "trunc-approx",
            SadModel::Lognormal => "lognorm",
        }
    }

    /// Whether fitting needs the full abundance vector rather than (S, N).
    pub fn needs_abundances(&self) -> bool {
        matches!(self, SadModel::Lognormal)
    }
}

impl std::fmt::Display for SadModel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SadModel::LogSeries => write!(f, "Log-series"),
            SadModel::TruncatedLogSeries => write!(f, "Truncated log-series"),
            SadModel::TruncatedLogSeriesApprox => write!(f, "Truncated log-series (approx.)"),
            SadModel::Lognormal => write!(f, "Poisson-lognormal"),
        }
    }
}

impl std::str::FromStr for SadModel {
    type Err = SadError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "logser" | "log-series" | "logseries" | "lgser" => Ok(SadModel::LogSeries),
            "trunc" | "truncated" | "mete" | "trunc-logser" => Ok(SadModel::TruncatedLogSeries),
            "trunc-approx" | "approx" | "mete-approx" => Ok(SadModel::TruncatedLogSeriesApprox),
            "lognorm" | "lognormal" | "plognorm" => Ok(SadModel::Lognormal),
            _ => Err(SadError::ParseError(format!(
                "Unknown SAD model: '{s}'. Use: logser, trunc, trunc-approx, or lognorm"
            ))),
        }
    }
}

/// Either the PMF itself or its summary `-Σ ln pmf`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum PmfOutput {
    Pmf(Vec<f64>),
    Summary(f64),
}

impl PmfOutput {
    /// The PMF, if this output is not a summary.
    pub fn pmf(&self) -> Option<&[f64]> {
        match self {
            PmfOutput::Pmf(values) => Some(values),
            PmfOutput::Summary(_) => None,
        }
    }

    /// The summary value, if this output is one.
    pub fn summary(&self) -> Option<f64> {
        match self {
            PmfOutput::Pmf(_) => None,
            PmfOutput::Summary(value) => Some(*value),
        }
    }
}

/// Result of fitting one model.
///
/// `pmf[k - 1]` is the predicted probability of abundance class `k`.
#[derive(Debug, Clone, Serialize)]
pub struct SadFit {
    pub model: SadModel,
    pub problem: AbundanceProblem,
    /// Solved latent parameter x; `None` for the lognormal model
    pub parameter: Option<f64>,
    /// Root kept when the constraint had two solutions
    pub root: Option<RootSelector>,
    pub pmf: Vec<f64>,
}

impl SadFit {
    /// Lagrange multiplier β = -ln x, when x is positive.
    pub fn beta(&self) -> Option<f64> {
        self.parameter.filter(|x| *x > 0.0).map(|x| -x.ln())
    }

    /// Sum of the PMF over its reported support.
    pub fn total_mass(&self) -> f64 {
        self.pmf.iter().sum()
    }

    /// `-Σ ln pmf` over the whole support.
    pub fn summary(&self) -> f64 {
        -self.pmf.iter().map(|p| p.ln()).sum::<f64>()
    }

    /// Predicted number of species in each abundance class (`S · pmf`).
    pub fn predicted_species(&self) -> Vec<f64> {
        let s = self.problem.s();
        self.pmf.iter().map(|p| p * s).collect()
    }

    /// Negative log-likelihood of observed abundances under this fit.
    pub fn negative_log_likelihood(&self, abundances: &[u64]) -> Result<f64, SadError> {
        let mut total = 0.0;
        for &a in abundances {
            let p = a
                .checked_sub(1)
                .and_then(|idx| self.pmf.get(idx as usize))
                .copied()
                .ok_or_else(|| {
                    SadError::InvalidParameters(format!(
                        "abundance {a} is outside the support 1..={} of the {} model",
                        self.pmf.len(),
                        self.model
                    ))
                })?;
            total -= p.ln();
        }
        Ok(total)
    }

    /// Collapse into the PMF or its summary.
    pub fn into_output(self, summary: bool) -> PmfOutput {
        if summary {
            PmfOutput::Summary(self.summary())
        } else {
            PmfOutput::Pmf(self.pmf)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_fit() -> SadFit {
        SadFit {
            model: SadModel::TruncatedLogSeries,
            problem: AbundanceProblem::new(2, 3).unwrap(),
            parameter: Some(0.5),
            root: None,
            pmf: vec![0.5, 0.25, 0.25],
        }
    }

    #[test]
    fn test_model_parse() {
        assert_eq!("logser".parse::<SadModel>().unwrap(), SadModel::LogSeries);
        assert_eq!("TRUNC".parse::<SadModel>().unwrap(), SadModel::TruncatedLogSeries);
        assert_eq!(
            "trunc-approx".parse::<SadModel>().unwrap(),
            SadModel::TruncatedLogSeriesApprox
        );
        assert_eq!("lognormal".parse::<SadModel>().unwrap(), SadModel::Lognormal);
        assert!("gamma".parse::<SadModel>().is_err());
    }

    #[test]
    fn test_model_code_roundtrip() {
        for model in SadModel::ALL {
            assert_eq!(model.code().parse::<SadModel>().unwrap(), model);
        }
    }

    #[test]
    fn test_only_lognormal_needs_abundances() {
        assert!(SadModel::Lognormal.needs_abundances());
        assert!(!SadModel::LogSeries.needs_abundances());
    }

    #[test]
    fn test_total_mass_and_summary() {
        let fit = sample_fit();
        assert!((fit.total_mass() - 1.0).abs() < 1e-12);
        let expected = -(0.5f64.ln() + 2.0 * 0.25f64.ln());
        assert!((fit.summary() - expected).abs() < 1e-12);
    }

    #[test]
    fn test_beta() {
        let fit = sample_fit();
        assert!((fit.beta().unwrap() - 2.0f64.ln()).abs() < 1e-12);
    }

    #[test]
    fn test_predicted_species() {
        let fit = sample_fit();
        assert_eq!(fit.predicted_species(), vec![1.0, 0.5, 0.5]);
    }

    #[test]
    fn test_negative_log_likelihood() {
        let fit = sample_fit();
        let nll = fit.negative_log_likelihood(&[1, 2]).unwrap();
        assert!((nll - (-(0.5f64.ln()) - 0.25f64.ln())).abs() < 1e-12);
        assert!(fit.negative_log_likelihood(&[4]).is_err());
        assert!(fit.negative_log_likelihood(&[0]).is_err());
    }

    #[test]
    fn test_into_output() {
        let summary = sample_fit().into_output(true);
        assert!(summary.summary().unwrap() > 0.0);
        assert!(summary.pmf().is_none());

        let pmf = sample_fit().into_output(false);
        assert_eq!(pmf.pmf().unwrap().len(), 3);
        assert!(pmf.summary().is_none());
    }
}
