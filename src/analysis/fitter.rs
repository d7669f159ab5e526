use serde::Serialize;
use tracing::{info, warn};

use super::{fit_log_series, fit_lognormal, fit_truncated_log_series, fit_truncated_log_series_approx};
use crate::error::SadError;
use crate::models::{AbundanceProblem, RootSelector, SadFit, SadModel, SolverConfig};

/// Unified fitting API that carries one solver configuration across models.
#[derive(Debug, Clone, Default)]
pub struct SadFitter {
    config: SolverConfig,
    root: RootSelector,
}

impl SadFitter {
    /// Create a fitter with the given solver configuration.
    pub fn new(config: SolverConfig) -> Self {
        Self {
            config,
            root: RootSelector::default(),
        }
    }

    /// Root kept by the approximate truncated log-series when two exist.
    pub fn with_root(mut self, root: RootSelector) -> Self {
        self.root = root;
        self
    }

    pub fn config(&self) -> &SolverConfig {
        &self.config
    }

    /// Fit a model that only needs (S, N).
    pub fn fit_totals(&self, model: SadModel, problem: &AbundanceProblem) -> Result<SadFit, SadError> {
        match model {
            SadModel::LogSeries => fit_log_series(problem, &self.config),
            SadModel::TruncatedLogSeries => fit_truncated_log_series(problem, &self.config),
            SadModel::TruncatedLogSeriesApprox => {
                fit_truncated_log_series_approx(problem, self.root, &self.config)
            }
            SadModel::Lognormal => Err(SadError::InvalidParameters(
                "the lognormal model needs an abundance vector, not only S and N".to_string(),
            )),
        }
    }

    /// Fit any model to an observed abundance vector; (S, N) are derived from it.
    pub fn fit_abundances(&self, model: SadModel, abundances: &[u64]) -> Result<SadFit, SadError> {
        match model {
            SadModel::Lognormal => fit_lognormal(abundances, &self.config),
            _ => self.fit_totals(model, &AbundanceProblem::from_abundances(abundances)?),
        }
    }

    /// Fit one model and score it against the observed abundances.
    ///
    /// Failure is recorded in the entry rather than returned, so the fit is
    /// only present when the entry has no error.
    pub fn score(&self, model: SadModel, abundances: &[u64]) -> (ComparisonEntry, Option<SadFit>) {
        let scored = self
            .fit_abundances(model, abundances)
            .and_then(|fit| Ok((fit.negative_log_likelihood(abundances)?, fit)));
        match scored {
            Ok((nll, fit)) => {
                info!(model = model.code(), nll, "model fitted");
                let entry = ComparisonEntry {
                    model,
                    parameter: fit.parameter,
                    negative_log_likelihood: Some(nll),
                    pmf_mass: Some(fit.total_mass()),
                    error: None,
                };
                (entry, Some(fit))
            }
            Err(e) => {
                warn!(model = model.code(), error = %e, "model could not be fitted");
                let entry = ComparisonEntry {
                    model,
                    parameter: None,
                    negative_log_likelihood: None,
                    pmf_mass: None,
                    error: Some(e.to_string()),
                };
                (entry, None)
            }
        }
    }

    /// Fit every model to `abundances` and score each against the data.
    ///
    /// A model that fails is kept in the comparison with its error message.
    pub fn compare(&self, abundances: &[u64]) -> Result<ModelComparison, SadError> {
        self.compare_models(abundances, &SadModel::ALL)
    }

    /// Like [`SadFitter::compare`], restricted to `models`.
    pub fn compare_models(
        &self,
        abundances: &[u64],
        models: &[SadModel],
    ) -> Result<ModelComparison, SadError> {
        let problem = AbundanceProblem::from_abundances(abundances)?;
        let entries = models
            .iter()
            .map(|&model| self.score(model, abundances).0)
            .collect();
        Ok(ModelComparison { problem, entries })
    }
}

/// One model's row in a [`ModelComparison`].
#[derive(Debug, Clone, Serialize)]
pub struct ComparisonEntry {
    pub model: SadModel,
    pub parameter: Option<f64>,
    /// `-Σ ln pmf[a]` over the observed abundances
    pub negative_log_likelihood: Option<f64>,
    pub pmf_mass: Option<f64>,
    pub error: Option<String>,
}

/// Every model fitted to the same abundance vector.
#[derive(Debug, Clone, Serialize)]
pub struct ModelComparison {
    pub problem: AbundanceProblem,
    pub entries: Vec<ComparisonEntry>,
}

impl ModelComparison {
    /// Fitted model with the lowest negative log-likelihood.
    pub fn best(&self) -> Option<&ComparisonEntry> {
        self.entries
            .iter()
            .filter(|e| e.negative_log_likelihood.is_some_and(f64::is_finite))
            .min_by(|a, b| {
                a.negative_log_likelihood
                    .partial_cmp(&b.negative_log_likelihood)
                    .unwrap_or(std::cmp::Ordering::Equal)
            })
    }
}
