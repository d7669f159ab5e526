use tracing::debug;

use super::solver::{find_root, Bracket};
use crate::error::SadError;
use crate::models::{AbundanceProblem, PmfOutput, SadFit, SadModel, SearchInterval, SolverConfig};

/// Bracket for Fisher's x.
pub const LOG_SERIES_INTERVAL: SearchInterval = SearchInterval::new(-2.0, 1.0 - 1e-10);

/// Residual of `((N/x) - N) * (-ln(1 - x)) = S`.
///
/// The removable singularity at `x = 0` takes its limit `N - S`.
pub fn log_series_constraint(x: f64, s: f64, n: f64) -> f64 {
    if x == 0.0 {
        return n - s;
    }
    ((n / x) - n) * (-(-x).ln_1p()) - s
}

/// Fisher's log-series (Fisher et al. 1943, Hubbell 2001).
///
/// Solves the constraint for x and evaluates `-x^k / (k ln(1 - x))` for
/// `k = 1..=N`. Mass the untruncated density puts beyond N is not included,
/// so the PMF sums to slightly less than one when x is close to one.
pub fn fit_log_series(problem: &AbundanceProblem, config: &SolverConfig) -> Result<SadFit, SadError> {
    let (s, n) = (problem.s(), problem.n());

    let x = match find_root(|x| log_series_constraint(x, s, n), LOG_SERIES_INTERVAL, config)? {
        Bracket::Root(x) => x,
        Bracket::NoRootBracketed { .. } => {
            return Err(SadError::RootError(format!(
                "No solution to log-series constraint on {LOG_SERIES_INTERVAL} for {problem}"
            )))
        }
    };
    debug!(x, %problem, "solved log-series parameter");

    let log_term = -(-x).ln_1p();
    let pmf = (1..=problem.individuals())
        .map(|k| {
            let k = k as f64;
            x.powf(k) / (k * log_term)
        })
        .collect();

    Ok(SadFit {
        model: SadModel::LogSeries,
        problem: *problem,
        parameter: Some(x),
        root: None,
        pmf,
    })
}

/// Log-series PMF for (S, N), or its summary `-Σ ln pmf`.
///
/// # Examples
///
/// ```
/// use macroeco_sad::analysis::log_series_pmf;
///
/// let pmf = log_series_pmf(10, 1000, false).unwrap();
/// assert_eq!(pmf.pmf().unwrap().len(), 1000);
/// ```
pub fn log_series_pmf(species: u64, individuals: u64, summary: bool) -> Result<PmfOutput, SadError> {
    let problem = AbundanceProblem::new(species, individuals)?;
    Ok(fit_log_series(&problem, &SolverConfig::default())?.into_output(summary))
}
