//! Truncated log-series of the maximum entropy theory of ecology (Harte 2011).
//!
//! Both variants solve for `x = e^-β`, where β is the Lagrange multiplier of
//! the entropy maximization. Realistic values of x lie in `(1/e, 1)`, though
//! the exact constraint occasionally puts x slightly above one.

use tracing::debug;

use super::solver::{find_root, solve_with_disambiguation, Bracket};
use crate::error::SadError;
use crate::models::{
    AbundanceProblem, PmfOutput, RootSelector, SadFit, SadModel, SearchInterval, SolverConfig,
};

/// Bracket for the exact constraint (eq. 7.27).
pub const TRUNCATED_INTERVAL: SearchInterval = SearchInterval::new(0.3, 2.0);

/// Bracket for the approximate constraint (eq. 7.30).
pub const TRUNCATED_APPROX_INTERVAL: SearchInterval = SearchInterval::new(0.3, 1.0 - 1e-10);

/// `(Σ xⁿ, Σ xⁿ/n)` for `n = 1..=n_max`, both divided by `max(1, x^n_max)`.
///
/// The common factor keeps the sums finite for `x > 1` and large N; it
/// cancels in every ratio taken of them.
fn scaled_power_sums(x: f64, n_max: u64) -> (f64, f64) {
    let ln_x = x.ln();
    let shift = if ln_x > 0.0 { n_max as f64 * ln_x } else { 0.0 };
    (1..=n_max).fold((0.0, 0.0), |(powers, harmonic), n| {
        let n = n as f64;
        let term = (n * ln_x - shift).exp();
        (powers + term, harmonic + term / n)
    })
}

/// Residual of `Σ xⁿ / Σ (xⁿ/n) = N/S` over `n = 1..=N`.
pub fn truncated_constraint(x: f64, s: f64, n: u64) -> f64 {
    let (powers, harmonic) = scaled_power_sums(x, n);
    powers / harmonic - n as f64 / s
}

/// Residual of `(-ln x) ln(-1/ln x) = S/N`.
pub fn truncated_approx_constraint(x: f64, s: f64, n: f64) -> f64 {
    let beta = -x.ln();
    beta * (1.0 / beta).ln() - s / n
}

/// Truncated log-series with the exact constraint.
///
/// PMF over `k = 1..=N` is `(x^k/k) / Σ xⁿ/n`, which sums to one. A failed
/// bracket is reported as a [`SadError::RootError`] without retrying.
pub fn fit_truncated_log_series(
    problem: &AbundanceProblem,
    config: &SolverConfig,
) -> Result<SadFit, SadError> {
    let s = problem.s();
    let n_max = problem.individuals();

    let x = match find_root(|x| truncated_constraint(x, s, n_max), TRUNCATED_INTERVAL, config)? {
        Bracket::Root(x) => x,
        Bracket::NoRootBracketed {
            start_residual,
            stop_residual,
        } => {
            return Err(SadError::RootError(format!(
                "No solution to truncated log-series constraint on {TRUNCATED_INTERVAL} for \
                 {problem} (residuals {start_residual:.3e}, {stop_residual:.3e})"
            )))
        }
    };
    debug!(x, beta = -x.ln(), %problem, "solved truncated log-series parameter");

    let ln_x = x.ln();
    let shift = if ln_x > 0.0 { n_max as f64 * ln_x } else { 0.0 };
    let (_, norm) = scaled_power_sums(x, n_max);
    let pmf = (1..=n_max)
        .map(|k| {
            let k = k as f64;
            (k * ln_x - shift).exp() / k / norm
        })
        .collect();

    Ok(SadFit {
        model: SadModel::TruncatedLogSeries,
        problem: *problem,
        parameter: Some(x),
        root: None,
        pmf,
    })
}

/// Truncated log-series with the approximate constraint.
///
/// The approximate constraint has two roots in its interval whenever
/// `S/N < 1/e`, so the direct bracket fails and `root` picks one of them.
/// PMF over `k = 1..=N-S+1` is `(1/ln g) x^k/k` with `g = -1/ln x`; the
/// `1/ln g` factor normalizes it only approximately.
pub fn fit_truncated_log_series_approx(
    problem: &AbundanceProblem,
    root: RootSelector,
    config: &SolverConfig,
) -> Result<SadFit, SadError> {
    let (s, n) = (problem.s(), problem.n());

    let solution = solve_with_disambiguation(
        |x| truncated_approx_constraint(x, s, n),
        TRUNCATED_APPROX_INTERVAL,
        root,
        config,
    )?;
    let x = solution.x;
    debug!(x, beta = -x.ln(), %problem, "solved approximate truncated log-series parameter");

    let g = -1.0 / x.ln();
    let scale = 1.0 / g.ln();
    let support = problem.individuals() - problem.species() + 1;
    let pmf = (1..=support)
        .map(|k| {
            let k = k as f64;
            scale * x.powf(k) / k
        })
        .collect();

    Ok(SadFit {
        model: SadModel::TruncatedLogSeriesApprox,
        problem: *problem,
        parameter: Some(x),
        root: solution.selected,
        pmf,
    })
}

/// Exact truncated log-series PMF for (S, N), or its summary `-Σ ln pmf`.
pub fn truncated_log_series_pmf(
    species: u64,
    individuals: u64,
    summary: bool,
) -> Result<PmfOutput, SadError> {
    let problem = AbundanceProblem::new(species, individuals)?;
    Ok(fit_truncated_log_series(&problem, &SolverConfig::default())?.into_output(summary))
}

/// Approximate truncated log-series PMF for (S, N), or its summary `-Σ ln pmf`.
///
/// # Examples
///
/// ```
/// use macroeco_sad::analysis::truncated_log_series_approx_pmf;
/// use macroeco_sad::RootSelector;
///
/// let pmf = truncated_log_series_approx_pmf(5, 50, false, RootSelector::Second).unwrap();
/// assert_eq!(pmf.pmf().unwrap().len(), 46);
/// ```
pub fn truncated_log_series_approx_pmf(
    species: u64,
    individuals: u64,
    summary: bool,
    root: RootSelector,
) -> Result<PmfOutput, SadError> {
    let problem = AbundanceProblem::new(species, individuals)?;
    Ok(
        fit_truncated_log_series_approx(&problem, root, &SolverConfig::default())?
            .into_output(summary),
    )
}
