use serde::Serialize;
use statrs::function::gamma::ln_gamma;
use tracing::{debug, warn};

use super::solver::{find_root, Bracket};
use crate::error::SadError;
use crate::models::{AbundanceProblem, PmfOutput, SadFit, SadModel, SearchInterval, SolverConfig};

/// Half-width of the integration window, in standard deviations of ln(abundance).
const WINDOW_SDS: f64 = 12.0;

/// Moments of the log-abundances.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct LogMoments {
    pub mean: f64,
    /// Population variance
    pub variance: f64,
}

impl LogMoments {
    pub fn from_abundances(abundances: &[u64]) -> Result<Self, SadError> {
        if abundances.is_empty() {
            return Err(SadError::InvalidParameters(
                "abundance vector is empty".to_string(),
            ));
        }
        let logs: Vec<f64> = abundances.iter().map(|&a| (a as f64).ln()).collect();
        let count = logs.len() as f64;
        let mean = logs.iter().sum::<f64>() / count;
        let variance = logs.iter().map(|l| (l - mean).powi(2)).sum::<f64>() / count;
        if !(variance > 0.0) {
            return Err(SadError::InvalidParameters(
                "log-abundances have zero variance; all abundances are equal".to_string(),
            ));
        }
        Ok(Self { mean, variance })
    }

    pub fn sd(&self) -> f64 {
        self.variance.sqrt()
    }
}

/// Log of the integrand `exp(t·i - eᵗ - ½((t - mean)/sd)²)`.
fn log_integrand(t: f64, i: f64, moments: &LogMoments) -> f64 {
    let z = (t - moments.mean) / moments.sd();
    t * i - t.exp() - 0.5 * z * z
}

/// Mode of the log-integrand, i.e. the root of its strictly decreasing derivative.
fn integrand_mode(i: f64, moments: &LogMoments, config: &SolverConfig) -> Result<f64, SadError> {
    let derivative = |t: f64| i - t.exp() - (t - moments.mean) / moments.variance;
    let ln_i = i.ln();
    let bracket = SearchInterval::new(
        ln_i.min(moments.mean) - 1.0,
        ln_i.max(moments.mean) + 1.0,
    );
    match find_root(derivative, bracket, config)? {
        Bracket::Root(t) => Ok(t),
        Bracket::NoRootBracketed { .. } => Err(SadError::IntegrationError(format!(
            "could not locate integrand mode for abundance class {i} on {bracket}"
        ))),
    }
}

fn simpson(a: f64, b: f64, fa: f64, fm: f64, fb: f64) -> f64 {
    (b - a) / 6.0 * (fa + 4.0 * fm + fb)
}

#[allow(clippy::too_many_arguments)]
fn adaptive_simpson<F>(
    f: &F,
    a: f64,
    b: f64,
    fa: f64,
    fm: f64,
    fb: f64,
    whole: f64,
    tolerance: f64,
    depth: u32,
) -> Option<f64>
where
    F: Fn(f64) -> f64,
{
    let m = 0.5 * (a + b);
    let (lm, rm) = (0.5 * (a + m), 0.5 * (m + b));
    let (flm, frm) = (f(lm), f(rm));
    let left = simpson(a, m, fa, flm, fm);
    let right = simpson(m, b, fm, frm, fb);
    let delta = left + right - whole;

    if delta.abs() <= 15.0 * tolerance {
        return Some(left + right + delta / 15.0);
    }
    if depth == 0 {
        return None;
    }
    let half = 0.5 * tolerance;
    Some(
        adaptive_simpson(f, a, m, fa, flm, fm, left, half, depth - 1)?
            + adaptive_simpson(f, m, b, fm, frm, fb, right, half, depth - 1)?,
    )
}

/// Integrate `f` over consecutive panels between `breakpoints`.
fn integrate_panels<F>(f: &F, breakpoints: &[f64], config: &SolverConfig) -> Option<f64>
where
    F: Fn(f64) -> f64,
{
    breakpoints.windows(2).try_fold(0.0, |total, panel| {
        let (a, b) = (panel[0], panel[1]);
        let (fa, fm, fb) = (f(a), f(0.5 * (a + b)), f(b));
        let whole = simpson(a, b, fa, fm, fb);
        let area = adaptive_simpson(
            f,
            a,
            b,
            fa,
            fm,
            fb,
            whole,
            config.integration_tolerance,
            config.max_integration_depth,
        )?;
        Some(total + area)
    })
}

/// Panel edges around `mode`: doubling multiples of the peak width out to
/// the window edge.
fn panel_breakpoints(mode: f64, width: f64, half_window: f64) -> Vec<f64> {
    let mut offsets = vec![0.0];
    let mut step = width;
    while step < half_window {
        offsets.push(step);
        step *= 2.0;
    }
    offsets.push(half_window);

    let mut points: Vec<f64> = offsets.iter().rev().map(|o| mode - o).collect();
    points.extend(offsets.iter().skip(1).map(|o| mode + o));
    points
}

/// `ln ∫ exp(t·i - eᵗ - ½((t - mean)/sd)²) dt` over the real line.
///
/// The peak value is factored out before integrating so that large `i`
/// does not overflow.
fn log_class_integral(i: f64, moments: &LogMoments, config: &SolverConfig) -> Result<f64, SadError> {
    let mode = integrand_mode(i, moments, config)?;
    let peak = log_integrand(mode, i, moments);
    let width = 1.0 / (mode.exp() + 1.0 / moments.variance).sqrt();
    let breakpoints = panel_breakpoints(mode, width, WINDOW_SDS * moments.sd());

    let scaled = |t: f64| (log_integrand(t, i, moments) - peak).exp();
    let area = integrate_panels(&scaled, &breakpoints, config).ok_or_else(|| {
        SadError::IntegrationError(format!(
            "adaptive Simpson did not converge for abundance class {i} within depth {}",
            config.max_integration_depth
        ))
    })?;

    if !(area.is_finite() && area > 0.0) {
        return Err(SadError::IntegrationError(format!(
            "degenerate integral {area} for abundance class {i}"
        )));
    }
    Ok(peak + area.ln())
}

/// Poisson-lognormal fitted to the moments of the log-abundances.
///
/// For `i = 1..=N`: `pmf[i] = norm(i) ∫ exp(t·i - eᵗ - ½((t - mean)/sd)²) dt`
/// with `norm(i) = exp(-½ ln(2π var) - lgamma(i + 1))`. Cost grows linearly
/// with N, one integral per class, and behaviour for very large N has not
/// been validated.
pub fn fit_lognormal(abundances: &[u64], config: &SolverConfig) -> Result<SadFit, SadError> {
    let problem = AbundanceProblem::from_abundances(abundances)?;
    let moments = LogMoments::from_abundances(abundances)?;
    debug!(mean = moments.mean, variance = moments.variance, %problem, "fitting Poisson-lognormal");

    let log_scale = -0.5 * (2.0 * std::f64::consts::PI * moments.variance).ln();
    let pmf = (1..=problem.individuals())
        .map(|class| {
            let i = class as f64;
            let log_integral = log_class_integral(i, &moments, config)?;
            Ok((log_scale - ln_gamma(i + 1.0) + log_integral).exp())
        })
        .collect::<Result<Vec<f64>, SadError>>()?;

    if pmf.iter().any(|p| *p == 0.0) {
        warn!(%problem, "lognormal PMF underflowed to zero for some abundance classes");
    }

    Ok(SadFit {
        model: SadModel::Lognormal,
        problem,
        parameter: None,
        root: None,
        pmf,
    })
}

/// Poisson-lognormal PMF for an abundance vector, or its summary `-Σ ln pmf`.
pub fn lognormal_pmf(abundances: &[u64], summary: bool) -> Result<PmfOutput, SadError> {
    Ok(fit_lognormal(abundances, &SolverConfig::default())?.into_output(summary))
}
