//! Bracketed root finding for single-parameter constraint equations.
//!
//! [`find_root`] runs Brent's method on a sign-changing bracket. When the
//! endpoints share a sign, [`disambiguate_root`] scans the interval for its
//! highest point and re-brackets on one side of it, which is how the
//! two-root case of the approximate truncated log-series is resolved.

use roots::{find_root_brent, SearchError, SimpleConvergency};
use tracing::{debug, warn};

use crate::error::SadError;
use crate::models::{RootSelector, SearchInterval, SolverConfig};

/// Outcome of a direct bracketed solve.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Bracket {
    /// Root located inside the interval
    Root(f64),
    /// Both endpoints have the same sign; the interval may hold zero or two roots
    NoRootBracketed { start_residual: f64, stop_residual: f64 },
}

/// Root of a constraint equation and the selector used to pick it, if any.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RootSolution {
    pub x: f64,
    pub selected: Option<RootSelector>,
}

/// Run Brent's method on `f` over `interval`.
///
/// A root sitting exactly on an endpoint is returned as found.
pub fn find_root<F>(f: F, interval: SearchInterval, config: &SolverConfig) -> Result<Bracket, SadError>
where
    F: Fn(f64) -> f64,
{
    let start_residual = f(interval.start);
    let stop_residual = f(interval.stop);

    for (x, residual) in [(interval.start, start_residual), (interval.stop, stop_residual)] {
        if !residual.is_finite() {
            return Err(SadError::RootError(format!(
                "constraint equation is not finite at x = {x} (residual {residual})"
            )));
        }
        if residual == 0.0 {
            return Ok(Bracket::Root(x));
        }
    }

    if start_residual.signum() == stop_residual.signum() {
        return Ok(Bracket::NoRootBracketed {
            start_residual,
            stop_residual,
        });
    }

    let mut convergency = SimpleConvergency {
        eps: config.tolerance,
        max_iter: config.max_iterations,
    };

    match find_root_brent(interval.start, interval.stop, |x| f(x), &mut convergency) {
        Ok(x) => Ok(Bracket::Root(x)),
        Err(SearchError::NoBracketing) => Ok(Bracket::NoRootBracketed {
            start_residual,
            stop_residual,
        }),
        Err(e) => Err(SadError::RootError(format!(
            "Brent's method failed on {interval}: {e}"
        ))),
    }
}

/// Locate a root when the direct bracket over `interval` failed.
///
/// Samples `config.grid_samples` evenly spaced points, finds the highest
/// sample and solves on `[start, x_max]` for [`RootSelector::First`] or
/// `[x_max, stop]` for [`RootSelector::Second`]. Fails with
/// [`SadError::RootError`] when every sample is negative. A narrow peak that
/// falls between samples is missed, so the grid size trades accuracy for cost.
pub fn disambiguate_root<F>(
    f: F,
    interval: SearchInterval,
    selector: RootSelector,
    config: &SolverConfig,
) -> Result<f64, SadError>
where
    F: Fn(f64) -> f64,
{
    let (x_max, y_max) = interval
        .grid(config.grid_samples)
        .into_iter()
        .map(|x| (x, f(x)))
        .filter(|(_, y)| !y.is_nan())
        .fold(None, |best: Option<(f64, f64)>, (x, y)| match best {
            Some((_, best_y)) if best_y >= y => best,
            _ => Some((x, y)),
        })
        .ok_or_else(|| {
            SadError::RootError(format!(
                "constraint equation could not be evaluated anywhere on {interval}"
            ))
        })?;

    if y_max < 0.0 {
        return Err(SadError::RootError(
            "No solution to constraint equation with given values of S and N".to_string(),
        ));
    }

    warn!(x_max, y_max, root = %selector, "more than one solution to constraint equation");

    let sub_interval = match selector {
        RootSelector::First => SearchInterval::new(interval.start, x_max),
        RootSelector::Second => SearchInterval::new(x_max, interval.stop),
    };

    match find_root(&f, sub_interval, config)? {
        Bracket::Root(x) => Ok(x),
        Bracket::NoRootBracketed {
            start_residual,
            stop_residual,
        } => Err(SadError::RootError(format!(
            "no sign change on {sub_interval} (residuals {start_residual:.3e}, {stop_residual:.3e})"
        ))),
    }
}

/// Solve directly, falling back to [`disambiguate_root`] on a failed bracket.
pub fn solve_with_disambiguation<F>(
    f: F,
    interval: SearchInterval,
    selector: RootSelector,
    config: &SolverConfig,
) -> Result<RootSolution, SadError>
where
    F: Fn(f64) -> f64,
{
    match find_root(&f, interval, config)? {
        Bracket::Root(x) => Ok(RootSolution { x, selected: None }),
        Bracket::NoRootBracketed { .. } => {
            debug!(%interval, "direct bracket failed, scanning for roots");
            let x = disambiguate_root(&f, interval, selector, config)?;
            Ok(RootSolution {
                x,
                selected: Some(selector),
            })
        }
    }
}
