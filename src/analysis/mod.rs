mod fitter;
mod log_series;
mod lognormal;
pub mod solver;
mod truncated;

pub use fitter::{ComparisonEntry, ModelComparison, SadFitter};
pub use log_series::{fit_log_series, log_series_constraint, log_series_pmf, LOG_SERIES_INTERVAL};
pub use lognormal::{fit_lognormal, lognormal_pmf, LogMoments};
pub use truncated::{
    fit_truncated_log_series, fit_truncated_log_series_approx, truncated_approx_constraint,
    truncated_constraint, truncated_log_series_approx_pmf, truncated_log_series_pmf,
    TRUNCATED_APPROX_INTERVAL, TRUNCATED_INTERVAL,
};
