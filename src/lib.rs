pub mod analysis;
pub mod error;
pub mod io;
pub mod models;
pub mod visualization;
pub mod workflow;

pub use analysis::{
    log_series_pmf, lognormal_pmf, truncated_log_series_approx_pmf, truncated_log_series_pmf,
    SadFitter,
};
pub use error::SadError;
pub use models::{AbundanceProblem, PmfOutput, RootSelector, SadFit, SadModel, SolverConfig};
