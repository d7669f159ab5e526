mod config;
mod fit;
mod problem;
mod root;

pub use config::SolverConfig;
pub use fit::{PmfOutput, SadFit, SadModel};
pub use problem::AbundanceProblem;
pub use root::{RootSelector, SearchInterval};
