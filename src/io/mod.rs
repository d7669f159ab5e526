mod fit_io;
mod grid;

use std::path::Path;

use crate::error::SadError;
use crate::models::SadFit;

pub use fit_io::{read_abundances_json, read_pmf_csv, write_fit_json, write_pmf_csv};
pub use grid::{
    abundances_from_observations, read_grid_json, read_xy_abundances, write_xy_csv,
    xy_output_path, CountGrid, GridShape, Observation,
};

/// Trait for writing a fitted model to a file.
pub trait FitWriter {
    fn write(&self, fit: &SadFit, path: &Path) -> Result<(), SadError>;
}

/// CSV format writer (the PMF table only).
pub struct CsvFormat;

impl FitWriter for CsvFormat {
    fn write(&self, fit: &SadFit, path: &Path) -> Result<(), SadError> {
        write_pmf_csv(fit, path)
    }
}

/// JSON format writer (the whole fit).
#[derive(Default)]
pub struct JsonFormat {
    pub pretty: bool,
}

impl FitWriter for JsonFormat {
    fn write(&self, fit: &SadFit, path: &Path) -> Result<(), SadError> {
        write_fit_json(fit, path, self.pretty)
    }
}

/// Pick a writer from the output file extension.
pub fn writer_for(path: &Path, pretty: bool) -> Result<Box<dyn FitWriter>, SadError> {
    match extension(path).as_str() {
        "csv" => Ok(Box::new(CsvFormat)),
        "json" => Ok(Box::new(JsonFormat { pretty })),
        ext => Err(SadError::ParseError(format!(
            "Unsupported output format: .{ext}. Use .csv or .json"
        ))),
    }
}

/// Read an abundance vector from an observation table (`.csv`) or a JSON
/// array of per-species counts (`.json`).
pub fn read_abundances(path: impl AsRef<Path>) -> Result<Vec<u64>, SadError> {
    let path = path.as_ref();
    match extension(path).as_str() {
        "csv" => read_xy_abundances(path),
        "json" => read_abundances_json(path),
        ext => Err(SadError::ParseError(format!(
            "Unsupported data format: .{ext}. Use an observation .csv or a .json count list"
        ))),
    }
}

fn extension(path: &Path) -> String {
    path.extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_lowercase()
}
