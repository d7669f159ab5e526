//! Parameter-driven batch runs.
//!
//! A script looks up its analysis in `parameters.toml` inside the output
//! directory, then walks every (run, data file) pair as a [`Dataset`].

mod params;
mod sad_fit;
pub mod sites;
mod value;

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::error::SadError;

pub use params::{Parameters, Run, RunParams};
pub use sad_fit::{run_sad_fit, DatasetReport, SAD_FIT_REQUIRED, SAD_FIT_SCRIPT};
pub use value::ParamValue;

/// Where a workflow reads its parameters and writes its results.
#[derive(Debug, Clone)]
pub struct WorkflowConfig {
    pub output_dir: PathBuf,
    pub script_name: String,
    pub param_file: String,
    pub log_file: String,
    /// Write a site map plan before each run's datasets
    pub site_maps: bool,
    pub whole_globe: bool,
}

impl WorkflowConfig {
    pub fn new(output_dir: impl Into<PathBuf>, script_name: impl Into<String>) -> Self {
        Self {
            output_dir: output_dir.into(),
            script_name: script_name.into(),
            param_file: "parameters.toml".to_string(),
            log_file: "logfile.txt".to_string(),
            site_maps: true,
            whole_globe: false,
        }
    }

    pub fn param_path(&self) -> PathBuf {
        self.output_dir.join(&self.param_file)
    }

    pub fn log_path(&self) -> PathBuf {
        self.output_dir.join(&self.log_file)
    }
}

/// One data file of one run.
#[derive(Debug, Clone)]
pub struct Dataset<'a> {
    pub data_path: PathBuf,
    /// `<script>_<data stem>_<run>`
    pub output_id: String,
    pub run_name: &'a str,
    pub params: &'a RunParams,
}

/// Per-invocation context for a script.
#[derive(Debug)]
pub struct Workflow {
    config: WorkflowConfig,
    parameters: Option<Parameters>,
}

impl Workflow {
    /// Load the script's parameters, checking every run has `required`.
    ///
    /// Without a parameter file the workflow carries no parameters, which is
    /// only allowed when nothing is required.
    pub fn new(config: WorkflowConfig, required: &[(&str, &str)]) -> Result<Self, SadError> {
        std::fs::create_dir_all(&config.output_dir)?;
        let param_path = config.param_path();

        let parameters = if param_path.is_file() {
            let parameters = Parameters::load(&param_path, &config.script_name, required)?;
            info!(
                script = %config.script_name,
                runs = parameters.runs.len(),
                "loaded parameters from {}",
                param_path.display()
            );
            Some(parameters)
        } else if required.is_empty() {
            info!(
                script = %config.script_name,
                "no parameter file at {}, running without parameters",
                param_path.display()
            );
            None
        } else {
            return Err(SadError::WorkflowError(format!(
                "parameter file {} not found; script '{}' requires parameters",
                param_path.display(),
                config.script_name
            )));
        };

        Ok(Self { config, parameters })
    }

    pub fn config(&self) -> &WorkflowConfig {
        &self.config
    }

    pub fn output_dir(&self) -> &Path {
        &self.config.output_dir
    }

    pub fn parameters(&self) -> Option<&Parameters> {
        self.parameters.as_ref()
    }

    pub fn interactive(&self) -> bool {
        self.parameters.as_ref().is_some_and(|p| p.interactive)
    }

    /// Every (run, data file) pair, in run order then `data_paths` order.
    ///
    /// Runs without `data_paths` contribute nothing. When site maps are on,
    /// a map plan for each run's files is written first.
    pub fn single_datasets(&self) -> Result<Vec<Dataset<'_>>, SadError> {
        let parameters = self.parameters.as_ref().ok_or_else(|| {
            SadError::WorkflowError(format!(
                "script '{}' has no parameters to iterate",
                self.config.script_name
            ))
        })?;

        let mut seen = HashSet::new();
        let mut datasets = Vec::new();
        for run in &parameters.runs {
            if !run.params.contains("data_paths") {
                debug!(run = %run.name, "run has no data_paths");
                continue;
            }
            let paths: Vec<PathBuf> = run
                .params
                .str_list("data_paths")?
                .into_iter()
                .map(PathBuf::from)
                .collect();

            if self.config.site_maps && !paths.is_empty() {
                sites::make_map(&paths, &self.config.output_dir, None, self.config.whole_globe)?;
            }

            for data_path in paths {
                let output_id = format!(
                    "{}_{}_{}",
                    self.config.script_name,
                    clean_name(&data_path),
                    run.name
                );
                if !seen.insert(output_id.clone()) {
                    return Err(SadError::WorkflowError(format!(
                        "duplicate output id '{output_id}'"
                    )));
                }
                datasets.push(Dataset {
                    data_path,
                    output_id,
                    run_name: &run.name,
                    params: &run.params,
                });
            }
        }
        Ok(datasets)
    }
}

/// File stem of a data path.
pub fn clean_name(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default()
}
