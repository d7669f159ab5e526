use std::path::PathBuf;

use serde::Serialize;
use tracing::info;

use super::{Dataset, ParamValue, RunParams, Workflow};
use crate::analysis::{ModelComparison, SadFitter};
use crate::error::SadError;
use crate::io::{read_abundances, write_pmf_csv};
use crate::models::{AbundanceProblem, RootSelector, SadModel};

/// Script name looked up in the parameter file.
pub const SAD_FIT_SCRIPT: &str = "sad_fit";

/// Parameters every `sad_fit` run must define.
pub const SAD_FIT_REQUIRED: &[(&str, &str)] = &[
    ("data_paths", "observation tables or count lists to fit"),
    ("models", "model codes: logser, trunc, trunc-approx, lognorm"),
];

/// What `sad_fit` produced for one dataset.
#[derive(Debug, Clone)]
pub struct DatasetReport {
    pub output_id: String,
    pub comparison: ModelComparison,
    pub files: Vec<PathBuf>,
}

#[derive(Debug, Serialize)]
struct SummaryRow<'a> {
    model: &'static str,
    parameter: Option<f64>,
    negative_log_likelihood: Option<f64>,
    pmf_mass: Option<f64>,
    error: Option<&'a str>,
}

/// Fit each run's models to each of its datasets.
///
/// Writes `<output_id>_<model>.csv` for every model that fits and
/// `<output_id>_summary.csv` with one row per requested model.
pub fn run_sad_fit(workflow: &Workflow, fitter: &SadFitter) -> Result<Vec<DatasetReport>, SadError> {
    workflow
        .single_datasets()?
        .iter()
        .map(|dataset| fit_dataset(workflow, fitter, dataset))
        .collect()
}

fn fit_dataset(
    workflow: &Workflow,
    fitter: &SadFitter,
    dataset: &Dataset<'_>,
) -> Result<DatasetReport, SadError> {
    let models = requested_models(dataset.params)?;
    let fitter = match root_selector(dataset.params)? {
        Some(root) => fitter.clone().with_root(root),
        None => fitter.clone(),
    };

    let abundances = read_abundances(&dataset.data_path)?;
    info!(
        output_id = %dataset.output_id,
        species = abundances.len(),
        "fitting {} model(s) to {}",
        models.len(),
        dataset.data_path.display()
    );

    let mut comparison = ModelComparison {
        problem: AbundanceProblem::from_abundances(&abundances)?,
        entries: Vec::with_capacity(models.len()),
    };
    let mut files = Vec::new();
    for model in models {
        let (entry, fit) = fitter.score(model, &abundances);
        if let Some(fit) = fit {
            let path = workflow
                .output_dir()
                .join(format!("{}_{}.csv", dataset.output_id, model.code()));
            write_pmf_csv(&fit, &path)?;
            files.push(path);
        }
        comparison.entries.push(entry);
    }

    let summary_path = workflow
        .output_dir()
        .join(format!("{}_summary.csv", dataset.output_id));
    let mut wtr = csv::Writer::from_path(&summary_path)?;
    for entry in &comparison.entries {
        wtr.serialize(SummaryRow {
            model: entry.model.code(),
            parameter: entry.parameter,
            negative_log_likelihood: entry.negative_log_likelihood,
            pmf_mass: entry.pmf_mass,
            error: entry.error.as_deref(),
        })?;
    }
    wtr.flush()?;
    files.push(summary_path);

    Ok(DatasetReport {
        output_id: dataset.output_id.clone(),
        comparison,
        files,
    })
}

fn requested_models(params: &RunParams) -> Result<Vec<SadModel>, SadError> {
    params
        .str_list("models")?
        .into_iter()
        .map(str::parse::<SadModel>)
        .collect()
}

/// Optional `root`: `1`, `2`, `first` or `second`.
fn root_selector(params: &RunParams) -> Result<Option<RootSelector>, SadError> {
    match params.get("root") {
        None => Ok(None),
        Some(ParamValue::Int(i)) => i.to_string().parse().map(Some),
        Some(ParamValue::Str(s)) => s.parse().map(Some),
        Some(other) => Err(SadError::InvalidParameters(format!(
            "parameter 'root' must be 1, 2, first or second, got {}",
            other.type_name()
        ))),
    }
}
