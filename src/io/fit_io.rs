use std::path::Path;

use crate::error::SadError;
use crate::models::SadFit;

/// CSV row of a fitted PMF.
#[derive(Debug, serde::Serialize, serde::Deserialize)]
struct PmfRow {
    abundance: u64,
    probability: f64,
    predicted_species: f64,
}

/// Write a fitted PMF as `abundance,probability,predicted_species` rows.
pub fn write_pmf_csv(fit: &SadFit, path: impl AsRef<Path>) -> Result<(), SadError> {
    let mut wtr = csv::Writer::from_path(path.as_ref())?;
    let s = fit.problem.s();

    for (idx, &probability) in fit.pmf.iter().enumerate() {
        wtr.serialize(PmfRow {
            abundance: idx as u64 + 1,
            probability,
            predicted_species: probability * s,
        })?;
    }

    wtr.flush()?;
    Ok(())
}

/// Read the probabilities back from a PMF CSV.
pub fn read_pmf_csv(path: impl AsRef<Path>) -> Result<Vec<f64>, SadError> {
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_path(path.as_ref())?;

    let mut pmf = Vec::new();
    for result in rdr.deserialize() {
        let row: PmfRow = result?;
        if row.abundance != pmf.len() as u64 + 1 {
            return Err(SadError::ParseError(format!(
                "PMF rows out of order: expected abundance {}, found {}",
                pmf.len() + 1,
                row.abundance
            )));
        }
        pmf.push(row.probability);
    }
    Ok(pmf)
}

/// Write a whole fit (model, problem, parameter, PMF) as JSON.
pub fn write_fit_json(fit: &SadFit, path: impl AsRef<Path>, pretty: bool) -> Result<(), SadError> {
    let content = if pretty {
        serde_json::to_string_pretty(fit)?
    } else {
        serde_json::to_string(fit)?
    };
    std::fs::write(path.as_ref(), content)?;
    Ok(())
}

/// Read an abundance vector from a JSON array of counts, e.g. `[12, 4, 1]`.
pub fn read_abundances_json(path: impl AsRef<Path>) -> Result<Vec<u64>, SadError> {
    let content = std::fs::read_to_string(path.as_ref())?;
    Ok(serde_json::from_str(&content)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{AbundanceProblem, SadModel};

    fn sample_fit() -> SadFit {
        SadFit {
            model: SadModel::TruncatedLogSeries,
            problem: AbundanceProblem::new(2, 3).unwrap(),
            parameter: Some(0.8),
            root: None,
            pmf: vec![0.5, 0.3, 0.2],
        }
    }

    #[test]
    fn test_pmf_csv_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pmf.csv");
        write_pmf_csv(&sample_fit(), &path).unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        assert!(content.starts_with("abundance,probability,predicted_species\n1,0.5,1"));

        let pmf = read_pmf_csv(&path).unwrap();
        assert_eq!(pmf, vec![0.5, 0.3, 0.2]);
    }

    #[test]
    fn test_pmf_csv_out_of_order() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pmf.csv");
        std::fs::write(&path, "abundance,probability,predicted_species\n2,0.5,1.0\n").unwrap();
        assert!(matches!(read_pmf_csv(&path), Err(SadError::ParseError(_))));
    }

    #[test]
    fn test_fit_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("fit.json");
        write_fit_json(&sample_fit(), &path, true).unwrap();
        let value: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(value["model"], "TruncatedLogSeries");
        assert_eq!(value["problem"]["species"], 2);
        assert_eq!(value["pmf"].as_array().unwrap().len(), 3);
    }

    #[test]
    fn test_read_abundances_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("abund.json");
        std::fs::write(&path, "[12, 4, 1]").unwrap();
        assert_eq!(read_abundances_json(&path).unwrap(), vec![12, 4, 1]);
    }
}
