use assert_approx_eq::assert_approx_eq;
use proptest::prelude::*;

use macroeco_sad::{
    analysis::{
        fit_truncated_log_series, log_series_constraint, truncated_approx_constraint,
        truncated_constraint,
    },
    error::SadError,
    io,
    log_series_pmf, lognormal_pmf, truncated_log_series_approx_pmf, truncated_log_series_pmf,
    workflow::{run_sad_fit, Workflow, WorkflowConfig, SAD_FIT_REQUIRED, SAD_FIT_SCRIPT},
    AbundanceProblem, PmfOutput, RootSelector, SadFitter, SadModel, SolverConfig,
};

const ABUNDANCES: [u64; 12] = [1, 1, 1, 1, 2, 2, 3, 4, 7, 12, 20, 46];

fn sample_grid() -> io::CountGrid {
    // 2 x 2 cells, 3 species
    io::CountGrid {
        name: "test plot".to_string(),
        counts: vec![
            vec![vec![5, 0, 1], vec![2, 1, 0]],
            vec![vec![0, 3, 0], vec![8, 0, 0]],
        ],
    }
}

// ============================================================================
// Log-series
// ============================================================================

#[test]
fn test_log_series_reference_case() {
    let output = log_series_pmf(10, 1000, false).unwrap();
    let pmf = output.pmf().unwrap();
    assert_eq!(pmf.len(), 1000);
    assert!(pmf.iter().all(|p| *p > 0.0 && *p < 1.0));
    // Mass beyond N is dropped, so the total falls just short of one
    let mass: f64 = pmf.iter().sum();
    assert!(mass > 0.95 && mass <= 1.0 + 1e-12, "mass = {mass}");
    assert!(pmf.windows(2).all(|w| w[0] >= w[1]));
}

#[test]
fn test_log_series_summary_matches_pmf() {
    let pmf = log_series_pmf(20, 300, false).unwrap();
    let expected: f64 = -pmf.pmf().unwrap().iter().map(|p| p.ln()).sum::<f64>();
    match log_series_pmf(20, 300, true).unwrap() {
        PmfOutput::Summary(value) => assert_approx_eq!(value, expected, 1e-9),
        other => panic!("expected a summary, got {other:?}"),
    }
}

#[test]
fn test_log_series_constraint_at_solution() {
    let problem = AbundanceProblem::new(30, 600).unwrap();
    let fit = SadFitter::default()
        .fit_totals(SadModel::LogSeries, &problem)
        .unwrap();
    let x = fit.parameter.unwrap();
    assert!(x > 0.0 && x < 1.0);
    assert!(log_series_constraint(x, 30.0, 600.0).abs() < 1e-6);
}

#[test]
fn test_log_series_invalid_inputs() {
    assert!(matches!(log_series_pmf(10, 10, false), Err(SadError::InvalidParameters(_))));
    assert!(matches!(log_series_pmf(1, 100, false), Err(SadError::InvalidParameters(_))));
    assert!(matches!(log_series_pmf(5, 0, false), Err(SadError::InvalidParameters(_))));
}

// ============================================================================
// Truncated log-series
// ============================================================================

#[test]
fn test_truncated_exact_normalized() {
    let pmf = truncated_log_series_pmf(25, 500, false).unwrap();
    let pmf = pmf.pmf().unwrap();
    assert_eq!(pmf.len(), 500);
    assert_approx_eq!(pmf.iter().sum::<f64>(), 1.0, 1e-9);
}

#[test]
fn test_truncated_exact_mean_matches_n_over_s() {
    let fit = fit_truncated_log_series(&AbundanceProblem::new(12, 240).unwrap(), &SolverConfig::default())
        .unwrap();
    let mean: f64 = fit
        .pmf
        .iter()
        .enumerate()
        .map(|(idx, p)| (idx + 1) as f64 * p)
        .sum();
    assert_approx_eq!(mean, 20.0, 1e-6);
    assert!(truncated_constraint(fit.parameter.unwrap(), 12.0, 240).abs() < 1e-6);
}

#[test]
fn test_truncated_exact_near_singletons_fails_cleanly() {
    let result = truncated_log_series_pmf(9, 10, false);
    assert!(matches!(result, Err(SadError::RootError(_))));
}

#[test]
fn test_truncated_approx_root_choice() {
    let first = truncated_log_series_approx_pmf(5, 50, false, RootSelector::First).unwrap();
    let second = truncated_log_series_approx_pmf(5, 50, false, RootSelector::Second).unwrap();
    let (first, second) = (first.pmf().unwrap(), second.pmf().unwrap());
    assert_eq!(first.len(), 46);
    assert_eq!(second.len(), 46);
    assert_ne!(first, second);

    // The second root is the one near x = 1 with a nearly normalized PMF
    let mass: f64 = second.iter().sum();
    assert!(mass > 0.9 && mass < 1.05, "mass = {mass}");
}

#[test]
fn test_truncated_approx_roots_satisfy_constraint() {
    let problem = AbundanceProblem::new(5, 50).unwrap();
    for root in [RootSelector::First, RootSelector::Second] {
        let fit = SadFitter::default()
            .with_root(root)
            .fit_totals(SadModel::TruncatedLogSeriesApprox, &problem)
            .unwrap();
        let x = fit.parameter.unwrap();
        assert!(truncated_approx_constraint(x, 5.0, 50.0).abs() < 1e-8);
        assert_eq!(fit.root, Some(root));
    }
}

#[test]
fn test_truncated_approx_without_solution() {
    let result = truncated_log_series_approx_pmf(40, 100, false, RootSelector::Second);
    assert!(matches!(result, Err(SadError::RootError(_))));
}

// ============================================================================
// Poisson-lognormal
// ============================================================================

#[test]
fn test_lognormal_pmf_shape() {
    let output = lognormal_pmf(&ABUNDANCES, false).unwrap();
    let pmf = output.pmf().unwrap();
    assert_eq!(pmf.len(), ABUNDANCES.iter().sum::<u64>() as usize);
    assert!(pmf.iter().all(|p| p.is_finite() && *p >= 0.0));
    let mass: f64 = pmf.iter().sum();
    assert!(mass > 0.5 && mass <= 1.0 + 1e-9, "mass = {mass}");
}

#[test]
fn test_lognormal_degenerate_vector() {
    assert!(matches!(lognormal_pmf(&[4, 4, 4], false), Err(SadError::InvalidParameters(_))));
    assert!(lognormal_pmf(&[], false).is_err());
}

#[test]
fn test_lognormal_needs_abundances() {
    let problem = AbundanceProblem::new(10, 100).unwrap();
    let result = SadFitter::default().fit_totals(SadModel::Lognormal, &problem);
    assert!(matches!(result, Err(SadError::InvalidParameters(_))));
}

// ============================================================================
// Configuration
// ============================================================================

#[test]
fn test_coarse_grid_config_still_fits() {
    let config = SolverConfig::from_toml_str("grid_samples = 50\ntolerance = 1e-10").unwrap();
    let fit = SadFitter::new(config)
        .fit_totals(SadModel::TruncatedLogSeriesApprox, &AbundanceProblem::new(5, 50).unwrap())
        .unwrap();
    assert!(truncated_approx_constraint(fit.parameter.unwrap(), 5.0, 50.0).abs() < 1e-6);
}

#[test]
fn test_invalid_config_rejected() {
    assert!(SolverConfig::from_toml_str("grid_samples = 2").is_err());
    assert!(SolverConfig::from_toml_str("grid_samples = \"many\"").is_err());
}

// ============================================================================
// Grid conversion and model comparison
// ============================================================================

#[test]
fn test_grid_to_comparison_pipeline() {
    let dir = tempfile::tempdir().unwrap();
    let grid_path = dir.path().join("grid.json");
    std::fs::write(&grid_path, serde_json::to_string(&sample_grid()).unwrap()).unwrap();

    let grid = io::read_grid_json(&grid_path).unwrap();
    let xy_path = io::xy_output_path(dir.path(), &grid.name);
    let rows = io::write_xy_csv(&grid, &xy_path).unwrap();
    assert_eq!(rows, grid.total().unwrap());
    assert!(xy_path.ends_with("test plot_xy.csv"));

    let abundances = io::read_abundances(&xy_path).unwrap();
    assert_eq!(abundances, vec![15, 4, 1]);

    let comparison = SadFitter::default().compare(&abundances).unwrap();
    assert_eq!(comparison.entries.len(), 4);
    assert_eq!(comparison.problem.species(), 3);
    assert_eq!(comparison.problem.individuals(), 20);
}

#[test]
fn test_compare_ranks_fitted_models() {
    let comparison = SadFitter::default().compare(&ABUNDANCES).unwrap();
    let best = comparison.best().unwrap();
    for entry in comparison.entries.iter().filter(|e| e.error.is_none()) {
        assert!(best.negative_log_likelihood.unwrap() <= entry.negative_log_likelihood.unwrap());
    }
}

// ============================================================================
// Workflow
// ============================================================================

#[test]
fn test_workflow_end_to_end() {
    let dir = tempfile::tempdir().unwrap();
    let data = dir.path().join("BCIS.json");
    std::fs::write(&data, serde_json::to_string(&ABUNDANCES.to_vec()).unwrap()).unwrap();
    std::fs::write(dir.path().join("BCIS.toml"), "lat = 9.15\nlon = -79.85\n").unwrap();
    std::fs::write(
        dir.path().join("parameters.toml"),
        format!(
            r#"
[[analysis]]
script_name = "sad_fit"
interactive = false

[[analysis.run]]
name = "all"
[analysis.run.params]
data_paths = [{:?}]
models = "['logser', 'trunc', 'trunc-approx', 'lognorm']"
root = "first"
"#,
            data.display().to_string()
        ),
    )
    .unwrap();

    let workflow =
        Workflow::new(WorkflowConfig::new(dir.path(), SAD_FIT_SCRIPT), SAD_FIT_REQUIRED).unwrap();
    let reports = run_sad_fit(&workflow, &SadFitter::default()).unwrap();
    assert_eq!(reports.len(), 1);
    assert_eq!(reports[0].output_id, "sad_fit_BCIS_all");

    for code in ["logser", "trunc", "trunc-approx", "lognorm"] {
        let path = dir.path().join(format!("sad_fit_BCIS_all_{code}.csv"));
        assert!(path.is_file(), "missing {}", path.display());
    }
    assert!(dir.path().join("sad_fit_BCIS_all_summary.csv").is_file());
    assert!(dir.path().join("map_BCIS.json").is_file());

    let approx = reports[0]
        .comparison
        .entries
        .iter()
        .find(|e| e.model == SadModel::TruncatedLogSeriesApprox)
        .unwrap();
    assert!(approx.error.is_none());
}

#[test]
fn test_workflow_requires_parameter_file() {
    let dir = tempfile::tempdir().unwrap();
    let result = Workflow::new(WorkflowConfig::new(dir.path(), SAD_FIT_SCRIPT), SAD_FIT_REQUIRED);
    assert!(matches!(result, Err(SadError::WorkflowError(_))));
}

// ============================================================================
// Properties
// ============================================================================

proptest! {
    #![proptest_config(ProptestConfig { cases: 64, .. ProptestConfig::default() })]

    #[test]
    fn truncated_exact_is_normalized(species in 2u64..40, factor in 2u64..40) {
        let individuals = species * factor;
        let output = truncated_log_series_pmf(species, individuals, false).unwrap();
        let pmf = output.pmf().unwrap();
        prop_assert_eq!(pmf.len() as u64, individuals);
        let mass: f64 = pmf.iter().sum();
        prop_assert!((mass - 1.0).abs() < 1e-6, "mass = {}", mass);
    }

    #[test]
    fn log_series_is_deterministic(species in 2u64..30, extra in 1u64..400) {
        let individuals = species + extra;
        let a = log_series_pmf(species, individuals, false).unwrap();
        let b = log_series_pmf(species, individuals, false).unwrap();
        prop_assert_eq!(a.pmf().unwrap(), b.pmf().unwrap());
    }

    #[test]
    fn log_series_mass_never_exceeds_one(species in 2u64..30, extra in 1u64..400) {
        let individuals = species + extra;
        let output = log_series_pmf(species, individuals, false).unwrap();
        let mass: f64 = output.pmf().unwrap().iter().sum();
        prop_assert!(mass <= 1.0 + 1e-9, "mass = {}", mass);
        prop_assert!(mass > 0.0);
    }
}
