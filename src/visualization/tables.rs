use colored::Colorize;
use comfy_table::{modifiers::UTF8_ROUND_CORNERS, presets::UTF8_FULL, Cell, ContentArrangement, Table};

use crate::analysis::ModelComparison;
use crate::io::{CountGrid, GridShape};
use crate::models::SadFit;

fn new_table(header: Vec<&str>) -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(header);
    table
}

fn format_optional(value: Option<f64>, precision: usize) -> String {
    value.map_or_else(|| "-".to_string(), |v| format!("{v:.precision$}"))
}

/// Format a fit summary table as a string.
pub fn format_fit_summary(fit: &SadFit) -> String {
    let mut output = String::new();
    output.push_str(&format!("\n{}\n", fit.model.to_string().bold().green()));
    output.push_str(&format!("{}\n", "=".repeat(50)));

    let mut table = new_table(vec!["Quantity", "Value"]);
    table.add_row(vec![
        Cell::new("Species (S)"),
        Cell::new(fit.problem.species()),
    ]);
    table.add_row(vec![
        Cell::new("Individuals (N)"),
        Cell::new(fit.problem.individuals()),
    ]);
    if let Some(x) = fit.parameter {
        table.add_row(vec![Cell::new("x"), Cell::new(format!("{x:.8}"))]);
    }
    if let Some(beta) = fit.beta() {
        table.add_row(vec![Cell::new("beta"), Cell::new(format!("{beta:.6}"))]);
    }
    if let Some(root) = fit.root {
        table.add_row(vec![Cell::new("Root"), Cell::new(root)]);
    }
    table.add_row(vec![
        Cell::new("Support"),
        Cell::new(format!("1..={}", fit.pmf.len())),
    ]);
    table.add_row(vec![
        Cell::new("PMF mass"),
        Cell::new(format!("{:.6}", fit.total_mass())),
    ]);
    table.add_row(vec![
        Cell::new("-Σ ln pmf"),
        Cell::new(format!("{:.4}", fit.summary())),
    ]);

    output.push_str(&format!("{table}"));
    output
}

/// Print a fit summary table.
pub fn print_fit_summary(fit: &SadFit) {
    print!("{}", format_fit_summary(fit));
}

/// Format the first `rows` abundance classes of a PMF.
pub fn format_pmf_table(fit: &SadFit, rows: usize) -> String {
    let mut output = String::new();
    output.push_str(&format!("\n{}\n", "Abundance Distribution".bold().green()));
    output.push_str(&format!("{}\n", "=".repeat(50)));

    let mut table = new_table(vec!["Abundance", "Probability", "Expected Species"]);
    let s = fit.problem.s();
    for (idx, &p) in fit.pmf.iter().take(rows).enumerate() {
        table.add_row(vec![
            Cell::new(idx + 1),
            Cell::new(format!("{p:.6e}")),
            Cell::new(format!("{:.3}", p * s)),
        ]);
    }

    output.push_str(&format!("{table}"));
    if fit.pmf.len() > rows {
        output.push_str(&format!(
            "\n{}\n",
            format!("... {} more rows", fit.pmf.len() - rows).dimmed()
        ));
    }
    output
}

/// Print the PMF table.
pub fn print_pmf_table(fit: &SadFit, rows: usize) {
    print!("{}", format_pmf_table(fit, rows));
}

/// Format a model comparison as a string, marking the best fit.
pub fn format_comparison_table(comparison: &ModelComparison) -> String {
    let mut output = String::new();
    output.push_str(&format!("\n{}\n", "Model Comparison".bold().green()));
    output.push_str(&format!("{}\n", comparison.problem.to_string().dimmed()));
    output.push_str(&format!("{}\n", "=".repeat(60)));

    let best = comparison.best().map(|e| e.model);
    let mut table = new_table(vec!["Model", "x", "-ln L", "PMF mass", "Status"]);
    for entry in &comparison.entries {
        let status = match (&entry.error, Some(entry.model) == best) {
            (Some(e), _) => e.clone(),
            (None, true) => "best".to_string(),
            (None, false) => "ok".to_string(),
        };
        table.add_row(vec![
            Cell::new(entry.model),
            Cell::new(format_optional(entry.parameter, 6)),
            Cell::new(format_optional(entry.negative_log_likelihood, 3)),
            Cell::new(format_optional(entry.pmf_mass, 4)),
            Cell::new(status),
        ]);
    }

    output.push_str(&format!("{table}"));
    output
}

/// Print a model comparison table.
pub fn print_comparison_table(comparison: &ModelComparison) {
    print!("{}", format_comparison_table(comparison));
}

/// Format the shape and per-species totals of a count grid.
pub fn format_grid_summary(grid: &CountGrid, shape: &GridShape, totals: &[u64]) -> String {
    let mut output = String::new();
    output.push_str(&format!("\n{}\n", format!("Grid: {}", grid.name).bold().green()));
    output.push_str(&format!(
        "{}\n",
        format!(
            "{} rows x {} columns | {} species | {} individuals",
            shape.rows,
            shape.columns,
            shape.species,
            totals.iter().sum::<u64>()
        )
        .dimmed()
    ));
    output.push_str(&format!("{}\n", "=".repeat(50)));

    let mut table = new_table(vec!["Species", "Individuals"]);
    for (species, total) in totals.iter().enumerate() {
        table.add_row(vec![Cell::new(species), Cell::new(total)]);
    }

    output.push_str(&format!("{table}"));
    output
}

/// Print a count grid summary.
pub fn print_grid_summary(grid: &CountGrid, shape: &GridShape, totals: &[u64]) {
    print!("{}", format_grid_summary(grid, shape, totals));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::{ComparisonEntry, SadFitter};
    use crate::models::{AbundanceProblem, SadModel};

    fn sample_fit() -> SadFit {
        SadFitter::default()
            .fit_totals(SadModel::LogSeries, &AbundanceProblem::new(5, 20).unwrap())
            .unwrap()
    }

    #[test]
    fn test_format_fit_summary_contains_fields() {
        let output = format_fit_summary(&sample_fit());
        assert!(output.contains("Log-series"));
        assert!(output.contains("Species (S)"));
        assert!(output.contains("Individuals (N)"));
        assert!(output.contains("beta"));
        assert!(output.contains("PMF mass"));
        assert!(output.contains("1..=20"));
    }

    #[test]
    fn test_format_pmf_table_truncates() {
        let output = format_pmf_table(&sample_fit(), 5);
        assert!(output.contains("Abundance"));
        assert!(output.contains("Expected Species"));
        assert!(output.contains("15 more rows"));
    }

    #[test]
    fn test_format_pmf_table_all_rows() {
        let output = format_pmf_table(&sample_fit(), 100);
        assert!(!output.contains("more rows"));
        assert!(output.contains("20"));
    }

    #[test]
    fn test_format_comparison_marks_best_and_errors() {
        let comparison = ModelComparison {
            problem: AbundanceProblem::new(3, 10).unwrap(),
            entries: vec![
                ComparisonEntry {
                    model: SadModel::LogSeries,
                    parameter: Some(0.9),
                    negative_log_likelihood: Some(7.5),
                    pmf_mass: Some(0.99),
                    error: None,
                },
                ComparisonEntry {
                    model: SadModel::TruncatedLogSeriesApprox,
                    parameter: None,
                    negative_log_likelihood: None,
                    pmf_mass: None,
                    error: Some("Root error: no root".to_string()),
                },
            ],
        };
        let output = format_comparison_table(&comparison);
        assert!(output.contains("best"));
        assert!(output.contains("Root error: no root"));
        assert!(output.contains("S = 3, N = 10"));
        assert!(output.contains("7.500"));
    }

    #[test]
    fn test_format_grid_summary() {
        let grid = CountGrid {
            name: "plot".to_string(),
            counts: vec![vec![vec![3, 1]]],
        };
        let shape = grid.shape().unwrap();
        let totals = grid.species_totals().unwrap();
        let output = format_grid_summary(&grid, &shape, &totals);
        assert!(output.contains("Grid: plot"));
        assert!(output.contains("2 species"));
        assert!(output.contains("4 individuals"));
    }
}
