use colored::Colorize;

use crate::models::SadFit;

/// Expected species per doubling class: `[1]`, `[2, 3]`, `[4, 7]`, ...
pub fn octave_classes(fit: &SadFit) -> Vec<(u64, u64, f64)> {
    let s = fit.problem.s();
    let n = fit.pmf.len() as u64;
    let mut classes = Vec::new();
    let mut lower = 1u64;
    while lower <= n {
        let upper = (lower * 2 - 1).min(n);
        let mass: f64 = fit.pmf[(lower - 1) as usize..upper as usize].iter().sum();
        classes.push((lower, upper, mass * s));
        lower *= 2;
    }
    classes
}

/// Format a text histogram of expected species per abundance octave.
pub fn format_pmf_histogram(fit: &SadFit) -> String {
    let mut output = String::new();
    output.push_str(&format!("\n{}\n", "Expected Species by Octave".bold().green()));
    output.push_str(&format!("{}\n", "=".repeat(60)));

    if fit.pmf.is_empty() {
        output.push_str("  No data available.\n");
        return output;
    }

    let classes = octave_classes(fit);
    let max_species = classes.iter().map(|c| c.2).fold(0.0f64, f64::max);
    let bar_width = 40;

    output.push_str(&format!("  {:>13}  {:>9}  Distribution\n", "Abundance", "Species"));
    output.push_str(&format!("  {}\n", "-".repeat(70)));

    for (lower, upper, species) in classes {
        let bar_len = if max_species > 0.0 {
            ((species / max_species) * bar_width as f64).round() as usize
        } else {
            0
        };
        let bar = "\u{2588}".repeat(bar_len);
        let label = if lower == upper {
            format!("{lower}")
        } else {
            format!("{lower}-{upper}")
        };

        output.push_str(&format!("  {label:>13}  {species:>9.2}  {}\n", bar.green()));
    }

    output.push('\n');
    output
}

/// Print a text histogram of the fitted distribution.
pub fn print_pmf_histogram(fit: &SadFit) {
    print!("{}", format_pmf_histogram(fit));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{AbundanceProblem, SadModel};

    fn fit_with(pmf: Vec<f64>, species: u64) -> SadFit {
        let n = pmf.len() as u64;
        SadFit {
            model: SadModel::LogSeries,
            problem: AbundanceProblem::new(species, n).unwrap(),
            parameter: None,
            root: None,
            pmf,
        }
    }

    #[test]
    fn test_octave_bounds() {
        let fit = fit_with(vec![0.5, 0.2, 0.1, 0.1, 0.05, 0.05], 2);
        let classes = octave_classes(&fit);
        let bounds: Vec<(u64, u64)> = classes.iter().map(|c| (c.0, c.1)).collect();
        assert_eq!(bounds, vec![(1, 1), (2, 3), (4, 6)]);
        assert!((classes[1].2 - 0.6).abs() < 1e-12);
        let total: f64 = classes.iter().map(|c| c.2).sum();
        assert!((total - 2.0).abs() < 1e-12);
    }

    #[test]
    fn test_format_histogram_with_data() {
        let fit = fit_with(vec![0.6, 0.3, 0.1], 2);
        let output = format_pmf_histogram(&fit);
        assert!(output.contains("Expected Species by Octave"));
        assert!(output.contains("Abundance"));
        assert!(output.contains("2-3"));
        assert!(output.contains("1.20"));
    }

    #[test]
    fn test_format_histogram_empty() {
        let mut fit = fit_with(vec![0.6, 0.3, 0.1], 2);
        fit.pmf.clear();
        let output = format_pmf_histogram(&fit);
        assert!(output.contains("No data available."));
    }
}
