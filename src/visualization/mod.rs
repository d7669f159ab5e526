mod charts;
mod tables;

pub use charts::{format_pmf_histogram, octave_classes, print_pmf_histogram};
pub use tables::{
    format_comparison_table, format_fit_summary, format_grid_summary, format_pmf_table,
    print_comparison_table, print_fit_summary, print_grid_summary, print_pmf_table,
};
