use std::fs::OpenOptions;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use macroeco_sad::{
    io,
    visualization::{
        print_comparison_table, print_fit_summary, print_grid_summary, print_pmf_histogram,
        print_pmf_table,
    },
    workflow::{run_sad_fit, Workflow, WorkflowConfig, SAD_FIT_REQUIRED, SAD_FIT_SCRIPT},
    AbundanceProblem, RootSelector, SadFitter, SadModel, SolverConfig,
};

#[derive(Parser)]
#[command(
    name = "macroeco",
    about = "Species-abundance distribution fitting for macroecology",
    version,
    author
)]
struct Cli {
    /// Solver configuration (TOML)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Fit one SAD model and show its PMF
    Fit {
        /// Model: logser, trunc, trunc-approx, or lognorm
        #[arg(short, long)]
        model: SadModel,

        /// Number of species (S)
        #[arg(short, long, required_unless_present = "input", conflicts_with = "input")]
        species: Option<u64>,

        /// Number of individuals (N)
        #[arg(short = 'n', long, required_unless_present = "input", conflicts_with = "input")]
        individuals: Option<u64>,

        /// Abundance data: observation table (.csv) or count list (.json)
        #[arg(short, long)]
        input: Option<PathBuf>,

        /// Root to keep when the approximate constraint has two: first or second
        #[arg(short, long, default_value = "second")]
        root: RootSelector,

        /// Print only -Σ ln pmf instead of the PMF
        #[arg(long)]
        summary: bool,

        /// Write the fit to a file (.csv PMF or .json fit)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Pretty-print JSON output
        #[arg(long)]
        pretty: bool,

        /// PMF rows to display
        #[arg(long, default_value = "20")]
        rows: usize,

        /// Show the octave histogram
        #[arg(long)]
        histogram: bool,
    },

    /// Fit every model to observed abundances and compare them
    Compare {
        /// Abundance data: observation table (.csv) or count list (.json)
        #[arg(short, long)]
        input: PathBuf,

        /// Root to keep when the approximate constraint has two
        #[arg(short, long, default_value = "second")]
        root: RootSelector,
    },

    /// Convert a JSON count grid into a species,x,y observation table
    Convert {
        /// Count grid (.json)
        #[arg(short, long)]
        input: PathBuf,

        /// Directory for `<name>_xy.csv`
        #[arg(short, long, default_value = ".")]
        output_dir: PathBuf,
    },

    /// Display the shape and species totals of a count grid
    Describe {
        /// Count grid (.json)
        #[arg(short, long)]
        input: PathBuf,
    },

    /// Run a script over the datasets listed in `<output-dir>/parameters.toml`
    Run {
        /// Directory holding parameters.toml; results and logfile.txt go here
        #[arg(short, long, default_value = ".")]
        output_dir: PathBuf,

        /// Analysis to run from the parameter file
        #[arg(short, long, default_value = SAD_FIT_SCRIPT)]
        script: String,

        /// Skip writing site map plans
        #[arg(long)]
        no_maps: bool,

        /// Site maps cover the whole globe
        #[arg(long)]
        whole_globe: bool,
    },
}

/// Log to stderr, and also append to `log_file` when given.
fn init_logging(log_file: Option<&Path>) -> Result<()> {
    let default_level = if log_file.is_some() { "info" } else { "warn" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    let file_layer = match log_file {
        Some(path) => {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("cannot open log file {}", path.display()))?;
            Some(
                fmt::layer()
                    .with_ansi(false)
                    .with_writer(Mutex::new(file)),
            )
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr).with_target(false))
        .with(file_layer)
        .init();
    Ok(())
}

fn load_config(path: Option<&Path>) -> Result<SolverConfig> {
    match path {
        Some(path) => SolverConfig::from_toml_file(path)
            .with_context(|| format!("cannot load solver config {}", path.display())),
        None => Ok(SolverConfig::default()),
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let log_file = match &cli.command {
        Commands::Run { output_dir, .. } => {
            std::fs::create_dir_all(output_dir)?;
            Some(output_dir.join("logfile.txt"))
        }
        _ => None,
    };
    init_logging(log_file.as_deref())?;

    let config = load_config(cli.config.as_deref())?;

    match cli.command {
        Commands::Fit {
            model,
            species,
            individuals,
            input,
            root,
            summary,
            output,
            pretty,
            rows,
            histogram,
        } => {
            let fitter = SadFitter::new(config).with_root(root);
            let fit = match input {
                Some(path) => {
                    let abundances = io::read_abundances(&path)?;
                    fitter.fit_abundances(model, &abundances)?
                }
                None => {
                    let (Some(s), Some(n)) = (species, individuals) else {
                        anyhow::bail!("--species and --individuals are required without --input");
                    };
                    fitter.fit_totals(model, &AbundanceProblem::new(s, n)?)?
                }
            };

            if let Some(path) = &output {
                io::writer_for(path, pretty)?.write(&fit, path)?;
                println!(
                    "{} Wrote {} fit to {}",
                    "Success:".green().bold(),
                    fit.model.code(),
                    path.display()
                );
            }

            if summary {
                println!("{}", fit.summary());
            } else {
                print_fit_summary(&fit);
                print_pmf_table(&fit, rows);
                if histogram {
                    print_pmf_histogram(&fit);
                }
            }
        }

        Commands::Compare { input, root } => {
            let abundances = io::read_abundances(&input)?;
            println!(
                "\n{}",
                format!("Model comparison: {}", input.display()).bold().cyan()
            );
            let comparison = SadFitter::new(config).with_root(root).compare(&abundances)?;
            print_comparison_table(&comparison);
        }

        Commands::Convert { input, output_dir } => {
            let grid = io::read_grid_json(&input)?;
            std::fs::create_dir_all(&output_dir)?;
            let path = io::xy_output_path(&output_dir, &grid.name);
            let rows = io::write_xy_csv(&grid, &path)?;
            println!(
                "{} Converted {} -> {} ({rows} individuals)",
                "Success:".green().bold(),
                input.display(),
                path.display()
            );
        }

        Commands::Describe { input } => {
            let grid = io::read_grid_json(&input)?;
            let shape = grid.shape()?;
            let totals = grid.species_totals()?;
            print_grid_summary(&grid, &shape, &totals);
        }

        Commands::Run {
            output_dir,
            script,
            no_maps,
            whole_globe,
        } => {
            if script != SAD_FIT_SCRIPT {
                anyhow::bail!("Unknown script: {script}. Available: {SAD_FIT_SCRIPT}");
            }

            let mut workflow_config = WorkflowConfig::new(&output_dir, script);
            workflow_config.site_maps = !no_maps;
            workflow_config.whole_globe = whole_globe;
            let workflow = Workflow::new(workflow_config, SAD_FIT_REQUIRED)?;

            let reports = run_sad_fit(&workflow, &SadFitter::new(config))?;
            for report in &reports {
                if workflow.interactive() {
                    println!("\n{}", report.output_id.bold().cyan());
                    print_comparison_table(&report.comparison);
                }
                for file in &report.files {
                    println!("  {} {}", "wrote".dimmed(), file.display());
                }
            }
            println!(
                "{} {} dataset(s) fitted, results in {}",
                "Success:".green().bold(),
                reports.len(),
                output_dir.display()
            );
        }
    }

    Ok(())
}
