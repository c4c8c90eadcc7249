#![warn(clippy::all, clippy::pedantic, clippy::nursery)]
#![allow(clippy::uninlined_format_args)]

use clap::{Parser, Subcommand};
use consulting_eda::analysis::output;
use consulting_eda::structs::MissingPolicy;
use consulting_eda::{run_pipeline, AnalysisConfig, EdaError, InputPaths, Inputs, ObservationTable, Result, Schema};
use std::path::{Path, PathBuf};
use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

/// eda - exploratory statistics over quarterly consulting data
#[derive(Parser, Debug)]
#[command(name = "eda")]
#[command(author, version, about, long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run the analysis pipeline, output summary files
    Analyze {
        /// Consulting dataset (Quarter, services total, GVA, hours, hourly output)
        #[arg(short, long)]
        csv: PathBuf,

        /// Raw hours table (Quarter, Raw Hours Worked)
        #[arg(long)]
        raw_hours: Option<PathBuf>,

        /// Raw output table (Quarter, Raw Hourly Output)
        #[arg(long)]
        raw_output: Option<PathBuf>,

        /// Output directory for report files
        #[arg(short, long, default_value = "./eda_output")]
        output_dir: PathBuf,

        /// Treat input as TSV instead of CSV
        #[arg(long)]
        tsv: bool,

        /// Drop rows with missing values instead of failing
        #[arg(long)]
        drop_incomplete: bool,
    },

    /// Validate the consulting dataset and print its shape
    Check {
        /// Consulting dataset to validate
        #[arg(short, long)]
        csv: PathBuf,

        /// Treat input as TSV instead of CSV
        #[arg(long)]
        tsv: bool,
    },
}

fn main() {
    let env = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt::Subscriber::builder()
        .with_env_filter(env)
        .with_writer(std::io::stderr)
        .init();

    if let Err(e) = run() {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let args = Args::parse();

    match args.command {
        Some(Commands::Analyze {
            csv,
            raw_hours,
            raw_output,
            output_dir,
            tsv,
            drop_incomplete,
        }) => {
            let raw_tables = pair_raw_tables(raw_hours, raw_output)?;
            let config = AnalysisConfig {
                missing_policy: if drop_incomplete {
                    MissingPolicy::DropRow
                } else {
                    MissingPolicy::Reject
                },
                tsv,
            };
            run_analyze(
                &InputPaths {
                    consulting: csv,
                    raw_tables,
                },
                &output_dir,
                &config,
            )
        }

        Some(Commands::Check { csv, tsv }) => run_check(&csv, tsv),

        None => {
            eprintln!("No subcommand provided. Use 'eda analyze' or 'eda check'.");
            eprintln!("Run 'eda --help' for usage information.");
            std::process::exit(1);
        }
    }
}

/// Both raw tables are needed for the independence test
fn pair_raw_tables(
    raw_hours: Option<PathBuf>,
    raw_output: Option<PathBuf>,
) -> Result<Option<(PathBuf, PathBuf)>> {
    match (raw_hours, raw_output) {
        (Some(h), Some(o)) => Ok(Some((h, o))),
        (None, None) => Ok(None),
        _ => Err(EdaError::Config(
            "--raw-hours and --raw-output must be given together".into(),
        )),
    }
}

/// Run the analysis pipeline and write the report files
fn run_analyze(paths: &InputPaths, output_dir: &Path, config: &AnalysisConfig) -> Result<()> {
    info!("Analyzing: {}", paths.consulting.display());
    let inputs = Inputs::load(paths, config)?;

    let result = run_pipeline(&inputs)?;

    std::fs::create_dir_all(output_dir)?;
    let summary = output::build_summary(&paths.consulting, &result);
    output::write_summary(output_dir, &summary)?;
    output::write_stats_json(output_dir, &result)?;

    info!("Output written to {}", output_dir.display());
    info!("  - summary.txt");
    info!("  - stats.json");

    Ok(())
}

/// Load and validate the consulting dataset
fn run_check(csv_path: &Path, tsv: bool) -> Result<()> {
    let table = ObservationTable::load(csv_path, &Schema::consulting(), MissingPolicy::Reject, tsv)?;

    println!("{}: {} rows", csv_path.display(), table.row_count());
    println!("Columns: {}, {}", table.key(), table.column_names().join(", "));
    if let Some((first, last)) = table.quarter_range() {
        println!("Quarters: {first} to {last}");
    }

    Ok(())
}
