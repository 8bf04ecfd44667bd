use clap::{Parser, Subcommand};
use cli::{Overrides, RunFile};
use color_eyre::eyre::{Result, eyre};
use consensus::{BatchDriver, CombinationMode, catalog};
use std::path::{Path, PathBuf};
use tracing::{info, warn};
use tracing_subscriber::{self, EnvFilter};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Combine per-algorithm fire masks into consensus masks
    Run {
        /// Path to the TOML or JSON run file
        #[arg(short, long)]
        config: PathBuf,
        /// Minimum number of agreeing algorithms in voting mode
        #[arg(long)]
        quorum: Option<u32>,
        /// Mode to run; repeat to run several (intersection, voting, union)
        #[arg(long = "mode")]
        modes: Vec<CombinationMode>,
        /// Directory holding the per-algorithm masks
        #[arg(long)]
        masks_dir: Option<PathBuf>,
        /// Directory receiving the combined masks
        #[arg(long)]
        output_dir: Option<PathBuf>,
        /// Path to save the JSON report
        #[arg(long)]
        report: Option<PathBuf>,
    },
    /// List the masks found per algorithm and the scenes each join selects
    Catalog {
        /// Path to the TOML or JSON run file
        #[arg(short, long)]
        config: PathBuf,
    },
    /// Write a run file with default settings
    Init {
        /// Destination (.toml or .json)
        #[arg(short, long)]
        output: PathBuf,
    },
    /// Print the JSON schema of the run file
    Schema,
}

fn main() -> Result<()> {
    color_eyre::install()?;

    let cli = Cli::parse();

    match cli.command {
        Commands::Run {
            config,
            quorum,
            modes,
            masks_dir,
            output_dir,
            report,
        } => {
            let run_file = RunFile::from_file(&config)?;
            init_tracing(run_file.log_filter());
            let overrides = Overrides {
                quorum,
                modes,
                masks_dir,
                output_dir,
            };
            run(run_file, &overrides, report)?;
        }
        Commands::Catalog { config } => {
            let run_file = RunFile::from_file(&config)?;
            init_tracing(run_file.log_filter());
            print_catalog(run_file)?;
        }
        Commands::Init { output } => {
            init_tracing(cli::DEFAULT_LOG_FILTER);
            write_default(&output)?;
        }
        Commands::Schema => {
            println!("{}", serde_json::to_string_pretty(&RunFile::schema())?);
        }
    }

    Ok(())
}

fn init_tracing(fallback: &str) {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback)),
        )
        .init();
}

fn run(mut run_file: RunFile, overrides: &Overrides, report_path: Option<PathBuf>) -> Result<()> {
    overrides.apply_to(&mut run_file.batch);
    info!("Masks directory: {}", run_file.batch.masks_dir.display());
    info!("Output directory: {}", run_file.batch.output_dir.display());

    let driver = BatchDriver::new(run_file.batch)?;
    let report = driver.run()?;

    if let Some(path) = report_path.or(run_file.report) {
        report.save_json(&path)?;
        info!("Report saved to {}", path.display());
    }

    if report.has_failures() {
        warn!("Some scenes could not be combined; see the report for reasons");
    }
    Ok(())
}

fn print_catalog(run_file: RunFile) -> Result<()> {
    let driver = BatchDriver::new(run_file.batch)?;
    let scan = driver.scan()?;

    println!("Masks found: {}", scan.discovered);
    if scan.excluded_outputs > 0 {
        println!("Earlier outputs ignored: {}", scan.excluded_outputs);
    }
    for (algorithm, count) in scan.grouping.counts() {
        println!("{} - Images: {}", algorithm, count);
    }
    println!(
        "Scenes with every algorithm: {}",
        catalog::build_inner(&scan.grouping).len()
    );
    println!(
        "Scenes with any algorithm: {}",
        catalog::build_outer(&scan.grouping).len()
    );
    Ok(())
}

fn write_default(output: &Path) -> Result<()> {
    if output.exists() {
        return Err(eyre!("{} already exists", output.display()));
    }
    RunFile::default().to_file(output)?;
    info!("Default run file written to {}", output.display());
    Ok(())
}
