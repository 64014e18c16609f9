use std::path::{Path, PathBuf};

use clap::{Args as ClapArgs, Parser, Subcommand};
use nutrec::{AnalysisFile, CsvStore, init_logging};
use nutrec_core::{RunSummary, run_pipeline, sample_and_run, sample_into};

#[derive(Parser, Debug)]
#[command(name = "nutrec")]
#[command(about = "Monte Carlo techno-economic analysis of urine nutrient recovery")]
struct Args {
    /// Log level (debug, info, warn, error)
    #[arg(short, long, default_value = "info", global = true)]
    log_level: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(ClapArgs, Debug)]
struct RunTarget {
    /// Analysis file (YAML)
    #[arg(short, long)]
    config: PathBuf,

    /// Directory holding sample and result sheets
    #[arg(short, long, default_value = "nutrec_output")]
    output: PathBuf,

    /// Override the number of scenarios
    #[arg(short, long)]
    samples: Option<usize>,

    /// Override the sampling seed
    #[arg(long)]
    seed: Option<u64>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Draw parameter samples into `<output>/uncertainty_ranges`
    Sample(RunTarget),

    /// Evaluate every scenario and write `<output>/results`
    Run {
        #[command(flatten)]
        target: RunTarget,

        /// Evaluate existing sample sheets instead of drawing new ones
        #[arg(long)]
        reuse_samples: bool,
    },

    /// Summarise result sheets from an earlier run
    Summarize {
        #[command(flatten)]
        target: RunTarget,

        /// Print the summary as JSON
        #[arg(long)]
        json: bool,
    },
}

fn prepare(target: &RunTarget, log_level: &str) -> color_eyre::Result<(AnalysisFile, CsvStore)> {
    init_logging(&target.output, log_level)?;
    let file = AnalysisFile::load(&target.config)?.with_overrides(target.samples, target.seed);
    Ok((file, CsvStore::new(&target.output)))
}

fn report_location(output: &Path) {
    println!("Sheets written under {}", output.display());
}

fn main() -> color_eyre::Result<()> {
    color_eyre::install()?;

    let args = Args::parse();

    match &args.command {
        Command::Sample(target) => {
            let (file, mut store) = prepare(target, &args.log_level)?;
            let set = sample_into(&mut store, &file.parameters, &file.analysis)?;
            println!(
                "Drew {} samples across {} parameter groups",
                set.samples,
                set.tables.len()
            );
            report_location(&target.output);
        }
        Command::Run {
            target,
            reuse_samples,
        } => {
            let (file, mut store) = prepare(target, &args.log_level)?;
            let output = if *reuse_samples {
                run_pipeline(&mut store, &file.analysis, &file.materials)?
            } else {
                sample_and_run(&mut store, &file.parameters, &file.analysis, &file.materials)?
            };
            println!("{}", RunSummary::from_output(&output));
            report_location(&target.output);
        }
        Command::Summarize { target, json } => {
            let (file, store) = prepare(target, &args.log_level)?;
            let summary = RunSummary::from_store(&store, &file.analysis)?;
            if *json {
                println!("{}", serde_json::to_string_pretty(&summary)?);
            } else {
                println!("{summary}");
            }
        }
    }

    tracing::info!("nutrec finished");
    Ok(())
}
