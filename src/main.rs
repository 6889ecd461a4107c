/*!
 * Worker Orchestrator - Main Entry Point
 *
 * Runs a batch of worker processes in parallel, sequentially, or both,
 * and writes the per-mode results plus a speedup report.
 *
 * Exit code is non-zero only for orchestrator-level failures; individual
 * worker failures are recorded in the reports. A batch that cannot run at
 * all (nothing spawned, empty or invalid batch) exits with 2, any other
 * failure with 1.
 */

use anyhow::Context;
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;
use tracing::info;

use worker_orchestrator::report::{render_comparison, render_report};
use worker_orchestrator::{
    init_tracing, BatchFile, ExecutionMode, JsonFileSink, Orchestrator, OrchestratorError, ReportSink,
};

/// Exit code for a batch that could not run at all
const EXIT_BATCH_FATAL: u8 = 2;

#[derive(Parser)]
#[command(name = "orchestrator")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a batch of workers and write the reports
    Run {
        /// Path to the JSON batch file
        #[arg(short, long)]
        batch: PathBuf,

        /// Execution mode
        #[arg(short, long, value_enum, default_value_t = ModeArg::Both)]
        mode: ModeArg,

        /// Directory for results_*.json and report.txt
        #[arg(short, long, default_value = ".")]
        out: PathBuf,

        /// Override the batch file's sampling interval
        #[arg(long)]
        interval_ms: Option<u64>,

        /// Override the batch file's default per-worker timeout
        #[arg(long)]
        timeout_ms: Option<u64>,
    },
    /// Validate a batch file without running it
    Validate {
        /// Path to the JSON batch file
        #[arg(short, long)]
        batch: PathBuf,
    },
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum ModeArg {
    Parallel,
    Sequential,
    Both,
}

fn main() -> ExitCode {
    init_tracing();
    let cli = Cli::parse();

    let outcome = match cli.command {
        Commands::Validate { batch } => validate(batch),
        Commands::Run {
            batch,
            mode,
            out,
            interval_ms,
            timeout_ms,
        } => run(batch, mode, out, interval_ms, timeout_ms),
    };

    match outcome {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => match err.downcast_ref::<OrchestratorError>() {
            Some(diagnostic) => {
                eprintln!("{:?}", miette::Report::new(diagnostic.clone()));
                if diagnostic.is_batch_fatal() {
                    ExitCode::from(EXIT_BATCH_FATAL)
                } else {
                    ExitCode::FAILURE
                }
            }
            None => {
                eprintln!("error: {:#}", err);
                ExitCode::FAILURE
            }
        },
    }
}

fn validate(batch_path: PathBuf) -> anyhow::Result<()> {
    let batch = BatchFile::load(&batch_path)
        .with_context(|| format!("validating batch file {}", batch_path.display()))?;
    println!("Batch is valid: {} workers", batch.workers.len());
    Ok(())
}

fn run(
    batch_path: PathBuf,
    mode: ModeArg,
    out: PathBuf,
    interval_ms: Option<u64>,
    timeout_ms: Option<u64>,
) -> anyhow::Result<()> {
    let batch = BatchFile::load(&batch_path)
        .with_context(|| format!("loading batch file {}", batch_path.display()))?;

    let mut settings = batch.settings.clone();
    if let Some(ms) = interval_ms {
        settings = settings.with_sample_interval(Duration::from_millis(ms));
    }
    if let Some(ms) = timeout_ms {
        settings = settings.with_default_timeout(Duration::from_millis(ms));
    }

    let orchestrator = Orchestrator::builder().with_config(settings).build()?;
    let sink = JsonFileSink::new(&out);

    info!(
        parent_pid = std::process::id(),
        workers = batch.workers.len(),
        mode = ?mode,
        "Orchestrator starting"
    );

    match mode {
        ModeArg::Both => {
            let comparison = orchestrator.run_both(&batch.workers)?;
            sink.persist_comparison(&comparison)?;
            println!("{}", render_comparison(&comparison));
        }
        ModeArg::Parallel | ModeArg::Sequential => {
            let mode = match mode {
                ModeArg::Parallel => ExecutionMode::Parallel,
                _ => ExecutionMode::Sequential,
            };
            let report = orchestrator.run(mode, &batch.workers)?.report();
            sink.persist_report(&report)?;
            println!("{}", render_report(&report));
        }
    }

    info!(out = %out.display(), "Reports saved");
    Ok(())
}
