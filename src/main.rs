use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::process::ExitCode;

use cur2png::config::Config;
use cur2png::event::PipelineMsg;
use cur2png::pipeline::fs_ops::default_output_dir;
use cur2png::pipeline_worker::PipelineWorker;

#[derive(Parser)]
#[command(name = "cur2png")]
#[command(about = "Convert a tree of Windows cursors to PNG images", long_about = None)]
#[command(version)]
struct Cli {
    /// Folder containing .cur / .ani files, searched recursively
    /// (default: `input_dir` from the config file)
    target: Option<PathBuf>,

    /// Output folder (default: <TARGET>_png next to the target)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Worker threads, 0 = one per CPU
    #[arg(short = 'j', long)]
    threads: Option<usize>,

    /// Config file (default: <config dir>/cur2png/config.toml)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Log every file
    #[arg(short, long, conflicts_with = "quiet")]
    verbose: bool,

    /// Only log warnings and errors
    #[arg(short, long)]
    quiet: bool,
}

fn init_logging(cli: &Cli) {
    let default_level = if cli.verbose {
        "debug"
    } else if cli.quiet {
        "warn"
    } else {
        "info"
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .format_timestamp(None)
        .init();
}

fn resolve_config(cli: &Cli) -> Result<(Config, PathBuf)> {
    let mut config = Config::load(cli.config.as_deref())?;

    let input_dir = config.resolve_input_dir(cli.target.as_deref())?;
    if let Some(output) = &cli.output {
        config.output_dir = Some(output.clone());
    }
    if let Some(threads) = cli.threads {
        config.thread_count = threads;
    }
    Ok((config, input_dir))
}

fn run(cli: &Cli) -> Result<bool> {
    let (config, input_dir) = resolve_config(cli)?;
    let output_dir = config
        .output_dir
        .clone()
        .unwrap_or_else(|| default_output_dir(&input_dir));

    let (worker, rx) = PipelineWorker::with_channel();
    let handle =
        worker.start_cur_to_png_conversion(input_dir, output_dir, config.conversion_options());
    // The batch thread holds the only remaining sender, so `rx` closes if it dies.
    drop(worker);

    let mut outcome = None;
    for msg in rx.iter() {
        match msg {
            PipelineMsg::PipelineStarted => {}
            PipelineMsg::LogMessage(text) => log::info!("{}", text),
            PipelineMsg::FileConverted(file) => log::debug!(
                "Converted {} -> {} ({}x{}, hotspot {:?})",
                file.source_path.display(),
                file.output_path.display(),
                file.width,
                file.height,
                file.hotspot
            ),
            PipelineMsg::FileFailed(_) => {}
            PipelineMsg::PipelineProgress(done, total) => {
                log::debug!("Progress {}/{}", done, total)
            }
            PipelineMsg::PipelineCompleted(report) => {
                outcome = Some(Ok(report));
                break;
            }
            PipelineMsg::PipelineFailed(e) => {
                outcome = Some(Err(anyhow::anyhow!(e)));
                break;
            }
        }
    }
    let _ = handle.join();

    let report = outcome.context("Pipeline stopped without a result")??;

    println!(
        "Successfully created {} files! (Errors: {})",
        report.succeeded(),
        report.failed()
    );
    for failure in &report.failures {
        println!(
            "Error: {}: {} || File: {}",
            failure.kind,
            failure.message,
            failure.source_path.display()
        );
    }

    Ok(report.failed() == 0)
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(&cli);

    match run(&cli) {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}
