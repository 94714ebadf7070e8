// Clippy project config
#![warn(clippy::unwrap_used)]

use clap::Parser;
use gdownloader::config::Config;
use gdownloader::resolver::NativeResolver;
use gdownloader::{
    get_data_dir, DownloadEvent, DownloadFormat, DownloadRequest, ItemFailurePolicy, Orchestrator,
    Percentage, Result, RunOutcome,
};
use std::io::Write;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tracing::info;
use tracing_subscriber::filter::Targets;
use tracing_subscriber::prelude::*;

const LOG_FILE_NAME: &str = "debug.log";
const PROGRESS_BAR_WIDTH: usize = 40;

#[derive(Parser, Debug)]
#[command(author,version,about,long_about=None)]
/// Download a YouTube video or playlist, optionally as audio only.
struct Arguments {
    /// Video or playlist URL. You will be prompted for one if not provided.
    url: Option<String>,
    /// Directory to save downloads to. Overrides the config file.
    #[arg(short, long)]
    output: Option<PathBuf>,
    /// Overrides the config file.
    #[arg(value_enum, short, long)]
    format: Option<DownloadFormat>,
    /// What to do when one video of a playlist fails. Overrides the config
    /// file.
    #[arg(value_enum, long)]
    on_item_error: Option<ItemFailurePolicy>,
    /// Log additional debug information to a file.
    #[arg(short, long, default_value_t = false)]
    debug: bool,
}

#[tokio::main]
async fn main() -> ExitCode {
    // Using match to print error using Display instead of Debug.
    match try_main().await {
        Ok(RunOutcome::Aborted { .. }) => ExitCode::FAILURE,
        Ok(_) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{e}");
            ExitCode::FAILURE
        }
    }
}

async fn try_main() -> Result<RunOutcome> {
    let Arguments {
        url,
        output,
        format,
        on_item_error,
        debug,
    } = Arguments::parse();
    init_tracing(debug)?;
    let config = Config::new()?;
    let url = match url {
        Some(url) => url,
        None => prompt_for_url().await?,
    };
    // Command line flags override the config file.
    let request = DownloadRequest::new(
        url,
        output.unwrap_or_else(|| config.download_dir()),
        format.unwrap_or(config.download_format),
    )?;
    let orchestrator = Orchestrator::new(NativeResolver::new(config.chunk_size_bytes)?)
        .with_failure_policy(on_item_error.unwrap_or(config.on_item_error));
    let (tx, mut rx) = mpsc::unbounded_channel();
    let mut handle = orchestrator.run(request, tx)?;
    let mut renderer = Renderer::default();
    loop {
        tokio::select! {
            event = rx.recv() => match event {
                Some(event) => renderer.render(event),
                // Sender is dropped once the run has finished.
                None => break,
            },
            Ok(()) = tokio::signal::ctrl_c() => {
                info!("Ctrl-C received, cancelling download");
                handle.cancel()
            }
        }
    }
    renderer.finish();
    handle.wait().await
}

async fn prompt_for_url() -> Result<String> {
    print!("Enter YouTube URL or playlist URL: ");
    std::io::stdout().flush()?;
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    Ok(lines.next_line().await?.unwrap_or_default())
}

/// Progress goes to a single rewritten line on stderr, log lines to stdout.
#[derive(Default)]
struct Renderer {
    progress_visible: bool,
}

impl Renderer {
    fn render(&mut self, event: DownloadEvent) {
        match event {
            DownloadEvent::Progress(percentage) => {
                eprint!("\r{}", progress_bar(percentage));
                self.progress_visible = true;
            }
            DownloadEvent::Log(line) => {
                self.finish();
                println!("{line}");
            }
        }
    }
    fn finish(&mut self) {
        if self.progress_visible {
            eprintln!();
            self.progress_visible = false;
        }
    }
}

fn progress_bar(percentage: Percentage) -> String {
    let Percentage(p) = percentage;
    let filled = PROGRESS_BAR_WIDTH * p.min(100) as usize / 100;
    format!(
        "[{}{}] {:>3}%",
        "#".repeat(filled),
        " ".repeat(PROGRESS_BAR_WIDTH - filled),
        p
    )
}

/// Initialise tracing. Warnings and errors go to stderr; in debug mode
/// everything from debug level up is also written to a log file.
/// # Panics
/// If tracing fails to initialise, function will panic
fn init_tracing(debug: bool) -> Result<()> {
    let stderr_layer = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .with_filter(Targets::new().with_target("gdownloader", tracing::Level::WARN));
    if debug {
        let data_dir = get_data_dir()?;
        fs_err::create_dir_all(&data_dir)?;
        let log_file_name = data_dir.join(LOG_FILE_NAME);
        let log_file = std::fs::File::create(&log_file_name)?;
        let log_file_layer = tracing_subscriber::fmt::layer()
            .with_writer(Arc::new(log_file))
            .with_ansi(false)
            .with_filter(Targets::new().with_target("gdownloader", tracing::Level::DEBUG));
        tracing_subscriber::registry()
            .with(stderr_layer)
            .with(log_file_layer)
            .init();
        info!("Started in debug mode, logging to {:?}.", log_file_name);
    } else {
        tracing_subscriber::registry().with(stderr_layer).init();
    }
    Ok(())
}
