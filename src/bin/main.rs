//! Fedora Export CLI
//!
//! Command-line tool for exporting repository metadata into CSV files and
//! downloading derivative images.

use std::path::PathBuf;
use std::time::Duration;

use clap::{Args, Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use fedora_export::{
    download_images, run_export, CancelFlag, ExportError, ExportOptions, HttpRepository,
    ImageOptions, DEFAULT_BASE_URL, DEFAULT_DELAY, DEFAULT_TIMEOUT,
};

#[derive(Parser)]
#[command(name = "fedora-export")]
#[command(about = "Export digital-object metadata from a Fedora repository into CSV files")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Export item, collection, and file records for a list of pids
    Export(ExportArgs),
    /// Download derivative images for a list of pids
    Images(ImagesArgs),
}

#[derive(Args)]
struct ExportArgs {
    /// File with one object identifier per line
    pid_file: PathBuf,

    /// Path prefix for the generated output files
    output_prefix: String,

    /// Repository base URL
    #[arg(long, default_value = DEFAULT_BASE_URL)]
    base_url: String,

    /// Per-request timeout in seconds
    #[arg(long, default_value_t = DEFAULT_TIMEOUT.as_secs())]
    timeout: u64,

    /// Skip pids completed by a previous run and append to its output
    #[arg(long)]
    resume: bool,
}

#[derive(Args)]
struct ImagesArgs {
    /// File with one object identifier per line
    pid_file: PathBuf,

    /// Directory for the downloaded images
    output_dir: PathBuf,

    /// Repository base URL
    #[arg(long, default_value = DEFAULT_BASE_URL)]
    base_url: String,

    /// Per-request timeout in seconds
    #[arg(long, default_value_t = DEFAULT_TIMEOUT.as_secs())]
    timeout: u64,

    /// Pacing delay between downloads, in seconds
    #[arg(long, default_value_t = DEFAULT_DELAY.as_secs())]
    delay: u64,
}

fn run_export_command(args: ExportArgs) -> Result<(), ExportError> {
    let repo = HttpRepository::new(&args.base_url, Duration::from_secs(args.timeout))?;
    let options = ExportOptions {
        pid_file: args.pid_file,
        output_prefix: args.output_prefix,
        resume: args.resume,
    };

    let stats = run_export(&repo, &options, &CancelFlag::new())?;
    tracing::info!(
        "exported {} of {} processed pids ({} collections skipped, {} unknown, {} failed)",
        stats.exported,
        stats.processed,
        stats.collections_skipped,
        stats.unknown_skipped,
        stats.failed
    );
    Ok(())
}

fn run_images_command(args: ImagesArgs) -> Result<(), ExportError> {
    let repo = HttpRepository::new(&args.base_url, Duration::from_secs(args.timeout))?;
    let options = ImageOptions {
        pid_file: args.pid_file,
        output_dir: args.output_dir,
        delay: Duration::from_secs(args.delay),
    };

    let stats = download_images(&repo, &options, &CancelFlag::new())?;
    tracing::info!(
        "downloaded {} images ({} already present)",
        stats.downloaded,
        stats.skipped
    );
    Ok(())
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Export(args) => run_export_command(args),
        Commands::Images(args) => run_images_command(args),
    };

    if let Err(e) = result {
        tracing::error!("{}", e);
        std::process::exit(1);
    }
}
