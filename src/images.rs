//! Derivative image download
//!
//! A plain fetch-and-save loop: one JPEG per pid, skipped when the target
//! file already exists so an interrupted run can simply be restarted. A fixed
//! pacing delay between downloads bounds load on the upstream server.

use std::path::PathBuf;
use std::time::Duration;

use tracing::info;

use crate::error::ExportError;
use crate::input::load_pids;
use crate::pipeline::CancelFlag;
use crate::repository::Repository;

/// Default pacing delay between downloads.
pub const DEFAULT_DELAY: Duration = Duration::from_secs(3);

/// Options for one download run.
#[derive(Debug, Clone)]
pub struct ImageOptions {
    pub pid_file: PathBuf,
    pub output_dir: PathBuf,
    /// Pacing delay between downloads (not applied before the first).
    pub delay: Duration,
}

/// Statistics from one download run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImageStats {
    pub downloaded: usize,
    pub skipped: usize,
}

/// Download the derivative image for every pid in the list.
pub fn download_images<R: Repository + ?Sized>(
    repo: &R,
    options: &ImageOptions,
    cancel: &CancelFlag,
) -> Result<ImageStats, ExportError> {
    std::fs::create_dir_all(&options.output_dir)?;
    let pids = load_pids(&options.pid_file)?;
    info!("loaded {} pids from {}", pids.len(), options.pid_file.display());

    let mut stats = ImageStats::default();
    for pid in &pids {
        if cancel.is_cancelled() {
            info!("cancellation requested; stopping before {}", pid);
            break;
        }

        let filename = format!("{}.jpg", pid.replacen(':', "_", 1));
        let outfile = options.output_dir.join(filename);
        if outfile.exists() {
            info!("skipping {}: {} already exists", pid, outfile.display());
            stats.skipped += 1;
            continue;
        }

        if stats.downloaded > 0 && !options.delay.is_zero() {
            std::thread::sleep(options.delay);
        }

        info!("downloading {}", pid);
        let bytes = repo.image_bytes(pid)?;
        std::fs::write(&outfile, bytes)?;
        stats.downloaded += 1;
    }

    Ok(stats)
}
