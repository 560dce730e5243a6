//! Background sweeper reclaiming expired sessions and uploads.
//!
//! Every interval, each direct child of the output and uploads roots is
//! compared against the retention threshold and removed once it is older. A
//! directory's age is taken from the newest of its own mtime and its
//! children's. Removal is best-effort: a failing entry is
//! logged and counted, and the sweep moves on.

use std::path::Path;
use std::time::{Duration, SystemTime};

use metrics::counter;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::error::StorageResult;
use crate::layout::StorageLayout;

/// Interval between sweeps.
pub const DEFAULT_SWEEP_INTERVAL: Duration = Duration::from_secs(5 * 60);
/// Age after which an entry is removed.
pub const DEFAULT_RETENTION_THRESHOLD: Duration = Duration::from_secs(5 * 60);

/// Counter of entries removed by the sweeper.
pub const SWEEP_REMOVED_TOTAL: &str = "rclip_sweep_removed_total";
/// Counter of entries the sweeper failed to remove.
pub const SWEEP_FAILED_TOTAL: &str = "rclip_sweep_failed_total";

/// Outcome of one sweep.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepReport {
    pub removed: usize,
    pub retained: usize,
    pub failed: usize,
}

impl SweepReport {
    fn merge(&mut self, other: SweepReport) {
        self.removed += other.removed;
        self.retained += other.retained;
        self.failed += other.failed;
    }
}

/// Periodic deletion of entries older than the retention threshold.
#[derive(Debug, Clone)]
pub struct RetentionSweeper {
    layout: StorageLayout,
    interval: Duration,
    threshold: Duration,
}

impl RetentionSweeper {
    pub fn new(layout: StorageLayout) -> Self {
        Self {
            layout,
            interval: DEFAULT_SWEEP_INTERVAL,
            threshold: DEFAULT_RETENTION_THRESHOLD,
        }
    }

    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    pub fn with_threshold(mut self, threshold: Duration) -> Self {
        self.threshold = threshold;
        self
    }

    /// Start the sweep loop on the current runtime.
    ///
    /// Missing roots are created first. The loop runs until
    /// [`SweeperHandle::shutdown`] is called or the handle is dropped.
    pub async fn spawn(self) -> StorageResult<SweeperHandle> {
        self.layout.ensure_dirs().await?;

        let (shutdown_tx, mut shutdown_rx) = watch::channel(false);

        info!(
            "Starting retention sweeper (interval: {:?}, threshold: {:?})",
            self.interval, self.threshold
        );

        let task = tokio::spawn(async move {
            let mut ticker = interval(self.interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            // The first tick completes immediately
            ticker.tick().await;

            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        self.sweep_once().await;
                    }
                    changed = shutdown_rx.changed() => {
                        if changed.is_err() || *shutdown_rx.borrow() {
                            break;
                        }
                    }
                }
            }

            info!("Retention sweeper stopped");
        });

        Ok(SweeperHandle {
            shutdown_tx,
            task: Some(task),
        })
    }

    /// Run one sweep against the current time.
    pub async fn sweep_once(&self) -> SweepReport {
        self.sweep_at(SystemTime::now()).await
    }

    /// Run one sweep, treating `now` as the current time.
    pub async fn sweep_at(&self, now: SystemTime) -> SweepReport {
        let mut report = SweepReport::default();
        for root in self.layout.roots() {
            report.merge(self.sweep_root(root, now).await);
        }

        if report.removed > 0 || report.failed > 0 {
            info!(
                removed = report.removed,
                retained = report.retained,
                failed = report.failed,
                "Retention sweep complete"
            );
        }
        counter!(SWEEP_REMOVED_TOTAL).increment(report.removed as u64);
        counter!(SWEEP_FAILED_TOTAL).increment(report.failed as u64);

        report
    }

    async fn sweep_root(&self, root: &Path, now: SystemTime) -> SweepReport {
        let mut report = SweepReport::default();

        let mut entries = match tokio::fs::read_dir(root).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!("Sweep root {} does not exist", root.display());
                return report;
            }
            Err(e) => {
                warn!("Failed to read sweep root {}: {}", root.display(), e);
                report.failed += 1;
                return report;
            }
        };

        loop {
            let entry = match entries.next_entry().await {
                Ok(Some(entry)) => entry,
                Ok(None) => break,
                Err(e) => {
                    warn!("Failed to read entry in {}: {}", root.display(), e);
                    report.failed += 1;
                    break;
                }
            };

            let path = entry.path();
            match self.sweep_entry(&path, now).await {
                Ok(true) => {
                    debug!("Removed expired {}", path.display());
                    report.removed += 1;
                }
                Ok(false) => report.retained += 1,
                Err(e) => {
                    warn!("Failed to remove {}: {}", path.display(), e);
                    report.failed += 1;
                }
            }
        }

        report
    }

    /// Remove `path` if it is older than the threshold. Returns whether it was removed.
    async fn sweep_entry(&self, path: &Path, now: SystemTime) -> std::io::Result<bool> {
        let meta = tokio::fs::symlink_metadata(path).await?;
        let modified = if meta.is_dir() {
            newest_modification(path, meta.modified()?).await?
        } else {
            meta.modified()?
        };

        // Entries from the future have age zero
        let age = now.duration_since(modified).unwrap_or_default();
        if age <= self.threshold {
            return Ok(false);
        }

        if meta.is_dir() {
            tokio::fs::remove_dir_all(path).await?;
        } else {
            tokio::fs::remove_file(path).await?;
        }
        Ok(true)
    }
}

/// Latest mtime among a directory and its direct children.
///
/// A directory's own mtime only moves when entries are added or removed, so a
/// clip still being appended to keeps its session fresh through the file.
async fn newest_modification(dir: &Path, dir_modified: SystemTime) -> std::io::Result<SystemTime> {
    let mut newest = dir_modified;
    let mut entries = tokio::fs::read_dir(dir).await?;

    while let Some(entry) = entries.next_entry().await? {
        // Children can vanish between listing and stat
        let modified = match entry.metadata().await.and_then(|m| m.modified()) {
            Ok(modified) => modified,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => continue,
            Err(e) => return Err(e),
        };
        newest = newest.max(modified);
    }

    Ok(newest)
}

/// Handle to a running sweep loop.
#[derive(Debug)]
pub struct SweeperHandle {
    shutdown_tx: watch::Sender<bool>,
    task: Option<JoinHandle<()>>,
}

impl SweeperHandle {
    /// Stop the loop and wait for it to exit.
    pub async fn shutdown(mut self) {
        let _ = self.shutdown_tx.send(true);
        if let Some(task) = self.task.take() {
            if let Err(e) = task.await {
                warn!("Retention sweeper task ended abnormally: {}", e);
            }
        }
    }
}

impl Drop for SweeperHandle {
    fn drop(&mut self) {
        let _ = self.shutdown_tx.send(true);
    }
}
