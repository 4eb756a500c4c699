//! Artifact reaper: transitions expired quick-mode artifacts from
//! pending_cleanup to expired and removes their files.

use sqlx::PgPool;
use std::path::Path;
use std::time::Duration;
use tokio::sync::watch;
use tracing::{info, warn};

use crate::config::CleanupConfig;
use crate::db::download_repo;
use crate::storage::files;

pub struct Reaper {
    db: PgPool,
    interval: Duration,
    batch_size: i64,
    enabled: bool,
}

impl Reaper {
    pub fn new(cfg: &CleanupConfig, db: PgPool) -> Self {
        Self {
            db,
            interval: Duration::from_secs(cfg.interval_secs),
            batch_size: cfg.batch_size,
            enabled: cfg.enabled,
        }
    }

    /// Tick until shutdown. Runs one sweep immediately at startup.
    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) {
        if !self.enabled {
            info!("reaper disabled");
            return;
        }

        info!(interval = ?self.interval, batch_size = self.batch_size, "reaper started");

        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        // First tick of `interval` fires immediately, giving the
        // startup sweep.
        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    self.sweep(&mut shutdown).await;
                }
                _ = shutdown.changed() => {
                    if *shutdown.borrow() {
                        info!("reaper stopped");
                        return;
                    }
                }
            }
        }
    }

    /// One batch: fetch due rows, delete files, flip rows to expired.
    /// Cancellable between records.
    async fn sweep(&self, shutdown: &mut watch::Receiver<bool>) {
        let records = match download_repo::find_expired(&self.db, self.batch_size).await {
            Ok(r) => r,
            Err(e) => {
                warn!(error = %e, "failed to query expired records");
                return;
            }
        };

        if records.is_empty() {
            return;
        }

        info!(count = records.len(), "reaping expired artifacts");
        let mut reaped = 0usize;
        let mut failed = 0usize;

        for record in records {
            if *shutdown.borrow() {
                info!("shutdown during sweep, stopping");
                return;
            }

            if let Some(path) = record.file_path.as_deref().filter(|p| !p.is_empty()) {
                // Missing files are tolerated; other errors skip the flip
                // so the next sweep retries.
                if let Err(e) = files::delete_file(Path::new(path)).await {
                    warn!(task_id = %record.task_id, path = %path, error = %e, "failed to delete artifact");
                    failed += 1;
                    continue;
                }
            }

            match download_repo::mark_expired(&self.db, &record.task_id).await {
                Ok(()) => reaped += 1,
                Err(e) => {
                    warn!(task_id = %record.task_id, error = %e, "failed to mark expired");
                    failed += 1;
                }
            }
        }

        info!(reaped, failed, "sweep finished");
    }
}
