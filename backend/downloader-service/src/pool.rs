//! Bounded worker pool.
//!
//! Two layered bounds: a channel of capacity pool_size*2 between the
//! consumer and the workers, and a semaphore of max_concurrent that caps
//! running extractor subprocesses independently of worker count.
//! Workers loop: receive -> acquire semaphore -> process -> release ->
//! ack/nack.

use std::path::Path;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::{mpsc, Mutex, Semaphore};
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use task_queue::{BasicAckOptions, BasicNackOptions, Delivery};
use vget_common::{TaskMessage, TaskMode};

use crate::asset_client::AssetClient;
use crate::config::{RetryConfig, StorageConfig};
use crate::db::download_repo;
use crate::error::{Result, WorkerError};
use crate::progress::{ProgressPublisher, ProgressSample};
use crate::proxy::ProxyProvider;
use crate::storage::{files, paths};
use crate::ytdlp::Executor;

pub struct TaskEnvelope {
    pub task: TaskMessage,
    pub delivery: Delivery,
}

/// Shared dependencies of every worker.
pub struct WorkerContext {
    pub db: sqlx::PgPool,
    pub executor: Executor,
    pub publisher: ProgressPublisher,
    pub proxy_provider: ProxyProvider,
    pub asset_client: Option<AssetClient>,
    pub storage: StorageConfig,
    pub retry: RetryConfig,
}

pub struct WorkerPool {
    task_tx: mpsc::Sender<TaskEnvelope>,
    handles: Vec<JoinHandle<()>>,
}

impl WorkerPool {
    pub fn start(pool_size: usize, max_concurrent: usize, ctx: Arc<WorkerContext>) -> Self {
        let (task_tx, task_rx) = mpsc::channel::<TaskEnvelope>(pool_size * 2);
        let task_rx = Arc::new(Mutex::new(task_rx));
        let semaphore = Arc::new(Semaphore::new(max_concurrent));

        info!(pool_size, max_concurrent, "starting worker pool");

        let mut handles = Vec::with_capacity(pool_size);
        for worker_id in 0..pool_size {
            let rx = task_rx.clone();
            let sem = semaphore.clone();
            let ctx = ctx.clone();
            handles.push(tokio::spawn(async move {
                worker_loop(worker_id, rx, sem, ctx).await;
            }));
        }

        Self { task_tx, handles }
    }

    /// Hand a delivery to the pool. Applies backpressure once the channel
    /// is full; the broker's prefetch bounds what can pile up here.
    pub async fn submit(&self, envelope: TaskEnvelope) {
        if let Err(e) = self.task_tx.send(envelope).await {
            // Pool already shut down; the unacked delivery will be
            // redelivered by the broker.
            error!(error = %e, "failed to submit task to pool");
        }
    }

    /// Close the intake and wait for in-flight tasks to finish.
    pub async fn shutdown(self) {
        drop(self.task_tx);
        for handle in self.handles {
            let _ = handle.await;
        }
        info!("all workers stopped");
    }
}

async fn worker_loop(
    worker_id: usize,
    task_rx: Arc<Mutex<mpsc::Receiver<TaskEnvelope>>>,
    semaphore: Arc<Semaphore>,
    ctx: Arc<WorkerContext>,
) {
    info!(worker_id, "worker started");

    loop {
        let envelope = {
            let mut rx = task_rx.lock().await;
            rx.recv().await
        };
        let Some(TaskEnvelope { task, delivery }) = envelope else {
            info!(worker_id, "channel closed, worker exiting");
            return;
        };

        let permit = match semaphore.acquire().await {
            Ok(p) => p,
            Err(_) => return,
        };

        let task_id = task.task_id.clone();
        info!(worker_id, task_id = %task_id, url = %task.url, "processing task");
        let started = Instant::now();

        let outcome = process_task(&ctx, &task).await;
        drop(permit);

        match outcome {
            Ok(()) => {
                info!(worker_id, task_id = %task_id, elapsed = ?started.elapsed(), "task completed");
                if let Err(e) = delivery.ack(BasicAckOptions::default()).await {
                    warn!(task_id = %task_id, error = %e, "failed to ack delivery");
                }
            }
            Err(e) => {
                error!(worker_id, task_id = %task_id, error = %e, "task failed");
                handle_failure(&ctx, &task, &e).await;
                // Requeue: retry is delegated entirely to the broker's
                // redelivery; the worker itself never retries.
                if let Err(nack_err) = delivery
                    .nack(BasicNackOptions {
                        requeue: true,
                        ..Default::default()
                    })
                    .await
                {
                    warn!(task_id = %task_id, error = %nack_err, "failed to nack delivery");
                }
            }
        }
    }
}

/// The strictly-ordered per-task pipeline.
async fn process_task(ctx: &WorkerContext, task: &TaskMessage) -> Result<()> {
    let task_id = task.task_id.as_str();

    // 1. Flip the row to processing.
    download_repo::update_processing(&ctx.db, task_id).await?;

    // 2. Disk usage gate.
    let base = Path::new(&ctx.storage.base_path);
    tokio::fs::create_dir_all(base).await?;
    let usage = files::disk_usage_percent(base)?;
    if !files::is_disk_space_sufficient(usage) {
        return Err(WorkerError::InsufficientSpace);
    }

    // 3. Proxy: prefer the one captured at parse time.
    let proxy_url = if !task.proxy_url.is_empty() {
        info!(task_id = %task_id, "using proxy captured at parse time");
        task.proxy_url.clone()
    } else {
        ctx.proxy_provider.get_proxy_with_retry().await?
    };

    // 4. Output path.
    let output_path = paths::generate_output_path(base, task).await?;
    let output_str = output_path.to_string_lossy().into_owned();

    // 5. Cookie materialization, cleaned up on all exit paths below.
    let mut cookie_file = String::new();
    if task.cookie_id > 0 {
        if let Some(client) = &ctx.asset_client {
            match client.materialize_cookie(task.cookie_id, task_id).await {
                Ok(path) => cookie_file = path.to_string_lossy().into_owned(),
                Err(e) => {
                    warn!(task_id = %task_id, error = %e, "cookie fetch failed, continuing without")
                }
            }
        }
    }

    // 6. Run the extractor, forwarding each parsed sample to the fabric.
    let (sample_tx, mut sample_rx) = mpsc::unbounded_channel::<ProgressSample>();
    let forwarder = {
        let publisher = ctx.publisher.clone();
        let task_id = task_id.to_string();
        tokio::spawn(async move {
            while let Some(sample) = sample_rx.recv().await {
                publisher.publish_downloading(&task_id, &sample).await;
            }
        })
    };

    let download_result = ctx
        .executor
        .download(task, &proxy_url, &output_str, &cookie_file, sample_tx)
        .await;
    let _ = forwarder.await;

    // 7. Report cookie usage; success means a clean extractor exit.
    if task.cookie_id > 0 {
        if let Some(client) = &ctx.asset_client {
            client
                .report_cookie_usage(task.cookie_id, download_result.is_ok())
                .await;
            if !cookie_file.is_empty() {
                client.cleanup_cookie_file(Path::new(&cookie_file)).await;
            }
        }
    }
    download_result?;

    // 8. Digest and size.
    let file_size = files::file_size(&output_path).await?;
    let file_hash = files::calculate_md5(&output_path).await?;
    let file_name = output_path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| task_id.to_string());

    // 9. Quick-mode artifacts expire.
    let expire_at = match task.mode {
        TaskMode::QuickDownload => {
            Some(chrono::Utc::now() + chrono::Duration::seconds(ctx.storage.tmp_ttl_secs))
        }
        TaskMode::Archive => None,
    };

    // 10. Terminal row update.
    download_repo::update_complete(
        &ctx.db,
        task_id,
        &output_str,
        &file_name,
        &file_hash,
        file_size,
        expire_at,
    )
    .await?;

    // 11. Terminal progress event.
    ctx.publisher
        .publish_completed(task_id, "Download completed", Some(file_size))
        .await;

    info!(task_id = %task_id, file = %output_str, size = file_size, "task pipeline finished");
    Ok(())
}

/// Failure path: record, publish, and let the caller nack.
async fn handle_failure(ctx: &WorkerContext, task: &TaskMessage, err: &WorkerError) {
    let message = err.to_string();

    ctx.publisher.publish_failed(&task.task_id, &message).await;

    if let Err(db_err) = download_repo::update_failed(&ctx.db, &task.task_id, &message).await {
        warn!(task_id = %task.task_id, error = %db_err, "failed to record failure");
    }
}
