//! Bridges the broker consumer to the worker pool.

use std::sync::Arc;
use tokio::sync::watch;
use tracing::info;

use task_queue::{BrokerConfig, TaskConsumer};

use crate::pool::{TaskEnvelope, WorkerPool};

pub struct ConsumerLoop {
    consumer: TaskConsumer,
}

impl ConsumerLoop {
    pub async fn connect(cfg: BrokerConfig) -> anyhow::Result<Self> {
        let consumer = TaskConsumer::connect(cfg).await?;
        Ok(Self { consumer })
    }

    /// Pump deliveries into the pool until shutdown. Each delivery stays
    /// unacked until its worker settles it, so the broker redelivers
    /// anything lost to a crash.
    pub async fn run(
        &self,
        pool: Arc<WorkerPool>,
        shutdown: watch::Receiver<bool>,
    ) -> anyhow::Result<()> {
        // Hand-off is fire-and-forget per delivery; the pool channel
        // provides the backpressure.
        let (submit_tx, mut submit_rx) = tokio::sync::mpsc::unbounded_channel::<TaskEnvelope>();

        let pump = {
            let pool = pool.clone();
            tokio::spawn(async move {
                while let Some(envelope) = submit_rx.recv().await {
                    pool.submit(envelope).await;
                }
            })
        };

        let result = self
            .consumer
            .run("downloader-worker", shutdown, move |task, delivery| {
                let _ = submit_tx.send(TaskEnvelope { task, delivery });
            })
            .await;

        let _ = pump.await;
        info!("consumer loop ended");
        result
    }
}
