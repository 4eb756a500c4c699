//! Manual-ack task consumer.

use anyhow::{Context, Result};
use futures_util::StreamExt;
use lapin::options::{
    BasicConsumeOptions, BasicNackOptions, BasicQosOptions, QueueDeclareOptions,
};
use lapin::types::FieldTable;
use lapin::{Channel, Connection, ConnectionProperties};
use tokio::sync::watch;
use tracing::{info, warn};

use vget_common::TaskMessage;

use crate::BrokerConfig;

/// Consumes task messages with manual acknowledgement and bounded
/// prefetch. Each delivery is handed to the submit callback together with
/// its `Delivery`, whose acker settles the message once processing ends.
pub struct TaskConsumer {
    _conn: Connection,
    channel: Channel,
    cfg: BrokerConfig,
}

impl TaskConsumer {
    pub async fn connect(cfg: BrokerConfig) -> Result<Self> {
        let conn = Connection::connect(&cfg.url, ConnectionProperties::default())
            .await
            .context("failed to connect to RabbitMQ")?;
        let channel = conn
            .create_channel()
            .await
            .context("failed to open channel")?;

        channel
            .queue_declare(
                &cfg.queue,
                QueueDeclareOptions {
                    durable: true,
                    ..Default::default()
                },
                FieldTable::default(),
            )
            .await
            .context("failed to declare queue")?;

        channel
            .basic_qos(cfg.prefetch_count, BasicQosOptions::default())
            .await
            .context("failed to set prefetch")?;

        info!(queue = %cfg.queue, prefetch = cfg.prefetch_count, "task consumer connected");

        Ok(Self {
            _conn: conn,
            channel,
            cfg,
        })
    }

    /// Drive the delivery loop until the channel closes or shutdown fires.
    ///
    /// Unparsable payloads are nacked without requeue; everything else is
    /// handed off with its delivery handle still unsettled.
    pub async fn run<F>(
        &self,
        consumer_tag: &str,
        mut shutdown: watch::Receiver<bool>,
        mut submit: F,
    ) -> Result<()>
    where
        F: FnMut(TaskMessage, lapin::message::Delivery),
    {
        let mut deliveries = self
            .channel
            .basic_consume(
                &self.cfg.queue,
                consumer_tag,
                BasicConsumeOptions::default(),
                FieldTable::default(),
            )
            .await
            .context("failed to start consuming")?;

        info!(queue = %self.cfg.queue, "started consuming");

        loop {
            tokio::select! {
                _ = shutdown.changed() => {
                    if *shutdown.borrow() {
                        info!("shutdown signal received, stopping consumer");
                        break;
                    }
                }
                delivery = deliveries.next() => {
                    match delivery {
                        Some(Ok(delivery)) => {
                            match serde_json::from_slice::<TaskMessage>(&delivery.data) {
                                Ok(task) => {
                                    info!(task_id = %task.task_id, "received task");
                                    submit(task, delivery);
                                }
                                Err(e) => {
                                    warn!(error = %e, "failed to parse task, dropping");
                                    let _ = delivery
                                        .nack(BasicNackOptions { requeue: false, ..Default::default() })
                                        .await;
                                }
                            }
                        }
                        Some(Err(e)) => {
                            warn!(error = %e, "consumer error");
                        }
                        None => {
                            warn!("delivery stream ended");
                            break;
                        }
                    }
                }
            }
        }

        info!("task consumer stopped");
        Ok(())
    }
}
