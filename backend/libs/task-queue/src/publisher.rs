//! Task publisher with reconnect watchdog.

use anyhow::{anyhow, Context, Result};
use lapin::options::{
    BasicPublishOptions, ExchangeDeclareOptions, QueueBindOptions, QueueDeclareOptions,
};
use lapin::types::FieldTable;
use lapin::{BasicProperties, Channel, Connection, ConnectionProperties, ExchangeKind};
use tokio::sync::Mutex;
use tracing::{error, info, warn};

use vget_common::TaskMessage;

use crate::{reconnect_delay, BrokerConfig, MAX_RECONNECT_ATTEMPTS};

/// AMQP delivery mode 2 marks a message persistent.
const DELIVERY_MODE_PERSISTENT: u8 = 2;

struct Link {
    _conn: Connection,
    channel: Channel,
}

/// Publishes task messages onto the durable queue.
pub struct TaskPublisher {
    cfg: BrokerConfig,
    link: Mutex<Option<Link>>,
}

impl TaskPublisher {
    pub async fn connect(cfg: BrokerConfig) -> Result<Self> {
        let publisher = Self {
            cfg,
            link: Mutex::new(None),
        };
        let link = publisher.open().await?;
        *publisher.link.lock().await = Some(link);
        Ok(publisher)
    }

    /// Open a connection and declare the full topology.
    async fn open(&self) -> Result<Link> {
        let conn = Connection::connect(&self.cfg.url, ConnectionProperties::default())
            .await
            .context("failed to connect to RabbitMQ")?;
        let channel = conn
            .create_channel()
            .await
            .context("failed to open channel")?;

        channel
            .exchange_declare(
                &self.cfg.exchange,
                ExchangeKind::Direct,
                ExchangeDeclareOptions {
                    durable: true,
                    ..Default::default()
                },
                FieldTable::default(),
            )
            .await
            .context("failed to declare exchange")?;

        channel
            .queue_declare(
                &self.cfg.queue,
                QueueDeclareOptions {
                    durable: true,
                    ..Default::default()
                },
                FieldTable::default(),
            )
            .await
            .context("failed to declare queue")?;

        channel
            .queue_bind(
                &self.cfg.queue,
                &self.cfg.exchange,
                &self.cfg.routing_key,
                QueueBindOptions::default(),
                FieldTable::default(),
            )
            .await
            .context("failed to bind queue")?;

        info!(url = %self.cfg.url, exchange = %self.cfg.exchange, "connected to RabbitMQ");
        Ok(Link {
            _conn: conn,
            channel,
        })
    }

    async fn reconnect(&self) -> Result<()> {
        let mut guard = self.link.lock().await;
        for attempt in 0..MAX_RECONNECT_ATTEMPTS {
            match self.open().await {
                Ok(link) => {
                    *guard = Some(link);
                    return Ok(());
                }
                Err(e) => {
                    warn!(attempt = attempt + 1, error = %e, "RabbitMQ reconnect attempt failed");
                    tokio::time::sleep(reconnect_delay(attempt)).await;
                }
            }
        }
        *guard = None;
        Err(anyhow!(
            "failed to reconnect to RabbitMQ after {MAX_RECONNECT_ATTEMPTS} attempts"
        ))
    }

    /// Publish a task with persistent delivery. On a broken channel the
    /// publisher reconnects once (with backoff) and retries the publish.
    pub async fn publish(&self, task: &TaskMessage) -> Result<()> {
        let body = serde_json::to_vec(task).context("failed to serialize task")?;

        if let Err(e) = self.try_publish(&body).await {
            error!(task_id = %task.task_id, error = %e, "publish failed, reconnecting");
            self.reconnect().await?;
            self.try_publish(&body).await?;
        }

        info!(task_id = %task.task_id, queue = %self.cfg.queue, "published task");
        Ok(())
    }

    async fn try_publish(&self, body: &[u8]) -> Result<()> {
        let guard = self.link.lock().await;
        let link = guard
            .as_ref()
            .ok_or_else(|| anyhow!("channel is not available"))?;

        link.channel
            .basic_publish(
                &self.cfg.exchange,
                &self.cfg.routing_key,
                BasicPublishOptions::default(),
                body,
                BasicProperties::default()
                    .with_delivery_mode(DELIVERY_MODE_PERSISTENT)
                    .with_content_type("application/json".to_string().into()),
            )
            .await
            .context("failed to publish message")?
            .await
            .context("broker rejected publish")?;
        Ok(())
    }

    /// Whether the underlying connection is currently usable.
    pub async fn is_connected(&self) -> bool {
        self.link.lock().await.is_some()
    }
}
