//! Durable task broker glue over RabbitMQ.
//!
//! Topology: a durable direct exchange bound to a durable queue with a
//! fixed routing key. Producers publish persistent `application/json`
//! deliveries; consumers use manual acknowledgement with a bounded
//! prefetch. Delivery is at-least-once; the downloader is idempotent by
//! task id.

pub mod consumer;
pub mod publisher;

pub use consumer::TaskConsumer;
pub use publisher::TaskPublisher;

// Re-exported so consumers can ack/nack without naming lapin directly.
pub use lapin::message::Delivery;
pub use lapin::options::{BasicAckOptions, BasicNackOptions};

use serde::Deserialize;

/// Broker connection and topology settings.
#[derive(Debug, Clone, Deserialize)]
pub struct BrokerConfig {
    pub url: String,
    pub exchange: String,
    pub queue: String,
    pub routing_key: String,
    #[serde(default = "default_prefetch")]
    pub prefetch_count: u16,
}

fn default_prefetch() -> u16 {
    1
}

/// Reconnect policy shared by publisher and consumer watchdogs.
pub(crate) const MAX_RECONNECT_ATTEMPTS: u32 = 5;

pub(crate) fn reconnect_delay(attempt: u32) -> std::time::Duration {
    std::time::Duration::from_secs(u64::from(attempt) + 1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reconnect_delay_grows_per_attempt() {
        assert_eq!(reconnect_delay(0).as_secs(), 1);
        assert_eq!(reconnect_delay(4).as_secs(), 5);
    }

    #[test]
    fn prefetch_defaults_when_missing() {
        let cfg: BrokerConfig = serde_json::from_str(
            r#"{"url":"amqp://localhost","exchange":"vget","queue":"vget.download","routing_key":"download"}"#,
        )
        .unwrap();
        assert_eq!(cfg.prefetch_count, 1);
    }
}
