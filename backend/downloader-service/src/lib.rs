//! vget Downloader Service
//!
//! Consumes task messages from the durable broker in a bounded worker
//! pool, drives the external extractor as a subprocess, digests and
//! registers the produced artifact, publishes progress, and reaps
//! time-limited artifacts on a schedule.

pub mod asset_client;
pub mod config;
pub mod consumer;
pub mod db;
pub mod error;
pub mod grpc;
pub mod pool;
pub mod progress;
pub mod proxy;
pub mod reaper;
pub mod storage;
pub mod ytdlp;

pub use error::{Result, WorkerError};
