//! vget Common Library
//!
//! Shared types and utilities for all vget services: the cross-service
//! error taxonomy, the YAML + environment configuration loader, and the
//! wire models carried over the task broker and the progress fabric.

pub mod config;
pub mod error;
pub mod models;

pub use error::{Result, ServiceError};
pub use models::{HistoryStatus, ProgressEvent, ProgressStatus, TaskMessage, TaskMode};
