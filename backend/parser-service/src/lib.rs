//! vget Parser Service
//!
//! Resolves a URL to a platform, serializes yt-dlp metadata queries under
//! a concurrency bound, checks out a cookie and proxy from the asset
//! service for the duration of the query, and caches the normalized
//! result.

pub mod asset_client;
pub mod cache;
pub mod config;
pub mod detector;
pub mod error;
pub mod grpc;
pub mod normalizer;
pub mod service;
pub mod ytdlp;

pub use error::{ParserError, Result};
