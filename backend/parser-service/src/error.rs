//! Parser error taxonomy and the yt-dlp stderr classifier.

use thiserror::Error;
use vget_common::ServiceError;

pub type Result<T> = std::result::Result<T, ParserError>;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ParserError {
    #[error("invalid URL")]
    InvalidUrl,

    #[error("unsupported platform")]
    UnsupportedPlatform,

    #[error("video not found")]
    VideoNotFound,

    #[error("video is private")]
    VideoPrivate,

    #[error("video has been deleted")]
    VideoDeleted,

    #[error("video is geo-restricted")]
    GeoRestricted,

    #[error("video is age-restricted")]
    AgeRestricted,

    #[error("video removed due to copyright claim")]
    CopyrightClaim,

    #[error("parse timeout")]
    Timeout,

    #[error("extractor binary not found")]
    ExtractorNotFound,

    #[error("extractor failed: {0}")]
    ExtractorFailed(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl ParserError {
    /// Only the timeout class is transient; every other class is terminal
    /// for this URL.
    pub fn is_transient(&self) -> bool {
        matches!(self, ParserError::Timeout)
    }
}

/// Map the extractor's stderr onto the error taxonomy.
pub fn classify_stderr(stderr: &str) -> ParserError {
    let lower = stderr.to_lowercase();

    if lower.contains("video unavailable") {
        ParserError::VideoNotFound
    } else if lower.contains("private video") {
        ParserError::VideoPrivate
    } else if lower.contains("has been deleted") {
        ParserError::VideoDeleted
    } else if lower.contains("not available in your country") {
        ParserError::GeoRestricted
    } else if lower.contains("age-restricted") {
        ParserError::AgeRestricted
    } else if lower.contains("copyright") {
        ParserError::CopyrightClaim
    } else if lower.contains("no such file") {
        ParserError::ExtractorNotFound
    } else if lower.contains("timed out") || lower.contains("timeout") {
        ParserError::Timeout
    } else {
        ParserError::ExtractorFailed(stderr.chars().take(500).collect())
    }
}

impl From<ParserError> for ServiceError {
    fn from(err: ParserError) -> Self {
        match &err {
            ParserError::InvalidUrl | ParserError::UnsupportedPlatform => {
                ServiceError::InvalidInput(err.to_string())
            }
            ParserError::VideoNotFound | ParserError::VideoDeleted => {
                ServiceError::NotFound(err.to_string())
            }
            ParserError::Timeout => ServiceError::UpstreamTimeout(err.to_string()),
            ParserError::Internal(msg) => ServiceError::Internal(msg.clone()),
            ParserError::ExtractorNotFound => ServiceError::Internal(err.to_string()),
            _ => ServiceError::UpstreamFailed(err.to_string()),
        }
    }
}

impl From<ParserError> for tonic::Status {
    fn from(err: ParserError) -> Self {
        ServiceError::from(err).into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifier_table() {
        assert_eq!(
            classify_stderr("ERROR: Video unavailable"),
            ParserError::VideoNotFound
        );
        assert_eq!(
            classify_stderr("ERROR: Private video. Sign in"),
            ParserError::VideoPrivate
        );
        assert_eq!(
            classify_stderr("This video has been deleted"),
            ParserError::VideoDeleted
        );
        assert_eq!(
            classify_stderr("The uploader has not made this video not available in your country"),
            ParserError::GeoRestricted
        );
        assert_eq!(
            classify_stderr("Sign in to confirm your age. This video is age-restricted"),
            ParserError::AgeRestricted
        );
        assert_eq!(
            classify_stderr("removed due to a copyright claim"),
            ParserError::CopyrightClaim
        );
        assert_eq!(
            classify_stderr("Connection timed out"),
            ParserError::Timeout
        );
        assert!(matches!(
            classify_stderr("something novel went wrong"),
            ParserError::ExtractorFailed(_)
        ));
    }

    #[test]
    fn only_timeout_is_transient() {
        assert!(ParserError::Timeout.is_transient());
        assert!(!ParserError::VideoPrivate.is_transient());
        assert!(!ParserError::ExtractorFailed("x".into()).is_transient());
    }
}
