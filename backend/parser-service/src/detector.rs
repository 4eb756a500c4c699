//! URL validation, normalization and platform detection.

use once_cell::sync::Lazy;
use regex::Regex;
use url::Url;

use crate::error::{ParserError, Result};

/// Tracking parameters stripped during normalization. Nothing else is
/// touched.
const TRACKING_PARAMS: [&str; 5] = [
    "utm_source",
    "utm_medium",
    "utm_campaign",
    "fbclid",
    "gclid",
];

static PLATFORM_PATTERNS: Lazy<Vec<(&'static str, Regex)>> = Lazy::new(|| {
    // Hardcoded patterns, validated by the tests below.
    vec![
        (
            "youtube",
            Regex::new(r"^https?://(www\.)?(youtube\.com|youtu\.be)/").expect("youtube pattern"),
        ),
        (
            "tiktok",
            Regex::new(r"^https?://([a-z0-9-]+\.)*tiktok\.com/").expect("tiktok pattern"),
        ),
        (
            "bilibili",
            Regex::new(r"^https?://([a-z0-9-]+\.)*bilibili\.com/").expect("bilibili pattern"),
        ),
        (
            "twitter",
            Regex::new(r"^https?://(www\.)?(twitter\.com|x\.com)/").expect("twitter pattern"),
        ),
        (
            "instagram",
            Regex::new(r"^https?://(www\.)?instagram\.com/").expect("instagram pattern"),
        ),
    ]
});

/// Syntactic validity: http/https scheme with a host.
pub fn is_valid_url(raw: &str) -> bool {
    if raw.is_empty() {
        return false;
    }
    match Url::parse(raw) {
        Ok(u) => {
            (u.scheme() == "http" || u.scheme() == "https") && u.host_str().is_some()
        }
        Err(_) => false,
    }
}

/// Strip tracking query parameters; everything else is preserved.
/// Unparsable input is returned untouched. Idempotent.
pub fn normalize_url(raw: &str) -> String {
    let mut parsed = match Url::parse(raw) {
        Ok(u) => u,
        Err(_) => return raw.to_string(),
    };

    let kept: Vec<(String, String)> = parsed
        .query_pairs()
        .filter(|(k, _)| !TRACKING_PARAMS.contains(&k.as_ref()))
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect();

    if kept.is_empty() {
        parsed.set_query(None);
    } else {
        let mut pairs = parsed.query_pairs_mut();
        pairs.clear();
        for (k, v) in &kept {
            pairs.append_pair(k, v);
        }
        drop(pairs);
    }

    parsed.to_string()
}

/// Detect the platform for a URL; unknown hosts fall back to `generic`.
pub fn detect_platform(url: &str) -> Result<&'static str> {
    if !is_valid_url(url) {
        return Err(ParserError::InvalidUrl);
    }

    for (platform, pattern) in PLATFORM_PATTERNS.iter() {
        if pattern.is_match(url) {
            return Ok(*platform);
        }
    }

    Ok("generic")
}

/// Collapse runs of whitespace and trim; used on extractor-provided text
/// fields before they reach storage.
pub fn sanitize_text(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn valid_urls() {
        assert!(is_valid_url("https://youtube.com/watch?v=abc"));
        assert!(is_valid_url("http://example.com/v/1"));
        assert!(!is_valid_url(""));
        assert!(!is_valid_url("ftp://example.com/file"));
        assert!(!is_valid_url("not a url"));
    }

    #[test]
    fn normalization_strips_only_tracking_params() {
        let url = "https://www.youtube.com/watch?v=abc&utm_source=tw&fbclid=123&t=42";
        let normalized = normalize_url(url);
        assert!(normalized.contains("v=abc"));
        assert!(normalized.contains("t=42"));
        assert!(!normalized.contains("utm_source"));
        assert!(!normalized.contains("fbclid"));
    }

    #[test]
    fn normalization_is_idempotent() {
        let url = "https://example.com/v/1?utm_campaign=x&gclid=9&id=7";
        let once = normalize_url(url);
        assert_eq!(normalize_url(&once), once);

        let clean = "https://example.com/v/1";
        assert_eq!(normalize_url(clean), clean);
    }

    #[test]
    fn platform_detection() {
        assert_eq!(detect_platform("https://www.youtube.com/watch?v=a").unwrap(), "youtube");
        assert_eq!(detect_platform("https://youtu.be/a").unwrap(), "youtube");
        assert_eq!(detect_platform("https://vm.tiktok.com/xyz/").unwrap(), "tiktok");
        assert_eq!(detect_platform("https://www.bilibili.com/video/BV1").unwrap(), "bilibili");
        assert_eq!(detect_platform("https://x.com/u/status/1").unwrap(), "twitter");
        assert_eq!(detect_platform("https://www.instagram.com/p/1/").unwrap(), "instagram");
        assert_eq!(detect_platform("https://example.com/v/1").unwrap(), "generic");
        assert_eq!(detect_platform("nope"), Err(ParserError::InvalidUrl));
    }

    #[test]
    fn text_sanitizer_collapses_whitespace() {
        assert_eq!(sanitize_text("  a \t title \n here "), "a title here");
        assert_eq!(sanitize_text(""), "");
    }
}
