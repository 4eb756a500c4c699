//! Format normalization and priority scoring.

use serde::{Deserialize, Serialize};

use crate::ytdlp::RawFormat;

/// A normalized candidate format, sorted by `score` descending.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NormalizedFormat {
    pub format_id: String,
    pub quality: String,
    pub extension: String,
    pub filesize: i64,
    pub height: i32,
    pub width: i32,
    pub fps: f64,
    pub video_codec: String,
    pub audio_codec: String,
    pub score: i32,
}

/// Derive the stable quality label from pixel height.
pub fn quality_label(height: i32) -> &'static str {
    match height {
        h if h >= 2160 => "4K",
        h if h >= 1440 => "2K",
        h if h >= 1080 => "1080p",
        h if h >= 720 => "720p",
        h if h >= 480 => "480p",
        h if h >= 360 => "360p",
        _ => "240p",
    }
}

/// Extract height from a resolution string: "1920x1080" or "1080p".
fn extract_height(resolution: &str) -> i32 {
    if resolution.is_empty() {
        return 0;
    }
    if let Some((_, h)) = resolution.split_once('x') {
        return h.parse().unwrap_or(0);
    }
    resolution.trim_end_matches('p').parse().unwrap_or(0)
}

/// Priority score: height dominates, then codec, audio presence,
/// container, fps.
fn score(format: &RawFormat, height: i32) -> i32 {
    let mut score = height * 10;

    score += match format.vcodec.as_deref() {
        Some(v) if v.starts_with("h264") || v.starts_with("avc1") => 100,
        Some(v) if v.starts_with("hevc") || v.starts_with("h265") => 90,
        Some(v) if v.starts_with("vp9") => 80,
        _ => 0,
    };

    if matches!(format.acodec.as_deref(), Some(a) if a != "none" && !a.is_empty()) {
        score += 50;
    }

    if format.ext.as_deref() == Some("mp4") {
        score += 30;
    }

    let fps = format.fps.unwrap_or(0.0);
    if fps >= 60.0 {
        score += 20;
    } else if fps >= 30.0 {
        score += 10;
    }

    score
}

/// Normalize the extractor's raw format list.
///
/// Storyboard entries (no video, no audio) are dropped; audio-only
/// entries get the "audio" label; the rest get a height-derived label.
/// Output is sorted by score descending with a stable sort, so identical
/// inputs always produce identical output. Idempotent over its own
/// output shape.
pub fn normalize_formats(raw: &[RawFormat]) -> Vec<NormalizedFormat> {
    let mut result: Vec<NormalizedFormat> = Vec::with_capacity(raw.len());

    for f in raw {
        let vcodec = f.vcodec.clone().unwrap_or_default();
        let acodec = f.acodec.clone().unwrap_or_default();

        // Storyboards carry neither stream.
        if vcodec == "none" && acodec == "none" {
            continue;
        }

        let mut height = f.height.unwrap_or(0);
        if height == 0 && !vcodec.is_empty() && vcodec != "none" {
            height = extract_height(f.resolution.as_deref().unwrap_or(""));
        }

        let quality = if height > 0 {
            quality_label(height).to_string()
        } else if f.abr.unwrap_or(0.0) > 0.0 || (!acodec.is_empty() && acodec != "none") {
            "audio".to_string()
        } else {
            String::new()
        };

        let filesize = match f.filesize {
            Some(n) if n > 0 => n,
            _ => f.filesize_approx.unwrap_or(0),
        };

        result.push(NormalizedFormat {
            format_id: f.format_id.clone().unwrap_or_default(),
            quality,
            extension: f.ext.clone().unwrap_or_default(),
            filesize,
            height,
            width: f.width.unwrap_or(0),
            fps: f.fps.unwrap_or(0.0),
            video_codec: vcodec,
            audio_codec: acodec,
            score: score(f, height),
        });
    }

    result.sort_by(|a, b| b.score.cmp(&a.score));
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw(
        id: &str,
        height: Option<i32>,
        vcodec: &str,
        acodec: &str,
        ext: &str,
        fps: Option<f64>,
    ) -> RawFormat {
        RawFormat {
            format_id: Some(id.to_string()),
            ext: Some(ext.to_string()),
            resolution: None,
            filesize: None,
            filesize_approx: None,
            fps,
            vcodec: Some(vcodec.to_string()),
            acodec: Some(acodec.to_string()),
            height,
            width: None,
            vbr: None,
            abr: None,
            asr: None,
        }
    }

    #[test]
    fn quality_labels() {
        assert_eq!(quality_label(2160), "4K");
        assert_eq!(quality_label(1440), "2K");
        assert_eq!(quality_label(1080), "1080p");
        assert_eq!(quality_label(720), "720p");
        assert_eq!(quality_label(480), "480p");
        assert_eq!(quality_label(360), "360p");
        assert_eq!(quality_label(144), "240p");
    }

    #[test]
    fn storyboards_are_dropped() {
        let formats = vec![
            raw("sb0", None, "none", "none", "mhtml", None),
            raw("22", Some(720), "avc1.64001F", "mp4a.40.2", "mp4", Some(30.0)),
        ];
        let out = normalize_formats(&formats);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].format_id, "22");
    }

    #[test]
    fn scoring_prefers_h264_mp4_with_audio() {
        // 720p h264+audio mp4 @30fps: 7200 + 100 + 50 + 30 + 10 = 7390
        let f = raw("22", Some(720), "avc1.64001F", "mp4a.40.2", "mp4", Some(30.0));
        let out = normalize_formats(&[f]);
        assert_eq!(out[0].score, 7390);

        // 1080p vp9 video-only webm @60fps: 10800 + 80 + 0 + 0 + 20 = 10900
        let f = raw("248", Some(1080), "vp9", "none", "webm", Some(60.0));
        let out = normalize_formats(&[f]);
        assert_eq!(out[0].score, 10900);
    }

    #[test]
    fn sorted_by_score_descending() {
        let formats = vec![
            raw("low", Some(360), "avc1", "mp4a", "mp4", None),
            raw("high", Some(1080), "avc1", "mp4a", "mp4", Some(60.0)),
            raw("mid", Some(720), "avc1", "mp4a", "mp4", None),
        ];
        let out = normalize_formats(&formats);
        let ids: Vec<_> = out.iter().map(|f| f.format_id.as_str()).collect();
        assert_eq!(ids, ["high", "mid", "low"]);
    }

    #[test]
    fn audio_only_gets_audio_label() {
        let mut f = raw("140", None, "none", "mp4a.40.2", "m4a", None);
        f.abr = Some(129.5);
        let out = normalize_formats(&[f]);
        assert_eq!(out[0].quality, "audio");
        assert_eq!(out[0].height, 0);
    }

    #[test]
    fn height_recovered_from_resolution_string() {
        let mut f = raw("137", None, "avc1", "none", "mp4", None);
        f.resolution = Some("1920x1080".to_string());
        let out = normalize_formats(&[f]);
        assert_eq!(out[0].height, 1080);
        assert_eq!(out[0].quality, "1080p");
    }

    #[test]
    fn normalization_is_stable_across_runs() {
        let formats = vec![
            raw("a", Some(720), "avc1", "mp4a", "mp4", None),
            raw("b", Some(720), "avc1", "mp4a", "mp4", None),
        ];
        let first = normalize_formats(&formats);
        let second = normalize_formats(&formats);
        assert_eq!(first, second);
        // Equal scores keep input order (stable sort).
        assert_eq!(first[0].format_id, "a");
    }

    #[test]
    fn filesize_falls_back_to_approximation() {
        let mut f = raw("22", Some(720), "avc1", "mp4a", "mp4", None);
        f.filesize_approx = Some(1_000_000);
        let out = normalize_formats(&[f]);
        assert_eq!(out[0].filesize, 1_000_000);
    }
}
