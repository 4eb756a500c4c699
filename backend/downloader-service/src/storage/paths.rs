//! Output path generation and filename sanitization.

use chrono::Utc;
use once_cell::sync::Lazy;
use regex::Regex;
use std::path::{Path, PathBuf};

use vget_common::{TaskMessage, TaskMode};

static ILLEGAL_CHARS: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"[<>:"/\\|?*\x00-\x1f]"#).expect("illegal-chars pattern")
});

const MAX_FILENAME_LEN: usize = 200;

/// Strip characters the filesystem rejects, trim stray whitespace and
/// dots, and clamp the length. Idempotent; empty results fall back to
/// the caller's substitute (the task id).
pub fn sanitize_filename(name: &str) -> String {
    let cleaned = ILLEGAL_CHARS.replace_all(name, "_");
    let trimmed = cleaned
        .trim_matches(|c: char| c.is_whitespace() || c == '.')
        .to_string();

    if trimmed.len() <= MAX_FILENAME_LEN {
        return trimmed;
    }
    // Clamp on a char boundary.
    let mut end = MAX_FILENAME_LEN;
    while !trimmed.is_char_boundary(end) {
        end -= 1;
    }
    trimmed[..end].to_string()
}

/// Generate the output path for a task and ensure its parent exists.
///
/// quick mode:   {base}/tmp/{task_id}/{title}.{format}
/// archive mode: {base}/archive/{user_id}/{YYYYMMDD}/{title}_{unix_ts}.{format}
pub async fn generate_output_path(base: &Path, task: &TaskMessage) -> std::io::Result<PathBuf> {
    let mut safe_title = sanitize_filename(&task.title);
    if safe_title.is_empty() {
        safe_title = task.task_id.clone();
    }

    let format = if task.format.is_empty() {
        "mp4"
    } else {
        task.format.as_str()
    };

    let path = match task.mode {
        TaskMode::QuickDownload => base
            .join("tmp")
            .join(&task.task_id)
            .join(format!("{safe_title}.{format}")),
        TaskMode::Archive => {
            let now = Utc::now();
            base.join("archive")
                .join(&task.user_id)
                .join(now.format("%Y%m%d").to_string())
                .join(format!("{safe_title}_{}.{format}", now.timestamp()))
        }
    };

    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sanitize_replaces_illegal_chars() {
        assert_eq!(sanitize_filename("a<b>c:d"), "a_b_c_d");
        assert_eq!(sanitize_filename("path/to\\file"), "path_to_file");
        assert_eq!(sanitize_filename("q?u*o\"te|d"), "q_u_o_te_d");
    }

    #[test]
    fn sanitize_trims_whitespace_and_dots() {
        assert_eq!(sanitize_filename("  .video title.  "), "video title");
        assert_eq!(sanitize_filename("..."), "");
    }

    #[test]
    fn sanitize_clamps_to_200_chars() {
        let long = "x".repeat(500);
        assert_eq!(sanitize_filename(&long).len(), 200);
    }

    #[test]
    fn sanitize_is_idempotent() {
        let inputs = ["a<b:c", "  .title.  ", "normal name", "日本語タイトル"];
        for input in inputs {
            let once = sanitize_filename(input);
            assert_eq!(sanitize_filename(&once), once);
        }
        let long = "y".repeat(300);
        let once = sanitize_filename(&long);
        assert_eq!(sanitize_filename(&once), once);
    }

    #[test]
    fn sanitize_strips_control_chars() {
        assert_eq!(sanitize_filename("a\x00b\x1fc"), "a_b_c");
    }

    #[tokio::test]
    async fn quick_mode_path_is_task_scoped() {
        let dir = tempfile::tempdir().unwrap();
        let task = TaskMessage {
            task_id: "t-123".into(),
            user_id: "u1".into(),
            history_id: 1,
            url: "https://example.com/v/1".into(),
            mode: TaskMode::QuickDownload,
            quality: "720p".into(),
            format: "mp4".into(),
            platform: "generic".into(),
            title: "My: Video".into(),
            cookie_id: 0,
            proxy_url: String::new(),
        };
        let path = generate_output_path(dir.path(), &task).await.unwrap();
        assert!(path.starts_with(dir.path().join("tmp").join("t-123")));
        assert_eq!(path.file_name().unwrap(), "My_ Video.mp4");
        assert!(path.parent().unwrap().exists());
    }

    #[tokio::test]
    async fn archive_mode_path_is_dated_per_user() {
        let dir = tempfile::tempdir().unwrap();
        let task = TaskMessage {
            task_id: "t-9".into(),
            user_id: "u7".into(),
            history_id: 2,
            url: "https://example.com/v/2".into(),
            mode: TaskMode::Archive,
            quality: "1080p".into(),
            format: "mp4".into(),
            platform: "generic".into(),
            title: String::new(),
            cookie_id: 0,
            proxy_url: String::new(),
        };
        let path = generate_output_path(dir.path(), &task).await.unwrap();
        assert!(path.starts_with(dir.path().join("archive").join("u7")));
        // Empty title falls back to task id.
        assert!(path
            .file_name()
            .unwrap()
            .to_string_lossy()
            .starts_with("t-9_"));
    }
}
