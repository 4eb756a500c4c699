//! Download executor: drives the extractor subprocess with line-buffered
//! progress parsing and a hard deadline.

use std::process::Stdio;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::Command;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use vget_common::TaskMessage;

use crate::config::YtdlpConfig;
use crate::error::{Result, WorkerError};
use crate::progress::{parse_progress_line, ProgressSample};

pub struct Executor {
    cfg: YtdlpConfig,
}

impl Executor {
    pub fn new(cfg: YtdlpConfig) -> Self {
        Self { cfg }
    }

    fn build_args(
        &self,
        task: &TaskMessage,
        proxy_url: &str,
        output_path: &str,
        cookie_file: &str,
    ) -> Vec<String> {
        let mut args = vec![
            "--output".to_string(),
            output_path.to_string(),
            "--progress".to_string(),
            "--newline".to_string(),
        ];

        args.extend(self.cfg.default_args.iter().cloned());

        if let Some(platform_args) = self.cfg.platform_args.get(&task.platform) {
            args.extend(platform_args.iter().cloned());
        }

        if !cookie_file.is_empty() {
            args.push("--cookies".to_string());
            args.push(cookie_file.to_string());
        }

        args.push("--concurrent-fragments".to_string());
        args.push(self.cfg.concurrent_fragments.to_string());

        let format = if task.format.is_empty() {
            "mp4"
        } else {
            task.format.as_str()
        };
        args.push("--merge-output-format".to_string());
        args.push(format.to_string());

        if !proxy_url.is_empty() {
            args.push("--proxy".to_string());
            args.push(proxy_url.to_string());
        }

        if !task.quality.is_empty() {
            args.push("--format".to_string());
            args.push(format_selector(&task.quality));
        }

        args.push(task.url.clone());
        args
    }

    /// Run the download. Parsed progress samples go to `samples`; the
    /// subprocess is killed when the deadline passes and the error is
    /// classified as a timeout.
    pub async fn download(
        &self,
        task: &TaskMessage,
        proxy_url: &str,
        output_path: &str,
        cookie_file: &str,
        samples: mpsc::UnboundedSender<ProgressSample>,
    ) -> Result<()> {
        let args = self.build_args(task, proxy_url, output_path, cookie_file);
        debug!(task_id = %task.task_id, binary = %self.cfg.binary_path, ?args, "starting extractor");

        let mut child = Command::new(&self.cfg.binary_path)
            .args(&args)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()?;

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| WorkerError::Internal("missing stdout pipe".into()))?;
        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| WorkerError::Internal("missing stderr pipe".into()))?;

        // Drain stderr concurrently so the child never blocks on a full
        // pipe; keep the tail for error classification.
        let stderr_task = tokio::spawn(async move {
            let mut collected = String::new();
            let mut lines = BufReader::new(stderr).lines();
            while let Ok(Some(line)) = lines.next_line().await {
                debug!(stderr = %line, "extractor");
                collected.push_str(&line);
                collected.push('\n');
                if collected.len() > 16 * 1024 {
                    collected.drain(..collected.len() - 16 * 1024);
                }
            }
            collected
        });

        let timeout = Duration::from_secs(self.cfg.timeout_secs);
        let deadline = tokio::time::sleep(timeout);
        tokio::pin!(deadline);

        let mut stdout_lines = BufReader::new(stdout).lines();
        loop {
            tokio::select! {
                _ = &mut deadline => {
                    warn!(task_id = %task.task_id, "download deadline exceeded, killing extractor");
                    let _ = child.kill().await;
                    return Err(WorkerError::Timeout(self.cfg.timeout_secs));
                }
                line = stdout_lines.next_line() => {
                    match line {
                        Ok(Some(line)) => {
                            if let Some(sample) = parse_progress_line(&line) {
                                // Receiver gone means the task is being torn
                                // down; keep draining the pipe regardless.
                                let _ = samples.send(sample);
                            }
                        }
                        Ok(None) => break,
                        Err(e) => {
                            warn!(task_id = %task.task_id, error = %e, "stdout read error");
                            break;
                        }
                    }
                }
            }
        }

        let status = tokio::select! {
            _ = &mut deadline => {
                let _ = child.kill().await;
                return Err(WorkerError::Timeout(self.cfg.timeout_secs));
            }
            status = child.wait() => status?,
        };

        let stderr_output = stderr_task.await.unwrap_or_default();

        if !status.success() {
            return Err(WorkerError::Extractor(format!(
                "exit code {:?}: {}",
                status.code(),
                stderr_output.chars().take(1000).collect::<String>()
            )));
        }

        info!(task_id = %task.task_id, "download completed");
        Ok(())
    }
}

/// Map a quality label onto the extractor's format selector.
pub fn format_selector(quality: &str) -> String {
    let height = match quality {
        "4K" | "2160p" => "2160",
        "2K" | "1440p" => "1440",
        "1080p" => "1080",
        "720p" => "720",
        "480p" => "480",
        "360p" => "360",
        _ => return "best".to_string(),
    };
    format!("bestvideo[height<={height}]+bestaudio/best[height<={height}]")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use vget_common::TaskMode;

    fn task() -> TaskMessage {
        TaskMessage {
            task_id: "t1".into(),
            user_id: "u1".into(),
            history_id: 1,
            url: "https://example.com/v/1".into(),
            mode: TaskMode::QuickDownload,
            quality: "1080p".into(),
            format: "mp4".into(),
            platform: "youtube".into(),
            title: "t".into(),
            cookie_id: 0,
            proxy_url: String::new(),
        }
    }

    fn executor() -> Executor {
        let mut platform_args = HashMap::new();
        platform_args.insert("youtube".to_string(), vec!["--no-check-certificates".to_string()]);
        Executor::new(YtdlpConfig {
            binary_path: "yt-dlp".into(),
            timeout_secs: 600,
            concurrent_fragments: 4,
            default_args: vec!["--no-warnings".into()],
            platform_args,
            cookie_temp_dir: "/tmp".into(),
        })
    }

    #[test]
    fn format_selector_by_quality() {
        assert_eq!(
            format_selector("1080p"),
            "bestvideo[height<=1080]+bestaudio/best[height<=1080]"
        );
        assert_eq!(
            format_selector("4K"),
            "bestvideo[height<=2160]+bestaudio/best[height<=2160]"
        );
        assert_eq!(format_selector("audio"), "best");
        assert_eq!(format_selector(""), "best");
    }

    #[test]
    fn args_carry_progress_and_platform_flags() {
        let e = executor();
        let args = e.build_args(&task(), "http://10.0.0.2:8080", "/data/out.mp4", "/tmp/c.txt");

        assert_eq!(args[0], "--output");
        assert_eq!(args[1], "/data/out.mp4");
        assert!(args.contains(&"--progress".to_string()));
        assert!(args.contains(&"--newline".to_string()));
        assert!(args.contains(&"--no-warnings".to_string()));
        assert!(args.contains(&"--no-check-certificates".to_string()));

        let proxy_idx = args.iter().position(|a| a == "--proxy").unwrap();
        assert_eq!(args[proxy_idx + 1], "http://10.0.0.2:8080");
        let cookies_idx = args.iter().position(|a| a == "--cookies").unwrap();
        assert_eq!(args[cookies_idx + 1], "/tmp/c.txt");
        let fmt_idx = args.iter().position(|a| a == "--merge-output-format").unwrap();
        assert_eq!(args[fmt_idx + 1], "mp4");

        assert_eq!(args.last().unwrap(), "https://example.com/v/1");
    }

    #[test]
    fn args_omit_proxy_and_cookies_when_absent() {
        let e = executor();
        let mut t = task();
        t.platform = "generic".into();
        let args = e.build_args(&t, "", "/data/out.mp4", "");
        assert!(!args.contains(&"--proxy".to_string()));
        assert!(!args.contains(&"--cookies".to_string()));
        assert!(!args.contains(&"--no-check-certificates".to_string()));
    }
}
