//! Artifact inspection and removal.

use md5::{Digest, Md5};
use std::io::Read;
use std::path::Path;
use tracing::{info, warn};

use crate::error::{Result, WorkerError};

/// Stream a file through MD5. Runs on the blocking pool; artifacts can be
/// gigabytes.
pub async fn calculate_md5(path: &Path) -> Result<String> {
    let path = path.to_path_buf();
    let digest = tokio::task::spawn_blocking(move || -> std::io::Result<String> {
        let file = std::fs::File::open(&path)?;
        let mut reader = std::io::BufReader::new(file);
        let mut hasher = Md5::new();
        let mut buffer = [0u8; 8192];
        loop {
            let n = reader.read(&mut buffer)?;
            if n == 0 {
                break;
            }
            hasher.update(&buffer[..n]);
        }
        Ok(hex::encode(hasher.finalize()))
    })
    .await
    .map_err(|e| WorkerError::Internal(format!("digest task panicked: {e}")))??;

    Ok(digest)
}

pub async fn file_size(path: &Path) -> Result<i64> {
    let meta = tokio::fs::metadata(path).await?;
    Ok(meta.len() as i64)
}

/// Delete a file; already-gone is not an error.
pub async fn delete_file(path: &Path) -> Result<()> {
    match tokio::fs::remove_file(path).await {
        Ok(()) => {
            info!(path = %path.display(), "deleted file");
            Ok(())
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            warn!(path = %path.display(), "file already deleted");
            Ok(())
        }
        Err(e) => Err(e.into()),
    }
}

/// Percentage of the filesystem holding `path` that is in use.
pub fn disk_usage_percent(path: &Path) -> Result<f64> {
    let stat = nix::sys::statvfs::statvfs(path)
        .map_err(|e| WorkerError::Internal(format!("statvfs failed: {e}")))?;

    let frsize = stat.fragment_size() as u64;
    let total = stat.blocks() as u64 * frsize;
    let available = stat.blocks_available() as u64 * frsize;
    if total == 0 {
        return Ok(0.0);
    }
    let used = total - available;
    Ok(used as f64 / total as f64 * 100.0)
}

/// The worker refuses new downloads at 90% usage and above.
pub const DISK_USAGE_LIMIT_PERCENT: f64 = 90.0;

pub fn is_disk_space_sufficient(usage_percent: f64) -> bool {
    usage_percent < DISK_USAGE_LIMIT_PERCENT
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[tokio::test]
    async fn md5_matches_known_digest() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("artifact.bin");
        let mut f = std::fs::File::create(&path).unwrap();
        f.write_all(b"hello world").unwrap();
        drop(f);

        let digest = calculate_md5(&path).await.unwrap();
        assert_eq!(digest, "5eb63bbbe01eeed093cb22bb8f5acdc3");

        let size = file_size(&path).await.unwrap();
        assert_eq!(size, 11);
    }

    #[tokio::test]
    async fn delete_tolerates_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("never-existed.mp4");
        assert!(delete_file(&path).await.is_ok());
    }

    #[test]
    fn disk_gate_boundary() {
        assert!(is_disk_space_sufficient(89.9));
        assert!(!is_disk_space_sufficient(90.0));
        assert!(!is_disk_space_sufficient(97.3));
    }

    #[test]
    fn disk_usage_reads_real_filesystem() {
        let usage = disk_usage_percent(Path::new("/")).unwrap();
        assert!((0.0..=100.0).contains(&usage));
    }
}
