//! Atomic file writes: temp file + fsync + rename, with a cross-filesystem
//! fallback. Used by the project state store and the incremental sink so a
//! crash mid-write never leaves a half-written JSON file on disk.

use anyhow::{Context, Result};
use camino::Utf8Path;
use std::fs;
use std::io::Write;
use std::path::Path;
use tempfile::NamedTempFile;

#[cfg(target_os = "windows")]
use std::{thread, time::Duration};

/// Outcome of an atomic write, surfaced so callers can log retries.
#[derive(Debug, Clone, Default)]
pub struct AtomicWriteResult {
    pub rename_retry_count: u32,
    pub used_cross_filesystem_fallback: bool,
}

/// Write `content` to `path` atomically: write to a sibling temp file,
/// fsync, then rename over the target. Creates parent directories as
/// needed.
pub fn write_file_atomic(path: &Utf8Path, content: &str) -> Result<AtomicWriteResult> {
    let mut result = AtomicWriteResult::default();

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("failed to create parent directory: {parent}"))?;
    }

    let temp_dir = path.parent().unwrap_or_else(|| Utf8Path::new("."));
    let mut temp_file = NamedTempFile::new_in(temp_dir)
        .with_context(|| format!("failed to create temp file in: {temp_dir}"))?;

    temp_file
        .write_all(content.as_bytes())
        .context("failed to write content to temp file")?;
    temp_file
        .as_file()
        .sync_all()
        .context("failed to fsync temp file")?;

    let temp_path = temp_file.path().to_path_buf();

    match atomic_rename(temp_file, path.as_std_path()) {
        Ok(retries) => result.rename_retry_count = retries,
        Err(e) if is_cross_filesystem_error(&e) => {
            result.used_cross_filesystem_fallback = true;
            cross_filesystem_copy(&temp_path, path)?;
        }
        Err(e) => return Err(e).with_context(|| format!("failed to atomically write: {path}")),
    }

    Ok(result)
}

#[cfg(target_os = "windows")]
fn atomic_rename(mut temp_file: NamedTempFile, target: &Path) -> Result<u32> {
    use std::io::ErrorKind;

    const MAX_RETRIES: u32 = 5;
    const INITIAL_DELAY_MS: u64 = 10;

    let mut retry_count = 0;
    loop {
        match temp_file.persist(target) {
            Ok(_) => return Ok(retry_count),
            Err(persist_error) => {
                let retryable = matches!(
                    persist_error.error.kind(),
                    ErrorKind::PermissionDenied | ErrorKind::Other
                );
                if !retryable || retry_count >= MAX_RETRIES {
                    return Err(anyhow::anyhow!(persist_error.error));
                }
                thread::sleep(Duration::from_millis(
                    INITIAL_DELAY_MS * 2u64.pow(retry_count),
                ));
                retry_count += 1;
                temp_file = persist_error.file;
            }
        }
    }
}

#[cfg(not(target_os = "windows"))]
fn atomic_rename(temp_file: NamedTempFile, target: &Path) -> Result<u32> {
    temp_file
        .persist(target)
        .map(|_| 0)
        .map_err(|e| anyhow::anyhow!(e.error))
}

#[cfg(unix)]
fn is_cross_filesystem_error(err: &anyhow::Error) -> bool {
    err.downcast_ref::<std::io::Error>()
        .and_then(std::io::Error::raw_os_error)
        == Some(18) // EXDEV
}

#[cfg(windows)]
fn is_cross_filesystem_error(_err: &anyhow::Error) -> bool {
    false
}

fn cross_filesystem_copy(temp_path: &Path, target: &Utf8Path) -> Result<()> {
    let content = fs::read(temp_path).context("failed to read temp file for cross-fs copy")?;
    let target_dir = target.parent().unwrap_or_else(|| Utf8Path::new("."));
    let mut target_temp = NamedTempFile::new_in(target_dir)
        .with_context(|| format!("failed to create temp file in: {target_dir}"))?;
    target_temp.write_all(&content).context("failed to write during cross-fs copy")?;
    target_temp.as_file().sync_all().context("failed to fsync during cross-fs copy")?;
    target_temp
        .persist(target.as_std_path())
        .map_err(|e| anyhow::anyhow!(e.error))
        .context("failed to persist during cross-fs copy")?;
    let _ = fs::remove_file(temp_path);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn writes_and_overwrites() {
        let dir = TempDir::new().unwrap();
        let path_buf = dir.path().join("record.json");
        let path = Utf8Path::from_path(&path_buf).unwrap();

        write_file_atomic(path, "{}").unwrap();
        assert_eq!(fs::read_to_string(&path_buf).unwrap(), "{}");

        write_file_atomic(path, "{\"a\":1}").unwrap();
        assert_eq!(fs::read_to_string(&path_buf).unwrap(), "{\"a\":1}");
    }

    #[test]
    fn creates_parent_directories() {
        let dir = TempDir::new().unwrap();
        let path_buf = dir.path().join("daily").join("2026-07-27").join("feed.json");
        let path = Utf8Path::from_path(&path_buf).unwrap();

        write_file_atomic(path, "[]").unwrap();
        assert!(path_buf.exists());
    }
}
