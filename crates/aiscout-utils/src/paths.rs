//! Small path helpers for the on-disk layout described in spec.md §6.

use camino::{Utf8Path, Utf8PathBuf};
use std::io;

/// Create `dir` and all parents, tolerating a benign "already exists" race.
pub fn ensure_dir_all(dir: &Utf8Path) -> io::Result<()> {
    match std::fs::create_dir_all(dir) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::AlreadyExists => Ok(()),
        Err(e) => Err(e),
    }
}

/// `output/daily/<date>/<source>_<timestamp>.json`
pub fn daily_run_file(output_dir: &Utf8Path, date: &str, source: &str, timestamp: i64) -> Utf8PathBuf {
    output_dir
        .join("daily")
        .join(date)
        .join(format!("{source}_{timestamp}.json"))
}

/// `output/<source>/projects.json`
pub fn project_store_file(output_dir: &Utf8Path, source: &str) -> Utf8PathBuf {
    output_dir.join(source).join("projects.json")
}
