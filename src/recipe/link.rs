//! Temporary link exposing a raw file in the output directory.

use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Removes the link when dropped.
#[derive(Debug)]
pub struct RawLink {
    path: PathBuf,
}

impl RawLink {
    /// Link `raw` into `dir` unless it already lives there.
    ///
    /// Returns `None` when no link is needed or a file of that name already
    /// exists in `dir`.
    pub fn create(raw: &Path, dir: &Path) -> std::io::Result<Option<Self>> {
        let Some(name) = raw.file_name() else {
            return Ok(None);
        };
        let raw_dir = raw.parent().unwrap_or_else(|| Path::new("."));
        let same = match (dunce::canonicalize(raw_dir), dunce::canonicalize(dir)) {
            (Ok(a), Ok(b)) => a == b,
            _ => raw_dir == dir,
        };
        let path = dir.join(name);
        if same || path.symlink_metadata().is_ok() {
            return Ok(None);
        }
        let target = dunce::canonicalize(raw).unwrap_or_else(|_| raw.to_path_buf());
        #[cfg(unix)]
        std::os::unix::fs::symlink(&target, &path)?;
        #[cfg(not(unix))]
        std::fs::copy(&target, &path).map(|_| ())?;
        debug!(link = %path.display(), raw = %target.display(), "Linked raw file");
        Ok(Some(Self { path }))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for RawLink {
    fn drop(&mut self) {
        match std::fs::remove_file(&self.path) {
            Ok(()) => debug!(link = %self.path.display(), "Removed raw link"),
            Err(e) => warn!(link = %self.path.display(), error = %e, "Failed to remove raw link"),
        }
    }
}
