//! Loading and atomically saving directive files.

use crate::error::{Result, RewriteError};
use crate::parser::{join_lines, split_lines, Line};
use std::fs;
use std::io::Write;
use std::path::Path;
use tempfile::NamedTempFile;

fn storage(path: &Path) -> impl FnOnce(std::io::Error) -> RewriteError + '_ {
    move |source| RewriteError::Storage {
        path: path.to_path_buf(),
        source,
    }
}

/// Read a whole file into lines, terminators intact.
pub fn load(path: &Path) -> Result<Vec<Line>> {
    let contents = fs::read_to_string(path).map_err(storage(path))?;
    let lines = split_lines(&contents);
    tracing::debug!(path = %path.display(), lines = lines.len(), "loaded directive file");
    Ok(lines)
}

/// Write `lines` to `path` in one pass.
///
/// Content goes to a temporary file in the destination directory which is
/// then renamed over the target, so a failure leaves the old file as it was.
pub fn save(path: &Path, lines: &[Line]) -> Result<()> {
    let parent = match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir,
        _ => Path::new("."),
    };

    let mut temp = NamedTempFile::new_in(parent).map_err(storage(path))?;
    temp.write_all(join_lines(lines).as_bytes()).map_err(storage(path))?;
    temp.as_file().sync_all().map_err(storage(path))?;

    if let Ok(meta) = fs::metadata(path) {
        // Keep the target's mode; a fresh temp file is 0600 on unix.
        let _ = fs::set_permissions(temp.path(), meta.permissions());
    }

    temp.persist(path).map_err(|e| RewriteError::Storage {
        path: path.to_path_buf(),
        source: e.error,
    })?;
    tracing::debug!(path = %path.display(), lines = lines.len(), "saved directive file");
    Ok(())
}
