//! Atomic file replacement.
//!
//! Records are written to a temporary file in the destination directory,
//! flushed to disk, then renamed over the target. The temporary file is
//! removed on every path that does not reach the rename, so a reader sees
//! either the previous record or the new one in full.

use std::io::{self, Write};
use std::path::Path;

use tempfile::NamedTempFile;

/// Atomically replaces `path` with `contents`.
pub fn write_atomic(path: &Path, contents: &[u8]) -> io::Result<()> {
    write_atomic_with(path, |file| file.write_all(contents))
}

/// Atomically replaces `path` with whatever `write` produces.
///
/// If `write` fails, the target is left untouched and the temporary file
/// is discarded.
pub fn write_atomic_with<F>(path: &Path, write: F) -> io::Result<()>
where
    F: FnOnce(&mut NamedTempFile) -> io::Result<()>,
{
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };

    let mut tmp = NamedTempFile::new_in(dir)?;
    write(&mut tmp)?;
    tmp.flush()?;
    tmp.as_file().sync_all()?;
    tmp.persist(path).map_err(|e| e.error)?;

    tracing::debug!("Wrote {}", path.display());
    Ok(())
}
