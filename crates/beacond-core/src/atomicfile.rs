//! Crash-safe file writing using temporary files and atomic renames.

use std::io::Write;
use std::path::Path;

use crate::error::{Error, Result};

/// Atomically writes `data` to `path` using a temp-file-and-rename strategy.
///
/// The temp file is created in the same directory as `path` so the final
/// rename stays on one filesystem and is atomic. Data is flushed to disk
/// before the rename; a crash mid-write leaves the target untouched, and a
/// concurrent reader never observes a partial file. On any failure the temp
/// file is removed.
pub fn write(path: &Path, data: &[u8], #[allow(unused)] mode: u32) -> Result<()> {
    let dir = path.parent().unwrap_or_else(|| Path::new("."));
    let base = path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("atomic");

    let mut tmp = tempfile::Builder::new()
        .prefix(&format!("{base}.tmp."))
        .tempfile_in(dir)
        .map_err(|e| Error::config(format!("create temp file in {}: {e}", dir.display())))?;

    tmp.write_all(data)?;
    tmp.as_file().sync_all()?;

    #[cfg(unix)]
    {
        use std::fs::Permissions;
        use std::os::unix::fs::PermissionsExt;
        tmp.as_file()
            .set_permissions(Permissions::from_mode(mode))?;
    }

    tmp.persist(path)
        .map_err(|e| Error::Io(e.error))
        .map(|_| ())
}
