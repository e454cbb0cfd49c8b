//! Filesystem helpers shared by the on-disk stores.

use std::path::Path;

use crate::error::{EpiError, Result};

/// Write `data` to `path` atomically (write to a tmp sibling, then rename).
///
/// The parent directory must already exist.
pub fn write_atomic(path: &Path, data: &[u8]) -> Result<()> {
    let mut tmp_name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    tmp_name.push(".tmp");
    let tmp_path = path.with_file_name(tmp_name);

    std::fs::write(&tmp_path, data).map_err(|e| EpiError::persistence(&tmp_path, e))?;
    std::fs::rename(&tmp_path, path).map_err(|e| EpiError::persistence(path, e))?;
    Ok(())
}
