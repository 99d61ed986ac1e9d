//! Atomic file writes.
//!
//! Output assets, cache entries and the generated index are written
//! whole-file via write-then-rename, so a concurrent reader (notably the
//! app bundler scanning the asset directory mid-batch) never observes a
//! partial file.

use anyhow::{Context, Result};
use std::fs;
use std::path::Path;

/// Write `bytes` to `path` atomically: write a sibling temp file, then
/// rename over the target. Creates parent directories as needed.
pub fn write_atomic(path: &Path, bytes: &[u8]) -> Result<()> {
    let parent = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    fs::create_dir_all(parent)
        .with_context(|| format!("failed to create {}", parent.display()))?;

    let file_name = path
        .file_name()
        .and_then(|n| n.to_str())
        .context("target path has no file name")?;
    let tmp = parent.join(format!(".{file_name}.tmp"));

    fs::write(&tmp, bytes).with_context(|| format!("failed to write {}", tmp.display()))?;
    fs::rename(&tmp, path).with_context(|| {
        // Leave no temp droppings behind on a failed rename
        let _ = fs::remove_file(&tmp);
        format!("failed to rename {} -> {}", tmp.display(), path.display())
    })?;

    Ok(())
}
