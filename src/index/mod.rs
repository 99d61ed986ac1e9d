//! Generated asset index.
//!
//! Scans the output asset directory, derives the canonical code from each
//! filename and regenerates the code -> asset lookup module the app loads
//! at bundle time. The index is always rewritten wholesale: entries are
//! sorted for deterministic diffs, and running the builder twice over an
//! unchanged directory produces byte-identical output.

use anyhow::{Context, Result};
use jwalk::WalkDir;
use regex::Regex;
use rustc_hash::FxHashMap;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;
use thiserror::Error;

/// Asset filename convention: `{hex}_{variant}.{ext}`.
static ASSET_NAME: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^([0-9a-f]{4,6})_(plain|nums|web)\.(webp|png|jpg)$").expect("valid regex")
});

/// Variant preference when a code has several rendered flavors: the
/// numbered study diagram is what the app shows by default.
const VARIANT_PREFERENCE: &[&str] = &["nums", "plain", "web"];

/// The index builder found nothing to index. A warning, not fatal: it
/// signals a misconfigured path, not necessarily an error.
#[derive(Debug, Error)]
#[error("no matching assets found under {0}")]
pub struct EmptyAssetDirectory(pub PathBuf);

/// One discovered asset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexEntry {
    /// Canonical lowercase hex key (unpadded 4-digit form).
    pub hex4: String,
    /// Variant suffix from the filename.
    pub variant: String,
    /// Path relative to the index file's directory, `./`-prefixed.
    pub asset_ref: String,
}

/// Build the generated index source for `asset_dir`, written relative to
/// `index_file`'s directory.
pub fn build_index(asset_dir: &Path, index_file: &Path) -> Result<String> {
    let entries = scan(asset_dir, index_file)?;
    if entries.is_empty() {
        return Err(EmptyAssetDirectory(asset_dir.to_path_buf()).into());
    }
    Ok(emit(&entries))
}

/// Discover assets and pick one entry per code.
fn scan(asset_dir: &Path, index_file: &Path) -> Result<Vec<IndexEntry>> {
    let index_root = index_file.parent().unwrap_or(Path::new("."));
    let mut by_code: FxHashMap<String, IndexEntry> = FxHashMap::default();

    for entry in WalkDir::new(asset_dir).sort(true) {
        let entry = entry.context("asset directory walk failed")?;
        if !entry.file_type().is_file() {
            continue;
        }
        let path = entry.path();
        let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
            continue;
        };
        let Some(caps) = ASSET_NAME.captures(name) else {
            continue;
        };

        let hex4 = canonical_hex4(&caps[1]);
        let variant = caps[2].to_string();
        let rel = path
            .strip_prefix(index_root)
            .or_else(|_| path.strip_prefix(asset_dir))
            .unwrap_or(path.as_path())
            .to_string_lossy()
            .replace('\\', "/");

        let candidate = IndexEntry {
            hex4: hex4.clone(),
            variant,
            asset_ref: format!("./{rel}"),
        };

        match by_code.get(&hex4) {
            Some(existing) if !prefer(&candidate, existing) => {}
            _ => {
                by_code.insert(hex4, candidate);
            }
        }
    }

    let mut entries: Vec<IndexEntry> = by_code.into_values().collect();
    entries.sort_by(|a, b| a.hex4.cmp(&b.hex4));
    Ok(entries)
}

/// Collapse a filename hex (4-6 digits, possibly zero-padded) to the
/// canonical unpadded-but-min-4 form used as the index key.
fn canonical_hex4(hex: &str) -> String {
    let value = u32::from_str_radix(hex, 16).unwrap_or(0);
    format!("{value:04x}")
}

/// Should `candidate` replace `existing` as the entry for this code?
fn prefer(candidate: &IndexEntry, existing: &IndexEntry) -> bool {
    let rank = |v: &str| {
        VARIANT_PREFERENCE
            .iter()
            .position(|p| *p == v)
            .unwrap_or(usize::MAX)
    };
    match rank(&candidate.variant).cmp(&rank(&existing.variant)) {
        std::cmp::Ordering::Less => true,
        std::cmp::Ordering::Greater => false,
        // Same variant in two tiers: keep the lexicographically first path
        std::cmp::Ordering::Equal => candidate.asset_ref < existing.asset_ref,
    }
}

/// Emit the generated module text.
fn emit(entries: &[IndexEntry]) -> String {
    let mut body = String::with_capacity(entries.len() * 64);
    for entry in entries {
        body.push_str(&format!(
            "  \"{}\": require(\"{}\"),\n",
            entry.hex4, entry.asset_ref
        ));
    }

    let fingerprint = blake3::hash(body.as_bytes()).to_hex();
    format!(
        "// @generated by sumi index. Do not edit by hand.\n\
         // fingerprint: blake3:{}\n\
         module.exports = {{\n{}}};\n",
        &fingerprint[..12],
        body
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn touch(path: &Path) {
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, b"stub").unwrap();
    }

    #[test]
    fn test_build_index_sorted_and_marked() {
        let dir = tempfile::tempdir().unwrap();
        touch(&dir.path().join("n5/79c1_nums.webp"));
        touch(&dir.path().join("n5/4e00_nums.webp"));
        touch(&dir.path().join("n4/5b66_nums.webp"));

        let index_file = dir.path().join("index.js");
        let out = build_index(dir.path(), &index_file).unwrap();

        assert!(out.starts_with("// @generated by sumi index"));
        assert!(out.contains("fingerprint: blake3:"));
        let pos_4e00 = out.find("\"4e00\"").unwrap();
        let pos_5b66 = out.find("\"5b66\"").unwrap();
        let pos_79c1 = out.find("\"79c1\"").unwrap();
        assert!(pos_4e00 < pos_5b66 && pos_5b66 < pos_79c1);
        assert!(out.contains("\"79c1\": require(\"./n5/79c1_nums.webp\"),"));
    }

    #[test]
    fn test_build_index_deterministic() {
        let dir = tempfile::tempdir().unwrap();
        touch(&dir.path().join("n5/79c1_nums.webp"));
        touch(&dir.path().join("n5/4e00_plain.webp"));

        let index_file = dir.path().join("index.js");
        let a = build_index(dir.path(), &index_file).unwrap();
        let b = build_index(dir.path(), &index_file).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_variant_preference() {
        let dir = tempfile::tempdir().unwrap();
        touch(&dir.path().join("n5/79c1_plain.webp"));
        touch(&dir.path().join("n5/79c1_nums.webp"));
        touch(&dir.path().join("n5/79c1_web.webp"));

        let out = build_index(dir.path(), &dir.path().join("index.js")).unwrap();
        assert!(out.contains("79c1_nums.webp"));
        assert!(!out.contains("79c1_plain.webp"));
        assert_eq!(out.matches("\"79c1\"").count(), 1);
    }

    #[test]
    fn test_padded_filename_keys_as_hex4() {
        let dir = tempfile::tempdir().unwrap();
        touch(&dir.path().join("n5/04e00_nums.webp"));

        let out = build_index(dir.path(), &dir.path().join("index.js")).unwrap();
        assert!(out.contains("\"4e00\": require(\"./n5/04e00_nums.webp\"),"));
    }

    #[test]
    fn test_non_matching_files_ignored() {
        let dir = tempfile::tempdir().unwrap();
        touch(&dir.path().join("n5/79c1_nums.webp"));
        touch(&dir.path().join("n5/readme.txt"));
        touch(&dir.path().join("n5/.79c1_nums.webp.tmp"));
        touch(&dir.path().join("failed.json"));

        let out = build_index(dir.path(), &dir.path().join("index.js")).unwrap();
        assert_eq!(out.matches("require(").count(), 1);
    }

    #[test]
    fn test_empty_directory_is_typed_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = build_index(dir.path(), &dir.path().join("index.js")).unwrap_err();
        assert!(err.downcast_ref::<EmptyAssetDirectory>().is_some());
    }
}
