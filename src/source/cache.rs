//! Local raw-document cache.
//!
//! Successful fetches land at `<cache-root>/<hex4>.svg` so repeat runs skip
//! the network entirely. The cache stores the raw (pre-sanitization)
//! payload, which lets sanitizer fixes re-apply to already-fetched corpora.
//! Entries are append-only per code: a second write for the same code is
//! redundant, never corrupting.

use crate::code::CharacterCode;
use crate::utils::fs::write_atomic;
use anyhow::{Context, Result};
use std::path::PathBuf;

/// On-disk cache keyed by `hex4`.
#[derive(Debug, Clone)]
pub struct RawCache {
    root: PathBuf,
}

impl RawCache {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Cache file location for a code.
    pub fn path(&self, code: &CharacterCode) -> PathBuf {
        self.root.join(format!("{}.svg", code.hex4()))
    }

    /// Read a cached document, if present and non-empty.
    pub fn load(&self, code: &CharacterCode) -> Option<String> {
        let path = self.path(code);
        match std::fs::read_to_string(&path) {
            Ok(text) if !text.trim().is_empty() => Some(text),
            _ => None,
        }
    }

    /// Persist a fetched document. Whole-file, atomic-by-rename.
    pub fn store(&self, code: &CharacterCode, text: &str) -> Result<()> {
        let path = self.path(code);
        write_atomic(&path, text.as_bytes())
            .with_context(|| format!("failed to cache {}", code.hex4()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn code(token: &str) -> CharacterCode {
        CharacterCode::normalize(token).unwrap()
    }

    #[test]
    fn test_store_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let cache = RawCache::new(dir.path());
        let c = code("79c1");

        assert!(cache.load(&c).is_none());
        cache.store(&c, "<svg>stub</svg>").unwrap();
        assert_eq!(cache.load(&c).unwrap(), "<svg>stub</svg>");
        assert!(dir.path().join("79c1.svg").exists());
    }

    #[test]
    fn test_empty_entry_is_a_miss() {
        let dir = tempfile::tempdir().unwrap();
        let cache = RawCache::new(dir.path());
        let c = code("4e00");
        std::fs::write(cache.path(&c), "  \n").unwrap();
        assert!(cache.load(&c).is_none());
    }
}
