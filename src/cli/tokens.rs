//! Input token collection.
//!
//! Tokens come from positional CLI arguments, optionally extended by
//! scanning a metadata source file for embedded `hex: "XXXX"` fields
//! (the shape the app's curriculum data files use).

use anyhow::{Context, Result};
use regex::Regex;
use std::path::Path;
use std::sync::LazyLock;

/// Matches `hex: "79c1"` / `hex: '079c1'` fields in metadata sources.
static HEX_FIELD: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"hex\s*:\s*["']([0-9a-fA-F]{4,6})["']"#).expect("valid regex")
});

/// Collect the batch token list from CLI args and the optional metadata
/// file. May be empty; the caller decides whether that is fatal.
///
/// A missing metadata file is a configuration error (non-zero exit), unlike
/// per-token failures which the batch driver absorbs.
pub fn collect(positional: &[String], metadata: Option<&Path>) -> Result<Vec<String>> {
    let mut tokens: Vec<String> = positional.to_vec();

    if let Some(path) = metadata {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read metadata source `{}`", path.display()))?;
        tokens.extend(extract_hex_fields(&content));
    }

    Ok(tokens)
}

/// Extract all `hex: "XXXX"`-shaped fields from a metadata source.
fn extract_hex_fields(content: &str) -> Vec<String> {
    HEX_FIELD
        .captures_iter(content)
        .map(|cap| cap[1].to_ascii_lowercase())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_hex_fields() {
        let src = r#"
            { kanji: "私", hex: "79C1", level: "n5" },
            { kanji: "一", hex: '4e00', level: "n5" },
            { kana: "あ" },
        "#;
        assert_eq!(extract_hex_fields(src), vec!["79c1", "4e00"]);
    }

    #[test]
    fn test_extract_ignores_malformed() {
        let src = r#"hex: "xyz9" hex: "79" hex: "079c1""#;
        assert_eq!(extract_hex_fields(src), vec!["079c1"]);
    }

    #[test]
    fn test_collect_positional() {
        assert!(collect(&[], None).unwrap().is_empty());
        let tokens = collect(&["79c1".to_string()], None).unwrap();
        assert_eq!(tokens, vec!["79c1"]);
    }

    #[test]
    fn test_collect_missing_metadata_is_fatal() {
        let res = collect(&[], Some(Path::new("/nonexistent/kanji.ts")));
        assert!(res.is_err());
    }
}
