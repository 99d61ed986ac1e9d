//! Pipeline configuration management for `sumi.toml`.
//!
//! Configuration is merged from three layers, lowest precedence first:
//! built-in defaults, an optional `sumi.toml` file, then CLI flags. The
//! merged [`PipelineConfig`] is threaded explicitly through the pipeline
//! entry points - there is no hidden module-level config state.
//!
//! | Section    | Purpose                                         |
//! |------------|-------------------------------------------------|
//! | `[fetch]`  | Mirror timeouts, retry policy, worker pool size |
//! | `[render]` | Output size, background, format, quality        |
//! | `[paths]`  | Cache root, asset root, generated index file    |

use crate::cli::Cli;
use crate::log;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Root configuration structure representing sumi.toml
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Mirror fetch settings
    pub fetch: FetchConfig,
    /// Rasterization and encoding settings
    pub render: RenderConfig,
    /// Filesystem layout
    pub paths: PathsConfig,
}

/// `[fetch]` - network behavior for the source resolver.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FetchConfig {
    /// Per-candidate fetch timeout in seconds
    pub timeout_secs: u64,
    /// Max attempts per candidate (transient errors only)
    pub retries: u32,
    /// Base backoff delay in milliseconds, grows per attempt
    pub backoff_ms: u64,
    /// Bounded worker pool size for batch runs
    pub concurrency: usize,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 15,
            retries: 3,
            backoff_ms: 500,
            concurrency: 4,
        }
    }
}

/// `[render]` - rasterizer and encoder settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderConfig {
    /// Target width in pixels (aspect preserved unless `height` is set)
    pub width: u32,
    /// Optional target height; when set, content is letterboxed into the box
    pub height: Option<u32>,
    /// Background fill color as `#rrggbb` (flattens transparency)
    pub background: String,
    /// Output image format
    pub format: OutputFormat,
    /// Quality for lossy formats (0-100)
    pub quality: u8,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            width: 900,
            height: None,
            background: "#ffffff".to_string(),
            format: OutputFormat::Webp,
            quality: 90,
        }
    }
}

/// `[paths]` - filesystem layout. Tilde-expanded on load.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PathsConfig {
    /// Raw document cache root (`<cache_dir>/<hex4>.svg`)
    pub cache_dir: PathBuf,
    /// Output asset root (`<asset_dir>/<level>/<hex4>_<variant>.<ext>`)
    pub asset_dir: PathBuf,
    /// Generated index source file
    pub index_file: PathBuf,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            cache_dir: PathBuf::from(".sumi/cache"),
            asset_dir: PathBuf::from("assets/kanji"),
            index_file: PathBuf::from("assets/kanji/index.js"),
        }
    }
}

/// Output image format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Lossless WebP
    Webp,
    /// Lossless PNG
    Png,
    /// Lossy JPEG (uses `quality`)
    Jpg,
}

impl OutputFormat {
    /// File extension without the dot.
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Webp => "webp",
            Self::Png => "png",
            Self::Jpg => "jpg",
        }
    }
}

/// Rendering flavor of an asset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Variant {
    /// Bare stroke diagram
    Plain,
    /// Stroke-order numerals overlaid
    Nums,
    /// Web-sized plain render
    Web,
}

impl Variant {
    /// Filename suffix (`{hex4}_{variant}.{ext}`).
    pub fn suffix(&self) -> &'static str {
        match self {
            Self::Plain => "plain",
            Self::Nums => "nums",
            Self::Web => "web",
        }
    }
}

impl std::fmt::Display for Variant {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.suffix())
    }
}

impl PipelineConfig {
    /// Load configuration from the CLI-selected config file.
    ///
    /// A missing file is not an error - a batch tool must run in a bare
    /// checkout - but a present file that fails to parse is fatal.
    pub fn load(cli: &Cli) -> Result<Self> {
        let mut config = if cli.config.exists() {
            Self::from_path(&cli.config)?
        } else {
            Self::default()
        };
        config.expand_paths();
        config.validate()?;
        Ok(config)
    }

    /// Parse configuration from TOML string
    pub fn from_str(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content)?;
        Ok(config)
    }

    /// Load configuration from file path with unknown field detection.
    fn from_path(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config `{}`", path.display()))?;

        let (config, ignored) = Self::parse_with_ignored(&content)
            .with_context(|| format!("failed to parse config `{}`", path.display()))?;

        if !ignored.is_empty() {
            log!("warning"; "unknown fields in {}:", path.display());
            for field in &ignored {
                log!("warning"; "  - {}", field);
            }
        }

        Ok(config)
    }

    /// Parse TOML content, collecting any unknown fields.
    fn parse_with_ignored(content: &str) -> Result<(Self, Vec<String>)> {
        let mut ignored = Vec::new();
        let deserializer = toml::Deserializer::new(content);
        let config = serde_ignored::deserialize(deserializer, |path: serde_ignored::Path| {
            ignored.push(path.to_string());
        })?;
        Ok((config, ignored))
    }

    /// Tilde-expand user-supplied path fields.
    fn expand_paths(&mut self) {
        self.paths.cache_dir = expand_tilde(&self.paths.cache_dir);
        self.paths.asset_dir = expand_tilde(&self.paths.asset_dir);
        self.paths.index_file = expand_tilde(&self.paths.index_file);
    }

    /// Reject configurations the pipeline cannot run with.
    fn validate(&self) -> Result<()> {
        anyhow::ensure!(self.fetch.concurrency >= 1, "fetch.concurrency must be >= 1");
        anyhow::ensure!(self.fetch.retries >= 1, "fetch.retries must be >= 1");
        anyhow::ensure!(self.render.width >= 1, "render.width must be >= 1");
        anyhow::ensure!(self.render.quality <= 100, "render.quality must be 0-100");
        parse_color(&self.render.background)
            .with_context(|| format!("invalid render.background `{}`", self.render.background))?;
        Ok(())
    }
}

/// Parse a `#rrggbb` color string.
pub fn parse_color(s: &str) -> Result<(u8, u8, u8)> {
    let hex = s.strip_prefix('#').unwrap_or(s);
    anyhow::ensure!(hex.len() == 6, "expected 6 hex digits, got `{s}`");
    let r = u8::from_str_radix(&hex[0..2], 16)?;
    let g = u8::from_str_radix(&hex[2..4], 16)?;
    let b = u8::from_str_radix(&hex[4..6], 16)?;
    Ok((r, g, b))
}

fn expand_tilde(path: &Path) -> PathBuf {
    let raw = path.to_string_lossy();
    PathBuf::from(shellexpand::tilde(raw.as_ref()).into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = PipelineConfig::default();
        assert_eq!(config.fetch.timeout_secs, 15);
        assert_eq!(config.fetch.concurrency, 4);
        assert_eq!(config.render.width, 900);
        assert_eq!(config.render.format, OutputFormat::Webp);
    }

    #[test]
    fn test_from_str_partial() {
        let config = PipelineConfig::from_str(
            r#"
            [fetch]
            concurrency = 8

            [render]
            width = 512
            format = "png"
            "#,
        )
        .unwrap();
        assert_eq!(config.fetch.concurrency, 8);
        assert_eq!(config.fetch.retries, 3); // default preserved
        assert_eq!(config.render.width, 512);
        assert_eq!(config.render.format, OutputFormat::Png);
    }

    #[test]
    fn test_unknown_fields_collected() {
        let (_, ignored) = PipelineConfig::parse_with_ignored(
            r#"
            [fetch]
            concurency = 8
            "#,
        )
        .unwrap();
        assert_eq!(ignored, vec!["fetch.concurency"]);
    }

    #[test]
    fn test_parse_color() {
        assert_eq!(parse_color("#ffffff").unwrap(), (255, 255, 255));
        assert_eq!(parse_color("1a2b3c").unwrap(), (0x1a, 0x2b, 0x3c));
        assert!(parse_color("#fff").is_err());
        assert!(parse_color("#zzzzzz").is_err());
    }

    #[test]
    fn test_variant_suffix() {
        assert_eq!(Variant::Plain.suffix(), "plain");
        assert_eq!(Variant::Nums.suffix(), "nums");
        assert_eq!(Variant::Web.suffix(), "web");
    }
}
