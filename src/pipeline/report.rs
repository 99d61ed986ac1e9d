//! Batch failure reporting.
//!
//! Per-code failures are collected into the final summary and persisted
//! as a `failed.json` sidecar next to the asset root, so a human can
//! re-run just the codes that failed.

use crate::config::Variant;
use crate::error::{PipelineError, Stage};
use crate::log;
use crate::utils::fs::write_atomic;
use anyhow::Result;
use owo_colors::OwoColorize;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Sidecar file name, written under the asset root.
pub const FAILED_FILE: &str = "failed.json";

/// One recorded per-code failure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Failure {
    /// The input token (or derived hex4 once known).
    pub token: String,
    pub stage: Stage,
    pub message: String,
}

impl Failure {
    pub fn from_error(token: String, error: &PipelineError) -> Self {
        Self {
            token,
            stage: error.stage(),
            message: error.to_string(),
        }
    }
}

/// Counts and failures for one batch run.
#[derive(Debug, Default)]
pub struct BatchSummary {
    pub written: usize,
    pub skipped: usize,
    /// Codes actually dispatched (shutdown may cut the list short).
    pub dispatched: usize,
    /// Dispatched but stopped by a shutdown request before starting.
    pub cancelled: usize,
    pub failures: Vec<Failure>,
}

impl BatchSummary {
    /// Print the human-facing summary block.
    pub fn print(&self, variant: Variant) {
        log!(
            "batch";
            "{} dispatched: {} written, {} skipped (already exist), {} failed [variant: {}]",
            self.dispatched,
            self.written.green(),
            self.skipped.dimmed(),
            self.failures.len().red(),
            variant
        );
        if self.cancelled > 0 {
            log!("warning"; "{} code(s) cancelled by shutdown before starting", self.cancelled);
        }
        for failure in &self.failures {
            log!("error"; "  {} @ {}: {}", failure.token, failure.stage, failure.message);
        }
    }

    /// Persist (or clear) the failure sidecar under `asset_dir`.
    ///
    /// Serialized on every run: an empty failure list removes a stale
    /// sidecar from a previous run.
    pub fn persist(&self, asset_dir: &Path) -> Result<()> {
        let path = sidecar_path(asset_dir);
        if self.failures.is_empty() {
            if path.exists() {
                std::fs::remove_file(&path)?;
            }
            return Ok(());
        }
        let json = serde_json::to_string_pretty(&self.failures)?;
        write_atomic(&path, json.as_bytes())
    }
}

fn sidecar_path(asset_dir: &Path) -> PathBuf {
    asset_dir.join(FAILED_FILE)
}

/// Read back a previous run's failure sidecar, if any.
pub fn restore_failures(asset_dir: &Path) -> Vec<Failure> {
    let path = sidecar_path(asset_dir);
    std::fs::read_to_string(&path)
        .ok()
        .and_then(|json| serde_json::from_str(&json).ok())
        .unwrap_or_default()
}
