//! Per-code pipeline and the batch driver.
//!
//! Each code's full pipeline (resolve -> sanitize -> annotate -> render ->
//! encode) is an independent unit of work; the only shared state is the
//! on-disk cache and the output directory, both written whole-file and
//! atomic-by-rename. The driver runs units on a bounded worker pool and
//! absorbs every per-code error into the final summary - a single bad
//! code never aborts the batch.

pub mod report;

use crate::annotate::annotate;
use crate::code::CharacterCode;
use crate::config::{OutputFormat, PipelineConfig, Variant, parse_color};
use crate::error::PipelineError;
use crate::log;
use crate::logger::ProgressLine;
use crate::render::encode::encode;
use crate::render::{RenderOptions, render};
use crate::sanitize::sanitize;
use crate::source::{Fetch, Resolver};
use crate::utils::fs::write_atomic;
use crate::utils::shutdown::is_shutdown;
use report::{BatchSummary, Failure};
use rustc_hash::FxHashSet;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

/// Per-run settings, assembled by the CLI layer from config plus flags.
#[derive(Debug, Clone)]
pub struct RunContext {
    pub asset_dir: PathBuf,
    pub level: String,
    pub variant: Variant,
    pub format: OutputFormat,
    pub quality: u8,
    pub width: u32,
    pub height: Option<u32>,
    pub background: (u8, u8, u8),
    pub force: bool,
    pub debug_dump: bool,
    pub concurrency: usize,
}

impl RunContext {
    /// Build a run context from merged configuration.
    pub fn new(config: &PipelineConfig, level: String, variant: Variant) -> Self {
        Self {
            asset_dir: config.paths.asset_dir.clone(),
            level,
            variant,
            format: config.render.format,
            quality: config.render.quality,
            width: config.render.width,
            height: config.render.height,
            // Validated at config load; fall back to white regardless
            background: parse_color(&config.render.background).unwrap_or((255, 255, 255)),
            force: false,
            debug_dump: false,
            concurrency: config.fetch.concurrency,
        }
    }

    /// Target asset path for a code: `<asset_dir>/<level>/<hex4>_<variant>.<ext>`.
    pub fn target_path(&self, code: &CharacterCode) -> PathBuf {
        self.asset_dir.join(&self.level).join(format!(
            "{}_{}.{}",
            code.hex4(),
            self.variant.suffix(),
            self.format.extension()
        ))
    }
}

/// Outcome of one unit of work.
#[derive(Debug)]
pub enum Outcome {
    /// Asset written to this path.
    Written(PathBuf),
    /// Target already existed and `force` was not set.
    Skipped(PathBuf),
    /// Shutdown was requested before this unit started.
    Cancelled,
}

/// Run the full pipeline for one code.
pub async fn process_one<F: Fetch>(
    ctx: &RunContext,
    resolver: &Resolver<F>,
    code: CharacterCode,
) -> Result<Outcome, PipelineError> {
    let target = ctx.target_path(&code);
    // Idempotent reruns: skip before any network traffic
    if !ctx.force && target.exists() {
        return Ok(Outcome::Skipped(target));
    }

    let raw = resolver.resolve(&code).await?;
    if let Ok(age) = raw.fetched_at.elapsed()
        && age.as_secs() > 0
    {
        crate::debug!("cache"; "{} source is {}s old ({})", code.hex4(), age.as_secs(), raw.kind);
    }
    let mut doc = sanitize(&raw.text, &code)?;

    if ctx.debug_dump {
        let dump = ctx.asset_dir.join(".debug").join(format!("{}.svg", code.hex4()));
        if let Err(e) = write_atomic(&dump, doc.text.as_bytes()) {
            log!("warning"; "debug dump failed for {}: {e:#}", code.hex4());
        }
    }

    if ctx.variant == Variant::Nums {
        doc = annotate(&doc);
    }

    // Render and encode are CPU-bound; keep them off the fetch workers
    let opts = RenderOptions {
        width: ctx.width,
        height: ctx.height,
        background: ctx.background,
    };
    let hex4 = code.hex4();
    let format = ctx.format;
    let quality = ctx.quality;
    let bytes = tokio::task::spawn_blocking(move || {
        let pixmap = render(&doc, &opts, &hex4)?;
        encode(&pixmap, format, quality, &hex4)
    })
    .await
    .map_err(|e| PipelineError::RenderFailure {
        code: code.hex4(),
        reason: format!("render task panicked: {e}"),
    })??;

    write_atomic(&target, &bytes).map_err(|e| PipelineError::EncodeFailure {
        code: code.hex4(),
        reason: format!("{e:#}"),
    })?;

    Ok(Outcome::Written(target))
}

/// Normalize and deduplicate the input token list, order-preserving.
///
/// Malformed tokens become failures immediately; duplicates (same code
/// reached via glyph and hex spellings) are dispatched once.
pub fn dedupe_tokens(tokens: &[String]) -> (Vec<CharacterCode>, Vec<Failure>) {
    let mut seen = FxHashSet::default();
    let mut codes = Vec::new();
    let mut failures = Vec::new();

    for token in tokens {
        match CharacterCode::normalize(token) {
            Ok(code) => {
                if seen.insert(code.codepoint()) {
                    codes.push(code);
                }
            }
            Err(e) => failures.push(Failure::from_error(token.clone(), &e)),
        }
    }

    (codes, failures)
}

/// Run the batch: bounded worker pool, per-code error absorption,
/// progress display, final summary.
pub async fn run_batch<F: Fetch + 'static>(
    ctx: Arc<RunContext>,
    resolver: Arc<Resolver<F>>,
    tokens: &[String],
) -> BatchSummary {
    let (codes, mut failures) = dedupe_tokens(tokens);
    for failure in &failures {
        log!("error"; "{}: {}", failure.token, failure.message);
    }

    let progress = ProgressLine::new(&["done", "skipped", "failed"], codes.len());
    let semaphore = Arc::new(Semaphore::new(ctx.concurrency.max(1)));
    let mut join_set = JoinSet::new();

    let mut dispatched = 0usize;
    for code in codes {
        if is_shutdown() {
            log!("batch"; "shutdown requested, not dispatching remaining codes");
            break;
        }
        // Acquiring the permit here paces dispatch to the pool, so the
        // shutdown check above fires between units of work instead of
        // after the whole list has already been queued
        let Ok(permit) = Arc::clone(&semaphore).acquire_owned().await else {
            break;
        };
        dispatched += 1;
        let ctx = Arc::clone(&ctx);
        let resolver = Arc::clone(&resolver);
        join_set.spawn(async move {
            let _permit = permit;
            if is_shutdown() {
                return (code, Ok(Outcome::Cancelled));
            }
            (code, process_one(&ctx, &resolver, code).await)
        });
    }

    let mut written = 0usize;
    let mut skipped = 0usize;
    let mut cancelled = 0usize;
    while let Some(joined) = join_set.join_next().await {
        let Ok((code, result)) = joined else {
            continue; // task cancelled or panicked; already logged by the stage
        };
        match result {
            Ok(Outcome::Written(path)) => {
                written += 1;
                progress.inc("done");
                crate::debug!("batch"; "{} -> {}", code.hex4(), path.display());
            }
            Ok(Outcome::Skipped(path)) => {
                skipped += 1;
                progress.inc("skipped");
                crate::debug!("batch"; "{} exists at {}, skipping", code.hex4(), path.display());
            }
            Ok(Outcome::Cancelled) => {
                cancelled += 1;
                crate::debug!("batch"; "{} cancelled by shutdown", code.hex4());
            }
            Err(e) => {
                progress.inc("failed");
                log!("error"; "{} failed at {}: {}", code.hex4(), e.stage(), e);
                failures.push(Failure::from_error(code.hex4(), &e));
            }
        }
    }
    progress.finish();

    BatchSummary {
        written,
        skipped,
        dispatched,
        cancelled,
        failures,
    }
}
