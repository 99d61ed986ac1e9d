//! `sumi generate` - the batch driver entry point.

use crate::cli::{GenerateArgs, tokens};
use crate::config::PipelineConfig;
use crate::log;
use crate::logger;
use crate::pipeline::report::restore_failures;
use crate::pipeline::{RunContext, run_batch};
use crate::source::{HttpFetcher, RawCache, Resolver, RetryPolicy, default_providers};
use anyhow::{Context, Result, bail};
use std::sync::Arc;
use std::time::Duration;

/// Run the generate subcommand. Exit code 0 on a completed run even with
/// per-code failures; non-zero only for configuration errors.
pub fn run(args: &GenerateArgs, config: &PipelineConfig) -> Result<()> {
    logger::set_verbose(args.verbose);

    let mut ctx = RunContext::new(config, args.level.clone(), args.variant);
    if let Some(out) = &args.out {
        ctx.asset_dir = out.clone();
    }

    let mut token_list = tokens::collect(&args.tokens, args.from_metadata.as_deref())?;
    if args.retry_failed {
        let previous = restore_failures(&ctx.asset_dir);
        log!("batch"; "retrying {} code(s) from the last failure sidecar", previous.len());
        token_list.extend(previous.into_iter().map(|f| f.token));
    }
    if token_list.is_empty() {
        bail!("no input tokens: pass tokens as arguments or use --from-metadata");
    }
    if let Some(width) = args.width {
        ctx.width = width;
    }
    if let Some(format) = args.format {
        ctx.format = format;
    }
    if let Some(concurrency) = args.concurrency {
        ctx.concurrency = concurrency.max(1);
    }
    ctx.force = args.force;
    ctx.debug_dump = args.debug;

    std::fs::create_dir_all(&ctx.asset_dir).with_context(|| {
        format!("cannot create output directory {}", ctx.asset_dir.display())
    })?;

    let fetcher = HttpFetcher::new(Duration::from_secs(config.fetch.timeout_secs))?;
    let resolver = Resolver::new(
        default_providers(),
        fetcher,
        RawCache::new(config.paths.cache_dir.clone()),
        RetryPolicy::new(
            config.fetch.retries,
            Duration::from_millis(config.fetch.backoff_ms),
        ),
    );

    log!(
        "batch";
        "{} token(s), level {}, variant {}, {} worker(s)",
        token_list.len(),
        ctx.level,
        ctx.variant,
        ctx.concurrency
    );

    let asset_dir = ctx.asset_dir.clone();
    let variant = ctx.variant;
    let runtime = tokio::runtime::Runtime::new().context("failed to start async runtime")?;
    let summary = runtime.block_on(run_batch(Arc::new(ctx), Arc::new(resolver), &token_list));

    summary.print(variant);
    if let Err(e) = summary.persist(&asset_dir) {
        log!("warning"; "could not write failure sidecar: {e:#}");
    }

    Ok(())
}
