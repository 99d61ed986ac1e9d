//! Sumi - a stroke-order diagram asset pipeline.
//!
//! Fetches hand-stroke-order SVG diagrams for Japanese characters from the
//! KanjiVG corpus (with mirror fallback), sanitizes the markup, optionally
//! overlays stroke numbering, rasterizes to fixed-size bitmaps and emits a
//! generated lookup index consumed by the app at bundle time.

mod annotate;
mod cli;
mod code;
mod config;
mod error;
mod index;
mod logger;
mod pipeline;
mod render;
mod sanitize;
mod source;
mod utils;

use anyhow::Result;
use clap::{ColorChoice, Parser};
use cli::{Cli, Commands};
use config::PipelineConfig;

fn main() -> Result<()> {
    // Setup global Ctrl+C handler (before any blocking operations)
    utils::shutdown::setup_shutdown_handler()?;

    let cli = Cli::parse();

    // Set global color override based on CLI option
    match cli.color {
        ColorChoice::Always => owo_colors::set_override(true),
        ColorChoice::Never => owo_colors::set_override(false),
        ColorChoice::Auto => {} // owo-colors auto-detects TTY
    }

    let config = PipelineConfig::load(&cli)?;

    match &cli.command {
        Commands::Generate { args } => cli::generate::run(args, &config),
        Commands::Index { args } => cli::index::run(args, &config),
    }
}
