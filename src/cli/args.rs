//! Command-line interface definitions.

use crate::config::{OutputFormat, Variant};
use clap::{ColorChoice, Parser, Subcommand};
use std::path::PathBuf;

/// Sumi stroke-order asset pipeline CLI
#[derive(Parser, Debug, Clone)]
#[command(version, about, long_about = None, arg_required_else_help = true)]
pub struct Cli {
    /// Control colored output (auto, always, never)
    #[arg(long, global = true, default_value = "auto")]
    pub color: ColorChoice,

    /// Config file path (default: sumi.toml)
    #[arg(short = 'C', long, default_value = "sumi.toml", value_hint = clap::ValueHint::FilePath)]
    pub config: PathBuf,

    /// subcommands
    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Fetch, sanitize and rasterize stroke diagrams for a batch of tokens
    #[command(visible_alias = "g")]
    Generate {
        #[command(flatten)]
        args: GenerateArgs,
    },

    /// Regenerate the code -> asset lookup index from the asset directory
    #[command(visible_alias = "i")]
    Index {
        #[command(flatten)]
        args: IndexArgs,
    },
}

/// Generate command arguments.
#[derive(clap::Args, Debug, Clone)]
pub struct GenerateArgs {
    /// Character tokens: literal glyphs, 4-digit hex or 5-digit hex codes
    #[arg(value_name = "TOKEN")]
    pub tokens: Vec<String>,

    /// Extract tokens from a metadata source file (`hex: "XXXX"` fields)
    #[arg(short = 'm', long, value_hint = clap::ValueHint::FilePath)]
    pub from_metadata: Option<PathBuf>,

    /// Output asset root (overrides paths.asset_dir)
    #[arg(short, long, value_hint = clap::ValueHint::DirPath)]
    pub out: Option<PathBuf>,

    /// Curriculum tier label, used as the output subdirectory
    #[arg(short, long, default_value = "n5")]
    pub level: String,

    /// Output variant (plain, nums, web)
    #[arg(short, long, value_enum, default_value_t = Variant::Nums)]
    pub variant: Variant,

    /// Output image format (overrides render.format)
    #[arg(short = 'F', long, value_enum)]
    pub format: Option<OutputFormat>,

    /// Target width in pixels (overrides render.width)
    #[arg(short, long)]
    pub width: Option<u32>,

    /// Regenerate assets even when the target file already exists
    #[arg(short, long)]
    pub force: bool,

    /// Also retry the codes recorded in the previous run's failure sidecar
    #[arg(short = 'r', long)]
    pub retry_failed: bool,

    /// Dump intermediate sanitized documents to `<out>/.debug/`
    #[arg(short, long)]
    pub debug: bool,

    /// Number of concurrent in-flight resolutions (overrides fetch.concurrency)
    #[arg(short = 'j', long)]
    pub concurrency: Option<usize>,

    /// Enable verbose output for debugging
    #[arg(short = 'V', long)]
    pub verbose: bool,
}

/// Index command arguments.
#[derive(clap::Args, Debug, Clone)]
pub struct IndexArgs {
    /// Asset directory to scan (overrides paths.asset_dir)
    #[arg(short, long, value_hint = clap::ValueHint::DirPath)]
    pub assets: Option<PathBuf>,

    /// Generated index file path (overrides paths.index_file)
    #[arg(short, long, value_hint = clap::ValueHint::FilePath)]
    pub out: Option<PathBuf>,

    /// Enable verbose output for debugging
    #[arg(short = 'V', long)]
    pub verbose: bool,
}
