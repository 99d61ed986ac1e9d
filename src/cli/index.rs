//! `sumi index` - regenerate the code -> asset lookup module.

use crate::cli::IndexArgs;
use crate::config::PipelineConfig;
use crate::index::{EmptyAssetDirectory, build_index};
use crate::log;
use crate::logger;
use crate::utils::fs::write_atomic;
use anyhow::Result;

/// Run the index subcommand.
///
/// An empty asset directory is a warning, not a failure: the existing
/// index (if any) is left untouched and the process still exits 0.
pub fn run(args: &IndexArgs, config: &PipelineConfig) -> Result<()> {
    logger::set_verbose(args.verbose);

    let asset_dir = args.assets.clone().unwrap_or_else(|| config.paths.asset_dir.clone());
    let index_file = args.out.clone().unwrap_or_else(|| config.paths.index_file.clone());

    match build_index(&asset_dir, &index_file) {
        Ok(source) => {
            let entries = source.matches("require(").count();
            write_atomic(&index_file, source.as_bytes())?;
            log!("index"; "{} entries -> {}", entries, index_file.display());
            Ok(())
        }
        Err(e) if e.downcast_ref::<EmptyAssetDirectory>().is_some() => {
            log!("warning"; "{e} - is the asset directory configured correctly?");
            Ok(())
        }
        Err(e) => Err(e),
    }
}
