//! CLI argument definitions and subcommand entry points.

mod args;
pub mod generate;
pub mod index;
mod tokens;

pub use args::{Cli, Commands, GenerateArgs, IndexArgs};
