//! CLI argument definitions using clap

use std::path::PathBuf;

use clap::{ArgAction, Parser, ValueHint};

/// Distribute time budgets over the leaves of a hierarchical task tree
#[derive(Parser, Debug)]
#[command(name = "timeassign")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Task tree document (.json)
    #[arg(value_hint = ValueHint::FilePath)]
    pub input: Option<PathBuf>,

    /// Output document (default: <input>-assigned.json beside the input)
    #[arg(short, long, value_hint = ValueHint::FilePath)]
    pub output: Option<PathBuf>,

    /// Assign every top-level sheet independently
    #[arg(long)]
    pub per_sheet: bool,

    /// Compute estimates without writing the output document
    #[arg(long)]
    pub dry_run: bool,

    /// Print the assigned tree with its estimates
    #[arg(long)]
    pub tree: bool,

    /// Config file (TOML), layered over the global config
    #[arg(short, long, env = "TIMEASSIGN_CONFIG", value_hint = ValueHint::FilePath)]
    pub config: Option<PathBuf>,

    /// Print the effective settings and exit
    #[arg(long)]
    pub show_config: bool,

    /// Debug output: -d info, -dd debug, -ddd trace
    #[arg(short, long, action = ArgAction::Count)]
    pub debug: u8,

    /// Generate shell completions
    #[arg(long = "generate", value_enum)]
    pub generator: Option<clap_complete::Shell>,
}
