//! CLI parse: clap types for orac. No behavior; definitions only.

use crate::arrival::LoopKind;
use crate::frame::UtDate;
use crate::group::badobs::parse_obs_list;
use crate::pipeline::parse_calib;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// orac - recipe-driven data reduction pipeline
#[derive(Parser)]
#[command(name = "orac")]
#[command(about = "Run data reduction recipes over observations as they arrive")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Workspace root directory
    #[arg(long, global = true, default_value = ".")]
    pub workspace: PathBuf,

    /// Configuration file path (overrides default config loading)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(long, global = true)]
    pub verbose: bool,

    /// Disable logging
    #[arg(long, global = true)]
    pub quiet: bool,

    /// Log level (trace, debug, info, warn, error, off)
    #[arg(long, global = true)]
    pub log_level: Option<String>,

    /// Log format (json, text)
    #[arg(long, global = true)]
    pub log_format: Option<String>,

    /// Log output (stdout, stderr, file, both)
    #[arg(long, global = true)]
    pub log_output: Option<String>,

    /// Log file path (if output includes "file")
    #[arg(long, global = true)]
    pub log_file: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Reduce observations
    Run(RunArgs),
    /// Compile a recipe and print the expanded steps
    Compile {
        /// Recipe name
        recipe: String,
        /// Instrument (overrides configuration)
        #[arg(long)]
        instrument: Option<String>,
        /// Output format (text or json)
        #[arg(long, default_value = "text")]
        format: String,
    },
    /// Show the calibration index for a role
    Index {
        /// Calibration role (dark, flat, ...)
        role: String,
        /// Instrument (overrides configuration)
        #[arg(long)]
        instrument: Option<String>,
        /// Output format (text or json)
        #[arg(long, default_value = "text")]
        format: String,
    },
    /// Print the effective configuration as TOML
    Config,
}

/// Observation numbers given with `--list`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObsList(pub Vec<u32>);

fn parse_obs_list_arg(text: &str) -> Result<ObsList, String> {
    parse_obs_list(text).map(ObsList)
}

#[derive(clap::Args, Debug, Clone, Default)]
pub struct RunArgs {
    /// First observation number
    #[arg(long)]
    pub from: Option<u32>,

    /// Last observation number (inclusive)
    #[arg(long)]
    pub to: Option<u32>,

    /// Observation list, e.g. 1,3,5:9
    #[arg(long, value_parser = parse_obs_list_arg, conflicts_with_all = ["from", "to"])]
    pub list: Option<ObsList>,

    /// How to wait for data
    #[arg(long = "loop", value_enum)]
    pub loop_kind: Option<LoopKind>,

    /// Skip missing observations instead of stopping
    #[arg(long)]
    pub skip: bool,

    /// Read every observation before running any recipe
    #[arg(long)]
    pub batch: bool,

    /// Pin a calibration, ROLE=VALUE (repeatable)
    #[arg(long = "calib", value_parser = parse_calib)]
    pub calib: Vec<(String, String)>,

    /// UT date, YYYYMMDD (default: today)
    #[arg(long = "ut")]
    pub utdate: Option<UtDate>,

    /// Use this recipe for every observation
    #[arg(long)]
    pub recipe: Option<String>,

    /// Instrument (overrides configuration)
    #[arg(long)]
    pub instrument: Option<String>,

    /// Summary format (text or json)
    #[arg(long, default_value = "text")]
    pub format: String,
}
