//! CLI domain: parse, route, help, output, and presentation only.
//! No pipeline logic; a single route table dispatches to the pipeline.

mod help;
mod output;
mod parse;
mod presentation;
mod route;

pub use help::{command_name, output_format};
pub use output::{exit_code, map_error};
pub use parse::{Cli, Commands, ObsList, RunArgs};
pub use presentation::{
    format_compiled_json, format_compiled_text, format_index_json, format_index_text,
    format_run_summary_json, format_run_summary_text, format_section_heading,
};
pub use route::{CommandOutput, RunContext};
