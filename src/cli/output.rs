//! CLI output: error mapping from pipeline errors to the CLI surface.

use crate::error::PipelineError;
use owo_colors::OwoColorize;

/// Map a pipeline error to the message printed on stderr.
pub fn map_error(e: &PipelineError) -> String {
    let label = if e.is_user_abort() { "aborted" } else { "error" };
    format!("{}: {}", label.red().bold(), e)
}

/// Process exit status for a failed command.
pub fn exit_code(e: &PipelineError) -> i32 {
    if e.is_user_abort() {
        0
    } else {
        1
    }
}
