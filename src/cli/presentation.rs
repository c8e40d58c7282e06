//! CLI presentation: text (comfy-table) and JSON renderings of command results.

mod index;
mod recipe;
mod run;

pub use index::{format_index_json, format_index_text};
pub use recipe::{format_compiled_json, format_compiled_text};
pub use run::{format_run_summary_json, format_run_summary_text};

use owo_colors::OwoColorize;

/// Section heading in bold/underline.
pub fn format_section_heading(title: &str) -> String {
    format!("{}", title.bold().underline())
}
