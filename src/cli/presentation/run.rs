//! Run summary formatting.

use super::format_section_heading;
use crate::error::PipelineError;
use crate::pipeline::{RunSummary, StopReason};
use crate::status::Status;
use comfy_table::presets::UTF8_BORDERS_ONLY;
use comfy_table::Table;
use owo_colors::OwoColorize;

fn colored_status(status: Status) -> String {
    match status {
        Status::Ok => status.as_str().green().to_string(),
        Status::Terminated => status.as_str().yellow().to_string(),
        Status::Error | Status::BadEngine => status.as_str().red().to_string(),
    }
}

fn describe_stop(reason: &StopReason) -> String {
    match reason {
        StopReason::Completed => "all requested observations processed".to_string(),
        StopReason::EndOfData { obsnum } => format!("observation {} not found", obsnum),
        StopReason::Timeout { message, .. } => message.clone(),
        StopReason::UserAbort => "aborted by user".to_string(),
    }
}

pub fn format_run_summary_text(summary: &RunSummary) -> String {
    let mut out = String::new();
    out.push_str(&format!("{}\n\n", format_section_heading("Run Summary")));
    out.push_str(&format!("  Run: {}\n", summary.run_id));
    out.push_str(&format!(
        "  Loop: {}{}\n",
        summary.loop_kind,
        if summary.batch { " (batch)" } else { "" }
    ));
    out.push_str(&format!("  Stopped: {}\n", describe_stop(&summary.stopped)));
    out.push_str(&format!("  Elapsed: {} ms\n\n", summary.duration_ms));

    let mut table = Table::new();
    table.load_preset(UTF8_BORDERS_ONLY);
    table.set_header(vec!["Status", "Frames"]);
    for (status, count) in [
        (Status::Ok, summary.stats.ok),
        (Status::Terminated, summary.stats.terminated),
        (Status::BadEngine, summary.stats.bad_engine),
        (Status::Error, summary.stats.error),
    ] {
        table.add_row(vec![colored_status(status), count.to_string()]);
    }
    out.push_str(&format!("{}\n\n", table));

    if !summary.groups.is_empty() {
        out.push_str(&format!("{}\n\n", format_section_heading("Groups")));
        let mut table = Table::new();
        table.load_preset(UTF8_BORDERS_ONLY);
        table.set_header(vec!["Group", "File", "Members", "Frames"]);
        for group in &summary.groups {
            let members: Vec<String> = group.members.iter().map(u32::to_string).collect();
            table.add_row(vec![
                group.key.clone(),
                group.file.display().to_string(),
                members.join(","),
                group.all_members.to_string(),
            ]);
        }
        out.push_str(&format!("{}\n\n", table));
    }

    if !summary.errors.is_empty() {
        out.push_str(&format!("{}\n\n", format_section_heading("Errors")));
        for report in &summary.errors {
            let obs = report
                .obsnum
                .map(|n| format!("obs {} ", n))
                .unwrap_or_default();
            let scope = report
                .scope
                .as_ref()
                .map(|s| format!(" [{}]", s))
                .unwrap_or_default();
            out.push_str(&format!(
                "  {} {}{}{}: {}\n",
                colored_status(report.status),
                obs,
                report.recipe,
                scope,
                report.message
            ));
            for line in &report.window {
                out.push_str(&format!("      {}\n", line));
            }
        }
    }
    out
}

pub fn format_run_summary_json(summary: &RunSummary) -> Result<String, PipelineError> {
    Ok(serde_json::to_string_pretty(summary)?)
}
