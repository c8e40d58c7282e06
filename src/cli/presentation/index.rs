//! Calibration index formatting.

use super::format_section_heading;
use crate::calibration::CalibrationIndex;
use crate::error::PipelineError;
use comfy_table::presets::UTF8_BORDERS_ONLY;
use comfy_table::Table;
use serde_json::json;

pub fn format_index_text(index: &CalibrationIndex) -> String {
    let mut out = String::new();
    out.push_str(&format!(
        "{}\n\n",
        format_section_heading(&format!("Calibration index: {}", index.role()))
    ));
    if let Some(path) = index.path() {
        out.push_str(&format!("  File: {}\n", path.display()));
    }
    if index.is_empty() {
        out.push_str("  No entries.\n");
        return out;
    }

    let mut table = Table::new();
    table.load_preset(UTF8_BORDERS_ONLY);
    let mut header = vec!["#".to_string(), "Payload".to_string(), "ORACTIME".to_string()];
    header.extend(index.columns().iter().cloned());
    table.set_header(header);
    for (i, entry) in index.entries().iter().enumerate() {
        let mut row = vec![
            (i + 1).to_string(),
            entry.payload.clone(),
            entry
                .oractime
                .map(|t| format!("{:.6}", t))
                .unwrap_or_else(|| "-".to_string()),
        ];
        row.extend(index.columns().iter().map(|c| {
            entry
                .fields
                .get(c)
                .map(|v| v.to_string())
                .unwrap_or_else(|| "-".to_string())
        }));
        table.add_row(row);
    }
    out.push_str(&format!("\n{}\n", table));
    out
}

pub fn format_index_json(index: &CalibrationIndex) -> Result<String, PipelineError> {
    let entries: Vec<_> = index
        .entries()
        .iter()
        .map(|entry| {
            let fields: serde_json::Map<String, serde_json::Value> = entry
                .fields
                .iter()
                .map(|(k, v)| (k.clone(), json!(v.to_string())))
                .collect();
            json!({
                "payload": entry.payload,
                "oractime": entry.oractime,
                "fields": fields,
            })
        })
        .collect();
    let out = json!({
        "role": index.role(),
        "path": index.path(),
        "columns": index.columns(),
        "entries": entries,
    });
    Ok(serde_json::to_string_pretty(&out)?)
}
