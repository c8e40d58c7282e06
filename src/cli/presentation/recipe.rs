//! Compiled recipe formatting.

use super::format_section_heading;
use crate::error::PipelineError;
use crate::recipe::CompiledRecipe;
use serde_json::json;

pub fn format_compiled_text(recipe: &CompiledRecipe) -> String {
    let mut out = String::new();
    out.push_str(&format!("{}\n\n", format_section_heading(&recipe.name)));
    for source in &recipe.sources {
        out.push_str(&format!("  source: {}\n", source.display()));
    }
    out.push_str(&format!("  fingerprint: {}\n\n", recipe.fingerprint()));
    out.push_str(&recipe.render());
    if !recipe.faults.is_empty() {
        out.push_str(&format!("\n{}\n\n", format_section_heading("Syntax faults")));
        for fault in &recipe.faults {
            out.push_str(&format!(
                "  {} line {}: {}\n",
                fault.source, fault.line, fault.message
            ));
            for line in &fault.window {
                out.push_str(&format!("      {}\n", line));
            }
        }
    }
    out
}

pub fn format_compiled_json(recipe: &CompiledRecipe) -> Result<String, PipelineError> {
    let faults: Vec<_> = recipe
        .faults
        .iter()
        .map(|f| {
            json!({
                "source": f.source,
                "path": f.path,
                "line": f.line,
                "message": f.message,
                "window": f.window,
            })
        })
        .collect();
    let out = json!({
        "recipe": recipe.name,
        "fingerprint": recipe.fingerprint(),
        "sources": recipe.sources,
        "steps": recipe.steps.len(),
        "listing": recipe.render().lines().collect::<Vec<_>>(),
        "faults": faults,
    });
    Ok(serde_json::to_string_pretty(&out)?)
}
