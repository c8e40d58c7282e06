//! `$name` / `${name}` substitution in argument values and action text.
//!
//! `$$` produces a literal `$`. A `$` not followed by a name is kept as is.

use regex::{Captures, Regex};
use std::sync::OnceLock;

fn variable_pattern() -> Option<&'static Regex> {
    static PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
    PATTERN
        .get_or_init(|| Regex::new(r"\$(?:\{([^}]+)\}|([A-Za-z_][A-Za-z0-9_]*)|(\$))").ok())
        .as_ref()
}

/// Replace every variable reference with what `resolve` returns for its name.
///
/// The first resolution failure aborts the substitution.
pub fn interpolate<F>(template: &str, mut resolve: F) -> Result<String, String>
where
    F: FnMut(&str) -> Result<String, String>,
{
    let Some(pattern) = variable_pattern() else {
        return Ok(template.to_string());
    };
    let mut out = String::with_capacity(template.len());
    let mut last = 0;
    for caps in pattern.captures_iter(template) {
        let Some(whole) = caps.get(0) else { continue };
        out.push_str(&template[last..whole.start()]);
        last = whole.end();
        match name(&caps) {
            Some(name) => out.push_str(&resolve(name)?),
            None => out.push('$'),
        }
    }
    out.push_str(&template[last..]);
    Ok(out)
}

fn name<'t>(caps: &Captures<'t>) -> Option<&'t str> {
    caps.get(1).or_else(|| caps.get(2)).map(|m| m.as_str().trim())
}

/// Names referenced by `template`, in order of appearance.
pub fn references(template: &str) -> Vec<String> {
    variable_pattern()
        .map(|pattern| {
            pattern
                .captures_iter(template)
                .filter_map(|caps| name(&caps).map(str::to_string))
                .collect()
        })
        .unwrap_or_default()
}
