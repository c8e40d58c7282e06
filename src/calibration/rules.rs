//! Per-role compatibility rules.
//!
//! ```text
//! # rules.dark
//! READMODE
//! EXPTIME ~ 0.5
//! ```

use crate::error::{CalibrationError, ParseError};
use crate::header::Headers;
use std::path::Path;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FieldMatch {
    Exact,
    /// Numeric match within an absolute tolerance
    Within(f64),
}

#[derive(Debug, Clone, PartialEq)]
pub struct FieldRule {
    pub field: String,
    pub matching: FieldMatch,
}

impl FieldRule {
    fn check(&self, entry: &Headers, context: &Headers) -> Result<(), String> {
        let Some(wanted) = context.get(&self.field) else {
            return Err(format!("frame has no {}", self.field));
        };
        let Some(have) = entry.get(&self.field) else {
            return Err(format!("entry has no {}", self.field));
        };
        match self.matching {
            FieldMatch::Exact if have.loosely_equals(wanted) => Ok(()),
            FieldMatch::Exact => Err(format!("{}: {} != {}", self.field, have, wanted)),
            FieldMatch::Within(tol) => match (have.as_f64(), wanted.as_f64()) {
                (Some(a), Some(b)) if (a - b).abs() <= tol => Ok(()),
                (Some(a), Some(b)) => Err(format!(
                    "{}: |{} - {}| exceeds {}",
                    self.field, a, b, tol
                )),
                _ => Err(format!("{}: not numeric", self.field)),
            },
        }
    }
}

/// Fields that must agree between a frame and an index entry.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CalibrationRules {
    pub fields: Vec<FieldRule>,
}

impl CalibrationRules {
    /// Load a rules file. A missing file means no constraints.
    pub fn load(path: &Path) -> Result<Self, CalibrationError> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let text = std::fs::read_to_string(path).map_err(|source| CalibrationError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(path, &text).map_err(CalibrationError::Rules)
    }

    pub fn parse(path: &Path, text: &str) -> Result<Self, ParseError> {
        let mut fields = Vec::new();
        for (index, raw) in text.lines().enumerate() {
            let line = raw.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let rule = match line.split_once('~') {
                Some((field, tol)) => {
                    let tol: f64 = tol.trim().parse().map_err(|_| {
                        ParseError::new(path, index + 1, format!("bad tolerance {:?}", tol.trim()))
                    })?;
                    if tol.is_nan() || tol < 0.0 {
                        return Err(ParseError::new(path, index + 1, "tolerance must be >= 0"));
                    }
                    FieldRule {
                        field: field.trim().to_string(),
                        matching: FieldMatch::Within(tol),
                    }
                }
                None => FieldRule {
                    field: line.to_string(),
                    matching: FieldMatch::Exact,
                },
            };
            if rule.field.is_empty() || rule.field.contains(char::is_whitespace) {
                return Err(ParseError::new(
                    path,
                    index + 1,
                    format!("bad field name {:?}", rule.field),
                ));
            }
            fields.push(rule);
        }
        Ok(Self { fields })
    }

    /// Field names in declaration order.
    pub fn field_names(&self) -> Vec<String> {
        self.fields.iter().map(|r| r.field.clone()).collect()
    }

    /// `Ok` when every rule holds; otherwise the first mismatch.
    pub fn check(&self, entry: &Headers, context: &Headers) -> Result<(), String> {
        self.fields.iter().try_for_each(|r| r.check(entry, context))
    }

    pub fn is_compatible(&self, entry: &Headers, context: &Headers) -> bool {
        self.check(entry, context).is_ok()
    }
}
