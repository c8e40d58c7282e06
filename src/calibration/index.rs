//! Append-only calibration index.
//!
//! One tab-separated file per role. The first line names the columns:
//!
//! ```text
//! #payload	ORACTIME	READMODE	EXPTIME
//! dark_00003.fits	60314.25	CDS	10
//! ```
//!
//! Rows are only ever appended, one `write_all` per row on a file opened in
//! append mode, so concurrent writers never interleave partial rows.
//!
//! The header is written once. Fields the rules ask for that the header lacks
//! are stored after the positional cells as `FIELD=value`.

use super::rules::CalibrationRules;
use crate::error::{CalibrationError, ParseError};
use crate::frame::ORACTIME;
use crate::header::{HeaderValue, Headers};
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::warn;

/// One calibration candidate.
#[derive(Debug, Clone, PartialEq)]
pub struct IndexEntry {
    /// Calibration file reference or scalar value
    pub payload: String,
    /// Time-ordering value (MJD)
    pub oractime: Option<f64>,
    /// Identity fields captured from the producing frame
    pub fields: Headers,
}

impl IndexEntry {
    /// Build an entry from a producing frame's merged header context.
    pub fn from_context(payload: impl Into<String>, columns: &[String], context: &Headers) -> Self {
        let fields = columns
            .iter()
            .filter_map(|c| context.get(c).map(|v| (c.clone(), v.clone())))
            .collect();
        Self {
            payload: payload.into(),
            oractime: context.get(ORACTIME).and_then(HeaderValue::as_f64),
            fields,
        }
    }
}

#[derive(Debug, Clone)]
pub struct CalibrationIndex {
    role: String,
    path: Option<PathBuf>,
    /// Every field captured for new entries
    columns: Vec<String>,
    /// Positional columns named by the file header
    file_columns: Vec<String>,
    entries: Vec<IndexEntry>,
}

impl CalibrationIndex {
    /// Index that never touches the filesystem.
    pub fn in_memory(role: impl Into<String>, columns: Vec<String>) -> Self {
        Self {
            role: role.into(),
            path: None,
            file_columns: columns.clone(),
            columns,
            entries: Vec::new(),
        }
    }

    /// Open (or prepare to create) the index file at `path`.
    ///
    /// Positional columns come from the file header when it exists, otherwise
    /// from `columns`. Requested columns missing from an existing header are
    /// still captured, as `FIELD=value` cells.
    pub fn open(
        role: impl Into<String>,
        path: impl Into<PathBuf>,
        columns: Vec<String>,
    ) -> Result<Self, CalibrationError> {
        let path = path.into();
        let mut index = Self {
            role: role.into(),
            path: Some(path.clone()),
            file_columns: columns.clone(),
            columns: columns.clone(),
            entries: Vec::new(),
        };
        if path.exists() {
            let text = std::fs::read_to_string(&path).map_err(|source| CalibrationError::Io {
                path: path.clone(),
                source,
            })?;
            index.load_text(&path, &text).map_err(CalibrationError::Index)?;
            let missing: Vec<String> = columns
                .into_iter()
                .filter(|c| !index.file_columns.contains(c))
                .collect();
            if !missing.is_empty() {
                warn!(
                    role = %index.role,
                    index = %path.display(),
                    missing = ?missing,
                    "Index header lacks rule fields; recording them as FIELD=value cells"
                );
            }
            index.columns = index.file_columns.clone();
            index.columns.extend(missing);
        }
        Ok(index)
    }

    fn load_text(&mut self, path: &Path, text: &str) -> Result<(), ParseError> {
        let mut lines = text.lines().enumerate().filter(|(_, l)| !l.trim().is_empty());
        if let Some((_, header)) = lines.next() {
            let header = header.strip_prefix('#').ok_or_else(|| {
                ParseError::new(path, 1, "missing #payload header line")
            })?;
            let mut names = header.split('\t');
            if names.next() != Some("payload") || names.next() != Some(ORACTIME) {
                return Err(ParseError::new(
                    path,
                    1,
                    format!("header must start with payload and {}", ORACTIME),
                ));
            }
            self.file_columns = names.map(str::to_string).collect();
        }
        for (index, line) in lines {
            let mut cells = line.split('\t');
            let payload = cells.next().unwrap_or_default().to_string();
            if payload.is_empty() {
                return Err(ParseError::new(path, index + 1, "empty payload"));
            }
            let oractime = match cells.next().map(str::trim) {
                None | Some("") => None,
                Some(t) => Some(t.parse::<f64>().map_err(|_| {
                    ParseError::new(path, index + 1, format!("bad {} {:?}", ORACTIME, t))
                })?),
            };
            let cells: Vec<&str> = cells.collect();
            let width = self.file_columns.len().min(cells.len());
            let mut fields: Headers = self
                .file_columns
                .iter()
                .zip(&cells[..width])
                .filter(|(_, cell)| !cell.is_empty())
                .map(|(name, cell)| (name.clone(), HeaderValue::parse(cell)))
                .collect();
            for extra in &cells[width..] {
                let (name, value) = extra.split_once('=').ok_or_else(|| {
                    ParseError::new(path, index + 1, format!("expected FIELD=value, got {:?}", extra))
                })?;
                fields.insert(name.to_string(), HeaderValue::parse(value));
            }
            self.entries.push(IndexEntry {
                payload,
                oractime,
                fields,
            });
        }
        Ok(())
    }

    pub fn role(&self) -> &str {
        &self.role
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Entries in insertion order.
    pub fn entries(&self) -> &[IndexEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Append an entry, writing it through to the index file first.
    pub fn append(&mut self, entry: IndexEntry) -> Result<(), CalibrationError> {
        if let Some(path) = &self.path {
            let io_err = |source| CalibrationError::Io {
                path: path.clone(),
                source,
            };
            if let Some(parent) = path.parent() {
                if !parent.as_os_str().is_empty() {
                    std::fs::create_dir_all(parent).map_err(io_err)?;
                }
            }
            let mut file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .map_err(io_err)?;
            let mut buf = String::new();
            if file.metadata().map_err(io_err)?.len() == 0 {
                buf.push_str(&self.header_line());
            }
            buf.push_str(&self.row(&entry));
            file.write_all(buf.as_bytes()).map_err(io_err)?;
        }
        self.entries.push(entry);
        Ok(())
    }

    fn header_line(&self) -> String {
        let mut line = format!("#payload\t{}", ORACTIME);
        for column in &self.file_columns {
            line.push('\t');
            line.push_str(column);
        }
        line.push('\n');
        line
    }

    fn row(&self, entry: &IndexEntry) -> String {
        let mut row = cell(&entry.payload);
        row.push('\t');
        if let Some(t) = entry.oractime {
            row.push_str(&t.to_string());
        }
        for column in &self.file_columns {
            row.push('\t');
            if let Some(value) = entry.fields.get(column) {
                row.push_str(&cell(&value.to_string()));
            }
        }
        for column in self.columns.iter().filter(|c| !self.file_columns.contains(c)) {
            if let Some(value) = entry.fields.get(column) {
                row.push('\t');
                row.push_str(column);
                row.push('=');
                row.push_str(&cell(&value.to_string()));
            }
        }
        row.push('\n');
        row
    }

    /// Compatible entry nearest in time to the context.
    ///
    /// Distance is `|entry.ORACTIME - context.ORACTIME|`; equidistant entries
    /// resolve to the earliest inserted. A context without ORACTIME takes the
    /// most recently inserted compatible entry.
    pub fn nearest(
        &self,
        rules: &CalibrationRules,
        context: &Headers,
    ) -> Result<&IndexEntry, CalibrationError> {
        let target = context.get(ORACTIME).and_then(HeaderValue::as_f64);
        let mut best: Option<(&IndexEntry, f64)> = None;
        let mut last_reason = None;
        for entry in &self.entries {
            if let Err(reason) = rules.check(&entry.fields, context) {
                last_reason = Some(reason);
                continue;
            }
            let distance = match (target, entry.oractime) {
                (None, _) => 0.0,
                (Some(t), Some(e)) => (e - t).abs(),
                (Some(_), None) => f64::INFINITY,
            };
            let better = match best {
                None => true,
                Some((_, d)) if target.is_none() => distance <= d,
                Some((_, d)) => distance < d,
            };
            if better {
                best = Some((entry, distance));
            }
        }
        best.map(|(entry, _)| entry)
            .ok_or_else(|| CalibrationError::NoSuitable {
                role: self.role.clone(),
                reason: match last_reason {
                    Some(reason) => format!(
                        "none of {} entries compatible (last mismatch: {})",
                        self.entries.len(),
                        reason
                    ),
                    None => "index is empty".to_string(),
                },
            })
    }
}

fn cell(value: &str) -> String {
    value.replace(['\t', '\n', '\r'], " ")
}
