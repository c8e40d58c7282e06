//! Recipe and primitive source files.
//!
//! A source file is read whole and classified line by line:
//!
//! ```text
//! # comment
//! _DARK_SUBTRACT method=median label="first pass"
//! kappa.invoke("stats", "in=$file")
//! $status = kappa.invoke("stats", "in=$file")
//! print Reducing $file
//! $status = require EXPTIME > 0
//! ```

use crate::error::RecipeError;
use regex::Regex;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SourceKind {
    Recipe,
    Primitive,
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SourceKind::Recipe => f.write_str("Recipe"),
            SourceKind::Primitive => f.write_str("Primitive"),
        }
    }
}

/// Ordered directories to look for sources in. Overrides come first.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SearchPath {
    overrides: Vec<PathBuf>,
    builtin: Vec<PathBuf>,
}

impl SearchPath {
    pub fn new(overrides: Vec<PathBuf>, builtin: Vec<PathBuf>) -> Self {
        Self { overrides, builtin }
    }

    pub fn dirs(&self) -> impl Iterator<Item = &PathBuf> {
        self.overrides.iter().chain(self.builtin.iter())
    }

    /// First directory holding a file called `name`.
    pub fn find(&self, name: &str) -> Option<PathBuf> {
        self.dirs().map(|dir| dir.join(name)).find(|p| p.is_file())
    }

    pub fn describe(&self) -> String {
        self.dirs()
            .map(|d| d.display().to_string())
            .collect::<Vec<_>>()
            .join(":")
    }
}

/// A loaded recipe or primitive.
#[derive(Debug, Clone)]
pub struct SourceFile {
    pub kind: SourceKind,
    pub name: String,
    pub path: PathBuf,
    pub lines: Vec<String>,
}

impl SourceFile {
    pub fn load(kind: SourceKind, name: &str, search: &SearchPath) -> Result<Self, RecipeError> {
        let path = search.find(name).ok_or_else(|| RecipeError::NotFound {
            kind,
            name: name.to_string(),
            searched: search.describe(),
        })?;
        let text = std::fs::read_to_string(&path).map_err(|source| RecipeError::Io {
            kind,
            path: path.clone(),
            source,
        })?;
        Ok(Self::from_text(kind, name, path, &text))
    }

    pub fn from_text(kind: SourceKind, name: &str, path: impl Into<PathBuf>, text: &str) -> Self {
        Self {
            kind,
            name: name.to_string(),
            path: path.into(),
            lines: text.lines().map(str::to_string).collect(),
        }
    }

    /// Lines `line - 2 ..= line + 2` (1-based), the faulty one marked with `>>`.
    pub fn window(&self, line: usize) -> Vec<String> {
        let first = line.saturating_sub(2).max(1);
        let last = (line + 2).min(self.lines.len());
        (first..=last)
            .map(|n| {
                let marker = if n == line { ">>" } else { "  " };
                format!("{} {:4}: {}", marker, n, self.lines[n - 1])
            })
            .collect()
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// What a single source line asks for.
#[derive(Debug, Clone, PartialEq)]
pub enum SourceLine {
    /// Empty or comment
    Blank,
    Primitive {
        name: String,
        args: Vec<(String, String)>,
    },
    EngineCall {
        engine: String,
        operation: String,
        args: String,
        /// `$status = ` prefix: the line handles its own status
        explicit: bool,
    },
    Action {
        name: String,
        text: String,
        /// `$status = ` prefix: the action's status goes through a check
        explicit: bool,
    },
    Malformed(String),
}

fn engine_call_pattern() -> Option<&'static Regex> {
    static PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
    PATTERN
        .get_or_init(|| {
            Regex::new(
                r#"^([A-Za-z][A-Za-z0-9_]*)\.invoke\(\s*"([^"]+)"\s*(?:,\s*"([^"]*)"\s*)?\)\s*;?$"#,
            )
            .ok()
        })
        .as_ref()
}

fn status_prefix_pattern() -> Option<&'static Regex> {
    static PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
    PATTERN
        .get_or_init(|| Regex::new(r"^\$status\s*=\s*(.+)$").ok())
        .as_ref()
}

fn is_identifier(token: &str, first: impl Fn(char) -> bool) -> bool {
    let mut chars = token.chars();
    chars.next().map(first).unwrap_or(false)
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// Classify one source line.
pub fn classify(raw: &str) -> SourceLine {
    let line = raw.trim();
    if line.is_empty() || line.starts_with('#') {
        return SourceLine::Blank;
    }

    if line.starts_with('_') {
        let (name, rest) = split_first_token(line);
        if !is_identifier(name, |c| c == '_') || name.len() < 2 {
            return SourceLine::Malformed(format!("bad primitive name {:?}", name));
        }
        return match parse_args(rest) {
            Ok(args) => SourceLine::Primitive {
                name: name.to_string(),
                args,
            },
            Err(message) => SourceLine::Malformed(message),
        };
    }

    let (explicit, body) = match status_prefix_pattern().and_then(|re| re.captures(line)) {
        Some(caps) => (true, caps.get(1).map(|m| m.as_str()).unwrap_or_default().trim()),
        None => (false, line),
    };

    if body.contains(".invoke(") {
        return match engine_call_pattern().and_then(|re| re.captures(body)) {
            Some(caps) => SourceLine::EngineCall {
                engine: caps[1].to_string(),
                operation: caps[2].to_string(),
                args: caps.get(3).map(|m| m.as_str().to_string()).unwrap_or_default(),
                explicit,
            },
            None => SourceLine::Malformed(
                "malformed engine call, expected ENGINE.invoke(\"op\", \"args\")".to_string(),
            ),
        };
    }

    let (name, rest) = split_first_token(body);
    if !is_identifier(name, |c| c.is_ascii_alphabetic()) {
        return SourceLine::Malformed(format!("unrecognised statement {:?}", name));
    }
    SourceLine::Action {
        name: name.to_string(),
        text: rest.to_string(),
        explicit,
    }
}

fn split_first_token(line: &str) -> (&str, &str) {
    match line.split_once(char::is_whitespace) {
        Some((first, rest)) => (first, rest.trim()),
        None => (line, ""),
    }
}

/// Parse `k=v k2="quoted value"` pairs, keeping their order.
pub fn parse_args(text: &str) -> Result<Vec<(String, String)>, String> {
    let mut args = Vec::new();
    let mut rest = text.trim_start();
    while !rest.is_empty() {
        let (key, after) = rest
            .split_once('=')
            .ok_or_else(|| format!("expected key=value, got {:?}", rest))?;
        if !is_identifier(key, |c| c.is_ascii_alphabetic() || c == '_') {
            return Err(format!("bad argument name {:?}", key));
        }
        let (value, remaining) = if let Some(quoted) = after.strip_prefix('"') {
            let end = quoted
                .find('"')
                .ok_or_else(|| format!("unterminated quote in argument {}", key))?;
            (&quoted[..end], &quoted[end + 1..])
        } else {
            match after.find(char::is_whitespace) {
                Some(end) => (&after[..end], &after[end..]),
                None => (after, ""),
            }
        };
        if !remaining.is_empty() && !remaining.starts_with(char::is_whitespace) {
            return Err(format!("missing space after argument {}", key));
        }
        args.push((key.to_string(), value.to_string()));
        rest = remaining.trim_start();
    }
    Ok(args)
}
