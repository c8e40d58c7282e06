//! Bad-observation filter.
//!
//! Rule file format, one rule per line:
//!
//! ```text
//! # UT date followed by observation numbers, lists and ranges
//! 20240105 12,14,20:25
//! # header predicate; every clause must hold
//! where FILTER == "K" && EXPTIME != 0
//! ```

use crate::error::ParseError;
use crate::frame::{Frame, UtDate};
use crate::header::HeaderValue;
use std::collections::{BTreeSet, HashMap};
use std::path::Path;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClauseOp {
    Eq,
    Ne,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Clause {
    pub key: String,
    pub op: ClauseOp,
    pub value: HeaderValue,
}

impl Clause {
    fn holds(&self, frame: &Frame) -> bool {
        let equal = frame
            .header(&self.key)
            .map(|v| v.loosely_equals(&self.value))
            .unwrap_or(false);
        match self.op {
            ClauseOp::Eq => equal,
            ClauseOp::Ne => frame.header(&self.key).is_some() && !equal,
        }
    }
}

/// Conjunction of clauses.
#[derive(Debug, Clone, PartialEq)]
pub struct Predicate {
    pub clauses: Vec<Clause>,
}

impl Predicate {
    pub fn matches(&self, frame: &Frame) -> bool {
        !self.clauses.is_empty() && self.clauses.iter().all(|c| c.holds(frame))
    }
}

#[derive(Debug, Clone, Default)]
pub struct BadObsFilter {
    excluded: HashMap<UtDate, BTreeSet<u32>>,
    predicates: Vec<Predicate>,
}

impl BadObsFilter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load rules from a file. A missing file yields an empty filter.
    pub fn load(path: &Path) -> Result<Self, ParseError> {
        if !path.exists() {
            return Ok(Self::new());
        }
        let text = std::fs::read_to_string(path)
            .map_err(|e| ParseError::new(path, 0, format!("unreadable: {}", e)))?;
        Self::parse(path, &text)
    }

    pub fn parse(path: &Path, text: &str) -> Result<Self, ParseError> {
        let mut filter = Self::new();
        for (index, raw) in text.lines().enumerate() {
            let line = raw.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let err = |message: String| ParseError::new(path, index + 1, message);
            if let Some(rest) = line.strip_prefix("where ") {
                filter.predicates.push(parse_predicate(rest).map_err(err)?);
                continue;
            }
            let mut parts = line.split_whitespace();
            let utdate: UtDate = parts
                .next()
                .unwrap_or_default()
                .parse()
                .map_err(err)?;
            let list: String = parts.collect::<Vec<_>>().join(",");
            for obsnum in parse_obs_list(&list).map_err(err)? {
                filter.exclude(utdate, obsnum);
            }
        }
        Ok(filter)
    }

    pub fn exclude(&mut self, utdate: UtDate, obsnum: u32) {
        self.excluded.entry(utdate).or_default().insert(obsnum);
    }

    pub fn add_predicate(&mut self, predicate: Predicate) {
        self.predicates.push(predicate);
    }

    pub fn is_empty(&self) -> bool {
        self.excluded.is_empty() && self.predicates.is_empty()
    }

    /// True when the frame is excluded by an observation entry or a predicate.
    pub fn matches(&self, frame: &Frame) -> bool {
        let listed = self
            .excluded
            .get(&frame.utdate())
            .map(|set| set.contains(&frame.obsnum()))
            .unwrap_or(false);
        listed || self.predicates.iter().any(|p| p.matches(frame))
    }
}

/// Parse `1,3,5:9` into observation numbers. Ranges are inclusive.
pub fn parse_obs_list(list: &str) -> Result<Vec<u32>, String> {
    let mut out = Vec::new();
    for item in list.split(',').map(str::trim).filter(|s| !s.is_empty()) {
        match item.split_once(':') {
            Some((start, end)) => {
                let start: u32 = start
                    .trim()
                    .parse()
                    .map_err(|_| format!("bad range start in {:?}", item))?;
                let end: u32 = end
                    .trim()
                    .parse()
                    .map_err(|_| format!("bad range end in {:?}", item))?;
                if end < start {
                    return Err(format!("descending range {:?}", item));
                }
                out.extend(start..=end);
            }
            None => out.push(
                item.parse()
                    .map_err(|_| format!("bad observation number {:?}", item))?,
            ),
        }
    }
    if out.is_empty() {
        return Err("no observation numbers given".to_string());
    }
    Ok(out)
}

fn parse_predicate(text: &str) -> Result<Predicate, String> {
    let mut clauses = Vec::new();
    for part in text.split("&&") {
        let part = part.trim();
        let (key, op, value) = if let Some((k, v)) = part.split_once("!=") {
            (k, ClauseOp::Ne, v)
        } else if let Some((k, v)) = part.split_once("==") {
            (k, ClauseOp::Eq, v)
        } else {
            return Err(format!("expected KEY == VALUE or KEY != VALUE, got {:?}", part));
        };
        let key = key.trim();
        if key.is_empty() {
            return Err(format!("missing header key in {:?}", part));
        }
        let value = value.trim();
        let value = match value.strip_prefix('"').and_then(|v| v.strip_suffix('"')) {
            Some(quoted) => HeaderValue::Str(quoted.to_string()),
            None => HeaderValue::parse(value),
        };
        clauses.push(Clause {
            key: key.to_string(),
            op,
            value,
        });
    }
    Ok(Predicate { clauses })
}
