//! Observation headers.
//!
//! Headers are ordered key/value maps. Raw files carry them as FITS-style
//! 80-column cards at the start of the file; `FitsHeaderReader` reads those cards
//! up to the `END` card.

use crate::error::{FrameError, ParseError};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

/// Width of a FITS header card.
const CARD_WIDTH: usize = 80;

/// Upper bound on how much of a raw file is scanned for header cards.
const MAX_HEADER_BYTES: u64 = 2880 * 64;

/// A single header value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum HeaderValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
}

impl HeaderValue {
    /// Parse a bare token: integers, floats, then strings.
    pub fn parse(raw: &str) -> Self {
        let raw = raw.trim();
        if let Ok(i) = raw.parse::<i64>() {
            return HeaderValue::Int(i);
        }
        if let Ok(f) = raw.parse::<f64>() {
            return HeaderValue::Float(f);
        }
        HeaderValue::Str(raw.to_string())
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            HeaderValue::Int(i) => Some(*i as f64),
            HeaderValue::Float(f) => Some(*f),
            HeaderValue::Str(s) => s.trim().parse().ok(),
            HeaderValue::Bool(_) => None,
        }
    }

    /// Equality that treats `5` and `5.0` (or `"5"`) as the same value.
    pub fn loosely_equals(&self, other: &HeaderValue) -> bool {
        match (self.as_f64(), other.as_f64()) {
            (Some(a), Some(b)) => a == b,
            _ => self.to_string().trim() == other.to_string().trim(),
        }
    }
}

impl fmt::Display for HeaderValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HeaderValue::Bool(b) => write!(f, "{}", if *b { "T" } else { "F" }),
            HeaderValue::Int(i) => write!(f, "{}", i),
            HeaderValue::Float(v) => write!(f, "{}", v),
            HeaderValue::Str(s) => f.write_str(s),
        }
    }
}

impl From<&str> for HeaderValue {
    fn from(value: &str) -> Self {
        HeaderValue::Str(value.to_string())
    }
}

impl From<String> for HeaderValue {
    fn from(value: String) -> Self {
        HeaderValue::Str(value)
    }
}

impl From<i64> for HeaderValue {
    fn from(value: i64) -> Self {
        HeaderValue::Int(value)
    }
}

impl From<f64> for HeaderValue {
    fn from(value: f64) -> Self {
        HeaderValue::Float(value)
    }
}

pub type Headers = BTreeMap<String, HeaderValue>;

/// Reads the header of a raw observation file.
pub trait HeaderReader: Send + Sync {
    fn read_headers(&self, path: &Path) -> Result<Headers, FrameError>;
}

/// FITS-style card reader.
#[derive(Debug, Default, Clone)]
pub struct FitsHeaderReader;

impl HeaderReader for FitsHeaderReader {
    fn read_headers(&self, path: &Path) -> Result<Headers, FrameError> {
        let file = File::open(path).map_err(|source| FrameError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let mut bytes = Vec::new();
        BufReader::new(file)
            .take(MAX_HEADER_BYTES)
            .read_to_end(&mut bytes)
            .map_err(|source| FrameError::Io {
                path: path.to_path_buf(),
                source,
            })?;
        parse_cards(path, &bytes).map_err(FrameError::Header)
    }
}

/// Split the raw bytes into cards. Newline-terminated cards and fixed 80-column
/// cards are both accepted.
fn split_cards(bytes: &[u8]) -> Vec<String> {
    let text = String::from_utf8_lossy(bytes);
    let mut cards = Vec::new();
    for line in text.split('\n') {
        let line = line.trim_end_matches('\r');
        if line.len() <= CARD_WIDTH {
            cards.push(line.to_string());
            continue;
        }
        let chars: Vec<char> = line.chars().collect();
        for chunk in chars.chunks(CARD_WIDTH) {
            cards.push(chunk.iter().collect());
        }
    }
    cards
}

pub fn parse_cards(path: &Path, bytes: &[u8]) -> Result<Headers, ParseError> {
    let mut headers = Headers::new();
    for (index, card) in split_cards(bytes).iter().enumerate() {
        let line = index + 1;
        let keyword = card.get(..8.min(card.len())).unwrap_or("").trim();
        if keyword == "END" {
            break;
        }
        if keyword.is_empty() || keyword == "COMMENT" || keyword == "HISTORY" {
            continue;
        }
        let Some(eq) = card.find('=') else {
            // Not a value card; ignore commentary keywords we do not know about.
            continue;
        };
        let key = card[..eq].trim();
        if key.is_empty() || key.contains(char::is_whitespace) {
            return Err(ParseError::new(path, line, format!("bad keyword in card {:?}", card)));
        }
        let value = parse_card_value(&card[eq + 1..])
            .map_err(|message| ParseError::new(path, line, message))?;
        headers.insert(key.to_string(), value);
    }
    Ok(headers)
}

fn parse_card_value(raw: &str) -> Result<HeaderValue, String> {
    let raw = raw.trim_start();
    if let Some(rest) = raw.strip_prefix('\'') {
        // FITS strings escape a quote by doubling it.
        let mut value = String::new();
        let mut chars = rest.chars().peekable();
        loop {
            match chars.next() {
                Some('\'') if chars.peek() == Some(&'\'') => {
                    chars.next();
                    value.push('\'');
                }
                Some('\'') => return Ok(HeaderValue::Str(value.trim_end().to_string())),
                Some(c) => value.push(c),
                None => return Err("unterminated string value".to_string()),
            }
        }
    }
    let token = raw.split('/').next().unwrap_or("").trim();
    match token {
        "T" => Ok(HeaderValue::Bool(true)),
        "F" => Ok(HeaderValue::Bool(false)),
        "" => Ok(HeaderValue::Str(String::new())),
        other => Ok(HeaderValue::parse(other)),
    }
}

/// Render headers as FITS cards; used by tests and fixtures.
pub fn render_cards(headers: &[(&str, HeaderValue)]) -> String {
    let mut out = String::new();
    for (key, value) in headers {
        let rendered = match value {
            HeaderValue::Str(s) => format!("'{}'", s.replace('\'', "''")),
            other => other.to_string(),
        };
        out.push_str(&format!("{:<8}= {:>20}\n", key, rendered));
    }
    out.push_str("END\n");
    out
}
