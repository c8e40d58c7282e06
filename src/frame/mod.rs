//! Observation Frames
//!
//! One raw observation file, its header, the values the pipeline derives from it,
//! and its processing state. A frame is created by the data-arrival loop,
//! configured immediately, and then handed to exactly one group.

pub mod oractime;
pub mod utdate;

pub use oractime::{mjd_from_headers, ORACTIME};
pub use utdate::UtDate;

use crate::error::FrameError;
use crate::header::{HeaderValue, Headers};
use crate::instrument::Instrument;
use std::path::{Path, PathBuf};

/// Derived header holding the UT date.
pub const ORACUT: &str = "ORACUT";
/// Derived header holding the observation number.
pub const ORACOBSNUM: &str = "ORACOBSNUM";

/// Observation frame
#[derive(Debug, Clone)]
pub struct Frame {
    raw: PathBuf,
    utdate: UtDate,
    obsnum: u32,
    group_key: String,
    /// Header read from the raw file.
    pub hdr: Headers,
    /// Values computed by the pipeline and by recipes.
    pub uhdr: Headers,
    files: Vec<PathBuf>,
    good: bool,
    recipe: String,
}

impl Frame {
    /// Create an unconfigured frame for a raw file.
    pub fn new(raw: impl Into<PathBuf>, utdate: UtDate, obsnum: u32) -> Self {
        let raw = raw.into();
        Frame {
            files: vec![raw.clone()],
            raw,
            utdate,
            obsnum,
            group_key: String::new(),
            hdr: Headers::new(),
            uhdr: Headers::new(),
            good: true,
            recipe: String::new(),
        }
    }

    /// Read the header, compute derived values, resolve the recipe and group key.
    ///
    /// A `forced_recipe` overrides whatever the header asks for.
    pub fn configure(
        &mut self,
        instrument: &Instrument,
        forced_recipe: Option<&str>,
    ) -> Result<(), FrameError> {
        self.hdr = instrument.headers.read_headers(&self.raw)?;
        self.compute_derived_headers();

        self.recipe = match forced_recipe {
            Some(name) => name.to_string(),
            None => self
                .hdr
                .get(&instrument.recipe_header)
                .map(|v| v.to_string().trim().to_string())
                .filter(|name| !name.is_empty())
                .unwrap_or_else(|| instrument.default_recipe.clone()),
        };
        self.group_key = instrument.grouping.group_key(self);
        Ok(())
    }

    fn compute_derived_headers(&mut self) {
        self.uhdr
            .insert(ORACUT.to_string(), HeaderValue::Int(self.utdate.as_u32() as i64));
        self.uhdr
            .insert(ORACOBSNUM.to_string(), HeaderValue::Int(self.obsnum as i64));
        if let Some(mjd) = mjd_from_headers(&self.hdr) {
            self.uhdr.insert(ORACTIME.to_string(), HeaderValue::Float(mjd));
        }
    }

    pub fn raw(&self) -> &Path {
        &self.raw
    }

    /// Raw filename without directory or extension.
    pub fn raw_stem(&self) -> String {
        self.raw
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_default()
    }

    pub fn utdate(&self) -> UtDate {
        self.utdate
    }

    pub fn obsnum(&self) -> u32 {
        self.obsnum
    }

    pub fn group_key(&self) -> &str {
        &self.group_key
    }

    pub fn set_group_key(&mut self, key: impl Into<String>) {
        self.group_key = key.into();
    }

    /// Current primary working file.
    pub fn file(&self) -> &Path {
        &self.files[0]
    }

    pub fn files(&self) -> &[PathBuf] {
        &self.files
    }

    pub fn set_file(&mut self, path: impl Into<PathBuf>) {
        self.files[0] = path.into();
    }

    pub fn set_files(&mut self, files: Vec<PathBuf>) {
        if !files.is_empty() {
            self.files = files;
        }
    }

    pub fn is_good(&self) -> bool {
        self.good
    }

    /// Clear the good flag. Backing data is left alone.
    pub fn mark_bad(&mut self) {
        self.good = false;
    }

    pub fn recipe(&self) -> &str {
        &self.recipe
    }

    pub fn set_recipe(&mut self, recipe: impl Into<String>) {
        self.recipe = recipe.into();
    }

    /// Look up a value, derived headers first.
    pub fn header(&self, key: &str) -> Option<&HeaderValue> {
        self.uhdr.get(key).or_else(|| self.hdr.get(key))
    }

    /// Merged header view used for calibration matching.
    pub fn context(&self) -> Headers {
        let mut merged = self.hdr.clone();
        for (key, value) in &self.uhdr {
            merged.insert(key.clone(), value.clone());
        }
        merged
    }

    pub fn oractime(&self) -> Option<f64> {
        self.header(ORACTIME).and_then(HeaderValue::as_f64)
    }

    /// Input and output names for a processing step producing `suffix`.
    ///
    /// The output keeps the raw root and replaces any suffix a previous step
    /// added, so `f20240105_00012_ff` becomes `f20240105_00012_bp` in the same
    /// directory as the current file.
    pub fn inout(&self, suffix: &str) -> (PathBuf, PathBuf) {
        let input = self.file().to_path_buf();
        let root = self.raw_stem();
        let current_stem = input
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_default();
        let base = if current_stem.starts_with(&root) {
            root
        } else {
            current_stem
        };
        let suffix = suffix.trim_start_matches('_');
        let mut name = format!("{}_{}", base, suffix);
        if let Some(ext) = input.extension() {
            name.push('.');
            name.push_str(&ext.to_string_lossy());
        }
        let output = input
            .parent()
            .map(|dir| dir.join(&name))
            .unwrap_or_else(|| PathBuf::from(&name));
        (input, output)
    }
}
