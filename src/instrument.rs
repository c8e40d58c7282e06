//! Instrument capabilities.
//!
//! Instruments differ in a handful of places: how raw files are named, how frames
//! are grouped, and where calibration rules live. Each is a small trait; an
//! [`Instrument`] bundles one implementation of each and is injected into the
//! arrival loop and the orchestrator.

use crate::config::{InstrumentConfig, PathsConfig};
use crate::frame::{Frame, UtDate};
use crate::header::{FitsHeaderReader, HeaderReader};
use std::path::PathBuf;
use std::sync::Arc;

/// Raw and flag file naming.
pub trait RawNamingScheme: Send + Sync {
    fn raw_filename(&self, utdate: UtDate, obsnum: u32) -> String;

    /// Sentinel written next to the raw file once it is complete.
    fn flag_filename(&self, utdate: UtDate, obsnum: u32) -> String;

    /// Observation number encoded in a raw filename for `utdate`, if it is one.
    fn parse_obsnum(&self, utdate: UtDate, filename: &str) -> Option<u32>;
}

/// Group key derivation.
pub trait GroupingRule: Send + Sync {
    fn group_key(&self, frame: &Frame) -> String;
}

/// Location of calibration rules per role.
pub trait CalibrationRuleProvider: Send + Sync {
    fn rules_path(&self, role: &str) -> PathBuf;
}

/// `{prefix}{utdate}_{obsnum:0N}{extension}`, flag file `.{stem}{flag_suffix}`.
#[derive(Debug, Clone)]
pub struct PatternNaming {
    pub prefix: String,
    pub digits: usize,
    pub extension: String,
    pub flag_suffix: String,
}

impl PatternNaming {
    fn stem(&self, utdate: UtDate, obsnum: u32) -> String {
        format!("{}{}_{:0width$}", self.prefix, utdate, obsnum, width = self.digits)
    }
}

impl RawNamingScheme for PatternNaming {
    fn raw_filename(&self, utdate: UtDate, obsnum: u32) -> String {
        format!("{}{}", self.stem(utdate, obsnum), self.extension)
    }

    fn flag_filename(&self, utdate: UtDate, obsnum: u32) -> String {
        format!(".{}{}", self.stem(utdate, obsnum), self.flag_suffix)
    }

    fn parse_obsnum(&self, utdate: UtDate, filename: &str) -> Option<u32> {
        let head = format!("{}{}_", self.prefix, utdate);
        let digits = filename
            .strip_prefix(&head)?
            .strip_suffix(self.extension.as_str())?;
        if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        digits.parse().ok()
    }
}

/// Groups by UT date plus a list of header fields.
///
/// A frame missing every field forms its own group.
#[derive(Debug, Clone)]
pub struct HeaderGrouping {
    pub fields: Vec<String>,
}

impl GroupingRule for HeaderGrouping {
    fn group_key(&self, frame: &Frame) -> String {
        let values: Vec<String> = self
            .fields
            .iter()
            .filter_map(|field| frame.header(field).map(|v| format!("{}={}", field, v)))
            .collect();
        if values.is_empty() {
            format!("{}:obs={}", frame.utdate(), frame.obsnum())
        } else {
            format!("{}:{}", frame.utdate(), values.join(","))
        }
    }
}

/// `rules.<role>` inside one directory.
#[derive(Debug, Clone)]
pub struct DirectoryRules {
    pub dir: PathBuf,
}

impl CalibrationRuleProvider for DirectoryRules {
    fn rules_path(&self, role: &str) -> PathBuf {
        self.dir.join(format!("rules.{}", role))
    }
}

/// Everything the pipeline needs to know about one instrument.
#[derive(Clone)]
pub struct Instrument {
    pub name: String,
    pub naming: Arc<dyn RawNamingScheme>,
    pub grouping: Arc<dyn GroupingRule>,
    pub rules: Arc<dyn CalibrationRuleProvider>,
    pub headers: Arc<dyn HeaderReader>,
    pub recipe_header: String,
    pub default_recipe: String,
    pub calibration_roles: Vec<String>,
}

impl Instrument {
    pub fn from_config(config: &InstrumentConfig, paths: &PathsConfig) -> Self {
        Instrument {
            name: config.name.clone(),
            naming: Arc::new(PatternNaming {
                prefix: config.prefix.clone(),
                digits: config.digits,
                extension: config.extension.clone(),
                flag_suffix: config.flag_suffix.clone(),
            }),
            grouping: Arc::new(HeaderGrouping {
                fields: config.group_by.clone(),
            }),
            rules: Arc::new(DirectoryRules {
                dir: paths.rules_dir(&config.name),
            }),
            headers: Arc::new(FitsHeaderReader),
            recipe_header: config.recipe_header.clone(),
            default_recipe: config.default_recipe.clone(),
            calibration_roles: config.calibration_roles.clone(),
        }
    }
}

impl std::fmt::Debug for Instrument {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Instrument")
            .field("name", &self.name)
            .field("recipe_header", &self.recipe_header)
            .field("default_recipe", &self.default_recipe)
            .finish_non_exhaustive()
    }
}
