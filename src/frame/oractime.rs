//! Observation time used to order calibrations.
//!
//! `ORACTIME` is the Modified Julian Date of the observation, taken from
//! `MJD-OBS` when present, otherwise derived from `DATE-OBS`.

use crate::header::{HeaderValue, Headers};
use chrono::{NaiveDate, NaiveDateTime};

pub const ORACTIME: &str = "ORACTIME";

const MJD_KEY: &str = "MJD-OBS";
const DATE_KEY: &str = "DATE-OBS";

const DATE_TIME_FORMATS: &[&str] = &["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S"];

/// Convert an ISO-8601 UT timestamp to MJD.
pub fn mjd_from_iso(value: &str) -> Option<f64> {
    let value = value.trim().trim_end_matches('Z');
    let parsed = DATE_TIME_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(value, fmt).ok())
        .or_else(|| {
            NaiveDate::parse_from_str(value, "%Y-%m-%d")
                .ok()
                .and_then(|d| d.and_hms_opt(0, 0, 0))
        })?;
    let epoch = NaiveDate::from_ymd_opt(1858, 11, 17)?.and_hms_opt(0, 0, 0)?;
    let elapsed = parsed - epoch;
    Some(elapsed.num_milliseconds() as f64 / 86_400_000.0)
}

pub fn mjd_from_headers(headers: &Headers) -> Option<f64> {
    if let Some(mjd) = headers.get(MJD_KEY).and_then(HeaderValue::as_f64) {
        return Some(mjd);
    }
    match headers.get(DATE_KEY)? {
        HeaderValue::Str(s) => mjd_from_iso(s),
        _ => None,
    }
}
