//! Calibration selection against on-disk indexes and rules.

use super::test_utils::Workspace;
use orac::calibration::{Binding, Calibration};
use orac::error::CalibrationError;
use orac::frame::ORACTIME;
use orac::header::{HeaderValue, Headers};
use orac::instrument::Instrument;
use std::fs;

fn open(ws: &Workspace) -> Calibration {
    let config = ws.config();
    let instrument = Instrument::from_config(&config.instrument, &config.paths);
    Calibration::open(&instrument, &config.paths.calibration_dir()).unwrap()
}

fn context(t: f64, mode: &str) -> Headers {
    let mut ctx = Headers::new();
    ctx.insert(ORACTIME.to_string(), HeaderValue::Float(t));
    ctx.insert("READMODE".to_string(), mode.into());
    ctx
}

#[test]
fn nearest_entry_in_time_wins() {
    let ws = Workspace::new();
    ws.rules("dark", "READMODE\n");
    fs::write(
        ws.path("cal/index.dark"),
        "#payload\tORACTIME\tREADMODE\nd10\t10\tCDS\nd20\t20\tCDS\nd30\t30\tCDS\n",
    )
    .unwrap();

    let mut cal = open(&ws);
    assert_eq!(cal.select("dark", &context(22.0, "CDS")).unwrap(), "d20");
}

#[test]
fn equidistant_entries_resolve_to_earliest_inserted() {
    let ws = Workspace::new();
    fs::write(
        ws.path("cal/index.flat"),
        "#payload\tORACTIME\nlate\t30\nearly\t10\n",
    )
    .unwrap();

    let mut cal = open(&ws);
    assert_eq!(cal.select("flat", &context(20.0, "CDS")).unwrap(), "late");
}

#[test]
fn incompatible_entries_are_skipped() {
    let ws = Workspace::new();
    ws.rules("dark", "READMODE\nEXPTIME ~ 0.5\n");
    fs::write(
        ws.path("cal/index.dark"),
        "#payload\tORACTIME\tREADMODE\tEXPTIME\nnear\t21\tNDR\t10\nok\t5\tCDS\t10.2\nlong\t20\tCDS\t60\n",
    )
    .unwrap();

    let mut cal = open(&ws);
    let mut ctx = context(20.0, "CDS");
    ctx.insert("EXPTIME".to_string(), HeaderValue::Int(10));
    assert_eq!(cal.select("dark", &ctx).unwrap(), "ok");
}

#[test]
fn no_compatible_entry_is_an_error() {
    let ws = Workspace::new();
    ws.rules("dark", "READMODE\n");
    fs::write(
        ws.path("cal/index.dark"),
        "#payload\tORACTIME\tREADMODE\nd10\t10\tNDR\n",
    )
    .unwrap();

    let mut cal = open(&ws);
    match cal.select("dark", &context(10.0, "CDS")) {
        Err(CalibrationError::NoSuitable { role, reason }) => {
            assert_eq!(role, "dark");
            assert!(reason.contains("READMODE"));
        }
        other => panic!("expected NoSuitable, got {:?}", other),
    }
}

#[test]
fn pinned_role_ignores_index_and_records() {
    let ws = Workspace::new();
    fs::write(ws.path("cal/index.bias"), "#payload\tORACTIME\nb1\t10\n").unwrap();

    let mut cal = open(&ws);
    cal.pin("bias", "operator_bias").unwrap();
    cal.record("bias", "b2", &context(11.0, "CDS")).unwrap();
    assert_eq!(cal.select("bias", &context(11.0, "CDS")).unwrap(), "operator_bias");
    assert_eq!(
        cal.binding("bias"),
        Some(&Binding::Pinned("operator_bias".to_string()))
    );
    assert_eq!(cal.index("bias").unwrap().len(), 2);
}

#[test]
fn recorded_entries_survive_reopen() {
    let ws = Workspace::new();
    ws.rules("dark", "READMODE\n");
    {
        let mut cal = open(&ws);
        cal.record("dark", "dark_a", &context(10.0, "CDS")).unwrap();
        cal.record("dark", "dark_b", &context(40.0, "CDS")).unwrap();
    }
    let text = fs::read_to_string(ws.path("cal/index.dark")).unwrap();
    assert!(text.starts_with("#payload\tORACTIME\tREADMODE\n"));
    assert_eq!(text.lines().count(), 3);

    let mut cal = open(&ws);
    assert_eq!(cal.index("dark").unwrap().len(), 2);
    assert_eq!(cal.select("dark", &context(12.0, "CDS")).unwrap(), "dark_a");
}

#[test]
fn unknown_role_is_rejected() {
    let ws = Workspace::new();
    let mut cal = open(&ws);
    assert!(matches!(
        cal.select("polarisation", &context(1.0, "CDS")),
        Err(CalibrationError::UnknownRole(_))
    ));
}
