//! Arrival strategies against a real input directory, with files appearing
//! from another thread.

use super::test_utils::{utdate, Workspace};
use orac::abort::AbortFlag;
use orac::arrival::{strategy, ArrivalStrategy, Cursor, DataSource, LoopKind};
use orac::error::LoopError;
use orac::header::{render_cards, HeaderValue};
use orac::instrument::Instrument;
use std::fs;
use std::thread;
use std::time::{Duration, Instant};

fn source(ws: &Workspace) -> DataSource {
    let config = ws.config();
    DataSource::new(
        config.paths.input_dir.clone(),
        Instrument::from_config(&config.instrument, &config.paths),
    )
}

fn cards(grpnum: i64) -> Vec<(&'static str, HeaderValue)> {
    vec![("GRPNUM", HeaderValue::Int(grpnum)), ("RECIPE", "REDUCE_DARK".into())]
}

#[test]
fn list_loop_yields_configured_frames_in_list_order() {
    let ws = Workspace::new();
    for obsnum in [3, 5, 9] {
        ws.raw(obsnum, &cards(1));
    }
    let src = source(&ws);
    let mut arrival = strategy(LoopKind::List, &ws.config().arrival, AbortFlag::new());
    let mut cursor = Cursor::list([9, 3, 5]);

    let mut seen = Vec::new();
    while let Some(frame) = arrival.next(&src, utdate(), &mut cursor, false).unwrap() {
        assert_eq!(frame.recipe(), "REDUCE_DARK");
        seen.push(frame.obsnum());
    }
    assert_eq!(seen, vec![9, 3, 5]);
}

#[test]
fn inf_loop_stops_at_first_gap() {
    let ws = Workspace::new();
    for obsnum in [1, 2, 4] {
        ws.raw(obsnum, &cards(1));
    }
    let src = source(&ws);
    let mut arrival = strategy(LoopKind::Inf, &ws.config().arrival, AbortFlag::new());
    let mut cursor = Cursor::from(1, None);

    assert_eq!(arrival.next(&src, utdate(), &mut cursor, false).unwrap().unwrap().obsnum(), 1);
    assert_eq!(arrival.next(&src, utdate(), &mut cursor, false).unwrap().unwrap().obsnum(), 2);
    match arrival.next(&src, utdate(), &mut cursor, false) {
        Err(LoopError::Missing { obsnum, .. }) => assert_eq!(obsnum, 3),
        other => panic!("expected Missing, got {:?}", other.map(|f| f.map(|f| f.obsnum()))),
    }

    assert_eq!(arrival.next(&src, utdate(), &mut cursor, true).unwrap().unwrap().obsnum(), 4);
}

#[test]
fn wait_loop_picks_up_file_written_later() {
    let ws = Workspace::new();
    let src = source(&ws);
    let mut arrival = strategy(LoopKind::Wait, &ws.config().arrival, AbortFlag::new());
    let mut cursor = Cursor::from(1, None);

    let path = src.raw_path(utdate(), 1);
    let writer = thread::spawn(move || {
        thread::sleep(Duration::from_millis(100));
        fs::write(path, render_cards(&cards(2))).unwrap();
    });

    let frame = arrival.next(&src, utdate(), &mut cursor, false).unwrap().unwrap();
    writer.join().unwrap();
    assert_eq!(frame.obsnum(), 1);
    assert_eq!(frame.group_key(), "20240105:GRPNUM=2");
    assert_eq!(cursor.current(), Some(2));
}

#[test]
fn flag_loop_waits_for_flag_not_data() {
    let ws = Workspace::new();
    ws.raw(1, &cards(1));
    let src = source(&ws);
    let mut arrival = strategy(LoopKind::Flag, &ws.config().arrival, AbortFlag::new());
    assert_eq!(arrival.name(), "flag");
    let mut cursor = Cursor::from(1, None);

    let flag = src.flag_path(utdate(), 1);
    assert!(!flag.exists());
    let started = Instant::now();
    let writer = thread::spawn(move || {
        thread::sleep(Duration::from_millis(150));
        fs::write(flag, "").unwrap();
    });

    let frame = arrival.next(&src, utdate(), &mut cursor, false).unwrap().unwrap();
    writer.join().unwrap();
    assert_eq!(frame.obsnum(), 1);
    assert!(started.elapsed() >= Duration::from_millis(150));
}

#[test]
fn timeout_is_bounded_by_configured_limit() {
    let ws = Workspace::new();
    let src = source(&ws);
    let mut config = ws.config().arrival;
    config.poll_interval_ms = 2_000;
    config.timeout_secs = 1;
    let mut arrival = strategy(LoopKind::Wait, &config, AbortFlag::new());
    let mut cursor = Cursor::from(1, None);

    let started = Instant::now();
    let result = arrival.next(&src, utdate(), &mut cursor, false);
    let elapsed = started.elapsed();
    assert!(matches!(result, Err(LoopError::Timeout { .. })));
    assert!(elapsed >= Duration::from_secs(1));
    assert!(elapsed < Duration::from_secs(3), "waited {:?}", elapsed);
    assert_eq!(cursor.current(), Some(1));
}

#[test]
fn abort_from_another_thread_stops_waiting() {
    let ws = Workspace::new();
    let src = source(&ws);
    let mut config = ws.config().arrival;
    config.timeout_secs = 60;
    let abort = AbortFlag::new();
    let mut arrival = strategy(LoopKind::Wait, &config, abort.clone());
    let mut cursor = Cursor::from(1, None);

    let raiser = thread::spawn(move || {
        thread::sleep(Duration::from_millis(100));
        abort.raise();
    });
    let started = Instant::now();
    let result = arrival.next(&src, utdate(), &mut cursor, false);
    raiser.join().unwrap();
    assert!(matches!(result, Err(LoopError::UserAbort)));
    assert!(started.elapsed() < Duration::from_secs(5));
}
