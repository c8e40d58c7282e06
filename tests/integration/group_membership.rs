//! Grouping of configured frames and bad-observation exclusion.

use super::test_utils::{utdate, Workspace};
use orac::frame::Frame;
use orac::group::{BadObsFilter, GroupSet};
use orac::header::HeaderValue;
use orac::instrument::Instrument;
use parking_lot::RwLock;
use std::fs;
use std::sync::Arc;

fn configured(ws: &Workspace, obsnum: u32, grpnum: i64, filter: &str) -> Frame {
    let path = ws.raw(
        obsnum,
        &[
            ("GRPNUM", HeaderValue::Int(grpnum)),
            ("FILTER", filter.into()),
            ("RECIPE", "REDUCE_SCIENCE".into()),
        ],
    );
    let config = ws.config();
    let instrument = Instrument::from_config(&config.instrument, &config.paths);
    let mut frame = Frame::new(path, utdate(), obsnum);
    frame.configure(&instrument, None).unwrap();
    frame
}

fn obsnums<'a>(frames: impl Iterator<Item = &'a Frame>) -> Vec<u32> {
    frames.map(Frame::obsnum).collect()
}

#[test]
fn frames_group_by_header_in_arrival_order() {
    let ws = Workspace::new();
    let mut groups = GroupSet::new(Arc::new(RwLock::new(BadObsFilter::new())), ws.path("out"));
    for (obsnum, grp) in [(1, 1), (2, 1), (3, 3), (4, 1), (5, 3)] {
        groups.assign(configured(&ws, obsnum, grp, "J"));
    }

    assert_eq!(groups.len(), 2);
    let keys: Vec<&str> = groups.iter().map(|g| g.key()).collect();
    assert_eq!(keys, vec!["20240105:GRPNUM=1", "20240105:GRPNUM=3"]);
    let first = groups.get(0).unwrap();
    assert_eq!(obsnums(first.members()), vec![1, 2, 4]);
    assert_eq!(first.file(), ws.path("out/gf20240105_00001.fits").as_path());
    assert_eq!(first.all_members()[0].recipe(), "REDUCE_SCIENCE");
}

#[test]
fn badobs_file_excludes_listed_and_matching_frames() {
    let ws = Workspace::new();
    let rules = ws.path("badobs.txt");
    fs::write(&rules, "# bad\n20240105 2\nwhere FILTER == \"K\"\n").unwrap();
    let filter = BadObsFilter::load(&rules).unwrap();
    let mut groups = GroupSet::new(Arc::new(RwLock::new(filter)), ws.path("out"));
    for (obsnum, filter) in [(1, "J"), (2, "J"), (3, "K"), (4, "J")] {
        groups.assign(configured(&ws, obsnum, 1, filter));
    }

    let group = groups.get(0).unwrap();
    assert_eq!(group.all_members().len(), 4);
    assert_eq!(obsnums(group.members()), vec![1, 4]);
    assert!(group.all_members().iter().all(Frame::is_good));
}

#[test]
fn filter_changes_apply_after_recheck() {
    let ws = Workspace::new();
    let shared = Arc::new(RwLock::new(BadObsFilter::new()));
    let mut groups = GroupSet::new(Arc::clone(&shared), ws.path("out"));
    for obsnum in 1..=3 {
        groups.assign(configured(&ws, obsnum, 1, "J"));
    }
    shared.write().exclude(utdate(), 2);
    assert_eq!(groups.get(0).unwrap().num_members(), 3);

    groups.recheck_all();
    assert_eq!(obsnums(groups.get(0).unwrap().members()), vec![1, 3]);
}

#[test]
fn marked_bad_frames_leave_members_but_stay_in_all_members() {
    let ws = Workspace::new();
    let mut groups = GroupSet::new(Arc::new(RwLock::new(BadObsFilter::new())), ws.path("out"));
    let slots: Vec<_> = (1..=3)
        .map(|obsnum| groups.assign(configured(&ws, obsnum, 1, "J")))
        .collect();
    let group = groups.get_mut(slots[2].group).unwrap();
    group.mark_bad(slots[2].frame);

    assert_eq!(obsnums(group.members()), vec![1, 2]);
    assert!(group.is_last_member(slots[1].frame));
    assert_eq!(group.all_members().len(), 3);
}

#[test]
fn malformed_badobs_file_reports_line() {
    let ws = Workspace::new();
    let rules = ws.path("badobs.txt");
    fs::write(&rules, "20240105 1\n20240105 9:3\n").unwrap();
    let err = BadObsFilter::load(&rules).unwrap_err();
    assert_eq!(err.line, 2);
}
