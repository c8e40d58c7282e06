//! Property-based tests for group membership and calibration selection

use orac::calibration::{CalibrationIndex, CalibrationRules, IndexEntry};
use orac::frame::{Frame, UtDate, ORACTIME};
use orac::group::{BadObsFilter, Group};
use orac::header::{HeaderValue, Headers};
use parking_lot::RwLock;
use proptest::prelude::*;
use proptest::test_runner::{Config, TestRunner};
use std::sync::Arc;

fn night() -> UtDate {
    UtDate::from_ymd(2024, 1, 5).unwrap()
}

/// Members are exactly the good, unfiltered frames in arrival order
#[test]
fn test_members_are_good_unfiltered_subsequence_property() {
    let mut runner = TestRunner::new(Config::with_cases(128));
    let flags = prop::collection::vec((any::<bool>(), any::<bool>()), 0..24);

    runner
        .run(&flags, |flags| {
            let filter = Arc::new(RwLock::new(BadObsFilter::new()));
            let mut group = Group::new("20240105:GRPNUM=1", filter.clone());
            for (i, _) in flags.iter().enumerate() {
                let obsnum = i as u32 + 1;
                group.push(Frame::new(format!("raw/f{}", obsnum), night(), obsnum));
            }

            for (i, (bad, excluded)) in flags.iter().enumerate() {
                if *bad {
                    group.mark_bad(i);
                }
                if *excluded {
                    filter.write().exclude(night(), i as u32 + 1);
                }
            }
            group.check_membership();

            let expected: Vec<usize> = flags
                .iter()
                .enumerate()
                .filter(|(_, (bad, excluded))| !bad && !excluded)
                .map(|(i, _)| i)
                .collect();
            prop_assert_eq!(group.member_indices(), expected.as_slice());
            prop_assert_eq!(group.all_members().len(), flags.len());
            if let Some(last) = expected.last() {
                prop_assert!(group.is_last_member(*last));
            }
            prop_assert!(group.members().all(Frame::is_good));
            Ok(())
        })
        .unwrap();
}

fn entry(payload: usize, oractime: f64) -> IndexEntry {
    IndexEntry {
        payload: format!("cal_{}", payload),
        oractime: Some(oractime),
        fields: Headers::new(),
    }
}

/// Selection picks a minimal-distance entry, earliest inserted on ties
#[test]
fn test_nearest_selection_property() {
    let mut runner = TestRunner::new(Config::with_cases(128));
    let strategy = (prop::collection::vec(0u32..40, 1..12), 0u32..40);

    runner
        .run(&strategy, |(times, query)| {
            let mut index = CalibrationIndex::in_memory("dark", Vec::new());
            for (i, t) in times.iter().enumerate() {
                index.append(entry(i, f64::from(*t))).unwrap();
            }
            let mut context = Headers::new();
            context.insert(ORACTIME.to_string(), HeaderValue::Float(f64::from(query)));

            let chosen = index.nearest(&CalibrationRules::default(), &context).unwrap();

            let distance = |t: u32| (i64::from(t) - i64::from(query)).abs();
            let best = times.iter().map(|t| distance(*t)).min().unwrap();
            let first_best = times.iter().position(|t| distance(*t) == best).unwrap();
            prop_assert_eq!(&chosen.payload, &format!("cal_{}", first_best));
            Ok(())
        })
        .unwrap();
}
