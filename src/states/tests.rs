// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

use super::*;
use crate::metadata::{HeaderRecord, KeyKind};

fn records(pairs: &[(&str, &str)]) -> HeaderRecords {
    pairs
        .iter()
        .map(|(k, v)| HeaderRecord::new(*k, *v, KeyKind::String))
        .collect()
}

fn spectrogram_with(height: usize, pairs: &[(&str, &str)]) -> Spectrogram<'static> {
    let mut s = Spectrogram::new(4, height);
    *s.records_mut() = records(pairs);
    s.classify_integrations();
    s
}

#[test]
fn test_parse_range_value() {
    assert_eq!(parse_range_value("1 - 100"), Some((0, 99)));
    assert_eq!(parse_range_value("5-5"), Some((4, 4)));
    assert_eq!(parse_range_value("  7 -   9 extra"), Some((6, 8)));
    assert_eq!(parse_range_value("0 - 10"), None);
    assert_eq!(parse_range_value("10 - 5"), None);
    assert_eq!(parse_range_value("ten - 5"), None);
}

#[test]
fn test_state_names() {
    assert_eq!(IntegrationType::from_state_name("ANT"), IntegrationType::Antenna);
    for n in ["REF", "TERM", "NSOFF"] {
        assert_eq!(IntegrationType::from_state_name(n), IntegrationType::Reference);
    }
    assert_eq!(IntegrationType::from_state_name("NSON"), IntegrationType::NoiseSourceOn);
    assert_eq!(IntegrationType::from_state_name("HISENS"), IntegrationType::Undefined);
    assert_eq!(IntegrationType::from_state_name("ant"), IntegrationType::Undefined);
}

#[test]
fn test_explicit_states() {
    let s = spectrogram_with(
        200,
        &[("STATES", "ANT,REF"), ("ANT0", "1 - 100"), ("REF0", "101 - 200")],
    );
    let ranges = s.integration_ranges().as_slice();
    assert_eq!(ranges.len(), 2);
    assert_eq!((ranges[0].start, ranges[0].end), (0, 99));
    assert_eq!(ranges[0].kind, IntegrationType::Antenna);
    assert_eq!(ranges[0].name, "ANT");
    assert_eq!(ranges[0].state_index, Some(0));
    assert_eq!((ranges[1].start, ranges[1].end), (100, 199));
    assert_eq!(ranges[1].kind, IntegrationType::Reference);
}

#[test]
fn test_explicit_states_follow_header_order() {
    let s = spectrogram_with(
        30,
        &[
            ("STATES", "TERM,ANT,NSON,X"),
            ("TERM1", "1 - 10"),
            ("ANT12", "11 - 20"),
            ("NSON", "21 - 25"),
            ("X0", "26 - 30"),
            ("ANTBAD", "not a range"),
            ("INTTIME", "1"),
        ],
    );
    let ranges = s.integration_ranges().as_slice();
    assert_eq!(ranges.len(), 4);
    assert_eq!(ranges[0].kind, IntegrationType::Reference);
    assert_eq!(ranges[0].state_index, Some(1));
    assert_eq!(ranges[1].kind, IntegrationType::Antenna);
    assert_eq!(ranges[1].state_index, Some(12));
    assert_eq!(ranges[2].kind, IntegrationType::NoiseSourceOn);
    assert_eq!(ranges[2].state_index, None);
    assert_eq!(ranges[3].kind, IntegrationType::Undefined);

    assert_eq!(s.integration_type(22), IntegrationType::NoiseSourceOn);
    assert_eq!(s.integration_type(27), IntegrationType::Undefined);
    assert!(s.is_reference(9));
    assert!(!s.is_reference(10));
    assert_eq!(
        s.integration_ranges()
            .nth_of_type(0, IntegrationType::Antenna)
            .map(|r| r.start),
        Some(10)
    );
}

#[test]
fn test_first_listed_state_wins() {
    // "NS" is listed first, so "NSON0" is an "NS" range.
    let s = spectrogram_with(10, &[("STATES", "NS,NSON"), ("NSON0", "1 - 5")]);
    let ranges = s.integration_ranges().as_slice();
    assert_eq!(ranges.len(), 1);
    assert_eq!(ranges[0].name, "NS");
    assert_eq!(ranges[0].kind, IntegrationType::Undefined);
    assert_eq!(ranges[0].state_index, None);
}

#[test]
fn test_implicit_classification() {
    let s = spectrogram_with(30, &[("ANT", "11 - 20")]);
    let ranges = s.integration_ranges().as_slice();
    assert_eq!(ranges.len(), 3);
    assert_eq!(
        (ranges[0].start, ranges[0].end, ranges[0].kind),
        (0, 9, IntegrationType::Reference)
    );
    assert_eq!(
        (ranges[1].start, ranges[1].end, ranges[1].kind),
        (10, 19, IntegrationType::Antenna)
    );
    assert_eq!(
        (ranges[2].start, ranges[2].end, ranges[2].kind),
        (20, 29, IntegrationType::Reference)
    );
}

#[test]
fn test_implicit_classification_edges() {
    // Antenna from the first row: no leading reference. Antenna to the last
    // row: no trailing reference.
    let s = spectrogram_with(20, &[("ANT1", "1 - 5"), ("ANT2", "11 - 20")]);
    let kinds: Vec<(usize, usize, IntegrationType)> = s
        .integration_ranges()
        .iter()
        .map(|r| (r.start, r.end, r.kind))
        .collect();
    assert_eq!(
        kinds,
        [
            (0, 4, IntegrationType::Antenna),
            (5, 9, IntegrationType::Reference),
            (10, 19, IntegrationType::Antenna),
        ]
    );
}

#[test]
fn test_no_ranges_defaults() {
    let s = spectrogram_with(5, &[("INTTIME", "1")]);
    assert!(s.integration_ranges().is_empty());
    assert!(s.is_antenna(3, true));
    assert!(!s.is_antenna(3, false));
    assert_eq!(s.integration_type(3), IntegrationType::Antenna);
    let ant = s.antenna_ranges();
    assert_eq!(ant.len(), 1);
    assert_eq!((ant[0].start, ant[0].end), (0, 4));
}

#[test]
fn test_reclassification_clears_old_ranges() {
    let mut s = spectrogram_with(10, &[("STATES", "ANT"), ("ANT0", "1 - 5")]);
    assert_eq!(s.integration_ranges().len(), 1);
    *s.records_mut() = records(&[("STATES", "REF"), ("REF0", "1 - 2"), ("REF1", "3 - 4")]);
    assert_eq!(s.classify_integrations(), 2);
    assert!(!s.is_antenna(0, true));
    assert_eq!(s.range_for_row(2).map(|r| r.state_index), Some(Some(1)));
    assert!(s.range_for_row(9).is_none());
}
