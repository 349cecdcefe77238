// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Classification of integrations into states (antenna, reference, noise
//! source on).
//!
//! A spectrometer cycles its input between the antenna and one or more
//! reference loads. The header records which integrations belong to which
//! state as 1-based inclusive ranges, e.g. `ANT0 = '1 - 100'`. These are
//! converted to 0-based [`IntegrationRange`]s.

#[cfg(test)]
mod tests;

use lazy_static::lazy_static;
use log::{debug, warn};
use regex::Regex;

use crate::{
    metadata::{parse_leading_i64, HeaderRecords},
    spectrogram::Spectrogram,
};

lazy_static! {
    static ref RANGE_REGEX: Regex = Regex::new(r"^\s*([+-]?\d+)\s*-\s*([+-]?\d+)").unwrap();
}

/// The canonical type of an integration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, strum_macros::Display)]
pub enum IntegrationType {
    #[default]
    #[strum(serialize = "UNDEFINED")]
    Undefined,

    #[strum(serialize = "ANT")]
    Antenna,

    #[strum(serialize = "REF")]
    Reference,

    #[strum(serialize = "NSON")]
    NoiseSourceOn,
}

impl IntegrationType {
    /// Map a state name from the `STATES` list to a type. Names that aren't
    /// recognised are [`IntegrationType::Undefined`].
    pub fn from_state_name(name: &str) -> IntegrationType {
        match name {
            "ANT" => IntegrationType::Antenna,
            "REF" | "TERM" | "NSOFF" => IntegrationType::Reference,
            "NSON" => IntegrationType::NoiseSourceOn,
            _ => IntegrationType::Undefined,
        }
    }
}

/// A 0-based inclusive range of integrations sharing a state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IntegrationRange {
    pub start: usize,

    /// Inclusive.
    pub end: usize,

    pub kind: IntegrationType,

    /// The state name as it appears in the header.
    pub name: String,

    /// The occurrence index of this state, taken from the numeric suffix of
    /// its keyword (e.g. 3 for `ANT3`).
    pub state_index: Option<usize>,
}

impl IntegrationRange {
    pub fn new(start: usize, end: usize, kind: IntegrationType) -> IntegrationRange {
        IntegrationRange {
            start,
            end,
            kind,
            name: kind.to_string(),
            state_index: None,
        }
    }

    pub fn contains(&self, y: usize) -> bool {
        self.start <= y && y <= self.end
    }

    pub fn num_integrations(&self) -> usize {
        self.end + 1 - self.start
    }
}

impl std::fmt::Display for IntegrationRange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} - {} : {}", self.start, self.end, self.name)
    }
}

/// Parse a 1-based "<start> - <end>" value into a 0-based inclusive pair.
pub fn parse_range_value(value: &str) -> Option<(usize, usize)> {
    let caps = RANGE_REGEX.captures(value)?;
    let start: i64 = caps[1].parse().ok()?;
    let end: i64 = caps[2].parse().ok()?;
    if start < 1 || end < start {
        return None;
    }
    Some((start as usize - 1, end as usize - 1))
}

/// The ordered integration ranges of a spectrogram. Classification is
/// responsible for the ranges not overlapping; lookups take the first match.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct IntegrationRanges(Vec<IntegrationRange>);

impl IntegrationRanges {
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<IntegrationRange> {
        self.0.iter()
    }

    pub fn as_slice(&self) -> &[IntegrationRange] {
        &self.0
    }

    pub fn clear(&mut self) {
        self.0.clear();
    }

    pub fn push(&mut self, range: IntegrationRange) {
        self.0.push(range);
    }

    /// Build ranges from the header records whose keywords start with a
    /// name in `states`. Records are visited in header order, and for each
    /// record the first state in `states` that prefixes its keyword is used.
    pub fn from_states(records: &HeaderRecords, states: &[String]) -> IntegrationRanges {
        debug!("Parsed states = {}", states.join(","));
        let mut ranges = vec![];
        for r in records {
            let state = match states
                .iter()
                .find(|s| r.keyword.starts_with(s.as_str()))
            {
                Some(s) => s,
                None => continue,
            };
            // The STATES keyword itself can't be a range.
            if r.keyword == "STATES" {
                continue;
            }

            match parse_range_value(&r.value) {
                Some((start, end)) => {
                    let suffix = &r.keyword[state.len()..];
                    let state_index = if suffix.is_empty() {
                        None
                    } else {
                        parse_leading_i64(suffix)
                            .filter(|&i| i >= 0)
                            .map(|i| i as usize)
                    };
                    ranges.push(IntegrationRange {
                        start,
                        end,
                        kind: IntegrationType::from_state_name(state),
                        name: state.clone(),
                        state_index,
                    });
                }
                None => warn!(
                    "Couldn't parse the {state} integration range {} = {}",
                    r.keyword, r.value
                ),
            }
        }
        IntegrationRanges(ranges)
    }

    /// Build ranges from every keyword containing "ANT". The gaps before,
    /// between and after the antenna ranges are reference ranges; `height` is
    /// the number of integrations.
    pub fn from_antenna_keys(records: &HeaderRecords, height: usize) -> IntegrationRanges {
        let mut ranges: Vec<IntegrationRange> = vec![];
        for r in records.iter().filter(|r| r.keyword.contains("ANT")) {
            let (start, end) = match parse_range_value(&r.value) {
                Some(p) => p,
                None => {
                    warn!(
                        "Couldn't parse the ANT integration range {} = {}",
                        r.keyword, r.value
                    );
                    continue;
                }
            };
            let gap_start = ranges.last().map(|prev| prev.end + 1).unwrap_or(0);
            if start > gap_start {
                ranges.push(IntegrationRange::new(
                    gap_start,
                    start - 1,
                    IntegrationType::Reference,
                ));
            }
            ranges.push(IntegrationRange::new(start, end, IntegrationType::Antenna));
        }

        if let Some(last_end) = ranges.last().map(|r| r.end) {
            if last_end + 1 < height {
                ranges.push(IntegrationRange::new(
                    last_end + 1,
                    height - 1,
                    IntegrationType::Reference,
                ));
            }
        }

        for r in &ranges {
            debug!("Integration range {r}");
        }
        IntegrationRanges(ranges)
    }

    /// The first range containing integration `y`, and its position.
    pub fn range_for_row(&self, y: usize) -> Option<(usize, &IntegrationRange)> {
        self.0.iter().enumerate().find(|(_, r)| r.contains(y))
    }

    /// The `n`th (0-based) range of the given type.
    pub fn nth_of_type(&self, n: usize, kind: IntegrationType) -> Option<&IntegrationRange> {
        self.0.iter().filter(|r| r.kind == kind).nth(n)
    }

    fn is_type(&self, y: usize, kind: IntegrationType) -> bool {
        self.0.iter().any(|r| r.kind == kind && r.contains(y))
    }
}

impl<'a> IntoIterator for &'a IntegrationRanges {
    type Item = &'a IntegrationRange;
    type IntoIter = std::slice::Iter<'a, IntegrationRange>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

impl Spectrogram<'_> {
    pub fn integration_ranges(&self) -> &IntegrationRanges {
        &self.ranges
    }

    pub fn set_integration_ranges(&mut self, ranges: IntegrationRanges) {
        self.ranges = ranges;
    }

    /// (Re-)classify integrations from the header. With a `STATES` record the
    /// listed states are used; otherwise antenna ranges are taken from the
    /// "ANT" keywords and everything else is reference. Returns the number of
    /// ranges.
    pub fn classify_integrations(&mut self) -> usize {
        self.ranges = if self.records.get("STATES").is_some() {
            let states = self.records.list("STATES");
            IntegrationRanges::from_states(&self.records, &states)
        } else {
            IntegrationRanges::from_antenna_keys(&self.records, self.height())
        };
        self.ranges.len()
    }

    pub fn range_for_row(&self, y: usize) -> Option<&IntegrationRange> {
        self.ranges.range_for_row(y).map(|(_, r)| r)
    }

    /// Is integration `y` pointed at the antenna? With `default_yes`, every
    /// integration is when no ranges are known.
    pub fn is_antenna(&self, y: usize, default_yes: bool) -> bool {
        if default_yes && self.ranges.is_empty() {
            return true;
        }
        self.ranges.is_type(y, IntegrationType::Antenna)
    }

    pub fn is_reference(&self, y: usize) -> bool {
        self.ranges.is_type(y, IntegrationType::Reference)
    }

    /// The type of integration `y`. Without any ranges, everything is
    /// [`IntegrationType::Antenna`].
    pub fn integration_type(&self, y: usize) -> IntegrationType {
        if self.ranges.is_empty() {
            return IntegrationType::Antenna;
        }
        self.ranges
            .range_for_row(y)
            .map(|(_, r)| r.kind)
            .unwrap_or_default()
    }

    /// The antenna ranges. Without any ranges, the whole spectrogram is one
    /// antenna range.
    pub fn antenna_ranges(&self) -> Vec<IntegrationRange> {
        if self.ranges.is_empty() {
            if self.height() == 0 {
                return vec![];
            }
            return vec![IntegrationRange::new(
                0,
                self.height() - 1,
                IntegrationType::Antenna,
            )];
        }
        self.ranges
            .iter()
            .filter(|r| r.kind == IntegrationType::Antenna)
            .cloned()
            .collect()
    }
}
