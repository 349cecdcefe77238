// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Header records and the frequency/time calibration derived from them.
//!
//! Header records are kept in the order they were read; several later steps
//! (e.g. integration-range classification) rely on this order.


use hifitime::Epoch;
use lazy_static::lazy_static;
use log::{debug, trace, warn};
use regex::Regex;

use crate::{
    constants::{DEFAULT_DELTA_FREQ_MHZ, DEFAULT_START_FREQ_MHZ, DEFAULT_STOP_FREQ_MHZ},
    spectrogram::Spectrogram,
    time::{correct_bad_clock, epoch_from_unix, format_utc_date, parse_utc_date},
};

lazy_static! {
    static ref LEADING_FLOAT: Regex =
        Regex::new(r"^[+-]?(\d+\.?\d*|\.\d+)([eE][+-]?\d+)?").unwrap();
    static ref LEADING_INT: Regex = Regex::new(r"^[+-]?\d+").unwrap();
}

/// Parse the leading number of a header value, ignoring anything after it.
/// An unparseable value gives `None`.
pub fn parse_leading_f64(s: &str) -> Option<f64> {
    LEADING_FLOAT
        .find(s.trim_start())
        .and_then(|m| m.as_str().parse().ok())
}

/// Parse the leading integer of a header value, ignoring anything after it.
pub fn parse_leading_i64(s: &str) -> Option<i64> {
    LEADING_INT
        .find(s.trim_start())
        .and_then(|m| m.as_str().parse().ok())
}

/// The kind of a header value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, strum_macros::Display)]
pub enum KeyKind {
    /// Integers and logicals.
    #[strum(serialize = "I")]
    Integer,

    #[strum(serialize = "F")]
    Float,

    #[default]
    #[strum(serialize = "C")]
    String,
}

impl KeyKind {
    /// Map a FITS value-type code to a kind. Unknown codes are strings.
    pub fn from_code(code: char) -> KeyKind {
        match code {
            'I' | 'L' => KeyKind::Integer,
            'F' => KeyKind::Float,
            _ => KeyKind::String,
        }
    }
}

/// A single header record.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct HeaderRecord {
    pub keyword: String,

    /// The value as text. String values do not carry their FITS quotes.
    pub value: String,

    pub comment: String,

    pub kind: KeyKind,
}

impl HeaderRecord {
    pub fn new<K: Into<String>, V: Into<String>>(keyword: K, value: V, kind: KeyKind) -> HeaderRecord {
        HeaderRecord {
            keyword: keyword.into(),
            value: value.into(),
            comment: String::new(),
            kind,
        }
    }

    pub fn with_comment<C: Into<String>>(mut self, comment: C) -> HeaderRecord {
        self.comment = comment.into();
        self
    }

    pub fn value_f64(&self) -> Option<f64> {
        parse_leading_f64(&self.value)
    }

    pub fn value_i64(&self) -> Option<i64> {
        parse_leading_i64(&self.value)
    }
}

/// An ordered list of header records. Keyword lookup is linear, exact and
/// case-sensitive; the first match wins.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct HeaderRecords(Vec<HeaderRecord>);

impl HeaderRecords {
    pub fn new() -> HeaderRecords {
        HeaderRecords::default()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<HeaderRecord> {
        self.0.iter()
    }

    pub fn clear(&mut self) {
        self.0.clear();
    }

    /// Append a record without looking for an existing one.
    pub fn push(&mut self, record: HeaderRecord) {
        self.0.push(record);
    }

    pub fn get(&self, keyword: &str) -> Option<&HeaderRecord> {
        self.0.iter().find(|r| r.keyword == keyword)
    }

    pub fn get_mut(&mut self, keyword: &str) -> Option<&mut HeaderRecord> {
        self.0.iter_mut().find(|r| r.keyword == keyword)
    }

    pub fn value(&self, keyword: &str) -> Option<&str> {
        self.get(keyword).map(|r| r.value.as_str())
    }

    pub fn value_f64(&self, keyword: &str) -> Option<f64> {
        self.get(keyword).and_then(HeaderRecord::value_f64)
    }

    pub fn value_i64(&self, keyword: &str) -> Option<i64> {
        self.get(keyword).and_then(HeaderRecord::value_i64)
    }

    /// Set a keyword's value. An existing record keeps its position, and keeps
    /// its kind and comment unless new ones are given. A new keyword is
    /// appended. Empty keywords or values are ignored.
    pub fn set(&mut self, keyword: &str, value: &str, kind: Option<KeyKind>, comment: Option<&str>) {
        if keyword.is_empty() || value.is_empty() {
            return;
        }
        match self.get_mut(keyword) {
            Some(r) => {
                r.value = value.to_string();
                if let Some(kind) = kind {
                    r.kind = kind;
                }
                if let Some(comment) = comment.filter(|c| !c.is_empty()) {
                    r.comment = comment.to_string();
                }
            }
            None => {
                let mut r = HeaderRecord::new(keyword, value, kind.unwrap_or_default());
                if let Some(comment) = comment {
                    r.comment = comment.to_string();
                }
                self.0.push(r);
            }
        }
    }

    pub fn set_string(&mut self, keyword: &str, value: &str) {
        self.set(keyword, value, Some(KeyKind::String), None);
    }

    pub fn set_int(&mut self, keyword: &str, value: i64) {
        self.set(keyword, &value.to_string(), Some(KeyKind::Integer), None);
    }

    /// Floats are stored with 8 decimal places.
    pub fn set_float(&mut self, keyword: &str, value: f64) {
        self.set(keyword, &format!("{value:.8}"), Some(KeyKind::Float), None);
    }

    /// Remove every record with this keyword, returning how many were removed.
    pub fn remove(&mut self, keyword: &str) -> usize {
        let before = self.0.len();
        self.0.retain(|r| r.keyword != keyword);
        before - self.0.len()
    }

    /// Split the comma-separated list held by `keyword` (e.g. "STATES").
    pub fn list(&self, keyword: &str) -> Vec<String> {
        self.value(keyword)
            .map(|v| {
                v.split(',')
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default()
    }
}

impl<'a> IntoIterator for &'a HeaderRecords {
    type Item = &'a HeaderRecord;
    type IntoIter = std::slice::Iter<'a, HeaderRecord>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

impl FromIterator<HeaderRecord> for HeaderRecords {
    fn from_iter<I: IntoIterator<Item = HeaderRecord>>(iter: I) -> Self {
        HeaderRecords(iter.into_iter().collect())
    }
}

/// Options controlling how calibration is derived from a header.
#[derive(Debug, Clone, Copy, Default)]
pub struct CalibrationOptions {
    /// Force frequency on the vertical axis and time on the horizontal one.
    /// Even when this is false, the axis order is detected from `CTYPE1` and
    /// `CTYPE2`.
    pub transposed: bool,

    /// Correct times recorded with the known-bad DAQ clock of October 2012.
    pub fix_bad_clock: bool,

    /// Don't warn about missing time information.
    pub quiet: bool,
}

/// Frequency and time calibration of a spectrogram.
#[derive(Debug, Clone, PartialEq)]
pub struct Calibration {
    /// Frequency of the first channel \[MHz\].
    pub start_freq: f64,

    /// Frequency of the last channel \[MHz\].
    pub stop_freq: f64,

    /// Channel width \[MHz\].
    pub delta_freq: f64,

    /// The duration of each integration \[s\].
    pub integration_time: f64,

    /// The start time of the first integration (Unix seconds).
    pub epoch_seconds: i64,

    /// The microsecond part of the start time.
    pub epoch_microseconds: i64,

    /// The number of spectra accumulated into each integration.
    pub accumulation_count: i64,

    /// Is frequency on the vertical axis?
    pub transposed: bool,
}

impl Default for Calibration {
    fn default() -> Self {
        Calibration {
            start_freq: DEFAULT_START_FREQ_MHZ,
            stop_freq: DEFAULT_STOP_FREQ_MHZ,
            delta_freq: DEFAULT_DELTA_FREQ_MHZ,
            integration_time: 0.0,
            epoch_seconds: 0,
            epoch_microseconds: 0,
            accumulation_count: 0,
            transposed: false,
        }
    }
}

/// Which header keys hold which axis calibration.
struct AxisKeys {
    freq_value: &'static str,
    freq_delta: &'static str,
    time_delta: &'static str,
}

impl AxisKeys {
    fn new(transposed: bool) -> AxisKeys {
        if transposed {
            AxisKeys {
                freq_value: "CRVAL2",
                freq_delta: "CDELT2",
                time_delta: "CDELT1",
            }
        } else {
            AxisKeys {
                freq_value: "CRVAL1",
                freq_delta: "CDELT1",
                time_delta: "CDELT2",
            }
        }
    }
}

fn header_is_transposed(records: &HeaderRecords) -> bool {
    records.iter().any(|r| {
        (r.keyword == "CTYPE2" && r.value == "Frequency") || (r.keyword == "CTYPE1" && r.value == "Time")
    })
}

impl Calibration {
    /// Derive calibration from header records, starting from the defaults.
    /// `width` is the number of channels. See [`Calibration::update_from_header`].
    pub fn from_header(
        records: &mut HeaderRecords,
        width: usize,
        options: &CalibrationOptions,
    ) -> Calibration {
        let mut c = Calibration::default();
        c.update_from_header(records, width, options);
        c
    }

    /// Update calibration from header records. Keywords are matched by
    /// substring and the last matching record wins, except for dates, where
    /// `DATE-OBS` always wins over any other keyword containing "DATE".
    ///
    /// Fallbacks:
    /// - without `STOPFRQ` but with a frequency delta, the stop frequency is
    ///   `start + delta * (width - 1)`;
    /// - without a positive `INTTIME`, `EXPTIME` and then the time-axis delta
    ///   are used;
    /// - without a positive `DTIME-FS`, the date string is parsed.
    ///
    /// With [`CalibrationOptions::fix_bad_clock`], a corrected `DTIME-FS` is
    /// also written back into `records`.
    pub fn update_from_header(
        &mut self,
        records: &mut HeaderRecords,
        width: usize,
        options: &CalibrationOptions,
    ) {
        let transposed = options.transposed || header_is_transposed(records);
        if transposed && !options.transposed {
            debug!("Header says the dynamic spectrum has time on the horizontal axis and frequency on the vertical axis");
        }
        self.transposed = transposed;
        let keys = AxisKeys::new(transposed);

        let mut stop_freq_found = false;
        let mut delta_freq_found = false;
        let mut date: Option<String> = None;
        let mut exptime: Option<f64> = None;
        let mut time_delta: Option<f64> = None;

        for r in records.0.iter_mut() {
            let k = r.keyword.as_str();
            trace!("{k} = {}", r.value);

            if k.contains("INTTIME") {
                self.integration_time = r.value_f64().unwrap_or(0.0);
            }
            if k.contains("EXPTIME") {
                exptime = r.value_f64();
            }
            if k.contains("DTIME-FS") {
                self.epoch_seconds = r.value_i64().unwrap_or(0);
                if options.fix_bad_clock {
                    if let Some(fixed) = correct_bad_clock(self.epoch_seconds) {
                        debug!("Correcting DTIME-FS {} -> {fixed}", self.epoch_seconds);
                        self.epoch_seconds = fixed;
                        r.value = fixed.to_string();
                    }
                }
            }
            if k.contains("DATE") {
                if k == "DATE-OBS" {
                    if let Some(d) = date.as_deref() {
                        warn!("Overwriting date {d} with DATE-OBS = {}", r.value);
                    }
                    date = Some(r.value.clone());
                } else if let Some(d) = date.as_deref() {
                    debug!("Date already set to {d}; ignoring {k} = {}", r.value);
                } else {
                    date = Some(r.value.clone());
                }
            }
            if k.contains("DTIME-FU") {
                self.epoch_microseconds = r.value_i64().unwrap_or(0);
            }
            if k.contains("NACCUM") {
                self.accumulation_count = r.value_i64().unwrap_or(0);
            }
            if k.contains("STARTFRQ") || k.contains(keys.freq_value) {
                self.start_freq = r.value_f64().unwrap_or(0.0);
                debug!("Start frequency = {:.2} MHz", self.start_freq);
            }
            if k.contains("STOPFRQ") {
                self.stop_freq = r.value_f64().unwrap_or(0.0);
                debug!("Stop frequency = {:.2} MHz", self.stop_freq);
                stop_freq_found = true;
            }
            if k.contains(keys.freq_delta) {
                self.delta_freq = r.value_f64().unwrap_or(0.0);
                delta_freq_found = true;
            }
            if k.contains(keys.time_delta) {
                time_delta = r.value_f64();
            }
        }

        if !stop_freq_found && delta_freq_found {
            self.stop_freq =
                self.start_freq + self.delta_freq * (width.saturating_sub(1)) as f64;
        }

        if self.integration_time <= 0.0 {
            match exptime.filter(|&t| t > 0.0).or(time_delta) {
                Some(t) => self.integration_time = t,
                None if !options.quiet => {
                    warn!("Couldn't find INTTIME, EXPTIME nor {} to get the time resolution", keys.time_delta)
                }
                None => (),
            }
        }

        if self.epoch_seconds <= 0 {
            match date.as_deref().map(|d| (d, parse_utc_date(d))) {
                Some((_, Some((s, us)))) => {
                    self.epoch_seconds = s;
                    self.epoch_microseconds = us;
                }
                Some((d, None)) => warn!("Couldn't parse the start date '{d}'"),
                None if !options.quiet => warn!("Couldn't find the start time of the image"),
                None => (),
            }
        }
    }

    /// The start time as Unix seconds.
    pub fn unix_time(&self) -> f64 {
        self.epoch_seconds as f64 + self.epoch_microseconds as f64 / 1e6
    }
}

impl Spectrogram<'_> {
    pub fn records(&self) -> &HeaderRecords {
        &self.records
    }

    pub fn records_mut(&mut self) -> &mut HeaderRecords {
        &mut self.records
    }

    /// Replace the header records and re-derive calibration and integration
    /// ranges from them.
    pub fn set_records(&mut self, records: HeaderRecords, options: &CalibrationOptions) {
        self.records = records;
        self.derive_calibration(options);
        self.classify_integrations();
    }

    /// Re-derive [`Calibration`] from the current header records.
    pub fn derive_calibration(&mut self, options: &CalibrationOptions) {
        let width = self.width();
        self.calibration
            .update_from_header(&mut self.records, width, options);
    }

    /// The frequency of channel `ch` \[MHz\].
    pub fn channel_to_frequency(&self, ch: usize) -> f64 {
        let c = &self.calibration;
        if self.width() < 2 {
            return c.start_freq;
        }
        let resolution = (c.stop_freq - c.start_freq) / (self.width() - 1) as f64;
        c.start_freq + ch as f64 * resolution
    }

    /// The channel containing `freq` \[MHz\]. This may be negative or beyond
    /// the width for frequencies outside the band.
    pub fn frequency_to_channel(&self, freq: f64) -> i64 {
        let c = &self.calibration;
        let bandwidth = c.stop_freq - c.start_freq;
        if bandwidth == 0.0 {
            return 0;
        }
        ((freq - c.start_freq) / bandwidth * self.width() as f64).floor() as i64
    }

    /// The `CDELT1` header value, or -1 if it isn't there.
    pub fn channel_width(&self) -> f64 {
        self.records.value_f64("CDELT1").unwrap_or(-1.0)
    }

    /// The start time of the spectrogram as Unix seconds.
    pub fn unix_time(&self) -> f64 {
        self.calibration.unix_time()
    }

    /// The start time of integration `y` as Unix seconds.
    pub fn row_unix_time(&self, y: usize) -> f64 {
        self.unix_time() + y as f64 * self.calibration.integration_time
    }

    pub fn start_epoch(&self) -> Epoch {
        epoch_from_unix(self.unix_time())
    }

    /// Set a float keyword. Setting `STARTFRQ` or `STOPFRQ` also updates the
    /// calibration.
    pub fn set_keyword_float(&mut self, keyword: &str, value: f64) {
        self.records.set_float(keyword, value);
        match keyword {
            "STARTFRQ" => self.calibration.start_freq = value,
            "STOPFRQ" => self.calibration.stop_freq = value,
            _ => (),
        }
    }

    pub fn set_keyword_int(&mut self, keyword: &str, value: i64) {
        self.records.set_int(keyword, value);
    }

    pub fn set_keyword(&mut self, keyword: &str, value: &str) {
        self.records.set_string(keyword, value);
    }

    /// Set the integration time along with the `INTTIME`, `EXPTIME` and
    /// `CDELT2` keywords.
    pub fn set_integration_time_keys(&mut self, integration_time: f64) {
        for k in ["INTTIME", "EXPTIME", "CDELT2"] {
            self.set_keyword_float(k, integration_time);
        }
        self.calibration.integration_time = integration_time;
    }

    /// The header records as they should be written out: a positive
    /// integration time is copied into `INTTIME`.
    pub fn records_for_writing(&self) -> HeaderRecords {
        let mut records = self.records.clone();
        let t = self.calibration.integration_time;
        if t > 0.0 {
            records.set_float("INTTIME", t);
        }
        records
    }

    /// Write a standard spectrometer header: start time, integration time
    /// and the frequency and time axes. With `transposed`, frequency is put on
    /// the vertical axis.
    pub fn prepare_header(
        &mut self,
        unix_start: f64,
        integration_time: f64,
        start_freq: f64,
        delta_freq: f64,
        transposed: bool,
    ) {
        let seconds = unix_start.trunc() as i64;
        let micros = ((unix_start - seconds as f64) * 1e6) as i64;
        debug!("Preparing header with start frequency {start_freq:.4} MHz");

        self.set_keyword_int("DTIME-FS", seconds);
        self.set_keyword_int("DTIME-FU", micros);
        if let Some(date) = format_utc_date(seconds) {
            self.set_keyword("DATE", &date);
        }
        self.set_keyword_float("INTTIME", integration_time);
        self.set_keyword_float("EXPTIME", integration_time);

        let (freq_axis, time_axis) = if transposed { ("2", "1") } else { ("1", "2") };
        self.set_keyword_int(&format!("CRPIX{freq_axis}"), 1);
        self.set_keyword(&format!("CTYPE{freq_axis}"), "Frequency");
        self.set_keyword(&format!("CUNIT{freq_axis}"), "MHz");
        self.set_keyword_float(&format!("CRVAL{freq_axis}"), start_freq);
        self.set_keyword_float(&format!("CDELT{freq_axis}"), delta_freq);

        self.set_keyword_int(&format!("CRPIX{time_axis}"), 1);
        self.set_keyword(&format!("CTYPE{time_axis}"), "Time");
        self.set_keyword(&format!("CUNIT{time_axis}"), "sec");
        self.set_keyword_float(&format!("CDELT{time_axis}"), integration_time);

        let width = self.width();
        let c = &mut self.calibration;
        c.integration_time = integration_time;
        c.epoch_seconds = seconds;
        c.epoch_microseconds = micros;
        c.start_freq = start_freq;
        c.delta_freq = delta_freq;
        c.stop_freq = start_freq + delta_freq * width.saturating_sub(1) as f64;
        c.transposed = transposed;
    }

    /// Append every record of `records` except `STATES` and any keyword
    /// containing one of the states listed in it. Returns the new number of
    /// records.
    pub fn set_records_without_states(&mut self, records: &HeaderRecords) -> usize {
        let states = records.list("STATES");
        for r in records {
            let is_state_key = r.keyword == "STATES"
                || states.iter().any(|s| r.keyword.contains(s.as_str()));
            if !is_state_key {
                self.records.push(r.clone());
            }
        }
        self.records.len()
    }
}
