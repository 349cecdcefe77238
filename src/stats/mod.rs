// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Read-only statistics over a spectrogram.
//!
//! Non-finite samples are never accumulated. Whenever a statistic is reported
//! with a count, a count of 0 means the other fields are meaningless (they are
//! NaN).

mod spectrum;

pub use spectrum::{ChannelMedians, SpectrumStats, SpectrumStatsOptions};

use std::ops::Range;

use log::{debug, warn};
use ndarray::{prelude::*, Zip};

use crate::{constants::IQR_TO_SIGMA, math::mean_and_rms, spectrogram::Spectrogram};

/// Median and quartiles of a set of values. Ranks are truncated, so for `n`
/// values the median is element `n/2` of the sorted values, and the quartiles
/// are elements `floor(0.25 n)` and `floor(0.75 n)`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Quartiles {
    pub median: f64,
    pub q25: f64,
    pub q75: f64,
}

impl Quartiles {
    /// Sort `values` in place and get their quartiles. `None` if `values` is
    /// empty.
    pub fn from_values(values: &mut [f64]) -> Option<Quartiles> {
        if values.is_empty() {
            return None;
        }
        values.sort_unstable_by(|a, b| a.total_cmp(b));
        let n = values.len();
        let q25 = (n as f64 * 0.25) as usize;
        let q75 = (n as f64 * 0.75) as usize;
        Some(Quartiles {
            median: values[n / 2],
            q25: values[q25],
            q75: values[q75.min(n - 1)],
        })
    }

    /// The inter-quartile range.
    pub fn iqr(&self) -> f64 {
        self.q75 - self.q25
    }

    /// The standard deviation of a Gaussian with this inter-quartile range.
    pub fn rms_iqr(&self) -> f64 {
        self.iqr() / IQR_TO_SIGMA
    }
}

/// Aggregates over a set of samples.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RegionStats {
    pub mean: f64,
    pub rms: f64,
    pub min: f64,
    pub max: f64,

    /// The number of finite samples used.
    pub count: usize,

    /// The number of NaN or infinite samples that were skipped.
    pub non_finite: usize,

    /// Only calculated when asked for.
    pub quartiles: Option<Quartiles>,
}

#[derive(Default)]
struct Accumulator {
    sum: f64,
    sum2: f64,
    count: usize,
    non_finite: usize,
    min: f64,
    max: f64,
    values: Option<Vec<f64>>,
}

impl Accumulator {
    fn new(keep_values: bool) -> Accumulator {
        Accumulator {
            min: f64::INFINITY,
            max: f64::NEG_INFINITY,
            values: keep_values.then(Vec::new),
            ..Default::default()
        }
    }

    fn push(&mut self, v: f64) {
        if !v.is_finite() {
            self.non_finite += 1;
            return;
        }
        self.sum += v;
        self.sum2 += v * v;
        self.count += 1;
        self.min = self.min.min(v);
        self.max = self.max.max(v);
        if let Some(values) = self.values.as_mut() {
            values.push(v);
        }
    }

    fn finish(self) -> RegionStats {
        if self.count == 0 {
            return RegionStats {
                mean: f64::NAN,
                rms: f64::NAN,
                min: f64::NAN,
                max: f64::NAN,
                count: 0,
                non_finite: self.non_finite,
                quartiles: None,
            };
        }
        let (mean, rms) = mean_and_rms(self.sum, self.sum2, self.count);
        let quartiles = self
            .values
            .and_then(|mut v| Quartiles::from_values(&mut v));
        RegionStats {
            mean,
            rms,
            min: self.min,
            max: self.max,
            count: self.count,
            non_finite: self.non_finite,
            quartiles,
        }
    }
}

/// How [`Spectrogram::find_values`] matches samples.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FindMode {
    /// Within `delta` of the value.
    Exact,
    /// Below the value.
    Smaller,
    /// At or above the value.
    LargerOrEqual,
}

/// The brightest channel of an integration.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MaxPower {
    /// `None` if no channel was at least -1.
    pub channel: Option<usize>,
    pub power: f64,
    /// -1 if no channel was found.
    pub freq: f64,
}

/// The result of [`Spectrogram::compare`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Comparison {
    /// The number of samples differing by more than the tolerance. Images of
    /// different sizes count as 1.
    pub num_different: usize,
    pub max_diff: f64,
    /// `(channel, integration)` of the largest difference.
    pub max_diff_at: Option<(usize, usize)>,
}

impl Spectrogram<'_> {
    /// Statistics over channels `x` and integrations `y`. The ranges are
    /// clipped to the image.
    pub fn region_stats(&self, x: Range<usize>, y: Range<usize>) -> RegionStats {
        let clip = |r: Range<usize>, len: usize| {
            let end = r.end.min(len);
            r.start.min(end)..end
        };
        let (x, y) = (clip(x, self.width()), clip(y, self.height()));
        let mut acc = Accumulator::new(false);
        for &v in self.samples().slice(s![y, x]) {
            acc.push(f64::from(v));
        }
        let stats = acc.finish();
        if stats.non_finite > 0 {
            warn!(
                "{} / {} samples are NaN or infinite and were ignored",
                stats.non_finite,
                stats.non_finite + stats.count
            );
        }
        stats
    }

    /// Statistics over the whole image.
    pub fn stats(&self) -> RegionStats {
        self.region_stats(0..self.width(), 0..self.height())
    }

    /// Statistics over the image without `border` samples on each side.
    pub fn bordered_stats(&self, border: usize) -> RegionStats {
        self.region_stats(
            border..self.width().saturating_sub(border),
            border..self.height().saturating_sub(border),
        )
    }

    /// Statistics over samples no further than `radius` from `center`
    /// (`(channel, integration)`, the middle of the image by default). With
    /// `with_quartiles`, the median and inter-quartile range are found too.
    pub fn radius_stats(
        &self,
        radius: usize,
        center: Option<(usize, usize)>,
        with_quartiles: bool,
    ) -> RegionStats {
        let (cx, cy) = center.unwrap_or((self.width() / 2, self.height() / 2));
        let (cx, cy, r) = (cx as i64, cy as i64, radius as i64);
        let r2 = r * r;

        let mut acc = Accumulator::new(with_quartiles);
        let (y0, y1) = ((cy - r).max(0), (cy + r + 1).min(self.height() as i64));
        let (x0, x1) = ((cx - r).max(0), (cx + r + 1).min(self.width() as i64));
        if y0 < y1 && x0 < x1 {
            let samples = self.samples();
            let window = samples.slice(s![y0 as usize..y1 as usize, x0 as usize..x1 as usize]);
            for ((y, x), &v) in window.indexed_iter() {
                let (dx, dy) = (x as i64 + x0 - cx, y as i64 + y0 - cy);
                if dx * dx + dy * dy <= r2 {
                    acc.push(f64::from(v));
                }
            }
        }
        let stats = acc.finish();
        if stats.non_finite > 0 {
            debug!(
                "{} / {} samples within {radius} of ({cx},{cy}) are NaN or infinite and were ignored",
                stats.non_finite,
                stats.non_finite + stats.count
            );
        }
        stats
    }

    /// The mean and RMS of every integration.
    pub fn mean_lines(&self) -> Vec<(f64, f64)> {
        self.samples()
            .axis_iter(Axis(0))
            .map(|row| {
                let mut acc = Accumulator::new(false);
                for &v in row {
                    acc.push(f64::from(v));
                }
                let s = acc.finish();
                (s.mean, s.rms)
            })
            .collect()
    }

    /// The mean and RMS of channel `x` over all integrations. Both are NaN
    /// for a channel that doesn't exist.
    pub fn mean_column(&self, x: usize) -> (f64, f64) {
        let mut acc = Accumulator::new(false);
        if x < self.width() {
            for &v in self.samples().column(x) {
                acc.push(f64::from(v));
            }
        }
        let s = acc.finish();
        (s.mean, s.rms)
    }

    /// The sum of integration `y` over channels `start_ch` to `end_ch`
    /// inclusive (the last channel by default). Non-finite samples are
    /// skipped.
    pub fn total_power(&self, y: usize, start_ch: usize, end_ch: Option<usize>) -> f64 {
        if self.width() == 0 || y >= self.height() {
            return 0.0;
        }
        let end_ch = end_ch.unwrap_or(self.width() - 1).min(self.width() - 1);
        if start_ch > end_ch {
            return 0.0;
        }
        self.samples()
            .slice(s![y, start_ch..=end_ch])
            .iter()
            .map(|&v| f64::from(v))
            .filter(|v| v.is_finite())
            .sum()
    }

    /// [`Spectrogram::total_power`] between two frequencies \[MHz\]. Channels
    /// outside the band contribute nothing.
    pub fn total_power_freq(&self, y: usize, start_freq: f64, end_freq: f64) -> f64 {
        let start_ch = self.frequency_to_channel(start_freq);
        let end_ch = self.frequency_to_channel(end_freq);
        if end_ch < 0 || end_ch < start_ch {
            return 0.0;
        }
        self.total_power(y, start_ch.max(0) as usize, Some(end_ch as usize))
    }

    /// The brightest channel of integration `y` among channels `start_ch` up
    /// to (not including) `end_ch` (the last channel by default). Ties go to
    /// the later channel.
    pub fn max_power(&self, y: usize, start_ch: usize, end_ch: Option<usize>) -> MaxPower {
        let mut max = MaxPower {
            channel: None,
            power: -1.0,
            freq: -1.0,
        };
        let end_ch = end_ch
            .unwrap_or_else(|| self.width().saturating_sub(1))
            .min(self.width());
        for x in start_ch..end_ch {
            let power = f64::from(self.get(x, y));
            if power >= max.power {
                max.channel = Some(x);
                max.power = power;
                max.freq = self.channel_to_frequency(x);
            }
        }
        max
    }

    fn hold<F: Fn(f32, f32) -> bool>(&self, rows: Range<usize>, init: f32, better: F) -> Vec<f32> {
        let mut envelope = Array1::from_elem(self.width(), init);
        let end = rows.end.min(self.height());
        let start = rows.start.min(end);
        for row in self.samples().slice(s![start..end, ..]).outer_iter() {
            Zip::from(&mut envelope).and(&row).for_each(|e, &v| {
                if v.is_finite() && better(v, *e) {
                    *e = v;
                }
            });
        }
        envelope
            .iter()
            .map(|&e| if e.is_finite() { e } else { f32::NAN })
            .collect()
    }

    /// The per-channel maximum over integrations `rows`. Channels without a
    /// finite sample are NaN.
    pub fn max_hold(&self, rows: Range<usize>) -> Vec<f32> {
        self.hold(rows, f32::NEG_INFINITY, |v, e| v > e)
    }

    /// The per-channel minimum over integrations `rows`.
    pub fn min_hold(&self, rows: Range<usize>) -> Vec<f32> {
        self.hold(rows, f32::INFINITY, |v, e| v < e)
    }

    /// Count the samples matching `value`.
    pub fn find_values(&self, value: f64, delta: f64, mode: FindMode) -> usize {
        let mut n = 0;
        for ((y, x), &v) in self.samples().indexed_iter() {
            let v = f64::from(v);
            let matched = match mode {
                FindMode::Exact => (v - value).abs() < delta,
                FindMode::Smaller => v < value,
                FindMode::LargerOrEqual => v >= value,
            };
            if matched {
                debug!("({x},{y}) = {v:.8}");
                n += 1;
            }
        }
        n
    }

    /// Compare with another image of the same size, sample by sample.
    pub fn compare(&self, other: &Spectrogram, min_diff: f64) -> Comparison {
        if self.width() != other.width() || self.height() != other.height() {
            warn!(
                "Image sizes differ: {}x{} != {}x{}",
                self.width(),
                self.height(),
                other.width(),
                other.height()
            );
            return Comparison {
                num_different: 1,
                max_diff: f64::NAN,
                max_diff_at: None,
            };
        }

        let mut cmp = Comparison {
            num_different: 0,
            max_diff: f64::NEG_INFINITY,
            max_diff_at: None,
        };
        Zip::indexed(&self.samples())
            .and(&other.samples())
            .for_each(|(y, x), &a, &b| {
                let (a, b) = (f64::from(a), f64::from(b));
                let diff = (a - b).abs();
                if diff > min_diff {
                    debug!(
                        "{a:e} != {b:e} at ({x},{y}) - {:.2} MHz",
                        self.channel_to_frequency(x)
                    );
                    cmp.num_different += 1;
                }
                if diff > cmp.max_diff {
                    cmp.max_diff = diff;
                    cmp.max_diff_at = Some((x, y));
                }
            });
        if cmp.num_different > 0 {
            debug!(
                "Images have {} different samples (maximum difference {:e} at {:?})",
                cmp.num_different, cmp.max_diff, cmp.max_diff_at
            );
        }
        cmp
    }
}
