// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Per-channel statistics over integrations.

use log::{debug, info, trace, warn};
use ndarray::prelude::*;

use super::Quartiles;
use crate::{
    math::{mean_and_rms, mw_to_dbm},
    quality::{FlatResponse, SpectrometerResponse},
    spectrogram::Spectrogram,
    states::IntegrationRange,
};

/// What [`Spectrogram::spectrum_stats`] should use.
#[derive(Clone, Copy)]
pub struct SpectrumStatsOptions<'a> {
    /// The first integration.
    pub start: usize,

    /// One past the last integration (the height by default).
    pub end: Option<usize>,

    /// Only use integrations in a range with this name (e.g. "ANT"). An
    /// integration outside every range is skipped.
    pub state: Option<&'a str>,

    /// Skip samples that this mask marks as RFI.
    pub mask: Option<&'a Spectrogram<'a>>,

    /// Also find the per-channel minimum and maximum.
    pub min_max: bool,

    /// Samples below this never become the minimum.
    pub min_acceptable: f64,

    /// Used to convert the total power to dBm. Flat without one.
    pub response: Option<&'a dyn SpectrometerResponse>,
}

impl Default for SpectrumStatsOptions<'_> {
    fn default() -> Self {
        SpectrumStatsOptions {
            start: 0,
            end: None,
            state: None,
            mask: None,
            min_max: false,
            min_acceptable: f64::NEG_INFINITY,
            response: None,
        }
    }
}

/// The mean spectrum of a set of integrations.
#[derive(Debug, Clone, PartialEq)]
pub struct SpectrumStats {
    pub mean: Vec<f64>,
    pub rms: Vec<f64>,

    /// How many samples contributed to each channel. A channel with no
    /// samples has a mean and RMS of 0.
    pub counts: Vec<usize>,

    /// Per-channel minimum, if asked for. NaN where nothing was acceptable.
    pub min: Option<Vec<f64>>,
    pub max: Option<Vec<f64>>,

    pub integrations_used: usize,

    /// The integration time multiplied by the number of integrations used
    /// \[seconds\].
    pub total_integration_time: f64,

    /// The sum of the mean spectrum (instrumental units).
    pub total_power: f64,

    pub total_power_dbm: f64,
}

/// Per-channel medians from [`Spectrogram::median_per_channel`].
#[derive(Debug, Clone, PartialEq)]
pub struct ChannelMedians {
    pub median: Vec<f64>,
    /// (Q75 - Q25) / 1.35 per channel.
    pub rms_iqr: Vec<f64>,
    /// The largest number of samples in any channel.
    pub max_count: usize,
}

impl Spectrogram<'_> {
    fn row_has_state(&self, y: usize, state: Option<&str>) -> bool {
        match state {
            None | Some("") => true,
            Some(state) => self.range_for_row(y).map_or(false, |r| r.name == state),
        }
    }

    /// The per-channel mean and RMS over a set of integrations. `None` if the
    /// mask doesn't match this spectrogram's size.
    pub fn spectrum_stats(&self, options: &SpectrumStatsOptions) -> Option<SpectrumStats> {
        if let Some(mask) = options.mask {
            if mask.width() != self.width() || mask.height() != self.height() {
                warn!(
                    "RFI mask is {}x{} but the spectrogram is {}x{}",
                    mask.width(),
                    mask.height(),
                    self.width(),
                    self.height()
                );
                return None;
            }
        }

        let width = self.width();
        let end = options.end.unwrap_or(self.height()).min(self.height());
        let rows: Vec<usize> = (options.start..end)
            .filter(|&y| self.row_has_state(y, options.state))
            .collect();
        for y in &rows {
            trace!("Integration {y} used");
        }

        let mut sum = vec![0.0; width];
        let mut sum2 = vec![0.0; width];
        let mut counts = vec![0; width];
        let mut min = vec![f64::INFINITY; width];
        let mut max = vec![f64::NEG_INFINITY; width];
        let samples = self.samples();
        let mask = options.mask.map(|m| m.samples());
        for &y in &rows {
            for (x, &v) in samples.row(y).iter().enumerate() {
                let v = f64::from(v);
                if !v.is_finite() {
                    continue;
                }
                if options.min_max {
                    if v < min[x] && v >= options.min_acceptable {
                        min[x] = v;
                    }
                    if v > max[x] {
                        max[x] = v;
                    }
                }
                if mask.as_ref().map_or(false, |m| m[[y, x]] > 0.0) {
                    continue;
                }
                sum[x] += v;
                sum2[x] += v * v;
                counts[x] += 1;
            }
        }

        let (mean, rms): (Vec<f64>, Vec<f64>) = (0..width)
            .map(|x| {
                if counts[x] == 0 {
                    (0.0, 0.0)
                } else {
                    mean_and_rms(sum[x], sum2[x], counts[x])
                }
            })
            .unzip();

        let flat = FlatResponse::default();
        let response = options
            .response
            .unwrap_or(&flat as &dyn SpectrometerResponse);
        let mut total_power = 0.0;
        let mut total_power_mw = 0.0;
        for (x, &m) in mean.iter().enumerate() {
            total_power += m;
            total_power_mw += response.power_to_mw(self.channel_to_frequency(x), m);
        }
        let total_power_dbm = mw_to_dbm(total_power_mw);

        let finite_or_nan = |v: f64| if v.is_finite() { v } else { f64::NAN };
        let integrations_used = rows.len();
        let integration_time = self.calibration.integration_time;
        let total_integration_time = integration_time * integrations_used as f64;

        debug!(
            "Statistics of integrations {} - {end}: {integrations_used} used",
            options.start
        );
        debug!(
            "Integration time = {integrations_used} x {integration_time:.8} s = {total_integration_time:.8} s"
        );
        info!(
            "Total power (unix time {:.8}) = {total_power:.8} = {total_power_dbm:.2} dBm",
            self.unix_time()
        );

        Some(SpectrumStats {
            mean,
            rms,
            counts,
            min: options
                .min_max
                .then(|| min.into_iter().map(finite_or_nan).collect()),
            max: options
                .min_max
                .then(|| max.into_iter().map(finite_or_nan).collect()),
            integrations_used,
            total_integration_time,
            total_power,
            total_power_dbm,
        })
    }

    /// The per-channel median and robust RMS over every integration in
    /// `ranges`. Channels without finite samples are NaN.
    pub fn median_per_channel(&self, ranges: &[IntegrationRange]) -> ChannelMedians {
        let width = self.width();
        let mut median = Vec::with_capacity(width);
        let mut rms_iqr = Vec::with_capacity(width);
        let mut max_count = 0;
        let mut values = Vec::new();
        for column in self.samples().axis_iter(Axis(1)) {
            values.clear();
            for r in ranges {
                let end = r.end.saturating_add(1).min(column.len());
                if r.start >= end {
                    continue;
                }
                values.extend(
                    column
                        .slice(s![r.start..end])
                        .iter()
                        .map(|&v| f64::from(v))
                        .filter(|v| v.is_finite()),
                );
            }
            max_count = max_count.max(values.len());
            match Quartiles::from_values(&mut values) {
                Some(q) => {
                    median.push(q.median);
                    rms_iqr.push(q.rms_iqr());
                }
                None => {
                    median.push(f64::NAN);
                    rms_iqr.push(f64::NAN);
                }
            }
        }
        ChannelMedians {
            median,
            rms_iqr,
            max_count,
        }
    }

    /// [`Spectrogram::median_per_channel`] over all integrations.
    pub fn median_spectrum(&self) -> ChannelMedians {
        match self.height() {
            0 => self.median_per_channel(&[]),
            h => self.median_per_channel(&[IntegrationRange::new(
                0,
                h - 1,
                crate::states::IntegrationType::Undefined,
            )]),
        }
    }
}
