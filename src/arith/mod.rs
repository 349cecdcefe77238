// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Sample-wise image algebra.
//!
//! Binary operations need both operands to be the same size. If they aren't,
//! a warning is logged, nothing is changed and `false` is returned.


use log::{debug, info, warn};
use ndarray::prelude::*;
use strum_macros::{Display, EnumIter, EnumString};

use crate::{
    math::{fit_line, interpolate_linear, LineFit},
    spectrogram::Spectrogram,
};

/// An operation applied to every sample by [`Spectrogram::apply`].
#[derive(Debug, Display, Clone, Copy, PartialEq, Eq, EnumIter, EnumString)]
pub enum UnaryOp {
    /// 1 / v
    #[strum(serialize = "invert")]
    Invert,

    /// |v|
    #[strum(serialize = "abs")]
    Abs,

    /// log10(v)
    #[strum(serialize = "log10")]
    Log10,

    /// 10 log10(v)
    #[strum(serialize = "db")]
    Db,

    /// 10^(v / 10)
    #[strum(serialize = "db2lin")]
    DbToLinear,

    /// min(v, value)
    #[strum(serialize = "ceiling")]
    Ceiling,

    /// sqrt(v)
    #[strum(serialize = "sqrt")]
    Sqrt,

    /// v / value
    #[strum(serialize = "divide")]
    DivideConst,

    /// v * value
    #[strum(serialize = "times")]
    TimesConst,

    /// v + value
    #[strum(serialize = "add")]
    AddConst,
}

impl UnaryOp {
    pub fn eval(self, v: f64, value: f64) -> f64 {
        match self {
            UnaryOp::Invert => 1.0 / v,
            UnaryOp::Abs => v.abs(),
            UnaryOp::Log10 => v.log10(),
            UnaryOp::Db => 10.0 * v.log10(),
            UnaryOp::DbToLinear => 10_f64.powf(v / 10.0),
            UnaryOp::Ceiling => {
                if v > value {
                    value
                } else {
                    v
                }
            }
            UnaryOp::Sqrt => v.sqrt(),
            UnaryOp::DivideConst => v / value,
            UnaryOp::TimesConst => v * value,
            UnaryOp::AddConst => v + value,
        }
    }
}

/// One channel of [`Spectrogram::subtract_rows`] or
/// [`Spectrogram::divide_rows`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RowComparison {
    pub channel: usize,
    /// The difference or ratio.
    pub value: f64,
    pub v1: f64,
    pub v0: f64,
    pub freq: f64,
}

impl Spectrogram<'_> {
    fn same_size(&self, right: &Spectrogram, what: &str) -> bool {
        if self.width() != right.width() || self.height() != right.height() {
            warn!(
                "Can't {what}: image sizes differ {}x{} != {}x{}",
                self.width(),
                self.height(),
                right.width(),
                right.height()
            );
            return false;
        }
        true
    }

    fn zip_with<F>(&mut self, right: &Spectrogram, what: &str, f: F) -> bool
    where
        F: Fn(f64, f64) -> Option<f64>,
    {
        if !self.same_size(right, what) {
            return false;
        }
        self.zip_mut_with(&right.samples().view(), |a, b| {
            f(f64::from(a), f64::from(b)).map_or(a, |v| v as f32)
        });
        true
    }

    fn map_samples<F: Fn(f64) -> f64>(&mut self, f: F) {
        self.map_inplace(|v| f(f64::from(v)) as f32);
    }

    /// Add `right` sample-wise. The integration times are added too.
    pub fn add_image(&mut self, right: &Spectrogram) -> bool {
        let ok = self.zip_with(right, "add", |a, b| Some(a + b));
        self.calibration.integration_time += right.calibration.integration_time;
        ok
    }

    pub fn subtract_image(&mut self, right: &Spectrogram) -> bool {
        self.zip_with(right, "subtract", |a, b| Some(a - b))
    }

    pub fn multiply_image(&mut self, right: &Spectrogram) -> bool {
        self.zip_with(right, "multiply", |a, b| Some(a * b))
    }

    /// Divide by `right` sample-wise. Samples where `right` is 0 are left
    /// alone.
    pub fn divide_image(&mut self, right: &Spectrogram) -> bool {
        self.zip_with(right, "divide", |a, b| (b != 0.0).then(|| a / b))
    }

    /// Add the square of `right`.
    pub fn add_squared(&mut self, right: &Spectrogram) -> bool {
        self.zip_with(right, "add squares", |a, b| Some(a + b * b))
    }

    /// Turn a sum of squares of `n` images into an RMS, given their mean
    /// `mean`.
    pub fn rms_from_sum_of_squares(&mut self, n: usize, mean: &Spectrogram) -> bool {
        let n = n as f64;
        self.zip_with(mean, "calculate RMS", |sum2, m| {
            Some((sum2 / n - m * m).sqrt())
        })
    }

    /// a² + b², with this image the real parts and `right` the imaginary
    /// parts.
    pub fn complex_magnitude(&mut self, right: &Spectrogram) -> bool {
        self.zip_with(right, "calculate magnitudes", |a, b| Some(a * a + b * b))
    }

    /// (a + b) * `multiplier`
    pub fn add_images(&mut self, right: &Spectrogram, multiplier: f64) -> bool {
        self.zip_with(right, "add", |a, b| Some((a + b) * multiplier))
    }

    /// The SEFD from the XX (this image) and YY (`right`) polarisations.
    pub fn sefd_from_xx_yy(&mut self, right: &Spectrogram) -> bool {
        self.zip_with(right, "combine polarisations", |xx, yy| {
            Some(0.5 * (xx * xx + yy * yy).sqrt())
        })
    }

    /// Convert SEFD to A/T.
    pub fn sefd_to_aot(&mut self) {
        self.map_samples(|sefd| 2.0 * 1380.0 / sefd);
    }

    /// Apply `op` to every sample. `value` is only used by operations that
    /// need one.
    pub fn apply(&mut self, op: UnaryOp, value: f64) {
        debug!("Applying {op} (value {value}) to {}x{}", self.width(), self.height());
        self.map_samples(|v| op.eval(v, value));
    }

    /// Divide every sample by `factor`.
    pub fn normalize(&mut self, factor: f64) {
        self.map_samples(|v| v / factor);
    }

    fn log_stats(&self, what: &str) {
        let s = self.stats();
        info!(
            "{what}: mean = {:.8}, rms = {:.8}, min = {:.8}, max = {:.8}",
            s.mean, s.rms, s.min, s.max
        );
    }

    /// The means along `axis` (`Axis(1)` averages each integration,
    /// `Axis(0)` each channel). `None` if that axis is empty.
    fn means(&self, axis: Axis) -> Option<Array1<f64>> {
        self.samples().mapv(f64::from).mean_axis(axis)
    }

    /// Divide every integration by its mean.
    pub fn normalize_rows(&mut self) {
        let Some(means) = self.means(Axis(1)) else {
            return;
        };
        for (y, mean) in means.iter().enumerate() {
            debug!("{y} {mean:.8}");
        }
        self.map_indexed_inplace(|(y, _), v| (f64::from(v) / means[y]) as f32);
        self.log_stats("Normalised integrations");
    }

    /// Divide every channel by its mean.
    pub fn normalize_columns(&mut self) {
        let Some(means) = self.means(Axis(0)) else {
            return;
        };
        for (x, mean) in means.iter().enumerate() {
            debug!("{x} {mean:.8}");
        }
        self.map_indexed_inplace(|(_, x), v| (f64::from(v) / means[x]) as f32);
        self.log_stats("Normalised channels");
    }

    /// Divide every integration by `spectrum`, channel by channel. Returns
    /// the number of channels, or 0 if `spectrum` is the wrong length.
    pub fn normalize_by_spectrum(&mut self, spectrum: &[f64]) -> usize {
        self.spectrum_op(spectrum, "normalise by", |v, s| v / s)
    }

    /// Subtract `spectrum` from every integration.
    pub fn subtract_spectrum(&mut self, spectrum: &[f64]) -> usize {
        self.spectrum_op(spectrum, "subtract", |v, s| v - s)
    }

    fn spectrum_op<F: Fn(f64, f64) -> f64>(&mut self, spectrum: &[f64], what: &str, f: F) -> usize {
        if spectrum.len() != self.width() {
            warn!(
                "Can't {what} a spectrum of {} channels; the image has {}",
                spectrum.len(),
                self.width()
            );
            return 0;
        }
        self.map_indexed_inplace(|(_, x), v| f(f64::from(v), spectrum[x]) as f32);
        self.width()
    }

    /// Subtract `column[y]` from every sample of integration `y`. Returns the
    /// number of integrations, or 0 if `column` is the wrong length.
    pub fn subtract_column(&mut self, column: &[f64]) -> usize {
        if column.len() != self.height() {
            warn!(
                "Can't subtract a column of {} integrations; the image has {}",
                column.len(),
                self.height()
            );
            return 0;
        }
        self.map_indexed_inplace(|(y, _), v| (f64::from(v) - column[y]) as f32);
        self.height()
    }

    /// Divide every integration by a `(freq_mhz, value)` spectrum. If it has
    /// one point per channel the points are used as they are, otherwise they
    /// are interpolated at each channel's frequency.
    pub fn divide_by_spectrum(&mut self, spectrum: &[(f64, f64)]) -> usize {
        let divisors: Vec<f64> = if spectrum.len() == self.width() {
            spectrum.iter().map(|&(_, v)| v).collect()
        } else {
            warn!(
                "Spectrum has {} points but the image has {} channels; interpolating",
                spectrum.len(),
                self.width()
            );
            let mut sorted = spectrum.to_vec();
            sorted.sort_unstable_by(|a, b| a.0.total_cmp(&b.0));
            (0..self.width())
                .map(|x| interpolate_linear(&sorted, self.channel_to_frequency(x)))
                .collect()
        };
        self.spectrum_op(&divisors, "divide by", |v, s| v / s)
    }

    /// The sum of all samples.
    pub fn sum(&self) -> f64 {
        self.samples().iter().map(|&v| f64::from(v)).sum()
    }

    /// Set samples with a magnitude above `limit` to 0. Returns how many were
    /// changed.
    pub fn zero_wrong_values(&mut self, limit: f64) -> usize {
        let mut n = 0;
        self.map_inplace(|v| {
            if f64::from(v).abs() > limit {
                n += 1;
                0.0
            } else {
                v
            }
        });
        n
    }

    /// Clamp every sample to `[min, max]`. Returns how many were changed.
    pub fn clamp_values(&mut self, min: f64, max: f64) -> usize {
        let mut n = 0;
        self.map_inplace(|v| {
            let v64 = f64::from(v);
            if v64 > max {
                n += 1;
                max as f32
            } else if v64 < min {
                n += 1;
                min as f32
            } else {
                v
            }
        });
        n
    }

    /// Write every sample, times `multiplier`, into `out` shifted by the
    /// truncated `(dx, dy)`. Samples shifted off the image are dropped.
    pub fn offset(&self, dx: f64, dy: f64, out: &mut Spectrogram, multiplier: f64) -> bool {
        if !self.same_size(out, "offset") {
            return false;
        }
        let src = self.samples();
        let (dx, dy) = (dx.trunc() as i64, dy.trunc() as i64);
        out.map_indexed_inplace(|(y, x), v| {
            let (sx, sy) = (x as i64 - dx, y as i64 - dy);
            if sx < 0 || sy < 0 {
                return v;
            }
            match src.get((sy as usize, sx as usize)) {
                Some(&s) => (f64::from(s) * multiplier) as f32,
                None => v,
            }
        });
        true
    }

    /// Replace each sample with the mean of `n_channels` neighbouring
    /// channels. The window is moved inward at the band edges so that it never
    /// leaves the image.
    pub fn average_channels(&self, n_channels: usize) -> Spectrogram<'static> {
        let src = self.samples();
        if n_channels == 0 {
            warn!("Can't average over 0 channels");
            return self.like_with(src.into_owned());
        }
        let width = self.width();
        let radius = n_channels / 2;
        let averaged = Array2::from_shape_fn(src.dim(), |(y, x)| {
            let start = x
                .saturating_sub(radius)
                .min(width.saturating_sub(n_channels));
            let end = (start + n_channels).min(width);
            let window = src.slice(s![y, start..end]);
            (window.mapv(f64::from).sum() / window.len() as f64) as f32
        });
        self.like_with(averaged)
    }

    /// A copy with channels and integrations swapped.
    pub fn transpose(&self) -> Spectrogram<'static> {
        let transposed = self.samples().t().as_standard_layout().into_owned();
        let mut out = Spectrogram::from_array(transposed);
        out.records = self.records.clone();
        out.calibration = self.calibration.clone();
        out.calibration.transposed = !self.calibration.transposed;
        out
    }

    /// Reverse the channel order in place.
    pub fn horizontal_flip(&mut self) {
        let flipped = self.samples().slice(s![.., ..;-1]).to_owned();
        self.assign(&flipped.view());
    }

    fn compare_rows<F: Fn(f64, f64) -> f64>(&self, y1: usize, y0: usize, f: F) -> Vec<RowComparison> {
        (0..self.width())
            .map(|x| {
                let (v1, v0) = (f64::from(self.get(x, y1)), f64::from(self.get(x, y0)));
                RowComparison {
                    channel: x,
                    value: f(v1, v0),
                    v1,
                    v0,
                    freq: self.channel_to_frequency(x),
                }
            })
            .collect()
    }

    /// Integration `y1` minus integration `y0`, channel by channel.
    pub fn subtract_rows(&self, y1: usize, y0: usize) -> Vec<RowComparison> {
        self.compare_rows(y1, y0, |a, b| a - b)
    }

    /// Integration `y1` divided by integration `y0`, channel by channel.
    pub fn divide_rows(&self, y1: usize, y0: usize) -> Vec<RowComparison> {
        self.compare_rows(y1, y0, |a, b| a / b)
    }

    /// Fit a line to integration `y` between `min_freq` and `max_freq`
    /// \[MHz\]. The chi² uses the radiometer noise `v / sqrt(t * Δν)` as each
    /// sample's error.
    pub fn fit_line(&self, y: usize, min_freq: f64, max_freq: f64) -> Option<LineFit> {
        let (freqs, powers): (Vec<f64>, Vec<f64>) = (0..self.width())
            .map(|x| (self.channel_to_frequency(x), f64::from(self.get(x, y))))
            .filter(|&(f, v)| min_freq <= f && f <= max_freq && v.is_finite())
            .unzip();
        let mut fit = fit_line(&freqs, &powers)?;

        let noise_scale = (self.calibration.integration_time * self.channel_width()).sqrt();
        fit.chi2 = freqs
            .iter()
            .zip(&powers)
            .map(|(&f, &v)| {
                let diff = fit.eval(f) - v;
                let err = v / noise_scale;
                (diff / err).powi(2)
            })
            .sum();
        debug!(
            "Line fit to integration {y} over {min_freq}-{max_freq} MHz: {} * f + {}, chi2 = {}",
            fit.slope, fit.intercept, fit.chi2
        );
        Some(fit)
    }
}
