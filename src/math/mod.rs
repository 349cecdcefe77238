// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Some helper mathematics.


/// Convert a power in mW into dBm.
///
/// # Examples
///
/// `assert_abs_diff_eq!(mw_to_dbm(1000.0), 30.0);`
#[inline]
pub fn mw_to_dbm(mw: f64) -> f64 {
    10.0 * mw.log10()
}

/// Convert a power in dBm into mW.
#[inline]
pub fn dbm_to_mw(dbm: f64) -> f64 {
    10.0_f64.powf(dbm / 10.0)
}

/// Linearly interpolate `y` at `x` from points sorted by `x`. Outside the
/// table, the nearest end value is used. An empty table gives NaN.
pub fn interpolate_linear(table: &[(f64, f64)], x: f64) -> f64 {
    let (first, last) = match (table.first(), table.last()) {
        (Some(f), Some(l)) => (f, l),
        _ => return f64::NAN,
    };
    if x <= first.0 {
        return first.1;
    }
    if x >= last.0 {
        return last.1;
    }
    // The first point at or beyond x; it can't be the first point.
    let i = table.partition_point(|&(tx, _)| tx < x);
    let (x0, y0) = table[i - 1];
    let (x1, y1) = table[i];
    if x1 == x0 {
        return y1;
    }
    y0 + (y1 - y0) * (x - x0) / (x1 - x0)
}

/// The result of fitting a straight line.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LineFit {
    pub slope: f64,
    pub intercept: f64,

    /// Sum of squared normalised residuals. Only meaningful when the caller
    /// knows the per-point errors; [`fit_line`] leaves it at 0.
    pub chi2: f64,
}

impl LineFit {
    #[inline]
    pub fn eval(&self, x: f64) -> f64 {
        self.slope * x + self.intercept
    }
}

/// Ordinary least-squares fit of `y = slope * x + intercept`. At least two
/// distinct `x` values are needed.
pub fn fit_line(x: &[f64], y: &[f64]) -> Option<LineFit> {
    let n = x.len().min(y.len());
    if n < 2 {
        return None;
    }
    let nf = n as f64;
    let mean_x = x[..n].iter().sum::<f64>() / nf;
    let mean_y = y[..n].iter().sum::<f64>() / nf;
    let (sxx, sxy) = x[..n]
        .iter()
        .zip(&y[..n])
        .fold((0.0, 0.0), |(sxx, sxy), (&xi, &yi)| {
            let dx = xi - mean_x;
            (sxx + dx * dx, sxy + dx * (yi - mean_y))
        });
    if sxx == 0.0 {
        return None;
    }
    let slope = sxy / sxx;
    Some(LineFit {
        slope,
        intercept: mean_y - slope * mean_x,
        chi2: 0.0,
    })
}

/// Mean and RMS (standard deviation about the mean) from running sums.
/// Tiny negative variances from rounding are clamped to 0.
#[inline]
pub(crate) fn mean_and_rms(sum: f64, sum2: f64, count: usize) -> (f64, f64) {
    let n = count as f64;
    let mean = sum / n;
    let variance = sum2 / n - mean * mean;
    (mean, variance.max(0.0).sqrt())
}
