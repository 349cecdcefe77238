// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Spectrometer response models, used to convert instrumental power into
//! physical units.

use serde::{Deserialize, Serialize};

use crate::math::{interpolate_linear, mw_to_dbm};

/// The frequency-dependent gain of a spectrometer. Instrumental power divided
/// by the gain is power in mW.
pub trait SpectrometerResponse {
    /// The gain at `freq_mhz`.
    fn gain(&self, freq_mhz: f64) -> f64;

    fn power_to_mw(&self, freq_mhz: f64, power: f64) -> f64 {
        power / self.gain(freq_mhz)
    }

    fn power_to_dbm(&self, freq_mhz: f64, power: f64) -> f64 {
        mw_to_dbm(self.power_to_mw(freq_mhz, power))
    }
}

/// The same gain at every frequency.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FlatResponse {
    pub gain: f64,
}

impl Default for FlatResponse {
    fn default() -> Self {
        FlatResponse { gain: 1.0 }
    }
}

impl SpectrometerResponse for FlatResponse {
    fn gain(&self, _freq_mhz: f64) -> f64 {
        self.gain
    }
}

/// A gain measured at a set of frequencies and linearly interpolated between
/// them. In a config file this is a list of `[freq_mhz, gain]` pairs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "Vec<(f64, f64)>", into = "Vec<(f64, f64)>")]
pub struct TabulatedResponse {
    points: Vec<(f64, f64)>,
}

impl TabulatedResponse {
    pub fn new(mut points: Vec<(f64, f64)>) -> TabulatedResponse {
        points.sort_unstable_by(|a, b| a.0.total_cmp(&b.0));
        TabulatedResponse { points }
    }

    pub fn points(&self) -> &[(f64, f64)] {
        &self.points
    }
}

impl From<Vec<(f64, f64)>> for TabulatedResponse {
    fn from(points: Vec<(f64, f64)>) -> Self {
        TabulatedResponse::new(points)
    }
}

impl From<TabulatedResponse> for Vec<(f64, f64)> {
    fn from(r: TabulatedResponse) -> Self {
        r.points
    }
}

impl SpectrometerResponse for TabulatedResponse {
    fn gain(&self, freq_mhz: f64) -> f64 {
        if self.points.is_empty() {
            return 1.0;
        }
        interpolate_linear(&self.points, freq_mhz)
    }
}
