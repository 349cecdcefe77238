// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Accepting or rejecting integrations against several independent power
//! criteria.

use std::{
    fs::File,
    io::Read,
    ops::{BitOr, BitOrAssign},
    path::Path,
    str::FromStr,
};

use itertools::Itertools;
use log::{debug, trace};
use serde::{Deserialize, Serialize};
use strum::IntoEnumIterator;
use strum_macros::{Display, EnumIter, EnumString};

use super::{
    error::RejectionConfigError,
    response::{FlatResponse, SpectrometerResponse, TabulatedResponse},
};
use crate::{
    constants::{
        DEFAULT_LOCAL_CUT_SIGMAS, DEFAULT_MAX_CHANNEL_POWER_DBM, DEFAULT_MAX_FREQUENCY_MHZ,
        ORBCOMM_BAND_MHZ,
    },
    math::interpolate_linear,
    spectrogram::Spectrogram,
};

/// A ceiling on the total power of integrations starting inside
/// `[start, end)` (Unix seconds).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TotalPowerLimit {
    pub start: f64,
    pub end: f64,
    pub max_total_power: f64,
}

/// A ceiling on the total power between two frequencies \[MHz\].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BandCut {
    pub start_mhz: f64,
    pub end_mhz: f64,
    pub max_total_power: f64,
}

/// One sample of the externally computed running median and sigma of the
/// total power.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LocalMedianSigma {
    pub unix_time: f64,
    pub median: f64,
    pub sigma: f64,
}

/// Thresholds for [`Spectrogram::check_integration`]. Every list may be
/// empty, in which case its criterion never rejects.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RejectionConfig {
    /// Time-dependent ceilings on the total power. The first window
    /// containing an integration's time is used.
    pub total_power_limits: Vec<TotalPowerLimit>,

    /// Ceilings on the total power inside frequency bands.
    pub band_cuts: Vec<BandCut>,

    /// Ceiling on the power of the brightest channel, also used for the total
    /// power in the interference band \[dBm\].
    pub max_channel_power_dbm: f64,

    /// The running median and sigma of the total power, sorted by time.
    pub local_median_sigma: Vec<LocalMedianSigma>,

    /// How many local sigmas above the local median the total power may be.
    pub local_cut_sigmas: f64,

    /// Channels above this frequency are not searched for the brightest
    /// channel \[MHz\].
    pub max_frequency_mhz: f64,

    /// The band of a known, strong interferer \[MHz\].
    pub interference_band_mhz: (f64, f64),

    /// 1-based integration numbers that have been flagged by hand.
    pub flagged_integrations: Vec<usize>,

    /// The spectrometer response. Without one, the response is flat.
    pub response: Option<TabulatedResponse>,
}

impl Default for RejectionConfig {
    fn default() -> Self {
        RejectionConfig {
            total_power_limits: vec![],
            band_cuts: vec![],
            max_channel_power_dbm: DEFAULT_MAX_CHANNEL_POWER_DBM,
            local_median_sigma: vec![],
            local_cut_sigmas: DEFAULT_LOCAL_CUT_SIGMAS,
            max_frequency_mhz: DEFAULT_MAX_FREQUENCY_MHZ,
            interference_band_mhz: ORBCOMM_BAND_MHZ,
            flagged_integrations: vec![],
            response: None,
        }
    }
}

#[derive(Debug, Display, EnumIter, EnumString)]
enum ConfigFileType {
    #[strum(serialize = "toml")]
    Toml,
    #[strum(serialize = "json")]
    Json,
}

impl RejectionConfig {
    /// Read a config from a toml or json file. The format is chosen by the
    /// file extension.
    pub fn from_file<P: AsRef<Path>>(file: P) -> Result<RejectionConfig, RejectionConfigError> {
        let file = file.as_ref();
        debug!("Attempting to parse rejection config {}", file.display());

        let file_type = file
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_lowercase())
            .and_then(|e| ConfigFileType::from_str(&e).ok());

        let mut contents = String::new();
        let config: RejectionConfig = match file_type {
            Some(ConfigFileType::Toml) => {
                File::open(file)?.read_to_string(&mut contents)?;
                toml::from_str(&contents).map_err(|err| RejectionConfigError::Toml {
                    file: file.to_path_buf(),
                    err,
                })?
            }
            Some(ConfigFileType::Json) => {
                File::open(file)?.read_to_string(&mut contents)?;
                serde_json::from_str(&contents).map_err(|err| RejectionConfigError::Json {
                    file: file.to_path_buf(),
                    err,
                })?
            }
            None => {
                return Err(RejectionConfigError::UnknownExtension {
                    file: file.to_path_buf(),
                    valid: ConfigFileType::iter().join(", "),
                })
            }
        };
        config.validate()?;
        Ok(config)
    }

    /// Check that the bands and windows are the right way around.
    pub fn validate(&self) -> Result<(), RejectionConfigError> {
        for c in &self.band_cuts {
            if c.start_mhz >= c.end_mhz {
                return Err(RejectionConfigError::BadBandCut {
                    start_mhz: c.start_mhz,
                    end_mhz: c.end_mhz,
                });
            }
        }
        for l in &self.total_power_limits {
            if l.start >= l.end {
                return Err(RejectionConfigError::BadTimeWindow {
                    start: l.start,
                    end: l.end,
                });
            }
        }
        Ok(())
    }

    /// The total-power ceiling at `unix_time`, if any window covers it.
    pub fn total_power_limit(&self, unix_time: f64) -> Option<f64> {
        self.total_power_limits
            .iter()
            .find(|l| l.start <= unix_time && unix_time < l.end)
            .map(|l| l.max_total_power)
    }

    /// The local median and sigma interpolated at `unix_time`.
    pub fn local_median_sigma_at(&self, unix_time: f64) -> Option<(f64, f64)> {
        if self.local_median_sigma.is_empty() {
            return None;
        }
        let medians: Vec<(f64, f64)> = self
            .local_median_sigma
            .iter()
            .map(|s| (s.unix_time, s.median))
            .collect();
        let sigmas: Vec<(f64, f64)> = self
            .local_median_sigma
            .iter()
            .map(|s| (s.unix_time, s.sigma))
            .collect();
        Some((
            interpolate_linear(&medians, unix_time),
            interpolate_linear(&sigmas, unix_time),
        ))
    }

    fn response(&self) -> Option<&dyn SpectrometerResponse> {
        self.response
            .as_ref()
            .map(|r| r as &dyn SpectrometerResponse)
    }
}

/// Why an integration was rejected, as a bitmask.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct RejectionReasons(u8);

impl RejectionReasons {
    /// The total power was above its time-dependent ceiling.
    pub const TOTAL_POWER: RejectionReasons = RejectionReasons(0x01);
    /// The brightest channel was above the channel-power ceiling.
    pub const CHANNEL_POWER: RejectionReasons = RejectionReasons(0x02);
    /// The total power in the interference band was above the channel-power
    /// ceiling.
    pub const INTERFERENCE_POWER: RejectionReasons = RejectionReasons(0x04);
    /// The total power in at least one configured band was above its ceiling.
    pub const BAND_POWER: RejectionReasons = RejectionReasons(0x08);
    /// The total power was too far above the local median.
    pub const LOCAL_CUT: RejectionReasons = RejectionReasons(0x10);

    const NAMES: [(RejectionReasons, &'static str); 5] = [
        (Self::TOTAL_POWER, "TOTAL_POWER"),
        (Self::CHANNEL_POWER, "CHANNEL_POWER"),
        (Self::INTERFERENCE_POWER, "INTERFERENCE_POWER"),
        (Self::BAND_POWER, "BAND_POWER"),
        (Self::LOCAL_CUT, "LOCAL_CUT"),
    ];

    pub const fn empty() -> RejectionReasons {
        RejectionReasons(0)
    }

    pub const fn bits(self) -> u8 {
        self.0
    }

    pub const fn from_bits(bits: u8) -> RejectionReasons {
        RejectionReasons(bits & 0x1f)
    }

    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    pub const fn contains(self, other: RejectionReasons) -> bool {
        self.0 & other.0 == other.0
    }

    pub fn insert(&mut self, other: RejectionReasons) {
        self.0 |= other.0;
    }
}

impl BitOr for RejectionReasons {
    type Output = RejectionReasons;

    fn bitor(self, rhs: Self) -> Self::Output {
        RejectionReasons(self.0 | rhs.0)
    }
}

impl BitOrAssign for RejectionReasons {
    fn bitor_assign(&mut self, rhs: Self) {
        self.insert(rhs);
    }
}

impl std::fmt::Display for RejectionReasons {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.is_empty() {
            return write!(f, "OK");
        }
        let names = Self::NAMES
            .iter()
            .filter(|(r, _)| self.contains(*r))
            .map(|(_, n)| n)
            .join("|");
        write!(f, "{names}")
    }
}

/// The verdict on one integration, with the measurements behind it.
#[derive(Debug, Clone, PartialEq)]
pub struct RejectionOutcome {
    pub reasons: RejectionReasons,

    /// Total power over all channels (instrumental units).
    pub total_power: f64,

    /// Power of the brightest channel below the frequency cutoff \[dBm\].
    pub max_channel_power_dbm: f64,

    /// Frequency of the brightest channel \[MHz\].
    pub max_channel_freq: f64,

    /// The local total-power threshold, or -1 if it wasn't evaluated.
    pub local_threshold: f64,

    /// Total power in the interference band \[dBm\].
    pub interference_power_dbm: f64,

    /// Whether the integration was flagged by hand. This is reported but
    /// doesn't affect [`RejectionOutcome::accepted`].
    pub flagged: bool,
}

impl RejectionOutcome {
    pub fn accepted(&self) -> bool {
        self.reasons.is_empty()
    }
}

impl Spectrogram<'_> {
    /// Has integration `y` been flagged by hand, either in `config` or with a
    /// "FLAG" header keyword (any case) holding its 1-based number?
    pub fn is_flagged(&self, y: usize, config: &RejectionConfig) -> bool {
        let number = y + 1;
        if config.flagged_integrations.contains(&number) {
            return true;
        }
        self.records().iter().any(|r| {
            r.keyword.eq_ignore_ascii_case("flag") && r.value_i64() == Some(number as i64)
        })
    }

    /// Check integration `y` against every criterion in `config`.
    pub fn check_integration(&self, y: usize, config: &RejectionConfig) -> RejectionOutcome {
        let flat = FlatResponse::default();
        let response = config
            .response()
            .unwrap_or(&flat as &dyn SpectrometerResponse);

        let mut reasons = RejectionReasons::empty();
        let unix_time = self.row_unix_time(y);
        let total_power = self.total_power(y, 0, None);

        if let Some(limit) = config.total_power_limit(unix_time) {
            if limit > 0.0 && total_power > limit {
                reasons |= RejectionReasons::TOTAL_POWER;
            }
        }

        for cut in &config.band_cuts {
            if self.total_power_freq(y, cut.start_mhz, cut.end_mhz) > cut.max_total_power {
                reasons |= RejectionReasons::BAND_POWER;
            }
        }

        let max_channel = self
            .frequency_to_channel(config.max_frequency_mhz)
            .clamp(0, self.width() as i64) as usize;
        let max = self.max_power(y, 0, Some(max_channel));
        let max_channel_power_dbm = response.power_to_dbm(max.freq, max.power);
        if max_channel_power_dbm > config.max_channel_power_dbm {
            reasons |= RejectionReasons::CHANNEL_POWER;
        }

        let (band_start, band_end) = config.interference_band_mhz;
        let interference_power = self.total_power_freq(y, band_start, band_end);
        let interference_power_dbm =
            response.power_to_dbm((band_start + band_end) / 2.0, interference_power);
        if interference_power_dbm > config.max_channel_power_dbm {
            reasons |= RejectionReasons::INTERFERENCE_POWER;
        }

        let mut local_threshold = -1.0;
        if let Some((median, sigma)) = config.local_median_sigma_at(unix_time) {
            local_threshold = median + sigma * config.local_cut_sigmas;
            if total_power > local_threshold {
                reasons |= RejectionReasons::LOCAL_CUT;
            }
        }

        let flagged = self.is_flagged(y, config);
        trace!("Integration {y} at {unix_time:.3}: total power {total_power}, rejection {reasons}");

        RejectionOutcome {
            reasons,
            total_power,
            max_channel_power_dbm,
            max_channel_freq: max.freq,
            local_threshold,
            interference_power_dbm,
            flagged,
        }
    }

    /// [`Spectrogram::check_integration`] for every integration.
    pub fn check_all_integrations(&self, config: &RejectionConfig) -> Vec<RejectionOutcome> {
        (0..self.height())
            .map(|y| self.check_integration(y, config))
            .collect()
    }
}
