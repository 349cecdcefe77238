// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

/*!
Useful constants.

Frequencies are in MHz and times are in seconds unless stated otherwise.
 */

/// The value written into a sample that an RFI mask marks as contaminated.
pub const RFI_SENTINEL: f32 = -1000.0;

/// The number of channels produced by the spectrometer in its usual mode.
pub const TYPICAL_NUM_CHANNELS: usize = 4096;

/// The number of integrations in a typical spectrometer file.
pub const TYPICAL_NUM_INTEGRATIONS: usize = 200;

/// Start frequency assumed before any header has been read \[MHz\].
pub const DEFAULT_START_FREQ_MHZ: f64 = 0.0;

/// Stop frequency assumed before any header has been read \[MHz\].
pub const DEFAULT_STOP_FREQ_MHZ: f64 = 480.0;

/// Channel width assumed before any header has been read \[MHz\].
pub const DEFAULT_DELTA_FREQ_MHZ: f64 = 480.0 / 4096.0;

/// Dividing an inter-quartile range by this gives the equivalent Gaussian
/// sigma.
pub const IQR_TO_SIGMA: f64 = 1.35;

/// Samples with an absolute value below this are considered to be zero when
/// counting non-zero samples.
pub const NON_ZERO_EPSILON: f64 = 1e-10;

/// Above this frequency the spectrometer is not calibrated and is suppressed
/// by the analogue filters, so it is ignored when looking for the single
/// brightest channel \[MHz\].
pub const DEFAULT_MAX_FREQUENCY_MHZ: f64 = 360.0;

/// The ORBCOMM satellite downlink band \[MHz\].
pub const ORBCOMM_BAND_MHZ: (f64, f64) = (137.1, 138.5);

/// The default number of local sigmas above the local median total power
/// before an integration is rejected.
pub const DEFAULT_LOCAL_CUT_SIGMAS: f64 = 3.0;

/// The default single-channel power ceiling \[dBm\]. This is high enough that
/// the criterion never triggers unless configured.
pub const DEFAULT_MAX_CHANNEL_POWER_DBM: f64 = 1e20;

/// Appended to a data file's base name to get the name of its RFI mask file.
pub const RFI_MASK_SUFFIX: &str = "_flag.fits";

/// Header keywords that describe the FITS image structure itself. These are
/// produced by the FITS library and are never copied between files.
pub const STRUCTURAL_KEYWORDS: [&str; 6] = ["SIMPLE", "BITPIX", "NAXIS", "NAXIS1", "NAXIS2", "EXTEND"];

/// Files with a DTIME-FS inside this window (Unix seconds) were recorded while
/// the data-acquisition clock was known to be wrong.
pub const BAD_CLOCK_WINDOW: (i64, i64) = (1349049600, 1352160000);

/// The Unix time the bad-clock offset was measured at.
pub const BAD_CLOCK_REFERENCE: i64 = 1351753823;

/// The measured clock offset at [`BAD_CLOCK_REFERENCE`] \[s\].
pub const BAD_CLOCK_OFFSET: f64 = 711.0;

/// How much the bad clock drifted per day \[s\].
pub const BAD_CLOCK_DRIFT_PER_DAY: f64 = 21.5;

/// Seconds in a day.
pub const SECONDS_PER_DAY: i64 = 86400;
