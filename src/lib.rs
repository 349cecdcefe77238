// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

/*!
Calibration, statistics and RFI rejection for radio spectrometer dynamic
spectra (spectrograms of frequency channels against time integrations).
 */

pub mod arith;
mod cli;
pub mod constants;
pub mod io;
pub mod math;
pub mod metadata;
pub mod quality;
pub mod spectrogram;
pub mod states;
pub mod stats;
pub mod time;

// Re-exports.
pub use cli::{Dynspec, DynspecError};
pub use io::{read_spectrogram, write_byte_mask, write_spectrogram, ReadOptions};
pub use metadata::{Calibration, CalibrationOptions, HeaderRecord, HeaderRecords, KeyKind};
pub use quality::{RejectionConfig, RejectionOutcome, RejectionReasons};
pub use spectrogram::{ElementKind, Spectrogram, SpectrogramError};
pub use states::{IntegrationRange, IntegrationRanges, IntegrationType};
