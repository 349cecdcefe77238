// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Data quality: RFI masks, spectrometer responses and the acceptance or
//! rejection of integrations.

mod error;
mod mask;
mod rejection;
mod response;
#[cfg(test)]
mod tests;

pub use error::RejectionConfigError;
pub use mask::{rfi_mask_path, MaskCache};
pub use rejection::{
    BandCut, LocalMedianSigma, RejectionConfig, RejectionOutcome, RejectionReasons,
    TotalPowerLimit,
};
pub use response::{FlatResponse, SpectrometerResponse, TabulatedResponse};
