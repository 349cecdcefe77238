// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Spectrogram FITS input and output.

mod error;
mod fits;
mod read;
mod write;

#[cfg(test)]
mod tests;

pub use error::{FitsError, SpectrogramReadError, SpectrogramWriteError};
pub use read::{read_fits_header, read_spectrogram, ReadOptions};
pub use write::{write_byte_mask, write_spectrogram};
