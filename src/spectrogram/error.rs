// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Errors associated with building or writing into a spectrogram.

use thiserror::Error;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum SpectrogramError {
    #[error("Integration {row} is beyond the spectrogram height ({height})")]
    RowOutOfRange { row: usize, height: usize },

    #[error("Expected a row of {expected} channels, but got {got}")]
    RowLength { expected: usize, got: usize },

    #[error("The supplied buffer has {got} samples, but {expected} are needed")]
    BufferSize { expected: usize, got: usize },
}
