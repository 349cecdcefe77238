// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Error type for all dynspec-related errors. This should be the *only* error
//! enum that is publicly visible from the binary.

use thiserror::Error;

use crate::{
    io::{FitsError, SpectrogramReadError, SpectrogramWriteError},
    quality::RejectionConfigError,
};

/// The *only* publicly visible error from the dynspec binary.
#[derive(Error, Debug)]
pub enum DynspecError {
    /// An error related to reading a dynamic spectrum.
    #[error("{0}")]
    Read(String),

    /// An error related to writing a dynamic spectrum.
    #[error("{0}")]
    Write(String),

    /// An error related to rejection config files.
    #[error("{0}\n\nConfig files are toml or json; see the RejectionConfig documentation for the fields.")]
    Config(String),

    /// A cfitsio error. Because these are usually quite spartan, some
    /// suggestions are provided here.
    #[error("cfitsio error: {0}\n\nIf you don't know what this means, try turning up verbosity (-v or -vv).")]
    Cfitsio(String),

    /// Bad command-line input that clap can't catch.
    #[error("{0}")]
    Args(String),

    /// A generic error that can't be clarified further, e.g. IO errors.
    #[error("{0}")]
    Generic(String),
}

// When changing the error propagation below, ensure `Self::from(e)` uses the
// correct `e`!

impl From<FitsError> for DynspecError {
    fn from(e: FitsError) -> Self {
        match e {
            FitsError::IO(e) => Self::from(e),
            _ => Self::Cfitsio(e.to_string()),
        }
    }
}

impl From<SpectrogramReadError> for DynspecError {
    fn from(e: SpectrogramReadError) -> Self {
        match e {
            SpectrogramReadError::Fits(e) => Self::from(e),
            SpectrogramReadError::Dimensions { .. } | SpectrogramReadError::Spectrogram(_) => {
                Self::Read(e.to_string())
            }
        }
    }
}

impl From<SpectrogramWriteError> for DynspecError {
    fn from(e: SpectrogramWriteError) -> Self {
        match e {
            SpectrogramWriteError::Fits(e) => Self::from(e),
            SpectrogramWriteError::IO(e) => Self::from(e),
            SpectrogramWriteError::Empty { .. } => Self::Write(e.to_string()),
        }
    }
}

impl From<RejectionConfigError> for DynspecError {
    fn from(e: RejectionConfigError) -> Self {
        match e {
            RejectionConfigError::IO(e) => Self::from(e),
            _ => Self::Config(e.to_string()),
        }
    }
}

impl From<std::io::Error> for DynspecError {
    fn from(e: std::io::Error) -> Self {
        Self::Generic(e.to_string())
    }
}
