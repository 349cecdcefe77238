// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Errors associated with reading and writing spectrogram FITS files.

use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::spectrogram::SpectrogramError;

#[derive(Error, Debug)]
pub enum FitsError {
    /// Error when opening a fits file.
    #[error(
        "{source_file}:{source_line}:{source_column}: Couldn't open {fits_filename:?}: {fits_error}"
    )]
    Open {
        fits_error: Box<fitsio::errors::Error>,
        fits_filename: Box<Path>,
        source_file: &'static str,
        source_line: u32,
        source_column: u32,
    },

    /// Error describing a HDU that couldn't be used as an image (e.g. `HduInfo::ImageInfo`).
    #[error("{source_file}:{source_line}:{source_column}: {fits_filename:?} HDU {hdu_num}: Tried to use as an image, but not an image")]
    NotImage {
        fits_filename: Box<Path>,
        hdu_num: usize,
        source_file: &'static str,
        source_line: u32,
        source_column: u32,
    },

    /// A generic error associated with the fitsio crate.
    #[error(
        "{source_file}:{source_line}:{source_column}: {fits_filename:?} HDU '{hdu_description}': {fits_error}"
    )]
    Fitsio {
        fits_error: Box<fitsio::errors::Error>,
        fits_filename: Box<Path>,
        hdu_description: Box<str>,
        source_file: &'static str,
        source_line: u32,
        source_column: u32,
    },

    /// A header string that can't be handed to cfitsio.
    #[error("{source_file}:{source_line}:{source_column}: Couldn't write '{key}' into {fits_filename:?} HDU {hdu_num}: it contains a NUL byte")]
    Parse {
        key: Box<str>,
        fits_filename: Box<Path>,
        hdu_num: usize,
        source_file: &'static str,
        source_line: u32,
        source_column: u32,
    },

    #[error(transparent)]
    IO(#[from] std::io::Error),
}

#[derive(Error, Debug)]
pub enum SpectrogramReadError {
    #[error("{file:?} has {naxis} axes; only 1D and 2D images are spectrograms")]
    Dimensions { file: PathBuf, naxis: usize },

    #[error(transparent)]
    Spectrogram(#[from] SpectrogramError),

    #[error(transparent)]
    Fits(#[from] FitsError),
}

#[derive(Error, Debug)]
pub enum SpectrogramWriteError {
    #[error("Can't write an empty {width}x{height} spectrogram to {file:?}")]
    Empty {
        file: PathBuf,
        width: usize,
        height: usize,
    },

    #[error(transparent)]
    Fits(#[from] FitsError),

    #[error(transparent)]
    IO(#[from] std::io::Error),
}
