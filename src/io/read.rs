// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Reading spectrograms from FITS files.

use std::path::Path;

use fitsio::images::ImageType;
use log::{debug, trace};

use super::{fits::*, SpectrogramReadError};
use crate::{
    metadata::{CalibrationOptions, HeaderRecords},
    spectrogram::Spectrogram,
};

/// How a FITS image should be read.
#[derive(Debug, Clone, Copy, Default)]
pub struct ReadOptions {
    /// Keep byte images (BITPIX = 8) as one byte per sample.
    pub auto_detect_bytes: bool,

    /// Don't warn about missing header information.
    pub quiet: bool,

    /// Frequency is on the vertical axis.
    pub transposed: bool,

    /// Correct times recorded with the known-bad DAQ clock.
    pub fix_bad_clock: bool,
}

/// Read the primary image of a FITS file, along with its header. A 1D image
/// becomes a single integration.
pub fn read_spectrogram<P: AsRef<Path>>(
    file: P,
    options: &ReadOptions,
) -> Result<Spectrogram<'static>, SpectrogramReadError> {
    let file = file.as_ref();
    debug!("Reading spectrogram from {}", file.display());
    let mut fptr = fits_open(file)?;
    let hdu = fits_open_hdu(&mut fptr, 0)?;
    let (shape, image_type) = fits_get_image_info(&fptr, &hdu)?;
    let (width, height) = match shape.as_slice() {
        [w] => (*w, 1),
        [h, w] => (*w, *h),
        _ => {
            return Err(SpectrogramReadError::Dimensions {
                file: file.to_path_buf(),
                naxis: shape.len(),
            })
        }
    };
    debug!("{} is {width}x{height} ({image_type:?})", file.display());

    let is_byte_image = matches!(image_type, ImageType::UnsignedByte | ImageType::Byte);
    let mut spectrogram = if options.auto_detect_bytes && is_byte_image {
        let data: Vec<u8> = fits_get_image(&mut fptr, &hdu)?;
        Spectrogram::from_bytes(width, height, data)?
    } else {
        let data: Vec<f32> = fits_get_image(&mut fptr, &hdu)?;
        Spectrogram::from_vec(width, height, data)?
    };

    let records = fits_read_records(&mut fptr, &hdu)?;
    for r in &records {
        trace!("{:<8} = {} / {}", r.keyword, r.value, r.comment);
    }
    spectrogram.set_file_name(file);
    spectrogram.set_records(
        records,
        &CalibrationOptions {
            transposed: options.transposed,
            fix_bad_clock: options.fix_bad_clock,
            quiet: options.quiet,
        },
    );
    Ok(spectrogram)
}

/// Read only the header records of a FITS file's primary HDU.
pub fn read_fits_header<P: AsRef<Path>>(file: P) -> Result<HeaderRecords, SpectrogramReadError> {
    let mut fptr = fits_open(file.as_ref())?;
    let hdu = fits_open_hdu(&mut fptr, 0)?;
    Ok(fits_read_records(&mut fptr, &hdu)?)
}
