// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Writing spectrograms to FITS files.

use std::path::Path;

use fitsio::{hdu::FitsHdu, images::ImageType, FitsFile};
use log::debug;

use super::{fits::*, SpectrogramWriteError};
use crate::{constants::STRUCTURAL_KEYWORDS, spectrogram::Spectrogram};

fn prepare_file(path: &Path, spectrogram: &Spectrogram) -> Result<(), SpectrogramWriteError> {
    if spectrogram.width() == 0 || spectrogram.height() == 0 {
        return Err(SpectrogramWriteError::Empty {
            file: path.to_path_buf(),
            width: spectrogram.width(),
            height: spectrogram.height(),
        });
    }
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    Ok(())
}

/// Keywords that cfitsio manages itself are not copied.
fn write_records(
    fptr: &mut FitsFile,
    hdu: &FitsHdu,
    spectrogram: &Spectrogram,
) -> Result<(), SpectrogramWriteError> {
    let records = spectrogram.records_for_writing();
    fits_write_records(
        fptr,
        hdu,
        records
            .iter()
            .filter(|r| !STRUCTURAL_KEYWORDS.contains(&r.keyword.as_str())),
    )?;
    Ok(())
}

/// Write a spectrogram as a 32-bit float image, followed by its header
/// records.
pub fn write_spectrogram<P: AsRef<Path>>(
    path: P,
    spectrogram: &Spectrogram,
) -> Result<(), SpectrogramWriteError> {
    let path = path.as_ref();
    prepare_file(path, spectrogram)?;
    let mut fptr = fits_create_image(
        path,
        ImageType::Float,
        spectrogram.width(),
        spectrogram.height(),
    )?;
    let hdu = fits_open_hdu(&mut fptr, 0)?;
    fits_write_image(&mut fptr, &hdu, &spectrogram.to_vec())?;

    write_records(&mut fptr, &hdu, spectrogram)?;
    debug!(
        "Wrote {}x{} spectrogram to {}",
        spectrogram.width(),
        spectrogram.height(),
        path.display()
    );
    Ok(())
}

/// Write a mask as an 8-bit image: 1 where the sample is positive, 0
/// elsewhere. Header records are written as with [`write_spectrogram`].
pub fn write_byte_mask<P: AsRef<Path>>(
    path: P,
    mask: &Spectrogram,
) -> Result<(), SpectrogramWriteError> {
    let path = path.as_ref();
    prepare_file(path, mask)?;
    let data: Vec<u8> = mask
        .to_vec()
        .into_iter()
        .map(|v| u8::from(v > 0.0))
        .collect();
    let mut fptr = fits_create_image(path, ImageType::UnsignedByte, mask.width(), mask.height())?;
    let hdu = fits_open_hdu(&mut fptr, 0)?;
    fits_write_image(&mut fptr, &hdu, &data)?;
    write_records(&mut fptr, &hdu, mask)?;
    debug!("Wrote byte mask to {}", path.display());
    Ok(())
}
