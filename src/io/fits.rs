// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Helper functions for reading and writing FITS files.

use std::{
    ffi::{CStr, CString},
    fmt::Display,
    os::raw::c_char,
    path::Path,
};

use fitsio::{
    hdu::{DescribesHdu, FitsHdu, HduInfo},
    images::{ImageDescription, ImageType},
    FitsFile,
};

use super::FitsError;
use crate::metadata::{HeaderRecord, HeaderRecords, KeyKind};

/// Enough room for any keyword, value or comment of an 80-character card.
const CARD_BUFFER_LEN: usize = 81;

/// Open a fits file.
#[track_caller]
pub(crate) fn fits_open<P: AsRef<Path>>(file: P) -> Result<FitsFile, FitsError> {
    FitsFile::open(file.as_ref()).map_err(|e| {
        let caller = std::panic::Location::caller();
        FitsError::Open {
            fits_error: Box::new(e),
            fits_filename: file.as_ref().to_path_buf().into_boxed_path(),
            source_file: caller.file(),
            source_line: caller.line(),
            source_column: caller.column(),
        }
    })
}

/// Create a new fits file whose primary HDU is a 2D image of `width` x
/// `height`. An existing file is replaced.
#[track_caller]
pub(crate) fn fits_create_image<P: AsRef<Path>>(
    file: P,
    data_type: ImageType,
    width: usize,
    height: usize,
) -> Result<FitsFile, FitsError> {
    let file = file.as_ref();
    let caller = std::panic::Location::caller();
    let open_error = |e: fitsio::errors::Error| FitsError::Open {
        fits_error: Box::new(e),
        fits_filename: file.to_path_buf().into_boxed_path(),
        source_file: caller.file(),
        source_line: caller.line(),
        source_column: caller.column(),
    };

    if file.exists() {
        std::fs::remove_file(file)?;
    }
    let description = ImageDescription {
        data_type,
        dimensions: &[height, width],
    };
    FitsFile::create(file)
        .with_custom_primary(&description)
        .open()
        .map_err(open_error)
}

/// Open a fits file's HDU.
#[track_caller]
pub(crate) fn fits_open_hdu<T: DescribesHdu + Display + Copy>(
    fits_fptr: &mut FitsFile,
    hdu_description: T,
) -> Result<FitsHdu, FitsError> {
    fits_fptr.hdu(hdu_description).map_err(|e| {
        let caller = std::panic::Location::caller();
        FitsError::Fitsio {
            fits_error: Box::new(e),
            fits_filename: fits_fptr.file_path().to_path_buf().into_boxed_path(),
            hdu_description: format!("{hdu_description}").into_boxed_str(),
            source_file: caller.file(),
            source_line: caller.line(),
            source_column: caller.column(),
        }
    })
}

/// The shape of an image HDU, in the order `[NAXIS2, NAXIS1]`, and its data
/// type.
#[track_caller]
pub(crate) fn fits_get_image_info(
    fits_fptr: &FitsFile,
    hdu: &FitsHdu,
) -> Result<(Vec<usize>, ImageType), FitsError> {
    match &hdu.info {
        HduInfo::ImageInfo { shape, image_type } => Ok((shape.clone(), *image_type)),
        _ => {
            let caller = std::panic::Location::caller();
            Err(FitsError::NotImage {
                fits_filename: fits_fptr.file_path().to_path_buf().into_boxed_path(),
                hdu_num: hdu.number + 1,
                source_file: caller.file(),
                source_line: caller.line(),
                source_column: caller.column(),
            })
        }
    }
}

/// Given a FITS file pointer and a HDU, read the associated image.
#[track_caller]
pub(crate) fn fits_get_image<T: fitsio::images::ReadImage>(
    fits_fptr: &mut FitsFile,
    hdu: &FitsHdu,
) -> Result<T, FitsError> {
    fits_get_image_info(fits_fptr, hdu)?;
    hdu.read_image(fits_fptr).map_err(|e| {
        let caller = std::panic::Location::caller();
        FitsError::Fitsio {
            fits_error: Box::new(e),
            fits_filename: fits_fptr.file_path().to_path_buf().into_boxed_path(),
            hdu_description: format!("{}", hdu.number + 1).into_boxed_str(),
            source_file: caller.file(),
            source_line: caller.line(),
            source_column: caller.column(),
        }
    })
}

/// Given a FITS file pointer and a HDU, write the image.
#[track_caller]
pub(crate) fn fits_write_image<T: fitsio::images::WriteImage>(
    fits_fptr: &mut FitsFile,
    hdu: &FitsHdu,
    data: &[T],
) -> Result<(), FitsError> {
    fits_get_image_info(fits_fptr, hdu)?;
    hdu.write_image(fits_fptr, data).map_err(|e| {
        let caller = std::panic::Location::caller();
        FitsError::Fitsio {
            fits_error: Box::new(e),
            fits_filename: fits_fptr.file_path().to_path_buf().into_boxed_path(),
            hdu_description: format!("{}", hdu.number + 1).into_boxed_str(),
            source_file: caller.file(),
            source_line: caller.line(),
            source_column: caller.column(),
        }
    })
}

#[track_caller]
fn check_status(status: i32, fits_fptr: &FitsFile, hdu: &FitsHdu) -> Result<(), FitsError> {
    fitsio::errors::check_status(status).map_err(|e| {
        let caller = std::panic::Location::caller();
        FitsError::Fitsio {
            fits_error: Box::new(e),
            fits_filename: fits_fptr.file_path().to_path_buf().into_boxed_path(),
            hdu_description: format!("{}", hdu.number + 1).into_boxed_str(),
            source_file: caller.file(),
            source_line: caller.line(),
            source_column: caller.column(),
        }
    })
}

#[track_caller]
fn to_c_string(s: &str, fits_fptr: &FitsFile, hdu: &FitsHdu) -> Result<CString, FitsError> {
    CString::new(s).map_err(|_| {
        let caller = std::panic::Location::caller();
        FitsError::Parse {
            key: s.to_string().into_boxed_str(),
            fits_filename: fits_fptr.file_path().to_path_buf().into_boxed_path(),
            hdu_num: hdu.number + 1,
            source_file: caller.file(),
            source_line: caller.line(),
            source_column: caller.column(),
        }
    })
}

fn buffer_to_string(buffer: &[c_char]) -> String {
    // The buffers are zero-initialised and one longer than cfitsio ever fills,
    // so there is always a terminator.
    unsafe { CStr::from_ptr(buffer.as_ptr()) }
        .to_string_lossy()
        .into_owned()
}

/// Remove the quotes around a FITS string value, along with the trailing
/// padding inside them.
fn unquote(value: &str) -> String {
    let v = value.trim();
    match v.strip_prefix('\'').and_then(|v| v.strip_suffix('\'')) {
        Some(inner) => inner.trim_end().replace("''", "'"),
        None => v.to_string(),
    }
}

/// Read every valued header record of the current HDU, in order. Records
/// without a value (e.g. `COMMENT` and `HISTORY`) are skipped.
#[track_caller]
pub(crate) fn fits_read_records(
    fits_fptr: &mut FitsFile,
    hdu: &FitsHdu,
) -> Result<HeaderRecords, FitsError> {
    let mut status = 0;
    let mut num_keys = 0;
    let mut num_more = 0;
    unsafe {
        // ffghsp = fits_get_hdrspace
        fitsio_sys::ffghsp(
            fits_fptr.as_raw(), /* I - FITS file pointer                     */
            &mut num_keys,      /* O - number of existing keywords in header */
            &mut num_more,      /* O - how many more keywords will fit       */
            &mut status,        /* IO - error status                         */
        );
    }
    check_status(status, fits_fptr, hdu)?;

    let mut records = HeaderRecords::new();
    for n in 1..=num_keys {
        let mut keyword = [0 as c_char; CARD_BUFFER_LEN];
        let mut value = [0 as c_char; CARD_BUFFER_LEN];
        let mut comment = [0 as c_char; CARD_BUFFER_LEN];
        unsafe {
            // ffgkyn = fits_read_keyn
            fitsio_sys::ffgkyn(
                fits_fptr.as_raw(),   /* I - FITS file pointer     */
                n,                    /* I - number of the keyword */
                keyword.as_mut_ptr(), /* O - keyword name          */
                value.as_mut_ptr(),   /* O - keyword value         */
                comment.as_mut_ptr(), /* O - keyword comment       */
                &mut status,          /* IO - error status         */
            );
        }
        check_status(status, fits_fptr, hdu)?;

        let raw_value = buffer_to_string(&value);
        if raw_value.trim().is_empty() {
            continue;
        }
        let mut dtype: c_char = 0;
        unsafe {
            // ffdtyp = fits_get_keytype
            fitsio_sys::ffdtyp(value.as_ptr(), &mut dtype, &mut status);
        }
        // An unparseable value is kept as a string.
        let kind = if status == 0 {
            KeyKind::from_code(dtype as u8 as char)
        } else {
            status = 0;
            KeyKind::String
        };

        records.push(
            HeaderRecord::new(buffer_to_string(&keyword), unquote(&raw_value), kind)
                .with_comment(buffer_to_string(&comment)),
        );
    }
    Ok(records)
}

/// Write header records into the current HDU, typed by their kinds. A value
/// that doesn't parse as its kind is written as a string.
#[track_caller]
pub(crate) fn fits_write_records<'a, I>(
    fits_fptr: &mut FitsFile,
    hdu: &FitsHdu,
    records: I,
) -> Result<(), FitsError>
where
    I: IntoIterator<Item = &'a HeaderRecord>,
{
    let mut status = 0;
    for r in records {
        let keyword = to_c_string(&r.keyword, fits_fptr, hdu)?;
        let comment = to_c_string(&r.comment, fits_fptr, hdu)?;
        match (r.kind, r.value_i64(), r.value_f64()) {
            (KeyKind::Integer, Some(v), _) => unsafe {
                // ffpkyj = fits_write_key_lng
                fitsio_sys::ffpkyj(
                    fits_fptr.as_raw(), /* I - FITS file pointer        */
                    keyword.as_ptr(),   /* I - name of keyword to write */
                    v,                  /* I - keyword value            */
                    comment.as_ptr(),   /* I - keyword comment          */
                    &mut status,        /* IO - error status            */
                );
            },
            (KeyKind::Float, _, Some(v)) => unsafe {
                // ffpkyd = fits_write_key_dbl
                fitsio_sys::ffpkyd(
                    fits_fptr.as_raw(), /* I - FITS file pointer          */
                    keyword.as_ptr(),   /* I - name of keyword to write   */
                    v,                  /* I - keyword value              */
                    -15,                /* I - number of decimal places   */
                    comment.as_ptr(),   /* I - keyword comment            */
                    &mut status,        /* IO - error status              */
                );
            },
            _ => {
                let value = to_c_string(&r.value, fits_fptr, hdu)?;
                unsafe {
                    // ffpkys = fits_write_key_str
                    fitsio_sys::ffpkys(
                        fits_fptr.as_raw(), /* I - FITS file pointer        */
                        keyword.as_ptr(),   /* I - name of keyword to write */
                        value.as_ptr(),     /* I - keyword value            */
                        comment.as_ptr(),   /* I - keyword comment          */
                        &mut status,        /* IO - error status            */
                    );
                }
            }
        }
        check_status(status, fits_fptr, hdu)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::unquote;

    #[test]
    fn test_unquote() {
        assert_eq!(unquote("'ANT     '"), "ANT");
        assert_eq!(unquote("'1 - 100'"), "1 - 100");
        assert_eq!(unquote("'it''s'"), "it's");
        assert_eq!(unquote("  42 "), "42");
        assert_eq!(unquote("''"), "");
    }
}
