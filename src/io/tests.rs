// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

use approx::assert_abs_diff_eq;
use fitsio::{
    images::{ImageDescription, ImageType},
    FitsFile,
};
use tempfile::tempdir;

use super::*;
use crate::{
    constants::STRUCTURAL_KEYWORDS,
    metadata::KeyKind,
    spectrogram::{ElementKind, Spectrogram},
    states::IntegrationType,
};

fn observation() -> Spectrogram<'static> {
    let mut s = Spectrogram::from_vec(3, 2, vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0]).unwrap();
    s.prepare_header(1_400_000_000.25, 0.5, 100.0, 10.0, false);
    s.set_keyword("STATES", "ANT,REF");
    s.set_keyword("ANT0", "1 - 1");
    s.set_keyword("REF0", "2 - 2");
    s
}

#[test]
fn test_round_trip() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("obs.fits");
    write_spectrogram(&path, &observation()).unwrap();

    let s = read_spectrogram(&path, &ReadOptions::default()).unwrap();
    assert_eq!((s.width(), s.height()), (3, 2));
    assert_eq!(s.element_kind(), ElementKind::Float);
    assert_eq!(s.to_vec(), vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);
    assert_eq!(s.file_name(), Some(path.as_path()));

    let c = &s.calibration;
    assert_abs_diff_eq!(c.start_freq, 100.0);
    assert_abs_diff_eq!(c.stop_freq, 120.0);
    assert_abs_diff_eq!(c.integration_time, 0.5);
    assert_eq!(c.epoch_seconds, 1_400_000_000);
    assert_eq!(c.epoch_microseconds, 250_000);
    assert!(!c.transposed);

    let ranges = s.integration_ranges();
    assert_eq!(ranges.len(), 2);
    assert_eq!(s.integration_type(0), IntegrationType::Antenna);
    assert_eq!(s.integration_type(1), IntegrationType::Reference);
}

#[test]
fn test_header_order_and_kinds_survive() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("obs.fits");
    write_spectrogram(&path, &observation()).unwrap();

    let records = read_fits_header(&path).unwrap();
    let keywords: Vec<&str> = records
        .iter()
        .map(|r| r.keyword.as_str())
        .filter(|k| !STRUCTURAL_KEYWORDS.contains(k))
        .collect();
    assert_eq!(
        &keywords[..5],
        &["DTIME-FS", "DTIME-FU", "DATE", "INTTIME", "EXPTIME"]
    );
    assert_eq!(records.get("DTIME-FS").unwrap().kind, KeyKind::Integer);
    assert_eq!(records.get("INTTIME").unwrap().kind, KeyKind::Float);
    assert_eq!(records.get("CTYPE1").unwrap().kind, KeyKind::String);
    assert_eq!(records.value("CTYPE1"), Some("Frequency"));
    assert_eq!(records.value("ANT0"), Some("1 - 1"));
}

#[test]
fn test_structural_keywords_are_not_duplicated() {
    let dir = tempdir().unwrap();
    let first = dir.path().join("first.fits");
    let second = dir.path().join("nested").join("second.fits");
    write_spectrogram(&first, &observation()).unwrap();

    // The records now include cfitsio's own keywords.
    let s = read_spectrogram(&first, &ReadOptions::default()).unwrap();
    assert!(s.records().get("NAXIS1").is_some());
    write_spectrogram(&second, &s).unwrap();

    let records = read_fits_header(&second).unwrap();
    for k in STRUCTURAL_KEYWORDS {
        assert!(records.iter().filter(|r| r.keyword == k).count() <= 1, "{k}");
    }
}

#[test]
fn test_integration_time_is_written() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("obs.fits");
    let mut s = Spectrogram::new(2, 2);
    s.calibration.integration_time = 0.25;
    write_spectrogram(&path, &s).unwrap();

    let records = read_fits_header(&path).unwrap();
    assert_abs_diff_eq!(records.value_f64("INTTIME").unwrap(), 0.25);
}

#[test]
fn test_byte_masks() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("obs_flag.fits");
    let mask = Spectrogram::from_vec(2, 2, vec![0.0, 3.0, -1.0, 1.0]).unwrap();
    write_byte_mask(&path, &mask).unwrap();

    let options = ReadOptions {
        auto_detect_bytes: true,
        quiet: true,
        ..Default::default()
    };
    let m = read_spectrogram(&path, &options).unwrap();
    assert_eq!(m.element_kind(), ElementKind::Byte);
    assert_eq!(m.to_vec(), vec![0.0, 1.0, 0.0, 1.0]);

    let m = read_spectrogram(
        &path,
        &ReadOptions {
            quiet: true,
            ..Default::default()
        },
    )
    .unwrap();
    assert_eq!(m.element_kind(), ElementKind::Float);
    assert_eq!(m.to_vec(), vec![0.0, 1.0, 0.0, 1.0]);
}

#[test]
fn test_1d_image_is_one_integration() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("spectrum.fits");
    {
        let description = ImageDescription {
            data_type: ImageType::Float,
            dimensions: &[4],
        };
        let mut fptr = FitsFile::create(&path)
            .with_custom_primary(&description)
            .open()
            .unwrap();
        let hdu = fptr.primary_hdu().unwrap();
        hdu.write_image(&mut fptr, &[1.0_f32, 2.0, 3.0, 4.0])
            .unwrap();
    }

    let s = read_spectrogram(&path, &ReadOptions::default()).unwrap();
    assert_eq!((s.width(), s.height()), (4, 1));
    assert_eq!(s.row_to_vec(0), Some(vec![1.0, 2.0, 3.0, 4.0]));
}

#[test]
fn test_errors() {
    let dir = tempdir().unwrap();
    let result = read_spectrogram(dir.path().join("missing.fits"), &ReadOptions::default());
    assert!(matches!(
        result,
        Err(SpectrogramReadError::Fits(FitsError::Open { .. }))
    ));

    let result = write_spectrogram(dir.path().join("empty.fits"), &Spectrogram::new(0, 0));
    assert!(matches!(
        result,
        Err(SpectrogramWriteError::Empty { .. })
    ));
}
