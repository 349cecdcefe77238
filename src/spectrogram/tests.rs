// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

use approx::assert_abs_diff_eq;
use ndarray::array;

use super::*;

#[test]
fn test_get_and_set() {
    let mut s = Spectrogram::new(3, 2);
    assert_eq!(s.to_vec(), vec![0.0; 6]);
    assert_abs_diff_eq!(s.set(2, 1, 5.0), 5.0);
    assert_abs_diff_eq!(s.get(2, 1), 5.0);
    assert_abs_diff_eq!(s.add(2, 1, 1.5), 6.5);
    assert_eq!(s.to_vec(), vec![0.0, 0.0, 0.0, 0.0, 0.0, 6.5]);

    assert!(s.get(3, 0).is_nan());
    assert!(s.get(0, 2).is_nan());
    assert!(s.set(3, 0, 1.0).is_nan());
    assert!(s.add(0, 9, 1.0).is_nan());
    assert_eq!(s.to_vec(), vec![0.0, 0.0, 0.0, 0.0, 0.0, 6.5]);
}

#[test]
fn test_buffer_size_must_match() {
    assert_eq!(
        Spectrogram::from_vec(2, 2, vec![0.0; 3]).unwrap_err(),
        SpectrogramError::BufferSize {
            expected: 4,
            got: 3
        }
    );
    assert!(Spectrogram::from_bytes(2, 2, vec![0; 5]).is_err());
    let mut data = [0.0; 3];
    assert!(Spectrogram::from_slice(2, 2, &mut data).is_err());
}

#[test]
fn test_borrowed_view_writes_through() {
    let mut data = [1.0, 2.0, 3.0, 4.0, 99.0];
    {
        let mut s = Spectrogram::from_slice(2, 2, &mut data).unwrap();
        assert!(!s.owns_buffer());
        s.set(1, 1, 40.0);
        s.fill(7.0);
        s.set(0, 0, 1.0);
        assert_eq!(s.to_vec(), vec![1.0, 7.0, 7.0, 7.0]);
    }
    // Only width x height samples are used.
    assert_eq!(data, [1.0, 7.0, 7.0, 7.0, 99.0]);
}

#[test]
fn test_allocating_a_view_leaves_the_caller_alone() {
    let mut data = [1.0, 2.0, 3.0, 4.0];
    {
        let mut s = Spectrogram::from_slice(2, 2, &mut data).unwrap();
        s.allocate(3, 2, true);
        assert!(s.owns_buffer());
        s.set(0, 0, 50.0);
        assert_eq!(s.to_vec(), vec![50.0, 2.0, 0.0, 3.0, 4.0, 0.0]);
    }
    assert_eq!(data, [1.0, 2.0, 3.0, 4.0]);
}

#[test]
fn test_allocate() {
    let mut s = Spectrogram::from_vec(2, 2, vec![1.0, 2.0, 3.0, 4.0]).unwrap();
    s.allocate(1, 3, true);
    assert_eq!((s.width(), s.height()), (1, 3));
    assert_eq!(s.to_vec(), vec![1.0, 3.0, 0.0]);

    s.allocate(2, 2, false);
    assert_eq!(s.to_vec(), vec![0.0; 4]);

    // A zero dimension changes nothing.
    s.allocate(0, 5, false);
    assert_eq!((s.width(), s.height()), (2, 2));
}

#[test]
fn test_byte_samples() {
    let mut s = Spectrogram::from_bytes(2, 1, vec![0, 1]).unwrap();
    assert_eq!(s.element_kind(), ElementKind::Byte);
    assert!(s.view().is_none());
    assert!(s.row(0).is_none());
    assert_eq!(s.samples(), array![[0.0_f32, 1.0]]);
    assert_eq!(s.row_to_vec(0), Some(vec![0.0, 1.0]));
    assert_abs_diff_eq!(s.set(0, 0, 300.0), 255.0);
    assert_abs_diff_eq!(s.set(1, 0, -2.0), 0.0);

    s.allocate(3, 1, true);
    assert_eq!(s.element_kind(), ElementKind::Byte);
    assert_eq!(s.to_vec(), vec![255.0, 0.0, 0.0]);
}

#[test]
fn test_rows() {
    let mut s = Spectrogram::new(3, 2);
    s.set_row(1, &[1.0, 2.0, 3.0]).unwrap();
    assert_eq!(s.row(1).unwrap(), array![1.0_f32, 2.0, 3.0]);
    assert!(s.row(2).is_none());
    s.row_mut(0).unwrap()[1] = 9.0;
    assert_abs_diff_eq!(s.get(1, 0), 9.0);

    assert_eq!(
        s.set_row(2, &[1.0, 2.0, 3.0]),
        Err(SpectrogramError::RowOutOfRange { row: 2, height: 2 })
    );
    assert_eq!(
        s.set_row(0, &[1.0]),
        Err(SpectrogramError::RowLength {
            expected: 3,
            got: 1
        })
    );

    s.set_row_f64(0, &[0.5, 0.25, 0.125]).unwrap();
    assert_eq!(s.row_to_vec(0), Some(vec![0.5, 0.25, 0.125]));
    assert_eq!(s.set_row_value(1, -1.0), 3);
    assert_eq!(s.set_row_value(2, -1.0), 0);
    assert_eq!(s.row_to_vec(1), Some(vec![-1.0; 3]));

    let mut s = Spectrogram::new(4, 1);
    s.set_row_re_im(0, &[1.0, 2.0], &[-1.0, -2.0]).unwrap();
    assert_eq!(s.to_vec(), vec![1.0, -1.0, 2.0, -2.0]);
    assert!(s.set_row_re_im(0, &[1.0], &[]).is_err());
}

#[test]
fn test_append_rows_grows_the_height() {
    let mut s = Spectrogram::new(2, 0);
    assert_eq!(s.append_row(&[1.0, 2.0]), 1);
    assert_eq!(s.height(), 1);
    assert_eq!(s.append_row_f64(&[3.0, 4.0]), 2);
    assert_eq!(s.height(), 2);
    assert_eq!(s.append_row(&[5.0, 6.0]), 3);
    assert_eq!(s.height(), 4);
    // The wrong length is ignored.
    assert_eq!(s.append_row(&[1.0]), 3);

    s.truncate_to_written(None);
    assert_eq!(s.height(), 3);
    assert_eq!(s.to_vec(), vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);

    s.truncate_to_written(Some(1));
    assert_eq!(s.height(), 1);
    assert_eq!(s.to_vec(), vec![1.0, 2.0]);

    // Can't grow by truncating, and the write cursor stays put.
    s.truncate_to_written(Some(5));
    assert_eq!(s.height(), 1);
    assert_eq!(s.rows_written(), 1);
    assert_eq!(s.append_row(&[9.0, 10.0]), 2);
    assert_eq!(s.to_vec(), vec![1.0, 2.0, 9.0, 10.0]);

    s.reset_rows_written();
    assert_eq!(s.rows_written(), 0);
    assert_eq!(s.append_row(&[7.0, 8.0]), 1);
    assert_eq!(s.row_to_vec(0), Some(vec![7.0, 8.0]));
}

#[test]
fn test_truncate_past_the_height_keeps_appending_in_order() {
    let mut s = Spectrogram::new(2, 2);
    s.append_row(&[1.0, 2.0]);
    s.truncate_to_written(Some(5));
    assert_eq!(s.height(), 2);
    assert_eq!(s.rows_written(), 1);

    s.append_row(&[3.0, 4.0]);
    assert_abs_diff_eq!(s.get(0, 1), 3.0);
    assert_abs_diff_eq!(s.get(1, 1), 4.0);
    assert_eq!(s.height(), 2);
}

#[test]
fn test_truncate_a_view() {
    let mut data = [1.0, 2.0, 3.0, 4.0];
    let mut s = Spectrogram::from_slice(2, 2, &mut data).unwrap();
    s.truncate_to_written(Some(1));
    assert_eq!(s.height(), 1);
    assert!(!s.owns_buffer());
    assert_eq!(s.view().unwrap(), array![[1.0_f32, 2.0]]);
}

#[test]
fn test_copies() {
    let mut s = Spectrogram::from_vec(2, 1, vec![1.0, 2.0]).unwrap();
    s.calibration.start_freq = 50.0;
    s.set_keyword("OBSERVER", "someone");
    s.set_file_name("/data/obs.fits");

    let like = s.alloc_like(Some(3));
    assert_eq!((like.width(), like.height()), (2, 3));
    assert_eq!(like.to_vec(), vec![0.0; 6]);
    assert_abs_diff_eq!(like.calibration.start_freq, 50.0);
    assert_eq!(like.records().value("OBSERVER"), Some("someone"));
    assert_eq!(like.file_name(), s.file_name());

    let mut data = [5.0, 6.0];
    let view = Spectrogram::from_slice(2, 1, &mut data).unwrap();
    let owned = view.clone();
    assert!(owned.owns_buffer());
    assert_eq!(owned.to_vec(), vec![5.0, 6.0]);

    let mut dest = Spectrogram::new(1, 1);
    dest.copy_samples_from(&s);
    assert_eq!(dest.to_vec(), vec![1.0, 2.0]);
}

#[test]
fn test_copy_samples_from_an_empty_spectrogram() {
    let mut dest = Spectrogram::new(3, 2);
    dest.copy_samples_from(&Spectrogram::new(3, 0));
    assert_eq!((dest.width(), dest.height()), (3, 0));
    assert!(dest.to_vec().is_empty());
    assert!(dest.get(0, 0).is_nan());

    let mut dest = Spectrogram::from_bytes(1, 1, vec![1]).unwrap();
    dest.copy_samples_from(&Spectrogram::new(0, 4));
    assert_eq!((dest.width(), dest.height()), (0, 4));
    assert_eq!(dest.element_kind(), ElementKind::Byte);

    // It can still be grown afterwards.
    dest.allocate(2, 1, true);
    assert_eq!(dest.to_vec(), vec![0.0, 0.0]);
}

#[test]
fn test_copy_samples_into_a_view() {
    let mut data = [0.0; 2];
    {
        let mut view = Spectrogram::from_slice(2, 1, &mut data).unwrap();
        view.copy_samples_from(&Spectrogram::from_vec(2, 1, vec![4.0, 5.0]).unwrap());
        assert!(!view.owns_buffer());
    }
    assert_eq!(data, [4.0, 5.0]);
}

#[test]
fn test_arrays() {
    let a = array![[1.0_f32, 2.0, 3.0], [4.0, 5.0, 6.0]];
    let s = Spectrogram::from_array(a.clone());
    assert_eq!((s.width(), s.height()), (3, 2));
    assert_abs_diff_eq!(s.get(2, 0), 3.0);
    assert_eq!(s.samples(), a);

    let mut b = a.clone();
    {
        let mut view = Spectrogram::from_view(b.view_mut());
        view.row_mut(1).unwrap().fill(0.0);
        view.set(0, 0, -1.0);
    }
    assert_eq!(b, array![[-1.0_f32, 2.0, 3.0], [0.0, 0.0, 0.0]]);
}

#[test]
fn test_fill() {
    let mut s = Spectrogram::new(2, 2);
    s.fill(3.0);
    assert_eq!(s.to_vec(), vec![3.0; 4]);
    s.fill_nan();
    assert!(s.to_vec().iter().all(|v| v.is_nan()));
}
