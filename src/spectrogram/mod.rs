// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! The in-memory dynamic spectrum.
//!
//! A [`Spectrogram`] is a `(height, width)` array of samples; columns are frequency
//! channels and rows are time integrations. Out-of-bounds access never panics;
//! it yields NaN, which callers detect with `is_nan` or `is_finite`. NaN is
//! used because every finite float is a legitimate science value.

mod error;
#[cfg(test)]
mod tests;

pub use error::SpectrogramError;

use std::path::{Path, PathBuf};

use log::{debug, error, warn};
use ndarray::{prelude::*, CowArray, Zip};

use crate::{
    metadata::{Calibration, HeaderRecords},
    quality::MaskCache,
    states::IntegrationRanges,
};

/// How samples are physically stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ElementKind {
    /// One IEEE-754 single-precision float per sample.
    #[default]
    Float,

    /// One byte per sample (e.g. RFI masks written with BITPIX = 8). Readers
    /// still see floats.
    Byte,
}

/// The sample buffer, shaped `(height, width)`. A borrowed view is never
/// freed or reallocated in place.
#[derive(Debug)]
enum Samples<'a> {
    Owned(Array2<f32>),
    Bytes(Array2<u8>),
    Borrowed(ArrayViewMut2<'a, f32>),
}

impl<'a> Samples<'a> {
    fn zeros(kind: ElementKind, height: usize, width: usize) -> Samples<'a> {
        match kind {
            ElementKind::Float => Samples::Owned(alloc_array(height, width, 0.0)),
            ElementKind::Byte => Samples::Bytes(alloc_array(height, width, 0)),
        }
    }

    fn kind(&self) -> ElementKind {
        match self {
            Samples::Bytes(_) => ElementKind::Byte,
            Samples::Owned(_) | Samples::Borrowed(_) => ElementKind::Float,
        }
    }

    fn dim(&self) -> (usize, usize) {
        match self {
            Samples::Owned(a) => a.dim(),
            Samples::Bytes(a) => a.dim(),
            Samples::Borrowed(a) => a.dim(),
        }
    }

    fn get(&self, y: usize, x: usize) -> Option<f32> {
        match self {
            Samples::Owned(a) => a.get((y, x)).copied(),
            Samples::Borrowed(a) => a.get((y, x)).copied(),
            Samples::Bytes(a) => a.get((y, x)).map(|&b| f32::from(b)),
        }
    }

    fn set(&mut self, y: usize, x: usize, value: f32) -> Option<f32> {
        match self {
            Samples::Owned(a) => a.get_mut((y, x)).map(|v| {
                *v = value;
                value
            }),
            Samples::Borrowed(a) => a.get_mut((y, x)).map(|v| {
                *v = value;
                value
            }),
            // Saturating conversion; NaN becomes 0.
            Samples::Bytes(a) => a.get_mut((y, x)).map(|v| {
                *v = value as u8;
                f32::from(*v)
            }),
        }
    }

    fn floats(&self) -> Option<ArrayView2<f32>> {
        match self {
            Samples::Owned(a) => Some(a.view()),
            Samples::Borrowed(a) => Some(a.view()),
            Samples::Bytes(_) => None,
        }
    }

    fn floats_mut(&mut self) -> Option<ArrayViewMut2<f32>> {
        match self {
            Samples::Owned(a) => Some(a.view_mut()),
            Samples::Borrowed(a) => Some(a.view_mut()),
            Samples::Bytes(_) => None,
        }
    }

    /// Overwrite row `y`, which must exist, with `row`, which must be as long
    /// as a row.
    fn assign_row(&mut self, y: usize, row: &[f32]) {
        let row = ArrayView1::from(row);
        match self {
            Samples::Owned(a) => a.row_mut(y).assign(&row),
            Samples::Borrowed(a) => a.row_mut(y).assign(&row),
            Samples::Bytes(a) => a.row_mut(y).zip_mut_with(&row, |b, &v| *b = v as u8),
        }
    }

    fn fill_row(&mut self, y: usize, value: f32) {
        match self {
            Samples::Owned(a) => a.row_mut(y).fill(value),
            Samples::Borrowed(a) => a.row_mut(y).fill(value),
            Samples::Bytes(a) => a.row_mut(y).fill(value as u8),
        }
    }

    /// Keep only the first `rows` rows. Nothing is reallocated.
    fn keep_rows(&mut self, rows: usize) {
        match self {
            Samples::Owned(a) => a.slice_collapse(s![..rows, ..]),
            Samples::Bytes(a) => a.slice_collapse(s![..rows, ..]),
            Samples::Borrowed(a) => a.slice_collapse(s![..rows, ..]),
        }
    }
}

/// Allocate a `height` x `width` array. Running out of memory here is not
/// something the caller can recover from, so the process is aborted.
fn alloc_array<T: Copy>(height: usize, width: usize, fill: T) -> Array2<T> {
    let len = num_elements(width, height);
    let mut v = Vec::new();
    if let Err(e) = v.try_reserve_exact(len) {
        let bytes = len as f64 * std::mem::size_of::<T>() as f64;
        error!(
            "Couldn't allocate an array of {len} elements ({:.2} GiB): {e}",
            bytes / (1024.0 * 1024.0 * 1024.0)
        );
        std::process::abort();
    }
    v.resize(len, fill);
    match Array2::from_shape_vec((height, width), v) {
        Ok(a) => a,
        Err(e) => {
            error!("Couldn't shape {len} elements as {height}x{width}: {e}");
            std::process::abort();
        }
    }
}

fn num_elements(width: usize, height: usize) -> usize {
    match width.checked_mul(height) {
        Some(n) => n,
        None => {
            error!("A {width}x{height} array is too big to address");
            std::process::abort();
        }
    }
}

fn shaped<T>(width: usize, height: usize, data: Vec<T>) -> Result<Array2<T>, SpectrogramError> {
    let got = data.len();
    Array2::from_shape_vec((height, width), data).map_err(|_| SpectrogramError::BufferSize {
        expected: width.saturating_mul(height),
        got,
    })
}

/// A dynamic spectrum: `width` frequency channels by `height` integrations,
/// plus everything known about how to calibrate it.
#[derive(Debug)]
pub struct Spectrogram<'a> {
    data: Samples<'a>,

    /// The write cursor used by [`Spectrogram::append_row`].
    rows_written: usize,

    pub(crate) records: HeaderRecords,

    /// Frequency and time calibration derived from the header.
    pub calibration: Calibration,

    pub(crate) ranges: IntegrationRanges,

    file_name: Option<PathBuf>,

    pub(crate) mask_cache: MaskCache,
}

impl<'a> Spectrogram<'a> {
    /// A new owned spectrogram filled with zeros. Either dimension may be 0,
    /// in which case nothing is allocated until [`Spectrogram::allocate`] is
    /// called.
    pub fn new(width: usize, height: usize) -> Spectrogram<'a> {
        Self::with_data(Samples::zeros(ElementKind::Float, height, width))
    }

    /// Take ownership of an array shaped `(height, width)`.
    pub fn from_array(array: Array2<f32>) -> Spectrogram<'a> {
        Self::with_data(Samples::Owned(array))
    }

    /// Take ownership of an existing row-major buffer. The buffer length must
    /// be exactly `width * height`.
    pub fn from_vec(
        width: usize,
        height: usize,
        data: Vec<f32>,
    ) -> Result<Spectrogram<'a>, SpectrogramError> {
        Ok(Self::with_data(Samples::Owned(shaped(width, height, data)?)))
    }

    /// Take ownership of a byte-per-pixel buffer.
    pub fn from_bytes(
        width: usize,
        height: usize,
        data: Vec<u8>,
    ) -> Result<Spectrogram<'a>, SpectrogramError> {
        Ok(Self::with_data(Samples::Bytes(shaped(width, height, data)?)))
    }
}

impl<'a> Spectrogram<'a> {
    /// A spectrogram that reads and writes caller-owned memory. The memory must
    /// hold at least `width * height` samples; only that many are used.
    pub fn from_slice(
        width: usize,
        height: usize,
        data: &'a mut [f32],
    ) -> Result<Spectrogram<'a>, SpectrogramError> {
        let expected = width.saturating_mul(height);
        let got = data.len();
        if got < expected {
            return Err(SpectrogramError::BufferSize { expected, got });
        }
        let view = ArrayViewMut2::from_shape((height, width), &mut data[..expected])
            .map_err(|_| SpectrogramError::BufferSize { expected, got })?;
        Ok(Self::with_data(Samples::Borrowed(view)))
    }

    /// A spectrogram over a caller-owned array view shaped `(height, width)`.
    pub fn from_view(view: ArrayViewMut2<'a, f32>) -> Spectrogram<'a> {
        Self::with_data(Samples::Borrowed(view))
    }

    fn with_data(data: Samples<'a>) -> Spectrogram<'a> {
        Spectrogram {
            data,
            rows_written: 0,
            records: HeaderRecords::default(),
            calibration: Calibration::default(),
            ranges: IntegrationRanges::default(),
            file_name: None,
            mask_cache: MaskCache::default(),
        }
    }

    /// The number of frequency channels.
    #[inline]
    pub fn width(&self) -> usize {
        self.data.dim().1
    }

    /// The number of time integrations.
    #[inline]
    pub fn height(&self) -> usize {
        self.data.dim().0
    }

    pub fn element_kind(&self) -> ElementKind {
        self.data.kind()
    }

    /// Is the sample buffer owned by this spectrogram (as opposed to being a
    /// view over caller memory)?
    pub fn owns_buffer(&self) -> bool {
        !matches!(self.data, Samples::Borrowed(_))
    }

    pub fn file_name(&self) -> Option<&Path> {
        self.file_name.as_deref()
    }

    pub fn set_file_name<P: Into<PathBuf>>(&mut self, file_name: P) {
        self.file_name = Some(file_name.into());
    }

    /// All samples, if they are stored as floats.
    pub fn view(&self) -> Option<ArrayView2<f32>> {
        self.data.floats()
    }

    pub fn view_mut(&mut self) -> Option<ArrayViewMut2<f32>> {
        self.data.floats_mut()
    }

    /// All samples as floats, shaped `(height, width)`. Only byte buffers are
    /// copied.
    pub fn samples(&self) -> CowArray<f32, Ix2> {
        match &self.data {
            Samples::Owned(a) => CowArray::from(a.view()),
            Samples::Borrowed(a) => CowArray::from(a.view()),
            Samples::Bytes(a) => CowArray::from(a.mapv(f32::from)),
        }
    }

    /// All samples widened to floats, row-major.
    pub fn to_vec(&self) -> Vec<f32> {
        self.samples().iter().copied().collect()
    }

    /// Replace every sample `v` with `f(v)`.
    pub(crate) fn map_inplace<F: FnMut(f32) -> f32>(&mut self, mut f: F) {
        match &mut self.data {
            Samples::Owned(a) => a.mapv_inplace(f),
            Samples::Borrowed(a) => a.mapv_inplace(f),
            Samples::Bytes(a) => a.mapv_inplace(|b| f(f32::from(b)) as u8),
        }
    }

    /// Replace every sample `v` at `(y, x)` with `f((y, x), v)`.
    pub(crate) fn map_indexed_inplace<F>(&mut self, mut f: F)
    where
        F: FnMut((usize, usize), f32) -> f32,
    {
        match &mut self.data {
            Samples::Owned(a) => Zip::indexed(a).for_each(|i, v| *v = f(i, *v)),
            Samples::Borrowed(a) => Zip::indexed(a).for_each(|i, v| *v = f(i, *v)),
            Samples::Bytes(a) => {
                Zip::indexed(a).for_each(|i, v| *v = f(i, f32::from(*v)) as u8)
            }
        }
    }

    /// Replace every sample `v` with `f(v, r)`, where `r` is the sample at the
    /// same place in `rhs`. `rhs` must have this spectrogram's shape.
    pub(crate) fn zip_mut_with<F>(&mut self, rhs: &ArrayView2<f32>, mut f: F)
    where
        F: FnMut(f32, f32) -> f32,
    {
        match &mut self.data {
            Samples::Owned(a) => a.zip_mut_with(rhs, |v, &r| *v = f(*v, r)),
            Samples::Borrowed(a) => a.zip_mut_with(rhs, |v, &r| *v = f(*v, r)),
            Samples::Bytes(a) => a.zip_mut_with(rhs, |v, &r| *v = f(f32::from(*v), r) as u8),
        }
    }

    /// Overwrite every sample with `src`, which must have this spectrogram's
    /// shape.
    pub(crate) fn assign(&mut self, src: &ArrayView2<f32>) {
        self.zip_mut_with(src, |_, r| r);
    }

    /// Replace the buffer with one of the new size. With `keep_existing`, the
    /// overlapping region of the old contents is copied into the new buffer;
    /// anything else is zero. A zero dimension leaves everything untouched.
    ///
    /// A borrowed view becomes an owned buffer; the caller's memory is left
    /// alone.
    pub fn allocate(&mut self, width: usize, height: usize, keep_existing: bool) {
        if width == 0 || height == 0 {
            return;
        }
        let len = num_elements(width, height);
        debug!(
            "Allocating {width}x{height} = {len} samples ({:.2} GiB)",
            (len * std::mem::size_of::<f32>()) as f64 / (1024.0 * 1024.0 * 1024.0)
        );

        let mut new_data = Samples::zeros(self.data.kind(), height, width);
        if keep_existing {
            let (h, w) = self.data.dim();
            let (h, w) = (h.min(height), w.min(width));
            match (&mut new_data, &self.data) {
                (Samples::Bytes(new), Samples::Bytes(old)) => {
                    new.slice_mut(s![..h, ..w]).assign(&old.slice(s![..h, ..w]))
                }
                (new, old) => {
                    if let (Some(mut new), Some(old)) = (new.floats_mut(), old.floats()) {
                        new.slice_mut(s![..h, ..w]).assign(&old.slice(s![..h, ..w]));
                    }
                }
            }
        }
        self.data = new_data;
    }

    /// Get the sample at channel `x` and integration `y`. NaN is returned if
    /// the coordinates are out of range.
    #[inline]
    pub fn get(&self, x: usize, y: usize) -> f32 {
        self.data.get(y, x).unwrap_or(f32::NAN)
    }

    /// Set the sample at channel `x` and integration `y`, returning the stored
    /// value. Out-of-range coordinates change nothing and return NaN.
    #[inline]
    pub fn set(&mut self, x: usize, y: usize, value: f32) -> f32 {
        self.data.set(y, x, value).unwrap_or(f32::NAN)
    }

    /// Add to the sample at channel `x` and integration `y`, returning the new
    /// value. Out-of-range coordinates change nothing and return NaN.
    pub fn add(&mut self, x: usize, y: usize, value: f32) -> f32 {
        match self.data.get(y, x) {
            Some(v) => self.set(x, y, v + value),
            None => f32::NAN,
        }
    }

    /// Set every sample to `value`.
    pub fn fill(&mut self, value: f32) {
        self.map_inplace(|_| value);
    }

    pub fn fill_nan(&mut self) {
        self.fill(f32::NAN);
    }

    /// Set every sample in integration `y` to `value`, returning how many
    /// samples were set.
    pub fn set_row_value(&mut self, y: usize, value: f32) -> usize {
        if y >= self.height() {
            return 0;
        }
        self.data.fill_row(y, value);
        self.width()
    }

    /// Borrow integration `y`. This is only possible for float buffers; use
    /// [`Spectrogram::row_to_vec`] for anything.
    pub fn row(&self, y: usize) -> Option<ArrayView1<f32>> {
        if y >= self.height() {
            return None;
        }
        self.data
            .floats()
            .map(|a| a.index_axis_move(Axis(0), y))
    }

    pub fn row_mut(&mut self, y: usize) -> Option<ArrayViewMut1<f32>> {
        if y >= self.height() {
            return None;
        }
        self.data
            .floats_mut()
            .map(|a| a.index_axis_move(Axis(0), y))
    }

    /// Copy integration `y` into a new vector, widening bytes if necessary.
    pub fn row_to_vec(&self, y: usize) -> Option<Vec<f32>> {
        if y >= self.height() {
            return None;
        }
        Some(self.samples().row(y).to_vec())
    }

    /// Overwrite integration `y`. Rows past the current height are never
    /// created here; use [`Spectrogram::append_row`] to grow.
    pub fn set_row(&mut self, y: usize, row: &[f32]) -> Result<(), SpectrogramError> {
        if y >= self.height() {
            return Err(SpectrogramError::RowOutOfRange {
                row: y,
                height: self.height(),
            });
        }
        if row.len() != self.width() {
            return Err(SpectrogramError::RowLength {
                expected: self.width(),
                got: row.len(),
            });
        }
        self.data.assign_row(y, row);
        Ok(())
    }

    /// [`Spectrogram::set_row`] for double-precision input.
    pub fn set_row_f64(&mut self, y: usize, row: &[f64]) -> Result<(), SpectrogramError> {
        let row: Vec<f32> = row.iter().map(|&v| v as f32).collect();
        self.set_row(y, &row)
    }

    /// Write interleaved real and imaginary parts into integration `y`.
    pub fn set_row_re_im(&mut self, y: usize, re: &[f64], im: &[f64]) -> Result<(), SpectrogramError> {
        if re.len() != im.len() {
            return Err(SpectrogramError::RowLength {
                expected: re.len(),
                got: im.len(),
            });
        }
        let row: Vec<f32> = re
            .iter()
            .zip(im)
            .flat_map(|(&r, &i)| [r as f32, i as f32])
            .collect();
        self.set_row(y, &row)
    }

    /// Store `row` at the write cursor, doubling the height first if the
    /// cursor has reached it. A row of the wrong length is ignored. Returns the
    /// number of rows written so far.
    pub fn append_row(&mut self, row: &[f32]) -> usize {
        let width = self.width();
        if width == 0 || row.len() != width {
            warn!(
                "Row of {} channels doesn't match the spectrogram width {width}; ignored",
                row.len(),
            );
            return self.rows_written;
        }

        if self.rows_written >= self.height() {
            let new_height = (2 * self.height()).max(self.rows_written + 1);
            self.allocate(width, new_height, true);
        }
        self.data.assign_row(self.rows_written, row);
        self.rows_written += 1;
        self.rows_written
    }

    /// [`Spectrogram::append_row`] for double-precision input.
    pub fn append_row_f64(&mut self, row: &[f64]) -> usize {
        let row: Vec<f32> = row.iter().map(|&v| v as f32).collect();
        self.append_row(&row)
    }

    pub fn rows_written(&self) -> usize {
        self.rows_written
    }

    pub fn reset_rows_written(&mut self) {
        self.rows_written = 0;
    }

    /// Shrink the logical height to the number of rows written (or to
    /// `rows`, if given, which also becomes the write cursor). More rows than
    /// are allocated changes nothing. The buffer itself is not reallocated.
    pub fn truncate_to_written(&mut self, rows: Option<usize>) {
        let rows = rows.unwrap_or(self.rows_written);
        if rows > self.height() {
            warn!(
                "Couldn't set the height to {rows} because only {} integrations are allocated",
                self.height()
            );
            return;
        }
        self.rows_written = rows;
        if rows > 0 {
            self.data.keep_rows(rows);
        }
    }

    /// A new owned spectrogram holding `data`, with this one's calibration and
    /// header.
    pub(crate) fn like_with(&self, data: Array2<f32>) -> Spectrogram<'static> {
        let mut out = Spectrogram::from_array(data);
        out.records = self.records.clone();
        out.calibration = self.calibration.clone();
        out.ranges = self.ranges.clone();
        out.file_name = self.file_name.clone();
        out
    }

    /// A new owned spectrogram with the same width, calibration and header
    /// as this one, and `height` integrations (this one's height if `None`).
    pub fn alloc_like(&self, height: Option<usize>) -> Spectrogram<'static> {
        let height = height.unwrap_or_else(|| self.height());
        self.like_with(alloc_array(height, self.width(), 0.0))
    }

    /// An owned deep copy. The RFI mask cache is not carried over.
    pub fn to_owned_spectrogram<'b>(&self) -> Spectrogram<'b> {
        let data = match &self.data {
            Samples::Owned(a) => Samples::Owned(a.clone()),
            Samples::Borrowed(a) => Samples::Owned(a.to_owned()),
            Samples::Bytes(a) => Samples::Bytes(a.clone()),
        };
        Spectrogram {
            data,
            rows_written: self.rows_written,
            records: self.records.clone(),
            calibration: self.calibration.clone(),
            ranges: self.ranges.clone(),
            file_name: self.file_name.clone(),
            mask_cache: MaskCache::default(),
        }
    }

    /// Overwrite this spectrogram's samples with `other`'s, reallocating if
    /// the sizes differ.
    pub fn copy_samples_from(&mut self, other: &Spectrogram) {
        let (height, width) = (other.height(), other.width());
        if self.width() != width || self.height() != height {
            warn!(
                "Size of the destination is ({},{}) but the source is ({width},{height}); reallocating",
                self.width(),
                self.height()
            );
            if width == 0 || height == 0 {
                self.data = Samples::zeros(self.data.kind(), height, width);
                return;
            }
            self.allocate(width, height, false);
        }
        self.assign(&other.samples().view());
    }
}

impl Clone for Spectrogram<'_> {
    fn clone(&self) -> Self {
        self.to_owned_spectrogram()
    }
}
