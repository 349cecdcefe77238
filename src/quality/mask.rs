// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! RFI masks and flagging.
//!
//! A mask is a spectrogram of the same shape as the data, where a positive
//! sample marks the corresponding data sample as contaminated. The mask for
//! `/some/where/name.fits` lives at `<mask dir>/name_flag.fits`.

use std::path::{Path, PathBuf};

use log::{debug, info, warn};

use crate::{
    constants::{RFI_MASK_SUFFIX, RFI_SENTINEL},
    io::{read_spectrogram, ReadOptions},
    spectrogram::Spectrogram,
};

/// The path of the RFI mask for `source` inside `mask_dir`.
pub fn rfi_mask_path(mask_dir: &Path, source: &Path) -> Option<PathBuf> {
    let stem = source.file_stem()?.to_str()?;
    Some(mask_dir.join(format!("{stem}{RFI_MASK_SUFFIX}")))
}

/// A lazily-read RFI mask. The mask is re-read only when the expected mask
/// path changes; a path that couldn't be read isn't tried again until then.
#[derive(Debug, Default)]
pub struct MaskCache {
    dir: Option<PathBuf>,
    /// The last path tried, and its mask if it could be read.
    mask: Option<(PathBuf, Option<Box<Spectrogram<'static>>>)>,
}

impl MaskCache {
    pub fn new<P: Into<PathBuf>>(dir: P) -> MaskCache {
        MaskCache {
            dir: Some(dir.into()),
            mask: None,
        }
    }

    pub fn dir(&self) -> Option<&Path> {
        self.dir.as_deref()
    }

    /// Change the mask directory. A mask from another directory is dropped.
    pub fn set_dir<P: Into<PathBuf>>(&mut self, dir: Option<P>) {
        self.dir = dir.map(Into::into);
        self.mask = None;
    }

    /// The mask that has been read, if any.
    pub fn cached(&self) -> Option<&Spectrogram<'static>> {
        self.mask.as_ref().and_then(|(_, m)| m.as_deref())
    }

    /// Get the mask for the data file `source`, reading it if it isn't
    /// already cached. Any problem results in no mask.
    pub fn resolve(&mut self, source: Option<&Path>) -> Option<&Spectrogram<'static>> {
        let dir = self.dir.as_deref()?;
        let expected = rfi_mask_path(dir, source?)?;

        let tried = matches!(&self.mask, Some((path, _)) if *path == expected);
        if !tried {
            let options = ReadOptions {
                auto_detect_bytes: true,
                quiet: true,
                ..Default::default()
            };
            let mask = match read_spectrogram(&expected, &options) {
                Ok(mask) => {
                    info!("Read RFI mask {}", expected.display());
                    Some(Box::new(mask))
                }
                Err(e) => {
                    warn!("Couldn't read RFI mask {}: {e}", expected.display());
                    None
                }
            };
            self.mask = Some((expected, mask));
        }
        self.cached()
    }
}

impl Spectrogram<'_> {
    /// Set the directory that RFI masks are looked for in.
    pub fn set_mask_dir<P: Into<PathBuf>>(&mut self, dir: Option<P>) {
        self.mask_cache.set_dir(dir);
    }

    /// Where this spectrogram's RFI mask is expected to be.
    pub fn rfi_mask_path(&self) -> Option<PathBuf> {
        rfi_mask_path(self.mask_cache.dir()?, self.file_name()?)
    }

    /// Make sure this spectrogram's RFI mask is read. Returns whether a mask is
    /// available.
    pub fn load_rfi_mask(&mut self) -> bool {
        let source = self.file_name().map(Path::to_path_buf);
        self.mask_cache.resolve(source.as_deref()).is_some()
    }

    /// The RFI mask read by [`Spectrogram::load_rfi_mask`], if any.
    pub fn rfi_mask(&self) -> Option<&Spectrogram<'static>> {
        self.mask_cache.cached()
    }

    /// Overwrite each sample of integration `y` that `mask` marks as
    /// contaminated with [`RFI_SENTINEL`]. Returns the number of integrations
    /// flagged (0 or 1).
    pub fn flag_row_with_mask(&mut self, y: usize, mask: &Spectrogram) -> usize {
        if mask.width() != self.width() || mask.height() != self.height() {
            warn!(
                "RFI mask is {}x{} but the spectrogram is {}x{}; not flagging",
                mask.width(),
                mask.height(),
                self.width(),
                self.height()
            );
            return 0;
        }
        if y >= self.height() {
            return 0;
        }
        for x in 0..self.width() {
            if mask.get(x, y) > 0.0 {
                self.set(x, y, RFI_SENTINEL);
            }
        }
        1
    }

    /// Flag every integration with `mask`. Returns the number of integrations
    /// flagged.
    pub fn flag_all_with_mask(&mut self, mask: &Spectrogram) -> usize {
        if mask.width() != self.width() || mask.height() != self.height() {
            warn!(
                "RFI mask is {}x{} but the spectrogram is {}x{}; not flagging",
                mask.width(),
                mask.height(),
                self.width(),
                self.height()
            );
            return 0;
        }
        self.zip_mut_with(&mask.samples().view(), |v, m| {
            if m > 0.0 {
                RFI_SENTINEL
            } else {
                v
            }
        });
        let n = self.height();
        debug!("Flagged {n} integrations");
        n
    }

    /// Flag integration `y` with this spectrogram's own RFI mask.
    pub fn flag_row(&mut self, y: usize) -> usize {
        self.with_rfi_mask(|s, mask| s.flag_row_with_mask(y, mask))
    }

    /// Flag every integration with this spectrogram's own RFI mask.
    pub fn flag_all(&mut self) -> usize {
        self.with_rfi_mask(|s, mask| s.flag_all_with_mask(mask))
    }

    fn with_rfi_mask<F>(&mut self, f: F) -> usize
    where
        F: FnOnce(&mut Self, &Spectrogram) -> usize,
    {
        let mut cache = std::mem::take(&mut self.mask_cache);
        let source = self.file_name().map(Path::to_path_buf);
        let n = match cache.resolve(source.as_deref()) {
            Some(mask) => f(self, mask),
            None => 0,
        };
        self.mask_cache = cache;
        n
    }
}
