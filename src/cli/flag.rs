// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Apply an RFI mask to a dynamic spectrum.

use std::path::PathBuf;

use clap::Parser;
use log::{info, warn};

use super::DynspecError;
use crate::io::{read_spectrogram, write_spectrogram, ReadOptions};

#[derive(Parser, Debug)]
pub struct FlagArgs {
    /// Path to the FITS dynamic spectrum.
    #[clap(name = "FITS_FILE", parse(from_os_str))]
    file: PathBuf,

    /// The directory containing the RFI masks. The mask for "name.fits" is
    /// "name_flag.fits".
    #[clap(short, long, parse(from_os_str))]
    mask_dir: PathBuf,

    /// Where to write the flagged dynamic spectrum.
    #[clap(short, long, parse(from_os_str))]
    output: PathBuf,
}

impl FlagArgs {
    pub fn run(&self) -> Result<(), DynspecError> {
        let mut s = read_spectrogram(&self.file, &ReadOptions::default())?;
        s.set_mask_dir(Some(&self.mask_dir));
        if !s.load_rfi_mask() {
            warn!("No usable RFI mask for {}", self.file.display());
        }
        let n = s.flag_all();
        info!("Flagged {n} of {} integrations", s.height());
        write_spectrogram(&self.output, &s)?;
        info!("Wrote {}", self.output.display());
        Ok(())
    }
}
