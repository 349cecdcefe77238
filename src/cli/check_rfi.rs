// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Check the integrations of a dynamic spectrum against RFI criteria.

use std::path::PathBuf;

use clap::Parser;
use log::{debug, info};

use super::DynspecError;
use crate::{
    io::{read_spectrogram, ReadOptions},
    quality::RejectionConfig,
};

#[derive(Parser, Debug)]
pub struct CheckRfiArgs {
    /// Path to the FITS dynamic spectrum.
    #[clap(name = "FITS_FILE", parse(from_os_str))]
    file: PathBuf,

    /// A toml or json file of rejection thresholds. Without one, the
    /// defaults are used.
    #[clap(short, long, parse(from_os_str))]
    config: Option<PathBuf>,

    /// Flag samples with the RFI mask from this directory before checking.
    #[clap(short, long, parse(from_os_str))]
    mask_dir: Option<PathBuf>,

    /// Correct times recorded with the known-bad DAQ clock of October 2012.
    #[clap(long)]
    fix_bad_clock: bool,
}

impl CheckRfiArgs {
    pub fn run(&self) -> Result<(), DynspecError> {
        let config = match &self.config {
            Some(file) => RejectionConfig::from_file(file)?,
            None => RejectionConfig::default(),
        };
        debug!("Rejection config: {config:?}");

        let options = ReadOptions {
            fix_bad_clock: self.fix_bad_clock,
            ..Default::default()
        };
        let mut s = read_spectrogram(&self.file, &options)?;
        if let Some(dir) = &self.mask_dir {
            s.set_mask_dir(Some(dir));
            let n = s.flag_all();
            info!("Flagged {n} integrations with the RFI mask");
        }

        let outcomes = s.check_all_integrations(&config);
        info!("# integration unix_time reasons_bits reasons total_power max_channel_dbm max_channel_mhz flagged");
        for (y, o) in outcomes.iter().enumerate() {
            info!(
                "{y} {:.3} 0x{:02x} {} {:.6e} {:.3} {:.3} {}",
                s.row_unix_time(y),
                o.reasons.bits(),
                o.reasons,
                o.total_power,
                o.max_channel_power_dbm,
                o.max_channel_freq,
                u8::from(o.flagged)
            );
        }
        let accepted = outcomes.iter().filter(|o| o.accepted()).count();
        info!("{accepted} of {} integrations accepted", outcomes.len());
        Ok(())
    }
}
