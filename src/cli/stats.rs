// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Print statistics of a dynamic spectrum.

use std::path::PathBuf;

use clap::Parser;
use log::info;

use super::DynspecError;
use crate::{
    io::{read_spectrogram, ReadOptions},
    stats::RegionStats,
};

#[derive(Parser, Debug)]
pub struct StatsArgs {
    /// Path to the FITS dynamic spectrum.
    #[clap(name = "FITS_FILE", parse(from_os_str))]
    file: PathBuf,

    /// Ignore this many samples on every edge of the image.
    #[clap(short, long, conflicts_with = "radius")]
    border: Option<usize>,

    /// Only use samples within this many samples of the centre. The median
    /// and inter-quartile range are also reported.
    #[clap(short, long)]
    radius: Option<usize>,

    /// The centre for --radius, as a channel and an integration. The middle
    /// of the image by default.
    #[clap(long, number_of_values = 2, value_names = &["X", "Y"], requires = "radius")]
    center: Option<Vec<usize>>,

    /// Frequency is on the vertical axis.
    #[clap(long)]
    transposed: bool,
}

impl StatsArgs {
    pub fn run(&self) -> Result<(), DynspecError> {
        let options = ReadOptions {
            transposed: self.transposed,
            ..Default::default()
        };
        let s = read_spectrogram(&self.file, &options)?;
        info!(
            "{}: {} channels x {} integrations",
            self.file.display(),
            s.width(),
            s.height()
        );
        info!(
            "    {:.4} - {:.4} MHz, integration time {} s, start {:.6}",
            s.calibration.start_freq,
            s.calibration.stop_freq,
            s.calibration.integration_time,
            s.unix_time()
        );
        for r in s.integration_ranges() {
            info!("    {r}");
        }

        let stats = match (self.radius, self.border) {
            (Some(radius), _) => {
                let center = match self.center.as_deref() {
                    Some(&[x, y]) => Some((x, y)),
                    Some(_) => {
                        return Err(DynspecError::Args(
                            "--center needs exactly two values".to_string(),
                        ))
                    }
                    None => None,
                };
                s.radius_stats(radius, center, true)
            }
            (None, Some(border)) => s.bordered_stats(border),
            (None, None) => s.stats(),
        };
        print_stats(&stats);
        Ok(())
    }
}

fn print_stats(stats: &RegionStats) {
    if stats.count == 0 {
        info!("No finite samples ({} non-finite)", stats.non_finite);
        return;
    }
    info!(
        "mean = {:.8}, rms = {:.8}, min = {:.8}, max = {:.8}",
        stats.mean, stats.rms, stats.min, stats.max
    );
    info!(
        "{} samples used, {} non-finite ignored",
        stats.count, stats.non_finite
    );
    if let Some(q) = &stats.quartiles {
        info!(
            "median = {:.8}, q25 = {:.8}, q75 = {:.8}, rms_iqr = {:.8}",
            q.median,
            q.q25,
            q.q75,
            q.rms_iqr()
        );
    }
}
