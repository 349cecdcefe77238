// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Errors associated with reading rejection configurations.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum RejectionConfigError {
    #[error("Rejection config file {file:?} doesn't have a recognised file extension! Valid extensions are: {valid}")]
    UnknownExtension { file: PathBuf, valid: String },

    #[error("Couldn't decode toml structure from {file:?}:\n{err}")]
    Toml { file: PathBuf, err: toml::de::Error },

    #[error("Couldn't decode json structure from {file:?}:\n{err}")]
    Json { file: PathBuf, err: serde_json::Error },

    #[error("Band cut {start_mhz} - {end_mhz} MHz doesn't have its start below its end")]
    BadBandCut { start_mhz: f64, end_mhz: f64 },

    #[error("Total power limit window {start} - {end} doesn't have its start below its end")]
    BadTimeWindow { start: f64, end: f64 },

    #[error(transparent)]
    IO(#[from] std::io::Error),
}
