// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Command-line interface code. More specific options for `dynspec`
//! subcommands are contained in modules.
//!
//! Only 3 things should be public in this module: `Dynspec`, `Dynspec::run`,
//! and `DynspecError`.

mod check_rfi;
mod error;
mod flag;
mod stats;

pub use error::DynspecError;

use clap::{AppSettings, Args, Parser, Subcommand};
use log::info;

// Add build-time information from the "built" crate.
include!(concat!(env!("OUT_DIR"), "/built.rs"));

#[derive(Debug, Parser)]
#[clap(
    version,
    author,
    about = "Calibration, statistics and RFI rejection for radio spectrometer dynamic spectra"
)]
#[clap(global_setting(AppSettings::DeriveDisplayOrder))]
#[clap(disable_help_subcommand = true)]
#[clap(infer_subcommands = true)]
#[clap(propagate_version = true)]
#[clap(infer_long_args = true)]
pub struct Dynspec {
    #[clap(flatten)]
    global_opts: GlobalArgs,

    #[clap(subcommand)]
    command: Command,
}

#[derive(Debug, Args)]
struct GlobalArgs {
    /// The verbosity of the program. Increase by specifying multiple times
    /// (e.g. -vv). The default is to print only high-level information.
    #[clap(short, long, parse(from_occurrences))]
    #[clap(global = true)]
    verbosity: u8,
}

#[derive(Debug, Subcommand)]
#[clap(arg_required_else_help = true)]
enum Command {
    #[clap(about = "Print statistics of a dynamic spectrum.")]
    Stats(stats::StatsArgs),

    #[clap(about = "Overwrite samples marked by an RFI mask and write the result.")]
    Flag(flag::FlagArgs),

    #[clap(alias = "rfi")]
    #[clap(about = "Check every integration of a dynamic spectrum against RFI criteria.")]
    CheckRfi(check_rfi::CheckRfiArgs),
}

impl Dynspec {
    pub fn run(self) -> Result<(), DynspecError> {
        let GlobalArgs { verbosity } = self.global_opts;
        setup_logging(verbosity).expect("Failed to initialise logging.");

        let sub_command = match &self.command {
            Command::Stats(_) => "stats",
            Command::Flag(_) => "flag",
            Command::CheckRfi(_) => "check-rfi",
        };
        info!("dynspec {} {}", sub_command, env!("CARGO_PKG_VERSION"));
        display_build_info();

        match self.command {
            Command::Stats(args) => args.run()?,
            Command::Flag(args) => args.run()?,
            Command::CheckRfi(args) => args.run()?,
        }

        info!("dynspec {} complete.", sub_command);
        Ok(())
    }
}

/// Activate a logger. All log messages are put onto `stdout`. `env_logger`
/// automatically only uses colours and fancy symbols if we're on a tty (e.g. a
/// terminal); piped output will be formatted sensibly. Source code lines are
/// displayed in log messages when verbosity >= 3.
fn setup_logging(verbosity: u8) -> Result<(), log::SetLoggerError> {
    let mut builder = env_logger::Builder::from_default_env();
    builder.target(env_logger::Target::Stdout);
    builder.format_target(false);
    match verbosity {
        0 => builder.filter_level(log::LevelFilter::Info),
        1 => builder.filter_level(log::LevelFilter::Debug),
        2 => builder.filter_level(log::LevelFilter::Trace),
        _ => {
            builder.filter_level(log::LevelFilter::Trace);
            builder.format(|buf, record| {
                use std::io::Write;

                let timestamp = buf.timestamp();
                let level = record.level();
                let target = record.target();
                let line = record.line().unwrap_or(0);
                let message = record.args();

                writeln!(buf, "[{timestamp} {level} {target}:{line}] {message}")
            })
        }
    };
    builder.try_init()
}

/// Write info-level log lines of how this executable was compiled.
fn display_build_info() {
    info!("Compiled {} for {}", BUILT_TIME_UTC, TARGET);
    info!("         with compiler {}", RUSTC_VERSION);
    info!("");
}
