//! CLI layer - user-facing command-line interface.
//!
//! ## Module Structure
//!
//! - `args`: CLI argument definitions using clap
//! - `exit_status`: exit status codes
//! - `run`: the extraction driver (discovery, extraction, merge, output)

use std::process::ExitCode;

use anyhow::Result;

pub use args::Arguments;
pub use exit_status::ExitStatus;

pub mod args;
mod exit_status;
mod run;

pub fn run_cli(args: Arguments) -> Result<ExitCode> {
    let status = run::run(args)?;
    Ok(status.into())
}
