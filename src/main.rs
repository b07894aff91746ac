//! potx CLI application entry point.
//!
//! This binary parses the command line and hands control to the
//! extraction driver in `potx::cli`.

use std::process::ExitCode;

use clap::Parser;
use potx::cli::{Arguments, ExitStatus};

fn main() -> ExitCode {
    let args = Arguments::parse();

    match potx::cli::run_cli(args) {
        Ok(code) => code,
        Err(err) => {
            eprintln!("Error: {:#}", err);
            ExitStatus::Error.into()
        }
    }
}
