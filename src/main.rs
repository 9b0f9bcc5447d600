//! `scour` command-line entry point.
//!
//! ```text
//! scour clean data.csv --output-dir out/     # clean, encode, write CSV + report
//! scour infer data.csv                       # show inferred column types
//! scour config > scour.json                  # dump defaults to edit
//! ```

#![expect(clippy::print_stdout)] // CLI output goes to stdout

mod cli;

use anyhow::Result;
use clap::Parser as _;

fn main() -> Result<()> {
    let cli = cli::Cli::parse();

    // The config dump stays clean for shell redirection.
    if !matches!(cli.command, cli::Commands::Config) {
        scour::logging::init()?;
    }

    cli::run_command(cli.command)
}
