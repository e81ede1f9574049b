// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! Geocodec CLI - command-line interface for geoscience data conversion.
//!
//! Usage:
//!   geocodec formats                           - List supported formats
//!   geocodec detect <file>                     - Detect a file's format
//!   geocodec inspect <file>                    - Show geometry and attributes
//!   geocodec validate <file> --schema <schema> - Check a file against a schema
//!   geocodec convert <input> <output>          - Convert one file
//!   geocodec batch <in_dir> <out_dir> --to <f> - Convert a directory

use clap::{ArgAction, Parser, Subcommand};

mod cmd;
mod common;

use cmd::{BatchCmd, ConvertCmd, DetectCmd, FormatsCmd, InspectCmd, ValidateCmd};
use common::Result;

#[derive(Parser)]
#[command(name = "geocodec")]
#[command(about = "Convert geoscience data between formats", long_about = None)]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(author = "ArcheBase")]
struct Cli {
    /// Increase log verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List supported formats
    Formats(FormatsCmd),

    /// Detect the format of a file
    Detect(DetectCmd),

    /// Show file information
    Inspect(InspectCmd),

    /// Validate a file against a schema
    Validate(ValidateCmd),

    /// Convert a file to another format
    Convert(ConvertCmd),

    /// Convert every file in a directory
    Batch(BatchCmd),
}

fn main() {
    if let Err(e) = run() {
        eprintln!("Error: {e:#}");
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let cli = Cli::parse();
    common::init_logging(cli.verbose);

    match cli.command {
        Commands::Formats(cmd) => cmd.run(),
        Commands::Detect(cmd) => cmd.run(),
        Commands::Inspect(cmd) => cmd.run(),
        Commands::Validate(cmd) => cmd.run(),
        Commands::Convert(cmd) => cmd.run(),
        Commands::Batch(cmd) => cmd.run(),
    }
}
