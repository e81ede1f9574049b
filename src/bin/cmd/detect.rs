// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! Detect command - score every registered format against a file.

use std::path::PathBuf;

use clap::Args;

use crate::common::Result;
use geocodec::io::detection::select;
use geocodec::io::SourceHandle;
use geocodec::global_registry;

/// Detect the format of a file.
#[derive(Args, Clone, Debug)]
pub struct DetectCmd {
    /// Input file
    #[arg(value_name = "FILE")]
    input: PathBuf,

    /// Minimum confidence for a format to be selected
    #[arg(long, default_value_t = 0.5)]
    min_confidence: f32,

    /// Print the score of every format, not just the winner
    #[arg(short, long)]
    all: bool,
}

impl DetectCmd {
    pub fn run(self) -> Result<()> {
        let source = SourceHandle::open(&self.input)?;
        let detections = global_registry().resolve(&source);

        if self.all {
            for detection in &detections {
                println!("{:<12} {}", detection.format_id, detection.confidence);
            }
        }

        let format_id = select(&source, &detections, self.min_confidence)?;
        if !self.all {
            println!("{format_id}");
        }
        Ok(())
    }
}
