// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! Formats command - list registered format adapters.

use clap::Args;

use crate::common::Result;
use geocodec::global_registry;

/// List supported formats.
#[derive(Args, Clone, Debug)]
pub struct FormatsCmd {
    /// Also show features each format cannot round-trip
    #[arg(long)]
    lossy: bool,
}

impl FormatsCmd {
    pub fn run(self) -> Result<()> {
        let registry = global_registry();

        println!("{:<12} {:<16} Description", "Format", "Extensions");
        println!("{}", "-".repeat(64));
        for adapter in registry.formats() {
            println!(
                "{:<12} {:<16} {}",
                adapter.format_id(),
                adapter.extensions().join(","),
                adapter.description()
            );
            if self.lossy {
                for feature in adapter.lossy_features() {
                    println!("{:<12} lossy: {feature}", "");
                }
            }
        }
        Ok(())
    }
}
