// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! Convert command - run one conversion job.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::anyhow;
use clap::Args;

use crate::common::{format_bytes, load_config, load_schema, parse_rename, Result};
use geocodec::convert::{
    ConversionReport, ConversionRequest, ConversionSource, ConversionTarget,
    LocalDirectoryGateway, Orchestrator,
};
use geocodec::model::LengthUnit;
use geocodec::{Compression, ConvertOptions, TransformBuilder};

/// Convert a file to another format.
#[derive(Args, Clone, Debug)]
pub struct ConvertCmd {
    /// Input file
    #[arg(value_name = "INPUT")]
    input: PathBuf,

    /// Output file; the format follows the extension unless --to is given
    #[arg(value_name = "OUTPUT")]
    output: PathBuf,

    /// Input format (detected when omitted)
    #[arg(long, value_name = "FORMAT")]
    from: Option<String>,

    /// Output format
    #[arg(long, value_name = "FORMAT")]
    to: Option<String>,

    /// Schema file, or `id[@version]` from the configured schema directory
    #[arg(short, long, value_name = "SCHEMA")]
    schema: Option<String>,

    /// Configuration file
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Replace an existing output file
    #[arg(long)]
    overwrite: bool,

    /// Rename an attribute, `old=new`; `*` matches any run of characters
    #[arg(long = "rename", value_name = "OLD=NEW")]
    renames: Vec<String>,

    /// Convert coordinates and depths to this length unit
    #[arg(long, value_name = "UNIT", value_parser = parse_length_unit)]
    to_unit: Option<LengthUnit>,

    /// Payload compression for the native binary format
    #[arg(long, value_name = "none|zstd|lz4", value_parser = parse_compression)]
    compression: Option<Compression>,

    /// Also publish the converted model under this object key
    #[arg(long, value_name = "KEY", requires = "store")]
    publish: Option<String>,

    /// Directory backing the object store used by --publish
    #[arg(long, value_name = "DIR")]
    store: Option<PathBuf>,
}

impl ConvertCmd {
    pub fn run(self) -> Result<()> {
        let config = load_config(self.config.as_deref())?;

        let mut options = config.to_options();
        if self.overwrite {
            options = options.with_overwrite(true);
        }
        if let Some(compression) = self.compression {
            options = options.with_compression(compression);
        }
        options = with_transforms(options, &self.renames, self.to_unit)?;

        let mut target = ConversionTarget::local(&self.output);
        if let Some(key) = &self.publish {
            target = target.and_remote(key);
        }
        let mut request =
            ConversionRequest::with_target(ConversionSource::File(self.input.clone()), target)
                .with_options(options);
        if let Some(format) = &self.from {
            request = request.with_source_format(format);
        }
        if let Some(format) = &self.to {
            request = request.with_target_format(format);
        }
        if let Some(schema) = &self.schema {
            request = request.with_schema(load_schema(schema, &config)?);
        }

        let mut orchestrator = Orchestrator::default();
        if let Some(store) = &self.store {
            orchestrator = orchestrator.with_gateway(Arc::new(LocalDirectoryGateway::new(store)));
        }

        let report = orchestrator.convert(&request);
        print_report(&report);
        report.into_result()?;
        Ok(())
    }
}

/// Attach rename and unit transforms to `options`.
pub(crate) fn with_transforms(
    options: ConvertOptions,
    renames: &[String],
    to_unit: Option<LengthUnit>,
) -> Result<ConvertOptions> {
    let mut builder = TransformBuilder::new();
    for rule in renames {
        let (from, to) = parse_rename(rule)?;
        builder = if from.contains('*') {
            builder.with_attribute_rename_wildcard(from, to)
        } else {
            builder.with_attribute_rename(from, to)
        };
    }
    if let Some(unit) = to_unit {
        builder = builder.with_length_unit(unit);
    }
    if builder.is_empty() {
        return Ok(options);
    }
    let pipeline = builder.build().map_err(|e| anyhow!("{e}"))?;
    Ok(options.with_transforms(pipeline))
}

pub(crate) fn print_report(report: &ConversionReport) {
    let states: Vec<&str> = report.states().iter().map(|s| s.as_str()).collect();
    println!("Job:        {}", report.job_id);
    println!("States:     {}", states.join(" -> "));
    if let Some(format) = &report.source_format {
        println!("Source:     {format}");
    }
    if let Some(format) = &report.target_format {
        println!("Target:     {format}");
    }
    for violation in &report.violations {
        println!("Violation:  {violation}");
    }
    for coercion in &report.coercions {
        println!(
            "Coerced:    {}: {} -> {}",
            coercion.path, coercion.from, coercion.to
        );
    }
    if let Some(output) = &report.output {
        println!(
            "Output:     {} ({}, {} elements)",
            output.path.display(),
            format_bytes(output.bytes_written),
            output.elements
        );
    }
    if let Some(remote) = &report.remote_id {
        println!("Published:  {remote}");
    }
}

fn parse_length_unit(value: &str) -> std::result::Result<LengthUnit, String> {
    value.parse().map_err(|e: geocodec::ConvertError| e.to_string())
}

fn parse_compression(value: &str) -> std::result::Result<Compression, String> {
    value.parse().map_err(|e: geocodec::core::ParseCompressionError| e.to_string())
}
