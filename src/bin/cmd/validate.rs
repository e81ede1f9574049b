// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! Validate command - check a file against a schema without converting it.

use std::path::PathBuf;

use anyhow::bail;
use clap::Args;

use crate::common::{load_config, load_schema, read_model, Result};
use geocodec::schema::{CoercionPolicy, SchemaValidator};

/// Validate a file against a schema.
#[derive(Args, Clone, Debug)]
pub struct ValidateCmd {
    /// Input file
    #[arg(value_name = "FILE")]
    input: PathBuf,

    /// Schema file, or `id[@version]` from the configured schema directory
    #[arg(short, long, value_name = "SCHEMA")]
    schema: String,

    /// Input format (detected when omitted)
    #[arg(long, value_name = "FORMAT")]
    from: Option<String>,

    /// Configuration file
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Fail on warnings as well as errors
    #[arg(long)]
    warnings_as_errors: bool,

    /// Allow lossless type widening regardless of the schema
    #[arg(long)]
    widen: bool,
}

impl ValidateCmd {
    pub fn run(self) -> Result<()> {
        let config = load_config(self.config.as_deref())?;
        let schema = load_schema(&self.schema, &config)?;
        let (_, model) = read_model(
            &self.input,
            self.from.as_deref(),
            config.detection.min_confidence,
        )?;

        let coercion = if self.widen {
            Some(CoercionPolicy::Widening)
        } else {
            config.validation.coercion_override
        };
        let validation = SchemaValidator::new()
            .treat_warnings_as_errors(
                self.warnings_as_errors || config.validation.treat_warnings_as_errors,
            )
            .with_coercion_override(coercion)
            .validate(&model, &schema);

        for violation in validation.violations() {
            println!("{violation}");
        }

        if !validation.is_valid() {
            bail!(
                "{} does not conform to {}",
                self.input.display(),
                schema.qualified_name()
            );
        }

        let validated = validation.into_result()?;
        for coercion in &validated.coercions {
            println!(
                "coerced {}: {} -> {}",
                coercion.path, coercion.from, coercion.to
            );
        }
        println!(
            "{} conforms to {}",
            self.input.display(),
            schema.qualified_name()
        );
        Ok(())
    }
}
