// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! Batch command - convert every file in a directory in parallel.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context as _};
use clap::Args;

use super::convert::with_transforms;
use crate::common::{load_config, load_schema, ProgressBar, Result};
use geocodec::convert::{ConversionRequest, ConversionSource, Orchestrator};
use geocodec::model::LengthUnit;
use geocodec::global_registry;

/// Convert all files in a directory.
#[derive(Args, Clone, Debug)]
pub struct BatchCmd {
    /// Input directory
    #[arg(value_name = "INPUT_DIR")]
    input_dir: PathBuf,

    /// Output directory, created if missing
    #[arg(value_name = "OUTPUT_DIR")]
    output_dir: PathBuf,

    /// Output format
    #[arg(long, value_name = "FORMAT")]
    to: String,

    /// Schema file, or `id[@version]` from the configured schema directory
    #[arg(short, long, value_name = "SCHEMA")]
    schema: Option<String>,

    /// Configuration file
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Worker threads (defaults to the config, then the CPU count)
    #[arg(short = 'j', long)]
    workers: Option<usize>,

    /// Replace existing output files
    #[arg(long)]
    overwrite: bool,

    /// Rename an attribute, `old=new`; `*` matches any run of characters
    #[arg(long = "rename", value_name = "OLD=NEW")]
    renames: Vec<String>,

    /// Convert coordinates and depths to this length unit
    #[arg(long, value_name = "UNIT")]
    to_unit: Option<String>,
}

impl BatchCmd {
    pub fn run(self) -> Result<()> {
        let config = load_config(self.config.as_deref())?;
        let registry = global_registry();
        let target = registry.lookup(&self.to)?;
        let extension = target.extensions().first().copied().unwrap_or(target.format_id());

        let to_unit = self
            .to_unit
            .as_deref()
            .map(str::parse::<LengthUnit>)
            .transpose()?;

        let mut options = config.to_options();
        if self.overwrite {
            options = options.with_overwrite(true);
        }
        options = with_transforms(options, &self.renames, to_unit)?;
        let schema = self
            .schema
            .as_deref()
            .map(|s| load_schema(s, &config))
            .transpose()?;

        std::fs::create_dir_all(&self.output_dir)
            .with_context(|| format!("creating {}", self.output_dir.display()))?;

        let inputs = list_inputs(&self.input_dir)?;
        if inputs.is_empty() {
            bail!("No input files in {}", self.input_dir.display());
        }

        let requests: Vec<ConversionRequest> = inputs
            .iter()
            .map(|input| {
                let stem = input
                    .file_stem()
                    .map(|s| s.to_string_lossy().into_owned())
                    .unwrap_or_default();
                let output = self.output_dir.join(format!("{stem}.{extension}"));
                let mut request = ConversionRequest::new(input, output)
                    .with_target_format(self.to.as_str())
                    .with_options(options.clone());
                if let Some(schema) = &schema {
                    request = request.with_schema(schema.clone());
                }
                request
            })
            .collect();

        let workers = self.workers.unwrap_or_else(|| config.workers());
        let progress = ProgressBar::new(requests.len() as u64, "Converting");
        let reports = Orchestrator::default().convert_batch_with(&requests, workers, |report| {
            let name = report
                .output_path()
                .and_then(|p| p.file_name())
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| report.state.to_string());
            progress.inc(name);
        })?;

        let mut failed = 0usize;
        for (request, report) in requests.iter().zip(&reports) {
            let input = request_input(request);
            match &report.error {
                None => println!("ok      {input}"),
                Some(e) => {
                    failed += 1;
                    println!("failed  {input}: {e}");
                }
            }
        }
        progress.finish_with_message(format!(
            "{} converted, {failed} failed",
            reports.len() - failed
        ));

        println!(
            "{} of {} files converted",
            reports.len() - failed,
            reports.len()
        );
        if failed > 0 {
            bail!("{failed} conversion(s) failed");
        }
        Ok(())
    }
}

fn request_input(request: &ConversionRequest) -> String {
    match &request.source {
        ConversionSource::File(path) => path.display().to_string(),
        ConversionSource::Remote(id) => id.to_string(),
    }
}

/// Regular files directly under `dir`, sorted; hidden files are skipped.
fn list_inputs(dir: &Path) -> Result<Vec<PathBuf>> {
    let entries =
        std::fs::read_dir(dir).with_context(|| format!("reading {}", dir.display()))?;
    let mut inputs: Vec<PathBuf> = entries
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| path.is_file())
        .filter(|path| {
            !path
                .file_name()
                .map(|n| n.to_string_lossy().starts_with('.'))
                .unwrap_or(true)
        })
        .collect();
    inputs.sort();
    Ok(inputs)
}
