// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! Common utilities for CLI commands.

use std::io::IsTerminal as _;
use std::path::Path;
use std::sync::Arc;

use anyhow::{anyhow, Context as _};
use tracing_subscriber::EnvFilter;

use geocodec::convert::ConverterConfig;
use geocodec::io::{global_registry, CancellationToken, SourceHandle};
use geocodec::schema::{SchemaDefinition, SchemaProvider as _, SchemaVersion};
use geocodec::CanonicalModel;

pub use anyhow::Result as CliResult;
pub type Result<T = ()> = CliResult<T>;

/// Crate targets that receive log output.
const CRATE_TARGETS: &[&str] = &["geocodec"];

/// Initialize tracing based on CLI verbosity level.
///
/// Mapping:
/// - 0 (none) -> warn
/// - 1 (-v)   -> info
/// - 2 (-vv)  -> debug
/// - 3+ (-vvv)-> trace
///
/// `RUST_LOG` env var overrides the CLI flag if set. Logs go to stderr so
/// command output on stdout stays machine-readable.
pub fn init_logging(verbosity: u8) {
    let level = match verbosity {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    let default_filter: String = CRATE_TARGETS
        .iter()
        .map(|t| format!("{t}={level}"))
        .collect::<Vec<_>>()
        .join(",");

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

/// Format a byte count to a human-readable string.
pub fn format_bytes(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["B", "KiB", "MiB", "GiB"];
    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    if unit == 0 {
        format!("{bytes} B")
    } else {
        format!("{value:.1} {}", UNITS[unit])
    }
}

/// Parse an `old=new` rename rule.
pub fn parse_rename(rule: &str) -> Result<(String, String)> {
    match rule.split_once('=') {
        Some((from, to)) if !from.is_empty() && !to.is_empty() => {
            Ok((from.to_string(), to.to_string()))
        }
        _ => Err(anyhow!("Invalid rename '{rule}', expected old=new")),
    }
}

/// Load a config file, or defaults when none is given.
pub fn load_config(path: Option<&Path>) -> Result<ConverterConfig> {
    match path {
        Some(path) => ConverterConfig::load(path)
            .with_context(|| format!("loading config {}", path.display())),
        None => {
            let mut config = ConverterConfig::default();
            config.apply_env_overrides();
            Ok(config)
        }
    }
}

/// Resolve a schema argument.
///
/// An existing file path is loaded directly; anything else is looked up
/// as `id` or `id@major.minor.patch` in the configured schema directory.
pub fn load_schema(name: &str, config: &ConverterConfig) -> Result<Arc<SchemaDefinition>> {
    let path = Path::new(name);
    if path.is_file() {
        let schema = SchemaDefinition::from_path(path)
            .with_context(|| format!("loading schema {}", path.display()))?;
        return Ok(Arc::new(schema));
    }

    let catalog = config
        .schema_catalog()?
        .ok_or_else(|| anyhow!("Schema '{name}' is not a file and no schema_dir is configured"))?;
    let (id, version) = match name.split_once('@') {
        Some((id, version)) => (id, Some(version.parse::<SchemaVersion>()?)),
        None => (name, None),
    };
    Ok(catalog.schema(id, version)?)
}

/// Read a model, detecting its format unless `format` is given.
///
/// Returns the format id alongside the model.
pub fn read_model(
    path: &Path,
    format: Option<&str>,
    min_confidence: f32,
) -> Result<(String, CanonicalModel)> {
    let registry = global_registry();
    let format_id = match format {
        Some(id) => id.to_string(),
        None => geocodec::io::detect_format(path, min_confidence)?
            .format_id
            .to_string(),
    };
    let adapter = registry.lookup(&format_id)?;
    let source = SourceHandle::open(path)?;
    let model = adapter.read(&source, &CancellationToken::new())?;
    Ok((format_id, model))
}

/// Progress bar wrapper for consistent progress reporting.
pub struct ProgressBar {
    inner: Option<indicatif::ProgressBar>,
}

impl ProgressBar {
    /// Create a new progress bar; hidden when stderr is not a terminal.
    pub fn new(total: u64, prefix: impl Into<String>) -> Self {
        let inner = if std::io::stderr().is_terminal() {
            let pb = indicatif::ProgressBar::new(total);
            if let Ok(style) = indicatif::ProgressStyle::default_bar()
                .template("{prefix} [{elapsed_precise}] [{wide_bar:.cyan/blue}] {pos}/{len} {msg}")
            {
                pb.set_style(style.progress_chars("=>-"));
            }
            pb.set_prefix(prefix.into());
            Some(pb)
        } else {
            None
        };

        Self { inner }
    }

    /// Advance by one and show `msg`.
    pub fn inc(&self, msg: String) {
        if let Some(pb) = &self.inner {
            pb.set_message(msg);
            pb.inc(1);
        }
    }

    /// Finish the progress bar with a message.
    pub fn finish_with_message(&self, msg: String) {
        if let Some(pb) = &self.inner {
            pb.finish_with_message(msg);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_bytes() {
        assert_eq!(format_bytes(512), "512 B");
        assert_eq!(format_bytes(1536), "1.5 KiB");
        assert_eq!(format_bytes(3 * 1024 * 1024), "3.0 MiB");
    }

    #[test]
    fn test_parse_rename() {
        assert_eq!(
            parse_rename("AU=au").unwrap(),
            ("AU".to_string(), "au".to_string())
        );
        assert!(parse_rename("AU").is_err());
        assert!(parse_rename("=au").is_err());
    }
}
