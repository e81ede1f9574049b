// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! Converter configuration file support.
//!
//! Handles parsing of `geocodec.toml` files and environment variable
//! overrides. Every field has a default, so an empty file is valid.
//!
//! ```toml
//! [detection]
//! min_confidence = 0.6
//!
//! [validation]
//! schema_dir = "schemas"
//! treat_warnings_as_errors = false
//! coercion_override = "widening"
//!
//! [gateway]
//! timeout_secs = 10
//!
//! [output]
//! overwrite = true
//! compression = "zstd"
//!
//! [batch]
//! workers = 4
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::options::{ConvertOptions, DEFAULT_GATEWAY_TIMEOUT};
use crate::core::{Compression, ConvertError, Result};
use crate::io::detection::DEFAULT_MIN_CONFIDENCE;
use crate::schema::{CoercionPolicy, SchemaCatalog};

/// Default configuration filename
pub const CONFIG_FILENAME: &str = "geocodec.toml";

/// Environment variable overriding `validation.schema_dir`
pub const ENV_SCHEMA_DIR: &str = "GEOCODEC_SCHEMA_DIR";

/// Environment variable overriding `gateway.timeout_secs`
pub const ENV_GATEWAY_TIMEOUT: &str = "GEOCODEC_GATEWAY_TIMEOUT_SECS";

/// Detection configuration section
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DetectionSection {
    /// Minimum confidence an adapter must reach
    #[serde(default = "default_min_confidence")]
    pub min_confidence: f32,
}

fn default_min_confidence() -> f32 {
    DEFAULT_MIN_CONFIDENCE
}

impl Default for DetectionSection {
    fn default() -> Self {
        Self {
            min_confidence: default_min_confidence(),
        }
    }
}

/// Validation configuration section
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ValidationSection {
    /// Directory of `.json`/`.toml` schema definitions
    #[serde(default)]
    pub schema_dir: Option<PathBuf>,

    #[serde(default)]
    pub treat_warnings_as_errors: bool,

    /// Replaces every schema's coercion policy when set
    #[serde(default)]
    pub coercion_override: Option<CoercionPolicy>,
}

/// Gateway configuration section
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GatewaySection {
    /// Bound on each gateway call, in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: f64,
}

fn default_timeout_secs() -> f64 {
    DEFAULT_GATEWAY_TIMEOUT.as_secs_f64()
}

impl Default for GatewaySection {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout_secs(),
        }
    }
}

/// Output configuration section
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct OutputSection {
    #[serde(default)]
    pub overwrite: bool,

    /// Payload compression for `geocodec-binary` targets
    #[serde(default)]
    pub compression: Compression,
}

/// Batch configuration section
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BatchSection {
    /// Worker threads; 0 uses one per CPU
    #[serde(default)]
    pub workers: usize,
}

/// Main configuration structure
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConverterConfig {
    #[serde(default)]
    pub detection: DetectionSection,

    #[serde(default)]
    pub validation: ValidationSection,

    #[serde(default)]
    pub gateway: GatewaySection,

    #[serde(default)]
    pub output: OutputSection,

    #[serde(default)]
    pub batch: BatchSection,
}

impl ConverterConfig {
    /// Create a new default configuration
    pub fn new() -> Self {
        Self::default()
    }

    /// Load configuration from a file and apply environment overrides.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| ConvertError::io(format!("reading {}", path.display()), &e))?;
        let mut config = Self::parse(&content)?;
        config.apply_env_overrides();
        config.check()?;
        Ok(config)
    }

    /// Parse configuration from a TOML string
    pub fn parse(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content)
            .map_err(|e| ConvertError::config(format!("Failed to parse config: {e}")))?;
        config.check()?;
        Ok(config)
    }

    /// Convert configuration to a TOML string
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self)
            .map_err(|e| ConvertError::config(format!("Failed to serialize config: {e}")))
    }

    /// Apply environment variable overrides
    pub fn apply_env_overrides(&mut self) {
        if let Ok(dir) = std::env::var(ENV_SCHEMA_DIR) {
            self.validation.schema_dir = Some(PathBuf::from(dir));
        }
        if let Some(secs) = std::env::var(ENV_GATEWAY_TIMEOUT)
            .ok()
            .and_then(|s| s.parse::<f64>().ok())
        {
            self.gateway.timeout_secs = secs;
        }
    }

    fn check(&self) -> Result<()> {
        let confidence = self.detection.min_confidence;
        if !(0.0..=1.0).contains(&confidence) {
            return Err(ConvertError::config(format!(
                "detection.min_confidence must be within 0..=1, got {confidence}"
            )));
        }
        let timeout = self.gateway.timeout_secs;
        if !(timeout.is_finite() && timeout > 0.0) {
            return Err(ConvertError::config(format!(
                "gateway.timeout_secs must be positive, got {timeout}"
            )));
        }
        Ok(())
    }

    /// Options for a conversion job.
    pub fn to_options(&self) -> ConvertOptions {
        ConvertOptions::new()
            .with_min_confidence(self.detection.min_confidence)
            .with_warnings_as_errors(self.validation.treat_warnings_as_errors)
            .with_coercion_override(self.validation.coercion_override)
            .with_gateway_timeout(Duration::from_secs_f64(self.gateway.timeout_secs))
            .with_overwrite(self.output.overwrite)
            .with_compression(self.output.compression)
    }

    /// Load the configured schema directory, if any.
    pub fn schema_catalog(&self) -> Result<Option<SchemaCatalog>> {
        self.validation
            .schema_dir
            .as_ref()
            .map(SchemaCatalog::from_dir)
            .transpose()
    }

    /// Worker threads for batch conversion.
    pub fn workers(&self) -> usize {
        match self.batch.workers {
            0 => num_cpus::get(),
            n => n,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_config_uses_defaults() {
        let config = ConverterConfig::parse("").unwrap();
        assert_eq!(config, ConverterConfig::default());
        let options = config.to_options();
        assert_eq!(options.min_confidence, DEFAULT_MIN_CONFIDENCE);
        assert_eq!(options.gateway_timeout, DEFAULT_GATEWAY_TIMEOUT);
        assert!(config.workers() >= 1);
    }

    #[test]
    fn test_parse_sections() {
        let config = ConverterConfig::parse(
            r#"
[detection]
min_confidence = 0.7

[validation]
treat_warnings_as_errors = true
coercion_override = "widening"

[gateway]
timeout_secs = 2.5

[output]
overwrite = true
compression = "lz4"

[batch]
workers = 3
"#,
        )
        .unwrap();
        let options = config.to_options();
        assert_eq!(options.min_confidence, 0.7);
        assert!(options.treat_warnings_as_errors);
        assert_eq!(options.coercion_override, Some(CoercionPolicy::Widening));
        assert_eq!(options.gateway_timeout, Duration::from_millis(2500));
        assert!(options.overwrite);
        assert_eq!(options.compression, Compression::Lz4);
        assert_eq!(config.workers(), 3);
    }

    #[test]
    fn test_unknown_fields_rejected() {
        assert!(ConverterConfig::parse("[output]\nformat = \"las\"\n").is_err());
        assert!(ConverterConfig::parse("[detection]\nmin_confidence = 2.0\n").is_err());
    }

    #[test]
    fn test_to_toml_round_trip() {
        let mut config = ConverterConfig::default();
        config.output.compression = Compression::Zstd;
        let text = config.to_toml().unwrap();
        assert_eq!(ConverterConfig::parse(&text).unwrap(), config);
    }
}
