// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! Conversion requests and the options shared by every job.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use super::gateway::RemoteObjectId;
use crate::core::Compression;
use crate::io::detection::DEFAULT_MIN_CONFIDENCE;
use crate::io::CancellationToken;
use crate::schema::{CoercionPolicy, SchemaDefinition};
use crate::transform::MultiTransform;

/// Default bound on every gateway call.
pub const DEFAULT_GATEWAY_TIMEOUT: Duration = Duration::from_secs(30);

/// Options for conversion jobs.
#[derive(Clone, Debug)]
pub struct ConvertOptions {
    /// Minimum detection confidence for auto-detection
    pub min_confidence: f32,

    /// Escalate warning-level violations to errors
    pub treat_warnings_as_errors: bool,

    /// Replaces the schema's coercion policy when set
    pub coercion_override: Option<CoercionPolicy>,

    /// Bound on each gateway call
    pub gateway_timeout: Duration,

    /// Replace an existing target file
    pub overwrite: bool,

    /// Payload compression for `geocodec-binary` targets
    pub compression: Compression,

    /// Optional transformation pipeline run between validation passes.
    /// If None, no transformations are applied.
    pub transforms: Option<MultiTransform>,

    /// Cancellation observed by reads and writes
    pub cancel: CancellationToken,
}

impl Default for ConvertOptions {
    fn default() -> Self {
        Self {
            min_confidence: DEFAULT_MIN_CONFIDENCE,
            treat_warnings_as_errors: false,
            coercion_override: None,
            gateway_timeout: DEFAULT_GATEWAY_TIMEOUT,
            overwrite: false,
            compression: Compression::None,
            transforms: None,
            cancel: CancellationToken::new(),
        }
    }
}

impl ConvertOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_min_confidence(mut self, min_confidence: f32) -> Self {
        self.min_confidence = min_confidence;
        self
    }

    pub fn with_warnings_as_errors(mut self, enabled: bool) -> Self {
        self.treat_warnings_as_errors = enabled;
        self
    }

    pub fn with_coercion_override(mut self, policy: Option<CoercionPolicy>) -> Self {
        self.coercion_override = policy;
        self
    }

    pub fn with_gateway_timeout(mut self, timeout: Duration) -> Self {
        self.gateway_timeout = timeout;
        self
    }

    pub fn with_overwrite(mut self, overwrite: bool) -> Self {
        self.overwrite = overwrite;
        self
    }

    pub fn with_compression(mut self, compression: Compression) -> Self {
        self.compression = compression;
        self
    }

    /// Add a transform pipeline to the options.
    pub fn with_transforms(mut self, pipeline: MultiTransform) -> Self {
        self.transforms = Some(pipeline);
        self
    }

    /// Use an externally owned cancellation token.
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Check if transformations are configured.
    pub fn has_transforms(&self) -> bool {
        self.transforms.as_ref().is_some_and(|p| !p.is_empty())
    }
}

/// Where a job reads its model from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConversionSource {
    /// A local file, read through a format adapter
    File(PathBuf),
    /// An object fetched through the gateway
    Remote(RemoteObjectId),
}

/// Where a job delivers its model. At least one side must be set.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConversionTarget {
    /// Local target file
    pub local: Option<PathBuf>,
    /// Gateway upload destination
    pub remote: Option<String>,
}

impl ConversionTarget {
    pub fn local(path: impl Into<PathBuf>) -> Self {
        Self {
            local: Some(path.into()),
            remote: None,
        }
    }

    pub fn remote(destination: impl Into<String>) -> Self {
        Self {
            local: None,
            remote: Some(destination.into()),
        }
    }

    /// Also upload to `destination`.
    pub fn and_remote(mut self, destination: impl Into<String>) -> Self {
        self.remote = Some(destination.into());
        self
    }
}

/// One conversion job.
#[derive(Debug, Clone)]
pub struct ConversionRequest {
    pub source: ConversionSource,
    pub target: ConversionTarget,
    /// Source format id; detected when `None`
    pub source_format: Option<String>,
    /// Target format id; chosen by target extension when `None`
    pub target_format: Option<String>,
    /// Schema to validate against; validation passes trivially when `None`
    pub schema: Option<Arc<SchemaDefinition>>,
    pub options: ConvertOptions,
}

impl ConversionRequest {
    /// Convert a local file into another local file.
    pub fn new(input: impl Into<PathBuf>, output: impl Into<PathBuf>) -> Self {
        Self::with_target(
            ConversionSource::File(input.into()),
            ConversionTarget::local(output),
        )
    }

    pub fn with_target(source: ConversionSource, target: ConversionTarget) -> Self {
        Self {
            source,
            target,
            source_format: None,
            target_format: None,
            schema: None,
            options: ConvertOptions::default(),
        }
    }

    pub fn with_source_format(mut self, format: impl Into<String>) -> Self {
        self.source_format = Some(format.into());
        self
    }

    pub fn with_target_format(mut self, format: impl Into<String>) -> Self {
        self.target_format = Some(format.into());
        self
    }

    pub fn with_schema(mut self, schema: Arc<SchemaDefinition>) -> Self {
        self.schema = Some(schema);
        self
    }

    pub fn with_options(mut self, options: ConvertOptions) -> Self {
        self.options = options;
        self
    }
}
