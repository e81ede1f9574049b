// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! Core error types for geocodec.
//!
//! Every stage of a conversion surfaces one of these variants:
//! - Format parsing and unsupported constructs (adapters)
//! - Schema mismatches (model builder and validator)
//! - Detection and registry lookups
//! - I/O, cancellation, and object-store gateway failures
//!
//! Errors are `Clone` so a job report can keep the originating error.

use std::fmt;
use std::time::Duration;

/// Where in a source a parse error occurred.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Location {
    /// 1-based line number in a text format.
    Line(usize),
    /// Byte offset in a binary format.
    Offset(u64),
    /// No positional context.
    Unknown,
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Location::Line(line) => write!(f, "line {line}"),
            Location::Offset(offset) => write!(f, "byte {offset}"),
            Location::Unknown => write!(f, "unknown position"),
        }
    }
}

/// Errors that can occur while converting geoscience data.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ConvertError {
    /// Malformed input
    #[error("Parse error in {format} at {location}: {message}")]
    FormatParse {
        /// Format identifier of the adapter that failed
        format: String,
        /// Position of the failure
        location: Location,
        /// Error message
        message: String,
    },

    /// The input or model uses a construct the format cannot map losslessly
    #[error("Unsupported feature in {format}: {feature}")]
    UnsupportedFeature {
        /// Format identifier
        format: String,
        /// What is not supported
        feature: String,
    },

    /// Geometry, attribute, or schema contract violated
    #[error("Schema mismatch at '{path}': {reason}")]
    SchemaMismatch {
        /// Dot path into the model
        path: String,
        /// Human-readable reason
        reason: String,
    },

    /// More than one adapter claims the source with equal confidence
    #[error("Ambiguous format: {candidates:?} tie at or above confidence {threshold}")]
    AmbiguousFormat {
        /// Tied format identifiers, in registration order
        candidates: Vec<String>,
        /// Minimum confidence used for detection
        threshold: f32,
    },

    /// Stream or filesystem failure
    #[error("I/O error during {context}: {message}")]
    Io {
        /// What was being done
        context: String,
        /// Kind of the underlying error
        kind: std::io::ErrorKind,
        /// Error message
        message: String,
    },

    /// Object-store gateway did not answer in time
    ///
    /// The call is not aborted. It keeps running detached, so an upload may
    /// still land in the store after the job has failed with this error.
    #[error("Gateway {operation} timed out after {timeout:?}")]
    GatewayTimeout {
        /// Gateway operation ("upload" or "fetch")
        operation: String,
        /// Timeout that expired
        timeout: Duration,
    },

    /// Object-store gateway reported a failure
    #[error("Gateway {operation} failed: {message}")]
    Gateway {
        /// Gateway operation
        operation: String,
        /// Error message
        message: String,
    },

    /// Unknown format identifier
    #[error("Format not found: '{format}'")]
    NotFound {
        /// Identifier or description of what was looked up
        format: String,
    },

    /// The job's cancellation token fired
    #[error("Cancelled during {stage}")]
    Cancelled {
        /// Stage that observed the cancellation
        stage: String,
    },

    /// A model transform failed
    #[error("Transform error: {message}")]
    Transform {
        /// Error message
        message: String,
    },

    /// Invalid configuration or schema document
    #[error("Configuration error: {message}")]
    Config {
        /// Error message
        message: String,
    },
}

impl ConvertError {
    /// Create a parse error.
    pub fn parse(format: impl Into<String>, location: Location, message: impl Into<String>) -> Self {
        ConvertError::FormatParse {
            format: format.into(),
            location,
            message: message.into(),
        }
    }

    /// Create a parse error at a text line.
    pub fn parse_at_line(format: impl Into<String>, line: usize, message: impl Into<String>) -> Self {
        Self::parse(format, Location::Line(line), message)
    }

    /// Create a parse error at a byte offset.
    pub fn parse_at_offset(
        format: impl Into<String>,
        offset: u64,
        message: impl Into<String>,
    ) -> Self {
        Self::parse(format, Location::Offset(offset), message)
    }

    /// Create an unsupported feature error.
    pub fn unsupported(format: impl Into<String>, feature: impl Into<String>) -> Self {
        ConvertError::UnsupportedFeature {
            format: format.into(),
            feature: feature.into(),
        }
    }

    /// Create a schema mismatch error.
    pub fn schema_mismatch(path: impl Into<String>, reason: impl Into<String>) -> Self {
        ConvertError::SchemaMismatch {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Create an I/O error with context.
    pub fn io(context: impl Into<String>, err: &std::io::Error) -> Self {
        ConvertError::Io {
            context: context.into(),
            kind: err.kind(),
            message: err.to_string(),
        }
    }

    /// Create a "format not found" error.
    pub fn not_found(format: impl Into<String>) -> Self {
        ConvertError::NotFound {
            format: format.into(),
        }
    }

    /// Create a gateway error.
    pub fn gateway(operation: impl Into<String>, message: impl Into<String>) -> Self {
        ConvertError::Gateway {
            operation: operation.into(),
            message: message.into(),
        }
    }

    /// Create a cancellation error.
    pub fn cancelled(stage: impl Into<String>) -> Self {
        ConvertError::Cancelled {
            stage: stage.into(),
        }
    }

    /// Create a transform error.
    pub fn transform(message: impl Into<String>) -> Self {
        ConvertError::Transform {
            message: message.into(),
        }
    }

    /// Create a configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        ConvertError::Config {
            message: message.into(),
        }
    }

    /// Short stable name of the error kind, for reports and logs.
    pub fn kind_name(&self) -> &'static str {
        match self {
            ConvertError::FormatParse { .. } => "FormatParseError",
            ConvertError::UnsupportedFeature { .. } => "UnsupportedFeatureError",
            ConvertError::SchemaMismatch { .. } => "SchemaMismatchError",
            ConvertError::AmbiguousFormat { .. } => "AmbiguousFormatError",
            ConvertError::Io { .. } => "IOError",
            ConvertError::GatewayTimeout { .. } => "GatewayTimeoutError",
            ConvertError::Gateway { .. } => "GatewayError",
            ConvertError::NotFound { .. } => "NotFoundError",
            ConvertError::Cancelled { .. } => "CancelledError",
            ConvertError::Transform { .. } => "TransformError",
            ConvertError::Config { .. } => "ConfigError",
        }
    }

    /// Get structured fields for logging.
    pub fn log_fields(&self) -> Vec<(&'static str, String)> {
        match self {
            ConvertError::FormatParse {
                format,
                location,
                message,
            } => vec![
                ("format", format.clone()),
                ("location", location.to_string()),
                ("message", message.clone()),
            ],
            ConvertError::UnsupportedFeature { format, feature } => {
                vec![("format", format.clone()), ("feature", feature.clone())]
            }
            ConvertError::SchemaMismatch { path, reason } => {
                vec![("path", path.clone()), ("reason", reason.clone())]
            }
            ConvertError::AmbiguousFormat {
                candidates,
                threshold,
            } => vec![
                ("candidates", candidates.join(",")),
                ("threshold", threshold.to_string()),
            ],
            ConvertError::Io {
                context, message, ..
            } => vec![("context", context.clone()), ("message", message.clone())],
            ConvertError::GatewayTimeout { operation, timeout } => vec![
                ("operation", operation.clone()),
                ("timeout_ms", timeout.as_millis().to_string()),
            ],
            ConvertError::Gateway { operation, message } => {
                vec![("operation", operation.clone()), ("message", message.clone())]
            }
            ConvertError::NotFound { format } => vec![("format", format.clone())],
            ConvertError::Cancelled { stage } => vec![("stage", stage.clone())],
            ConvertError::Transform { message } | ConvertError::Config { message } => {
                vec![("message", message.clone())]
            }
        }
    }
}

impl From<std::io::Error> for ConvertError {
    fn from(err: std::io::Error) -> Self {
        ConvertError::io("io", &err)
    }
}

/// Result type for geocodec operations.
pub type Result<T> = std::result::Result<T, ConvertError>;
