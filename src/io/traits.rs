// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! Core traits for format adapters.
//!
//! Every supported file format implements [`FormatAdapter`]. The registry
//! dispatches through `Arc<dyn FormatAdapter>` trait objects, so adding a
//! format never requires touching the orchestrator.

use std::fmt;
use std::path::{Path, PathBuf};

use crate::core::Result;
use crate::model::CanonicalModel;

use super::cancel::CancellationToken;
use super::source::SourceHandle;

/// Likelihood that a source matches an adapter's format, in `0.0..=1.0`.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default)]
pub struct Confidence(f32);

impl Confidence {
    /// The source is certainly not in this format.
    pub const NONE: Confidence = Confidence(0.0);
    /// The source is certainly in this format.
    pub const CERTAIN: Confidence = Confidence(1.0);

    /// Create a confidence, clamped to `0.0..=1.0`. NaN maps to zero.
    pub fn new(value: f32) -> Self {
        if value.is_nan() {
            Confidence::NONE
        } else {
            Confidence(value.clamp(0.0, 1.0))
        }
    }

    /// Numeric value.
    pub fn value(&self) -> f32 {
        self.0
    }

    /// Check if the score is zero.
    pub fn is_none(&self) -> bool {
        self.0 <= 0.0
    }
}

impl fmt::Display for Confidence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.2}", self.0)
    }
}

/// What a successful write produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WriteSummary {
    /// Final path of the written file
    pub path: PathBuf,
    /// Number of bytes written
    pub bytes_written: u64,
    /// Number of primary geometry elements written
    pub elements: usize,
}

/// Trait implemented by every supported file format.
///
/// # Example
///
/// ```no_run
/// use geocodec::io::{FormatAdapter, SourceHandle};
///
/// fn describe(adapter: &dyn FormatAdapter, source: &SourceHandle) {
///     println!("{}: {}", adapter.format_id(), adapter.detect(source));
/// }
/// ```
pub trait FormatAdapter: Send + Sync {
    /// Stable format identifier, e.g. `"las"`.
    fn format_id(&self) -> &'static str;

    /// One-line human-readable description.
    fn description(&self) -> &'static str;

    /// Lower-case file extensions without the dot.
    fn extensions(&self) -> &'static [&'static str];

    /// Information that does not survive a write/read round trip.
    fn lossy_features(&self) -> &'static [&'static str] {
        &[]
    }

    /// Score how likely `source` is in this format.
    ///
    /// Inspects only the path and preloaded header bytes; never opens the
    /// file and never fails.
    fn detect(&self, source: &SourceHandle) -> Confidence;

    /// Parse `source` into a sealed canonical model.
    fn read(&self, source: &SourceHandle, cancel: &CancellationToken) -> Result<CanonicalModel>;

    /// Serialize `model` to `target`.
    ///
    /// Either the whole file is written or `target` does not exist
    /// afterwards. Models with no representation in this format are
    /// rejected with `UnsupportedFeature` before any byte is written.
    fn write(
        &self,
        model: &CanonicalModel,
        target: &Path,
        cancel: &CancellationToken,
    ) -> Result<WriteSummary>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_confidence_clamped() {
        assert_eq!(Confidence::new(1.7), Confidence::CERTAIN);
        assert_eq!(Confidence::new(-0.2), Confidence::NONE);
        assert_eq!(Confidence::new(f32::NAN), Confidence::NONE);
        assert!(Confidence::new(0.6) > Confidence::new(0.4));
        assert_eq!(Confidence::new(0.5).to_string(), "0.50");
    }
}
