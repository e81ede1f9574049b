// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! Format detection using file extensions and header sniffing.
//!
//! Adapters combine two signals into a [`Confidence`]:
//! - a matching extension contributes [`EXTENSION_WEIGHT`]
//! - a recognised header (magic bytes or leading keywords) contributes
//!   [`HEADER_WEIGHT`]
//!
//! A matching extension alone therefore stays below the default threshold
//! of 0.5, while a recognised header alone is enough.
//!
//! # Example
//!
//! ```rust,no_run
//! use geocodec::io::detection::detect_format;
//!
//! let detection = detect_format("collars.csv", 0.5)?;
//! assert_eq!(detection.format_id, "csv-points");
//! # Ok::<(), geocodec::ConvertError>(())
//! ```

use std::path::Path;

use tracing::debug;

use crate::core::{ConvertError, Result};

use super::registry::global_registry;
use super::source::SourceHandle;
use super::traits::Confidence;

/// Contribution of a matching extension.
pub const EXTENSION_WEIGHT: f32 = 0.4;

/// Contribution of a recognised header.
pub const HEADER_WEIGHT: f32 = 0.6;

/// Default minimum confidence for automatic selection.
pub const DEFAULT_MIN_CONFIDENCE: f32 = 0.5;

/// One adapter's detection result.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Detection {
    pub format_id: &'static str,
    pub confidence: Confidence,
}

/// Combine extension and header signals.
pub fn score(source: &SourceHandle, extensions: &[&str], header_matches: bool) -> Confidence {
    let ext = source
        .extension()
        .map(|e| extensions.iter().any(|x| *x == e))
        .unwrap_or(false);
    let mut value = 0.0;
    if ext {
        value += EXTENSION_WEIGHT;
    }
    if header_matches {
        value += HEADER_WEIGHT;
    }
    Confidence::new(value)
}

/// Check if the header looks like text.
///
/// Allows UTF-8 with a possibly truncated final character; rejects NUL bytes.
pub fn is_text(header: &[u8]) -> bool {
    if header.contains(&0) {
        return false;
    }
    match std::str::from_utf8(header) {
        Ok(_) => true,
        Err(e) => e.error_len().is_none(),
    }
}

/// Non-empty, trimmed lines of the header that are not comments.
///
/// The last line is dropped when the header was truncated mid-line.
pub fn content_lines<'a>(text: &'a str, comment: &'a str) -> impl Iterator<Item = &'a str> + 'a {
    let complete = match text.rfind('\n') {
        Some(pos) if !text.ends_with('\n') => &text[..pos],
        _ => text,
    };
    complete
        .lines()
        .map(str::trim)
        .filter(move |l| !l.is_empty() && !l.starts_with(comment))
}

/// Pick one format from detections sorted by descending confidence.
///
/// The best candidate must reach `min_confidence` and strictly beat every
/// other candidate at or above it.
pub fn select(
    source: &SourceHandle,
    detections: &[Detection],
    min_confidence: f32,
) -> Result<&'static str> {
    let qualified: Vec<&Detection> = detections
        .iter()
        .filter(|d| d.confidence.value() >= min_confidence)
        .collect();

    match qualified.as_slice() {
        [] => Err(ConvertError::not_found(format!(
            "no format reaches confidence {min_confidence} for {}",
            source.path().display()
        ))),
        [only] => Ok(only.format_id),
        [best, rest @ ..] => {
            let tied: Vec<String> = std::iter::once(*best)
                .chain(rest.iter().copied())
                .filter(|d| d.confidence == best.confidence)
                .map(|d| d.format_id.to_string())
                .collect();
            if tied.len() > 1 {
                Err(ConvertError::AmbiguousFormat {
                    candidates: tied,
                    threshold: min_confidence,
                })
            } else {
                Ok(best.format_id)
            }
        }
    }
}

/// Detect the format of a file using the process-wide registry.
pub fn detect_format<P: AsRef<Path>>(path: P, min_confidence: f32) -> Result<Detection> {
    let source = SourceHandle::open(path)?;
    let detections = global_registry().resolve(&source);
    for d in &detections {
        debug!(format = d.format_id, confidence = %d.confidence, "Detection score");
    }
    let id = select(&source, &detections, min_confidence)?;
    detections
        .into_iter()
        .find(|d| d.format_id == id)
        .ok_or_else(|| ConvertError::not_found(id))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn det(id: &'static str, c: f32) -> Detection {
        Detection {
            format_id: id,
            confidence: Confidence::new(c),
        }
    }

    #[test]
    fn test_score() {
        let source = SourceHandle::from_bytes("a.las", b"~V");
        assert_eq!(score(&source, &["las"], true), Confidence::CERTAIN);
        assert_eq!(score(&source, &["las"], false).value(), EXTENSION_WEIGHT);
        assert_eq!(score(&source, &["obj"], false), Confidence::NONE);
    }

    #[test]
    fn test_is_text() {
        assert!(is_text(b"x,y,z\n1,2,3\n"));
        assert!(!is_text(b"GEOCODEC\0\x01"));
        // truncated multibyte character at the end
        assert!(is_text(&"é".as_bytes()[..1]));
    }

    #[test]
    fn test_content_lines_drop_partial_tail() {
        let lines: Vec<_> = content_lines("# c\nx,y\n\n1,2\n3,", "#").collect();
        assert_eq!(lines, vec!["x,y", "1,2"]);
    }

    #[test]
    fn test_select() {
        let source = SourceHandle::from_bytes("a.dat", b"");
        assert_eq!(
            select(&source, &[det("a", 0.9), det("b", 0.6)], 0.5).unwrap(),
            "a"
        );
        assert!(matches!(
            select(&source, &[det("a", 0.4)], 0.5),
            Err(ConvertError::NotFound { .. })
        ));
        match select(&source, &[det("a", 0.6), det("b", 0.6), det("c", 0.2)], 0.5) {
            Err(ConvertError::AmbiguousFormat { candidates, .. }) => {
                assert_eq!(candidates, vec!["a", "b"]);
            }
            other => panic!("expected ambiguity, got {other:?}"),
        }
    }
}
