// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! Core types used throughout geocodec.
//!
//! This module provides the foundational types for the library:
//! - [`ConvertError`] - Error taxonomy shared by every stage
//! - [`Compression`] - Payload compression identifier for binary formats

pub mod error;

pub use error::{ConvertError, Location, Result};

use serde::{Deserialize, Serialize};

/// Payload compression identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Compression {
    /// Stored as-is
    #[default]
    None,
    /// Zstandard
    Zstd,
    /// LZ4 block format
    Lz4,
}

/// Error returned when parsing a `Compression` from string fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParseCompressionError {
    _private: (),
}

impl std::fmt::Display for ParseCompressionError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "invalid compression name, expected 'none', 'zstd', or 'lz4'"
        )
    }
}

impl std::error::Error for ParseCompressionError {}

impl std::str::FromStr for Compression {
    type Err = ParseCompressionError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "none" => Ok(Compression::None),
            "zstd" | "zst" => Ok(Compression::Zstd),
            "lz4" => Ok(Compression::Lz4),
            _ => Err(ParseCompressionError { _private: () }),
        }
    }
}

impl Compression {
    /// Flag value stored in binary headers.
    pub fn as_flag(&self) -> u16 {
        match self {
            Compression::None => 0,
            Compression::Zstd => 1,
            Compression::Lz4 => 2,
        }
    }

    /// Parse a flag value stored in binary headers.
    pub fn from_flag(flag: u16) -> Option<Self> {
        match flag {
            0 => Some(Compression::None),
            1 => Some(Compression::Zstd),
            2 => Some(Compression::Lz4),
            _ => None,
        }
    }

    /// Convert to string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Compression::None => "none",
            Compression::Zstd => "zstd",
            Compression::Lz4 => "lz4",
        }
    }
}
