// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! Native binary container (`geocodec-binary`).
//!
//! The container is lossless: every field of the canonical model reads back
//! exactly, including NaN payloads and categorical lookup tables.
//!
//! # Layout
//!
//! All integers are little-endian.
//!
//! ```text
//! magic        8 bytes  "GEOCODEC"
//! version      u16
//! flags        u16      compression (0 none, 1 zstd, 2 lz4)
//! header_len   u32
//! header       JSON     name, CRS, provenance, properties, array shapes
//! raw_len      u64      payload length before compression
//! payload_len  u64
//! payload      bytes    geometry arrays, then attribute arrays in header order
//! crc32        u32      over every preceding byte
//! ```

mod reader;
mod writer;

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::core::{Compression, Result};
use crate::io::cancel::CancellationToken;
use crate::io::detection::score;
use crate::io::source::SourceHandle;
use crate::io::traits::{Confidence, FormatAdapter, WriteSummary};
use crate::model::{AttributeLocation, CanonicalModel, Crs, DataType, Point3, Provenance, RegularGrid};

pub use reader::decode;
pub use writer::encode;

pub(crate) const FORMAT: &str = "geocodec-binary";

/// File magic.
pub const MAGIC: &[u8; 8] = b"GEOCODEC";

/// Current container version.
pub const VERSION: u16 = 1;

/// Bytes before the JSON header.
pub(crate) const PREAMBLE_LEN: usize = 16;

/// Array shapes stored in the JSON header.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub(crate) enum GeometryHeader {
    PointSet { vertices: u64 },
    LineSet { vertices: u64, segments: u64 },
    Surface { vertices: u64, triangles: u64 },
    Grid(RegularGrid),
    WellLog { collar: Point3, samples: u64 },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub(crate) struct AttributeHeader {
    pub name: String,
    pub location: AttributeLocation,
    pub data_type: DataType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub len: u64,
    /// Categorical code to label table
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lookup: Option<BTreeMap<i32, String>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub(crate) struct FileHeader {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub crs: Crs,
    pub provenance: Provenance,
    #[serde(default)]
    pub properties: BTreeMap<String, String>,
    pub geometry: GeometryHeader,
    #[serde(default)]
    pub attributes: Vec<AttributeHeader>,
}

/// Adapter for the native binary container.
#[derive(Debug, Clone, Copy, Default)]
pub struct BinaryAdapter {
    compression: Compression,
}

impl BinaryAdapter {
    /// Create an adapter that writes with the given payload compression.
    pub fn new(compression: Compression) -> Self {
        Self { compression }
    }

    /// Payload compression used on write.
    pub fn compression(&self) -> Compression {
        self.compression
    }
}

impl FormatAdapter for BinaryAdapter {
    fn format_id(&self) -> &'static str {
        FORMAT
    }

    fn description(&self) -> &'static str {
        "Lossless native binary container"
    }

    fn extensions(&self) -> &'static [&'static str] {
        &["gcb"]
    }

    fn detect(&self, source: &SourceHandle) -> Confidence {
        score(source, self.extensions(), source.header().starts_with(MAGIC))
    }

    fn read(&self, source: &SourceHandle, cancel: &CancellationToken) -> Result<CanonicalModel> {
        reader::read_file(source, cancel)
    }

    fn write(
        &self,
        model: &CanonicalModel,
        target: &Path,
        cancel: &CancellationToken,
    ) -> Result<WriteSummary> {
        writer::write_file(model, target, self.compression, cancel)
    }
}
