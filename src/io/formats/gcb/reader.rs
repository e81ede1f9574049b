// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! Container decoding.

use std::fs::File;
use std::io::{Cursor, Read};

use byteorder::{ByteOrder, LittleEndian, ReadBytesExt};
use tracing::debug;

use super::{FileHeader, GeometryHeader, FORMAT, MAGIC, PREAMBLE_LEN, VERSION};
use crate::core::{Compression, ConvertError, Result};
use crate::io::cancel::CancellationToken;
use crate::io::formats::CANCEL_CHECK_INTERVAL;
use crate::io::source::SourceHandle;
use crate::model::{
    Attribute, AttributeValues, CanonicalModel, DataType, Geometry, ModelBuilder, Point3,
    WellTrajectory,
};

/// Bytes after the JSON header and before the payload.
const LENGTHS_LEN: usize = 16;
const CRC_LEN: usize = 4;

pub(super) fn read_file(source: &SourceHandle, cancel: &CancellationToken) -> Result<CanonicalModel> {
    let context = format!("reading {}", source.path().display());
    let file = File::open(source.path()).map_err(|e| ConvertError::io(&context, &e))?;
    let len = file
        .metadata()
        .map_err(|e| ConvertError::io(&context, &e))?
        .len();
    if len == 0 {
        return Err(ConvertError::parse_at_offset(FORMAT, 0, "empty file"));
    }
    let mmap = unsafe { memmap2::Mmap::map(&file) }.map_err(|e| ConvertError::io(&context, &e))?;
    decode(&mmap[..], cancel)
}

/// Decode a complete container.
pub fn decode(bytes: &[u8], cancel: &CancellationToken) -> Result<CanonicalModel> {
    if bytes.len() < PREAMBLE_LEN || &bytes[..MAGIC.len()] != MAGIC {
        return Err(ConvertError::parse_at_offset(FORMAT, 0, "missing GEOCODEC magic"));
    }
    let mut cursor = Cursor::new(&bytes[MAGIC.len()..PREAMBLE_LEN]);
    let version = cursor.read_u16::<LittleEndian>()?;
    let flags = cursor.read_u16::<LittleEndian>()?;
    let header_len = cursor.read_u32::<LittleEndian>()? as usize;

    if version > VERSION {
        return Err(ConvertError::unsupported(
            FORMAT,
            format!("container version {version} (newest supported is {VERSION})"),
        ));
    }
    let compression = Compression::from_flag(flags)
        .ok_or_else(|| ConvertError::unsupported(FORMAT, format!("compression flag {flags}")))?;

    let lengths_at = PREAMBLE_LEN + header_len;
    let payload_at = lengths_at + LENGTHS_LEN;
    if bytes.len() < payload_at + CRC_LEN {
        return Err(ConvertError::parse_at_offset(
            FORMAT,
            bytes.len() as u64,
            "truncated header",
        ));
    }
    let mut cursor = Cursor::new(&bytes[lengths_at..payload_at]);
    let raw_len = cursor.read_u64::<LittleEndian>()?;
    let payload_len = cursor.read_u64::<LittleEndian>()?;
    let expected = (payload_at as u64)
        .checked_add(payload_len)
        .and_then(|n| n.checked_add(CRC_LEN as u64));
    if expected != Some(bytes.len() as u64) {
        return Err(ConvertError::parse_at_offset(
            FORMAT,
            lengths_at as u64 + 8,
            format!(
                "payload length {payload_len} does not match file size {}",
                bytes.len()
            ),
        ));
    }

    let crc_at = bytes.len() - CRC_LEN;
    let stored_crc = LittleEndian::read_u32(&bytes[crc_at..]);
    let actual_crc = crc32fast::hash(&bytes[..crc_at]);
    if stored_crc != actual_crc {
        return Err(ConvertError::parse_at_offset(
            FORMAT,
            crc_at as u64,
            format!("checksum mismatch: stored {stored_crc:08x}, computed {actual_crc:08x}"),
        ));
    }

    let header: FileHeader = serde_json::from_slice(&bytes[PREAMBLE_LEN..lengths_at]).map_err(|e| {
        ConvertError::parse_at_offset(FORMAT, PREAMBLE_LEN as u64, format!("invalid header: {e}"))
    })?;

    let stored = &bytes[payload_at..crc_at];
    check_raw_len(&header, raw_len, stored.len(), compression, lengths_at as u64)?;
    let raw_len = usize::try_from(raw_len)
        .map_err(|_| ConvertError::parse_at_offset(FORMAT, lengths_at as u64, "payload too large"))?;
    let inflated;
    let raw: &[u8] = match compression {
        Compression::None => stored,
        Compression::Zstd => {
            // streamed so the output buffer only grows with real data
            let zstd_error = |e: std::io::Error| {
                ConvertError::parse_at_offset(FORMAT, payload_at as u64, format!("zstd: {e}"))
            };
            let decoder = zstd::stream::read::Decoder::new(stored).map_err(zstd_error)?;
            let mut buf = Vec::new();
            decoder
                .take(raw_len as u64 + 1)
                .read_to_end(&mut buf)
                .map_err(zstd_error)?;
            inflated = buf;
            &inflated
        }
        Compression::Lz4 => {
            inflated = lz4_flex::decompress(stored, raw_len).map_err(|e| {
                ConvertError::parse_at_offset(FORMAT, payload_at as u64, format!("lz4: {e}"))
            })?;
            &inflated
        }
    };
    if raw.len() != raw_len {
        return Err(ConvertError::parse_at_offset(
            FORMAT,
            payload_at as u64,
            format!("payload inflated to {} bytes, expected {raw_len}", raw.len()),
        ));
    }
    debug!(
        version,
        compression = compression.as_str(),
        raw = raw_len,
        "Decoding payload"
    );

    let mut payload = Payload {
        data: raw,
        pos: 0,
        base: payload_at as u64,
        positional: compression == Compression::None,
    };
    build_model(header, &mut payload, cancel)
}

/// Upper bound on the lz4 block expansion ratio.
const LZ4_MAX_RATIO: u64 = 255;

/// Check the declared uncompressed length against the array shapes in the
/// header and against what the stored bytes can expand to.
fn check_raw_len(
    header: &FileHeader,
    raw_len: u64,
    stored_len: usize,
    compression: Compression,
    at: u64,
) -> Result<()> {
    let mismatch = |reason: String| Err(ConvertError::parse_at_offset(FORMAT, at, reason));
    let Some((minimum, exact)) = implied_payload_len(header) else {
        return mismatch("array shapes in header overflow".to_string());
    };
    if raw_len < minimum || (exact && raw_len != minimum) {
        return mismatch(format!(
            "payload length {raw_len} does not match the {minimum} bytes implied by the header"
        ));
    }
    let stored_len = stored_len as u64;
    let ceiling = match compression {
        Compression::None => stored_len,
        Compression::Lz4 => stored_len.saturating_mul(LZ4_MAX_RATIO),
        Compression::Zstd => u64::MAX,
    };
    if raw_len > ceiling {
        return mismatch(format!(
            "payload length {raw_len} cannot come from {stored_len} stored bytes"
        ));
    }
    Ok(())
}

/// Payload bytes implied by the header, and whether that count is exact.
///
/// String attributes carry per-value lengths, so only their 4-byte prefixes
/// count towards the minimum.
fn implied_payload_len(header: &FileHeader) -> Option<(u64, bool)> {
    let mut total = match &header.geometry {
        GeometryHeader::PointSet { vertices } => vertices.checked_mul(24)?,
        GeometryHeader::LineSet { vertices, segments } => {
            vertices.checked_mul(24)?.checked_add(segments.checked_mul(8)?)?
        }
        GeometryHeader::Surface {
            vertices,
            triangles,
        } => vertices.checked_mul(24)?.checked_add(triangles.checked_mul(12)?)?,
        GeometryHeader::Grid(_) => 0,
        GeometryHeader::WellLog { samples, .. } => samples.checked_mul(8)?,
    };
    let mut exact = true;
    for attr in &header.attributes {
        let width = match attr.data_type {
            DataType::Bool => 1,
            DataType::Int32 | DataType::Categorical | DataType::Float32 => 4,
            DataType::Int64 | DataType::Float64 => 8,
            DataType::String => {
                exact = false;
                4
            }
        };
        total = total.checked_add(attr.len.checked_mul(width)?)?;
    }
    Some((total, exact))
}

/// Bounds-checked view over the decompressed payload.
struct Payload<'a> {
    data: &'a [u8],
    pos: usize,
    base: u64,
    /// Offsets within the payload map to file offsets
    positional: bool,
}

impl<'a> Payload<'a> {
    fn offset(&self) -> u64 {
        if self.positional {
            self.base + self.pos as u64
        } else {
            self.base
        }
    }

    fn take(&mut self, count: u64, width: usize, what: &str) -> Result<&'a [u8]> {
        let len = usize::try_from(count)
            .ok()
            .and_then(|n| n.checked_mul(width))
            .filter(|&n| n <= self.data.len() - self.pos)
            .ok_or_else(|| {
                ConvertError::parse_at_offset(
                    FORMAT,
                    self.offset(),
                    format!("payload too short for {count} {what}"),
                )
            })?;
        let slice = &self.data[self.pos..self.pos + len];
        self.pos += len;
        Ok(slice)
    }

    fn points(&mut self, count: u64, cancel: &CancellationToken) -> Result<Vec<Point3>> {
        let bytes = self.take(count, 24, "vertices")?;
        let mut points = Vec::with_capacity(bytes.len() / 24);
        for (i, chunk) in bytes.chunks_exact(24).enumerate() {
            if i % CANCEL_CHECK_INTERVAL == 0 {
                cancel.check("geocodec-binary read")?;
            }
            points.push([
                LittleEndian::read_f64(&chunk[0..8]),
                LittleEndian::read_f64(&chunk[8..16]),
                LittleEndian::read_f64(&chunk[16..24]),
            ]);
        }
        Ok(points)
    }

    fn indices<const N: usize>(&mut self, count: u64, what: &str) -> Result<Vec<[u32; N]>> {
        let bytes = self.take(count, 4 * N, what)?;
        Ok(bytes
            .chunks_exact(4 * N)
            .map(|chunk| std::array::from_fn(|k| LittleEndian::read_u32(&chunk[4 * k..4 * k + 4])))
            .collect())
    }

    fn values(&mut self, data_type: DataType, count: u64, name: &str) -> Result<AttributeValues> {
        Ok(match data_type {
            DataType::Bool => AttributeValues::Bool(
                self.take(count, 1, name)?.iter().map(|&b| b != 0).collect(),
            ),
            DataType::Int32 | DataType::Categorical => {
                let codes = self
                    .take(count, 4, name)?
                    .chunks_exact(4)
                    .map(LittleEndian::read_i32)
                    .collect();
                AttributeValues::Int32(codes)
            }
            DataType::Int64 => AttributeValues::Int64(
                self.take(count, 8, name)?
                    .chunks_exact(8)
                    .map(LittleEndian::read_i64)
                    .collect(),
            ),
            DataType::Float32 => AttributeValues::Float32(
                self.take(count, 4, name)?
                    .chunks_exact(4)
                    .map(|c| f32::from_bits(LittleEndian::read_u32(c)))
                    .collect(),
            ),
            DataType::Float64 => AttributeValues::Float64(
                self.take(count, 8, name)?
                    .chunks_exact(8)
                    .map(|c| f64::from_bits(LittleEndian::read_u64(c)))
                    .collect(),
            ),
            DataType::String => {
                let mut strings = Vec::new();
                for _ in 0..count {
                    let at = self.offset();
                    let len = LittleEndian::read_u32(self.take(1, 4, name)?);
                    let bytes = self.take(u64::from(len), 1, name)?;
                    let text = std::str::from_utf8(bytes).map_err(|e| {
                        ConvertError::parse_at_offset(FORMAT, at, format!("{name}: {e}"))
                    })?;
                    strings.push(text.to_string());
                }
                AttributeValues::String(strings)
            }
        })
    }
}

fn build_model(
    header: FileHeader,
    payload: &mut Payload<'_>,
    cancel: &CancellationToken,
) -> Result<CanonicalModel> {
    let geometry = match header.geometry {
        GeometryHeader::PointSet { vertices } => Geometry::PointSet {
            vertices: payload.points(vertices, cancel)?,
        },
        GeometryHeader::LineSet { vertices, segments } => Geometry::LineSet {
            vertices: payload.points(vertices, cancel)?,
            segments: payload.indices::<2>(segments, "segments")?,
        },
        GeometryHeader::Surface {
            vertices,
            triangles,
        } => Geometry::Surface {
            vertices: payload.points(vertices, cancel)?,
            triangles: payload.indices::<3>(triangles, "triangles")?,
        },
        GeometryHeader::Grid(grid) => {
            if grid.checked_cell_count().is_none() || grid.checked_node_count().is_none() {
                return Err(ConvertError::parse_at_offset(
                    FORMAT,
                    PREAMBLE_LEN as u64,
                    format!("grid size {:?} overflows", grid.size),
                ));
            }
            Geometry::Grid(grid)
        }
        GeometryHeader::WellLog { collar, samples } => Geometry::WellLog(WellTrajectory {
            collar,
            depths: payload
                .take(samples, 8, "depths")?
                .chunks_exact(8)
                .map(LittleEndian::read_f64)
                .collect(),
        }),
    };

    let mut builder = ModelBuilder::new(header.name)
        .with_crs(header.crs)
        .with_provenance(header.provenance)
        .with_geometry(geometry)?;
    if let Some(description) = header.description {
        builder = builder.with_description(description);
    }
    for (key, value) in header.properties {
        builder.set_property(key, value);
    }

    for attr in header.attributes {
        cancel.check("geocodec-binary read")?;
        let mut values = payload.values(attr.data_type, attr.len, &attr.name)?;
        if attr.data_type == DataType::Categorical {
            if let AttributeValues::Int32(codes) = values {
                values = AttributeValues::Categorical {
                    codes,
                    lookup: attr.lookup.unwrap_or_default(),
                };
            }
        }
        let mut attribute = Attribute::new(attr.name, values);
        attribute.unit = attr.unit;
        attribute.description = attr.description;
        builder.add_attribute(attr.location, attribute)?;
    }

    if payload.pos != payload.data.len() {
        return Err(ConvertError::parse_at_offset(
            FORMAT,
            payload.offset(),
            format!("{} trailing payload bytes", payload.data.len() - payload.pos),
        ));
    }
    builder.build()
}
