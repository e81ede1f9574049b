// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! Container encoding.

use std::io::Write;
use std::path::Path;

use byteorder::{LittleEndian, WriteBytesExt};
use tracing::debug;

use super::{AttributeHeader, FileHeader, GeometryHeader, FORMAT, MAGIC, VERSION};
use crate::core::{Compression, ConvertError, Result};
use crate::io::atomic::write_atomic;
use crate::io::cancel::CancellationToken;
use crate::io::formats::CANCEL_CHECK_INTERVAL;
use crate::io::traits::WriteSummary;
use crate::model::{AttributeValues, CanonicalModel, Geometry, Point3};

/// Encode a model into a complete container.
pub fn encode(
    model: &CanonicalModel,
    compression: Compression,
    cancel: &CancellationToken,
) -> Result<Vec<u8>> {
    let header = file_header(model);
    let header_json = serde_json::to_vec(&header)
        .map_err(|e| ConvertError::transform(format!("failed to encode {FORMAT} header: {e}")))?;
    let header_len = u32::try_from(header_json.len())
        .map_err(|_| ConvertError::unsupported(FORMAT, "header larger than 4 GiB"))?;

    let raw = encode_payload(model, cancel)?;
    let payload = match compression {
        Compression::None => raw.clone(),
        Compression::Zstd => zstd::bulk::compress(&raw, 3)
            .map_err(|e| ConvertError::transform(format!("zstd compression failed: {e}")))?,
        Compression::Lz4 => lz4_flex::compress(&raw),
    };
    debug!(
        compression = compression.as_str(),
        raw = raw.len(),
        stored = payload.len(),
        "Encoded payload"
    );

    let mut out = Vec::with_capacity(super::PREAMBLE_LEN + header_json.len() + payload.len() + 20);
    out.extend_from_slice(MAGIC);
    out.write_u16::<LittleEndian>(VERSION)?;
    out.write_u16::<LittleEndian>(compression.as_flag())?;
    out.write_u32::<LittleEndian>(header_len)?;
    out.extend_from_slice(&header_json);
    out.write_u64::<LittleEndian>(raw.len() as u64)?;
    out.write_u64::<LittleEndian>(payload.len() as u64)?;
    out.extend_from_slice(&payload);
    let crc = crc32fast::hash(&out);
    out.write_u32::<LittleEndian>(crc)?;
    Ok(out)
}

pub(super) fn write_file(
    model: &CanonicalModel,
    target: &Path,
    compression: Compression,
    cancel: &CancellationToken,
) -> Result<WriteSummary> {
    let bytes = encode(model, compression, cancel)?;
    let bytes_written = write_atomic(target, |f| {
        f.write_all(&bytes)?;
        Ok(())
    })?;
    Ok(WriteSummary {
        path: target.to_path_buf(),
        bytes_written,
        elements: model.geometry().element_count(),
    })
}

fn file_header(model: &CanonicalModel) -> FileHeader {
    let geometry = match model.geometry() {
        Geometry::PointSet { vertices } => GeometryHeader::PointSet {
            vertices: vertices.len() as u64,
        },
        Geometry::LineSet { vertices, segments } => GeometryHeader::LineSet {
            vertices: vertices.len() as u64,
            segments: segments.len() as u64,
        },
        Geometry::Surface {
            vertices,
            triangles,
        } => GeometryHeader::Surface {
            vertices: vertices.len() as u64,
            triangles: triangles.len() as u64,
        },
        Geometry::Grid(grid) => GeometryHeader::Grid(grid.clone()),
        Geometry::WellLog(well) => GeometryHeader::WellLog {
            collar: well.collar,
            samples: well.depths.len() as u64,
        },
    };

    let attributes = model
        .iter_attributes()
        .map(|(location, attr)| AttributeHeader {
            name: attr.name.clone(),
            location,
            data_type: attr.data_type(),
            unit: attr.unit.clone(),
            description: attr.description.clone(),
            len: attr.len() as u64,
            lookup: match &attr.values {
                AttributeValues::Categorical { lookup, .. } => Some(lookup.clone()),
                _ => None,
            },
        })
        .collect();

    FileHeader {
        name: model.name().to_string(),
        description: model.description().map(str::to_string),
        crs: model.crs().clone(),
        provenance: model.provenance().clone(),
        properties: model.properties().clone(),
        geometry,
        attributes,
    }
}

fn encode_payload(model: &CanonicalModel, cancel: &CancellationToken) -> Result<Vec<u8>> {
    let mut buf = Vec::new();
    match model.geometry() {
        Geometry::PointSet { vertices } => write_points(&mut buf, vertices, cancel)?,
        Geometry::LineSet { vertices, segments } => {
            write_points(&mut buf, vertices, cancel)?;
            for segment in segments {
                for &idx in segment {
                    buf.write_u32::<LittleEndian>(idx)?;
                }
            }
        }
        Geometry::Surface {
            vertices,
            triangles,
        } => {
            write_points(&mut buf, vertices, cancel)?;
            for triangle in triangles {
                for &idx in triangle {
                    buf.write_u32::<LittleEndian>(idx)?;
                }
            }
        }
        Geometry::Grid(_) => {}
        Geometry::WellLog(well) => {
            for &depth in &well.depths {
                buf.write_f64::<LittleEndian>(depth)?;
            }
        }
    }

    for (_, attr) in model.iter_attributes() {
        cancel.check("geocodec-binary write")?;
        match &attr.values {
            AttributeValues::Bool(v) => buf.extend(v.iter().map(|&b| u8::from(b))),
            AttributeValues::Int32(v) => {
                for &x in v {
                    buf.write_i32::<LittleEndian>(x)?;
                }
            }
            AttributeValues::Int64(v) => {
                for &x in v {
                    buf.write_i64::<LittleEndian>(x)?;
                }
            }
            AttributeValues::Float32(v) => {
                for &x in v {
                    buf.write_u32::<LittleEndian>(x.to_bits())?;
                }
            }
            AttributeValues::Float64(v) => {
                for &x in v {
                    buf.write_u64::<LittleEndian>(x.to_bits())?;
                }
            }
            AttributeValues::Categorical { codes, .. } => {
                for &code in codes {
                    buf.write_i32::<LittleEndian>(code)?;
                }
            }
            AttributeValues::String(v) => {
                for s in v {
                    let len = u32::try_from(s.len()).map_err(|_| {
                        ConvertError::unsupported(FORMAT, "string value larger than 4 GiB")
                    })?;
                    buf.write_u32::<LittleEndian>(len)?;
                    buf.extend_from_slice(s.as_bytes());
                }
            }
        }
    }
    Ok(buf)
}

fn write_points(buf: &mut Vec<u8>, points: &[Point3], cancel: &CancellationToken) -> Result<()> {
    buf.reserve(points.len() * 24);
    for (i, point) in points.iter().enumerate() {
        if i % CANCEL_CHECK_INTERVAL == 0 {
            cancel.check("geocodec-binary write")?;
        }
        for &c in point {
            buf.write_f64::<LittleEndian>(c)?;
        }
    }
    Ok(())
}
