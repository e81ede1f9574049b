// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! Wavefront OBJ meshes, polylines, and point clouds.
//!
//! Only positions, triangles (`f`), and polylines (`l`) are mapped. Normals
//! and texture coordinates are discarded on read; materials and smoothing
//! groups are ignored. The CRS and length unit travel in `# crs:` and
//! `# unit:` comments.

use std::io::Write;
use std::path::Path;

use tracing::{debug, warn};

use crate::core::{ConvertError, Result};
use crate::io::atomic::write_atomic;
use crate::io::cancel::CancellationToken;
use crate::io::detection::{content_lines, is_text, score};
use crate::io::source::SourceHandle;
use crate::io::traits::{Confidence, FormatAdapter, WriteSummary};
use crate::model::{
    CanonicalModel, Crs, Geometry, GeometryKind, LengthUnit, ModelBuilder, Point3, Provenance,
};

use super::{format_float, parse_float, CANCEL_CHECK_INTERVAL};

const FORMAT: &str = "obj";
const MAGIC: &str = "# geocodec obj";

const KEYWORDS: &[&str] = &[
    "v", "vn", "vt", "vp", "f", "l", "p", "o", "g", "s", "mtllib", "usemtl",
];

/// Adapter for Wavefront OBJ.
#[derive(Debug, Clone, Copy, Default)]
pub struct ObjAdapter;

impl FormatAdapter for ObjAdapter {
    fn format_id(&self) -> &'static str {
        FORMAT
    }

    fn description(&self) -> &'static str {
        "Wavefront OBJ triangle meshes, polylines and points"
    }

    fn extensions(&self) -> &'static [&'static str] {
        &["obj"]
    }

    fn lossy_features(&self) -> &'static [&'static str] {
        &[
            "normals and texture coordinates are discarded on read",
            "polygons with more than three vertices are rejected",
            "attributes cannot be written",
            "model description and properties are not stored",
        ]
    }

    fn detect(&self, source: &SourceHandle) -> Confidence {
        if !is_text(source.header()) {
            return Confidence::NONE;
        }
        let text = source.header_text();
        let header_matches = text.starts_with(MAGIC) || {
            let keywords: Vec<&str> = content_lines(&text, "#")
                .take(32)
                .filter_map(|l| l.split_whitespace().next())
                .collect();
            !keywords.is_empty()
                && keywords.contains(&"v")
                && keywords.iter().all(|k| KEYWORDS.contains(k))
        };
        score(source, self.extensions(), header_matches)
    }

    fn read(&self, source: &SourceHandle, cancel: &CancellationToken) -> Result<CanonicalModel> {
        let text = source.read_to_string()?;
        parse(&text, source, cancel)
    }

    fn write(
        &self,
        model: &CanonicalModel,
        target: &Path,
        cancel: &CancellationToken,
    ) -> Result<WriteSummary> {
        if model.attribute_count() > 0 {
            return Err(ConvertError::unsupported(FORMAT, "attributes"));
        }
        let (vertices, statements): (&[Point3], Vec<String>) = match model.geometry() {
            Geometry::PointSet { vertices } => (vertices, Vec::new()),
            Geometry::LineSet { vertices, segments } => (
                vertices,
                segments
                    .iter()
                    .map(|[a, b]| format!("l {} {}", a + 1, b + 1))
                    .collect(),
            ),
            Geometry::Surface {
                vertices,
                triangles,
            } => (
                vertices,
                triangles
                    .iter()
                    .map(|[a, b, c]| format!("f {} {} {}", a + 1, b + 1, c + 1))
                    .collect(),
            ),
            other => {
                return Err(ConvertError::unsupported(
                    FORMAT,
                    format!("{} geometry", other.kind()),
                ))
            }
        };
        // bare vertices read back as a point set
        if statements.is_empty() && model.geometry().kind() != GeometryKind::PointSet {
            return Err(ConvertError::unsupported(
                FORMAT,
                format!("{} geometry without elements", model.geometry().kind()),
            ));
        }

        let bytes_written = write_atomic(target, |f| {
            writeln!(f, "{MAGIC}")?;
            if model.crs().is_specified() {
                let crs = model.crs().to_string();
                writeln!(f, "# crs: {}", crs.split_whitespace().collect::<Vec<_>>().join(" "))?;
            }
            writeln!(f, "# unit: {}", model.provenance().length_unit)?;
            writeln!(f, "o {}", model.name().lines().next().unwrap_or_default())?;
            for (i, v) in vertices.iter().enumerate() {
                if i % CANCEL_CHECK_INTERVAL == 0 {
                    cancel.check("obj write")?;
                }
                writeln!(
                    f,
                    "v {} {} {}",
                    format_float(v[0]),
                    format_float(v[1]),
                    format_float(v[2])
                )?;
            }
            for (i, s) in statements.iter().enumerate() {
                if i % CANCEL_CHECK_INTERVAL == 0 {
                    cancel.check("obj write")?;
                }
                writeln!(f, "{s}")?;
            }
            Ok(())
        })?;

        Ok(WriteSummary {
            path: target.to_path_buf(),
            bytes_written,
            elements: model.geometry().element_count(),
        })
    }
}

fn parse(text: &str, source: &SourceHandle, cancel: &CancellationToken) -> Result<CanonicalModel> {
    let mut name: Option<String> = None;
    let mut crs = Crs::Unspecified;
    let mut unit = LengthUnit::default();
    let mut vertices: Vec<Point3> = Vec::new();
    let mut triangles: Vec<[u32; 3]> = Vec::new();
    let mut segments: Vec<[u32; 2]> = Vec::new();
    let mut discarded = 0usize;

    for (i, line) in text.lines().enumerate() {
        let no = i + 1;
        if i % CANCEL_CHECK_INTERVAL == 0 {
            cancel.check("obj read")?;
        }
        let line = line.trim();
        if let Some(comment) = line.strip_prefix('#') {
            if let Some((key, value)) = comment.split_once(':') {
                match key.trim() {
                    "crs" => crs = Crs::parse(value),
                    "unit" => {
                        unit = value.parse::<LengthUnit>().map_err(|e| {
                            ConvertError::parse_at_line(FORMAT, no, e.to_string())
                        })?
                    }
                    _ => {}
                }
            }
            continue;
        }
        let mut tokens = line.split_whitespace();
        let Some(keyword) = tokens.next() else {
            continue;
        };
        match keyword {
            "v" => {
                let coords: Vec<f64> = tokens
                    .take(3)
                    .map(|t| parse_float(t).filter(|v| v.is_finite()))
                    .collect::<Option<_>>()
                    .ok_or_else(|| {
                        ConvertError::parse_at_line(FORMAT, no, "invalid vertex coordinate")
                    })?;
                if coords.len() != 3 {
                    return Err(ConvertError::parse_at_line(
                        FORMAT,
                        no,
                        "vertex needs three coordinates",
                    ));
                }
                vertices.push([coords[0], coords[1], coords[2]]);
            }
            "vn" | "vt" | "vp" => discarded += 1,
            "f" => {
                let refs = tokens
                    .map(|t| resolve_index(t, vertices.len(), no))
                    .collect::<Result<Vec<u32>>>()?;
                match refs.as_slice() {
                    [a, b, c] => triangles.push([*a, *b, *c]),
                    r if r.len() < 3 => {
                        return Err(ConvertError::parse_at_line(
                            FORMAT,
                            no,
                            "face needs at least three vertices",
                        ))
                    }
                    r => {
                        return Err(ConvertError::unsupported(
                            FORMAT,
                            format!("polygon with {} vertices at line {no}", r.len()),
                        ))
                    }
                }
            }
            "l" => {
                let refs = tokens
                    .map(|t| resolve_index(t, vertices.len(), no))
                    .collect::<Result<Vec<u32>>>()?;
                if refs.len() < 2 {
                    return Err(ConvertError::parse_at_line(
                        FORMAT,
                        no,
                        "line needs at least two vertices",
                    ));
                }
                segments.extend(refs.windows(2).map(|w| [w[0], w[1]]));
            }
            "o" => {
                let value = line[1..].trim();
                if name.is_none() && !value.is_empty() {
                    name = Some(value.to_string());
                }
            }
            "g" | "s" | "mtllib" | "usemtl" | "p" => {
                debug!(line = no, keyword, "Ignoring OBJ statement");
            }
            other => {
                return Err(ConvertError::parse_at_line(
                    FORMAT,
                    no,
                    format!("unknown statement '{other}'"),
                ))
            }
        }
    }

    if discarded > 0 {
        warn!(
            source = %source.path().display(),
            discarded,
            "Normals and texture coordinates are not represented and were discarded"
        );
    }

    let geometry = match (triangles.is_empty(), segments.is_empty()) {
        (true, true) => Geometry::PointSet { vertices },
        (false, true) => Geometry::Surface {
            vertices,
            triangles,
        },
        (true, false) => Geometry::LineSet { vertices, segments },
        (false, false) => {
            return Err(ConvertError::unsupported(FORMAT, "faces mixed with lines"));
        }
    };

    let provenance = Provenance::new(FORMAT)
        .with_source(source.path().display().to_string())
        .with_length_unit(unit);
    ModelBuilder::new(name.unwrap_or_else(|| source.stem()))
        .with_crs(crs)
        .with_provenance(provenance)
        .with_geometry(geometry)?
        .build()
}

/// Resolve a `v`, `v/vt`, `v//vn` or `v/vt/vn` reference to a 0-based index.
fn resolve_index(token: &str, vertex_count: usize, line: usize) -> Result<u32> {
    let head = token.split('/').next().unwrap_or(token);
    let raw: i64 = head.parse().map_err(|_| {
        ConvertError::parse_at_line(FORMAT, line, format!("invalid vertex reference '{token}'"))
    })?;
    let index = match raw {
        0 => None,
        r if r > 0 => Some(r - 1),
        r => Some(vertex_count as i64 + r),
    };
    match index {
        Some(i) if i >= 0 && (i as usize) < vertex_count => Ok(i as u32),
        _ => Err(ConvertError::parse_at_line(
            FORMAT,
            line,
            format!("vertex reference {raw} out of range (1..={vertex_count})"),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn read_text(text: &str) -> Result<CanonicalModel> {
        let source = SourceHandle::from_bytes("mem/mesh.obj", text.as_bytes());
        parse(text, &source, &CancellationToken::new())
    }

    #[test]
    fn test_read_triangles_with_normals() {
        let model = read_text(
            "# crs: EPSG:2193\no pit\nv 0 0 0\nv 1 0 0\nv 0 1 0\nvn 0 0 1\nf 1//1 2//1 -1//1\n",
        )
        .unwrap();
        assert_eq!(model.name(), "pit");
        assert_eq!(model.crs().epsg(), Some(2193));
        match model.geometry() {
            Geometry::Surface { triangles, .. } => assert_eq!(triangles, &vec![[0, 1, 2]]),
            other => panic!("expected surface, got {other:?}"),
        }
    }

    #[test]
    fn test_polyline_and_points() {
        let model = read_text("v 0 0 0\nv 1 0 0\nv 2 0 0\nl 1 2 3\n").unwrap();
        match model.geometry() {
            Geometry::LineSet { segments, .. } => assert_eq!(segments, &vec![[0, 1], [1, 2]]),
            other => panic!("expected line set, got {other:?}"),
        }
        let points = read_text("v 0 0 0\n").unwrap();
        assert_eq!(points.geometry().kind(), GeometryKind::PointSet);
        assert_eq!(points.name(), "mesh");
    }

    #[test]
    fn test_rejections() {
        assert!(matches!(
            read_text("v 0 0 0\nv 1 0 0\nv 1 1 0\nv 0 1 0\nf 1 2 3 4\n"),
            Err(ConvertError::UnsupportedFeature { .. })
        ));
        assert!(matches!(
            read_text("v 0 0 0\nv 1 0 0\nv 1 1 0\nf 1 2 3\nl 1 2\n"),
            Err(ConvertError::UnsupportedFeature { .. })
        ));
        match read_text("v 0 0 0\nf 1 2 3\n") {
            Err(ConvertError::FormatParse { location, .. }) => {
                assert_eq!(location, crate::core::Location::Line(2))
            }
            other => panic!("expected parse error, got {other:?}"),
        }
        assert!(read_text("v 0 zero 0\n").is_err());
    }

    #[test]
    fn test_write_empty_topology_rejected() {
        let target = std::env::temp_dir().join("geocodec_obj_empty_topology.obj");
        for geometry in [
            Geometry::LineSet {
                vertices: vec![[0.0; 3], [1.0, 0.0, 0.0]],
                segments: Vec::new(),
            },
            Geometry::Surface {
                vertices: vec![[0.0; 3]],
                triangles: Vec::new(),
            },
        ] {
            let model = ModelBuilder::new("empty")
                .with_geometry(geometry)
                .unwrap()
                .build()
                .unwrap();
            let err = ObjAdapter
                .write(&model, &target, &CancellationToken::new())
                .unwrap_err();
            assert!(matches!(err, ConvertError::UnsupportedFeature { .. }));
            assert!(!target.exists());
        }
    }

    #[test]
    fn test_detect() {
        let adapter = ObjAdapter;
        let obj = SourceHandle::from_bytes("m.obj", b"# exported\nmtllib a.mtl\nv 0 0 0\nf 1 1 1\n");
        assert_eq!(adapter.detect(&obj), Confidence::CERTAIN);
        let csv = SourceHandle::from_bytes("m.obj", b"x,y,z\n");
        assert!(adapter.detect(&csv).value() < 0.5);
    }
}
