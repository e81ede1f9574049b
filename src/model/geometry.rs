// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! Geometry descriptors for canonical geoscience objects.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::core::{ConvertError, Result};

use super::attribute::AttributeLocation;

/// A coordinate triple (x, y, z).
pub type Point3 = [f64; 3];

/// Geometry kind identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum GeometryKind {
    /// Unconnected points
    PointSet,
    /// Vertices joined by two-index segments
    LineSet,
    /// Triangulated surface mesh
    Surface,
    /// Regular axis-aligned volumetric grid
    Grid,
    /// Samples along a well trajectory
    WellLog,
}

impl GeometryKind {
    /// Convert to string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            GeometryKind::PointSet => "point-set",
            GeometryKind::LineSet => "line-set",
            GeometryKind::Surface => "surface",
            GeometryKind::Grid => "grid",
            GeometryKind::WellLog => "well-log",
        }
    }
}

impl fmt::Display for GeometryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for GeometryKind {
    type Err = ConvertError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().replace('_', "-").as_str() {
            "point-set" | "pointset" | "points" => Ok(GeometryKind::PointSet),
            "line-set" | "lineset" | "lines" => Ok(GeometryKind::LineSet),
            "surface" | "mesh" | "triangle-mesh" => Ok(GeometryKind::Surface),
            "grid" | "regular-grid" => Ok(GeometryKind::Grid),
            "well-log" | "welllog" | "well" => Ok(GeometryKind::WellLog),
            other => Err(ConvertError::config(format!("unknown geometry kind '{other}'"))),
        }
    }
}

/// Regular axis-aligned grid.
///
/// Cells are ordered with i (x) varying fastest, then j (y), then k (z).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegularGrid {
    /// Corner of the first cell
    pub origin: Point3,
    /// Cell edge lengths along x, y, z
    pub spacing: [f64; 3],
    /// Cell counts along x, y, z
    pub size: [usize; 3],
}

impl RegularGrid {
    /// Number of cells.
    ///
    /// Saturates at `usize::MAX` for a grid that fails [`Geometry::check`].
    pub fn cell_count(&self) -> usize {
        self.checked_cell_count().unwrap_or(usize::MAX)
    }

    /// Number of corner nodes.
    ///
    /// Saturates at `usize::MAX` for a grid that fails [`Geometry::check`].
    pub fn node_count(&self) -> usize {
        self.checked_node_count().unwrap_or(usize::MAX)
    }

    /// Number of cells, `None` on overflow.
    pub fn checked_cell_count(&self) -> Option<usize> {
        self.size.iter().try_fold(1usize, |acc, &n| acc.checked_mul(n))
    }

    /// Number of corner nodes, `None` on overflow.
    pub fn checked_node_count(&self) -> Option<usize> {
        self.size
            .iter()
            .try_fold(1usize, |acc, &n| acc.checked_mul(n.checked_add(1)?))
    }

    /// Linear cell index for (i, j, k).
    pub fn cell_index(&self, i: usize, j: usize, k: usize) -> usize {
        i + self.size[0] * (j + self.size[1] * k)
    }

    /// Far corner of the grid.
    pub fn extent(&self) -> Point3 {
        [
            self.origin[0] + self.spacing[0] * self.size[0] as f64,
            self.origin[1] + self.spacing[1] * self.size[1] as f64,
            self.origin[2] + self.spacing[2] * self.size[2] as f64,
        ]
    }
}

/// Vertical well trajectory sampled at measured depths below the collar.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WellTrajectory {
    /// Collar (top of hole) location
    pub collar: Point3,
    /// Measured depths of each sample, non-decreasing
    pub depths: Vec<f64>,
}

impl WellTrajectory {
    /// Location of a sample, assuming a vertical hole.
    pub fn sample_location(&self, index: usize) -> Option<Point3> {
        self.depths
            .get(index)
            .map(|d| [self.collar[0], self.collar[1], self.collar[2] - d])
    }
}

/// Geometry descriptor of a canonical model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum Geometry {
    /// Unconnected points
    PointSet {
        /// Point coordinates
        vertices: Vec<Point3>,
    },
    /// Polyline segments
    LineSet {
        /// Vertex coordinates
        vertices: Vec<Point3>,
        /// Vertex index pairs
        segments: Vec<[u32; 2]>,
    },
    /// Triangulated surface
    Surface {
        /// Vertex coordinates
        vertices: Vec<Point3>,
        /// Vertex index triples
        triangles: Vec<[u32; 3]>,
    },
    /// Regular grid
    Grid(RegularGrid),
    /// Well log samples
    WellLog(WellTrajectory),
}

impl Geometry {
    /// Geometry kind.
    pub fn kind(&self) -> GeometryKind {
        match self {
            Geometry::PointSet { .. } => GeometryKind::PointSet,
            Geometry::LineSet { .. } => GeometryKind::LineSet,
            Geometry::Surface { .. } => GeometryKind::Surface,
            Geometry::Grid(_) => GeometryKind::Grid,
            Geometry::WellLog(_) => GeometryKind::WellLog,
        }
    }

    /// Explicit vertex coordinates, if the geometry stores any.
    pub fn vertices(&self) -> Option<&[Point3]> {
        match self {
            Geometry::PointSet { vertices }
            | Geometry::LineSet { vertices, .. }
            | Geometry::Surface { vertices, .. } => Some(vertices),
            Geometry::Grid(_) | Geometry::WellLog(_) => None,
        }
    }

    /// Number of elements at an attribute location, or `None` if the
    /// geometry does not support that location.
    pub fn cardinality(&self, location: AttributeLocation) -> Option<usize> {
        use AttributeLocation as L;
        match (self, location) {
            (Geometry::PointSet { vertices }, L::Vertices) => Some(vertices.len()),
            (Geometry::LineSet { vertices, .. }, L::Vertices) => Some(vertices.len()),
            (Geometry::LineSet { segments, .. }, L::Segments) => Some(segments.len()),
            (Geometry::Surface { vertices, .. }, L::Vertices) => Some(vertices.len()),
            (Geometry::Surface { triangles, .. }, L::Faces) => Some(triangles.len()),
            (Geometry::Grid(grid), L::Cells) => Some(grid.cell_count()),
            (Geometry::Grid(grid), L::Vertices) => Some(grid.node_count()),
            (Geometry::WellLog(well), L::Samples) => Some(well.depths.len()),
            _ => None,
        }
    }

    /// Attribute locations this geometry supports.
    pub fn supported_locations(&self) -> &'static [AttributeLocation] {
        use AttributeLocation as L;
        match self {
            Geometry::PointSet { .. } => &[L::Vertices],
            Geometry::LineSet { .. } => &[L::Vertices, L::Segments],
            Geometry::Surface { .. } => &[L::Vertices, L::Faces],
            Geometry::Grid(_) => &[L::Cells, L::Vertices],
            Geometry::WellLog(_) => &[L::Samples],
        }
    }

    /// Primary element count (points, segments, triangles, cells, samples).
    pub fn element_count(&self) -> usize {
        match self {
            Geometry::PointSet { vertices } => vertices.len(),
            Geometry::LineSet { segments, .. } => segments.len(),
            Geometry::Surface { triangles, .. } => triangles.len(),
            Geometry::Grid(grid) => grid.cell_count(),
            Geometry::WellLog(well) => well.depths.len(),
        }
    }

    /// Check topology and coordinate invariants.
    ///
    /// Index references must be in range of the vertex array, grid sizes and
    /// spacings must be positive, and well depths must be finite and
    /// non-decreasing.
    pub fn check(&self) -> Result<()> {
        match self {
            Geometry::PointSet { vertices } => check_coordinates(vertices),
            Geometry::LineSet { vertices, segments } => {
                check_coordinates(vertices)?;
                check_indices("geometry.segments", segments, vertices.len())
            }
            Geometry::Surface {
                vertices,
                triangles,
            } => {
                check_coordinates(vertices)?;
                check_indices("geometry.triangles", triangles, vertices.len())
            }
            Geometry::Grid(grid) => {
                for axis in 0..3 {
                    if grid.size[axis] == 0 {
                        return Err(ConvertError::schema_mismatch(
                            format!("geometry.size[{axis}]"),
                            "grid dimensions must be positive",
                        ));
                    }
                    let spacing = grid.spacing[axis];
                    if !(spacing.is_finite() && spacing > 0.0) {
                        return Err(ConvertError::schema_mismatch(
                            format!("geometry.spacing[{axis}]"),
                            format!("grid spacing must be positive and finite, got {spacing}"),
                        ));
                    }
                }
                if grid.checked_cell_count().is_none() || grid.checked_node_count().is_none() {
                    return Err(ConvertError::schema_mismatch(
                        "geometry.size",
                        format!("grid size {:?} overflows the element count", grid.size),
                    ));
                }
                if grid.origin.iter().any(|c| !c.is_finite()) {
                    return Err(ConvertError::schema_mismatch(
                        "geometry.origin",
                        "grid origin must be finite",
                    ));
                }
                Ok(())
            }
            Geometry::WellLog(well) => {
                if well.collar.iter().any(|c| !c.is_finite()) {
                    return Err(ConvertError::schema_mismatch(
                        "geometry.collar",
                        "collar must be finite",
                    ));
                }
                let mut previous = f64::NEG_INFINITY;
                for (i, &depth) in well.depths.iter().enumerate() {
                    if !depth.is_finite() {
                        return Err(ConvertError::schema_mismatch(
                            format!("geometry.depths[{i}]"),
                            "depth must be finite",
                        ));
                    }
                    if depth < previous {
                        return Err(ConvertError::schema_mismatch(
                            format!("geometry.depths[{i}]"),
                            format!("depth {depth} is less than previous depth {previous}"),
                        ));
                    }
                    previous = depth;
                }
                Ok(())
            }
        }
    }
}

fn check_coordinates(vertices: &[Point3]) -> Result<()> {
    match vertices
        .iter()
        .position(|v| v.iter().any(|c| !c.is_finite()))
    {
        Some(i) => Err(ConvertError::schema_mismatch(
            format!("geometry.vertices[{i}]"),
            "vertex coordinates must be finite",
        )),
        None => Ok(()),
    }
}

fn check_indices<const N: usize>(path: &str, items: &[[u32; N]], vertex_count: usize) -> Result<()> {
    for (i, item) in items.iter().enumerate() {
        if let Some(&bad) = item.iter().find(|&&idx| idx as usize >= vertex_count) {
            return Err(ConvertError::schema_mismatch(
                format!("{path}[{i}]"),
                format!("vertex index {bad} out of range for {vertex_count} vertices"),
            ));
        }
    }
    Ok(())
}

/// Axis-aligned bounding box.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    /// Minimum corner
    pub min: Point3,
    /// Maximum corner
    pub max: Point3,
}

impl BoundingBox {
    /// Bounding box of a set of points, `None` when empty.
    pub fn from_points<'a>(points: impl IntoIterator<Item = &'a Point3>) -> Option<Self> {
        let mut iter = points.into_iter();
        let first = *iter.next()?;
        let mut bbox = BoundingBox {
            min: first,
            max: first,
        };
        for p in iter {
            for axis in 0..3 {
                bbox.min[axis] = bbox.min[axis].min(p[axis]);
                bbox.max[axis] = bbox.max[axis].max(p[axis]);
            }
        }
        Some(bbox)
    }

    /// Bounding box of a geometry, `None` when it has no elements.
    pub fn of(geometry: &Geometry) -> Option<Self> {
        match geometry {
            Geometry::PointSet { vertices }
            | Geometry::LineSet { vertices, .. }
            | Geometry::Surface { vertices, .. } => Self::from_points(vertices),
            Geometry::Grid(grid) => Some(BoundingBox {
                min: grid.origin,
                max: grid.extent(),
            }),
            Geometry::WellLog(well) => {
                let top = well.depths.first()?;
                let bottom = well.depths.last()?;
                let [x, y, z] = well.collar;
                Some(BoundingBox {
                    min: [x, y, z - bottom],
                    max: [x, y, z - top],
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn triangle_mesh(triangles: Vec<[u32; 3]>) -> Geometry {
        Geometry::Surface {
            vertices: vec![[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]],
            triangles,
        }
    }

    #[test]
    fn test_surface_index_in_range() {
        assert!(triangle_mesh(vec![[0, 1, 2]]).check().is_ok());
    }

    #[test]
    fn test_surface_dangling_index() {
        let err = triangle_mesh(vec![[0, 1, 2], [0, 1, 3]]).check().unwrap_err();
        match err {
            ConvertError::SchemaMismatch { path, .. } => assert_eq!(path, "geometry.triangles[1]"),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_grid_cardinality() {
        let grid = Geometry::Grid(RegularGrid {
            origin: [0.0; 3],
            spacing: [1.0; 3],
            size: [4, 3, 2],
        });
        assert_eq!(grid.cardinality(AttributeLocation::Cells), Some(24));
        assert_eq!(grid.cardinality(AttributeLocation::Vertices), Some(60));
        assert_eq!(grid.cardinality(AttributeLocation::Faces), None);
    }

    #[test]
    fn test_grid_zero_size_rejected() {
        let grid = Geometry::Grid(RegularGrid {
            origin: [0.0; 3],
            spacing: [1.0; 3],
            size: [4, 0, 1],
        });
        assert!(grid.check().is_err());
    }

    #[test]
    fn test_grid_size_overflow_rejected() {
        let grid = RegularGrid {
            origin: [0.0; 3],
            spacing: [1.0; 3],
            size: [1 << 32, 1 << 32, 1 << 32],
        };
        assert_eq!(grid.checked_cell_count(), None);
        assert_eq!(grid.cell_count(), usize::MAX);
        match Geometry::Grid(grid).check() {
            Err(ConvertError::SchemaMismatch { path, .. }) => assert_eq!(path, "geometry.size"),
            other => panic!("expected schema mismatch, got {other:?}"),
        }

        let edge = Geometry::Grid(RegularGrid {
            origin: [0.0; 3],
            spacing: [1.0; 3],
            size: [usize::MAX, 1, 1],
        });
        assert!(edge.check().is_err());
    }

    #[test]
    fn test_well_depths_must_not_decrease() {
        let well = Geometry::WellLog(WellTrajectory {
            collar: [0.0, 0.0, 100.0],
            depths: vec![0.0, 1.0, 0.5],
        });
        let err = well.check().unwrap_err();
        assert!(err.to_string().contains("geometry.depths[2]"));
    }

    #[test]
    fn test_bounding_box_well() {
        let well = Geometry::WellLog(WellTrajectory {
            collar: [10.0, 20.0, 100.0],
            depths: vec![5.0, 10.0, 50.0],
        });
        let bbox = BoundingBox::of(&well).unwrap();
        assert_eq!(bbox.min, [10.0, 20.0, 50.0]);
        assert_eq!(bbox.max, [10.0, 20.0, 95.0]);
    }

    #[test]
    fn test_geometry_kind_from_str() {
        assert_eq!("point_set".parse::<GeometryKind>().unwrap(), GeometryKind::PointSet);
        assert_eq!("Well-Log".parse::<GeometryKind>().unwrap(), GeometryKind::WellLog);
        assert!("polygon".parse::<GeometryKind>().is_err());
    }
}
