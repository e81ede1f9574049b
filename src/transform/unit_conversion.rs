// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! Explicit length-unit conversion.

use super::pipeline::rebuild;
use super::{ModelTransform, TransformError};
use crate::model::{CanonicalModel, Geometry, LengthUnit, UnitConversion};

/// Converts coordinates, grid origin and spacing, and well depths to a
/// target length unit.
///
/// The source unit is the model's provenance length unit. Attribute values
/// are never touched; their units are independent of the coordinate unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UnitConversionTransform {
    target: LengthUnit,
}

impl UnitConversionTransform {
    /// Convert to `target`.
    pub fn new(target: LengthUnit) -> Self {
        Self { target }
    }

    /// Target unit.
    pub fn target(&self) -> LengthUnit {
        self.target
    }
}

fn scale_points(points: &mut [[f64; 3]], factor: f64) {
    for point in points {
        for c in point.iter_mut() {
            *c *= factor;
        }
    }
}

impl ModelTransform for UnitConversionTransform {
    fn name(&self) -> String {
        format!("unit-conversion:{}", self.target)
    }

    fn apply(&self, model: CanonicalModel) -> std::result::Result<CanonicalModel, TransformError> {
        let from = model.provenance().length_unit;
        if from == self.target {
            return Ok(model);
        }
        let factor = from.factor_to(self.target);
        let mut parts = model.into_parts();

        match &mut parts.geometry {
            Geometry::PointSet { vertices }
            | Geometry::LineSet { vertices, .. }
            | Geometry::Surface { vertices, .. } => scale_points(vertices, factor),
            Geometry::Grid(grid) => {
                for axis in 0..3 {
                    grid.origin[axis] *= factor;
                    grid.spacing[axis] *= factor;
                }
            }
            Geometry::WellLog(well) => {
                for c in well.collar.iter_mut() {
                    *c *= factor;
                }
                for depth in well.depths.iter_mut() {
                    *depth *= factor;
                }
            }
        }

        parts.provenance.length_unit = self.target;
        parts.provenance.unit_conversions.push(UnitConversion {
            quantity: "length".to_string(),
            from: from.symbol().to_string(),
            to: self.target.symbol().to_string(),
            factor,
        });
        rebuild(parts, &self.name())
    }

    fn box_clone(&self) -> Box<dyn ModelTransform> {
        Box::new(*self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ModelBuilder, Provenance, RegularGrid, WellTrajectory};

    #[test]
    fn test_feet_to_metres() {
        let model = ModelBuilder::new("well")
            .with_provenance(Provenance::new("las").with_length_unit(LengthUnit::Foot))
            .with_geometry(Geometry::WellLog(WellTrajectory {
                collar: [0.0, 0.0, 100.0],
                depths: vec![0.0, 10.0],
            }))
            .unwrap()
            .build()
            .unwrap();

        let out = UnitConversionTransform::new(LengthUnit::Metre).apply(model).unwrap();
        let Geometry::WellLog(well) = out.geometry() else {
            panic!("expected well log");
        };
        assert!((well.depths[1] - 3.048).abs() < 1e-12);
        assert!((well.collar[2] - 30.48).abs() < 1e-12);
        assert_eq!(out.provenance().length_unit, LengthUnit::Metre);
        let conversion = &out.provenance().unit_conversions[0];
        assert_eq!((conversion.from.as_str(), conversion.to.as_str()), ("ft", "m"));
    }

    #[test]
    fn test_grid_and_noop() {
        let model = ModelBuilder::new("g")
            .with_provenance(Provenance::new("esri-ascii").with_length_unit(LengthUnit::Kilometre))
            .with_geometry(Geometry::Grid(RegularGrid {
                origin: [1.0, 2.0, 0.0],
                spacing: [0.5, 0.5, 1.0],
                size: [2, 2, 1],
            }))
            .unwrap()
            .build()
            .unwrap();
        let same = UnitConversionTransform::new(LengthUnit::Kilometre)
            .apply(model.clone())
            .unwrap();
        assert_eq!(same, model);

        let out = UnitConversionTransform::new(LengthUnit::Metre).apply(model).unwrap();
        let Geometry::Grid(grid) = out.geometry() else {
            panic!("expected grid");
        };
        assert_eq!(grid.origin, [1000.0, 2000.0, 0.0]);
        assert_eq!(grid.spacing, [500.0, 500.0, 1000.0]);
    }
}
