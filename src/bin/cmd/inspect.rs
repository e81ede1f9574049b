// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! Inspect command - show geometry, attributes, and provenance of a file.

use std::path::PathBuf;

use clap::Args;

use crate::common::{format_bytes, read_model, Result};
use geocodec::{CanonicalModel, Geometry};

/// Show file information.
#[derive(Args, Clone, Debug)]
pub struct InspectCmd {
    /// Input file
    #[arg(value_name = "FILE")]
    input: PathBuf,

    /// Input format (detected when omitted)
    #[arg(long, value_name = "FORMAT")]
    from: Option<String>,

    /// Minimum detection confidence
    #[arg(long, default_value_t = 0.5)]
    min_confidence: f32,
}

impl InspectCmd {
    pub fn run(self) -> Result<()> {
        let (format_id, model) =
            read_model(&self.input, self.from.as_deref(), self.min_confidence)?;
        let size = std::fs::metadata(&self.input).map(|m| m.len()).unwrap_or(0);

        println!("=== {} ===", self.input.display());
        println!("Format:      {format_id}");
        println!("Size:        {}", format_bytes(size));
        print_model(&model);
        Ok(())
    }
}

fn print_model(model: &CanonicalModel) {
    println!("Name:        {}", model.name());
    if let Some(description) = model.description() {
        println!("Description: {description}");
    }
    println!("Geometry:    {}", model.geometry().kind());
    print_geometry(model.geometry());

    if let Some(bbox) = model.bounding_box() {
        println!(
            "Bounds:      [{:.3}, {:.3}, {:.3}] - [{:.3}, {:.3}, {:.3}]",
            bbox.min[0], bbox.min[1], bbox.min[2], bbox.max[0], bbox.max[1], bbox.max[2]
        );
    }

    let provenance = model.provenance();
    println!("CRS:         {}", model.crs());
    println!("Length unit: {}", provenance.length_unit);
    println!("Source:      {}", provenance.source_format);
    println!("Converted:   {}", provenance.converted_at.to_rfc3339());
    if !provenance.lineage.is_empty() {
        println!("Lineage:     {}", provenance.lineage.join(" -> "));
    }
    for conversion in &provenance.unit_conversions {
        println!(
            "Unit change: {} {} -> {} (x{})",
            conversion.quantity, conversion.from, conversion.to, conversion.factor
        );
    }

    if !model.properties().is_empty() {
        println!();
        println!("Properties:");
        for (key, value) in model.properties() {
            println!("  {key} = {value}");
        }
    }

    if model.attribute_count() > 0 {
        println!();
        println!(
            "{:<10} {:<24} {:<12} {:>8} {:>6} {:<10}",
            "Location", "Attribute", "Type", "Count", "NaN", "Unit"
        );
        println!("{}", "-".repeat(76));
        for (location, attribute) in model.iter_attributes() {
            println!(
                "{:<10} {:<24} {:<12} {:>8} {:>6} {:<10}",
                location.as_str(),
                attribute.name,
                attribute.data_type().as_str(),
                attribute.len(),
                attribute.values.nan_count(),
                attribute.unit.as_deref().unwrap_or("-")
            );
        }
    }
}

fn print_geometry(geometry: &Geometry) {
    match geometry {
        Geometry::PointSet { vertices } => println!("Points:      {}", vertices.len()),
        Geometry::LineSet { vertices, segments } => {
            println!("Vertices:    {}", vertices.len());
            println!("Segments:    {}", segments.len());
        }
        Geometry::Surface {
            vertices,
            triangles,
        } => {
            println!("Vertices:    {}", vertices.len());
            println!("Triangles:   {}", triangles.len());
        }
        Geometry::Grid(grid) => {
            println!(
                "Size:        {} x {} x {} ({} cells)",
                grid.size[0],
                grid.size[1],
                grid.size[2],
                grid.cell_count()
            );
            println!(
                "Spacing:     {} x {} x {}",
                grid.spacing[0], grid.spacing[1], grid.spacing[2]
            );
        }
        Geometry::WellLog(well) => {
            println!(
                "Collar:      {}, {}, {}",
                well.collar[0], well.collar[1], well.collar[2]
            );
            println!("Samples:     {}", well.depths.len());
            if let (Some(first), Some(last)) = (well.depths.first(), well.depths.last()) {
                println!("Depths:      {first} - {last}");
            }
        }
    }
}
