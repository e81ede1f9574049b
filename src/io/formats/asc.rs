// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! ESRI ASCII rasters.
//!
//! A raster maps to a single-layer [`RegularGrid`] with one float64 cell
//! attribute called `value`. Rows in the file run north to south; grid
//! cells are stored south to north. A sibling `.prj` file, when present,
//! supplies the CRS.

use std::io::Write;
use std::path::Path;

use tracing::debug;

use crate::core::{ConvertError, Result};
use crate::io::atomic::write_atomic;
use crate::io::cancel::CancellationToken;
use crate::io::detection::{content_lines, is_text, score};
use crate::io::source::SourceHandle;
use crate::io::traits::{Confidence, FormatAdapter, WriteSummary};
use crate::model::{
    Attribute, AttributeLocation, AttributeValues, CanonicalModel, Crs, Geometry, ModelBuilder,
    Provenance, RegularGrid,
};

use super::{format_float, parse_float, CANCEL_CHECK_INTERVAL};

const FORMAT: &str = "esri-ascii";

/// NODATA sentinel written for NaN cells.
pub const NODATA: f64 = -9999.0;

/// Name of the attribute produced on read.
pub const VALUE_ATTRIBUTE: &str = "value";

/// Adapter for ESRI ASCII grids.
#[derive(Debug, Clone, Copy, Default)]
pub struct EsriAsciiAdapter;

impl FormatAdapter for EsriAsciiAdapter {
    fn format_id(&self) -> &'static str {
        FORMAT
    }

    fn description(&self) -> &'static str {
        "ESRI ASCII raster grid with a single cell value"
    }

    fn extensions(&self) -> &'static [&'static str] {
        &["asc"]
    }

    fn lossy_features(&self) -> &'static [&'static str] {
        &[
            "attribute name is not stored (reads back as 'value')",
            "NODATA sentinel reads back as NaN",
            "integer and float32 values read back as float64",
            "z spacing is not stored (reads back as 1)",
            "CRS, length unit, description and properties are not stored",
        ]
    }

    fn detect(&self, source: &SourceHandle) -> Confidence {
        if !is_text(source.header()) {
            return Confidence::NONE;
        }
        let text = source.header_text();
        let header_matches = content_lines(&text, "#")
            .next()
            .and_then(|line| line.split_whitespace().next())
            .map(|key| key.eq_ignore_ascii_case("ncols") || key.eq_ignore_ascii_case("nrows"))
            .unwrap_or(false);
        score(source, self.extensions(), header_matches)
    }

    fn read(&self, source: &SourceHandle, cancel: &CancellationToken) -> Result<CanonicalModel> {
        let text = source.read_to_string()?;
        let crs = read_prj(source.path());
        parse(&text, source, crs, cancel)
    }

    fn write(
        &self,
        model: &CanonicalModel,
        target: &Path,
        cancel: &CancellationToken,
    ) -> Result<WriteSummary> {
        let Geometry::Grid(grid) = model.geometry() else {
            return Err(ConvertError::unsupported(
                FORMAT,
                format!("{} geometry", model.geometry().kind()),
            ));
        };
        if grid.size[2] != 1 {
            return Err(ConvertError::unsupported(
                FORMAT,
                format!("grid with {} layers", grid.size[2]),
            ));
        }
        if grid.origin[2] != 0.0 {
            return Err(ConvertError::unsupported(FORMAT, "grid origin with non-zero z"));
        }
        let attributes: Vec<(AttributeLocation, &Attribute)> = model.iter_attributes().collect();
        let values = match attributes.as_slice() {
            [(AttributeLocation::Cells, attr)] => attr.values.to_f64().ok_or_else(|| {
                ConvertError::unsupported(FORMAT, format!("{} cell values", attr.data_type()))
            })?,
            _ => {
                return Err(ConvertError::unsupported(
                    FORMAT,
                    format!(
                        "{} attributes (exactly one numeric cell attribute is required)",
                        attributes.len()
                    ),
                ))
            }
        };

        let [nx, ny, _] = grid.size;
        let bytes_written = write_atomic(target, |f| {
            writeln!(f, "ncols {nx}")?;
            writeln!(f, "nrows {ny}")?;
            writeln!(f, "xllcorner {}", format_float(grid.origin[0]))?;
            writeln!(f, "yllcorner {}", format_float(grid.origin[1]))?;
            if grid.spacing[0] == grid.spacing[1] {
                writeln!(f, "cellsize {}", format_float(grid.spacing[0]))?;
            } else {
                writeln!(f, "dx {}", format_float(grid.spacing[0]))?;
                writeln!(f, "dy {}", format_float(grid.spacing[1]))?;
            }
            writeln!(f, "NODATA_value {}", format_float(NODATA))?;

            for row in 0..ny {
                if row % CANCEL_CHECK_INTERVAL == 0 {
                    cancel.check("esri-ascii write")?;
                }
                let j = ny - 1 - row;
                let line: Vec<String> = (0..nx)
                    .map(|i| {
                        let v = values[grid.cell_index(i, j, 0)];
                        format_float(if v.is_nan() { NODATA } else { v })
                    })
                    .collect();
                writeln!(f, "{}", line.join(" "))?;
            }
            Ok(())
        })?;

        Ok(WriteSummary {
            path: target.to_path_buf(),
            bytes_written,
            elements: grid.cell_count(),
        })
    }
}

fn read_prj(path: &Path) -> Crs {
    let prj = path.with_extension("prj");
    match std::fs::read_to_string(&prj) {
        Ok(text) => {
            debug!(path = %prj.display(), "Read CRS from projection file");
            Crs::parse(&text)
        }
        Err(_) => Crs::Unspecified,
    }
}

#[derive(Debug, Default)]
struct Header {
    ncols: Option<usize>,
    nrows: Option<usize>,
    xll: Option<(f64, bool)>,
    yll: Option<(f64, bool)>,
    cellsize: Option<f64>,
    dx: Option<f64>,
    dy: Option<f64>,
    nodata: Option<f64>,
}

fn parse(
    text: &str,
    source: &SourceHandle,
    crs: Crs,
    cancel: &CancellationToken,
) -> Result<CanonicalModel> {
    let mut header = Header::default();
    let mut lines = text.lines().enumerate().map(|(i, l)| (i + 1, l.trim())).peekable();

    while let Some(&(no, line)) = lines.peek() {
        if line.is_empty() {
            lines.next();
            continue;
        }
        let mut parts = line.split_whitespace();
        let key = parts.next().unwrap_or_default().to_ascii_lowercase();
        if key.starts_with(|c: char| c.is_ascii_digit() || c == '-' || c == '+' || c == '.') {
            break;
        }
        let value = parts
            .next()
            .ok_or_else(|| ConvertError::parse_at_line(FORMAT, no, format!("missing value for {key}")))?;
        let number = parse_float(value)
            .ok_or_else(|| ConvertError::parse_at_line(FORMAT, no, format!("invalid {key} '{value}'")))?;
        let count = || -> Result<usize> {
            value
                .parse::<usize>()
                .map_err(|_| ConvertError::parse_at_line(FORMAT, no, format!("invalid {key} '{value}'")))
        };
        match key.as_str() {
            "ncols" => header.ncols = Some(count()?),
            "nrows" => header.nrows = Some(count()?),
            "xllcorner" => header.xll = Some((number, false)),
            "xllcenter" => header.xll = Some((number, true)),
            "yllcorner" => header.yll = Some((number, false)),
            "yllcenter" => header.yll = Some((number, true)),
            "cellsize" => header.cellsize = Some(number),
            "dx" => header.dx = Some(number),
            "dy" => header.dy = Some(number),
            "nodata_value" => header.nodata = Some(number),
            other => {
                return Err(ConvertError::parse_at_line(
                    FORMAT,
                    no,
                    format!("unknown header key '{other}'"),
                ))
            }
        }
        lines.next();
    }

    let missing = |what: &str| ConvertError::parse_at_line(FORMAT, 1, format!("missing {what} header"));
    let nx = header.ncols.ok_or_else(|| missing("ncols"))?;
    let ny = header.nrows.ok_or_else(|| missing("nrows"))?;
    let dx = header.dx.or(header.cellsize).ok_or_else(|| missing("cellsize"))?;
    let dy = header.dy.or(header.cellsize).ok_or_else(|| missing("cellsize"))?;
    let (x, x_center) = header.xll.ok_or_else(|| missing("xllcorner"))?;
    let (y, y_center) = header.yll.ok_or_else(|| missing("yllcorner"))?;
    let origin = [
        if x_center { x - dx / 2.0 } else { x },
        if y_center { y - dy / 2.0 } else { y },
        0.0,
    ];

    let grid = RegularGrid {
        origin,
        spacing: [dx, dy, 1.0],
        size: [nx, ny, 1],
    };
    // every cell needs at least one byte of text
    let total = nx
        .checked_mul(ny)
        .filter(|&total| total <= text.len())
        .ok_or_else(|| {
            ConvertError::parse_at_line(
                FORMAT,
                1,
                format!("grid of {nx}x{ny} cells exceeds the file size"),
            )
        })?;
    let mut values = vec![f64::NAN; total];
    let mut read = 0usize;
    let mut last_line = 1;

    for (count, (no, line)) in lines.enumerate() {
        if count % CANCEL_CHECK_INTERVAL == 0 {
            cancel.check("esri-ascii read")?;
        }
        last_line = no;
        for token in line.split_whitespace() {
            let v = parse_float(token).ok_or_else(|| {
                ConvertError::parse_at_line(FORMAT, no, format!("invalid cell value '{token}'"))
            })?;
            if read >= total {
                return Err(ConvertError::parse_at_line(
                    FORMAT,
                    no,
                    format!("more than {total} cell values"),
                ));
            }
            let (row, i) = (read / nx, read % nx);
            let j = ny - 1 - row;
            values[grid.cell_index(i, j, 0)] = if Some(v) == header.nodata { f64::NAN } else { v };
            read += 1;
        }
    }
    if read != total {
        return Err(ConvertError::parse_at_line(
            FORMAT,
            last_line,
            format!("expected {total} cell values, found {read}"),
        ));
    }

    let provenance = Provenance::new(FORMAT).with_source(source.path().display().to_string());
    ModelBuilder::new(source.stem())
        .with_crs(crs)
        .with_provenance(provenance)
        .with_geometry(Geometry::Grid(grid))?
        .with_attribute(
            AttributeLocation::Cells,
            Attribute::new(VALUE_ATTRIBUTE, AttributeValues::Float64(values)),
        )?
        .build()
}
