// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! Delimited point tables.
//!
//! ```text
//! # geocodec csv-points
//! # name: collars
//! # crs: EPSG:32633
//! # unit: m
//! # types: float64,categorical
//! # units: g/t,
//! x,y,z,grade,lithology
//! 512.0,1024.5,-3.0,0.82,granite
//! ```
//!
//! The `# ...` directives are optional when reading. Without `# types`,
//! column types are inferred (int64, float64, bool, or string). The
//! delimiter is sniffed from the header row: comma, tab, semicolon, or
//! runs of whitespace.

use std::io::Write;
use std::path::Path;

use tracing::warn;

use crate::core::{ConvertError, Result};
use crate::io::atomic::write_atomic;
use crate::io::cancel::CancellationToken;
use crate::io::detection::{content_lines, is_text, score};
use crate::io::source::SourceHandle;
use crate::io::traits::{Confidence, FormatAdapter, WriteSummary};
use crate::model::{
    Attribute, AttributeLocation, AttributeValues, CanonicalModel, Crs, DataType, Geometry,
    LengthUnit, ModelBuilder, Point3, Provenance,
};

use super::{format_float, parse_float, CANCEL_CHECK_INTERVAL};

const FORMAT: &str = "csv-points";
const MAGIC: &str = "# geocodec csv-points";

/// Adapter for `csv-points`.
#[derive(Debug, Clone, Copy, Default)]
pub struct CsvPointsAdapter;

impl FormatAdapter for CsvPointsAdapter {
    fn format_id(&self) -> &'static str {
        FORMAT
    }

    fn description(&self) -> &'static str {
        "Delimited point table with x, y, z and attribute columns"
    }

    fn extensions(&self) -> &'static [&'static str] {
        &["csv", "xyz"]
    }

    fn lossy_features(&self) -> &'static [&'static str] {
        &[
            "categorical codes are renumbered by first appearance",
            "model description and properties are not stored",
            "attribute descriptions are not stored",
            "line breaks in WKT are collapsed to spaces",
        ]
    }

    fn detect(&self, source: &SourceHandle) -> Confidence {
        if !is_text(source.header()) {
            return Confidence::NONE;
        }
        let text = source.header_text();
        let header_matches = text.starts_with(MAGIC)
            || content_lines(&text, "#")
                .next()
                .and_then(|line| split_record(line, Delimiter::sniff(line)).ok())
                .map(|names| coordinate_columns(&names).is_some())
                .unwrap_or(false);
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
        let Geometry::PointSet { vertices } = model.geometry() else {
            return Err(ConvertError::unsupported(
                FORMAT,
                format!("{} geometry", model.geometry().kind()),
            ));
        };
        let attributes: Vec<&Attribute> = model
            .attributes(AttributeLocation::Vertices)
            .map(|c| c.iter().collect())
            .unwrap_or_default();
        check_writable(&attributes)?;

        let bytes_written = write_atomic(target, |f| {
            writeln!(f, "{MAGIC}")?;
            writeln!(f, "# name: {}", single_line(model.name()))?;
            if model.crs().is_specified() {
                writeln!(f, "# crs: {}", single_line(&model.crs().to_string()))?;
            }
            writeln!(f, "# unit: {}", model.provenance().length_unit)?;
            if !attributes.is_empty() {
                let types: Vec<&str> = attributes.iter().map(|a| a.data_type().as_str()).collect();
                writeln!(f, "# types: {}", types.join(","))?;
                let units: Vec<&str> = attributes
                    .iter()
                    .map(|a| a.unit.as_deref().unwrap_or(""))
                    .collect();
                writeln!(f, "# units: {}", units.join(","))?;
            }

            let mut header = vec!["x".to_string(), "y".to_string(), "z".to_string()];
            header.extend(attributes.iter().map(|a| quote(&a.name)));
            writeln!(f, "{}", header.join(","))?;

            for (i, p) in vertices.iter().enumerate() {
                if i % CANCEL_CHECK_INTERVAL == 0 {
                    cancel.check("csv-points write")?;
                }
                let mut row = vec![format_float(p[0]), format_float(p[1]), format_float(p[2])];
                for attr in &attributes {
                    row.push(cell(&attr.values, i));
                }
                writeln!(f, "{}", row.join(","))?;
            }
            Ok(())
        })?;

        Ok(WriteSummary {
            path: target.to_path_buf(),
            bytes_written,
            elements: vertices.len(),
        })
    }
}

fn check_writable(attributes: &[&Attribute]) -> Result<()> {
    for attr in attributes {
        if matches!(attr.name.to_ascii_lowercase().as_str(), "x" | "y" | "z") {
            return Err(ConvertError::unsupported(
                FORMAT,
                format!("attribute name '{}' collides with a coordinate column", attr.name),
            ));
        }
        if attr.name.contains('\n') {
            return Err(ConvertError::unsupported(FORMAT, "line breaks in attribute names"));
        }
        if let Some(unit) = &attr.unit {
            if unit.contains(',') || unit.contains('\n') {
                return Err(ConvertError::unsupported(
                    FORMAT,
                    format!("unit '{unit}' of attribute '{}'", attr.name),
                ));
            }
        }
        if let AttributeValues::String(values) = &attr.values {
            if values.iter().any(|v| v.contains('\n')) {
                return Err(ConvertError::unsupported(FORMAT, "line breaks in string values"));
            }
        }
        if let AttributeValues::Categorical { lookup, .. } = &attr.values {
            if lookup.values().any(|v| v.is_empty() || v.contains('\n')) {
                return Err(ConvertError::unsupported(
                    FORMAT,
                    "empty or multi-line category labels",
                ));
            }
        }
    }
    Ok(())
}

fn single_line(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn cell(values: &AttributeValues, index: usize) -> String {
    match values {
        AttributeValues::Float64(v) if v[index].is_nan() => String::new(),
        AttributeValues::Float32(v) if v[index].is_nan() => String::new(),
        AttributeValues::Float64(v) => format_float(v[index]),
        AttributeValues::String(v) => quote(&v[index]),
        other => quote(&other.display_value(index).unwrap_or_default()),
    }
}

fn quote(field: &str) -> String {
    let needs = field.contains(',')
        || field.contains('"')
        || field.starts_with(char::is_whitespace)
        || field.ends_with(char::is_whitespace);
    if needs {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Delimiter {
    Char(char),
    Whitespace,
}

impl Delimiter {
    fn sniff(header: &str) -> Self {
        [',', '\t', ';']
            .into_iter()
            .find(|c| header.contains(*c))
            .map(Delimiter::Char)
            .unwrap_or(Delimiter::Whitespace)
    }
}

/// Split one record, honouring double quotes for character delimiters.
fn split_record(line: &str, delimiter: Delimiter) -> std::result::Result<Vec<String>, String> {
    let sep = match delimiter {
        Delimiter::Whitespace => {
            return Ok(line.split_whitespace().map(str::to_string).collect());
        }
        Delimiter::Char(c) => c,
    };

    let mut fields = Vec::new();
    let mut field = String::new();
    let mut quoted = false;
    let mut in_quotes = false;
    let mut chars = line.chars().peekable();
    while let Some(c) = chars.next() {
        if in_quotes {
            if c == '"' {
                if chars.peek() == Some(&'"') {
                    field.push('"');
                    chars.next();
                } else {
                    in_quotes = false;
                }
            } else {
                field.push(c);
            }
        } else if c == '"' && field.trim().is_empty() {
            field.clear();
            quoted = true;
            in_quotes = true;
        } else if c == sep {
            fields.push(finish_field(&mut field, quoted));
            quoted = false;
        } else {
            field.push(c);
        }
    }
    if in_quotes {
        return Err("unterminated quoted field".to_string());
    }
    fields.push(finish_field(&mut field, quoted));
    Ok(fields)
}

fn finish_field(field: &mut String, quoted: bool) -> String {
    let value = std::mem::take(field);
    if quoted {
        value
    } else {
        value.trim().to_string()
    }
}

fn coordinate_columns(names: &[String]) -> Option<[usize; 3]> {
    let find = |axis: &str| names.iter().position(|n| n.eq_ignore_ascii_case(axis));
    Some([find("x")?, find("y")?, find("z")?])
}

#[derive(Debug, Default)]
struct Directives {
    name: Option<String>,
    crs: Option<Crs>,
    unit: Option<(usize, String)>,
    types: Option<(usize, Vec<String>)>,
    units: Option<Vec<String>>,
}

impl Directives {
    fn apply(&mut self, line_no: usize, comment: &str) {
        let Some((key, value)) = comment.split_once(':') else {
            return;
        };
        let value = value.trim();
        match key.trim().to_ascii_lowercase().as_str() {
            "name" => self.name = Some(value.to_string()),
            "crs" => self.crs = Some(Crs::parse(value)),
            "unit" => self.unit = Some((line_no, value.to_string())),
            "types" => {
                self.types = Some((line_no, value.split(',').map(|s| s.trim().to_string()).collect()))
            }
            "units" => self.units = Some(value.split(',').map(|s| s.trim().to_string()).collect()),
            _ => {}
        }
    }
}

fn parse(text: &str, source: &SourceHandle, cancel: &CancellationToken) -> Result<CanonicalModel> {
    let mut directives = Directives::default();
    let mut lines = text.lines().enumerate().map(|(i, l)| (i + 1, l.trim()));

    let (header_no, header) = loop {
        match lines.next() {
            None => return Err(ConvertError::parse_at_line(FORMAT, 1, "missing header row")),
            Some((_, "")) => continue,
            Some((no, line)) => match line.strip_prefix('#') {
                Some(comment) => directives.apply(no, comment),
                None => break (no, line),
            },
        }
    };

    let delimiter = Delimiter::sniff(header);
    let names = split_record(header, delimiter)
        .map_err(|m| ConvertError::parse_at_line(FORMAT, header_no, m))?;
    let coords = coordinate_columns(&names).ok_or_else(|| {
        ConvertError::parse_at_line(FORMAT, header_no, "header must contain x, y and z columns")
    })?;
    let attr_columns: Vec<usize> = (0..names.len()).filter(|i| !coords.contains(i)).collect();

    let declared: Option<Vec<DataType>> = match &directives.types {
        None => None,
        Some((no, types)) => {
            if types.len() != attr_columns.len() {
                return Err(ConvertError::parse_at_line(
                    FORMAT,
                    *no,
                    format!(
                        "{} types declared for {} attribute columns",
                        types.len(),
                        attr_columns.len()
                    ),
                ));
            }
            let parsed = types
                .iter()
                .map(|t| t.parse::<DataType>())
                .collect::<Result<Vec<_>>>()
                .map_err(|e| ConvertError::parse_at_line(FORMAT, *no, e.to_string()))?;
            Some(parsed)
        }
    };

    let mut vertices: Vec<Point3> = Vec::new();
    let mut raw: Vec<Vec<String>> = vec![Vec::new(); attr_columns.len()];
    let mut row_lines: Vec<usize> = Vec::new();

    for (count, (no, line)) in lines.enumerate() {
        if count % CANCEL_CHECK_INTERVAL == 0 {
            cancel.check("csv-points read")?;
        }
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let fields =
            split_record(line, delimiter).map_err(|m| ConvertError::parse_at_line(FORMAT, no, m))?;
        if fields.len() != names.len() {
            return Err(ConvertError::parse_at_line(
                FORMAT,
                no,
                format!("expected {} fields, found {}", names.len(), fields.len()),
            ));
        }
        let mut point = [0.0; 3];
        for (axis, &col) in coords.iter().enumerate() {
            point[axis] = parse_float(&fields[col])
                .filter(|v| v.is_finite())
                .ok_or_else(|| {
                    ConvertError::parse_at_line(
                        FORMAT,
                        no,
                        format!("invalid coordinate '{}' in column {}", fields[col], names[col]),
                    )
                })?;
        }
        vertices.push(point);
        for (slot, &col) in raw.iter_mut().zip(&attr_columns) {
            slot.push(fields[col].clone());
        }
        row_lines.push(no);
    }

    let length_unit = match directives.unit {
        None => LengthUnit::default(),
        Some((no, unit)) => unit
            .parse::<LengthUnit>()
            .map_err(|e| ConvertError::parse_at_line(FORMAT, no, e.to_string()))?,
    };
    let provenance = Provenance::new(FORMAT)
        .with_source(source.path().display().to_string())
        .with_length_unit(length_unit);

    let mut builder = ModelBuilder::new(directives.name.clone().unwrap_or_else(|| source.stem()))
        .with_crs(directives.crs.clone().unwrap_or_default())
        .with_provenance(provenance)
        .with_geometry(Geometry::PointSet { vertices })?;

    for (i, (values, &col)) in raw.into_iter().zip(&attr_columns).enumerate() {
        let dtype = match &declared {
            Some(types) => types[i],
            None => infer(&values),
        };
        let values = column_values(values, dtype, &row_lines, &names[col])?;
        let mut attribute = Attribute::new(names[col].clone(), values);
        if let Some(unit) = directives.units.as_ref().and_then(|u| u.get(i)) {
            if !unit.is_empty() {
                attribute = attribute.with_unit(unit.clone());
            }
        }
        builder.add_attribute(AttributeLocation::Vertices, attribute)?;
    }
    if directives.types.is_none() && !attr_columns.is_empty() {
        warn!(
            source = %source.path().display(),
            "No type directive found, attribute column types were inferred"
        );
    }
    builder.build()
}

fn infer(values: &[String]) -> DataType {
    let non_empty = || values.iter().filter(|v| !v.is_empty());
    if non_empty().next().is_none() {
        return DataType::Float64;
    }
    let all_present = values.iter().all(|v| !v.is_empty());
    if all_present && values.iter().all(|v| v.parse::<i64>().is_ok()) {
        DataType::Int64
    } else if non_empty().all(|v| parse_float(v).is_some()) {
        DataType::Float64
    } else if all_present
        && values
            .iter()
            .all(|v| v.eq_ignore_ascii_case("true") || v.eq_ignore_ascii_case("false"))
    {
        DataType::Bool
    } else {
        DataType::String
    }
}

fn column_values(
    raw: Vec<String>,
    dtype: DataType,
    lines: &[usize],
    name: &str,
) -> Result<AttributeValues> {
    fn each<T>(
        raw: &[String],
        lines: &[usize],
        name: &str,
        parse: impl Fn(&str) -> Option<T>,
    ) -> Result<Vec<T>> {
        raw.iter()
            .zip(lines)
            .map(|(v, &no)| {
                parse(v).ok_or_else(|| {
                    ConvertError::parse_at_line(FORMAT, no, format!("invalid value '{v}' for {name}"))
                })
            })
            .collect()
    }

    Ok(match dtype {
        DataType::Bool => AttributeValues::Bool(each(&raw, lines, name, |v| {
            match v.to_ascii_lowercase().as_str() {
                "true" | "1" => Some(true),
                "false" | "0" => Some(false),
                _ => None,
            }
        })?),
        DataType::Int32 => AttributeValues::Int32(each(&raw, lines, name, |v| v.parse().ok())?),
        DataType::Int64 => AttributeValues::Int64(each(&raw, lines, name, |v| v.parse().ok())?),
        DataType::Float32 => AttributeValues::Float32(each(&raw, lines, name, |v| {
            if v.is_empty() {
                Some(f32::NAN)
            } else {
                parse_float(v).map(|x| x as f32)
            }
        })?),
        DataType::Float64 => AttributeValues::Float64(each(&raw, lines, name, |v| {
            if v.is_empty() {
                Some(f64::NAN)
            } else {
                parse_float(v)
            }
        })?),
        DataType::Categorical => AttributeValues::categorical_from_labels(&raw),
        DataType::String => AttributeValues::String(raw),
    })
}
