// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! LAS 2.0 well logs.
//!
//! The first curve is the depth index; every other curve becomes a float64
//! attribute on the well's samples. Well section entries other than the
//! standard ones are kept as `well.<MNEM>` properties and parameter section
//! entries as `param.<MNEM>`. The collar is taken from `XCOORD`, `YCOORD`
//! and `ELEV`, the CRS from a `CRS` entry.
//!
//! Wrapped files (`WRAP. YES`) are not supported.

use std::collections::BTreeMap;
use std::io::Write;
use std::path::Path;
use std::sync::OnceLock;

use regex::Regex;
use tracing::warn;

use crate::core::{ConvertError, Location, Result};
use crate::io::atomic::write_atomic;
use crate::io::cancel::CancellationToken;
use crate::io::detection::{content_lines, is_text, score};
use crate::io::source::SourceHandle;
use crate::io::traits::{Confidence, FormatAdapter, WriteSummary};
use crate::model::{
    Attribute, AttributeLocation, AttributeValues, CanonicalModel, Crs, Geometry, LengthUnit,
    ModelBuilder, Provenance, WellTrajectory,
};

use super::{format_float, parse_float, CANCEL_CHECK_INTERVAL};

const FORMAT: &str = "las";

/// Null sentinel used when a file does not declare one.
pub const DEFAULT_NULL: f64 = -999.25;

const DEPTH_MNEMONIC: &str = "DEPT";
const STANDARD_WELL_ITEMS: &[&str] = &[
    "STRT", "STOP", "STEP", "NULL", "WELL", "XCOORD", "YCOORD", "ELEV", "CRS",
];

/// Adapter for LAS 2.0 well logs.
#[derive(Debug, Clone, Copy, Default)]
pub struct LasAdapter;

impl FormatAdapter for LasAdapter {
    fn format_id(&self) -> &'static str {
        FORMAT
    }

    fn description(&self) -> &'static str {
        "Log ASCII Standard 2.0 well logs"
    }

    fn extensions(&self) -> &'static [&'static str] {
        &["las"]
    }

    fn lossy_features(&self) -> &'static [&'static str] {
        &[
            "values equal to the NULL sentinel read back as NaN",
            "integer and float32 curves read back as float64",
            "categorical, string and boolean curves are rejected",
            "only well.* and param.* properties are stored",
        ]
    }

    fn detect(&self, source: &SourceHandle) -> Confidence {
        if !is_text(source.header()) {
            return Confidence::NONE;
        }
        let text = source.header_text();
        let header_matches = content_lines(&text, "#")
            .next()
            .map(|line| line.to_ascii_uppercase().starts_with("~V"))
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
        let Geometry::WellLog(well) = model.geometry() else {
            return Err(ConvertError::unsupported(
                FORMAT,
                format!("{} geometry", model.geometry().kind()),
            ));
        };
        let curves = writable_curves(model)?;
        let depth_unit = las_unit(model.provenance().length_unit);

        let bytes_written = write_atomic(target, |f| {
            writeln!(f, "~Version Information")?;
            writeln!(f, " VERS.        2.0 : CWLS LOG ASCII STANDARD - VERSION 2.0")?;
            writeln!(f, " WRAP.        NO  : ONE LINE PER DEPTH STEP")?;

            writeln!(f, "~Well Information")?;
            let first = well.depths.first().copied().unwrap_or(0.0);
            let last = well.depths.last().copied().unwrap_or(0.0);
            let step = uniform_step(&well.depths).unwrap_or(0.0);
            header_line(f, "STRT", depth_unit, &format_float(first), "START DEPTH")?;
            header_line(f, "STOP", depth_unit, &format_float(last), "STOP DEPTH")?;
            header_line(f, "STEP", depth_unit, &format_float(step), "STEP")?;
            header_line(f, "NULL", "", &format_float(DEFAULT_NULL), "NULL VALUE")?;
            header_line(f, "WELL", "", &one_line(model.name()), "WELL")?;
            header_line(f, "XCOORD", depth_unit, &format_float(well.collar[0]), "COLLAR X")?;
            header_line(f, "YCOORD", depth_unit, &format_float(well.collar[1]), "COLLAR Y")?;
            header_line(f, "ELEV", depth_unit, &format_float(well.collar[2]), "ELEVATION")?;
            if model.crs().is_specified() {
                let crs = one_line(&model.crs().to_string());
                header_line(f, "CRS", "", &crs, "COORDINATE REFERENCE SYSTEM")?;
            }
            for (mnemonic, value) in prefixed(model, "well.") {
                header_line(f, mnemonic, "", &one_line(value), "")?;
            }

            writeln!(f, "~Curve Information")?;
            header_line(f, DEPTH_MNEMONIC, depth_unit, "", "DEPTH")?;
            for attr in &curves {
                header_line(
                    f,
                    &attr.name,
                    attr.unit.as_deref().unwrap_or(""),
                    "",
                    &one_line(attr.description.as_deref().unwrap_or("")),
                )?;
            }

            let params: Vec<_> = prefixed(model, "param.").collect();
            if !params.is_empty() {
                writeln!(f, "~Parameter Information")?;
                for (mnemonic, value) in params {
                    header_line(f, mnemonic, "", &one_line(value), "")?;
                }
            }

            if let Some(description) = model.description() {
                writeln!(f, "~Other Information")?;
                for line in description.lines() {
                    writeln!(f, "{line}")?;
                }
            }

            let columns: Vec<Vec<f64>> = curves
                .iter()
                .map(|a| a.values.to_f64().unwrap_or_default())
                .collect();
            let mut header = vec![DEPTH_MNEMONIC.to_string()];
            header.extend(curves.iter().map(|a| a.name.clone()));
            writeln!(f, "~A  {}", header.join(" "))?;
            for (i, depth) in well.depths.iter().enumerate() {
                if i % CANCEL_CHECK_INTERVAL == 0 {
                    cancel.check("las write")?;
                }
                let mut row = vec![format_float(*depth)];
                for column in &columns {
                    let v = column[i];
                    row.push(format_float(if v.is_nan() { DEFAULT_NULL } else { v }));
                }
                writeln!(f, "{}", row.join(" "))?;
            }
            Ok(())
        })?;

        Ok(WriteSummary {
            path: target.to_path_buf(),
            bytes_written,
            elements: well.depths.len(),
        })
    }
}

fn writable_curves(model: &CanonicalModel) -> Result<Vec<&Attribute>> {
    let mut curves = Vec::new();
    for (location, attr) in model.iter_attributes() {
        if location != AttributeLocation::Samples {
            return Err(ConvertError::unsupported(
                FORMAT,
                format!("attributes on {location}"),
            ));
        }
        if !attr.data_type().is_numeric() {
            return Err(ConvertError::unsupported(
                FORMAT,
                format!("{} curve '{}'", attr.data_type(), attr.name),
            ));
        }
        let name = attr.name.as_str();
        if name.is_empty()
            || name.eq_ignore_ascii_case(DEPTH_MNEMONIC)
            || name.contains(['.', ':', '~', '#'])
            || name.chars().any(char::is_whitespace)
        {
            return Err(ConvertError::unsupported(
                FORMAT,
                format!("curve mnemonic '{name}'"),
            ));
        }
        if let Some(unit) = &attr.unit {
            if unit.chars().any(char::is_whitespace) {
                return Err(ConvertError::unsupported(
                    FORMAT,
                    format!("unit '{unit}' of curve '{name}'"),
                ));
            }
        }
        curves.push(attr);
    }
    Ok(curves)
}

fn prefixed<'a>(
    model: &'a CanonicalModel,
    prefix: &'a str,
) -> impl Iterator<Item = (&'a str, &'a str)> + 'a {
    model.properties().iter().filter_map(move |(k, v)| {
        k.strip_prefix(prefix)
            .filter(|m| !m.is_empty() && !m.contains(['.', ' ', ':']))
            .map(|m| (m, v.as_str()))
    })
}

fn header_line(
    f: &mut impl Write,
    mnemonic: &str,
    unit: &str,
    data: &str,
    description: &str,
) -> Result<()> {
    writeln!(f, " {:<8}.{:<6} {:>18} : {}", mnemonic, unit, data, description)?;
    Ok(())
}

fn one_line(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn uniform_step(depths: &[f64]) -> Option<f64> {
    let step = depths.get(1)? - depths.first()?;
    depths
        .windows(2)
        .all(|w| ((w[1] - w[0]) - step).abs() <= 1e-9 * step.abs().max(1.0))
        .then_some(step)
}

fn las_unit(unit: LengthUnit) -> &'static str {
    match unit {
        LengthUnit::Metre => "M",
        LengthUnit::Kilometre => "KM",
        LengthUnit::Foot => "F",
        LengthUnit::UsSurveyFoot => "USFT",
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Section {
    None,
    Version,
    Well,
    Curve,
    Parameter,
    Other,
    Ascii,
}

impl Section {
    fn from_header(line: &str) -> Self {
        match line[1..].trim_start().chars().next().map(|c| c.to_ascii_uppercase()) {
            Some('V') => Section::Version,
            Some('W') => Section::Well,
            Some('C') => Section::Curve,
            Some('P') => Section::Parameter,
            Some('A') => Section::Ascii,
            _ => Section::Other,
        }
    }
}

/// One `MNEM.UNIT DATA : DESCRIPTION` header line.
#[derive(Debug, Clone, PartialEq)]
struct HeaderItem {
    mnemonic: String,
    unit: String,
    data: String,
    description: String,
}

fn header_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^\s*([^.\s][^.]*?)\s*\.(\S*)(.*)$").expect("Invalid regex")
    })
}

fn parse_header_item(line: &str) -> Option<HeaderItem> {
    let caps = header_regex().captures(line)?;
    let rest = caps.get(3).map_or("", |m| m.as_str());
    let (data, description) = rest.rsplit_once(':').unwrap_or((rest, ""));
    Some(HeaderItem {
        mnemonic: caps[1].trim().to_string(),
        unit: caps[2].to_string(),
        data: data.trim().to_string(),
        description: description.trim().to_string(),
    })
}

fn parse(text: &str, source: &SourceHandle, cancel: &CancellationToken) -> Result<CanonicalModel> {
    let mut section = Section::None;
    let mut null = DEFAULT_NULL;
    let mut well_items: Vec<HeaderItem> = Vec::new();
    let mut curves: Vec<(usize, HeaderItem)> = Vec::new();
    let mut properties: BTreeMap<String, String> = BTreeMap::new();
    let mut other: Vec<&str> = Vec::new();
    let mut rows: Vec<(usize, Vec<f64>)> = Vec::new();

    for (i, raw) in text.lines().enumerate() {
        let no = i + 1;
        let line = raw.trim();
        if line.starts_with('~') {
            if section == Section::Ascii {
                return Err(ConvertError::parse_at_line(
                    FORMAT,
                    no,
                    "section after ~A data",
                ));
            }
            section = Section::from_header(line);
            if section == Section::Ascii && curves.is_empty() {
                return Err(ConvertError::parse_at_line(
                    FORMAT,
                    no,
                    "~A section before any curves",
                ));
            }
            continue;
        }
        if section == Section::Other {
            other.push(raw.trim_end());
            continue;
        }
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        match section {
            Section::None => {
                return Err(ConvertError::parse_at_line(
                    FORMAT,
                    no,
                    "data before the first section",
                ));
            }
            Section::Ascii => {
                if rows.len() % CANCEL_CHECK_INTERVAL == 0 {
                    cancel.check("las read")?;
                }
                let values = line
                    .split_whitespace()
                    .map(parse_float)
                    .collect::<Option<Vec<f64>>>()
                    .ok_or_else(|| {
                        ConvertError::parse_at_line(FORMAT, no, "non-numeric value in data section")
                    })?;
                if values.len() != curves.len() {
                    return Err(ConvertError::parse_at_line(
                        FORMAT,
                        no,
                        format!("expected {} values, found {}", curves.len(), values.len()),
                    ));
                }
                rows.push((no, values));
            }
            _ => {
                let item = parse_header_item(line).ok_or_else(|| {
                    ConvertError::parse_at_line(
                        FORMAT,
                        no,
                        "expected 'MNEM.UNIT DATA : DESCRIPTION'",
                    )
                })?;
                match section {
                    Section::Version => match item.mnemonic.to_ascii_uppercase().as_str() {
                        "VERS" => {
                            if !matches!(item.data.as_str(), "2.0" | "2" | "1.2") {
                                return Err(ConvertError::unsupported(
                                    FORMAT,
                                    format!("LAS version {}", item.data),
                                ));
                            }
                        }
                        "WRAP" => {
                            if item.data.eq_ignore_ascii_case("YES") {
                                return Err(ConvertError::unsupported(FORMAT, "wrapped data lines"));
                            }
                        }
                        _ => {}
                    },
                    Section::Well => {
                        if item.mnemonic.eq_ignore_ascii_case("NULL") {
                            null = parse_float(&item.data).ok_or_else(|| {
                                ConvertError::parse_at_line(
                                    FORMAT,
                                    no,
                                    format!("invalid NULL value '{}'", item.data),
                                )
                            })?;
                        }
                        well_items.push(item);
                    }
                    Section::Curve => {
                        if curves.iter().any(|(_, c)| c.mnemonic == item.mnemonic) {
                            return Err(ConvertError::parse_at_line(
                                FORMAT,
                                no,
                                format!("duplicate curve '{}'", item.mnemonic),
                            ));
                        }
                        curves.push((no, item));
                    }
                    Section::Parameter => {
                        properties.insert(format!("param.{}", item.mnemonic), item.data);
                    }
                    _ => {}
                }
            }
        }
    }

    let Some(((_, depth_curve), value_curves)) = curves.split_first() else {
        return Err(ConvertError::parse_at_line(FORMAT, 1, "no ~Curve section"));
    };

    let well_value = |mnemonic: &str| {
        well_items
            .iter()
            .find(|w| w.mnemonic.eq_ignore_ascii_case(mnemonic))
            .map(|w| w.data.as_str())
    };
    let coordinate = |mnemonic: &str| -> Result<f64> {
        match well_value(mnemonic) {
            None | Some("") => Ok(0.0),
            Some(v) => parse_float(v).filter(|x| x.is_finite()).ok_or_else(|| {
                ConvertError::parse(FORMAT, Location::Unknown, format!("invalid {mnemonic} '{v}'"))
            }),
        }
    };
    let collar = [coordinate("XCOORD")?, coordinate("YCOORD")?, coordinate("ELEV")?];

    for item in &well_items {
        let upper = item.mnemonic.to_ascii_uppercase();
        if !STANDARD_WELL_ITEMS.contains(&upper.as_str()) {
            properties.insert(format!("well.{}", item.mnemonic), item.data.clone());
        }
    }

    let length_unit = match depth_curve.unit.parse::<LengthUnit>() {
        Ok(unit) => unit,
        Err(_) => {
            if !depth_curve.unit.is_empty() {
                warn!(unit = %depth_curve.unit, "Unknown depth unit, assuming metres");
            }
            LengthUnit::Metre
        }
    };

    // depth-descending logs are stored ascending
    if rows.len() > 1 && rows[0].1[0] > rows[rows.len() - 1].1[0] {
        rows.reverse();
    }

    let mut depths = Vec::with_capacity(rows.len());
    for (no, row) in &rows {
        if row[0] == null || !row[0].is_finite() {
            return Err(ConvertError::parse_at_line(FORMAT, *no, "depth value is missing"));
        }
        if depths.last().is_some_and(|&prev| row[0] < prev) {
            return Err(ConvertError::parse_at_line(FORMAT, *no, "depths are not monotonic"));
        }
        depths.push(row[0]);
    }

    let provenance = Provenance::new(FORMAT)
        .with_source(source.path().display().to_string())
        .with_length_unit(length_unit);
    let name = well_value("WELL")
        .filter(|w| !w.is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| source.stem());
    let crs = well_value("CRS").map(Crs::parse).unwrap_or_default();

    let mut builder = ModelBuilder::new(name)
        .with_crs(crs)
        .with_provenance(provenance)
        .with_geometry(Geometry::WellLog(WellTrajectory { collar, depths }))?;
    for (key, value) in properties {
        builder.set_property(key, value);
    }
    let description = other.join("\n");
    let description = description.trim();
    if !description.is_empty() {
        builder = builder.with_description(description);
    }

    for (column, (_, curve)) in value_curves.iter().enumerate() {
        let values: Vec<f64> = rows
            .iter()
            .map(|(_, row)| {
                let v = row[column + 1];
                if v == null {
                    f64::NAN
                } else {
                    v
                }
            })
            .collect();
        let mut attribute =
            Attribute::new(curve.mnemonic.clone(), AttributeValues::Float64(values));
        if !curve.unit.is_empty() {
            attribute = attribute.with_unit(curve.unit.clone());
        }
        if !curve.description.is_empty() {
            attribute = attribute.with_description(curve.description.clone());
        }
        builder.add_attribute(AttributeLocation::Samples, attribute)?;
    }
    builder.build()
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "\
~VERSION INFORMATION
 VERS.                 2.0 : CWLS LOG ASCII STANDARD - VERSION 2.0
 WRAP.                  NO : ONE LINE PER DEPTH STEP
~WELL INFORMATION
#MNEM.UNIT       DATA                 DESCRIPTION
 STRT.M        1670.0000 : START DEPTH
 STOP.M        1669.7500 : STOP DEPTH
 STEP.M          -0.1250 : STEP
 NULL.         -999.2500 : NULL VALUE
 WELL.   ANY ET AL 12-34 : WELL
 FLD .           WILDCAT : FIELD
~CURVE INFORMATION
 DEPT.M                  : 1  DEPTH
 DT  .US/M               : 2  SONIC TRANSIT TIME
 RHOB.K/M3               : 3  BULK DENSITY
~PARAMETER INFORMATION
 BHT .DEGC       35.5000 : BOTTOM HOLE TEMPERATURE
~A  DEPTH     DT    RHOB
1670.000   123.450 2550.000
1669.875   123.450 -999.25
1669.750   123.450 2550.000
";

    fn read_text(text: &str) -> Result<CanonicalModel> {
        let source = SourceHandle::from_bytes("mem/well.las", text.as_bytes());
        parse(text, &source, &CancellationToken::new())
    }

    #[test]
    fn test_header_item() {
        let item = parse_header_item(" DT  .US/M      : 2  SONIC TRANSIT TIME").unwrap();
        assert_eq!(item.mnemonic, "DT");
        assert_eq!(item.unit, "US/M");
        assert_eq!(item.data, "");
        assert_eq!(item.description, "2  SONIC TRANSIT TIME");

        let item = parse_header_item(" NULL.   -999.25 : NULL VALUE").unwrap();
        assert_eq!(item.unit, "");
        assert_eq!(item.data, "-999.25");
    }

    #[test]
    fn test_read_sample() {
        let model = read_text(SAMPLE).unwrap();
        assert_eq!(model.name(), "ANY ET AL 12-34");
        assert_eq!(model.property("well.FLD"), Some("WILDCAT"));
        assert_eq!(model.property("param.BHT"), Some("35.5000"));
        let Geometry::WellLog(well) = model.geometry() else {
            panic!("expected well log");
        };
        assert_eq!(well.depths, vec![1669.75, 1669.875, 1670.0]);
        let rhob = model.attribute(AttributeLocation::Samples, "RHOB").unwrap();
        assert_eq!(rhob.unit.as_deref(), Some("K/M3"));
        assert_eq!(rhob.values.nan_count(), 1);
        assert_eq!(model.provenance().length_unit, LengthUnit::Metre);
    }

    #[test]
    fn test_wrapped_rejected() {
        let text = SAMPLE.replace("WRAP.                  NO", "WRAP.                 YES");
        assert!(matches!(
            read_text(&text),
            Err(ConvertError::UnsupportedFeature { .. })
        ));
    }

    #[test]
    fn test_bad_data_line() {
        let text = format!("{SAMPLE}1669.625 1.0\n");
        match read_text(&text) {
            Err(ConvertError::FormatParse { location, .. }) => {
                assert_eq!(location, Location::Line(22));
            }
            other => panic!("expected parse error, got {other:?}"),
        }
    }

    #[test]
    fn test_section_after_data_rejected() {
        let text = "~V\n VERS. 2.0 :\n WRAP. NO :\n~C\n DEPT.M :\n~A\n1.0\n~C\n GR.API :\n~A\n2.0 5.0\n";
        match read_text(text) {
            Err(ConvertError::FormatParse { location, .. }) => {
                assert_eq!(location, Location::Line(8));
            }
            other => panic!("expected parse error, got {other:?}"),
        }
    }

    #[test]
    fn test_detect() {
        let source = SourceHandle::from_bytes("x.txt", SAMPLE.as_bytes());
        assert!(LasAdapter.detect(&source).value() >= 0.5);
        let source = SourceHandle::from_bytes("x.las", b"x,y,z\n");
        assert!(LasAdapter.detect(&source).value() < 0.5);
    }

    #[test]
    fn test_uniform_step() {
        assert_eq!(uniform_step(&[1.0, 1.5, 2.0]), Some(0.5));
        assert_eq!(uniform_step(&[1.0, 1.5, 3.0]), None);
        assert_eq!(uniform_step(&[1.0]), None);
    }
}
