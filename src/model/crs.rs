// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! Coordinate reference system metadata.
//!
//! The CRS is carried through a conversion unchanged; geocodec never
//! reprojects coordinates.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Spatial reference attached to a geometry.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Crs {
    /// EPSG registry code
    Epsg(u32),
    /// Well-known text definition
    Wkt(String),
    /// No spatial reference given
    #[default]
    Unspecified,
}

impl Crs {
    /// Parse a CRS from `EPSG:<code>`, a bare code, or WKT text.
    ///
    /// Empty input yields [`Crs::Unspecified`].
    pub fn parse(text: &str) -> Crs {
        let text = text.trim();
        if text.is_empty() || text.eq_ignore_ascii_case("unspecified") {
            return Crs::Unspecified;
        }
        let code = text
            .strip_prefix("EPSG:")
            .or_else(|| text.strip_prefix("epsg:"))
            .unwrap_or(text);
        match code.trim().parse::<u32>() {
            Ok(code) => Crs::Epsg(code),
            Err(_) => Crs::Wkt(text.to_string()),
        }
    }

    /// Check if a spatial reference is present.
    pub fn is_specified(&self) -> bool {
        !matches!(self, Crs::Unspecified)
    }

    /// EPSG code, if this CRS is one.
    pub fn epsg(&self) -> Option<u32> {
        match self {
            Crs::Epsg(code) => Some(*code),
            _ => None,
        }
    }
}

impl fmt::Display for Crs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Crs::Epsg(code) => write!(f, "EPSG:{code}"),
            Crs::Wkt(wkt) => f.write_str(wkt),
            Crs::Unspecified => f.write_str("unspecified"),
        }
    }
}
