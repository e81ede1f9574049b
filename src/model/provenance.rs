// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! Provenance metadata recorded on every canonical model.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::core::{ConvertError, Result};

/// Length unit of coordinates and depths.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum LengthUnit {
    #[default]
    Metre,
    Kilometre,
    Foot,
    UsSurveyFoot,
}

impl LengthUnit {
    /// Length of one unit in metres.
    pub fn metres(&self) -> f64 {
        match self {
            LengthUnit::Metre => 1.0,
            LengthUnit::Kilometre => 1000.0,
            LengthUnit::Foot => 0.3048,
            LengthUnit::UsSurveyFoot => 1200.0 / 3937.0,
        }
    }

    /// Factor that converts a value in `self` into `target`.
    pub fn factor_to(&self, target: LengthUnit) -> f64 {
        if *self == target {
            1.0
        } else {
            self.metres() / target.metres()
        }
    }

    /// Short symbol.
    pub fn symbol(&self) -> &'static str {
        match self {
            LengthUnit::Metre => "m",
            LengthUnit::Kilometre => "km",
            LengthUnit::Foot => "ft",
            LengthUnit::UsSurveyFoot => "us-ft",
        }
    }
}

impl fmt::Display for LengthUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

impl std::str::FromStr for LengthUnit {
    type Err = ConvertError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "m" | "metre" | "meter" | "metres" | "meters" => Ok(LengthUnit::Metre),
            "km" | "kilometre" | "kilometer" => Ok(LengthUnit::Kilometre),
            "ft" | "f" | "foot" | "feet" => Ok(LengthUnit::Foot),
            "us-ft" | "usft" | "ftus" | "us-foot" => Ok(LengthUnit::UsSurveyFoot),
            other => Err(ConvertError::config(format!("unknown length unit '{other}'"))),
        }
    }
}

/// An explicit unit conversion applied to the model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnitConversion {
    /// Quantity that was converted (e.g. "length")
    pub quantity: String,
    /// Source unit symbol
    pub from: String,
    /// Target unit symbol
    pub to: String,
    /// Multiplicative factor applied
    pub factor: f64,
}

/// Where a canonical model came from and what was done to it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Provenance {
    /// Format identifier the model was read from
    pub source_format: String,
    /// Source path or remote object id
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    /// When the model was created
    pub converted_at: DateTime<Utc>,
    /// Unit of coordinates and depths
    #[serde(default)]
    pub length_unit: LengthUnit,
    /// Explicit unit conversions, in application order
    #[serde(default)]
    pub unit_conversions: Vec<UnitConversion>,
    /// Names of transforms applied, in order
    #[serde(default)]
    pub lineage: Vec<String>,
}

impl Provenance {
    /// Create provenance for a model read from `source_format` now.
    pub fn new(source_format: impl Into<String>) -> Self {
        Self {
            source_format: source_format.into(),
            source: None,
            converted_at: Utc::now(),
            length_unit: LengthUnit::default(),
            unit_conversions: Vec::new(),
            lineage: Vec::new(),
        }
    }

    /// Set the source path or id.
    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }

    /// Set the length unit.
    pub fn with_length_unit(mut self, unit: LengthUnit) -> Self {
        self.length_unit = unit;
        self
    }
}

impl Default for Provenance {
    fn default() -> Self {
        Self::new("unknown")
    }
}
