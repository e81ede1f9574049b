// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! Built-in format adapters.
//!
//! - [`csv`]: delimited point tables (`csv-points`)
//! - [`obj`]: Wavefront OBJ meshes and polylines (`obj`)
//! - [`las`]: LAS 2.0 well logs (`las`)
//! - [`asc`]: ESRI ASCII rasters (`esri-ascii`)
//! - [`gcb`]: lossless native binary container (`geocodec-binary`)

pub mod asc;
pub mod csv;
pub mod gcb;
pub mod las;
pub mod obj;

use std::sync::Arc;

pub use asc::EsriAsciiAdapter;
pub use csv::CsvPointsAdapter;
pub use gcb::BinaryAdapter;
pub use las::LasAdapter;
pub use obj::ObjAdapter;

use super::traits::FormatAdapter;

/// Records processed between cancellation checks.
pub(crate) const CANCEL_CHECK_INTERVAL: usize = 4096;

/// Every built-in adapter, in registration order.
pub fn builtin_adapters() -> Vec<Arc<dyn FormatAdapter>> {
    vec![
        Arc::new(BinaryAdapter::default()),
        Arc::new(CsvPointsAdapter),
        Arc::new(ObjAdapter),
        Arc::new(LasAdapter),
        Arc::new(EsriAsciiAdapter),
    ]
}

/// Render a float so that parsing it back yields the same value.
pub(crate) fn format_float(value: f64) -> String {
    if value.is_nan() {
        "NaN".to_string()
    } else {
        value.to_string()
    }
}

/// Parse a float, accepting `NaN`/`inf` spellings.
pub(crate) fn parse_float(text: &str) -> Option<f64> {
    let text = text.trim();
    match text.to_ascii_lowercase().as_str() {
        "nan" => Some(f64::NAN),
        _ => text.parse::<f64>().ok(),
    }
}
