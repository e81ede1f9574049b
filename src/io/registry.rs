// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! Converter registry for adapter selection.
//!
//! Adapters are registered on a [`RegistryBuilder`]; `build()` produces an
//! immutable [`ConverterRegistry`] that can be shared across threads and
//! jobs without locking.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use geocodec::io::formats::CsvPointsAdapter;
//! use geocodec::io::RegistryBuilder;
//!
//! let registry = RegistryBuilder::new()
//!     .register(Arc::new(CsvPointsAdapter))?
//!     .build();
//! assert!(registry.lookup("csv-points").is_ok());
//! # Ok::<(), geocodec::ConvertError>(())
//! ```

use std::collections::HashMap;
use std::fmt;
use std::path::Path;
use std::sync::{Arc, OnceLock};

use crate::core::{ConvertError, Result};

use super::detection::Detection;
use super::formats::builtin_adapters;
use super::source::SourceHandle;
use super::traits::FormatAdapter;

/// Collects adapters before the registry is frozen.
#[derive(Default)]
pub struct RegistryBuilder {
    adapters: Vec<Arc<dyn FormatAdapter>>,
}

impl RegistryBuilder {
    /// Create an empty builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a builder holding every built-in adapter.
    pub fn with_builtin() -> Self {
        Self {
            adapters: builtin_adapters(),
        }
    }

    /// Register an adapter. Identifiers must be unique.
    pub fn register(mut self, adapter: Arc<dyn FormatAdapter>) -> Result<Self> {
        let id = adapter.format_id();
        if self.adapters.iter().any(|a| a.format_id() == id) {
            return Err(ConvertError::config(format!(
                "format '{id}' is already registered"
            )));
        }
        self.adapters.push(adapter);
        Ok(self)
    }

    /// Freeze the registry.
    pub fn build(self) -> ConverterRegistry {
        let index = self
            .adapters
            .iter()
            .enumerate()
            .map(|(i, a)| (a.format_id(), i))
            .collect();
        ConverterRegistry {
            adapters: self.adapters,
            index,
        }
    }
}

/// Immutable set of format adapters.
pub struct ConverterRegistry {
    adapters: Vec<Arc<dyn FormatAdapter>>,
    index: HashMap<&'static str, usize>,
}

impl ConverterRegistry {
    /// Registry with every built-in adapter.
    pub fn builtin() -> Self {
        RegistryBuilder::with_builtin().build()
    }

    /// Score every adapter against `source`.
    ///
    /// Results are sorted by descending confidence; equal scores keep
    /// registration order. Adapters scoring zero are omitted.
    pub fn resolve(&self, source: &SourceHandle) -> Vec<Detection> {
        let mut detections: Vec<Detection> = self
            .adapters
            .iter()
            .map(|a| Detection {
                format_id: a.format_id(),
                confidence: a.detect(source),
            })
            .filter(|d| !d.confidence.is_none())
            .collect();
        // stable sort keeps registration order for ties
        detections.sort_by(|a, b| {
            b.confidence
                .partial_cmp(&a.confidence)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        detections
    }

    /// Look up an adapter by identifier.
    pub fn lookup(&self, format_id: &str) -> Result<Arc<dyn FormatAdapter>> {
        self.index
            .get(format_id)
            .map(|&i| Arc::clone(&self.adapters[i]))
            .ok_or_else(|| ConvertError::not_found(format_id))
    }

    /// Pick the adapter whose extensions include the extension of `path`.
    pub fn by_extension(&self, path: &Path) -> Result<Arc<dyn FormatAdapter>> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_lowercase())
            .ok_or_else(|| ConvertError::not_found(format!("{} (no extension)", path.display())))?;
        self.adapters
            .iter()
            .find(|a| a.extensions().contains(&ext.as_str()))
            .cloned()
            .ok_or_else(|| ConvertError::not_found(format!(".{ext}")))
    }

    /// Registered adapters in registration order.
    pub fn formats(&self) -> impl Iterator<Item = &Arc<dyn FormatAdapter>> {
        self.adapters.iter()
    }

    /// Registered format identifiers in registration order.
    pub fn format_ids(&self) -> Vec<&'static str> {
        self.adapters.iter().map(|a| a.format_id()).collect()
    }

    /// Number of registered adapters.
    pub fn len(&self) -> usize {
        self.adapters.len()
    }

    /// Check if no adapters are registered.
    pub fn is_empty(&self) -> bool {
        self.adapters.is_empty()
    }
}

impl fmt::Debug for ConverterRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConverterRegistry")
            .field("formats", &self.format_ids())
            .finish()
    }
}

static GLOBAL_REGISTRY: OnceLock<Arc<ConverterRegistry>> = OnceLock::new();

/// Install the process-wide registry.
///
/// Must be called at most once, before the first call to
/// [`global_registry`].
pub fn init_global_registry(registry: ConverterRegistry) -> Result<()> {
    GLOBAL_REGISTRY
        .set(Arc::new(registry))
        .map_err(|_| ConvertError::config("global registry is already initialized"))
}

/// Get the process-wide registry, initializing it with the built-in
/// adapters on first use.
pub fn global_registry() -> Arc<ConverterRegistry> {
    Arc::clone(GLOBAL_REGISTRY.get_or_init(|| Arc::new(ConverterRegistry::builtin())))
}
