// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! Lookup of schema definitions by id and version.

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::{Arc, RwLock};

use tracing::debug;

use crate::core::{ConvertError, Result};

use super::definition::{SchemaDefinition, SchemaVersion};

/// Source of schema definitions.
///
/// The schema registry is an external collaborator; implementations may
/// read from disk, memory, or a remote service.
pub trait SchemaProvider: Send + Sync {
    /// Look up a schema. `None` for the version selects the latest one.
    fn schema(&self, id: &str, version: Option<SchemaVersion>) -> Result<Arc<SchemaDefinition>>;
}

/// Thread-safe in-memory schema catalog.
///
/// Uses RwLock for concurrent read access with exclusive write access.
pub struct SchemaCatalog {
    inner: RwLock<BTreeMap<String, BTreeMap<SchemaVersion, Arc<SchemaDefinition>>>>,
}

impl SchemaCatalog {
    /// Create an empty catalog.
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(BTreeMap::new()),
        }
    }

    /// Load every `.json` and `.toml` file in `dir`.
    pub fn from_dir<P: AsRef<Path>>(dir: P) -> Result<Self> {
        let dir = dir.as_ref();
        let catalog = Self::new();
        let entries = std::fs::read_dir(dir)
            .map_err(|e| ConvertError::io(format!("reading schema dir {}", dir.display()), &e))?;

        let mut paths: Vec<_> = entries
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|p| {
                matches!(
                    p.extension().and_then(|e| e.to_str()),
                    Some("json") | Some("toml")
                )
            })
            .collect();
        paths.sort();

        for path in paths {
            let schema = SchemaDefinition::from_path(&path)?;
            debug!(
                schema = %schema.qualified_name(),
                path = %path.display(),
                "Loaded schema"
            );
            catalog.register(schema)?;
        }
        Ok(catalog)
    }

    /// Register a schema; an existing entry with the same id and version is replaced.
    pub fn register(&self, schema: SchemaDefinition) -> Result<()> {
        let mut inner = self
            .inner
            .write()
            .map_err(|e| ConvertError::config(format!("Schema catalog lock poisoned: {e}")))?;
        inner
            .entry(schema.id.clone())
            .or_default()
            .insert(schema.version, Arc::new(schema));
        Ok(())
    }

    /// Check if any version of `id` is registered.
    pub fn contains(&self, id: &str) -> Result<bool> {
        let inner = self
            .inner
            .read()
            .map_err(|e| ConvertError::config(format!("Schema catalog lock poisoned: {e}")))?;
        Ok(inner.contains_key(id))
    }

    /// All registered `id@version` names, sorted.
    pub fn names(&self) -> Result<Vec<String>> {
        let inner = self
            .inner
            .read()
            .map_err(|e| ConvertError::config(format!("Schema catalog lock poisoned: {e}")))?;
        Ok(inner
            .values()
            .flat_map(|versions| versions.values().map(|s| s.qualified_name()))
            .collect())
    }

    /// Number of registered schema versions.
    pub fn len(&self) -> Result<usize> {
        let inner = self
            .inner
            .read()
            .map_err(|e| ConvertError::config(format!("Schema catalog lock poisoned: {e}")))?;
        Ok(inner.values().map(|v| v.len()).sum())
    }

    /// Check if the catalog is empty.
    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }
}

impl Default for SchemaCatalog {
    fn default() -> Self {
        Self::new()
    }
}

impl SchemaProvider for SchemaCatalog {
    fn schema(&self, id: &str, version: Option<SchemaVersion>) -> Result<Arc<SchemaDefinition>> {
        let inner = self
            .inner
            .read()
            .map_err(|e| ConvertError::config(format!("Schema catalog lock poisoned: {e}")))?;
        let versions = inner
            .get(id)
            .ok_or_else(|| ConvertError::config(format!("unknown schema '{id}'")))?;
        let found = match version {
            Some(v) => versions.get(&v),
            None => versions.values().next_back(),
        };
        found.cloned().ok_or_else(|| {
            ConvertError::config(format!(
                "schema '{id}' has no version {}",
                version.map(|v| v.to_string()).unwrap_or_default()
            ))
        })
    }
}
