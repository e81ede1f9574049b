// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! Attribute renaming transformation.
//!
//! Provides attribute renaming with regex-based wildcard pattern support and
//! collision resolution.

use std::collections::{HashMap, HashSet};

use regex::Regex;
use tracing::warn;

use super::pipeline::rebuild;
use super::{ModelTransform, TransformError};
use crate::model::{AttributeLocation, CanonicalModel};

/// A wildcard attribute mapping using compiled regex.
#[derive(Debug, Clone)]
struct WildcardMapping {
    /// Compiled regex pattern for matching (e.g., r"^assay_(.*)$")
    pattern: Regex,
    /// Target template with `${groupN}` placeholders
    target_template: String,
}

impl WildcardMapping {
    fn new(pattern: &str, target: &str) -> std::result::Result<Self, TransformError> {
        let mut regex_pattern = String::from("^");
        for c in pattern.chars() {
            match c {
                '*' => regex_pattern.push_str("(.*)"),
                _ => regex_pattern.push_str(&regex::escape(c.encode_utf8(&mut [0; 4]))),
            }
        }
        regex_pattern.push('$');

        let mut target_template = String::new();
        let mut group_idx = 0;
        for c in target.chars() {
            if c == '*' {
                group_idx += 1;
                target_template.push_str(&format!("${{group{group_idx}}}"));
            } else {
                target_template.push(c);
            }
        }

        let compiled = Regex::new(&regex_pattern).map_err(|e| TransformError::InvalidRule {
            rule: format!("{pattern} -> {target}"),
            reason: format!("Failed to compile regex: {e}"),
        })?;

        Ok(Self {
            pattern: compiled,
            target_template,
        })
    }

    fn apply(&self, name: &str) -> Option<String> {
        self.pattern.captures(name).map(|caps| {
            let mut result = self.target_template.clone();
            for i in 1..caps.len() {
                if let Some(captured) = caps.get(i) {
                    result = result.replace(&format!("${{group{i}}}"), captured.as_str());
                }
            }
            result
        })
    }
}

/// Attribute renaming transformation.
///
/// Renames attributes using exact mappings or wildcard patterns. Names are
/// resolved per attribute location; when a new name is already taken at
/// that location, numeric suffixes are added (`grade`, `grade_2`, ...).
#[derive(Debug, Clone, Default)]
pub struct AttributeRenameTransform {
    /// Exact mappings: source -> target
    mappings: HashMap<String, String>,
    /// Wildcard mappings (sorted by pattern length, longest first)
    wildcard_mappings: Vec<WildcardMapping>,
}

impl AttributeRenameTransform {
    /// Create a new empty rename transform.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a transform from a HashMap of exact mappings.
    pub fn from_map(mappings: HashMap<String, String>) -> Self {
        Self {
            mappings,
            wildcard_mappings: Vec::new(),
        }
    }

    /// Add an exact rename mapping.
    pub fn add_mapping(&mut self, source: impl Into<String>, target: impl Into<String>) {
        self.mappings.insert(source.into(), target.into());
    }

    /// Add a wildcard rename mapping such as `assay_*` → `*_ppm`.
    pub fn add_wildcard_mapping(
        &mut self,
        pattern: impl Into<String>,
        target: impl Into<String>,
    ) -> std::result::Result<(), TransformError> {
        let mapping = WildcardMapping::new(&pattern.into(), &target.into())?;
        self.wildcard_mappings.push(mapping);
        self.wildcard_mappings
            .sort_by(|a, b| b.pattern.as_str().len().cmp(&a.pattern.as_str().len()));
        Ok(())
    }

    /// Get the number of exact mappings configured.
    pub fn len(&self) -> usize {
        self.mappings.len()
    }

    /// Get the number of wildcard mappings configured.
    pub fn wildcard_len(&self) -> usize {
        self.wildcard_mappings.len()
    }

    /// Check if any mappings are configured.
    pub fn is_empty(&self) -> bool {
        self.mappings.is_empty() && self.wildcard_mappings.is_empty()
    }

    /// New name for `name`, before collision resolution.
    pub fn rename(&self, name: &str) -> String {
        if let Some(target) = self.mappings.get(name) {
            return target.clone();
        }
        self.wildcard_mappings
            .iter()
            .find_map(|m| m.apply(name))
            .unwrap_or_else(|| name.to_string())
    }
}

impl ModelTransform for AttributeRenameTransform {
    fn name(&self) -> String {
        "attribute-rename".to_string()
    }

    fn validate(&self, model: &CanonicalModel) -> std::result::Result<(), TransformError> {
        let existing: HashSet<&str> = model.iter_attributes().map(|(_, a)| a.name.as_str()).collect();
        let mut sources: Vec<&String> = self.mappings.keys().collect();
        sources.sort();
        for source in sources {
            if !existing.contains(source.as_str()) {
                return Err(TransformError::NotFound {
                    name: source.clone(),
                    kind: "attribute",
                });
            }
        }
        Ok(())
    }

    fn apply(&self, model: CanonicalModel) -> std::result::Result<CanonicalModel, TransformError> {
        if self.is_empty() {
            return Ok(model);
        }
        let mut parts = model.into_parts();

        let targets: Vec<Option<String>> = parts
            .attributes
            .iter()
            .map(|(_, attr)| Some(self.rename(&attr.name)).filter(|t| *t != attr.name))
            .collect();

        // Attributes that keep their name claim it first
        let mut taken: HashSet<(AttributeLocation, String)> = parts
            .attributes
            .iter()
            .zip(&targets)
            .filter(|(_, target)| target.is_none())
            .map(|((location, attr), _)| (*location, attr.name.clone()))
            .collect();

        for ((location, attr), target) in parts.attributes.iter_mut().zip(targets) {
            let Some(target) = target else {
                continue;
            };
            if target.is_empty() {
                return Err(TransformError::InvalidRule {
                    rule: attr.name.clone(),
                    reason: "rename produces an empty attribute name".to_string(),
                });
            }
            let mut candidate = target.clone();
            let mut suffix = 2;
            while taken.contains(&(*location, candidate.clone())) {
                candidate = format!("{target}_{suffix}");
                suffix += 1;
            }
            if candidate != target {
                warn!(
                    attribute = %attr.name,
                    target = %target,
                    resolved = %candidate,
                    "Attribute rename collision resolved with suffix"
                );
            }
            taken.insert((*location, candidate.clone()));
            attr.name = candidate;
        }

        rebuild(parts, &self.name())
    }

    fn box_clone(&self) -> Box<dyn ModelTransform> {
        Box::new(self.clone())
    }
}
