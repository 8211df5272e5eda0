// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Catalog registry.
//!
//! Maps catalog names to backing indices per entity kind. Populated once at
//! startup (in configuration order) and read-only afterwards.
//!
//! # State Machine
//!
//! Per entity kind, counted over distinct `(index, model)` sources:
//!
//! ```text
//! ┌──────────────┐  register   ┌────────┐  register (new source)  ┌───────┐
//! │ Unregistered │ ──────────► │ Single │ ──────────────────────► │ Multi │
//! └──────────────┘             └────────┘                         └───────┘
//! ```
//!
//! Several catalog names may share one source; they stay `Single` and never
//! trigger fan-out.

use std::collections::BTreeMap;

use tracing::info;

use crate::config::CatalogConfig;
use crate::error::StacError;
use crate::metrics;
use crate::search::{EntityKind, ModelKind};

/// Registration state for one entity kind
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegistryState {
    Unregistered,
    /// One backing source, possibly under several names
    Single,
    /// Several distinct backing sources; list queries fan out
    Multi,
}

/// One named catalog's backing index for an entity kind
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogEntry {
    pub name: String,
    pub index: String,
    pub model: ModelKind,
}

impl CatalogEntry {
    fn same_source(&self, other: &CatalogEntry) -> bool {
        self.index == other.index && self.model == other.model
    }
}

#[derive(Debug, Clone, Default)]
pub struct CatalogRegistry {
    entries: BTreeMap<EntityKind, Vec<CatalogEntry>>,
}

impl CatalogRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register every index of every configured catalog, in order
    pub fn from_config(catalogs: &[CatalogConfig]) -> Result<Self, StacError> {
        let mut registry = Self::new();
        for catalog in catalogs {
            for entity in [EntityKind::Collection, EntityKind::Item, EntityKind::Asset] {
                if let Some(index) = catalog.index(entity) {
                    registry.register(entity, &catalog.name, &index.index, index.model_for(entity))?;
                }
            }
        }
        Ok(registry)
    }

    /// Add a catalog. Startup only.
    pub fn register(
        &mut self,
        entity: EntityKind,
        name: &str,
        index: &str,
        model: ModelKind,
    ) -> Result<RegistryState, StacError> {
        if model.entity() != entity {
            return Err(StacError::invalid(format!(
                "catalog '{}': model {} does not serve {}s",
                name, model, entity
            )));
        }
        let entries = self.entries.entry(entity).or_default();
        if entries.iter().any(|e| e.name == name) {
            return Err(StacError::invalid(format!(
                "catalog '{}' already has a {} index",
                name, entity
            )));
        }
        entries.push(CatalogEntry {
            name: name.to_string(),
            index: index.to_string(),
            model,
        });

        let state = self.state(entity);
        info!(catalog = %name, entity = %entity, index = %index, model = %model, state = ?state, "Registered catalog");
        metrics::set_registered_catalogs(&entity.to_string(), self.entries(entity).len());
        Ok(state)
    }

    pub fn state(&self, entity: EntityKind) -> RegistryState {
        match self.sources(entity).len() {
            0 => RegistryState::Unregistered,
            1 => RegistryState::Single,
            _ => RegistryState::Multi,
        }
    }

    /// All entries for an entity kind, in registration order
    pub fn entries(&self, entity: EntityKind) -> &[CatalogEntry] {
        self.entries.get(&entity).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn entry(&self, entity: EntityKind, name: &str) -> Option<&CatalogEntry> {
        self.entries(entity).iter().find(|e| e.name == name)
    }

    /// First entry of each distinct `(index, model)`, in registration order
    pub fn sources(&self, entity: EntityKind) -> Vec<&CatalogEntry> {
        let mut sources: Vec<&CatalogEntry> = Vec::new();
        for entry in self.entries(entity) {
            if !sources.iter().any(|s| s.same_source(entry)) {
                sources.push(entry);
            }
        }
        sources
    }

    /// Catalog that receives writes when none is named
    pub fn default_entry(&self, entity: EntityKind) -> Option<&CatalogEntry> {
        self.entries(entity).first()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.values().all(Vec::is_empty)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::IndexConfig;

    #[test]
    fn test_state_transitions() {
        let mut registry = CatalogRegistry::new();
        assert_eq!(registry.state(EntityKind::Item), RegistryState::Unregistered);

        let s = registry.register(EntityKind::Item, "a", "items", ModelKind::Item).unwrap();
        assert_eq!(s, RegistryState::Single);

        // same backing index under a second name: still single
        let s = registry.register(EntityKind::Item, "b", "items", ModelKind::Item).unwrap();
        assert_eq!(s, RegistryState::Single);

        let s = registry.register(EntityKind::Item, "c", "eo-items", ModelKind::EoItem).unwrap();
        assert_eq!(s, RegistryState::Multi);

        assert_eq!(registry.entries(EntityKind::Item).len(), 3);
        let names: Vec<&str> = registry.sources(EntityKind::Item).iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, vec!["a", "c"]);
        // other kinds untouched
        assert_eq!(registry.state(EntityKind::Collection), RegistryState::Unregistered);
    }

    #[test]
    fn test_rejects_mismatched_model_and_duplicates() {
        let mut registry = CatalogRegistry::new();
        assert!(registry.register(EntityKind::Item, "a", "x", ModelKind::Collection).is_err());
        registry.register(EntityKind::Item, "a", "x", ModelKind::Item).unwrap();
        assert!(registry.register(EntityKind::Item, "a", "y", ModelKind::Item).is_err());
    }

    #[test]
    fn test_from_config_keeps_order() {
        let catalogs = vec![
            CatalogConfig::new("first")
                .with_index(EntityKind::Item, IndexConfig::new("i1"))
                .with_index(EntityKind::Collection, IndexConfig::new("c1")),
            CatalogConfig::new("second").with_index(
                EntityKind::Item,
                IndexConfig::new("eo").with_model(ModelKind::EoItem),
            ),
        ];
        let registry = CatalogRegistry::from_config(&catalogs).unwrap();
        assert_eq!(registry.default_entry(EntityKind::Item).unwrap().name, "first");
        assert_eq!(registry.entry(EntityKind::Item, "second").unwrap().model, ModelKind::EoItem);
        assert_eq!(registry.state(EntityKind::Item), RegistryState::Multi);
        assert_eq!(registry.state(EntityKind::Collection), RegistryState::Single);
        assert!(!registry.is_empty());
    }
}
