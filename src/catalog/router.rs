// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Catalog router.
//!
//! Dispatches each read to one source or fans it out across all of them,
//! depending on the registry state and whether the caller named a catalog.
//!
//! | Caller names        | Registry | List queries | By-id reads          |
//! |---------------------|----------|--------------|----------------------|
//! | a known catalog     | any      | direct       | direct               |
//! | nothing / unknown   | Single   | direct       | direct               |
//! | nothing / unknown   | Multi    | fan-out      | probe in order       |
//! | anything            | empty    | no results   | not found            |

use std::collections::HashMap;
use std::sync::Arc;

use tracing::{debug, warn};

use crate::error::StacError;
use crate::metrics;
use crate::search::{EntityKind, ModelKind, SearchBody, SearchRequest, CONTEXT_COLLECTION_AGG};
use crate::storage::{Document, SearchBackend};

use super::pages::{NamedSource, ResultPages};
use super::registry::{CatalogEntry, CatalogRegistry, RegistryState};
use super::searchable::{AggregatedCollections, IndexSearchable, SearchSettings, Searchable, Window};

/// Where a by-id read was found
#[derive(Debug, Clone)]
pub struct Located {
    pub catalog: String,
    pub model: ModelKind,
    pub document: Document,
}

/// Catalog chosen for a read
enum Target {
    Named(NamedSource),
    All(Vec<NamedSource>),
}

pub struct CatalogRouter {
    registry: CatalogRegistry,
    backend: Arc<dyn SearchBackend>,
    settings: SearchSettings,
    /// One searchable per distinct `(index, model)`
    sources: HashMap<(String, ModelKind), Arc<dyn Searchable>>,
}

impl CatalogRouter {
    pub fn new(registry: CatalogRegistry, backend: Arc<dyn SearchBackend>, settings: SearchSettings) -> Self {
        let mut sources: HashMap<(String, ModelKind), Arc<dyn Searchable>> = HashMap::new();
        for entity in [EntityKind::Collection, EntityKind::Item, EntityKind::Asset] {
            for entry in registry.entries(entity) {
                sources
                    .entry((entry.index.clone(), entry.model))
                    .or_insert_with(|| searchable_for(entry, backend.clone(), settings.clone()));
            }
        }
        Self {
            registry,
            backend,
            settings,
            sources,
        }
    }

    pub fn registry(&self) -> &CatalogRegistry {
        &self.registry
    }

    pub fn backend(&self) -> &Arc<dyn SearchBackend> {
        &self.backend
    }

    pub fn settings(&self) -> &SearchSettings {
        &self.settings
    }

    fn named(&self, entry: &CatalogEntry) -> Option<NamedSource> {
        self.sources.get(&(entry.index.clone(), entry.model)).map(|source| NamedSource {
            name: entry.name.clone(),
            source: source.clone(),
        })
    }

    fn resolve(&self, entity: EntityKind, catalog: Option<&str>) -> Target {
        if let Some(name) = catalog {
            match self.registry.entry(entity, name).and_then(|e| self.named(e)) {
                Some(named) => return Target::Named(named),
                None => warn!(catalog = %name, entity = %entity, "Unknown catalog, searching all"),
            }
        }
        Target::All(
            self.registry
                .sources(entity)
                .into_iter()
                .filter_map(|e| self.named(e))
                .collect(),
        )
    }

    /// Backend body the first source would run; used to reject bad
    /// requests before any call goes out.
    pub fn build_query(&self, entity: EntityKind, catalog: Option<&str>, request: &SearchRequest) -> Result<Option<SearchBody>, StacError> {
        let first = match self.resolve(entity, catalog) {
            Target::Named(named) => Some(named),
            Target::All(all) => all.into_iter().next(),
        };
        first.map(|n| n.source.build_query(request)).transpose()
    }

    /// Paged results of a list query.
    ///
    /// Request errors (bad filter, window too large) surface here, before any
    /// backend call.
    pub fn search(&self, entity: EntityKind, catalog: Option<&str>, request: &SearchRequest) -> Result<ResultPages, StacError> {
        request.validate()?;
        let limit = self.settings.limit(request)?;
        let window = Window::of(request, limit);
        self.build_query(entity, catalog, request)?;

        let pages = match self.resolve(entity, catalog) {
            Target::Named(named) => ResultPages::direct(entity, request.clone(), named, window),
            Target::All(mut all) => match all.len() {
                0 => ResultPages::empty(entity),
                1 => ResultPages::direct(entity, request.clone(), all.remove(0), window),
                _ => {
                    debug!(entity = %entity, sources = all.len(), "Fanning out");
                    ResultPages::fan_out(entity, request.clone(), all, window)
                }
            },
        };
        Ok(pages)
    }

    /// Exact number of matches across the resolved sources
    pub async fn count(&self, entity: EntityKind, catalog: Option<&str>, request: &SearchRequest) -> Result<u64, StacError> {
        let sources = match self.resolve(entity, catalog) {
            Target::Named(named) => vec![named],
            Target::All(all) => all,
        };
        let mut total = 0;
        for named in sources {
            total += named.source.count(request).await?;
        }
        Ok(total)
    }

    /// Keys of the context-collection aggregation over every resolved
    /// source, first-seen order. Each source runs a hitless search.
    pub async fn context_collections(
        &self,
        entity: EntityKind,
        catalog: Option<&str>,
        request: &SearchRequest,
    ) -> Result<Vec<String>, StacError> {
        let sources = match self.resolve(entity, catalog) {
            Target::Named(named) => vec![named],
            Target::All(all) => all,
        };
        let mut keys: Vec<String> = Vec::new();
        for named in sources {
            let response = named.source.search(request, Window { from: 0, size: 0 }).await?;
            if let Some(agg) = response.aggregations.get(CONTEXT_COLLECTION_AGG) {
                for bucket in agg.buckets() {
                    if !keys.contains(&bucket.key) {
                        keys.push(bucket.key.clone());
                    }
                }
            }
        }
        Ok(keys)
    }

    /// One entity by id.
    ///
    /// Without a known catalog, sources are probed in registration order; a
    /// miss moves on to the next source, any other error stops the probe.
    pub async fn get(&self, entity: EntityKind, catalog: Option<&str>, id: &str) -> Result<Located, StacError> {
        let sources = match self.resolve(entity, catalog) {
            Target::Named(named) => {
                let document = named.source.get(id).await?;
                return Ok(Located {
                    catalog: named.name,
                    model: named.source.model(),
                    document,
                });
            }
            Target::All(all) => all,
        };

        for named in sources {
            match named.source.get(id).await {
                Ok(document) => {
                    return Ok(Located {
                        catalog: named.name,
                        model: named.source.model(),
                        document,
                    })
                }
                Err(e) if e.is_not_found() => {
                    debug!(catalog = %named.name, entity = %entity, id = %id, "Probe miss");
                    metrics::record_probe_miss(&named.name);
                }
                Err(e) => return Err(e),
            }
        }
        Err(StacError::NotFound(format!("{} {}", capitalized(entity), id)))
    }

    /// Entry that receives writes for `entity`: the named catalog, else the
    /// first registered one.
    pub fn write_target(&self, entity: EntityKind, catalog: Option<&str>) -> Result<&CatalogEntry, StacError> {
        catalog
            .and_then(|name| self.registry.entry(entity, name))
            .or_else(|| self.registry.default_entry(entity))
            .ok_or_else(|| StacError::NotFound(format!("No {} catalog registered", entity)))
    }

    pub fn state(&self, entity: EntityKind) -> RegistryState {
        self.registry.state(entity)
    }
}

fn searchable_for(entry: &CatalogEntry, backend: Arc<dyn SearchBackend>, settings: SearchSettings) -> Arc<dyn Searchable> {
    if entry.model.is_aggregated() {
        Arc::new(AggregatedCollections::new(backend, entry.index.clone(), settings))
    } else {
        Arc::new(IndexSearchable::new(backend, entry.index.clone(), entry.model, settings))
    }
}

fn capitalized(entity: EntityKind) -> &'static str {
    match entity {
        EntityKind::Collection => "Collection",
        EntityKind::Item => "Item",
        EntityKind::Asset => "Asset",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capabilities::Capabilities;
    use crate::storage::InMemoryBackend;
    use serde_json::json;

    async fn router() -> CatalogRouter {
        let backend = Arc::new(InMemoryBackend::new());
        for (index, id) in [("i1", "x"), ("i1", "y"), ("i2", "z")] {
            backend
                .put(index, id, json!({"type": "item", "item_id": id, "collection_id": "c"}))
                .await
                .unwrap();
        }
        let mut registry = CatalogRegistry::new();
        registry.register(EntityKind::Item, "one", "i1", ModelKind::Item).unwrap();
        registry.register(EntityKind::Item, "alias", "i1", ModelKind::Item).unwrap();
        registry.register(EntityKind::Item, "two", "i2", ModelKind::Item).unwrap();
        CatalogRouter::new(registry, backend, SearchSettings::new(Capabilities::all()))
    }

    #[tokio::test]
    async fn test_named_catalog_is_direct() {
        let router = router().await;
        let mut pages = router.search(EntityKind::Item, Some("two"), &SearchRequest::new()).unwrap();
        let all = pages.collect_all().await.unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].hits[0].id, "z");
    }

    #[tokio::test]
    async fn test_unnamed_fans_out_over_distinct_sources() {
        let router = router().await;
        let mut pages = router.search(EntityKind::Item, None, &SearchRequest::new()).unwrap();
        let ids: Vec<String> = pages
            .collect_all()
            .await
            .unwrap()
            .into_iter()
            .flat_map(|p| p.hits.into_iter().map(|d| d.id))
            .collect();
        // the alias shares i1 and is not searched twice
        assert_eq!(ids, vec!["x", "y", "z"]);
        assert_eq!(router.count(EntityKind::Item, None, &SearchRequest::new()).await.unwrap(), 3);
    }

    #[tokio::test]
    async fn test_unknown_catalog_searches_all() {
        let router = router().await;
        assert_eq!(router.count(EntityKind::Item, Some("nope"), &SearchRequest::new()).await.unwrap(), 3);
    }

    #[tokio::test]
    async fn test_get_probes_in_order() {
        let router = router().await;
        let found = router.get(EntityKind::Item, None, "z").await.unwrap();
        assert_eq!(found.catalog, "two");
        let err = router.get(EntityKind::Item, None, "missing").await.unwrap_err();
        assert!(err.is_not_found());
        // a named catalog does not fall back
        assert!(router.get(EntityKind::Item, Some("one"), "z").await.unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn test_unregistered_entity_is_empty() {
        let router = router().await;
        let mut pages = router.search(EntityKind::Collection, None, &SearchRequest::new()).unwrap();
        assert!(pages.next_page().await.unwrap().is_none());
        assert!(router.get(EntityKind::Collection, None, "c").await.unwrap_err().is_not_found());
        assert!(router.write_target(EntityKind::Collection, None).is_err());
        assert_eq!(router.write_target(EntityKind::Item, Some("two")).unwrap().index, "i2");
        assert_eq!(router.write_target(EntityKind::Item, Some("nope")).unwrap().name, "one");
    }

    #[tokio::test]
    async fn test_request_errors_before_backend() {
        let router = router().await;
        let req = SearchRequest {
            limit: Some(20_000),
            ..Default::default()
        };
        assert!(router.search(EntityKind::Item, None, &req).is_err());
    }
}
