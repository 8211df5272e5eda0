// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! One catalog source behind a uniform interface.
//!
//! [`IndexSearchable`] serves documents stored in an index.
//! [`AggregatedCollections`] synthesizes collections from a terms
//! aggregation over EO item documents. The router and the paged result
//! sequence only see [`Searchable`].

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{json, Map, Value};
use tracing::debug;

use crate::capabilities::Capabilities;
use crate::error::StacError;
use crate::metrics;
use crate::search::{Aggregation, ModelKind, QueryComposer, SearchBody, SearchRequest};
use crate::storage::{AggregationResult, Bucket, Document, SearchBackend, SearchResponse};
use crate::time_operation;

/// Name of the terms aggregation behind synthesized collections
const COLLECTIONS_AGG: &str = "platforms";
const TEMPORAL_MIN: &str = "temporal_min";
const TEMPORAL_MAX: &str = "temporal_max";

/// Composition settings shared by every source
#[derive(Debug, Clone)]
pub struct SearchSettings {
    pub capabilities: Arc<Capabilities>,
    pub max_result_window: usize,
    pub default_limit: usize,
    /// Bucket count for collection aggregations
    pub collections_limit: usize,
    /// Stored fields faceted into synthesized collection summaries
    pub summary_fields: Vec<String>,
}

impl SearchSettings {
    pub fn new(capabilities: Capabilities) -> Self {
        Self {
            capabilities: Arc::new(capabilities),
            max_result_window: crate::search::MAX_RESULT_WINDOW,
            default_limit: crate::search::DEFAULT_LIMIT,
            collections_limit: 1_000,
            summary_fields: Vec::new(),
        }
    }

    pub fn composer(&self, model: ModelKind) -> QueryComposer<'_> {
        QueryComposer::new(&self.capabilities, model.naming())
            .with_limits(self.max_result_window, self.default_limit)
            .with_context_buckets(self.collections_limit)
    }

    /// Effective page size of a request, checked against the result window
    pub fn limit(&self, request: &SearchRequest) -> Result<usize, StacError> {
        self.composer(ModelKind::Item).limit(request)
    }
}

/// Slice of one source's matches to fetch
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Window {
    pub from: usize,
    pub size: usize,
}

impl Window {
    /// The window a request asks for on its own
    pub fn of(request: &SearchRequest, limit: usize) -> Self {
        Self {
            from: request.offset(limit),
            size: limit,
        }
    }
}

#[async_trait]
pub trait Searchable: Send + Sync {
    fn model(&self) -> ModelKind;

    /// The backend body this source would run for `request`
    fn build_query(&self, request: &SearchRequest) -> Result<SearchBody, StacError>;

    /// Number of entities matching `request`
    async fn count(&self, request: &SearchRequest) -> Result<u64, StacError>;

    /// Fetch one window of matches
    async fn search(&self, request: &SearchRequest, window: Window) -> Result<SearchResponse, StacError>;

    /// One entity by id; [`StacError::NotFound`] when absent
    async fn get(&self, id: &str) -> Result<Document, StacError>;
}

fn status_of(result: &Result<impl Sized, StacError>) -> &'static str {
    match result {
        Ok(_) => "success",
        Err(e) if e.is_not_found() => "not_found",
        Err(_) => "error",
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// Stored entities
// ═══════════════════════════════════════════════════════════════════════════

/// Entities stored one document each in an index
pub struct IndexSearchable {
    backend: Arc<dyn SearchBackend>,
    index: String,
    model: ModelKind,
    settings: SearchSettings,
}

impl IndexSearchable {
    pub fn new(backend: Arc<dyn SearchBackend>, index: impl Into<String>, model: ModelKind, settings: SearchSettings) -> Self {
        Self {
            backend,
            index: index.into(),
            model,
            settings,
        }
    }

    pub fn index(&self) -> &str {
        &self.index
    }
}

#[async_trait]
impl Searchable for IndexSearchable {
    fn model(&self) -> ModelKind {
        self.model
    }

    fn build_query(&self, request: &SearchRequest) -> Result<SearchBody, StacError> {
        self.settings.composer(self.model).compose(request)
    }

    async fn count(&self, request: &SearchRequest) -> Result<u64, StacError> {
        let body = self.settings.composer(self.model).compose_count(request)?;
        let entity = self.model.entity().as_str();
        let result = {
            let _timer = time_operation!(entity, "count");
            self.backend.count(&self.index, &body).await.map_err(StacError::from)
        };
        metrics::record_backend_query(entity, "count", status_of(&result));
        result
    }

    async fn search(&self, request: &SearchRequest, window: Window) -> Result<SearchResponse, StacError> {
        let body = self
            .build_query(request)?
            .with_window((window.from > 0).then_some(window.from), Some(window.size));
        let entity = self.model.entity().as_str();
        let result = {
            let _timer = time_operation!(entity, "search");
            self.backend.search(&self.index, &body).await.map_err(StacError::from)
        };
        metrics::record_backend_query(entity, "search", status_of(&result));
        let response = result?;
        debug!(index = %self.index, hits = response.hits.len(), total = response.total, "Index search");
        Ok(response)
    }

    async fn get(&self, id: &str) -> Result<Document, StacError> {
        let result = self.backend.get(&self.index, id).await.map_err(StacError::from);
        metrics::record_backend_query(self.model.entity().as_str(), "get", status_of(&result));
        result
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// Aggregation-synthesized collections
// ═══════════════════════════════════════════════════════════════════════════

/// Collections computed from EO item documents.
///
/// One collection per distinct platform, with a temporal extent from the
/// min start / max end of its items and facet summaries over the configured
/// fields. Nothing is stored for these collections.
pub struct AggregatedCollections {
    backend: Arc<dyn SearchBackend>,
    index: String,
    settings: SearchSettings,
}

impl AggregatedCollections {
    pub fn new(backend: Arc<dyn SearchBackend>, index: impl Into<String>, settings: SearchSettings) -> Self {
        Self {
            backend,
            index: index.into(),
            settings,
        }
    }

    /// Collection ids filter the platform field, not the item id
    fn item_request(request: &SearchRequest) -> SearchRequest {
        let mut items = request.clone();
        items.collections.extend(items.ids.drain(..));
        items.page = None;
        items.limit = None;
        items.context_collection = false;
        items.fields = None;
        items.sortby.clear();
        items
    }

    fn platform_aggregation(&self) -> Aggregation {
        let naming = ModelKind::EoItem.naming();
        let mut agg = Aggregation::terms(naming.collection, self.settings.collections_limit)
            .bucket(TEMPORAL_MIN, Aggregation::Min { field: naming.temporal.start.to_string() })
            .bucket(TEMPORAL_MAX, Aggregation::Max { field: naming.temporal.end.to_string() });
        for field in &self.settings.summary_fields {
            agg = agg.bucket(summary_name(field), Aggregation::terms(format!("{}.keyword", field), 100));
        }
        agg
    }

    async fn buckets(&self, request: &SearchRequest) -> Result<Vec<Bucket>, StacError> {
        let body = self.build_query(request)?;
        let result = {
            let _timer = time_operation!("collection", "aggregate");
            self.backend.search(&self.index, &body).await.map_err(StacError::from)
        };
        metrics::record_backend_query("collection", "aggregate", status_of(&result));
        let mut response = result?;
        let buckets = match response.aggregations.remove(COLLECTIONS_AGG) {
            Some(AggregationResult::Buckets(b)) => b,
            _ => Vec::new(),
        };
        debug!(index = %self.index, buckets = buckets.len(), "Collection aggregation");
        Ok(buckets)
    }

    fn to_document(&self, bucket: &Bucket) -> Document {
        let metric = |name: &str| match bucket.aggregations.get(name) {
            Some(AggregationResult::Metric { value_as_string, .. }) => {
                value_as_string.clone().map(Value::String).unwrap_or(Value::Null)
            }
            _ => Value::Null,
        };

        let mut summaries = Map::new();
        for field in &self.settings.summary_fields {
            let name = summary_name(field);
            if let Some(AggregationResult::Buckets(values)) = bucket.aggregations.get(name) {
                if !values.is_empty() {
                    summaries.insert(
                        name.to_string(),
                        values.iter().map(|b| Value::from(b.key.as_str())).collect(),
                    );
                }
            }
        }

        let source = json!({
            "type": "collection",
            "title": bucket.key,
            "description": "",
            "license": "",
            "item_count": bucket.doc_count,
            "summaries": summaries,
            "extent": {
                "temporal": { "gte": metric(TEMPORAL_MIN), "lte": metric(TEMPORAL_MAX) }
            }
        });
        Document::new(bucket.key.clone(), self.index.clone(), source)
    }
}

/// Facet name for a stored summary field (its last path segment)
fn summary_name(field: &str) -> &str {
    field.rsplit('.').next().unwrap_or(field)
}

#[async_trait]
impl Searchable for AggregatedCollections {
    fn model(&self) -> ModelKind {
        ModelKind::EoCollection
    }

    fn build_query(&self, request: &SearchRequest) -> Result<SearchBody, StacError> {
        self.settings.limit(request)?;
        let items = Self::item_request(request);
        let query = self.settings.composer(ModelKind::EoItem).compose_query(&items)?;
        Ok(SearchBody::new(query)
            .with_window(None, Some(0))
            .with_agg(COLLECTIONS_AGG, self.platform_aggregation()))
    }

    async fn count(&self, request: &SearchRequest) -> Result<u64, StacError> {
        Ok(self.buckets(request).await?.len() as u64)
    }

    async fn search(&self, request: &SearchRequest, window: Window) -> Result<SearchResponse, StacError> {
        let buckets = self.buckets(request).await?;
        let total = buckets.len() as u64;
        let hits = buckets
            .iter()
            .skip(window.from)
            .take(window.size)
            .map(|b| self.to_document(b))
            .collect();
        Ok(SearchResponse {
            hits,
            total,
            aggregations: BTreeMap::new(),
        })
    }

    async fn get(&self, id: &str) -> Result<Document, StacError> {
        let request = SearchRequest {
            collections: vec![id.to_string()],
            ..Default::default()
        };
        self.buckets(&request)
            .await?
            .iter()
            .find(|b| b.key == id)
            .map(|b| self.to_document(b))
            .ok_or_else(|| StacError::NotFound(format!("Collection {}", id)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::InMemoryBackend;

    fn eo_item(platform: &str, start: &str, end: &str, mission: &str) -> Value {
        json!({
            "misc": {"platform": {"Satellite": platform, "Mission": mission}},
            "temporal": {"start_time": start, "end_time": end}
        })
    }

    async fn eo_backend() -> Arc<InMemoryBackend> {
        let backend = Arc::new(InMemoryBackend::new());
        for (id, doc) in [
            ("p1", eo_item("sentinel1a", "2020-01-01T00:00:00Z", "2020-01-02T00:00:00Z", "S1")),
            ("p2", eo_item("sentinel1a", "2020-03-01T00:00:00Z", "2020-03-05T00:00:00Z", "S1")),
            ("p3", eo_item("sentinel2b", "2021-06-01T00:00:00Z", "2021-06-02T00:00:00Z", "S2")),
        ] {
            backend.put("eo", id, doc).await.unwrap();
        }
        backend
    }

    fn settings() -> SearchSettings {
        let mut s = SearchSettings::new(Capabilities::all());
        s.summary_fields = vec!["misc.platform.Mission".into()];
        s
    }

    #[tokio::test]
    async fn test_index_searchable_window() {
        let backend = Arc::new(InMemoryBackend::new());
        for i in 0..5 {
            backend
                .put("items", &format!("i{}", i), json!({"type": "item", "item_id": format!("i{}", i), "collection_id": "c"}))
                .await
                .unwrap();
        }
        let source = IndexSearchable::new(backend, "items", ModelKind::Item, settings());
        let req = SearchRequest::new();
        assert_eq!(source.count(&req).await.unwrap(), 5);
        let page = source.search(&req, Window { from: 3, size: 10 }).await.unwrap();
        let ids: Vec<&str> = page.hits.iter().map(|d| d.id.as_str()).collect();
        assert_eq!(ids, vec!["i3", "i4"]);
        assert_eq!(page.total, 5);
        assert!(source.get("missing").await.unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn test_aggregated_collections() {
        let source = AggregatedCollections::new(eo_backend().await, "eo", settings());
        let req = SearchRequest::new();
        assert_eq!(source.count(&req).await.unwrap(), 2);

        let page = source.search(&req, Window { from: 0, size: 10 }).await.unwrap();
        assert_eq!(page.hits.len(), 2);
        let s1 = &page.hits[0];
        assert_eq!(s1.id, "sentinel1a");
        assert_eq!(s1.source["item_count"], 2);
        assert_eq!(s1.source["extent"]["temporal"]["gte"], "2020-01-01T00:00:00.000Z");
        assert_eq!(s1.source["extent"]["temporal"]["lte"], "2020-03-05T00:00:00.000Z");
        assert_eq!(s1.source["summaries"]["Mission"], json!(["S1"]));

        let second = source.search(&req, Window { from: 1, size: 10 }).await.unwrap();
        assert_eq!(second.hits[0].id, "sentinel2b");
    }

    #[tokio::test]
    async fn test_aggregated_get() {
        let source = AggregatedCollections::new(eo_backend().await, "eo", settings());
        assert_eq!(source.get("sentinel2b").await.unwrap().source["item_count"], 1);
        let err = source.get("landsat").await.unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_aggregated_ids_filter_platform() {
        let source = AggregatedCollections::new(eo_backend().await, "eo", settings());
        let req = SearchRequest {
            ids: vec!["sentinel2b".into()],
            ..Default::default()
        };
        assert_eq!(source.count(&req).await.unwrap(), 1);
    }
}
