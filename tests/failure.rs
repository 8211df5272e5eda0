//! Failure and call-pattern tests for the catalog fan-out.
//!
//! A wrapper backend records every call and injects errors for chosen
//! indices, so the tests can assert exactly which sources were contacted.
//!
//! # Running
//! ```bash
//! cargo test --test failure
//! ```

use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::{json, Value};

use stac_search::catalog::{CatalogRegistry, CatalogRouter, SearchSettings};
use stac_search::client::{RequestContext, StacClient};
use stac_search::model::ModelSettings;
use stac_search::search::{EntityKind, FilterLang, ModelKind, Query, SearchBody, SearchRequest};
use stac_search::storage::{BackendError, Document, InMemoryBackend, SearchBackend, SearchResponse};
use stac_search::{Capabilities, Capability, ErrorKind};

// =============================================================================
// Recording / failing backend
// =============================================================================

/// Wraps the in-memory backend, logging `(operation, index)` per call and
/// failing every call against the indices in `failing`.
struct RecordingBackend {
    inner: InMemoryBackend,
    calls: Mutex<Vec<(&'static str, String)>>,
    failing: Mutex<HashSet<String>>,
}

impl RecordingBackend {
    fn new() -> Self {
        Self {
            inner: InMemoryBackend::new(),
            calls: Mutex::new(Vec::new()),
            failing: Mutex::new(HashSet::new()),
        }
    }

    fn fail_index(&self, index: &str) {
        self.failing.lock().insert(index.to_string());
    }

    fn calls(&self) -> Vec<(&'static str, String)> {
        self.calls.lock().clone()
    }

    fn touched(&self, index: &str) -> bool {
        self.calls.lock().iter().any(|(_, i)| i == index)
    }

    fn reset(&self) {
        self.calls.lock().clear();
    }

    fn enter(&self, op: &'static str, index: &str) -> Result<(), BackendError> {
        self.calls.lock().push((op, index.to_string()));
        if self.failing.lock().contains(index) {
            Err(BackendError::Backend(format!("injected failure on {}", index)))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl SearchBackend for RecordingBackend {
    async fn search(&self, index: &str, body: &SearchBody) -> Result<SearchResponse, BackendError> {
        self.enter("search", index)?;
        self.inner.search(index, body).await
    }

    async fn count(&self, index: &str, body: &SearchBody) -> Result<u64, BackendError> {
        self.enter("count", index)?;
        self.inner.count(index, body).await
    }

    async fn get(&self, index: &str, id: &str) -> Result<Document, BackendError> {
        self.enter("get", index)?;
        self.inner.get(index, id).await
    }

    async fn create(&self, index: &str, id: &str, source: Value) -> Result<(), BackendError> {
        self.enter("create", index)?;
        self.inner.create(index, id, source).await
    }

    async fn put(&self, index: &str, id: &str, source: Value) -> Result<(), BackendError> {
        self.enter("put", index)?;
        self.inner.put(index, id, source).await
    }

    async fn delete(&self, index: &str, id: &str) -> Result<(), BackendError> {
        self.enter("delete", index)?;
        self.inner.delete(index, id).await
    }

    async fn delete_by_query(&self, index: &str, query: &Query) -> Result<u64, BackendError> {
        self.enter("delete_by_query", index)?;
        self.inner.delete_by_query(index, query).await
    }
}

// =============================================================================
// Fixtures
// =============================================================================

/// Catalogs A, B, C holding 3, 10 and 4 items
async fn seeded() -> Arc<RecordingBackend> {
    let backend = Arc::new(RecordingBackend::new());
    for (index, n) in [("a", 3), ("b", 10), ("c", 4)] {
        for i in 0..n {
            let id = format!("{}-{}", index, i);
            backend
                .inner
                .put(index, &id, json!({
                    "type": "item",
                    "item_id": id,
                    "collection_id": format!("col-{}", index),
                    "properties": {"datetime": "2020-01-01T00:00:00Z"}
                }))
                .await
                .unwrap();
        }
    }
    backend
}

fn registry() -> CatalogRegistry {
    let mut registry = CatalogRegistry::new();
    for name in ["a", "b", "c"] {
        registry.register(EntityKind::Item, name, name, ModelKind::Item).unwrap();
    }
    registry
}

fn router(backend: Arc<RecordingBackend>, caps: Capabilities) -> CatalogRouter {
    CatalogRouter::new(registry(), backend, SearchSettings::new(caps))
}

fn ids(pages: &[stac_search::catalog::Page]) -> Vec<String> {
    pages.iter().flat_map(|p| p.hits.iter().map(|d| d.id.clone())).collect()
}

// =============================================================================
// Fan-out window
// =============================================================================

#[tokio::test]
async fn fanout_first_page_stops_before_third_catalog() {
    let backend = seeded().await;
    let router = router(backend.clone(), Capabilities::all());
    let request = SearchRequest {
        limit: Some(5),
        ..Default::default()
    };

    let mut pages = router.search(EntityKind::Item, None, &request).unwrap();
    let collected = pages.collect_all().await.unwrap();

    assert_eq!(ids(&collected), vec!["a-0", "a-1", "a-2", "b-0", "b-1"]);
    assert!(!backend.touched("c"));
    assert_eq!(pages.visited(), 2);
}

#[tokio::test]
async fn fanout_second_page_skips_whole_catalog() {
    let backend = seeded().await;
    let router = router(backend.clone(), Capabilities::all());
    let request = SearchRequest {
        limit: Some(5),
        page: Some(2),
        ..Default::default()
    };

    let collected = router
        .search(EntityKind::Item, None, &request)
        .unwrap()
        .collect_all()
        .await
        .unwrap();

    assert_eq!(ids(&collected), vec!["b-2", "b-3", "b-4", "b-5", "b-6"]);
    // A was only counted, never searched
    let calls = backend.calls();
    assert!(calls.contains(&("count", "a".to_string())));
    assert!(!calls.contains(&("search", "a".to_string())));
    assert!(!backend.touched("c"));
}

#[tokio::test]
async fn fanout_window_spanning_last_two_catalogs() {
    let backend = seeded().await;
    let router = router(backend, Capabilities::all());
    let request = SearchRequest {
        limit: Some(5),
        page: Some(3),
        ..Default::default()
    };

    let collected = router
        .search(EntityKind::Item, None, &request)
        .unwrap()
        .collect_all()
        .await
        .unwrap();

    assert_eq!(ids(&collected), vec!["b-7", "b-8", "b-9", "c-0", "c-1"]);
}

#[tokio::test]
async fn fanout_past_the_end_is_empty() {
    let backend = seeded().await;
    let router = router(backend, Capabilities::all());
    let request = SearchRequest {
        limit: Some(5),
        page: Some(9),
        ..Default::default()
    };
    let collected = router
        .search(EntityKind::Item, None, &request)
        .unwrap()
        .collect_all()
        .await
        .unwrap();
    assert!(collected.is_empty());
}

#[tokio::test]
async fn named_catalog_makes_single_search() {
    let backend = seeded().await;
    let router = router(backend.clone(), Capabilities::all());

    let collected = router
        .search(EntityKind::Item, Some("c"), &SearchRequest::new())
        .unwrap()
        .collect_all()
        .await
        .unwrap();

    assert_eq!(collected.len(), 1);
    assert_eq!(collected[0].total, 4);
    assert_eq!(backend.calls(), vec![("search", "c".to_string())]);
}

// =============================================================================
// Error propagation
// =============================================================================

#[tokio::test]
async fn backend_error_mid_fanout_propagates() {
    let backend = seeded().await;
    backend.fail_index("b");
    let router = router(backend.clone(), Capabilities::all());

    let err = router
        .search(EntityKind::Item, None, &SearchRequest::new())
        .unwrap()
        .collect_all()
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Backend);
    assert!(!backend.touched("c"));
}

#[tokio::test]
async fn probe_miss_moves_on_but_failure_stops() {
    let backend = seeded().await;
    let router = router(backend.clone(), Capabilities::all());

    // c-3 lives in the last catalog: a and b miss first
    let located = router.get(EntityKind::Item, None, "c-3").await.unwrap();
    assert_eq!(located.catalog, "c");
    let gets: Vec<String> = backend
        .calls()
        .into_iter()
        .filter(|(op, _)| *op == "get")
        .map(|(_, index)| index)
        .collect();
    assert_eq!(gets, vec!["a", "b", "c"]);

    backend.reset();
    backend.fail_index("b");
    let err = router.get(EntityKind::Item, None, "c-3").await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Backend);
    assert!(!backend.touched("c"));
}

#[tokio::test]
async fn probe_exhausted_reports_not_found() {
    let backend = seeded().await;
    let router = router(backend, Capabilities::all());
    let err = router.get(EntityKind::Item, None, "zzz").await.unwrap_err();
    assert!(err.is_not_found());
    assert_eq!(err.to_string(), "Item zzz not found");
}

#[tokio::test]
async fn invalid_request_never_reaches_backend() {
    let backend = seeded().await;
    let router = router(backend.clone(), Capabilities::all());

    let bad_filter = SearchRequest {
        filter: Some(json!({"eq": [{"property": "platform"}]})),
        ..Default::default()
    };
    assert!(router.search(EntityKind::Item, None, &bad_filter).is_err());

    let too_many = SearchRequest {
        limit: Some(10_001),
        ..Default::default()
    };
    let err = router.search(EntityKind::Item, None, &too_many).err().unwrap();
    assert_eq!(err.kind(), ErrorKind::ResultWindowExceeded);

    assert!(backend.calls().is_empty());
}

#[tokio::test]
async fn deeply_nested_text_filter_is_rejected_before_backend() {
    let backend = seeded().await;
    let router = router(backend.clone(), Capabilities::all());
    let depth = 10_000;
    let request = SearchRequest {
        filter: Some(json!(format!("{}platform = 'a'{}", "(".repeat(depth), ")".repeat(depth)))),
        filter_lang: Some(FilterLang::CqlText),
        ..Default::default()
    };

    let err = router.search(EntityKind::Item, None, &request).err().unwrap();
    assert_eq!(err.kind(), ErrorKind::InvalidArgument);
    assert!(backend.calls().is_empty());
}

// =============================================================================
// Client level
// =============================================================================

#[tokio::test]
async fn client_without_context_does_not_count_unvisited_catalogs() {
    let backend = seeded().await;
    let caps = Capabilities::from_iter([Capability::Pagination]);
    let client = StacClient::from_parts(registry(), backend.clone(), SearchSettings::new(caps), ModelSettings::default());
    let ctx = RequestContext::new("https://api.example".parse().unwrap());
    let request = SearchRequest {
        limit: Some(5),
        ..Default::default()
    };

    let page = client.search(&ctx, &request).await.unwrap();
    assert_eq!(page.features.len(), 5);
    assert!(page.context.is_none());
    assert!(!backend.touched("c"));
}

#[tokio::test]
async fn client_context_counts_every_catalog() {
    let backend = seeded().await;
    let client = StacClient::from_parts(
        registry(),
        backend,
        SearchSettings::new(Capabilities::all()),
        ModelSettings::default(),
    );
    let ctx = RequestContext::new("https://api.example/search?limit=5".parse().unwrap());
    let request = SearchRequest {
        limit: Some(5),
        ..Default::default()
    };

    let page = client.search(&ctx, &request).await.unwrap();
    let context = page.context.unwrap();
    assert_eq!((context.returned, context.limit, context.matched), (5, 5, 17));
}

#[tokio::test]
async fn last_page_number_is_served_without_overflow() {
    let backend = seeded().await;
    let client = StacClient::from_parts(
        registry(),
        backend,
        SearchSettings::new(Capabilities::all()),
        ModelSettings::default(),
    );
    let ctx = RequestContext::new("https://api.example/search".parse().unwrap());
    let request = SearchRequest {
        page: Some(u32::MAX),
        ..Default::default()
    };

    let page = client.search(&ctx, &request).await.unwrap();
    assert!(page.features.is_empty());
    let rels: Vec<&str> = page.links.iter().map(|l| l.rel.as_str()).collect();
    assert_eq!(rels, vec!["self", "previous"]);
    assert_eq!(page.context.unwrap().returned, 0);
}
