//! # STAC Search
//!
//! Query composition and multi-catalog fan-out for a SpatioTemporal Asset
//! Catalog (STAC) API backed by a document search engine.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                         StacClient                          │
//! │  • core / collection / asset APIs, transactions             │
//! │  • context block + paging links                             │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │                       CatalogRouter                         │
//! │  • named catalog → one source                               │
//! │  • no catalog    → fan-out in registration order            │
//! │  • by-id probe, NotFound moves on                           │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                   (ResultPages, lazily)
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │                 Searchable sources                          │
//! │  • IndexSearchable: stored documents                        │
//! │  • AggregatedCollections: collections from a terms agg      │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                 (QueryComposer → SearchBody)
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      SearchBackend                          │
//! │  • Elasticsearch body via EsTranslator                      │
//! │  • InMemoryBackend evaluates the AST directly               │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```rust
//! use std::sync::Arc;
//! use serde_json::json;
//! use stac_search::client::RequestContext;
//! use stac_search::search::SearchRequest;
//! use stac_search::storage::{InMemoryBackend, SearchBackend};
//! use stac_search::{StacClient, StacSearchConfig};
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let backend = Arc::new(InMemoryBackend::new());
//! backend
//!     .put("items", "scene-1", json!({
//!         "type": "item",
//!         "item_id": "scene-1",
//!         "collection_id": "sentinel-2",
//!         "properties": {"datetime": "2021-06-01T10:00:00Z"}
//!     }))
//!     .await
//!     .unwrap();
//!
//! let config: StacSearchConfig = serde_json::from_value(json!({
//!     "catalogs": [{"name": "main", "item": {"index": "items"}}]
//! }))
//! .unwrap();
//! let client = StacClient::new(&config, backend).unwrap();
//!
//! let ctx = RequestContext::new("https://api.example/stac".parse().unwrap());
//! let request = SearchRequest {
//!     datetime: Some("2021-01-01T00:00:00Z/..".into()),
//!     ..Default::default()
//! };
//! let page = client.search(&ctx, &request).await.unwrap();
//! assert_eq!(page.features[0].id, "scene-1");
//! # }
//! ```
//!
//! ## Modules
//!
//! - [`search`]: request model, temporal expressions, query AST and composition
//! - [`cql`]: CQL text / JSON / CQL2-JSON filters
//! - [`catalog`]: registry, sources, fan-out paging and routing
//! - [`client`]: request-level operations
//! - [`model`]: stored documents → STAC entities
//! - [`storage`]: backend seam and in-memory backend

pub mod capabilities;
pub mod catalog;
pub mod client;
pub mod config;
pub mod context;
pub mod coordinates;
pub mod cql;
pub mod error;
pub mod metrics;
pub mod model;
pub mod search;
pub mod storage;

pub use capabilities::{Capabilities, Capability};
pub use catalog::{CatalogRegistry, CatalogRouter, ResultPages, SearchSettings, Searchable};
pub use client::{RequestContext, StacClient};
pub use config::StacSearchConfig;
pub use coordinates::Coordinates;
pub use error::{ErrorKind, StacError};
pub use metrics::LatencyTimer;
pub use search::{EntityKind, ModelKind, QueryComposer, SearchBody, SearchRequest};
pub use storage::{BackendError, InMemoryBackend, SearchBackend};
