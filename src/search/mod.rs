// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Search Infrastructure
//!
//! Builds one backend query per search request and document shape.
//!
//! # Architecture
//!
//! ```text
//! SearchRequest
//!     ↓
//! QueryComposer ── temporal::build (datetime → should)
//!     │          ── cql::to_query (filter → filter)
//!     │          ── Coordinates (bbox → envelope)
//!     ↓
//! SearchBody (query AST + window / source / sort / aggs)
//!     ↓
//!     ├─→ EsTranslator → Elasticsearch request JSON
//!     └─→ InMemoryBackend evaluates the AST directly
//! ```
//!
//! # Example
//!
//! ```rust
//! use stac_search::search::{ModelKind, QueryComposer, SearchRequest};
//! use stac_search::Capabilities;
//!
//! let caps = Capabilities::all();
//! let request = SearchRequest {
//!     collections: vec!["sentinel-2".into()],
//!     datetime: Some("2020-01-01T00:00:00Z/..".into()),
//!     limit: Some(5),
//!     ..Default::default()
//! };
//! let body = QueryComposer::new(&caps, ModelKind::Item.naming())
//!     .compose(&request)
//!     .unwrap();
//! assert_eq!(body.size, Some(5));
//! ```

mod composer;
mod es_translator;
mod query_builder;
mod request;
pub mod schema;
pub mod temporal;

pub use composer::{QueryComposer, CONTEXT_COLLECTION_AGG, DEFAULT_LIMIT, MAX_RESULT_WINDOW};
pub use es_translator::EsTranslator;
pub use query_builder::{
    Aggregation, BoolQuery, Query, QueryBuilder, QueryNode, RangeBounds, SearchBody, SortField, SortOrder,
    SourceFilter, SpatialRelation,
};
pub use request::{FieldsSpec, FilterLang, SearchRequest, SortBy};
pub use schema::{EntityKind, FieldNaming, ModelKind, TemporalFields};
