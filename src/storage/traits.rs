// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

use std::collections::BTreeMap;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::search::{Query, SearchBody};

#[derive(Error, Debug)]
pub enum BackendError {
    #[error("Document '{id}' not found in index '{index}'")]
    NotFound { index: String, id: String },
    #[error("Document '{id}' already exists in index '{index}'")]
    Conflict { index: String, id: String },
    #[error("Storage backend error: {0}")]
    Backend(String),
}

impl BackendError {
    pub fn not_found(index: &str, id: &str) -> Self {
        Self::NotFound {
            index: index.to_string(),
            id: id.to_string(),
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

/// A stored document as returned by the index
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    /// Document id (`_id`)
    pub id: String,
    /// Index the hit came from
    pub index: String,
    /// Raw stored body (`_source`)
    pub source: Value,
}

impl Document {
    pub fn new(id: impl Into<String>, index: impl Into<String>, source: Value) -> Self {
        Self {
            id: id.into(),
            index: index.into(),
            source,
        }
    }
}

/// Result of an aggregation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum AggregationResult {
    /// Bucket aggregation (terms)
    Buckets(Vec<Bucket>),
    /// Metric aggregation (min / max / avg / value_count)
    Metric {
        value: Option<f64>,
        /// Set when the field holds dates
        value_as_string: Option<String>,
    },
}

impl AggregationResult {
    pub fn buckets(&self) -> &[Bucket] {
        match self {
            Self::Buckets(b) => b,
            Self::Metric { .. } => &[],
        }
    }
}

/// One bucket of a terms aggregation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bucket {
    pub key: String,
    pub doc_count: u64,
    #[serde(default)]
    pub aggregations: BTreeMap<String, AggregationResult>,
}

/// Hits, total and aggregations of one search call
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SearchResponse {
    pub hits: Vec<Document>,
    /// Total matching documents, independent of the window
    pub total: u64,
    #[serde(default)]
    pub aggregations: BTreeMap<String, AggregationResult>,
}

/// The document index the catalog is served from.
///
/// Implementations must report a by-id miss as [`BackendError::NotFound`] so
/// callers can tell "no such document" apart from "backend unreachable".
#[async_trait]
pub trait SearchBackend: Send + Sync {
    /// Execute a query and fetch its window of hits
    async fn search(&self, index: &str, body: &SearchBody) -> Result<SearchResponse, BackendError>;

    /// Count matches of the body's query (window, sort and aggs are ignored)
    async fn count(&self, index: &str, body: &SearchBody) -> Result<u64, BackendError>;

    /// Fetch one document by id
    async fn get(&self, index: &str, id: &str) -> Result<Document, BackendError>;

    /// Insert a new document; [`BackendError::Conflict`] if the id is taken
    async fn create(&self, index: &str, id: &str, source: Value) -> Result<(), BackendError>;

    /// Insert or replace a document
    async fn put(&self, index: &str, id: &str, source: Value) -> Result<(), BackendError>;

    /// Delete one document; [`BackendError::NotFound`] if absent
    async fn delete(&self, index: &str, id: &str) -> Result<(), BackendError>;

    /// Delete every document matching the query, returning how many went
    async fn delete_by_query(&self, index: &str, query: &Query) -> Result<u64, BackendError>;

    /// Check whether a document exists.
    /// Default implementation maps `get` misses to `false`.
    async fn exists(&self, index: &str, id: &str) -> Result<bool, BackendError> {
        match self.get(index, id).await {
            Ok(_) => Ok(true),
            Err(e) if e.is_not_found() => Ok(false),
            Err(e) => Err(e),
        }
    }
}
