// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Query composition.
//!
//! Turns one [`SearchRequest`] into one [`SearchBody`] for a given document
//! shape. The query always has the same top-level form:
//!
//! ```text
//! bool.must = [
//!     bool.should = [temporal alternatives...],   // empty bool when no datetime
//!     bool.filter = [ids, collections, geometry, role, cql, free text...],
//! ]
//! ```
//!
//! Optional behaviours are gated by [`Capabilities`]. The request is only
//! borrowed, so composing it twice yields equal bodies.

use serde_json::Value;
use tracing::debug;

use super::query_builder::{Aggregation, BoolQuery, Query, QueryNode, SearchBody, SortField, SourceFilter, SpatialRelation};
use super::request::SearchRequest;
use super::schema::FieldNaming;
use super::temporal;
use crate::capabilities::{Capabilities, Capability};
use crate::coordinates::Coordinates;
use crate::cql;
use crate::error::StacError;
use crate::metrics;

/// Backend hard ceiling on `from + size`
pub const MAX_RESULT_WINDOW: usize = 10_000;
pub const DEFAULT_LIMIT: usize = 10;
/// Buckets requested by the context-collection aggregation
pub const CONTEXT_COLLECTION_BUCKETS: usize = 1_000;

/// Name of the aggregation listing contributing collections
pub const CONTEXT_COLLECTION_AGG: &str = "collections";

/// Builds backend queries for one document shape
#[derive(Debug, Clone)]
pub struct QueryComposer<'a> {
    capabilities: &'a Capabilities,
    naming: &'a FieldNaming,
    max_result_window: usize,
    default_limit: usize,
    context_buckets: usize,
}

impl<'a> QueryComposer<'a> {
    pub fn new(capabilities: &'a Capabilities, naming: &'a FieldNaming) -> Self {
        Self {
            capabilities,
            naming,
            max_result_window: MAX_RESULT_WINDOW,
            default_limit: DEFAULT_LIMIT,
            context_buckets: CONTEXT_COLLECTION_BUCKETS,
        }
    }

    pub fn with_limits(mut self, max_result_window: usize, default_limit: usize) -> Self {
        self.max_result_window = max_result_window;
        self.default_limit = default_limit;
        self
    }

    pub fn with_context_buckets(mut self, buckets: usize) -> Self {
        self.context_buckets = buckets;
        self
    }

    pub fn naming(&self) -> &FieldNaming {
        self.naming
    }

    /// Effective page size, checked against the result window
    pub fn limit(&self, request: &SearchRequest) -> Result<usize, StacError> {
        let limit = request.limit.unwrap_or(self.default_limit);
        if limit > self.max_result_window {
            return Err(StacError::ResultWindowExceeded {
                requested: limit,
                max: self.max_result_window,
            });
        }
        Ok(limit)
    }

    /// Compose the full search body (query, window, projection, sort, aggs)
    pub fn compose(&self, request: &SearchRequest) -> Result<SearchBody, StacError> {
        let query = self.compose_query(request)?;
        let limit = self.limit(request)?;
        let page = request.page_or_first();
        let from = (page > 1).then(|| request.offset(limit));

        let mut body = SearchBody::new(query).with_window(from, Some(limit));

        if self.capabilities.contains(Capability::ContextCollection)
            && request.context_collection
            && request.collections.is_empty()
        {
            body = body.with_agg(
                CONTEXT_COLLECTION_AGG,
                Aggregation::terms(self.naming.context_aggregation, self.context_buckets),
            );
        }

        if self.capabilities.contains(Capability::Fields) {
            if let Some(fields) = request.fields.as_ref().filter(|f| !f.is_empty()) {
                body.source = Some(SourceFilter {
                    includes: fields.include.clone(),
                    excludes: fields.exclude.clone(),
                });
            }
        }

        if self.capabilities.contains(Capability::Sort) {
            body.sort = request.sortby.iter().map(SortField::from).collect();
        }

        debug!(
            from = ?body.from,
            size = ?body.size,
            sort = body.sort.len(),
            aggs = body.aggs.len(),
            "Composed search body"
        );
        Ok(body)
    }

    /// Compose only the query, for counting
    pub fn compose_count(&self, request: &SearchRequest) -> Result<SearchBody, StacError> {
        self.limit(request)?;
        Ok(SearchBody::new(self.compose_query(request)?))
    }

    /// The `must: [should-group, filter-group]` query
    pub fn compose_query(&self, request: &SearchRequest) -> Result<Query, StacError> {
        let naming = self.naming;
        let mut filter: Vec<QueryNode> = Vec::new();

        if let Some((field, value)) = naming.type_term {
            filter.push(Query::term(field, value).root);
        }
        if let Some(asset_field) = naming.asset {
            push_terms(&mut filter, asset_field, &request.asset_ids);
        }
        push_terms(&mut filter, naming.id, &request.ids);
        push_terms(&mut filter, naming.collection, &request.collections);

        if let Some(geometry) = &request.intersects {
            filter.push(Query::geo_shape(naming.geometry, geometry.clone(), SpatialRelation::Intersects).root);
        } else if let Some(bbox) = &request.bbox {
            let envelope = Coordinates::from_wgs84(bbox)?.to_envelope();
            filter.push(Query::geo_shape(naming.bbox, envelope, SpatialRelation::Intersects).root);
        }

        push_terms(&mut filter, naming.role, &request.role);

        if self.capabilities.contains(Capability::Filter) {
            if let Some(expr) = &request.filter {
                let lang = request.filter_lang.unwrap_or_default();
                let node = cql::to_query(expr, lang, naming).inspect_err(|e| {
                    metrics::record_filter_failure(lang.as_str(), e.kind());
                    debug!(dialect = %lang, error = %e, "Filter translation failed");
                })?;
                filter.push(node);
            }
        }

        if self.capabilities.contains(Capability::FreeText) {
            if let Some(q) = request.q.as_deref().map(str::trim).filter(|q| !q.is_empty()) {
                let fields = naming.free_text.iter().map(|f| f.to_string()).collect();
                filter.push(Query::query_string(q, fields).root);
            }
        }

        let mut should = Vec::new();
        if let Some(datetime) = &request.datetime {
            let predicates = temporal::build(datetime, &naming.temporal);
            should = predicates.should;
            filter.extend(predicates.filter);
        }

        Ok(Query::new(QueryNode::Bool(BoolQuery {
            must: vec![
                QueryNode::Bool(BoolQuery::should(should)),
                QueryNode::Bool(BoolQuery::filter(filter)),
            ],
            ..Default::default()
        })))
    }
}

fn push_terms(filter: &mut Vec<QueryNode>, field: &str, values: &[String]) {
    if !values.is_empty() {
        let values = values.iter().map(|v| Value::from(v.as_str())).collect();
        filter.push(Query::terms(field, values).root);
    }
}
