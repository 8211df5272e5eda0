// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Elasticsearch Translator
//!
//! Translates the query AST and request envelope to the Elasticsearch
//! `_search` request body.
//!
//! # Generated DSL
//!
//! ```text
//! {"term":  {"collection_id": "s2"}}                 - Exact match
//! {"terms": {"collection_id": ["a", "b"]}}           - Membership
//! {"range": {"properties.datetime": {"gte": ..}}}    - Range
//! {"geo_shape": {"spatial.bbox": {"shape": .., "relation": "intersects"}}}
//! {"query_string": {"query": .., "fields": [..], "lenient": true}}
//! {"bool": {"must": [..], "should": [..], "filter": [..], "must_not": [..]}}
//! ```

use serde_json::{json, Map, Value};

use super::query_builder::{Aggregation, BoolQuery, Query, QueryNode, SearchBody};

/// Elasticsearch query translator
pub struct EsTranslator;

impl EsTranslator {
    /// Translate a full request body (query, window, `_source`, sort, aggs)
    pub fn translate_body(body: &SearchBody) -> Value {
        let mut out = Map::new();
        out.insert("query".into(), Self::translate(&body.query));

        if let Some(from) = body.from {
            out.insert("from".into(), json!(from));
        }
        if let Some(size) = body.size {
            out.insert("size".into(), json!(size));
        }
        if let Some(source) = &body.source {
            let mut src = Map::new();
            if !source.includes.is_empty() {
                src.insert("includes".into(), json!(source.includes));
            }
            if !source.excludes.is_empty() {
                src.insert("excludes".into(), json!(source.excludes));
            }
            out.insert("_source".into(), Value::Object(src));
        }
        if !body.sort.is_empty() {
            let sort: Vec<Value> = body
                .sort
                .iter()
                .map(|s| json!({ s.field.clone(): { "order": s.order.as_str() } }))
                .collect();
            out.insert("sort".into(), Value::Array(sort));
        }
        if !body.aggs.is_empty() {
            let aggs: Map<String, Value> = body
                .aggs
                .iter()
                .map(|(name, agg)| (name.clone(), Self::translate_agg(agg)))
                .collect();
            out.insert("aggs".into(), Value::Object(aggs));
        }

        Value::Object(out)
    }

    /// Translate the query AST alone
    pub fn translate(query: &Query) -> Value {
        Self::translate_node(&query.root)
    }

    /// Body for the `_count` endpoint (query only)
    pub fn translate_count(body: &SearchBody) -> Value {
        json!({ "query": Self::translate(&body.query) })
    }

    fn translate_node(node: &QueryNode) -> Value {
        match node {
            QueryNode::MatchAll => json!({ "match_all": {} }),
            QueryNode::Bool(b) => Self::translate_bool(b),
            QueryNode::Term { field, value } => json!({ "term": { field.clone(): value } }),
            QueryNode::Terms { field, values } => json!({ "terms": { field.clone(): values } }),
            QueryNode::Range { field, bounds } => {
                json!({ "range": { field.clone(): serde_json::to_value(bounds).unwrap_or_default() } })
            }
            QueryNode::Match { field, value } => json!({ "match": { field.clone(): value } }),
            QueryNode::Wildcard { field, pattern } => {
                json!({ "wildcard": { field.clone(): { "value": pattern } } })
            }
            QueryNode::Exists { field } => json!({ "exists": { "field": field } }),
            QueryNode::GeoShape {
                field,
                shape,
                relation,
            } => json!({
                "geo_shape": {
                    field.clone(): { "shape": shape, "relation": relation.as_str() }
                }
            }),
            QueryNode::QueryString {
                query,
                fields,
                lenient,
            } => json!({
                "query_string": { "query": query, "fields": fields, "lenient": lenient }
            }),
            QueryNode::Ids { values } => json!({ "ids": { "values": values } }),
        }
    }

    fn translate_bool(b: &BoolQuery) -> Value {
        let mut clauses = Map::new();
        let groups = [
            ("must", &b.must),
            ("should", &b.should),
            ("filter", &b.filter),
            ("must_not", &b.must_not),
        ];
        for (name, nodes) in groups {
            if !nodes.is_empty() {
                let parts: Vec<Value> = nodes.iter().map(Self::translate_node).collect();
                clauses.insert(name.to_string(), Value::Array(parts));
            }
        }
        json!({ "bool": clauses })
    }

    fn translate_agg(agg: &Aggregation) -> Value {
        match agg {
            Aggregation::Terms { field, size, aggs } => {
                let mut out = json!({ "terms": { "field": field, "size": size } });
                if !aggs.is_empty() {
                    let subs: Map<String, Value> = aggs
                        .iter()
                        .map(|(name, a)| (name.clone(), Self::translate_agg(a)))
                        .collect();
                    out["aggs"] = Value::Object(subs);
                }
                out
            }
            Aggregation::Min { field } => json!({ "min": { "field": field } }),
            Aggregation::Max { field } => json!({ "max": { "field": field } }),
            Aggregation::Avg { field } => json!({ "avg": { "field": field } }),
            Aggregation::ValueCount { field } => json!({ "value_count": { "field": field } }),
        }
    }
}
