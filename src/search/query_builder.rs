// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Query Builder - AST for backend search queries
//!
//! Provides a type-safe boolean query tree plus the request envelope
//! (window, source filtering, sort, aggregations) that gets sent to the
//! document index. Translators render it to a concrete engine syntax and the
//! in-memory backend evaluates it directly.
//!
//! # Example
//!
//! ```rust
//! use stac_search::search::{Query, QueryBuilder, RangeBounds};
//!
//! // Simple term query
//! let query = Query::term("collection_id", "sentinel-2");
//!
//! // Several constraints, all of which must match
//! let query = QueryBuilder::new()
//!     .terms("collection_id", vec!["a".into(), "b".into()])
//!     .range("properties.datetime", RangeBounds::default().gte("2020-01-01"))
//!     .build_and();
//!
//! // Boolean combinations
//! let query = Query::term("type", "item").or(Query::term("type", "collection"));
//! ```

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Search query AST
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Query {
    /// Root query node
    pub root: QueryNode,
}

impl Query {
    /// Create a new query from a root node
    pub fn new(root: QueryNode) -> Self {
        Self { root }
    }

    /// Query matching every document
    pub fn match_all() -> Self {
        Self::new(QueryNode::MatchAll)
    }

    /// Exact term match
    pub fn term(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::new(QueryNode::Term {
            field: field.into(),
            value: value.into(),
        })
    }

    /// Membership in a set of terms
    pub fn terms(field: impl Into<String>, values: Vec<Value>) -> Self {
        Self::new(QueryNode::Terms {
            field: field.into(),
            values,
        })
    }

    /// Range over a numeric or date field
    pub fn range(field: impl Into<String>, bounds: RangeBounds) -> Self {
        Self::new(QueryNode::Range {
            field: field.into(),
            bounds,
        })
    }

    /// Analyzed match (date fields compare by instant, not by text)
    pub fn match_value(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::new(QueryNode::Match {
            field: field.into(),
            value: value.into(),
        })
    }

    /// Wildcard pattern (`*` any run, `?` one char)
    pub fn wildcard(field: impl Into<String>, pattern: impl Into<String>) -> Self {
        Self::new(QueryNode::Wildcard {
            field: field.into(),
            pattern: pattern.into(),
        })
    }

    /// Field is present and not null
    pub fn exists(field: impl Into<String>) -> Self {
        Self::new(QueryNode::Exists {
            field: field.into(),
        })
    }

    /// Geometry relation against a GeoJSON (or envelope) shape
    pub fn geo_shape(field: impl Into<String>, shape: Value, relation: SpatialRelation) -> Self {
        Self::new(QueryNode::GeoShape {
            field: field.into(),
            shape,
            relation,
        })
    }

    /// Lenient full-text query over a set of (possibly wildcarded) fields
    pub fn query_string(query: impl Into<String>, fields: Vec<String>) -> Self {
        Self::new(QueryNode::QueryString {
            query: query.into(),
            fields,
            lenient: true,
        })
    }

    /// Match document ids
    pub fn ids(values: Vec<String>) -> Self {
        Self::new(QueryNode::Ids { values })
    }

    /// Combine with AND
    pub fn and(self, other: Query) -> Self {
        Self::new(QueryNode::Bool(BoolQuery {
            filter: vec![self.root, other.root],
            ..Default::default()
        }))
    }

    /// Combine with OR
    pub fn or(self, other: Query) -> Self {
        Self::new(QueryNode::Bool(BoolQuery {
            should: vec![self.root, other.root],
            ..Default::default()
        }))
    }

    /// Negate query
    pub fn negate(self) -> Self {
        Self::new(QueryNode::Bool(BoolQuery {
            must_not: vec![self.root],
            ..Default::default()
        }))
    }
}

/// Query AST node
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum QueryNode {
    /// Matches everything
    MatchAll,
    /// Boolean compound
    Bool(BoolQuery),
    /// Exact value
    Term { field: String, value: Value },
    /// Any of several exact values
    Terms { field: String, values: Vec<Value> },
    /// Bounded range
    Range { field: String, bounds: RangeBounds },
    /// Analyzed match
    Match { field: String, value: Value },
    /// Wildcard pattern
    Wildcard { field: String, pattern: String },
    /// Field presence
    Exists { field: String },
    /// Spatial relation
    GeoShape {
        field: String,
        shape: Value,
        relation: SpatialRelation,
    },
    /// Free text
    QueryString {
        query: String,
        fields: Vec<String>,
        lenient: bool,
    },
    /// Document id membership
    Ids { values: Vec<String> },
}

/// Boolean compound query.
///
/// `must` and `filter` are AND-combined. `should` is OR-combined and is only
/// mandatory (at least one must match) when the node has no `must`/`filter`
/// clauses. `must_not` excludes.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BoolQuery {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub must: Vec<QueryNode>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub should: Vec<QueryNode>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub filter: Vec<QueryNode>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub must_not: Vec<QueryNode>,
}

impl BoolQuery {
    /// AND of the given clauses
    pub fn filter(clauses: Vec<QueryNode>) -> Self {
        Self {
            filter: clauses,
            ..Default::default()
        }
    }

    /// OR of the given clauses
    pub fn should(clauses: Vec<QueryNode>) -> Self {
        Self {
            should: clauses,
            ..Default::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.must.is_empty() && self.should.is_empty() && self.filter.is_empty() && self.must_not.is_empty()
    }
}

/// Range bounds; values are numbers or date strings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RangeBounds {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gte: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gt: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lte: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lt: Option<Value>,
}

impl RangeBounds {
    pub fn gte(mut self, value: impl Into<Value>) -> Self {
        self.gte = Some(value.into());
        self
    }

    pub fn gt(mut self, value: impl Into<Value>) -> Self {
        self.gt = Some(value.into());
        self
    }

    pub fn lte(mut self, value: impl Into<Value>) -> Self {
        self.lte = Some(value.into());
        self
    }

    pub fn lt(mut self, value: impl Into<Value>) -> Self {
        self.lt = Some(value.into());
        self
    }

    /// True when no bound is set
    pub fn is_unbounded(&self) -> bool {
        self.gte.is_none() && self.gt.is_none() && self.lte.is_none() && self.lt.is_none()
    }
}

/// Spatial relation between a stored shape and a query shape
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SpatialRelation {
    Intersects,
    Disjoint,
    Within,
    Contains,
}

impl SpatialRelation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Intersects => "intersects",
            Self::Disjoint => "disjoint",
            Self::Within => "within",
            Self::Contains => "contains",
        }
    }
}

/// Sort direction
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    #[default]
    Asc,
    Desc,
}

impl SortOrder {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Asc => "asc",
            Self::Desc => "desc",
        }
    }
}

/// One sort key
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortField {
    pub field: String,
    pub order: SortOrder,
}

/// Source filtering (field projection) applied by the backend
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceFilter {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub includes: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub excludes: Vec<String>,
}

impl SourceFilter {
    pub fn is_empty(&self) -> bool {
        self.includes.is_empty() && self.excludes.is_empty()
    }
}

/// Bucket and metric aggregations
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Aggregation {
    /// One bucket per distinct value, largest first
    Terms {
        field: String,
        size: usize,
        #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
        aggs: BTreeMap<String, Aggregation>,
    },
    Min { field: String },
    Max { field: String },
    Avg { field: String },
    ValueCount { field: String },
}

impl Aggregation {
    pub fn terms(field: impl Into<String>, size: usize) -> Self {
        Self::Terms {
            field: field.into(),
            size,
            aggs: BTreeMap::new(),
        }
    }

    /// Attach a sub-aggregation (only meaningful on `Terms`)
    pub fn bucket(mut self, name: impl Into<String>, agg: Aggregation) -> Self {
        if let Self::Terms { aggs, .. } = &mut self {
            aggs.insert(name.into(), agg);
        }
        self
    }
}

/// A complete request against one index: query plus envelope.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchBody {
    pub query: Query,
    /// Offset of the first hit
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from: Option<usize>,
    /// Maximum number of hits
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<SourceFilter>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub sort: Vec<SortField>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub aggs: BTreeMap<String, Aggregation>,
}

impl SearchBody {
    pub fn new(query: Query) -> Self {
        Self {
            query,
            from: None,
            size: None,
            source: None,
            sort: Vec::new(),
            aggs: BTreeMap::new(),
        }
    }

    /// Replace the result window
    pub fn with_window(mut self, from: Option<usize>, size: Option<usize>) -> Self {
        self.from = from;
        self.size = size;
        self
    }

    /// Add a named aggregation
    pub fn with_agg(mut self, name: impl Into<String>, agg: Aggregation) -> Self {
        self.aggs.insert(name.into(), agg);
        self
    }
}

/// Builder for conjunctive / disjunctive queries
#[derive(Default)]
pub struct QueryBuilder {
    nodes: Vec<QueryNode>,
}

impl QueryBuilder {
    /// Create a new query builder
    pub fn new() -> Self {
        Self { nodes: Vec::new() }
    }

    /// Add an arbitrary node
    pub fn push(mut self, node: QueryNode) -> Self {
        self.nodes.push(node);
        self
    }

    /// Add a term constraint
    pub fn term(self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.push(Query::term(field, value).root)
    }

    /// Add a terms constraint
    pub fn terms(self, field: impl Into<String>, values: Vec<Value>) -> Self {
        self.push(Query::terms(field, values).root)
    }

    /// Add a range constraint
    pub fn range(self, field: impl Into<String>, bounds: RangeBounds) -> Self {
        self.push(Query::range(field, bounds).root)
    }

    /// Add a match constraint
    pub fn match_value(self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.push(Query::match_value(field, value).root)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Build query with AND semantics (all constraints must match)
    pub fn build_and(self) -> Query {
        let mut nodes = self.nodes;
        match nodes.len() {
            0 => Query::match_all(),
            1 => Query::new(nodes.remove(0)),
            _ => Query::new(QueryNode::Bool(BoolQuery::filter(nodes))),
        }
    }

    /// Build query with OR semantics (any constraint can match)
    pub fn build_or(self) -> Query {
        let mut nodes = self.nodes;
        match nodes.len() {
            0 => Query::match_all(),
            1 => Query::new(nodes.remove(0)),
            _ => Query::new(QueryNode::Bool(BoolQuery::should(nodes))),
        }
    }
}
