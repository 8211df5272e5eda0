// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Query evaluation over JSON documents.
//!
//! Used by [`InMemoryBackend`](super::InMemoryBackend) to give the query AST
//! the same meaning a document search engine would:
//!
//! - dotted field paths, arrays flattened at the leaf
//! - `.keyword` / `.raw` multi-field suffixes fall back to the base field
//! - strings that parse as timestamps compare as instants
//! - geo relations are computed on bounding boxes of the shapes
//! - `query_string` is a lenient case-insensitive token search

use std::cmp::Ordering;
use std::collections::BTreeMap;

use chrono::{SecondsFormat, TimeZone, Utc};
use serde_json::{Map, Value};

use super::traits::{AggregationResult, Bucket, Document};
use crate::search::temporal::parse_instant;
use crate::search::{Aggregation, BoolQuery, QueryNode, RangeBounds, SortField, SortOrder, SourceFilter, SpatialRelation};

const MULTI_FIELD_SUFFIXES: [&str; 2] = [".keyword", ".raw"];

/// Collect the values stored under a dotted path. `_id` is the document id.
pub(crate) fn field_values(doc: &Document, path: &str) -> Vec<Value> {
    if path == "_id" {
        return vec![Value::String(doc.id.clone())];
    }
    let mut out = Vec::new();
    collect_path(&doc.source, path, &mut out);
    if out.is_empty() {
        for suffix in MULTI_FIELD_SUFFIXES {
            if let Some(base) = path.strip_suffix(suffix) {
                collect_path(&doc.source, base, &mut out);
            }
        }
    }
    out.into_iter().cloned().collect()
}

fn collect_path<'a>(value: &'a Value, path: &str, out: &mut Vec<&'a Value>) {
    match value {
        Value::Array(items) => {
            for item in items {
                collect_path(item, path, out);
            }
        }
        Value::Object(map) if !path.is_empty() => {
            let (head, rest) = match path.split_once('.') {
                Some((h, r)) => (h, r),
                None => (path, ""),
            };
            if let Some(child) = map.get(head) {
                collect_path(child, rest, out);
            }
        }
        Value::Null => {}
        leaf if path.is_empty() => out.push(leaf),
        _ => {}
    }
}

/// The raw (unflattened) value under a dotted path, for shape fields.
fn raw_value<'a>(source: &'a Value, path: &str) -> Option<&'a Value> {
    path.split('.').try_fold(source, |v, key| v.get(key))
}

/// Glob match with `*` (any run) and `?` (one char).
pub(crate) fn glob_match(pattern: &str, text: &str) -> bool {
    let p: Vec<char> = pattern.chars().collect();
    let t: Vec<char> = text.chars().collect();
    let (mut pi, mut ti) = (0, 0);
    let mut star: Option<(usize, usize)> = None;

    while ti < t.len() {
        if pi < p.len() && (p[pi] == '?' || p[pi] == t[ti]) {
            pi += 1;
            ti += 1;
        } else if pi < p.len() && p[pi] == '*' {
            star = Some((pi, ti));
            pi += 1;
        } else if let Some((sp, st)) = star {
            pi = sp + 1;
            ti = st + 1;
            star = Some((sp, st + 1));
        } else {
            return false;
        }
    }
    p[pi..].iter().all(|c| *c == '*')
}

/// Order two scalar values; `None` when they are not comparable.
pub(crate) fn compare_values(a: &Value, b: &Value) -> Option<Ordering> {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => x.as_f64()?.partial_cmp(&y.as_f64()?),
        (Value::String(x), Value::String(y)) => match (parse_instant(x), parse_instant(y)) {
            (Some(dx), Some(dy)) => Some(dx.cmp(&dy)),
            _ => Some(x.cmp(y)),
        },
        (Value::Number(x), Value::String(y)) => x.as_f64()?.partial_cmp(&y.parse::<f64>().ok()?),
        (Value::String(x), Value::Number(y)) => x.parse::<f64>().ok()?.partial_cmp(&y.as_f64()?),
        (Value::Bool(x), Value::Bool(y)) => Some(x.cmp(y)),
        _ => None,
    }
}

fn values_equal(a: &Value, b: &Value) -> bool {
    compare_values(a, b) == Some(Ordering::Equal)
}

fn in_range(value: &Value, bounds: &RangeBounds) -> bool {
    let check = |bound: &Option<Value>, ok: fn(Ordering) -> bool| match bound {
        Some(b) => compare_values(value, b).is_some_and(ok),
        None => true,
    };
    !bounds.is_unbounded()
        && check(&bounds.gte, |o| o != Ordering::Less)
        && check(&bounds.gt, |o| o == Ordering::Greater)
        && check(&bounds.lte, |o| o != Ordering::Greater)
        && check(&bounds.lt, |o| o == Ordering::Less)
}

/// Does the document satisfy the query node
pub(crate) fn matches(node: &QueryNode, doc: &Document) -> bool {
    match node {
        QueryNode::MatchAll => true,
        QueryNode::Bool(b) => matches_bool(b, doc),
        QueryNode::Term { field, value } => field_values(doc, field).iter().any(|v| values_equal(v, value)),
        QueryNode::Terms { field, values } => {
            let stored = field_values(doc, field);
            values.iter().any(|want| stored.iter().any(|v| values_equal(v, want)))
        }
        QueryNode::Range { field, bounds } => field_values(doc, field).iter().any(|v| in_range(v, bounds)),
        QueryNode::Match { field, value } => field_values(doc, field).iter().any(|v| match_text(v, value)),
        QueryNode::Wildcard { field, pattern } => field_values(doc, field)
            .iter()
            .any(|v| v.as_str().is_some_and(|s| glob_match(pattern, s))),
        QueryNode::Exists { field } => !field_values(doc, field).is_empty(),
        QueryNode::GeoShape { field, shape, relation } => {
            let stored = raw_value(&doc.source, field).and_then(shape_bounds);
            match (stored, shape_bounds(shape)) {
                (Some(s), Some(q)) => geo_relation(&s, &q, *relation),
                _ => false,
            }
        }
        QueryNode::QueryString { query, fields, .. } => matches_query_string(doc, query, fields),
        QueryNode::Ids { values } => values.iter().any(|id| *id == doc.id),
    }
}

fn matches_bool(b: &BoolQuery, doc: &Document) -> bool {
    let should_required = b.must.is_empty() && b.filter.is_empty() && !b.should.is_empty();
    b.must.iter().all(|n| matches(n, doc))
        && b.filter.iter().all(|n| matches(n, doc))
        && !b.must_not.iter().any(|n| matches(n, doc))
        && (!should_required || b.should.iter().any(|n| matches(n, doc)))
}

fn match_text(stored: &Value, query: &Value) -> bool {
    if values_equal(stored, query) {
        return true;
    }
    match (stored.as_str(), query.as_str()) {
        (Some(s), Some(q)) if parse_instant(s).is_some() && parse_instant(q).is_some() => false,
        (Some(s), Some(q)) => {
            let s = s.to_lowercase();
            q.split_whitespace().any(|tok| s.contains(&tok.to_lowercase()))
        }
        _ => false,
    }
}

fn matches_query_string(doc: &Document, query: &str, fields: &[String]) -> bool {
    let tokens: Vec<String> = query
        .split_whitespace()
        .filter(|t| !matches!(*t, "AND" | "OR" | "NOT"))
        .map(|t| t.trim_matches(|c: char| c == '"' || c == '(' || c == ')').to_lowercase())
        .filter(|t| !t.is_empty())
        .collect();
    if tokens.is_empty() {
        return false;
    }

    let mut leaves = Vec::new();
    flatten_leaves(&doc.source, String::new(), &mut leaves);
    leaves
        .iter()
        .filter(|(path, _)| fields.iter().any(|f| glob_match(f, path)))
        .filter_map(|(_, v)| v.as_str())
        .any(|text| {
            let text = text.to_lowercase();
            tokens.iter().any(|tok| text.contains(tok.as_str()))
        })
}

fn flatten_leaves<'a>(value: &'a Value, path: String, out: &mut Vec<(String, &'a Value)>) {
    match value {
        Value::Object(map) => {
            for (k, v) in map {
                let child = if path.is_empty() { k.clone() } else { format!("{}.{}", path, k) };
                flatten_leaves(v, child, out);
            }
        }
        Value::Array(items) => {
            for item in items {
                flatten_leaves(item, path.clone(), out);
            }
        }
        leaf => out.push((path, leaf)),
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// Geometry
// ═══════════════════════════════════════════════════════════════════════════

/// `[min_x, min_y, max_x, max_y]` of a GeoJSON geometry, an envelope, or a
/// plain 4/6 number bbox array.
pub(crate) fn shape_bounds(shape: &Value) -> Option<[f64; 4]> {
    if let Some(arr) = shape.as_array() {
        let nums: Vec<f64> = arr.iter().filter_map(Value::as_f64).collect();
        return match (arr.len(), nums.len()) {
            (4, 4) => Some([nums[0], nums[1], nums[2], nums[3]]),
            (6, 6) => Some([nums[0], nums[1], nums[3], nums[4]]),
            _ => None,
        };
    }

    let kind = shape.get("type")?.as_str()?.to_ascii_lowercase();
    if kind == "geometrycollection" {
        return shape
            .get("geometries")?
            .as_array()?
            .iter()
            .filter_map(shape_bounds)
            .reduce(union_bounds);
    }

    let mut points = Vec::new();
    collect_points(shape.get("coordinates")?, &mut points);
    points
        .into_iter()
        .map(|(x, y)| [x, y, x, y])
        .reduce(union_bounds)
}

fn collect_points(coords: &Value, out: &mut Vec<(f64, f64)>) {
    let Some(arr) = coords.as_array() else { return };
    if arr.len() >= 2 && arr[0].is_number() {
        if let (Some(x), Some(y)) = (arr[0].as_f64(), arr[1].as_f64()) {
            out.push((x, y));
        }
        return;
    }
    for c in arr {
        collect_points(c, out);
    }
}

fn union_bounds(a: [f64; 4], b: [f64; 4]) -> [f64; 4] {
    [a[0].min(b[0]), a[1].min(b[1]), a[2].max(b[2]), a[3].max(b[3])]
}

fn geo_relation(stored: &[f64; 4], query: &[f64; 4], relation: SpatialRelation) -> bool {
    let intersects = stored[0] <= query[2] && stored[2] >= query[0] && stored[1] <= query[3] && stored[3] >= query[1];
    let inside = |inner: &[f64; 4], outer: &[f64; 4]| {
        inner[0] >= outer[0] && inner[1] >= outer[1] && inner[2] <= outer[2] && inner[3] <= outer[3]
    };
    match relation {
        SpatialRelation::Intersects => intersects,
        SpatialRelation::Disjoint => !intersects,
        SpatialRelation::Within => inside(stored, query),
        SpatialRelation::Contains => inside(query, stored),
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// Sort / source filtering
// ═══════════════════════════════════════════════════════════════════════════

/// Stable sort; documents missing a sort field go last.
pub(crate) fn sort_documents(docs: &mut [Document], sort: &[SortField]) {
    if sort.is_empty() {
        return;
    }
    docs.sort_by(|a, b| {
        for key in sort {
            let va = field_values(a, &key.field).into_iter().next();
            let vb = field_values(b, &key.field).into_iter().next();
            let ord = match (va, vb) {
                (None, None) => Ordering::Equal,
                (None, Some(_)) => Ordering::Greater,
                (Some(_), None) => Ordering::Less,
                (Some(x), Some(y)) => {
                    let ord = compare_values(&x, &y).unwrap_or(Ordering::Equal);
                    match key.order {
                        SortOrder::Asc => ord,
                        SortOrder::Desc => ord.reverse(),
                    }
                }
            };
            if ord != Ordering::Equal {
                return ord;
            }
        }
        Ordering::Equal
    });
}

/// Apply `_source` includes/excludes; excludes win.
pub(crate) fn project(source: &Value, filter: &SourceFilter) -> Value {
    project_object(source, "", filter, filter.includes.is_empty())
}

fn project_object(value: &Value, prefix: &str, filter: &SourceFilter, included: bool) -> Value {
    let Value::Object(map) = value else {
        return value.clone();
    };
    let mut out = Map::new();
    for (key, child) in map {
        let path = if prefix.is_empty() { key.clone() } else { format!("{}.{}", prefix, key) };
        if filter.excludes.iter().any(|p| glob_match(p, &path)) {
            continue;
        }
        let hit = included || filter.includes.iter().any(|p| glob_match(p, &path));
        let descend = filter
            .includes
            .iter()
            .any(|p| p.starts_with(&format!("{}.", path)) || p.starts_with('*'));
        if hit {
            out.insert(key.clone(), project_object(child, &path, filter, true));
        } else if descend && child.is_object() {
            let sub = project_object(child, &path, filter, false);
            if sub.as_object().is_some_and(|m| !m.is_empty()) {
                out.insert(key.clone(), sub);
            }
        }
    }
    Value::Object(out)
}

// ═══════════════════════════════════════════════════════════════════════════
// Aggregations
// ═══════════════════════════════════════════════════════════════════════════

pub(crate) fn aggregate(
    aggs: &BTreeMap<String, Aggregation>,
    docs: &[&Document],
) -> BTreeMap<String, AggregationResult> {
    aggs.iter()
        .map(|(name, agg)| (name.clone(), aggregate_one(agg, docs)))
        .collect()
}

fn bucket_key(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

fn aggregate_one(agg: &Aggregation, docs: &[&Document]) -> AggregationResult {
    match agg {
        Aggregation::Terms { field, size, aggs } => {
            let mut groups: BTreeMap<String, Vec<&Document>> = BTreeMap::new();
            for doc in docs {
                let mut keys: Vec<String> = field_values(doc, field).iter().filter_map(bucket_key).collect();
                keys.sort();
                keys.dedup();
                for key in keys {
                    groups.entry(key).or_default().push(doc);
                }
            }
            let mut buckets: Vec<Bucket> = groups
                .into_iter()
                .map(|(key, members)| Bucket {
                    key,
                    doc_count: members.len() as u64,
                    aggregations: aggregate(aggs, &members),
                })
                .collect();
            // BTreeMap gives key order; stable sort keeps it for equal counts
            buckets.sort_by(|a, b| b.doc_count.cmp(&a.doc_count));
            buckets.truncate(*size);
            AggregationResult::Buckets(buckets)
        }
        Aggregation::Min { field } => metric(docs, field, |a, b| a.min(b)),
        Aggregation::Max { field } => metric(docs, field, |a, b| a.max(b)),
        Aggregation::Avg { field } => {
            let nums: Vec<f64> = docs
                .iter()
                .flat_map(|d| field_values(d, field))
                .filter_map(|v| v.as_f64())
                .collect();
            let value = (!nums.is_empty()).then(|| nums.iter().sum::<f64>() / nums.len() as f64);
            AggregationResult::Metric { value, value_as_string: None }
        }
        Aggregation::ValueCount { field } => {
            let count = docs.iter().map(|d| field_values(d, field).len()).sum::<usize>();
            AggregationResult::Metric {
                value: Some(count as f64),
                value_as_string: None,
            }
        }
    }
}

fn metric(docs: &[&Document], field: &str, pick: fn(f64, f64) -> f64) -> AggregationResult {
    let mut is_date = false;
    let value = docs
        .iter()
        .flat_map(|d| field_values(d, field))
        .filter_map(|v| match v {
            Value::Number(n) => n.as_f64(),
            Value::String(s) => parse_instant(&s).map(|dt| {
                is_date = true;
                dt.timestamp_millis() as f64
            }),
            _ => None,
        })
        .reduce(pick);

    let value_as_string = value.filter(|_| is_date).and_then(|ms| {
        Utc.timestamp_millis_opt(ms as i64)
            .single()
            .map(|dt| dt.to_rfc3339_opts(SecondsFormat::Millis, true))
    });
    AggregationResult::Metric { value, value_as_string }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::search::Query;
    use serde_json::json;

    fn doc(source: Value) -> Document {
        Document::new("doc-1", "stac-items", source)
    }

    #[test]
    fn test_dotted_path_and_keyword_fallback() {
        let d = doc(json!({"properties": {"platform": "sentinel-2a"}}));
        assert!(matches(&Query::term("properties.platform", "sentinel-2a").root, &d));
        assert!(matches(&Query::term("properties.platform.keyword", "sentinel-2a").root, &d));
        assert!(!matches(&Query::term("properties.platform", "landsat").root, &d));
    }

    #[test]
    fn test_array_values_are_flattened() {
        let d = doc(json!({"properties": {"categories": ["data", "metadata"]}}));
        assert!(matches(&Query::terms("properties.categories", vec![json!("metadata")]).root, &d));
    }

    #[test]
    fn test_date_range_compares_instants() {
        let d = doc(json!({"properties": {"datetime": "2014-04-09T00:00:00Z"}}));
        let inside = RangeBounds::default()
            .gte("2013-12-01T00:00:00+00:00")
            .lte("2014-05-01T00:00:00.000Z");
        let outside = RangeBounds::default().gte("2015-01-01T00:00:00Z");
        assert!(matches(&Query::range("properties.datetime", inside).root, &d));
        assert!(!matches(&Query::range("properties.datetime", outside).root, &d));
    }

    #[test]
    fn test_bool_should_only_mandatory_without_filter() {
        let d = doc(json!({"a": 1}));
        let should_only = QueryNode::Bool(BoolQuery::should(vec![Query::term("a", 2).root]));
        assert!(!matches(&should_only, &d));

        let with_filter = QueryNode::Bool(BoolQuery {
            should: vec![Query::term("a", 2).root],
            filter: vec![Query::term("a", 1).root],
            ..Default::default()
        });
        assert!(matches(&with_filter, &d));

        assert!(matches(&QueryNode::Bool(BoolQuery::default()), &d));
    }

    #[test]
    fn test_exists_and_missing() {
        let d = doc(json!({"a": null, "b": 0}));
        assert!(!matches(&Query::exists("a").root, &d));
        assert!(matches(&Query::exists("b").root, &d));
        assert!(!matches(&Query::exists("c").root, &d));
    }

    #[test]
    fn test_glob_match() {
        assert!(glob_match("properties.*", "properties.title"));
        assert!(glob_match("S2?_*", "S2A_MSIL1C"));
        assert!(!glob_match("S2?_*", "S2_MSIL1C"));
        assert!(glob_match("*", ""));
    }

    #[test]
    fn test_geo_envelope_intersects() {
        let d = doc(json!({"spatial": {"bbox": {"type": "envelope", "coordinates": [[0.0, 10.0], [10.0, 0.0]]}}}));
        let near = json!({"type": "envelope", "coordinates": [[5.0, 15.0], [15.0, 5.0]]});
        let far = json!({"type": "Point", "coordinates": [50.0, 50.0]});
        assert!(matches(&Query::geo_shape("spatial.bbox", near, SpatialRelation::Intersects).root, &d));
        assert!(!matches(&Query::geo_shape("spatial.bbox", far.clone(), SpatialRelation::Intersects).root, &d));
        assert!(matches(&Query::geo_shape("spatial.bbox", far, SpatialRelation::Disjoint).root, &d));
    }

    #[test]
    fn test_query_string_is_lenient_over_fields() {
        let d = doc(json!({"properties": {"title": "Heavy Rain over Valais"}, "other": "snow"}));
        let fields = vec!["properties.*".to_string()];
        assert!(matches(&Query::query_string("rain", fields.clone()).root, &d));
        assert!(!matches(&Query::query_string("snow", fields).root, &d));
    }

    #[test]
    fn test_projection_excludes_win() {
        let source = json!({"id": "a", "properties": {"datetime": "x", "cloud": 3}, "assets": {}});
        let filter = SourceFilter {
            includes: vec!["id".into(), "properties".into()],
            excludes: vec!["properties.cloud".into()],
        };
        assert_eq!(project(&source, &filter), json!({"id": "a", "properties": {"datetime": "x"}}));
    }

    #[test]
    fn test_projection_nested_include() {
        let source = json!({"properties": {"datetime": "x", "cloud": 3}});
        let filter = SourceFilter {
            includes: vec!["properties.cloud".into()],
            excludes: vec![],
        };
        assert_eq!(project(&source, &filter), json!({"properties": {"cloud": 3}}));
    }

    #[test]
    fn test_sort_missing_last() {
        let mut docs = vec![
            Document::new("a", "i", json!({"n": 2})),
            Document::new("b", "i", json!({})),
            Document::new("c", "i", json!({"n": 1})),
        ];
        sort_documents(
            &mut docs,
            &[SortField {
                field: "n".into(),
                order: SortOrder::Desc,
            }],
        );
        let ids: Vec<&str> = docs.iter().map(|d| d.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "c", "b"]);
    }

    #[test]
    fn test_terms_aggregation_with_date_bounds() {
        let docs = [
            Document::new("1", "i", json!({"sat": "S2", "t": "2020-01-01T00:00:00Z"})),
            Document::new("2", "i", json!({"sat": "S2", "t": "2021-01-01T00:00:00Z"})),
            Document::new("3", "i", json!({"sat": "L8", "t": "2019-01-01T00:00:00Z"})),
        ];
        let refs: Vec<&Document> = docs.iter().collect();
        let mut aggs = BTreeMap::new();
        aggs.insert(
            "sats".to_string(),
            Aggregation::terms("sat.keyword", 10).bucket("first", Aggregation::Min { field: "t".into() }),
        );

        let result = aggregate(&aggs, &refs);
        let buckets = result["sats"].buckets();
        assert_eq!(buckets.len(), 2);
        assert_eq!(buckets[0].key, "S2");
        assert_eq!(buckets[0].doc_count, 2);
        match &buckets[0].aggregations["first"] {
            AggregationResult::Metric { value_as_string, .. } => {
                assert_eq!(value_as_string.as_deref(), Some("2020-01-01T00:00:00.000Z"));
            }
            _ => panic!("Expected metric"),
        }
    }
}
