// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Temporal predicates from a `datetime` expression.
//!
//! The same logical instant or interval may be stored either as a single
//! `datetime` stamp or as a `start`/`end` pair, so every expression expands
//! to OR alternatives covering both conventions:
//!
//! ```text
//! A/B     datetime in [A,B]  |  start in [A,B]  |  end in [A,B]
//! A/..    datetime >= A      |  end >= A
//! ../B    datetime <= B      |  start <= B
//! T       datetime == T      |  (start <= T AND end >= T)
//! D       datetime, start or end within D 00:00:00..23:59:59
//! other   nothing
//! ```
//!
//! Alternatives that need the single-stamp field are dropped for shapes that
//! don't have one. Interval ordering is not checked here; see
//! [`SearchRequest::validate`](super::SearchRequest::validate).

use std::sync::LazyLock;

use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};
use regex::Regex;

use super::query_builder::{BoolQuery, Query, QueryNode, RangeBounds};
use super::schema::TemporalFields;

const OPEN: &str = "..";

static INSTANT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d{4}-\d{2}-\d{2}[Tt]\d{2}:\d{2}").expect("instant pattern is valid"));
static DATE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d{4}-\d{2}-\d{2}$").expect("date pattern is valid"));

fn is_instant(expr: &str) -> bool {
    INSTANT_RE.is_match(expr)
}

fn is_date(expr: &str) -> bool {
    DATE_RE.is_match(expr)
}

/// Parse a timestamp the way a date field mapping would.
///
/// Accepts RFC 3339 with any offset and fraction, naive timestamps (taken as
/// UTC) and bare dates (midnight UTC).
pub fn parse_instant(s: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f") {
        return Some(Utc.from_utc_datetime(&naive));
    }
    if let Ok(date) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        return date.and_hms_opt(0, 0, 0).map(|naive| Utc.from_utc_datetime(&naive));
    }
    None
}

/// A parsed `datetime` expression
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DatetimeExpr {
    /// `A/B`, either side possibly open (`..` or empty)
    Interval { start: Option<String>, end: Option<String> },
    /// A timestamp with a time of day
    Instant(String),
    /// A bare calendar date
    Date(String),
    Unrecognized,
}

impl DatetimeExpr {
    pub fn parse(expr: &str) -> Self {
        let expr = expr.trim();
        if let Some((a, b)) = expr.split_once('/') {
            let bound = |s: &str| {
                let s = s.trim();
                (!s.is_empty() && s != OPEN).then(|| s.to_string())
            };
            return Self::Interval {
                start: bound(a),
                end: bound(b),
            };
        }
        if is_instant(expr) {
            Self::Instant(expr.to_string())
        } else if is_date(expr) {
            Self::Date(expr.to_string())
        } else {
            Self::Unrecognized
        }
    }
}

/// Predicates produced for one expression.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TemporalPredicates {
    /// OR alternatives; at least one must match when non-empty
    pub should: Vec<QueryNode>,
    /// AND constraints
    pub filter: Vec<QueryNode>,
}

impl TemporalPredicates {
    pub fn is_empty(&self) -> bool {
        self.should.is_empty() && self.filter.is_empty()
    }
}

/// Expand a `datetime` expression against a shape's temporal fields.
pub fn build(expr: &str, fields: &TemporalFields) -> TemporalPredicates {
    let should = match DatetimeExpr::parse(expr) {
        DatetimeExpr::Interval { start: Some(a), end: Some(b) } => {
            let window = || RangeBounds::default().gte(a.as_str()).lte(b.as_str());
            let mut alts = Vec::with_capacity(3);
            if let Some(dt) = fields.datetime {
                alts.push(Query::range(dt, window()).root);
            }
            alts.push(Query::range(fields.start, window()).root);
            alts.push(Query::range(fields.end, window()).root);
            alts
        }
        DatetimeExpr::Interval { start: Some(a), end: None } => {
            let from = || RangeBounds::default().gte(a.as_str());
            let mut alts = Vec::with_capacity(2);
            if let Some(dt) = fields.datetime {
                alts.push(Query::range(dt, from()).root);
            }
            alts.push(Query::range(fields.end, from()).root);
            alts
        }
        DatetimeExpr::Interval { start: None, end: Some(b) } => {
            let until = || RangeBounds::default().lte(b.as_str());
            let mut alts = Vec::with_capacity(2);
            if let Some(dt) = fields.datetime {
                alts.push(Query::range(dt, until()).root);
            }
            alts.push(Query::range(fields.start, until()).root);
            alts
        }
        DatetimeExpr::Interval { start: None, end: None } => Vec::new(),
        DatetimeExpr::Instant(t) => {
            let mut alts = Vec::with_capacity(2);
            if let Some(dt) = fields.datetime {
                alts.push(Query::match_value(dt, t.as_str()).root);
            }
            alts.push(QueryNode::Bool(BoolQuery::filter(vec![
                Query::range(fields.start, RangeBounds::default().lte(t.as_str())).root,
                Query::range(fields.end, RangeBounds::default().gte(t.as_str())).root,
            ])));
            alts
        }
        DatetimeExpr::Date(d) => {
            let day = || {
                RangeBounds::default()
                    .gte(format!("{}T00:00:00", d))
                    .lte(format!("{}T23:59:59", d))
            };
            let mut alts = Vec::with_capacity(3);
            if let Some(dt) = fields.datetime {
                alts.push(Query::range(dt, day()).root);
            }
            alts.push(Query::range(fields.start, day()).root);
            alts.push(Query::range(fields.end, day()).root);
            alts
        }
        DatetimeExpr::Unrecognized => Vec::new(),
    };

    TemporalPredicates {
        should,
        filter: Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::search::schema::{ModelKind, ITEM_NAMING};

    fn range_fields(preds: &TemporalPredicates) -> Vec<String> {
        preds
            .should
            .iter()
            .filter_map(|n| match n {
                QueryNode::Range { field, .. } => Some(field.clone()),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn test_parse_instant_variants_agree() {
        let expected = parse_instant("2008-01-31T00:00:00Z").unwrap();
        for s in [
            "2008-01-31T00:00:00+00:00",
            "2008-01-31T00:00:00.00Z",
            "2008-01-31T00:00:00.00+00:00",
            "2008-01-31T00:00:00",
            "2008-01-31",
        ] {
            assert_eq!(parse_instant(s), Some(expected), "{}", s);
        }
        assert!(parse_instant("yesterday").is_none());
    }

    #[test]
    fn test_shape_patterns() {
        assert!(is_instant("2008-01-31T00:00:00Z"));
        assert!(is_instant("2008-01-31t00:00"));
        assert!(!is_instant("2008-01-31"));
        assert!(is_date("2008-01-31"));
        assert!(!is_date("2008-01-31T00:00:00Z"));
        assert!(!is_date("31/01/2008"));
    }

    #[test]
    fn test_parse_shapes() {
        assert_eq!(
            DatetimeExpr::parse("2020-01-01T00:00:00Z/.."),
            DatetimeExpr::Interval {
                start: Some("2020-01-01T00:00:00Z".into()),
                end: None
            }
        );
        assert_eq!(
            DatetimeExpr::parse("/2020-01-01"),
            DatetimeExpr::Interval {
                start: None,
                end: Some("2020-01-01".into())
            }
        );
        assert!(matches!(DatetimeExpr::parse("2020-01-01T10:00:00Z"), DatetimeExpr::Instant(_)));
        assert!(matches!(DatetimeExpr::parse("2020-01-01"), DatetimeExpr::Date(_)));
        assert_eq!(DatetimeExpr::parse("last tuesday"), DatetimeExpr::Unrecognized);
    }

    #[test]
    fn test_closed_interval_has_three_alternatives() {
        let preds = build("2013-12-01T00:00:00Z/2014-05-01T00:00:00Z", &ITEM_NAMING.temporal);
        assert_eq!(
            range_fields(&preds),
            vec!["properties.datetime", "properties.start_datetime", "properties.end_datetime"]
        );
        assert!(preds.filter.is_empty());
    }

    #[test]
    fn test_open_end_uses_datetime_and_end() {
        let preds = build("2020-01-01T00:00:00Z/..", &ITEM_NAMING.temporal);
        assert_eq!(range_fields(&preds), vec!["properties.datetime", "properties.end_datetime"]);
    }

    #[test]
    fn test_open_start_uses_datetime_and_start() {
        let preds = build("../2020-01-01T00:00:00Z", &ITEM_NAMING.temporal);
        assert_eq!(range_fields(&preds), vec!["properties.datetime", "properties.start_datetime"]);
    }

    #[test]
    fn test_instant_matches_or_contains() {
        let preds = build("2008-01-31T00:00:00Z", &ITEM_NAMING.temporal);
        assert_eq!(preds.should.len(), 2);
        assert!(matches!(&preds.should[0], QueryNode::Match { field, .. } if field == "properties.datetime"));
        match &preds.should[1] {
            QueryNode::Bool(b) => assert_eq!(b.filter.len(), 2),
            other => panic!("Expected Bool node, got {:?}", other),
        }
    }

    #[test]
    fn test_date_only_spans_the_day() {
        let preds = build("2020-06-15", &ITEM_NAMING.temporal);
        assert_eq!(preds.should.len(), 3);
        match &preds.should[0] {
            QueryNode::Range { bounds, .. } => {
                assert_eq!(bounds.gte.as_ref().and_then(|v| v.as_str()), Some("2020-06-15T00:00:00"));
                assert_eq!(bounds.lte.as_ref().and_then(|v| v.as_str()), Some("2020-06-15T23:59:59"));
            }
            other => panic!("Expected Range node, got {:?}", other),
        }
    }

    #[test]
    fn test_pair_only_shape_skips_single_field() {
        let fields = &ModelKind::EoItem.naming().temporal;
        let preds = build("2020-01-01T00:00:00Z/2020-02-01T00:00:00Z", fields);
        assert_eq!(range_fields(&preds), vec!["temporal.start_time", "temporal.end_time"]);

        let preds = build("2020-01-01T00:00:00Z", fields);
        assert_eq!(preds.should.len(), 1);
    }

    #[test]
    fn test_unrecognized_and_fully_open_yield_nothing() {
        assert!(build("soon", &ITEM_NAMING.temporal).is_empty());
        assert!(build("../..", &ITEM_NAMING.temporal).is_empty());
        assert!(build("", &ITEM_NAMING.temporal).is_empty());
    }
}
