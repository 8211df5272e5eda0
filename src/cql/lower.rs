// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Lowering of filter expressions to backend query nodes.
//!
//! Property names go through the shape's [`FieldNaming`] remap table, so the
//! same filter runs against item, asset and EO indices. Anything the backend
//! has no predicate for fails with [`StacError::InvalidFilterExpression`]
//! naming the operator.

use serde_json::Value;

use super::ast::{CompareOp, Expr, Operand, SpatialOp, TemporalOp, TemporalValue};
use crate::error::StacError;
use crate::search::schema::FieldNaming;
use crate::search::{BoolQuery, Query, QueryNode, RangeBounds, SpatialRelation};

fn unsupported(what: impl std::fmt::Display) -> StacError {
    StacError::InvalidFilterExpression(format!("operator '{}' is not supported", what))
}

/// Lower an expression tree against one document shape
pub fn lower(expr: &Expr, naming: &FieldNaming) -> Result<QueryNode, StacError> {
    let field = |name: &str| naming.cql_field(name);

    let node = match expr {
        Expr::And(parts) => QueryNode::Bool(BoolQuery::filter(lower_all(parts, naming)?)),
        Expr::Or(parts) => QueryNode::Bool(BoolQuery::should(lower_all(parts, naming)?)),
        Expr::Not(inner) => Query::new(lower(inner, naming)?).negate().root,
        Expr::Compare { op, left, right } => {
            let (op, property, value) = match (left, right) {
                (Operand::Property(p), Operand::Literal(v)) => (*op, p, v),
                (Operand::Literal(v), Operand::Property(p)) => (op.flipped(), p, v),
                (Operand::Property(a), Operand::Property(b)) => {
                    return Err(StacError::InvalidFilterExpression(format!(
                        "comparing property '{}' with property '{}' is not supported",
                        a, b
                    )))
                }
                (Operand::Literal(a), Operand::Literal(b)) => {
                    return Err(StacError::InvalidFilterExpression(format!(
                        "comparison of two literals ({} and {}) has no property",
                        a, b
                    )))
                }
            };
            compare(op, field(property), value.clone())
        }
        Expr::Like { property, pattern } => Query::wildcard(field(property), like_to_wildcard(pattern)).root,
        Expr::Between { property, low, high } => Query::range(
            field(property),
            RangeBounds::default().gte(low.clone()).lte(high.clone()),
        )
        .root,
        Expr::In { property, values } => Query::terms(field(property), values.clone()).root,
        Expr::IsNull { property } => Query::exists(field(property)).negate().root,
        Expr::Spatial { op, property, geometry } => {
            let relation = match op {
                SpatialOp::Intersects => SpatialRelation::Intersects,
                SpatialOp::Disjoint => SpatialRelation::Disjoint,
                SpatialOp::Within => SpatialRelation::Within,
                SpatialOp::Contains => SpatialRelation::Contains,
                other => return Err(unsupported(format!("{:?}", other).to_lowercase())),
            };
            Query::geo_shape(field(property), geometry.clone(), relation).root
        }
        Expr::Temporal { op, property, value } => temporal(*op, field(property), value)?,
        Expr::Function { name, .. } => return Err(unsupported(name)),
    };
    Ok(node)
}

fn lower_all(parts: &[Expr], naming: &FieldNaming) -> Result<Vec<QueryNode>, StacError> {
    parts.iter().map(|p| lower(p, naming)).collect()
}

fn compare(op: CompareOp, field: String, value: Value) -> QueryNode {
    let bounds = RangeBounds::default();
    match op {
        CompareOp::Eq => Query::term(field, value).root,
        CompareOp::Neq => Query::term(field, value).negate().root,
        CompareOp::Lt => Query::range(field, bounds.lt(value)).root,
        CompareOp::Lte => Query::range(field, bounds.lte(value)).root,
        CompareOp::Gt => Query::range(field, bounds.gt(value)).root,
        CompareOp::Gte => Query::range(field, bounds.gte(value)).root,
    }
}

fn temporal(op: TemporalOp, field: String, value: &TemporalValue) -> Result<QueryNode, StacError> {
    let bounds = RangeBounds::default();
    let node = match (op, value) {
        (TemporalOp::After, TemporalValue::Instant(t)) => Query::range(field, bounds.gt(t.as_str())).root,
        (TemporalOp::Before, TemporalValue::Instant(t)) => Query::range(field, bounds.lt(t.as_str())).root,
        (TemporalOp::Equals | TemporalOp::AnyInteracts | TemporalOp::Intersects, TemporalValue::Instant(t)) => {
            Query::term(field, t.as_str()).root
        }
        (TemporalOp::Disjoint, TemporalValue::Instant(t)) => Query::term(field, t.as_str()).negate().root,

        (TemporalOp::During, TemporalValue::Interval(start, end)) => {
            let mut b = bounds;
            b.gt = start.as_deref().map(Value::from);
            b.lt = end.as_deref().map(Value::from);
            Query::range(field, b).root
        }
        (TemporalOp::AnyInteracts | TemporalOp::Intersects, TemporalValue::Interval(start, end)) => {
            Query::range(field, closed(start, end)).root
        }
        (TemporalOp::Disjoint, TemporalValue::Interval(start, end)) => {
            Query::range(field, closed(start, end)).negate().root
        }
        (TemporalOp::After, TemporalValue::Interval(_, Some(end))) => Query::range(field, bounds.gt(end.as_str())).root,
        (TemporalOp::Before, TemporalValue::Interval(Some(start), _)) => {
            Query::range(field, bounds.lt(start.as_str())).root
        }
        (other, _) => return Err(unsupported(format!("{:?}", other).to_lowercase())),
    };
    Ok(node)
}

fn closed(start: &Option<String>, end: &Option<String>) -> RangeBounds {
    RangeBounds {
        gte: start.as_deref().map(Value::from),
        lte: end.as_deref().map(Value::from),
        ..Default::default()
    }
}

/// `%` → `*`, `_` → `?`; a backslash escapes the next character
fn like_to_wildcard(pattern: &str) -> String {
    let mut out = String::with_capacity(pattern.len());
    let mut chars = pattern.chars();
    while let Some(c) = chars.next() {
        match c {
            '\\' => {
                if let Some(escaped) = chars.next() {
                    if matches!(escaped, '*' | '?') {
                        out.push('\\');
                    }
                    out.push(escaped);
                }
            }
            '%' => out.push('*'),
            '_' => out.push('?'),
            c => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::search::schema::{ASSET_NAMING, EO_ITEM_NAMING, ITEM_NAMING};
    use serde_json::json;

    fn prop_eq(name: &str, value: Value) -> Expr {
        Expr::Compare {
            op: CompareOp::Eq,
            left: Operand::Property(name.into()),
            right: Operand::Literal(value),
        }
    }

    #[test]
    fn test_field_remap_and_template() {
        let node = lower(&prop_eq("datetime", json!("2020-01-01T00:00:00Z")), &ITEM_NAMING).unwrap();
        assert!(matches!(node, QueryNode::Term { ref field, .. } if field == "properties.datetime"));

        let node = lower(&prop_eq("platform", json!("S2A")), &ITEM_NAMING).unwrap();
        assert!(matches!(node, QueryNode::Term { ref field, .. } if field == "properties.platform.keyword"));

        let node = lower(&prop_eq("platform", json!("S2A")), &EO_ITEM_NAMING).unwrap();
        assert!(matches!(node, QueryNode::Term { ref field, .. } if field == "misc.platform.keyword"));

        let node = lower(&prop_eq("id", json!("a1")), &ASSET_NAMING).unwrap();
        assert!(matches!(node, QueryNode::Term { ref field, .. } if field == "asset_id"));
    }

    #[test]
    fn test_literal_on_left_is_flipped() {
        let expr = Expr::Compare {
            op: CompareOp::Lt,
            left: Operand::Literal(json!(5)),
            right: Operand::Property("cloud".into()),
        };
        match lower(&expr, &ITEM_NAMING).unwrap() {
            QueryNode::Range { bounds, .. } => {
                assert_eq!(bounds.gt, Some(json!(5)));
                assert_eq!(bounds.lt, None);
            }
            other => panic!("Expected Range, got {:?}", other),
        }
    }

    #[test]
    fn test_boolean_structure() {
        let expr = Expr::Or(vec![
            prop_eq("a", json!(1)),
            Expr::not(Expr::And(vec![prop_eq("b", json!(2)), prop_eq("c", json!(3))])),
        ]);
        match lower(&expr, &ITEM_NAMING).unwrap() {
            QueryNode::Bool(b) => {
                assert_eq!(b.should.len(), 2);
                assert!(matches!(&b.should[1], QueryNode::Bool(n) if n.must_not.len() == 1));
            }
            other => panic!("Expected Bool, got {:?}", other),
        }
    }

    #[test]
    fn test_like_and_null() {
        let node = lower(
            &Expr::Like {
                property: "title".into(),
                pattern: "S2_%".into(),
            },
            &ITEM_NAMING,
        )
        .unwrap();
        assert!(matches!(node, QueryNode::Wildcard { ref pattern, .. } if pattern == "S2?*"));

        let node = lower(&Expr::IsNull { property: "cloud".into() }, &ITEM_NAMING).unwrap();
        assert!(matches!(node, QueryNode::Bool(b) if matches!(b.must_not[0], QueryNode::Exists { .. })));
    }

    #[test]
    fn test_temporal_lowering() {
        let during = Expr::Temporal {
            op: TemporalOp::During,
            property: "datetime".into(),
            value: TemporalValue::Interval(Some("2020-01-01".into()), None),
        };
        match lower(&during, &ITEM_NAMING).unwrap() {
            QueryNode::Range { field, bounds } => {
                assert_eq!(field, "properties.datetime");
                assert_eq!(bounds.gt, Some(json!("2020-01-01")));
                assert_eq!(bounds.lt, None);
            }
            other => panic!("Expected Range, got {:?}", other),
        }

        let meets = Expr::Temporal {
            op: TemporalOp::Meets,
            property: "datetime".into(),
            value: TemporalValue::Instant("2020-01-01".into()),
        };
        let err = lower(&meets, &ITEM_NAMING).unwrap_err();
        assert!(matches!(err, StacError::InvalidFilterExpression(ref m) if m.contains("meets")));
    }

    #[test]
    fn test_unsupported_operators_are_filter_errors() {
        let touches = Expr::Spatial {
            op: SpatialOp::Touches,
            property: "geometry".into(),
            geometry: json!({"type": "Point", "coordinates": [0.0, 0.0]}),
        };
        assert_eq!(
            lower(&touches, &ITEM_NAMING).unwrap_err().kind(),
            crate::error::ErrorKind::InvalidFilterExpression
        );

        let func = Expr::Function {
            name: "a_overlaps".into(),
            args: vec![],
        };
        let err = lower(&func, &ITEM_NAMING).unwrap_err();
        assert_eq!(err.status_code(), 400);
        assert!(err.to_string().contains("a_overlaps"));
    }

    #[test]
    fn test_like_escapes() {
        assert_eq!(like_to_wildcard(r"100\%"), "100%");
        assert_eq!(like_to_wildcard("a*b"), "a*b");
    }
}
