//! `cql-text` dialect.
//!
//! ```text
//! platform = 'S2A' AND cloud < 10
//! title LIKE 'Sentinel%' OR NOT (cloud BETWEEN 10 AND 90)
//! platform IN ('S2A', 'S2B') AND cloud IS NOT NULL
//! INTERSECTS(geometry, POLYGON((0 0, 1 0, 1 1, 0 1, 0 0)))
//! datetime DURING 2020-01-01T00:00:00Z/2020-02-01T00:00:00Z
//! ```
//!
//! The grammar lives in `cql_text.pest`. Keywords are case-insensitive.
//! Geometry literals are WKT (`POINT`, `LINESTRING`, `POLYGON`, their
//! `MULTI` forms, and `BBOX(x0, y0, x1, y1)`), converted to GeoJSON.
//!
//! Input nested deeper than [`MAX_NESTING`] is rejected before parsing.

use pest::error::LineColLocation;
use pest::iterators::Pair;
use pest::Parser;
use pest_derive::Parser;
use serde_json::{json, Number, Value};

use super::ast::{CompareOp, Expr, Operand, SpatialOp, TemporalOp, TemporalValue};
use crate::error::StacError;

#[derive(Parser)]
#[grammar = "cql/cql_text.pest"]
struct CqlTextParser;

/// Deepest parenthesis nesting (or run of `NOT`s) a filter may use
pub const MAX_NESTING: usize = 32;

fn error(msg: impl std::fmt::Display) -> StacError {
    StacError::invalid(format!("malformed cql-text filter: {}", msg))
}

fn syntax_error(e: pest::error::Error<Rule>) -> StacError {
    let column = match e.line_col {
        LineColLocation::Pos((_, col)) | LineColLocation::Span((_, col), _) => col,
    };
    error(format!("{} at column {}", e.variant.message(), column))
}

/// Parse a `cql-text` expression
pub fn parse_cql_text(input: &str) -> Result<Expr, StacError> {
    check_nesting(input)?;
    let filter = CqlTextParser::parse(Rule::filter, input)
        .map_err(syntax_error)?
        .next()
        .ok_or_else(|| error("empty filter"))?;
    let root = filter
        .into_inner()
        .find(|p| p.as_rule() == Rule::or_expr)
        .ok_or_else(|| error("empty filter"))?;
    expr(root)
}

/// Parenthesis depth outside quoted text
fn check_nesting(input: &str) -> Result<(), StacError> {
    let mut depth = 0usize;
    let mut quote: Option<char> = None;
    for c in input.chars() {
        match (quote, c) {
            (Some(q), c) if c == q => quote = None,
            (Some(_), _) => {}
            (None, '\'' | '"') => quote = Some(c),
            (None, '(') => {
                depth += 1;
                if depth > MAX_NESTING {
                    return Err(error(format!("nesting deeper than {}", MAX_NESTING)));
                }
            }
            (None, ')') => depth = depth.saturating_sub(1),
            _ => {}
        }
    }
    Ok(())
}

// ═══════════════════════════════════════════════════════════════════════════
// Pairs → Expr
// ═══════════════════════════════════════════════════════════════════════════

fn expr(pair: Pair<'_, Rule>) -> Result<Expr, StacError> {
    match pair.as_rule() {
        Rule::or_expr => junction(pair, Expr::Or),
        Rule::and_expr => junction(pair, Expr::And),
        Rule::not_expr => {
            let (negations, mut rest) = split_keywords(pair);
            let mut inner = expr(take(&mut rest)?)?;
            if negations > MAX_NESTING {
                return Err(error(format!("more than {} consecutive NOTs", MAX_NESTING)));
            }
            for _ in 0..negations {
                inner = Expr::not(inner);
            }
            Ok(inner)
        }
        Rule::like_pred => {
            let (negated, mut rest) = split_keywords(pair);
            let property = property(take(&mut rest)?);
            let pattern = string(take(&mut rest)?);
            Ok(negate(negated > 0, Expr::Like { property, pattern }))
        }
        Rule::between_pred => {
            let (negated, mut rest) = split_keywords(pair);
            let property = property(take(&mut rest)?);
            let low = literal(take(&mut rest)?)?;
            let high = literal(take(&mut rest)?)?;
            Ok(negate(negated > 0, Expr::Between { property, low, high }))
        }
        Rule::in_pred => {
            let (negated, mut rest) = split_keywords(pair);
            let property = property(take(&mut rest)?);
            let values = rest.map(literal).collect::<Result<Vec<_>, _>>()?;
            Ok(negate(negated > 0, Expr::In { property, values }))
        }
        Rule::null_pred => {
            let (negated, mut rest) = split_keywords(pair);
            let property = property(take(&mut rest)?);
            Ok(negate(negated > 0, Expr::IsNull { property }))
        }
        Rule::temporal_pred => {
            let mut inner = pair.into_inner();
            let property = property(take(&mut inner)?);
            let name = take(&mut inner)?;
            let op = TemporalOp::from_name(name.as_str())
                .ok_or_else(|| error(format!("unknown temporal operator '{}'", name.as_str())))?;
            let value = time_value(take(&mut inner)?)?;
            Ok(Expr::Temporal { op, property, value })
        }
        Rule::comparison => {
            let mut inner = pair.into_inner();
            let left = operand(take(&mut inner)?)?;
            let op = compare_op(take(&mut inner)?.as_str())?;
            let right = operand(take(&mut inner)?)?;
            Ok(Expr::Compare { op, left, right })
        }
        Rule::spatial_call => {
            let mut inner = pair.into_inner();
            let name = take(&mut inner)?;
            let op = SpatialOp::from_name(name.as_str())
                .ok_or_else(|| error(format!("unknown spatial operator '{}'", name.as_str())))?;
            let property = property(take(&mut inner)?);
            let geometry = geometry(take(&mut inner)?)?;
            Ok(Expr::Spatial { op, property, geometry })
        }
        Rule::temporal_call => {
            let mut inner = pair.into_inner();
            let name = take(&mut inner)?.as_str().to_string();
            let property = property(take(&mut inner)?);
            let value = take(&mut inner)?;
            match TemporalOp::from_name(&name) {
                Some(op) => Ok(Expr::Temporal {
                    op,
                    property,
                    value: time_value(value)?,
                }),
                None => Ok(Expr::Function {
                    name,
                    args: vec![json!({ "property": property }), Value::String(value.as_str().to_string())],
                }),
            }
        }
        Rule::function_call => {
            let mut inner = pair.into_inner();
            let name = take(&mut inner)?.as_str().to_string();
            let args = inner
                .map(|arg| -> Result<Value, StacError> {
                    Ok(match operand(arg)? {
                        Operand::Property(name) => json!({ "property": name }),
                        Operand::Literal(v) => v,
                    })
                })
                .collect::<Result<Vec<_>, _>>()?;
            Ok(Expr::Function { name, args })
        }
        other => Err(error(format!("unexpected {:?}", other))),
    }
}

fn junction(pair: Pair<'_, Rule>, make: fn(Vec<Expr>) -> Expr) -> Result<Expr, StacError> {
    let (_, rest) = split_keywords(pair);
    let mut parts = rest.map(expr).collect::<Result<Vec<_>, _>>()?;
    Ok(if parts.len() == 1 { parts.remove(0) } else { make(parts) })
}

fn negate(negated: bool, expr: Expr) -> Expr {
    if negated {
        Expr::not(expr)
    } else {
        expr
    }
}

/// Drops keyword pairs, counting the `NOT`s among them
fn split_keywords(pair: Pair<'_, Rule>) -> (usize, impl Iterator<Item = Pair<'_, Rule>>) {
    let mut negations = 0;
    let mut rest = Vec::new();
    for p in pair.into_inner() {
        match p.as_rule() {
            Rule::not_kw => negations += 1,
            Rule::and_kw | Rule::or_kw | Rule::like_kw | Rule::between_kw | Rule::in_kw | Rule::is_kw | Rule::null_kw => {}
            _ => rest.push(p),
        }
    }
    (negations, rest.into_iter())
}

fn take<'i>(it: &mut impl Iterator<Item = Pair<'i, Rule>>) -> Result<Pair<'i, Rule>, StacError> {
    it.next().ok_or_else(|| error("incomplete expression"))
}

fn compare_op(text: &str) -> Result<CompareOp, StacError> {
    Ok(match text {
        "=" => CompareOp::Eq,
        "<>" | "!=" => CompareOp::Neq,
        "<" => CompareOp::Lt,
        "<=" => CompareOp::Lte,
        ">" => CompareOp::Gt,
        ">=" => CompareOp::Gte,
        other => return Err(error(format!("unknown comparison '{}'", other))),
    })
}

// ═══════════════════════════════════════════════════════════════════════════
// Operands and literals
// ═══════════════════════════════════════════════════════════════════════════

/// `property` pair: bare name or the inside of a quoted one
fn property(pair: Pair<'_, Rule>) -> String {
    pair.into_inner()
        .next()
        .map(|p| p.as_str().to_string())
        .unwrap_or_default()
}

/// `string` pair, with `''` unescaped
fn string(pair: Pair<'_, Rule>) -> String {
    pair.into_inner()
        .next()
        .map(|p| p.as_str().replace("''", "'"))
        .unwrap_or_default()
}

fn operand(pair: Pair<'_, Rule>) -> Result<Operand, StacError> {
    let inner = take(&mut pair.into_inner())?;
    match inner.as_rule() {
        Rule::property => Ok(Operand::Property(property(inner))),
        _ => Ok(Operand::Literal(literal(inner)?)),
    }
}

fn literal(pair: Pair<'_, Rule>) -> Result<Value, StacError> {
    let inner = take(&mut pair.into_inner())?;
    match inner.as_rule() {
        Rule::string => Ok(Value::String(string(inner))),
        Rule::time_literal => Ok(Value::String(inner.as_str().to_string())),
        Rule::number => number(float(&inner)?),
        Rule::boolean => Ok(Value::Bool(inner.as_str().eq_ignore_ascii_case("true"))),
        Rule::timestamp_call => Ok(Value::String(timestamp(inner)?)),
        other => Err(error(format!("unexpected {:?} in literal", other))),
    }
}

/// Text inside `TIMESTAMP('...')` / `DATE('...')`
fn timestamp(pair: Pair<'_, Rule>) -> Result<String, StacError> {
    let inner = pair
        .into_inner()
        .find(|p| p.as_rule() != Rule::timestamp_kw)
        .ok_or_else(|| error("TIMESTAMP needs a value"))?;
    Ok(time_text(inner))
}

fn time_text(pair: Pair<'_, Rule>) -> String {
    match pair.as_rule() {
        Rule::string => string(pair),
        _ => pair.as_str().to_string(),
    }
}

fn time_value(pair: Pair<'_, Rule>) -> Result<TemporalValue, StacError> {
    let inner = take(&mut pair.into_inner())?;
    match inner.as_rule() {
        Rule::interval_call => {
            let mut bounds = inner.into_inner().filter(|p| p.as_rule() == Rule::time_bound).map(|b| {
                b.into_inner()
                    .next()
                    .map(time_text)
                    .filter(|s| s != ".." && !s.is_empty())
            });
            let start = bounds.next().flatten();
            let end = bounds.next().flatten();
            Ok(TemporalValue::Interval(start, end))
        }
        Rule::timestamp_call => Ok(TemporalValue::Instant(timestamp(inner)?)),
        _ => Ok(TemporalValue::from_text(&time_text(inner))),
    }
}

fn float(pair: &Pair<'_, Rule>) -> Result<f64, StacError> {
    pair.as_str()
        .parse::<f64>()
        .map_err(|_| error(format!("invalid number '{}'", pair.as_str())))
}

fn number(n: f64) -> Result<Value, StacError> {
    if n.fract() == 0.0 && n.abs() < i64::MAX as f64 {
        return Ok(Value::from(n as i64));
    }
    Number::from_f64(n)
        .map(Value::Number)
        .ok_or_else(|| error(format!("number {} is not finite", n)))
}

// ═══════════════════════════════════════════════════════════════════════════
// WKT
// ═══════════════════════════════════════════════════════════════════════════

fn geometry(pair: Pair<'_, Rule>) -> Result<Value, StacError> {
    let shape = take(&mut pair.into_inner())?;
    let geometry = match shape.as_rule() {
        Rule::point => json!({ "type": "Point", "coordinates": position(take(&mut shape.into_inner())?)? }),
        Rule::linestring => json!({ "type": "LineString", "coordinates": position_list(take(&mut shape.into_inner())?)? }),
        Rule::polygon => json!({ "type": "Polygon", "coordinates": ring_list(take(&mut shape.into_inner())?)? }),
        Rule::multipoint => {
            let points = shape.into_inner().map(position).collect::<Result<Vec<_>, _>>()?;
            json!({ "type": "MultiPoint", "coordinates": points })
        }
        Rule::multilinestring => {
            json!({ "type": "MultiLineString", "coordinates": ring_list(take(&mut shape.into_inner())?)? })
        }
        Rule::multipolygon => {
            let polygons = shape.into_inner().map(ring_list).collect::<Result<Vec<_>, _>>()?;
            json!({ "type": "MultiPolygon", "coordinates": polygons })
        }
        Rule::bbox => {
            let n = shape.into_inner().map(|p| float(&p)).collect::<Result<Vec<_>, _>>()?;
            let [x0, y0, x1, y1] = n[..] else {
                return Err(error("BBOX takes 4 numbers"));
            };
            json!({
                "type": "Polygon",
                "coordinates": [[[x0, y0], [x1, y0], [x1, y1], [x0, y1], [x0, y0]]]
            })
        }
        other => return Err(error(format!("unsupported WKT geometry {:?}", other))),
    };
    Ok(geometry)
}

/// `x y [z]`
fn position(pair: Pair<'_, Rule>) -> Result<Vec<f64>, StacError> {
    pair.into_inner().map(|p| float(&p)).collect()
}

/// `(x y, x y, ...)`
fn position_list(pair: Pair<'_, Rule>) -> Result<Vec<Vec<f64>>, StacError> {
    pair.into_inner().map(position).collect()
}

/// `((x y, ...), (x y, ...))`
fn ring_list(pair: Pair<'_, Rule>) -> Result<Vec<Vec<Vec<f64>>>, StacError> {
    pair.into_inner().map(position_list).collect()
}
