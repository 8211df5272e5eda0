//! JSON filter dialects.
//!
//! ```text
//! cql-json    {"and": [{"eq": [{"property": "platform"}, "S2A"]}, {"lt": [{"property": "cloud"}, 10]}]}
//! cql2-json   {"op": "and", "args": [{"op": "=", "args": [{"property": "platform"}, "S2A"]}, ...]}
//! ```
//!
//! Both reduce to an operator name plus an argument list and share the same
//! operator table. Names the table doesn't know become [`Expr::Function`].

use serde_json::{json, Value};

use super::ast::{CompareOp, Expr, Operand, SpatialOp, TemporalOp, TemporalValue};
use crate::error::StacError;

type SubParser = fn(&Value) -> Result<Expr, StacError>;

fn malformed(msg: impl std::fmt::Display) -> StacError {
    StacError::invalid(format!("malformed filter: {}", msg))
}

/// Parse the `cql-json` dialect (single-key operator objects)
pub fn parse_cql_json(value: &Value) -> Result<Expr, StacError> {
    let obj = value
        .as_object()
        .ok_or_else(|| malformed(format!("expected an operator object, got {}", value)))?;
    let mut entries = obj.iter();
    let (op, body) = match (entries.next(), entries.next()) {
        (Some(entry), None) => entry,
        _ => return Err(malformed("operator object must have exactly one key")),
    };

    let args: Vec<Value> = match (op.as_str(), body) {
        ("between", Value::Object(m)) => vec![
            m.get("value").cloned().unwrap_or(Value::Null),
            m.get("lower").cloned().unwrap_or(Value::Null),
            m.get("upper").cloned().unwrap_or(Value::Null),
        ],
        ("in", Value::Object(m)) => vec![
            match (m.get("value"), m.get("property")) {
                (Some(v), _) => v.clone(),
                (None, Some(p)) => json!({ "property": p }),
                (None, None) => Value::Null,
            },
            m.get("list").cloned().unwrap_or(Value::Null),
        ],
        ("function", Value::Object(m)) => {
            return Ok(Expr::Function {
                name: m.get("name").and_then(Value::as_str).unwrap_or("function").to_string(),
                args: m
                    .get("arguments")
                    .and_then(Value::as_array)
                    .cloned()
                    .unwrap_or_default(),
            })
        }
        (_, Value::Array(a)) => a.clone(),
        (_, other) => vec![other.clone()],
    };
    build(op, &args, parse_cql_json)
}

/// Parse the `cql2-json` dialect (`{"op", "args"}` objects)
pub fn parse_cql2_json(value: &Value) -> Result<Expr, StacError> {
    let op = value
        .get("op")
        .and_then(Value::as_str)
        .ok_or_else(|| malformed(format!("expected {{\"op\", \"args\"}}, got {}", value)))?;
    let args = match value.get("args") {
        Some(Value::Array(a)) => a.clone(),
        Some(other) => vec![other.clone()],
        None => Vec::new(),
    };
    build(op, &args, parse_cql2_json)
}

fn build(op: &str, args: &[Value], sub: SubParser) -> Result<Expr, StacError> {
    let name = op.to_ascii_lowercase();
    let compare = |cmp: CompareOp| -> Result<Expr, StacError> {
        let [left, right] = args else {
            return Err(malformed(format!("'{}' takes 2 arguments", op)));
        };
        Ok(Expr::Compare {
            op: cmp,
            left: operand(left),
            right: operand(right),
        })
    };

    match name.as_str() {
        "and" | "or" => {
            if args.is_empty() {
                return Err(malformed(format!("'{}' needs at least one argument", op)));
            }
            let parts = args.iter().map(sub).collect::<Result<Vec<_>, _>>()?;
            Ok(if name == "and" { Expr::And(parts) } else { Expr::Or(parts) })
        }
        "not" => match args {
            [inner] => Ok(Expr::not(sub(inner)?)),
            _ => Err(malformed("'not' takes 1 argument")),
        },
        "eq" | "=" => compare(CompareOp::Eq),
        "neq" | "<>" | "!=" => compare(CompareOp::Neq),
        "lt" | "<" => compare(CompareOp::Lt),
        "lte" | "le" | "<=" => compare(CompareOp::Lte),
        "gt" | ">" => compare(CompareOp::Gt),
        "gte" | "ge" | ">=" => compare(CompareOp::Gte),
        "like" => match args {
            [p, pattern, ..] => Ok(Expr::Like {
                property: property(p)?,
                pattern: pattern
                    .as_str()
                    .ok_or_else(|| malformed("'like' pattern must be a string"))?
                    .to_string(),
            }),
            _ => Err(malformed("'like' takes 2 arguments")),
        },
        "between" => match args {
            [p, low, high] => Ok(Expr::Between {
                property: property(p)?,
                low: literal(low),
                high: literal(high),
            }),
            [p, Value::Array(bounds)] if bounds.len() == 2 => Ok(Expr::Between {
                property: property(p)?,
                low: literal(&bounds[0]),
                high: literal(&bounds[1]),
            }),
            _ => Err(malformed("'between' takes a property and 2 bounds")),
        },
        "in" => match args {
            [p, Value::Array(list)] => Ok(Expr::In {
                property: property(p)?,
                values: list.iter().map(literal).collect(),
            }),
            _ => Err(malformed("'in' takes a property and a list")),
        },
        "isnull" => match args {
            [p] => Ok(Expr::IsNull { property: property(p)? }),
            _ => Err(malformed("'isNull' takes 1 argument")),
        },
        _ => {
            let temporal_first = name.starts_with("t_") || name == "anyinteracts" || name == "tequals";
            let spatial = (!temporal_first).then(|| SpatialOp::from_name(&name)).flatten();
            if let Some(sop) = spatial {
                let [p, geom] = args else {
                    return Err(malformed(format!("'{}' takes 2 arguments", op)));
                };
                return Ok(Expr::Spatial {
                    op: sop,
                    property: property(p)?,
                    geometry: geometry(geom)?,
                });
            }
            if let Some(top) = TemporalOp::from_name(&name) {
                let [p, t] = args else {
                    return Err(malformed(format!("'{}' takes 2 arguments", op)));
                };
                return Ok(Expr::Temporal {
                    op: top,
                    property: property(p)?,
                    value: temporal_value(t)?,
                });
            }
            Ok(Expr::Function {
                name: op.to_string(),
                args: args.to_vec(),
            })
        }
    }
}

fn property(value: &Value) -> Result<String, StacError> {
    value
        .get("property")
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or_else(|| malformed(format!("expected {{\"property\": ...}}, got {}", value)))
}

fn operand(value: &Value) -> Operand {
    match value.get("property").and_then(Value::as_str) {
        Some(name) => Operand::Property(name.to_string()),
        None => Operand::Literal(literal(value)),
    }
}

/// Unwrap typed literals (`{"timestamp": ..}`, `{"date": ..}`) to their value
fn literal(value: &Value) -> Value {
    value
        .get("timestamp")
        .or_else(|| value.get("date"))
        .cloned()
        .unwrap_or_else(|| value.clone())
}

fn temporal_value(value: &Value) -> Result<TemporalValue, StacError> {
    let text = |v: &Value| v.as_str().map(str::to_string);
    if let Some(s) = value.as_str() {
        return Ok(TemporalValue::from_text(s));
    }
    if let Some(t) = value.get("timestamp").or_else(|| value.get("date")).and_then(Value::as_str) {
        return Ok(TemporalValue::Instant(t.to_string()));
    }
    let interval = value.get("interval").unwrap_or(value);
    match interval.as_array().map(Vec::as_slice) {
        Some([a, b]) => {
            let open = |v: &Value| {
                let v = literal(v);
                text(&v).filter(|s| s != "..")
            };
            Ok(TemporalValue::Interval(open(a), open(b)))
        }
        _ => Err(malformed(format!("expected a timestamp or interval, got {}", value))),
    }
}

fn geometry(value: &Value) -> Result<Value, StacError> {
    if let Some(bbox) = value.get("bbox").and_then(Value::as_array) {
        let n: Vec<f64> = bbox.iter().filter_map(Value::as_f64).collect();
        let (x0, y0, x1, y1) = match n.as_slice() {
            [x0, y0, x1, y1] | [x0, y0, _, x1, y1, _] => (*x0, *y0, *x1, *y1),
            _ => return Err(malformed("bbox literal must have 4 or 6 numbers")),
        };
        return Ok(json!({
            "type": "Polygon",
            "coordinates": [[[x0, y0], [x1, y0], [x1, y1], [x0, y1], [x0, y0]]]
        }));
    }
    if value.get("type").and_then(Value::as_str).is_some() {
        return Ok(value.clone());
    }
    Err(malformed(format!("expected a GeoJSON geometry, got {}", value)))
}
