//! CQL filter translation.
//!
//! A filter goes through two stages: a dialect parser produces an [`Expr`]
//! tree, then [`lower`] turns it into backend query nodes for one document
//! shape. Parse failures are [`InvalidArgument`](crate::StacError::InvalidArgument);
//! operators with no backend predicate are
//! [`InvalidFilterExpression`](crate::StacError::InvalidFilterExpression).

mod ast;
mod json;
mod lower;
mod text;

pub use ast::{CompareOp, Expr, Operand, SpatialOp, TemporalOp, TemporalValue};
pub use json::{parse_cql2_json, parse_cql_json};
pub use lower::lower;
pub use text::{parse_cql_text, MAX_NESTING};

use serde_json::Value;

use crate::error::StacError;
use crate::search::schema::FieldNaming;
use crate::search::{FilterLang, QueryNode};

/// Parse a filter in the given dialect.
///
/// JSON dialects also accept the expression serialized as a JSON string.
pub fn parse(filter: &Value, lang: FilterLang) -> Result<Expr, StacError> {
    match (lang, filter) {
        (FilterLang::CqlText, Value::String(s)) => parse_cql_text(s),
        (FilterLang::CqlText, other) => Err(StacError::invalid(format!(
            "cql-text filter must be a string, got {}",
            other
        ))),
        (_, Value::String(s)) => {
            let value: Value = serde_json::from_str(s)
                .map_err(|e| StacError::invalid(format!("filter is not valid JSON: {}", e)))?;
            parse_json(&value, lang)
        }
        (_, value) => parse_json(value, lang),
    }
}

fn parse_json(value: &Value, lang: FilterLang) -> Result<Expr, StacError> {
    match lang {
        FilterLang::Cql2Json => parse_cql2_json(value),
        _ => parse_cql_json(value),
    }
}

/// Parse and lower in one step
pub fn to_query(filter: &Value, lang: FilterLang, naming: &FieldNaming) -> Result<QueryNode, StacError> {
    lower(&parse(filter, lang)?, naming)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::search::schema::ITEM_NAMING;
    use serde_json::json;

    #[test]
    fn test_dialects_agree() {
        let a = to_query(
            &json!({"lt": [{"property": "cloud"}, 10]}),
            FilterLang::CqlJson,
            &ITEM_NAMING,
        )
        .unwrap();
        let b = to_query(
            &json!({"op": "<", "args": [{"property": "cloud"}, 10]}),
            FilterLang::Cql2Json,
            &ITEM_NAMING,
        )
        .unwrap();
        let c = to_query(&json!("cloud < 10"), FilterLang::CqlText, &ITEM_NAMING).unwrap();
        assert_eq!(a, b);
        assert_eq!(b, c);
    }

    #[test]
    fn test_json_dialect_accepts_string() {
        let expr = parse(&json!(r#"{"eq": [{"property": "id"}, "x"]}"#), FilterLang::CqlJson).unwrap();
        assert!(matches!(expr, Expr::Compare { .. }));
        assert!(parse(&json!("{not json"), FilterLang::Cql2Json).is_err());
    }

    #[test]
    fn test_text_requires_string() {
        let err = parse(&json!({"eq": []}), FilterLang::CqlText).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidArgument);
    }

    #[test]
    fn test_unknown_operator_surfaces_as_filter_error() {
        let err = to_query(
            &json!({"op": "a_overlaps", "args": [{"property": "x"}, [1, 2]]}),
            FilterLang::Cql2Json,
            &ITEM_NAMING,
        )
        .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidFilterExpression);
    }
}
