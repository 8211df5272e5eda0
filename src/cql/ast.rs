//! Dialect-independent filter expression tree.

use serde_json::Value;

/// Filter expression
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    And(Vec<Expr>),
    Or(Vec<Expr>),
    Not(Box<Expr>),
    Compare {
        op: CompareOp,
        left: Operand,
        right: Operand,
    },
    /// SQL-style pattern: `%` any run, `_` one char
    Like { property: String, pattern: String },
    Between { property: String, low: Value, high: Value },
    In { property: String, values: Vec<Value> },
    IsNull { property: String },
    Spatial {
        op: SpatialOp,
        property: String,
        geometry: Value,
    },
    Temporal {
        op: TemporalOp,
        property: String,
        value: TemporalValue,
    },
    /// Any operator or function the parser accepted but has no meaning for
    Function { name: String, args: Vec<Value> },
}

impl Expr {
    pub fn not(inner: Expr) -> Self {
        Self::Not(Box::new(inner))
    }
}

/// A side of a comparison
#[derive(Debug, Clone, PartialEq)]
pub enum Operand {
    Property(String),
    Literal(Value),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    Eq,
    Neq,
    Lt,
    Lte,
    Gt,
    Gte,
}

impl CompareOp {
    /// The operator with its operands swapped (`5 < x` is `x > 5`)
    pub fn flipped(self) -> Self {
        match self {
            Self::Eq => Self::Eq,
            Self::Neq => Self::Neq,
            Self::Lt => Self::Gt,
            Self::Lte => Self::Gte,
            Self::Gt => Self::Lt,
            Self::Gte => Self::Lte,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpatialOp {
    Intersects,
    Disjoint,
    Within,
    Contains,
    Touches,
    Crosses,
    Overlaps,
    Equals,
}

impl SpatialOp {
    /// Name without dialect prefix, lowercase (`intersects`, `touches`, ...)
    pub fn from_name(name: &str) -> Option<Self> {
        let name = name.to_ascii_lowercase();
        let name = name.strip_prefix("s_").unwrap_or(&name);
        Some(match name {
            "intersects" => Self::Intersects,
            "disjoint" => Self::Disjoint,
            "within" => Self::Within,
            "contains" => Self::Contains,
            "touches" => Self::Touches,
            "crosses" => Self::Crosses,
            "overlaps" => Self::Overlaps,
            "equals" => Self::Equals,
            _ => return None,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TemporalOp {
    After,
    Before,
    Begins,
    BegunBy,
    Contains,
    During,
    EndedBy,
    Ends,
    Equals,
    Meets,
    MetBy,
    Overlaps,
    OverlappedBy,
    AnyInteracts,
    Intersects,
    Disjoint,
}

impl TemporalOp {
    /// Accepts both the `anyinteracts` / `tequals` spellings and the
    /// `t_`-prefixed ones.
    pub fn from_name(name: &str) -> Option<Self> {
        let name = name.to_ascii_lowercase();
        let name = name.strip_prefix("t_").unwrap_or(&name);
        Some(match name {
            "after" => Self::After,
            "before" => Self::Before,
            "begins" | "starts" => Self::Begins,
            "begunby" | "startedby" => Self::BegunBy,
            "tcontains" | "contains" => Self::Contains,
            "during" => Self::During,
            "endedby" | "finishedby" => Self::EndedBy,
            "ends" | "finishes" => Self::Ends,
            "tequals" | "equals" => Self::Equals,
            "meets" => Self::Meets,
            "metby" => Self::MetBy,
            "toverlaps" | "overlaps" => Self::Overlaps,
            "overlappedby" => Self::OverlappedBy,
            "anyinteracts" => Self::AnyInteracts,
            "intersects" => Self::Intersects,
            "disjoint" => Self::Disjoint,
            _ => return None,
        })
    }
}

/// Right-hand side of a temporal operator
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TemporalValue {
    Instant(String),
    /// Either end may be open
    Interval(Option<String>, Option<String>),
}

impl TemporalValue {
    /// Parse `A/B` (with `..` for open ends) or a single instant
    pub fn from_text(s: &str) -> Self {
        let bound = |s: &str| {
            let s = s.trim();
            (!s.is_empty() && s != "..").then(|| s.to_string())
        };
        match s.split_once('/') {
            Some((a, b)) => Self::Interval(bound(a), bound(b)),
            None => Self::Instant(s.trim().to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_op_names() {
        assert_eq!(SpatialOp::from_name("S_INTERSECTS"), Some(SpatialOp::Intersects));
        assert_eq!(SpatialOp::from_name("touches"), Some(SpatialOp::Touches));
        assert_eq!(TemporalOp::from_name("T_AFTER"), Some(TemporalOp::After));
        assert_eq!(TemporalOp::from_name("anyinteracts"), Some(TemporalOp::AnyInteracts));
        assert_eq!(TemporalOp::from_name("whenever"), None);
    }

    #[test]
    fn test_temporal_value_text() {
        assert_eq!(
            TemporalValue::from_text("2020-01-01T00:00:00Z/.."),
            TemporalValue::Interval(Some("2020-01-01T00:00:00Z".into()), None)
        );
        assert_eq!(
            TemporalValue::from_text("2020-01-01T00:00:00Z"),
            TemporalValue::Instant("2020-01-01T00:00:00Z".into())
        );
    }

    #[test]
    fn test_flipped() {
        assert_eq!(CompareOp::Lt.flipped(), CompareOp::Gt);
        assert_eq!(CompareOp::Eq.flipped(), CompareOp::Eq);
    }
}
