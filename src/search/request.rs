// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Normalized search request.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::query_builder::{SortField, SortOrder};
use super::temporal::{parse_instant, DatetimeExpr};
use crate::coordinates::Coordinates;
use crate::error::StacError;

/// CQL dialect of a `filter` expression
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FilterLang {
    #[default]
    #[serde(rename = "cql-json")]
    CqlJson,
    #[serde(rename = "cql-text")]
    CqlText,
    #[serde(rename = "cql2-json")]
    Cql2Json,
}

impl FilterLang {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::CqlJson => "cql-json",
            Self::CqlText => "cql-text",
            Self::Cql2Json => "cql2-json",
        }
    }
}

impl fmt::Display for FilterLang {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FilterLang {
    type Err = StacError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "cql-json" => Ok(Self::CqlJson),
            "cql-text" => Ok(Self::CqlText),
            "cql2-json" => Ok(Self::Cql2Json),
            other => Err(StacError::invalid(format!("unknown filter-lang '{}'", other))),
        }
    }
}

/// One sort key as requested
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortBy {
    pub field: String,
    #[serde(default)]
    pub direction: SortOrder,
}

impl SortBy {
    /// Parse a compact token: `+field` ascending, `-field` descending,
    /// bare `field` ascending.
    pub fn parse(token: &str) -> Self {
        let token = token.trim();
        let (field, direction) = match token.strip_prefix('-') {
            Some(rest) => (rest, SortOrder::Desc),
            None => (token.strip_prefix('+').unwrap_or(token), SortOrder::Asc),
        };
        Self {
            field: field.to_string(),
            direction,
        }
    }
}

impl From<&SortBy> for SortField {
    fn from(s: &SortBy) -> Self {
        SortField {
            field: s.field.clone(),
            order: s.direction,
        }
    }
}

/// Field include / exclude sets
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldsSpec {
    #[serde(default)]
    pub include: Vec<String>,
    #[serde(default)]
    pub exclude: Vec<String>,
}

impl FieldsSpec {
    /// Split compact tokens: `-name` excludes, `+name` and `name` include.
    pub fn from_tokens<'a>(tokens: impl IntoIterator<Item = &'a str>) -> Self {
        let mut spec = Self::default();
        for token in tokens.into_iter().map(str::trim).filter(|t| !t.is_empty()) {
            match token.strip_prefix('-') {
                Some(name) => spec.exclude.push(name.to_string()),
                None => spec.include.push(token.strip_prefix('+').unwrap_or(token).to_string()),
            }
        }
        spec
    }

    pub fn is_empty(&self) -> bool {
        self.include.is_empty() && self.exclude.is_empty()
    }
}

/// A search over items, collections or assets.
///
/// Built fresh per call. Composing a query borrows it and never mutates it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchRequest {
    /// Collection id filter
    pub collections: Vec<String>,
    /// Entity id filter (item ids for items and assets, collection ids for collections)
    pub ids: Vec<String>,
    pub asset_ids: Vec<String>,
    /// `[minLon, minLat, maxLon, maxLat]` or the 6-number 3D form
    pub bbox: Option<Vec<f64>>,
    /// Instant, interval or date expression
    pub datetime: Option<String>,
    /// GeoJSON geometry
    pub intersects: Option<Value>,
    /// Free text
    pub q: Option<String>,
    /// CQL expression (JSON, or a string for cql-text)
    pub filter: Option<Value>,
    #[serde(rename = "filter-lang")]
    pub filter_lang: Option<FilterLang>,
    pub fields: Option<FieldsSpec>,
    pub sortby: Vec<SortBy>,
    pub limit: Option<usize>,
    /// 1-based page number
    pub page: Option<u32>,
    /// Role / category membership
    pub role: Vec<String>,
    /// Report which collections contributed results
    pub context_collection: bool,
}

impl SearchRequest {
    pub fn new() -> Self {
        Self::default()
    }

    /// Page number, 1 when absent
    pub fn page_or_first(&self) -> u32 {
        self.page.unwrap_or(1)
    }

    /// Offset of the first hit of the requested page
    pub fn offset(&self, limit: usize) -> usize {
        (self.page_or_first().saturating_sub(1) as usize).saturating_mul(limit)
    }

    /// Cross-field checks the HTTP layer leaves to us.
    pub fn validate(&self) -> Result<(), StacError> {
        if let Some(bbox) = &self.bbox {
            Coordinates::from_wgs84(bbox)?;
            if self.intersects.is_some() {
                return Err(StacError::invalid("only one of bbox and intersects may be given"));
            }
        }
        if let Some(geometry) = &self.intersects {
            if geometry.get("type").and_then(Value::as_str).is_none() {
                return Err(StacError::invalid("intersects must be a GeoJSON geometry with a type"));
            }
        }
        if self.page == Some(0) {
            return Err(StacError::invalid("page must be 1 or greater"));
        }
        if let Some(dt) = &self.datetime {
            validate_datetime(dt)?;
        }
        if let (Some(filter), Some(FilterLang::CqlText)) = (&self.filter, self.filter_lang) {
            if !filter.is_string() {
                return Err(StacError::invalid("cql-text filter must be a string"));
            }
        }
        Ok(())
    }
}

fn validate_datetime(expr: &str) -> Result<(), StacError> {
    let instant = |s: &str| {
        parse_instant(s).ok_or_else(|| StacError::invalid(format!("invalid datetime '{}'", s)))
    };
    match DatetimeExpr::parse(expr) {
        DatetimeExpr::Interval { start: None, end: None } => {
            Err(StacError::invalid(format!("datetime interval '{}' is open on both ends", expr)))
        }
        DatetimeExpr::Interval { start, end } => {
            let start = start.as_deref().map(instant).transpose()?;
            let end = end.as_deref().map(instant).transpose()?;
            match (start, end) {
                (Some(a), Some(b)) if a > b => Err(StacError::invalid(format!(
                    "datetime interval '{}' starts after it ends",
                    expr
                ))),
                _ => Ok(()),
            }
        }
        DatetimeExpr::Instant(t) | DatetimeExpr::Date(t) => instant(&t).map(|_| ()),
        DatetimeExpr::Unrecognized => Err(StacError::invalid(format!("unrecognized datetime '{}'", expr))),
    }
}
