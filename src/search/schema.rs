// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Stored document shapes.
//!
//! A catalog index holds one of several document shapes. Each shape is a
//! [`ModelKind`], and each kind has a [`FieldNaming`] table telling the query
//! composer which stored field backs each logical search parameter.
//!
//! ```text
//! Item          item_id / collection_id / properties.{datetime,start_datetime,end_datetime}
//! Collection    _id / extent.temporal.{gte,lte} / extent.spatial
//! Asset         asset_id / item_id / collection_id / properties.categories
//! EoItem        _id / misc.platform.Satellite / temporal.{start_time,end_time}
//! EoCollection  synthesized from a terms aggregation over EoItem documents
//! ```

use std::fmt;

use serde::{Deserialize, Serialize};

/// Logical entity served by a catalog index
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    Collection,
    Item,
    Asset,
}

impl EntityKind {
    /// Lowercase name, as used in metric labels
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Collection => "collection",
            Self::Item => "item",
            Self::Asset => "asset",
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Stored document shape of one catalog index
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModelKind {
    Item,
    Collection,
    Asset,
    /// Earth-observation product records
    EoItem,
    /// Collections computed by aggregating `EoItem` documents
    EoCollection,
}

impl ModelKind {
    pub fn entity(&self) -> EntityKind {
        match self {
            Self::Item | Self::EoItem => EntityKind::Item,
            Self::Collection | Self::EoCollection => EntityKind::Collection,
            Self::Asset => EntityKind::Asset,
        }
    }

    /// True when entities are computed from an aggregation rather than stored
    pub fn is_aggregated(&self) -> bool {
        matches!(self, Self::EoCollection)
    }

    pub fn naming(&self) -> &'static FieldNaming {
        match self {
            Self::Item => &ITEM_NAMING,
            Self::Collection => &COLLECTION_NAMING,
            Self::Asset => &ASSET_NAMING,
            Self::EoItem | Self::EoCollection => &EO_ITEM_NAMING,
        }
    }
}

impl fmt::Display for ModelKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Item => write!(f, "item"),
            Self::Collection => write!(f, "collection"),
            Self::Asset => write!(f, "asset"),
            Self::EoItem => write!(f, "eo_item"),
            Self::EoCollection => write!(f, "eo_collection"),
        }
    }
}

/// Stored fields holding temporal data.
///
/// `datetime` is `None` when the shape has no single-stamp field and only
/// stores a start/end pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TemporalFields {
    pub datetime: Option<&'static str>,
    pub start: &'static str,
    pub end: &'static str,
}

/// Logical search parameter → stored field, for one document shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldNaming {
    /// Field matched by the request's `ids`
    pub id: &'static str,
    /// Owning collection id
    pub collection: &'static str,
    /// Owning item id (assets)
    pub item: Option<&'static str>,
    pub asset: Option<&'static str>,
    /// Discriminator term when the index is shared between entity types
    pub type_term: Option<(&'static str, &'static str)>,
    /// Envelope used by `bbox` filters
    pub bbox: &'static str,
    /// Shape used by `intersects` filters
    pub geometry: &'static str,
    pub temporal: TemporalFields,
    /// Role / category membership
    pub role: &'static str,
    /// Fields searched by free text
    pub free_text: &'static [&'static str],
    /// Keyword field the context-collection aggregation buckets on
    pub context_aggregation: &'static str,
    /// Logical CQL property → stored field
    pub cql_fields: &'static [(&'static str, &'static str)],
    /// Stored field for any other CQL property; `{name}` is replaced
    pub cql_template: &'static str,
}

impl FieldNaming {
    /// Stored field for a CQL property name
    pub fn cql_field(&self, name: &str) -> String {
        self.cql_fields
            .iter()
            .find(|(logical, _)| *logical == name)
            .map(|(_, stored)| stored.to_string())
            .unwrap_or_else(|| self.cql_template.replace("{name}", name))
    }
}

pub static ITEM_NAMING: FieldNaming = FieldNaming {
    id: "item_id",
    collection: "collection_id",
    item: Some("item_id"),
    asset: None,
    type_term: Some(("type", "item")),
    bbox: "spatial.bbox",
    geometry: "geometry",
    temporal: TemporalFields {
        datetime: Some("properties.datetime"),
        start: "properties.start_datetime",
        end: "properties.end_datetime",
    },
    role: "properties.categories",
    free_text: &["properties.*"],
    context_aggregation: "collection_id.keyword",
    cql_fields: &[
        ("datetime", "properties.datetime"),
        ("start_datetime", "properties.start_datetime"),
        ("end_datetime", "properties.end_datetime"),
        ("bbox", "spatial.bbox"),
        ("geometry", "geometry"),
        ("id", "item_id"),
        ("collection", "collection_id"),
    ],
    cql_template: "properties.{name}.keyword",
};

pub static COLLECTION_NAMING: FieldNaming = FieldNaming {
    id: "_id",
    collection: "_id",
    item: None,
    asset: None,
    type_term: Some(("type", "collection")),
    bbox: "extent.spatial",
    geometry: "extent.spatial",
    temporal: TemporalFields {
        datetime: None,
        start: "extent.temporal.gte",
        end: "extent.temporal.lte",
    },
    role: "keywords",
    free_text: &["title", "description", "keywords"],
    context_aggregation: "_id",
    cql_fields: &[("bbox", "extent.spatial"), ("id", "_id")],
    cql_template: "summaries.{name}.keyword",
};

pub static ASSET_NAMING: FieldNaming = FieldNaming {
    id: "item_id",
    collection: "collection_id",
    item: Some("item_id"),
    asset: Some("asset_id"),
    type_term: None,
    bbox: "spatial.bbox",
    geometry: "spatial.bbox",
    temporal: TemporalFields {
        datetime: Some("properties.datetime"),
        start: "properties.start_datetime",
        end: "properties.end_datetime",
    },
    role: "properties.categories",
    free_text: &["properties.*", "filename"],
    context_aggregation: "collection_id.keyword",
    cql_fields: &[
        ("datetime", "properties.datetime"),
        ("bbox", "spatial.bbox"),
        ("id", "asset_id"),
        ("item", "item_id"),
        ("media_type", "media_type"),
    ],
    cql_template: "properties.{name}.keyword",
};

pub static EO_ITEM_NAMING: FieldNaming = FieldNaming {
    id: "_id",
    collection: "misc.platform.Satellite.raw",
    item: None,
    asset: None,
    type_term: None,
    bbox: "spatial.geometries.full_search",
    geometry: "spatial.geometries.full_search",
    temporal: TemporalFields {
        datetime: None,
        start: "temporal.start_time",
        end: "temporal.end_time",
    },
    role: "misc.categories",
    free_text: &["misc.*"],
    context_aggregation: "misc.platform.Satellite.keyword",
    cql_fields: &[
        ("datetime", "temporal.start_time"),
        ("bbox", "spatial.geometries.full_search"),
    ],
    cql_template: "misc.{name}.keyword",
};
