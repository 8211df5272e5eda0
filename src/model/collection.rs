// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! STAC collections from stored (or aggregated) collection documents.
//!
//! Stored extent shape:
//!
//! ```text
//! extent.temporal = { gte: <instant>, lte: <instant> }   date range
//! extent.spatial  = { type: envelope, coordinates: [[minLon, maxLat], [maxLon, minLat]] }
//! ```
//!
//! Each part degrades on its own: a missing temporal range is open on both
//! ends, a missing or malformed envelope is the whole globe.

use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use url::Url;

use crate::context::Link;
use crate::coordinates::Coordinates;
use crate::error::StacError;
use crate::storage::Document;

use super::{collection_links, object_at, path, path_str, strings_at, ModelSettings};

const WHOLE_GLOBE: [f64; 4] = [-180.0, -90.0, 180.0, 90.0];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpatialExtent {
    pub bbox: Vec<Vec<f64>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TemporalExtent {
    pub interval: Vec<[Option<String>; 2]>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Extent {
    pub spatial: SpatialExtent,
    pub temporal: TemporalExtent,
}

impl Default for Extent {
    fn default() -> Self {
        Self {
            spatial: SpatialExtent {
                bbox: vec![WHOLE_GLOBE.to_vec()],
            },
            temporal: TemporalExtent {
                interval: vec![[None, None]],
            },
        }
    }
}

impl Extent {
    /// Read a stored extent, defaulting whichever parts are absent
    pub fn from_stored(extent: Option<&Value>) -> Self {
        let mut out = Self::default();
        let Some(extent) = extent else {
            return out;
        };

        if let Some(temporal) = extent.get("temporal").filter(|t| t.is_object()) {
            let bound = |key: &str| temporal.get(key).and_then(Value::as_str).map(String::from);
            out.temporal.interval = vec![[bound("gte"), bound("lte")]];
        }
        if let Some(bbox) = extent.get("spatial").and_then(|s| Coordinates::from_envelope(s).ok()) {
            out.spatial.bbox = vec![bbox.to_wgs84()];
        }
        out
    }

    /// Stored shape of a STAC extent. Only the first interval and bbox are
    /// kept.
    pub fn to_stored(&self) -> Result<Value, StacError> {
        let mut stored = Map::new();
        if let Some([start, end]) = self.temporal.interval.first() {
            stored.insert("temporal".into(), json!({"gte": start, "lte": end}));
        }
        if let Some(bbox) = self.spatial.bbox.first() {
            stored.insert("spatial".into(), Coordinates::from_wgs84(bbox)?.to_envelope());
        }
        Ok(Value::Object(stored))
    }

    pub fn interval(&self) -> (Option<&str>, Option<&str>) {
        match self.temporal.interval.first() {
            Some([start, end]) => (start.as_deref(), end.as_deref()),
            None => (None, None),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Collection {
    #[serde(rename = "type")]
    pub kind: String,
    pub id: String,
    pub stac_version: String,
    #[serde(default)]
    pub stac_extensions: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub keywords: Vec<String>,
    #[serde(default)]
    pub license: String,
    #[serde(default)]
    pub providers: Vec<Value>,
    #[serde(default)]
    pub summaries: Map<String, Value>,
    #[serde(default)]
    pub extent: Extent,
    /// Items behind an aggregated collection
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub item_count: Option<u64>,
    #[serde(default)]
    pub links: Vec<Link>,
}

impl Collection {
    pub fn from_document(doc: &Document, settings: &ModelSettings) -> Self {
        let source = &doc.source;
        let summaries = match path(source, "summaries").and_then(Value::as_object) {
            Some(s) => s.clone(),
            None => object_at(source, "properties"),
        };
        Self {
            kind: "Collection".into(),
            id: doc.id.clone(),
            stac_version: path_str(source, "stac_version")
                .unwrap_or(settings.stac_version.as_str())
                .to_string(),
            stac_extensions: strings_at(source, "stac_extensions"),
            title: path_str(source, "title").map(String::from),
            description: path_str(source, "description").unwrap_or_default().to_string(),
            keywords: strings_at(source, "keywords"),
            license: path_str(source, "license").unwrap_or_default().to_string(),
            providers: path(source, "providers")
                .and_then(Value::as_array)
                .cloned()
                .unwrap_or_default(),
            summaries,
            extent: Extent::from_stored(path(source, "extent")),
            item_count: path(source, "item_count").and_then(Value::as_u64),
            links: Vec::new(),
        }
    }

    /// Parse STAC collection JSON from a client
    pub fn from_stac(stac: Value) -> Result<Self, StacError> {
        let collection: Self = serde_json::from_value(stac)
            .map_err(|e| StacError::invalid(format!("invalid collection: {}", e)))?;
        if collection.id.is_empty() {
            return Err(StacError::invalid("collection id must not be empty"));
        }
        Ok(collection)
    }

    /// Stored document for this collection
    pub fn to_source(&self) -> Result<Value, StacError> {
        Ok(json!({
            "type": "collection",
            "stac_version": self.stac_version,
            "stac_extensions": self.stac_extensions,
            "title": self.title,
            "description": self.description,
            "keywords": self.keywords,
            "license": self.license,
            "providers": self.providers,
            "summaries": self.summaries,
            "extent": self.extent.to_stored()?,
        }))
    }

    pub fn with_links(mut self, base_url: &Url, queryables: bool) -> Self {
        self.links = collection_links(base_url, &self.id, queryables);
        self
    }
}
