// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! STAC items from stored item documents.
//!
//! Two stored shapes are read:
//!
//! - plain items: `item_id`, `collection_id`, `properties`, `spatial.bbox`
//!   (envelope) and optional `geometry`;
//! - EO product records: properties under `misc`, collection in
//!   `misc.platform.Satellite`, time in `temporal.{start,end}_time`, the
//!   footprint in `spatial.geometries.full_search` and files under `file`.
//!   Their assets are derived inline from the `file` block.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use url::Url;

use crate::context::Link;
use crate::coordinates::Coordinates;
use crate::error::StacError;
use crate::search::ModelKind;
use crate::storage::eval::shape_bounds;
use crate::storage::Document;

use super::{item_links, object_at, path, path_str, strings_at, ModelSettings, StacAsset};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Item {
    #[serde(rename = "type")]
    pub kind: String,
    pub stac_version: String,
    #[serde(default)]
    pub stac_extensions: Vec<String>,
    pub id: String,
    #[serde(default)]
    pub collection: Option<String>,
    #[serde(default)]
    pub bbox: Option<Vec<f64>>,
    #[serde(default)]
    pub geometry: Option<Value>,
    #[serde(default)]
    pub properties: Map<String, Value>,
    #[serde(default)]
    pub assets: BTreeMap<String, StacAsset>,
    #[serde(default)]
    pub links: Vec<Link>,
}

impl Item {
    pub fn from_document(doc: &Document, model: ModelKind, settings: &ModelSettings) -> Self {
        match model {
            ModelKind::EoItem => Self::from_eo(doc, settings),
            _ => Self::from_stored(doc, settings),
        }
    }

    fn from_stored(doc: &Document, settings: &ModelSettings) -> Self {
        let source = &doc.source;
        let mut properties = object_at(source, "properties");
        if !properties.contains_key("datetime") {
            properties.insert("datetime".into(), Value::Null);
            properties.entry("start_datetime").or_insert(Value::Null);
            properties.entry("end_datetime").or_insert(Value::Null);
        }

        Self {
            kind: "Feature".into(),
            stac_version: stac_version(source, settings),
            stac_extensions: strings_at(source, "stac_extensions"),
            id: path_str(source, "item_id").unwrap_or(doc.id.as_str()).to_string(),
            collection: path_str(source, "collection_id").map(String::from),
            bbox: path(source, "spatial.bbox")
                .and_then(|e| Coordinates::from_envelope(e).ok())
                .map(|c| c.to_wgs84()),
            geometry: path(source, "geometry").filter(|g| !g.is_null()).cloned(),
            properties,
            assets: BTreeMap::new(),
            links: Vec::new(),
        }
    }

    fn from_eo(doc: &Document, settings: &ModelSettings) -> Self {
        let source = &doc.source;
        let mut properties = object_at(source, "misc");
        properties.insert("size".into(), path(source, "file.size").cloned().unwrap_or(Value::Null));
        properties.insert("location".into(), path(source, "file.location").cloned().unwrap_or(Value::Null));
        if path(source, "temporal").is_some()
            && !(properties.contains_key("start_datetime") && properties.contains_key("end_datetime"))
        {
            properties.insert("datetime".into(), Value::Null);
            properties.insert(
                "start_datetime".into(),
                path(source, "temporal.start_time").cloned().unwrap_or(Value::Null),
            );
            properties.insert(
                "end_datetime".into(),
                path(source, "temporal.end_time").cloned().unwrap_or(Value::Null),
            );
        }

        let geometry = path(source, "spatial.geometries.full_search").filter(|g| !g.is_null()).cloned();
        Self {
            kind: "Feature".into(),
            stac_version: stac_version(source, settings),
            stac_extensions: strings_at(source, "stac_extensions"),
            id: doc.id.clone(),
            collection: path_str(source, "misc.platform.Satellite").map(String::from),
            bbox: geometry.as_ref().and_then(shape_bounds).map(|b| b.to_vec()),
            geometry,
            properties,
            assets: eo_assets(source, &settings.posix_download_url),
            links: Vec::new(),
        }
    }

    /// Parse STAC item JSON from a client
    pub fn from_stac(stac: Value) -> Result<Self, StacError> {
        let item: Self =
            serde_json::from_value(stac).map_err(|e| StacError::invalid(format!("invalid item: {}", e)))?;
        if item.id.is_empty() {
            return Err(StacError::invalid("item id must not be empty"));
        }
        Ok(item)
    }

    /// Stored document for this item under `collection`
    pub fn to_source(&self, collection: &str) -> Result<Value, StacError> {
        let bbox = match &self.bbox {
            Some(b) => Some(Coordinates::from_wgs84(b)?.to_envelope()),
            None => None,
        };
        Ok(json!({
            "type": "item",
            "item_id": self.id,
            "collection_id": collection,
            "stac_version": self.stac_version,
            "stac_extensions": self.stac_extensions,
            "properties": self.properties,
            "geometry": self.geometry,
            "spatial": {"bbox": bbox},
        }))
    }

    pub fn with_links(mut self, base_url: &Url, assets: bool) -> Self {
        let collection = self.collection.clone().unwrap_or_default();
        self.links = item_links(base_url, &collection, &self.id, assets);
        self
    }
}

fn stac_version(source: &Value, settings: &ModelSettings) -> String {
    path_str(source, "stac_version")
        .unwrap_or(settings.stac_version.as_str())
        .to_string()
}

/// Assets derived from an EO record's `file` block
fn eo_assets(source: &Value, download_url: &str) -> BTreeMap<String, StacAsset> {
    let file = |key: &str| path_str(source, &format!("file.{}", key)).filter(|s| !s.is_empty());
    let directory = file("directory").unwrap_or_default();
    let asset = |name: &str, media_type: &str, role: &str| StacAsset {
        href: format!("{}{}/{}", download_url, directory, name),
        title: Some(name.to_string()),
        media_type: Some(media_type.to_string()),
        roles: vec![role.to_string()],
    };

    let mut assets = BTreeMap::new();
    match (file("data_file"), file("data_files")) {
        (_, Some(many)) => {
            for (n, name) in many.split(',').enumerate() {
                assets.insert(format!("data_file_{}", n), asset(name, "application/zip", "data"));
            }
        }
        (Some(one), None) => {
            assets.insert("data_file".into(), asset(one, "application/zip", "data"));
        }
        (None, None) => {}
    }
    if let Some(name) = file("metadata_file") {
        assets.insert("metadata_file".into(), asset(name, "application/xml", "metadata"));
    }
    if let Some(name) = file("quicklook_file") {
        assets.insert("quicklook_file".into(), asset(name, "image/png", "thumbnail"));
    }
    assets
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings() -> ModelSettings {
        ModelSettings {
            stac_version: "1.0.0".into(),
            posix_download_url: "https://dap.example".into(),
        }
    }

    #[test]
    fn test_plain_item() {
        let doc = Document::new(
            "doc-1",
            "items",
            json!({
                "item_id": "i1",
                "collection_id": "c1",
                "properties": {"datetime": "2020-01-01T00:00:00Z", "platform": "s2a"},
                "spatial": {"bbox": {"type": "envelope", "coordinates": [[0.0, 10.0], [5.0, 2.0]]}}
            }),
        );
        let item = Item::from_document(&doc, ModelKind::Item, &settings());
        assert_eq!(item.id, "i1");
        assert_eq!(item.collection.as_deref(), Some("c1"));
        assert_eq!(item.bbox, Some(vec![0.0, 2.0, 5.0, 10.0]));
        assert_eq!(item.properties["platform"], "s2a");
        assert!(!item.properties.contains_key("start_datetime"));
    }

    #[test]
    fn test_missing_datetime_defaults_range() {
        let doc = Document::new("i2", "items", json!({"properties": {"start_datetime": "2020-01-01T00:00:00Z"}}));
        let item = Item::from_document(&doc, ModelKind::Item, &settings());
        assert_eq!(item.id, "i2");
        assert_eq!(item.properties["datetime"], Value::Null);
        assert_eq!(item.properties["start_datetime"], "2020-01-01T00:00:00Z");
        assert_eq!(item.properties["end_datetime"], Value::Null);
        assert!(item.bbox.is_none());
        assert!(item.collection.is_none());
    }

    #[test]
    fn test_eo_item() {
        let doc = Document::new(
            "S1A_0001",
            "eo",
            json!({
                "misc": {"platform": {"Satellite": "sentinel1a"}},
                "temporal": {"start_time": "2020-01-01T00:00:00Z", "end_time": "2020-01-01T00:10:00Z"},
                "spatial": {"geometries": {"full_search": {
                    "type": "Polygon",
                    "coordinates": [[[0.0, 0.0], [4.0, 0.0], [4.0, 3.0], [0.0, 0.0]]]
                }}},
                "file": {
                    "directory": "/neodc/s1",
                    "data_files": "a.zip,b.zip",
                    "metadata_file": "a.xml",
                    "size": 10,
                    "location": "on_disk"
                }
            }),
        );
        let item = Item::from_document(&doc, ModelKind::EoItem, &settings());
        assert_eq!(item.collection.as_deref(), Some("sentinel1a"));
        assert_eq!(item.bbox, Some(vec![0.0, 0.0, 4.0, 3.0]));
        assert_eq!(item.properties["start_datetime"], "2020-01-01T00:00:00Z");
        assert_eq!(item.properties["datetime"], Value::Null);
        assert_eq!(item.properties["size"], 10);
        assert_eq!(item.properties["location"], "on_disk");

        let keys: Vec<&str> = item.assets.keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["data_file_0", "data_file_1", "metadata_file"]);
        assert_eq!(item.assets["data_file_1"].href, "https://dap.example/neodc/s1/b.zip");
        assert_eq!(item.assets["metadata_file"].roles, vec!["metadata"]);
    }

    #[test]
    fn test_stac_round_trip_through_source() {
        let item = Item::from_stac(json!({
            "type": "Feature",
            "stac_version": "1.0.0",
            "id": "i1",
            "collection": "c1",
            "bbox": [0.0, 2.0, 5.0, 10.0],
            "properties": {"datetime": "2020-01-01T00:00:00Z"}
        }))
        .unwrap();
        let source = item.to_source("c1").unwrap();
        assert_eq!(source["type"], "item");
        let back = Item::from_document(&Document::new("i1", "items", source), ModelKind::Item, &settings());
        assert_eq!(back.bbox, item.bbox);
        assert_eq!(back.collection.as_deref(), Some("c1"));
    }
}
