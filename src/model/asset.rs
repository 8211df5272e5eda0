// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Assets (files) from stored asset documents.
//!
//! Stored shape: `asset_id`, `item_id`, `collection_id`, `media_type`,
//! `location`, `filename`, `size`, `spatial.bbox` (envelope) and
//! `properties` holding `uri` / `href` and the `categories` roles.

use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use url::Url;

use crate::context::Link;
use crate::coordinates::Coordinates;
use crate::storage::Document;

use super::{object_at, path, path_str, strings_at, ModelSettings};

/// Asset entry embedded in an item's `assets` map
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StacAsset {
    pub href: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub media_type: Option<String>,
    #[serde(default)]
    pub roles: Vec<String>,
}

/// Standalone asset, as returned by asset search
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Asset {
    #[serde(rename = "type")]
    pub kind: String,
    pub stac_version: String,
    #[serde(default)]
    pub stac_extensions: Vec<String>,
    pub asset_id: String,
    #[serde(default)]
    pub item: Option<String>,
    #[serde(default)]
    pub collection: Option<String>,
    #[serde(default)]
    pub roles: Vec<String>,
    #[serde(default)]
    pub bbox: Option<Vec<f64>>,
    pub href: String,
    #[serde(default)]
    pub media_type: Option<String>,
    #[serde(default)]
    pub filename: Option<String>,
    #[serde(default)]
    pub size: Option<u64>,
    #[serde(default)]
    pub properties: Map<String, Value>,
    #[serde(default)]
    pub links: Vec<Link>,
}

impl Asset {
    pub fn from_document(doc: &Document, settings: &ModelSettings) -> Self {
        let source = &doc.source;
        Self {
            kind: "Feature".into(),
            stac_version: path_str(source, "stac_version")
                .unwrap_or(settings.stac_version.as_str())
                .to_string(),
            stac_extensions: strings_at(source, "stac_extensions"),
            asset_id: path_str(source, "asset_id").unwrap_or(doc.id.as_str()).to_string(),
            item: path_str(source, "item_id").map(String::from),
            collection: path_str(source, "collection_id").map(String::from),
            roles: roles(source),
            bbox: path(source, "spatial.bbox")
                .and_then(|e| Coordinates::from_envelope(e).ok())
                .map(|c| c.to_wgs84()),
            href: url(source, &settings.posix_download_url),
            media_type: path_str(source, "media_type").map(String::from),
            filename: path_str(source, "filename").map(String::from),
            size: path(source, "size").and_then(Value::as_u64),
            properties: object_at(source, "properties"),
            links: Vec::new(),
        }
    }

    /// Entry for an item's `assets` map
    pub fn to_stac_asset(&self) -> StacAsset {
        StacAsset {
            href: self.href.clone(),
            title: self.filename.clone(),
            media_type: self.media_type.clone().filter(|m| m != "POSIX"),
            roles: self.roles.clone(),
        }
    }

    pub fn with_links(mut self, base_url: &Url) -> Self {
        let root = base_url.as_str().trim_end_matches('/');
        let item_href = format!(
            "{}/collections/{}/items/{}",
            root,
            self.collection.as_deref().unwrap_or_default(),
            self.item.as_deref().unwrap_or_default()
        );
        self.links = vec![
            Link::new("self", format!("{}/assets/{}", item_href, self.asset_id), "application/json"),
            Link::new("item", item_href, "application/geo+json"),
            Link::new("root", root, "application/json"),
        ];
        self
    }

    /// Stored document for this asset
    pub fn to_source(&self) -> Value {
        json!({
            "asset_id": self.asset_id,
            "item_id": self.item,
            "collection_id": self.collection,
            "media_type": self.media_type,
            "filename": self.filename,
            "size": self.size,
            "properties": self.properties,
        })
    }
}

/// Roles from `properties.categories` (older records spell it `catagories`)
fn roles(source: &Value) -> Vec<String> {
    let roles = strings_at(source, "properties.categories");
    if roles.is_empty() {
        strings_at(source, "properties.catagories")
    } else {
        roles
    }
}

/// POSIX files resolve under the download prefix, anything else uses its
/// stored href.
fn url(source: &Value, download_url: &str) -> String {
    match path_str(source, "media_type") {
        None | Some("POSIX") => {
            let location = path_str(source, "properties.uri")
                .or_else(|| path_str(source, "location"))
                .unwrap_or_default();
            format!("{}{}", download_url, location)
        }
        Some(_) => path_str(source, "properties.href").unwrap_or_default().to_string(),
    }
}
