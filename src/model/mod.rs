//! Domain model adapters.
//!
//! Turn stored documents into STAC entities, and STAC input back into the
//! stored shape. A missing stored field yields a default (empty, or null),
//! never an error.

mod asset;
mod collection;
mod item;
mod queryables;

pub use asset::{Asset, StacAsset};
pub use collection::{Collection, Extent, SpatialExtent, TemporalExtent};
pub use item::Item;
pub use queryables::queryables;

use serde_json::{Map, Value};
use url::Url;

use crate::config::StacSearchConfig;
use crate::context::Link;

/// Deployment values the adapters need
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelSettings {
    pub stac_version: String,
    /// Prefix prepended to POSIX asset locations
    pub posix_download_url: String,
}

impl ModelSettings {
    pub fn from_config(config: &StacSearchConfig) -> Self {
        Self {
            stac_version: config.stac_version.clone(),
            posix_download_url: config.posix_download_url.clone(),
        }
    }
}

impl Default for ModelSettings {
    fn default() -> Self {
        Self::from_config(&StacSearchConfig::default())
    }
}

/// Value under a dotted path
pub(crate) fn path<'a>(source: &'a Value, dotted: &str) -> Option<&'a Value> {
    dotted.split('.').try_fold(source, |v, key| v.get(key))
}

pub(crate) fn path_str<'a>(source: &'a Value, dotted: &str) -> Option<&'a str> {
    path(source, dotted).and_then(Value::as_str)
}

pub(crate) fn object_at(source: &Value, dotted: &str) -> Map<String, Value> {
    path(source, dotted)
        .and_then(Value::as_object)
        .cloned()
        .unwrap_or_default()
}

pub(crate) fn strings_at(source: &Value, dotted: &str) -> Vec<String> {
    match path(source, dotted) {
        Some(Value::Array(values)) => values.iter().filter_map(Value::as_str).map(String::from).collect(),
        Some(Value::String(s)) => vec![s.clone()],
        _ => Vec::new(),
    }
}

fn base(url: &Url) -> &str {
    url.as_str().trim_end_matches('/')
}

pub(crate) fn collection_links(base_url: &Url, collection: &str, queryables: bool) -> Vec<Link> {
    let root = base(base_url);
    let mut links = vec![
        Link::new("self", format!("{}/collections/{}", root, collection), "application/json"),
        Link::new("parent", root, "application/json"),
        Link::new("items", format!("{}/collections/{}/items", root, collection), "application/geo+json"),
        Link::new("root", root, "application/json"),
    ];
    if queryables {
        links.push(Link::new(
            "https://www.opengis.net/def/rel/ogc/1.0/queryables",
            format!("{}/collections/{}/queryables", root, collection),
            "application/schema+json",
        ));
    }
    links
}

pub(crate) fn item_links(base_url: &Url, collection: &str, item: &str, assets: bool) -> Vec<Link> {
    let root = base(base_url);
    let collection_href = format!("{}/collections/{}", root, collection);
    let mut links = vec![
        Link::new("self", format!("{}/items/{}", collection_href, item), "application/geo+json"),
        Link::new("parent", collection_href.clone(), "application/json"),
        Link::new("collection", collection_href.clone(), "application/json"),
        Link::new("root", root, "application/json"),
    ];
    if assets {
        links.push(Link::new(
            "assets",
            format!("{}/items/{}/assets", collection_href, item),
            "application/json",
        ));
    }
    links
}
