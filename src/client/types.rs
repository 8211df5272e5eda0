//! Request and response types for the client API.

use serde::Serialize;
use url::Url;

use crate::context::{Link, ResultContext};
use crate::model::{Asset, Collection, Item};

/// Per-call values supplied by the HTTP layer
#[derive(Debug, Clone)]
pub struct RequestContext {
    /// Catalog named by the route, if any
    pub catalog: Option<String>,
    /// API root, used for entity links
    pub base_url: Url,
    /// Full request URL, used for paging links
    pub url: Url,
}

impl RequestContext {
    pub fn new(base_url: Url) -> Self {
        Self {
            catalog: None,
            url: base_url.clone(),
            base_url,
        }
    }

    pub fn with_catalog(mut self, catalog: impl Into<String>) -> Self {
        self.catalog = Some(catalog.into());
        self
    }

    pub fn with_url(mut self, url: Url) -> Self {
        self.url = url;
        self
    }

    pub fn catalog(&self) -> Option<&str> {
        self.catalog.as_deref()
    }
}

/// A page of items
#[derive(Debug, Clone, Serialize)]
pub struct ItemCollection {
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub features: Vec<Item>,
    pub links: Vec<Link>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context: Option<ResultContext>,
}

/// A page of collections
#[derive(Debug, Clone, Serialize)]
pub struct CollectionList {
    pub collections: Vec<Collection>,
    pub links: Vec<Link>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context: Option<ResultContext>,
}

/// A page of assets
#[derive(Debug, Clone, Serialize)]
pub struct AssetCollection {
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub features: Vec<Asset>,
    pub links: Vec<Link>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context: Option<ResultContext>,
}
