//! Configuration for the search core.
//!
//! Loading the file or environment is the host's job; this module only
//! defines the shape and its defaults.
//!
//! # Example
//!
//! ```
//! use stac_search::StacSearchConfig;
//!
//! // Minimal config (uses defaults)
//! let config = StacSearchConfig::default();
//! assert_eq!(config.max_result_window, 10_000);
//!
//! // Two catalogs with their own item indices
//! let config: StacSearchConfig = serde_json::from_value(serde_json::json!({
//!     "catalogs": [
//!         {"name": "ceda", "item": {"index": "ceda-items"}, "collection": {"index": "ceda-collections"}},
//!         {"name": "eo", "item": {"index": "eo-products", "model": "eo_item"}}
//!     ],
//!     "extensions": ["context", "filter", "sort"],
//!     "posix_download_url": "https://dap.ceda.ac.uk"
//! }))
//! .unwrap();
//! assert_eq!(config.catalogs.len(), 2);
//! ```

use serde::Deserialize;

use crate::capabilities::{Capabilities, Capability};
use crate::search::{EntityKind, ModelKind};

/// Backing index of one entity kind within a catalog
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct IndexConfig {
    /// Index (or alias / pattern) name
    pub index: String,
    /// Stored document shape; defaults to the entity's plain model
    #[serde(default)]
    pub model: Option<ModelKind>,
}

impl IndexConfig {
    pub fn new(index: impl Into<String>) -> Self {
        Self {
            index: index.into(),
            model: None,
        }
    }

    pub fn with_model(mut self, model: ModelKind) -> Self {
        self.model = Some(model);
        self
    }

    /// Configured model, or the plain model of `entity`
    pub fn model_for(&self, entity: EntityKind) -> ModelKind {
        self.model.unwrap_or(match entity {
            EntityKind::Collection => ModelKind::Collection,
            EntityKind::Item => ModelKind::Item,
            EntityKind::Asset => ModelKind::Asset,
        })
    }
}

/// One named catalog and its indices
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct CatalogConfig {
    pub name: String,
    #[serde(default)]
    pub collection: Option<IndexConfig>,
    #[serde(default)]
    pub item: Option<IndexConfig>,
    #[serde(default)]
    pub asset: Option<IndexConfig>,
}

impl CatalogConfig {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            collection: None,
            item: None,
            asset: None,
        }
    }

    pub fn with_index(mut self, entity: EntityKind, index: IndexConfig) -> Self {
        match entity {
            EntityKind::Collection => self.collection = Some(index),
            EntityKind::Item => self.item = Some(index),
            EntityKind::Asset => self.asset = Some(index),
        }
        self
    }

    pub fn index(&self, entity: EntityKind) -> Option<&IndexConfig> {
        match entity {
            EntityKind::Collection => self.collection.as_ref(),
            EntityKind::Item => self.item.as_ref(),
            EntityKind::Asset => self.asset.as_ref(),
        }
    }
}

/// Configuration for the search core.
///
/// All fields have sensible defaults. Catalogs are registered in list order,
/// and that order is the fan-out precedence.
#[derive(Debug, Clone, Deserialize)]
pub struct StacSearchConfig {
    #[serde(default)]
    pub catalogs: Vec<CatalogConfig>,

    /// Enabled optional behaviours
    #[serde(default = "default_extensions")]
    pub extensions: Vec<Capability>,

    /// Page size when a request gives none (default: 10)
    #[serde(default = "default_limit")]
    pub default_limit: usize,

    /// Backend result window ceiling (default: 10000)
    #[serde(default = "default_max_result_window")]
    pub max_result_window: usize,

    /// Prefix for POSIX asset locations
    #[serde(default)]
    pub posix_download_url: String,

    /// Maximum collections returned by one listing (default: 1000)
    #[serde(default = "default_collections_limit")]
    pub collections_limit: usize,

    /// Maximum entries of an asset file list (default: 10000)
    #[serde(default = "default_asset_filelist_limit")]
    pub asset_filelist_limit: usize,

    /// Stored fields faceted into aggregated collection summaries
    #[serde(default = "default_eo_summary_fields")]
    pub eo_summary_fields: Vec<String>,

    #[serde(default = "default_stac_version")]
    pub stac_version: String,
}

fn default_extensions() -> Vec<Capability> { Capability::ALL.to_vec() }
fn default_limit() -> usize { 10 }
fn default_max_result_window() -> usize { 10_000 }
fn default_collections_limit() -> usize { 1_000 }
fn default_asset_filelist_limit() -> usize { 10_000 }
fn default_stac_version() -> String { "1.0.0".into() }
fn default_eo_summary_fields() -> Vec<String> {
    [
        "misc.platform.Family",
        "misc.platform.Mission",
        "misc.platform.Instrument Mode",
        "misc.product_info.Product Type",
        "misc.product_info.Resolution",
        "misc.orbit_info.Pass Direction",
    ]
    .into_iter()
    .map(String::from)
    .collect()
}

impl Default for StacSearchConfig {
    fn default() -> Self {
        Self {
            catalogs: Vec::new(),
            extensions: default_extensions(),
            default_limit: default_limit(),
            max_result_window: default_max_result_window(),
            posix_download_url: String::new(),
            collections_limit: default_collections_limit(),
            asset_filelist_limit: default_asset_filelist_limit(),
            eo_summary_fields: default_eo_summary_fields(),
            stac_version: default_stac_version(),
        }
    }
}

impl StacSearchConfig {
    /// The immutable capability set for this deployment
    pub fn capabilities(&self) -> Capabilities {
        self.extensions.iter().copied().collect()
    }
}
