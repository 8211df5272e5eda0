// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Request-level operations.
//!
//! [`StacClient`] ties the pieces together for each API call:
//!
//! ```text
//! SearchRequest ─→ CatalogRouter ─→ ResultPages ─→ model adapters ─→ response
//!                      │                                  │
//!                      └─ count (context) ────────────────┴─→ ResultContext + links
//! ```
//!
//! # Example
//!
//! ```rust
//! use std::sync::Arc;
//! use stac_search::client::{RequestContext, StacClient};
//! use stac_search::search::SearchRequest;
//! use stac_search::storage::InMemoryBackend;
//! use stac_search::StacSearchConfig;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let config: StacSearchConfig = serde_json::from_value(serde_json::json!({
//!     "catalogs": [{"name": "main", "item": {"index": "items"}, "collection": {"index": "collections"}}]
//! }))
//! .unwrap();
//! let client = StacClient::new(&config, Arc::new(InMemoryBackend::new())).unwrap();
//!
//! let ctx = RequestContext::new("https://api.example/stac".parse().unwrap());
//! let page = client.search(&ctx, &SearchRequest::new()).await.unwrap();
//! assert!(page.features.is_empty());
//! # }
//! ```

mod asset_api;
mod collection_api;
mod core_api;
mod transactions;
mod types;

pub use types::{AssetCollection, CollectionList, ItemCollection, RequestContext};

use std::sync::Arc;

use crate::capabilities::{Capabilities, Capability};
use crate::catalog::{CatalogRegistry, CatalogRouter, SearchSettings};
use crate::config::StacSearchConfig;
use crate::context::{generate_context, pagination_links, Link, ResultContext};
use crate::error::StacError;
use crate::model::ModelSettings;
use crate::search::SearchRequest;
use crate::storage::SearchBackend;

/// Entry point for every read and write the API serves.
pub struct StacClient {
    router: CatalogRouter,
    capabilities: Arc<Capabilities>,
    models: ModelSettings,
    collections_limit: usize,
    asset_filelist_limit: usize,
}

impl StacClient {
    /// Register the configured catalogs over `backend`
    pub fn new(config: &StacSearchConfig, backend: Arc<dyn SearchBackend>) -> Result<Self, StacError> {
        let registry = CatalogRegistry::from_config(&config.catalogs)?;
        let settings = SearchSettings {
            capabilities: Arc::new(config.capabilities()),
            max_result_window: config.max_result_window,
            default_limit: config.default_limit,
            collections_limit: config.collections_limit,
            summary_fields: config.eo_summary_fields.clone(),
        };
        let mut client = Self::from_parts(registry, backend, settings, ModelSettings::from_config(config));
        client.asset_filelist_limit = config.asset_filelist_limit;
        Ok(client)
    }

    pub fn from_parts(
        registry: CatalogRegistry,
        backend: Arc<dyn SearchBackend>,
        settings: SearchSettings,
        models: ModelSettings,
    ) -> Self {
        let capabilities = settings.capabilities.clone();
        let collections_limit = settings.collections_limit;
        let asset_filelist_limit = settings.max_result_window;
        Self {
            router: CatalogRouter::new(registry, backend, settings),
            capabilities,
            models,
            collections_limit,
            asset_filelist_limit,
        }
    }

    pub fn router(&self) -> &CatalogRouter {
        &self.router
    }

    pub fn capabilities(&self) -> &Capabilities {
        &self.capabilities
    }

    fn enabled(&self, capability: Capability) -> bool {
        self.capabilities.contains(capability)
    }

    fn require(&self, capability: Capability) -> Result<(), StacError> {
        if self.enabled(capability) {
            Ok(())
        } else {
            Err(StacError::invalid(format!("the '{}' extension is not enabled", capability)))
        }
    }

    /// Context block when the context capability is on
    fn context(&self, request: &SearchRequest, matched: u64) -> Result<Option<ResultContext>, StacError> {
        if !self.enabled(Capability::Context) {
            return Ok(None);
        }
        let limit = self.router.settings().limit(request)? as u64;
        Ok(Some(generate_context(limit, matched, request.page)))
    }

    fn paging_links(&self, ctx: &RequestContext, request: &SearchRequest) -> Vec<Link> {
        if self.enabled(Capability::Pagination) {
            pagination_links(&ctx.url, request.page)
        } else {
            Vec::new()
        }
    }
}
