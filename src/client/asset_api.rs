// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Asset search and per-item asset listings.
//!
//! Items hold no list of their assets; every listing here is a search over
//! the asset catalogs filtered on the owning item id.

use std::collections::BTreeMap;

use crate::capabilities::Capability;
use crate::error::StacError;
use crate::model::{Asset, StacAsset};
use crate::search::{EntityKind, SearchRequest};

use super::core_api::hits;
use super::{AssetCollection, RequestContext, StacClient};

/// Role of assets kept out of an item's `assets` map
const HIDDEN_ROLE: &str = "hidden";

/// Role of the files listed by [`StacClient::asset_filelist`]
const DATA_ROLE: &str = "data";

impl StacClient {
    pub async fn asset_search(&self, ctx: &RequestContext, request: &SearchRequest) -> Result<AssetCollection, StacError> {
        self.require(Capability::AssetSearch)?;
        let mut pages = self.router.search(EntityKind::Asset, ctx.catalog(), request)?;
        let collected = pages.collect_all().await?;
        let features = hits(&collected)
            .map(|(_, doc)| Asset::from_document(doc, &self.models).with_links(&ctx.base_url))
            .collect();
        let matched = self
            .matched(EntityKind::Asset, &pages, &collected, ctx, request)
            .await?;
        Ok(AssetCollection {
            kind: "FeatureCollection",
            features,
            links: self.paging_links(ctx, request),
            context: self.context(request, matched)?,
        })
    }

    /// Assets of one item
    pub async fn get_assets(
        &self,
        ctx: &RequestContext,
        collection_id: &str,
        item_id: &str,
    ) -> Result<AssetCollection, StacError> {
        let request = SearchRequest {
            ids: vec![item_id.to_string()],
            limit: Some(self.asset_filelist_limit),
            ..Default::default()
        };
        let mut page = self.asset_search(ctx, &request).await?;
        for asset in &mut page.features {
            if asset.collection.is_none() {
                asset.collection = Some(collection_id.to_string());
                *asset = asset.clone().with_links(&ctx.base_url);
            }
        }
        Ok(page)
    }

    /// One asset. An asset stored under another item is not found.
    pub async fn get_asset(
        &self,
        ctx: &RequestContext,
        collection_id: &str,
        item_id: &str,
        asset_id: &str,
    ) -> Result<Asset, StacError> {
        self.require(Capability::AssetSearch)?;
        let not_found = || StacError::NotFound(format!("Asset {} from Item {}", asset_id, item_id));
        let located = self
            .router
            .get(EntityKind::Asset, ctx.catalog(), asset_id)
            .await
            .map_err(|e| if e.is_not_found() { not_found() } else { e })?;

        let mut asset = Asset::from_document(&located.document, &self.models);
        if asset.item.as_deref() != Some(item_id) {
            return Err(not_found());
        }
        if asset.collection.is_none() {
            asset.collection = Some(collection_id.to_string());
        }
        Ok(asset.with_links(&ctx.base_url))
    }

    /// Data files of one item
    pub async fn asset_filelist(&self, ctx: &RequestContext, item_id: &str) -> Result<Vec<Asset>, StacError> {
        let request = SearchRequest {
            ids: vec![item_id.to_string()],
            role: vec![DATA_ROLE.to_string()],
            limit: Some(self.asset_filelist_limit),
            ..Default::default()
        };
        let mut pages = self.router.search(EntityKind::Asset, ctx.catalog(), &request)?;
        let collected = pages.collect_all().await?;
        Ok(hits(&collected)
            .map(|(_, doc)| Asset::from_document(doc, &self.models))
            .collect())
    }

    /// Visible assets of one item keyed by asset id, for the item's
    /// `assets` map
    pub(super) async fn item_assets(
        &self,
        ctx: &RequestContext,
        item_id: &str,
    ) -> Result<BTreeMap<String, StacAsset>, StacError> {
        let request = SearchRequest {
            ids: vec![item_id.to_string()],
            limit: Some(self.asset_filelist_limit),
            ..Default::default()
        };
        let mut pages = self.router.search(EntityKind::Asset, ctx.catalog(), &request)?;
        let collected = pages.collect_all().await?;
        Ok(hits(&collected)
            .map(|(_, doc)| Asset::from_document(doc, &self.models))
            .filter(|asset| !asset.roles.iter().any(|r| r == HIDDEN_ROLE))
            .map(|asset| {
                let entry = asset.to_stac_asset();
                (asset.asset_id, entry)
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capabilities::Capabilities;
    use crate::catalog::{CatalogRegistry, SearchSettings};
    use crate::model::ModelSettings;
    use crate::search::ModelKind;
    use crate::storage::{InMemoryBackend, SearchBackend};
    use serde_json::json;
    use std::sync::Arc;

    async fn client(caps: Capabilities) -> StacClient {
        let backend = Arc::new(InMemoryBackend::new());
        backend
            .put("items", "i1", json!({"type": "item", "item_id": "i1", "collection_id": "c1",
                "properties": {"datetime": "2020-01-01T00:00:00Z"}}))
            .await
            .unwrap();
        let assets = [
            ("f1", "i1", "data", "POSIX"),
            ("f2", "i1", "metadata", "application/xml"),
            ("f3", "i1", "hidden", "POSIX"),
            ("g1", "i2", "data", "POSIX"),
        ];
        for (id, item, role, media) in assets {
            backend
                .put("assets", id, json!({
                    "asset_id": id,
                    "item_id": item,
                    "media_type": media,
                    "location": format!("/archive/{}.nc", id),
                    "filename": format!("{}.nc", id),
                    "properties": {"categories": [role], "href": format!("https://cdn.example/{}", id)}
                }))
                .await
                .unwrap();
        }
        let mut registry = CatalogRegistry::new();
        registry.register(EntityKind::Item, "main", "items", ModelKind::Item).unwrap();
        registry.register(EntityKind::Asset, "main", "assets", ModelKind::Asset).unwrap();
        let models = ModelSettings {
            posix_download_url: "https://files.example".into(),
            ..Default::default()
        };
        StacClient::from_parts(registry, backend, SearchSettings::new(caps), models)
    }

    fn ctx() -> RequestContext {
        RequestContext::new("https://api.example".parse().unwrap())
    }

    #[tokio::test]
    async fn test_asset_search_by_role() {
        let client = client(Capabilities::all()).await;
        let req = SearchRequest {
            role: vec!["data".into()],
            ..Default::default()
        };
        let page = client.asset_search(&ctx(), &req).await.unwrap();
        let ids: Vec<&str> = page.features.iter().map(|a| a.asset_id.as_str()).collect();
        assert_eq!(ids, vec!["f1", "g1"]);
        assert_eq!(page.context.unwrap().matched, 2);
    }

    #[tokio::test]
    async fn test_get_assets_fills_collection() {
        let client = client(Capabilities::all()).await;
        let page = client.get_assets(&ctx(), "c1", "i1").await.unwrap();
        assert_eq!(page.features.len(), 3);
        assert!(page.features.iter().all(|a| a.collection.as_deref() == Some("c1")));
        assert_eq!(
            page.features[0].links[0].href,
            "https://api.example/collections/c1/items/i1/assets/f1"
        );
    }

    #[tokio::test]
    async fn test_get_asset_checks_item() {
        let client = client(Capabilities::all()).await;
        let asset = client.get_asset(&ctx(), "c1", "i1", "f1").await.unwrap();
        assert_eq!(asset.href, "https://files.example/archive/f1.nc");

        let err = client.get_asset(&ctx(), "c1", "i1", "g1").await.unwrap_err();
        assert_eq!(err.to_string(), "Asset g1 from Item i1 not found");
        assert!(client.get_asset(&ctx(), "c1", "i1", "nope").await.unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn test_filelist_lists_data_files() {
        let client = client(Capabilities::none()).await;
        let files = client.asset_filelist(&ctx(), "i1").await.unwrap();
        assert_eq!(files.len(), 1);
        assert_eq!(files[0].filename.as_deref(), Some("f1.nc"));
    }

    #[tokio::test]
    async fn test_item_assets_skip_hidden() {
        let client = client(Capabilities::all()).await;
        let item = client.get_item(&ctx(), "c1", "i1").await.unwrap();
        let keys: Vec<&str> = item.assets.keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["f1", "f2"]);
        assert_eq!(item.assets["f2"].href, "https://cdn.example/f2");
        assert_eq!(item.assets["f2"].media_type.as_deref(), Some("application/xml"));
        assert_eq!(item.assets["f1"].media_type, None);
    }

    #[tokio::test]
    async fn test_asset_search_disabled() {
        let client = client(Capabilities::none()).await;
        let err = client.asset_search(&ctx(), &SearchRequest::new()).await.unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::InvalidArgument);
    }
}
