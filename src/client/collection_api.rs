// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Collection listing, search and queryables.

use serde_json::Value;

use crate::capabilities::Capability;
use crate::context::Link;
use crate::error::StacError;
use crate::model::{queryables, Collection};
use crate::search::{EntityKind, SearchRequest};

use super::core_api::hits;
use super::{CollectionList, RequestContext, StacClient};

impl StacClient {
    /// Every collection, up to the configured listing limit
    pub async fn all_collections(&self, ctx: &RequestContext) -> Result<CollectionList, StacError> {
        let request = SearchRequest {
            limit: Some(self.collections_limit),
            ..Default::default()
        };
        let mut list = self.list_collections(ctx, &request).await?;
        let root = ctx.base_url.as_str().trim_end_matches('/');
        list.links = vec![
            Link::new("root", root, "application/json"),
            Link::new("self", format!("{}/collections", root), "application/json"),
        ];
        list.context = None;
        Ok(list)
    }

    pub async fn get_collection(&self, ctx: &RequestContext, collection_id: &str) -> Result<Collection, StacError> {
        let located = self
            .router
            .get(EntityKind::Collection, ctx.catalog(), collection_id)
            .await
            .map_err(|e| {
                if e.is_not_found() {
                    StacError::NotFound(format!("Collection {}", collection_id))
                } else {
                    e
                }
            })?;
        Ok(Collection::from_document(&located.document, &self.models)
            .with_links(&ctx.base_url, self.enabled(Capability::Filter)))
    }

    /// Collections matching bbox / datetime / ids / free text / filter
    pub async fn collection_search(&self, ctx: &RequestContext, request: &SearchRequest) -> Result<CollectionList, StacError> {
        self.require(Capability::CollectionSearch)?;
        let mut list = self.list_collections(ctx, request).await?;
        list.links = self.paging_links(ctx, request);
        Ok(list)
    }

    /// JSON schema of a collection's filterable properties
    pub async fn queryables(&self, ctx: &RequestContext, collection_id: &str) -> Result<Value, StacError> {
        self.require(Capability::Filter)?;
        let collection = self.get_collection(ctx, collection_id).await?;
        Ok(queryables(&collection, &ctx.base_url))
    }

    async fn list_collections(&self, ctx: &RequestContext, request: &SearchRequest) -> Result<CollectionList, StacError> {
        let mut pages = self.router.search(EntityKind::Collection, ctx.catalog(), request)?;
        let collected = pages.collect_all().await?;
        let queryables_link = self.enabled(Capability::Filter);
        let collections = hits(&collected)
            .map(|(_, doc)| Collection::from_document(doc, &self.models).with_links(&ctx.base_url, queryables_link))
            .collect();
        let matched = self
            .matched(EntityKind::Collection, &pages, &collected, ctx, request)
            .await?;
        Ok(CollectionList {
            collections,
            links: Vec::new(),
            context: self.context(request, matched)?,
        })
    }
}
