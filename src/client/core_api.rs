// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Item search and item reads.

use tracing::debug;

use crate::capabilities::Capability;
use crate::catalog::{Page, RegistryState, ResultPages};
use crate::context::generate_context;
use crate::error::StacError;
use crate::model::Item;
use crate::search::{EntityKind, ModelKind, SearchRequest, CONTEXT_COLLECTION_AGG};

use super::{ItemCollection, RequestContext, StacClient};

impl StacClient {
    /// Cross-collection item search
    pub async fn search(&self, ctx: &RequestContext, request: &SearchRequest) -> Result<ItemCollection, StacError> {
        let mut pages = self.router.search(EntityKind::Item, ctx.catalog(), request)?;
        let collected = pages.collect_all().await?;

        let assets_link = self.enabled(Capability::AssetSearch);
        let features: Vec<Item> = hits(&collected)
            .map(|(page, doc)| Item::from_document(doc, page.model, &self.models).with_links(&ctx.base_url, assets_link))
            .collect();

        let mut context = self.context(request, self.matched(EntityKind::Item, &pages, &collected, ctx, request).await?)?;

        if self.enabled(Capability::ContextCollection) && request.context_collection {
            let collections = if !request.collections.is_empty() {
                request.collections.clone()
            } else if pages.is_fan_out() {
                self.router.context_collections(EntityKind::Item, ctx.catalog(), request).await?
            } else {
                contributing_collections(&pages)
            };
            let limit = self.router.settings().limit(request)? as u64;
            let block = context.get_or_insert_with(|| generate_context(limit, features.len() as u64, request.page));
            block.collections = Some(collections);
        }

        debug!(returned = features.len(), pages = collected.len(), "Item search");
        Ok(ItemCollection {
            kind: "FeatureCollection",
            features,
            links: self.paging_links(ctx, request),
            context,
        })
    }

    /// Items of one collection
    pub async fn item_collection(
        &self,
        ctx: &RequestContext,
        collection_id: &str,
        request: &SearchRequest,
    ) -> Result<ItemCollection, StacError> {
        if self.router.state(EntityKind::Collection) != RegistryState::Unregistered {
            self.get_collection(ctx, collection_id).await?;
        }
        let mut scoped = request.clone();
        scoped.collections = vec![collection_id.to_string()];
        scoped.context_collection = false;
        self.search(ctx, &scoped).await
    }

    /// One item. An item stored under another collection is not found.
    pub async fn get_item(&self, ctx: &RequestContext, collection_id: &str, item_id: &str) -> Result<Item, StacError> {
        let not_found = || StacError::NotFound(format!("Item {} from collection {}", item_id, collection_id));
        let located = self
            .router
            .get(EntityKind::Item, ctx.catalog(), item_id)
            .await
            .map_err(|e| if e.is_not_found() { not_found() } else { e })?;

        let mut item = Item::from_document(&located.document, located.model, &self.models);
        if item.collection.as_deref() != Some(collection_id) {
            return Err(not_found());
        }
        if located.model != ModelKind::EoItem && self.router.state(EntityKind::Asset) != RegistryState::Unregistered {
            item.assets = self.item_assets(ctx, item_id).await?;
        }
        Ok(item.with_links(&ctx.base_url, self.enabled(Capability::AssetSearch)))
    }

    /// Full match count for the context block. A direct search already
    /// has it; a fan-out stops early and needs an exact count.
    pub(super) async fn matched(
        &self,
        entity: EntityKind,
        pages: &ResultPages,
        collected: &[Page],
        ctx: &RequestContext,
        request: &SearchRequest,
    ) -> Result<u64, StacError> {
        if pages.is_fan_out() && self.enabled(Capability::Context) {
            self.router.count(entity, ctx.catalog(), request).await
        } else {
            Ok(collected.iter().map(|p| p.total).sum())
        }
    }
}

pub(super) fn hits(pages: &[Page]) -> impl Iterator<Item = (&Page, &crate::storage::Document)> {
    pages.iter().flat_map(|p| p.hits.iter().map(move |d| (p, d)))
}

/// Collection keys of the merged context aggregation, first-seen order
fn contributing_collections(pages: &ResultPages) -> Vec<String> {
    let mut keys: Vec<String> = Vec::new();
    if let Some(agg) = pages.aggregations().get(CONTEXT_COLLECTION_AGG) {
        for bucket in agg.buckets() {
            if !keys.contains(&bucket.key) {
                keys.push(bucket.key.clone());
            }
        }
    }
    keys
}
