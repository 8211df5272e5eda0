// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Create / update / delete of collections and items.
//!
//! Writes go to the request's catalog, or the first registered catalog of
//! the entity. Deleting a collection cascades:
//!
//! ```text
//! repeat { first ID_SCAN_PAGE items → delete their assets → delete those items } → delete the collection
//! ```
//!
//! Every batch is read from offset 0, so the scan never runs past the
//! backend's result window.

use serde_json::Value;
use tracing::{debug, info};

use crate::capabilities::Capability;
use crate::catalog::{CatalogEntry, RegistryState};
use crate::error::StacError;
use crate::metrics;
use crate::model::{Collection, Item};
use crate::search::{EntityKind, ModelKind, Query, SearchBody};
use crate::storage::BackendError;

use super::{RequestContext, StacClient};

/// Items removed per cascade batch
const ID_SCAN_PAGE: usize = 1000;

impl StacClient {
    /// Store a new item under an existing collection
    pub async fn create_item(&self, ctx: &RequestContext, collection_id: &str, stac: Value) -> Result<Item, StacError> {
        let result = self.write_item(ctx, collection_id, stac, false).await;
        recorded(EntityKind::Item, "create", result)
    }

    /// Replace an existing item
    pub async fn update_item(&self, ctx: &RequestContext, collection_id: &str, stac: Value) -> Result<Item, StacError> {
        let result = self.write_item(ctx, collection_id, stac, true).await;
        recorded(EntityKind::Item, "update", result)
    }

    /// Delete an item and the assets that reference it
    pub async fn delete_item(&self, ctx: &RequestContext, collection_id: &str, item_id: &str) -> Result<(), StacError> {
        let result: Result<(), StacError> = async {
            self.require(Capability::Transactions)?;
            let target = self.item_target(ctx)?;
            self.stored_item(target, collection_id, item_id).await?;

            let backend = self.router.backend();
            backend.delete(&target.index, item_id).await?;
            let assets = self
                .delete_assets(ctx, Query::term("item_id", item_id))
                .await?;
            info!(item = %item_id, collection = %collection_id, assets, "Deleted item");
            Ok(())
        }
        .await;
        recorded(EntityKind::Item, "delete", result)
    }

    pub async fn create_collection(&self, ctx: &RequestContext, stac: Value) -> Result<Collection, StacError> {
        let result: Result<Collection, StacError> = async {
            self.require(Capability::Transactions)?;
            let collection = Collection::from_stac(stac)?;
            let target = self.collection_target(ctx)?;
            self.router
                .backend()
                .create(&target.index, &collection.id, collection.to_source()?)
                .await
                .map_err(|e| conflict(e, "Collection", &collection.id))?;
            info!(collection = %collection.id, catalog = %target.name, "Created collection");
            Ok(collection.with_links(&ctx.base_url, self.enabled(Capability::Filter)))
        }
        .await;
        recorded(EntityKind::Collection, "create", result)
    }

    pub async fn update_collection(&self, ctx: &RequestContext, stac: Value) -> Result<Collection, StacError> {
        let result: Result<Collection, StacError> = async {
            self.require(Capability::Transactions)?;
            let collection = Collection::from_stac(stac)?;
            let target = self.collection_target(ctx)?;
            let backend = self.router.backend();
            backend
                .get(&target.index, &collection.id)
                .await
                .map_err(|e| not_found(e, format!("Collection {}", collection.id)))?;
            backend.put(&target.index, &collection.id, collection.to_source()?).await?;
            info!(collection = %collection.id, catalog = %target.name, "Updated collection");
            Ok(collection.with_links(&ctx.base_url, self.enabled(Capability::Filter)))
        }
        .await;
        recorded(EntityKind::Collection, "update", result)
    }

    /// Delete a collection with its items and their assets
    pub async fn delete_collection(&self, ctx: &RequestContext, collection_id: &str) -> Result<(), StacError> {
        let result: Result<(), StacError> = async {
            self.require(Capability::Transactions)?;
            let target = self.collection_target(ctx)?;
            let backend = self.router.backend();
            backend
                .get(&target.index, collection_id)
                .await
                .map_err(|e| not_found(e, format!("Collection {}", collection_id)))?;

            let mut items = 0;
            let mut assets = 0;
            if self.router.state(EntityKind::Item) != RegistryState::Unregistered {
                let item_target = self.item_target(ctx)?;
                let owned = Query::term("collection_id", collection_id);
                loop {
                    let batch = self.item_batch(&item_target.index, &owned).await?;
                    if batch.is_empty() {
                        break;
                    }
                    let (doc_ids, item_ids): (Vec<String>, Vec<Value>) =
                        batch.into_iter().map(|(doc, item)| (doc, Value::String(item))).unzip();
                    assets += self.delete_assets(ctx, Query::terms("item_id", item_ids)).await?;
                    let deleted = backend
                        .delete_by_query(&item_target.index, &owned.clone().and(Query::ids(doc_ids)))
                        .await?;
                    if deleted == 0 {
                        return Err(StacError::Backend(BackendError::Backend(format!(
                            "cascade delete of collection {} made no progress",
                            collection_id
                        ))));
                    }
                    items += deleted;
                    debug!(collection = %collection_id, deleted, "Deleted item batch");
                }
            }
            backend.delete(&target.index, collection_id).await?;
            info!(collection = %collection_id, items, assets, "Deleted collection");
            Ok(())
        }
        .await;
        recorded(EntityKind::Collection, "delete", result)
    }

    async fn write_item(
        &self,
        ctx: &RequestContext,
        collection_id: &str,
        stac: Value,
        replace: bool,
    ) -> Result<Item, StacError> {
        self.require(Capability::Transactions)?;
        let mut item = Item::from_stac(stac)?;
        if let Some(body_collection) = item.collection.as_deref() {
            if body_collection != collection_id {
                return Err(StacError::invalid(format!(
                    "item collection '{}' does not match '{}'",
                    body_collection, collection_id
                )));
            }
        }
        self.get_collection(ctx, collection_id).await?;

        let target = self.item_target(ctx)?;
        let backend = self.router.backend();
        let source = item.to_source(collection_id)?;
        if replace {
            self.stored_item(target, collection_id, &item.id).await?;
            backend.put(&target.index, &item.id, source).await?;
            info!(item = %item.id, collection = %collection_id, "Updated item");
        } else {
            backend
                .create(&target.index, &item.id, source)
                .await
                .map_err(|e| conflict(e, "Item", &item.id))?;
            info!(item = %item.id, collection = %collection_id, "Created item");
        }
        item.collection = Some(collection_id.to_string());
        Ok(item.with_links(&ctx.base_url, self.enabled(Capability::AssetSearch)))
    }

    /// The stored item, which must belong to `collection_id`
    async fn stored_item(&self, target: &CatalogEntry, collection_id: &str, item_id: &str) -> Result<Value, StacError> {
        let missing = || format!("Item {} from collection {}", item_id, collection_id);
        let doc = self
            .router
            .backend()
            .get(&target.index, item_id)
            .await
            .map_err(|e| not_found(e, missing()))?;
        if doc.source.get("collection_id").and_then(Value::as_str) != Some(collection_id) {
            return Err(StacError::NotFound(missing()));
        }
        Ok(doc.source)
    }

    /// First `ID_SCAN_PAGE` items matching `query`, as `(document id, item id)`
    async fn item_batch(&self, index: &str, query: &Query) -> Result<Vec<(String, String)>, StacError> {
        let body = SearchBody::new(query.clone()).with_window(None, Some(ID_SCAN_PAGE));
        let response = self.router.backend().search(index, &body).await?;
        Ok(response
            .hits
            .into_iter()
            .map(|doc| {
                let item_id = doc
                    .source
                    .get("item_id")
                    .and_then(Value::as_str)
                    .map(String::from)
                    .unwrap_or_else(|| doc.id.clone());
                (doc.id, item_id)
            })
            .collect())
    }

    async fn delete_assets(&self, ctx: &RequestContext, query: Query) -> Result<u64, StacError> {
        if self.router.state(EntityKind::Asset) == RegistryState::Unregistered {
            return Ok(0);
        }
        let target = self.router.write_target(EntityKind::Asset, ctx.catalog())?;
        Ok(self.router.backend().delete_by_query(&target.index, &query).await?)
    }

    fn item_target(&self, ctx: &RequestContext) -> Result<&CatalogEntry, StacError> {
        writable(self.router.write_target(EntityKind::Item, ctx.catalog())?, ModelKind::Item)
    }

    fn collection_target(&self, ctx: &RequestContext) -> Result<&CatalogEntry, StacError> {
        writable(self.router.write_target(EntityKind::Collection, ctx.catalog())?, ModelKind::Collection)
    }
}

/// Only plain stored models accept writes
fn writable(entry: &CatalogEntry, model: ModelKind) -> Result<&CatalogEntry, StacError> {
    if entry.model == model {
        Ok(entry)
    } else {
        Err(StacError::invalid(format!("catalog '{}' is read-only", entry.name)))
    }
}

fn conflict(err: BackendError, entity: &str, id: &str) -> StacError {
    match err {
        BackendError::Conflict { .. } => StacError::Conflict(format!("{} {}", entity, id)),
        other => other.into(),
    }
}

fn not_found(err: BackendError, what: String) -> StacError {
    if err.is_not_found() {
        StacError::NotFound(what)
    } else {
        err.into()
    }
}

fn recorded<T>(entity: EntityKind, operation: &str, result: Result<T, StacError>) -> Result<T, StacError> {
    metrics::record_transaction(&entity.to_string(), operation, result.is_ok());
    result
}
