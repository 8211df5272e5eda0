use async_trait::async_trait;
use dashmap::DashMap;
use serde_json::Value;

use super::eval;
use super::traits::{BackendError, Document, SearchBackend, SearchResponse};
use crate::search::{Query, SearchBody};

/// Reference [`SearchBackend`] holding documents in memory.
///
/// Indices are created on first write and keep insertion order, which is the
/// hit order when a search carries no sort.
pub struct InMemoryBackend {
    indices: DashMap<String, Vec<Document>>,
}

impl InMemoryBackend {
    #[must_use]
    pub fn new() -> Self {
        Self {
            indices: DashMap::new(),
        }
    }

    /// Number of documents in one index
    #[must_use]
    pub fn len(&self, index: &str) -> usize {
        self.indices.get(index).map(|docs| docs.len()).unwrap_or(0)
    }

    /// Check if every index is empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.indices.iter().all(|entry| entry.value().is_empty())
    }

    /// Drop all indices
    pub fn clear(&self) {
        self.indices.clear();
    }

    fn matching(&self, index: &str, query: &Query) -> Vec<Document> {
        self.indices
            .get(index)
            .map(|docs| {
                docs.iter()
                    .filter(|d| eval::matches(&query.root, d))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default()
    }
}

impl Default for InMemoryBackend {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SearchBackend for InMemoryBackend {
    async fn search(&self, index: &str, body: &SearchBody) -> Result<SearchResponse, BackendError> {
        let mut hits = self.matching(index, &body.query);
        let total = hits.len() as u64;

        let refs: Vec<&Document> = hits.iter().collect();
        let aggregations = eval::aggregate(&body.aggs, &refs);

        eval::sort_documents(&mut hits, &body.sort);
        let from = body.from.unwrap_or(0);
        let size = body.size.unwrap_or(10);
        let mut hits: Vec<Document> = hits.into_iter().skip(from).take(size).collect();

        if let Some(filter) = body.source.as_ref().filter(|f| !f.is_empty()) {
            for hit in &mut hits {
                hit.source = eval::project(&hit.source, filter);
            }
        }

        Ok(SearchResponse {
            hits,
            total,
            aggregations,
        })
    }

    async fn count(&self, index: &str, body: &SearchBody) -> Result<u64, BackendError> {
        Ok(self.matching(index, &body.query).len() as u64)
    }

    async fn get(&self, index: &str, id: &str) -> Result<Document, BackendError> {
        self.indices
            .get(index)
            .and_then(|docs| docs.iter().find(|d| d.id == id).cloned())
            .ok_or_else(|| BackendError::not_found(index, id))
    }

    async fn create(&self, index: &str, id: &str, source: Value) -> Result<(), BackendError> {
        let mut docs = self.indices.entry(index.to_string()).or_default();
        if docs.iter().any(|d| d.id == id) {
            return Err(BackendError::Conflict {
                index: index.to_string(),
                id: id.to_string(),
            });
        }
        docs.push(Document::new(id, index, source));
        Ok(())
    }

    async fn put(&self, index: &str, id: &str, source: Value) -> Result<(), BackendError> {
        let mut docs = self.indices.entry(index.to_string()).or_default();
        match docs.iter_mut().find(|d| d.id == id) {
            Some(existing) => existing.source = source,
            None => docs.push(Document::new(id, index, source)),
        }
        Ok(())
    }

    async fn delete(&self, index: &str, id: &str) -> Result<(), BackendError> {
        let mut docs = self
            .indices
            .get_mut(index)
            .ok_or_else(|| BackendError::not_found(index, id))?;
        let before = docs.len();
        docs.retain(|d| d.id != id);
        if docs.len() == before {
            return Err(BackendError::not_found(index, id));
        }
        Ok(())
    }

    async fn delete_by_query(&self, index: &str, query: &Query) -> Result<u64, BackendError> {
        let Some(mut docs) = self.indices.get_mut(index) else {
            return Ok(0);
        };
        let before = docs.len();
        docs.retain(|d| !eval::matches(&query.root, d));
        Ok((before - docs.len()) as u64)
    }
}
