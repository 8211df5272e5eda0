// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Lazy, finite sequence of result pages.
//!
//! A direct search makes one call. A fan-out walks the sources in
//! registration order, counting each before searching it, and stops as
//! soon as the requested window is filled. Sources after that point are
//! never contacted.
//!
//! ```text
//! offset 7, limit 5 over A(3) B(10) C(?)
//!
//!   A: count 3  → entirely before offset, skip 3 (remaining offset 4)
//!   B: count 10 → search from 4 size 5      → window filled
//!   C: not contacted
//! ```

use std::collections::{BTreeMap, VecDeque};
use std::sync::Arc;

use tracing::debug;

use crate::error::StacError;
use crate::metrics;
use crate::search::{EntityKind, ModelKind, SearchRequest};
use crate::storage::{AggregationResult, Bucket, Document};

use super::searchable::{Searchable, Window};

/// Hits from one source
#[derive(Debug, Clone)]
pub struct Page {
    pub catalog: String,
    pub model: ModelKind,
    pub hits: Vec<Document>,
    /// Matches in this source, independent of the window
    pub total: u64,
}

/// A named source, as handed out by the router
#[derive(Clone)]
pub(crate) struct NamedSource {
    pub name: String,
    pub source: Arc<dyn Searchable>,
}

enum Mode {
    Direct(Window),
    FanOut { skip: usize, remaining: usize },
}

/// Pages of one search; not restartable.
pub struct ResultPages {
    entity: EntityKind,
    request: SearchRequest,
    sources: VecDeque<NamedSource>,
    mode: Mode,
    visited: usize,
    returned: usize,
    aggregations: BTreeMap<String, AggregationResult>,
}

impl ResultPages {
    pub(crate) fn direct(entity: EntityKind, request: SearchRequest, source: NamedSource, window: Window) -> Self {
        Self::with_mode(entity, request, VecDeque::from([source]), Mode::Direct(window))
    }

    pub(crate) fn fan_out(entity: EntityKind, request: SearchRequest, sources: Vec<NamedSource>, window: Window) -> Self {
        Self::with_mode(
            entity,
            request,
            sources.into(),
            Mode::FanOut {
                skip: window.from,
                remaining: window.size,
            },
        )
    }

    pub(crate) fn empty(entity: EntityKind) -> Self {
        Self::with_mode(entity, SearchRequest::default(), VecDeque::new(), Mode::Direct(Window { from: 0, size: 0 }))
    }

    fn with_mode(entity: EntityKind, request: SearchRequest, sources: VecDeque<NamedSource>, mode: Mode) -> Self {
        Self {
            entity,
            request,
            sources,
            mode,
            visited: 0,
            returned: 0,
            aggregations: BTreeMap::new(),
        }
    }

    /// The next page, or `None` once the window is filled or the sources
    /// are exhausted.
    pub async fn next_page(&mut self) -> Result<Option<Page>, StacError> {
        let page = match self.mode {
            Mode::Direct(window) => match self.sources.pop_front() {
                Some(named) => Some(self.fetch(named, window).await?),
                None => None,
            },
            Mode::FanOut { .. } => self.next_fan_out().await?,
        };

        match &page {
            Some(p) => self.returned += p.hits.len(),
            None => self.finish(),
        }
        Ok(page)
    }

    async fn next_fan_out(&mut self) -> Result<Option<Page>, StacError> {
        loop {
            let Mode::FanOut { skip, remaining } = self.mode else {
                return Ok(None);
            };
            if remaining == 0 {
                self.sources.clear();
                return Ok(None);
            }
            let Some(named) = self.sources.pop_front() else {
                return Ok(None);
            };

            let count = usize::try_from(named.source.count(&self.request).await?).unwrap_or(usize::MAX);
            self.visited += 1;
            if skip >= count {
                debug!(catalog = %named.name, count, skip, "Source before requested window");
                self.mode = Mode::FanOut {
                    skip: skip - count,
                    remaining,
                };
                continue;
            }

            let size = remaining.min(count - skip);
            self.mode = Mode::FanOut {
                skip: 0,
                remaining: remaining - size,
            };
            let page = self.fetch_counted(named, Window { from: skip, size }).await?;
            return Ok(Some(page));
        }
    }

    async fn fetch(&mut self, named: NamedSource, window: Window) -> Result<Page, StacError> {
        self.visited += 1;
        self.fetch_counted(named, window).await
    }

    async fn fetch_counted(&mut self, named: NamedSource, window: Window) -> Result<Page, StacError> {
        let response = named.source.search(&self.request, window).await?;
        merge_aggregations(&mut self.aggregations, response.aggregations);
        Ok(Page {
            catalog: named.name,
            model: named.source.model(),
            hits: response.hits,
            total: response.total,
        })
    }

    fn finish(&mut self) {
        let entity = self.entity.to_string();
        metrics::record_fanout_catalogs(&entity, self.visited);
        metrics::record_results_returned(&entity, self.returned);
    }

    /// Drain every remaining page
    pub async fn collect_all(&mut self) -> Result<Vec<Page>, StacError> {
        let mut pages = Vec::new();
        while let Some(page) = self.next_page().await? {
            pages.push(page);
        }
        Ok(pages)
    }

    /// Aggregations merged over the pages fetched so far
    pub fn aggregations(&self) -> &BTreeMap<String, AggregationResult> {
        &self.aggregations
    }

    /// Sources contacted so far
    pub fn visited(&self) -> usize {
        self.visited
    }

    /// True when page totals are per source rather than the full match count
    pub fn is_fan_out(&self) -> bool {
        matches!(self.mode, Mode::FanOut { .. })
    }
}

/// Buckets concatenate with counts summed per key, first-seen order kept.
/// Metrics keep the first value.
fn merge_aggregations(into: &mut BTreeMap<String, AggregationResult>, from: BTreeMap<String, AggregationResult>) {
    for (name, agg) in from {
        match (into.get_mut(&name), agg) {
            (None, agg) => {
                into.insert(name, agg);
            }
            (Some(AggregationResult::Buckets(existing)), AggregationResult::Buckets(incoming)) => {
                merge_buckets(existing, incoming);
            }
            _ => {}
        }
    }
}

fn merge_buckets(existing: &mut Vec<Bucket>, incoming: Vec<Bucket>) {
    for bucket in incoming {
        match existing.iter_mut().find(|b| b.key == bucket.key) {
            Some(b) => b.doc_count += bucket.doc_count,
            None => existing.push(bucket),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capabilities::Capabilities;
    use crate::catalog::searchable::{IndexSearchable, SearchSettings};
    use crate::storage::{InMemoryBackend, SearchBackend};
    use serde_json::json;

    async fn source(backend: &Arc<InMemoryBackend>, index: &str, n: usize) -> NamedSource {
        for i in 0..n {
            backend
                .put(index, &format!("{}-{}", index, i), json!({"type": "item", "collection_id": index}))
                .await
                .unwrap();
        }
        let settings = SearchSettings::new(Capabilities::all());
        NamedSource {
            name: index.to_string(),
            source: Arc::new(IndexSearchable::new(backend.clone(), index, ModelKind::Item, settings)),
        }
    }

    #[tokio::test]
    async fn test_fan_out_spans_sources() {
        let backend = Arc::new(InMemoryBackend::new());
        let sources = vec![source(&backend, "a", 3).await, source(&backend, "b", 10).await];
        let mut pages = ResultPages::fan_out(EntityKind::Item, SearchRequest::new(), sources, Window { from: 1, size: 5 });

        let all = pages.collect_all().await.unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].hits.len(), 2);
        assert_eq!(all[0].catalog, "a");
        assert_eq!(all[1].hits.len(), 3);
        assert_eq!(all[1].hits[0].id, "b-0");
        assert_eq!(pages.visited(), 2);
        // exhausted
        assert!(pages.next_page().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_fan_out_skips_sources_before_offset() {
        let backend = Arc::new(InMemoryBackend::new());
        let sources = vec![
            source(&backend, "a", 3).await,
            source(&backend, "b", 10).await,
            source(&backend, "c", 4).await,
        ];
        let mut pages = ResultPages::fan_out(EntityKind::Item, SearchRequest::new(), sources, Window { from: 5, size: 5 });
        let all = pages.collect_all().await.unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].catalog, "b");
        let ids: Vec<&str> = all[0].hits.iter().map(|d| d.id.as_str()).collect();
        assert_eq!(ids, vec!["b-2", "b-3", "b-4", "b-5", "b-6"]);
        // c never contacted
        assert_eq!(pages.visited(), 2);
    }

    #[tokio::test]
    async fn test_direct_single_call() {
        let backend = Arc::new(InMemoryBackend::new());
        let named = source(&backend, "a", 3).await;
        let mut pages = ResultPages::direct(EntityKind::Item, SearchRequest::new(), named, Window { from: 0, size: 10 });
        let page = pages.next_page().await.unwrap().unwrap();
        assert_eq!(page.hits.len(), 3);
        assert_eq!(page.total, 3);
        assert!(pages.next_page().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_empty_yields_nothing() {
        let mut pages = ResultPages::empty(EntityKind::Collection);
        assert!(pages.collect_all().await.unwrap().is_empty());
    }

    #[test]
    fn test_merge_buckets_sums_counts() {
        let bucket = |key: &str, n| Bucket {
            key: key.into(),
            doc_count: n,
            aggregations: BTreeMap::new(),
        };
        let mut into = BTreeMap::from([("c".to_string(), AggregationResult::Buckets(vec![bucket("x", 2), bucket("y", 1)]))]);
        merge_aggregations(
            &mut into,
            BTreeMap::from([("c".to_string(), AggregationResult::Buckets(vec![bucket("y", 4), bucket("z", 1)]))]),
        );
        let keys: Vec<(&str, u64)> = into["c"].buckets().iter().map(|b| (b.key.as_str(), b.doc_count)).collect();
        assert_eq!(keys, vec![("x", 2), ("y", 5), ("z", 1)]);
    }
}
