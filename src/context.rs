// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Result context and pagination links.

use serde::{Deserialize, Serialize};
use url::Url;

/// How a page relates to the full match count
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResultContext {
    pub returned: u64,
    pub limit: u64,
    pub matched: u64,
    /// Collections that contributed results, when requested
    #[serde(skip_serializing_if = "Option::is_none")]
    pub collections: Option<Vec<String>>,
}

/// Context for page `page` (1 when absent) of `limit` hits out of `matched`.
///
/// `returned` is what the page actually holds: a full page, the tail of a
/// partial last page, or 0 past the end.
pub fn generate_context(limit: u64, matched: u64, page: Option<u32>) -> ResultContext {
    let page = u64::from(page.unwrap_or(1).max(1));
    let before = (page - 1).saturating_mul(limit);
    ResultContext {
        returned: matched.saturating_sub(before).min(limit),
        limit,
        matched,
        collections: None,
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Link {
    pub rel: String,
    pub href: String,
    #[serde(rename = "type")]
    pub media_type: String,
}

impl Link {
    pub fn new(rel: impl Into<String>, href: impl Into<String>, media_type: impl Into<String>) -> Self {
        Self {
            rel: rel.into(),
            href: href.into(),
            media_type: media_type.into(),
        }
    }

    fn geojson(rel: &str, href: Url) -> Self {
        Self::new(rel, href, "application/geo+json")
    }
}

/// `self`, `next` and (past the first page) `previous` links for `url`.
///
/// Any `page` parameter already on `url` is replaced; other parameters are
/// kept in order. `next` is offered unless `page` is the last representable one.
pub fn pagination_links(url: &Url, page: Option<u32>) -> Vec<Link> {
    let page = page.unwrap_or(1).max(1);
    let kept: Vec<(String, String)> = url
        .query_pairs()
        .filter(|(k, _)| k != "page")
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect();

    let at = |p: u32| {
        let mut href = url.clone();
        href.set_query(None);
        href.query_pairs_mut()
            .extend_pairs(kept.iter().map(|(k, v)| (k.as_str(), v.as_str())))
            .append_pair("page", &p.to_string());
        href
    };

    let mut links = vec![Link::geojson("self", at(page))];
    if let Some(next) = page.checked_add(1) {
        links.push(Link::geojson("next", at(next)));
    }
    if page > 1 {
        links.push(Link::geojson("previous", at(page - 1)));
    }
    links
}
