//! Optional API behaviours ("extensions") enabled for a deployment.

use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};

/// One optional behaviour.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Capability {
    /// `{returned, limit, matched}` result context
    Context,
    /// CQL filter expressions and queryables
    Filter,
    /// Free-text `q` search
    FreeText,
    /// Field include/exclude projection
    Fields,
    Sort,
    /// Per-collection grouping of search results
    ContextCollection,
    /// Page-numbered paging links
    Pagination,
    AssetSearch,
    CollectionSearch,
    Transactions,
}

impl Capability {
    pub const ALL: [Capability; 10] = [
        Self::Context,
        Self::Filter,
        Self::FreeText,
        Self::Fields,
        Self::Sort,
        Self::ContextCollection,
        Self::Pagination,
        Self::AssetSearch,
        Self::CollectionSearch,
        Self::Transactions,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Context => "context",
            Self::Filter => "filter",
            Self::FreeText => "free-text",
            Self::Fields => "fields",
            Self::Sort => "sort",
            Self::ContextCollection => "context-collection",
            Self::Pagination => "pagination",
            Self::AssetSearch => "asset-search",
            Self::CollectionSearch => "collection-search",
            Self::Transactions => "transactions",
        }
    }
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Immutable set of enabled capabilities, built once at startup.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Capabilities {
    enabled: BTreeSet<Capability>,
}

impl Capabilities {
    /// Nothing enabled
    pub fn none() -> Self {
        Self::default()
    }

    /// Everything enabled
    pub fn all() -> Self {
        Self::from_iter(Capability::ALL)
    }

    pub fn contains(&self, capability: Capability) -> bool {
        self.enabled.contains(&capability)
    }

    pub fn iter(&self) -> impl Iterator<Item = Capability> + '_ {
        self.enabled.iter().copied()
    }
}

impl FromIterator<Capability> for Capabilities {
    fn from_iter<I: IntoIterator<Item = Capability>>(iter: I) -> Self {
        Self {
            enabled: iter.into_iter().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_membership() {
        let caps: Capabilities = [Capability::Sort, Capability::Fields].into_iter().collect();
        assert!(caps.contains(Capability::Sort));
        assert!(!caps.contains(Capability::Filter));
        assert!(!Capabilities::none().contains(Capability::Sort));
        assert!(Capabilities::all().contains(Capability::Transactions));
    }

    #[test]
    fn test_kebab_case_names() {
        let cap: Capability = serde_json::from_str("\"context-collection\"").unwrap();
        assert_eq!(cap, Capability::ContextCollection);
        assert_eq!(Capability::FreeText.to_string(), "free-text");
    }
}
