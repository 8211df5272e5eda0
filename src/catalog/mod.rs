//! Multi-catalog core.
//!
//! The registry records which indices back each named catalog. The router
//! turns a read into either a direct call on one source or a lazy fan-out
//! over all of them, yielding [`ResultPages`].

mod pages;
mod registry;
mod router;
mod searchable;

pub use pages::{Page, ResultPages};
pub use registry::{CatalogEntry, CatalogRegistry, RegistryState};
pub use router::{CatalogRouter, Located};
pub use searchable::{AggregatedCollections, IndexSearchable, SearchSettings, Searchable, Window};
