//! Backend seam and the in-memory reference backend.

pub mod traits;
pub mod memory;
pub(crate) mod eval;

pub use memory::InMemoryBackend;
pub use traits::{AggregationResult, BackendError, Bucket, Document, SearchBackend, SearchResponse};
