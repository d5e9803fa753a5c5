//! Graphward Store: SPARQL access to the shared dataset.
//!
//! Every remote read and write flows through [`RetryingQueryClient`], which
//! wraps a single protocol call in bounded exponential backoff. The
//! [`DatasetStore`] trait is the typed seam the lock manager and the editor
//! consume; [`SparqlStore`] implements it over a remote endpoint and
//! [`MemoryStore`] in process.

pub mod client;
pub mod memory;
pub mod mutations;
pub mod queries;
pub mod results;
pub mod store;

pub use client::{HttpEndpoint, RetryPolicy, RetryingQueryClient, SparqlEndpoint, StoreError};
pub use memory::MemoryStore;
pub use mutations::Delta;
pub use queries::SparqlStore;
pub use results::QueryResults;
pub use store::DatasetStore;
