//! Fetch operations: one bounded network retrieval per call.
//!
//! Split into:
//! - this module: the [`ResourceFetcher`] seam the pipeline depends on
//! - [`http`] - the production fetcher backed by an owned `reqwest::Client`

mod http;


pub use http::HttpFetcher;

use crate::error::FetchError;
use crate::types::{Comment, Post};

/// Abstraction over the two fetches performed for every item, enabling testability.
///
/// Implementations must bound each call in time and must not retry.
#[async_trait::async_trait]
pub trait ResourceFetcher: Send + Sync {
    /// Fetch the primary resource at `address`.
    async fn fetch_primary(&self, address: &str) -> Result<Post, FetchError>;

    /// Fetch the dependent resource list belonging to `address`.
    async fn fetch_dependent(&self, address: &str) -> Result<Vec<Comment>, FetchError>;
}
