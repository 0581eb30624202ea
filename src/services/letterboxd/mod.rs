//! Letterboxd API access
//!
//! The client signs every call with the API key and secret. The pagination and
//! bulk-fetch helpers work against the [`LetterboxdApi`] trait so they can be
//! driven by any implementation.

use serde_json::Value;

use crate::error::LetterboxdResult;

pub mod bulk;
pub mod client;
pub mod pagination;

pub use bulk::{fetch_all, BulkFetchOptions, BulkFetchReport};
pub use client::{Credentials, LetterboxdClient};
pub use pagination::{ratings, watchlist, CursorPages};

/// Trait for authenticated Letterboxd API access
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait LetterboxdApi: Send + Sync {
    /// GET a path relative to the API base and decode the JSON body
    ///
    /// Any status other than 200 is returned as [`crate::error::LetterboxdError::Status`].
    async fn get_json(&self, path: &str) -> LetterboxdResult<Value>;
}
