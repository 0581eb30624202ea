use futures::stream::{self, StreamExt};
use serde::Serialize;
use serde_json::Value;

use crate::services::letterboxd::LetterboxdApi;

/// Knobs for [`fetch_all`]
#[derive(Debug, Clone)]
pub struct BulkFetchOptions {
    /// Retries allowed per path after the first attempt
    pub max_retries: u32,
    /// Upper bound on requests in flight
    pub max_concurrency: usize,
    /// Log progress after this many completed paths
    pub progress_every: usize,
}

impl Default for BulkFetchOptions {
    fn default() -> Self {
        Self {
            max_retries: 15,
            max_concurrency: 50,
            progress_every: 1000,
        }
    }
}

/// Outcome of a bulk fetch, in completion order
#[derive(Debug, Default, Serialize)]
pub struct BulkFetchReport {
    pub results: Vec<Value>,
    /// Paths the API answered with 404
    pub missing: Vec<String>,
    /// Paths that kept failing after every retry
    pub failed: Vec<String>,
}

enum Outcome {
    Fetched(Value),
    Missing(String),
    Failed(String),
}

/// Fetches every path with bounded concurrency and per-path retries
///
/// A 404 classifies the path as missing straight away. Any other error is
/// retried immediately until the path has failed `max_retries + 1` times, at
/// which point it is recorded as failed.
pub async fn fetch_all<A>(api: &A, paths: Vec<String>, options: &BulkFetchOptions) -> BulkFetchReport
where
    A: LetterboxdApi + ?Sized,
{
    let total = paths.len();
    let max_retries = options.max_retries;
    let progress_every = options.progress_every.max(1);

    tracing::info!(
        paths = total,
        max_concurrency = options.max_concurrency,
        max_retries,
        "Starting bulk fetch"
    );

    let mut outcomes = stream::iter(paths)
        .map(|path| fetch_with_retries(api, path, max_retries))
        .buffer_unordered(options.max_concurrency.max(1));

    let mut report = BulkFetchReport::default();
    let mut completed = 0usize;

    while let Some(outcome) = outcomes.next().await {
        match outcome {
            Outcome::Fetched(body) => report.results.push(body),
            Outcome::Missing(path) => report.missing.push(path),
            Outcome::Failed(path) => report.failed.push(path),
        }

        completed += 1;
        if completed % progress_every == 0 {
            tracing::info!(completed, total, "Bulk fetch progress");
        }
    }

    tracing::info!(
        fetched = report.results.len(),
        missing = report.missing.len(),
        failed = report.failed.len(),
        "Bulk fetch finished"
    );

    report
}

async fn fetch_with_retries<A>(api: &A, path: String, max_retries: u32) -> Outcome
where
    A: LetterboxdApi + ?Sized,
{
    let mut retries = 0u32;

    loop {
        match api.get_json(&path).await {
            Ok(body) => return Outcome::Fetched(body),
            Err(e) if e.is_not_found() => {
                tracing::debug!(path = %path, "Path not found");
                return Outcome::Missing(path);
            }
            Err(e) => {
                retries += 1;
                if retries > max_retries {
                    tracing::warn!(path = %path, error = %e, retries = max_retries, "Giving up on path");
                    return Outcome::Failed(path);
                }
                tracing::debug!(path = %path, error = %e, attempt = retries, "Retrying path");
            }
        }
    }
}
