use futures::future::try_join_all;

use crate::api::dto::TestRun;
use crate::services::api_client::{ApiClient, ApiError};

pub const PAGE_SIZE: usize = 10;

/// Runs whose id, source file or test file contains `term`,
/// case-insensitively. An empty term keeps everything.
pub fn filter_history<'a>(runs: &'a [TestRun], term: &str) -> Vec<&'a TestRun> {
    let term = term.to_lowercase();
    runs.iter()
        .filter(|run| {
            run.id.to_string().contains(&term)
                || run.java_file.to_lowercase().contains(&term)
                || run.test_file.to_lowercase().contains(&term)
        })
        .collect()
}

pub fn total_pages(len: usize) -> usize {
    len.div_ceil(PAGE_SIZE)
}

/// The 1-based `page` of `items`; empty past the end.
pub fn page<T>(items: &[T], page: usize) -> &[T] {
    let start = page.saturating_sub(1) * PAGE_SIZE;
    if start >= items.len() {
        return &[];
    }
    let end = (start + PAGE_SIZE).min(items.len());
    &items[start..end]
}

/// Deletes every id concurrently. The first failure is returned; deletes
/// already accepted by the backend stay deleted.
pub async fn delete_many(client: &ApiClient, ids: &[i64]) -> Result<(), ApiError> {
    try_join_all(ids.iter().map(|id| client.delete_test(*id))).await?;
    tracing::info!("Deleted {} tests", ids.len());
    Ok(())
}
