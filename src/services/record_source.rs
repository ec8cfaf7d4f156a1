//! Trait for range queries against the vacancy store.

use anyhow::Result;
use tracing::debug;

use crate::analyzers::window::Window;
use crate::records::RawVacancy;

/// Abstraction over a paginated vacancy store (e.g., Supabase).
#[async_trait::async_trait]
pub trait RecordSource: Send + Sync {
    /// Maximum number of rows requested per page.
    fn page_size(&self) -> usize;

    /// Returns up to `limit` rows for `city` published within `window`,
    /// skipping the first `offset` matches.
    async fn fetch_page(
        &self,
        city: &str,
        window: &Window,
        offset: usize,
        limit: usize,
    ) -> Result<Vec<RawVacancy>>;

    /// Fetches every row for `city` within `window`, page by page, until the
    /// store returns an empty page.
    async fn fetch_window(&self, city: &str, window: &Window) -> Result<Vec<RawVacancy>> {
        let limit = self.page_size().max(1);
        let mut rows = Vec::new();
        let mut page = 0usize;

        loop {
            let batch = self.fetch_page(city, window, page * limit, limit).await?;
            if batch.is_empty() {
                break;
            }
            rows.extend(batch);
            page += 1;
            debug!(city, page, rows = rows.len(), "Fetched page");
        }

        Ok(rows)
    }
}
