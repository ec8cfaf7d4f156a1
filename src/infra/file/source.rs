use anyhow::{Context, Result};
use async_trait::async_trait;
use std::fs;
use std::path::Path;
use tracing::info;

use crate::analyzers::window::Window;
use crate::records::RawVacancy;
use crate::services::record_source::RecordSource;

/// Serves vacancies from a JSON export (an array of store rows), answering
/// the same range queries as the remote store.
pub struct FileSource {
    rows: Vec<RawVacancy>,
    page_size: usize,
}

impl FileSource {
    pub fn load(path: impl AsRef<Path>, page_size: usize) -> Result<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        let rows: Vec<RawVacancy> = serde_json::from_str(&text)
            .with_context(|| format!("failed to parse {}", path.display()))?;
        info!(path = %path.display(), rows = rows.len(), "Loaded vacancy export");
        Ok(Self::from_rows(rows, page_size))
    }

    pub fn from_rows(mut rows: Vec<RawVacancy>, page_size: usize) -> Self {
        rows.sort_by(|a, b| {
            a.published_at
                .cmp(&b.published_at)
                .then_with(|| a.id.cmp(&b.id))
        });
        Self { rows, page_size }
    }

    /// Distinct city slugs present in the export, sorted.
    pub fn cities(&self) -> Vec<String> {
        let mut slugs: Vec<String> = self.rows.iter().map(|r| r.city_slug.clone()).collect();
        slugs.sort();
        slugs.dedup();
        slugs
    }
}

#[async_trait]
impl RecordSource for FileSource {
    fn page_size(&self) -> usize {
        self.page_size
    }

    async fn fetch_page(
        &self,
        city: &str,
        window: &Window,
        offset: usize,
        limit: usize,
    ) -> Result<Vec<RawVacancy>> {
        Ok(self
            .rows
            .iter()
            .filter(|r| r.city_slug == city)
            .filter(|r| r.published_at.is_some_and(|at| window.contains(at)))
            .skip(offset)
            .take(limit)
            .cloned()
            .collect())
    }
}
