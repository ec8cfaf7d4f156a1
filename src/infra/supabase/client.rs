use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::SecondsFormat;
use reqwest::Url;

use crate::analyzers::window::Window;
use crate::fetch::auth::ApiKey;
use crate::fetch::{BasicClient, HttpClient, fetch_json};
use crate::records::RawVacancy;
use crate::services::record_source::RecordSource;

/// Reads vacancies from a Supabase table through its PostgREST endpoint.
pub struct SupabaseSource<C> {
    client: C,
    base_url: Url,
    table: String,
    page_size: usize,
}

impl SupabaseSource<ApiKey<ApiKey<BasicClient>>> {
    /// Creates a source authenticating with the project's API key, sent both
    /// as `apikey` and as a bearer token.
    pub fn connect(base_url: &str, key: &str, table: &str, page_size: usize) -> Result<Self> {
        let client = ApiKey::bearer(ApiKey::new(BasicClient::new()?, "apikey", key)?, key)?;
        Self::with_client(client, base_url, table, page_size)
    }
}

impl<C: HttpClient> SupabaseSource<C> {
    pub fn with_client(client: C, base_url: &str, table: &str, page_size: usize) -> Result<Self> {
        let base_url = Url::parse(base_url.trim_end_matches('/'))
            .with_context(|| format!("invalid SUPABASE_URL '{base_url}'"))?;
        Ok(Self {
            client,
            base_url,
            table: table.to_string(),
            page_size,
        })
    }

    pub fn client(&self) -> &C {
        &self.client
    }

    fn page_url(&self, city: &str, window: &Window, offset: usize, limit: usize) -> Result<Url> {
        let mut url = self.base_url.join(&format!("rest/v1/{}", self.table))?;
        let start = window.start.to_rfc3339_opts(SecondsFormat::Secs, false);
        let end = window.end.to_rfc3339_opts(SecondsFormat::Secs, false);

        url.query_pairs_mut()
            .append_pair("select", "*")
            .append_pair("city_slug", &format!("eq.{city}"))
            .append_pair("published_at", &format!("gte.{start}"))
            .append_pair("published_at", &format!("lte.{end}"))
            .append_pair("order", "published_at.asc,id.asc")
            .append_pair("offset", &offset.to_string())
            .append_pair("limit", &limit.to_string());

        Ok(url)
    }
}

#[async_trait]
impl<C: HttpClient> RecordSource for SupabaseSource<C> {
    fn page_size(&self) -> usize {
        self.page_size
    }

    #[tracing::instrument(skip(self, window), fields(table = %self.table))]
    async fn fetch_page(
        &self,
        city: &str,
        window: &Window,
        offset: usize,
        limit: usize,
    ) -> Result<Vec<RawVacancy>> {
        let url = self.page_url(city, window, offset, limit)?;
        fetch_json(&self.client, url)
            .await
            .with_context(|| format!("failed to fetch {} page at offset {offset}", self.table))
    }
}
