//! Trait and types for delivering finished digests.

use anyhow::Result;
use serde::Serialize;

use crate::config::City;
use crate::records::RawVacancy;

/// A finished report for one city, ready to be published.
#[derive(Debug, Clone, Serialize)]
pub struct Digest {
    pub city: City,
    /// Human-readable message text.
    pub caption: String,
    /// Whether `caption` uses Telegram Markdown markup.
    pub markdown: bool,
    /// The structured report the caption was rendered from.
    pub payload: serde_json::Value,
    /// Rows the report was computed from, for chart renderers.
    #[serde(skip)]
    pub records: Vec<RawVacancy>,
}

/// Abstraction over a delivery target (e.g., a Telegram channel).
#[async_trait::async_trait]
pub trait ReportSink: Send + Sync {
    async fn deliver(&self, digest: &Digest) -> Result<()>;
}
