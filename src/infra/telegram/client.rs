use anyhow::{Context, Result, bail};
use async_trait::async_trait;
use reqwest::Url;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::fetch::{BasicClient, HttpClient, post_json};
use crate::services::report_sink::{Digest, ReportSink};

const API_BASE: &str = "https://api.telegram.org";

/// Telegram rejects messages longer than this many characters.
pub const MAX_MESSAGE_CHARS: usize = 4096;

#[derive(Debug, Serialize)]
struct SendMessage<'a> {
    chat_id: &'a str,
    text: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    parse_mode: Option<&'static str>,
    disable_web_page_preview: bool,
}

#[derive(Debug, Deserialize)]
struct ApiResponse {
    ok: bool,
    #[serde(default)]
    description: Option<String>,
}

/// Posts digests to each city's channel through the Bot API.
pub struct TelegramSink<C> {
    client: C,
    send_url: Url,
}

impl TelegramSink<BasicClient> {
    pub fn new(token: &str) -> Result<Self> {
        Self::with_client(BasicClient::new()?, API_BASE, token)
    }
}

impl<C: HttpClient> TelegramSink<C> {
    pub fn with_client(client: C, api_base: &str, token: &str) -> Result<Self> {
        let send_url = Url::parse(&format!(
            "{}/bot{token}/sendMessage",
            api_base.trim_end_matches('/')
        ))
        .context("invalid Telegram API url")?;
        Ok(Self { client, send_url })
    }

    pub fn client(&self) -> &C {
        &self.client
    }
}

/// Cuts `text` to at most `max` characters.
fn truncate_chars(text: &str, max: usize) -> &str {
    match text.char_indices().nth(max) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

#[async_trait]
impl<C: HttpClient> ReportSink for TelegramSink<C> {
    #[tracing::instrument(skip_all, fields(city = %digest.city.slug, channel = %digest.city.channel))]
    async fn deliver(&self, digest: &Digest) -> Result<()> {
        let body = SendMessage {
            chat_id: &digest.city.channel,
            text: truncate_chars(&digest.caption, MAX_MESSAGE_CHARS),
            parse_mode: digest.markdown.then_some("Markdown"),
            disable_web_page_preview: true,
        };

        let resp: ApiResponse = post_json(&self.client, self.send_url.clone(), &body)
            .await
            .with_context(|| format!("failed to send digest to {}", digest.city.channel))?;
        if !resp.ok {
            bail!(
                "Telegram rejected digest for {}: {}",
                digest.city.channel,
                resp.description.unwrap_or_default()
            );
        }

        info!("Digest delivered");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::City;
    use crate::fetch::testing::MockClient;

    fn digest(caption: &str, markdown: bool) -> Digest {
        Digest {
            city: City::new("msk", "Москва", "@courier_jobs_msk"),
            caption: caption.to_string(),
            markdown,
            payload: serde_json::json!({}),
            records: Vec::new(),
        }
    }

    fn sink(responses: Vec<(u16, &str)>) -> TelegramSink<MockClient> {
        TelegramSink::with_client(MockClient::new(responses), "https://tg.example/", "123:abc")
            .unwrap()
    }

    #[tokio::test]
    async fn test_deliver_posts_send_message() {
        let sink = sink(vec![(200, r#"{"ok": true, "result": {}}"#)]);
        sink.deliver(&digest("*Отчёт*", true)).await.unwrap();

        let seen = sink.client().seen.lock().unwrap();
        assert_eq!(seen[0].method, "POST");
        assert_eq!(seen[0].url.path(), "/bot123:abc/sendMessage");
        let body: serde_json::Value = serde_json::from_slice(seen[0].body.as_ref().unwrap()).unwrap();
        assert_eq!(body["chat_id"], "@courier_jobs_msk");
        assert_eq!(body["text"], "*Отчёт*");
        assert_eq!(body["parse_mode"], "Markdown");
    }

    #[tokio::test]
    async fn test_plain_digest_has_no_parse_mode() {
        let sink = sink(vec![(200, r#"{"ok": true}"#)]);
        sink.deliver(&digest("plain", false)).await.unwrap();

        let seen = sink.client().seen.lock().unwrap();
        let body: serde_json::Value = serde_json::from_slice(seen[0].body.as_ref().unwrap()).unwrap();
        assert!(body.get("parse_mode").is_none());
    }

    #[tokio::test]
    async fn test_api_rejection_is_error() {
        let sink = sink(vec![(200, r#"{"ok": false, "description": "chat not found"}"#)]);
        let err = sink.deliver(&digest("x", true)).await.unwrap_err();
        assert!(err.to_string().contains("chat not found"));
    }

    #[tokio::test]
    async fn test_http_error_is_error() {
        let sink = sink(vec![(400, r#"{"ok": false, "description": "Bad Request"}"#)]);
        let err = sink.deliver(&digest("x", true)).await.unwrap_err();
        assert!(format!("{err:#}").contains("400"));
    }

    #[test]
    fn test_truncate_chars_respects_char_boundaries() {
        assert_eq!(truncate_chars("привет", 3), "при");
        assert_eq!(truncate_chars("abc", 10), "abc");
    }
}
