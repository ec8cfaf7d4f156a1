mod basic;
mod client;
pub mod auth;

pub use basic::BasicClient;
pub use client::HttpClient;

use anyhow::{Result, bail};
use reqwest::header::{CONTENT_TYPE, HeaderValue};
use reqwest::{Method, Url};
use serde::Serialize;
use serde::de::DeserializeOwned;

/// Issues a GET and decodes the JSON body. Non-2xx statuses are errors.
pub async fn fetch_json<C, T>(client: &C, url: Url) -> Result<T>
where
    C: HttpClient,
    T: DeserializeOwned,
{
    let req = reqwest::Request::new(Method::GET, url);
    let resp = client.execute(req).await?;

    let status = resp.status();
    if !status.is_success() {
        let body = resp.text().await.unwrap_or_default();
        bail!("GET returned status {}: {}", status, body);
    }

    Ok(resp.json().await?)
}

/// POSTs `body` as JSON and decodes the JSON response. Non-2xx statuses are errors.
pub async fn post_json<C, B, T>(client: &C, url: Url, body: &B) -> Result<T>
where
    C: HttpClient,
    B: Serialize + ?Sized,
    T: DeserializeOwned,
{
    let mut req = reqwest::Request::new(Method::POST, url);
    req.headers_mut()
        .insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    *req.body_mut() = Some(serde_json::to_vec(body)?.into());

    let resp = client.execute(req).await?;

    let status = resp.status();
    if !status.is_success() {
        let body = resp.text().await.unwrap_or_default();
        bail!("POST returned status {}: {}", status, body);
    }

    Ok(resp.json().await?)
}


#[cfg(test)]
mod tests {
    use super::testing::MockClient;
    use super::*;
    use crate::fetch::auth::ApiKey;

    #[tokio::test]
    async fn test_fetch_json_decodes_body() {
        let client = MockClient::new(vec![(200, r#"{"ok": true}"#)]);
        let url = Url::parse("https://store.example/rest").unwrap();
        let value: serde_json::Value = fetch_json(&client, url).await.unwrap();
        assert_eq!(value["ok"], true);
    }

    #[tokio::test]
    async fn test_fetch_json_rejects_error_status() {
        let client = MockClient::new(vec![(401, "denied")]);
        let url = Url::parse("https://store.example/rest").unwrap();
        let err = fetch_json::<_, serde_json::Value>(&client, url)
            .await
            .unwrap_err();
        assert!(err.to_string().contains("401"));
        assert!(err.to_string().contains("denied"));
    }

    #[tokio::test]
    async fn test_post_json_sends_body() {
        let client = MockClient::new(vec![(200, "{}")]);
        let url = Url::parse("https://api.example/send").unwrap();
        let _: serde_json::Value = post_json(&client, url, &serde_json::json!({"a": 1}))
            .await
            .unwrap();

        let seen = client.seen.lock().unwrap();
        assert_eq!(seen[0].method, "POST");
        assert_eq!(seen[0].headers[CONTENT_TYPE], "application/json");
        assert_eq!(seen[0].body.as_deref(), Some(br#"{"a":1}"#.as_slice()));
    }

    #[tokio::test]
    async fn test_api_key_headers_stack() {
        let inner = MockClient::new(vec![(200, "[]")]);
        let client = ApiKey::bearer(ApiKey::new(inner, "apikey", "secret").unwrap(), "secret")
            .unwrap();
        let url = Url::parse("https://store.example/rest").unwrap();
        let _: serde_json::Value = fetch_json(&client, url).await.unwrap();

        let seen = client.inner().inner().seen.lock().unwrap();
        assert_eq!(seen[0].headers["apikey"], "secret");
        assert_eq!(seen[0].headers[reqwest::header::AUTHORIZATION], "Bearer secret");
    }

    #[test]
    fn test_api_key_rejects_bad_header() {
        let inner = MockClient::new(vec![]);
        assert!(ApiKey::new(inner, "bad header", "k").is_err());
    }
}
