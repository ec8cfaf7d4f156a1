use async_trait::async_trait;
use reqwest::{Request, Response};

/// Sends a prepared request. The record store and the Bot API both talk
/// through this, so tests can swap in a canned client and wrappers such as
/// [`super::auth::ApiKey`] can stack headers.
#[async_trait]
pub trait HttpClient: Send + Sync {
    async fn execute(&self, request: Request) -> reqwest::Result<Response>;
}
