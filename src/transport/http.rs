use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use reqwest::{Client, Url};
use serde_json::Value;
use std::time::Duration;
use tracing::debug;

use super::{FetchError, Transport};
use crate::models::QueryParameters;

pub const DEFAULT_API_URL: &str = "https://api-metrika.yandex.net/stat/v1/data";

/// Longest error body quoted back in a [`FetchError::Status`]
const MAX_ERROR_BODY: usize = 512;

/// Reqwest client bound to one endpoint and OAuth token
#[derive(Clone)]
pub struct ReqwestTransport {
    client: Client,
    base_url: Url,
}

impl ReqwestTransport {
    pub fn new(base_url: &str, token: &str, timeout: Duration) -> Result<Self> {
        let base_url =
            Url::parse(base_url).with_context(|| format!("invalid Metrika API URL '{base_url}'"))?;

        let mut authorization = HeaderValue::from_str(&format!("OAuth {token}"))
            .context("Metrika token contains characters not allowed in a header")?;
        authorization.set_sensitive(true);

        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, authorization);
        headers.insert(
            CONTENT_TYPE,
            HeaderValue::from_static("application/x-yametrika+json"),
        );

        let client = Client::builder()
            .user_agent(concat!("metrika/", env!("CARGO_PKG_VERSION")))
            .timeout(timeout)
            .default_headers(headers)
            .build()
            .context("failed to build HTTP client for Metrika API")?;

        Ok(Self { client, base_url })
    }

    fn url_for(&self, query: &QueryParameters) -> Url {
        let mut url = self.base_url.clone();
        if !query.is_empty() {
            url.query_pairs_mut().extend_pairs(query.to_pairs());
        }
        url
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn send(&self, query: &QueryParameters) -> Result<Value, FetchError> {
        let url = self.url_for(query);
        debug!("GET {}", url.path());

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| FetchError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(FetchError::Status {
                status: status.as_u16(),
                message: error_message(&body),
            });
        }

        response
            .json::<Value>()
            .await
            .map_err(|e| FetchError::Decode(e.to_string()))
    }
}

/// Pull `message` out of a Metrika error document, falling back to the body
fn error_message(body: &str) -> String {
    if let Ok(Value::Object(doc)) = serde_json::from_str::<Value>(body) {
        if let Some(Value::String(message)) = doc.get("message") {
            return message.clone();
        }
    }

    let trimmed = body.trim();
    if trimmed.is_empty() {
        return "empty response body".to_string();
    }
    trimmed.chars().take(MAX_ERROR_BODY).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_url_carries_sorted_query() {
        let transport =
            ReqwestTransport::new(DEFAULT_API_URL, "token", Duration::from_secs(5)).unwrap();
        let url = transport.url_for(
            &QueryParameters::new()
                .with("metrics", "ym:s:visits")
                .with("ids", "42")
                .with("limit", 5_i64),
        );

        assert_eq!(
            url.as_str(),
            "https://api-metrika.yandex.net/stat/v1/data?ids=42&limit=5&metrics=ym%3As%3Avisits"
        );
    }

    #[test]
    fn test_token_never_appears_in_url() {
        let transport =
            ReqwestTransport::new(DEFAULT_API_URL, "secret-token", Duration::from_secs(5)).unwrap();
        let url = transport.url_for(&QueryParameters::new().with("ids", "42"));
        assert!(!url.as_str().contains("secret-token"));
    }

    #[test]
    fn test_rejects_bad_base_url_and_token() {
        assert!(ReqwestTransport::new("not a url", "t", Duration::from_secs(1)).is_err());
        assert!(ReqwestTransport::new(DEFAULT_API_URL, "bad\ntoken", Duration::from_secs(1)).is_err());
    }

    #[test]
    fn test_error_message_extraction() {
        assert_eq!(
            error_message(r#"{"errors":[{"error_type":"invalid_token"}],"code":403,"message":"Invalid oauth_token"}"#),
            "Invalid oauth_token"
        );
        assert_eq!(error_message("  gateway timeout \n"), "gateway timeout");
        assert_eq!(error_message(""), "empty response body");
    }
}
