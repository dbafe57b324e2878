//! Access to the Metrika reporting endpoint

pub mod http;

pub use http::{ReqwestTransport, DEFAULT_API_URL};

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

use crate::models::{QueryParameters, RawResult};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchError {
    #[error("request failed: {0}")]
    Transport(String),
    #[error("API responded with status {status}: {message}")]
    Status { status: u16, message: String },
    #[error("malformed response: {0}")]
    Decode(String),
}

/// Sends a GET to the bound endpoint with the given query and returns the
/// decoded JSON body. Base URL and credentials are fixed at construction.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, query: &QueryParameters) -> Result<Value, FetchError>;
}

/// Fetch and decode a report
pub async fn fetch(transport: &dyn Transport, query: &QueryParameters) -> Result<RawResult, FetchError> {
    let body = transport.send(query).await?;
    serde_json::from_value(body).map_err(|e| FetchError::Decode(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    struct StaticTransport(Value);

    #[async_trait]
    impl Transport for StaticTransport {
        async fn send(&self, _query: &QueryParameters) -> Result<Value, FetchError> {
            Ok(self.0.clone())
        }
    }

    #[tokio::test]
    async fn test_fetch_decodes_rows() {
        let transport = StaticTransport(json!({
            "query": {"dimensions": [], "metrics": ["ym:s:visits"]},
            "data": [{"dimensions": [], "metrics": [5.0]}]
        }));

        let raw = fetch(&transport, &QueryParameters::new()).await.unwrap();
        assert_eq!(raw.data[0].metrics, vec![5.0]);
    }

    #[tokio::test]
    async fn test_fetch_reports_malformed_body() {
        let transport = StaticTransport(json!({"data": "not rows"}));

        assert!(matches!(
            fetch(&transport, &QueryParameters::new()).await,
            Err(FetchError::Decode(_))
        ));
    }
}
