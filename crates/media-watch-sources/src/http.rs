use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::debug;
use crate::error::SourceError;
use crate::retry::{with_retry, RetryPolicy};

/// JSON-over-HTTP client for `X-Api-Key` authenticated services.
#[derive(Clone)]
pub struct ApiClient {
    client: Client,
    base_url: String,
    api_key: String,
    retry: RetryPolicy,
}

impl ApiClient {
    pub fn new(base_url: &str, api_key: String, timeout: Duration, retry: RetryPolicy) -> Result<Self, SourceError> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(concat!("readyarr/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
            retry,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    /// GET and decode a JSON body, retrying transient failures.
    pub async fn get_json<T: DeserializeOwned>(&self, path: &str, query: &[(&str, String)]) -> Result<T, SourceError> {
        let url = &self.url(path);
        with_retry(&self.retry, path, || async move {
            debug!(url = %url, "GET");
            let response = self
                .client
                .get(url.as_str())
                .header("X-Api-Key", &self.api_key)
                .header("Accept", "application/json")
                .query(query)
                .send()
                .await?;

            let response = check_status(response, url).await?;
            response
                .json::<T>()
                .await
                .map_err(|e| SourceError::MalformedRecord(format!("{}: {}", url, e)))
        })
        .await
    }

    pub async fn delete(&self, path: &str) -> Result<(), SourceError> {
        let url = &self.url(path);
        with_retry(&self.retry, path, || async move {
            debug!(url = %url, "DELETE");
            let response = self
                .client
                .delete(url.as_str())
                .header("X-Api-Key", &self.api_key)
                .send()
                .await?;
            check_status(response, url).await.map(|_| ())
        })
        .await
    }
}

async fn check_status(response: reqwest::Response, url: &str) -> Result<reqwest::Response, SourceError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    if status == StatusCode::NOT_FOUND {
        return Err(SourceError::RecordNotFound(url.to_string()));
    }
    let body = response.text().await.unwrap_or_default();
    Err(SourceError::Status {
        status: status.as_u16(),
        body,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::StubServer;
    use serde_json::Value;

    #[tokio::test]
    async fn test_get_sends_key_and_query() {
        let server = StubServer::start(&[("GET /api/v3/movie", 200, "[]")]).await;
        let client = server.client();

        let movies: Vec<Value> = client
            .get_json("/api/v3/movie", &[("tmdbId", "603".to_string())])
            .await
            .unwrap();
        assert!(movies.is_empty());
        assert_eq!(server.requests(), vec!["GET /api/v3/movie?tmdbId=603"]);
    }

    #[tokio::test]
    async fn test_server_error_is_retried() {
        let server = StubServer::start(&[
            ("GET /status", 503, r#"{"message": "starting"}"#),
            ("GET /status", 200, r#"{"version": "1.0"}"#),
        ])
        .await;

        let status: Value = server.client().get_json("status", &[]).await.unwrap();
        assert_eq!(status["version"], "1.0");
        assert_eq!(server.requests().len(), 2);
    }

    #[tokio::test]
    async fn test_client_error_is_not_retried() {
        let server = StubServer::start(&[("GET /status", 401, r#"{"error": "bad key"}"#)]).await;

        let err = server.client().get_json::<Value>("status", &[]).await.unwrap_err();
        assert!(matches!(err, SourceError::Status { status: 401, .. }));
        assert_eq!(server.requests().len(), 1);
    }

    #[tokio::test]
    async fn test_not_found_maps_to_record_not_found() {
        let server = StubServer::start(&[]).await;

        let err = server.client().get_json::<Value>("movie/1", &[]).await.unwrap_err();
        assert!(err.is_not_found());
        assert!(err.to_string().contains(server.base_url()));
    }

    #[tokio::test]
    async fn test_undecodable_body_is_malformed() {
        let server = StubServer::start(&[("GET /status", 200, "not json")]).await;

        let err = server.client().get_json::<Value>("status", &[]).await.unwrap_err();
        assert!(matches!(err, SourceError::MalformedRecord(_)));
    }
}
