//! HTTP layer: request plumbing and status mapping.
//!
//! This is the only place that looks at status codes. client/mod.rs works
//! with decoded bodies and `ServiceError` values.

use reqwest::{Method, StatusCode};
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use super::response::{error_message_from_body, ServiceError};

/// Holds the reqwest client; cheap to clone
#[derive(Debug, Clone)]
pub(crate) struct HttpBackend {
    pub(crate) client: reqwest::Client,
}

impl HttpBackend {
    /// Send a request and decode a JSON body
    pub(crate) async fn json<T: DeserializeOwned>(
        &self,
        method: Method,
        url: &str,
        query: &[(&str, String)],
    ) -> Result<T, ServiceError> {
        let response = self.send(method, url, query).await?;
        let text = response
            .text()
            .await
            .map_err(|e| ServiceError::Network(format!("failed to read response body: {}", e)))?;

        serde_json::from_str(&text).map_err(|e| {
            ServiceError::InvalidResponse(format!("failed to decode response from {}: {}", url, e))
        })
    }

    /// Send a request and return the raw body
    pub(crate) async fn bytes(&self, url: &str) -> Result<Vec<u8>, ServiceError> {
        let response = self.send(Method::GET, url, &[]).await?;
        response
            .bytes()
            .await
            .map(|b| b.to_vec())
            .map_err(|e| ServiceError::Network(format!("failed to read response body: {}", e)))
    }

    async fn send(
        &self,
        method: Method,
        url: &str,
        query: &[(&str, String)],
    ) -> Result<reqwest::Response, ServiceError> {
        debug!(method = %method, url = %url, query = ?query, "sending request");

        let response = self
            .client
            .request(method, url)
            .query(query)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    ServiceError::Network(format!("request to {} timed out", url))
                } else {
                    ServiceError::Network(e.to_string())
                }
            })?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        Err(map_status(status, url, &body))
    }
}

fn map_status(status: StatusCode, url: &str, body: &str) -> ServiceError {
    if status == StatusCode::NOT_FOUND {
        debug!(url = %url, "resource not found (404)");
        return ServiceError::NotFound(url.to_string());
    }

    let message = error_message_from_body(body);
    warn!(
        status = status.as_u16(),
        url = %url,
        message = ?message,
        "request failed"
    );
    ServiceError::Status {
        status: status.as_u16(),
        message,
    }
}
