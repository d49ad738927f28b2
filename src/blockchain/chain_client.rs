use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{json, Value};

use crate::error::{ClientError, ErrorBody, GatewayError, Result};
use crate::logging::{LogContext, MetricsLogger, PerformanceMonitor};
use crate::models::{BlockRequest, BlockResponse, CallRequest, CallResponse};

/// Chain data the gateway reads per request.
#[async_trait]
pub trait ChainClient: Send + Sync {
    async fn block(&self, request: &BlockRequest) -> Result<BlockResponse>;

    async fn call(&self, request: &CallRequest) -> Result<CallResponse>;
}

/// HTTP client for the upstream Rosetta core service.
#[derive(Clone)]
pub struct RosettaClient {
    client: Client,
    base_url: String,
    timeout_seconds: u64,
}

impl RosettaClient {
    pub fn new(base_url: &str, timeout_seconds: u64) -> std::result::Result<Self, ClientError> {
        let context = LogContext::new("rosetta_client", "initialization")
            .with_metadata("base_url", json!(base_url))
            .with_metadata("timeout_seconds", json!(timeout_seconds));
        context.info("Initializing upstream client");

        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_seconds))
            .pool_max_idle_per_host(10)
            .pool_idle_timeout(Duration::from_secs(30))
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            timeout_seconds,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn classify(&self, e: reqwest::Error) -> ClientError {
        if e.is_timeout() {
            ClientError::Timeout {
                seconds: self.timeout_seconds,
            }
        } else if e.is_connect() {
            ClientError::Connection(e.to_string())
        } else {
            ClientError::Http(e)
        }
    }

    async fn send<B: Serialize + ?Sized + Sync>(&self, path: &str, body: &B) -> Result<Value> {
        let url = format!("{}{}", self.base_url, path);
        let context = LogContext::new("rosetta_client", "send")
            .with_metadata("path", json!(path));
        context.trace(&format!("POST {}", url));

        let response = self
            .client
            .post(&url)
            .json(body)
            .send()
            .await
            .map_err(|e| self.classify(e))?;

        let status = response.status();
        let bytes = response.bytes().await.map_err(|e| self.classify(e))?;

        if !status.is_success() {
            // The core service answers failures with a Rosetta error object; relay it as-is.
            return match serde_json::from_slice::<ErrorBody>(&bytes) {
                Ok(body) => Err(ClientError::Upstream(body).into()),
                Err(_) => Err(ClientError::Connection(format!(
                    "HTTP error: {} {}",
                    status.as_u16(),
                    status.canonical_reason().unwrap_or("Unknown")
                ))
                .into()),
            };
        }

        serde_json::from_slice(&bytes)
            .map_err(|e| ClientError::InvalidResponse(format!("{}: {}", path, e)).into())
    }

    async fn post<B, T>(&self, path: &str, body: &B) -> Result<T>
    where
        B: Serialize + ?Sized + Sync,
        T: DeserializeOwned,
    {
        let monitor = PerformanceMonitor::new("upstream_call").with_metadata("path", json!(path));
        let result = self.send(path, body).await.and_then(|value| {
            serde_json::from_value(value).map_err(|e| -> GatewayError {
                ClientError::InvalidResponse(format!("{}: {}", path, e)).into()
            })
        });
        let duration = monitor.finish_with_result(&result);
        MetricsLogger::log_upstream_call(path, duration, result.is_ok());
        result
    }

    /// Relay a request body to `path` and return the upstream body untouched.
    pub async fn relay(&self, path: &str, body: &Value) -> Result<Value> {
        self.post(path, body).await
    }
}

#[async_trait]
impl ChainClient for RosettaClient {
    async fn block(&self, request: &BlockRequest) -> Result<BlockResponse> {
        self.post("/block", request).await
    }

    async fn call(&self, request: &CallRequest) -> Result<CallResponse> {
        self.post("/call", request).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base_url_is_normalized() {
        let client = RosettaClient::new("http://localhost:8080/", 5).unwrap();
        assert_eq!(client.base_url(), "http://localhost:8080");
    }
}
