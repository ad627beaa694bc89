//! Round-trip transports.
//!
//! A transport moves one JSON payload (a request or a batch) to the server and
//! returns the decoded reply. Deadlines and demultiplexing are the
//! requester's job.

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, CONTENT_TYPE};
use serde_json::Value;

use crate::envelope::export::CONTENT_TYPE as JSON_CONTENT_TYPE;
use crate::types::{Error, Result};

/// One network round trip.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Transport: Send + Sync + 'static {
    async fn round_trip(&self, payload: Value) -> Result<Value>;
}

/// HTTP POST transport backed by `reqwest`.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    http: reqwest::Client,
    url: String,
    headers: HeaderMap,
}

impl HttpTransport {
    pub fn new(url: impl Into<String>) -> Self {
        Self::with_client(reqwest::Client::new(), url)
    }

    pub fn with_client(http: reqwest::Client, url: impl Into<String>) -> Self {
        Self {
            http,
            url: url.into(),
            headers: HeaderMap::new(),
        }
    }

    /// Extra header sent with every round trip.
    pub fn header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn round_trip(&self, payload: Value) -> Result<Value> {
        let body = serde_json::to_vec(&payload)?;
        let response = self
            .http
            .post(&self.url)
            .headers(self.headers.clone())
            .header(CONTENT_TYPE, JSON_CONTENT_TYPE)
            .body(body)
            .send()
            .await
            .map_err(|e| Error::transport(e.to_string()))?;

        let status = response.status();
        let bytes = response
            .bytes()
            .await
            .map_err(|e| Error::transport(e.to_string()))?;

        // Failures come back as 4xx/5xx with a JSON-RPC body; only a body we
        // cannot decode makes the status itself the error.
        match serde_json::from_slice::<Value>(&bytes) {
            Ok(value) => Ok(value),
            Err(_) if !status.is_success() => Err(Error::transport(format!("HTTP error {status}"))),
            Err(e) => Err(Error::requester(format!("Invalid response body: {e}"))),
        }
    }
}
