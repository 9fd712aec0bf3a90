//! [`HttpTransport`] backed by a `reqwest` client.

use super::{HttpTransport, TransportError};
use crate::http::{HttpRequest, HttpResponse};
use async_trait::async_trait;
use reqwest::Method;

/// Production transport. Cloning shares the connection pool.
#[derive(Debug, Clone, Default)]
pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    /// Transport with a default `reqwest` client
    pub fn new() -> Self {
        Self::default()
    }

    /// Transport over an existing client
    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

fn map_error(error: reqwest::Error) -> TransportError {
    if error.is_timeout() {
        TransportError::Timeout
    } else {
        TransportError::Request(error.to_string())
    }
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    async fn send(&self, url: &str, request: HttpRequest) -> Result<HttpResponse, TransportError> {
        let method = Method::from_bytes(request.method.to_ascii_uppercase().as_bytes())
            .map_err(|e| TransportError::Config(e.to_string()))?;

        let mut builder = self.client.request(method, url);
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if !request.body.is_empty() {
            builder = builder.body(request.body);
        }

        let response = builder.send().await.map_err(map_error)?;
        let status = response.status().as_u16();
        let headers = response
            .headers()
            .iter()
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|value| (name.as_str().to_string(), value.to_string()))
            })
            .collect();
        let body = response.bytes().await.map_err(map_error)?.to_vec();

        Ok(HttpResponse { status, headers, body })
    }
}
