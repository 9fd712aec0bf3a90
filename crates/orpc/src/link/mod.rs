//! Client-side links
//!
//! A [`Link`] turns a call `(path, input)` into a result; the [`Client`](crate::client::Client)
//! only knows this trait. HTTP links are built on an [`HttpTransport`], which
//! moves bytes and nothing else.

mod contract;
mod json;
#[cfg(feature = "reqwest")]
mod reqwest;

pub use contract::ContractLink;
pub use json::JsonLink;
#[cfg(feature = "reqwest")]
pub use reqwest::ReqwestTransport;

use crate::client::{ClientError, ClientOptions};
use crate::config::LinkConfig;
use crate::http::{HttpRequest, HttpResponse};
use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;
use tracing::{trace, warn};

/// Executes a call on behalf of a client.
#[async_trait]
pub trait Link: Send + Sync {
    /// Call the procedure at `path`.
    ///
    /// `None` input and output stand for "no value".
    async fn call(
        &self,
        path: &[String],
        input: Option<Value>,
        options: ClientOptions,
    ) -> Result<Option<Value>, ClientError>;
}

/// Failure to move a request or response.
#[derive(Debug, Error)]
pub enum TransportError {
    /// The request could not be sent or the response not received
    #[error("HTTP request failed: {0}")]
    Request(String),
    /// The request timed out
    #[error("HTTP request timed out")]
    Timeout,
    /// The caller cancelled the request
    #[error("HTTP request was cancelled")]
    Cancelled,
    /// The link is misconfigured
    #[error("Invalid link configuration: {0}")]
    Config(String),
}

/// Sends an [`HttpRequest`] and returns the [`HttpResponse`].
#[async_trait]
pub trait HttpTransport: Send + Sync {
    /// Send `request` to `url` (absolute, with path and query already applied).
    async fn send(&self, url: &str, request: HttpRequest) -> Result<HttpResponse, TransportError>;
}

/// Send through `transport`, applying the link's default headers and timeout
/// and giving up early when the caller's signal fires.
pub(crate) async fn send_with_limits<T: HttpTransport + ?Sized>(
    transport: &T,
    config: &LinkConfig,
    mut request: HttpRequest,
) -> Result<HttpResponse, TransportError> {
    for (name, value) in &config.headers {
        if request.header(name).is_none() {
            request.headers.push((name.clone(), value.clone()));
        }
    }

    let url = format!("{}{}", config.base_url(), request.path_and_query());
    let signal = request.signal.clone();
    trace!(method = %request.method, url = %url, "Sending request");

    let send = async {
        match config.timeout {
            Some(timeout) => tokio::time::timeout(timeout, transport.send(&url, request))
                .await
                .unwrap_or(Err(TransportError::Timeout)),
            None => transport.send(&url, request).await,
        }
    };

    let result = match signal {
        Some(signal) => {
            if signal.is_cancelled() {
                return Err(TransportError::Cancelled);
            }
            tokio::select! {
                result = send => result,
                _ = signal.cancelled() => Err(TransportError::Cancelled),
            }
        }
        None => send.await,
    };

    if let Err(e) = &result {
        warn!(url = %url, error = %e, "Transport failed");
    }
    result
}
