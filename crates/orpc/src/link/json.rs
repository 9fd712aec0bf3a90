//! JSON/RPC link: `POST {base}/{path}` with a JSON body.

use super::{HttpTransport, Link, send_with_limits};
use crate::client::{ClientError, ClientOptions};
use crate::config::LinkConfig;
use crate::encoding::{encode_component, parse_emptyable_json, stringify_emptyable_json};
use crate::error::{RpcError, is_error_json, is_error_status};
use crate::http::{HttpRequest, HttpResponse};
use async_trait::async_trait;
use serde_json::Value;
use tracing::debug;

/// Link speaking the JSON/RPC profile over an [`HttpTransport`].
#[derive(Debug, Clone)]
pub struct JsonLink<T> {
    config: LinkConfig,
    transport: T,
}

impl<T: HttpTransport> JsonLink<T> {
    /// Create a link for `config` over `transport`
    pub fn new(config: LinkConfig, transport: T) -> Self {
        Self { config, transport }
    }

    /// The link configuration
    pub fn config(&self) -> &LinkConfig {
        &self.config
    }
}

/// Request path for a procedure: `/` followed by the encoded segments.
pub(crate) fn procedure_path(path: &[String]) -> String {
    let segments: Vec<String> = path.iter().map(|s| encode_component(s)).collect();
    format!("/{}", segments.join("/"))
}

/// Decode a response the way both HTTP links do.
///
/// An error status with an error-shaped body becomes [`ClientError::Rpc`];
/// any other failure status becomes [`ClientError::Status`].
pub(crate) fn decode_response(response: HttpResponse) -> Result<Option<Value>, ClientError> {
    let body = parse_emptyable_json(&response.body);

    if is_error_status(response.status)
        && let Ok(Some(json)) = &body
        && is_error_json(json)
    {
        let error: RpcError = serde_json::from_value(json.clone())?;
        debug!(code = %error.code(), status = error.status(), "Received RPC error");
        return Err(ClientError::Rpc(error));
    }

    if !response.is_success() {
        return Err(ClientError::Status {
            status: response.status,
            body: response.text(),
        });
    }

    Ok(body?)
}

#[async_trait]
impl<T: HttpTransport> Link for JsonLink<T> {
    async fn call(
        &self,
        path: &[String],
        input: Option<Value>,
        options: ClientOptions,
    ) -> Result<Option<Value>, ClientError> {
        let body = stringify_emptyable_json(input.as_ref())?;
        let request = HttpRequest::new("POST", &procedure_path(path))
            .with_header("content-type", "application/json")
            .with_body(body)
            .with_signal(options.signal);

        let response = send_with_limits(&self.transport, &self.config, request).await?;
        decode_response(response)
    }
}
