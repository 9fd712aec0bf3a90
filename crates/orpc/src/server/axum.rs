//! axum integration
//!
//! ```rust,ignore
//! let handlers = Handlers::new()
//!     .with(JsonHandler::with_config(router, HandlerConfig::new().with_prefix("/rpc"))?)
//!     .with(ContractHandler::with_config(HandlerConfig::new().with_prefix("/api"))?.contract("planet.find", find));
//!
//! let app = axum::Router::new().merge(rpc_service(handlers, Context::new(), 1024 * 1024));
//! ```

use super::RequestHandler;
use crate::http::{HttpRequest, HttpResponse};
use crate::signal::CancellationSignal;
use crate::{Context, RpcError};
use axum::body::Body;
use axum::extract::Request;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use std::sync::Arc;
use tracing::{debug, warn};

/// Cancels the request signal when the serving future goes away, which is
/// what happens when the client disconnects.
struct CancelOnDrop(CancellationSignal);

impl Drop for CancelOnDrop {
    fn drop(&mut self) {
        self.0.cancel();
    }
}

/// Convert an axum request, buffering at most `max_body_size` bytes.
///
/// # Errors
///
/// `PAYLOAD_TOO_LARGE` when the body is larger than `max_body_size` or cannot
/// be read.
pub async fn into_http_request(request: Request, max_body_size: usize) -> Result<HttpRequest, RpcError> {
    let (parts, body) = request.into_parts();
    let body = axum::body::to_bytes(body, max_body_size).await.map_err(|e| {
        RpcError::payload_too_large(format!("Request body exceeds {} bytes", max_body_size))
            .with_cause(e.to_string())
    })?;

    let path_and_query = parts.uri.path_and_query().map(|pq| pq.as_str()).unwrap_or("/");
    let mut request = HttpRequest::new(parts.method.as_str(), path_and_query).with_body(body.to_vec());
    for (name, value) in &parts.headers {
        match value.to_str() {
            Ok(value) => request = request.with_header(name.as_str(), value),
            Err(_) => debug!(header = %name, "Skipping non-text header"),
        }
    }
    Ok(request)
}

/// Convert a handler response into an axum response.
pub fn into_axum_response(response: HttpResponse) -> Response {
    let status = StatusCode::from_u16(response.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    let mut builder = Response::builder().status(status);
    for (name, value) in &response.headers {
        builder = builder.header(name.as_str(), value.as_str());
    }
    builder.body(Body::from(response.body)).unwrap_or_else(|e| {
        warn!(error = %e, "Failed to build response");
        StatusCode::INTERNAL_SERVER_ERROR.into_response()
    })
}

async fn serve(handler: &dyn RequestHandler, context: Context, request: Request, max_body_size: usize) -> Response {
    let request = match into_http_request(request, max_body_size).await {
        Ok(request) => request,
        Err(e) => return into_axum_response(HttpResponse::error(&e)),
    };

    let signal = CancellationSignal::new();
    let _guard = CancelOnDrop(signal.clone());
    let request = request.with_signal(Some(signal));
    let path = request.path.clone();

    match handler.handle(request, context).await.response {
        Some(response) => into_axum_response(response),
        None => {
            debug!(path = %path, "No handler matched");
            into_axum_response(HttpResponse::error(&RpcError::not_found("Not Found")))
        }
    }
}

/// An axum router answering every request through `handler`.
///
/// Each request starts from a clone of `context`; requests no handler claims
/// get a `NOT_FOUND` error response.
pub fn rpc_service(handler: impl RequestHandler + 'static, context: Context, max_body_size: usize) -> axum::Router {
    let handler: Arc<dyn RequestHandler> = Arc::new(handler);
    axum::Router::new().fallback(move |request: Request| {
        let handler = Arc::clone(&handler);
        let context = context.clone();
        async move { serve(handler.as_ref(), context, request, max_body_size).await }
    })
}
