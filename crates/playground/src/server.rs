//! Request plumbing in front of the orpc handlers

use crate::rpc::context::TOKEN_KEY;
use async_trait::async_trait;
use orpc::Context;
use orpc::http::HttpRequest;
use orpc::server::{HandleResult, RequestHandler};

/// Copies a bearer token from the `Authorization` header into the context
/// before delegating to `inner`.
pub struct BearerContext<H> {
    inner: H,
}

impl<H> BearerContext<H> {
    pub fn new(inner: H) -> Self {
        Self { inner }
    }
}

fn bearer_token(request: &HttpRequest) -> Option<&str> {
    let value = request.header("authorization")?;
    let (scheme, token) = value.split_once(' ')?;
    scheme.eq_ignore_ascii_case("bearer").then(|| token.trim())
}

#[async_trait]
impl<H: RequestHandler> RequestHandler for BearerContext<H> {
    async fn handle(&self, request: HttpRequest, context: Context) -> HandleResult {
        let context = match bearer_token(&request) {
            Some(token) => context.with(TOKEN_KEY, token.to_string()),
            None => context,
        };
        self.inner.handle(request, context).await
    }
}
