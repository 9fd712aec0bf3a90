//! Dynamic client
//!
//! A [`Client`] mirrors the shape of a remote router: [`Client::at`] appends a
//! path segment and returns a new client, and [`Client::call`] invokes the
//! procedure at the accumulated path through a [`Link`]. Nothing is checked
//! until call time.
//!
//! ```rust,ignore
//! let client = Client::new(JsonLink::new(LinkConfig::new("http://localhost:3000/rpc"), ReqwestTransport::new()));
//! let planets = client.at("planet");
//!
//! let mars: Planet = planets.at("find").call_typed(&json!({ "id": 4 })).await?;
//! ```

use crate::error::RpcError;
use crate::link::{Link, TransportError};
use crate::signal::CancellationSignal;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

/// Per-call client options.
#[derive(Debug, Clone, Default)]
pub struct ClientOptions {
    /// Cancellation signal forwarded to the transport
    pub signal: Option<CancellationSignal>,
}

impl ClientOptions {
    /// Options carrying `signal`
    pub fn with_signal(signal: CancellationSignal) -> Self {
        Self {
            signal: Some(signal),
        }
    }
}

/// Everything a client call can fail with.
#[derive(Debug, Error)]
pub enum ClientError {
    /// The server answered with a typed application error
    #[error(transparent)]
    Rpc(#[from] RpcError),
    /// The server answered with a failure status and a body that is not an error
    #[error("Request failed with status {status}")]
    Status {
        /// Response status
        status: u16,
        /// Response body as text
        body: String,
    },
    /// The request never got a response
    #[error(transparent)]
    Transport(#[from] TransportError),
    /// A body could not be encoded or decoded
    #[error("Failed to decode response: {0}")]
    Decode(#[from] serde_json::Error),
}

impl ClientError {
    /// The application error, if this is one
    pub fn as_rpc(&self) -> Option<&RpcError> {
        match self {
            Self::Rpc(error) => Some(error),
            _ => None,
        }
    }
}

/// Link-backed, navigable client.
#[derive(Clone)]
pub struct Client {
    link: Arc<dyn Link>,
    path: Vec<String>,
}

impl Client {
    /// Create a root client over `link`
    pub fn new(link: impl Link + 'static) -> Self {
        Self::from_arc(Arc::new(link))
    }

    /// Create a root client over a shared link
    pub fn from_arc(link: Arc<dyn Link>) -> Self {
        Self {
            link,
            path: Vec::new(),
        }
    }

    /// A client for the child `key`. `self` is unchanged.
    pub fn at(&self, key: impl Into<String>) -> Client {
        let mut path = self.path.clone();
        path.push(key.into());
        Client {
            link: Arc::clone(&self.link),
            path,
        }
    }

    /// Accumulated path
    pub fn path(&self) -> &[String] {
        &self.path
    }

    /// Call the procedure at this path with raw JSON.
    pub async fn call(
        &self,
        input: Option<Value>,
        options: ClientOptions,
    ) -> Result<Option<Value>, ClientError> {
        self.link.call(&self.path, input, options).await
    }

    /// Typed call with default options.
    ///
    /// A missing output decodes as `null`, so `()` and `Option<T>` work.
    pub async fn call_typed<I, O>(&self, input: &I) -> Result<O, ClientError>
    where
        I: Serialize + ?Sized,
        O: DeserializeOwned,
    {
        self.call_typed_with(input, ClientOptions::default()).await
    }

    /// Typed call with explicit options.
    pub async fn call_typed_with<I, O>(
        &self,
        input: &I,
        options: ClientOptions,
    ) -> Result<O, ClientError>
    where
        I: Serialize + ?Sized,
        O: DeserializeOwned,
    {
        let input = serde_json::to_value(input)?;
        let output = self.call(Some(input), options).await?;
        Ok(serde_json::from_value(output.unwrap_or(Value::Null))?)
    }
}

impl fmt::Debug for Client {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Client").field("path", &self.path).finish_non_exhaustive()
    }
}
