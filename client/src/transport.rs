//! Transport seam between panel controllers and the HTTP layer.
//!
//! Panels talk to the platform through the [`Backend`] trait so tests can
//! script stream bytes without a server; [`crate::api::ApiClient`] is the
//! production implementation.

use std::pin::Pin;
use std::sync::Arc;

use futures::Stream;
use serde_json::Value;

use crate::error::ClientError;

/// Raw body chunks from a streaming chat response.
pub type ByteStream = Pin<Box<dyn Stream<Item = Result<Vec<u8>, ClientError>> + Send>>;

/// A streaming chat request: endpoint path plus JSON body.
#[derive(Clone, Debug, PartialEq)]
pub struct StreamRequest {
    pub path: String,
    pub body: Value,
}

/// Backend operations a chat panel needs.
#[async_trait::async_trait]
pub trait Backend: Send + Sync {
    /// Persist panel form state before a run.
    async fn save_draft(&self, path: &str, body: &Value) -> Result<(), ClientError>;

    /// Open a streaming chat request and return its body chunks.
    async fn open_stream(&self, request: &StreamRequest) -> Result<ByteStream, ClientError>;
}

#[async_trait::async_trait]
impl<B: Backend + ?Sized> Backend for Arc<B> {
    async fn save_draft(&self, path: &str, body: &Value) -> Result<(), ClientError> {
        (**self).save_draft(path, body).await
    }

    async fn open_stream(&self, request: &StreamRequest) -> Result<ByteStream, ClientError> {
        (**self).open_stream(request).await
    }
}
