//! Client error type shared across the API, state, and panel layers.

/// Errors produced by platform client operations.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// The underlying HTTP client could not be constructed.
    #[error("HTTP client build failed: {0}")]
    HttpClientBuild(String),

    /// The HTTP request itself failed (connect, timeout, body read).
    #[error("request failed: {0}")]
    Request(String),

    /// The platform returned a non-success HTTP status with no envelope.
    #[error("unexpected HTTP status {status}")]
    Status { status: u16, body: String },

    /// The platform envelope carried a business error code.
    #[error("platform error {code}: {msg}")]
    Api { code: i64, msg: String },

    /// A response body could not be decoded.
    #[error("response decode failed: {0}")]
    Decode(String),

    /// A response was missing an expected field.
    #[error("missing expected field `{0}`")]
    MissingField(&'static str),

    /// The stream reported a server-side failure before ending.
    #[error("stream error: {0}")]
    Stream(String),

    /// A panel already has a send in flight.
    #[error("a request is already in flight for this panel")]
    RequestInFlight,

    /// Compare mode accepts one to four model columns.
    #[error("compare requires 1 to 4 model columns, got {count}")]
    InvalidCompareColumns { count: usize },

    /// Share-token cache I/O failed.
    #[error("share token cache: {0}")]
    Cache(#[from] std::io::Error),

    /// JSON (de)serialization failed outside the HTTP layer.
    #[error("invalid JSON payload: {0}")]
    Json(#[from] serde_json::Error),
}
