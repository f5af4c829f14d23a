/// Errors raised by the sync bus and its HTTP/websocket clients.
#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    /// The HTTP request itself failed (network, DNS, TLS, etc.).
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The API answered with a non-2xx status.
    #[error("API error ({status}): {message}")]
    Status { status: u16, message: String },

    /// The response body did not have the expected shape.
    #[error("Failed to decode response: {0}")]
    Decode(String),

    #[error("WebSocket error: {0}")]
    WebSocket(String),

    /// The bus was torn down.
    #[error("Sync bus closed")]
    Closed,
}

pub type SyncResult<T> = Result<T, SyncError>;
