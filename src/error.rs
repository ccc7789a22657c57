//! Error taxonomy for the API and storage layers.
//!
//! The UI layer works with `anyhow::Result`; everything below it returns one
//! of these typed errors so screens can tell an expired session apart from a
//! plain request failure.

/// Errors from talking to the backend.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// `HOSPUS_API_URL` was not configured.
    #[error("The API base URL is not configured. Set HOSPUS_API_URL and restart.")]
    MissingBaseUrl,

    /// The server answered 401. The session has already been cleared.
    #[error("Your session has expired. Please log in again.")]
    Unauthorized,

    #[error("Request failed (HTTP {status}){}", detail(.message))]
    Status { status: u16, message: String },

    #[error("Network error: {0}")]
    Network(String),

    #[error("Request timed out after {0} seconds")]
    Timeout(u64),

    /// The body did not match the canonical envelope for this endpoint.
    #[error("Unexpected response from {path}: {source}")]
    Decode {
        path: String,
        #[source]
        source: serde_json::Error,
    },

    /// A request body could not be serialized.
    #[error("Could not encode the request for {path}: {source}")]
    Encode {
        path: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Session store error: {0}")]
    Store(#[from] StoreError),
}

impl ApiError {
    /// Message suitable for a notice line.
    ///
    /// Status errors prefer the server's own message when it sent one.
    pub fn user_message(&self) -> String {
        match self {
            ApiError::Status { message, .. } if !message.is_empty() => message.clone(),
            other => other.to_string(),
        }
    }
}

fn detail(message: &str) -> String {
    if message.is_empty() {
        String::new()
    } else {
        format!(": {message}")
    }
}

/// Errors from the local session store.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Failed to create data directory {path}: {source}")]
    DataDir {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Session store lock poisoned")]
    Poisoned,
}
