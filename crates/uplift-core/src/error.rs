use thiserror::Error;

/// Errors produced by the playground core.
#[derive(Debug, Error)]
pub enum PlaygroundError {
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The backend answered with a non-success status. `body` is kept verbatim
    /// so the structured `detail` can be extracted later.
    #[error("backend responded with {status}: {body}")]
    Backend { status: u16, body: String },

    #[error("invalid remote fetch allow pattern {pattern:?}: {source}")]
    InvalidAllowPattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },

    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("storage error: {0}")]
    Storage(String),
}

pub type Result<T> = std::result::Result<T, PlaygroundError>;
