use thiserror::Error;

/// Failure to obtain a document from its source.
///
/// Always recovered by the loader through fallback content.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("Request failed: {0}")]
    Transport(String),

    #[error("Server responded with status {0}")]
    Status(u16),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid document identifier: {0}")]
    InvalidId(String),
}

/// Failure while turning document text into display lines.
#[derive(Debug, Error)]
pub enum RenderError {
    #[error("Document too large ({size} bytes, maximum is {max} bytes)")]
    TooLarge { size: usize, max: usize },

    #[error("Renderer crashed: {0}")]
    Panicked(String),
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid JSON in state file: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Could not determine state file location")]
    NoLocation,
}
