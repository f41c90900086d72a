use crate::upload::UploadError;

/// Core error type.
///
/// Adapter crates should map their specific errors into this type so the bot
/// can report failures consistently. Upload failures keep their own typed
/// taxonomy in [`UploadError`] and are wrapped here only at the edges.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("config error: {0}")]
    Config(String),

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("upload failed: {0}")]
    Upload(#[from] UploadError),

    #[error("external error: {0}")]
    External(String),
}

pub type Result<T> = std::result::Result<T, Error>;
