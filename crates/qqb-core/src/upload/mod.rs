//! Resumable large-attachment upload.
//!
//! Flow: open a session, then loop `range -> read -> send -> interpret` until
//! the server reports the attachment as created. Any failure after the
//! session exists deletes it before the error is returned.

pub mod cleanup;
pub mod frame;
pub mod range;
pub mod session;
pub mod transfer;
pub mod wire;

use std::{future::Future, time::Duration};

pub use frame::ChunkFrame;
pub use range::{next_chunk_bounds, parse_range_hint, ChunkBounds, RangeSpec};
pub use session::UploadSession;
pub use transfer::{AttachmentUploader, UploadProgress};

/// Why an upload attempt failed.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum UploadError {
    #[error("transport error: {0}")]
    Transport(String),

    #[error("{code}: {message}")]
    Server { code: String, message: String },

    #[error("protocol violation: {0}")]
    ProtocolViolation(String),

    #[error("local i/o error: {0}")]
    LocalIo(String),

    #[error("invalid attachment: {0}")]
    InvalidAttachment(String),

    #[error("upload cancelled")]
    Cancelled,
}

impl UploadError {
    /// Short machine-readable code, suitable for `upload failed: <code> <message>`.
    pub fn code(&self) -> &str {
        match self {
            UploadError::Transport(_) => "TransportError",
            UploadError::Server { code, .. } => code,
            UploadError::ProtocolViolation(_) => "ProtocolViolation",
            UploadError::LocalIo(_) => "LocalIOError",
            UploadError::InvalidAttachment(_) => "InvalidAttachment",
            UploadError::Cancelled => "Cancelled",
        }
    }

    /// Human-readable detail without the code prefix.
    pub fn message(&self) -> String {
        match self {
            UploadError::Transport(m)
            | UploadError::ProtocolViolation(m)
            | UploadError::LocalIo(m)
            | UploadError::InvalidAttachment(m) => m.clone(),
            UploadError::Server { message, .. } => message.clone(),
            UploadError::Cancelled => "cancelled by caller".to_string(),
        }
    }
}

/// Terminal result of one upload attempt.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum UploadOutcome {
    Success { location: String },
    Failure { error: UploadError },
}

impl UploadOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, UploadOutcome::Success { .. })
    }

    pub fn into_result(self) -> Result<String, UploadError> {
        match self {
            UploadOutcome::Success { location } => Ok(location),
            UploadOutcome::Failure { error } => Err(error),
        }
    }
}

impl From<Result<String, UploadError>> for UploadOutcome {
    fn from(r: Result<String, UploadError>) -> Self {
        match r {
            Ok(location) => UploadOutcome::Success { location },
            Err(error) => UploadOutcome::Failure { error },
        }
    }
}

/// Per-upload knobs, constant for the duration of one attempt.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct UploadOptions {
    /// Upper bound on bytes sent per request when the server leaves it open.
    pub transfer_cap: u64,
    /// Applied to every remote call (open, send, abort).
    pub request_timeout: Option<Duration>,
    /// Chunk budget; `None` derives one from the attachment size.
    pub max_chunks: Option<usize>,
}

/// Extra iterations allowed beyond the ideal chunk count, for servers that
/// ask for smaller closed ranges than the cap.
const CHUNK_BUDGET_SLACK: usize = 16;

impl UploadOptions {
    pub fn chunk_budget(&self, total_size: u64) -> usize {
        if let Some(n) = self.max_chunks {
            return n;
        }
        let cap = self.transfer_cap.max(1);
        let ideal = total_size.div_ceil(cap);
        usize::try_from(ideal)
            .unwrap_or(usize::MAX)
            .saturating_add(CHUNK_BUDGET_SLACK)
    }
}

impl Default for UploadOptions {
    fn default() -> Self {
        Self {
            transfer_cap: 3 * 1024 * 1024,
            request_timeout: Some(Duration::from_secs(30)),
            max_chunks: None,
        }
    }
}

/// Run one remote call under the configured timeout. Expiry counts as a
/// transport failure.
pub(crate) async fn with_timeout<T>(
    timeout: Option<Duration>,
    what: &str,
    fut: impl Future<Output = Result<T, UploadError>>,
) -> Result<T, UploadError> {
    let Some(limit) = timeout else {
        return fut.await;
    };
    match tokio::time::timeout(limit, fut).await {
        Ok(r) => r,
        Err(_) => Err(UploadError::Transport(format!(
            "{what} timed out after {}ms",
            limit.as_millis()
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chunk_budget_derives_from_size_and_cap() {
        let opts = UploadOptions {
            transfer_cap: 1024,
            request_timeout: None,
            max_chunks: None,
        };
        assert_eq!(opts.chunk_budget(4096), 4 + CHUNK_BUDGET_SLACK);
        assert_eq!(opts.chunk_budget(4097), 5 + CHUNK_BUDGET_SLACK);

        let fixed = UploadOptions {
            max_chunks: Some(2),
            ..opts
        };
        assert_eq!(fixed.chunk_budget(1 << 20), 2);
    }

    #[test]
    fn server_errors_expose_code_verbatim() {
        let e = UploadError::Server {
            code: "ServiceBusy".to_string(),
            message: "retry later".to_string(),
        };
        assert_eq!(e.code(), "ServiceBusy");
        assert_eq!(e.message(), "retry later");
        assert_eq!(e.to_string(), "ServiceBusy: retry later");
    }
}
