use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::{
    domain::AttachmentDescriptor,
    upload::{ChunkFrame, UploadError, UploadSession},
};

/// What the remote side said about one accepted chunk.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ChunkReply {
    /// More bytes are needed; the hint drives the next frame.
    Incomplete {
        next_expected_ranges: Vec<String>,
        expiration_time: Option<DateTime<Utc>>,
    },
    /// The attachment is complete; `location` identifies the created resource.
    Created { location: String },
}

/// Port for opening a remote upload session.
#[async_trait]
pub trait SessionOpener: Send + Sync {
    async fn open_session(
        &self,
        descriptor: &AttachmentDescriptor,
    ) -> Result<UploadSession, UploadError>;
}

/// Port for sending one byte range of an upload.
///
/// Implementations map every non-continuation, non-completion response into
/// an `Err`; the loop never sees raw status codes.
#[async_trait]
pub trait ChunkSender: Send + Sync {
    async fn send_chunk(
        &self,
        upload_url: &str,
        frame: &ChunkFrame,
    ) -> Result<ChunkReply, UploadError>;
}

/// Port for deleting a remote upload session.
#[async_trait]
pub trait SessionAborter: Send + Sync {
    async fn abort_session(&self, upload_url: &str) -> Result<(), UploadError>;
}
