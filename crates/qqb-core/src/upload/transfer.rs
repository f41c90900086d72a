use std::{path::Path, sync::Arc};

use chrono::Utc;
use tokio_util::sync::CancellationToken;

use crate::{
    domain::AttachmentDescriptor,
    ports::{ChunkReply, ChunkSender, SessionAborter, SessionOpener},
};

use super::{
    cleanup::abort_session, frame::ChunkSource, next_chunk_bounds, with_timeout, ChunkFrame,
    UploadError, UploadOptions, UploadOutcome, UploadSession,
};

/// Progress after a chunk was accepted but the upload is not complete yet.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct UploadProgress {
    pub chunks_sent: usize,
    pub bytes_acknowledged: u64,
    pub total_size: u64,
}

/// Drives one large-attachment upload end to end.
///
/// Stateless between uploads: the session lives on the stack of
/// [`AttachmentUploader::upload`], so one uploader can serve many concurrent
/// uploads of different files.
#[derive(Clone)]
pub struct AttachmentUploader {
    opener: Arc<dyn SessionOpener>,
    sender: Arc<dyn ChunkSender>,
    aborter: Arc<dyn SessionAborter>,
    opts: UploadOptions,
}

impl AttachmentUploader {
    pub fn new(
        opener: Arc<dyn SessionOpener>,
        sender: Arc<dyn ChunkSender>,
        aborter: Arc<dyn SessionAborter>,
        opts: UploadOptions,
    ) -> Self {
        Self {
            opener,
            sender,
            aborter,
            opts,
        }
    }

    /// Convenience for adapters implementing all three ports.
    pub fn from_transport<T>(transport: Arc<T>, opts: UploadOptions) -> Self
    where
        T: SessionOpener + ChunkSender + SessionAborter + 'static,
    {
        Self::new(transport.clone(), transport.clone(), transport, opts)
    }

    pub fn options(&self) -> &UploadOptions {
        &self.opts
    }

    /// Upload `path` as `descriptor`.
    ///
    /// Returns exactly one outcome. Once a session exists, every failure
    /// (including cancellation) deletes it before returning; the error
    /// reported is always the one that stopped the transfer.
    pub async fn upload(
        &self,
        path: &Path,
        descriptor: &AttachmentDescriptor,
        cancel: &CancellationToken,
        on_progress: &mut (dyn FnMut(UploadProgress) + Send),
    ) -> UploadOutcome {
        if cancel.is_cancelled() {
            return UploadOutcome::Failure {
                error: UploadError::Cancelled,
            };
        }

        tracing::info!(
            name = descriptor.name(),
            size = descriptor.size_bytes(),
            "opening upload session"
        );
        let session = match with_timeout(
            self.opts.request_timeout,
            "session open",
            self.opener.open_session(descriptor),
        )
        .await
        {
            Ok(s) => s,
            Err(error) => {
                tracing::error!(name = descriptor.name(), %error, "could not open upload session");
                return UploadOutcome::Failure { error };
            }
        };

        let upload_url = session.upload_url().to_string();
        match self
            .transfer(session, path, descriptor, cancel, on_progress)
            .await
        {
            Ok(location) => {
                tracing::info!(name = descriptor.name(), %location, "upload complete");
                UploadOutcome::Success { location }
            }
            Err(error) => {
                tracing::error!(name = descriptor.name(), %error, "upload failed, aborting session");
                abort_session(self.aborter.as_ref(), &upload_url, self.opts.request_timeout).await;
                UploadOutcome::Failure { error }
            }
        }
    }

    async fn transfer(
        &self,
        session: UploadSession,
        path: &Path,
        descriptor: &AttachmentDescriptor,
        cancel: &CancellationToken,
        on_progress: &mut (dyn FnMut(UploadProgress) + Send),
    ) -> Result<String, UploadError> {
        let total_size = descriptor.size_bytes();
        let budget = self.opts.chunk_budget(total_size);
        let mut source = ChunkSource::open(path).await?;
        let mut session = session;
        let mut bytes_acknowledged = 0u64;

        for chunk_index in 0..budget {
            if cancel.is_cancelled() {
                return Err(UploadError::Cancelled);
            }
            if session.is_expired_at(Utc::now()) {
                return Err(UploadError::ProtocolViolation(format!(
                    "upload session expired at {}",
                    session.expiration_time()
                )));
            }

            let bounds = next_chunk_bounds(
                session.next_expected_ranges(),
                total_size,
                self.opts.transfer_cap,
            )?;
            let payload = source.read(bounds).await?;
            let frame = ChunkFrame::new(bounds, total_size, payload.into());

            tracing::debug!(
                chunk = chunk_index + 1,
                range = %frame.content_range(),
                "sending chunk"
            );
            let reply = with_timeout(
                self.opts.request_timeout,
                "chunk send",
                self.sender.send_chunk(session.upload_url(), &frame),
            )
            .await?;

            match reply {
                ChunkReply::Created { location } => return Ok(location),
                ChunkReply::Incomplete {
                    next_expected_ranges,
                    expiration_time,
                } => {
                    bytes_acknowledged += bounds.length;
                    on_progress(UploadProgress {
                        chunks_sent: chunk_index + 1,
                        bytes_acknowledged,
                        total_size,
                    });
                    session = session.advance(next_expected_ranges, expiration_time);
                }
            }
        }

        Err(UploadError::ProtocolViolation(format!(
            "server did not complete the upload after {budget} chunks"
        )))
    }
}
