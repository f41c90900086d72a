//! Microsoft Graph adapter (To Do task attachments).
//!
//! Implements the `qqb-core` upload ports over the Graph `createUploadSession`
//! endpoint. The `reqwest::Client` is owned by [`GraphClient`] and released
//! when the last clone is dropped, on every exit path.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{
    header::{CONTENT_LENGTH, CONTENT_RANGE, CONTENT_TYPE, LOCATION},
    StatusCode,
};

use qqb_core::{
    domain::AttachmentDescriptor,
    errors::Error,
    ports::{ChunkReply, ChunkSender, SessionAborter, SessionOpener},
    upload::{
        frame::CHUNK_CONTENT_TYPE,
        wire::{parse_error_envelope, ChunkProgressBody, CreateUploadSessionRequest, UploadSessionBody},
        ChunkFrame, UploadError, UploadSession,
    },
    Result,
};

#[derive(Clone, Debug)]
pub struct GraphClient {
    token: String,
    base_url: String,
    http: reqwest::Client,
}

impl GraphClient {
    pub fn new(
        token: impl Into<String>,
        base_url: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| Error::External(format!("graph http client build error: {e}")))?;
        Ok(Self::with_http(token, base_url, http))
    }

    /// Share an existing connection pool.
    pub fn with_http(
        token: impl Into<String>,
        base_url: impl Into<String>,
        http: reqwest::Client,
    ) -> Self {
        Self {
            token: token.into(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            http,
        }
    }

    /// Attachment endpoints of one To Do task.
    pub fn task_attachments(&self, tasklist_id: &str, task_id: &str) -> TaskAttachments {
        TaskAttachments {
            client: self.clone(),
            attachments_url: format!(
                "{}/me/todo/lists/{tasklist_id}/tasks/{task_id}/attachments",
                self.base_url
            ),
        }
    }
}

/// Upload ports for the attachments collection of one task.
#[derive(Clone, Debug)]
pub struct TaskAttachments {
    client: GraphClient,
    attachments_url: String,
}

impl TaskAttachments {
    pub fn attachments_url(&self) -> &str {
        &self.attachments_url
    }
}

#[async_trait]
impl SessionOpener for TaskAttachments {
    async fn open_session(
        &self,
        descriptor: &AttachmentDescriptor,
    ) -> std::result::Result<UploadSession, UploadError> {
        let resp = self
            .client
            .http
            .post(format!("{}/createUploadSession", self.attachments_url))
            .bearer_auth(&self.client.token)
            .json(&CreateUploadSessionRequest::from(descriptor))
            .send()
            .await
            .map_err(transport_error)?;

        let status = resp.status();
        let body = resp.text().await.map_err(transport_error)?;
        let session = session_from_response(status, &body)?;
        tracing::debug!(
            upload_url = session.upload_url(),
            expires = %session.expiration_time(),
            "graph upload session created"
        );
        Ok(session)
    }
}

#[async_trait]
impl ChunkSender for TaskAttachments {
    async fn send_chunk(
        &self,
        upload_url: &str,
        frame: &ChunkFrame,
    ) -> std::result::Result<ChunkReply, UploadError> {
        // The upload URL is pre-authenticated; no bearer token here.
        let resp = self
            .client
            .http
            .put(format!("{upload_url}/content"))
            .header(CONTENT_LENGTH, frame.content_length())
            .header(CONTENT_RANGE, frame.content_range())
            .header(CONTENT_TYPE, CHUNK_CONTENT_TYPE)
            .body(frame.payload.clone())
            .send()
            .await
            .map_err(transport_error)?;

        let status = resp.status();
        let location = resp
            .headers()
            .get(LOCATION)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        if status == StatusCode::CREATED {
            // Completion is carried by the Location header; the body is not read.
            return chunk_reply_from_response(status, location.as_deref(), "");
        }
        let body = resp.text().await.map_err(transport_error)?;
        chunk_reply_from_response(status, location.as_deref(), &body)
    }
}

#[async_trait]
impl SessionAborter for TaskAttachments {
    async fn abort_session(&self, upload_url: &str) -> std::result::Result<(), UploadError> {
        let resp = self
            .client
            .http
            .delete(upload_url)
            .send()
            .await
            .map_err(transport_error)?;
        tracing::debug!(status = %resp.status(), "graph upload session delete");
        Ok(())
    }
}

/// Interpret the `createUploadSession` response.
pub fn session_from_response(
    status: StatusCode,
    body: &str,
) -> std::result::Result<UploadSession, UploadError> {
    if let Some(api_error) = parse_error_envelope(body) {
        tracing::debug!(inner = ?api_error.inner_error, "graph error envelope");
        return Err(api_error.into());
    }
    if !status.is_success() {
        return Err(UploadError::ProtocolViolation(format!(
            "session open returned {status} without an error envelope: {}",
            snippet(body)
        )));
    }

    serde_json::from_str::<UploadSessionBody>(body)
        .map(UploadSession::from)
        .map_err(|e| {
            UploadError::ProtocolViolation(format!("invalid upload session body: {e}"))
        })
}

/// Interpret the response to one chunk `PUT`.
///
/// 200/202 continue, 201 completes, anything else is an error.
pub fn chunk_reply_from_response(
    status: StatusCode,
    location: Option<&str>,
    body: &str,
) -> std::result::Result<ChunkReply, UploadError> {
    match status {
        StatusCode::CREATED => match location.map(str::trim).filter(|l| !l.is_empty()) {
            Some(l) => Ok(ChunkReply::Created {
                location: l.to_string(),
            }),
            None => Err(UploadError::ProtocolViolation(
                "upload completed without a Location header".to_string(),
            )),
        },
        StatusCode::OK | StatusCode::ACCEPTED => {
            if let Some(api_error) = parse_error_envelope(body) {
                return Err(api_error.into());
            }
            let progress = serde_json::from_str::<ChunkProgressBody>(body).map_err(|e| {
                UploadError::ProtocolViolation(format!("invalid chunk progress body: {e}"))
            })?;
            Ok(ChunkReply::Incomplete {
                next_expected_ranges: progress.next_expected_ranges,
                expiration_time: progress.expiration_date_time,
            })
        }
        other => match parse_error_envelope(body) {
            Some(api_error) => {
                tracing::debug!(inner = ?api_error.inner_error, "graph error envelope");
                Err(api_error.into())
            }
            None => Err(UploadError::ProtocolViolation(format!(
                "chunk upload returned {other} without an error envelope: {}",
                snippet(body)
            ))),
        },
    }
}

fn transport_error(e: reqwest::Error) -> UploadError {
    if e.is_timeout() {
        UploadError::Transport(format!("graph request timed out: {e}"))
    } else {
        UploadError::Transport(format!("graph request error: {e}"))
    }
}

fn snippet(body: &str) -> String {
    body.chars().take(200).collect::<String>()
}
