//! JSON envelopes exchanged with the upload endpoint.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::{AttachmentDescriptor, AttachmentType};

use super::{UploadError, UploadSession};

/// Body of the session-creation request.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateUploadSessionRequest<'a> {
    pub attachment_info: AttachmentInfo<'a>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AttachmentInfo<'a> {
    pub attachment_type: AttachmentType,
    pub content_type: &'a str,
    pub name: &'a str,
    pub size: u64,
}

impl<'a> From<&'a AttachmentDescriptor> for CreateUploadSessionRequest<'a> {
    fn from(d: &'a AttachmentDescriptor) -> Self {
        Self {
            attachment_info: AttachmentInfo {
                attachment_type: d.attachment_type(),
                content_type: d.content_type(),
                name: d.name(),
                size: d.size_bytes(),
            },
        }
    }
}

/// Successful session-creation response.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadSessionBody {
    pub upload_url: String,
    pub expiration_date_time: DateTime<Utc>,
    #[serde(default)]
    pub next_expected_ranges: Vec<String>,
}

impl From<UploadSessionBody> for UploadSession {
    fn from(b: UploadSessionBody) -> Self {
        UploadSession::new(b.upload_url, b.expiration_date_time, b.next_expected_ranges)
    }
}

/// Body of an "incomplete" chunk response.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChunkProgressBody {
    #[serde(default)]
    pub next_expected_ranges: Vec<String>,
    #[serde(default)]
    pub expiration_date_time: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize)]
pub struct ErrorEnvelope {
    pub error: ApiError,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiError {
    pub code: String,
    pub message: String,
    #[serde(default)]
    pub inner_error: Option<serde_json::Value>,
}

impl From<ApiError> for UploadError {
    fn from(e: ApiError) -> Self {
        UploadError::Server {
            code: e.code,
            message: e.message,
        }
    }
}

/// Extract a well-formed `{"error": {...}}` envelope, if the body is one.
pub fn parse_error_envelope(body: &str) -> Option<ApiError> {
    serde_json::from_str::<ErrorEnvelope>(body)
        .ok()
        .map(|env| env.error)
}
