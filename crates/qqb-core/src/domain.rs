use serde::{Deserialize, Serialize};

use crate::upload::UploadError;

/// Largest attachment the remote service accepts through an upload session (25MB).
pub const MAX_ATTACHMENT_SIZE: u64 = 26_214_400;

/// Kind of attachment being uploaded.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AttachmentType {
    #[default]
    File,
    Item,
    Reference,
}

/// Metadata of a file about to be uploaded.
///
/// Built once by the caller and never mutated; the size declared here is the
/// `total` in every `Content-Range` header of the upload.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AttachmentDescriptor {
    name: String,
    content_type: String,
    size_bytes: u64,
    attachment_type: AttachmentType,
}

impl AttachmentDescriptor {
    pub fn new(
        name: impl Into<String>,
        content_type: impl Into<String>,
        size_bytes: u64,
    ) -> Result<Self, UploadError> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(UploadError::InvalidAttachment(
                "attachment name is empty".to_string(),
            ));
        }
        if size_bytes == 0 {
            return Err(UploadError::InvalidAttachment(
                "attachment is empty".to_string(),
            ));
        }
        if size_bytes > MAX_ATTACHMENT_SIZE {
            return Err(UploadError::InvalidAttachment(format!(
                "attachment is {size_bytes} bytes, limit is {MAX_ATTACHMENT_SIZE}"
            )));
        }

        Ok(Self {
            name,
            content_type: content_type.into(),
            size_bytes,
            attachment_type: AttachmentType::File,
        })
    }

    pub fn with_attachment_type(mut self, attachment_type: AttachmentType) -> Self {
        self.attachment_type = attachment_type;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn content_type(&self) -> &str {
        &self.content_type
    }

    pub fn size_bytes(&self) -> u64 {
        self.size_bytes
    }

    pub fn attachment_type(&self) -> AttachmentType {
        self.attachment_type
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_empty_and_oversized_attachments() {
        assert!(matches!(
            AttachmentDescriptor::new("a.bin", "application/octet-stream", 0),
            Err(UploadError::InvalidAttachment(_))
        ));
        assert!(matches!(
            AttachmentDescriptor::new("a.bin", "application/octet-stream", MAX_ATTACHMENT_SIZE + 1),
            Err(UploadError::InvalidAttachment(_))
        ));
        assert!(matches!(
            AttachmentDescriptor::new("  ", "application/octet-stream", 10),
            Err(UploadError::InvalidAttachment(_))
        ));
    }

    #[test]
    fn accepts_the_size_limit_itself() {
        let d = AttachmentDescriptor::new("big.zip", "application/zip", MAX_ATTACHMENT_SIZE)
            .unwrap()
            .with_attachment_type(AttachmentType::Reference);
        assert_eq!(d.size_bytes(), MAX_ATTACHMENT_SIZE);
        assert_eq!(d.attachment_type(), AttachmentType::Reference);
    }
}
