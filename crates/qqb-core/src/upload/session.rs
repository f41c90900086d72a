use chrono::{DateTime, Utc};

/// A server-side upload in progress.
///
/// Owned by exactly one transfer loop. Each server reply produces a new value
/// via [`UploadSession::advance`]; the old one is dropped.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UploadSession {
    upload_url: String,
    expiration_time: DateTime<Utc>,
    next_expected_ranges: Vec<String>,
}

impl UploadSession {
    pub fn new(
        upload_url: impl Into<String>,
        expiration_time: DateTime<Utc>,
        next_expected_ranges: Vec<String>,
    ) -> Self {
        Self {
            upload_url: upload_url.into(),
            expiration_time,
            next_expected_ranges,
        }
    }

    pub fn upload_url(&self) -> &str {
        &self.upload_url
    }

    pub fn expiration_time(&self) -> DateTime<Utc> {
        self.expiration_time
    }

    pub fn next_expected_ranges(&self) -> &[String] {
        &self.next_expected_ranges
    }

    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now >= self.expiration_time
    }

    /// Successor session after the server accepted a chunk.
    ///
    /// The upload URL never changes; the expiration only moves when the
    /// server sent a new one.
    pub fn advance(
        self,
        next_expected_ranges: Vec<String>,
        expiration_time: Option<DateTime<Utc>>,
    ) -> Self {
        Self {
            upload_url: self.upload_url,
            expiration_time: expiration_time.unwrap_or(self.expiration_time),
            next_expected_ranges,
        }
    }
}
