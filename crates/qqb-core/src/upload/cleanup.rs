use std::time::Duration;

use crate::ports::SessionAborter;

use super::with_timeout;

/// Best-effort delete of a remote upload session.
///
/// Never fails: the caller is already reporting another error, and a failed
/// abort only means the server keeps the session until it expires. Single
/// attempt, no retry.
pub async fn abort_session(
    aborter: &dyn SessionAborter,
    upload_url: &str,
    timeout: Option<Duration>,
) {
    match with_timeout(timeout, "session abort", aborter.abort_session(upload_url)).await {
        Ok(()) => tracing::debug!(upload_url, "upload session aborted"),
        Err(e) => tracing::warn!(upload_url, error = %e, "failed to abort upload session"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::upload::UploadError;
    use async_trait::async_trait;
    use std::sync::Mutex;

    #[derive(Default)]
    struct FakeAborter {
        calls: Mutex<Vec<String>>,
        fail: bool,
        hang: bool,
    }

    #[async_trait]
    impl SessionAborter for FakeAborter {
        async fn abort_session(&self, upload_url: &str) -> Result<(), UploadError> {
            self.calls.lock().unwrap().push(upload_url.to_string());
            if self.hang {
                tokio::time::sleep(Duration::from_secs(3600)).await;
            }
            if self.fail {
                return Err(UploadError::Transport("connection reset".to_string()));
            }
            Ok(())
        }
    }

    #[tokio::test]
    async fn abort_failures_are_swallowed() {
        let aborter = FakeAborter {
            fail: true,
            ..Default::default()
        };
        abort_session(&aborter, "https://up/1", None).await;
        assert_eq!(*aborter.calls.lock().unwrap(), vec!["https://up/1".to_string()]);
    }

    #[tokio::test(start_paused = true)]
    async fn hung_abort_is_bounded_by_timeout() {
        let aborter = FakeAborter {
            hang: true,
            ..Default::default()
        };
        abort_session(&aborter, "https://up/2", Some(Duration::from_secs(5))).await;
        assert_eq!(aborter.calls.lock().unwrap().len(), 1);
    }
}
