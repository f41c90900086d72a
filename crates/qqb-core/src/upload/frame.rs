use std::{io::SeekFrom, path::Path};

use bytes::Bytes;
use tokio::{
    fs::File,
    io::{AsyncReadExt, AsyncSeekExt},
};

use super::{ChunkBounds, UploadError};

/// Octet-stream marker sent with every chunk.
pub const CHUNK_CONTENT_TYPE: &str = "application/octet-stream";

/// One chunk ready to go on the wire.
///
/// `payload` is reference-counted, so handing it to an HTTP body does not
/// copy the chunk.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ChunkFrame {
    pub offset: u64,
    pub length: u64,
    pub total_size: u64,
    pub payload: Bytes,
}

impl ChunkFrame {
    pub fn new(bounds: ChunkBounds, total_size: u64, payload: Bytes) -> Self {
        Self {
            offset: bounds.offset,
            length: bounds.length,
            total_size,
            payload,
        }
    }

    /// `Content-Range` header value, e.g. `bytes 0-1023/4096`.
    pub fn content_range(&self) -> String {
        format!(
            "bytes {}-{}/{}",
            self.offset,
            self.offset + self.length - 1,
            self.total_size
        )
    }

    /// `Content-Length` header value.
    pub fn content_length(&self) -> String {
        self.length.to_string()
    }
}

/// Read-only handle on the file being uploaded.
#[derive(Debug)]
pub struct ChunkSource {
    file: File,
}

impl ChunkSource {
    pub async fn open(path: &Path) -> Result<Self, UploadError> {
        let file = File::open(path)
            .await
            .map_err(|e| UploadError::LocalIo(format!("cannot open {}: {e}", path.display())))?;
        Ok(Self { file })
    }

    /// Read exactly the bytes of `bounds`. A short file is an error, never a
    /// short chunk.
    pub async fn read(&mut self, bounds: ChunkBounds) -> Result<Vec<u8>, UploadError> {
        let len = usize::try_from(bounds.length).map_err(|_| {
            UploadError::LocalIo(format!("chunk of {} bytes is too large", bounds.length))
        })?;

        self.file
            .seek(SeekFrom::Start(bounds.offset))
            .await
            .map_err(|e| UploadError::LocalIo(format!("seek to {} failed: {e}", bounds.offset)))?;

        let mut buf = vec![0u8; len];
        self.file.read_exact(&mut buf).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::UnexpectedEof {
                UploadError::LocalIo(format!(
                    "short read: file ends before byte {}",
                    bounds.last_byte()
                ))
            } else {
                UploadError::LocalIo(format!("read at {} failed: {e}", bounds.offset))
            }
        })?;
        Ok(buf)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn temp_file(bytes: &[u8]) -> tempfile::NamedTempFile {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        f.write_all(bytes).unwrap();
        f.flush().unwrap();
        f
    }

    #[test]
    fn frame_headers() {
        let f = ChunkFrame::new(ChunkBounds { offset: 1048576, length: 1048576 }, 3145728, Bytes::new());
        assert_eq!(f.content_range(), "bytes 1048576-2097151/3145728");
        assert_eq!(f.content_length(), "1048576");
    }

    #[test]
    fn payload_handoff_shares_the_buffer() {
        let f = ChunkFrame::new(
            ChunkBounds { offset: 0, length: 4 },
            4,
            Bytes::from(vec![1u8, 2, 3, 4]),
        );
        let body = f.payload.clone();
        assert_eq!(body.as_ptr(), f.payload.as_ptr());
        assert_eq!(&body[..], &[1, 2, 3, 4]);
    }

    #[tokio::test]
    async fn reads_exact_window() {
        let data: Vec<u8> = (0..=255u8).collect();
        let tmp = temp_file(&data);
        let mut src = ChunkSource::open(tmp.path()).await.unwrap();

        let chunk = src.read(ChunkBounds { offset: 10, length: 5 }).await.unwrap();
        assert_eq!(chunk, vec![10, 11, 12, 13, 14]);

        // Seeking backwards works too.
        let chunk = src.read(ChunkBounds { offset: 0, length: 2 }).await.unwrap();
        assert_eq!(chunk, vec![0, 1]);
    }

    #[tokio::test]
    async fn truncated_file_is_a_local_io_error() {
        let tmp = temp_file(b"abc");
        let mut src = ChunkSource::open(tmp.path()).await.unwrap();
        let err = src.read(ChunkBounds { offset: 1, length: 10 }).await.unwrap_err();
        assert!(matches!(err, UploadError::LocalIo(m) if m.contains("short read")));
    }

    #[tokio::test]
    async fn missing_file_is_a_local_io_error() {
        let err = ChunkSource::open(Path::new("/nonexistent/qqb-upload-source"))
            .await
            .unwrap_err();
        assert!(matches!(err, UploadError::LocalIo(_)));
    }
}
