//! Single-file resumable upload driver (§4.G steps 1-5).
//!
//! The chunk loop within one file is sequential; concurrency across files is
//! the batch executor's concern ([`crate::batch`]).

use std::path::{Path, PathBuf};
use std::time::Duration;

use bytes::Bytes;
use reqwest::{Client as HttpClient, StatusCode, Url};
use tokio::fs::File;
use tokio::io::{AsyncReadExt, AsyncSeekExt, SeekFrom};
use tus::config::RetryConfig;
use tus::{
    CT_OFFSET_OCTET_STREAM, H_TUS_RESUMABLE, H_UPLOAD_LENGTH, H_UPLOAD_METADATA, H_UPLOAD_OFFSET,
    TUS_VERSION,
};

use crate::checksum::{encode_upload_metadata, sha256_hex};
use crate::error::{ClientError, ClientResult};
use crate::fingerprint::fingerprint;
use crate::location::LocationStore;

#[derive(Clone, Debug)]
pub struct UploaderConfig {
    /// Bytes read and PATCHed per request (typical 3 MiB).
    pub chunk_size: usize,
    pub retry: RetryConfig,
}

impl Default for UploaderConfig {
    fn default() -> Self {
        Self {
            chunk_size: 3 * 1024 * 1024,
            retry: RetryConfig::default(),
        }
    }
}

/// Outcome of one file's upload attempt, reported by the batch executor.
#[derive(Clone, Debug)]
pub struct UploadOutcome {
    pub path: PathBuf,
    pub upload_url: Url,
    pub total_size: u64,
}

pub struct Uploader {
    http: HttpClient,
    server_base: Url,
    location: std::sync::Arc<dyn LocationStore>,
    config: UploaderConfig,
}

impl Uploader {
    pub fn new(
        server_base: Url,
        location: std::sync::Arc<dyn LocationStore>,
        config: UploaderConfig,
    ) -> Self {
        Self {
            http: HttpClient::new(),
            server_base,
            location,
            config,
        }
    }

    /// Runs the full algorithm for one local file: checksum, resume-or-create,
    /// chunked APPEND loop, fingerprint cleanup on success.
    pub async fn upload_file(&self, path: &Path) -> ClientResult<UploadOutcome> {
        let declared_size = tokio::fs::metadata(path)
            .await
            .map_err(|e| ClientError::FileIO(e.to_string()))?
            .len();
        let checksum = sha256_hex(path).await?;
        let fp = fingerprint(path, declared_size);

        let filename = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();

        let (mut upload_url, mut offset) = self
            .resume_or_create(&fp, &filename, declared_size, &checksum)
            .await?;

        while offset < declared_size {
            offset = self
                .append_chunk_with_retry(&mut upload_url, path, offset, declared_size)
                .await?;
        }

        let _ = self.location.remove(&fp).await;

        Ok(UploadOutcome {
            path: path.to_path_buf(),
            upload_url,
            total_size: declared_size,
        })
    }

    /// §4.G step 2-3: consult store B, INSPECT if a URL is cached, else CREATE.
    async fn resume_or_create(
        &self,
        fp: &str,
        filename: &str,
        declared_size: u64,
        checksum: &str,
    ) -> ClientResult<(Url, u64)> {
        if let Some(url) = self.location.get(fp).await? {
            match self.inspect(&url).await {
                Ok(offset) if offset < declared_size => return Ok((url, offset)),
                Ok(_) => {
                    // already fully transferred from this client's point of view
                    return Ok((url, declared_size));
                }
                Err(_) => {
                    // 404 or parse error: treat as new below
                }
            }
        }

        let url = self.create(filename, declared_size, checksum).await?;
        self.location.put(fp, url.as_str()).await?;
        Ok((url, 0))
    }

    async fn create(&self, filename: &str, declared_size: u64, checksum: &str) -> ClientResult<Url> {
        let metadata_header = encode_upload_metadata(filename, checksum);
        let response = self
            .http
            .post(self.server_base.clone())
            .header(H_TUS_RESUMABLE, TUS_VERSION)
            .header(H_UPLOAD_LENGTH, declared_size.to_string())
            .header(H_UPLOAD_METADATA, metadata_header)
            .send()
            .await?;

        if response.status() != StatusCode::CREATED {
            return Err(ClientError::ServerStatus(response.status()));
        }
        let location = response
            .headers()
            .get(reqwest::header::LOCATION)
            .and_then(|v| v.to_str().ok())
            .ok_or(ClientError::MissingHeader("Location"))?;
        Url::parse(location).map_err(|_| ClientError::InvalidHeader("Location"))
    }

    /// HEAD/INSPECT. Returns the server offset, or an error (including 404)
    /// for the caller to treat as "no usable URL".
    async fn inspect(&self, url: &Url) -> ClientResult<u64> {
        let response = self
            .http
            .head(url.clone())
            .header(H_TUS_RESUMABLE, TUS_VERSION)
            .send()
            .await?;
        if response.status() != StatusCode::OK {
            return Err(ClientError::ServerStatus(response.status()));
        }
        let offset = response
            .headers()
            .get(H_UPLOAD_OFFSET)
            .and_then(|v| v.to_str().ok())
            .ok_or(ClientError::MissingHeader("Upload-Offset"))?;
        offset
            .parse::<u64>()
            .map_err(|_| ClientError::InvalidHeader("Upload-Offset"))
    }

    /// One chunk, retried per §4.G's retry policy. A 409 (offset drift) is
    /// resolved by re-INSPECTing rather than resubmitting the same bytes.
    async fn append_chunk_with_retry(
        &self,
        url: &mut Url,
        path: &Path,
        mut offset: u64,
        total_size: u64,
    ) -> ClientResult<u64> {
        let retry = &self.config.retry;
        let mut delay = Duration::from_millis(retry.initial_delay_ms);
        let mut attempt = 0;

        loop {
            attempt += 1;
            let to_read = self.config.chunk_size.min((total_size - offset) as usize);
            let chunk = read_chunk(path, offset, to_read).await?;

            let response = self
                .http
                .patch(url.clone())
                .header(H_TUS_RESUMABLE, TUS_VERSION)
                .header(reqwest::header::CONTENT_TYPE, CT_OFFSET_OCTET_STREAM)
                .header(H_UPLOAD_OFFSET, offset.to_string())
                .body(chunk)
                .send()
                .await;

            match response {
                Ok(response) if response.status() == StatusCode::NO_CONTENT => {
                    let new_offset = response
                        .headers()
                        .get(H_UPLOAD_OFFSET)
                        .and_then(|v| v.to_str().ok())
                        .and_then(|v| v.parse::<u64>().ok())
                        .unwrap_or(offset + to_read as u64);
                    tracing::info!(%url, attempt, new_offset, "chunk accepted");
                    return Ok(new_offset);
                }
                Ok(response) if response.status() == StatusCode::CONFLICT => {
                    // offset drift: consult server state instead of resubmitting
                    offset = self.inspect(url).await?;
                    if attempt >= retry.max_attempts {
                        return Err(ClientError::RetriesExhausted);
                    }
                }
                Ok(response) => {
                    tracing::warn!(%url, attempt, status = %response.status(), "chunk rejected");
                    if attempt >= retry.max_attempts {
                        return Err(ClientError::ServerStatus(response.status()));
                    }
                }
                Err(err) => {
                    tracing::warn!(%url, attempt, error = %err, "chunk transport error");
                    if attempt >= retry.max_attempts {
                        return Err(ClientError::Transport(err));
                    }
                }
            }

            tokio::time::sleep(delay).await;
            delay = Duration::from_millis(
                ((delay.as_millis() as f64) * retry.multiplier) as u64,
            )
            .min(Duration::from_millis(retry.max_delay_ms));
        }
    }
}

async fn read_chunk(path: &Path, offset: u64, len: usize) -> ClientResult<Bytes> {
    let mut file = File::open(path)
        .await
        .map_err(|e| ClientError::FileIO(e.to_string()))?;
    file.seek(SeekFrom::Start(offset))
        .await
        .map_err(|e| ClientError::FileIO(e.to_string()))?;
    let mut buf = vec![0u8; len];
    file.read_exact(&mut buf)
        .await
        .map_err(|e| ClientError::FileIO(e.to_string()))?;
    Ok(Bytes::from(buf))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_chunk_size_matches_spec_table() {
        assert_eq!(UploaderConfig::default().chunk_size, 3 * 1024 * 1024);
    }

    #[tokio::test]
    async fn read_chunk_reads_requested_range() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("f.bin");
        tokio::fs::write(&path, b"0123456789").await.unwrap();

        let chunk = read_chunk(&path, 3, 4).await.unwrap();
        assert_eq!(&chunk[..], b"3456");
    }
}
