//! SHA-256 file checksum and `Upload-Metadata` header encoding (§4.G step 1,
//! §6). Mirrors the engine's `UploadMetadata` parser in reverse.

use std::path::Path;

use base64::Engine;
use sha2::{Digest, Sha256};
use tokio::fs::File;
use tokio::io::AsyncReadExt;

use crate::error::{ClientError, ClientResult};

/// Hex-encoded SHA-256 digest of the file at `path`, read in fixed-size
/// chunks so a large upload doesn't have to fit in memory twice.
pub async fn sha256_hex(path: &Path) -> ClientResult<String> {
    let mut file = File::open(path)
        .await
        .map_err(|e| ClientError::FileIO(e.to_string()))?;
    let mut hasher = Sha256::new();
    let mut buf = vec![0u8; 256 * 1024];
    loop {
        let n = file
            .read(&mut buf)
            .await
            .map_err(|e| ClientError::FileIO(e.to_string()))?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }
    Ok(hex::encode(hasher.finalize()))
}

/// Encodes `{filename, checksum}` as an `Upload-Metadata` header value:
/// `key SP base64value` pairs joined by commas.
pub fn encode_upload_metadata(filename: &str, checksum_hex: &str) -> String {
    let enc = base64::engine::general_purpose::STANDARD;
    format!(
        "filename {},checksum {}",
        enc.encode(filename),
        enc.encode(checksum_hex)
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::AsyncWriteExt;

    #[tokio::test]
    async fn sha256_hex_matches_known_digest() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("a.txt");
        let mut f = tokio::fs::File::create(&path).await.unwrap();
        f.write_all(b"hello").await.unwrap();
        f.flush().await.unwrap();

        let digest = sha256_hex(&path).await.unwrap();
        assert_eq!(
            digest,
            "2cf24dba5fb0a30e26e83b2ac5b9e29e1b161e5c1fa7425e73043362938b9824"
        );
    }

    #[test]
    fn encode_upload_metadata_round_trips_through_base64() {
        let header = encode_upload_metadata("pic.png", "abc123");
        let enc = base64::engine::general_purpose::STANDARD;
        assert_eq!(
            header,
            format!("filename {},checksum {}", enc.encode("pic.png"), enc.encode("abc123"))
        );
    }
}
