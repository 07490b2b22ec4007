//! Errors surfaced by the resumable upload driver (component G).

pub type ClientResult<T> = Result<T, ClientError>;

#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("could not read file: {0}")]
    FileIO(String),

    #[error("http transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("server rejected the upload with status {0}")]
    ServerStatus(reqwest::StatusCode),

    #[error("server response missing required header: {0}")]
    MissingHeader(&'static str),

    #[error("server response header was not valid: {0}")]
    InvalidHeader(&'static str),

    #[error("server reported offset {server}, client expected {client}")]
    OffsetDrift { server: u64, client: u64 },

    #[error("exhausted retry attempts for this chunk")]
    RetriesExhausted,
}
