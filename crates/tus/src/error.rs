use salvo_core::http::StatusCode;

pub type TusResult<T> = Result<T, TusError>;

#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    #[error("missing tus-resumable")]
    MissingTusResumable,
    #[error("unsupported tus version: {0}")]
    UnsupportedTusVersion(String),
    #[error("missing header: {0}")]
    MissingHeader(&'static str),
    #[error("invalid integer header: {0}")]
    InvalidInt(&'static str),
    #[error("invalid content-type")]
    InvalidContentType,
    #[error("Upload-Length header required.")]
    InvalidLength,
    #[error(
        "Upload-Metadata is invalid. It MUST consist of one or more comma-separated key-value pairs. The key and value MUST be separated by a space."
    )]
    InvalidMetadata,
    #[error("Maximum size exceeded")]
    ErrMaxSizeExceeded,
    #[error("extension not allowed for file: {0}")]
    ExtensionRejected(String),
}

#[derive(Debug, thiserror::Error)]
pub enum TusError {
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    #[error("upload not found")]
    NotFound,

    #[error("offset mismatch: expected {expected}, got {got}")]
    OffsetMismatch { expected: u64, got: u64 },

    #[error("payload too large")]
    PayloadTooLarge,

    #[error("failed to generate upload id")]
    GenerateIdError,

    #[error("failed to generate upload url")]
    GenerateUploadURLError,

    #[error("failed to get file id")]
    FileIdError,

    #[error("file no longer exists")]
    FileNoLongerExists,

    #[error("staging storage error: {0}")]
    StorageIO(String),

    #[error("metadata store error: {0}")]
    MetadataStoreIO(String),

    #[error("object store error: {0}")]
    RemoteStoreIO(String),

    #[error("webhook delivery failed: {0}")]
    WebhookFailure(String),

    #[error("checksum mismatch")]
    IntegrityMismatch,

    #[error("internal: {0}")]
    Internal(String),
}

impl TusError {
    pub fn status(&self) -> StatusCode {
        match self {
            TusError::Protocol(ProtocolError::MissingTusResumable) => {
                StatusCode::PRECONDITION_FAILED
            }
            TusError::Protocol(ProtocolError::UnsupportedTusVersion(_)) => {
                StatusCode::PRECONDITION_FAILED
            }
            TusError::Protocol(ProtocolError::InvalidLength) => StatusCode::BAD_REQUEST,
            TusError::Protocol(ProtocolError::InvalidMetadata) => StatusCode::BAD_REQUEST,
            TusError::Protocol(ProtocolError::ErrMaxSizeExceeded) => {
                StatusCode::PAYLOAD_TOO_LARGE
            }
            TusError::Protocol(ProtocolError::InvalidContentType) => {
                StatusCode::UNSUPPORTED_MEDIA_TYPE
            }
            TusError::Protocol(ProtocolError::ExtensionRejected(_)) => {
                StatusCode::UNPROCESSABLE_ENTITY
            }
            TusError::Protocol(_) => StatusCode::BAD_REQUEST,

            TusError::FileNoLongerExists => StatusCode::GONE,
            TusError::FileIdError => StatusCode::BAD_REQUEST,
            TusError::NotFound => StatusCode::NOT_FOUND,
            TusError::OffsetMismatch { .. } => StatusCode::CONFLICT,
            TusError::PayloadTooLarge => StatusCode::PAYLOAD_TOO_LARGE,
            TusError::GenerateIdError => StatusCode::INTERNAL_SERVER_ERROR,
            TusError::GenerateUploadURLError => StatusCode::INTERNAL_SERVER_ERROR,
            TusError::StorageIO(_) => StatusCode::INTERNAL_SERVER_ERROR,
            TusError::MetadataStoreIO(_) => StatusCode::INTERNAL_SERVER_ERROR,
            TusError::RemoteStoreIO(_) => StatusCode::INTERNAL_SERVER_ERROR,
            TusError::WebhookFailure(_) => StatusCode::INTERNAL_SERVER_ERROR,
            TusError::IntegrityMismatch => StatusCode::INTERNAL_SERVER_ERROR,
            TusError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// True when the completion pipeline should mark the upload `failed`
    /// rather than merely recording a non-fatal verification/notification issue.
    pub fn is_pipeline_fatal(&self) -> bool {
        matches!(self, TusError::StorageIO(_) | TusError::RemoteStoreIO(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn protocol_error_display() {
        assert_eq!(
            ProtocolError::MissingTusResumable.to_string(),
            "missing tus-resumable"
        );
        assert_eq!(
            ProtocolError::UnsupportedTusVersion("2.0.0".to_string()).to_string(),
            "unsupported tus version: 2.0.0"
        );
        assert_eq!(
            ProtocolError::ErrMaxSizeExceeded.to_string(),
            "Maximum size exceeded"
        );
    }

    #[test]
    fn protocol_error_status_codes() {
        assert_eq!(
            TusError::Protocol(ProtocolError::MissingTusResumable).status(),
            StatusCode::PRECONDITION_FAILED
        );
        assert_eq!(
            TusError::Protocol(ProtocolError::ErrMaxSizeExceeded).status(),
            StatusCode::PAYLOAD_TOO_LARGE
        );
        assert_eq!(
            TusError::Protocol(ProtocolError::InvalidContentType).status(),
            StatusCode::UNSUPPORTED_MEDIA_TYPE
        );
        assert_eq!(
            TusError::Protocol(ProtocolError::ExtensionRejected("png".into())).status(),
            StatusCode::UNPROCESSABLE_ENTITY
        );
    }

    #[test]
    fn tus_error_status_codes() {
        assert_eq!(TusError::NotFound.status(), StatusCode::NOT_FOUND);
        assert_eq!(
            TusError::OffsetMismatch {
                expected: 10,
                got: 5
            }
            .status(),
            StatusCode::CONFLICT
        );
        assert_eq!(TusError::FileNoLongerExists.status(), StatusCode::GONE);
        assert_eq!(
            TusError::PayloadTooLarge.status(),
            StatusCode::PAYLOAD_TOO_LARGE
        );
        assert_eq!(
            TusError::IntegrityMismatch.status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn tus_error_from_protocol_error() {
        let protocol_error = ProtocolError::MissingTusResumable;
        let tus_error: TusError = protocol_error.into();
        assert!(matches!(
            tus_error,
            TusError::Protocol(ProtocolError::MissingTusResumable)
        ));
    }

    #[test]
    fn pipeline_fatal_classification() {
        assert!(TusError::StorageIO("disk full".into()).is_pipeline_fatal());
        assert!(TusError::RemoteStoreIO("timeout".into()).is_pipeline_fatal());
        assert!(!TusError::IntegrityMismatch.is_pipeline_fatal());
        assert!(!TusError::WebhookFailure("refused".into()).is_pipeline_fatal());
    }
}
