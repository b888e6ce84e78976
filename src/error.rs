pub type MuralResult<T> = Result<T, MuralError>;

#[derive(thiserror::Error, Debug)]
pub enum MuralError {
    #[error("invalid image: {0}")]
    InvalidImage(String),

    #[error("processing unavailable: {0}")]
    ProcessingUnavailable(String),

    #[error("unsupported media type: {0}")]
    UnsupportedMediaType(String),

    #[error("missing required field: {0}")]
    RequiredFieldMissing(String),

    #[error("upload failed: {0}")]
    UploadFailed(String),

    #[error("persist failed: {0}")]
    PersistFailed(String),

    // Intentionally carries no detail: surfaced verbatim to the operator UI.
    #[error("unauthorized")]
    Unauthorized,

    #[error("invalid moderation target: {0}")]
    InvalidTarget(String),

    #[error("record not found: {0}")]
    RecordNotFound(String),

    #[error("validation error: {0}")]
    Validation(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl MuralError {
    pub fn invalid_image(msg: impl Into<String>) -> Self {
        Self::InvalidImage(msg.into())
    }

    pub fn processing_unavailable(msg: impl Into<String>) -> Self {
        Self::ProcessingUnavailable(msg.into())
    }

    pub fn unsupported_media_type(msg: impl Into<String>) -> Self {
        Self::UnsupportedMediaType(msg.into())
    }

    pub fn required_field(msg: impl Into<String>) -> Self {
        Self::RequiredFieldMissing(msg.into())
    }

    pub fn upload_failed(msg: impl Into<String>) -> Self {
        Self::UploadFailed(msg.into())
    }

    pub fn persist_failed(msg: impl Into<String>) -> Self {
        Self::PersistFailed(msg.into())
    }

    pub fn invalid_target(msg: impl Into<String>) -> Self {
        Self::InvalidTarget(msg.into())
    }

    pub fn record_not_found(id: impl Into<String>) -> Self {
        Self::RecordNotFound(id.into())
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }
}
