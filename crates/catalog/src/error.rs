use thiserror::Error;

use crate::RecordId;

/// Why a backend row could not become a [`crate::GeoRecord`].
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RecordError {
    #[error("row has no id")]
    MissingId,
    #[error("memory {0} is hidden")]
    Hidden(RecordId),
    #[error("memory {0} is deleted")]
    Deleted(RecordId),
    #[error("memory {0} has no coordinates")]
    MissingCoordinates(RecordId),
    #[error("memory {id} has invalid coordinates ({lng}, {lat})")]
    InvalidCoordinates { id: RecordId, lng: f64, lat: f64 },
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum UploadError {
    #[error("{file_name} is too large ({size} bytes, maximum {max})")]
    TooLarge {
        file_name: String,
        size: usize,
        max: usize,
    },
    #[error("{file_name} is not a valid image type ({content_type}); use JPEG, PNG, or HEIC")]
    UnsupportedType {
        file_name: String,
        content_type: String,
    },
    #[error("failed to decode {file_name}: {reason}")]
    Decode { file_name: String, reason: String },
    #[error("failed to encode {file_name}: {reason}")]
    Encode { file_name: String, reason: String },
    #[error("maximum {max} photos allowed")]
    LimitReached { max: usize },
    #[error("storage rejected {file_name}: {reason}")]
    Storage { file_name: String, reason: String },
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum StoreError {
    #[error("memory {0} not found")]
    NotFound(RecordId),
    #[error("backend unavailable: {0}")]
    Unavailable(String),
    #[error("backend payload corrupt: {0}")]
    Corrupt(String),
    #[error(transparent)]
    Upload(#[from] UploadError),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SessionError {
    #[error("session storage unavailable")]
    StorageUnavailable,
    #[error("session storage corrupt: {0}")]
    Corrupt(String),
    #[error("session storage error: {0}")]
    Io(String),
}
