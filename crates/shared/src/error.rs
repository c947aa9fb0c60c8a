use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScanErrorKind {
    FileRead,
    ImageDecode,
    Internal,
}

#[derive(Debug, Clone, Serialize, Deserialize, Error)]
#[error("{kind:?}: {message}")]
pub struct ScanError {
    pub kind: ScanErrorKind,
    pub message: String,
}

impl ScanError {
    pub fn new(kind: ScanErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn file_read(message: impl Into<String>) -> Self {
        Self::new(ScanErrorKind::FileRead, message)
    }

    pub fn image_decode(message: impl Into<String>) -> Self {
        Self::new(ScanErrorKind::ImageDecode, message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ScanErrorKind::Internal, message)
    }
}
