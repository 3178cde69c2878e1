use std::path::PathBuf;
use thiserror::Error;

/// A file refused before it ever becomes an upload item.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("{name}: unsupported type ({media_type})")]
    UnsupportedType { name: String, media_type: String },
    #[error("{name}: too large ({size} bytes, limit {max} bytes)")]
    TooLarge { name: String, size: u64, max: u64 },
}

impl ValidationError {
    pub fn file_name(&self) -> &str {
        match self {
            ValidationError::UnsupportedType { name, .. } => name,
            ValidationError::TooLarge { name, .. } => name,
        }
    }

    pub fn reason(&self) -> &'static str {
        match self {
            ValidationError::UnsupportedType { .. } => "unsupported type",
            ValidationError::TooLarge { .. } => "too large",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransmissionError {
    #[error("failed to read file: {0}")]
    Read(String),
    #[error("failed to send upload request: {0}")]
    Request(String),
    #[error("upload failed with status: {0}")]
    Status(u16),
    #[error("failed to parse upload response: {0}")]
    Decode(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProcessingError {
    #[error("failed to reach processing endpoint: {0}")]
    Request(String),
    #[error("processing endpoint returned status: {0}")]
    Status(u16),
    #[error("failed to parse processing response: {0}")]
    Decode(String),
    #[error("processing endpoint returned no variations")]
    Empty,
    #[error("timeout")]
    Timeout,
}

#[derive(Debug, Error)]
pub enum IntakeError {
    #[error("failed to read metadata for {}: {source}", path.display())]
    Metadata {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("{} is not a file", .0.display())]
    NotAFile(PathBuf),
    #[error("invalid file name: {}", .0.display())]
    InvalidName(PathBuf),
}
