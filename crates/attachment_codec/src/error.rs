use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum EncodingError {
    #[error("I/O error while {operation} at {path}: {source}")]
    Io {
        operation: &'static str,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{name} is {size} bytes; attachments are limited to {limit} bytes")]
    TooLarge { name: String, size: u64, limit: u64 },

    #[error("{path} has no usable file name")]
    MissingFileName { path: PathBuf },

    #[error("attachment {name} does not carry valid base64 data: {source}")]
    Decode {
        name: String,
        #[source]
        source: base64::DecodeError,
    },
}

impl EncodingError {
    #[must_use]
    pub fn io(operation: &'static str, path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            operation,
            path: path.into(),
            source,
        }
    }
}
