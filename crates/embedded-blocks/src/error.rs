//! Error types for embedded-blocks

use std::path::PathBuf;

/// Result type for embedded-blocks operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that stop a scan
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Line {line} of {path} is not valid {encoding}")]
    Decode {
        path: PathBuf,
        line: usize,
        encoding: crate::Encoding,
    },

    #[error("Unknown text encoding: {name}")]
    UnknownEncoding { name: String },

    #[error("Multiple '{name}' blocks found.")]
    DuplicateBlock { name: String },
}

impl Error {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}
