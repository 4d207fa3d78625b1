//! Error types for embedded-metadata

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Invalid parser configuration: {message}")]
    Config { message: String },

    #[error(transparent)]
    Scan(#[from] embedded_blocks::Error),

    #[error("'{name}' block not found in file.")]
    BlockNotFound { name: String },

    #[error("{source}{}", possible_errors_suffix(.possible_errors))]
    Decode {
        block: String,
        #[source]
        source: toml::de::Error,
        /// Nested-opener diagnostics from the scan that produced the block.
        possible_errors: Vec<String>,
    },

    #[error("Invalid [run] table in '{block}' block: {source}")]
    InvalidRunTable {
        block: String,
        #[source]
        source: toml::de::Error,
    },

    #[error(transparent)]
    Requirement(#[from] embedded_requirements::Error),
}

impl Error {
    /// Whether this error only means the requested block is absent.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::BlockNotFound { .. })
    }
}

fn possible_errors_suffix(possible_errors: &[String]) -> String {
    if possible_errors.is_empty() {
        String::new()
    } else {
        format!(
            "; Possible Metadata Syntax Errors: {}",
            possible_errors.join(",")
        )
    }
}

/// Map a not-found error to `None`, passing everything else through.
pub(crate) fn optional<T>(result: Result<T>) -> Result<Option<T>> {
    match result {
        Ok(value) => Ok(Some(value)),
        Err(e) if e.is_not_found() => Ok(None),
        Err(e) => Err(e),
    }
}
