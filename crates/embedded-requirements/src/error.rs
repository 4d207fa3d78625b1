/// Errors raised while parsing version specifiers and requirements.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    /// A version specifier or specifier set could not be parsed.
    #[error("invalid version specifier '{specifier}': {reason}")]
    InvalidSpecifier { specifier: String, reason: String },

    /// A version string could not be parsed.
    #[error("invalid version '{version}': {reason}")]
    InvalidVersion { version: String, reason: String },

    /// A dependency specification could not be parsed.
    #[error("invalid requirement '{requirement}': {reason}")]
    InvalidRequirement { requirement: String, reason: String },
}

pub type Result<T> = std::result::Result<T, Error>;
