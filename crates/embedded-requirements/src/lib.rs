//! Version specifiers and requirements for embedded script metadata.
//!
//! The `requires-python` and `dependencies` entries of a `[run]` table are
//! plain strings. This crate turns them into structured values:
//!
//! - [`Version`] for PEP 440 versions such as `2.0.0rc1` or `1!306.1.2.3+win32`
//! - [`SpecifierSet`] for PEP 440 constraints such as `>=3.10,<3.13`
//! - [`Requirement`] for PEP 508 dependency specifications such as
//!   `requests[socks]>=2.31; python_version < "3.12"`

pub mod error;
pub mod requirement;
pub mod specifier;
pub mod version;

pub use error::{Error, Result};
pub use requirement::Requirement;
pub use specifier::{Operator, Specifier, SpecifierSet};
pub use version::{LocalSegment, PreRelease, Version};
