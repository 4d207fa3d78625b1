//! Scanner for embedded metadata blocks.
//!
//! This crate finds PEP 723 style metadata blocks in the comments of a source
//! file and returns their raw text, keyed by block name:
//!
//! ```text
//! # /// pyproject
//! # [run]
//! # requires-python = ">=3.11"
//! # dependencies = ["requests"]
//! # ///
//! ```
//!
//! Decoding the payload (usually TOML) is left to the caller. See the
//! `embedded-metadata` crate for a facade that does that.

pub mod error;
pub mod scanner;
pub mod source;

pub use error::{Error, Result};
pub use scanner::{
    Block, BlockScanner, Diagnostic, LEGACY_PYPROJECT_BLOCK, PYPROJECT_BLOCK, ScanReport,
    ScanWarning, is_valid_block_name, scan_source, scan_str,
};
pub use source::{Encoding, FileLines, Source, SourceLines};
