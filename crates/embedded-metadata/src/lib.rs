//! Inline script metadata (PEP 723) for Python source files.
//!
//! Metadata blocks are found by the scanner in `embedded-blocks`; this crate
//! adds the convenience accessors on top:
//!
//! - raw block text by name, or all blocks as a map
//! - the `pyproject` block decoded as TOML
//! - the `[run]` table, either as plain strings ([`RunTable`]) or with
//!   requirements parsed ([`ScriptDependencies`])
//!
//! ```
//! use embedded_metadata::EmbeddedMetadataParser;
//!
//! let src = r#"# /// pyproject
//! ## [run]
//! ## requires-python = ">=3.11"
//! ## dependencies = ["requests<3", "rich"]
//! ## ///
//! import requests
//! "#;
//!
//! let parser = EmbeddedMetadataParser::from_string(src);
//! let deps = parser.script_dependencies().unwrap();
//! assert!(deps.requires_python.unwrap().contains("3.12"));
//! assert_eq!(deps.dependencies[0].name, "requests");
//! ```

pub mod dependencies;
pub mod error;
pub mod parser;

pub use dependencies::{
    DEPENDENCIES_KEY, PYTHON_VERSION_KEY, RUN_TABLE, RunTable, ScriptDependencies,
};
pub use embedded_blocks::{Block, Diagnostic, Encoding, ScanWarning};
pub use error::{Error, Result};
pub use parser::{EmbeddedMetadataParser, MetadataScan, ParserBuilder, RawBlocks};
