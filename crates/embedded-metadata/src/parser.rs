//! Facade over the block scanner.
//!
//! `get_*` methods fail with [`Error::BlockNotFound`] when the block is
//! missing; their unprefixed counterparts return `Ok(None)` instead. Every
//! call rereads the source and starts a fresh scan.

use std::collections::BTreeMap;
use std::path::PathBuf;

use embedded_blocks::{
    BlockScanner, Diagnostic, Encoding, PYPROJECT_BLOCK, ScanWarning, Source, SourceLines,
    scan_source,
};
use serde::Deserialize;

use crate::dependencies::{RunTable, ScriptDependencies};
use crate::error::optional;
use crate::{Error, Result};

/// Lazy iterator over the raw blocks of one scan.
pub type RawBlocks<'a> = BlockScanner<SourceLines<'a>>;

/// Blocks of a completed scan together with what the scan reported.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MetadataScan {
    /// Block name to raw block text.
    pub blocks: BTreeMap<String, String>,
    pub diagnostics: Vec<Diagnostic>,
    pub warnings: Vec<ScanWarning>,
}

impl MetadataScan {
    /// Decode the named block as TOML.
    ///
    /// On a decode failure the diagnostics this scan recorded for `name` are
    /// attached to the error.
    pub fn decode_toml(&self, name: &str) -> Result<toml::Table> {
        let text = self.blocks.get(name).ok_or_else(|| Error::BlockNotFound {
            name: name.to_string(),
        })?;

        toml::from_str(text).map_err(|source| {
            tracing::debug!(block = name, "Failed to decode metadata block");
            Error::Decode {
                block: name.to_string(),
                source,
                possible_errors: self
                    .diagnostics
                    .iter()
                    .filter(|d| d.block == name)
                    .map(ToString::to_string)
                    .collect(),
            }
        })
    }
}

/// Reads embedded metadata blocks from a source string or file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmbeddedMetadataParser {
    source: Source,
}

impl EmbeddedMetadataParser {
    pub fn builder() -> ParserBuilder {
        ParserBuilder::default()
    }

    /// Parse metadata from source text held in memory.
    ///
    /// # Example
    /// ```
    /// use embedded_metadata::EmbeddedMetadataParser;
    ///
    /// let parser = EmbeddedMetadataParser::from_string(
    ///     "# /// pyproject\n# [run]\n# dependencies = [\"requests\"]\n# ///\n",
    /// );
    /// let raw = parser.get_pyproject_raw().unwrap();
    /// assert_eq!(raw, "[run]\ndependencies = [\"requests\"]\n");
    /// ```
    pub fn from_string(src: impl Into<String>) -> Self {
        Self {
            source: Source::text(src),
        }
    }

    /// Parse metadata from a UTF-8 file, read lazily on every call.
    pub fn from_path(src_path: impl Into<PathBuf>) -> Self {
        Self::from_path_with_encoding(src_path, Encoding::default())
    }

    pub fn from_path_with_encoding(src_path: impl Into<PathBuf>, encoding: Encoding) -> Self {
        Self {
            source: Source::file(src_path, encoding),
        }
    }

    pub fn source(&self) -> &Source {
        &self.source
    }

    /// Start a fresh lazy scan of the source.
    ///
    /// File sources are opened here and closed when the iterator is dropped.
    pub fn iter_raw_metadata_blocks(&self) -> Result<RawBlocks<'_>> {
        Ok(scan_source(&self.source)?)
    }

    /// Run a full scan, keeping its diagnostics and warnings.
    pub fn scan(&self) -> Result<MetadataScan> {
        let report = self.iter_raw_metadata_blocks()?.finish()?;
        Ok(MetadataScan {
            blocks: report
                .blocks
                .into_iter()
                .map(|block| (block.name, block.text))
                .collect(),
            diagnostics: report.diagnostics,
            warnings: report.warnings,
        })
    }

    /// All blocks in the source, keyed by name.
    pub fn metadata_blocks(&self) -> Result<BTreeMap<String, String>> {
        Ok(self.scan()?.blocks)
    }

    /// Text of the first block called `name`.
    ///
    /// Stops reading as soon as the block is found.
    pub fn get_first_metadata_block(&self, name: &str) -> Result<String> {
        for block in self.iter_raw_metadata_blocks()? {
            let block = block?;
            if block.name == name {
                return Ok(block.text);
            }
        }
        Err(Error::BlockNotFound {
            name: name.to_string(),
        })
    }

    pub fn first_metadata_block(&self, name: &str) -> Result<Option<String>> {
        optional(self.get_first_metadata_block(name))
    }

    /// Decode the block called `name` as TOML.
    pub fn get_block_toml(&self, name: &str) -> Result<toml::Table> {
        self.scan()?.decode_toml(name)
    }

    pub fn block_toml(&self, name: &str) -> Result<Option<toml::Table>> {
        optional(self.get_block_toml(name))
    }

    /// Text of the `pyproject` block.
    ///
    /// Use this to hand the block to another TOML parser or to cache on it.
    pub fn get_pyproject_raw(&self) -> Result<String> {
        self.metadata_blocks()?
            .remove(PYPROJECT_BLOCK)
            .ok_or_else(|| Error::BlockNotFound {
                name: PYPROJECT_BLOCK.to_string(),
            })
    }

    pub fn pyproject_raw(&self) -> Result<Option<String>> {
        optional(self.get_pyproject_raw())
    }

    /// The `pyproject` block decoded as TOML.
    pub fn get_pyproject_toml(&self) -> Result<toml::Table> {
        self.get_block_toml(PYPROJECT_BLOCK)
    }

    pub fn pyproject_toml(&self) -> Result<Option<toml::Table>> {
        optional(self.get_pyproject_toml())
    }

    /// The `[run]` table with `requires-python` and `dependencies` as plain
    /// strings.
    ///
    /// Without a `pyproject` block or `[run]` table this is the empty
    /// default.
    pub fn plain_script_dependencies(&self) -> Result<RunTable> {
        match self.pyproject_toml()? {
            Some(pyproject) => RunTable::from_pyproject(PYPROJECT_BLOCK, &pyproject),
            None => Ok(RunTable::default()),
        }
    }

    /// The `[run]` table with the Python version parsed into a
    /// [`SpecifierSet`](embedded_requirements::SpecifierSet) and each
    /// dependency into a [`Requirement`](embedded_requirements::Requirement).
    pub fn script_dependencies(&self) -> Result<ScriptDependencies> {
        ScriptDependencies::try_from(self.plain_script_dependencies()?)
    }
}

/// Builds an [`EmbeddedMetadataParser`] from exactly one source.
///
/// Also deserializable, so a host can describe the source in its own config:
/// ```toml
/// src_path = "scripts/tool.py"
/// encoding = "utf-8-sig"
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ParserBuilder {
    src: Option<String>,
    src_path: Option<PathBuf>,
    encoding: Encoding,
}

impl ParserBuilder {
    pub fn src(mut self, src: impl Into<String>) -> Self {
        self.src = Some(src.into());
        self
    }

    pub fn src_path(mut self, src_path: impl Into<PathBuf>) -> Self {
        self.src_path = Some(src_path.into());
        self
    }

    /// Encoding for a file source. Ignored for in-memory text.
    pub fn encoding(mut self, encoding: Encoding) -> Self {
        self.encoding = encoding;
        self
    }

    /// Fails unless exactly one source is set. An empty `src` or `src_path`
    /// counts as not set.
    pub fn build(self) -> Result<EmbeddedMetadataParser> {
        let src = self.src.filter(|src| !src.is_empty());
        let src_path = self.src_path.filter(|path| !path.as_os_str().is_empty());
        match (src, src_path) {
            (Some(src), None) => Ok(EmbeddedMetadataParser::from_string(src)),
            (None, Some(path)) => Ok(EmbeddedMetadataParser::from_path_with_encoding(
                path,
                self.encoding,
            )),
            (Some(_), Some(_)) => Err(Error::Config {
                message: "Provide only one of 'src' and 'src_path'".to_string(),
            }),
            (None, None) => Err(Error::Config {
                message: "Must provide one of 'src' and 'src_path'".to_string(),
            }),
        }
    }
}
