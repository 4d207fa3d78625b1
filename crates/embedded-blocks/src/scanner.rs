//! Line scanner for embedded metadata blocks.
//!
//! Blocks live in comment lines and follow the PEP 723 layout:
//! ```text
//! # /// pyproject
//! # [run]
//! # dependencies = ["requests"]
//! # ///
//! ```
//!
//! The scanner is a two-state machine (outside a block / inside a block)
//! driven one line at a time. Completed blocks are yielded lazily. Anything
//! suspicious that does not make the input unusable is reported as a
//! [`ScanWarning`] or a [`Diagnostic`] and scanning carries on.

use std::collections::HashSet;
use std::fmt;
use std::iter::FusedIterator;

use crate::source::{Source, SourceLines};
use crate::{Error, Result};

/// Block name that should be spelled [`PYPROJECT_BLOCK`].
pub const LEGACY_PYPROJECT_BLOCK: &str = "pyproject.toml";
/// Name of the block holding script metadata.
pub const PYPROJECT_BLOCK: &str = "pyproject";

const COMMENT: char = '#';
const OPENER_PREFIX: &str = "# /// ";
const CLOSER: &str = "# ///";

/// A completed metadata block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Block {
    /// The name following the `# ///` opener.
    pub name: String,
    /// Interior lines with the comment prefix removed, terminators kept.
    pub text: String,
    /// The 1-based line number of the opener.
    pub start_line: usize,
    /// The 1-based line number of the closer.
    pub end_line: usize,
}

/// Soft warnings raised while scanning. None of these stop the scan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScanWarning {
    /// A block was opened but never closed; its contents are dropped.
    UnclosedBlock { name: String, line: usize },
    /// A block used a deprecated spelling of a well-known name.
    LegacyName { name: String, suggestion: String },
}

impl fmt::Display for ScanWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScanWarning::UnclosedBlock { name, .. } => write!(
                f,
                "Potential unclosed block '{name}' detected. \
                 A '# ///' block is needed to indicate the end of the block."
            ),
            ScanWarning::LegacyName { name, suggestion } => {
                write!(f, "'{name}' block found, should be '{suggestion}'.")
            }
        }
    }
}

/// An opener-shaped line found inside a block that was still open.
///
/// These are only surfaced when decoding the block payload later fails.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    /// The block that was open at the time.
    pub block: String,
    /// The name on the opener-shaped line, whether or not it is valid.
    pub found: String,
    /// The 1-based line number of the opener-shaped line.
    pub line: usize,
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "New '{}' block encountered before block '{}' closed.",
            self.found, self.block
        )
    }
}

/// Everything a completed scan produced.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScanReport {
    pub blocks: Vec<Block>,
    pub diagnostics: Vec<Diagnostic>,
    pub warnings: Vec<ScanWarning>,
}

/// Returns `true` if `name` is a legal block name: non-empty ASCII letters,
/// digits and hyphens.
pub fn is_valid_block_name(name: &str) -> bool {
    !name.is_empty() && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '-')
}

#[derive(Debug)]
struct OpenBlock {
    name: String,
    start_line: usize,
    text: String,
}

impl OpenBlock {
    fn push(&mut self, line: &str) {
        let rest = &line[COMMENT.len_utf8()..];
        self.text.push_str(rest.strip_prefix(' ').unwrap_or(rest));
    }

    fn close(self, end_line: usize) -> Block {
        Block {
            name: self.name,
            text: self.text,
            start_line: self.start_line,
            end_line,
        }
    }
}

#[derive(Debug, Default)]
enum State {
    #[default]
    Outside,
    Inside(OpenBlock),
}

/// Lazy, single-pass iterator of [`Block`]s over a line source.
///
/// Each scanner owns its own seen-name set, diagnostics and warnings, so
/// two scans of the same source never share state. After a hard failure
/// the scanner yields `None` forever.
#[derive(Debug)]
pub struct BlockScanner<I> {
    lines: I,
    state: State,
    line_no: usize,
    seen: HashSet<String>,
    diagnostics: Vec<Diagnostic>,
    warnings: Vec<ScanWarning>,
    finished: bool,
}

impl<I, L> BlockScanner<I>
where
    I: Iterator<Item = Result<L>>,
    L: AsRef<str>,
{
    /// Create a scanner over lines that still carry their terminators.
    pub fn new(lines: I) -> Self {
        Self {
            lines,
            state: State::Outside,
            line_no: 0,
            seen: HashSet::new(),
            diagnostics: Vec::new(),
            warnings: Vec::new(),
            finished: false,
        }
    }

    /// Nested-opener diagnostics recorded so far in this scan.
    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    /// Soft warnings emitted so far in this scan.
    pub fn warnings(&self) -> &[ScanWarning] {
        &self.warnings
    }

    /// Drive the scan to completion.
    ///
    /// Fails on the first hard error, discarding any blocks already found.
    pub fn finish(mut self) -> Result<ScanReport> {
        let mut blocks = Vec::new();
        for block in self.by_ref() {
            blocks.push(block?);
        }
        Ok(ScanReport {
            blocks,
            diagnostics: self.diagnostics,
            warnings: self.warnings,
        })
    }

    fn process(&mut self, line: &str) -> Result<Option<Block>> {
        match std::mem::take(&mut self.state) {
            State::Outside => {
                self.check_opener(line)?;
                Ok(None)
            }
            State::Inside(open) => Ok(self.continue_block(open, line)),
        }
    }

    fn check_opener(&mut self, line: &str) -> Result<()> {
        if !line.starts_with(COMMENT) {
            return Ok(());
        }
        let Some(rest) = line.trim_end().strip_prefix(OPENER_PREFIX) else {
            return Ok(());
        };

        let name = rest.trim();
        let legacy = name == LEGACY_PYPROJECT_BLOCK;
        if legacy {
            self.warn(ScanWarning::LegacyName {
                name: name.to_string(),
                suggestion: PYPROJECT_BLOCK.to_string(),
            });
        } else if !is_valid_block_name(name) {
            return Ok(());
        }

        if !self.seen.insert(name.to_string()) {
            return Err(Error::DuplicateBlock {
                name: name.to_string(),
            });
        }

        tracing::debug!(block = name, line = self.line_no, "Opened metadata block");
        self.state = State::Inside(OpenBlock {
            name: name.to_string(),
            start_line: self.line_no,
            text: String::new(),
        });
        Ok(())
    }

    fn continue_block(&mut self, mut open: OpenBlock, line: &str) -> Option<Block> {
        let trimmed = line.trim_end();

        // Not part of a comment block any more. The line itself is not
        // reconsidered as an opener.
        if trimmed != "#" && !line.starts_with("# ") {
            self.warn(ScanWarning::UnclosedBlock {
                name: open.name,
                line: open.start_line,
            });
            return None;
        }

        if trimmed == CLOSER {
            tracing::debug!(block = %open.name, line = self.line_no, "Closed metadata block");
            return Some(open.close(self.line_no));
        }

        if let Some(rest) = line.strip_prefix(OPENER_PREFIX) {
            let diagnostic = Diagnostic {
                block: open.name.clone(),
                found: rest.trim().to_string(),
                line: self.line_no,
            };
            tracing::debug!(line = self.line_no, "{}", diagnostic);
            self.diagnostics.push(diagnostic);
        }

        open.push(line);
        self.state = State::Inside(open);
        None
    }

    fn end_of_input(&mut self) {
        if let State::Inside(open) = std::mem::take(&mut self.state) {
            self.warn(ScanWarning::UnclosedBlock {
                name: open.name,
                line: open.start_line,
            });
        }
        self.finished = true;
    }

    fn warn(&mut self, warning: ScanWarning) {
        tracing::warn!("{}", warning);
        self.warnings.push(warning);
    }
}

impl<I, L> Iterator for BlockScanner<I>
where
    I: Iterator<Item = Result<L>>,
    L: AsRef<str>,
{
    type Item = Result<Block>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }

        loop {
            let line = match self.lines.next() {
                Some(Ok(line)) => line,
                Some(Err(e)) => {
                    self.finished = true;
                    return Some(Err(e));
                }
                None => {
                    self.end_of_input();
                    return None;
                }
            };
            self.line_no += 1;

            match self.process(line.as_ref()) {
                Ok(Some(block)) => return Some(Ok(block)),
                Ok(None) => continue,
                Err(e) => {
                    self.finished = true;
                    return Some(Err(e));
                }
            }
        }
    }
}

impl<I, L> FusedIterator for BlockScanner<I>
where
    I: Iterator<Item = Result<L>>,
    L: AsRef<str>,
{
}

/// Scan in-memory text.
///
/// # Example
/// ```
/// use embedded_blocks::scan_str;
///
/// let src = "# /// pyproject\n# [run]\n# ///\n";
/// let blocks: Vec<_> = scan_str(src).collect::<Result<_, _>>().unwrap();
/// assert_eq!(blocks.len(), 1);
/// assert_eq!(blocks[0].name, "pyproject");
/// assert_eq!(blocks[0].text, "[run]\n");
/// ```
pub fn scan_str(text: &str) -> BlockScanner<SourceLines<'_>> {
    BlockScanner::new(SourceLines::Text(text.split_inclusive('\n')))
}

/// Open `source` and scan it from the start.
pub fn scan_source(source: &Source) -> Result<BlockScanner<SourceLines<'_>>> {
    Ok(BlockScanner::new(source.lines()?))
}
