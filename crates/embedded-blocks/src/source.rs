//! Text sources for the block scanner.
//!
//! A [`Source`] is either text already held in memory or a path that is read
//! lazily, one line at a time, through a buffered reader. Lines are always
//! handed out with their terminator attached so the scanner can slice
//! comment prefixes off by length.
//!
//! File sources get universal newlines: `\n`, `\r\n` and a lone `\r` all end
//! a line and are handed out as `\n`. In-memory text is split on `\n` only.

use std::borrow::Cow;
use std::fmt;
use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::{Path, PathBuf};
use std::str::{FromStr, SplitInclusive};

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

/// Text encoding used to decode a file source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Encoding {
    /// Strict UTF-8.
    #[default]
    #[serde(rename = "utf-8", alias = "utf8", alias = "utf_8")]
    Utf8,
    /// UTF-8 with an optional byte order mark at the start of the file.
    #[serde(rename = "utf-8-sig", alias = "utf8-sig", alias = "utf_8_sig")]
    Utf8Sig,
    /// ISO-8859-1: every byte is the code point of the same value.
    #[serde(rename = "latin-1", alias = "latin1", alias = "iso-8859-1")]
    Latin1,
}

impl Encoding {
    fn decode<'a>(&self, bytes: &'a [u8], first_line: bool) -> Option<Cow<'a, str>> {
        match self {
            Encoding::Utf8 => std::str::from_utf8(bytes).ok().map(Cow::Borrowed),
            Encoding::Utf8Sig => {
                let bytes = match bytes.strip_prefix(UTF8_BOM) {
                    Some(rest) if first_line => rest,
                    _ => bytes,
                };
                std::str::from_utf8(bytes).ok().map(Cow::Borrowed)
            }
            Encoding::Latin1 => Some(Cow::Owned(bytes.iter().map(|&b| b as char).collect())),
        }
    }
}

impl FromStr for Encoding {
    type Err = Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace('_', "-").as_str() {
            "utf-8" | "utf8" => Ok(Encoding::Utf8),
            "utf-8-sig" | "utf8-sig" => Ok(Encoding::Utf8Sig),
            "latin-1" | "latin1" | "iso-8859-1" => Ok(Encoding::Latin1),
            _ => Err(Error::UnknownEncoding {
                name: s.to_string(),
            }),
        }
    }
}

impl fmt::Display for Encoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Encoding::Utf8 => write!(f, "utf-8"),
            Encoding::Utf8Sig => write!(f, "utf-8-sig"),
            Encoding::Latin1 => write!(f, "latin-1"),
        }
    }
}

/// Where the scanner reads its lines from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Source {
    /// Source text held in memory.
    Text(String),
    /// A file that is opened and decoded on every scan.
    File { path: PathBuf, encoding: Encoding },
}

impl Source {
    pub fn text(src: impl Into<String>) -> Self {
        Source::Text(src.into())
    }

    pub fn file(path: impl Into<PathBuf>, encoding: Encoding) -> Self {
        Source::File {
            path: path.into(),
            encoding,
        }
    }

    /// Open the source for a fresh pass.
    ///
    /// For file sources this opens the file; the handle lives inside the
    /// returned iterator and is closed when the iterator is dropped.
    pub fn lines(&self) -> Result<SourceLines<'_>> {
        match self {
            Source::Text(text) => Ok(SourceLines::Text(text.split_inclusive('\n'))),
            Source::File { path, encoding } => Ok(SourceLines::File(FileLines::open(
                path, *encoding,
            )?)),
        }
    }
}

/// Lazy line iterator over a [`Source`].
#[derive(Debug)]
pub enum SourceLines<'a> {
    Text(SplitInclusive<'a, char>),
    File(FileLines),
}

impl<'a> Iterator for SourceLines<'a> {
    type Item = Result<Cow<'a, str>>;

    fn next(&mut self) -> Option<Self::Item> {
        match self {
            SourceLines::Text(lines) => lines.next().map(|line| Ok(Cow::Borrowed(line))),
            SourceLines::File(lines) => lines.next().map(|line| line.map(Cow::Owned)),
        }
    }
}

/// Buffered, decoding line reader over an open file.
#[derive(Debug)]
pub struct FileLines {
    reader: BufReader<File>,
    path: PathBuf,
    encoding: Encoding,
    line: usize,
    buf: Vec<u8>,
    /// The previous line ended in `\r`; a `\n` right after it is part of
    /// the same terminator.
    skip_lf: bool,
    finished: bool,
}

impl FileLines {
    fn open(path: &Path, encoding: Encoding) -> Result<Self> {
        let file = File::open(path).map_err(|e| Error::io(path, e))?;
        tracing::debug!(path = %path.display(), %encoding, "Opened metadata source");
        Ok(Self {
            reader: BufReader::new(file),
            path: path.to_path_buf(),
            encoding,
            line: 0,
            buf: Vec::new(),
            skip_lf: false,
            finished: false,
        })
    }

    /// Read the next raw line into `buf` with its terminator replaced by
    /// `\n`. Returns `false` at end of input.
    fn read_raw_line(&mut self) -> io::Result<bool> {
        self.buf.clear();
        loop {
            let available = match self.reader.fill_buf() {
                Ok(available) => available,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e),
            };
            if available.is_empty() {
                return Ok(!self.buf.is_empty());
            }

            if self.skip_lf {
                self.skip_lf = false;
                if available[0] == b'\n' {
                    self.reader.consume(1);
                    continue;
                }
            }

            match available.iter().position(|&b| b == b'\n' || b == b'\r') {
                Some(end) => {
                    self.skip_lf = available[end] == b'\r';
                    self.buf.extend_from_slice(&available[..end]);
                    self.buf.push(b'\n');
                    self.reader.consume(end + 1);
                    return Ok(true);
                }
                None => {
                    let len = available.len();
                    self.buf.extend_from_slice(available);
                    self.reader.consume(len);
                }
            }
        }
    }
}

impl Iterator for FileLines {
    type Item = Result<String>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }

        match self.read_raw_line() {
            Ok(false) => {
                self.finished = true;
                None
            }
            Ok(true) => {
                self.line += 1;
                match self.encoding.decode(&self.buf, self.line == 1) {
                    Some(text) => Some(Ok(text.into_owned())),
                    None => {
                        self.finished = true;
                        Some(Err(Error::Decode {
                            path: self.path.clone(),
                            line: self.line,
                            encoding: self.encoding,
                        }))
                    }
                }
            }
            Err(e) => {
                self.finished = true;
                Some(Err(Error::io(&self.path, e)))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn collect(source: &Source) -> Vec<String> {
        source
            .lines()
            .unwrap()
            .map(|line| line.unwrap().into_owned())
            .collect()
    }

    #[test]
    fn test_text_lines_keep_terminators() {
        let source = Source::text("a\nb\r\nc");
        assert_eq!(collect(&source), vec!["a\n", "b\r\n", "c"]);
    }

    #[test]
    fn test_empty_text_has_no_lines() {
        assert!(collect(&Source::text("")).is_empty());
    }

    #[test]
    fn test_file_lines_translate_crlf() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"# /// pyproject\r\n# ///\r\nend").unwrap();

        let source = Source::file(file.path(), Encoding::Utf8);
        assert_eq!(collect(&source), vec!["# /// pyproject\n", "# ///\n", "end"]);
    }

    #[test]
    fn test_file_lines_treat_lone_cr_as_newline() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"a\rb\r\nc\n\rd").unwrap();

        let source = Source::file(file.path(), Encoding::Utf8);
        assert_eq!(collect(&source), vec!["a\n", "b\n", "c\n", "\n", "d"]);
    }

    #[test]
    fn test_file_lines_crlf_split_across_reads() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"first\r\nsecond\r\n").unwrap();

        // A one-byte buffer forces the `\r` and `\n` into separate reads
        let reader = BufReader::with_capacity(1, File::open(file.path()).unwrap());
        let mut lines = FileLines::open(file.path(), Encoding::Utf8).unwrap();
        lines.reader = reader;
        let lines: Vec<String> = lines.map(|line| line.unwrap()).collect();
        assert_eq!(lines, vec!["first\n", "second\n"]);
    }

    #[test]
    fn test_utf8_sig_strips_leading_bom_only() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"\xEF\xBB\xBFfirst\n\xEF\xBB\xBFsecond\n").unwrap();

        let source = Source::file(file.path(), Encoding::Utf8Sig);
        assert_eq!(collect(&source), vec!["first\n", "\u{feff}second\n"]);
    }

    #[test]
    fn test_latin1_maps_bytes_to_code_points() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"# caf\xe9\n").unwrap();

        let source = Source::file(file.path(), Encoding::Latin1);
        assert_eq!(collect(&source), vec!["# café\n"]);
    }

    #[test]
    fn test_invalid_utf8_reports_line() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"ok\n# caf\xe9\nnever read\n").unwrap();

        let source = Source::file(file.path(), Encoding::Utf8);
        let mut lines = source.lines().unwrap();
        assert!(lines.next().unwrap().is_ok());
        match lines.next().unwrap() {
            Err(Error::Decode { line, encoding, .. }) => {
                assert_eq!(line, 2);
                assert_eq!(encoding, Encoding::Utf8);
            }
            other => panic!("Expected decode error, got {:?}", other),
        }
        assert!(lines.next().is_none());
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let source = Source::file(dir.path().join("missing.py"), Encoding::Utf8);
        assert!(matches!(source.lines(), Err(Error::Io { .. })));
    }

    #[test]
    fn test_encoding_from_str_aliases() {
        assert_eq!("UTF-8".parse::<Encoding>().unwrap(), Encoding::Utf8);
        assert_eq!("utf_8_sig".parse::<Encoding>().unwrap(), Encoding::Utf8Sig);
        assert_eq!("ISO-8859-1".parse::<Encoding>().unwrap(), Encoding::Latin1);
        assert!(matches!(
            "cp1252".parse::<Encoding>(),
            Err(Error::UnknownEncoding { .. })
        ));
    }

    #[test]
    fn test_encoding_display_round_trips() {
        for encoding in [Encoding::Utf8, Encoding::Utf8Sig, Encoding::Latin1] {
            assert_eq!(encoding.to_string().parse::<Encoding>().unwrap(), encoding);
        }
    }
}
