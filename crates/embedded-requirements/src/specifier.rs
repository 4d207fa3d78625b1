//! PEP 440 version specifiers.
//!
//! Supports comma-separated specifier sets such as `>=3.10,<3.13`, the
//! compatible release operator (`~=3.11`), prefix matching (`==3.*`) and
//! arbitrary equality (`===foo`). Versions are full PEP 440 [`Version`]s.
//!
//! Pre-releases are excluded unless a specifier names one: `>=3.12` does not
//! contain `3.13.0rc1`, while `>=3.13.0b1` does.
//!
//! # Examples
//!
//! ```
//! use embedded_requirements::SpecifierSet;
//!
//! let specifiers = SpecifierSet::parse(">=3.10,<3.13").unwrap();
//! assert!(specifiers.contains("3.12"));
//! assert!(!specifiers.contains("3.13.0"));
//!
//! let compatible = SpecifierSet::parse("~=3.11").unwrap();
//! assert!(compatible.contains("3.14"));
//! assert!(!compatible.contains("4.0"));
//! ```

use std::fmt;
use std::str::FromStr;

use crate::error::{Error, Result};
use crate::version::Version;

/// A version comparison operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operator {
    /// `~=`
    Compatible,
    /// `==`
    Eq,
    /// `!=`
    Ne,
    /// `<=`
    Lte,
    /// `>=`
    Gte,
    /// `<`
    Lt,
    /// `>`
    Gt,
    /// `===`
    Arbitrary,
}

impl Operator {
    pub fn as_str(&self) -> &'static str {
        match self {
            Operator::Compatible => "~=",
            Operator::Eq => "==",
            Operator::Ne => "!=",
            Operator::Lte => "<=",
            Operator::Gte => ">=",
            Operator::Lt => "<",
            Operator::Gt => ">",
            Operator::Arbitrary => "===",
        }
    }

    /// Split a leading operator off `s`. Longest operators are tried first.
    fn strip(s: &str) -> Option<(Self, &str)> {
        const OPERATORS: [Operator; 8] = [
            Operator::Arbitrary,
            Operator::Compatible,
            Operator::Eq,
            Operator::Ne,
            Operator::Lte,
            Operator::Gte,
            Operator::Lt,
            Operator::Gt,
        ];
        OPERATORS
            .iter()
            .find_map(|op| s.strip_prefix(op.as_str()).map(|rest| (*op, rest)))
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single specifier: an operator paired with a version.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Specifier {
    op: Operator,
    /// Version text as written, without the operator or a trailing `.*`.
    raw_version: String,
    /// Parsed version; `None` only for arbitrary equality on a non-PEP 440
    /// string.
    version: Option<Version>,
    wildcard: bool,
}

impl Specifier {
    /// Parse a single specifier like `>=3.12`, `==3.*` or `<2.0.0rc1`.
    pub fn parse(s: &str) -> Result<Self> {
        let s = s.trim();
        let invalid = |reason: &str| Error::InvalidSpecifier {
            specifier: s.to_string(),
            reason: reason.to_string(),
        };

        let (op, rest) = Operator::strip(s).ok_or_else(|| invalid("missing operator"))?;
        let rest = rest.trim();
        if rest.is_empty() {
            return Err(invalid("missing version"));
        }

        if op == Operator::Arbitrary {
            return Ok(Self {
                op,
                raw_version: rest.to_string(),
                version: Version::parse(rest).ok(),
                wildcard: false,
            });
        }

        let (version_str, wildcard) = match rest.strip_suffix(".*") {
            Some(prefix) => (prefix, true),
            None => (rest, false),
        };
        if wildcard && !matches!(op, Operator::Eq | Operator::Ne) {
            return Err(invalid("wildcards are only allowed with '==' and '!='"));
        }

        let version = Version::parse(version_str).map_err(|e| match e {
            Error::InvalidVersion { reason, .. } => invalid(&reason),
            other => other,
        })?;
        if wildcard && version != version.base() {
            return Err(invalid("a wildcard prefix may only hold an epoch and release"));
        }
        if !version.local().is_empty() && !matches!(op, Operator::Eq | Operator::Ne) {
            return Err(invalid("local versions are only allowed with '==' and '!='"));
        }
        if op == Operator::Compatible && version.release().len() < 2 {
            return Err(invalid("'~=' needs at least two release components"));
        }

        Ok(Self {
            op,
            raw_version: version_str.to_string(),
            version: Some(version),
            wildcard,
        })
    }

    pub fn operator(&self) -> Operator {
        self.op
    }

    /// The version text of this specifier, without operator or wildcard.
    pub fn version(&self) -> &str {
        &self.raw_version
    }

    /// Whether this specifier opts in to pre-release candidates.
    pub fn allows_prereleases(&self) -> bool {
        self.op != Operator::Ne && self.version.as_ref().is_some_and(Version::is_prerelease)
    }

    /// Check a candidate version string against this specifier.
    ///
    /// Unparseable candidates only ever match `===`.
    pub fn contains(&self, candidate: &str) -> bool {
        let prerelease = Version::parse(candidate).is_ok_and(|v| v.is_prerelease());
        if prerelease && !self.allows_prereleases() {
            return false;
        }
        self.matches_str(candidate)
    }

    /// Check a parsed version against this specifier.
    pub fn contains_version(&self, candidate: &Version) -> bool {
        if candidate.is_prerelease() && !self.allows_prereleases() {
            return false;
        }
        self.matches(candidate)
    }

    fn matches_str(&self, candidate: &str) -> bool {
        if self.op == Operator::Arbitrary {
            return candidate.trim().eq_ignore_ascii_case(&self.raw_version);
        }
        Version::parse(candidate).is_ok_and(|v| self.matches(&v))
    }

    /// Operator semantics without the pre-release filter.
    fn matches(&self, candidate: &Version) -> bool {
        let Some(version) = &self.version else {
            return candidate.to_string().eq_ignore_ascii_case(&self.raw_version);
        };

        match self.op {
            Operator::Eq if self.wildcard => prefix_matches(candidate, version, version.release().len()),
            Operator::Ne if self.wildcard => !prefix_matches(candidate, version, version.release().len()),
            Operator::Eq => self.equals(candidate, version),
            Operator::Ne => !self.equals(candidate, version),
            Operator::Lte => candidate.public() <= *version,
            Operator::Gte => candidate.public() >= *version,
            Operator::Lt => {
                // `<3.0` must not admit `3.0rc1`
                candidate < version
                    && (version.is_prerelease()
                        || !candidate.is_prerelease()
                        || candidate.base() != version.base())
            }
            Operator::Gt => {
                // `>3.0` must not admit `3.0.post1` or `3.0+local`
                let same_base = candidate.base() == version.base();
                candidate > version
                    && !(same_base && candidate.is_postrelease() && !version.is_postrelease())
                    && !(same_base && !candidate.local().is_empty())
            }
            Operator::Compatible => {
                candidate.public() >= *version
                    && prefix_matches(candidate, version, version.release().len() - 1)
            }
            Operator::Arbitrary => candidate.to_string().eq_ignore_ascii_case(&self.raw_version),
        }
    }

    /// `==1.0` matches `1.0+anything`; `==1.0+abc` matches only that label.
    fn equals(&self, candidate: &Version, version: &Version) -> bool {
        if version.local().is_empty() {
            candidate.public() == *version
        } else {
            candidate == version
        }
    }
}

/// Epoch and the first `len` release components agree, padding with zeros.
fn prefix_matches(candidate: &Version, prefix: &Version, len: usize) -> bool {
    candidate.epoch() == prefix.epoch()
        && prefix.release()[..len]
            .iter()
            .enumerate()
            .all(|(i, component)| candidate.release().get(i).unwrap_or(&0) == component)
}

impl fmt::Display for Specifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.op, self.raw_version)?;
        if self.wildcard {
            f.write_str(".*")?;
        }
        Ok(())
    }
}

/// A set of specifiers that must all match.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpecifierSet {
    specifiers: Vec<Specifier>,
}

impl SpecifierSet {
    /// Parse a comma-separated specifier set.
    ///
    /// An empty string is rejected; callers that treat a missing constraint
    /// as "anything goes" should model that with `Option<SpecifierSet>`.
    pub fn parse(constraint: &str) -> Result<Self> {
        let mut specifiers = Vec::new();
        for part in constraint.split(',').map(str::trim) {
            if part.is_empty() {
                continue;
            }
            specifiers.push(Specifier::parse(part)?);
        }

        if specifiers.is_empty() {
            return Err(Error::InvalidSpecifier {
                specifier: constraint.to_string(),
                reason: "empty constraint".to_string(),
            });
        }

        Ok(Self { specifiers })
    }

    pub fn specifiers(&self) -> &[Specifier] {
        &self.specifiers
    }

    /// Pre-release candidates are considered when any specifier names a
    /// pre-release.
    pub fn allows_prereleases(&self) -> bool {
        self.specifiers.iter().any(Specifier::allows_prereleases)
    }

    /// Check if a version string satisfies every specifier.
    ///
    /// Returns `false` if the version string cannot be parsed, unless every
    /// specifier is an arbitrary equality that matches it.
    pub fn contains(&self, version: &str) -> bool {
        let prerelease = Version::parse(version).is_ok_and(|v| v.is_prerelease());
        if prerelease && !self.allows_prereleases() {
            return false;
        }
        self.specifiers.iter().all(|spec| spec.matches_str(version))
    }

    /// Check if a parsed version satisfies every specifier.
    pub fn contains_version(&self, version: &Version) -> bool {
        if version.is_prerelease() && !self.allows_prereleases() {
            return false;
        }
        self.specifiers.iter().all(|spec| spec.matches(version))
    }
}

impl FromStr for SpecifierSet {
    type Err = Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for SpecifierSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, spec) in self.specifiers.iter().enumerate() {
            if i > 0 {
                f.write_str(",")?;
            }
            write!(f, "{spec}")?;
        }
        Ok(())
    }
}
