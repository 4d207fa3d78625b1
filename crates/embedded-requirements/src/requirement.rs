//! PEP 508 dependency specifications.
//!
//! A requirement has the shape
//! ```text
//! name [extra, ...] (specifiers | @ url) ; marker
//! ```
//! Markers are kept verbatim and are not evaluated.

use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

use regex::Regex;

use crate::error::{Error, Result};
use crate::specifier::SpecifierSet;

/// Matches a project or extra name at the start of the input.
static NAME_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^([A-Za-z0-9](?:[A-Za-z0-9._-]*[A-Za-z0-9])?)").expect("Invalid name regex")
});

static SEPARATOR_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[-_.]+").expect("Invalid separator regex"));

/// A parsed dependency specification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Requirement {
    /// Project name as written.
    pub name: String,
    /// Requested extras, in the order written.
    pub extras: Vec<String>,
    /// Version constraints, if any.
    pub specifier: Option<SpecifierSet>,
    /// Direct reference URL (`name @ url`), if any.
    pub url: Option<String>,
    /// Environment marker text after `;`, if any.
    pub marker: Option<String>,
}

impl Requirement {
    /// Parse a single dependency specification.
    ///
    /// # Example
    /// ```
    /// use embedded_requirements::Requirement;
    ///
    /// let req = Requirement::parse("requests[socks]>=2.31; python_version < '3.12'").unwrap();
    /// assert_eq!(req.name, "requests");
    /// assert_eq!(req.extras, vec!["socks"]);
    /// assert!(req.specifier.unwrap().contains("2.32.0"));
    /// assert_eq!(req.marker.as_deref(), Some("python_version < '3.12'"));
    /// ```
    pub fn parse(s: &str) -> Result<Self> {
        let input = s.trim();
        let invalid = |reason: &str| Error::InvalidRequirement {
            requirement: input.to_string(),
            reason: reason.to_string(),
        };

        if input.is_empty() {
            return Err(invalid("empty requirement"));
        }

        let (body, marker) = match input.split_once(';') {
            Some((body, marker)) => {
                let marker = marker.trim();
                if marker.is_empty() {
                    return Err(invalid("empty environment marker"));
                }
                (body.trim(), Some(marker.to_string()))
            }
            None => (input, None),
        };

        let name = NAME_REGEX
            .find(body)
            .ok_or_else(|| invalid("expected a project name"))?
            .as_str();
        let mut rest = body[name.len()..].trim_start();

        let mut extras = Vec::new();
        if let Some(after) = rest.strip_prefix('[') {
            let (inner, tail) = after
                .split_once(']')
                .ok_or_else(|| invalid("unterminated extras list"))?;
            for extra in inner.split(',').map(str::trim).filter(|e| !e.is_empty()) {
                if !is_valid_name(extra) {
                    return Err(invalid(&format!("invalid extra name '{extra}'")));
                }
                extras.push(extra.to_string());
            }
            rest = tail.trim_start();
        }

        let mut specifier = None;
        let mut url = None;
        if let Some(target) = rest.strip_prefix('@') {
            let target = target.trim();
            if target.is_empty() || target.contains(char::is_whitespace) {
                return Err(invalid("invalid direct reference URL"));
            }
            url = Some(target.to_string());
        } else if !rest.is_empty() {
            let constraint = match rest.strip_prefix('(') {
                Some(inner) => inner
                    .strip_suffix(')')
                    .ok_or_else(|| invalid("unbalanced parentheses"))?,
                None => rest,
            };
            specifier = Some(SpecifierSet::parse(constraint).map_err(|e| invalid(&e.to_string()))?);
        }

        Ok(Self {
            name: name.to_string(),
            extras,
            specifier,
            url,
            marker,
        })
    }

    /// The PEP 503 normalized project name: lowercase, with runs of `-`,
    /// `_` and `.` collapsed into a single `-`.
    pub fn canonical_name(&self) -> String {
        SEPARATOR_REGEX
            .replace_all(&self.name, "-")
            .to_lowercase()
    }
}

impl FromStr for Requirement {
    type Err = Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for Requirement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)?;
        if !self.extras.is_empty() {
            write!(f, "[{}]", self.extras.join(","))?;
        }
        if let Some(specifier) = &self.specifier {
            write!(f, "{specifier}")?;
        }
        if let Some(url) = &self.url {
            write!(f, " @ {url}")?;
        }
        if let Some(marker) = &self.marker {
            // A URL must be separated from its marker by whitespace
            let separator = if self.url.is_some() { " ; " } else { "; " };
            write!(f, "{separator}{marker}")?;
        }
        Ok(())
    }
}

fn is_valid_name(name: &str) -> bool {
    NAME_REGEX
        .find(name)
        .is_some_and(|m| m.as_str().len() == name.len())
}
