//! Views over the `[run]` table of a `pyproject` block.

use embedded_requirements::{Requirement, SpecifierSet};
use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Key holding the Python version constraint.
pub const PYTHON_VERSION_KEY: &str = "requires-python";
/// Key holding the list of dependency specifications.
pub const DEPENDENCIES_KEY: &str = "dependencies";
/// Table holding runtime requirements.
pub const RUN_TABLE: &str = "run";

/// The `[run]` table with its well-known keys as plain strings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RunTable {
    #[serde(rename = "requires-python", default)]
    pub requires_python: Option<String>,
    #[serde(default)]
    pub dependencies: Vec<String>,
    /// Any other keys, untouched.
    #[serde(flatten)]
    pub extra: toml::Table,
}

impl RunTable {
    /// Extract the `[run]` table from a decoded `pyproject` block.
    ///
    /// A missing table yields the defaults.
    pub fn from_pyproject(block: &str, pyproject: &toml::Table) -> Result<Self> {
        let Some(run) = pyproject.get(RUN_TABLE) else {
            return Ok(Self::default());
        };
        run.clone()
            .try_into()
            .map_err(|source| Error::InvalidRunTable {
                block: block.to_string(),
                source,
            })
    }
}

/// The `[run]` table with requirements parsed.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ScriptDependencies {
    /// `None` when no Python version constraint is given.
    pub requires_python: Option<SpecifierSet>,
    pub dependencies: Vec<Requirement>,
    pub extra: toml::Table,
}

impl TryFrom<RunTable> for ScriptDependencies {
    type Error = Error;

    fn try_from(run: RunTable) -> Result<Self> {
        let requires_python = match run.requires_python.as_deref().map(str::trim) {
            Some(constraint) if !constraint.is_empty() => Some(SpecifierSet::parse(constraint)?),
            _ => None,
        };

        let dependencies = run
            .dependencies
            .iter()
            .map(|spec| Requirement::parse(spec))
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(Self {
            requires_python,
            dependencies,
            extra: run.extra,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table(text: &str) -> toml::Table {
        toml::from_str(text).unwrap()
    }

    #[test]
    fn test_missing_run_table_defaults() {
        let run = RunTable::from_pyproject("pyproject", &table("[tool.x]\ny = 1\n")).unwrap();
        assert_eq!(run, RunTable::default());
        assert!(run.requires_python.is_none());
        assert!(run.dependencies.is_empty());
    }

    #[test]
    fn test_run_table_keeps_extra_keys() {
        let run = RunTable::from_pyproject(
            "pyproject",
            &table("[run]\nrequires-python = \">=3.11\"\nentry = \"main\"\n"),
        )
        .unwrap();
        assert_eq!(run.requires_python.as_deref(), Some(">=3.11"));
        assert!(run.dependencies.is_empty());
        assert_eq!(run.extra.get("entry").and_then(|v| v.as_str()), Some("main"));
        assert!(!run.extra.contains_key(PYTHON_VERSION_KEY));
    }

    #[test]
    fn test_run_table_wrong_type() {
        let result = RunTable::from_pyproject("pyproject", &table("[run]\ndependencies = \"requests\"\n"));
        assert!(matches!(result, Err(Error::InvalidRunTable { .. })));

        let result = RunTable::from_pyproject("pyproject", &table("run = 3\n"));
        assert!(matches!(result, Err(Error::InvalidRunTable { .. })));
    }

    #[test]
    fn test_script_dependencies_from_run_table() {
        let run = RunTable {
            requires_python: Some(">=3.10".to_string()),
            dependencies: vec!["requests<3".to_string(), "rich".to_string()],
            extra: toml::Table::new(),
        };
        let deps = ScriptDependencies::try_from(run).unwrap();
        assert!(deps.requires_python.unwrap().contains("3.12"));
        assert_eq!(deps.dependencies.len(), 2);
        assert_eq!(deps.dependencies[1].name, "rich");
    }

    #[test]
    fn test_empty_python_version_is_no_constraint() {
        let run = RunTable {
            requires_python: Some(String::new()),
            ..RunTable::default()
        };
        let deps = ScriptDependencies::try_from(run).unwrap();
        assert!(deps.requires_python.is_none());
    }

    #[test]
    fn test_invalid_dependency_propagates() {
        let run = RunTable {
            dependencies: vec!["not a requirement!".to_string()],
            ..RunTable::default()
        };
        assert!(matches!(
            ScriptDependencies::try_from(run),
            Err(Error::Requirement(_))
        ));
    }
}
