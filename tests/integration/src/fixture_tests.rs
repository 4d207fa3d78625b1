//! End-to-end tests over the fixture scripts in `test-fixtures/scripts`.
//!
//! Every fixture is read from disk through the file source, so these tests
//! exercise the full flow: open -> scan -> collect -> decode.

use embedded_blocks::ScanWarning;
use embedded_metadata::{EmbeddedMetadataParser, Error};
use pretty_assertions::assert_eq;
use rstest::rstest;
use std::collections::BTreeMap;
use std::path::PathBuf;

fn fixture(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("../../test-fixtures/scripts")
        .join(name)
}

fn parser(name: &str) -> EmbeddedMetadataParser {
    EmbeddedMetadataParser::from_path(fixture(name))
}

fn blocks(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
    pairs
        .iter()
        .map(|(name, text)| (name.to_string(), text.to_string()))
        .collect()
}

#[rstest]
#[case(
    "single_block.py",
    &[(
        "pyproject",
        "[run]\nrequires-python = \">=3.10\"\ndependencies = [\n    \"requests<3\",\n    \"rich\",\n]\n",
    )]
)]
#[case(
    "multiple_opening_lines.py",
    &[(
        "pyproject",
        "[run]\ndependencies = [\"requests\"]\n/// pyproject\nrequires-python = \">=3.11\"\n",
    )]
)]
#[case("unclosed_block.py", &[("tool", "answer = 42\n")])]
#[case("legacy_name.py", &[("pyproject.toml", "[run]\ndependencies = [\"requests\"]\n")])]
#[case("invalid_names.py", &[("valid-name", "kept = true\n")])]
#[case("no_metadata.py", &[])]
#[case(
    "multiple_blocks.py",
    &[
        (
            "pyproject",
            "[run]\nrequires-python = \">=3.8,<4\"\ndependencies = [\"httpx[http2]>=0.27\", \"tomli; python_version < '3.11'\"]\n",
        ),
        ("readme", "\nExample usage:\n  python multiple_blocks.py --help\n\n"),
    ]
)]
fn test_fixture_blocks(#[case] name: &str, #[case] expected: &[(&str, &str)]) {
    assert_eq!(parser(name).metadata_blocks().unwrap(), blocks(expected));
}

#[test]
fn test_duplicate_blocks_fixture() {
    let parser = parser("duplicate_blocks.py");

    let err = parser.metadata_blocks().unwrap_err();
    assert!(!err.is_not_found());
    assert_eq!(err.to_string(), "Multiple 'pyproject' blocks found.");

    // The lazy lookup finds the first block before reaching the second
    assert_eq!(
        parser.get_first_metadata_block("pyproject").unwrap(),
        "[run]\ndependencies = [\"requests\"]\n"
    );
}

#[test]
fn test_multiple_opening_lines_decode_error() {
    let err = parser("multiple_opening_lines.py")
        .get_pyproject_toml()
        .unwrap_err();

    assert!(matches!(err, Error::Decode { .. }));
    assert!(err.to_string().contains(
        "Possible Metadata Syntax Errors: New 'pyproject' block encountered before block 'pyproject' closed."
    ));
}

#[test]
fn test_unclosed_block_fixture_warnings() {
    let scan = parser("unclosed_block.py").scan().unwrap();
    assert_eq!(
        scan.warnings,
        vec![ScanWarning::UnclosedBlock {
            name: "pyproject".to_string(),
            line: 1,
        }]
    );

    // The abandoned block does not count as a pyproject block
    let parser = parser("unclosed_block.py");
    assert_eq!(parser.pyproject_raw().unwrap(), None);
    assert!(parser.script_dependencies().unwrap().dependencies.is_empty());
}

#[test]
fn test_single_block_dependencies() {
    let deps = parser("single_block.py").script_dependencies().unwrap();

    let python = deps.requires_python.unwrap();
    assert_eq!(python.to_string(), ">=3.10");
    assert!(python.contains("3.12"));

    let rendered: Vec<_> = deps.dependencies.iter().map(ToString::to_string).collect();
    assert_eq!(rendered, vec!["requests<3", "rich"]);
}

#[test]
fn test_multiple_blocks_dependencies() {
    let parser = parser("multiple_blocks.py");

    let plain = parser.plain_script_dependencies().unwrap();
    assert_eq!(plain.requires_python.as_deref(), Some(">=3.8,<4"));

    let deps = parser.script_dependencies().unwrap();
    let httpx = &deps.dependencies[0];
    assert_eq!(httpx.name, "httpx");
    assert_eq!(httpx.extras, vec!["http2"]);

    let tomli = &deps.dependencies[1];
    assert!(tomli.specifier.is_none());
    assert_eq!(tomli.marker.as_deref(), Some("python_version < '3.11'"));

    // The readme block is not TOML, but only the pyproject block is decoded
    assert!(parser.get_block_toml("readme").is_err());
}

#[test]
fn test_missing_fixture() {
    let err = parser("does_not_exist.py").metadata_blocks().unwrap_err();
    assert!(matches!(err, Error::Scan(embedded_blocks::Error::Io { .. })));
}
