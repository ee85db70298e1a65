use std::{error::Error, path::Path};

use test_utils::check_failure;

const BINARY: &str = env!("CARGO_BIN_EXE_dragon");

#[test]
fn string_comparison_is_a_runtime_error() -> Result<(), Box<dyn Error>> {
    check_failure(
        BINARY,
        Path::new("./demos/string_compare.dragon"),
        "[RUNTIME EXCEPTION]",
    )
}

#[test]
fn unmatched_block_is_a_syntax_error() -> Result<(), Box<dyn Error>> {
    check_failure(
        BINARY,
        Path::new("./demos/unmatched_if.dragon"),
        "[SYNTAX EXCEPTION]",
    )
}

#[test]
fn missing_file_fails() -> Result<(), Box<dyn Error>> {
    check_failure(
        BINARY,
        Path::new("./demos/does_not_exist.dragon"),
        "Failed to open file",
    )
}
