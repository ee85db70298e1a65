use std::{error::Error, path::Path};

use test_utils::{check_run, Expected};

const BINARY: &str = env!("CARGO_BIN_EXE_dragon");
const SRC_PATH: &str = "./demos/strings.dragon";
const EXPECTED: Expected = Expected {
    stdout: "Hello, Dragon\nab",
    stderr: "",
};

#[test]
fn run_string_concatenation() -> Result<(), Box<dyn Error>> {
    check_run(BINARY, Path::new(SRC_PATH), EXPECTED)
}
