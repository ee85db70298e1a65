use std::{error::Error, path::Path};

use test_utils::{check_run, Expected};

const BINARY: &str = env!("CARGO_BIN_EXE_dragon");
const SRC_PATH: &str = "./demos/expressions.dragon";
const EXPECTED: Expected = Expected {
    stdout: "7\n2.5\n-5\n3.5\n9\n",
    stderr: "",
};

#[test]
fn run_expressions() -> Result<(), Box<dyn Error>> {
    check_run(BINARY, Path::new(SRC_PATH), EXPECTED)
}
