use std::{error::Error, path::Path};

use test_utils::{check_run, Expected};

const BINARY: &str = env!("CARGO_BIN_EXE_dragon");
const SRC_PATH: &str = "./demos/loop.dragon";
const EXPECTED: Expected = Expected {
    stdout: "10\n",
    stderr: "",
};

#[test]
fn run_loop() -> Result<(), Box<dyn Error>> {
    check_run(BINARY, Path::new(SRC_PATH), EXPECTED)
}
