use std::{error::Error, path::Path};

use test_utils::{check_run, Expected};

const BINARY: &str = env!("CARGO_BIN_EXE_dragon");

#[test]
fn run_branching_function() -> Result<(), Box<dyn Error>> {
    check_run(
        BINARY,
        Path::new("./demos/functions.dragon"),
        Expected {
            stdout: "3\n4\n",
            stderr: "",
        },
    )
}

#[test]
fn run_nested_calls() -> Result<(), Box<dyn Error>> {
    check_run(
        BINARY,
        Path::new("./demos/calls.dragon"),
        Expected {
            stdout: "6\n20\n",
            stderr: "",
        },
    )
}

#[test]
fn run_main_after_top_level() -> Result<(), Box<dyn Error>> {
    check_run(
        BINARY,
        Path::new("./demos/main.dragon"),
        Expected {
            stdout: "1\n2\n",
            stderr: "",
        },
    )
}
