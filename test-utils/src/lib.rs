use std::{
    error::Error,
    io,
    path::Path,
    process::{Command, Output},
    str,
};

pub struct Expected<'a> {
    pub stdout: &'a str,
    pub stderr: &'a str,
}

impl<'a> Expected<'a> {
    fn assert_matches(self, output: &Output) -> Result<(), Box<dyn Error>> {
        assert_eq!(str::from_utf8(&output.stdout)?, self.stdout);
        assert_eq!(str::from_utf8(&output.stderr)?, self.stderr);
        Ok(())
    }
}

fn run_interpreter(binary: &str, src_path: &Path) -> Result<Output, io::Error> {
    Command::new(binary).arg(src_path).output()
}

/// Run a program and compare its exact stdout/stderr.
pub fn check_run(binary: &str, src_path: &Path, expected: Expected) -> Result<(), Box<dyn Error>> {
    let output = run_interpreter(binary, src_path)?;

    expected.assert_matches(&output)?;
    assert!(
        output.status.success(),
        "interpreter exited with status {:?}",
        output.status.code()
    );

    Ok(())
}

/// Run a program that must fail: non-zero exit and `marker` on stderr.
pub fn check_failure(binary: &str, src_path: &Path, marker: &str) -> Result<(), Box<dyn Error>> {
    let output = run_interpreter(binary, src_path)?;
    let stderr = str::from_utf8(&output.stderr)?;

    assert!(
        !output.status.success(),
        "interpreter should exit with a non-zero status"
    );
    assert!(
        stderr.contains(marker),
        "stderr `{stderr}` does not contain `{marker}`"
    );

    Ok(())
}
