use std::{
    error::Error,
    fs,
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

/// Interpret a source file and compare the program output byte-for-byte.
pub fn check_run(binary: &str, src_path: &Path, expected: Expected) -> Result<(), Box<dyn Error>> {
    let output = Command::new(binary).arg(src_path).output()?;

    expected.assert_matches(&output)?;
    assert!(
        output.status.success(),
        "interpreter exited with status {:?}",
        output.status.code()
    );

    Ok(())
}

/// Compile a source file to IR and hand back the emitted text.
pub fn check_compile(
    binary: &str,
    src_path: &Path,
    out_path: &Path,
) -> Result<String, Box<dyn Error>> {
    let output = Command::new(binary)
        .arg(src_path)
        .arg("-c")
        .arg("-o")
        .arg(out_path)
        .output()?;

    let stderr = str::from_utf8(&output.stderr)?;
    assert!(stderr.is_empty(), "{stderr}");
    assert_eq!("", str::from_utf8(&output.stdout)?);
    assert!(
        output.status.success(),
        "compiler exited with status {:?}",
        output.status.code()
    );

    Ok(fs::read_to_string(out_path)?)
}

/// Run a failing source file and assert the diagnostic mentions `needle`.
pub fn check_failure(binary: &str, src_path: &Path, needle: &str) -> Result<(), Box<dyn Error>> {
    let output = Command::new(binary).arg(src_path).output()?;

    assert!(!output.status.success(), "expected a failing exit status");
    let stderr = str::from_utf8(&output.stderr)?;
    assert!(
        stderr.contains(needle),
        "stderr does not mention '{needle}': {stderr}"
    );

    Ok(())
}
