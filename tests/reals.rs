use std::{error::Error, path::Path};

use test_utils::{check_run, Expected};

const SRC_PATH: &str = "./testdata/reals.ob";
const EXPECTED: Expected = Expected {
    stdout: "1.500000\n1.500000\n",
    stderr: "",
};

#[test]
fn interpret_reals() -> Result<(), Box<dyn Error>> {
    check_run(env!("CARGO_BIN_EXE_oberon"), Path::new(SRC_PATH), EXPECTED)
}
