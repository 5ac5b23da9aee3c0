use std::{error::Error, path::Path};

use test_utils::{check_run, Expected};

const SRC_PATH: &str = "./testdata/loop.ob";
const EXPECTED: Expected = Expected {
    stdout: "1 2 3 \n",
    stderr: "",
};

#[test]
fn interpret_loop() -> Result<(), Box<dyn Error>> {
    check_run(env!("CARGO_BIN_EXE_oberon"), Path::new(SRC_PATH), EXPECTED)
}
