use std::{error::Error, path::Path};

use test_utils::check_failure;

const SRC_PATH: &str = "./testdata/undeclared.ob";

#[test]
fn reject_undeclared_identifier() -> Result<(), Box<dyn Error>> {
    check_failure(
        env!("CARGO_BIN_EXE_oberon"),
        Path::new(SRC_PATH),
        "undeclared identifier 'x'",
    )
}
