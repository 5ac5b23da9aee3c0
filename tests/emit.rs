use std::{env, error::Error, path::Path};

use test_utils::check_compile;

#[test]
fn emit_hello_module() -> Result<(), Box<dyn Error>> {
    let out_path = env::temp_dir().join("oberon_emit_hello.ll");
    let ir = check_compile(
        env!("CARGO_BIN_EXE_oberon"),
        Path::new("./testdata/hello.ob"),
        &out_path,
    )?;

    assert!(ir.starts_with("; ModuleID = \"oberon_module\"\n"));
    assert!(ir.contains("declare i32 @printf(i8*, ...)\n"));
    assert!(ir.contains("define i32 @main() {\n"));
    assert!(ir.contains("@.str0 = private constant [3 x i8] c\"Hi\\00\""));
    assert!(ir.contains("@.str2 = private constant [2 x i8] c\"\\0A\\00\""));
    assert!(ir.trim_end().ends_with("c\"\\0A\\00\""));

    Ok(())
}

#[test]
fn emit_factorial_module() -> Result<(), Box<dyn Error>> {
    let out_path = env::temp_dir().join("oberon_emit_factorial.ll");
    let ir = check_compile(
        env!("CARGO_BIN_EXE_oberon"),
        Path::new("./testdata/factorial.ob"),
        &out_path,
    )?;

    assert!(ir.contains("define i32 @f(i32 %n.arg) {\n"));
    assert!(ir.contains("entry:\n  %n = alloca i32\n  store i32 %n.arg, i32* %n\n"));

    // every label line is preceded by a terminator
    let lines = ir.lines().collect::<Vec<_>>();
    for (index, line) in lines.iter().enumerate() {
        if line.ends_with(':') && !line.starts_with("entry") {
            let previous = lines[index - 1].trim_start();
            assert!(
                previous.starts_with("br") || previous.starts_with("ret"),
                "block before '{line}' is not terminated: '{previous}'"
            );
        }
    }

    Ok(())
}

#[test]
fn emit_matrix_module() -> Result<(), Box<dyn Error>> {
    let out_path = env::temp_dir().join("oberon_emit_matrix.ll");
    let ir = check_compile(
        env!("CARGO_BIN_EXE_oberon"),
        Path::new("./testdata/matrix.ob"),
        &out_path,
    )?;

    assert!(ir.contains("@m = global [2 x [2 x i32]] zeroinitializer\n"));
    assert!(ir.contains(
        "getelementptr inbounds [2 x [2 x i32]], [2 x [2 x i32]]* @m, i32 0, i32 1, i32 0"
    ));

    Ok(())
}
