//! Pretty-printer round trip: printing a parsed module and parsing the
//! printed text again yields a structurally equal AST.

use std::{error::Error, fs};

use oberon0::loader;

const SOURCES: &[&str] = &[
    "./testdata/hello.ob",
    "./testdata/sum.ob",
    "./testdata/loop.ob",
    "./testdata/factorial.ob",
    "./testdata/matrix.ob",
    "./testdata/reals.ob",
    "./testdata/undeclared.ob",
];

#[test]
fn pretty_printed_modules_reparse_identically() -> Result<(), Box<dyn Error>> {
    for path in SOURCES {
        let source = fs::read_to_string(path)?;
        let module = loader::parse_source(&source)?;

        let printed = module.to_string();
        let reparsed = loader::parse_source(&printed)
            .unwrap_or_else(|error| panic!("pretty output of '{path}' does not parse: {error}"));

        assert_eq!(module, reparsed, "round trip changed the AST of '{path}'");
    }

    Ok(())
}

#[test]
fn pretty_printing_preserves_precedence() -> Result<(), Box<dyn Error>> {
    let source = "MODULE P; VAR a, b, c: INTEGER; BEGIN a := (a + b) * c - a; b := -a + b * c; END P.";
    let module = loader::parse_source(source)?;
    let reparsed = loader::parse_source(&module.to_string())?;

    assert_eq!(module, reparsed);

    Ok(())
}
