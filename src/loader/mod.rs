//! Loading of Oberon source files.

use std::{fs, path::Path};

use log::debug;

use crate::{ast::Module, error::CompileError, lexer::Lexer, parser};

/// Read a source file; I/O failures report the path.
pub fn load_source(path: &Path) -> Result<String, CompileError> {
    debug!("reading '{}'", path.display());

    fs::read_to_string(path).map_err(|error| CompileError::Io {
        path: path.to_path_buf(),
        message: format!("could not read '{}': {error}", path.display()),
    })
}

/// Lex and parse a source string into a module.
pub fn parse_source(source: &str) -> Result<Module<()>, CompileError> {
    let tokens = Lexer::new(source).lex()?;
    debug!("lexed {} tokens", tokens.len());

    let module = parser::parse(tokens)?;
    debug!("parsed module '{}'", module.name);

    Ok(module)
}

/// Read, lex and parse a module from a file.
pub fn load_module(path: &Path) -> Result<Module<()>, CompileError> {
    let source = load_source(path)?;
    parse_source(&source)
}
