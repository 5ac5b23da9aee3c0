//! Top-level error type of the pipeline.
//!
//! Each stage owns its error struct; [`CompileError`] wraps them, renders the
//! `<stage>: <message> at <line>:<col>` contract and maps to the process exit
//! code (1 for user errors, 2 for internal emitter errors).

use std::{error::Error, fmt::Display, path::PathBuf};

use colored::Colorize;

use crate::{
    ast::Position, compiler::EmitError, interpreter::RuntimeError, lexer::LexError,
    parser::ParseError, typechecker::TypeError,
};

#[derive(Debug)]
pub enum CompileError {
    Io { path: PathBuf, message: String },
    Lex(LexError),
    Parse(ParseError),
    Type(TypeError),
    Emit(EmitError),
    Runtime(RuntimeError),
}

impl CompileError {
    pub fn exit_code(&self) -> i32 {
        match self {
            CompileError::Emit(_) => 2,
            _ => 1,
        }
    }

    fn position(&self) -> Option<Position> {
        match self {
            CompileError::Io { .. } | CompileError::Emit(_) => None,
            CompileError::Lex(error) => Some(error.position),
            CompileError::Parse(error) => Some(error.position),
            CompileError::Type(error) => Some(error.position),
            CompileError::Runtime(error) => Some(error.position),
        }
    }

    /// Render the offending source line with a caret under the error column.
    pub fn render(&self, source: &str) -> Option<String> {
        let (line, col) = self.position()?;
        let lines = source.lines().collect::<Vec<_>>();
        let line_str = lines.get(line - 1)?;
        let prev_line = if line > 1 { lines[line - 2] } else { "" };

        let left_margin = format!("{line}").len();
        let left_margin_fill = " ".repeat(left_margin);
        let left_padding_fill = " ".repeat(col.saturating_sub(1));
        let caret = "^".red();

        Some(format!(
            "{left_margin_fill} |{prev_line}\n{line} |{line_str}\n{left_margin_fill} |{left_padding_fill}{caret}"
        ))
    }
}

impl Display for CompileError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CompileError::Io { message, .. } => write!(f, "io: {message}"),
            CompileError::Lex(error) => write!(f, "lexer: {error}"),
            CompileError::Parse(error) => write!(f, "parser: {error}"),
            CompileError::Type(error) => write!(f, "semantic: {error}"),
            CompileError::Emit(error) => write!(f, "emitter: {error}"),
            CompileError::Runtime(error) => write!(f, "runtime: {error}"),
        }
    }
}

impl Error for CompileError {}

impl From<LexError> for CompileError {
    fn from(error: LexError) -> Self {
        CompileError::Lex(error)
    }
}

impl From<ParseError> for CompileError {
    fn from(error: ParseError) -> Self {
        CompileError::Parse(error)
    }
}

impl From<TypeError> for CompileError {
    fn from(error: TypeError) -> Self {
        CompileError::Type(error)
    }
}

impl From<EmitError> for CompileError {
    fn from(error: EmitError) -> Self {
        CompileError::Emit(error)
    }
}

impl From<RuntimeError> for CompileError {
    fn from(error: RuntimeError) -> Self {
        CompileError::Runtime(error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_contract_format() {
        let error = CompileError::Type(TypeError {
            message: "undeclared identifier 'x'".into(),
            position: (3, 7),
        });

        assert_eq!("semantic: undeclared identifier 'x' at 3:7", error.to_string());
        assert_eq!(1, error.exit_code());
    }

    #[test]
    fn test_emitter_errors_are_internal() {
        let error = CompileError::Emit(EmitError {
            message: "no storage for variable 'x'".into(),
        });

        assert_eq!(
            "emitter: internal compiler error: no storage for variable 'x'",
            error.to_string()
        );
        assert_eq!(2, error.exit_code());
    }

    #[test]
    fn test_render_points_at_the_column() {
        let error = CompileError::Type(TypeError {
            message: "undeclared identifier 'x'".into(),
            position: (1, 17),
        });
        let rendered = error
            .render("MODULE E; BEGIN x := 1; END E.")
            .expect("rendering failed");

        assert!(rendered.contains("1 |MODULE E; BEGIN x := 1; END E."));
    }
}
