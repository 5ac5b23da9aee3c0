//! # Oberon
//!
//! This binary is the driver of the Oberon-0 toolchain. It combines lexer,
//! parser, typechecker, and the two back ends into a single application:
//! without flags a program is interpreted, with `-c` it is lowered to a
//! textual LLVM IR file next to the source.

mod cli;

use cli::*;

use std::{io, path::PathBuf, process};

use log::info;
use oberon0::{
    compiler::{self, Compiler},
    error::CompileError,
    interpreter::Interpreter,
    loader,
    typechecker::Typechecker,
};

fn main() {
    let args = Cli::init();

    simple_logger::init_with_level((&args.verbosity).into()).unwrap();

    let source = match loader::load_source(&args.file) {
        Ok(source) => source,
        Err(error) => fail(&error, None),
    };

    if let Err(error) = run(&args, &source) {
        fail(&error, Some(&source));
    }
}

fn fail(error: &CompileError, source: Option<&str>) -> ! {
    eprintln!("{error}");
    if let Some(rendered) = source.and_then(|source| error.render(source)) {
        eprintln!("{rendered}");
    }
    process::exit(error.exit_code());
}

fn run(args: &Cli, source: &str) -> Result<(), CompileError> {
    let module = loader::parse_source(source)?;
    if args.dump_parsed {
        info!(
            "parsed AST:\n{}",
            serde_json::to_string_pretty(&module).unwrap_or_default()
        );
    }

    let module = Typechecker::from_module(module).check()?;
    if args.dump_typed {
        info!(
            "typed AST:\n{}",
            serde_json::to_string_pretty(&module).unwrap_or_default()
        );
    }

    if args.compile {
        let ir = Compiler::from_module(module).compile()?;

        let output = args.output.clone().unwrap_or_else(|| {
            let mut name = args.file.as_os_str().to_owned();
            name.push(".ll");
            PathBuf::from(name)
        });
        compiler::write_ir(&output, &ir).map_err(|error| CompileError::Io {
            path: output.clone(),
            message: format!("could not write '{}': {error}", output.display()),
        })?;
        info!("generated '{}'", output.display());
    } else {
        let stdout = io::stdout();
        Interpreter::new(&module, stdout.lock()).run()?;
    }

    Ok(())
}
