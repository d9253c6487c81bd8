//! Lox interpreter command-line.
//!
//! When called without argument it drops into an interactive
//! read-evaluate-print loop that keeps definitions across lines.
//!
//! When called with a script argument, it interprets the file and exits
//! with 65 on compile errors and 70 on runtime errors.

use std::fs;
use std::io;
use std::io::prelude::*;
use std::path::PathBuf;
use std::process;

use anyhow::Context;
use clap::Parser;
use colored::Colorize;

use twlox::interpreter::{Interpreter, LoxError};

// Conventional sysexits codes: EX_DATAERR and EX_SOFTWARE.
const EXIT_COMPILE_ERROR: i32 = 65;
const EXIT_RUNTIME_ERROR: i32 = 70;

#[derive(Parser)]
#[command(name = "twlox", about = "The Lox tree-walk interpreter")]
struct Cli {
    /// Script to run; omit to start a REPL
    script: Option<PathBuf>,
}

fn main() -> Result<(), anyhow::Error> {
    let cli = Cli::parse();
    match cli.script {
        Some(path) => run_file(&path),
        None => run_prompt().map_err(Into::into),
    }
}

fn run_file(path: &PathBuf) -> Result<(), anyhow::Error> {
    let source = fs::read_to_string(path)
        .with_context(|| format!("failed to open {}", path.display()))?;

    let mut interp_stdout = io::stdout();
    let mut interp = Interpreter::new(&mut interp_stdout);
    if let Err(e) = interp.eval(&source) {
        eprintln!("{}", e.to_string().red());
        match e {
            LoxError::Compile(_) => process::exit(EXIT_COMPILE_ERROR),
            LoxError::Runtime(_) => process::exit(EXIT_RUNTIME_ERROR),
        }
    }
    Ok(())
}

fn run_prompt() -> Result<(), io::Error> {
    let stdin = io::stdin();
    let mut repl_stdout = io::stdout();
    let mut interp_stdout = io::stdout();

    let mut interp = Interpreter::new(&mut interp_stdout);

    let mut input = String::new();
    loop {
        repl_stdout.write_all("\n> ".as_bytes())?;
        repl_stdout.flush()?;

        input.clear();
        let nbytes = stdin.read_line(&mut input)?;
        if nbytes == 0 {
            break;
        }

        // Errors keep the session alive; the next line starts clean.
        if let Err(e) = interp.eval(&input) {
            eprintln!("{}", e.to_string().red());
        }
    }

    Ok(())
}
