//! `rox`: a tree‑walking interpreter for Lox.
//!
//! Source text flows through [`scanner`] → [`parser`] → [`resolver`] →
//! [`interpreter`]. [`Lox`] wires the stages together and keeps interpreter
//! state alive between runs, which is what a REPL needs.

pub mod ast;
pub mod ast_printer;
pub mod environment;
pub mod error;
pub mod interpreter;
pub mod native;
pub mod parser;
pub mod resolver;
pub mod scanner;
pub mod token;
pub mod value;

use std::io::Write;

use log::{debug, info};

use crate::ast::Stmt;
use crate::error::{Diagnostics, LoxError, Result};
use crate::interpreter::Interpreter;
use crate::parser::Parser;
use crate::resolver::Resolver;

/// Scan and parse `source` on its own, without resolving or running it.
/// Static errors found on the way are returned together.
pub fn parse_source(source: &str) -> Result<Vec<Stmt>> {
    let mut diagnostics = Diagnostics::new();

    let tokens = scanner::scan_tokens(source, &mut diagnostics);
    let statements = Parser::new(tokens, &mut diagnostics).parse();

    diagnostics.into_result()?;

    Ok(statements)
}

/// One interpreter session.
pub struct Lox {
    interpreter: Interpreter,

    /// First expression id the next parse may use.
    next_expr_id: u32,

    had_runtime_error: bool,
}

impl Default for Lox {
    fn default() -> Self {
        Self::new()
    }
}

impl Lox {
    /// Session printing to stdout.
    pub fn new() -> Self {
        Self::with_interpreter(Interpreter::new())
    }

    /// Session printing to `out`.
    pub fn with_output(out: Box<dyn Write>) -> Self {
        Self::with_interpreter(Interpreter::with_output(out))
    }

    pub fn with_interpreter(interpreter: Interpreter) -> Self {
        Self {
            interpreter,
            next_expr_id: 0,
            had_runtime_error: false,
        }
    }

    pub fn interpreter(&mut self) -> &mut Interpreter {
        &mut self.interpreter
    }

    /// Whether any run of this session ended in a runtime error.
    pub fn had_runtime_error(&self) -> bool {
        self.had_runtime_error
    }

    /// Run a whole program.
    ///
    /// Static errors come back as [`LoxError::Static`] and nothing executes;
    /// a runtime error comes back as [`LoxError::Runtime`] after the
    /// statements before it have run.
    pub fn run(&mut self, source: &str) -> Result<()> {
        let statements = self.prepare(source)?;
        let outcome = self.interpreter.interpret(&statements);

        self.finish(outcome)
    }

    /// Run one prompt entry: like [`Lox::run`], but bare expression
    /// statements print their value. Globals persist between entries.
    pub fn run_prompt_line(&mut self, source: &str) -> Result<()> {
        let statements = self.prepare(source)?;
        let outcome = self.interpreter.interpret_repl(&statements);

        self.finish(outcome)
    }

    /// Scan, parse and resolve `source` against this session's interpreter.
    fn prepare(&mut self, source: &str) -> Result<Vec<Stmt>> {
        info!("Preparing {} bytes of source", source.len());

        let mut diagnostics = Diagnostics::new();

        let tokens = scanner::scan_tokens(source, &mut diagnostics);

        let mut parser = Parser::new(tokens, &mut diagnostics).starting_at(self.next_expr_id);
        let statements: Vec<Stmt> = parser.parse();
        self.next_expr_id = parser.next_id();

        // Only a tree that parsed cleanly is resolved.
        if !diagnostics.has_errors() {
            Resolver::new(&mut self.interpreter, &mut diagnostics).resolve(&statements);
        }

        debug!("Static pass found {} error(s)", diagnostics.len());

        diagnostics.into_result()?;

        Ok(statements)
    }

    fn finish(&mut self, outcome: std::result::Result<(), error::RuntimeError>) -> Result<()> {
        outcome.map_err(|e| {
            self.had_runtime_error = true;

            LoxError::Runtime(e)
        })
    }
}
