//! Centralised error hierarchy for the **Lox interpreter**.
//!
//! Two independent taxonomies live here:
//!
//! * **Static errors** (`Lex`, `Parse`, `Resolve`) are never fatal to the
//!   pass that finds them. Each pass pushes them into a [`Diagnostics`]
//!   collector owned by the caller and keeps going, so one run can surface
//!   many independent problems.
//! * **Runtime errors** ([`RuntimeError`]) unwind evaluation through `?` and
//!   are caught once, at the outermost execution boundary.
//!
//! The module **does not** print diagnostics itself.

use std::fmt;
use std::io;

use log::info;
use thiserror::Error;

use crate::token::{Token, TokenType};

/// Where in the source a static error points at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Location {
    /// The offending token was `EOF`.
    End,

    /// The lexeme of the offending token.
    Lexeme(String),
}

impl Location {
    fn of(token: &Token) -> Self {
        if token.token_type == TokenType::EOF {
            Location::End
        } else {
            Location::Lexeme(token.lexeme.clone())
        }
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Location::End => write!(f, " at end"),
            Location::Lexeme(lexeme) => write!(f, " at '{}'", lexeme),
        }
    }
}

/// A runtime failure: one message plus the line of the token that caused it.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("{message}\n[line {line}]")]
pub struct RuntimeError {
    pub message: String,
    pub line: usize,
}

impl RuntimeError {
    pub fn new<S: Into<String>>(token: &Token, msg: S) -> Self {
        let message: String = msg.into();

        info!("Creating Runtime error: line={}, msg={}", token.line, message);

        RuntimeError {
            message,
            line: token.line,
        }
    }

    /// The output sink rejected a `print`; there is no source token to blame.
    pub fn output(error: io::Error) -> Self {
        RuntimeError {
            message: format!("Failed to write output: {}", error),
            line: 0,
        }
    }
}

/// Canonical error type used throughout the interpreter.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum LoxError {
    /// Lexical (scanner) error with source line information.
    #[error("[line {line}] Error: {message}")]
    Lex {
        /// Human‑readable description.
        message: String,

        /// 1‑based line where the error occurred.
        line: usize,
    },

    /// Syntactic (parser) error.
    #[error("[line {line}] Error{location}: {message}")]
    Parse {
        message: String,
        line: usize,
        location: Location,
    },

    /// Static‑analysis or resolution failure (e.g. early‑binding errors).
    #[error("[line {line}] Error{location}: {message}")]
    Resolve {
        message: String,
        line: usize,
        location: Location,
    },

    /// Every static error found by one pass over a program.
    #[error("{0}")]
    Static(Diagnostics),

    /// Runtime evaluation error.
    #[error(transparent)]
    Runtime(#[from] RuntimeError),

    /// UTF‑8 decoding failure when ingesting external text.
    #[error(transparent)]
    Utf8(#[from] std::string::FromUtf8Error),
}

impl LoxError {
    /// Helper constructor for the **scanner**.
    pub fn lex<S: Into<String>>(line: usize, msg: S) -> Self {
        let message: String = msg.into();

        info!("Creating Lex error: line={}, msg={}", line, message);

        LoxError::Lex { message, line }
    }

    /// Helper constructor for the **parser**.
    pub fn parse<S: Into<String>>(token: &Token, msg: S) -> Self {
        let message: String = msg.into();

        info!("Creating Parse error: line={}, msg={}", token.line, message);

        LoxError::Parse {
            message,
            line: token.line,
            location: Location::of(token),
        }
    }

    /// Helper constructor for the **resolver**.
    pub fn resolve<S: Into<String>>(token: &Token, msg: S) -> Self {
        let message: String = msg.into();

        info!("Creating Resolve error: line={}, msg={}", token.line, message);

        LoxError::Resolve {
            message,
            line: token.line,
            location: Location::of(token),
        }
    }

    /// Static errors suppress execution; the host maps them to exit code 65.
    pub fn is_static(&self) -> bool {
        matches!(
            self,
            LoxError::Lex { .. }
                | LoxError::Parse { .. }
                | LoxError::Resolve { .. }
                | LoxError::Static(_)
        )
    }
}

/// Collector for static errors, threaded through scanner, parser and
/// resolver by the call site.
#[derive(Debug, Default)]
pub struct Diagnostics {
    errors: Vec<LoxError>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn report(&mut self, error: LoxError) {
        self.errors.push(error);
    }

    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    pub fn len(&self) -> usize {
        self.errors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &LoxError> {
        self.errors.iter()
    }

    /// `Ok(())` when nothing was reported, otherwise the whole collection.
    pub fn into_result(self) -> Result<()> {
        if self.has_errors() {
            Err(LoxError::Static(self))
        } else {
            Ok(())
        }
    }
}

impl fmt::Display for Diagnostics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, error) in self.errors.iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }

            write!(f, "{}", error)?;
        }

        Ok(())
    }
}

impl IntoIterator for Diagnostics {
    type Item = LoxError;
    type IntoIter = std::vec::IntoIter<LoxError>;

    fn into_iter(self) -> Self::IntoIter {
        self.errors.into_iter()
    }
}

/// Crate‑wide `Result` alias.
pub type Result<T> = std::result::Result<T, LoxError>;
