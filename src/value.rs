//! Runtime values and the callable surface shared by user functions and
//! host‑provided natives.

use std::fmt;
use std::rc::Rc;

use log::debug;

use crate::ast::FunctionDecl;
use crate::environment::{Environment, SharedEnv};
use crate::error::RuntimeError;
use crate::interpreter::{Flow, Interpreter};

/// Anything that can appear after a callee expression and `( … )`.
///
/// Hosts implement this to inject capabilities into the global frame with
/// [`Interpreter::define_native`]. The interpreter checks [`Callable::arity`]
/// before calling, so `call` always receives exactly that many arguments.
pub trait Callable {
    fn name(&self) -> &str;

    fn arity(&self) -> usize;

    fn call(
        &self,
        interpreter: &mut Interpreter,
        arguments: Vec<Value>,
    ) -> Result<Value, RuntimeError>;
}

#[derive(Clone)]
pub enum Value {
    Nil,
    Bool(bool),
    Number(f64),
    String(String),
    Function(Rc<LoxFunction>),
    Native(Rc<dyn Callable>),
}

impl Value {
    /// `nil` and `false` are falsy; everything else is truthy.
    pub fn is_truthy(&self) -> bool {
        !matches!(self, Value::Nil | Value::Bool(false))
    }

    /// The value as something callable, if it is one.
    pub fn as_callable(&self) -> Option<Rc<dyn Callable>> {
        match self {
            Value::Function(function) => Some(Rc::clone(function) as Rc<dyn Callable>),
            Value::Native(native) => Some(Rc::clone(native)),
            _ => None,
        }
    }
}

impl PartialEq for Value {
    /// Values of different types are never equal; callables compare by
    /// identity.
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Nil, Value::Nil) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Number(a), Value::Number(b)) => a == b,
            (Value::String(a), Value::String(b)) => a == b,
            (Value::Function(a), Value::Function(b)) => Rc::ptr_eq(a, b),
            (Value::Native(a), Value::Native(b)) => Rc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Number(n)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_owned())
    }
}

/// Magnitudes from here on print in exponent form (`1e21`), as do
/// infinities.
const EXPONENT_THRESHOLD: f64 = 1e21;

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Nil => write!(f, "nil"),

            Value::Bool(b) => write!(f, "{}", b),

            Value::Number(n) => {
                let negative_zero: bool = *n == 0.0 && n.is_sign_negative();

                if n.abs() >= EXPONENT_THRESHOLD {
                    write!(f, "{:e}", n)
                } else if n.fract() == 0.0 && n.abs() < i64::MAX as f64 && !negative_zero {
                    let mut buf: itoa::Buffer = itoa::Buffer::new();
                    f.write_str(buf.format(*n as i64))
                } else {
                    write!(f, "{}", n)
                }
            }

            Value::String(s) => f.write_str(s),

            Value::Function(function) => write!(f, "{}", function),

            Value::Native(native) => write!(f, "<native fn {}>", native.name()),
        }
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::String(s) => write!(f, "{:?}", s),
            other => write!(f, "{}", other),
        }
    }
}

/// A user function paired with the frame that was current where it was
/// evaluated.
pub struct LoxFunction {
    declaration: Rc<FunctionDecl>,
    closure: SharedEnv,
}

impl LoxFunction {
    pub fn new(declaration: Rc<FunctionDecl>, closure: SharedEnv) -> Self {
        Self {
            declaration,
            closure,
        }
    }
}

impl Callable for LoxFunction {
    fn name(&self) -> &str {
        self.declaration
            .name
            .as_ref()
            .map_or("", |token| token.lexeme.as_str())
    }

    fn arity(&self) -> usize {
        self.declaration.arity()
    }

    fn call(
        &self,
        interpreter: &mut Interpreter,
        arguments: Vec<Value>,
    ) -> Result<Value, RuntimeError> {
        let mut frame = Environment::with_enclosing(Rc::clone(&self.closure));

        for (param, argument) in self.declaration.params.iter().zip(arguments) {
            debug!("Binding parameter '{}' to {}", param.lexeme, argument);
            frame.define(&param.lexeme, argument);
        }

        match interpreter.execute_block(&self.declaration.body, frame.shared())? {
            Flow::Return(value) => Ok(value),
            Flow::Normal | Flow::Break => Ok(Value::Nil),
        }
    }
}

impl fmt::Display for LoxFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.declaration.name {
            Some(name) => write!(f, "<fn {}>", name.lexeme),
            None => write!(f, "<fn>"),
        }
    }
}

impl fmt::Debug for LoxFunction {
    // The closure may contain this very function; never print it.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn integral_numbers_print_without_fraction() {
        assert_eq!(Value::Number(3.0).to_string(), "3");
        assert_eq!(Value::Number(-12.0).to_string(), "-12");
        assert_eq!(Value::Number(2.5).to_string(), "2.5");
        assert_eq!(Value::Number(0.1 + 0.2).to_string(), "0.30000000000000004");
        assert_eq!(Value::Number(-0.0).to_string(), "-0");
    }

    #[test]
    fn huge_numbers_print_in_exponent_form() {
        assert_eq!(Value::Number(1e300).to_string(), "1e300");
        assert_eq!(Value::Number(-2.5e21).to_string(), "-2.5e21");
        assert_eq!(Value::Number(f64::INFINITY).to_string(), "inf");
        assert_eq!(Value::Number(1e20).to_string(), "100000000000000000000");
    }

    #[test]
    fn scalars_stringify() {
        assert_eq!(Value::Nil.to_string(), "nil");
        assert_eq!(Value::Bool(true).to_string(), "true");
        assert_eq!(Value::Bool(false).to_string(), "false");
        assert_eq!(Value::from("verbatim \"text\"").to_string(), "verbatim \"text\"");
    }

    #[test]
    fn truthiness() {
        assert!(!Value::Nil.is_truthy());
        assert!(!Value::Bool(false).is_truthy());
        assert!(Value::Bool(true).is_truthy());
        assert!(Value::Number(0.0).is_truthy());
        assert!(Value::from("").is_truthy());
    }

    #[test]
    fn equality_never_coerces() {
        assert_eq!(Value::Nil, Value::Nil);
        assert_ne!(Value::Nil, Value::Bool(false));
        assert_ne!(Value::Number(1.0), Value::from("1"));
        assert_ne!(Value::Number(0.0), Value::Bool(false));
        assert_eq!(Value::from("a"), Value::from("a"));
    }
}
