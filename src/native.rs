//! Host functions installed into the global frame.

use chrono::Utc;
use log::debug;

use crate::error::RuntimeError;
use crate::interpreter::Interpreter;
use crate::value::{Callable, Value};

/// `clock()`: wall‑clock time in seconds since the Unix epoch.
#[derive(Debug, Default, Clone, Copy)]
pub struct Clock;

impl Callable for Clock {
    fn name(&self) -> &str {
        "clock"
    }

    fn arity(&self) -> usize {
        0
    }

    fn call(
        &self,
        _interpreter: &mut Interpreter,
        _arguments: Vec<Value>,
    ) -> Result<Value, RuntimeError> {
        let seconds: f64 = Utc::now().timestamp_micros() as f64 / 1_000_000.0;

        debug!("Native function 'clock' returned: {}", seconds);

        Ok(Value::Number(seconds))
    }
}
