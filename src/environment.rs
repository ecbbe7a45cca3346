use crate::error::RuntimeError;
use crate::token::Token;
use crate::value::Value;
use log::debug;
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

/// A frame shared between its children and any closures created in it.
pub type SharedEnv = Rc<RefCell<Environment>>;

/// One scope frame: its own bindings plus a link to the frame enclosing it.
#[derive(Debug, Default)]
pub struct Environment {
    values: HashMap<String, Value>,
    enclosing: Option<SharedEnv>,
}

impl Environment {
    pub fn new() -> Self {
        Environment {
            values: HashMap::new(),
            enclosing: None,
        }
    }

    pub fn with_enclosing(enclosing: SharedEnv) -> Self {
        Environment {
            values: HashMap::new(),
            enclosing: Some(enclosing),
        }
    }

    /// Wrap into a shareable frame.
    pub fn shared(self) -> SharedEnv {
        Rc::new(RefCell::new(self))
    }

    /// Insert or overwrite `name` in this frame. Never fails.
    pub fn define(&mut self, name: &str, value: Value) {
        self.values.insert(name.to_string(), value);
    }

    pub fn get(&self, name: &Token) -> Result<Value, RuntimeError> {
        if let Some(value) = self.values.get(&name.lexeme) {
            Ok(value.clone())
        } else if let Some(enclosing) = &self.enclosing {
            enclosing.borrow().get(name)
        } else {
            Err(undefined(name))
        }
    }

    /// Overwrite the nearest existing binding of `name`; never creates one.
    pub fn assign(&mut self, name: &Token, value: Value) -> Result<(), RuntimeError> {
        if let Some(slot) = self.values.get_mut(&name.lexeme) {
            *slot = value;
            Ok(())
        } else if let Some(enclosing) = &self.enclosing {
            enclosing.borrow_mut().assign(name, value)
        } else {
            Err(undefined(name))
        }
    }

    /// Read `name` from the frame exactly `distance` hops out of `env`.
    pub fn get_at(env: &SharedEnv, distance: usize, name: &Token) -> Result<Value, RuntimeError> {
        let frame: SharedEnv = ancestor(env, distance, name)?;
        let value = frame.borrow().values.get(&name.lexeme).cloned();

        value.ok_or_else(|| undefined(name))
    }

    /// Write `name` in the frame exactly `distance` hops out of `env`.
    pub fn assign_at(
        env: &SharedEnv,
        distance: usize,
        name: &Token,
        value: Value,
    ) -> Result<(), RuntimeError> {
        let frame: SharedEnv = ancestor(env, distance, name)?;
        let mut frame = frame.borrow_mut();

        match frame.values.get_mut(&name.lexeme) {
            Some(slot) => {
                *slot = value;
                Ok(())
            }

            None => Err(undefined(name)),
        }
    }
}

/// Follow `distance` enclosing links from `env` (0 = `env` itself).
fn ancestor(env: &SharedEnv, distance: usize, name: &Token) -> Result<SharedEnv, RuntimeError> {
    let mut frame: SharedEnv = Rc::clone(env);

    for _ in 0..distance {
        let next: Option<SharedEnv> = frame.borrow().enclosing.clone();

        frame = match next {
            Some(next) => next,

            None => {
                debug!("Scope chain ended before reaching '{}'", name.lexeme);

                return Err(undefined(name));
            }
        };
    }

    Ok(frame)
}

fn undefined(name: &Token) -> RuntimeError {
    RuntimeError::new(name, format!("Undefined variable '{}'.", name.lexeme))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::token::TokenType;

    fn ident(name: &str) -> Token {
        Token::new(TokenType::IDENTIFIER, name, 1)
    }

    #[test]
    fn get_walks_outward() {
        let globals = Environment::new().shared();
        globals.borrow_mut().define("a", Value::Number(1.0));

        let inner = Environment::with_enclosing(Rc::clone(&globals)).shared();

        assert_eq!(inner.borrow().get(&ident("a")), Ok(Value::Number(1.0)));
    }

    #[test]
    fn assign_mutates_first_frame_holding_the_name() {
        let globals = Environment::new().shared();
        globals.borrow_mut().define("a", Value::Number(1.0));

        let inner = Environment::with_enclosing(Rc::clone(&globals)).shared();
        inner
            .borrow_mut()
            .assign(&ident("a"), Value::Number(2.0))
            .unwrap();

        assert_eq!(globals.borrow().get(&ident("a")), Ok(Value::Number(2.0)));
        assert!(inner.borrow().values.is_empty());
    }

    #[test]
    fn assign_to_unknown_name_fails_and_creates_nothing() {
        let globals = Environment::new().shared();

        let err = globals
            .borrow_mut()
            .assign(&ident("ghost"), Value::Nil)
            .unwrap_err();

        assert_eq!(err.message, "Undefined variable 'ghost'.");
        assert!(globals.borrow().get(&ident("ghost")).is_err());
    }

    #[test]
    fn define_shadows_in_current_frame_only() {
        let globals = Environment::new().shared();
        globals.borrow_mut().define("a", Value::String("outer".into()));

        let inner = Environment::with_enclosing(Rc::clone(&globals)).shared();
        inner
            .borrow_mut()
            .define("a", Value::String("inner".into()));

        assert_eq!(
            inner.borrow().get(&ident("a")),
            Ok(Value::String("inner".into()))
        );
        assert_eq!(
            globals.borrow().get(&ident("a")),
            Ok(Value::String("outer".into()))
        );
    }

    #[test]
    fn get_at_and_assign_at_jump_exact_distance() {
        let globals = Environment::new().shared();
        globals.borrow_mut().define("x", Value::Number(0.0));

        let middle = Environment::with_enclosing(Rc::clone(&globals)).shared();
        middle.borrow_mut().define("x", Value::Number(1.0));

        let inner = Environment::with_enclosing(Rc::clone(&middle)).shared();

        assert_eq!(
            Environment::get_at(&inner, 1, &ident("x")),
            Ok(Value::Number(1.0))
        );
        assert_eq!(
            Environment::get_at(&inner, 2, &ident("x")),
            Ok(Value::Number(0.0))
        );

        Environment::assign_at(&inner, 2, &ident("x"), Value::Number(5.0)).unwrap();

        assert_eq!(globals.borrow().get(&ident("x")), Ok(Value::Number(5.0)));
        assert_eq!(middle.borrow().get(&ident("x")), Ok(Value::Number(1.0)));
        assert!(Environment::get_at(&inner, 0, &ident("x")).is_err());
        assert!(Environment::get_at(&inner, 7, &ident("x")).is_err());
    }
}
