//! Tree‑walking evaluator.
//!
//! Statements produce a [`Flow`]: `break` and `return` travel outward as
//! ordinary `Ok` values until the loop or call that owns them, and runtime
//! errors travel as `Err` until [`Interpreter::interpret`].

use std::collections::HashMap;
use std::io::{self, Write};
use std::mem;
use std::rc::Rc;

use log::{debug, info};

use crate::ast::{Expr, ExprId, ExprKind, LiteralValue, Stmt};
use crate::environment::{Environment, SharedEnv};
use crate::error::RuntimeError;
use crate::native::Clock;
use crate::token::{Token, TokenType};
use crate::value::{Callable, LoxFunction, Value};

/// How a statement finished.
#[derive(Debug, Clone, PartialEq)]
pub enum Flow {
    Normal,
    Break,
    Return(Value),
}

pub type ExecResult = Result<Flow, RuntimeError>;
pub type EvalResult = Result<Value, RuntimeError>;

/// Nested calls allowed before a program fails with "Stack overflow.".
pub const MAX_CALL_DEPTH: usize = 256;

pub struct Interpreter {
    globals: SharedEnv,
    environment: SharedEnv,

    /// Binding distances recorded by the resolver.
    locals: HashMap<ExprId, usize>,

    /// Calls currently in progress.
    call_depth: usize,

    out: Box<dyn Write>,
}

impl Default for Interpreter {
    fn default() -> Self {
        Self::new()
    }
}

impl Interpreter {
    /// Interpreter printing to stdout, with `clock` defined.
    pub fn new() -> Self {
        Self::with_output(Box::new(io::stdout()))
    }

    /// Interpreter printing to `out`, with `clock` defined.
    pub fn with_output(out: Box<dyn Write>) -> Self {
        info!("Initializing Interpreter");

        let globals: SharedEnv = Environment::new().shared();
        let environment: SharedEnv = Rc::clone(&globals);

        let mut interpreter = Self {
            globals,
            environment,
            locals: HashMap::new(),
            call_depth: 0,
            out,
        };

        interpreter.define_native(Rc::new(Clock));

        interpreter
    }

    /// Install a host function in the global frame under its own name.
    pub fn define_native(&mut self, native: Rc<dyn Callable>) {
        debug!("Defining native function '{}'", native.name());

        let name: String = native.name().to_owned();
        self.globals.borrow_mut().define(&name, Value::Native(native));
    }

    /// Record that the variable expression `id` lives `depth` frames out.
    pub fn resolve(&mut self, id: ExprId, depth: usize) {
        self.locals.insert(id, depth);
    }

    /// Distance recorded for `id`, `None` for globals.
    pub fn binding_distance(&self, id: ExprId) -> Option<usize> {
        self.locals.get(&id).copied()
    }

    /// Run a program. The first runtime error stops it and is returned.
    pub fn interpret(&mut self, statements: &[Stmt]) -> Result<(), RuntimeError> {
        debug!("Interpreting {} statements", statements.len());

        for stmt in statements {
            self.execute_top_level(stmt)?;
        }

        info!("Interpretation completed successfully");

        Ok(())
    }

    /// Like [`Self::interpret`], but bare expression statements print their
    /// value, as an interactive prompt does.
    pub fn interpret_repl(&mut self, statements: &[Stmt]) -> Result<(), RuntimeError> {
        for stmt in statements {
            if let Stmt::Expression(expr) = stmt {
                let value: Value = self.evaluate(expr)?;
                self.write_line(&value)?;
            } else {
                self.execute_top_level(stmt)?;
            }
        }

        Ok(())
    }

    fn execute_top_level(&mut self, stmt: &Stmt) -> Result<(), RuntimeError> {
        match self.execute(stmt)? {
            Flow::Normal => {}

            // The parser and resolver reject these; tolerate them anyway when
            // statements are fed in one by one.
            Flow::Break | Flow::Return(_) => {
                debug!("Control transfer reached top level; ignored");
            }
        }

        Ok(())
    }

    /// Run `statements` in `env`, restoring the current frame afterwards on
    /// every path.
    pub fn execute_block(&mut self, statements: &[Stmt], env: SharedEnv) -> ExecResult {
        let previous: SharedEnv = mem::replace(&mut self.environment, env);

        let result = self.execute_all(statements);

        self.environment = previous;

        result
    }

    fn execute_all(&mut self, statements: &[Stmt]) -> ExecResult {
        for stmt in statements {
            match self.execute(stmt)? {
                Flow::Normal => {}
                flow => return Ok(flow),
            }
        }

        Ok(Flow::Normal)
    }

    /// Executes a single statement.
    pub fn execute(&mut self, stmt: &Stmt) -> ExecResult {
        match stmt {
            Stmt::Expression(expr) => {
                self.evaluate(expr)?;
                Ok(Flow::Normal)
            }

            Stmt::Print(expr) => {
                let value: Value = self.evaluate(expr)?;
                self.write_line(&value)?;
                Ok(Flow::Normal)
            }

            Stmt::Var { name, initializer } => {
                let value: Value = match initializer {
                    Some(expr) => self.evaluate(expr)?,
                    None => Value::Nil,
                };

                debug!("Defining variable '{}' = {}", name.lexeme, value);

                self.environment.borrow_mut().define(&name.lexeme, value);
                Ok(Flow::Normal)
            }

            Stmt::Block(statements) => {
                let env: SharedEnv =
                    Environment::with_enclosing(Rc::clone(&self.environment)).shared();

                self.execute_block(statements, env)
            }

            Stmt::If {
                condition,
                then_branch,
                else_branch,
            } => {
                if self.evaluate(condition)?.is_truthy() {
                    self.execute(then_branch)
                } else if let Some(else_branch) = else_branch {
                    self.execute(else_branch)
                } else {
                    Ok(Flow::Normal)
                }
            }

            Stmt::While { condition, body } => {
                while self.evaluate(condition)?.is_truthy() {
                    match self.execute(body)? {
                        Flow::Normal => {}
                        Flow::Break => break,
                        flow @ Flow::Return(_) => return Ok(flow),
                    }
                }

                Ok(Flow::Normal)
            }

            Stmt::Break(_) => Ok(Flow::Break),

            Stmt::Function { name, declaration } => {
                debug!("Defining function '{}'", name.lexeme);

                let function = LoxFunction::new(Rc::clone(declaration), Rc::clone(&self.environment));

                self.environment
                    .borrow_mut()
                    .define(&name.lexeme, Value::Function(Rc::new(function)));
                Ok(Flow::Normal)
            }

            Stmt::Return { value, .. } => {
                let value: Value = match value {
                    Some(expr) => self.evaluate(expr)?,
                    None => Value::Nil,
                };

                Ok(Flow::Return(value))
            }
        }
    }

    /// Evaluates an expression and returns a Value.
    pub fn evaluate(&mut self, expr: &Expr) -> EvalResult {
        match &expr.kind {
            ExprKind::Literal(literal) => Ok(match literal {
                LiteralValue::Number(n) => Value::Number(*n),
                LiteralValue::Str(s) => Value::String(s.clone()),
                LiteralValue::True => Value::Bool(true),
                LiteralValue::False => Value::Bool(false),
                LiteralValue::Nil => Value::Nil,
            }),

            ExprKind::Grouping(inner) => self.evaluate(inner),

            ExprKind::Unary { operator, right } => {
                let right: Value = self.evaluate(right)?;

                match operator.token_type {
                    TokenType::MINUS => match right {
                        Value::Number(n) => Ok(Value::Number(-n)),
                        _ => Err(RuntimeError::new(operator, "Operand must be a number.")),
                    },

                    TokenType::BANG => Ok(Value::Bool(!right.is_truthy())),

                    _ => Err(RuntimeError::new(operator, "Invalid unary operator.")),
                }
            }

            ExprKind::Binary {
                left,
                operator,
                right,
            } => {
                let left: Value = self.evaluate(left)?;
                let right: Value = self.evaluate(right)?;

                binary(operator, left, right)
            }

            ExprKind::Logical {
                left,
                operator,
                right,
            } => {
                let left: Value = self.evaluate(left)?;

                let short_circuit: bool = if operator.token_type == TokenType::OR {
                    left.is_truthy()
                } else {
                    !left.is_truthy()
                };

                if short_circuit {
                    Ok(left)
                } else {
                    self.evaluate(right)
                }
            }

            ExprKind::Variable(name) => self.look_up_variable(name, expr.id),

            ExprKind::Assign { name, value } => {
                let value: Value = self.evaluate(value)?;

                match self.locals.get(&expr.id) {
                    Some(&distance) => {
                        Environment::assign_at(&self.environment, distance, name, value.clone())?
                    }
                    None => self.globals.borrow_mut().assign(name, value.clone())?,
                }

                Ok(value)
            }

            ExprKind::Call {
                callee,
                paren,
                arguments,
            } => {
                let callee: Value = self.evaluate(callee)?;

                let mut values: Vec<Value> = Vec::with_capacity(arguments.len());
                for argument in arguments {
                    values.push(self.evaluate(argument)?);
                }

                let Some(function) = callee.as_callable() else {
                    return Err(RuntimeError::new(
                        paren,
                        "Can only call functions and classes.",
                    ));
                };

                if values.len() != function.arity() {
                    return Err(RuntimeError::new(
                        paren,
                        format!(
                            "Expected {} args but got {}.",
                            function.arity(),
                            values.len()
                        ),
                    ));
                }

                if self.call_depth >= MAX_CALL_DEPTH {
                    return Err(RuntimeError::new(paren, "Stack overflow."));
                }

                debug!("Calling '{}' with {} argument(s)", function.name(), values.len());

                self.call_depth += 1;
                let result: EvalResult = function.call(self, values);
                self.call_depth -= 1;

                result
            }

            ExprKind::Function(declaration) => {
                let function = LoxFunction::new(Rc::clone(declaration), Rc::clone(&self.environment));

                Ok(Value::Function(Rc::new(function)))
            }
        }
    }

    fn look_up_variable(&self, name: &Token, id: ExprId) -> EvalResult {
        match self.locals.get(&id) {
            Some(&distance) => Environment::get_at(&self.environment, distance, name),
            None => self.globals.borrow().get(name),
        }
    }

    fn write_line(&mut self, value: &Value) -> Result<(), RuntimeError> {
        writeln!(self.out, "{}", value).map_err(RuntimeError::output)
    }
}

/// Arithmetic, comparison and equality on already evaluated operands.
fn binary(operator: &Token, left: Value, right: Value) -> EvalResult {
    match operator.token_type {
        TokenType::PLUS => match (left, right) {
            (Value::Number(a), Value::Number(b)) => Ok(Value::Number(a + b)),
            (Value::String(a), b) => Ok(Value::String(format!("{}{}", a, b))),
            (a, Value::String(b)) => Ok(Value::String(format!("{}{}", a, b))),
            _ => Err(RuntimeError::new(
                operator,
                "Operands must be two numbers or at least one string.",
            )),
        },

        TokenType::MINUS => numbers(operator, &left, &right).map(|(a, b)| Value::Number(a - b)),

        TokenType::STAR => numbers(operator, &left, &right).map(|(a, b)| Value::Number(a * b)),

        TokenType::SLASH => {
            let (a, b) = numbers(operator, &left, &right)?;

            if b == 0.0 {
                return Err(RuntimeError::new(operator, "Cannot divide by zero."));
            }

            Ok(Value::Number(a / b))
        }

        TokenType::GREATER => numbers(operator, &left, &right).map(|(a, b)| Value::Bool(a > b)),

        TokenType::GREATER_EQUAL => {
            numbers(operator, &left, &right).map(|(a, b)| Value::Bool(a >= b))
        }

        TokenType::LESS => numbers(operator, &left, &right).map(|(a, b)| Value::Bool(a < b)),

        TokenType::LESS_EQUAL => numbers(operator, &left, &right).map(|(a, b)| Value::Bool(a <= b)),

        TokenType::EQUAL_EQUAL => Ok(Value::Bool(left == right)),

        TokenType::BANG_EQUAL => Ok(Value::Bool(left != right)),

        _ => Err(RuntimeError::new(operator, "Invalid binary operator.")),
    }
}

fn numbers(operator: &Token, left: &Value, right: &Value) -> Result<(f64, f64), RuntimeError> {
    match (left, right) {
        (Value::Number(a), Value::Number(b)) => Ok((*a, *b)),
        _ => Err(RuntimeError::new(operator, "Operands must be numbers.")),
    }
}
