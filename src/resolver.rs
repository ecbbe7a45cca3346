//! Static scope resolution.
//!
//! One walk over the tree, before anything runs. Every variable read or
//! assignment that names a local gets its hop count recorded in the
//! interpreter, keyed by the expression's [`ExprId`]. Names not found on the
//! scope stack are globals and are looked up by name at run time.
//!
//! Redeclaring a name in the same local scope, reading a variable inside its
//! own initializer and `return` outside a function are reported into
//! [`Diagnostics`]; the walk always runs to the end.

use crate::ast::{Expr, ExprId, ExprKind, FunctionDecl, Stmt};
use crate::error::{Diagnostics, LoxError};
use crate::interpreter::Interpreter;
use crate::token::Token;
use log::{debug, info};
use std::collections::HashMap;

/// Kind of function body being resolved, for the `return` check.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum FunctionType {
    None,
    Function,
}

/// Walks statements with a stack of local scopes. The global scope is
/// never on the stack.
pub struct Resolver<'i, 'd> {
    interpreter: &'i mut Interpreter,
    diagnostics: &'d mut Diagnostics,

    /// Innermost last. `false` while a name's initializer is being resolved.
    scopes: Vec<HashMap<String, bool>>,

    /// Global whose initializer is being resolved, outside any function.
    global_initializer: Option<String>,

    current_function: FunctionType,
}

impl<'i, 'd> Resolver<'i, 'd> {
    pub fn new(interpreter: &'i mut Interpreter, diagnostics: &'d mut Diagnostics) -> Self {
        info!("Resolver created");

        Resolver {
            interpreter,
            diagnostics,
            scopes: Vec::new(),
            global_initializer: None,
            current_function: FunctionType::None,
        }
    }

    /// Resolve a whole program. Errors end up in the diagnostics.
    pub fn resolve(&mut self, statements: &[Stmt]) {
        info!("Resolving {} statement(s)", statements.len());

        self.resolve_stmts(statements);
    }

    fn resolve_stmts(&mut self, statements: &[Stmt]) {
        for stmt in statements {
            self.resolve_stmt(stmt);
        }
    }

    fn resolve_stmt(&mut self, stmt: &Stmt) {
        match stmt {
            Stmt::Block(statements) => {
                self.begin_scope();
                self.resolve_stmts(statements);
                self.end_scope();
            }

            Stmt::Var { name, initializer } => {
                self.declare(name);
                if let Some(expr) = initializer {
                    if self.scopes.is_empty() {
                        let outer = self.global_initializer.replace(name.lexeme.clone());
                        self.resolve_expr(expr);
                        self.global_initializer = outer;
                    } else {
                        self.resolve_expr(expr);
                    }
                }
                self.define(name);
            }

            Stmt::Function { name, declaration } => {
                // Defined before the body so the function can call itself.
                self.declare(name);
                self.define(name);
                self.resolve_function(declaration);
            }

            Stmt::Expression(expr) | Stmt::Print(expr) => {
                self.resolve_expr(expr);
            }

            Stmt::If {
                condition,
                then_branch,
                else_branch,
            } => {
                self.resolve_expr(condition);
                self.resolve_stmt(then_branch);
                if let Some(else_branch) = else_branch {
                    self.resolve_stmt(else_branch);
                }
            }

            Stmt::While { condition, body } => {
                self.resolve_expr(condition);
                self.resolve_stmt(body);
            }

            // Placement is checked by the parser.
            Stmt::Break(_) => {}

            Stmt::Return { keyword, value } => {
                if self.current_function == FunctionType::None {
                    self.error(keyword, "Can't return from top-level code.");
                }
                if let Some(expr) = value {
                    self.resolve_expr(expr);
                }
            }
        }
    }

    fn resolve_expr(&mut self, expr: &Expr) {
        match &expr.kind {
            ExprKind::Literal(_) => {}

            ExprKind::Grouping(inner) => {
                self.resolve_expr(inner);
            }

            ExprKind::Unary { right, .. } => {
                self.resolve_expr(right);
            }

            ExprKind::Binary { left, right, .. } | ExprKind::Logical { left, right, .. } => {
                self.resolve_expr(left);
                self.resolve_expr(right);
            }

            ExprKind::Variable(name) => {
                match self.scopes.last() {
                    Some(scope) if scope.get(&name.lexeme) == Some(&false) => {
                        self.error(name, "Can't read local variable in its own initializer.");
                    }

                    // A function body may name the global; it runs later.
                    None if self.global_initializer.as_ref() == Some(&name.lexeme) => {
                        self.error(name, "Can't read global variable in its own initializer.");
                    }

                    _ => {}
                }

                self.resolve_local(expr.id, name);
            }

            ExprKind::Assign { name, value } => {
                self.resolve_expr(value);
                self.resolve_local(expr.id, name);
            }

            ExprKind::Call {
                callee, arguments, ..
            } => {
                self.resolve_expr(callee);
                for arg in arguments {
                    self.resolve_expr(arg);
                }
            }

            ExprKind::Function(declaration) => {
                self.resolve_function(declaration);
            }
        }
    }

    /// Parameters and body share one scope, matching the single frame a
    /// call creates.
    fn resolve_function(&mut self, declaration: &FunctionDecl) {
        let enclosing: FunctionType = self.current_function;
        self.current_function = FunctionType::Function;

        self.begin_scope();
        for param in &declaration.params {
            self.declare(param);
            self.define(param);
        }
        self.resolve_stmts(&declaration.body);
        self.end_scope();

        self.current_function = enclosing;
    }

    #[inline]
    fn begin_scope(&mut self) {
        self.scopes.push(HashMap::new());
    }

    #[inline]
    fn end_scope(&mut self) {
        self.scopes.pop();
    }

    fn declare(&mut self, name: &Token) {
        let Some(scope) = self.scopes.last_mut() else {
            return;
        };

        if scope.contains_key(&name.lexeme) {
            self.error(name, "Already a variable with this name in this scope.");
            return;
        }

        scope.insert(name.lexeme.clone(), false);
    }

    fn define(&mut self, name: &Token) {
        if let Some(scope) = self.scopes.last_mut() {
            scope.insert(name.lexeme.clone(), true);
        }
    }

    fn error(&mut self, token: &Token, message: &str) {
        self.diagnostics.report(LoxError::resolve(token, message));
    }

    /// Record how many scopes out `name` was found, if it was found at all.
    fn resolve_local(&mut self, id: ExprId, name: &Token) {
        for (depth, scope) in self.scopes.iter().rev().enumerate() {
            if scope.contains_key(&name.lexeme) {
                debug!("Resolved '{}' {} at depth {}", name.lexeme, id, depth);
                self.interpreter.resolve(id, depth);
                return;
            }
        }

        debug!("Resolved '{}' {} as global", name.lexeme, id);
    }
}
