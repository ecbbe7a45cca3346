//! Recursive-descent parser: tokens to [`Stmt`] trees.
//!
//! Grammar, lowest precedence first:
//!
//! ```text
//! program     → declaration* EOF
//! declaration → "fun" IDENT function | "var" IDENT ( "=" expression )? ";"
//!             | statement
//! statement   → expression ";" | "print" expression ";"
//!             | "if" "(" expression ")" statement ( "else" statement )?
//!             | "while" "(" expression ")" statement
//!             | "for" "(" ( varDecl | expression ";" | ";" ) expression? ";"
//!               expression? ")" statement
//!             | "break" ";" | "return" expression? ";" | "{" declaration* "}"
//! function    → "(" ( IDENT ( "," IDENT )* )? ")" "{" declaration* "}"
//! expression  → IDENT "=" expression | or
//! or          → and ( "or" and )*
//! and         → equality ( "and" equality )*
//! equality    → comparison ( ( "!=" | "==" ) comparison )*
//! comparison  → term ( ( ">" | ">=" | "<" | "<=" ) term )*
//! term        → factor ( ( "-" | "+" ) factor )*
//! factor      → unary ( ( "/" | "*" ) unary )*
//! unary       → ( "!" | "-" ) unary | call
//! call        → primary ( "(" ( expression ( "," expression )* )? ")" )*
//! primary     → NUMBER | STRING | "true" | "false" | "nil" | IDENT
//!             | "(" expression ")" | "fun" function
//! ```
//!
//! A `for` loop is rewritten on the spot into
//! `{ init; while (cond) { body; increment; } }` and never reaches the tree.
//!
//! Errors are reported into the caller's [`Diagnostics`]. A failed
//! declaration is dropped and parsing resumes at the next statement
//! boundary; limit and placement errors (argument count, `break` outside a
//! loop, bad assignment target) are reported without dropping anything.

use std::mem;
use std::rc::Rc;

use crate::ast::{Expr, ExprId, ExprKind, FunctionDecl, LiteralValue, Stmt};
use crate::error::{Diagnostics, LoxError, Result};
use crate::token::{Token, TokenType};

use log::{debug, info};

/// Upper bound on call arguments and function parameters.
pub const MAX_ARITY: usize = 255;

/// Top‑level parser over an owned token vector.
///
/// Errors are pushed into the borrowed [`Diagnostics`]; [`Parser::parse`]
/// always returns whatever statements parsed cleanly.
pub struct Parser<'d> {
    tokens: Vec<Token>,
    current: usize,

    /// Number of `while`/`for` bodies being parsed right now, reset to zero
    /// inside function bodies.
    loop_depth: usize,

    /// Next free expression id.
    next_id: u32,

    diagnostics: &'d mut Diagnostics,
}

impl<'d> Parser<'d> {
    /// Construct a new parser. A trailing `EOF` is added if missing.
    pub fn new(mut tokens: Vec<Token>, diagnostics: &'d mut Diagnostics) -> Self {
        info!("Parser created with {} tokens", tokens.len());

        if tokens
            .last()
            .map_or(true, |t| t.token_type != TokenType::EOF)
        {
            let line: usize = tokens.last().map_or(1, |t| t.line);
            tokens.push(Token::new(TokenType::EOF, "", line));
        }

        Self {
            tokens,
            current: 0,
            loop_depth: 0,
            next_id: 0,
            diagnostics,
        }
    }

    /// Start numbering expressions at `first_id`, so that several parses fed
    /// to the same interpreter never hand out the same [`ExprId`].
    pub fn starting_at(mut self, first_id: u32) -> Self {
        self.next_id = first_id;
        self
    }

    /// The first id this parser has not handed out yet.
    pub fn next_id(&self) -> u32 {
        self.next_id
    }

    /// Parse an entire program and return every statement that parsed
    /// without error. Check the diagnostics before executing the result.
    pub fn parse(&mut self) -> Vec<Stmt> {
        info!("Parsing from expression id {}", self.next_id);

        let mut statements: Vec<Stmt> = Vec::new();

        while !self.is_at_end() {
            if let Some(stmt) = self.declaration() {
                statements.push(stmt);
            }
        }

        info!("Parsed {} top-level statement(s)", statements.len());

        statements
    }

    /// Parse one declaration; on error, report it, resynchronize and yield
    /// `None`.
    fn declaration(&mut self) -> Option<Stmt> {
        debug!("Declaration at line {}", self.peek().line);

        let result = if self.check(TokenType::FUN) && self.check_next(TokenType::IDENTIFIER) {
            self.advance();
            self.function_declaration()
        } else if self.matches(TokenType::VAR) {
            self.var_declaration()
        } else {
            self.statement()
        };

        match result {
            Ok(stmt) => Some(stmt),

            Err(e) => {
                self.diagnostics.report(e);
                self.synchronize();

                None
            }
        }
    }

    fn function_declaration(&mut self) -> Result<Stmt> {
        let name: Token = self
            .consume(TokenType::IDENTIFIER, "Expected function name.")?
            .clone();

        self.consume(TokenType::LEFT_PAREN, "Expected '(' after function name.")?;

        let declaration: FunctionDecl = self.function_rest(Some(name.clone()))?;

        Ok(Stmt::Function {
            name,
            declaration: Rc::new(declaration),
        })
    }

    /// Parameters and body of a function; the opening `(` is already consumed.
    fn function_rest(&mut self, name: Option<Token>) -> Result<FunctionDecl> {
        let mut params: Vec<Token> = Vec::new();

        if !self.check(TokenType::RIGHT_PAREN) {
            loop {
                if params.len() >= MAX_ARITY {
                    let error = LoxError::parse(self.peek(), "Can't have more than 255 parameters.");
                    self.diagnostics.report(error);
                }

                params.push(
                    self.consume(TokenType::IDENTIFIER, "Expected parameter name.")?
                        .clone(),
                );

                if !self.matches(TokenType::COMMA) {
                    break;
                }
            }
        }

        self.consume(TokenType::RIGHT_PAREN, "Expected ')' after parameters.")?;
        self.consume(TokenType::LEFT_BRACE, "Expected '{' before function body.")?;

        // `break` never crosses a function boundary.
        let enclosing_loops: usize = mem::replace(&mut self.loop_depth, 0);
        let body = self.block();
        self.loop_depth = enclosing_loops;

        Ok(FunctionDecl {
            name,
            params,
            body: body?,
        })
    }

    fn var_declaration(&mut self) -> Result<Stmt> {
        let name: Token = self
            .consume(TokenType::IDENTIFIER, "Expected variable name.")?
            .clone();

        let initializer: Option<Expr> = if self.matches(TokenType::EQUAL) {
            Some(self.expression()?)
        } else {
            None
        };

        self.consume(
            TokenType::SEMICOLON,
            "Expected ';' after variable declaration.",
        )?;

        Ok(Stmt::Var { name, initializer })
    }

    fn statement(&mut self) -> Result<Stmt> {
        debug!("Statement at line {}", self.peek().line);

        if self.matches(TokenType::FOR) {
            self.for_statement()
        } else if self.matches(TokenType::IF) {
            self.if_statement()
        } else if self.matches(TokenType::WHILE) {
            self.while_statement()
        } else if self.matches(TokenType::BREAK) {
            self.break_statement()
        } else if self.matches(TokenType::RETURN) {
            self.return_statement()
        } else if self.matches(TokenType::LEFT_BRACE) {
            Ok(Stmt::Block(self.block()?))
        } else if self.matches(TokenType::PRINT) {
            self.print_statement()
        } else {
            self.expression_statement()
        }
    }

    fn for_statement(&mut self) -> Result<Stmt> {
        self.consume(TokenType::LEFT_PAREN, "Expected '(' after 'for'.")?;

        let initializer: Option<Stmt> = if self.matches(TokenType::SEMICOLON) {
            None
        } else if self.matches(TokenType::VAR) {
            Some(self.var_declaration()?)
        } else {
            Some(self.expression_statement()?)
        };

        let condition: Option<Expr> = if !self.check(TokenType::SEMICOLON) {
            Some(self.expression()?)
        } else {
            None
        };

        self.consume(TokenType::SEMICOLON, "Expected ';' after loop condition.")?;

        let increment: Option<Expr> = if !self.check(TokenType::RIGHT_PAREN) {
            Some(self.expression()?)
        } else {
            None
        };

        self.consume(TokenType::RIGHT_PAREN, "Expected ')' after for clauses.")?;

        let mut body: Stmt = self.loop_body()?;

        if let Some(increment) = increment {
            body = Stmt::Block(vec![body, Stmt::Expression(increment)]);
        }

        let condition: Expr =
            condition.unwrap_or_else(|| self.make_expr(ExprKind::Literal(LiteralValue::True)));

        body = Stmt::While {
            condition,
            body: Box::new(body),
        };

        if let Some(initializer) = initializer {
            body = Stmt::Block(vec![initializer, body]);
        }

        Ok(body)
    }

    fn print_statement(&mut self) -> Result<Stmt> {
        let value: Expr = self.expression()?;

        self.consume(TokenType::SEMICOLON, "Expected ';' after value.")?;

        Ok(Stmt::Print(value))
    }

    fn expression_statement(&mut self) -> Result<Stmt> {
        let expr: Expr = self.expression()?;
        self.consume(TokenType::SEMICOLON, "Expected ';' after expression.")?;
        Ok(Stmt::Expression(expr))
    }

    fn if_statement(&mut self) -> Result<Stmt> {
        self.consume(TokenType::LEFT_PAREN, "Expected '(' after 'if'.")?;
        let condition: Expr = self.expression()?;
        self.consume(TokenType::RIGHT_PAREN, "Expected ')' after if condition.")?;

        let then_branch: Box<Stmt> = Box::new(self.statement()?);
        let else_branch: Option<Box<Stmt>> = if self.matches(TokenType::ELSE) {
            Some(Box::new(self.statement()?))
        } else {
            None
        };

        Ok(Stmt::If {
            condition,
            then_branch,
            else_branch,
        })
    }

    fn while_statement(&mut self) -> Result<Stmt> {
        self.consume(TokenType::LEFT_PAREN, "Expected '(' after 'while'.")?;
        let condition: Expr = self.expression()?;
        self.consume(TokenType::RIGHT_PAREN, "Expected ')' after condition.")?;
        let body: Stmt = self.loop_body()?;

        Ok(Stmt::While {
            condition,
            body: Box::new(body),
        })
    }

    /// Parse a loop body with `break` allowed inside it.
    fn loop_body(&mut self) -> Result<Stmt> {
        self.loop_depth += 1;
        let body = self.statement();
        self.loop_depth -= 1;

        body
    }

    fn break_statement(&mut self) -> Result<Stmt> {
        let keyword: Token = self.previous().clone();

        if self.loop_depth == 0 {
            let error = LoxError::parse(&keyword, "Can't use 'break' outside of a loop.");
            self.diagnostics.report(error);
        }

        self.consume(TokenType::SEMICOLON, "Expected ';' after 'break'.")?;

        Ok(Stmt::Break(keyword))
    }

    fn return_statement(&mut self) -> Result<Stmt> {
        let keyword: Token = self.previous().clone();
        let value: Option<Expr> = if !self.check(TokenType::SEMICOLON) {
            Some(self.expression()?)
        } else {
            None
        };

        self.consume(TokenType::SEMICOLON, "Expected ';' after return value.")?;
        Ok(Stmt::Return { keyword, value })
    }

    /// Statements up to the closing `}`; the `{` is already consumed.
    fn block(&mut self) -> Result<Vec<Stmt>> {
        let mut statements: Vec<Stmt> = Vec::new();

        while !self.check(TokenType::RIGHT_BRACE) && !self.is_at_end() {
            if let Some(stmt) = self.declaration() {
                statements.push(stmt);
            }
        }

        self.consume(TokenType::RIGHT_BRACE, "Expected '}' after block.")?;
        Ok(statements)
    }

    fn expression(&mut self) -> Result<Expr> {
        self.assignment()
    }

    fn assignment(&mut self) -> Result<Expr> {
        let expr: Expr = self.logical_or()?;

        if self.matches(TokenType::EQUAL) {
            let equals: Token = self.previous().clone();
            let value: Expr = self.assignment()?;

            return match expr.kind {
                ExprKind::Variable(name) => Ok(self.make_expr(ExprKind::Assign {
                    name,
                    value: Box::new(value),
                })),

                kind => {
                    // Reported, but the parser is not confused: keep going.
                    let error = LoxError::parse(&equals, "Invalid assignment target.");
                    self.diagnostics.report(error);

                    Ok(Expr::new(expr.id, kind))
                }
            };
        }

        Ok(expr)
    }

    fn logical_or(&mut self) -> Result<Expr> {
        let mut expr: Expr = self.logical_and()?;

        while self.matches(TokenType::OR) {
            let operator: Token = self.previous().clone();
            let right: Expr = self.logical_and()?;

            expr = self.make_expr(ExprKind::Logical {
                left: Box::new(expr),
                operator,
                right: Box::new(right),
            });
        }

        Ok(expr)
    }

    fn logical_and(&mut self) -> Result<Expr> {
        let mut expr: Expr = self.equality()?;

        while self.matches(TokenType::AND) {
            let operator: Token = self.previous().clone();
            let right: Expr = self.equality()?;

            expr = self.make_expr(ExprKind::Logical {
                left: Box::new(expr),
                operator,
                right: Box::new(right),
            });
        }

        Ok(expr)
    }

    fn equality(&mut self) -> Result<Expr> {
        self.binary_chain(
            &[TokenType::BANG_EQUAL, TokenType::EQUAL_EQUAL],
            Self::comparison,
        )
    }

    fn comparison(&mut self) -> Result<Expr> {
        self.binary_chain(
            &[
                TokenType::GREATER,
                TokenType::GREATER_EQUAL,
                TokenType::LESS,
                TokenType::LESS_EQUAL,
            ],
            Self::term,
        )
    }

    fn term(&mut self) -> Result<Expr> {
        self.binary_chain(&[TokenType::MINUS, TokenType::PLUS], Self::factor)
    }

    fn factor(&mut self) -> Result<Expr> {
        self.binary_chain(&[TokenType::STAR, TokenType::SLASH], Self::unary)
    }

    /// One left-associative precedence level: `operand ( op operand )*`.
    fn binary_chain(
        &mut self,
        operators: &[TokenType],
        operand: fn(&mut Self) -> Result<Expr>,
    ) -> Result<Expr> {
        let mut expr: Expr = operand(self)?;

        while self.matches_any(operators) {
            let operator: Token = self.previous().clone();
            let right: Expr = operand(self)?;

            expr = self.make_expr(ExprKind::Binary {
                left: Box::new(expr),
                operator,
                right: Box::new(right),
            });
        }

        Ok(expr)
    }

    fn unary(&mut self) -> Result<Expr> {
        if self.matches_any(&[TokenType::BANG, TokenType::MINUS]) {
            let operator: Token = self.previous().clone();
            let right: Expr = self.unary()?;

            return Ok(self.make_expr(ExprKind::Unary {
                operator,
                right: Box::new(right),
            }));
        }

        self.call()
    }

    fn call(&mut self) -> Result<Expr> {
        let mut expr: Expr = self.primary()?;

        while self.matches(TokenType::LEFT_PAREN) {
            expr = self.finish_call(expr)?;
        }

        Ok(expr)
    }

    fn finish_call(&mut self, callee: Expr) -> Result<Expr> {
        let mut arguments: Vec<Expr> = Vec::new();

        if !self.check(TokenType::RIGHT_PAREN) {
            loop {
                if arguments.len() >= MAX_ARITY {
                    let error = LoxError::parse(self.peek(), "Can't have more than 255 arguments.");
                    self.diagnostics.report(error);
                }

                arguments.push(self.expression()?);

                if !self.matches(TokenType::COMMA) {
                    break;
                }
            }
        }

        let paren: Token = self
            .consume(TokenType::RIGHT_PAREN, "Expected ')' after arguments.")?
            .clone();

        Ok(self.make_expr(ExprKind::Call {
            callee: Box::new(callee),
            paren,
            arguments,
        }))
    }

    fn primary(&mut self) -> Result<Expr> {
        if self.matches(TokenType::FALSE) {
            return Ok(self.make_expr(ExprKind::Literal(LiteralValue::False)));
        }

        if self.matches(TokenType::TRUE) {
            return Ok(self.make_expr(ExprKind::Literal(LiteralValue::True)));
        }

        if self.matches(TokenType::NIL) {
            return Ok(self.make_expr(ExprKind::Literal(LiteralValue::Nil)));
        }

        if let TokenType::NUMBER(n) = self.peek().token_type {
            self.advance();
            return Ok(self.make_expr(ExprKind::Literal(LiteralValue::Number(n))));
        }

        if let TokenType::STRING(s) = &self.peek().token_type {
            let s: String = s.clone();
            self.advance();
            return Ok(self.make_expr(ExprKind::Literal(LiteralValue::Str(s))));
        }

        if self.matches(TokenType::IDENTIFIER) {
            let name: Token = self.previous().clone();
            return Ok(self.make_expr(ExprKind::Variable(name)));
        }

        if self.matches(TokenType::FUN) {
            self.consume(TokenType::LEFT_PAREN, "Expected '(' after 'fun'.")?;

            let declaration: FunctionDecl = self.function_rest(None)?;

            return Ok(self.make_expr(ExprKind::Function(Rc::new(declaration))));
        }

        if self.matches(TokenType::LEFT_PAREN) {
            let expr: Expr = self.expression()?;

            self.consume(TokenType::RIGHT_PAREN, "Expected ')' after expression.")?;

            return Ok(self.make_expr(ExprKind::Grouping(Box::new(expr))));
        }

        Err(LoxError::parse(self.peek(), "Expected expression."))
    }

    fn make_expr(&mut self, kind: ExprKind) -> Expr {
        let id: ExprId = ExprId(self.next_id);
        self.next_id += 1;

        Expr::new(id, kind)
    }

    /// Consume the next token if it has type `expected`.
    fn matches(&mut self, expected: TokenType) -> bool {
        let hit: bool = self.check(expected);

        if hit {
            self.advance();
        }

        hit
    }

    fn matches_any(&mut self, expected: &[TokenType]) -> bool {
        expected.iter().any(|t| self.matches(t.clone()))
    }

    #[inline(always)]
    fn consume(&mut self, ttype: TokenType, message: &str) -> Result<&Token> {
        if self.check(ttype) {
            return Ok(self.advance());
        }

        debug!("consume failed at line {}: {}", self.peek().line, message);

        Err(LoxError::parse(self.peek(), message))
    }

    fn check(&self, expected: TokenType) -> bool {
        !self.is_at_end() && self.peek().token_type == expected
    }

    /// Like [`Self::check`], one token further ahead.
    fn check_next(&self, ttype: TokenType) -> bool {
        self.tokens
            .get(self.current + 1)
            .map_or(false, |t| t.token_type == ttype)
    }

    #[inline(always)]
    fn advance(&mut self) -> &Token {
        if !self.is_at_end() {
            self.current += 1;
        }

        self.previous()
    }

    #[inline(always)]
    fn is_at_end(&self) -> bool {
        self.peek().token_type == TokenType::EOF
    }

    #[inline(always)]
    fn peek(&self) -> &Token {
        &self.tokens[self.current]
    }

    #[inline(always)]
    fn previous(&self) -> &Token {
        &self.tokens[self.current.saturating_sub(1)]
    }

    /// Panic-mode recovery: skip past the bad token, then stop after a `;`
    /// or before a token that can only start a statement.
    fn synchronize(&mut self) {
        self.advance();

        while !self.is_at_end() {
            if self.previous().token_type == TokenType::SEMICOLON {
                break;
            }

            match self.peek().token_type {
                TokenType::CLASS
                | TokenType::FUN
                | TokenType::VAR
                | TokenType::FOR
                | TokenType::IF
                | TokenType::WHILE
                | TokenType::PRINT
                | TokenType::RETURN
                | TokenType::BREAK => break,
                _ => {}
            }

            self.advance();
        }

        debug!("Synchronized at line {}", self.peek().line);
    }
}
