use crate::ast::{Expr, ExprKind, FunctionDecl, LiteralValue, Stmt};
use crate::token::format_number_literal;

/// Converts syntax trees to the Crafting‑Interpreters prefix form, e.g.
/// `(+ 1.0 (* 2.0 3.0))`. Debug output only; the interpreter never uses it.
pub struct AstPrinter;

impl AstPrinter {
    pub fn print(expr: &Expr) -> String {
        match &expr.kind {
            // ── literals ────────────────────────────────────────────────
            ExprKind::Literal(lit) => match lit {
                LiteralValue::True => "true".into(),

                LiteralValue::False => "false".into(),

                LiteralValue::Nil => "nil".into(),

                LiteralValue::Str(s) => s.clone(),

                LiteralValue::Number(n) => format_number_literal(*n),
            },

            ExprKind::Grouping(inner) => format!("(group {})", Self::print(inner)),

            ExprKind::Unary { operator, right } => {
                format!("({} {})", operator.lexeme, Self::print(right))
            }

            ExprKind::Binary {
                left,
                operator,
                right,
            }
            | ExprKind::Logical {
                left,
                operator,
                right,
            } => format!(
                "({} {} {})",
                operator.lexeme,
                Self::print(left),
                Self::print(right)
            ),

            ExprKind::Variable(name) => name.lexeme.clone(),

            ExprKind::Assign { name, value } => {
                format!("(= {} {})", name.lexeme, Self::print(value))
            }

            ExprKind::Call {
                callee, arguments, ..
            } => {
                let mut out: String = format!("(call {}", Self::print(callee));
                for argument in arguments {
                    out.push(' ');
                    out.push_str(&Self::print(argument));
                }
                out.push(')');
                out
            }

            ExprKind::Function(declaration) => Self::function("fun", declaration),
        }
    }

    pub fn print_stmt(stmt: &Stmt) -> String {
        match stmt {
            Stmt::Expression(expr) => format!("(; {})", Self::print(expr)),

            Stmt::Print(expr) => format!("(print {})", Self::print(expr)),

            Stmt::Var { name, initializer } => match initializer {
                Some(init) => format!("(var {} {})", name.lexeme, Self::print(init)),
                None => format!("(var {})", name.lexeme),
            },

            Stmt::Block(statements) => Self::block(statements),

            Stmt::If {
                condition,
                then_branch,
                else_branch,
            } => match else_branch {
                Some(else_branch) => format!(
                    "(if {} {} {})",
                    Self::print(condition),
                    Self::print_stmt(then_branch),
                    Self::print_stmt(else_branch)
                ),
                None => format!(
                    "(if {} {})",
                    Self::print(condition),
                    Self::print_stmt(then_branch)
                ),
            },

            Stmt::While { condition, body } => format!(
                "(while {} {})",
                Self::print(condition),
                Self::print_stmt(body)
            ),

            Stmt::Break(_) => "(break)".into(),

            Stmt::Function { name, declaration } => {
                Self::function(&format!("fun {}", name.lexeme), declaration)
            }

            Stmt::Return { value, .. } => match value {
                Some(value) => format!("(return {})", Self::print(value)),
                None => "(return)".into(),
            },
        }
    }

    fn block(statements: &[Stmt]) -> String {
        let mut out: String = String::from("(block");
        for stmt in statements {
            out.push(' ');
            out.push_str(&Self::print_stmt(stmt));
        }
        out.push(')');
        out
    }

    fn function(head: &str, declaration: &FunctionDecl) -> String {
        let params: Vec<&str> = declaration
            .params
            .iter()
            .map(|p| p.lexeme.as_str())
            .collect();

        format!(
            "({} ({}) {})",
            head,
            params.join(" "),
            Self::block(&declaration.body)
        )
    }
}
