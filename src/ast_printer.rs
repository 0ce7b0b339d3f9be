use crate::ast::{Expr, ExprKind, LiteralValue};

/// Debug renderers for expressions: the parenthesised prefix form used by the
/// `parse` subcommand and a reverse‑Polish form.
pub struct AstPrinter;

impl AstPrinter {
    /// `-123 * (45.67)` → `(* (- 123.0) (group 45.67))`
    pub fn print(expr: &Expr) -> String {
        match &expr.kind {
            // ── literals ────────────────────────────────────────────────
            ExprKind::Literal(lit) => literal(lit),

            // ── grouping ────────────────────────────────────────────────
            ExprKind::Grouping(inner) => format!("(group {})", Self::print(inner)),

            // ── operators ───────────────────────────────────────────────
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

            ExprKind::Ternary {
                condition,
                then_branch,
                else_branch,
                ..
            } => format!(
                "(?: {} {} {})",
                Self::print(condition),
                Self::print(then_branch),
                Self::print(else_branch)
            ),

            // ── names, calls and functions ─────────────────────────────
            ExprKind::Variable(name) => name.lexeme.clone(),

            ExprKind::Assign { name, value } => {
                format!("(= {} {})", name.lexeme, Self::print(value))
            }

            ExprKind::Call {
                callee, arguments, ..
            } => {
                let mut s = format!("(call {}", Self::print(callee));
                for arg in arguments {
                    s.push(' ');
                    s.push_str(&Self::print(arg));
                }
                s.push(')');
                s
            }

            ExprKind::Function(decl) => {
                let params: Vec<&str> = decl.params.iter().map(|p| p.lexeme.as_str()).collect();
                format!("(fun ({}))", params.join(" "))
            }

            ExprKind::Error => "<error>".into(),
        }
    }

    /// `(1 + 2) * 3` → `1.0 2.0 + group 3.0 *`
    pub fn print_rpn(expr: &Expr) -> String {
        match &expr.kind {
            ExprKind::Literal(lit) => literal(lit),

            ExprKind::Grouping(inner) => format!("{} group", Self::print_rpn(inner)),

            ExprKind::Unary { operator, right } => {
                format!("{} {}", Self::print_rpn(right), operator.lexeme)
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
                "{} {} {}",
                Self::print_rpn(left),
                Self::print_rpn(right),
                operator.lexeme
            ),

            ExprKind::Ternary {
                condition,
                then_branch,
                else_branch,
                ..
            } => format!(
                "{} {} {} ?:",
                Self::print_rpn(condition),
                Self::print_rpn(then_branch),
                Self::print_rpn(else_branch)
            ),

            ExprKind::Variable(name) => name.lexeme.clone(),

            ExprKind::Assign { name, value } => {
                format!("{} {} =", name.lexeme, Self::print_rpn(value))
            }

            ExprKind::Call {
                callee, arguments, ..
            } => {
                let mut s = Self::print_rpn(callee);
                for arg in arguments {
                    s.push(' ');
                    s.push_str(&Self::print_rpn(arg));
                }
                s.push_str(" call");
                s
            }

            ExprKind::Function(_) | ExprKind::Error => Self::print(expr),
        }
    }
}

fn literal(lit: &LiteralValue) -> String {
    match lit {
        LiteralValue::Bool(b) => b.to_string(),

        LiteralValue::Nil => "nil".into(),

        LiteralValue::Str(s) => s.clone(),

        LiteralValue::Number(n) => {
            if n.fract() == 0.0 {
                format!("{:.1}", n)
            } else {
                n.to_string()
            }
        }
    }
}
