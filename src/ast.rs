//! **Abstract syntax tree** for Lox programs.
//!
//! The tree is built once by the [`Parser`](crate::parser::Parser) and never
//! mutated afterwards.  Every expression node carries an [`ExprId`] so that
//! side tables (the resolver's hop counts) can be keyed by node identity
//! rather than by structure: two textually identical `a` reads in different
//! scopes are different nodes with different ids.

use std::rc::Rc;
use std::sync::atomic::{AtomicUsize, Ordering};

use serde::Serialize;

use crate::token::Token;

static NEXT_EXPR_ID: AtomicUsize = AtomicUsize::new(0);

/// Stable identity of an expression node.
///
/// Ids come from a process‑wide counter so that trees parsed at different
/// times (REPL lines) never collide in the interpreter's side table.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct ExprId(pub usize);

impl ExprId {
    pub fn fresh() -> Self {
        ExprId(NEXT_EXPR_ID.fetch_add(1, Ordering::Relaxed))
    }
}

/// A **literal constant** that appears directly in the source code.
#[derive(Debug, Clone, PartialEq)]
pub enum LiteralValue {
    /// Numeric literal stored as IEEE‑754 `f64`.
    Number(f64),

    /// String literal without surrounding quotes.
    Str(String),

    /// `true` / `false`.
    Bool(bool),

    /// The `nil` literal.
    Nil,
}

/// An expression node: identity plus shape.
#[derive(Debug, Clone)]
pub struct Expr {
    pub id: ExprId,
    pub kind: ExprKind,
}

impl Expr {
    pub fn new(kind: ExprKind) -> Self {
        Self {
            id: ExprId::fresh(),
            kind,
        }
    }

    /// Did this node come from an error production?
    pub fn is_error(&self) -> bool {
        matches!(self.kind, ExprKind::Error)
    }
}

/// Every kind of *expression* in Lox.
#[derive(Debug, Clone)]
pub enum ExprKind {
    /// A literal constant: number, string, `true`, `false`, or `nil`.
    Literal(LiteralValue),

    /// Parenthesised sub‑expression: `"(" expression ")"`.
    Grouping(Box<Expr>),

    /// Prefix unary operator expression, `!ready` or `-42`.
    Unary { operator: Token, right: Box<Expr> },

    /// Infix binary operator expression, including the comma operator.
    Binary {
        left: Box<Expr>,
        operator: Token,
        right: Box<Expr>,
    },

    /// Short‑circuiting `and` / `or`.
    Logical {
        left: Box<Expr>,
        operator: Token,
        right: Box<Expr>,
    },

    /// `condition ? then_branch : else_branch`
    Ternary {
        condition: Box<Expr>,
        question: Token,
        then_branch: Box<Expr>,
        colon: Token,
        else_branch: Box<Expr>,
    },

    /// Variable access.
    Variable(Token),

    /// `identifier "=" expression`
    Assign { name: Token, value: Box<Expr> },

    /// Call expression; `paren` is the closing `)` kept for error locations.
    Call {
        callee: Box<Expr>,
        paren: Token,
        arguments: Vec<Expr>,
    },

    /// Function literal, `fun (a, b) { ... }`.
    Function(Rc<FunctionDecl>),

    /// Sentinel left behind by an error production.  Only ever present in a
    /// tree whose parse reported an error.
    Error,
}

/// Parameters and body shared by function declarations and literals.
///
/// Held behind `Rc` so closures can keep their declaration alive without
/// cloning the body.
#[derive(Debug)]
pub struct FunctionDecl {
    /// Declared name, absent for anonymous literals.
    pub name: Option<Token>,

    pub params: Vec<Token>,

    pub body: Vec<Stmt>,
}

impl FunctionDecl {
    pub fn arity(&self) -> usize {
        self.params.len()
    }
}

/// **AST node** for *statements*.  A program is a sequence of these.
#[derive(Debug, Clone)]
pub enum Stmt {
    /// Stand‑alone expression terminated by a semicolon.
    Expression(Expr),

    /// `print` statement used for output.
    Print(Expr),

    /// Variable declaration: `"var" IDENT ("=" initializer)? ";"`.
    Var {
        name: Token,
        initializer: Option<Expr>,
    },

    /// Braced scope containing zero or more declarations/statements.
    Block(Vec<Stmt>),

    /// `if` / `else` conditional.
    If {
        condition: Expr,
        then_branch: Box<Stmt>,
        else_branch: Option<Box<Stmt>>,
    },

    /// `while` loop; `for` loops are desugared into this.
    While { condition: Expr, body: Box<Stmt> },

    /// `break` out of the innermost loop.
    Break(Token),

    /// Named function declaration.
    Function {
        name: Token,
        function: Rc<FunctionDecl>,
    },

    /// `return` statement inside a function body.
    Return { keyword: Token, value: Option<Expr> },

    /// Placeholder for a statement that failed to parse.
    Empty,
}
