/*!
Recursive‑descent parser for Lox
================================

Definitions
-----------
* **n** = number of tokens (including the sole EOF).
* **m** = number of AST nodes (`m ≤ n`, because each token contributes at most one node).

### Time

| Phase / function              | Cost | Rationale                                                   |
|-------------------------------|-----:|-------------------------------------------------------------|
| `Parser::parse` main loop     | Θ(n) | Each token is consumed once via `advance()`.                |
| Individual productions        | O(1) per token | Stream‑oriented descent; no extra scans.          |
| Error recovery `synchronize()`| O(k) | Discards tokens ≤ next statement boundary (`k ≤ n`).        |

### Error recovery

A production that cannot continue returns `Err(LoxError::Parse)`.  The error
is caught at the declaration boundary, recorded, and the parser discards
tokens until it reaches a statement keyword or just past a `;`.  The failed
declaration is replaced by [`Stmt::Empty`] so later passes can skip it, and a
single run reports every independent syntax error.

Some errors are *non‑fatal*: they are recorded but parsing continues as if the
input were valid (invalid assignment target, too many parameters/arguments,
`break` outside a loop, a binary operator with no left operand).

### Logging Policy

| Location                     | Level  | Purpose                                   |
|------------------------------|--------|-------------------------------------------|
| `Parser::new`, `parse`       | `info` | Lifecycle milestones.                     |
| `declaration`, `statement`   | `debug`| High‑level descent into grammar branches. |
| Error paths                  | `debug`| Context before recording the error.       |

--------------------------------------------------------------------------------
Grammar (highest to lowest binding precedence for expressions)
--------------------------------------------------------------

```text
program        → declaration* EOF ;
declaration    → funDecl | varDecl | statement ;
funDecl        → "fun" IDENT "(" parameters? ")" block ;
varDecl        → "var" IDENT ( "=" expression )? ";" ;
statement      → exprStmt | printStmt | ifStmt | whileStmt | forStmt
               | breakStmt | returnStmt | block ;
ifStmt         → "if" "(" expression ")" block ( "else" block )? ;
whileStmt      → "while" "(" expression ")" block ;
forStmt        → "for" "(" ( varDecl | exprStmt | ";" )
                 expression? ";" expression? ")" block ;
breakStmt      → "break" ";" ;
returnStmt     → "return" expression? ";" ;
block          → "{" declaration* "}" ;

primary        → literal | "(" expression ")" | IDENT | "fun" funcLiteral ;
call           → primary ( "(" arguments? ")" )* ;
unary          → ( "!" | "-" ) unary | call ;
multiply       → unary ( ( "*" | "/" ) unary )* ;
add            → multiply ( ( "+" | "-" ) multiply )* ;
compare        → add ( ( ">" | ">=" | "<" | "<=" ) add )* ;
equality       → compare ( ( "!=" | "==" ) compare )* ;
and            → equality ( "and" equality )* ;
or             → and ( "or" and )* ;
assignment     → IDENT "=" assignment | or ;
sequence       → assignment ( "," assignment )* ;
ternary        → sequence ( "?" sequence ":" sequence )* ;
expression     → ternary ;
arguments      → assignment ( "," assignment )* ;
```
*/

use std::rc::Rc;

use crate::ast::{Expr, ExprKind, FunctionDecl, LiteralValue, Stmt};
use crate::error::{Diagnostics, LoxError, Result};
use crate::token::{Token, TokenType};

use log::{debug, info};

/// Upper bound on parameters and call arguments.
pub const MAX_ARITY: usize = 8;

type Production = fn(&mut Parser) -> Result<Expr>;

/// Top‑level parser over an owned token sequence.
pub struct Parser {
    tokens: Vec<Token>,
    current: usize,

    /// Number of loops enclosing the current position; `break` needs > 0.
    loop_depth: usize,

    /// Every error seen so far, fatal or not, in source order.
    errors: Vec<LoxError>,
}

impl Parser {
    /// Construct a new parser.  A missing trailing `EOF` is supplied.
    pub fn new(mut tokens: Vec<Token>) -> Self {
        info!("Parser created with {} tokens", tokens.len());

        let line: usize = tokens.last().map_or(1, |t| t.line);
        if tokens.last().map_or(true, |t| t.token_type != TokenType::EOF) {
            tokens.push(Token::new(TokenType::EOF, "", line));
        }

        Self {
            tokens,
            current: 0,
            loop_depth: 0,
            errors: Vec::new(),
        }
    }

    // ───────────────────────── public API ─────────────────────────

    /// Parse an entire program.  Never fails: syntax errors are reported to
    /// `diagnostics` and failed declarations become [`Stmt::Empty`].
    pub fn parse(&mut self, diagnostics: &mut Diagnostics) -> Vec<Stmt> {
        info!("Beginning parse phase");

        let mut statements: Vec<Stmt> = Vec::new();

        while !self.is_at_end() {
            statements.push(self.declaration());
        }

        info!(
            "Parsed {} statement(s) with {} error(s)",
            statements.len(),
            self.errors.len()
        );

        self.flush_errors(diagnostics);

        statements
    }

    /// Parse the whole input as one expression.  Returns `None` if any
    /// syntax error was reported.
    pub fn parse_expression(&mut self, diagnostics: &mut Diagnostics) -> Option<Expr> {
        info!("Beginning single‑expression parse");

        let result: Result<Expr> = self.expression().and_then(|expr| {
            if self.is_at_end() {
                Ok(expr)
            } else {
                Err(LoxError::parse(self.peek(), "Expect end of expression."))
            }
        });

        let expr: Option<Expr> = match result {
            Ok(expr) => Some(expr),
            Err(e) => {
                self.errors.push(e);
                None
            }
        };

        let failed: bool = !self.errors.is_empty();
        self.flush_errors(diagnostics);

        if failed {
            None
        } else {
            expr
        }
    }

    fn flush_errors(&mut self, diagnostics: &mut Diagnostics) {
        for e in self.errors.drain(..) {
            diagnostics.report(e);
        }
    }

    // ──────────────────────── declaration rules ───────────────────

    /// Parse one declaration, recovering from any syntax error inside it.
    fn declaration(&mut self) -> Stmt {
        debug!("Entering declaration at line {}", self.peek().line);

        let result: Result<Stmt> =
            if self.check(TokenType::FUN) && self.check_next(TokenType::IDENTIFIER) {
                self.advance();
                self.function_declaration()
            } else if self.matches(TokenType::VAR) {
                self.var_declaration()
            } else {
                self.statement()
            };

        match result {
            Ok(stmt) => stmt,
            Err(e) => {
                debug!("Parse debug: {}", e);

                self.errors.push(e);
                self.synchronize();

                Stmt::Empty
            }
        }
    }

    fn function_declaration(&mut self) -> Result<Stmt> {
        let name: Token = self.consume(TokenType::IDENTIFIER, "Expect function name.")?;
        let function: Rc<FunctionDecl> = self.function_body(Some(name.clone()))?;

        Ok(Stmt::Function { name, function })
    }

    /// Parameters and body of a declaration or literal; the name (if any)
    /// has already been consumed.
    fn function_body(&mut self, name: Option<Token>) -> Result<Rc<FunctionDecl>> {
        let kind: &str = if name.is_some() { "function name" } else { "'fun'" };
        self.consume(TokenType::LEFT_PAREN, &format!("Expect '(' after {}.", kind))?;

        let mut params: Vec<Token> = Vec::new();

        if !self.check(TokenType::RIGHT_PAREN) {
            loop {
                if params.len() >= MAX_ARITY {
                    let e = LoxError::parse(
                        self.peek(),
                        format!("Cannot have more than {} parameters.", MAX_ARITY),
                    );
                    self.errors.push(e);
                }

                params.push(self.consume(TokenType::IDENTIFIER, "Expect parameter name.")?);

                if !self.matches(TokenType::COMMA) {
                    break;
                }
            }
        }

        self.consume(TokenType::RIGHT_PAREN, "Expect ')' after parameters.")?;
        self.consume(TokenType::LEFT_BRACE, "Expect '{' before function body.")?;

        // `break` cannot cross a function boundary.
        let enclosing_loops: usize = std::mem::replace(&mut self.loop_depth, 0);
        let body: Result<Vec<Stmt>> = self.block();
        self.loop_depth = enclosing_loops;

        Ok(Rc::new(FunctionDecl {
            name,
            params,
            body: body?,
        }))
    }

    fn var_declaration(&mut self) -> Result<Stmt> {
        let name: Token = self.consume(TokenType::IDENTIFIER, "Expect variable name.")?;

        let initializer: Option<Expr> = if self.matches(TokenType::EQUAL) {
            Some(self.expression()?)
        } else {
            None
        };

        self.consume(
            TokenType::SEMICOLON,
            "Expect ';' after variable declaration.",
        )?;

        Ok(Stmt::Var { name, initializer })
    }

    // ───────────────────────── statement rules ────────────────────

    fn statement(&mut self) -> Result<Stmt> {
        debug!("Entering statement: {}", self.peek().token_type.name());

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

    /// `for (init; cond; incr) { body }` becomes
    /// `{ init; while (cond) { { body } incr; } }`, with a missing condition
    /// replaced by `true`.
    fn for_statement(&mut self) -> Result<Stmt> {
        self.consume(TokenType::LEFT_PAREN, "Expect '(' after 'for'.")?;

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
        self.consume(TokenType::SEMICOLON, "Expect ';' after loop condition.")?;

        let increment: Option<Expr> = if !self.check(TokenType::RIGHT_PAREN) {
            Some(self.expression()?)
        } else {
            None
        };
        self.consume(TokenType::RIGHT_PAREN, "Expect ')' after for clauses.")?;

        let body: Vec<Stmt> = self.loop_body()?;

        let mut inner: Vec<Stmt> = vec![Stmt::Block(body)];
        if let Some(increment) = increment {
            inner.push(Stmt::Expression(increment));
        }

        let condition: Expr =
            condition.unwrap_or_else(|| Expr::new(ExprKind::Literal(LiteralValue::Bool(true))));

        let mut desugared: Stmt = Stmt::While {
            condition,
            body: Box::new(Stmt::Block(inner)),
        };

        if let Some(initializer) = initializer {
            desugared = Stmt::Block(vec![initializer, desugared]);
        }

        Ok(desugared)
    }

    fn if_statement(&mut self) -> Result<Stmt> {
        self.consume(TokenType::LEFT_PAREN, "Expect '(' after 'if'.")?;
        let condition: Expr = self.expression()?;
        self.consume(TokenType::RIGHT_PAREN, "Expect ')' after if condition.")?;

        self.consume(TokenType::LEFT_BRACE, "Expect '{' before if body.")?;
        let then_branch: Box<Stmt> = Box::new(Stmt::Block(self.block()?));

        let else_branch: Option<Box<Stmt>> = if self.matches(TokenType::ELSE) {
            self.consume(TokenType::LEFT_BRACE, "Expect '{' before else body.")?;
            Some(Box::new(Stmt::Block(self.block()?)))
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
        self.consume(TokenType::LEFT_PAREN, "Expect '(' after 'while'.")?;
        let condition: Expr = self.expression()?;
        self.consume(TokenType::RIGHT_PAREN, "Expect ')' after condition.")?;

        let body: Box<Stmt> = Box::new(Stmt::Block(self.loop_body()?));

        Ok(Stmt::While { condition, body })
    }

    /// Braced loop body, parsed with the loop counter raised.
    fn loop_body(&mut self) -> Result<Vec<Stmt>> {
        self.consume(TokenType::LEFT_BRACE, "Expect '{' before loop body.")?;

        self.loop_depth += 1;
        let body: Result<Vec<Stmt>> = self.block();
        self.loop_depth -= 1;

        body
    }

    fn break_statement(&mut self) -> Result<Stmt> {
        let keyword: Token = self.previous().clone();

        if self.loop_depth == 0 {
            debug!("'break' outside of a loop on line {}", keyword.line);

            let e = LoxError::parse(&keyword, "Must be inside a loop to use 'break'.");
            self.errors.push(e);
        }

        self.consume(TokenType::SEMICOLON, "Expect ';' after 'break'.")?;

        Ok(Stmt::Break(keyword))
    }

    fn return_statement(&mut self) -> Result<Stmt> {
        let keyword: Token = self.previous().clone();
        let value: Option<Expr> = if !self.check(TokenType::SEMICOLON) {
            Some(self.expression()?)
        } else {
            None
        };

        self.consume(TokenType::SEMICOLON, "Expect ';' after return value.")?;

        Ok(Stmt::Return { keyword, value })
    }

    fn print_statement(&mut self) -> Result<Stmt> {
        let value: Expr = self.expression()?;

        self.consume(TokenType::SEMICOLON, "Expect ';' after value.")?;

        Ok(Stmt::Print(value))
    }

    fn expression_statement(&mut self) -> Result<Stmt> {
        let expr: Expr = self.expression()?;

        self.consume(TokenType::SEMICOLON, "Expect ';' after expression.")?;

        Ok(Stmt::Expression(expr))
    }

    /// Declarations up to the closing `}`; the opening brace is consumed.
    fn block(&mut self) -> Result<Vec<Stmt>> {
        let mut statements: Vec<Stmt> = Vec::new();

        while !self.check(TokenType::RIGHT_BRACE) && !self.is_at_end() {
            statements.push(self.declaration());
        }

        self.consume(TokenType::RIGHT_BRACE, "Expect '}' after block.")?;

        Ok(statements)
    }

    // ─────────────────────── expression rules ─────────────────────

    fn expression(&mut self) -> Result<Expr> {
        self.ternary()
    }

    fn ternary(&mut self) -> Result<Expr> {
        let mut expr: Expr = self.sequence()?;

        while self.matches(TokenType::QUESTION) {
            let question: Token = self.previous().clone();
            let then_branch: Expr = self.sequence()?;
            let colon: Token = self.consume(
                TokenType::COLON,
                "Expect ':' after then branch of conditional expression.",
            )?;
            let else_branch: Expr = self.sequence()?;

            if expr.is_error() {
                continue;
            }

            expr = Expr::new(ExprKind::Ternary {
                condition: Box::new(expr),
                question,
                then_branch: Box::new(then_branch),
                colon,
                else_branch: Box::new(else_branch),
            });
        }

        Ok(expr)
    }

    fn sequence(&mut self) -> Result<Expr> {
        self.left_associative(Self::assignment, &[TokenType::COMMA])
    }

    fn assignment(&mut self) -> Result<Expr> {
        let expr: Expr = self.logical_or()?;

        if self.matches(TokenType::EQUAL) {
            let equals: Token = self.previous().clone();
            let value: Expr = self.assignment()?;

            if let ExprKind::Variable(name) = &expr.kind {
                return Ok(Expr::new(ExprKind::Assign {
                    name: name.clone(),
                    value: Box::new(value),
                }));
            }

            debug!("Invalid assignment target on line {}", equals.line);

            self.errors
                .push(LoxError::parse(&equals, "Invalid assignment target."));
        }

        Ok(expr)
    }

    fn logical_or(&mut self) -> Result<Expr> {
        self.logical(Self::logical_and, TokenType::OR)
    }

    fn logical_and(&mut self) -> Result<Expr> {
        self.logical(Self::equality, TokenType::AND)
    }

    fn equality(&mut self) -> Result<Expr> {
        self.left_associative(
            Self::comparison,
            &[TokenType::BANG_EQUAL, TokenType::EQUAL_EQUAL],
        )
    }

    fn comparison(&mut self) -> Result<Expr> {
        self.left_associative(
            Self::term,
            &[
                TokenType::GREATER,
                TokenType::GREATER_EQUAL,
                TokenType::LESS,
                TokenType::LESS_EQUAL,
            ],
        )
    }

    fn term(&mut self) -> Result<Expr> {
        self.left_associative(Self::factor, &[TokenType::MINUS, TokenType::PLUS])
    }

    fn factor(&mut self) -> Result<Expr> {
        self.left_associative(Self::unary, &[TokenType::STAR, TokenType::SLASH])
    }

    fn unary(&mut self) -> Result<Expr> {
        if self.match_any(&[TokenType::BANG, TokenType::MINUS]) {
            let operator: Token = self.previous().clone();
            let right: Expr = self.unary()?;

            return Ok(Expr::new(ExprKind::Unary {
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
                    let e = LoxError::parse(
                        self.peek(),
                        format!("Cannot have more than {} arguments.", MAX_ARITY),
                    );
                    self.errors.push(e);
                }

                // Commas separate arguments here, so skip the sequence level.
                arguments.push(self.assignment()?);

                if !self.matches(TokenType::COMMA) {
                    break;
                }
            }
        }

        let paren: Token = self.consume(TokenType::RIGHT_PAREN, "Expect ')' after arguments.")?;

        Ok(Expr::new(ExprKind::Call {
            callee: Box::new(callee),
            paren,
            arguments,
        }))
    }

    fn primary(&mut self) -> Result<Expr> {
        if self.matches(TokenType::FALSE) {
            return Ok(Expr::new(ExprKind::Literal(LiteralValue::Bool(false))));
        }
        if self.matches(TokenType::TRUE) {
            return Ok(Expr::new(ExprKind::Literal(LiteralValue::Bool(true))));
        }
        if self.matches(TokenType::NIL) {
            return Ok(Expr::new(ExprKind::Literal(LiteralValue::Nil)));
        }

        match &self.peek().token_type {
            TokenType::NUMBER(n) => {
                let n: f64 = *n;
                self.advance();
                return Ok(Expr::new(ExprKind::Literal(LiteralValue::Number(n))));
            }
            TokenType::STRING(s) => {
                let s: String = s.clone();
                self.advance();
                return Ok(Expr::new(ExprKind::Literal(LiteralValue::Str(s))));
            }
            _ => {}
        }

        if self.matches(TokenType::IDENTIFIER) {
            return Ok(Expr::new(ExprKind::Variable(self.previous().clone())));
        }

        if self.matches(TokenType::LEFT_PAREN) {
            let expr: Expr = self.expression()?;

            self.consume(TokenType::RIGHT_PAREN, "Expect ')' after expression.")?;

            return Ok(Expr::new(ExprKind::Grouping(Box::new(expr))));
        }

        if self.matches(TokenType::FUN) {
            let function: Rc<FunctionDecl> = self.function_body(None)?;
            return Ok(Expr::new(ExprKind::Function(function)));
        }

        if let Some(operand) = self.missing_left_operand() {
            return operand;
        }

        Err(LoxError::parse(self.peek(), "Expect expression."))
    }

    /// Error production for a binary operator with nothing on its left, as in
    /// `* 3`.  The right operand is parsed at the operator's own level and
    /// discarded.
    fn missing_left_operand(&mut self) -> Option<Result<Expr>> {
        let right_operand: Production = match self.peek().token_type {
            TokenType::BANG_EQUAL | TokenType::EQUAL_EQUAL => Self::comparison,
            TokenType::GREATER
            | TokenType::GREATER_EQUAL
            | TokenType::LESS
            | TokenType::LESS_EQUAL => Self::term,
            TokenType::PLUS => Self::factor,
            TokenType::STAR | TokenType::SLASH => Self::unary,
            _ => return None,
        };

        let operator: Token = self.advance().clone();
        debug!("Missing left operand for '{}'", operator.lexeme);

        self.errors
            .push(LoxError::parse(&operator, "Missing left-hand operand."));

        Some(right_operand(self).map(|_| Expr::new(ExprKind::Error)))
    }

    /// Shared loop for the left‑associative binary levels.  Once the left
    /// side is an error sentinel, later operands are parsed but not combined.
    fn left_associative(&mut self, operand: Production, operators: &[TokenType]) -> Result<Expr> {
        let mut expr: Expr = operand(self)?;

        while self.match_any(operators) {
            let operator: Token = self.previous().clone();
            let right: Expr = operand(self)?;

            if expr.is_error() {
                continue;
            }

            expr = Expr::new(ExprKind::Binary {
                left: Box::new(expr),
                operator,
                right: Box::new(right),
            });
        }

        Ok(expr)
    }

    fn logical(&mut self, operand: Production, operator_type: TokenType) -> Result<Expr> {
        let mut expr: Expr = operand(self)?;

        while self.matches(operator_type.clone()) {
            let operator: Token = self.previous().clone();
            let right: Expr = operand(self)?;

            if expr.is_error() {
                continue;
            }

            expr = Expr::new(ExprKind::Logical {
                left: Box::new(expr),
                operator,
                right: Box::new(right),
            });
        }

        Ok(expr)
    }

    // ────────────────────── utility helpers ───────────────────────

    #[inline(always)]
    fn matches(&mut self, ttype: TokenType) -> bool {
        if self.check(ttype) {
            self.advance();

            return true;
        }

        false
    }

    fn match_any(&mut self, types: &[TokenType]) -> bool {
        for ttype in types {
            if self.check(ttype.clone()) {
                self.advance();

                return true;
            }
        }

        false
    }

    #[inline(always)]
    fn consume(&mut self, ttype: TokenType, message: &str) -> Result<Token> {
        if self.check(ttype) {
            return Ok(self.advance().clone());
        }

        debug!("Expected token missing: {}", message);

        Err(LoxError::parse(self.peek(), message))
    }

    #[inline(always)]
    fn check(&self, ttype: TokenType) -> bool {
        if self.is_at_end() {
            return false;
        }

        self.peek().token_type == ttype
    }

    /// One token of extra lookahead, used to tell `fun name(...)` apart
    /// from a function literal.
    fn check_next(&self, ttype: TokenType) -> bool {
        match self.tokens.get(self.current + 1) {
            Some(token) => token.token_type == ttype,
            None => false,
        }
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
        matches!(self.peek().token_type, TokenType::EOF)
    }

    #[inline(always)]
    fn peek(&self) -> &Token {
        &self.tokens[self.current]
    }

    #[inline(always)]
    fn previous(&self) -> &Token {
        &self.tokens[self.current.saturating_sub(1)]
    }

    /// Discards tokens until it thinks it is at a statement boundary.
    fn synchronize(&mut self) {
        self.advance(); // skip the token that caused the error

        while !self.is_at_end() {
            if matches!(self.previous().token_type, TokenType::SEMICOLON) {
                return;
            }

            match self.peek().token_type {
                TokenType::CLASS
                | TokenType::FUN
                | TokenType::VAR
                | TokenType::FOR
                | TokenType::IF
                | TokenType::WHILE
                | TokenType::PRINT
                | TokenType::BREAK
                | TokenType::RETURN => return,
                _ => {}
            }

            self.advance();
        }
    }
}
