//! Tree‑walking evaluator.
//!
//! Statements execute against a cursor into the environment chain
//! (`self.environment`).  Non‑local control flow is not an error: statement
//! execution yields a [`Signal`] that block and loop drivers inspect after
//! every statement.  Only [`LoxError`]s unwind to [`Interpreter::interpret`].

use std::collections::HashMap;
use std::io::{self, Stdout, Write};
use std::mem;
use std::rc::Rc;

use chrono::Utc;
use log::{debug, info};

use crate::ast::{Expr, ExprId, ExprKind, LiteralValue, Stmt};
use crate::environment::{EnvRef, Environment};
use crate::error::{Diagnostics, LoxError, Result};
use crate::function::LoxFunction;
use crate::token::{Token, TokenType};
use crate::value::Value;

/// How a statement finished.
#[derive(Debug, Clone, PartialEq)]
pub enum Signal {
    /// Fell through; continue with the next statement.
    Normal,

    /// `break` requested; unwinds to the innermost loop.
    Break,

    /// `return` requested; unwinds to the function‑call boundary.
    Return(Value),
}

pub struct Interpreter<W: Write = Stdout> {
    globals: EnvRef,
    environment: EnvRef,

    /// Hop counts recorded by the resolver, keyed by expression identity.
    locals: HashMap<ExprId, usize>,

    /// Sink for `print` output.
    out: W,
}

impl Interpreter<Stdout> {
    /// Interpreter printing to standard output.
    pub fn new() -> Self {
        Self::with_output(io::stdout())
    }
}

impl Default for Interpreter<Stdout> {
    fn default() -> Self {
        Self::new()
    }
}

/// Seconds since the Unix epoch.
fn clock(_args: &[Value]) -> std::result::Result<Value, String> {
    let millis: i64 = Utc::now().timestamp_millis();

    debug!("Native function 'clock' returned {} ms", millis);

    Ok(Value::Number(millis as f64 / 1000.0))
}

impl<W: Write> Interpreter<W> {
    /// Creates a new Interpreter and defines native functions such as `clock`.
    pub fn with_output(out: W) -> Self {
        info!("Initializing Interpreter");

        let globals: EnvRef = Environment::new().shared();

        debug!("Defining native function 'clock'");

        globals.borrow_mut().define(
            "clock",
            Value::NativeFunction {
                name: "clock".to_string(),
                arity: 0,
                func: clock,
            },
        );

        Self {
            environment: Rc::clone(&globals),
            globals,
            locals: HashMap::new(),
            out,
        }
    }

    pub fn output(&self) -> &W {
        &self.out
    }

    pub fn into_output(self) -> W {
        self.out
    }

    /// Record that `expr` refers to a binding `depth` scopes out.
    pub fn note_local(&mut self, expr: &Expr, depth: usize) {
        debug!("Noting {:?} at depth {}", expr.id, depth);

        self.locals.insert(expr.id, depth);
    }

    /// Executes top‑level statements in order.  The first runtime error is
    /// reported and halts the program.
    pub fn interpret(&mut self, statements: &[Stmt], diagnostics: &mut Diagnostics) {
        debug!("Interpreting {} statements", statements.len());

        for stmt in statements {
            if let Err(e) = self.execute(stmt) {
                debug!("Runtime debug: {}", e);
                diagnostics.report(e);
                return;
            }
        }

        info!("Interpretation completed successfully");
    }

    /// Executes a single statement.
    pub fn execute(&mut self, stmt: &Stmt) -> Result<Signal> {
        match stmt {
            Stmt::Expression(expr) => {
                self.evaluate(expr)?;
                Ok(Signal::Normal)
            }

            Stmt::Print(expr) => {
                let value: Value = self.evaluate(expr)?;
                writeln!(self.out, "{}", value)?;
                debug!("Printed value: {}", value);
                Ok(Signal::Normal)
            }

            Stmt::Var { name, initializer } => {
                let value: Value = match initializer {
                    Some(expr) => self.evaluate(expr)?,
                    None => Value::Nil,
                };
                debug!("Defining variable '{}' = {}", name.lexeme, value);
                self.environment.borrow_mut().define(&name.lexeme, value);
                Ok(Signal::Normal)
            }

            Stmt::Block(statements) => {
                let frame: Environment = Environment::with_enclosing(Rc::clone(&self.environment));
                self.execute_block(statements, frame.shared())
            }

            Stmt::If {
                condition,
                then_branch,
                else_branch,
            } => {
                if self.evaluate(condition)?.is_truthy() {
                    self.execute(then_branch)
                } else if let Some(else_stmt) = else_branch {
                    self.execute(else_stmt)
                } else {
                    Ok(Signal::Normal)
                }
            }

            Stmt::While { condition, body } => {
                debug!("Entering while loop");
                while self.evaluate(condition)?.is_truthy() {
                    match self.execute(body)? {
                        Signal::Normal => {}
                        Signal::Break => break,
                        signal @ Signal::Return(_) => return Ok(signal),
                    }
                }
                debug!("Exited while loop");
                Ok(Signal::Normal)
            }

            Stmt::Break(_) => Ok(Signal::Break),

            Stmt::Function { name, function } => {
                debug!("Defining function '{}'", name.lexeme);
                let value: Value = Value::Function(Rc::new(LoxFunction::new(
                    Rc::clone(function),
                    Rc::clone(&self.environment),
                )));
                self.environment.borrow_mut().define(&name.lexeme, value);
                Ok(Signal::Normal)
            }

            Stmt::Return { value, .. } => {
                let value: Value = match value {
                    Some(expr) => self.evaluate(expr)?,
                    None => Value::Nil,
                };
                debug!("Returning value: {}", value);
                Ok(Signal::Return(value))
            }

            Stmt::Empty => Ok(Signal::Normal),
        }
    }

    /// Run `statements` with `environment` as the current frame.  The previous
    /// frame is restored on every exit path: normal completion, a signal, or
    /// an error.
    pub fn execute_block(&mut self, statements: &[Stmt], environment: EnvRef) -> Result<Signal> {
        let previous: EnvRef = mem::replace(&mut self.environment, environment);
        let result: Result<Signal> = self.execute_all(statements);
        self.environment = previous;

        result
    }

    fn execute_all(&mut self, statements: &[Stmt]) -> Result<Signal> {
        for stmt in statements {
            let signal: Signal = self.execute(stmt)?;
            if signal != Signal::Normal {
                return Ok(signal);
            }
        }

        Ok(Signal::Normal)
    }

    /// Evaluates an expression and returns a Value.
    pub fn evaluate(&mut self, expr: &Expr) -> Result<Value> {
        let value: Value = match &expr.kind {
            ExprKind::Literal(literal) => match literal {
                LiteralValue::Number(n) => Value::Number(*n),
                LiteralValue::Str(s) => Value::String(s.clone()),
                LiteralValue::Bool(b) => Value::Bool(*b),
                LiteralValue::Nil => Value::Nil,
            },

            ExprKind::Grouping(inner) => self.evaluate(inner)?,

            ExprKind::Unary { operator, right } => self.evaluate_unary(operator, right)?,

            ExprKind::Binary {
                left,
                operator,
                right,
            } => self.evaluate_binary(left, operator, right)?,

            ExprKind::Logical {
                left,
                operator,
                right,
            } => {
                let left_val: Value = self.evaluate(left)?;
                let short_circuit: bool = if operator.token_type == TokenType::OR {
                    left_val.is_truthy()
                } else {
                    !left_val.is_truthy()
                };

                if short_circuit {
                    left_val
                } else {
                    self.evaluate(right)?
                }
            }

            ExprKind::Ternary {
                condition,
                question,
                then_branch,
                colon,
                else_branch,
            } => {
                if question.token_type != TokenType::QUESTION || colon.token_type != TokenType::COLON
                {
                    return Err(LoxError::runtime(
                        question,
                        "Conditional expression needs both '?' and ':'.",
                    ));
                }

                if self.evaluate(condition)?.is_truthy() {
                    self.evaluate(then_branch)?
                } else {
                    self.evaluate(else_branch)?
                }
            }

            ExprKind::Variable(name) => self.look_up_variable(name, expr)?,

            ExprKind::Assign { name, value } => {
                let value: Value = self.evaluate(value)?;

                match self.locals.get(&expr.id).copied() {
                    Some(distance) => {
                        Environment::assign_at(&self.environment, distance, name, value.clone())?
                    }
                    None => self.globals.borrow_mut().assign(name, value.clone())?,
                }

                debug!("Assigned value {} to '{}'", value, name.lexeme);
                value
            }

            ExprKind::Call {
                callee,
                paren,
                arguments,
            } => {
                let callee_val: Value = self.evaluate(callee)?;

                let mut arg_values: Vec<Value> = Vec::with_capacity(arguments.len());
                for arg in arguments {
                    arg_values.push(self.evaluate(arg)?);
                }

                self.invoke_callable(&callee_val, paren, arg_values)?
            }

            ExprKind::Function(declaration) => Value::Function(Rc::new(LoxFunction::new(
                Rc::clone(declaration),
                Rc::clone(&self.environment),
            ))),

            ExprKind::Error => {
                return Err(LoxError::Runtime {
                    message: "Cannot evaluate an invalid expression.".to_string(),
                    line: 0,
                })
            }
        };

        debug!("Expression {:?} evaluated to: {}", expr.id, value);

        Ok(value)
    }

    fn evaluate_unary(&mut self, operator: &Token, right: &Expr) -> Result<Value> {
        let right_val: Value = self.evaluate(right)?;

        match operator.token_type {
            TokenType::MINUS => match right_val {
                Value::Number(n) => Ok(Value::Number(-n)),
                _ => Err(LoxError::runtime(operator, "Operand must be a number.")),
            },
            TokenType::BANG => Ok(Value::Bool(!right_val.is_truthy())),
            _ => Err(LoxError::runtime(operator, "Invalid unary operator.")),
        }
    }

    fn evaluate_binary(&mut self, left: &Expr, operator: &Token, right: &Expr) -> Result<Value> {
        let left_val: Value = self.evaluate(left)?;
        let right_val: Value = self.evaluate(right)?;

        debug!(
            "Binary '{}' on {} and {}",
            operator.lexeme, left_val, right_val
        );

        match operator.token_type {
            // Sequencing: both sides ran, the right one is the result.
            TokenType::COMMA => Ok(right_val),

            TokenType::PLUS => match (left_val, right_val) {
                (Value::Number(a), Value::Number(b)) => Ok(Value::Number(a + b)),
                (l @ Value::String(_), r) | (l, r @ Value::String(_)) => {
                    Ok(Value::String(format!("{}{}", l, r)))
                }
                _ => Err(LoxError::runtime(
                    operator,
                    "Operands must be two numbers or at least one string.",
                )),
            },

            TokenType::MINUS => {
                let (a, b) = number_operands(operator, &left_val, &right_val)?;
                Ok(Value::Number(a - b))
            }

            TokenType::STAR => {
                let (a, b) = number_operands(operator, &left_val, &right_val)?;
                Ok(Value::Number(a * b))
            }

            TokenType::SLASH => {
                let (a, b) = number_operands(operator, &left_val, &right_val)?;
                if b == 0.0 {
                    return Err(LoxError::runtime(operator, "Divide by zero."));
                }
                Ok(Value::Number(a / b))
            }

            TokenType::GREATER => {
                let (a, b) = number_operands(operator, &left_val, &right_val)?;
                Ok(Value::Bool(a > b))
            }

            TokenType::GREATER_EQUAL => {
                let (a, b) = number_operands(operator, &left_val, &right_val)?;
                Ok(Value::Bool(a >= b))
            }

            TokenType::LESS => {
                let (a, b) = number_operands(operator, &left_val, &right_val)?;
                Ok(Value::Bool(a < b))
            }

            TokenType::LESS_EQUAL => {
                let (a, b) = number_operands(operator, &left_val, &right_val)?;
                Ok(Value::Bool(a <= b))
            }

            TokenType::EQUAL_EQUAL => Ok(Value::Bool(left_val == right_val)),

            TokenType::BANG_EQUAL => Ok(Value::Bool(left_val != right_val)),

            _ => Err(LoxError::runtime(operator, "Invalid binary operator.")),
        }
    }

    /// Resolved locals jump straight to their frame; anything the resolver
    /// left alone is a global.
    fn look_up_variable(&self, name: &Token, expr: &Expr) -> Result<Value> {
        let value: Value = match self.locals.get(&expr.id).copied() {
            Some(distance) => Environment::get_at(&self.environment, distance, name)?,
            None => self.globals.borrow().get(name)?,
        };

        debug!("Variable '{}' evaluated to: {}", name.lexeme, value);

        Ok(value)
    }

    /// Invokes a callable (native or user‑defined function).
    fn invoke_callable(
        &mut self,
        callee_val: &Value,
        paren: &Token,
        arguments: Vec<Value>,
    ) -> Result<Value> {
        let arity: usize = match callee_val {
            Value::NativeFunction { arity, .. } => *arity,
            Value::Function(function) => function.arity(),
            _ => {
                return Err(LoxError::runtime(paren, "Can only call functions."));
            }
        };

        if arguments.len() != arity {
            return Err(LoxError::runtime(
                paren,
                format!(
                    "Expected {} arguments but got {}.",
                    arity,
                    arguments.len()
                ),
            ));
        }

        match callee_val {
            Value::NativeFunction { name, func, .. } => {
                debug!("Calling native function '{}'", name);
                func(&arguments).map_err(|message| LoxError::runtime(paren, message))
            }

            Value::Function(function) => {
                debug!("Calling user-defined function {}", function);
                function.call(self, arguments)
            }

            _ => Err(LoxError::runtime(paren, "Can only call functions.")),
        }
    }
}

fn number_operands(operator: &Token, left: &Value, right: &Value) -> Result<(f64, f64)> {
    match (left, right) {
        (Value::Number(a), Value::Number(b)) => Ok((*a, *b)),
        _ => Err(LoxError::runtime(operator, "Operands must be numbers.")),
    }
}
