pub mod ast;
pub mod ast_printer;
pub mod environment;
pub mod error;
pub mod function;
pub mod interpreter;
pub mod parser;
pub mod resolver;
pub mod scanner;
pub mod token;
pub mod value;

use std::io::{Stdout, Write};

use log::{debug, info};

use error::Diagnostics;
use interpreter::Interpreter;
use parser::Parser;
use resolver::Resolver;
use scanner::Scanner;

/// One interpreter session: a persistent global environment plus the
/// diagnostics collected while running source text through
/// scan → parse → resolve → interpret.
pub struct Lox<W: Write = Stdout> {
    interpreter: Interpreter<W>,
    diagnostics: Diagnostics,
}

impl Lox<Stdout> {
    pub fn new() -> Self {
        Self::with_output(std::io::stdout())
    }
}

impl Default for Lox<Stdout> {
    fn default() -> Self {
        Self::new()
    }
}

impl<W: Write> Lox<W> {
    /// Session whose `print` output goes to `out`.
    pub fn with_output(out: W) -> Self {
        Self {
            interpreter: Interpreter::with_output(out),
            diagnostics: Diagnostics::new(),
        }
    }

    /// Run a chunk of source.  A lexical or syntax error skips resolution,
    /// and any static error skips evaluation.  Check [`Lox::diagnostics`]
    /// afterwards.
    pub fn run(&mut self, source: &str) {
        info!("Running {} bytes of source", source.len());

        let tokens = Scanner::new(source).scan_tokens(&mut self.diagnostics);
        let statements = Parser::new(tokens).parse(&mut self.diagnostics);

        if self.diagnostics.had_error() {
            debug!("Syntax errors reported, skipping resolution");
            return;
        }

        Resolver::new(&mut self.interpreter).resolve(&statements, &mut self.diagnostics);

        if self.diagnostics.had_error() {
            debug!("Static errors reported, skipping evaluation");
            return;
        }

        self.interpreter.interpret(&statements, &mut self.diagnostics);
    }

    pub fn diagnostics(&self) -> &Diagnostics {
        &self.diagnostics
    }

    pub fn diagnostics_mut(&mut self) -> &mut Diagnostics {
        &mut self.diagnostics
    }

    pub fn interpreter(&self) -> &Interpreter<W> {
        &self.interpreter
    }

    pub fn into_output(self) -> W {
        self.interpreter.into_output()
    }
}
