use std::fs::File;
use std::io::{self, BufRead, BufReader, Read, Write};
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser as ClapParser;
use clap::Subcommand;
use env_logger::Builder;
use log::{debug, info};

use rox::ast_printer::AstPrinter;
use rox::error::{Diagnostics, EXIT_RUNTIME_ERROR, EXIT_STATIC_ERROR};
use rox::interpreter::Interpreter;
use rox::parser::Parser;
use rox::resolver::Resolver;
use rox::scanner::Scanner;
use rox::token::Token;
use rox::Lox;

#[derive(ClapParser, Debug)]
#[command(version, about = "Lox language interpreter", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    commands: Commands,

    /// Enable logging to app.log
    #[arg(long, global = true)]
    log: bool,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Tokenizes input from a file, printing each token
    Tokenize {
        filename: PathBuf,

        /// Print the tokens as a JSON array
        #[arg(long)]
        json: bool,
    },

    /// Parses input from a file as a single expression and prints its AST
    Parse {
        filename: PathBuf,

        /// Print in reverse Polish notation instead of prefix form
        #[arg(long)]
        rpn: bool,
    },

    /// Evaluates input from a file as a single expression and prints the result
    Evaluate { filename: PathBuf },

    /// Runs input from a file as a Lox program
    Run { filename: PathBuf },

    /// Starts an interactive prompt
    Repl,
}

/// Reads the contents of a file as UTF‑8 text.
fn read_file(filename: PathBuf) -> Result<String> {
    info!("Reading file: {:?}", filename);
    let file = File::open(&filename).context(format!("Failed to open file {:?}", filename))?;
    let mut reader = BufReader::new(file);
    let mut buf = Vec::new();

    let bytes = reader
        .read_to_end(&mut buf)
        .context(format!("Failed to read file {:?}", filename))?;

    info!("Read {} bytes from {:?}", bytes, filename);

    String::from_utf8(buf).context(format!("File {:?} is not valid UTF-8", filename))
}

fn init_logger() -> Result<()> {
    let log_file = File::create("app.log").context("Failed to create app.log")?;

    // Write to file with module and source line
    Builder::new()
        .format(|buf, record| {
            let module = record.module_path().unwrap_or("<unnamed>");
            let module = module.strip_prefix("rox::").unwrap_or(module);
            writeln!(
                buf,
                "[{}:{}] - {}",
                module,
                record.line().unwrap_or(0),
                record.args()
            )
        })
        .target(env_logger::Target::Pipe(Box::new(log_file)))
        .filter(None, log::LevelFilter::Debug) // Default to Debug, override with RUST_LOG
        .parse_default_env()
        .init();

    info!("Logger initialized, writing to app.log");
    Ok(())
}

/// Print and drain everything reported so far.
fn print_diagnostics(diagnostics: &mut Diagnostics) {
    for e in diagnostics.take_errors() {
        eprintln!("{}", e);
    }
}

fn tokenize(source: &str, json: bool) -> Result<i32> {
    let mut diagnostics = Diagnostics::new();
    let mut tokens: Vec<Token> = Vec::new();

    for result in Scanner::new(source) {
        match result {
            Ok(token) => {
                if !json {
                    println!("{}", token);
                }
                tokens.push(token);
            }
            Err(e) => {
                eprintln!("{}", e);
                diagnostics.report(e);
            }
        }
    }

    if json {
        println!(
            "{}",
            serde_json::to_string_pretty(&tokens).context("Failed to serialize tokens")?
        );
    }

    Ok(diagnostics.exit_code())
}

fn parse(source: &str, rpn: bool) -> Result<i32> {
    let mut diagnostics = Diagnostics::new();
    let tokens = Scanner::new(source).scan_tokens(&mut diagnostics);
    let expr = Parser::new(tokens).parse_expression(&mut diagnostics);

    print_diagnostics(&mut diagnostics);

    match expr {
        Some(expr) if !diagnostics.had_error() => {
            let rendered = if rpn {
                AstPrinter::print_rpn(&expr)
            } else {
                AstPrinter::print(&expr)
            };

            debug!("AST: {}", rendered);
            println!("{}", rendered);

            Ok(0)
        }
        _ => Ok(EXIT_STATIC_ERROR),
    }
}

fn evaluate(source: &str) -> Result<i32> {
    let mut diagnostics = Diagnostics::new();
    let tokens = Scanner::new(source).scan_tokens(&mut diagnostics);
    let expr = Parser::new(tokens).parse_expression(&mut diagnostics);

    let expr = match expr {
        Some(expr) if !diagnostics.had_error() => expr,
        _ => {
            print_diagnostics(&mut diagnostics);
            return Ok(EXIT_STATIC_ERROR);
        }
    };

    let mut interpreter = Interpreter::new();
    Resolver::new(&mut interpreter).resolve_expression(&expr, &mut diagnostics);

    if diagnostics.had_error() {
        print_diagnostics(&mut diagnostics);
        return Ok(EXIT_STATIC_ERROR);
    }

    match interpreter.evaluate(&expr) {
        Ok(value) => {
            debug!("Evaluated to: {}", value);
            println!("{}", value);
            Ok(0)
        }
        Err(e) => {
            debug!("Evaluation debug: {}", e);
            eprintln!("{}", e);
            Ok(EXIT_RUNTIME_ERROR)
        }
    }
}

fn run(source: &str) -> Result<i32> {
    let mut lox = Lox::new();
    lox.run(source);

    let diagnostics = lox.diagnostics_mut();
    print_diagnostics(diagnostics);

    Ok(diagnostics.exit_code())
}

fn repl() -> Result<i32> {
    let mut lox = Lox::new();
    let stdin = io::stdin();
    let mut lines = stdin.lock().lines();

    loop {
        print!("> ");
        io::stdout().flush().context("Failed to flush prompt")?;

        let Some(line) = lines.next() else {
            break;
        };
        let line = line.context("Failed to read from stdin")?;

        lox.run(&line);

        let diagnostics = lox.diagnostics_mut();
        print_diagnostics(diagnostics);
        diagnostics.reset();
    }

    Ok(0)
}

fn main() -> Result<()> {
    let args: Cli = Cli::parse();

    // Initialize logger only if --log flag is provided
    if args.log {
        init_logger()?;
    } else {
        // Initialize a minimal logger to avoid "no logger" errors
        env_logger::Builder::new()
            .filter_level(log::LevelFilter::Off)
            .init();
    }

    info!("CLI arguments: {:?}", args);

    let code: i32 = match args.commands {
        Commands::Tokenize { filename, json } => tokenize(&read_file(filename)?, json)?,
        Commands::Parse { filename, rpn } => parse(&read_file(filename)?, rpn)?,
        Commands::Evaluate { filename } => evaluate(&read_file(filename)?)?,
        Commands::Run { filename } => run(&read_file(filename)?)?,
        Commands::Repl => repl()?,
    };

    if code != 0 {
        debug!("Exiting with code {}", code);
        std::process::exit(code);
    }

    Ok(())
}
