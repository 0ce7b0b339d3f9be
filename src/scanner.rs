//! Module `scanner` implements a one‑pass, streaming lexer for the Lox language.
//!
//! It transforms UTF‑8 source text into a sequence of [`Token`]s, skipping
//! whitespace and comments, and emitting exactly one `EOF` token at the end.
//! Designed as a `FusedIterator`, it can be chained safely with other iterator
//! adapters.
//!
//! # Public API
//!
//! - `Scanner::new(src: &'a str) -> Scanner<'a>`
//!   Create a new lexer over the input text.
//!
//! - `impl Iterator for Scanner<'a>`
//!   Yields `Result<Token, LoxError>` on each `.next()`.  Errors do not stop
//!   the scan: the offending input is skipped and the next call continues.
//!
//! - `Scanner::scan_tokens(diagnostics) -> Vec<Token>`
//!   Drains the iterator, routing every lexical error to the collector.
//!
//! # Token Recognition
//!
//! - Single‑character tokens: `(`, `)`, `{`, `}`, `,`, `.`, `-`, `+`, `;`,
//!   `:`, `?`, `*`.
//! - One‑or‑two character operators: `!`, `!=`, `=`, `==`, `<`, `<=`, `>`,
//!   `>=`, `/`.
//! - Comments: `//` to end of line, `/* … */` with nesting.
//! - String literals: `"` … `"`, multi‑line, with `\t`, `\n`, `\r` escapes.
//! - Numeric literals: digits with an optional fractional part.
//! - Identifiers/keywords: alphanumeric/_ sequences, resolved via a
//!   perfect‑hash `KEYWORDS` map.
//!
//! # Example
//!
//! ```rust
//! use rox::scanner::Scanner;
//!
//! let scanner = Scanner::new("print 123; // example");
//! for result in scanner {
//!     match result {
//!         Ok(token) => println!("{}", token),
//!         Err(err) => eprintln!("{}", err),
//!     }
//! }
//! ```

use crate::error::{Diagnostics, LoxError, Result};
use crate::token::{Token, TokenType};
use log::{debug, info};
use memchr::memchr;
use phf::phf_map;
use std::iter::FusedIterator;

// Reserved words, looked up after an identifier has been munched.

static KEYWORDS: phf::Map<&'static [u8], TokenType> = phf_map! {
    b"and"    => TokenType::AND,
    b"break"  => TokenType::BREAK,
    b"class"  => TokenType::CLASS,
    b"else"   => TokenType::ELSE,
    b"false"  => TokenType::FALSE,
    b"fun"    => TokenType::FUN,
    b"for"    => TokenType::FOR,
    b"if"     => TokenType::IF,
    b"nil"    => TokenType::NIL,
    b"or"     => TokenType::OR,
    b"print"  => TokenType::PRINT,
    b"return" => TokenType::RETURN,
    b"super"  => TokenType::SUPER,
    b"this"   => TokenType::THIS,
    b"true"   => TokenType::TRUE,
    b"var"    => TokenType::VAR,
    b"while"  => TokenType::WHILE,
};

/// Streaming lexer over one source text.
pub struct Scanner<'a> {
    source: &'a str,
    bytes: &'a [u8],

    /// First byte of the lexeme being scanned.
    start: usize,

    /// Next byte to examine.
    pos: usize,

    line: usize,
}

impl<'a> Scanner<'a> {
    pub fn new(source: &'a str) -> Self {
        info!("Scanner created over {} bytes", source.len());

        Self {
            source,
            bytes: source.as_bytes(),
            start: 0,
            pos: 0,
            line: 1,
        }
    }

    /// Scan the whole input.  Lexical errors are reported to `diagnostics`
    /// and skipped; the returned sequence always ends with `EOF`.
    pub fn scan_tokens(self, diagnostics: &mut Diagnostics) -> Vec<Token> {
        let mut tokens: Vec<Token> = Vec::new();

        for result in self {
            match result {
                Ok(token) => tokens.push(token),
                Err(e) => diagnostics.report(e),
            }
        }

        info!("Scanned {} tokens", tokens.len());

        tokens
    }

    // ───────────────────────────── cursor ──────────────────────────────────

    #[inline(always)]
    fn is_at_end(&self) -> bool {
        self.pos >= self.bytes.len()
    }

    /// Consume one byte.  Callers check [`Self::is_at_end`] first.
    #[inline(always)]
    fn bump(&mut self) -> u8 {
        let b: u8 = self.bytes[self.pos];
        self.pos += 1;
        b
    }

    /// Byte `offset` positions ahead of the cursor, `0` past the end.
    #[inline(always)]
    fn lookahead(&self, offset: usize) -> u8 {
        self.bytes.get(self.pos + offset).copied().unwrap_or(0)
    }

    #[inline(always)]
    fn peek(&self) -> u8 {
        self.lookahead(0)
    }

    #[inline(always)]
    fn eat(&mut self, expected: u8) -> bool {
        let hit: bool = self.peek() == expected && !self.is_at_end();
        if hit {
            self.pos += 1;
        }
        hit
    }

    /// `long` when the next byte is `=`, `short` otherwise.
    fn with_equal(&mut self, long: TokenType, short: TokenType) -> TokenType {
        if self.eat(b'=') {
            long
        } else {
            short
        }
    }

    #[inline(always)]
    fn lexeme(&self) -> &'a str {
        &self.source[self.start..self.pos]
    }

    // ───────────────────────────── lexing ──────────────────────────────────

    /// Scan from `self.start`.  `Ok(None)` means whitespace or a comment was
    /// skipped and nothing should be emitted.
    fn scan_token(&mut self) -> Result<Option<TokenType>> {
        let kind: TokenType = match self.bump() {
            b'(' => TokenType::LEFT_PAREN,
            b')' => TokenType::RIGHT_PAREN,
            b'{' => TokenType::LEFT_BRACE,
            b'}' => TokenType::RIGHT_BRACE,
            b',' => TokenType::COMMA,
            b'.' => TokenType::DOT,
            b'-' => TokenType::MINUS,
            b'+' => TokenType::PLUS,
            b';' => TokenType::SEMICOLON,
            b':' => TokenType::COLON,
            b'?' => TokenType::QUESTION,
            b'*' => TokenType::STAR,

            b'!' => self.with_equal(TokenType::BANG_EQUAL, TokenType::BANG),
            b'=' => self.with_equal(TokenType::EQUAL_EQUAL, TokenType::EQUAL),
            b'<' => self.with_equal(TokenType::LESS_EQUAL, TokenType::LESS),
            b'>' => self.with_equal(TokenType::GREATER_EQUAL, TokenType::GREATER),

            b' ' | b'\r' | b'\t' => return Ok(None),

            b'\n' => {
                self.line += 1;
                return Ok(None);
            }

            b'/' if self.eat(b'/') => {
                // Stop at the newline so the main loop still counts it.
                self.pos = match memchr(b'\n', &self.bytes[self.pos..]) {
                    Some(offset) => self.pos + offset,
                    None => self.bytes.len(),
                };
                return Ok(None);
            }

            b'/' if self.eat(b'*') => {
                self.block_comment()?;
                return Ok(None);
            }

            b'/' => TokenType::SLASH,

            b'"' => self.string()?,

            b'0'..=b'9' => self.number(),

            b'a'..=b'z' | b'A'..=b'Z' | b'_' => self.identifier(),

            _ => {
                // Skip the whole code point so the next lexeme starts on a
                // char boundary.
                let c: char = self.source[self.start..].chars().next().unwrap_or('\u{FFFD}');
                self.pos = self.start + c.len_utf8();

                return Err(LoxError::lex(
                    self.line,
                    format!("Unexpected character: {}", c),
                ));
            }
        };

        Ok(Some(kind))
    }

    /// Skip a `/* … */` comment whose opener is already consumed.  Each
    /// nested `/*` must be matched by its own `*/`.
    fn block_comment(&mut self) -> Result<()> {
        let mut depth: usize = 1;

        while depth > 0 {
            if self.is_at_end() {
                return Err(LoxError::lex(self.line, "Unterminated block comment."));
            }

            match (self.peek(), self.lookahead(1)) {
                (b'/', b'*') => {
                    self.pos += 2;
                    depth += 1;
                }
                (b'*', b'/') => {
                    self.pos += 2;
                    depth -= 1;
                }
                (b'\n', _) => {
                    self.pos += 1;
                    self.line += 1;
                }
                _ => self.pos += 1,
            }
        }

        debug!("Skipped block comment ending on line {}", self.line);

        Ok(())
    }

    /// String literal; the opening quote is consumed.  Strings may span
    /// lines.
    fn string(&mut self) -> Result<TokenType> {
        while !self.is_at_end() && self.peek() != b'"' {
            if self.bump() == b'\n' {
                self.line += 1;
            }
        }

        if self.is_at_end() {
            return Err(LoxError::lex(self.line, "Unterminated string."));
        }

        self.pos += 1;

        let body: &str = &self.source[self.start + 1..self.pos - 1];

        Ok(TokenType::STRING(unescape(body)))
    }

    /// Digits with an optional `.digits` tail.  A trailing `.` is left for
    /// the next token.
    fn number(&mut self) -> TokenType {
        self.skip_digits();

        if self.peek() == b'.' && self.lookahead(1).is_ascii_digit() {
            self.pos += 1;
            self.skip_digits();
        }

        // The lexeme is ASCII digits with at most one interior dot.
        let value: f64 = self.lexeme().parse().unwrap_or(0.0);

        TokenType::NUMBER(value)
    }

    fn skip_digits(&mut self) {
        while self.peek().is_ascii_digit() {
            self.pos += 1;
        }
    }

    /// Maximal munch, then keyword lookup.
    fn identifier(&mut self) -> TokenType {
        while matches!(self.peek(), b'a'..=b'z' | b'A'..=b'Z' | b'0'..=b'9' | b'_') {
            self.pos += 1;
        }

        KEYWORDS
            .get(&self.bytes[self.start..self.pos])
            .cloned()
            .unwrap_or(TokenType::IDENTIFIER)
    }
}

/// Apply the minimal escape pass: `\t`, `\n` and `\r` become the control
/// characters they name; any other backslash is kept verbatim.
fn unescape(raw: &str) -> String {
    if !raw.contains('\\') {
        return raw.to_owned();
    }

    let mut out: String = String::with_capacity(raw.len());
    let mut chars = raw.chars().peekable();

    while let Some(c) = chars.next() {
        if c == '\\' {
            let replacement: Option<char> = match chars.peek() {
                Some('t') => Some('\t'),
                Some('n') => Some('\n'),
                Some('r') => Some('\r'),
                _ => None,
            };

            if let Some(r) = replacement {
                chars.next();
                out.push(r);
                continue;
            }
        }

        out.push(c);
    }

    out
}

impl<'a> Iterator for Scanner<'a> {
    type Item = Result<Token>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            // One past the end once EOF has been handed out.
            if self.pos > self.bytes.len() {
                return None;
            }

            if self.is_at_end() {
                self.pos += 1;
                return Some(Ok(Token::new(TokenType::EOF, "", self.line)));
            }

            self.start = self.pos;

            match self.scan_token() {
                Ok(Some(kind)) => {
                    debug!("Scanned {} on line {}", kind.name(), self.line);
                    return Some(Ok(Token::new(kind, self.lexeme(), self.line)));
                }
                Ok(None) => continue,
                Err(e) => return Some(Err(e)),
            }
        }
    }
}

impl<'a> FusedIterator for Scanner<'a> {}
