//! Lexer for Lox source text.
//!
//! [`Scanner`] walks the source one byte at a time and yields
//! `Result<Token, LoxError>` items. A lexical error is one `Err` item; the
//! item after it resumes right behind the offending input, so a single pass
//! reports every bad character. The stream always ends with exactly one
//! `EOF` token and then stays exhausted (`FusedIterator`).
//!
//! Recognised input:
//!
//! - punctuation `( ) { } , . - + ; * /` and the two-byte operators
//!   `!= == <= >=` (longest match wins);
//! - string literals, which may span lines;
//! - numbers: digits with an optional `.digits` fraction, no exponent;
//! - identifiers and keywords, told apart through a perfect-hash table;
//! - `// line` comments and `/* block */` comments that end at the first `*/`.
//!
//! ```rust
//! use rox::scanner::Scanner;
//!
//! for item in Scanner::new("print 123; // example") {
//!     match item {
//!         Ok(token) => println!("{}", token),
//!         Err(err) => eprintln!("{}", err),
//!     }
//! }
//! ```

use crate::error::{Diagnostics, LoxError, Result};
use crate::token::{Token, TokenType};
use log::{debug, info};
use memchr::{memchr, memchr_iter, memmem};
use phf::phf_map;
use std::iter::FusedIterator;

/// Reserved words. Anything else shaped like a name is an `IDENTIFIER`.
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

/// Streaming lexer over one source string.
pub struct Scanner<'a> {
    text: &'a str,
    bytes: &'a [u8],

    /// First byte of the lexeme being scanned.
    start: usize,

    /// Next byte to look at.
    pos: usize,

    /// Current 1-based line.
    line: usize,

    /// Set once `EOF` has been handed out.
    done: bool,
}

impl<'a> Scanner<'a> {
    pub fn new(text: &'a str) -> Self {
        info!("Scanner created over {} bytes", text.len());

        Self {
            text,
            bytes: text.as_bytes(),
            start: 0,
            pos: 0,
            line: 1,
            done: false,
        }
    }

    #[inline(always)]
    fn at_end(&self) -> bool {
        self.pos >= self.bytes.len()
    }

    /// Byte `offset` places ahead of the cursor, `0` past the end.
    #[inline(always)]
    fn look(&self, offset: usize) -> u8 {
        self.bytes.get(self.pos + offset).copied().unwrap_or(0)
    }

    /// Consume one byte. Only called when not at end.
    #[inline(always)]
    fn bump(&mut self) -> u8 {
        let b: u8 = self.bytes[self.pos];
        self.pos += 1;
        b
    }

    /// `long` if the next byte is `=` (consuming it), otherwise `short`.
    fn with_equals(&mut self, long: TokenType, short: TokenType) -> TokenType {
        if self.look(0) == b'=' {
            self.pos += 1;
            long
        } else {
            short
        }
    }

    fn lexeme(&self) -> &'a str {
        &self.text[self.start..self.pos]
    }

    /// Scan from `self.start`. `Ok(None)` means whitespace or a comment was
    /// skipped and the caller should try again.
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
            b'*' => TokenType::STAR,

            b'!' => self.with_equals(TokenType::BANG_EQUAL, TokenType::BANG),
            b'=' => self.with_equals(TokenType::EQUAL_EQUAL, TokenType::EQUAL),
            b'<' => self.with_equals(TokenType::LESS_EQUAL, TokenType::LESS),
            b'>' => self.with_equals(TokenType::GREATER_EQUAL, TokenType::GREATER),

            b'/' => match self.look(0) {
                b'/' => {
                    self.skip_line_comment();
                    return Ok(None);
                }

                b'*' => {
                    self.pos += 1;
                    self.skip_block_comment()?;
                    return Ok(None);
                }

                _ => TokenType::SLASH,
            },

            b' ' | b'\r' | b'\t' => return Ok(None),

            b'\n' => {
                self.line += 1;
                return Ok(None);
            }

            b'"' => self.string()?,

            b'0'..=b'9' => self.number(),

            b'a'..=b'z' | b'A'..=b'Z' | b'_' => self.identifier(),

            _ => return Err(self.unexpected_character()),
        };

        Ok(Some(kind))
    }

    /// Skip to the newline (not past it, so the line count stays right).
    fn skip_line_comment(&mut self) {
        self.pos = match memchr(b'\n', &self.bytes[self.pos..]) {
            Some(offset) => self.pos + offset,
            None => self.bytes.len(),
        };
    }

    /// The cursor sits just after `/*`.
    fn skip_block_comment(&mut self) -> Result<()> {
        let rest: &[u8] = &self.bytes[self.pos..];

        let Some(close) = memmem::find(rest, b"*/") else {
            self.line += memchr_iter(b'\n', rest).count();
            self.pos = self.bytes.len();

            return Err(LoxError::lex(self.line, "Unterminated block comment."));
        };

        self.line += memchr_iter(b'\n', &rest[..close]).count();
        self.pos += close + 2;

        Ok(())
    }

    /// String body after the opening quote. The token's line is the line of
    /// the closing quote.
    fn string(&mut self) -> Result<TokenType> {
        while !self.at_end() && self.look(0) != b'"' {
            if self.bump() == b'\n' {
                self.line += 1;
            }
        }

        if self.at_end() {
            return Err(LoxError::lex(self.line, "Unterminated string."));
        }

        self.pos += 1;

        let contents: &str = &self.text[self.start + 1..self.pos - 1];
        Ok(TokenType::STRING(contents.to_owned()))
    }

    fn number(&mut self) -> TokenType {
        self.skip_digits();

        // A trailing `.` without digits after it is left for the next token.
        if self.look(0) == b'.' && self.look(1).is_ascii_digit() {
            self.pos += 1;
            self.skip_digits();
        }

        // Only ASCII digits and at most one interior dot reach here.
        let value: f64 = self.lexeme().parse().unwrap_or(0.0);
        TokenType::NUMBER(value)
    }

    fn skip_digits(&mut self) {
        while self.look(0).is_ascii_digit() {
            self.pos += 1;
        }
    }

    fn identifier(&mut self) -> TokenType {
        while matches!(self.look(0), b'a'..=b'z' | b'A'..=b'Z' | b'0'..=b'9' | b'_') {
            self.pos += 1;
        }

        KEYWORDS
            .get(self.lexeme().as_bytes())
            .cloned()
            .unwrap_or(TokenType::IDENTIFIER)
    }

    /// Report the whole code point at `self.start` and step over it.
    fn unexpected_character(&mut self) -> LoxError {
        let ch: char = self.text[self.start..]
            .chars()
            .next()
            .unwrap_or(char::REPLACEMENT_CHARACTER);

        self.pos = self.start + ch.len_utf8();

        LoxError::lex(self.line, format!("Unexpected character: {}", ch))
    }
}

impl<'a> Iterator for Scanner<'a> {
    type Item = Result<Token>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }

        while !self.at_end() {
            self.start = self.pos;

            match self.scan_token() {
                Ok(Some(kind)) => {
                    debug!("Scanned {} '{}' on line {}", kind.name(), self.lexeme(), self.line);

                    return Some(Ok(Token::new(kind, self.lexeme(), self.line)));
                }

                Ok(None) => {}

                Err(e) => return Some(Err(e)),
            }
        }

        self.done = true;

        Some(Ok(Token::new(TokenType::EOF, "", self.line)))
    }
}

impl<'a> FusedIterator for Scanner<'a> {}

/// Scan the whole of `source`, reporting every lexical error into
/// `diagnostics`. The returned vector always ends with `EOF`.
pub fn scan_tokens(source: &str, diagnostics: &mut Diagnostics) -> Vec<Token> {
    let mut tokens: Vec<Token> = Vec::new();

    for result in Scanner::new(source) {
        match result {
            Ok(token) => tokens.push(token),
            Err(e) => diagnostics.report(e),
        }
    }

    info!("Scanned {} tokens", tokens.len());

    tokens
}
