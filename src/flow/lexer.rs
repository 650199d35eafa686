//! Flow tokenizer. Never fails: bad input becomes diagnostics.

use std::iter::Peekable;
use std::str::Chars;

use crate::model::{Diagnostic, Location};

#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    Ident(String),
    Int(i64),
    Float(f64),
    Str(String),

    // Keywords
    Fn,
    Ref,
    True,
    False,
    Null,

    LParen,
    RParen,
    Comma,
    Colon,
    Semi,
    Dot,
    Question,
    Lt,
    Gt,
    Le,
    Ge,
    EqEq,
    NotEq,
    Plus,
    Minus,
    Star,
    Slash,
    Percent,
    Bang,
    AndAnd,
    OrOr,
    FatArrow,
    Arrow,

    Eof,
}

impl TokenKind {
    /// Source-like rendering for messages.
    pub fn describe(&self) -> String {
        let text = match self {
            TokenKind::Ident(name) => return name.clone(),
            TokenKind::Int(v) => return v.to_string(),
            TokenKind::Float(v) => return v.to_string(),
            TokenKind::Str(s) => return format!("\"{}\"", s),
            TokenKind::Eof => return "end of file".to_string(),
            TokenKind::Fn => "fn",
            TokenKind::Ref => "ref",
            TokenKind::True => "true",
            TokenKind::False => "false",
            TokenKind::Null => "null",
            TokenKind::LParen => "(",
            TokenKind::RParen => ")",
            TokenKind::Comma => ",",
            TokenKind::Colon => ":",
            TokenKind::Semi => ";",
            TokenKind::Dot => ".",
            TokenKind::Question => "?",
            TokenKind::Lt => "<",
            TokenKind::Gt => ">",
            TokenKind::Le => "<=",
            TokenKind::Ge => ">=",
            TokenKind::EqEq => "==",
            TokenKind::NotEq => "!=",
            TokenKind::Plus => "+",
            TokenKind::Minus => "-",
            TokenKind::Star => "*",
            TokenKind::Slash => "/",
            TokenKind::Percent => "%",
            TokenKind::Bang => "!",
            TokenKind::AndAnd => "&&",
            TokenKind::OrOr => "||",
            TokenKind::FatArrow => "=>",
            TokenKind::Arrow => "->",
        };
        text.to_string()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub start: Location,
    /// Position just past the last character.
    pub end: Location,
}

/// Tokenize `source`. The token list always ends with `Eof`.
pub fn tokenize(source: &str) -> (Vec<Token>, Vec<Diagnostic>) {
    let mut lexer = Lexer {
        chars: source.chars().peekable(),
        line: 0,
        column: 0,
        tokens: Vec::new(),
        diagnostics: Vec::new(),
    };
    lexer.run();
    (lexer.tokens, lexer.diagnostics)
}

struct Lexer<'a> {
    chars: Peekable<Chars<'a>>,
    line: usize,
    column: usize,
    tokens: Vec<Token>,
    diagnostics: Vec<Diagnostic>,
}

impl Lexer<'_> {
    fn run(&mut self) {
        while let Some(&c) = self.chars.peek() {
            let start = self.here();
            match c {
                c if c.is_whitespace() => {
                    self.bump();
                }
                '/' => {
                    self.bump();
                    match self.chars.peek() {
                        Some('/') => self.line_comment(),
                        Some('*') => {
                            self.bump();
                            self.block_comment(start);
                        }
                        _ => self.push(TokenKind::Slash, start),
                    }
                }
                '"' => self.string(start),
                c if c.is_ascii_digit() => self.number(start),
                c if c.is_alphabetic() || c == '_' => self.ident(start),
                _ => self.punct(c, start),
            }
        }
        let end = self.here();
        self.tokens.push(Token {
            kind: TokenKind::Eof,
            start: end,
            end,
        });
    }

    fn here(&self) -> Location {
        Location::new(self.line, self.column)
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.chars.next()?;
        if c == '\n' {
            self.line += 1;
            self.column = 0;
        } else {
            self.column += 1;
        }
        Some(c)
    }

    fn eat(&mut self, expected: char) -> bool {
        if self.chars.peek() == Some(&expected) {
            self.bump();
            true
        } else {
            false
        }
    }

    fn push(&mut self, kind: TokenKind, start: Location) {
        let end = self.here();
        self.tokens.push(Token { kind, start, end });
    }

    fn line_comment(&mut self) {
        while let Some(&c) = self.chars.peek() {
            if c == '\n' {
                break;
            }
            self.bump();
        }
    }

    fn block_comment(&mut self, start: Location) {
        loop {
            match self.bump() {
                Some('*') if self.eat('/') => return,
                Some(_) => {}
                None => {
                    self.diagnostics.push(Diagnostic::error(
                        "FX1035",
                        "End-of-file found, '*/' expected",
                        start,
                    ));
                    return;
                }
            }
        }
    }

    fn string(&mut self, start: Location) {
        self.bump();
        let mut value = String::new();
        loop {
            match self.chars.peek().copied() {
                Some('"') => {
                    self.bump();
                    break;
                }
                Some('\\') => {
                    self.bump();
                    match self.bump() {
                        Some('n') => value.push('\n'),
                        Some('t') => value.push('\t'),
                        Some('r') => value.push('\r'),
                        Some(c @ ('"' | '\\')) => value.push(c),
                        Some(c) => {
                            self.diagnostics.push(Diagnostic::error(
                                "FX1009",
                                format!("Unrecognized escape sequence '\\{}'", c),
                                start,
                            ));
                        }
                        None => {}
                    }
                }
                Some('\n') | None => {
                    self.diagnostics
                        .push(Diagnostic::error("FX1010", "Newline in constant", start));
                    break;
                }
                Some(c) => {
                    self.bump();
                    value.push(c);
                }
            }
        }
        self.push(TokenKind::Str(value), start);
    }

    fn number(&mut self, start: Location) {
        let mut text = String::new();
        self.digits(&mut text);

        // A '.' only continues the number when a digit follows it.
        let mut lookahead = self.chars.clone();
        let is_float = lookahead.next() == Some('.') && lookahead.next().is_some_and(|c| c.is_ascii_digit());
        if is_float {
            self.bump();
            text.push('.');
            self.digits(&mut text);
            match text.parse::<f64>() {
                Ok(v) => self.push(TokenKind::Float(v), start),
                Err(_) => self.push(TokenKind::Float(0.0), start),
            }
            return;
        }

        match text.parse::<i64>() {
            Ok(v) => self.push(TokenKind::Int(v), start),
            Err(_) => {
                self.diagnostics.push(Diagnostic::error(
                    "FX1021",
                    "Integral constant is too large",
                    start,
                ));
                self.push(TokenKind::Int(0), start);
            }
        }
    }

    fn digits(&mut self, text: &mut String) {
        while let Some(&c) = self.chars.peek() {
            if !c.is_ascii_digit() {
                break;
            }
            text.push(c);
            self.bump();
        }
    }

    fn ident(&mut self, start: Location) {
        let mut name = String::new();
        while let Some(&c) = self.chars.peek() {
            if !(c.is_alphanumeric() || c == '_') {
                break;
            }
            name.push(c);
            self.bump();
        }
        let kind = match name.as_str() {
            "fn" => TokenKind::Fn,
            "ref" => TokenKind::Ref,
            "true" => TokenKind::True,
            "false" => TokenKind::False,
            "null" => TokenKind::Null,
            _ => TokenKind::Ident(name),
        };
        self.push(kind, start);
    }

    fn punct(&mut self, c: char, start: Location) {
        self.bump();
        let kind = match c {
            '(' => TokenKind::LParen,
            ')' => TokenKind::RParen,
            ',' => TokenKind::Comma,
            ':' => TokenKind::Colon,
            ';' => TokenKind::Semi,
            '.' => TokenKind::Dot,
            '?' => TokenKind::Question,
            '+' => TokenKind::Plus,
            '*' => TokenKind::Star,
            '%' => TokenKind::Percent,
            '-' if self.eat('>') => TokenKind::Arrow,
            '-' => TokenKind::Minus,
            '<' if self.eat('=') => TokenKind::Le,
            '<' => TokenKind::Lt,
            '>' if self.eat('=') => TokenKind::Ge,
            '>' => TokenKind::Gt,
            '!' if self.eat('=') => TokenKind::NotEq,
            '!' => TokenKind::Bang,
            '=' if self.eat('=') => TokenKind::EqEq,
            '=' if self.eat('>') => TokenKind::FatArrow,
            '&' if self.eat('&') => TokenKind::AndAnd,
            '|' if self.eat('|') => TokenKind::OrOr,
            other => {
                self.diagnostics.push(Diagnostic::error(
                    "FX1056",
                    format!("Unexpected character '{}'", other),
                    start,
                ));
                return;
            }
        };
        self.push(kind, start);
    }
}
