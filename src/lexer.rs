//! Hand-rolled scanner for the grammar specification file.
//!
//! Grounded directly on the original tool's lexical handling inside
//! `Parse()`/`nextcp` (tools/lemon/lemon.c): the whole file is read
//! into memory up front and scanned character-by-character, with
//! explicit handling for line/block comments, quoted strings, and
//! brace-delimited code blocks that must track nested braces, string
//! and character literals, and escapes so a `}` inside user code does
//! not end the block early.

use crate::location::Location;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokenKind {
    Percent,
    Arrow,
    Dot,
    LParen,
    RParen,
    LBracket,
    RBracket,
    Ident(String),
    Code(String),
    Str(String),
    Punct(char),
}

#[derive(Debug, Clone)]
pub struct Token {
    pub kind: TokenKind,
    pub location: Location,
}

#[derive(Debug)]
pub enum LexError {
    UnterminatedString(Location),
    UnterminatedCodeBlock(Location),
    UnterminatedComment(Location),
}

impl std::fmt::Display for LexError {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            LexError::UnterminatedString(loc) => write!(f, "unterminated string starting at line {}", loc.line),
            LexError::UnterminatedCodeBlock(loc) => write!(f, "unterminated code block starting at line {}", loc.line),
            LexError::UnterminatedComment(loc) => write!(f, "unterminated comment starting at line {}", loc.line),
        }
    }
}

pub struct Lexer<'a> {
    chars: Vec<char>,
    pos: usize,
    location: Location,
    _source: &'a str,
}

impl<'a> Lexer<'a> {
    pub fn new(source: &'a str) -> Self {
        Self {
            chars: source.chars().collect(),
            pos: 0,
            location: Location::start(),
            _source: source,
        }
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn peek_at(&self, offset: usize) -> Option<char> {
        self.chars.get(self.pos + offset).copied()
    }

    fn advance(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += 1;
        self.location.advance(c);
        Some(c)
    }

    fn starts_with(&self, s: &str) -> bool {
        s.chars()
            .enumerate()
            .all(|(i, c)| self.peek_at(i) == Some(c))
    }

    fn skip_whitespace_and_comments(&mut self) -> Result<(), LexError> {
        loop {
            match self.peek() {
                Some(c) if c.is_whitespace() => {
                    self.advance();
                }
                Some('/') if self.peek_at(1) == Some('/') => {
                    while let Some(c) = self.peek() {
                        if c == '\n' {
                            break;
                        }
                        self.advance();
                    }
                }
                Some('/') if self.peek_at(1) == Some('*') => {
                    let start = self.location;
                    self.advance();
                    self.advance();
                    loop {
                        if self.peek().is_none() {
                            return Err(LexError::UnterminatedComment(start));
                        }
                        if self.starts_with("*/") {
                            self.advance();
                            self.advance();
                            break;
                        }
                        self.advance();
                    }
                }
                _ => break,
            }
        }
        Ok(())
    }

    fn scan_string(&mut self) -> Result<Token, LexError> {
        let start = self.location;
        self.advance(); // opening quote
        let mut text = String::new();
        loop {
            match self.peek() {
                None => return Err(LexError::UnterminatedString(start)),
                Some('"') => {
                    self.advance();
                    break;
                }
                Some('\\') => {
                    text.push(self.advance().unwrap());
                    if let Some(c) = self.advance() {
                        text.push(c);
                    }
                }
                Some(c) => {
                    text.push(c);
                    self.advance();
                }
            }
        }
        Ok(Token {
            kind: TokenKind::Str(text),
            location: start,
        })
    }

    /// Scan a brace-delimited code block, tracking nested braces,
    /// comments, and string/character literals so braces inside those
    /// constructs don't affect nesting depth.
    fn scan_code_block(&mut self) -> Result<Token, LexError> {
        let start = self.location;
        self.advance(); // opening '{'
        let mut depth = 1usize;
        let mut text = String::new();
        loop {
            match self.peek() {
                None => return Err(LexError::UnterminatedCodeBlock(start)),
                Some('{') => {
                    depth += 1;
                    text.push(self.advance().unwrap());
                }
                Some('}') => {
                    depth -= 1;
                    self.advance();
                    if depth == 0 {
                        break;
                    }
                    text.push('}');
                }
                Some('/') if self.peek_at(1) == Some('/') => {
                    while let Some(c) = self.peek() {
                        text.push(c);
                        self.advance();
                        if c == '\n' {
                            break;
                        }
                    }
                }
                Some('/') if self.peek_at(1) == Some('*') => {
                    text.push(self.advance().unwrap());
                    text.push(self.advance().unwrap());
                    loop {
                        if self.peek().is_none() {
                            return Err(LexError::UnterminatedCodeBlock(start));
                        }
                        if self.starts_with("*/") {
                            text.push(self.advance().unwrap());
                            text.push(self.advance().unwrap());
                            break;
                        }
                        text.push(self.advance().unwrap());
                    }
                }
                Some(quote @ '"') | Some(quote @ '\'') => {
                    text.push(self.advance().unwrap());
                    loop {
                        match self.peek() {
                            None => return Err(LexError::UnterminatedCodeBlock(start)),
                            Some(c) if c == quote => {
                                text.push(self.advance().unwrap());
                                break;
                            }
                            Some('\\') => {
                                text.push(self.advance().unwrap());
                                if let Some(c) = self.advance() {
                                    text.push(c);
                                }
                            }
                            Some(c) => {
                                text.push(c);
                                self.advance();
                            }
                        }
                    }
                }
                Some(c) => {
                    text.push(c);
                    self.advance();
                }
            }
        }
        Ok(Token {
            kind: TokenKind::Code(text),
            location: start,
        })
    }

    fn scan_ident(&mut self) -> Token {
        let start = self.location;
        let mut text = String::new();
        while let Some(c) = self.peek() {
            if c.is_ascii_alphanumeric() || c == '_' {
                text.push(c);
                self.advance();
            } else {
                break;
            }
        }
        Token {
            kind: TokenKind::Ident(text),
            location: start,
        }
    }

    pub fn next_token(&mut self) -> Result<Option<Token>, LexError> {
        self.skip_whitespace_and_comments()?;
        let start = self.location;
        let c = match self.peek() {
            None => return Ok(None),
            Some(c) => c,
        };
        if c.is_ascii_alphabetic() || c == '_' {
            return Ok(Some(self.scan_ident()));
        }
        if c == '"' {
            return Ok(Some(self.scan_string()?));
        }
        if c == '{' {
            return Ok(Some(self.scan_code_block()?));
        }
        if self.starts_with("::=") {
            self.advance();
            self.advance();
            self.advance();
            return Ok(Some(Token {
                kind: TokenKind::Arrow,
                location: start,
            }));
        }
        self.advance();
        let kind = match c {
            '%' => TokenKind::Percent,
            '.' => TokenKind::Dot,
            '(' => TokenKind::LParen,
            ')' => TokenKind::RParen,
            '[' => TokenKind::LBracket,
            ']' => TokenKind::RBracket,
            other => TokenKind::Punct(other),
        };
        Ok(Some(Token { kind, location: start }))
    }
}
