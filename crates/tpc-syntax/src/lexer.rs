//! Hand-written lexer for TPC.
//!
//! The lexer/parser are explicitly out of scope for the core design (§1);
//! this is the "external collaborator" the rest of the compiler assumes
//! exists, kept deliberately small.

use crate::Span;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    pub span: Span,
    pub text: Box<str>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokenKind {
    // keywords
    KwInt,
    KwChar,
    KwVoid,
    KwIf,
    KwElse,
    KwWhile,
    KwReturn,
    // literals / names
    Ident,
    Num(i64),
    Character(u8),
    // punctuation
    LParen,
    RParen,
    LBrace,
    RBrace,
    LBracket,
    RBracket,
    Semi,
    Comma,
    Assign,
    // operators
    Plus,
    Minus,
    Star,
    Slash,
    Percent,
    EqEq,
    NotEq,
    Lt,
    LtEq,
    Gt,
    GtEq,
    AndAnd,
    OrOr,
    Not,
    Eof,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LexError {
    #[error("{0}: unexpected character {1:?}")]
    UnexpectedChar(Span, char),
    #[error("{0}: unterminated character literal")]
    UnterminatedChar(Span),
    #[error("{0}: invalid character escape '\\{1}'")]
    InvalidEscape(Span, char),
    #[error("{0}: unterminated block comment")]
    UnterminatedComment(Span),
}

pub fn lex(src: &str) -> Result<Vec<Token>, LexError> {
    Lexer::new(src).run()
}

struct Lexer<'a> {
    src: &'a str,
    bytes: &'a [u8],
    pos: usize,
    line: u32,
    column: u32,
}

impl<'a> Lexer<'a> {
    fn new(src: &'a str) -> Self {
        Lexer {
            src,
            bytes: src.as_bytes(),
            pos: 0,
            line: 1,
            column: 1,
        }
    }

    fn peek(&self) -> Option<u8> {
        self.bytes.get(self.pos).copied()
    }

    fn peek_at(&self, offset: usize) -> Option<u8> {
        self.bytes.get(self.pos + offset).copied()
    }

    fn bump(&mut self) -> Option<u8> {
        let c = self.peek()?;
        self.pos += 1;
        if c == b'\n' {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }
        Some(c)
    }

    fn here(&self) -> Span {
        Span::new(self.line, self.column, self.pos as u32, 0)
    }

    fn spanning(&self, start: Span) -> Span {
        Span::new(
            start.line,
            start.column,
            start.offset,
            self.pos as u32 - start.offset,
        )
    }

    fn skip_trivia(&mut self) -> Result<(), LexError> {
        loop {
            match self.peek() {
                Some(b' ') | Some(b'\t') | Some(b'\r') | Some(b'\n') => {
                    self.bump();
                }
                Some(b'/') if self.peek_at(1) == Some(b'/') => {
                    while !matches!(self.peek(), None | Some(b'\n')) {
                        self.bump();
                    }
                }
                Some(b'/') if self.peek_at(1) == Some(b'*') => {
                    let start = self.here();
                    self.bump();
                    self.bump();
                    loop {
                        match self.peek() {
                            None => return Err(LexError::UnterminatedComment(start)),
                            Some(b'*') if self.peek_at(1) == Some(b'/') => {
                                self.bump();
                                self.bump();
                                break;
                            }
                            Some(_) => {
                                self.bump();
                            }
                        }
                    }
                }
                _ => return Ok(()),
            }
        }
    }

    fn run(mut self) -> Result<Vec<Token>, LexError> {
        let mut tokens = Vec::new();
        loop {
            self.skip_trivia()?;
            let start = self.here();
            let Some(c) = self.peek() else {
                tokens.push(Token {
                    kind: TokenKind::Eof,
                    span: start,
                    text: "".into(),
                });
                break;
            };

            let kind = match c {
                b'(' => {
                    self.bump();
                    TokenKind::LParen
                }
                b')' => {
                    self.bump();
                    TokenKind::RParen
                }
                b'{' => {
                    self.bump();
                    TokenKind::LBrace
                }
                b'}' => {
                    self.bump();
                    TokenKind::RBrace
                }
                b'[' => {
                    self.bump();
                    TokenKind::LBracket
                }
                b']' => {
                    self.bump();
                    TokenKind::RBracket
                }
                b';' => {
                    self.bump();
                    TokenKind::Semi
                }
                b',' => {
                    self.bump();
                    TokenKind::Comma
                }
                b'+' => {
                    self.bump();
                    TokenKind::Plus
                }
                b'-' => {
                    self.bump();
                    TokenKind::Minus
                }
                b'*' => {
                    self.bump();
                    TokenKind::Star
                }
                b'/' => {
                    self.bump();
                    TokenKind::Slash
                }
                b'%' => {
                    self.bump();
                    TokenKind::Percent
                }
                b'=' => {
                    self.bump();
                    if self.peek() == Some(b'=') {
                        self.bump();
                        TokenKind::EqEq
                    } else {
                        TokenKind::Assign
                    }
                }
                b'!' => {
                    self.bump();
                    if self.peek() == Some(b'=') {
                        self.bump();
                        TokenKind::NotEq
                    } else {
                        TokenKind::Not
                    }
                }
                b'<' => {
                    self.bump();
                    if self.peek() == Some(b'=') {
                        self.bump();
                        TokenKind::LtEq
                    } else {
                        TokenKind::Lt
                    }
                }
                b'>' => {
                    self.bump();
                    if self.peek() == Some(b'=') {
                        self.bump();
                        TokenKind::GtEq
                    } else {
                        TokenKind::Gt
                    }
                }
                b'&' if self.peek_at(1) == Some(b'&') => {
                    self.bump();
                    self.bump();
                    TokenKind::AndAnd
                }
                b'|' if self.peek_at(1) == Some(b'|') => {
                    self.bump();
                    self.bump();
                    TokenKind::OrOr
                }
                b'\'' => self.lex_character(start)?,
                b'0'..=b'9' => self.lex_number(),
                c if c == b'_' || c.is_ascii_alphabetic() => self.lex_ident_or_keyword(),
                other => {
                    return Err(LexError::UnexpectedChar(start, other as char));
                }
            };

            let span = self.spanning(start);
            let text = self.src[span.to_range()].into();
            tokens.push(Token { kind, span, text });
        }
        Ok(tokens)
    }

    fn lex_number(&mut self) -> TokenKind {
        let start = self.pos;
        while matches!(self.peek(), Some(b'0'..=b'9')) {
            self.bump();
        }
        let value: i64 = self.src[start..self.pos].parse().unwrap_or(i64::MAX);
        TokenKind::Num(value)
    }

    fn lex_ident_or_keyword(&mut self) -> TokenKind {
        let start = self.pos;
        while matches!(self.peek(), Some(c) if c == b'_' || c.is_ascii_alphanumeric()) {
            self.bump();
        }
        match &self.src[start..self.pos] {
            "int" => TokenKind::KwInt,
            "char" => TokenKind::KwChar,
            "void" => TokenKind::KwVoid,
            "if" => TokenKind::KwIf,
            "else" => TokenKind::KwElse,
            "while" => TokenKind::KwWhile,
            "return" => TokenKind::KwReturn,
            _ => TokenKind::Ident,
        }
    }

    /// Resolve a character literal, including the escapes named in §6
    /// (`\n \t \r \' \0`).
    fn lex_character(&mut self, start: Span) -> Result<TokenKind, LexError> {
        self.bump(); // opening quote
        let value = match self.peek() {
            Some(b'\\') => {
                self.bump();
                let escape_span = self.here();
                let c = self.bump().ok_or(LexError::UnterminatedChar(start))?;
                match c {
                    b'n' => b'\n',
                    b't' => b'\t',
                    b'r' => b'\r',
                    b'\'' => b'\'',
                    b'0' => 0,
                    other => return Err(LexError::InvalidEscape(escape_span, other as char)),
                }
            }
            Some(c) => {
                self.bump();
                c
            }
            None => return Err(LexError::UnterminatedChar(start)),
        };
        if self.peek() != Some(b'\'') {
            return Err(LexError::UnterminatedChar(start));
        }
        self.bump(); // closing quote
        Ok(TokenKind::Character(value))
    }
}
