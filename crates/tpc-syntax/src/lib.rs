//! Lexer, parser and AST for the TPC language.
//!
//! This crate has no knowledge of symbol tables, type checking or code
//! generation — it turns source text into the tree shape described by §6
//! and nothing more. Everything downstream (symtab, semantic, codegen)
//! lives in the `tpc` crate.

mod ast;
mod lexer;
mod parser;
mod span;
mod ty;

pub use ast::{Node, NodeLabel, Payload};
pub use lexer::{LexError, Token, TokenKind, lex};
pub use parser::{ParseError, parse};
pub use span::Span;
pub use ty::Type;
