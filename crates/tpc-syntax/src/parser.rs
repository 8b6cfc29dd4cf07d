//! Recursive-descent parser for TPC, producing the AST shape of §6.
//!
//! Parsing (like lexing) is out of scope for the core design — the checker
//! and code generator only ever see the tree this module builds. It is kept
//! intentionally small: one function per grammar production, precedence
//! climbing for expressions.

use std::iter::Peekable;
use std::vec::IntoIter;

use crate::ast::{Node, NodeLabel, Payload};
use crate::lexer::{Token, TokenKind, lex};
use crate::Span;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseError {
    #[error("{0}: {1}")]
    Lex(Span, String),
    #[error("{span}: expected {expected}, found {found:?}")]
    UnexpectedToken {
        span: Span,
        expected: String,
        found: String,
    },
    #[error("{0}: the program must declare a `main` function")]
    NoMain(Span),
}

pub fn parse(src: &str) -> Result<Node, ParseError> {
    let tokens = lex(src).map_err(|e| {
        let span = match &e {
            crate::lexer::LexError::UnexpectedChar(s, _)
            | crate::lexer::LexError::UnterminatedChar(s)
            | crate::lexer::LexError::InvalidEscape(s, _)
            | crate::lexer::LexError::UnterminatedComment(s) => *s,
        };
        ParseError::Lex(span, e.to_string())
    })?;
    Parser::new(tokens).parse_program()
}

struct Parser {
    tokens: Peekable<IntoIter<Token>>,
    last_span: Span,
}

impl Parser {
    fn new(tokens: Vec<Token>) -> Self {
        Parser {
            tokens: tokens.into_iter().peekable(),
            last_span: Span::synthetic(),
        }
    }

    fn peek(&mut self) -> &TokenKind {
        &self.tokens.peek().expect("Eof is always present").kind
    }

    fn peek_span(&mut self) -> Span {
        self.tokens.peek().expect("Eof is always present").span
    }

    fn bump(&mut self) -> Token {
        let tok = self.tokens.next().expect("Eof is always present");
        self.last_span = tok.span;
        tok
    }

    fn eat(&mut self, kind: &TokenKind, expected: &str) -> Result<Token, ParseError> {
        if self.peek() == kind {
            Ok(self.bump())
        } else {
            let span = self.peek_span();
            let found = format!("{:?}", self.peek());
            Err(ParseError::UnexpectedToken {
                span,
                expected: expected.into(),
                found,
            })
        }
    }

    fn eat_ident(&mut self) -> Result<(Box<str>, Span), ParseError> {
        if matches!(self.peek(), TokenKind::Ident) {
            let tok = self.bump();
            Ok((tok.text, tok.span))
        } else {
            let span = self.peek_span();
            let found = format!("{:?}", self.peek());
            Err(ParseError::UnexpectedToken {
                span,
                expected: "identifier".into(),
                found,
            })
        }
    }

    fn at_type_keyword(&mut self) -> bool {
        matches!(self.peek(), TokenKind::KwInt | TokenKind::KwChar)
    }

    // Prog -> DeclVars DeclFoncts
    fn parse_program(&mut self) -> Result<Node, ParseError> {
        let start = self.peek_span();
        let vars = self.parse_decl_vars()?;
        let foncts = self.parse_decl_foncts()?;
        self.eat(&TokenKind::Eof, "end of file")?;

        let has_main = foncts
            .children
            .iter()
            .any(|f| f.children[0].children[1].text() == "main");
        if !has_main {
            return Err(ParseError::NoMain(start));
        }

        Ok(Node::new(NodeLabel::Prog, start, Payload::None, vec![
            vars, foncts,
        ]))
    }

    // DeclVars -> Type*   (each Type is "int"/"char" name (, name[n])* ;)
    fn parse_decl_vars(&mut self) -> Result<Node, ParseError> {
        let start = self.peek_span();
        let mut types = Vec::new();
        while self.at_type_keyword() {
            types.push(self.parse_type_decl_stmt()?);
        }
        Ok(Node::new(NodeLabel::DeclVars, start, Payload::None, types))
    }

    fn parse_type_decl_stmt(&mut self) -> Result<Node, ParseError> {
        let start = self.peek_span();
        let spelling = self.parse_type_spelling()?;
        let mut declarators = vec![self.parse_declarator()?];
        while matches!(self.peek(), TokenKind::Comma) {
            self.bump();
            declarators.push(self.parse_declarator()?);
        }
        self.eat(&TokenKind::Semi, "';'")?;
        Ok(Node::new(
            NodeLabel::Type,
            start,
            Payload::Text(spelling),
            declarators,
        ))
    }

    fn parse_type_spelling(&mut self) -> Result<Box<str>, ParseError> {
        match self.peek() {
            TokenKind::KwInt => {
                self.bump();
                Ok("int".into())
            }
            TokenKind::KwChar => {
                self.bump();
                Ok("char".into())
            }
            TokenKind::KwVoid => {
                self.bump();
                Ok("void".into())
            }
            _ => {
                let span = self.peek_span();
                let found = format!("{:?}", self.peek());
                Err(ParseError::UnexpectedToken {
                    span,
                    expected: "'int', 'char' or 'void'".into(),
                    found,
                })
            }
        }
    }

    /// A declarator in a global/local declaration: `name` or `name[n]`.
    fn parse_declarator(&mut self) -> Result<Node, ParseError> {
        let (name, span) = self.eat_ident()?;
        let mut children = Vec::new();
        if matches!(self.peek(), TokenKind::LBracket) {
            self.bump();
            let len_span = self.peek_span();
            let len = match self.peek() {
                TokenKind::Num(n) => {
                    let n = *n;
                    self.bump();
                    n
                }
                _ => {
                    let found = format!("{:?}", self.peek());
                    return Err(ParseError::UnexpectedToken {
                        span: len_span,
                        expected: "array length".into(),
                        found,
                    });
                }
            };
            self.eat(&TokenKind::RBracket, "']'")?;
            children.push(Node::leaf(NodeLabel::Num, len_span, Payload::Num(len)));
        }
        Ok(Node::new(NodeLabel::Ident, span, Payload::Text(name), children))
    }

    /// A declarator in a parameter list: `name` or `name[]` (the size is
    /// never written for an array parameter — it is passed by address, see
    /// §4.5 "Array access").
    fn parse_param_declarator(&mut self) -> Result<Node, ParseError> {
        let (name, span) = self.eat_ident()?;
        let mut children = Vec::new();
        if matches!(self.peek(), TokenKind::LBracket) {
            self.bump();
            self.eat(&TokenKind::RBracket, "']'")?;
            children.push(Node::leaf(NodeLabel::Num, span, Payload::Num(-1)));
        }
        Ok(Node::new(NodeLabel::Ident, span, Payload::Text(name), children))
    }

    // DeclFoncts -> DeclFonct*
    fn parse_decl_foncts(&mut self) -> Result<Node, ParseError> {
        let start = self.peek_span();
        let mut foncts = Vec::new();
        while !matches!(self.peek(), TokenKind::Eof) {
            foncts.push(self.parse_decl_fonct()?);
        }
        Ok(Node::new(
            NodeLabel::DeclFoncts,
            start,
            Payload::None,
            foncts,
        ))
    }

    // DeclFonct -> EnTeteFonct Corps
    fn parse_decl_fonct(&mut self) -> Result<Node, ParseError> {
        let start = self.peek_span();
        let header = self.parse_entete_fonct()?;
        let corps = self.parse_corps()?;
        Ok(Node::new(
            NodeLabel::DeclFonct,
            start,
            Payload::None,
            vec![header, corps],
        ))
    }

    // EnTeteFonct -> return-type, Ident, (Parametres | NoParametres)
    fn parse_entete_fonct(&mut self) -> Result<Node, ParseError> {
        let start = self.peek_span();
        let type_span = start;
        let spelling = self.parse_type_spelling()?;
        let return_type = Node::leaf(NodeLabel::Type, type_span, Payload::Text(spelling));
        let (name, name_span) = self.eat_ident()?;
        let name_node = Node::leaf(NodeLabel::Ident, name_span, Payload::Text(name));

        self.eat(&TokenKind::LParen, "'('")?;
        let params = if matches!(self.peek(), TokenKind::RParen) {
            Node::leaf(NodeLabel::NoParametres, self.peek_span(), Payload::None)
        } else if matches!(self.peek(), TokenKind::KwVoid)
            && matches!(self.tokens.clone().nth(1).map(|t| t.kind), Some(TokenKind::RParen))
        {
            self.bump();
            Node::leaf(NodeLabel::NoParametres, self.peek_span(), Payload::None)
        } else {
            self.parse_parametres()?
        };
        self.eat(&TokenKind::RParen, "')'")?;

        Ok(Node::new(
            NodeLabel::EnTeteFonct,
            start,
            Payload::None,
            vec![return_type, name_node, params],
        ))
    }

    fn parse_parametres(&mut self) -> Result<Node, ParseError> {
        let start = self.peek_span();
        let mut types = vec![self.parse_param_type()?];
        while matches!(self.peek(), TokenKind::Comma) {
            self.bump();
            types.push(self.parse_param_type()?);
        }
        let list = Node::new(NodeLabel::ListTypVar, start, Payload::None, types);
        Ok(Node::new(
            NodeLabel::Parametres,
            start,
            Payload::None,
            vec![list],
        ))
    }

    fn parse_param_type(&mut self) -> Result<Node, ParseError> {
        let start = self.peek_span();
        let spelling = self.parse_type_spelling()?;
        let declarator = self.parse_param_declarator()?;
        Ok(Node::new(
            NodeLabel::Type,
            start,
            Payload::Text(spelling),
            vec![declarator],
        ))
    }

    // Corps -> DeclVars SuiteInstr
    fn parse_corps(&mut self) -> Result<Node, ParseError> {
        let start = self.peek_span();
        self.eat(&TokenKind::LBrace, "'{'")?;
        let vars = self.parse_decl_vars()?;
        let mut instrs = Vec::new();
        while !matches!(self.peek(), TokenKind::RBrace) {
            instrs.push(self.parse_instr()?);
        }
        self.eat(&TokenKind::RBrace, "'}'")?;
        let suite = Node::new(NodeLabel::SuiteInstr, start, Payload::None, instrs);
        Ok(Node::new(
            NodeLabel::Corps,
            start,
            Payload::None,
            vec![vars, suite],
        ))
    }

    /// The body of an `if`/`while`/`else`: a braced block (wrapped in a
    /// `SuiteInstr`, however many statements it holds) or a single bare
    /// statement used as-is.
    fn parse_block_or_single(&mut self) -> Result<Node, ParseError> {
        if matches!(self.peek(), TokenKind::LBrace) {
            let start = self.peek_span();
            self.bump();
            let mut instrs = Vec::new();
            while !matches!(self.peek(), TokenKind::RBrace) {
                instrs.push(self.parse_instr()?);
            }
            self.eat(&TokenKind::RBrace, "'}'")?;
            Ok(Node::new(NodeLabel::SuiteInstr, start, Payload::None, instrs))
        } else {
            self.parse_instr()
        }
    }

    fn parse_instr(&mut self) -> Result<Node, ParseError> {
        let start = self.peek_span();
        match self.peek() {
            TokenKind::KwIf => {
                self.bump();
                self.eat(&TokenKind::LParen, "'('")?;
                let cond = self.parse_expr()?;
                self.eat(&TokenKind::RParen, "')'")?;
                let then_body = self.parse_block_or_single()?;
                let mut children = vec![cond, then_body];
                if matches!(self.peek(), TokenKind::KwElse) {
                    let else_start = self.peek_span();
                    self.bump();
                    let else_body = self.parse_block_or_single()?;
                    children.push(Node::new(
                        NodeLabel::Else,
                        else_start,
                        Payload::None,
                        vec![else_body],
                    ));
                }
                Ok(Node::new(NodeLabel::If, start, Payload::None, children))
            }
            TokenKind::KwWhile => {
                self.bump();
                self.eat(&TokenKind::LParen, "'('")?;
                let cond = self.parse_expr()?;
                self.eat(&TokenKind::RParen, "')'")?;
                let body = self.parse_block_or_single()?;
                Ok(Node::new(
                    NodeLabel::While,
                    start,
                    Payload::None,
                    vec![cond, body],
                ))
            }
            TokenKind::KwReturn => {
                self.bump();
                let mut children = Vec::new();
                if !matches!(self.peek(), TokenKind::Semi) {
                    children.push(self.parse_expr()?);
                }
                self.eat(&TokenKind::Semi, "';'")?;
                Ok(Node::new(NodeLabel::Return, start, Payload::None, children))
            }
            TokenKind::Semi => {
                self.bump();
                Ok(Node::leaf(NodeLabel::EmptyInstr, start, Payload::None))
            }
            TokenKind::Ident => self.parse_ident_statement(),
            _ => {
                let span = self.peek_span();
                let found = format!("{:?}", self.peek());
                Err(ParseError::UnexpectedToken {
                    span,
                    expected: "a statement".into(),
                    found,
                })
            }
        }
    }

    /// A statement starting with an identifier: either a call (`f(a, b);`)
    /// or an assignment (`x = e;` / `x[i] = e;`).
    fn parse_ident_statement(&mut self) -> Result<Node, ParseError> {
        let (name, span) = self.eat_ident()?;

        if matches!(self.peek(), TokenKind::LParen) {
            self.bump();
            let args = if matches!(self.peek(), TokenKind::RParen) {
                Node::leaf(NodeLabel::NoParametres, self.peek_span(), Payload::None)
            } else {
                let start = self.peek_span();
                let mut exprs = vec![self.parse_expr()?];
                while matches!(self.peek(), TokenKind::Comma) {
                    self.bump();
                    exprs.push(self.parse_expr()?);
                }
                Node::new(NodeLabel::ListExp, start, Payload::None, exprs)
            };
            self.eat(&TokenKind::RParen, "')'")?;
            self.eat(&TokenKind::Semi, "';'")?;
            return Ok(Node::new(
                NodeLabel::Ident,
                span,
                Payload::Text(name),
                vec![args],
            ));
        }

        let mut lvalue_children = Vec::new();
        if matches!(self.peek(), TokenKind::LBracket) {
            self.bump();
            lvalue_children.push(self.parse_expr()?);
            self.eat(&TokenKind::RBracket, "']'")?;
        }
        let lvalue = Node::new(NodeLabel::Ident, span, Payload::Text(name), lvalue_children);

        self.eat(&TokenKind::Assign, "'='")?;
        let rhs = self.parse_expr()?;
        self.eat(&TokenKind::Semi, "';'")?;
        Ok(Node::new(
            NodeLabel::Assignation,
            span,
            Payload::None,
            vec![lvalue, rhs],
        ))
    }

    // --- Expressions, by precedence (lowest to highest) ---------------

    fn parse_expr(&mut self) -> Result<Node, ParseError> {
        self.parse_or()
    }

    fn parse_or(&mut self) -> Result<Node, ParseError> {
        let mut lhs = self.parse_and()?;
        while matches!(self.peek(), TokenKind::OrOr) {
            let span = lhs.span;
            self.bump();
            let rhs = self.parse_and()?;
            lhs = Node::new(
                NodeLabel::Or,
                span,
                Payload::Text("||".into()),
                vec![lhs, rhs],
            );
        }
        Ok(lhs)
    }

    fn parse_and(&mut self) -> Result<Node, ParseError> {
        let mut lhs = self.parse_eq()?;
        while matches!(self.peek(), TokenKind::AndAnd) {
            let span = lhs.span;
            self.bump();
            let rhs = self.parse_eq()?;
            lhs = Node::new(
                NodeLabel::And,
                span,
                Payload::Text("&&".into()),
                vec![lhs, rhs],
            );
        }
        Ok(lhs)
    }

    fn parse_eq(&mut self) -> Result<Node, ParseError> {
        let mut lhs = self.parse_order()?;
        loop {
            let op: &str = match self.peek() {
                TokenKind::EqEq => "==",
                TokenKind::NotEq => "!=",
                _ => break,
            };
            let span = lhs.span;
            self.bump();
            let rhs = self.parse_order()?;
            lhs = Node::new(NodeLabel::Eq, span, Payload::Text(op.into()), vec![lhs, rhs]);
        }
        Ok(lhs)
    }

    fn parse_order(&mut self) -> Result<Node, ParseError> {
        let mut lhs = self.parse_addsub()?;
        loop {
            let op: &str = match self.peek() {
                TokenKind::Lt => "<",
                TokenKind::LtEq => "<=",
                TokenKind::Gt => ">",
                TokenKind::GtEq => ">=",
                _ => break,
            };
            let span = lhs.span;
            self.bump();
            let rhs = self.parse_addsub()?;
            lhs = Node::new(
                NodeLabel::Order,
                span,
                Payload::Text(op.into()),
                vec![lhs, rhs],
            );
        }
        Ok(lhs)
    }

    fn parse_addsub(&mut self) -> Result<Node, ParseError> {
        let mut lhs = self.parse_divstar()?;
        loop {
            let op: &str = match self.peek() {
                TokenKind::Plus => "+",
                TokenKind::Minus => "-",
                _ => break,
            };
            let span = lhs.span;
            self.bump();
            let rhs = self.parse_divstar()?;
            lhs = Node::new(
                NodeLabel::AddSub,
                span,
                Payload::Text(op.into()),
                vec![lhs, rhs],
            );
        }
        Ok(lhs)
    }

    fn parse_divstar(&mut self) -> Result<Node, ParseError> {
        let mut lhs = self.parse_unary()?;
        loop {
            let op: &str = match self.peek() {
                TokenKind::Star => "*",
                TokenKind::Slash => "/",
                TokenKind::Percent => "%",
                _ => break,
            };
            let span = lhs.span;
            self.bump();
            let rhs = self.parse_unary()?;
            lhs = Node::new(
                NodeLabel::DivStar,
                span,
                Payload::Text(op.into()),
                vec![lhs, rhs],
            );
        }
        Ok(lhs)
    }

    fn parse_unary(&mut self) -> Result<Node, ParseError> {
        match self.peek() {
            TokenKind::Plus => {
                let span = self.peek_span();
                self.bump();
                let operand = self.parse_unary()?;
                Ok(Node::new(
                    NodeLabel::AddSub,
                    span,
                    Payload::Text("+".into()),
                    vec![operand],
                ))
            }
            TokenKind::Minus => {
                let span = self.peek_span();
                self.bump();
                let operand = self.parse_unary()?;
                Ok(Node::new(
                    NodeLabel::AddSub,
                    span,
                    Payload::Text("-".into()),
                    vec![operand],
                ))
            }
            TokenKind::Not => {
                let span = self.peek_span();
                self.bump();
                let operand = self.parse_unary()?;
                Ok(Node::new(
                    NodeLabel::Negation,
                    span,
                    Payload::Text("!".into()),
                    vec![operand],
                ))
            }
            _ => self.parse_primary(),
        }
    }

    fn parse_primary(&mut self) -> Result<Node, ParseError> {
        let span = self.peek_span();
        match self.peek().clone() {
            TokenKind::Num(n) => {
                self.bump();
                Ok(Node::leaf(NodeLabel::Num, span, Payload::Num(n)))
            }
            TokenKind::Character(c) => {
                self.bump();
                Ok(Node::leaf(NodeLabel::Character, span, Payload::Char(c)))
            }
            TokenKind::LParen => {
                self.bump();
                let inner = self.parse_expr()?;
                self.eat(&TokenKind::RParen, "')'")?;
                Ok(inner)
            }
            TokenKind::Ident => {
                let (name, span) = self.eat_ident()?;
                if matches!(self.peek(), TokenKind::LParen) {
                    self.bump();
                    let args = if matches!(self.peek(), TokenKind::RParen) {
                        Node::leaf(NodeLabel::NoParametres, self.peek_span(), Payload::None)
                    } else {
                        let start = self.peek_span();
                        let mut exprs = vec![self.parse_expr()?];
                        while matches!(self.peek(), TokenKind::Comma) {
                            self.bump();
                            exprs.push(self.parse_expr()?);
                        }
                        Node::new(NodeLabel::ListExp, start, Payload::None, exprs)
                    };
                    self.eat(&TokenKind::RParen, "')'")?;
                    Ok(Node::new(
                        NodeLabel::Ident,
                        span,
                        Payload::Text(name),
                        vec![args],
                    ))
                } else if matches!(self.peek(), TokenKind::LBracket) {
                    self.bump();
                    let index = self.parse_expr()?;
                    self.eat(&TokenKind::RBracket, "']'")?;
                    Ok(Node::new(
                        NodeLabel::Ident,
                        span,
                        Payload::Text(name),
                        vec![index],
                    ))
                } else {
                    Ok(Node::leaf(NodeLabel::Ident, span, Payload::Text(name)))
                }
            }
            _ => {
                let found = format!("{:?}", self.peek());
                Err(ParseError::UnexpectedToken {
                    span,
                    expected: "an expression".into(),
                    found,
                })
            }
        }
    }
}
