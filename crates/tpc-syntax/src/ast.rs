//! The AST shape produced by the parser (§6 "Input AST schema").
//!
//! The original compiler links children with a first-child/next-sibling
//! pointer pair; per the "From sibling-linked children to vector children"
//! design note we flatten that to `Vec<Node>` at parse time; the node shape
//! below is otherwise a direct transcription of the table in §6.
//!
//! A braced block (`{ ... }`) that appears where the grammar calls for a
//! single `Instr` (the body of an `If`/`Else`/`While`) is represented by
//! reusing the `SuiteInstr` label as that single child, holding the zero or
//! more statements the block contains; a bare, unbraced statement is used
//! directly without a wrapper. This keeps the `Instr` position in the table
//! literally true (it is still one node) while letting a block carry more
//! than one statement.

use std::cell::Cell;

use crate::{Span, Type};

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum NodeLabel {
    Prog,
    DeclVars,
    Type,
    Ident,
    DeclFoncts,
    DeclFonct,
    EnTeteFonct,
    Parametres,
    ListTypVar,
    NoParametres,
    Corps,
    SuiteInstr,
    If,
    Else,
    While,
    Return,
    Assignation,
    EmptyInstr,
    Or,
    And,
    Eq,
    Order,
    AddSub,
    DivStar,
    Negation,
    Num,
    Character,
    ListExp,
}

impl NodeLabel {
    pub fn as_str(&self) -> &'static str {
        match self {
            NodeLabel::Prog => "Prog",
            NodeLabel::DeclVars => "DeclVars",
            NodeLabel::Type => "Type",
            NodeLabel::Ident => "Ident",
            NodeLabel::DeclFoncts => "DeclFoncts",
            NodeLabel::DeclFonct => "DeclFonct",
            NodeLabel::EnTeteFonct => "EnTeteFonct",
            NodeLabel::Parametres => "Parametres",
            NodeLabel::ListTypVar => "ListTypVar",
            NodeLabel::NoParametres => "NoParametres",
            NodeLabel::Corps => "Corps",
            NodeLabel::SuiteInstr => "SuiteInstr",
            NodeLabel::If => "If",
            NodeLabel::Else => "Else",
            NodeLabel::While => "While",
            NodeLabel::Return => "Return",
            NodeLabel::Assignation => "Assignation",
            NodeLabel::EmptyInstr => "EmptyInstr",
            NodeLabel::Or => "Or",
            NodeLabel::And => "And",
            NodeLabel::Eq => "Eq",
            NodeLabel::Order => "Order",
            NodeLabel::AddSub => "AddSub",
            NodeLabel::DivStar => "DivStar",
            NodeLabel::Negation => "Negation",
            NodeLabel::Num => "Num",
            NodeLabel::Character => "Character",
            NodeLabel::ListExp => "ListExp",
        }
    }
}

impl std::fmt::Display for NodeLabel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The value carried directly on a node: an integer literal, or the
/// spelling of an identifier/type-name/operator/character literal (§3
/// "AST node... payload (integer literal *or* identifier/operator
/// spelling)").
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Payload {
    None,
    Num(i64),
    /// Identifier spelling, type spelling ("int"/"char"), or operator
    /// symbol (e.g. `"+"`, `"<="`, `"&&"`).
    Text(Box<str>),
    /// A character literal's numeric code, already resolved from escapes
    /// (`\n \t \r \' \0`) per §6.
    Char(u8),
}

impl Payload {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Payload::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_num(&self) -> Option<i64> {
        match self {
            Payload::Num(n) => Some(*n),
            _ => None,
        }
    }
}

/// An AST node. The parser produces the shape; the semantic checker is the
/// only later stage allowed to write to it, and it may only write `ty`
/// (§3 "the semantic checker mutates only the node's `type` field").
///
/// `Clone`/`Eq`/`Hash` are implemented by hand rather than derived: they
/// compare/hash structure only (`label`, `payload`, `children`) and ignore
/// `ty`, since `ty` is a write-once decoration filled in after the tree is
/// built, not part of its identity.
#[derive(Debug)]
pub struct Node {
    pub label: NodeLabel,
    pub span: Span,
    pub payload: Payload,
    pub children: Vec<Node>,
    ty: Cell<Type>,
}

impl Clone for Node {
    fn clone(&self) -> Self {
        Node {
            label: self.label,
            span: self.span,
            payload: self.payload.clone(),
            children: self.children.clone(),
            ty: Cell::new(self.ty.get()),
        }
    }
}

impl PartialEq for Node {
    fn eq(&self, other: &Self) -> bool {
        self.label == other.label && self.payload == other.payload && self.children == other.children
    }
}

impl Eq for Node {}

impl std::hash::Hash for Node {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.label.hash(state);
        self.payload.hash(state);
        self.children.hash(state);
    }
}

impl Node {
    pub fn new(label: NodeLabel, span: Span, payload: Payload, children: Vec<Node>) -> Self {
        Node {
            label,
            span,
            payload,
            children,
            ty: Cell::new(Type::empty()),
        }
    }

    pub fn leaf(label: NodeLabel, span: Span, payload: Payload) -> Self {
        Node::new(label, span, payload, Vec::new())
    }

    pub fn ty(&self) -> Type {
        self.ty.get()
    }

    pub fn set_ty(&self, ty: Type) {
        self.ty.set(ty);
    }

    pub fn child(&self, index: usize) -> Option<&Node> {
        self.children.get(index)
    }

    /// The operator or identifier spelling carried on this node, or `""` if
    /// none was recorded.
    pub fn text(&self) -> &str {
        self.payload.as_text().unwrap_or_default()
    }
}
