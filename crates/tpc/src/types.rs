//! The salsa-tracked value types threaded through the pipeline.

use std::ops::Deref;
use std::sync::Arc;

use tpc_syntax::Node;

use crate::Text;

#[salsa::input]
#[derive(Debug)]
pub struct SourceFile {
    #[returns(ref)]
    pub path: Text,
    #[returns(ref)]
    pub contents: Text,
}

#[salsa::tracked]
pub struct Ast<'db> {
    pub tree: Tree,
}

/// A parsed program, shared behind an `Arc` so cloning an [`Ast`] value (as
/// salsa does on every query boundary) is cheap.
///
/// `semantic::check` mutates the `ty` cell on nodes reachable from this tree
/// in place; see the module docs on [`crate::semantic`] for why that is safe
/// under salsa's memoization even though the tree itself is `#[salsa::tracked]`
/// data.
#[derive(Debug, Clone)]
pub struct Tree(pub Arc<Node>);

impl From<Node> for Tree {
    fn from(value: Node) -> Self {
        Tree(Arc::new(value))
    }
}

impl Deref for Tree {
    type Target = Node;
    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl PartialEq for Tree {
    fn eq(&self, other: &Self) -> bool {
        self.0 == other.0
    }
}

impl Eq for Tree {}

impl std::hash::Hash for Tree {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.0.hash(state);
    }
}
