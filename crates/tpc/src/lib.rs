//! TPC — core compiler library
//!
//! This crate implements the core compilation pipeline and data structures
//! for a small, testable procedural language compiler that targets x86-64
//! NASM assembly. It is designed to be embedded in tools and tests, and
//! powers the `tpc` command-line tool in the `tpc-driver` crate.
//!
//! The architecture follows a classic pipeline. Parsing is tracked by
//! [`salsa`] to enable incremental recomputation and diagnostics
//! accumulation; symbol-table construction, semantic checking and code
//! generation mutate plain, non-tracked data instead (see the module docs on
//! [`symtab`] and [`semantic`] for why), so the driver gates each of those
//! stages on the accumulated diagnostics' fatal state rather than on salsa's
//! own dependency graph:
//!
//! - Parsing: [`parse`]
//! - Symbol-table construction: [`symtab::SymtabBuilder`]
//! - Semantic checking: [`semantic::Checker`]
//! - Code generation (NASM IR): [`codegen::generate`]
//! - Rendering (assembly text): [`render_program`]
//! - Assembling and linking: [`assemble_and_link`]
//!
//! [`compile`] wraps the first five of those stages (everything through
//! rendering) in one tracked query, so a driver can run a whole file in one
//! call and read back every diagnostic the untracked stages pushed.
//!
//! Data is passed through well-defined types like [`types::SourceFile`],
//! [`types::Ast`], [`codegen::asm::Program`], and [`Text`]. Diagnostics are
//! accumulated via a salsa accumulator, see [`diagnostics`].
//!
//! Quick start
//! -----------
//! Parse, build symbol tables, check and generate a tiny program:
//!
//! ```rust
//! use tpc::{Database, SourceFile, Text};
//!
//! let db = Database::default();
//! let src = "int main() { return 0; }";
//! let file = SourceFile::new(&db, Text::from("main.tpc"), Text::from(src));
//!
//! let ast = tpc::parse(&db, file);
//! let tree = ast.tree(&db);
//! let root = &tree.0;
//! let (globals, collection) = tpc::symtab::SymtabBuilder::new(&db).build(root);
//! let checker = tpc::semantic::Checker::new(&db, &globals, &collection);
//! let ok = checker.check(root);
//! assert!(ok);
//!
//! let program = tpc::codegen::generate(root, &globals, &collection);
//! let asm_text = tpc::render_program(&program).unwrap();
//! assert!(asm_text.contains("global _start"));
//! ```
//!
//! Capturing diagnostics
//! ---------------------
//! Parsing accumulates diagnostics rather than panicking; retrieve them via
//! salsa's `accumulated::<T>()` helper:
//!
//! ```rust
//! use tpc::{Database, SourceFile, Text, diagnostics::Diagnostic};
//!
//! let db = Database::default();
//! let file = SourceFile::new(&db, "test.tpc".into(), "int main() {}".into());
//! let _ = tpc::parse(&db, file);
//! let diags: Vec<&Diagnostic> = tpc::parse::accumulated::<Diagnostic>(&db, file);
//! // Render with codespan-reporting using `tpc::Files`.
//! ```
//!
//! Symbol-table and semantic-checker diagnostics are pushed onto the same
//! accumulator directly through [`Db`] (those stages are not themselves
//! salsa-tracked queries); [`compile`] is the tracked query whose dynamic
//! extent they run in, so `tpc::compile::accumulated::<Diagnostic>(db, file)`
//! is what a driver reads after calling it.
//!
//! See also
//! --------
//! - [`codegen::asm`] for the assembly IR
//! - [`diagnostics`] for diagnostics accumulation and error codes
//! - `tpc-driver` for CLI orchestration and staged callbacks

mod assembling;
mod builtins;
pub mod codegen;
pub mod debug;
pub mod diagnostics;
pub mod codes;
mod cmd;
mod files;
mod parsing;
mod pipeline;
mod render;
pub mod semantic;
pub mod symtab;
mod text;
mod types;

use std::fmt::{self, Debug};

pub use crate::{
    assembling::assemble_and_link,
    cmd::CommandError,
    files::Files,
    parsing::parse,
    pipeline::{compile, debug_symtabs, debug_tree},
    render::render_program,
    text::Text,
    types::{Ast, SourceFile, Tree},
};

#[salsa::db]
pub trait Db: salsa::Database {}

#[salsa::db]
impl<T: salsa::Database> Db for T {}

#[salsa::db]
#[derive(Default, Clone)]
pub struct Database {
    storage: salsa::Storage<Self>,
}

#[salsa::db]
impl salsa::Database for Database {}

impl Debug for Database {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let Database { storage: _ } = self;

        f.debug_struct("Database").finish_non_exhaustive()
    }
}
