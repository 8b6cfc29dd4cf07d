//! The single entry point that ties parsing, symbol-table construction,
//! semantic checking, code generation and rendering into one pass (§5
//! "Ordering guarantee").
//!
//! Symbol-table/semantic diagnostics are pushed straight onto the
//! [`crate::diagnostics::Diagnostic`] accumulator rather than through their
//! own tracked queries (see the module docs on [`crate::symtab`] and
//! [`crate::semantic`]); wrapping the whole pass in this one `#[salsa::tracked]`
//! function is what lets a driver retrieve them afterwards with
//! `compile::accumulated::<Diagnostic>(db, file)`, since an accumulate call
//! attributes to whichever tracked query is currently executing on the
//! stack, not only to its immediate (possibly untracked) caller.

use crate::symtab;
use crate::types::SourceFile;
use crate::{codegen, render, semantic, Db};

/// Compile one source file to rendered NASM text.
///
/// Returns `None` if any pass's fatal state (§7 "exit code semantics")
/// prevented code generation from running; the caller reads
/// `compile::accumulated::<Diagnostic>(db, file)` for *why*.
#[tracing::instrument(level = "info", skip_all)]
#[salsa::tracked]
pub fn compile(db: &dyn Db, file: SourceFile) -> Option<String> {
    let ast = crate::parse(db, file);
    let tree = ast.tree(db);
    let root = &tree.0;

    let builder = symtab::SymtabBuilder::new(db);
    let (globals, collection) = builder.build(root);
    if builder.is_fatal() {
        return None;
    }

    let checker = semantic::Checker::new(db, &globals, &collection);
    let checked_ok = checker.check(root);
    symtab::report_unused(db, &globals, &collection);
    if !checked_ok {
        return None;
    }

    let program = codegen::generate(root, &globals, &collection);
    render::render_program(&program).ok()
}

/// The `-t`/`--tree` dump: the parsed tree, one node per line (§6 "CLI").
///
/// A plain call to [`crate::parse`] would do since parsing is already
/// tracked, but routing through its own query keeps every debug dump the
/// CLI offers symmetrical.
#[salsa::tracked]
pub fn debug_tree(db: &dyn Db, file: SourceFile) -> String {
    let ast = crate::parse(db, file);
    let tree = ast.tree(db);
    crate::debug::print_tree(&tree.0)
}

/// The `-s`/`--symtabs` dump: globals and every function's parameters and
/// locals (§6 "CLI").
///
/// Symbol-table construction is a plain, untracked pass (see
/// [`crate::symtab`]), so it is re-run here under its own tracked query
/// purely so any diagnostic it raises lands in a retrievable, query-scoped
/// accumulation rather than nowhere. Re-running it is cheap relative to a
/// single CLI invocation, and `db` is unchanged from the main [`compile`]
/// call, so salsa serves this from cache once parsing has already run.
#[salsa::tracked]
pub fn debug_symtabs(db: &dyn Db, file: SourceFile) -> String {
    let ast = crate::parse(db, file);
    let tree = ast.tree(db);
    let root = &tree.0;
    let (globals, collection) = symtab::SymtabBuilder::new(db).build(root);
    crate::debug::print_symtabs(&globals, &collection)
}
