//! Pretty-printers backing the CLI's `-t`/`--tree` and `-s`/`--symtabs`
//! flags (§6 "CLI").
//!
//! The teacher's own `debug.rs` is a `SerializeWithDatabase` adapter for
//! feeding its salsa-tracked `asm::Program<'db>` into `insta`'s JSON
//! snapshots via a `mcc-macros` derive we don't depend on; nothing here
//! is tracked the same way (§4.5's `generate` operates on plain borrowed
//! `Table`/`FunctionCollection`), so this module instead prints the two
//! structures the spec's debug flags actually ask for.

use std::fmt::Write;

use tpc_syntax::Node;

use crate::symtab::{FunctionCollection, Table};

/// An indented, one-node-per-line dump of a parsed tree.
pub fn print_tree(root: &Node) -> String {
    let mut out = String::new();
    write_node(&mut out, root, 0);
    out
}

fn write_node(out: &mut String, node: &Node, depth: usize) {
    let indent = "  ".repeat(depth);
    let text = node.text();
    if text.is_empty() {
        let _ = writeln!(out, "{indent}{}", node.label);
    } else {
        let _ = writeln!(out, "{indent}{} {text:?}", node.label);
    }
    for child in &node.children {
        write_node(out, child, depth + 1);
    }
}

/// A flat listing of the globals table and every function's signature,
/// parameters and locals.
pub fn print_symtabs(globals: &Table, collection: &FunctionCollection) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "globals ({} bytes):", globals.total_bytes());
    for entry in globals.entries() {
        let _ = writeln!(
            out,
            "  {}: {} @ {} (size {}){}",
            entry.name,
            entry.ty,
            entry.address,
            entry.size,
            if entry.is_used() { "" } else { " [unused]" }
        );
    }

    for fun in collection.iter() {
        if fun.is_builtin() {
            continue;
        }
        let _ = writeln!(out, "fn {}() -> {}", fun.name, fun.r_type);
        for entry in fun.parameters.entries() {
            let _ = writeln!(
                out,
                "  param {}: {} @ {}{}",
                entry.name,
                entry.ty,
                entry.address,
                if entry.is_used() { "" } else { " [unused]" }
            );
        }
        for entry in fun.locals.entries() {
            let _ = writeln!(
                out,
                "  local {}: {} @ {}{}",
                entry.name,
                entry.ty,
                entry.address,
                if entry.is_used() { "" } else { " [unused]" }
            );
        }
    }

    out
}
