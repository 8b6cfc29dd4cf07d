//! The four runtime-support routines (§4.5 "Builtins inclusion"): raw
//! Linux-syscall NASM, spliced verbatim into the generated file's
//! `section .text` when the program actually calls them. No original
//! source exists to port these from; they are written fresh against the
//! interface the symbol table seeds for `getint`, `putint`, `getchar`
//! and `putchar`.

use crate::codegen::asm::BuiltinUsage;

const GETINT: &str = include_str!("builtins/getint.asm");
const PUTINT: &str = include_str!("builtins/putint.asm");
const GETCHAR: &str = include_str!("builtins/getchar.asm");
const PUTCHAR: &str = include_str!("builtins/putchar.asm");

/// The spliced source of every builtin the program actually calls, in a
/// fixed order, each separated by a blank line.
pub fn splice(used: &BuiltinUsage) -> String {
    let mut blocks = Vec::new();
    if used.getint {
        blocks.push(GETINT);
    }
    if used.putint {
        blocks.push(PUTINT);
    }
    if used.getchar {
        blocks.push(GETCHAR);
    }
    if used.putchar {
        blocks.push(PUTCHAR);
    }
    blocks.join("\n")
}
