//! Workspace maintenance tasks, run with `cargo xtask <task>`.

mod error_codes;

use std::{
    path::{Path, PathBuf},
    sync::LazyLock,
};

use clap::Parser;
use quote::ToTokens;

pub(crate) static ROOT_DIR: LazyLock<PathBuf> = LazyLock::new(|| {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .ancestors()
        .nth(2)
        .expect("xtask always lives two levels under the workspace root")
        .to_path_buf()
});

/// `cargo xtask error-codes [OUTPUT] [INPUT]` — the only task so far.
fn main() -> anyhow::Result<()> {
    error_codes::ErrorCodes::parse().run()
}

/// Write `contents` to `path` if it differs from what's already there,
/// failing loudly instead of silently rewriting files under CI so a
/// forgotten regeneration step shows up as a test failure rather than a
/// stale `codes.rs`.
pub(crate) fn ensure_file_contents(path: &Path, tokens: impl quote::ToTokens, file_stem: &str) {
    let file: syn::File = syn::parse2(tokens.into_token_stream())
        .unwrap_or_else(|e| panic!("generated {file_stem} tokens did not parse: {e}"));
    let formatted = prettyplease::unparse(&file);

    if let Ok(existing) = std::fs::read_to_string(path) {
        if existing == formatted {
            return;
        }
    }

    if std::env::var_os("CI").is_some() {
        panic!(
            "{} is out of date; run `cargo xtask error-codes` and commit the result",
            path.display()
        );
    }

    std::fs::write(path, formatted)
        .unwrap_or_else(|e| panic!("failed to write {}: {e}", path.display()));
}
