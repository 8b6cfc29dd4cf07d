//! TPC driver — command-line interface and orchestration
//!
//! This crate provides the command-line interface and orchestration for the
//! `tpc` compiler. It wires together the core pipeline from the `tpc`
//! crate, manages temporary files for the assembler, emits diagnostics
//! through `codespan-reporting`, and exposes a small callback API for
//! tooling and testing — the same shape as the teacher's `mcc-driver`,
//! collapsed to match `tpc`'s single tracked [`tpc::compile`] query instead
//! of a tracked query per stage.
//!
//! What this crate offers
//! ----------------------
//! - A `main()` entrypoint for the `tpc` binary: [`cli::main`]
//! - A pipeline runner with callbacks: [`run`] and the [`Callbacks`] trait
//! - A configuration object for compilation sessions: [`Config`]
//! - An outcome type capturing success, error, or early return: [`Outcome`]
//!
//! Running the pipeline with callbacks
//! ------------------------------------
//! ```rust
//! use tpc_driver::{Callbacks, Config, Outcome};
//! use tpc::SourceFile;
//!
//! struct Noop;
//! impl Callbacks for Noop {
//!     type Output = ();
//! }
//!
//! let db = tpc::Database::default();
//! let input = SourceFile::new(&db, "main.tpc".into(), "int main() { return 0; }".into());
//! let cfg = Config { db, output: None, input };
//! // let outcome = tpc_driver::run(&mut Noop, cfg);
//! // outcome.to_result()?;
//! ```
//!
//! CLI entrypoint
//! --------------
//! The binary uses [`cli::main`] to parse flags (`-t`/`--tree`,
//! `-s`/`--symtabs`, `-o`/`--output`), set up tracing, and delegate to
//! [`run`], mapping its outcome to the exit codes in §7 of the design
//! notes. See `crates/tpc-driver/src/cli.rs` for details.

mod callbacks;
mod cli;

pub use crate::callbacks::{run, Callbacks, Config, Outcome};

#[doc(hidden)]
pub use crate::cli::main;
