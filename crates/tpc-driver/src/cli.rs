use std::{ops::ControlFlow, path::PathBuf};

use clap::Parser;
use codespan_reporting::term::{self, termcolor::ColorChoice};
use tpc::{
    diagnostics::{Diagnostic, DiagnosticKind, Severity},
    Database, Files, SourceFile, Text,
};
use tracing_subscriber::{fmt::format::FmtSpan, EnvFilter};

use crate::{Callbacks, Config, Outcome};

const LOG_FILTERS: &[&str] = &["warn", "tpc=debug", "tpc_syntax=debug", "tpc_driver=debug"];

/// Exit code for a system/CLI-level failure (§7 "exit code semantics").
const EXIT_OTHER: i32 = 3;

/// A `main()` that parses the command line, sets up tracing, runs the
/// compiler and returns the process's exit code.
#[doc(hidden)]
pub fn main() -> i32 {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            let is_info = matches!(
                e.kind(),
                clap::error::ErrorKind::DisplayHelp
                    | clap::error::ErrorKind::DisplayVersion
                    | clap::error::ErrorKind::DisplayHelpOnMissingArgumentOrSubcommand
            );
            let _ = e.print();
            return if is_info { 0 } else { EXIT_OTHER };
        }
    };

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| LOG_FILTERS.join(",").parse().unwrap());

    tracing_subscriber::fmt()
        .compact()
        .with_env_filter(env_filter)
        .with_span_events(FmtSpan::CLOSE)
        .with_writer(std::io::stderr)
        .init();

    cli.run()
}

/// Compile a TPC source file to a native executable.
#[derive(Debug, clap::Parser)]
#[command(name = "tpc", about = "A compiler for the TPC language")]
struct Cli {
    /// After parsing, print the abstract syntax tree.
    #[clap(short = 't', long = "tree")]
    tree: bool,
    /// After building the symbol tables, print them.
    #[clap(short = 's', long = "symtabs")]
    symtabs: bool,
    /// The output file to write the compiled executable to.
    #[clap(short, long)]
    output: Option<PathBuf>,
    /// Source file to compile; reads stdin if omitted.
    input: Option<PathBuf>,
}

impl Cli {
    #[tracing::instrument(level = "info", skip_all)]
    fn run(self) -> i32 {
        let src = match &self.input {
            Some(path) => std::fs::read_to_string(path),
            None => std::io::read_to_string(std::io::stdin()),
        };
        let src = match src {
            Ok(src) => src,
            Err(e) => {
                tracing::error!("failed to read input: {e}");
                return EXIT_OTHER;
            }
        };

        let name = self
            .input
            .as_ref()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| "<stdin>".to_string());

        let db = Database::default();
        let source_file = SourceFile::new(&db, Text::from(name), Text::from(src));

        let mut files = Files::new();
        files.add(&db, source_file);

        if self.tree {
            println!("{}", tpc::debug_tree(&db, source_file));
        }
        if self.symtabs {
            println!("{}", tpc::debug_symtabs(&db, source_file));
        }

        let cfg = Config {
            db,
            input: source_file,
            output: self.output.clone(),
        };

        let mut cb = DefaultCallbacks::new(files);

        match crate::callbacks::run(&mut cb, cfg) {
            Outcome::Ok => 0,
            Outcome::Err(e) => {
                tracing::error!("{e}");
                EXIT_OTHER
            }
            Outcome::EarlyReturn(code) => code,
        }
    }
}

#[derive(Debug, Clone)]
struct DefaultCallbacks {
    files: Files,
}

impl DefaultCallbacks {
    fn new(files: Files) -> Self {
        DefaultCallbacks { files }
    }

    fn emit_diagnostics(&self, source_file: SourceFile, diags: &[&Diagnostic]) -> anyhow::Result<()> {
        let mut writer =
            codespan_reporting::term::termcolor::StandardStream::stderr(ColorChoice::Auto);
        let cfg = term::Config::default();

        for diag in diags {
            term::emit(&mut writer, &cfg, &self.files, &diag.to_codespan(source_file))?;
        }

        Ok(())
    }
}

impl Callbacks for DefaultCallbacks {
    type Output = i32;

    fn after_compile(
        &mut self,
        _db: &dyn tpc::Db,
        source_file: SourceFile,
        assembly: Option<String>,
        diags: Vec<&Diagnostic>,
    ) -> ControlFlow<Self::Output> {
        if let Err(e) = self.emit_diagnostics(source_file, &diags) {
            tracing::error!("{e}");
            return ControlFlow::Break(EXIT_OTHER);
        }

        let parse_failed = diags
            .iter()
            .any(|d| d.severity() == Severity::Error && matches!(d.0, DiagnosticKind::Parse(_)));
        if parse_failed {
            return ControlFlow::Break(1);
        }

        if assembly.is_none() {
            return ControlFlow::Break(2);
        }

        ControlFlow::Continue(())
    }

    fn after_link(&mut self, _db: &dyn tpc::Db, _binary: PathBuf) -> ControlFlow<Self::Output> {
        ControlFlow::Continue(())
    }
}
