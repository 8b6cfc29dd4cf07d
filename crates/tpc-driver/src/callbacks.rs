use std::{ops::ControlFlow, path::PathBuf};

use tpc::{diagnostics::Diagnostic, SourceFile};

#[derive(Debug, Clone)]
pub struct Config {
    pub db: tpc::Database,
    pub output: Option<PathBuf>,
    pub input: SourceFile,
}

#[derive(Debug)]
pub enum Outcome<Ret> {
    /// The compilation succeeded.
    Ok,
    /// The compilation failed.
    Err(anyhow::Error),
    /// The compilation returned early.
    EarlyReturn(Ret),
}

impl<Ret> Outcome<Ret> {
    pub fn to_result_with(
        self,
        f: impl FnOnce(Ret) -> Result<(), anyhow::Error>,
    ) -> Result<(), anyhow::Error> {
        match self {
            Self::Ok => Ok(()),
            Self::Err(e) => Err(e),
            Self::EarlyReturn(ret) => f(ret),
        }
    }

    pub fn to_result(self) -> Result<(), anyhow::Error> {
        self.to_result_with(|_| Err(anyhow::anyhow!("returned early")))
    }
}

impl<Ret> From<anyhow::Error> for Outcome<Ret> {
    fn from(err: anyhow::Error) -> Self {
        Self::Err(err)
    }
}

/// Run the compiler.
///
/// Where the teacher's pipeline has a tracked query per stage (parse,
/// lower, codegen, render) and so a callback per stage, ours collapses
/// symtab construction through rendering into the single tracked
/// [`tpc::compile`] (see that function's module docs for why), so there is
/// only one callback between parsing the arguments and handing the
/// finished assembly to the assembler.
#[tracing::instrument(level = "info", skip_all)]
pub fn run<C: Callbacks>(cb: &mut C, cfg: Config) -> Outcome<C::Output> {
    let Config { db, output, input } = cfg;

    let assembly = tpc::compile(&db, input);
    let diags: Vec<&Diagnostic> = tpc::compile::accumulated::<Diagnostic>(&db, input);

    if let ControlFlow::Break(ret) = cb.after_compile(&db, input, assembly.clone(), diags) {
        return Outcome::EarlyReturn(ret);
    }

    let Some(assembly) = assembly else {
        return Outcome::Err(anyhow::anyhow!("compilation failed"));
    };

    let temp = match tempfile::tempdir().map_err(|e| anyhow::anyhow!("failed to create temp dir: {e}")) {
        Ok(temp) => temp,
        Err(e) => return Outcome::Err(e),
    };
    let asm_path = temp.path().join("assembly.s");
    if let Err(e) = std::fs::write(&asm_path, &assembly) {
        return Outcome::Err(e.into());
    }

    let output_path =
        output.unwrap_or_else(|| PathBuf::from(input.path(&db).as_str()).with_extension(""));

    if let Err(e) = tpc::assemble_and_link(&db, asm_path, output_path.clone()) {
        return Outcome::Err(e.into());
    }

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let perms = std::fs::Permissions::from_mode(0o755);
        if let Err(e) = std::fs::set_permissions(&output_path, perms) {
            return Outcome::Err(e.into());
        }
    }

    if let ControlFlow::Break(ret) = cb.after_link(&db, output_path) {
        return Outcome::EarlyReturn(ret);
    }

    Outcome::Ok
}

/// Callbacks fired at the two observable points of a compilation.
///
/// Called in order: `after_compile`, then (if compilation produced
/// assembly) `after_link`. Returning `ControlFlow::Break` stops the run
/// early.
pub trait Callbacks {
    type Output;

    /// Called after the whole parse/symtab/semantic/codegen/render pass.
    /// `assembly` is `None` if any stage's fatal state (§7) stopped the
    /// pipeline short of rendering; `diags` is always whatever that pass
    /// accumulated.
    fn after_compile(
        &mut self,
        _db: &dyn tpc::Db,
        _source_file: SourceFile,
        _assembly: Option<String>,
        _diags: Vec<&Diagnostic>,
    ) -> ControlFlow<Self::Output> {
        ControlFlow::Continue(())
    }

    /// Called after assembling and linking succeeded.
    fn after_link(&mut self, _db: &dyn tpc::Db, _binary: PathBuf) -> ControlFlow<Self::Output> {
        ControlFlow::Continue(())
    }
}
