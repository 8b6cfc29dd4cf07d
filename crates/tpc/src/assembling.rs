//! Turning rendered NASM text into a runnable binary. Where the teacher
//! shells out to the system `cc` for a one-step assemble+link, this
//! generator's output has no libc dependency (every builtin is raw
//! syscalls, §4.5 "Builtins inclusion"), so the two steps are driven
//! directly: `nasm` to an ELF object, then `ld` to a static executable.

use std::{path::PathBuf, process::Command};

use crate::{cmd::CommandError, Db};

#[salsa::tracked]
pub fn assemble_and_link(_db: &dyn Db, assembly: PathBuf, dest: PathBuf) -> Result<(), CommandError> {
    let object = assembly.with_extension("o");

    let mut nasm = Command::new("nasm");
    nasm.arg("-f").arg("elf64").arg(&assembly).arg("-o").arg(&object);
    crate::cmd::run_cmd(&mut nasm)?;

    let mut ld = Command::new("ld");
    ld.arg(&object).arg("-o").arg(&dest);
    crate::cmd::run_cmd(&mut ld)?;

    Ok(())
}
