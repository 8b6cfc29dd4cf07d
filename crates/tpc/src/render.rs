//! Turn [`asm::Program`] into the literal NASM text (§6 "Output NASM
//! structure"), splicing in builtin routines ahead of `_start` the way
//! the teacher's `render.rs` renders its own `asm::Program` — adapted
//! from an AT&T/`target_lexicon`-aware renderer to a single fixed
//! target (Linux x86-64 NASM, Intel syntax), since this generator never
//! produces the pseudo-register/stack-slot operands the teacher's
//! `fix_up_instructions` pass exists to rewrite.

use std::fmt::{self, Write};

use crate::builtins;
use crate::codegen::asm::{self, Instruction, Operand, Register};

pub fn render_program(program: &asm::Program) -> Result<String, fmt::Error> {
    let mut output = String::new();
    let mut renderer = AssemblyRenderer::new(&mut output);
    renderer.program(program)?;
    Ok(output)
}

struct AssemblyRenderer<W> {
    writer: W,
}

impl<W: Write> AssemblyRenderer<W> {
    fn new(writer: W) -> Self {
        AssemblyRenderer { writer }
    }

    fn program(&mut self, program: &asm::Program) -> fmt::Result {
        writeln!(self.writer, "global _start")?;
        writeln!(self.writer, "section .bss")?;
        writeln!(self.writer, "    globals: resb {}", program.globals_bytes)?;
        writeln!(self.writer, "section .text")?;

        if program.builtins_used.any() {
            let spliced = builtins::splice(&program.builtins_used);
            writeln!(self.writer, "{spliced}")?;
        }

        writeln!(self.writer, "_start:")?;
        writeln!(self.writer, "    call    main")?;
        writeln!(self.writer, "    mov     rdi, rax")?;
        writeln!(self.writer, "    mov     rax, 60")?;
        writeln!(self.writer, "    syscall")?;
        writeln!(self.writer)?;

        for function in &program.functions {
            self.function(function)?;
            writeln!(self.writer)?;
        }

        Ok(())
    }

    fn function(&mut self, function: &asm::Function) -> fmt::Result {
        writeln!(self.writer, "global {}", function.name)?;
        writeln!(self.writer, "{}:", function.name)?;
        for instruction in &function.instructions {
            self.instruction(instruction)?;
        }
        Ok(())
    }

    fn instruction(&mut self, instruction: &Instruction) -> fmt::Result {
        match instruction {
            Instruction::Push(op) => self.op1("push", op),
            Instruction::Pop(r) => writeln!(self.writer, "    pop     {r}"),
            Instruction::Mov { dst, src } => self.op2("mov", dst, src),
            Instruction::Lea { dst, base, disp } => {
                writeln!(self.writer, "    lea     {dst}, [{}]", mem_text(*base, *disp))
            }
            Instruction::LeaLabel { dst, label } => {
                writeln!(self.writer, "    lea     {dst}, [{label}]")
            }
            Instruction::Add { dst, src } => self.op2("add", &Operand::reg(*dst), src),
            Instruction::Sub { dst, src } => self.op2("sub", &Operand::reg(*dst), src),
            Instruction::IMul { dst, src } => self.op2("imul", &Operand::reg(*dst), src),
            Instruction::Neg(r) => writeln!(self.writer, "    neg     {r}"),
            Instruction::Cqo => writeln!(self.writer, "    cqo"),
            Instruction::IDiv(r) => writeln!(self.writer, "    idiv    {r}"),
            Instruction::Cmp(a, b) => writeln!(self.writer, "    cmp     {a}, {b}"),
            Instruction::Jmp(label) => writeln!(self.writer, "    jmp     {label}"),
            Instruction::JmpIf(cond, label) => {
                writeln!(self.writer, "    {}     {label}", cond.jump_mnemonic())
            }
            Instruction::JmpIfZero(r, label) => {
                writeln!(self.writer, "    cmp     {r}, 0")?;
                writeln!(self.writer, "    je      {label}")
            }
            Instruction::Label(label) => writeln!(self.writer, "{label}:"),
            Instruction::Call(name) => writeln!(self.writer, "    call    {name}"),
            Instruction::Ret => writeln!(self.writer, "    ret"),
        }
    }

    fn op1(&mut self, mnemonic: &str, op: &Operand) -> fmt::Result {
        writeln!(self.writer, "    {mnemonic:<7} {}", operand_text(op))
    }

    fn op2(&mut self, mnemonic: &str, dst: &Operand, src: &Operand) -> fmt::Result {
        writeln!(
            self.writer,
            "    {mnemonic:<7} {}, {}",
            operand_text(dst),
            operand_text(src)
        )
    }
}

fn mem_text(base: Register, disp: i64) -> String {
    match disp.cmp(&0) {
        std::cmp::Ordering::Equal => format!("{base}"),
        std::cmp::Ordering::Greater => format!("{base} + {disp}"),
        std::cmp::Ordering::Less => format!("{base} - {}", -disp),
    }
}

fn operand_text(op: &Operand) -> String {
    match op {
        Operand::Reg(r) => format!("{r}"),
        Operand::Imm(n) => format!("{n}"),
        Operand::Mem(m) => format!("[{}]", mem_text(m.base, m.disp)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_the_minimal_skeleton() {
        let program = asm::Program {
            globals_bytes: 0,
            builtins_used: asm::BuiltinUsage::default(),
            functions: vec![asm::Function::new(
                "main".into(),
                vec![
                    Instruction::Push(Operand::reg(Register::Rbp)),
                    Instruction::Mov {
                        dst: Operand::reg(Register::Rbp),
                        src: Operand::reg(Register::Rsp),
                    },
                    Instruction::Push(Operand::Imm(0)),
                    Instruction::Pop(Register::Rax),
                    Instruction::Mov {
                        dst: Operand::reg(Register::Rsp),
                        src: Operand::reg(Register::Rbp),
                    },
                    Instruction::Pop(Register::Rbp),
                    Instruction::Ret,
                ],
            )],
        };

        let text = render_program(&program).unwrap();
        assert!(text.contains("global _start"));
        assert!(text.contains("_start:"));
        assert!(text.contains("call    main"));
        assert!(text.contains("global main"));
        assert!(!text.contains("getint"));
    }

    #[test]
    fn splices_builtins_used_by_the_program() {
        let program = asm::Program {
            globals_bytes: 8,
            builtins_used: asm::BuiltinUsage {
                getint: true,
                ..Default::default()
            },
            functions: vec![],
        };

        let text = render_program(&program).unwrap();
        assert!(text.contains("global getint"));
        assert!(!text.contains("global putint"));
    }
}
