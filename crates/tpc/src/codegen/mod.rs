//! The stack-discipline NASM generator (§4.5 "Code generator").
//!
//! One recursive walk over the type-decorated AST per function. Every
//! sub-expression leaves exactly one 8-byte value on the hardware stack;
//! every statement is stack-neutral (§4.5 "Value discipline") — the IR
//! needs no register-allocation fix-up pass the way the teacher's
//! pseudo-register lowering does, because a stack slot is never used
//! directly as an instruction operand the way a pseudo-register is; it is
//! always reached through an explicit `push`/`pop`.
//!
//! Symbol-table and semantic-checker output (`Table`/`FunctionCollection`)
//! is built and mutated outside salsa (§5 "mutation is restricted to the
//! pass that owns the current lifetime"), so code generation here is a
//! plain function over borrowed data rather than a memoized query; the
//! pipeline still gates it on the accumulated diagnostics' fatal state
//! (`tpc_driver::callbacks`), just not through salsa's own dependency graph.
//!
//! One naming departure from §4.5's prose: the spec's addressing walkthrough
//! reuses `rcx` both as the array-index scratch and as the base register it
//! loads `globals` into, which would clobber an in-flight index. We instead
//! always accumulate an element's effective address in `rax` and convert the
//! index to a byte offset in `r10`, so the two never collide.

pub mod asm;

use std::cell::Cell;

use tpc_syntax::{Node, NodeLabel, Type};

use crate::symtab::{Entry, Function, FunctionCollection, Table};
use crate::Text;

use asm::{Condition, Instruction, Operand, Register};

/// Generate NASM IR for a whole program (`check`-ed and found non-fatal by
/// the caller).
pub fn generate(root: &Node, globals: &Table, collection: &FunctionCollection) -> asm::Program {
    let gen = CodeGen {
        globals,
        collection,
        labels: Cell::new(0),
    };

    let mut builtins_used = asm::BuiltinUsage::default();
    for fun in collection.iter() {
        if fun.is_builtin() && fun.is_used() {
            match fun.name.as_str() {
                "getint" => builtins_used.getint = true,
                "putint" => builtins_used.putint = true,
                "getchar" => builtins_used.getchar = true,
                "putchar" => builtins_used.putchar = true,
                _ => {}
            }
        }
    }

    let foncts = &root.children[1];
    let mut functions = Vec::new();
    for decl_fonct in &foncts.children {
        let header = &decl_fonct.children[0];
        let name = header.children[1].text();
        let Some(fun) = collection.find(name) else {
            continue;
        };
        functions.push(gen.generate_function(decl_fonct, fun));
    }

    asm::Program {
        globals_bytes: globals.total_bytes(),
        builtins_used,
        functions,
    }
}

/// Where an entry lives, as far as address computation is concerned.
enum Scope {
    /// One of the first [`crate::symtab::N_REG_PARAM`] parameters: address
    /// is subtracted from `rbp` directly (§4.5 "Parameter 0..5").
    ParamLow,
    /// A 7th-or-later parameter: address is added to `rbp` (§4.5
    /// "Parameter 6+").
    ParamHigh,
    /// A local: address is `parameters.offset + entry.address`, subtracted
    /// from `rbp` (§4.5 "Local (under sixth-parameter frame)").
    Local,
    /// A global: address is `entry.address` from the `globals` label.
    Global,
}

struct CodeGen<'a> {
    globals: &'a Table,
    collection: &'a FunctionCollection,
    labels: Cell<u32>,
}

impl<'a> CodeGen<'a> {
    fn label(&self, tag: &str) -> Text {
        let n = self.labels.get();
        self.labels.set(n + 1);
        format!(".L{tag}{n}").into()
    }

    fn resolve(&self, fun: &'a Function, name: &str) -> (Scope, &'a Entry) {
        if let Some(index) = fun
            .parameters
            .entries()
            .iter()
            .position(|e| e.name.as_str() == name)
        {
            let entry = &fun.parameters.entries()[index];
            let scope = if index < crate::symtab::N_REG_PARAM {
                Scope::ParamLow
            } else {
                Scope::ParamHigh
            };
            return (scope, entry);
        }
        if let Some(entry) = fun.locals.find(name) {
            return (Scope::Local, entry);
        }
        // The semantic checker already rejected any program where this name
        // resolves to neither a parameter, a local nor a global (§4.4
        // "Name resolution").
        (
            Scope::Global,
            self.globals
                .find(name)
                .expect("semantic checker verified this identifier resolves"),
        )
    }

    /// The operand holding a scalar entry's value directly — or, for a
    /// parameter array, the slot holding the pointer the caller passed.
    fn slot_operand(&self, fun: &'a Function, scope: &Scope, entry: &Entry) -> Operand {
        match scope {
            Scope::ParamLow => Operand::mem(Register::Rbp, -entry.address),
            Scope::ParamHigh => Operand::mem(Register::Rbp, entry.address),
            Scope::Local => Operand::mem(Register::Rbp, -(fun.parameters.offset() + entry.address)),
            Scope::Global => Operand::mem(Register::Rax, entry.address),
        }
    }

    /// Load `entry`'s base address into `rax`: the address of element 0 for
    /// a local/global array, or the pointer value stored in a parameter
    /// array's own slot.
    fn load_base_address(&self, fun: &'a Function, scope: &Scope, entry: &Entry, out: &mut Vec<Instruction>) {
        match scope {
            Scope::ParamLow | Scope::ParamHigh => out.push(Instruction::Mov {
                dst: Operand::reg(Register::Rax),
                src: self.slot_operand(fun, scope, entry),
            }),
            Scope::Local => out.push(Instruction::Lea {
                dst: Register::Rax,
                base: Register::Rbp,
                disp: -(fun.parameters.offset() + entry.address),
            }),
            Scope::Global => {
                out.push(Instruction::LeaLabel {
                    dst: Register::Rax,
                    label: "globals".into(),
                });
                out.push(Instruction::Add {
                    dst: Register::Rax,
                    src: Operand::Imm(entry.address),
                });
            }
        }
    }

    /// Push the value (or, for a bare array reference, the address) an
    /// `Ident` use node stands for — `check_entry_use`'s codegen
    /// counterpart.
    fn gen_ident_value(&self, node: &Node, fun: &'a Function, out: &mut Vec<Instruction>) {
        let (scope, entry) = self.resolve(fun, node.text());
        match node.children.first() {
            None => {
                if entry.is_array() {
                    self.load_base_address(fun, &scope, entry, out);
                    out.push(Instruction::Push(Operand::reg(Register::Rax)));
                } else {
                    out.push(Instruction::Push(self.slot_operand(fun, &scope, entry)));
                }
            }
            Some(index_node)
                if !matches!(index_node.label, NodeLabel::NoParametres | NodeLabel::ListExp) =>
            {
                self.gen_expr(index_node, fun, out);
                out.push(Instruction::Pop(Register::R10));
                out.push(Instruction::IMul {
                    dst: Register::R10,
                    src: Operand::Imm(8),
                });
                self.load_base_address(fun, &scope, entry, out);
                out.push(Instruction::Add {
                    dst: Register::Rax,
                    src: Operand::reg(Register::R10),
                });
                out.push(Instruction::Push(Operand::mem(Register::Rax, 0)));
            }
            Some(_) => self.gen_call(node, fun, entry.name.as_str(), out),
        }
    }

    /// Push `entry[index]`'s address in `rax`, consuming the index
    /// expression already evaluated by the caller's recursive descent; used
    /// by assignment to an indexed target.
    fn gen_index_address(&self, node: &Node, fun: &'a Function, out: &mut Vec<Instruction>) {
        let (scope, entry) = self.resolve(fun, node.text());
        let index_node = &node.children[0];
        self.gen_expr(index_node, fun, out);
        out.push(Instruction::Pop(Register::R10));
        out.push(Instruction::IMul {
            dst: Register::R10,
            src: Operand::Imm(8),
        });
        self.load_base_address(fun, &scope, entry, out);
        out.push(Instruction::Add {
            dst: Register::Rax,
            src: Operand::reg(Register::R10),
        });
    }

    fn gen_call(&self, node: &Node, fun: &'a Function, name: &str, out: &mut Vec<Instruction>) {
        let callee = self
            .collection
            .find(name)
            .expect("semantic checker verified this call resolves");
        let args: &[Node] = match node.children.first().map(|c| &c.label) {
            Some(NodeLabel::ListExp) => &node.children[0].children,
            _ => &[],
        };

        // §4.5 "Evaluate the actuals right-to-left on the stack first".
        for arg in args.iter().rev() {
            self.gen_expr(arg, fun, out);
        }
        // Then pop left-to-right into the first six argument registers;
        // stack-passed actuals (positions 6+) stay where they are.
        let reg_args = args.len().min(crate::symtab::N_REG_PARAM);
        for i in 0..reg_args {
            out.push(Instruction::Pop(Register::ARGS[i]));
        }
        out.push(Instruction::Call(name.into()));
        if args.len() > crate::symtab::N_REG_PARAM {
            let extra = (args.len() - crate::symtab::N_REG_PARAM) as i64;
            out.push(Instruction::Add {
                dst: Register::Rsp,
                src: Operand::Imm(8 * extra),
            });
        }
        if callee.r_type != Type::VOID {
            out.push(Instruction::Push(Operand::reg(Register::Rax)));
        }
    }

    /// Generate one expression node, leaving its value on the stack (§4.5
    /// "Value discipline").
    fn gen_expr(&self, node: &Node, fun: &'a Function, out: &mut Vec<Instruction>) {
        match node.label {
            NodeLabel::Num => {
                let n = node.payload.as_num().unwrap_or(0);
                out.push(Instruction::Push(Operand::Imm(n)));
            }
            NodeLabel::Character => {
                let code = char_code(node.text());
                out.push(Instruction::Push(Operand::Imm(code as i64)));
            }
            NodeLabel::Ident => self.gen_ident_value(node, fun, out),
            NodeLabel::Negation => {
                self.gen_expr(&node.children[0], fun, out);
                out.push(Instruction::Pop(Register::Rax));
                let zero = self.label("not_zero");
                let done = self.label("not_done");
                out.push(Instruction::JmpIfZero(Register::Rax, zero.clone()));
                out.push(Instruction::Push(Operand::Imm(0)));
                out.push(Instruction::Jmp(done.clone()));
                out.push(Instruction::Label(zero));
                out.push(Instruction::Push(Operand::Imm(1)));
                out.push(Instruction::Label(done));
            }
            NodeLabel::AddSub if node.children.len() == 1 => {
                self.gen_expr(&node.children[0], fun, out);
                out.push(Instruction::Pop(Register::Rax));
                if node.text() == "-" {
                    out.push(Instruction::Neg(Register::Rax));
                }
                out.push(Instruction::Push(Operand::reg(Register::Rax)));
            }
            NodeLabel::AddSub | NodeLabel::DivStar => self.gen_arithmetic(node, fun, out),
            NodeLabel::Eq | NodeLabel::Order => self.gen_comparison(node, fun, out),
            NodeLabel::And => self.gen_short_circuit(node, fun, out, true),
            NodeLabel::Or => self.gen_short_circuit(node, fun, out, false),
            _ => {}
        }
    }

    fn gen_arithmetic(&self, node: &Node, fun: &'a Function, out: &mut Vec<Instruction>) {
        self.gen_expr(&node.children[0], fun, out);
        self.gen_expr(&node.children[1], fun, out);
        out.push(Instruction::Pop(Register::Rcx));
        out.push(Instruction::Pop(Register::Rax));
        match node.text() {
            "+" => out.push(Instruction::Add {
                dst: Register::Rax,
                src: Operand::reg(Register::Rcx),
            }),
            "-" => out.push(Instruction::Sub {
                dst: Register::Rax,
                src: Operand::reg(Register::Rcx),
            }),
            "*" => out.push(Instruction::IMul {
                dst: Register::Rax,
                src: Operand::reg(Register::Rcx),
            }),
            "/" => {
                out.push(Instruction::Cqo);
                out.push(Instruction::IDiv(Register::Rcx));
            }
            "%" => {
                out.push(Instruction::Cqo);
                out.push(Instruction::IDiv(Register::Rcx));
                out.push(Instruction::Mov {
                    dst: Operand::reg(Register::Rax),
                    src: Operand::reg(Register::Rdx),
                });
            }
            _ => {}
        }
        out.push(Instruction::Push(Operand::reg(Register::Rax)));
    }

    fn gen_comparison(&self, node: &Node, fun: &'a Function, out: &mut Vec<Instruction>) {
        self.gen_expr(&node.children[0], fun, out);
        self.gen_expr(&node.children[1], fun, out);
        out.push(Instruction::Pop(Register::Rcx));
        out.push(Instruction::Pop(Register::Rax));
        out.push(Instruction::Cmp(Register::Rax, Register::Rcx));
        let cond = match node.text() {
            "==" => Condition::Eq,
            "!=" => Condition::NotEq,
            "<" => Condition::Lt,
            "<=" => Condition::Le,
            ">" => Condition::Gt,
            ">=" => Condition::Ge,
            _ => Condition::Eq,
        };
        let truthy = self.label("cmp_true");
        let done = self.label("cmp_done");
        out.push(Instruction::JmpIf(cond, truthy.clone()));
        out.push(Instruction::Push(Operand::Imm(0)));
        out.push(Instruction::Jmp(done.clone()));
        out.push(Instruction::Label(truthy));
        out.push(Instruction::Push(Operand::Imm(1)));
        out.push(Instruction::Label(done));
    }

    /// `&&`/`||` (§4.5 "Short-circuit boolean"). `is_and` selects which
    /// value short-circuits: `&&` short-circuits on a false left operand,
    /// `||` on a true one.
    ///
    /// `&&` only ever needs one extra landing label: both the
    /// short-circuited path and the "rhs was false" path agree the result
    /// is 0. `||`'s two non-true-rhs paths disagree (short-circuited lhs
    /// means 1, a false rhs means 0), so each gets its own label and push
    /// rather than sharing one with a single fixed constant.
    fn gen_short_circuit(&self, node: &Node, fun: &'a Function, out: &mut Vec<Instruction>, is_and: bool) {
        self.gen_expr(&node.children[0], fun, out);
        out.push(Instruction::Pop(Register::Rax));
        let eval_rhs = self.label(if is_and { "and_eval_rhs" } else { "or_eval_rhs" });
        let done = self.label(if is_and { "and_done" } else { "or_done" });

        if is_and {
            let lhs_false = self.label("and_false");
            out.push(Instruction::JmpIfZero(Register::Rax, lhs_false.clone()));
            out.push(Instruction::Label(eval_rhs));
            self.gen_expr(&node.children[1], fun, out);
            out.push(Instruction::Pop(Register::Rax));
            out.push(Instruction::JmpIfZero(Register::Rax, lhs_false.clone()));
            out.push(Instruction::Push(Operand::Imm(1)));
            out.push(Instruction::Jmp(done.clone()));
            out.push(Instruction::Label(lhs_false));
            out.push(Instruction::Push(Operand::Imm(0)));
        } else {
            let lhs_true = self.label("or_true");
            let rhs_false = self.label("or_false");
            out.push(Instruction::JmpIfZero(Register::Rax, eval_rhs.clone()));
            out.push(Instruction::Jmp(lhs_true.clone()));
            out.push(Instruction::Label(eval_rhs));
            self.gen_expr(&node.children[1], fun, out);
            out.push(Instruction::Pop(Register::Rax));
            out.push(Instruction::JmpIfZero(Register::Rax, rhs_false.clone()));
            out.push(Instruction::Push(Operand::Imm(1)));
            out.push(Instruction::Jmp(done.clone()));
            out.push(Instruction::Label(rhs_false));
            out.push(Instruction::Push(Operand::Imm(0)));
            out.push(Instruction::Jmp(done.clone()));
            out.push(Instruction::Label(lhs_true));
            out.push(Instruction::Push(Operand::Imm(1)));
        }
        out.push(Instruction::Label(done));
    }

    fn gen_condition(&self, cond: &Node, fun: &'a Function, out: &mut Vec<Instruction>, if_false: &Text) {
        self.gen_expr(cond, fun, out);
        out.push(Instruction::Pop(Register::Rax));
        out.push(Instruction::JmpIfZero(Register::Rax, if_false.clone()));
    }

    fn gen_assignation(&self, node: &Node, fun: &'a Function, out: &mut Vec<Instruction>) {
        let lhs = &node.children[0];
        let rhs = &node.children[1];
        if lhs.children.first().is_some() {
            self.gen_index_address(lhs, fun, out);
            out.push(Instruction::Push(Operand::reg(Register::Rax)));
            self.gen_expr(rhs, fun, out);
            out.push(Instruction::Pop(Register::Rcx));
            out.push(Instruction::Pop(Register::Rax));
            out.push(Instruction::Mov {
                dst: Operand::mem(Register::Rax, 0),
                src: Operand::reg(Register::Rcx),
            });
        } else {
            self.gen_expr(rhs, fun, out);
            out.push(Instruction::Pop(Register::Rcx));
            let (scope, entry) = self.resolve(fun, lhs.text());
            let dst = self.slot_operand(fun, &scope, entry);
            out.push(Instruction::Mov {
                dst,
                src: Operand::reg(Register::Rcx),
            });
        }
    }

    fn gen_stmt(&self, node: &Node, fun: &'a Function, out: &mut Vec<Instruction>, epilogue: &Text) {
        match node.label {
            NodeLabel::Assignation => self.gen_assignation(node, fun, out),
            NodeLabel::Ident => {
                // A bare call used as a statement; discard the pushed
                // return value if the callee isn't void.
                self.gen_call(node, fun, node.text(), out);
                if let Some(callee) = self.collection.find(node.text()) {
                    if callee.r_type != Type::VOID {
                        out.push(Instruction::Pop(Register::Rax));
                    }
                }
            }
            NodeLabel::Return => {
                if let Some(value) = node.children.first() {
                    self.gen_expr(value, fun, out);
                    out.push(Instruction::Pop(Register::Rax));
                }
                out.push(Instruction::Jmp(epilogue.clone()));
            }
            NodeLabel::If => {
                let else_label = self.label("if_else");
                let end_label = self.label("if_end");
                self.gen_condition(&node.children[0], fun, out, &else_label);
                self.gen_body(&node.children[1], fun, out, epilogue);
                out.push(Instruction::Jmp(end_label.clone()));
                out.push(Instruction::Label(else_label));
                if let Some(else_node) = node.children.get(2) {
                    self.gen_body(&else_node.children[0], fun, out, epilogue);
                }
                out.push(Instruction::Label(end_label));
            }
            NodeLabel::While => {
                let head = self.label("while_head");
                let end = self.label("while_end");
                out.push(Instruction::Label(head.clone()));
                self.gen_condition(&node.children[0], fun, out, &end);
                self.gen_body(&node.children[1], fun, out, epilogue);
                out.push(Instruction::Jmp(head));
                out.push(Instruction::Label(end));
            }
            NodeLabel::EmptyInstr => {}
            _ => {}
        }
    }

    fn gen_body(&self, node: &Node, fun: &'a Function, out: &mut Vec<Instruction>, epilogue: &Text) {
        if node.label == NodeLabel::SuiteInstr {
            for stmt in &node.children {
                self.gen_stmt(stmt, fun, out, epilogue);
            }
        } else {
            self.gen_stmt(node, fun, out, epilogue);
        }
    }

    /// `init_function`'s codegen counterpart: prologue, body, epilogue
    /// (§4.5 "Function prologue").
    fn generate_function(&self, decl_fonct: &Node, fun: &'a Function) -> asm::Function {
        let name = fun.name.clone();
        let mut out = Vec::new();

        out.push(Instruction::Push(Operand::reg(Register::Rbp)));
        out.push(Instruction::Mov {
            dst: Operand::reg(Register::Rbp),
            src: Operand::reg(Register::Rsp),
        });
        let n_params = fun.parameters.entries().len();
        for i in 0..n_params.min(crate::symtab::N_REG_PARAM) {
            out.push(Instruction::Push(Operand::reg(Register::ARGS[i])));
        }
        if fun.locals.total_bytes() > 0 {
            out.push(Instruction::Sub {
                dst: Register::Rsp,
                src: Operand::Imm(fun.locals.total_bytes()),
            });
        }

        let epilogue = self.label(&format!("{}_epilogue", fun.name));
        let corps = &decl_fonct.children[1];
        let suite = &corps.children[1];
        for stmt in &suite.children {
            self.gen_stmt(stmt, fun, &mut out, &epilogue);
        }

        out.push(Instruction::Label(epilogue));
        out.push(Instruction::Mov {
            dst: Operand::reg(Register::Rsp),
            src: Operand::reg(Register::Rbp),
        });
        out.push(Instruction::Pop(Register::Rbp));
        out.push(Instruction::Ret);

        asm::Function::new(name, out)
    }
}

/// `'\n' '\t' '\r' '\'' '\0'` map to their numeric codes; any other
/// character literal is its own ASCII code (§4.5 "Character literals").
fn char_code(spelling: &str) -> u8 {
    let inner = spelling.trim_matches('\'');
    match inner {
        "\\n" => b'\n',
        "\\t" => b'\t',
        "\\r" => b'\r',
        "\\'" => b'\'',
        "\\0" => 0,
        _ => inner.as_bytes().first().copied().unwrap_or(0),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::symtab::SymtabBuilder;
    use crate::Database;

    fn compile_main(src: &str) -> asm::Function {
        let root = tpc_syntax::parse(src).expect("fixture parses");
        let db = Database::default();
        let builder = SymtabBuilder::new(&db);
        let (globals, collection) = builder.build(&root);
        assert!(!builder.is_fatal(), "fixture must not raise fatal diagnostics");

        let program = generate(&root, &globals, &collection);
        program
            .functions
            .into_iter()
            .find(|f| f.name.as_str() == "main")
            .expect("main must be generated")
    }

    /// A label emitted with tag `wanted` must be followed by pushing
    /// `expect_imm`, wherever it lands in the instruction stream.
    fn label_pushes(instructions: &[Instruction], wanted: &str, expect_imm: i64) -> bool {
        instructions.windows(2).any(|pair| match pair {
            [Instruction::Label(label), Instruction::Push(Operand::Imm(n))] => {
                label.contains(wanted) && *n == expect_imm
            }
            _ => false,
        })
    }

    #[test]
    fn unary_minus_emits_neg() {
        let main = compile_main("int main() { int x; x = 5; return -x; }");
        assert!(
            main.instructions.contains(&Instruction::Neg(Register::Rax)),
            "unary `-` must emit `neg rax`, got {:#?}",
            main.instructions
        );
    }

    #[test]
    fn or_is_false_when_both_operands_are_falsy() {
        // int a; a = 0; if (a || a) return 1; return 0;
        let main = compile_main(
            "int main() { int a; a = 0; if (a || a) return 1; return 0; }",
        );

        // The rhs-false path (both operands evaluated, both zero) must push
        // 0 at its own label, distinct from the lhs-short-circuit-true path,
        // which must push 1 at a different label. Before the fix both paths
        // shared one label that always pushed 1, so `0 || 0` could never
        // produce 0.
        assert!(
            label_pushes(&main.instructions, "or_false", 0),
            "expected an `or_false` label immediately followed by `push 0`, got {:#?}",
            main.instructions
        );
        assert!(
            label_pushes(&main.instructions, "or_true", 1),
            "expected an `or_true` label immediately followed by `push 1`, got {:#?}",
            main.instructions
        );
    }

    #[test]
    fn and_is_zero_when_either_operand_is_falsy() {
        // Both paths that land on `&&`'s shared false label legitimately
        // want 0, so one label suffices here (unlike `||`).
        let main = compile_main(
            "int main() { int a; a = 0; if (a && a) return 1; return 0; }",
        );
        assert!(
            label_pushes(&main.instructions, "and_false", 0),
            "expected an `and_false` label immediately followed by `push 0`, got {:#?}",
            main.instructions
        );
    }
}
