//! Symbol-table construction (§4.3 "Symbol-table builder").
//!
//! A single pre-order walk over the tree builds a `globals` table and a
//! `FunctionCollection`, the same two outputs `create_tables` builds in
//! `table.c`; insertion, sizing and parameter-addressing formulas below are
//! a direct port of `insert_entry`/`init_param_list`/`init_function`.
//!
//! One deliberate departure from `table.c`: `create_tables` returns on the
//! first declaration or function that fails to insert, abandoning the rest
//! of the program. We keep walking past a failing declaration or function
//! so that, like the semantic checker (§4.4 "the top-level function-body
//! walk continues to the next function so all diagnostics are collected"),
//! the symbol-table phase also reports as many problems as it can in one
//! pass; see `DESIGN.md`.

use std::cell::Cell;

use tpc_syntax::{Node, NodeLabel, Span, Type};

use crate::diagnostics::{Diagnostic, DiagnosticKind, Severity};
use crate::{Db, Text};

/// `CALL_OFFSET` from `table.c`: the stack-frame gap (saved `rbp` + return
/// address) a callee must skip to reach its 7th-and-later parameters.
pub const CALL_OFFSET: i64 = 16;
/// `N_REG_PARAM`: the first six parameters travel in registers in the
/// calling convention this compiler targets, and are pushed below `rbp` in
/// the callee's prologue; the 7th onward stay on the caller's stack.
pub const N_REG_PARAM: usize = 6;
/// Locals start at this offset so no local ever lives at `[rbp]` itself
/// (`table.c`'s `fun->locals.total_bytes = 8`).
const LOCALS_BASE_OFFSET: i64 = 8;

/// A row in a variable symbol table: a global, a local or a parameter.
#[derive(Debug, Clone)]
pub struct Entry {
    pub name: Text,
    pub ty: Type,
    pub size: i64,
    pub address: i64,
    pub decl_span: Span,
    used: Cell<bool>,
}

impl Entry {
    pub fn is_array(&self) -> bool {
        self.ty.contains(Type::ARRAY)
    }

    pub fn is_used(&self) -> bool {
        self.used.get()
    }

    pub fn mark_used(&self) {
        self.used.set(true);
    }
}

/// A symbol table: either the program's globals, or one function's
/// parameters or locals.
#[derive(Debug, Default)]
pub struct Table {
    entries: Vec<Entry>,
    total_bytes: i64,
    /// Bytes consumed by the first [`N_REG_PARAM`] parameters; meaningful
    /// only on a `parameters` table (§4.3 "accumulates `offset`... so that
    /// locals may be placed beneath them in the frame").
    offset: i64,
}

impl Table {
    fn with_locals_base() -> Self {
        Table {
            total_bytes: LOCALS_BASE_OFFSET,
            ..Default::default()
        }
    }

    pub fn entries(&self) -> &[Entry] {
        &self.entries
    }

    pub fn find(&self, name: &str) -> Option<&Entry> {
        self.entries.iter().find(|e| e.name.as_str() == name)
    }

    pub fn total_bytes(&self) -> i64 {
        self.total_bytes
    }

    pub fn offset(&self) -> i64 {
        self.offset
    }

    /// Insert a global or local variable. Address is the table's current
    /// `total_bytes`, which is then advanced by the entry's size
    /// (§4.3 "Entry insertion").
    fn insert_variable(
        &mut self,
        name: Text,
        ty: Type,
        size: i64,
        decl_span: Span,
    ) -> Result<(), u32> {
        if let Some(prev) = self.find(&name) {
            return Err(prev.decl_span.line);
        }
        let address = self.total_bytes;
        self.total_bytes += size;
        self.entries.push(Entry {
            name,
            ty,
            size,
            address,
            decl_span,
            used: Cell::new(false),
        });
        Ok(())
    }

    /// Insert a parameter, addressed per §4.3 "Parameter insertion
    /// (order-preserving, ABI-aware)".
    fn insert_parameter(
        &mut self,
        name: Text,
        ty: Type,
        size: i64,
        decl_span: Span,
    ) -> Result<(), u32> {
        if let Some(prev) = self.find(&name) {
            return Err(prev.decl_span.line);
        }
        let index = self.entries.len();
        let address = if index < N_REG_PARAM {
            let addr = self.total_bytes + size;
            self.offset += size;
            addr
        } else if index == N_REG_PARAM {
            CALL_OFFSET
        } else {
            let prev = &self.entries[index - 1];
            prev.address + prev.size
        };
        self.total_bytes += size;
        self.entries.push(Entry {
            name,
            ty,
            size,
            address,
            decl_span,
            used: Cell::new(false),
        });
        Ok(())
    }
}

/// A function's symbol-table entry: its signature plus its own parameter
/// and local tables.
#[derive(Debug)]
pub struct Function {
    pub name: Text,
    pub r_type: Type,
    /// `None` for the four builtins, which `table.c` marks with the
    /// synthetic `decl_line = decl_col = -1`.
    pub decl_span: Option<Span>,
    pub parameters: Table,
    pub locals: Table,
    used: Cell<bool>,
}

impl Function {
    pub fn is_builtin(&self) -> bool {
        self.decl_span.is_none()
    }

    pub fn is_used(&self) -> bool {
        self.used.get()
    }

    pub fn mark_used(&self) {
        self.used.set(true);
    }
}

#[derive(Debug, Default)]
pub struct FunctionCollection {
    functions: Vec<Function>,
}

impl FunctionCollection {
    pub fn find(&self, name: &str) -> Option<&Function> {
        self.functions.iter().find(|f| f.name.as_str() == name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Function> {
        self.functions.iter()
    }

    fn insert(&mut self, fun: Function) -> Result<(), u32> {
        if let Some(prev) = self.find(&fun.name) {
            return Err(prev.decl_span.map_or(0, |s| s.line));
        }
        self.functions.push(fun);
        Ok(())
    }
}

struct Builtin {
    name: &'static str,
    r_type: Type,
    param: Type,
}

/// `builtin_funcs` from `table.c`.
const BUILTINS: [Builtin; 4] = [
    Builtin {
        name: "getint",
        r_type: Type::INT,
        param: Type::VOID,
    },
    Builtin {
        name: "putint",
        r_type: Type::VOID,
        param: Type::INT,
    },
    Builtin {
        name: "getchar",
        r_type: Type::CHAR,
        param: Type::VOID,
    },
    Builtin {
        name: "putchar",
        r_type: Type::VOID,
        param: Type::CHAR,
    },
];

fn seed_builtins(collection: &mut FunctionCollection) {
    for b in &BUILTINS {
        let mut parameters = Table::default();
        if b.param != Type::VOID {
            parameters
                .insert_parameter(Text::from("arg"), b.param, 8, Span::synthetic())
                .expect("builtin parameter lists never collide");
        }
        let fun = Function {
            name: Text::from(b.name),
            r_type: b.r_type,
            decl_span: None,
            parameters,
            locals: Table::default(),
            used: Cell::new(false),
        };
        collection
            .insert(fun)
            .expect("builtin names are fixed and distinct");
    }
}

/// The scalar type named by a variable/parameter `Type` node's spelling
/// (`get_type` in `table.c`, used where the grammar only admits `int` or
/// `char`): `"int"` maps to `int`, anything else maps to `char`.
fn scalar_type_of(spelling: &str) -> Type {
    if spelling == "int" {
        Type::INT
    } else {
        Type::CHAR
    }
}

/// A function's return type (`assing_rtype` in `table.c`, which alone
/// among the type-spelling lookups admits `void`).
fn return_type_of(spelling: &str) -> Type {
    match spelling {
        "int" => Type::INT,
        "char" => Type::CHAR,
        _ => Type::VOID,
    }
}

/// The array length recorded on a declarator, if any: `Some(n)` for a sized
/// array (`name[n]`), `Some(-1)` for a parameter array with no size
/// (`name[]`), `None` for a scalar.
fn declarator_array_len(declarator: &Node) -> Option<i64> {
    declarator.children.first().and_then(|c| c.payload.as_num())
}

/// `compute_size` in `table.c`. A parameter array (`len == -1`) is passed
/// by address, so it occupies a single pointer-sized slot like a scalar;
/// a literal length of zero is rejected.
fn compute_size(array_len: Option<i64>) -> Option<i64> {
    match array_len {
        None | Some(-1) => Some(8),
        Some(0) => None,
        Some(n) => Some(8 * n),
    }
}

pub struct SymtabBuilder<'db> {
    db: &'db dyn Db,
    /// Set once any `Error`-severity diagnostic is pushed (§5 "After the
    /// symbol-table pass, if fatal, the pipeline short-circuits"); `build`
    /// itself has no success/failure return the way `Checker::check` does,
    /// so callers read this afterwards via [`SymtabBuilder::is_fatal`].
    fatal: Cell<bool>,
}

impl<'db> SymtabBuilder<'db> {
    pub fn new(db: &'db dyn Db) -> Self {
        SymtabBuilder {
            db,
            fatal: Cell::new(false),
        }
    }

    /// Whether any diagnostic pushed during `build` was `Error`-severity.
    pub fn is_fatal(&self) -> bool {
        self.fatal.get()
    }

    fn error(&self, kind: DiagnosticKind) {
        if kind.severity() == Severity::Error {
            self.fatal.set(true);
        }
        Diagnostic::push(kind, self.db);
    }

    /// Build an [`Entry`] for one declarator, reporting
    /// `incorrect_array_decl` and returning `None` if its size is invalid.
    fn build_entry(&self, base_ty: Type, declarator: &Node) -> Option<Entry> {
        let array_len = declarator_array_len(declarator);
        let size = match compute_size(array_len) {
            Some(size) => size,
            None => {
                self.error(DiagnosticKind::IncorrectArrayDecl {
                    symbol: declarator.text().into(),
                    span: declarator.span,
                });
                return None;
            }
        };
        let ty = if array_len.is_some() {
            base_ty | Type::ARRAY
        } else {
            base_ty
        };
        Some(Entry {
            name: declarator.text().into(),
            ty,
            size,
            address: -1,
            decl_span: declarator.span,
            used: Cell::new(false),
        })
    }

    /// `decl_vars`/`decl_var` in `table.c`: walk a `DeclVars` node's `Type`
    /// children and insert every declarator they carry.
    ///
    /// `parameters` is `Some` when we're declaring locals (so a local
    /// colliding with a parameter name is also rejected, per
    /// `table.c`'s `decl_var`); it is `None` for globals, where a
    /// collision is instead checked against the function collection
    /// (`redefinition_of_builtin_functions` when a builtin shares the name).
    fn declare_vars(
        &self,
        table: &mut Table,
        decl_vars: &Node,
        parameters: Option<&Table>,
        collection: Option<&FunctionCollection>,
    ) {
        for type_node in &decl_vars.children {
            let base_ty = scalar_type_of(type_node.text());
            for declarator in &type_node.children {
                let Some(entry) = self.build_entry(base_ty, declarator) else {
                    continue;
                };
                if let Some(params) = parameters {
                    if let Some(prev) = params.find(&entry.name) {
                        self.error(DiagnosticKind::AlreadyDeclared {
                            symbol: entry.name,
                            span: entry.decl_span,
                            prior_line: prev.decl_span.line,
                        });
                        continue;
                    }
                } else if let Some(collection) = collection {
                    if collection.find(&entry.name).is_some() {
                        self.error(DiagnosticKind::RedefinitionOfBuiltin {
                            symbol: entry.name,
                            span: entry.decl_span,
                        });
                        continue;
                    }
                }
                if let Err(prior_line) =
                    table.insert_variable(entry.name.clone(), entry.ty, entry.size, entry.decl_span)
                {
                    self.error(DiagnosticKind::AlreadyDeclared {
                        symbol: entry.name,
                        span: entry.decl_span,
                        prior_line,
                    });
                }
            }
        }
    }

    /// `init_param_list` in `table.c`.
    fn declare_parameters(&self, parameters: &mut Table, list: &Node) {
        for type_node in &list.children {
            let base_ty = scalar_type_of(type_node.text());
            let declarator = &type_node.children[0];
            let Some(entry) = self.build_entry(base_ty, declarator) else {
                continue;
            };
            if let Err(prior_line) =
                parameters.insert_parameter(entry.name.clone(), entry.ty, entry.size, entry.decl_span)
            {
                self.error(DiagnosticKind::AlreadyDeclared {
                    symbol: entry.name,
                    span: entry.decl_span,
                    prior_line,
                });
            }
        }
    }

    /// `init_function` in `table.c`: build one function's signature,
    /// parameter table, and an (empty) locals table ready to be filled in.
    fn build_function(&self, decl_fonct: &Node, globals: &Table) -> Function {
        let header = &decl_fonct.children[0];
        let r_type = return_type_of(header.children[0].text());
        let name: Text = header.children[1].text().into();
        let decl_span = header.children[1].span;

        if let Some(prev) = globals.find(&name) {
            self.error(DiagnosticKind::AlreadyDeclared {
                symbol: name.clone(),
                span: decl_span,
                prior_line: prev.decl_span.line,
            });
        }

        let mut parameters = Table::default();
        let params_node = &header.children[2];
        if params_node.label == NodeLabel::Parametres {
            self.declare_parameters(&mut parameters, &params_node.children[0]);
        }

        Function {
            name,
            r_type,
            decl_span: Some(decl_span),
            parameters,
            locals: Table::with_locals_base(),
            used: Cell::new(false),
        }
    }

    /// `check_used` in `table.c`: mark every `Ident` reachable from `node`
    /// as used on its owning entry or function, and flag references that
    /// resolve to neither.
    fn mark_uses(&self, node: &Node, fun: &Function, globals: &Table, collection: &FunctionCollection) {
        if node.label == NodeLabel::Ident {
            let in_call_position = matches!(
                node.children.first().map(|c| c.label),
                Some(NodeLabel::NoParametres) | Some(NodeLabel::ListExp)
            );
            if in_call_position {
                match collection.find(node.text()) {
                    Some(function) => {
                        if function.decl_span.map(|s| s.line) != Some(node.span.line) {
                            function.mark_used();
                        }
                    }
                    None => self.error(DiagnosticKind::UndeclaredSymbol {
                        symbol: node.text().into(),
                        span: node.span,
                        severity: Severity::Warning,
                    }),
                }
                return;
            }

            let entry = fun
                .parameters
                .find(node.text())
                .or_else(|| fun.locals.find(node.text()))
                .or_else(|| globals.find(node.text()));
            match entry {
                Some(entry) => {
                    if entry.decl_span.line != node.span.line {
                        entry.mark_used();
                    }
                }
                None => self.error(DiagnosticKind::UndeclaredSymbol {
                    symbol: node.text().into(),
                    span: node.span,
                    severity: Severity::Error,
                }),
            }
        }
        for child in &node.children {
            self.mark_uses(child, fun, globals, collection);
        }
    }

    /// `create_tables` in `table.c`: the top-level pre-order walk, with the
    /// one deliberate departure documented in the module doc above.
    pub fn build(&self, root: &Node) -> (Table, FunctionCollection) {
        let mut globals = Table::default();
        let mut collection = FunctionCollection::default();
        seed_builtins(&mut collection);

        let global_vars = &root.children[0];
        self.declare_vars(&mut globals, global_vars, None, Some(&collection));

        let foncts = &root.children[1];
        for decl_fonct in &foncts.children {
            let mut fun = self.build_function(decl_fonct, &globals);
            let corps = &decl_fonct.children[1];
            let local_vars = &corps.children[0];
            self.declare_vars(&mut fun.locals, local_vars, Some(&fun.parameters), None);

            let name = fun.name.clone();
            let span = fun.decl_span.expect("non-builtin functions always carry a span");
            if let Err(prior_line) = collection.insert(fun) {
                self.error(DiagnosticKind::AlreadyDeclared {
                    symbol: name,
                    span,
                    prior_line,
                });
            }
        }

        for decl_fonct in &foncts.children {
            let name = decl_fonct.children[0].children[1].text();
            if let Some(fun) = collection.find(name) {
                self.mark_uses(&decl_fonct.children[1], fun, &globals, &collection);
            }
        }

        (globals, collection)
    }
}

/// `search_unused_symbols`/`search_unused_symbol_table` in `semantic.c`:
/// emit a *note* for every entry/function still unused once the whole
/// program has been walked. Builtins are never reported (`table.c`'s
/// `print_collection` skips any function with `decl_line == -1`, the same
/// sentinel we use via `Function::is_builtin`).
pub fn report_unused(db: &dyn Db, globals: &Table, collection: &FunctionCollection) {
    for entry in globals.entries() {
        if !entry.is_used() {
            Diagnostic::push(
                DiagnosticKind::UnusedSymbol {
                    symbol: entry.name.clone(),
                    span: entry.decl_span,
                },
                db,
            );
        }
    }
    for fun in collection.iter() {
        if fun.is_builtin() {
            continue;
        }
        for entry in fun.parameters.entries().iter().chain(fun.locals.entries()) {
            if !entry.is_used() {
                Diagnostic::push(
                    DiagnosticKind::UnusedSymbolInFunction {
                        function: fun.name.clone(),
                        symbol: entry.name.clone(),
                        span: entry.decl_span,
                    },
                    db,
                );
            }
        }
    }
}
