//! Error codes used across the compiler.
//!
//! This file is meant to be kept in sync with `error-codes.yaml` by
//! `cargo xtask error-codes`, the same way `mcc`'s `codes.rs` is generated
//! from `mcc/error-codes.yaml`; it is checked in here by hand in its
//! generated shape.
#![allow(non_upper_case_globals)]
use codespan_reporting::diagnostic::Severity;

#[derive(Debug, Clone, PartialEq, Eq, Ord, PartialOrd, Hash)]
pub struct ErrorCode {
    pub segments: &'static [&'static str],
    pub severity: Severity,
    pub description: &'static str,
}

impl std::fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for (i, segment) in self.segments.iter().enumerate() {
            if i > 0 {
                write!(f, "::")?;
            }
            write!(f, "{segment}")?;
        }
        Ok(())
    }
}

/// All error codes.
pub const ALL: &[ErrorCode] = &[
    parse::unexpected_token,
    parse::no_main,
    symtab::already_declared,
    symtab::redefinition_of_builtin,
    symtab::incorrect_array_decl,
    symtab::undeclared_symbol,
    symtab::maybe_undeclared_function,
    symtab::unused_symbol,
    symtab::unused_symbol_in_function,
    semantic::no_main_function,
    semantic::main_must_return_int,
    semantic::main_must_take_no_parameters,
    semantic::undeclared_symbol,
    semantic::wrong_return_type,
    semantic::invalid_assignation,
    semantic::incorrect_array_access,
    semantic::invalid_operation,
    semantic::invalid_condition,
    semantic::incorrect_function_call,
    semantic::invalid_parameter_type,
    semantic::incorrect_symbol_use,
];

/// The error codes definition, as YAML.
pub const DEFINITION: &str = include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/error-codes.yaml"));

pub mod parse {
    use super::*;

    #[doc = "the parser encountered a token it did not expect"]
    pub const unexpected_token: ErrorCode = ErrorCode {
        segments: &["parse", "unexpected_token"],
        severity: Severity::Error,
        description: "the parser encountered a token it did not expect",
    };

    #[doc = "the program does not declare a function named `main`"]
    pub const no_main: ErrorCode = ErrorCode {
        segments: &["parse", "no_main"],
        severity: Severity::Error,
        description: "the program does not declare a function named `main`",
    };
}

pub mod symtab {
    use super::*;

    #[doc = "a symbol was declared twice in the same scope"]
    pub const already_declared: ErrorCode = ErrorCode {
        segments: &["symtab", "already_declared"],
        severity: Severity::Error,
        description: "a symbol was declared twice in the same scope",
    };

    #[doc = "a builtin function name was redeclared by the program"]
    pub const redefinition_of_builtin: ErrorCode = ErrorCode {
        segments: &["symtab", "redefinition_of_builtin"],
        severity: Severity::Error,
        description: "a builtin function name was redeclared by the program",
    };

    #[doc = "an array declarator has an invalid length"]
    pub const incorrect_array_decl: ErrorCode = ErrorCode {
        segments: &["symtab", "incorrect_array_decl"],
        severity: Severity::Error,
        description: "an array declarator has an invalid length",
    };

    #[doc = "an identifier was used without a prior declaration"]
    pub const undeclared_symbol: ErrorCode = ErrorCode {
        segments: &["symtab", "undeclared_symbol"],
        severity: Severity::Error,
        description: "an identifier was used without a prior declaration",
    };

    #[doc = "a name used in call position did not resolve to a known function, deferred to the semantic phase"]
    pub const maybe_undeclared_function: ErrorCode = ErrorCode {
        segments: &["symtab", "maybe_undeclared_function"],
        severity: Severity::Warning,
        description: "a name used in call position did not resolve to a known function, deferred to the semantic phase",
    };

    #[doc = "a declared global symbol is never read or called"]
    pub const unused_symbol: ErrorCode = ErrorCode {
        segments: &["symtab", "unused_symbol"],
        severity: Severity::Note,
        description: "a declared global symbol is never read or called",
    };

    #[doc = "a declared parameter or local is never read or called"]
    pub const unused_symbol_in_function: ErrorCode = ErrorCode {
        segments: &["symtab", "unused_symbol_in_function"],
        severity: Severity::Note,
        description: "a declared parameter or local is never read or called",
    };
}

pub mod semantic {
    use super::*;

    #[doc = "the program has no function named `main`"]
    pub const no_main_function: ErrorCode = ErrorCode {
        segments: &["semantic", "no_main_function"],
        severity: Severity::Error,
        description: "the program has no function named `main`",
    };

    #[doc = "`main` does not return `int`"]
    pub const main_must_return_int: ErrorCode = ErrorCode {
        segments: &["semantic", "main_must_return_int"],
        severity: Severity::Error,
        description: "`main` does not return `int`",
    };

    #[doc = "`main` declares one or more parameters"]
    pub const main_must_take_no_parameters: ErrorCode = ErrorCode {
        segments: &["semantic", "main_must_take_no_parameters"],
        severity: Severity::Error,
        description: "`main` declares one or more parameters",
    };

    #[doc = "an identifier used as a value does not resolve to a variable or a function"]
    pub const undeclared_symbol: ErrorCode = ErrorCode {
        segments: &["semantic", "undeclared_symbol"],
        severity: Severity::Error,
        description: "an identifier used as a value does not resolve to a variable or a function",
    };

    #[doc = "a `return`'s expression does not match the function's declared return type"]
    pub const wrong_return_type: ErrorCode = ErrorCode {
        segments: &["semantic", "wrong_return_type"],
        severity: Severity::Error,
        description: "a `return`'s expression does not match the function's declared return type",
    };

    #[doc = "an assignment's right-hand side does not match the left-hand side's type"]
    pub const invalid_assignation: ErrorCode = ErrorCode {
        segments: &["semantic", "invalid_assignation"],
        severity: Severity::Error,
        description: "an assignment's right-hand side does not match the left-hand side's type",
    };

    #[doc = "an array index expression is not of type `int` or `char`"]
    pub const incorrect_array_access: ErrorCode = ErrorCode {
        segments: &["semantic", "incorrect_array_access"],
        severity: Severity::Error,
        description: "an array index expression is not of type `int` or `char`",
    };

    #[doc = "an operator was applied to an operand that is not of type `int` or `char`"]
    pub const invalid_operation: ErrorCode = ErrorCode {
        segments: &["semantic", "invalid_operation"],
        severity: Severity::Error,
        description: "an operator was applied to an operand that is not of type `int` or `char`",
    };

    #[doc = "an `if`/`while` condition is not of type `int` or `char`"]
    pub const invalid_condition: ErrorCode = ErrorCode {
        segments: &["semantic", "invalid_condition"],
        severity: Severity::Error,
        description: "an `if`/`while` condition is not of type `int` or `char`",
    };

    #[doc = "a call's argument count does not match the called function's parameter count"]
    pub const incorrect_function_call: ErrorCode = ErrorCode {
        segments: &["semantic", "incorrect_function_call"],
        severity: Severity::Error,
        description: "a call's argument count does not match the called function's parameter count",
    };

    #[doc = "a call argument's type does not match the corresponding parameter's type"]
    pub const invalid_parameter_type: ErrorCode = ErrorCode {
        segments: &["semantic", "invalid_parameter_type"],
        severity: Severity::Error,
        description: "a call argument's type does not match the corresponding parameter's type",
    };

    #[doc = "an identifier was used inconsistently with its declared kind (variable, array or function)"]
    pub const incorrect_symbol_use: ErrorCode = ErrorCode {
        segments: &["semantic", "incorrect_symbol_use"],
        severity: Severity::Error,
        description: "an identifier was used inconsistently with its declared kind (variable, array or function)",
    };
}
