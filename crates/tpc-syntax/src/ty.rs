//! The TPC type tag, represented as a bitset (§4.1 "Type algebra").
//!
//! A value lives in the domain `{none, int, char, void, array-of-int,
//! array-of-char, function}`. Representing it as a bitset lets "array" and
//! "int"/"char" compose, so callers can write `is_array(t) && is_int(t)`
//! without a combinatorial explosion of enum variants.

bitflags::bitflags! {
    /// Invariant: the scalar bits `INT`, `CHAR`, `VOID` are mutually
    /// exclusive; `ARRAY` may combine with `INT` or `CHAR` only.
    #[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Default)]
    pub struct Type: u16 {
        const INT = 1 << 0;
        const CHAR = 1 << 1;
        const VOID = 1 << 2;
        const ARRAY = 1 << 3;
        const FUNCTION = 1 << 4;
    }
}

impl std::fmt::Display for Type {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.contains(Type::ARRAY) {
            write!(f, "array of ")?;
        }
        if self.contains(Type::INT) {
            write!(f, "int")
        } else if self.contains(Type::CHAR) {
            write!(f, "char")
        } else if self.contains(Type::VOID) {
            write!(f, "void")
        } else if self.contains(Type::FUNCTION) {
            write!(f, "function")
        } else {
            write!(f, "none")
        }
    }
}
