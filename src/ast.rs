//! This module defines the runtime value type [`Expr`], shared by code and data.
//! Integers, strings, symbols, booleans and lists come out of the parser; closures
//! and primitives only appear at run time. The empty list doubles as the canonical
//! "nothing" value, there is no separate nil variant.
//!
//! Printing (`Display`) is the inverse of parsing for the literal variants, and
//! equality (`PartialEq`) is structural over matching variants only: a value of one
//! kind never equals a value of another kind. Ergonomic helpers [`val`], [`sym`] and
//! [`nil`] build trees in tests.

use crate::environment::Environment;
use crate::intoprimitive::PrimitiveFn;
use std::sync::Arc;

/// Type alias for integer values in the interpreter
pub(crate) type IntegerType = i64;

/// Allowed non-alphanumeric characters in symbol names
pub(crate) const SYMBOL_SPECIAL_CHARS: &str = "+-*/=?<>!";

/// Check whether a character may appear in a symbol
pub(crate) fn is_symbol_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || SYMBOL_SPECIAL_CHARS.contains(c)
}

/// A user-defined procedure: parameters, body and the lexical environment
/// captured when the `lambda` was evaluated.
#[derive(Clone)]
pub struct Closure {
    pub env: Environment,
    pub params: Vec<String>,
    pub body: Box<Expr>,
}

/// Core value type of the interpreter
///
/// To build a tree, use the helper functions:
/// - `val(42)` for values, `sym("name")` for symbols, `nil()` for empty lists
/// - `val([1, 2, 3])` for homogeneous lists
/// - `val(vec![sym("op"), val(42)])` for mixed lists
#[derive(Clone)]
pub enum Expr {
    Integer(IntegerType),
    /// String literals
    Str(String),
    /// Identifiers, distinct from strings with the same text
    Symbol(String),
    Boolean(bool),
    /// Lists, both code and data. The empty list is the canonical empty value.
    List(Vec<Expr>),
    Closure(Closure),
    /// Native procedures. They receive their operands unevaluated together with the
    /// calling environment. Compared by id rather than by function pointer.
    Primitive {
        id: String,
        func: Arc<PrimitiveFn>,
    },
}

impl std::fmt::Debug for Expr {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Expr::Integer(n) => write!(f, "Integer({n})"),
            Expr::Str(s) => write!(f, "Str(\"{s}\")"),
            Expr::Symbol(s) => write!(f, "Symbol({s})"),
            Expr::Boolean(b) => write!(f, "Boolean({b})"),
            Expr::List(list) => {
                write!(f, "List(")?;
                for (i, v) in list.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{v:?}")?;
                }
                write!(f, ")")
            }
            Expr::Closure(closure) => {
                write!(
                    f,
                    "Closure(params={:?}, body={:?})",
                    closure.params, closure.body
                )
            }
            Expr::Primitive { id, .. } => write!(f, "Primitive({id})"),
        }
    }
}

impl From<&str> for Expr {
    fn from(s: &str) -> Self {
        Expr::Str(s.to_owned())
    }
}

impl From<String> for Expr {
    fn from(s: String) -> Self {
        Expr::Str(s)
    }
}

impl From<bool> for Expr {
    fn from(b: bool) -> Self {
        Expr::Boolean(b)
    }
}

macro_rules! impl_from_integer {
    ($int_type:ty) => {
        impl From<$int_type> for Expr {
            fn from(n: $int_type) -> Self {
                Expr::Integer(n as IntegerType)
            }
        }
    };
}

impl_from_integer!(i8);
impl_from_integer!(i16);
impl_from_integer!(i32);
impl_from_integer!(IntegerType);
impl_from_integer!(u8);
impl_from_integer!(u16);
impl_from_integer!(u32);

impl<T: Into<Expr>> From<Vec<T>> for Expr {
    fn from(v: Vec<T>) -> Self {
        Expr::List(v.into_iter().map(|x| x.into()).collect())
    }
}

impl<T: Into<Expr>, const N: usize> From<[T; N]> for Expr {
    fn from(arr: [T; N]) -> Self {
        Expr::List(arr.into_iter().map(|x| x.into()).collect())
    }
}

impl From<Closure> for Expr {
    fn from(closure: Closure) -> Self {
        Expr::Closure(closure)
    }
}

/// Helper function for creating symbols
#[cfg_attr(not(test), expect(dead_code))]
pub(crate) fn sym<S: AsRef<str>>(name: S) -> Expr {
    Expr::Symbol(name.as_ref().to_owned())
}

/// Helper function for creating values from Rust literals
#[cfg_attr(not(test), expect(dead_code))]
pub(crate) fn val<T: Into<Expr>>(value: T) -> Expr {
    value.into()
}

/// Helper function for creating the empty list
#[cfg_attr(not(test), expect(dead_code))]
pub(crate) fn nil() -> Expr {
    Expr::List(vec![])
}

impl std::fmt::Display for Expr {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Expr::Integer(n) => write!(f, "{n}"),
            // No escape sequences exist in the surface syntax, so strings print verbatim
            Expr::Str(s) => write!(f, "\"{s}\""),
            Expr::Symbol(s) => write!(f, "{s}"),
            Expr::Boolean(b) => write!(f, "{}", if *b { "#t" } else { "#f" }),
            Expr::List(elements) => {
                write!(f, "(")?;
                for (i, elem) in elements.iter().enumerate() {
                    if i > 0 {
                        write!(f, " ")?;
                    }
                    write!(f, "{elem}")?;
                }
                write!(f, ")")
            }
            Expr::Closure(_) => write!(f, "#<closure>"),
            Expr::Primitive { id, .. } => write!(f, "#<primitive:{id}>"),
        }
    }
}

impl Expr {
    /// Check if a value is the empty list
    pub fn is_nil(&self) -> bool {
        matches!(self, Expr::List(list) if list.is_empty())
    }
}

impl PartialEq for Expr {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Expr::Integer(a), Expr::Integer(b)) => a == b,
            (Expr::Str(a), Expr::Str(b)) => a == b,
            (Expr::Symbol(a), Expr::Symbol(b)) => a == b,
            (Expr::Boolean(a), Expr::Boolean(b)) => a == b,
            (Expr::List(a), Expr::List(b)) => a == b,
            (Expr::Primitive { id: id1, .. }, Expr::Primitive { id: id2, .. }) => id1 == id2,
            // Closures have identity, not structure
            (Expr::Closure(_), _) | (_, Expr::Closure(_)) => false,
            _ => false,
        }
    }
}
