//! Schemelet - a small lexically-scoped Scheme interpreter
//!
//! This crate parses textual S-expressions, evaluates them against a two-tier
//! environment (one shared global table plus copied per-call local frames), and
//! supports user-defined closures, a fixed table of special forms and a small
//! library of primitive procedures.
//!
//! ```scheme
//! (define fact (lambda (n) (if (= n 0) 1 (* n (fact (- n 1))))))
//! (fact 5)                 ; => 120
//! (car '(4 5 6))           ; => 4
//! (cond ((> 1 2) "no") (else "yes"))
//! ```
//!
//! ## Strict Typing
//!
//! - `if` and `cond` tests must be booleans (no truthiness)
//! - Arithmetic and comparisons take exactly two integers
//! - `cons` requires a list as its second argument (no dotted pairs)
//! - Closures are fixed-arity; applying with the wrong number of arguments is an error
//!
//! ## Lexical Scoping
//!
//! A closure captures a snapshot of the local frame it was created in. Calling it
//! extends that snapshot with the parameter bindings; the caller's local bindings are
//! never visible inside the body. `define` always writes the shared global table, so
//! top-level definitions (including recursive ones) are visible everywhere.
//!
//! ## Modules
//!
//! - `ast`: the `Expr` value model, printer and structural equality
//! - `parser`: S-expression parsing and the input completeness probe
//! - `environment`: global table and local frames
//! - `evaluator`: tree-walking evaluation and special forms
//! - `builtinops`: the special-form and primitive registry
//! - `intoprimitive`: adapters from typed Rust functions to primitives
//! - `interpreter`: top-level entry points returning printed results

use std::fmt;

/// Maximum parsing depth to prevent stack overflow from deeply nested input
pub const MAX_PARSE_DEPTH: usize = 128;

/// Maximum number of nested closure applications. There is no tail-call
/// elimination, so runaway recursion is reported as an error once it gets this deep.
pub const MAX_EVAL_DEPTH: usize = 10_000;

/// Categorizes the different kinds of parsing errors.
#[derive(Debug, PartialEq, Clone)]
pub enum ParseErrorKind {
    /// Invalid or unexpected syntax (bad tokens, malformed expressions)
    InvalidSyntax,
    /// Input ended before the expression was complete (EOF, unterminated string, unclosed parens)
    Incomplete,
    /// Expression nesting exceeded the maximum parse depth
    TooDeeplyNested,
    /// Extra input found after a complete, valid expression
    TrailingContent,
    /// Implementation-imposed limit exceeded (integer literal out of range)
    ImplementationLimit,
}

/// A structured error providing detailed information about a parsing failure.
#[derive(Debug, PartialEq, Clone)]
pub struct ParseError {
    pub kind: ParseErrorKind,
    pub message: String,
    /// Context snippet from the input showing where the error occurred (max 100 chars)
    pub context: Option<String>,
    /// The problematic token or character encountered, if identifiable
    pub found: Option<String>,
}

impl ParseError {
    pub fn new(
        kind: ParseErrorKind,
        message: impl Into<String>,
        context: Option<String>,
        found: Option<String>,
    ) -> Self {
        ParseError {
            kind,
            message: message.into(),
            context,
            found,
        }
    }

    pub fn from_message(kind: ParseErrorKind, message: impl Into<String>) -> Self {
        Self::new(kind, message, None, None)
    }

    /// Attach the text around byte `offset` of `input`: up to 20 characters before
    /// it followed by what comes after, at most 100 characters in all. `found` is
    /// the character at the offset, if any.
    pub fn with_context(
        kind: ParseErrorKind,
        message: impl Into<String>,
        input: &str,
        offset: usize,
    ) -> Self {
        let (Some(before), Some(after)) = (input.get(..offset), input.get(offset..)) else {
            return Self::from_message(kind, message);
        };
        let start = before
            .char_indices()
            .rev()
            .nth(CONTEXT_BEFORE - 1)
            .map_or(0, |(i, _)| i);
        let snippet: String = input[start..].chars().take(MAX_CONTEXT).collect();
        let found = after.chars().next().map(String::from);

        Self::new(kind, message, Some(snippet.replace('\n', "\\n")), found)
    }
}

/// Characters of context shown before an error position
const CONTEXT_BEFORE: usize = 20;
/// Total characters of context attached to a parse error
const MAX_CONTEXT: usize = 100;

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.message)?;
        if let Some(found) = &self.found {
            write!(f, "\nFound: {found}")?;
        }
        if let Some(context) = &self.context {
            write!(f, "\nContext: {context}")?;
        }
        Ok(())
    }
}

/// Error types for the interpreter
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum Error {
    #[error("ParseError: {0}")]
    ParseError(ParseError),
    #[error("Unbound variable: {0}")]
    UnboundVariable(String),
    #[error("Type error: {0}")]
    TypeMismatch(String),
    #[error("ArityError: {}", arity_message(.expected, .got, .expression))]
    ArityMismatch {
        expected: usize,
        got: usize,
        expression: Option<String>,
    },
    /// A lambda parameter list that is not a list of distinct symbols
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),
    #[error("The object {0} is not applicable.")]
    NotApplicable(String),
    #[error("No matching clause in cond")]
    NoMatchingClause,
    #[error("EvaluationError: {0}")]
    EvalError(String),
}

fn arity_message(expected: &usize, got: &usize, expression: &Option<String>) -> String {
    match expression {
        Some(expr) => format!("expression {expr}: expected {expected} arguments, got {got}"),
        None => format!("function expected {expected} arguments but got {got}"),
    }
}

impl Error {
    pub fn arity_error(expected: usize, got: usize) -> Self {
        Error::ArityMismatch {
            expected,
            got,
            expression: None,
        }
    }

    pub fn arity_error_with_expr(expected: usize, got: usize, expression: String) -> Self {
        Error::ArityMismatch {
            expected,
            got,
            expression: Some(expression),
        }
    }

    /// Operand type error naming the offending value, its 1-based position and the operation
    pub fn wrong_type(op: &str, position: usize, value: &ast::Expr) -> Self {
        Error::TypeMismatch(format!(
            "The object {value}, passed as the {} argument to {op}, is not the correct type.",
            ordinal(position)
        ))
    }
}

fn ordinal(position: usize) -> String {
    match position {
        1 => "first".to_owned(),
        2 => "second".to_owned(),
        3 => "third".to_owned(),
        4 => "fourth".to_owned(),
        5 => "fifth".to_owned(),
        n => format!("{n}th"),
    }
}

pub mod ast;
pub mod builtinops;
pub mod environment;
pub mod evaluator;
pub mod interpreter;
pub mod intoprimitive;
pub mod parser;

pub use interpreter::{
    diagnostic, eval_buffer, eval_buffer_with_config, eval_str, evaluate_buffer, evaluate_in,
    evaluate_in_global, with_global_environment,
};
