//! Registry of special forms and primitive procedures.
//!
//! Every builtin is described once by a [`BuiltinOp`]. Special forms control the
//! evaluation of their operands and are dispatched by the evaluator on the head
//! symbol. Primitives are installed into the global table by
//! [`crate::evaluator::create_global_env`] and are ordinary first-class values.
//!
//! A few primitives (`car`, `cdr`, `cons`, `null?`) are also *reserved*: the
//! evaluator dispatches them by name like special forms, so rebinding the symbol
//! does not change what `(car x)` means, while `car` as a value still refers to
//! the installed primitive.
//!
//! ## Strict Typing
//!
//! - Arithmetic and comparisons take exactly two integers, no coercion
//! - Arithmetic detects and reports overflow
//! - `cons` requires a list as its second argument
//! - `=` is structural equality and never fails on mismatched kinds
//!
//! ## Adding New Operations
//!
//! 1. Implement the function with typed parameters (see [`crate::intoprimitive`])
//!    or as a raw `PrimitiveFn` if it must see its operands unevaluated
//! 2. Add it to `BUILTIN_OPS` with its identifier and arity
//! 3. Add tests covering edge cases and error conditions

use crate::Error;
use crate::ast::{Expr, IntegerType};
use crate::environment::Environment;
use crate::evaluator::{
    Arity, eval_cond, eval_define, eval_if, eval_lambda, eval_nested, eval_quote, eval_sequence,
    eval_set,
};
use crate::intoprimitive::{IntoPrimitive, PrimitiveFn};
use std::collections::HashMap;
use std::sync::{Arc, LazyLock};

/// Signature shared by all special forms: unevaluated operands, the current
/// environment and the evaluation depth
pub type SpecialFormFn = fn(&[Expr], &mut Environment, usize) -> Result<Expr, Error>;

/// Implementation of a builtin
#[derive(Clone)]
pub enum OpKind {
    /// Native procedure, stored in the global table as `Expr::Primitive`
    Primitive(Arc<PrimitiveFn>),
    /// Syntax handled by the evaluator; never a first-class value
    SpecialForm(SpecialFormFn),
}

impl std::fmt::Debug for OpKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OpKind::Primitive(_) => write!(f, "Primitive(<fn>)"),
            OpKind::SpecialForm(_) => write!(f, "SpecialForm(<fn>)"),
        }
    }
}

/// Definition of a built-in operation
#[derive(Debug, Clone)]
pub struct BuiltinOp {
    /// The identifier this operation is bound to
    pub id: &'static str,
    pub op_kind: OpKind,
    /// Expected number of operands
    pub arity: Arity,
    /// Dispatched on the head symbol before variable lookup
    pub reserved: bool,
}

impl PartialEq for BuiltinOp {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl BuiltinOp {
    #[cfg_attr(not(test), expect(dead_code))]
    pub(crate) fn is_special_form(&self) -> bool {
        matches!(self.op_kind, OpKind::SpecialForm(_))
    }

    pub(crate) fn validate_arity(&self, arg_count: usize) -> Result<(), Error> {
        self.arity.validate(arg_count)
    }
}

//
// Builtin Function Implementations
//

macro_rules! checked_arithmetic {
    ($name:ident, $method:ident, $op_name:literal) => {
        fn $name(a: IntegerType, b: IntegerType) -> Result<IntegerType, Error> {
            a.$method(b)
                .ok_or_else(|| Error::EvalError(concat!("Integer overflow in ", $op_name).into()))
        }
    };
}

checked_arithmetic!(builtin_add, checked_add, "addition");
checked_arithmetic!(builtin_sub, checked_sub, "subtraction");
checked_arithmetic!(builtin_mul, checked_mul, "multiplication");

macro_rules! integer_comparison {
    ($name:ident, $op:tt) => {
        fn $name(a: IntegerType, b: IntegerType) -> Result<bool, Error> {
            Ok(a $op b)
        }
    };
}

integer_comparison!(builtin_gt, >);
integer_comparison!(builtin_lt, <);

/// Structural equality over any two values
fn builtin_equal(first: Expr, second: Expr) -> Result<bool, Error> {
    Ok(first == second)
}

fn builtin_car(value: Expr) -> Result<Expr, Error> {
    if let Expr::List(items) = &value
        && let Some(first) = items.first()
    {
        return Ok(first.clone());
    }
    Err(Error::wrong_type("car", 1, &value))
}

fn builtin_cdr(value: Expr) -> Result<Expr, Error> {
    if let Expr::List(items) = &value
        && let Some((_, rest)) = items.split_first()
    {
        return Ok(Expr::List(rest.to_vec()));
    }
    Err(Error::wrong_type("cdr", 1, &value))
}

// No dotted pairs: the tail must already be a list
fn builtin_cons(first: Expr, rest: Expr) -> Result<Expr, Error> {
    match rest {
        Expr::List(tail) => {
            let mut new_list = Vec::with_capacity(tail.len() + 1);
            new_list.push(first);
            new_list.extend(tail);
            Ok(Expr::List(new_list))
        }
        other => Err(Error::wrong_type("cons", 2, &other)),
    }
}

fn builtin_null(value: Expr) -> Result<bool, Error> {
    Ok(value.is_nil())
}

fn builtin_is_list(value: Expr) -> Result<bool, Error> {
    Ok(matches!(value, Expr::List(_)))
}

fn builtin_is_symbol(value: Expr) -> Result<bool, Error> {
    Ok(matches!(value, Expr::Symbol(_)))
}

fn builtin_not(b: bool) -> Result<bool, Error> {
    Ok(!b)
}

/// Variadic, so it evaluates its own operands
fn builtin_list(args: &[Expr], env: &mut Environment, depth: usize) -> Result<Expr, Error> {
    args.iter()
        .map(|arg| eval_nested(arg, env, depth))
        .collect::<Result<Vec<_>, _>>()
        .map(Expr::List)
}

/// Evaluate operands in order in the calling environment, returning the last
fn builtin_do(args: &[Expr], env: &mut Environment, depth: usize) -> Result<Expr, Error> {
    eval_sequence(args, env, depth)
}

/// Global registry of all built-in operations, built once on first use.
static BUILTIN_OPS: LazyLock<Vec<BuiltinOp>> = LazyLock::new(|| {
    fn typed<Args, R, F>(id: &str, f: F) -> OpKind
    where
        F: IntoPrimitive<Args, R>,
    {
        OpKind::Primitive(f.into_primitive(id))
    }

    fn raw(f: fn(&[Expr], &mut Environment, usize) -> Result<Expr, Error>) -> OpKind {
        OpKind::Primitive(Arc::new(f))
    }

    fn special_form(id: &'static str, form: SpecialFormFn, arity: Arity) -> BuiltinOp {
        BuiltinOp {
            id,
            op_kind: OpKind::SpecialForm(form),
            arity,
            reserved: true,
        }
    }

    vec![
        // Special forms
        special_form("quote", eval_quote, Arity::Exact(1)),
        special_form("if", eval_if, Arity::Exact(3)),
        special_form("cond", eval_cond, Arity::Any),
        special_form("define", eval_define, Arity::Exact(2)),
        special_form("set!", eval_set, Arity::Exact(2)),
        special_form("lambda", eval_lambda, Arity::Exact(2)),
        // Arithmetic operations
        BuiltinOp {
            id: "+",
            op_kind: typed::<(IntegerType, IntegerType), IntegerType, _>("+", builtin_add),
            arity: Arity::Exact(2),
            reserved: false,
        },
        BuiltinOp {
            id: "-",
            op_kind: typed::<(IntegerType, IntegerType), IntegerType, _>("-", builtin_sub),
            arity: Arity::Exact(2),
            reserved: false,
        },
        BuiltinOp {
            id: "*",
            op_kind: typed::<(IntegerType, IntegerType), IntegerType, _>("*", builtin_mul),
            arity: Arity::Exact(2),
            reserved: false,
        },
        // Comparison operations
        BuiltinOp {
            id: ">",
            op_kind: typed::<(IntegerType, IntegerType), bool, _>(">", builtin_gt),
            arity: Arity::Exact(2),
            reserved: false,
        },
        BuiltinOp {
            id: "<",
            op_kind: typed::<(IntegerType, IntegerType), bool, _>("<", builtin_lt),
            arity: Arity::Exact(2),
            reserved: false,
        },
        BuiltinOp {
            id: "=",
            op_kind: typed::<(Expr, Expr), bool, _>("=", builtin_equal),
            arity: Arity::Exact(2),
            reserved: false,
        },
        // List operations
        BuiltinOp {
            id: "car",
            op_kind: typed::<(Expr,), Expr, _>("car", builtin_car),
            arity: Arity::Exact(1),
            reserved: true,
        },
        BuiltinOp {
            id: "cdr",
            op_kind: typed::<(Expr,), Expr, _>("cdr", builtin_cdr),
            arity: Arity::Exact(1),
            reserved: true,
        },
        BuiltinOp {
            id: "cons",
            op_kind: typed::<(Expr, Expr), Expr, _>("cons", builtin_cons),
            arity: Arity::Exact(2),
            reserved: true,
        },
        BuiltinOp {
            id: "null?",
            op_kind: typed::<(Expr,), bool, _>("null?", builtin_null),
            arity: Arity::Exact(1),
            reserved: true,
        },
        BuiltinOp {
            id: "list",
            op_kind: raw(builtin_list),
            arity: Arity::Any,
            reserved: false,
        },
        // Predicates
        BuiltinOp {
            id: "list?",
            op_kind: typed::<(Expr,), bool, _>("list?", builtin_is_list),
            arity: Arity::Exact(1),
            reserved: false,
        },
        BuiltinOp {
            id: "symbol?",
            op_kind: typed::<(Expr,), bool, _>("symbol?", builtin_is_symbol),
            arity: Arity::Exact(1),
            reserved: false,
        },
        BuiltinOp {
            id: "not",
            op_kind: typed::<(bool,), bool, _>("not", builtin_not),
            arity: Arity::Exact(1),
            reserved: false,
        },
        // Sequencing
        BuiltinOp {
            id: "do",
            op_kind: raw(builtin_do),
            arity: Arity::Any,
            reserved: false,
        },
    ]
});

/// Operations dispatched by name, keyed by identifier
static SPECIAL_FORMS: LazyLock<HashMap<&'static str, &'static BuiltinOp>> = LazyLock::new(|| {
    let ops: &'static [BuiltinOp] = BUILTIN_OPS.as_slice();
    ops.iter().filter(|op| op.reserved).map(|op| (op.id, op)).collect()
});

pub(crate) fn get_builtin_ops() -> &'static [BuiltinOp] {
    BUILTIN_OPS.as_slice()
}

/// Find an operation the evaluator dispatches on the head symbol
pub(crate) fn find_special_form(id: &str) -> Option<&'static BuiltinOp> {
    SPECIAL_FORMS.get(id).copied()
}
