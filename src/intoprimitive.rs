use crate::Error;
use crate::ast::Expr;
use crate::environment::Environment;
use crate::evaluator::eval_nested;
use std::sync::Arc;

// Adapter layer that turns strongly-typed Rust functions into the erased
// `PrimitiveFn` stored in `Expr::Primitive`. Typed primitives are eager: the
// adapter evaluates every operand in the calling environment before converting.
// Raw primitives that need their operands unevaluated (`do`, `list`) implement
// `PrimitiveFn` directly.

/// Erased primitive signature.
///
/// Primitives receive the unevaluated operand expressions, the calling
/// environment, and the evaluation depth of the call.
pub type PrimitiveFn = dyn Fn(&[Expr], &mut Environment, usize) -> Result<Expr, Error> + Send + Sync;

/// Conversion from an evaluated operand into a typed parameter.
///
/// On mismatch the value is handed back so the adapter can name it in the
/// positional type error.
pub trait FromParam: Sized {
    fn from_arg(value: Expr) -> Result<Self, Expr>;
}

impl FromParam for Expr {
    fn from_arg(value: Expr) -> Result<Self, Expr> {
        Ok(value)
    }
}

impl FromParam for i64 {
    fn from_arg(value: Expr) -> Result<Self, Expr> {
        match value {
            Expr::Integer(n) => Ok(n),
            other => Err(other),
        }
    }
}

impl FromParam for bool {
    fn from_arg(value: Expr) -> Result<Self, Expr> {
        match value {
            Expr::Boolean(b) => Ok(b),
            other => Err(other),
        }
    }
}

impl FromParam for String {
    fn from_arg(value: Expr) -> Result<Self, Expr> {
        match value {
            Expr::Str(s) => Ok(s),
            other => Err(other),
        }
    }
}

/// Lists only; the elements are passed through untyped
impl FromParam for Vec<Expr> {
    fn from_arg(value: Expr) -> Result<Self, Expr> {
        match value {
            Expr::List(items) => Ok(items),
            other => Err(other),
        }
    }
}

/// Evaluate one operand and convert it, reporting failures against `name`
fn take_arg<A: FromParam>(
    name: &str,
    position: usize,
    operand: &Expr,
    env: &mut Environment,
    depth: usize,
) -> Result<A, Error> {
    let value = eval_nested(operand, env, depth)?;
    A::from_arg(value).map_err(|value| Error::wrong_type(name, position, &value))
}

fn arity_mismatch(name: &str, expected: usize, args: &[Expr]) -> Error {
    let mut call = vec![Expr::Symbol(name.to_owned())];
    call.extend_from_slice(args);
    Error::arity_error_with_expr(expected, args.len(), Expr::List(call).to_string())
}

/// Converts a strongly-typed Rust function into an eager [`PrimitiveFn`].
///
/// `Args` is the tuple of parameter types and `R` the success type of the
/// function's `Result`. Both are inferred when registering a named `fn`; give
/// them explicitly (turbofish) for closures.
pub trait IntoPrimitive<Args, R> {
    fn into_primitive(self, name: &str) -> Arc<PrimitiveFn>;
}

impl<F, R> IntoPrimitive<(), R> for F
where
    F: Fn() -> Result<R, Error> + Send + Sync + 'static,
    R: Into<Expr>,
{
    fn into_primitive(self, name: &str) -> Arc<PrimitiveFn> {
        let name = name.to_owned();
        Arc::new(move |args: &[Expr], _env: &mut Environment, _depth: usize| -> Result<Expr, Error> {
            if !args.is_empty() {
                return Err(arity_mismatch(&name, 0, args));
            }
            (self)().map(Into::into)
        })
    }
}

/// Implements `IntoPrimitive` for one fixed arity. Each parameter is listed as
/// `index => binding: Type` where `index` is the zero-based operand slot.
macro_rules! impl_into_primitive_for_arity {
    ($arity:expr, $( $idx:literal => $p:ident : $A:ident ),+ ) => {
        impl<F, R, $( $A ),+> IntoPrimitive<( $( $A, )+ ), R> for F
        where
            F: Fn( $( $A ),+ ) -> Result<R, Error> + Send + Sync + 'static,
            $( $A: FromParam, )+
            R: Into<Expr>,
        {
            fn into_primitive(self, name: &str) -> Arc<PrimitiveFn> {
                let name = name.to_owned();
                Arc::new(move |args: &[Expr], env: &mut Environment, depth: usize| -> Result<Expr, Error> {
                    if args.len() != $arity {
                        return Err(arity_mismatch(&name, $arity, args));
                    }
                    $(
                        let $p: $A = take_arg(&name, $idx + 1, &args[$idx], env, depth)?;
                    )+
                    (self)( $( $p ),+ ).map(Into::into)
                })
            }
        }
    };
}

impl_into_primitive_for_arity!(1, 0 => p0: A1);
impl_into_primitive_for_arity!(2, 0 => p0: A1, 1 => p1: A2);
impl_into_primitive_for_arity!(3, 0 => p0: A1, 1 => p1: A2, 2 => p2: A3);
