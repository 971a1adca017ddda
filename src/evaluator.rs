use crate::ast::{Closure, Expr};
use crate::builtinops::{OpKind, find_special_form, get_builtin_ops};
use crate::environment::{Environment, Frame};
use crate::{Error, MAX_EVAL_DEPTH};
use log::{debug, trace};

/// Expected number of operands of a builtin
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Arity {
    Exact(usize),
    Any,
}

impl Arity {
    pub fn validate(&self, got: usize) -> Result<(), Error> {
        match *self {
            Arity::Exact(n) if got != n => Err(Error::arity_error(n, got)),
            _ => Ok(()),
        }
    }
}

/// Remaining host stack below which evaluation continues on a fresh segment
const STACK_RED_ZONE: usize = 128 * 1024;
/// Size of each additional stack segment
const STACK_GROW_SIZE: usize = 4 * 1024 * 1024;

/// Evaluate an expression at the top of the call stack
pub fn eval(expr: &Expr, env: &mut Environment) -> Result<Expr, Error> {
    eval_nested(expr, env, 0)
}

/// Evaluate an expression inside `depth` nested closure applications.
///
/// Only closure application increases `depth`; every other nested evaluation
/// passes it through unchanged. The host stack grows on demand, so recursion is
/// bounded by [`MAX_EVAL_DEPTH`] rather than by the thread's stack size.
pub fn eval_nested(expr: &Expr, env: &mut Environment, depth: usize) -> Result<Expr, Error> {
    if depth >= MAX_EVAL_DEPTH {
        return Err(Error::EvalError(format!(
            "Evaluation depth limit exceeded (max: {MAX_EVAL_DEPTH})"
        )));
    }
    stacker::maybe_grow(STACK_RED_ZONE, STACK_GROW_SIZE, || match expr {
        Expr::Integer(_)
        | Expr::Str(_)
        | Expr::Boolean(_)
        | Expr::Closure(_)
        | Expr::Primitive { .. } => Ok(expr.clone()),

        Expr::Symbol(name) => env.lookup(name),

        Expr::List(elements) => eval_list(elements, expr, env, depth),
    })
}

/// Evaluate expressions in order and return the last value, or `()` when there are none
pub(crate) fn eval_sequence(
    exprs: &[Expr],
    env: &mut Environment,
    depth: usize,
) -> Result<Expr, Error> {
    let mut result = Expr::List(vec![]);
    for expr in exprs {
        result = eval_nested(expr, env, depth)?;
    }
    Ok(result)
}

/// Attach the printed call to an arity error that lacks one
fn with_expression(error: Error, call: &Expr) -> Error {
    match error {
        Error::ArityMismatch {
            expected,
            got,
            expression: None,
        } => Error::arity_error_with_expr(expected, got, call.to_string()),
        other => other,
    }
}

fn eval_list(
    elements: &[Expr],
    call: &Expr,
    env: &mut Environment,
    depth: usize,
) -> Result<Expr, Error> {
    let [head, args @ ..] = elements else {
        return Ok(Expr::List(vec![]));
    };

    // Special forms are recognized by name, before any variable lookup
    if let Expr::Symbol(name) = head
        && let Some(op) = find_special_form(name)
    {
        trace!("special form {name} with {} operands at depth {depth}", args.len());
        op.validate_arity(args.len())
            .map_err(|err| with_expression(err, call))?;
        return match &op.op_kind {
            OpKind::SpecialForm(form) => form(args, env, depth),
            OpKind::Primitive(func) => func(args, env, depth),
        };
    }

    let callee = eval_nested(head, env, depth)?;
    match callee {
        Expr::Primitive { func, .. } => func(args, env, depth),
        Expr::Closure(closure) => {
            let values = args
                .iter()
                .map(|arg| eval_nested(arg, env, depth))
                .collect::<Result<Vec<_>, _>>()?;
            apply_closure(&closure, values, call, depth)
        }
        other => Err(Error::NotApplicable(other.to_string())),
    }
}

/// Bind parameters to arguments on top of the captured environment and evaluate
/// the body there. The caller's local frame plays no part.
fn apply_closure(
    closure: &Closure,
    args: Vec<Expr>,
    call: &Expr,
    depth: usize,
) -> Result<Expr, Error> {
    if closure.params.len() != args.len() {
        return Err(Error::arity_error_with_expr(
            closure.params.len(),
            args.len(),
            call.to_string(),
        ));
    }
    trace!("applying closure with {} arguments at depth {depth}", args.len());

    let frame: Frame = closure.params.iter().cloned().zip(args).collect();
    let mut call_env = closure.env.extend(frame);
    eval_nested(&closure.body, &mut call_env, depth + 1)
}

pub(crate) fn eval_quote(
    args: &[Expr],
    _env: &mut Environment,
    _depth: usize,
) -> Result<Expr, Error> {
    match args {
        [datum] => Ok(datum.clone()),
        _ => Err(Error::arity_error(1, args.len())),
    }
}

pub(crate) fn eval_if(args: &[Expr], env: &mut Environment, depth: usize) -> Result<Expr, Error> {
    match args {
        [condition_expr, then_expr, else_expr] => {
            match eval_nested(condition_expr, env, depth)? {
                Expr::Boolean(true) => eval_nested(then_expr, env, depth),
                Expr::Boolean(false) => eval_nested(else_expr, env, depth),
                other => Err(Error::TypeMismatch(format!(
                    "if condition must be a boolean, got {other}"
                ))),
            }
        }
        _ => Err(Error::arity_error(3, args.len())),
    }
}

/// `(cond (test body...)... (else body...))`
pub(crate) fn eval_cond(
    clauses: &[Expr],
    env: &mut Environment,
    depth: usize,
) -> Result<Expr, Error> {
    for clause in clauses {
        let Expr::List(parts) = clause else {
            return Err(malformed_clause());
        };
        let [test, body @ ..] = parts.as_slice() else {
            return Err(malformed_clause());
        };
        if body.is_empty() {
            return Err(malformed_clause());
        }

        let taken = match test {
            Expr::Symbol(name) if name == "else" => true,
            _ => match eval_nested(test, env, depth)? {
                Expr::Boolean(b) => b,
                other => {
                    return Err(Error::TypeMismatch(format!(
                        "cond test must be a boolean, got {other}"
                    )));
                }
            },
        };
        if taken {
            return eval_sequence(body, env, depth);
        }
    }
    Err(Error::NoMatchingClause)
}

fn malformed_clause() -> Error {
    Error::TypeMismatch(
        "cond clause must be a list of a test and at least one expression".to_owned(),
    )
}

/// `(define name expr)` always writes the global table and returns `name`
pub(crate) fn eval_define(
    args: &[Expr],
    env: &mut Environment,
    depth: usize,
) -> Result<Expr, Error> {
    match args {
        [Expr::Symbol(name), expr] => {
            let value = eval_nested(expr, env, depth)?;
            debug!("define {name} = {value}");
            env.define_global(name.clone(), value);
            Ok(Expr::Symbol(name.clone()))
        }
        [other, _] => Err(Error::wrong_type("define", 1, other)),
        _ => Err(Error::arity_error(2, args.len())),
    }
}

/// `(set! name expr)`: overwrite a global binding if one exists, otherwise bind
/// in the current local frame. Returns `name`.
pub(crate) fn eval_set(args: &[Expr], env: &mut Environment, depth: usize) -> Result<Expr, Error> {
    match args {
        [Expr::Symbol(name), expr] => {
            let value = eval_nested(expr, env, depth)?;
            let scope = env.assign(name.clone(), value);
            debug!("set! {name} in {scope:?} scope");
            Ok(Expr::Symbol(name.clone()))
        }
        [other, _] => Err(Error::wrong_type("set!", 1, other)),
        _ => Err(Error::arity_error(2, args.len())),
    }
}

pub(crate) fn eval_lambda(
    args: &[Expr],
    env: &mut Environment,
    _depth: usize,
) -> Result<Expr, Error> {
    match args {
        [Expr::List(param_list), body] => {
            let mut params: Vec<String> = Vec::with_capacity(param_list.len());
            for param in param_list {
                match param {
                    Expr::Symbol(name) if params.contains(name) => {
                        return Err(Error::InvalidParameter(format!(
                            "duplicate parameter name: {name}"
                        )));
                    }
                    Expr::Symbol(name) => params.push(name.clone()),
                    other => {
                        return Err(Error::InvalidParameter(format!(
                            "lambda parameters must be symbols, got {other}"
                        )));
                    }
                }
            }

            // Fixed arity only: no rest parameters
            Ok(Expr::Closure(Closure {
                env: env.snapshot(),
                params,
                body: Box::new(body.clone()),
            }))
        }
        [other, _] => Err(Error::InvalidParameter(format!(
            "lambda parameters must be a list, got {other}"
        ))),
        _ => Err(Error::arity_error(2, args.len())),
    }
}

/// Create a global environment with the primitive procedures installed
pub fn create_global_env() -> Environment {
    let env = Environment::new();

    for builtin_op in get_builtin_ops() {
        if let OpKind::Primitive(func) = &builtin_op.op_kind {
            env.define_global(
                builtin_op.id.to_owned(),
                Expr::Primitive {
                    id: builtin_op.id.to_owned(),
                    func: func.clone(),
                },
            );
        }
    }

    env
}
