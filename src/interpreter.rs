//! Top-level entry points.
//!
//! The `eval_*` functions return typed results. The `evaluate_*` functions are
//! the printing front end: they never fail, turning any error into a diagnostic
//! string so the hosting session stays usable for the next input.

use crate::Error;
use crate::ast::Expr;
use crate::environment::Environment;
use crate::evaluator::{create_global_env, eval};
use crate::parser::{ParseConfig, parse_expr, parse_with_config, skip_trivia};
use log::debug;
use std::cell::RefCell;

thread_local! {
    /// Default session environment behind [`evaluate_in_global`]
    static GLOBAL_ENVIRONMENT: RefCell<Environment> = RefCell::new(create_global_env());
}

/// Parse exactly one expression and evaluate it
pub fn eval_str(source: &str, env: &mut Environment) -> Result<Expr, Error> {
    let expr = parse_expr(source)?;
    eval(&expr, env)
}

/// Evaluate every expression in `source` in order, returning the last value.
/// `Ok(None)` means the buffer held no expressions.
pub fn eval_buffer(source: &str, env: &mut Environment) -> Result<Option<Expr>, Error> {
    eval_buffer_with_config(source, env, &ParseConfig::default())
}

/// Stops at the first parse or evaluation error. Definitions made by earlier
/// expressions in the buffer remain in effect.
pub fn eval_buffer_with_config(
    source: &str,
    env: &mut Environment,
    config: &ParseConfig,
) -> Result<Option<Expr>, Error> {
    let mut rest = source;
    let mut last = None;

    while !skip_trivia(rest, config).is_empty() {
        let (expr, remaining) = parse_with_config(rest, config)?;
        last = Some(eval(&expr, env)?);
        rest = remaining;
    }

    Ok(last)
}

/// Text shown to the user for a failed evaluation
pub fn diagnostic(err: &Error) -> String {
    match err {
        Error::ParseError(parse_err) => format!("parse error: {}", parse_err.message),
        other => format!("exception: {other}"),
    }
}

fn printed(result: Result<Expr, Error>) -> String {
    match result {
        Ok(value) => value.to_string(),
        Err(err) => {
            debug!("evaluation failed: {err}");
            diagnostic(&err)
        }
    }
}

/// Evaluate one expression against `env` and print the result or diagnostic
pub fn evaluate_in(source: &str, env: &mut Environment) -> String {
    printed(eval_str(source, env))
}

/// Evaluate a whole buffer against `env` and print the last result or the first
/// diagnostic. An empty buffer prints as the empty string.
pub fn evaluate_buffer(source: &str, env: &mut Environment) -> String {
    match eval_buffer(source, env) {
        Ok(Some(value)) => value.to_string(),
        Ok(None) => String::new(),
        Err(err) => printed(Err(err)),
    }
}

/// Evaluate one expression against this thread's default environment.
/// Definitions persist across calls on the same thread.
pub fn evaluate_in_global(source: &str) -> String {
    match with_global_environment(|env| evaluate_in(source, env)) {
        Ok(printed_result) => printed_result,
        Err(err) => printed(Err(err)),
    }
}

/// Run `f` with this thread's default environment.
///
/// Returns an error rather than panicking when the environment is already in
/// use further up the stack, e.g. by a primitive called from [`evaluate_in_global`].
pub fn with_global_environment<T>(f: impl FnOnce(&mut Environment) -> T) -> Result<T, Error> {
    GLOBAL_ENVIRONMENT.with(|env| match env.try_borrow_mut() {
        Ok(mut env) => Ok(f(&mut env)),
        Err(_) => Err(Error::EvalError(
            "default environment is already in use".to_owned(),
        )),
    })
}
