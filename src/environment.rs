//! Variable bindings: one global table shared by every environment derived from
//! the same root, plus a local frame owned by each lexical scope.
//!
//! Local frames are copied, never chained. Extending an environment clones the
//! parent's frame and overlays the new bindings, so sibling evaluations (two
//! recursive calls inside one expression, say) can never observe each other's
//! parameters, and a closure's captured snapshot is immune to later mutation of the
//! frame it came from.
//!
//! The global table sits behind `Rc<RefCell<..>>`. At most one evaluation may be in
//! flight per global table; this is a precondition, not something enforced here.

use crate::Error;
use crate::ast::Expr;
use crate::intoprimitive::{IntoPrimitive, PrimitiveFn};
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;
use std::sync::Arc;

/// A single scope's bindings
pub type Frame = HashMap<String, Expr>;

/// Which tier an assignment landed in
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scope {
    Global,
    Local,
}

#[derive(Clone, Default)]
pub struct Environment {
    global: Rc<RefCell<Frame>>,
    local: Frame,
}

impl std::fmt::Debug for Environment {
    // Closures stored in the global table hold environments themselves, so only
    // summarize the global tier.
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut local: Vec<&String> = self.local.keys().collect();
        local.sort();
        f.debug_struct("Environment")
            .field("global_bindings", &self.global.borrow().len())
            .field("local", &local)
            .finish()
    }
}

impl Environment {
    /// An environment with an empty global table and an empty local frame.
    /// Use [`crate::evaluator::create_global_env`] to get one with the builtins installed.
    pub fn new() -> Self {
        Environment {
            global: Rc::new(RefCell::new(HashMap::new())),
            local: HashMap::new(),
        }
    }

    /// Resolve a symbol: local frame first, then the global table
    pub fn get(&self, name: &str) -> Option<Expr> {
        self.local
            .get(name)
            .cloned()
            .or_else(|| self.global.borrow().get(name).cloned())
    }

    pub fn lookup(&self, name: &str) -> Result<Expr, Error> {
        self.get(name)
            .ok_or_else(|| Error::UnboundVariable(name.to_owned()))
    }

    /// Write the shared global table. Visible through every environment that shares it.
    pub fn define_global(&self, name: String, value: Expr) {
        self.global.borrow_mut().insert(name, value);
    }

    /// Write only this environment's local frame
    pub fn bind_local(&mut self, name: String, value: Expr) {
        self.local.insert(name, value);
    }

    pub fn is_global(&self, name: &str) -> bool {
        self.global.borrow().contains_key(name)
    }

    /// Assignment as performed by `set!`: overwrite the global binding when one
    /// exists, otherwise write the local frame. An unbound name therefore creates a
    /// new local binding instead of failing.
    pub fn assign(&mut self, name: String, value: Expr) -> Scope {
        let mut global = self.global.borrow_mut();
        if let Some(slot) = global.get_mut(&name) {
            *slot = value;
            Scope::Global
        } else {
            drop(global);
            self.local.insert(name, value);
            Scope::Local
        }
    }

    /// New environment sharing the global table, whose local frame is this frame
    /// overlaid with `overlay` (overlay wins on collision). `self` is untouched.
    pub fn extend(&self, overlay: Frame) -> Environment {
        let mut local = self.local.clone();
        local.extend(overlay);
        Environment {
            global: Rc::clone(&self.global),
            local,
        }
    }

    /// Capture the current local frame by value, for closure creation
    pub fn snapshot(&self) -> Environment {
        self.clone()
    }

    /// Whether two environments write to the same global table
    pub fn shares_global_with(&self, other: &Environment) -> bool {
        Rc::ptr_eq(&self.global, &other.global)
    }

    /// Register a raw primitive in the global table.
    ///
    /// The function receives its operands unevaluated, the calling environment, and
    /// the current call depth. Evaluate operands with
    /// [`crate::evaluator::eval_nested`], passing the depth through unchanged.
    ///
    /// # Example
    /// ```
    /// use schemelet::Error;
    /// use schemelet::ast::Expr;
    /// use schemelet::environment::Environment;
    /// use schemelet::evaluator::{create_global_env, eval_nested};
    ///
    /// // Evaluates its single operand twice
    /// fn twice(args: &[Expr], env: &mut Environment, depth: usize) -> Result<Expr, Error> {
    ///     let [operand] = args else {
    ///         return Err(Error::arity_error(1, args.len()));
    ///     };
    ///     let first = eval_nested(operand, env, depth)?;
    ///     let second = eval_nested(operand, env, depth)?;
    ///     Ok(Expr::List(vec![first, second]))
    /// }
    ///
    /// let mut env = create_global_env();
    /// env.register_primitive("twice", twice);
    /// assert_eq!(schemelet::evaluate_in("(twice (+ 1 2))", &mut env), "(3 3)");
    /// ```
    pub fn register_primitive(
        &self,
        name: &str,
        func: fn(&[Expr], &mut Environment, usize) -> Result<Expr, Error>,
    ) {
        let wrapped: Arc<PrimitiveFn> = Arc::new(func);
        self.define_global(
            name.to_owned(),
            Expr::Primitive {
                id: name.to_owned(),
                func: wrapped,
            },
        );
    }

    /// Register a strongly-typed Rust function as an eager primitive.
    ///
    /// Operands are evaluated left to right in the calling environment, arity is
    /// checked, and each value is converted to the parameter type. Supported
    /// parameter types are `i64`, `bool`, `String`, `Vec<Expr>` (a list) and `Expr`.
    /// The function returns `Result<R, Error>` for any `R: Into<Expr>`.
    ///
    /// ```
    /// use schemelet::Error;
    /// use schemelet::evaluator::create_global_env;
    ///
    /// fn safe_div(a: i64, b: i64) -> Result<i64, Error> {
    ///     if b == 0 {
    ///         Err(Error::EvalError("division by zero".into()))
    ///     } else {
    ///         Ok(a / b)
    ///     }
    /// }
    ///
    /// let mut env = create_global_env();
    /// env.register_builtin_operation::<(i64, i64), i64, _>("safe-div", safe_div);
    /// assert_eq!(schemelet::evaluate_in("(safe-div 7 2)", &mut env), "3");
    /// ```
    pub fn register_builtin_operation<Args, R, F>(&self, name: &str, func: F)
    where
        F: IntoPrimitive<Args, R>,
    {
        self.define_global(
            name.to_owned(),
            Expr::Primitive {
                id: name.to_owned(),
                func: func.into_primitive(name),
            },
        );
    }

    /// All visible bindings, local shadowing global, sorted by name
    pub fn get_all_bindings(&self) -> Vec<(String, Expr)> {
        let mut bindings: Frame = self.global.borrow().clone();
        for (name, value) in &self.local {
            bindings.insert(name.clone(), value.clone());
        }

        let mut result: Vec<_> = bindings.into_iter().collect();
        result.sort_by(|a, b| a.0.cmp(&b.0));
        result
    }
}
