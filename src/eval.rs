use std::rc::Rc;

use log::trace;

use crate::{
    Context, Environment, Error, Object, builtin::special_forms::SpecialFormFn,
    procedure::Procedure, syntax_rules::Macro, value::Value,
};

/// The callback interface through which special forms reach back into the
/// interpreter.
pub trait Evaluator {
    /// Evaluates `expr` in `env`.
    fn evaluate(&mut self, expr: &Object, env: &Environment) -> Result<Object, Error>;

    /// Applies `callable` to a list of already evaluated `args`.  `env` is
    /// the environment of the call site, used only when `callable` is syntax.
    fn apply(
        &mut self,
        callable: &Object,
        args: &Object,
        env: &Environment,
    ) -> Result<Object, Error>;

    /// Calls a function in the host namespace with evaluated `args`.
    fn call_host(&mut self, name: &str, args: &Object) -> Result<Object, Error>;

    /// Evaluates each form in `body` in order and returns the last value, or
    /// `Nil` if `body` is empty.
    fn evaluate_sequence(&mut self, body: &Object, env: &Environment) -> Result<Object, Error> {
        let mut ret = Object::nil();
        for form in body.base_iter() {
            ret = self.evaluate(&form, env)?;
        }
        Ok(ret)
    }
}

enum Callee {
    Syntax(SpecialFormFn),
    Macro(Rc<Macro>),
    Procedure(Rc<Procedure>),
    Host(String),
}

fn callee(ctx: &Context, callable: &Object) -> Result<Callee, Error> {
    let callee = match &*callable.inner_ref() {
        Value::SpecialForm { name } => Callee::Syntax(ctx.special_form(name).ok_or_else(|| {
            Error::not_applicable(format!("special form {} is not registered", name))
        })?),
        Value::Macro(mac) => Callee::Macro(mac.clone()),
        Value::Procedure(proc) => Callee::Procedure(proc.clone()),
        Value::Foreign { name } => Callee::Host(name.to_owned()),
        Value::Nil
        | Value::Bool { .. }
        | Value::Int { .. }
        | Value::Float { .. }
        | Value::String { .. }
        | Value::Symbol { .. }
        | Value::Pair { .. } => {
            return Err(Error::not_applicable(format!(
                "not applicable: {}",
                callable
            )));
        }
    };
    Ok(callee)
}

fn eval_args(ctx: &mut Context, args: &Object, env: &Environment) -> Result<Object, Error> {
    if args.list_length().is_none() {
        return Err(Error::invalid_form(format!(
            "argument list is not a proper list: {}",
            args
        )));
    }
    let mut evaluated = vec![];
    for arg in args.base_iter() {
        evaluated.push(eval(ctx, &arg, env)?);
    }
    Ok(evaluated.into_iter().collect())
}

fn eval_form(
    ctx: &mut Context,
    head: &Object,
    args: &Object,
    env: &Environment,
) -> Result<Object, Error> {
    let reserved = match &*head.inner_ref() {
        Value::Symbol { value } => ctx.special_form(value),
        _ => None,
    };
    if let Some(handler) = reserved {
        return handler(ctx, args, env);
    }

    let callable = eval(ctx, head, env)?;
    match callee(ctx, &callable)? {
        Callee::Syntax(handler) => handler(ctx, args, env),
        Callee::Macro(mac) => {
            let expanded = mac.expand(args)?;
            eval(ctx, &expanded, env)
        }
        Callee::Procedure(_) | Callee::Host(_) => {
            let args = eval_args(ctx, args, env)?;
            apply(ctx, &callable, &args, env)
        }
    }
}

pub(crate) fn eval(ctx: &mut Context, expr: &Object, env: &Environment) -> Result<Object, Error> {
    trace!("eval: {}", expr);
    let (head, args) = match &*expr.inner_ref() {
        Value::Symbol { value } => {
            return env.lookup(value).map_err(|e| e.with_trace(expr.clone()));
        }
        Value::Pair { cons } => (cons.car(), cons.cdr()),
        Value::Nil
        | Value::Bool { .. }
        | Value::Int { .. }
        | Value::Float { .. }
        | Value::String { .. }
        | Value::Procedure(_)
        | Value::Macro(_)
        | Value::SpecialForm { .. }
        | Value::Foreign { .. } => return Ok(expr.clone()),
    };
    eval_form(ctx, &head, &args, env).map_err(|e| e.with_trace(expr.clone()))
}

pub(crate) fn apply(
    ctx: &mut Context,
    callable: &Object,
    args: &Object,
    env: &Environment,
) -> Result<Object, Error> {
    trace!("apply: {} to {}", callable, args);
    match callee(ctx, callable)? {
        Callee::Procedure(proc) => {
            let frame = proc.env().new_child();
            proc.bind_arguments(&frame, args)?;
            if proc.body().null() {
                return Err(Error::invalid_form(format!(
                    "procedure {} has an empty body",
                    proc.params()
                )));
            }
            ctx.evaluate_sequence(proc.body(), &frame)
        }
        Callee::Host(name) => ctx.call_host(&name, args),
        // syntax receives its arguments unevaluated, so the values are quoted
        // to keep them from being evaluated a second time.
        Callee::Syntax(handler) => {
            let quoted: Object = args
                .base_iter()
                .map(Object::quote)
                .collect();
            handler(ctx, &quoted, env)
        }
        Callee::Macro(mac) => {
            let expanded = mac.expand(args)?;
            eval(ctx, &expanded, env)
        }
    }
}
