use std::{collections::HashMap, rc::Rc};

use log::debug;

use crate::{
    Environment, Error, Object, destruct_bind, eval::Evaluator, list, procedure::Procedure,
    syntax_rules::Macro, value::Value,
};

/// A special form handler.  Receives the unevaluated arguments of the form and
/// the environment it appears in.
pub type SpecialFormFn = fn(&mut dyn Evaluator, &Object, &Environment) -> Result<Object, Error>;

/// The table of reserved form names and their handlers.
#[derive(Clone, Default)]
pub struct SpecialForms {
    handlers: HashMap<String, SpecialFormFn>,
}

impl std::fmt::Debug for SpecialForms {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SpecialForms")
            .field("names", &self.names())
            .finish()
    }
}

macro_rules! intern_set_form {
    ($forms:ident, $func:ident, $name:literal) => {
        $forms.insert($name, $func);
    };
}

impl SpecialForms {
    /// Creates an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a table with all the built in special forms.
    pub fn standard() -> Self {
        let mut forms = Self::new();
        intern_set_form!(forms, lambda, "lambda");
        intern_set_form!(forms, r#if, "if");
        intern_set_form!(forms, define, "define");
        intern_set_form!(forms, set, "set!");
        intern_set_form!(forms, quote, "quote");
        intern_set_form!(forms, str_quote, "str-quote");
        intern_set_form!(forms, define_syntax, "define-syntax");
        intern_set_form!(forms, host_func, "host-func");
        intern_set_form!(forms, host_ref, "host-ref");
        intern_set_form!(forms, cons, "cons");
        intern_set_form!(forms, car, "car");
        intern_set_form!(forms, cdr, "cdr");
        intern_set_form!(forms, null, "null?");
        intern_set_form!(forms, apply, "apply");
        forms
    }

    /// Registers `handler` under `name`, replacing any previous handler.
    pub fn insert(&mut self, name: impl Into<String>, handler: SpecialFormFn) {
        self.handlers.insert(name.into(), handler);
    }

    pub fn get(&self, name: &str) -> Option<SpecialFormFn> {
        self.handlers.get(name).copied()
    }

    /// Returns the registered names, sorted.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.handlers.keys().cloned().collect();
        names.sort();
        names
    }
}

fn lambda(_ctx: &mut dyn Evaluator, args: &Object, env: &Environment) -> Result<Object, Error> {
    destruct_bind!((params &rest body) = args);
    let proc = Procedure::new(&params, &body, env)?;
    Ok(Value::Procedure(Rc::new(proc)).into_ref())
}

fn r#if(ctx: &mut dyn Evaluator, args: &Object, env: &Environment) -> Result<Object, Error> {
    destruct_bind!((condition then_branch &optional else_branch) = args);
    if ctx.evaluate(&condition, env)?.is_false() {
        // a missing else branch is Nil, which evaluates to itself.
        ctx.evaluate(&else_branch, env)
    } else {
        ctx.evaluate(&then_branch, env)
    }
}

fn define(ctx: &mut dyn Evaluator, args: &Object, env: &Environment) -> Result<Object, Error> {
    destruct_bind!((target &rest rest) = args);
    if target.consp() {
        // (define (name . params) body...) => (define name (lambda params body...))
        let name = target.car()?;
        let lambda_form = list!(,Object::symbol("lambda") ,target.cdr()? ,@rest);
        return define(ctx, &list!(,name ,lambda_form), env);
    }
    let name = target
        .as_symbol()
        .map_err(|_| Error::invalid_form(format!("define: not a symbol: {}", target)))?;
    destruct_bind!((expr) = rest);
    let value = ctx.evaluate(&expr, env)?;
    debug!("define {} = {}", name, value);
    env.bind(name, value.clone());
    Ok(value)
}

fn set(ctx: &mut dyn Evaluator, args: &Object, env: &Environment) -> Result<Object, Error> {
    destruct_bind!((target expr) = args);
    let name = target
        .as_symbol()
        .map_err(|_| Error::invalid_form(format!("set!: not a symbol: {}", target)))?;
    let value = ctx.evaluate(&expr, env)?;
    env.set(&name, value.clone());
    Ok(value)
}

fn quote(_ctx: &mut dyn Evaluator, args: &Object, _env: &Environment) -> Result<Object, Error> {
    destruct_bind!((datum) = args);
    Ok(datum)
}

fn str_quote(ctx: &mut dyn Evaluator, args: &Object, env: &Environment) -> Result<Object, Error> {
    destruct_bind!((expr) = args);
    let value = ctx.evaluate(&expr, env)?;
    Ok(value.to_string().into())
}

fn define_syntax(
    _ctx: &mut dyn Evaluator,
    args: &Object,
    env: &Environment,
) -> Result<Object, Error> {
    destruct_bind!((name rules) = args);
    let name = name
        .as_symbol()
        .map_err(|_| Error::invalid_form(format!("define-syntax: not a symbol: {}", name)))?;
    let is_syntax_rules = rules.consp()
        && matches!(&*rules.car()?.inner_ref(), Value::Symbol { value } if value == "syntax-rules");
    if !is_syntax_rules {
        return Err(Error::invalid_form(format!(
            "define-syntax: expected (syntax-rules ...), got {}",
            rules
        )));
    }
    let mac = Macro::new(&rules.cdr()?, env)?;
    debug!("define-syntax {}", name);
    let value = Value::Macro(Rc::new(mac)).into_ref();
    env.bind(name, value.clone());
    Ok(value)
}

/// Resolves the name of a host function from an evaluated name expression.
fn host_name(name: &Object) -> Result<String, Error> {
    match &*name.inner_ref() {
        Value::String { value, .. } | Value::Symbol { value } | Value::Foreign { name: value } => {
            Ok(value.to_owned())
        }
        _ => Err(Error::type_mismatch(format!(
            "not a host function name: {}",
            name
        ))),
    }
}

fn host_func(ctx: &mut dyn Evaluator, args: &Object, env: &Environment) -> Result<Object, Error> {
    destruct_bind!((name &rest rest) = args);
    let name = host_name(&ctx.evaluate(&name, env)?)?;
    let mut evaluated = vec![];
    for arg in rest.base_iter() {
        evaluated.push(ctx.evaluate(&arg, env)?);
    }
    let evaluated: Object = evaluated.into_iter().collect();
    ctx.call_host(&name, &evaluated)
}

fn host_ref(ctx: &mut dyn Evaluator, args: &Object, env: &Environment) -> Result<Object, Error> {
    destruct_bind!((name) = args);
    let name = host_name(&ctx.evaluate(&name, env)?)?;
    Ok(Value::Foreign { name }.into_ref())
}

fn cons(ctx: &mut dyn Evaluator, args: &Object, env: &Environment) -> Result<Object, Error> {
    destruct_bind!((car cdr) = args);
    Ok(Object::cons(
        ctx.evaluate(&car, env)?,
        ctx.evaluate(&cdr, env)?,
    ))
}

fn car(ctx: &mut dyn Evaluator, args: &Object, env: &Environment) -> Result<Object, Error> {
    destruct_bind!((list) = args);
    ctx.evaluate(&list, env)?.car()
}

fn cdr(ctx: &mut dyn Evaluator, args: &Object, env: &Environment) -> Result<Object, Error> {
    destruct_bind!((list) = args);
    ctx.evaluate(&list, env)?.cdr()
}

fn null(ctx: &mut dyn Evaluator, args: &Object, env: &Environment) -> Result<Object, Error> {
    destruct_bind!((arg) = args);
    Ok(ctx.evaluate(&arg, env)?.null().into())
}

fn apply(ctx: &mut dyn Evaluator, args: &Object, env: &Environment) -> Result<Object, Error> {
    destruct_bind!((func list) = args);
    let func = ctx.evaluate(&func, env)?;
    let list = ctx.evaluate(&list, env)?;
    if list.list_length().is_none() {
        return Err(Error::type_mismatch(format!(
            "apply: not a proper list: {}",
            list
        )));
    }
    ctx.apply(&func, &list, env)
}
