use log::trace;

use crate::{Environment, Error, Object, value::Value};

/// The parameter specification of a procedure.
#[derive(Debug, Clone)]
enum Params {
    /// `(a b c)`: exactly this many arguments.
    Fixed(Vec<String>),
    /// `(a b . rest)` or a lone `args` symbol: the fixed prefix, then the
    /// remaining arguments as a list.
    Rest(Vec<String>, String),
}

/// A closure: parameters, body and the environment it was created in.
#[derive(Debug)]
pub struct Procedure {
    params: Params,
    spec: Object,
    body: Object,
    env: Environment,
}

fn param_name(param: &Object) -> Result<String, Error> {
    param
        .as_symbol()
        .map_err(|_| Error::invalid_form(format!("lambda: parameter is not a symbol: {}", param)))
}

impl Procedure {
    /// Builds a procedure from the unevaluated parameter specification and
    /// body of a `lambda` form.
    pub fn new(spec: &Object, body: &Object, env: &Environment) -> Result<Self, Error> {
        let params = if spec.symbolp() {
            Params::Rest(vec![], param_name(spec)?)
        } else {
            let mut fixed = vec![];
            let mut next = spec.clone();
            loop {
                let rest = match &*next.inner_ref() {
                    Value::Nil => break Params::Fixed(fixed),
                    Value::Pair { cons } => {
                        fixed.push(param_name(&cons.car())?);
                        cons.cdr()
                    }
                    Value::Symbol { value } => break Params::Rest(fixed, value.to_owned()),
                    other => {
                        return Err(Error::invalid_form(format!(
                            "lambda: malformed parameter list: {}",
                            other
                        )));
                    }
                };
                next = rest;
            }
        };
        if body.list_length().is_none() {
            return Err(Error::invalid_form(format!(
                "lambda: body is not a proper list: {}",
                body
            )));
        }
        Ok(Procedure {
            params,
            spec: spec.clone(),
            body: body.clone(),
            env: env.clone(),
        })
    }

    /// The parameter specification as written.
    pub fn params(&self) -> &Object {
        &self.spec
    }

    pub fn body(&self) -> &Object {
        &self.body
    }

    /// The environment captured when the procedure was created.
    pub fn env(&self) -> &Environment {
        &self.env
    }

    /// Binds already evaluated `args` to the parameter names in `frame`.
    pub fn bind_arguments(&self, frame: &Environment, args: &Object) -> Result<(), Error> {
        let mut args_iter = args.base_iter();
        let (fixed, rest) = match &self.params {
            Params::Fixed(fixed) => (fixed, None),
            Params::Rest(fixed, rest) => (fixed, Some(rest)),
        };
        for (idx, name) in fixed.iter().enumerate() {
            let Some(value) = args_iter.next() else {
                return Err(self.arity_error(idx));
            };
            frame.bind(name, value);
        }
        match rest {
            Some(rest) => {
                let remaining: Object = args_iter.collect();
                trace!("binding rest parameter {} to {}", rest, remaining);
                frame.bind(rest, remaining);
            }
            None => {
                if args_iter.next().is_some() {
                    return Err(self.arity_error(args.list_length().unwrap_or_default()));
                }
            }
        }
        Ok(())
    }

    fn arity_error(&self, got: usize) -> Error {
        let expected = match &self.params {
            Params::Fixed(fixed) => format!("{}", fixed.len()),
            Params::Rest(fixed, _) => format!("at least {}", fixed.len()),
        };
        Error::arity_error(format!(
            "procedure {} expects {} arguments, got {}",
            self.spec, expected, got
        ))
    }
}
