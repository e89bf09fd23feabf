use std::{collections::HashMap, rc::Rc};

use log::trace;

use crate::{Error, Object, parse::read, value::Value};

/// A value as seen by host functions.
#[derive(Debug, Clone, PartialEq)]
pub enum HostValue {
    /// No value.  Passed for the empty list, returned to mean "nothing".
    Undefined,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    /// Any other value, in its printed form.
    ///
    /// When returned, text that reads as a single list or literal becomes
    /// that datum, so lists survive a trip through the host.  Anything else,
    /// a bare symbol included, becomes a string literal holding the text.
    Datum(String),
}

impl std::fmt::Display for HostValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            HostValue::Undefined => Ok(()),
            HostValue::Bool(value) => write!(f, "{}", Object::from(*value)),
            HostValue::Int(value) => write!(f, "{}", value),
            HostValue::Float(value) => write!(f, "{:?}", value),
            HostValue::Str(value) | HostValue::Datum(value) => f.write_str(value),
        }
    }
}

impl From<&Object> for HostValue {
    fn from(obj: &Object) -> Self {
        match &*obj.inner_ref() {
            Value::Nil => HostValue::Undefined,
            Value::Bool { value } => HostValue::Bool(*value),
            Value::Int { value } => HostValue::Int(*value),
            Value::Float { value } => HostValue::Float(*value),
            Value::String { value, .. } => HostValue::Str(value.to_owned()),
            other => HostValue::Datum(other.to_string()),
        }
    }
}

impl From<HostValue> for Object {
    fn from(value: HostValue) -> Self {
        match value {
            HostValue::Undefined => Object::nil(),
            HostValue::Bool(value) => value.into(),
            HostValue::Int(value) => value.into(),
            HostValue::Float(value) => value.into(),
            HostValue::Str(value) => value.into(),
            HostValue::Datum(text) => match read(&text) {
                Ok(mut forms) if forms.len() == 1 && !forms[0].symbolp() => forms.remove(0),
                _ => text.into(),
            },
        }
    }
}

/// A function in the host namespace.  Errors are reported as messages.
pub type HostFn = Rc<dyn Fn(&[HostValue]) -> Result<HostValue, String>>;

/// The host namespace: functions callable through `host-func`, `host-ref` and
/// the `Foreign` markers bound in the global environment.
#[derive(Clone, Default)]
pub struct HostFunctions {
    functions: HashMap<String, HostFn>,
}

impl std::fmt::Debug for HostFunctions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HostFunctions")
            .field("names", &self.names())
            .finish()
    }
}

impl HostFunctions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a namespace with arithmetic, numeric comparison, `display`
    /// and `newline`.
    pub fn standard() -> Self {
        let mut host = Self::new();
        add_arithmetic(&mut host);
        add_comparisons(&mut host);
        add_output(&mut host);
        host
    }

    pub fn insert(
        &mut self,
        name: impl Into<String>,
        func: impl Fn(&[HostValue]) -> Result<HostValue, String> + 'static,
    ) {
        self.functions.insert(name.into(), Rc::new(func));
    }

    pub fn get(&self, name: &str) -> Option<HostFn> {
        self.functions.get(name).cloned()
    }

    /// Returns the registered names, sorted.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.functions.keys().cloned().collect();
        names.sort();
        names
    }

    /// Calls `name` with the evaluated arguments in the list `args`.
    pub fn call(&self, name: &str, args: &Object) -> Result<Object, Error> {
        let func = self
            .get(name)
            .ok_or_else(|| Error::foreign_call(format!("{}: no such host function", name)))?;
        let args: Vec<HostValue> = args.base_iter().map(|arg| HostValue::from(&arg)).collect();
        trace!("host call: {} {:?}", name, args);
        let ret = func(&args).map_err(|msg| Error::foreign_call(format!("{}: {}", name, msg)))?;
        Ok(ret.into())
    }
}

fn as_float(value: &HostValue) -> Result<f64, String> {
    match value {
        HostValue::Int(value) => Ok(*value as f64),
        HostValue::Float(value) => Ok(*value),
        other => Err(format!("expected a number, got {}", other)),
    }
}

// int/int goes through `$int` and stays an integer where it can.  Anything
// involving a float goes through `$float`.
macro_rules! binary_ops {
    ($int:expr, $float:expr) => {{
        |lhs: &HostValue, rhs: &HostValue| -> Result<HostValue, String> {
            match (lhs, rhs) {
                (HostValue::Int(l), HostValue::Int(r)) => $int(*l, *r),
                _ => {
                    let l = as_float(lhs)?;
                    let r = as_float(rhs)?;
                    Ok(HostValue::Float($float(l, r)))
                }
            }
        }
    }};
}

macro_rules! compare_ops {
    ($oper:tt) => {{
        |lhs: &HostValue, rhs: &HostValue| -> Result<bool, String> {
            match (lhs, rhs) {
                (HostValue::Int(l), HostValue::Int(r)) => Ok(l $oper r),
                _ => Ok(as_float(lhs)? $oper as_float(rhs)?),
            }
        }
    }};
}

fn overflow(value: Option<i64>) -> Result<HostValue, String> {
    value
        .map(HostValue::Int)
        .ok_or_else(|| "integer overflow".to_owned())
}

fn is_zero(value: &HostValue) -> bool {
    matches!(value, HostValue::Int(0)) || matches!(value, HostValue::Float(v) if *v == 0.0)
}

fn reduce_with(
    args: &[HostValue],
    op: impl Fn(&HostValue, &HostValue) -> Result<HostValue, String>,
) -> Result<HostValue, String> {
    let Some((first, rest)) = args.split_first() else {
        return Err("expected at least one argument".to_owned());
    };
    as_float(first)?;
    let mut acc = first.clone();
    for arg in rest {
        acc = op(&acc, arg)?;
    }
    Ok(acc)
}

fn add_arithmetic(host: &mut HostFunctions) {
    let add = binary_ops!(|l: i64, r: i64| overflow(l.checked_add(r)), |l: f64, r: f64| l + r);
    let sub = binary_ops!(|l: i64, r: i64| overflow(l.checked_sub(r)), |l: f64, r: f64| l - r);
    let mul = binary_ops!(|l: i64, r: i64| overflow(l.checked_mul(r)), |l: f64, r: f64| l * r);
    let div = binary_ops!(
        |l: i64, r: i64| {
            if l.checked_rem(r) == Some(0) {
                overflow(l.checked_div(r))
            } else {
                Ok(HostValue::Float(l as f64 / r as f64))
            }
        },
        |l: f64, r: f64| l / r
    );
    let rem = binary_ops!(|l: i64, r: i64| overflow(l.checked_rem(r)), |l: f64, r: f64| l % r);

    host.insert("+", move |args| {
        if args.is_empty() {
            return Ok(HostValue::Int(0));
        }
        reduce_with(args, add)
    });
    host.insert("*", move |args| {
        if args.is_empty() {
            return Ok(HostValue::Int(1));
        }
        reduce_with(args, mul)
    });
    host.insert("-", move |args| {
        if let [only] = args {
            return sub(&HostValue::Int(0), only);
        }
        reduce_with(args, sub)
    });
    host.insert("/", move |args| {
        let checked = |lhs: &HostValue, rhs: &HostValue| {
            if is_zero(rhs) {
                return Err("division by zero".to_owned());
            }
            div(lhs, rhs)
        };
        if let [only] = args {
            return checked(&HostValue::Int(1), only);
        }
        reduce_with(args, checked)
    });
    host.insert("%", move |args| {
        reduce_with(args, |lhs, rhs| {
            if is_zero(rhs) {
                return Err("division by zero".to_owned());
            }
            rem(lhs, rhs)
        })
    });
}

fn add_comparisons(host: &mut HostFunctions) {
    fn chain(
        args: &[HostValue],
        cmp: impl Fn(&HostValue, &HostValue) -> Result<bool, String>,
    ) -> Result<HostValue, String> {
        for arg in args {
            as_float(arg)?;
        }
        for pair in args.windows(2) {
            if !cmp(&pair[0], &pair[1])? {
                return Ok(HostValue::Bool(false));
            }
        }
        Ok(HostValue::Bool(true))
    }

    host.insert("=", |args| chain(args, compare_ops!(==)));
    host.insert("<", |args| chain(args, compare_ops!(<)));
    host.insert(">", |args| chain(args, compare_ops!(>)));
    host.insert("<=", |args| chain(args, compare_ops!(<=)));
    host.insert(">=", |args| chain(args, compare_ops!(>=)));
}

fn add_output(host: &mut HostFunctions) {
    host.insert("display", |args| {
        for arg in args {
            print!("{}", arg);
        }
        Ok(HostValue::Undefined)
    });
    host.insert("newline", |_| {
        println!();
        Ok(HostValue::Undefined)
    });
}
