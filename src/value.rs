use crate::{
    cons::Cons, error::Error, object::Object, procedure::Procedure, syntax_rules::Macro,
};
use std::{fmt::Write, rc::Rc};

/// The boolean literal that is false.  Every other value is true.
pub const FALSE_TOKEN: &str = "#f";
/// The boolean literal that is true.
pub const TRUE_TOKEN: &str = "#t";
/// The head of the form that `'x` is read as.
pub const QUOTE: &str = "quote";

/// The kinds of values an [`Object`] can hold.
#[derive(Debug, Clone)]
pub enum Value {
    /// The empty list.  There is exactly one `Nil` object, see
    /// [`Object::nil`].
    Nil,
    Bool {
        value: bool,
    },
    Int {
        value: i64,
    },
    Float {
        value: f64,
    },
    /// A string literal.  `raw` strings were delimited by backticks and were
    /// read without escape processing.
    String {
        value: String,
        raw: bool,
    },
    Symbol {
        value: String,
    },
    Pair {
        cons: Cons,
    },
    Procedure(Rc<Procedure>),
    Macro(Rc<Macro>),
    /// Marker for a name registered in the special form table.  Applying it
    /// dispatches to the handler with unevaluated arguments.
    SpecialForm {
        name: String,
    },
    /// Marker for a function in the host namespace.
    Foreign {
        name: String,
    },
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Nil, Self::Nil) => true,
            (Self::Bool { value: l0 }, Self::Bool { value: r0 }) => l0 == r0,
            (Self::Int { value: l0 }, Self::Int { value: r0 }) => l0 == r0,
            (Self::Float { value: l0 }, Self::Float { value: r0 }) => l0 == r0,
            (Self::Int { value: l0 }, Self::Float { value: r0 }) => *l0 as f64 == *r0,
            (Self::Float { value: l0 }, Self::Int { value: r0 }) => *l0 == *r0 as f64,
            (Self::String { value: l0, .. }, Self::String { value: r0, .. }) => l0 == r0,
            (Self::Symbol { value: l0 }, Self::Symbol { value: r0 }) => l0 == r0,
            (Self::Pair { cons: l0 }, Self::Pair { cons: r0 }) => l0 == r0,
            (Self::Procedure(l0), Self::Procedure(r0)) => Rc::ptr_eq(l0, r0),
            (Self::Macro(l0), Self::Macro(r0)) => Rc::ptr_eq(l0, r0),
            (Self::SpecialForm { name: l0 }, Self::SpecialForm { name: r0 }) => l0 == r0,
            (Self::Foreign { name: l0 }, Self::Foreign { name: r0 }) => l0 == r0,
            _ => false,
        }
    }
}

fn write_escaped(f: &mut std::fmt::Formatter<'_>, value: &str) -> std::fmt::Result {
    f.write_char('"')?;
    for ch in value.chars() {
        match ch {
            '"' => f.write_str("\\\"")?,
            '\\' => f.write_str("\\\\")?,
            '\n' => f.write_str("\\n")?,
            '\t' => f.write_str("\\t")?,
            '\r' => f.write_str("\\r")?,
            ch => f.write_char(ch)?,
        }
    }
    f.write_char('"')
}

/// Returns `x` if `cons` is the two element list `(quote x)`.
fn quoted(cons: &Cons) -> Option<Object> {
    if !matches!(&*cons.car().inner_ref(), Value::Symbol { value } if value == QUOTE) {
        return None;
    }
    match &*cons.cdr().inner_ref() {
        Value::Pair { cons } if cons.cdr().null() => Some(cons.car()),
        _ => None,
    }
}

/// Formats lists non-recursively along the `cdr` chain.  `(quote x)` is
/// printed as `'x`.
fn fmt_list(cons: &Cons, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    if let Some(value) = quoted(cons) {
        return write!(f, "'{}", value);
    }
    f.write_char('(')?;
    write!(f, "{}", cons.car())?;
    let mut rest = cons.cdr();
    loop {
        let next = match &*rest.inner_ref() {
            Value::Nil => break,
            Value::Pair { cons } => {
                write!(f, " {}", cons.car())?;
                cons.cdr()
            }
            other => {
                write!(f, " . {}", other)?;
                break;
            }
        };
        rest = next;
    }
    f.write_char(')')
}

impl std::fmt::Display for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Value::Nil => f.write_str("()"),
            Value::Bool { value: true } => f.write_str(TRUE_TOKEN),
            Value::Bool { value: false } => f.write_str(FALSE_TOKEN),
            Value::Int { value } => write!(f, "{}", value),
            Value::Float { value } => write!(f, "{:?}", value),
            Value::String { value, raw: true } => write!(f, "`{}`", value),
            Value::String { value, raw: false } => write_escaped(f, value),
            Value::Symbol { value } => f.write_str(value),
            Value::Pair { cons } => fmt_list(cons, f),
            Value::Procedure(proc) => write!(f, "#<procedure {}>", proc.params()),
            Value::Macro(_) => f.write_str("#<syntax-rules>"),
            Value::SpecialForm { name } => write!(f, "#<special-form {}>", name),
            Value::Foreign { name } => write!(f, "#<host-function {}>", name),
        }
    }
}

impl Value {
    pub fn symbol(value: impl Into<String>) -> Value {
        Value::Symbol {
            value: value.into(),
        }
    }

    pub fn into_ref(self) -> Object {
        Object::new(self)
    }

    pub fn car(&self) -> Result<Object, Error> {
        match self {
            Value::Pair { cons } => Ok(cons.car()),
            _ => Err(Error::type_mismatch(format!("car: not a pair: {}", self))),
        }
    }

    pub fn cdr(&self) -> Result<Object, Error> {
        match self {
            Value::Pair { cons } => Ok(cons.cdr()),
            _ => Err(Error::type_mismatch(format!("cdr: not a pair: {}", self))),
        }
    }

    pub fn as_symbol(&self) -> Result<String, Error> {
        match self {
            Value::Symbol { value } => Ok(value.to_owned()),
            _ => Err(Error::type_mismatch(format!("expected symbol: {}", self))),
        }
    }

    pub fn as_string(&self) -> Result<String, Error> {
        match self {
            Value::String { value, .. } => Ok(value.to_owned()),
            _ => Err(Error::type_mismatch(format!("expected string: {}", self))),
        }
    }

    pub fn as_int(&self) -> Result<i64, Error> {
        match self {
            Value::Int { value } => Ok(*value),
            _ => Err(Error::type_mismatch(format!("expected integer: {}", self))),
        }
    }

    pub fn try_float(&self) -> Result<f64, Error> {
        match self {
            Value::Float { value } => Ok(*value),
            Value::Int { value } => Ok(*value as f64),
            _ => Err(Error::type_mismatch(format!("expected number: {}", self))),
        }
    }

    pub fn null(&self) -> bool {
        matches!(self, Value::Nil)
    }

    pub fn is_false(&self) -> bool {
        matches!(self, Value::Bool { value: false })
    }

    pub fn consp(&self) -> bool {
        matches!(self, Value::Pair { .. })
    }

    pub fn listp(&self) -> bool {
        matches!(self, Value::Pair { .. } | Value::Nil)
    }

    pub fn symbolp(&self) -> bool {
        matches!(self, Value::Symbol { .. })
    }

    pub fn numberp(&self) -> bool {
        matches!(self, Value::Int { .. } | Value::Float { .. })
    }

    pub fn stringp(&self) -> bool {
        matches!(self, Value::String { .. })
    }

    /// Returns true for atoms that evaluate to themselves.
    pub fn self_evaluating(&self) -> bool {
        matches!(
            self,
            Value::Nil
                | Value::Bool { .. }
                | Value::Int { .. }
                | Value::Float { .. }
                | Value::String { .. }
        )
    }

    /// Returns true for values that can be in the head position of an
    /// application.
    pub fn applicable(&self) -> bool {
        matches!(
            self,
            Value::Procedure(_)
                | Value::Macro(_)
                | Value::SpecialForm { .. }
                | Value::Foreign { .. }
        )
    }

    /// Returns a string representation of `self`, without quotes around
    /// strings.
    pub fn fmt_string(&self) -> String {
        match self {
            Value::String { value, .. } => value.to_owned(),
            s => s.to_string(),
        }
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::Int { value }
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::Float { value }
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Bool { value }
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::String {
            value: value.to_owned(),
            raw: false,
        }
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::String { value, raw: false }
    }
}
