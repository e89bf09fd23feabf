use crate::{
    cons::{self, Cons, ListBuilder},
    error::Error,
    value::{QUOTE, Value},
};
use std::{
    cell::{Cell, Ref, RefCell},
    rc::Rc,
};

/// A location in a source text, as `(line, column)` pairs.
#[derive(Debug, Clone, PartialEq, Eq, Copy)]
pub struct Span {
    pub file_id: usize,
    pub start: (usize, usize),
    pub end: (usize, usize),
}

impl Span {
    pub fn new(file_id: usize, start: (usize, usize), end: (usize, usize)) -> Self {
        Span {
            file_id,
            start,
            end,
        }
    }
}

thread_local! {
    static NIL: Object = Object {
        rc_span: Rc::new((RefCell::new(Value::Nil), Cell::new(None))),
    };
}

/// A shared reference to a Scheme value.
///
/// Cloning an `Object` is cheap and produces another reference to the same
/// value.  [`eq`](Object::eq) compares identity, `==` compares structure.
#[derive(Debug, Clone)]
pub struct Object {
    rc_span: Rc<(RefCell<Value>, Cell<Option<Span>>)>,
}

impl Default for Object {
    fn default() -> Self {
        Object::nil()
    }
}

impl PartialEq for Object {
    fn eq(&self, other: &Self) -> bool {
        self.equal(other)
    }
}

impl std::cmp::PartialEq<Value> for Object {
    fn eq(&self, other: &Value) -> bool {
        *self.rc_span.0.borrow() == *other
    }
}

impl std::fmt::Display for Object {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.rc_span.0.borrow())
    }
}

macro_rules! predicate_fn {
    ($visibility: vis, $name: ident $(, $doc: literal)?) => {
        $(#[doc=$doc])?
        $visibility fn $name(&self) -> bool {
            self.rc_span.0.borrow().$name()
        }
    };
}

macro_rules! extractor_fn_with_err {
    ($retty: ty, $name: ident $(, $doc: literal)?) => {
        $(#[doc=$doc])?
        pub fn $name(&self) -> Result<$retty, Error> {
            self.rc_span.0
                .borrow()
                .$name()
                .map_err(|e| e.with_trace(self.clone()))
        }
    };
}

impl Object {
    /// Returns the empty list.  All calls return the same object.
    pub fn nil() -> Object {
        NIL.with(|nil| nil.clone())
    }

    /// Makes a pair with the given `car` and `cdr`.
    pub fn cons(car: Object, cdr: Object) -> Object {
        Value::Pair {
            cons: Cons::new(car, cdr),
        }
        .into_ref()
    }

    pub fn symbol(name: impl Into<String>) -> Object {
        Value::symbol(name).into_ref()
    }

    /// Makes the list `(quote value)`.
    pub fn quote(value: Object) -> Object {
        [Object::symbol(QUOTE), value].into_iter().collect()
    }

    /// Makes a proper list out of `items`, ending in `tail` instead of `Nil`
    /// when a tail is given.
    pub fn list_with_tail(items: impl IntoIterator<Item = Object>, tail: Object) -> Object {
        let mut builder = ListBuilder::new();
        for item in items {
            builder.push(item);
        }
        builder.finish_with_tail(tail)
    }

    /// Returns true if `self` and `other` have equal values.
    pub fn equal(&self, other: &Object) -> bool {
        self.eq(other) || *self.rc_span.0.borrow() == *other.rc_span.0.borrow()
    }

    /// Moves the value out of `self` when no other reference to it exists,
    /// leaving `Nil` in its place.
    pub(crate) fn take_if_unique(&self) -> Option<Value> {
        if Rc::strong_count(&self.rc_span) != 1 {
            return None;
        }
        let mut inner = self.rc_span.0.try_borrow_mut().ok()?;
        Some(std::mem::replace(&mut *inner, Value::Nil))
    }

    /// Returns true if `self` and `other` are the same object.
    pub fn eq(&self, other: &Object) -> bool {
        Rc::ptr_eq(&self.rc_span, &other.rc_span)
    }

    /// Returns an iterator over the elements of the list in `self`.
    pub fn base_iter(&self) -> cons::BaseIter {
        cons::BaseIter::new(self.clone())
    }

    /// Returns the number of pairs in the list, if `self` is a proper list.
    pub fn list_length(&self) -> Option<usize> {
        let mut count = 0;
        let mut next = self.clone();
        loop {
            let rest = match &*next.inner_ref() {
                Value::Nil => return Some(count),
                Value::Pair { cons } => cons.cdr(),
                _ => return None,
            };
            count += 1;
            next = rest;
        }
    }

    /// Returns a string representation of `self`, without quotes around
    /// strings.
    pub fn fmt_string(&self) -> String {
        self.rc_span.0.borrow().fmt_string()
    }

    // extractors begin
    extractor_fn_with_err!(
        Object,
        car,
        "Returns the `car` of `self` if it is a pair, and an Error otherwise."
    );
    extractor_fn_with_err!(
        Object,
        cdr,
        "Returns the `cdr` of `self` if it is a pair, and an Error otherwise."
    );
    extractor_fn_with_err!(
        String,
        as_symbol,
        "Returns the symbol name, if `self` is a symbol, and an Error otherwise."
    );
    extractor_fn_with_err!(
        String,
        as_string,
        "Returns the contents if `self` is a string, and an Error otherwise."
    );
    extractor_fn_with_err!(i64, as_int);
    extractor_fn_with_err!(f64, try_float);
    // extractors end

    // predicates begin
    predicate_fn!(pub, null, "Returns True if `self` is the empty list.");
    predicate_fn!(pub, consp, "Returns True if `self` is a pair.");
    predicate_fn!(pub, listp, "Returns True if `self` is a pair or the empty list.");
    predicate_fn!(pub, symbolp);
    predicate_fn!(pub, numberp);
    predicate_fn!(pub, stringp);
    predicate_fn!(pub, is_false, "Returns True if `self` is `#f`, the only false value.");
    predicate_fn!(pub, self_evaluating);
    predicate_fn!(pub, applicable);
    // predicates end
}

// pub(crate) methods on Object
impl Object {
    pub(crate) fn new(vv: Value) -> Object {
        if let Value::Nil = vv {
            return Object::nil();
        }
        Self {
            rc_span: Rc::new((RefCell::new(vv), Cell::new(None))),
        }
    }

    pub(crate) fn inner_ref(&self) -> Ref<'_, Value> {
        self.rc_span.0.borrow()
    }

    /// Replaces the `cdr` of a pair.  Only used while lists are being built.
    pub(crate) fn set_cdr(&self, cdr: Object) {
        if let Value::Pair { cons } = &mut *self.rc_span.0.borrow_mut() {
            cons.set_cdr(cdr);
        }
    }

    pub(crate) fn with_span(&self, in_span: Option<Span>) -> Self {
        // the shared empty list carries no location.
        if !self.null() {
            self.rc_span.1.set(in_span);
        }
        self.clone()
    }

    #[doc(hidden)]
    pub fn span(&self) -> Option<Span> {
        self.rc_span.1.get()
    }
}

impl FromIterator<Object> for Object {
    fn from_iter<I: IntoIterator<Item = Object>>(iter: I) -> Self {
        Object::list_with_tail(iter, Object::nil())
    }
}

impl TryFrom<Object> for f64 {
    type Error = Error;

    fn try_from(value: Object) -> Result<Self, Self::Error> {
        value.try_float()
    }
}

impl TryFrom<Object> for i64 {
    type Error = Error;

    fn try_from(value: Object) -> Result<Self, Self::Error> {
        value.as_int()
    }
}

impl TryFrom<Object> for String {
    type Error = Error;

    fn try_from(value: Object) -> Result<Self, Self::Error> {
        value.as_string()
    }
}

impl TryFrom<Object> for bool {
    type Error = Error;

    fn try_from(value: Object) -> Result<Self, Self::Error> {
        Ok(!value.is_false())
    }
}

macro_rules! object_from {
    ($ty: ty) => {
        impl From<$ty> for Object {
            fn from(vv: $ty) -> Self {
                Value::from(vv).into_ref()
            }
        }
    };
}

object_from!(i64);
object_from!(f64);
object_from!(&str);
object_from!(String);
object_from!(bool);

impl From<Value> for Object {
    fn from(vv: Value) -> Self {
        vv.into_ref()
    }
}
