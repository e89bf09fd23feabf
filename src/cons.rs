use crate::{object::Object, value::Value};

/// A pair of two objects.  Chains of pairs ending in `Nil` are proper lists.
#[derive(Debug, Clone)]
pub struct Cons {
    car: Object,
    cdr: Object,
}

impl PartialEq for Cons {
    fn eq(&self, other: &Self) -> bool {
        // walk the cdr chain iteratively so that long lists don't recurse.
        if self.car != other.car {
            return false;
        }
        let (mut lhs, mut rhs) = (self.cdr.clone(), other.cdr.clone());
        loop {
            let next = match (&*lhs.inner_ref(), &*rhs.inner_ref()) {
                (Value::Pair { cons: l0 }, Value::Pair { cons: r0 }) => {
                    if l0.car != r0.car {
                        return false;
                    }
                    (l0.cdr.clone(), r0.cdr.clone())
                }
                (l0, r0) => return l0 == r0,
            };
            (lhs, rhs) = next;
        }
    }
}

impl Drop for Cons {
    fn drop(&mut self) {
        // unlink uniquely owned pairs one at a time so that dropping a long
        // list doesn't recurse down the cdr chain.
        let mut next = self.cdr.take_if_unique();
        while let Some(Value::Pair { cons }) = next {
            next = cons.cdr.take_if_unique();
        }
    }
}

impl Cons {
    pub fn new(car: Object, cdr: Object) -> Self {
        Cons { car, cdr }
    }

    pub fn car(&self) -> Object {
        self.car.clone()
    }

    pub fn cdr(&self) -> Object {
        self.cdr.clone()
    }

    pub(crate) fn set_cdr(&mut self, cdr: Object) {
        self.cdr = cdr;
    }
}

/// An iterator over the elements of a list.  Stops at the first `cdr` that is
/// not a pair, so the tail of an improper list is not produced.
#[derive(Default)]
pub struct BaseIter {
    next: Option<Object>,
}

impl BaseIter {
    pub(crate) fn new(list: Object) -> Self {
        BaseIter { next: Some(list) }
    }
}

impl Iterator for BaseIter {
    type Item = Object;

    fn next(&mut self) -> Option<Self::Item> {
        let current = self.next.take()?;
        let inner = current.inner_ref();
        match &*inner {
            Value::Pair { cons } => {
                self.next = Some(cons.cdr());
                Some(cons.car())
            }
            _ => None,
        }
    }
}

/// Builds a list front to back, splicing each new pair into the `cdr` of the
/// previous one.
pub(crate) struct ListBuilder {
    head: Object,
    last: Option<Object>,
}

impl ListBuilder {
    pub(crate) fn new() -> Self {
        ListBuilder {
            head: Object::nil(),
            last: None,
        }
    }

    pub(crate) fn push(&mut self, item: Object) {
        let cell = Object::cons(item, Object::nil());
        match &self.last {
            Some(last) => last.set_cdr(cell.clone()),
            None => self.head = cell.clone(),
        }
        self.last = Some(cell);
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.last.is_none()
    }

    /// Finishes the list with `tail` in place of the final `Nil`.  Used for
    /// dotted lists.
    pub(crate) fn finish_with_tail(self, tail: Object) -> Object {
        match &self.last {
            Some(last) => {
                last.set_cdr(tail);
                self.head
            }
            None => tail,
        }
    }
}
