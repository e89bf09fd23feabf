use std::{cell::RefCell, collections::HashMap, rc::Rc};

use log::warn;

use crate::{Error, Object};

struct Frame {
    bindings: RefCell<HashMap<String, Object>>,
    parent: Option<Environment>,
}

/// A chain of scope frames.
///
/// Cloning an `Environment` shares the frame: closures created in the same
/// scope, and every call that runs in it, see each other's mutations.  A frame
/// stays alive for as long as some closure or in-flight call refers to it.
#[derive(Clone)]
pub struct Environment {
    frame: Rc<Frame>,
}

impl std::fmt::Debug for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // values can hold closures over this very frame, so only names are
        // printed.
        let mut names: Vec<String> = self.frame.bindings.borrow().keys().cloned().collect();
        names.sort();
        f.debug_struct("Environment")
            .field("names", &names)
            .field("global", &self.frame.parent.is_none())
            .finish()
    }
}

impl Default for Environment {
    fn default() -> Self {
        Environment::new()
    }
}

impl Environment {
    /// Creates a global environment, with no parent.
    pub fn new() -> Self {
        Environment {
            frame: Rc::new(Frame {
                bindings: RefCell::new(HashMap::new()),
                parent: None,
            }),
        }
    }

    /// Creates an empty frame whose parent is `self`.
    pub fn new_child(&self) -> Self {
        Environment {
            frame: Rc::new(Frame {
                bindings: RefCell::new(HashMap::new()),
                parent: Some(self.clone()),
            }),
        }
    }

    /// Binds `name` in this frame, shadowing any outer binding of the same
    /// name.
    pub fn bind(&self, name: impl Into<String>, value: Object) {
        self.frame.bindings.borrow_mut().insert(name.into(), value);
    }

    /// Returns the value of `name` from the nearest frame that binds it.
    pub fn lookup(&self, name: &str) -> Result<Object, Error> {
        self.try_lookup(name)
            .ok_or_else(|| Error::unbound_variable(format!("unbound variable: {}", name)))
    }

    pub fn try_lookup(&self, name: &str) -> Option<Object> {
        let mut env = self;
        loop {
            if let Some(value) = env.frame.bindings.borrow().get(name) {
                return Some(value.clone());
            }
            env = env.frame.parent.as_ref()?;
        }
    }

    /// Like [`try_lookup`](Environment::try_lookup), but skips the global
    /// frame.
    pub fn try_lookup_local(&self, name: &str) -> Option<Object> {
        let mut env = self;
        while let Some(parent) = env.frame.parent.as_ref() {
            if let Some(value) = env.frame.bindings.borrow().get(name) {
                return Some(value.clone());
            }
            env = parent;
        }
        None
    }

    /// Returns true if `name` is bound in this frame, ignoring parents.
    pub fn is_bound_here(&self, name: &str) -> bool {
        self.frame.bindings.borrow().contains_key(name)
    }

    /// Assigns to `name` in the nearest frame that binds it.
    ///
    /// If no frame binds `name`, a new binding is created in the global
    /// environment.
    pub fn set(&self, name: &str, value: Object) {
        let mut env = self;
        loop {
            if let Some(slot) = env.frame.bindings.borrow_mut().get_mut(name) {
                *slot = value;
                return;
            }
            match env.frame.parent.as_ref() {
                Some(parent) => env = parent,
                None => {
                    warn!("set!: {} is not bound, creating a global binding", name);
                    env.bind(name, value);
                    return;
                }
            }
        }
    }

    /// Returns the root of the chain.
    pub fn global(&self) -> Environment {
        let mut env = self;
        while let Some(parent) = env.frame.parent.as_ref() {
            env = parent;
        }
        env.clone()
    }

    /// Returns true if both refer to the same frame.
    pub fn ptr_eq(&self, other: &Environment) -> bool {
        Rc::ptr_eq(&self.frame, &other.frame)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bind_shadows_without_altering_parent() {
        let global = Environment::new();
        global.bind("x", 1.into());
        let child = global.new_child();
        child.bind("x", 2.into());
        assert_eq!(child.lookup("x").unwrap(), Object::from(2));
        assert_eq!(global.lookup("x").unwrap(), Object::from(1));
    }

    #[test]
    fn set_mutates_the_defining_frame() {
        let global = Environment::new();
        global.bind("x", 1.into());
        let child = global.new_child().new_child();
        child.set("x", 5.into());
        assert!(!child.is_bound_here("x"));
        assert_eq!(global.lookup("x").unwrap(), Object::from(5));
    }

    #[test]
    fn set_of_unbound_name_creates_global() {
        let global = Environment::new();
        let child = global.new_child();
        child.set("fresh", 7.into());
        assert!(global.is_bound_here("fresh"));
        assert!(!child.is_bound_here("fresh"));
    }

    #[test]
    fn unbound_lookup_names_the_variable() {
        let env = Environment::new().new_child();
        let err = env.lookup("missing").unwrap_err();
        assert_eq!(err.kind(), crate::ErrorKind::UnboundVariable);
        assert!(err.to_string().contains("missing"));
    }

    #[test]
    fn clones_share_frames() {
        let global = Environment::new();
        let alias = global.clone();
        alias.bind("y", 3.into());
        assert!(global.ptr_eq(&alias));
        assert_eq!(global.lookup("y").unwrap(), Object::from(3));
        assert!(global.new_child().global().ptr_eq(&global));
    }
}
