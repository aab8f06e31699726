//! Lexically nested name bindings.
//!
//! Frames are reference-counted with interior mutability because closures
//! keep their definition-time frame alive for as long as the function value
//! itself: single ownership is not possible here.

use std::cell::RefCell;
use std::collections::{BTreeMap, BTreeSet};
use std::rc::Rc;

use crate::runtime::value::Value;

pub type Env = Rc<RefCell<Environment>>;

#[derive(Debug, Clone)]
struct Binding {
    value: Value,
    constant: bool,
}

#[derive(Debug, Default)]
pub struct Environment {
    store: BTreeMap<String, Binding>,
    outer: Option<Env>,
    // When set, `Environment::set` creates local bindings only for these
    // names and delegates everything else outward. Loop scopes use this so
    // the iteration variables stay local while body assignments reach
    // enclosing frames.
    permit: Option<Vec<String>>,
}

/// Outcome of a bare assignment (`name = value`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssignOutcome {
    /// An existing binding was updated in place.
    Assigned,
    /// No binding existed anywhere; a new one was created in the global frame.
    Created,
    /// The innermost binding is a constant.
    Constant,
}

impl Environment {
    /// The root frame created at startup.
    pub fn global() -> Env {
        Rc::new(RefCell::new(Environment::default()))
    }

    /// A fresh frame whose lookups fall through to `outer`.
    pub fn new_enclosed(outer: &Env) -> Env {
        Rc::new(RefCell::new(Environment {
            outer: Some(outer.clone()),
            ..Environment::default()
        }))
    }

    /// An enclosed frame that only admits the `permitted` names as new local
    /// bindings.
    pub fn new_temporary_scope(outer: &Env, permitted: Vec<String>) -> Env {
        Rc::new(RefCell::new(Environment {
            outer: Some(outer.clone()),
            permit: Some(permitted),
            ..Environment::default()
        }))
    }

    /// Looks a name up, walking the outer chain.
    pub fn get(&self, name: &str) -> Option<Value> {
        if let Some(binding) = self.store.get(name) {
            return Some(binding.value.clone());
        }
        match &self.outer {
            Some(outer) => outer.borrow().get(name),
            None => None,
        }
    }

    /// `let name = ...`: always binds in this frame, shadowing any outer
    /// binding. Fails only when the name is already a constant here.
    pub fn declare(&mut self, name: &str, value: Value) -> Result<(), ()> {
        self.insert(name, value, false)
    }

    /// `const name = ...`: like `declare`, but the binding refuses updates.
    pub fn declare_const(&mut self, name: &str, value: Value) -> Result<(), ()> {
        self.insert(name, value, true)
    }

    fn insert(&mut self, name: &str, value: Value, constant: bool) -> Result<(), ()> {
        if self.store.get(name).is_some_and(|binding| binding.constant) {
            return Err(());
        }
        self.store.insert(name.to_string(), Binding { value, constant });
        Ok(())
    }

    /// `name = ...`: walks outward to the innermost existing binding and
    /// mutates it in place; with no binding anywhere the name is created in
    /// the global frame, which is what lets scripts assign at the top level
    /// without `let`.
    pub fn assign(env: &Env, name: &str, value: Value) -> AssignOutcome {
        let mut current = env.clone();
        loop {
            let next = {
                let mut frame = current.borrow_mut();
                if let Some(binding) = frame.store.get_mut(name) {
                    if binding.constant {
                        return AssignOutcome::Constant;
                    }
                    binding.value = value;
                    return AssignOutcome::Assigned;
                }
                frame.outer.clone()
            };
            match next {
                Some(outer) => current = outer,
                None => {
                    current.borrow_mut().store.insert(
                        name.to_string(),
                        Binding {
                            value,
                            constant: false,
                        },
                    );
                    return AssignOutcome::Created;
                }
            }
        }
    }

    /// Binds a name subject to this frame's permission predicate: permitted
    /// (or already-local) names bind here, anything else is delegated to the
    /// outer frame.
    pub fn set(env: &Env, name: &str, value: Value) {
        let (local, outer) = {
            let frame = env.borrow();
            let local = match &frame.permit {
                Some(permitted) => {
                    permitted.iter().any(|p| p == name) || frame.store.contains_key(name)
                }
                None => true,
            };
            (local, frame.outer.clone())
        };
        if local {
            env.borrow_mut().store.insert(
                name.to_string(),
                Binding {
                    value,
                    constant: false,
                },
            );
        } else {
            match outer {
                Some(outer) => Environment::set(&outer, name, value),
                None => {
                    env.borrow_mut().store.insert(
                        name.to_string(),
                        Binding {
                            value,
                            constant: false,
                        },
                    );
                }
            }
        }
    }

    /// All visible names starting with `prefix`, innermost shadowing
    /// outermost, sorted. Used by the `methods` method to surface
    /// user-registered `<typename>.<method>` functions.
    pub fn names_with_prefix(env: &Env, prefix: &str) -> Vec<String> {
        let mut names = BTreeSet::new();
        let mut current = Some(env.clone());
        while let Some(frame) = current {
            let frame = frame.borrow();
            for name in frame.store.keys() {
                if name.starts_with(prefix) {
                    names.insert(name.clone());
                }
            }
            current = frame.outer.clone();
        }
        names.into_iter().collect()
    }
}
