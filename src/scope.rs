//! Layered render scopes.
//!
//! Every nested render pushes a fresh layer holding a back-pointer to the
//! superior layer. Lookup falls through layer by layer; the expression
//! engine consults the host instance (data, props, methods) only after the
//! whole chain misses. Loop variables and `@var` write into the current
//! layer only, so they can never leak into an ancestor render or mutate
//! the component's own fields.

use crate::value::Value;
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

#[derive(Debug, Default)]
pub struct Scope {
    vars: RefCell<HashMap<String, Value>>,
    superior: Option<Rc<Scope>>,
}

impl Scope {
    /// The outermost layer of one component render.
    pub fn root() -> Rc<Scope> {
        Rc::new(Scope::default())
    }

    pub fn child(superior: &Rc<Scope>) -> Rc<Scope> {
        Rc::new(Scope {
            vars: RefCell::new(HashMap::new()),
            superior: Some(Rc::clone(superior)),
        })
    }

    /// Write into this layer only.
    pub fn set(&self, name: impl Into<String>, value: Value) {
        self.vars.borrow_mut().insert(name.into(), value);
    }

    /// Walk the chain outward until a layer provides `name`.
    pub fn lookup(&self, name: &str) -> Option<Value> {
        if let Some(value) = self.vars.borrow().get(name) {
            return Some(value.clone());
        }
        self.superior.as_ref()?.lookup(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fall_through() {
        let outer = Scope::root();
        outer.set("a", Value::Number(1.0));
        let inner = Scope::child(&outer);
        assert_eq!(inner.lookup("a"), Some(Value::Number(1.0)));
        assert_eq!(inner.lookup("b"), None);
    }

    #[test]
    fn test_shadowing_stays_local() {
        let outer = Scope::root();
        outer.set("a", Value::Number(1.0));
        let inner = Scope::child(&outer);
        inner.set("a", Value::Number(2.0));
        assert_eq!(inner.lookup("a"), Some(Value::Number(2.0)));
        assert_eq!(outer.lookup("a"), Some(Value::Number(1.0)));
    }
}
