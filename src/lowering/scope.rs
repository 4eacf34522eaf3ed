//! Lexical scope tracking for locals inside a function body.
//!
//! Locals stay in the function's symbol table for the whole body (their IR
//! names must remain unique), but name *resolution* only sees locals whose
//! declaring scope is still open. The tracker is a plain stack of the names
//! declared per block.

use hashbrown::HashSet;

#[derive(Debug, Default)]
pub struct ScopeTracker {
    scopes: Vec<HashSet<String>>,
}

impl ScopeTracker {
    pub fn new() -> Self {
        ScopeTracker {
            scopes: vec![HashSet::new()],
        }
    }

    pub fn reset(&mut self) {
        self.scopes.clear();
        self.scopes.push(HashSet::new());
    }

    pub fn enter_scope(&mut self) {
        self.scopes.push(HashSet::new());
    }

    pub fn exit_scope(&mut self) {
        self.scopes.pop();
    }

    pub fn put_in_current_scope(&mut self, name: &str) {
        if let Some(scope) = self.scopes.last_mut() {
            scope.insert(name.to_owned());
        }
    }

    pub fn is_in_scope(&self, name: &str) -> bool {
        self.scopes.iter().any(|scope| scope.contains(name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_fall_out_of_scope_on_exit() {
        let mut scope = ScopeTracker::new();

        scope.put_in_current_scope("outer");
        scope.enter_scope();
        scope.put_in_current_scope("inner");

        assert!(scope.is_in_scope("outer"));
        assert!(scope.is_in_scope("inner"));

        scope.exit_scope();

        assert!(scope.is_in_scope("outer"));
        assert!(!scope.is_in_scope("inner"));
    }
}
