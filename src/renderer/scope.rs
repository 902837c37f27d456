//! Nested name scopes for a single render

use std::collections::HashMap;

use crate::value::Value;

/// Stack of frames; lookups search innermost first
#[derive(Debug)]
pub struct Scope {
    frames: Vec<HashMap<String, Value>>,
}

impl Default for Scope {
    fn default() -> Self {
        Self::new()
    }
}

impl Scope {
    /// Create a scope with one empty root frame
    pub fn new() -> Self {
        Self {
            frames: vec![HashMap::new()],
        }
    }

    pub fn push(&mut self) {
        self.frames.push(HashMap::new());
    }

    /// Drop the innermost frame and every binding made in it
    pub fn pop(&mut self) {
        if self.frames.len() > 1 {
            self.frames.pop();
        }
    }

    pub fn depth(&self) -> usize {
        self.frames.len()
    }

    pub fn lookup(&self, name: &str) -> Option<&Value> {
        self.frames.iter().rev().find_map(|frame| frame.get(name))
    }

    /// Assignment semantics: rebinding a visible name updates the frame that
    /// holds it, otherwise the name is created in the innermost frame
    pub fn assign(&mut self, name: &str, value: Value) {
        if let Some(frame) = self
            .frames
            .iter_mut()
            .rev()
            .find(|frame| frame.contains_key(name))
        {
            frame.insert(name.to_string(), value);
            return;
        }
        self.bind(name, value);
    }

    /// Bind `name` in the innermost frame, shadowing outer bindings
    pub fn bind(&mut self, name: &str, value: Value) {
        if let Some(frame) = self.frames.last_mut() {
            frame.insert(name.to_string(), value);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_inner_binding_discarded_on_pop() {
        let mut scope = Scope::new();
        scope.push();
        scope.assign("tmp", Value::Int(1));
        assert_eq!(scope.lookup("tmp"), Some(&Value::Int(1)));
        scope.pop();
        assert_eq!(scope.lookup("tmp"), None);
    }

    #[test]
    fn test_assign_updates_outer_frame() {
        let mut scope = Scope::new();
        scope.assign("index", Value::Int(0));
        scope.push();
        scope.assign("index", Value::Int(1));
        scope.pop();
        assert_eq!(scope.lookup("index"), Some(&Value::Int(1)));
    }

    #[test]
    fn test_bind_shadows_outer_frame() {
        let mut scope = Scope::new();
        scope.assign("x", Value::from("outer"));
        scope.push();
        scope.bind("x", Value::from("inner"));
        assert_eq!(scope.lookup("x"), Some(&Value::from("inner")));
        scope.pop();
        assert_eq!(scope.lookup("x"), Some(&Value::from("outer")));
    }

    #[test]
    fn test_root_frame_is_never_popped() {
        let mut scope = Scope::new();
        scope.pop();
        assert_eq!(scope.depth(), 1);
        scope.assign("x", Value::Int(3));
        assert_eq!(scope.lookup("x"), Some(&Value::Int(3)));
    }
}
