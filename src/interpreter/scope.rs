use std::collections::{HashMap, HashSet};

use crate::lexer::Position;

use super::{RuntimeError, RuntimeResult, Value};

/// One function activation: its variable table and the names it has
/// declared `global`.
#[derive(Debug, Default)]
struct Frame {
    table: HashMap<String, Value>,
    globals: HashSet<String>,
}

/// The stack of variable tables. The first frame belongs to `@global` and
/// stays alive for the whole run; the last frame is the current call. A name
/// resolves either in the current frame or, when declared `global`, directly
/// in the first one. There is nothing in between.
#[derive(Debug, Default)]
pub(super) struct ScopeStack {
    frames: Vec<Frame>,
}

impl ScopeStack {
    pub fn push_frame(&mut self) {
        self.frames.push(Frame::default());
    }

    pub fn pop_frame(&mut self) {
        self.frames.pop();
    }

    fn target_index(&self, name: &str) -> usize {
        let current = self.frames.len().saturating_sub(1);
        if current != 0 && self.frames[current].globals.contains(name) {
            0
        } else {
            current
        }
    }

    pub fn get(&self, name: &str, position: Position) -> RuntimeResult<&Value> {
        self.frames[self.target_index(name)]
            .table
            .get(name)
            .ok_or_else(|| undefined(name, position))
    }

    pub fn get_mut(&mut self, name: &str, position: Position) -> RuntimeResult<&mut Value> {
        let index = self.target_index(name);
        self.frames[index]
            .table
            .get_mut(name)
            .ok_or_else(|| undefined(name, position))
    }

    /// Store `value` under `name`, creating the slot if it does not exist.
    /// The previous value, if any, is dropped.
    pub fn assign(&mut self, name: &str, value: Value) {
        let index = self.target_index(name);
        self.frames[index].table.insert(name.to_owned(), value);
    }

    /// Mark `name` as referring to the global table. The name must already
    /// exist there; the declaration never creates it.
    pub fn declare_global(&mut self, name: &str, position: Position) -> RuntimeResult<()> {
        if !self.frames[0].table.contains_key(name) {
            return Err(RuntimeError::at(
                format!("Variable `{name}` does not exist in the global scope"),
                position,
            ));
        }

        let current = self.frames.len() - 1;
        self.frames[current].globals.insert(name.to_owned());
        Ok(())
    }
}

fn undefined(name: &str, position: Position) -> RuntimeError {
    RuntimeError::at(
        format!("Variable with name `{name}` does not exist in this scope"),
        position,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    const POS: Position = (1, 1);

    #[test]
    fn test_assign_and_read() {
        let mut scopes = ScopeStack::default();
        scopes.push_frame();

        scopes.assign("x", Value::Int(1));
        assert_eq!(Ok(&Value::Int(1)), scopes.get("x", POS));

        scopes.assign("x", Value::Int(2));
        assert_eq!(Ok(&Value::Int(2)), scopes.get("x", POS));
    }

    #[test]
    fn test_frames_do_not_leak() {
        let mut scopes = ScopeStack::default();
        scopes.push_frame();
        scopes.assign("x", Value::Int(1));

        scopes.push_frame();
        assert!(scopes.get("x", POS).is_err());

        scopes.assign("x", Value::Int(2));
        assert_eq!(Ok(&Value::Int(2)), scopes.get("x", POS));

        scopes.pop_frame();
        assert_eq!(Ok(&Value::Int(1)), scopes.get("x", POS));
    }

    #[test]
    fn test_global_declaration_redirects() {
        let mut scopes = ScopeStack::default();
        scopes.push_frame();
        scopes.assign("g", Value::Int(10));

        scopes.push_frame();
        scopes.declare_global("g", POS).unwrap();
        assert_eq!(Ok(&Value::Int(10)), scopes.get("g", POS));

        scopes.assign("g", Value::Int(11));
        scopes.pop_frame();
        assert_eq!(Ok(&Value::Int(11)), scopes.get("g", POS));
    }

    #[test]
    fn test_global_declaration_requires_existing_name() {
        let mut scopes = ScopeStack::default();
        scopes.push_frame();
        scopes.push_frame();

        let result = scopes.declare_global("missing", POS);

        assert!(result.is_err());
        assert!(result
            .unwrap_err()
            .to_string()
            .contains("does not exist in the global scope"));
    }

    #[test]
    fn test_globals_are_per_frame() {
        let mut scopes = ScopeStack::default();
        scopes.push_frame();
        scopes.assign("g", Value::Int(10));

        scopes.push_frame();
        scopes.declare_global("g", POS).unwrap();
        scopes.pop_frame();

        scopes.push_frame();
        scopes.assign("g", Value::Int(0));
        scopes.pop_frame();

        // the second frame wrote a local `g`, the global one is untouched
        assert_eq!(Ok(&Value::Int(10)), scopes.get("g", POS));
    }
}
