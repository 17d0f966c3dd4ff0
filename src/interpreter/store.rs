use std::collections::HashMap;

/// Value held by a declared variable
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Slot {
    Unset,
    Int(i64),
}

/// Variables of a single interpreter run
#[derive(Debug, Default, Clone)]
pub struct VariableStore {
    vars: HashMap<String, Slot>,
}

impl VariableStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare `name` without a value. Re-declaring clears the old value.
    pub fn declare(&mut self, name: &str) {
        self.vars.insert(name.to_string(), Slot::Unset);
    }

    pub fn set(&mut self, name: &str, value: i64) {
        self.vars.insert(name.to_string(), Slot::Int(value));
    }

    pub fn get(&self, name: &str) -> Option<Slot> {
        self.vars.get(name).copied()
    }

    /// Integer value of `name`, if it has one
    pub fn value(&self, name: &str) -> Option<i64> {
        match self.get(name) {
            Some(Slot::Int(n)) => Some(n),
            _ => None,
        }
    }

    pub fn len(&self) -> usize {
        self.vars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vars.is_empty()
    }
}

/// Word characters as the command grammar understands them
pub fn is_word_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}
