//! Variable environment
//!
//! Flat, insertion-ordered storage for one VM instance. There is no scoping:
//! declarations and assignments both write the same map.

use super::types::Val;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Environment {
    vars: IndexMap<String, Val>,
}

impl Environment {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, name: &str) -> Option<&Val> {
        self.vars.get(name)
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut Val> {
        self.vars.get_mut(name)
    }

    /// Bind `name`, overwriting any previous value in place (keeps its position)
    pub fn set(&mut self, name: impl Into<String>, value: Val) {
        self.vars.insert(name.into(), value);
    }

    pub fn contains(&self, name: &str) -> bool {
        self.vars.contains_key(name)
    }

    /// Independent deep copy for continuation capture
    pub fn snapshot(&self) -> Environment {
        self.clone()
    }

    pub fn clear(&mut self) {
        self.vars.clear();
    }

    pub fn len(&self) -> usize {
        self.vars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vars.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Val)> {
        self.vars.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_overwrites_and_keeps_order() {
        let mut env = Environment::new();
        env.set("a", Val::Num(1.0));
        env.set("b", Val::Num(2.0));
        env.set("a", Val::Num(3.0));

        let names: Vec<_> = env.iter().map(|(k, _)| k.as_str()).collect();
        assert_eq!(names, vec!["a", "b"]);
        assert_eq!(env.get("a"), Some(&Val::Num(3.0)));
        assert_eq!(env.len(), 2);
    }

    #[test]
    fn test_snapshot_is_independent() {
        let mut env = Environment::new();
        env.set("obj", Val::Obj(IndexMap::new()));
        let snapshot = env.snapshot();

        if let Some(Val::Obj(map)) = env.get_mut("obj") {
            map.insert("k".to_string(), Val::Bool(true));
        }
        env.set("later", Val::Null);

        assert_eq!(snapshot.get("obj"), Some(&Val::Obj(IndexMap::new())));
        assert!(!snapshot.contains("later"));
    }

    #[test]
    fn test_clear() {
        let mut env = Environment::new();
        env.set("x", Val::Null);
        env.clear();
        assert!(env.is_empty());
        assert_eq!(env.get("x"), None);
    }
}
