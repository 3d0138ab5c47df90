//! The parameter model shared between the codecs and an editor.
//!
//! Keys keep the order in which they were first set, so a parsed
//! patch lists its parameters in message order.

use std::fmt;

use indexmap::IndexMap;

/// A parameter value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Value {
    Int(i32),
    Text(String),
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Int(v)
    }
}

impl From<u8> for Value {
    fn from(v: u8) -> Self {
        Value::Int(v as i32)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Text(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Text(s)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Value::Int(v) => write!(f, "{}", v),
            Value::Text(s) => write!(f, "\"{}\"", s),
        }
    }
}

/// Handle returned by [`Model::subscribe`].
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct ListenerId(usize);

type Listener = Box<dyn FnMut(&str, &Value) + Send>;

/// Ordered string-keyed store of patch parameters.
#[derive(Default)]
pub struct Model {
    values: IndexMap<String, Value>,
    listeners: Vec<(ListenerId, Listener)>,
    next_listener: usize,
}

impl Model {
    pub fn new() -> Self {
        Default::default()
    }

    /// Gets an integer parameter. Absent keys and text values read as 0.
    pub fn get(&self, key: &str) -> i32 {
        self.get_or(key, 0)
    }

    /// Gets an integer parameter, or `default` if it has not been set.
    pub fn get_or(&self, key: &str, default: i32) -> i32 {
        match self.value(key) {
            Some(Value::Int(v)) => *v,
            Some(Value::Text(_)) => 0,
            None => default,
        }
    }

    /// Gets a text parameter. Absent keys read as the empty string.
    pub fn get_text(&self, key: &str) -> &str {
        match self.value(key) {
            Some(Value::Text(s)) => s,
            _ => "",
        }
    }

    pub fn value(&self, key: &str) -> Option<&Value> {
        self.values.get(key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    /// Sets a parameter and notifies listeners if the value changed.
    pub fn set(&mut self, key: &str, value: impl Into<Value>) {
        let value = value.into();
        if self.values.get(key) == Some(&value) {
            return;
        }
        // Replacing an existing key keeps its position.
        let (i, _) = self.values.insert_full(key.to_string(), value);
        if let Some((key, value)) = self.values.get_index(i) {
            for (_, listener) in self.listeners.iter_mut() {
                listener(key.as_str(), value);
            }
        }
    }

    /// Keys in insertion order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.values.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Registers a change listener.
    pub fn subscribe<F>(&mut self, listener: F) -> ListenerId
    where
        F: FnMut(&str, &Value) + Send + 'static,
    {
        let id = ListenerId(self.next_listener);
        self.next_listener += 1;
        self.listeners.push((id, Box::new(listener)));
        id
    }

    /// Removes a change listener. Returns false if it was not registered.
    pub fn unsubscribe(&mut self, id: ListenerId) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|(i, _)| *i != id);
        self.listeners.len() != before
    }
}

// Listeners belong to the editor session, not to the values.
impl Clone for Model {
    fn clone(&self) -> Self {
        Model {
            values: self.values.clone(),
            listeners: Vec::new(),
            next_listener: 0,
        }
    }
}

impl fmt::Debug for Model {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_map()
            .entries(self.values.iter())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    #[test]
    fn absent_key_reads_zero() {
        let model = Model::new();
        assert_eq!(model.get("cutoff"), 0);
        assert_eq!(model.get_or("cutoff", 64), 64);
        assert_eq!(model.get_text("name"), "");
    }

    #[test]
    fn keys_keep_insertion_order() {
        let mut model = Model::new();
        model.set("name", "INIT");
        model.set("b", 2);
        model.set("a", 1);
        model.set("b", 3);
        let keys: Vec<&str> = model.keys().collect();
        assert_eq!(keys, vec!["name", "b", "a"]);
        assert_eq!(model.get("b"), 3);
        assert_eq!(model.get_text("name"), "INIT");
    }

    #[test]
    fn listeners_see_changes_only() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let mut model = Model::new();
        let sink = Arc::clone(&seen);
        let id = model.subscribe(move |k, v| sink.lock().unwrap().push((k.to_string(), v.clone())));

        model.set("level", 10);
        model.set("level", 10);
        model.set("level", 11);
        assert!(model.unsubscribe(id));
        model.set("level", 12);
        assert!(!model.unsubscribe(id));

        let seen = seen.lock().unwrap();
        assert_eq!(*seen, vec![
            ("level".to_string(), Value::Int(10)),
            ("level".to_string(), Value::Int(11)),
        ]);
    }

    #[test]
    fn clone_drops_listeners() {
        let mut model = Model::new();
        model.subscribe(|_, _| {});
        model.set("x", 1);
        let copy = model.clone();
        assert_eq!(copy.get("x"), 1);
        assert!(copy.listeners.is_empty());
    }
}
