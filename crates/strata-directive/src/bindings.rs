/*
 * bindings.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! The parameter-binding list shared by every section of a template.
//!
//! A [`BindingSpec`] is assembled once, when the hosting engine reads its
//! configuration, and reused verbatim for every template built under that
//! configuration: all compiled sections of one engine share a single calling
//! convention. [`Bindings`] carries the per-call values in spec order.

use serde_json::Value;

/// Names that always open the binding list, in order.
const BASE_BINDINGS: [&str; 3] = ["layout", "model", "locals"];

/// The ordered list of binding names a section may reference.
#[derive(Debug, Clone)]
pub struct BindingSpec {
    names: Vec<String>,
}

impl BindingSpec {
    /// Build the spec: `layout, model, locals`, then the extras in
    /// construction order (view data names first, then shortcut names).
    pub fn with_extras(extras: impl IntoIterator<Item = String>) -> Self {
        let mut names: Vec<String> = BASE_BINDINGS.iter().map(|n| n.to_string()).collect();
        for name in extras {
            if !names.iter().any(|existing| *existing == name) {
                names.push(name);
            }
        }
        Self { names }
    }

    /// Binding names in spec order.
    pub fn names(&self) -> &[String] {
        &self.names
    }

    /// Whether `name` is a recognized binding root.
    pub fn contains(&self, name: &str) -> bool {
        self.names.iter().any(|n| n == name)
    }
}

impl Default for BindingSpec {
    fn default() -> Self {
        Self::with_extras(std::iter::empty())
    }
}

/// Per-call binding values, pushed in spec order and resolved by name.
#[derive(Debug, Clone, Default)]
pub struct Bindings {
    entries: Vec<(String, Value)>,
}

impl Bindings {
    /// Create an empty binding list.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a binding. Order must follow the spec the sections were
    /// compiled against.
    pub fn push(&mut self, name: impl Into<String>, value: Value) {
        self.entries.push((name.into(), value));
    }

    /// Look up a binding value by name.
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.entries
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_base_bindings_first() {
        let spec = BindingSpec::with_extras(["site".to_string(), "t".to_string()]);
        assert_eq!(spec.names(), &["layout", "model", "locals", "site", "t"]);
        assert!(spec.contains("model"));
        assert!(spec.contains("site"));
        assert!(!spec.contains("partial"));
    }

    #[test]
    fn test_duplicate_extras_collapse() {
        let spec = BindingSpec::with_extras(["site".to_string(), "site".to_string()]);
        assert_eq!(spec.names(), &["layout", "model", "locals", "site"]);
    }

    #[test]
    fn test_bindings_lookup() {
        let mut bindings = Bindings::new();
        bindings.push("layout", json!({}));
        bindings.push("model", json!({ "x": 1 }));
        assert_eq!(bindings.get("model"), Some(&json!({ "x": 1 })));
        assert!(bindings.get("missing").is_none());
    }
}
