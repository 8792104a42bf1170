/*
 * settings.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! Engine configuration.

use std::path::PathBuf;

use serde_json::Value;
use strata_directive::DirectiveSyntax;

/// Configuration an [`crate::Engine`] is built from.
///
/// View data and shortcuts extend the binding list every section is
/// compiled against, so they are fixed at engine construction.
#[derive(Debug)]
pub struct EngineSettings {
    /// Base directory for view lookup. Partials referenced from a template
    /// built from a string (no file of its own) resolve against this.
    pub views_dir: PathBuf,
    /// Static text prepended to every non-partial render.
    pub header: String,
    /// Remove `<!-- ... -->` comments before splitting sections.
    pub strip_comments: bool,
    /// Extra named values visible to every template, in binding order.
    pub view_data: Vec<(String, Value)>,
    /// Shortcut bindings: binding name to the `_locals` key it reads.
    pub shortcuts: Vec<(String, String)>,
    /// Directive marker table.
    pub syntax: DirectiveSyntax,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            views_dir: PathBuf::from("."),
            header: String::new(),
            strip_comments: false,
            view_data: Vec::new(),
            shortcuts: Vec::new(),
            syntax: DirectiveSyntax::default(),
        }
    }
}

impl EngineSettings {
    pub fn new(views_dir: impl Into<PathBuf>) -> Self {
        Self {
            views_dir: views_dir.into(),
            ..Self::default()
        }
    }

    /// Register a named value made available to every template.
    pub fn with_view_data(mut self, name: impl Into<String>, value: Value) -> Self {
        self.view_data.push((name.into(), value));
        self
    }

    /// Register a shortcut binding resolving through the model's `_locals`.
    pub fn with_shortcut(mut self, name: impl Into<String>, locals_key: impl Into<String>) -> Self {
        self.shortcuts.push((name.into(), locals_key.into()));
        self
    }

    pub fn with_header(mut self, header: impl Into<String>) -> Self {
        self.header = header.into();
        self
    }

    pub fn with_strip_comments(mut self, strip: bool) -> Self {
        self.strip_comments = strip;
        self
    }

    /// Binding names beyond the standard three, in binding order.
    pub(crate) fn extra_binding_names(&self) -> impl Iterator<Item = String> + '_ {
        self.view_data
            .iter()
            .map(|(name, _)| name.clone())
            .chain(self.shortcuts.iter().map(|(name, _)| name.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_extra_binding_names_order() {
        let settings = EngineSettings::default()
            .with_view_data("site", json!({ "name": "s" }))
            .with_shortcut("t", "translator");
        let names: Vec<String> = settings.extra_binding_names().collect();
        assert_eq!(names, ["site", "t"]);
    }
}
