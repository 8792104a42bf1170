/*
 * syntax.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! The directive marker table.
//!
//! Every directive form is recognized by a regular expression, and the whole
//! table is a value so a host can swap delimiters without touching the
//! compiler. The default is the bracket syntax (`[[= ... ]]` and friends).

use regex::Regex;

/// Regex table describing the directive syntax of a template dialect.
///
/// `evaluate` doubles as the generic scanner: it matches every bracketed
/// directive, and the more specific patterns classify each match. `define`
/// is consumed by the section splitter, not by the compiler; the compiler
/// only drops stray define markers.
#[derive(Debug, Clone)]
pub struct DirectiveSyntax {
    /// Generic directive / bare evaluation: `[[ expr ]]`.
    pub evaluate: Regex,
    /// Interpolation: `[[= expr ]]`.
    pub interpolate: Regex,
    /// HTML-encoded interpolation: `[[! expr ]]`.
    pub encode: Regex,
    /// Legacy helper access: `[[# def.partial('path') ]]`.
    pub use_helper: Regex,
    /// Section definition: `[[## name : content #]]` or `[[## name = content #]]`.
    pub define: Regex,
    /// Conditional open/else-if/else/close: `[[? e]]`, `[[?? e]]`, `[[??]]`, `[[?]]`.
    pub conditional: Regex,
    /// Iteration open/close: `[[~ list :item ]]`, `[[~ list :item:index ]]`, `[[~]]`.
    pub iterate: Regex,
}

impl Default for DirectiveSyntax {
    fn default() -> Self {
        Self {
            evaluate: Regex::new(r"\[\[([\s\S]+?)\]\]").expect("valid evaluate pattern"),
            interpolate: Regex::new(r"\[\[=([\s\S]+?)\]\]").expect("valid interpolate pattern"),
            encode: Regex::new(r"\[\[!([\s\S]+?)\]\]").expect("valid encode pattern"),
            use_helper: Regex::new(r"\[\[#([\s\S]+?)\]\]").expect("valid use pattern"),
            define: Regex::new(r"\[\[##\s*([\w.$]+)\s*(:|=)([\s\S]+?)#\]\]")
                .expect("valid define pattern"),
            conditional: Regex::new(r"\[\[\?(\?)?\s*([\s\S]*?)\s*\]\]")
                .expect("valid conditional pattern"),
            iterate: Regex::new(
                r"\[\[~\s*(?:\]\]|([\s\S]+?)\s*:\s*([\w$]+)\s*(?::\s*([\w$]+))?\s*\]\])",
            )
            .expect("valid iterate pattern"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_define_captures() {
        let syntax = DirectiveSyntax::default();
        let caps = syntax
            .define
            .captures("[[##section:test-child#]]")
            .expect("define should match");
        assert_eq!(&caps[1], "section");
        assert_eq!(&caps[2], ":");
        assert_eq!(&caps[3], "test-child");
    }

    #[test]
    fn test_define_assignment_variant() {
        let syntax = DirectiveSyntax::default();
        let caps = syntax
            .define
            .captures("[[## title = Home page #]]")
            .expect("define should match");
        assert_eq!(&caps[1], "title");
        assert_eq!(&caps[2], "=");
        assert_eq!(caps[3].trim(), "Home page");
    }

    #[test]
    fn test_conditional_shapes() {
        let syntax = DirectiveSyntax::default();

        let open = syntax.conditional.captures("[[? model.ok ]]").unwrap();
        assert!(open.get(1).is_none());
        assert_eq!(&open[2], "model.ok");

        let elseif = syntax.conditional.captures("[[?? model.alt ]]").unwrap();
        assert!(elseif.get(1).is_some());
        assert_eq!(&elseif[2], "model.alt");

        let else_marker = syntax.conditional.captures("[[??]]").unwrap();
        assert!(else_marker.get(1).is_some());
        assert_eq!(&else_marker[2], "");

        let close = syntax.conditional.captures("[[?]]").unwrap();
        assert!(close.get(1).is_none());
        assert_eq!(&close[2], "");
    }

    #[test]
    fn test_iterate_shapes() {
        let syntax = DirectiveSyntax::default();

        let open = syntax
            .iterate
            .captures("[[~ model.items :item ]]")
            .unwrap();
        assert_eq!(open.get(1).unwrap().as_str(), "model.items");
        assert_eq!(open.get(2).unwrap().as_str(), "item");
        assert!(open.get(3).is_none());

        let indexed = syntax.iterate.captures("[[~ model.items :it:i ]]").unwrap();
        assert_eq!(indexed.get(3).unwrap().as_str(), "i");

        let close = syntax.iterate.captures("[[~]]").unwrap();
        assert!(close.get(1).is_none());
    }
}
