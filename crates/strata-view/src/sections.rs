/*
 * sections.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! Section extraction.
//!
//! A view that declares a layout is a bag of named sections: every
//! `[[## name : content #]]` marker contributes one, and text outside
//! markers is ignored. A view without a layout is a single `body` section,
//! markers and all.

use strata_directive::DirectiveSyntax;

/// Name of the implicit section of layout-less views, and of the section a
/// leaf render emits.
pub const BODY_SECTION: &str = "body";

/// Ordered named sections of one view.
pub type SectionList = Vec<(String, String)>;

/// Split `body` into sections.
///
/// With `has_layout`, define markers are collected in order of first
/// definition; a duplicated name keeps its first position but the last
/// content wins. Without a layout the whole text is the `body` section.
pub fn split(body: &str, has_layout: bool, syntax: &DirectiveSyntax) -> SectionList {
    if !has_layout {
        return vec![(BODY_SECTION.to_string(), body.to_string())];
    }

    let mut sections: SectionList = Vec::new();
    for captures in syntax.define.captures_iter(body) {
        let name = captures.get(1).map_or("", |g| g.as_str()).to_string();
        let content = captures.get(3).map_or("", |g| g.as_str()).to_string();
        match sections.iter_mut().find(|(n, _)| *n == name) {
            Some(entry) => entry.1 = content,
            None => sections.push((name, content)),
        }
    }
    sections
}
