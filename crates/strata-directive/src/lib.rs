/*
 * lib.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! Expression-directive compiler for the Strata view engine.
//!
//! This crate turns the source text of one template section into a
//! [`CompiledSection`]: a pure function of an ordered parameter-binding list
//! that produces a string. It supports:
//!
//! - Interpolation: `[[= model.name ]]`
//! - HTML-encoded interpolation: `[[! model.html ]]`
//! - Conditionals: `[[? cond ]]...[[?? other ]]...[[??]]...[[?]]`
//! - Iteration: `[[~ model.items :item ]]...[[~]]` (optional `:item:index`)
//! - Partials: `[[= partial('path') ]]` and `[[= partial('path', { ... }) ]]`
//! - Legacy helper partials: `[[# def.partial('path') ]]` (deprecated)
//! - Bare evaluation: `[[ expr ]]` (result discarded)
//!
//! # Architecture
//!
//! The compiler is **independent of the composition engine**. It receives a
//! section's source text, a [`DirectiveSyntax`] table, and a [`BindingSpec`]
//! naming the calling convention; rendering receives [`Bindings`] in that
//! convention plus a [`PartialHandler`] capability. How paths are resolved,
//! cached, and composed into layouts is the engine's concern, not ours.
//!
//! # Example
//!
//! ```ignore
//! use strata_directive::{BindingSpec, Bindings, CompiledSection, DirectiveSyntax, NullPartials};
//!
//! let spec = BindingSpec::default();
//! let section = CompiledSection::compile("hi [[= model.name ]]", &DirectiveSyntax::default(), &spec)?;
//!
//! let mut bindings = Bindings::new();
//! bindings.push("layout", serde_json::json!({}));
//! bindings.push("model", serde_json::json!({ "name": "World" }));
//! bindings.push("locals", serde_json::json!({}));
//!
//! assert_eq!(section.render(&bindings, &NullPartials)?, "hi World");
//! ```

pub mod ast;
pub mod bindings;
pub mod error;
pub mod evaluator;
pub mod parser;
pub mod syntax;

// Re-export main types at crate root
pub use ast::{CondBranch, Expr, Node};
pub use bindings::{BindingSpec, Bindings};
pub use error::{DirectiveError, DirectiveResult};
pub use evaluator::{NullPartials, PartialHandler};
pub use parser::CompiledSection;
pub use syntax::DirectiveSyntax;
