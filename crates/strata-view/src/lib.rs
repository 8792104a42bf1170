//! Layout-composing view engine with template caching.
//!
//! Views are template files with optional YAML front matter. A view that
//! declares a `layout` is split into named sections; rendering evaluates
//! the sections, then hands the results up to the master view, recursively,
//! until a layout-less master emits the final page. Partials are rendered
//! inline through the same pipeline.
//!
//! # Architecture
//!
//! - [`EngineSettings`] - per-application configuration, fixed at startup
//! - [`Engine`] - the render pipeline; owns the [`TemplateCache`]
//! - [`Template`] - one built view: config, sections, optional master path
//!
//! # Example
//!
//! ```ignore
//! use serde_json::json;
//! use strata_view::{Engine, EngineSettings};
//!
//! let engine = Engine::new(EngineSettings::new("views"));
//! let html = engine.render_sync("views/index.dot", &json!({
//!     "title": "Home",
//!     "cache": true,
//! }))?;
//! ```

pub mod cache;
pub mod engine;
pub mod error;
pub mod frontmatter;
pub mod sections;
pub mod settings;
pub mod template;

// Re-export commonly used types
pub use cache::TemplateCache;
pub use engine::Engine;
pub use error::{EngineError, Result};
pub use settings::EngineSettings;
pub use template::Template;
