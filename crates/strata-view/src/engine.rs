/*
 * engine.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! The render pipeline.
//!
//! An [`Engine`] owns the settings, the binding list, and the template
//! cache for one application. It is cheap to clone; clones share the cache.
//!
//! Rendering a view walks its layout chain bottom-up: every section of the
//! child is evaluated into a fresh layout model, then the master is rendered
//! with that model as its `layout` binding. The chain of entered views is
//! tracked so a layout that reaches itself fails fast instead of recursing.
//! The async entry points run the same synchronous pipeline on the blocking
//! pool.

use std::path::Path;
use std::sync::Arc;

use serde_json::{Map, Value};
use strata_directive::{BindingSpec, Bindings, DirectiveError, PartialHandler};

use crate::cache::TemplateCache;
use crate::error::{EngineError, Result};
use crate::sections::BODY_SECTION;
use crate::settings::EngineSettings;
use crate::template::Template;

#[derive(Debug, Clone)]
pub struct Engine {
    settings: Arc<EngineSettings>,
    spec: Arc<BindingSpec>,
    cache: TemplateCache,
}

impl Engine {
    /// Build an engine. The binding list is assembled here, once, from the
    /// standard names plus the settings' view data and shortcuts.
    pub fn new(settings: EngineSettings) -> Self {
        let spec = BindingSpec::with_extras(settings.extra_binding_names());
        Self {
            settings: Arc::new(settings),
            spec: Arc::new(spec),
            cache: TemplateCache::new(),
        }
    }

    pub fn settings(&self) -> &EngineSettings {
        &self.settings
    }

    pub fn cache(&self) -> &TemplateCache {
        &self.cache
    }

    /// Render the view at `path` with `model`.
    ///
    /// Caching is governed by a boolean `cache` key in the model, the same
    /// contract hosting frameworks use for their view options.
    pub fn render_sync(&self, path: impl AsRef<Path>, model: &Value) -> Result<String> {
        let path = path.as_ref();
        let use_cache = cache_flag(model);
        tracing::debug!(target: "strata::render", path = %path.display(), use_cache, "render");

        let template = self.template_for(path, use_cache)?;
        self.render_template(
            &template,
            Value::Object(Map::new()),
            model,
            false,
            &mut Vec::new(),
            use_cache,
        )
    }

    /// Async form of [`Engine::render_sync`], identical output.
    pub async fn render(&self, path: impl AsRef<Path>, model: &Value) -> Result<String> {
        let engine = self.clone();
        let path = path.as_ref().to_path_buf();
        let model = model.clone();
        tokio::task::spawn_blocking(move || engine.render_sync(&path, &model))
            .await
            .map_err(|e| EngineError::Task {
                message: e.to_string(),
            })?
    }

    /// Render template source directly, without a file and without caching.
    /// Relative masters and partials resolve against the views directory.
    pub fn render_string_sync(&self, source: &str, model: &Value) -> Result<String> {
        let template = Template::build(source, None, &self.settings, &self.spec)?;
        self.render_template(
            &template,
            Value::Object(Map::new()),
            model,
            false,
            &mut Vec::new(),
            false,
        )
    }

    /// Async form of [`Engine::render_string_sync`].
    pub async fn render_string(&self, source: &str, model: &Value) -> Result<String> {
        let engine = self.clone();
        let source = source.to_string();
        let model = model.clone();
        tokio::task::spawn_blocking(move || engine.render_string_sync(&source, &model))
            .await
            .map_err(|e| EngineError::Task {
                message: e.to_string(),
            })?
    }

    /// Fetch a built template, through the cache when enabled.
    ///
    /// Build failures cache nothing.
    fn template_for(&self, path: &Path, use_cache: bool) -> Result<Arc<Template>> {
        let key = path.display().to_string();
        if use_cache {
            if let Some(hit) = self.cache.get(&key) {
                tracing::debug!(target: "strata::cache", key = %key, "cache hit");
                return Ok(hit);
            }
            tracing::debug!(target: "strata::cache", key = %key, "cache miss");
        }

        let source = std::fs::read_to_string(path).map_err(|source| EngineError::FileRead {
            path: path.to_path_buf(),
            source,
        })?;
        let template = Arc::new(Template::build(
            &source,
            Some(path),
            &self.settings,
            &self.spec,
        )?);
        if use_cache {
            self.cache.set(key, Arc::clone(&template));
        }
        Ok(template)
    }

    /// Render one template and, recursively, its layout chain.
    ///
    /// `layout` is the layout model handed down by the child (empty for a
    /// top-level render); `chain` is the list of views entered so far.
    fn render_template(
        &self,
        template: &Template,
        layout: Value,
        model: &Value,
        is_partial: bool,
        chain: &mut Vec<String>,
        use_cache: bool,
    ) -> Result<String> {
        chain.push(template.label());

        // Seed the layout model: the template's own config, overlaid by
        // what the child handed down.
        let mut layout_model = Value::Object(template.config().clone());
        deep_merge(&mut layout_model, &layout);

        // Sections see the layout model as it grows, so a later section
        // may reference an earlier one through `layout`.
        for (name, section) in template.sections() {
            let bindings = self.assemble_bindings(&layout_model, model);
            let partials = SectionPartials {
                engine: self,
                dir: template.dir(),
                layout: layout_model.clone(),
                model,
                use_cache,
            };
            let rendered =
                section
                    .render(&bindings, &partials)
                    .map_err(|e| EngineError::Render {
                        path: template.label(),
                        section: name.clone(),
                        message: e.to_string(),
                    })?;
            if let Value::Object(map) = &mut layout_model {
                map.insert(name.clone(), Value::String(rendered));
            }
        }

        if let Some(master) = template.master() {
            let master_key = master.display().to_string();
            if chain.contains(&master_key) {
                return Err(EngineError::LayoutCycle {
                    path: master_key,
                    chain: chain.clone(),
                });
            }
            let master_template = self.template_for(master, use_cache)?;
            return self.render_template(
                &master_template,
                layout_model,
                model,
                is_partial,
                chain,
                use_cache,
            );
        }

        let body = layout_model
            .get(BODY_SECTION)
            .and_then(Value::as_str)
            .unwrap_or("");
        if is_partial {
            Ok(body.to_string())
        } else {
            Ok(format!("{}{}", self.settings.header, body))
        }
    }

    /// Per-call binding values in spec order.
    fn assemble_bindings(&self, layout_model: &Value, model: &Value) -> Bindings {
        let locals = model
            .get("_locals")
            .cloned()
            .unwrap_or_else(|| Value::Object(Map::new()));

        let mut bindings = Bindings::new();
        bindings.push("layout", layout_model.clone());
        bindings.push("model", model.clone());
        bindings.push("locals", locals.clone());
        for (name, value) in &self.settings.view_data {
            bindings.push(name.clone(), value.clone());
        }
        for (name, key) in &self.settings.shortcuts {
            bindings.push(
                name.clone(),
                locals.get(key).cloned().unwrap_or(Value::Null),
            );
        }
        bindings
    }
}

impl Default for Engine {
    fn default() -> Self {
        Self::new(EngineSettings::default())
    }
}

/// Partial dispatch for the sections of one template render.
///
/// Paths resolve against the referencing template's own directory (the
/// views directory for path-less templates); extra data is shallow-merged
/// onto a copy of the model, never onto the caller's.
struct SectionPartials<'a> {
    engine: &'a Engine,
    dir: &'a Path,
    layout: Value,
    model: &'a Value,
    use_cache: bool,
}

impl PartialHandler for SectionPartials<'_> {
    fn render_partial(
        &self,
        path: &str,
        extra: Option<&Map<String, Value>>,
    ) -> std::result::Result<String, DirectiveError> {
        let resolved = self.dir.join(path);

        let model = match extra {
            Some(extra) => {
                let mut merged = match self.model {
                    Value::Object(map) => map.clone(),
                    _ => Map::new(),
                };
                for (key, value) in extra {
                    merged.insert(key.clone(), value.clone());
                }
                Value::Object(merged)
            }
            None => self.model.clone(),
        };

        let template = self
            .engine
            .template_for(&resolved, self.use_cache)
            .map_err(to_eval)?;
        self.engine
            .render_template(
                &template,
                self.layout.clone(),
                &model,
                true,
                &mut Vec::new(),
                self.use_cache,
            )
            .map_err(to_eval)
    }
}

fn to_eval(err: EngineError) -> DirectiveError {
    DirectiveError::Eval {
        message: err.to_string(),
    }
}

fn cache_flag(model: &Value) -> bool {
    model.get("cache").and_then(Value::as_bool).unwrap_or(false)
}

/// Recursive merge of `overlay` onto `base`; non-objects replace.
fn deep_merge(base: &mut Value, overlay: &Value) {
    match (base, overlay) {
        (Value::Object(base_map), Value::Object(overlay_map)) => {
            for (key, value) in overlay_map {
                match base_map.get_mut(key) {
                    Some(slot) => deep_merge(slot, value),
                    None => {
                        base_map.insert(key.clone(), value.clone());
                    }
                }
            }
        }
        (slot, other) => *slot = other.clone(),
    }
}
