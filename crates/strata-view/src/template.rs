/*
 * template.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! Built templates.
//!
//! A [`Template`] is immutable once built: front-matter config, the optional
//! master path, and every section compiled against the engine's binding
//! list. Rendering lives in [`crate::engine`]; a template holds no model
//! data and may be shared freely between renders.

use std::path::{Path, PathBuf};

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::{Map, Value};
use strata_directive::{BindingSpec, CompiledSection};

use crate::error::{EngineError, Result};
use crate::frontmatter;
use crate::sections;
use crate::settings::EngineSettings;

static COMMENT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"<!--([\s\S]+?)-->").expect("valid comment pattern"));

#[derive(Debug)]
pub struct Template {
    /// Source file, when the template was built from one.
    path: Option<PathBuf>,
    /// Directory partials and the master resolve against.
    dir: PathBuf,
    /// Front-matter keys other than `layout`.
    config: Map<String, Value>,
    /// Resolved master path, when the front matter declared a layout.
    master: Option<PathBuf>,
    /// Compiled sections in definition order.
    sections: Vec<(String, CompiledSection)>,
}

impl Template {
    /// Build a template from source text.
    ///
    /// `path` is the source file when there is one; a path-less template
    /// resolves relative references against the views directory.
    pub fn build(
        source: &str,
        path: Option<&Path>,
        settings: &EngineSettings,
        spec: &BindingSpec,
    ) -> Result<Template> {
        let label = label_for(path);

        let fm = frontmatter::parse(source, &label)?;
        let body = if settings.strip_comments {
            COMMENT.replace_all(&fm.body, "").into_owned()
        } else {
            fm.body
        };

        let dir = path
            .and_then(Path::parent)
            .map(Path::to_path_buf)
            .unwrap_or_else(|| settings.views_dir.clone());
        let master = fm.layout.as_deref().map(|layout| dir.join(layout));

        let raw_sections = sections::split(&body, master.is_some(), &settings.syntax);
        let mut compiled = Vec::with_capacity(raw_sections.len());
        for (name, text) in raw_sections {
            let section = CompiledSection::compile(&text, &settings.syntax, spec).map_err(|e| {
                EngineError::Compile {
                    path: label.clone(),
                    section: name.clone(),
                    message: e.to_string(),
                }
            })?;
            compiled.push((name, section));
        }

        Ok(Template {
            path: path.map(Path::to_path_buf),
            dir,
            config: fm.config,
            master,
            sections: compiled,
        })
    }

    /// Path label for error messages.
    pub fn label(&self) -> String {
        label_for(self.path.as_deref())
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn config(&self) -> &Map<String, Value> {
        &self.config
    }

    pub fn master(&self) -> Option<&Path> {
        self.master.as_deref()
    }

    pub fn sections(&self) -> &[(String, CompiledSection)] {
        &self.sections
    }
}

fn label_for(path: Option<&Path>) -> String {
    path.map_or_else(|| "<string>".to_string(), |p| p.display().to_string())
}
