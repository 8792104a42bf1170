/*
 * frontmatter.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! Front-matter extraction.
//!
//! A view may open with a `---` delimited YAML block. Its keys seed the
//! layout model of the view's own render; the reserved `layout` key names
//! the master view. The block is always removed from the body before any
//! section handling.

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::{Map, Value};

use crate::error::{EngineError, Result};

static FRONT_MATTER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^---([\s\S]+?)---").expect("valid front matter pattern"));

/// Parsed front matter plus the remaining body.
#[derive(Debug)]
pub struct FrontMatter {
    /// All front-matter keys except `layout`.
    pub config: Map<String, Value>,
    /// The master view path, when declared.
    pub layout: Option<String>,
    /// Source text with the front-matter block removed.
    pub body: String,
}

/// Split `source` into front matter and body.
///
/// `path` is only used for error messages.
pub fn parse(source: &str, path: &str) -> Result<FrontMatter> {
    let Some(m) = FRONT_MATTER.captures(source) else {
        return Ok(FrontMatter {
            config: Map::new(),
            layout: None,
            body: source.to_string(),
        });
    };

    let block = m.get(1).map_or("", |g| g.as_str());
    let value: Value =
        serde_yaml::from_str(block).map_err(|e| EngineError::ConfigParse {
            path: path.to_string(),
            message: e.to_string(),
        })?;

    let mut config = match value {
        Value::Object(map) => map,
        Value::Null => Map::new(),
        _ => {
            return Err(EngineError::ConfigParse {
                path: path.to_string(),
                message: "front matter must be a key/value mapping".to_string(),
            });
        }
    };

    let layout = match config.remove("layout") {
        Some(Value::String(layout)) => Some(layout),
        Some(Value::Null) | None => None,
        Some(_) => {
            return Err(EngineError::ConfigParse {
                path: path.to_string(),
                message: "'layout' must be a string".to_string(),
            });
        }
    };

    let body = source[m.get(0).map_or(0, |g| g.end())..].to_string();
    Ok(FrontMatter {
        config,
        layout,
        body,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn test_no_front_matter() {
        let fm = parse("plain text", "v.dot").unwrap();
        assert!(fm.config.is_empty());
        assert!(fm.layout.is_none());
        assert_eq!(fm.body, "plain text");
    }

    #[test]
    fn test_layout_and_config_keys() {
        let fm = parse("---\nlayout: master.dot\ntitle: Home\n---\nbody", "v.dot").unwrap();
        assert_eq!(fm.layout.as_deref(), Some("master.dot"));
        assert_eq!(fm.config.get("title"), Some(&json!("Home")));
        assert!(!fm.config.contains_key("layout"));
        assert_eq!(fm.body, "\nbody");
    }

    #[test]
    fn test_block_stripped_without_layout() {
        let fm = parse("---\ntitle: T\n---\nrest", "v.dot").unwrap();
        assert!(fm.layout.is_none());
        assert_eq!(fm.body, "\nrest");
    }

    #[test]
    fn test_block_must_lead_the_file() {
        let fm = parse("text\n---\ntitle: T\n---\n", "v.dot").unwrap();
        assert!(fm.config.is_empty());
        assert_eq!(fm.body, "text\n---\ntitle: T\n---\n");
    }

    #[test]
    fn test_malformed_yaml_fails() {
        let err = parse("---\ntitle: [unclosed\n---\n", "v.dot").unwrap_err();
        assert!(matches!(err, EngineError::ConfigParse { .. }));
    }

    #[test]
    fn test_non_mapping_fails() {
        let err = parse("---\n- a\n- b\n---\n", "v.dot").unwrap_err();
        assert!(matches!(err, EngineError::ConfigParse { .. }));
    }
}
