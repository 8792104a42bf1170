/*
 * evaluator.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! Section evaluation.
//!
//! A compiled section is a pure function of its bindings: evaluation walks
//! the AST, resolves references against the binding list (and any loop
//! variables), and appends output to one buffer. Partial calls are delegated
//! to the [`PartialHandler`] capability supplied per render call; both the
//! `partial(...)` and the legacy `def.partial(...)` shapes feed the same
//! handler, the legacy one with a structured deprecation warning.

use serde_json::{Map, Value};

use crate::ast::{Expr, Node};
use crate::bindings::Bindings;
use crate::error::{DirectiveError, DirectiveResult};
use crate::parser::CompiledSection;

/// Capability for resolving and rendering partials.
///
/// The hosting engine implements this; the compiler has no notion of paths,
/// caches, or layouts.
pub trait PartialHandler {
    /// Render the partial at `path`, optionally shallow-merging `extra`
    /// onto a copy of the caller's model.
    fn render_partial(
        &self,
        path: &str,
        extra: Option<&Map<String, Value>>,
    ) -> DirectiveResult<String>;
}

/// Handler for contexts where partials are unavailable (direct string
/// renders in tests, for instance). Any partial call fails.
#[derive(Debug, Clone, Default)]
pub struct NullPartials;

impl PartialHandler for NullPartials {
    fn render_partial(
        &self,
        path: &str,
        _extra: Option<&Map<String, Value>>,
    ) -> DirectiveResult<String> {
        Err(DirectiveError::Eval {
            message: format!("partial '{path}' is not available in this context"),
        })
    }
}

impl CompiledSection {
    /// Evaluate this section with the given bindings.
    pub fn render(
        &self,
        bindings: &Bindings,
        partials: &dyn PartialHandler,
    ) -> DirectiveResult<String> {
        let mut scope = Scope {
            bindings,
            partials,
            locals: Vec::new(),
        };
        let mut out = String::new();
        render_nodes(self.nodes(), &mut scope, &mut out)?;
        Ok(out)
    }
}

struct Scope<'a> {
    bindings: &'a Bindings,
    partials: &'a dyn PartialHandler,
    /// Loop variables, innermost last.
    locals: Vec<(String, Value)>,
}

impl Scope<'_> {
    fn lookup(&self, root: &str) -> Option<&Value> {
        self.locals
            .iter()
            .rev()
            .find(|(name, _)| name == root)
            .map(|(_, value)| value)
            .or_else(|| self.bindings.get(root))
    }
}

fn render_nodes(nodes: &[Node], scope: &mut Scope<'_>, out: &mut String) -> DirectiveResult<()> {
    for node in nodes {
        match node {
            Node::Literal(text) => out.push_str(text),

            Node::Interpolate { expr, encode } => {
                let value = eval(expr, scope)?;
                let text = display(&value);
                if *encode {
                    html_escape(&text, out);
                } else {
                    out.push_str(&text);
                }
            }

            Node::Evaluate { expr } => {
                eval(expr, scope)?;
            }

            Node::Conditional { branches } => {
                for branch in branches {
                    let hit = match &branch.condition {
                        Some(condition) => truthy(&eval(condition, scope)?),
                        None => true,
                    };
                    if hit {
                        render_nodes(&branch.body, scope, out)?;
                        break;
                    }
                }
            }

            Node::Iterate {
                list,
                var,
                index,
                body,
            } => {
                let items = match eval(list, scope)? {
                    Value::Array(items) => items,
                    Value::Null => Vec::new(),
                    other => {
                        return Err(DirectiveError::Eval {
                            message: format!("cannot iterate over {}", type_name(&other)),
                        });
                    }
                };
                for (i, item) in items.into_iter().enumerate() {
                    scope.locals.push((var.clone(), item));
                    if let Some(index_name) = index {
                        scope.locals.push((index_name.clone(), Value::from(i)));
                    }
                    let result = render_nodes(body, scope, out);
                    if index.is_some() {
                        scope.locals.pop();
                    }
                    scope.locals.pop();
                    result?;
                }
            }
        }
    }
    Ok(())
}

fn eval(expr: &Expr, scope: &mut Scope<'_>) -> DirectiveResult<Value> {
    match expr {
        Expr::Str(s) => Ok(Value::String(s.clone())),

        Expr::Num(n) => {
            if n.fract() == 0.0 && n.abs() < i64::MAX as f64 {
                Ok(Value::Number((*n as i64).into()))
            } else {
                Ok(serde_json::Number::from_f64(*n)
                    .map(Value::Number)
                    .unwrap_or(Value::Null))
            }
        }

        Expr::Bool(b) => Ok(Value::Bool(*b)),

        Expr::Null => Ok(Value::Null),

        Expr::Not(inner) => Ok(Value::Bool(!truthy(&eval(inner, scope)?))),

        Expr::Ref(path) => {
            let root = match scope.lookup(&path[0]) {
                Some(value) => value,
                None => {
                    return Err(DirectiveError::Eval {
                        message: format!("unknown binding '{}'", path[0]),
                    });
                }
            };
            Ok(lookup_path(root, &path[1..]).cloned().unwrap_or(Value::Null))
        }

        Expr::Object(entries) => {
            let mut map = Map::new();
            for (key, value_expr) in entries {
                map.insert(key.clone(), eval(value_expr, scope)?);
            }
            Ok(Value::Object(map))
        }

        Expr::Call { target, args } => {
            // Validation guarantees target is partial or def.partial.
            if target.len() == 2 {
                tracing::warn!(
                    target: "strata::deprecation",
                    syntax = "def.partial",
                    "the def.partial helper is deprecated; use partial('path') instead"
                );
            }

            let path = match eval(&args[0], scope)? {
                Value::String(path) => path,
                other => {
                    return Err(DirectiveError::Eval {
                        message: format!(
                            "partial path must be a string, got {}",
                            type_name(&other)
                        ),
                    });
                }
            };
            let extra = match args.get(1) {
                Some(arg) => match eval(arg, scope)? {
                    Value::Object(map) => Some(map),
                    Value::Null => None,
                    other => {
                        return Err(DirectiveError::Eval {
                            message: format!(
                                "partial extra data must be an object, got {}",
                                type_name(&other)
                            ),
                        });
                    }
                },
                None => None,
            };

            scope
                .partials
                .render_partial(&path, extra.as_ref())
                .map(Value::String)
        }
    }
}

/// Walk a dotted path below a root value.
fn lookup_path<'a>(value: &'a Value, path: &[String]) -> Option<&'a Value> {
    let mut current = value;
    for segment in path {
        current = current.as_object()?.get(segment)?;
    }
    Some(current)
}

/// Render a value for output.
fn display(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        Value::String(s) => s.clone(),
        other => serde_json::to_string(other).unwrap_or_default(),
    }
}

/// Truthiness for conditional evaluation.
fn truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

fn html_escape(text: &str, out: &mut String) {
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            other => out.push(other),
        }
    }
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bindings::BindingSpec;
    use crate::syntax::DirectiveSyntax;
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use std::cell::RefCell;

    fn compile(source: &str) -> CompiledSection {
        CompiledSection::compile(source, &DirectiveSyntax::default(), &BindingSpec::default())
            .expect("section should compile")
    }

    fn bindings(model: Value) -> Bindings {
        let mut bindings = Bindings::new();
        bindings.push("layout", json!({}));
        bindings.push("model", model);
        bindings.push("locals", json!({}));
        bindings
    }

    #[test]
    fn test_interpolation() {
        let section = compile("hi [[= model.test ]]");
        let out = section
            .render(&bindings(json!({ "test": "X" })), &NullPartials)
            .unwrap();
        assert_eq!(out, "hi X");
    }

    #[test]
    fn test_missing_path_renders_empty() {
        let section = compile("a[[= model.absent.deep ]]b");
        let out = section.render(&bindings(json!({})), &NullPartials).unwrap();
        assert_eq!(out, "ab");
    }

    #[test]
    fn test_encode_escapes_html() {
        let section = compile("[[! model.html ]]");
        let out = section
            .render(&bindings(json!({ "html": "<b>&\"'</b>" })), &NullPartials)
            .unwrap();
        assert_eq!(out, "&lt;b&gt;&amp;&quot;&#39;&lt;/b&gt;");
    }

    #[test]
    fn test_conditional_branches() {
        let section = compile("[[? model.a]]A[[?? model.b]]B[[??]]C[[?]]");

        let a = section
            .render(&bindings(json!({ "a": true })), &NullPartials)
            .unwrap();
        assert_eq!(a, "A");

        let b = section
            .render(&bindings(json!({ "b": "yes" })), &NullPartials)
            .unwrap();
        assert_eq!(b, "B");

        let c = section.render(&bindings(json!({})), &NullPartials).unwrap();
        assert_eq!(c, "C");
    }

    #[test]
    fn test_iteration_with_index() {
        let section = compile("[[~ model.items :item:i ]][[=i]]:[[=item]] [[~]]");
        let out = section
            .render(&bindings(json!({ "items": ["a", "b"] })), &NullPartials)
            .unwrap();
        assert_eq!(out, "0:a 1:b ");
    }

    #[test]
    fn test_iteration_over_missing_is_empty() {
        let section = compile("x[[~ model.items :item ]][[=item]][[~]]y");
        let out = section.render(&bindings(json!({})), &NullPartials).unwrap();
        assert_eq!(out, "xy");
    }

    #[test]
    fn test_iteration_over_scalar_fails() {
        let section = compile("[[~ model.items :item ]][[=item]][[~]]");
        let err = section
            .render(&bindings(json!({ "items": 3 })), &NullPartials)
            .unwrap_err();
        assert!(err.to_string().contains("cannot iterate"));
    }

    #[test]
    fn test_display_rules() {
        let section = compile("[[= model.n ]]|[[= model.b ]]|[[= model.nil ]]|[[= model.list ]]");
        let out = section
            .render(
                &bindings(json!({ "n": 3, "b": false, "nil": null, "list": [1, 2] })),
                &NullPartials,
            )
            .unwrap();
        assert_eq!(out, "3|false||[1,2]");
    }

    /// Handler that records calls, for exercising both partial syntaxes.
    #[derive(Default)]
    struct RecordingPartials {
        calls: RefCell<Vec<(String, Option<Map<String, Value>>)>>,
    }

    impl PartialHandler for RecordingPartials {
        fn render_partial(
            &self,
            path: &str,
            extra: Option<&Map<String, Value>>,
        ) -> DirectiveResult<String> {
            self.calls
                .borrow_mut()
                .push((path.to_string(), extra.cloned()));
            Ok(format!("<{path}>"))
        }
    }

    #[test]
    fn test_partial_call() {
        let handler = RecordingPartials::default();
        let section = compile("a [[= partial('p.dot') ]] b");
        let out = section.render(&bindings(json!({})), &handler).unwrap();
        assert_eq!(out, "a <p.dot> b");
        assert_eq!(handler.calls.borrow().len(), 1);
        assert!(handler.calls.borrow()[0].1.is_none());
    }

    #[test]
    fn test_partial_with_extra_data() {
        let handler = RecordingPartials::default();
        let section = compile("[[= partial('p.dot', { other: model.x }) ]]");
        section
            .render(&bindings(json!({ "x": "E" })), &handler)
            .unwrap();
        let calls = handler.calls.borrow();
        let extra = calls[0].1.as_ref().expect("extra data expected");
        assert_eq!(extra.get("other"), Some(&json!("E")));
    }

    #[test]
    fn test_legacy_partial_feeds_same_handler() {
        let handler = RecordingPartials::default();
        let section = compile("[[# def.partial('p.dot') ]]");
        let out = section.render(&bindings(json!({})), &handler).unwrap();
        assert_eq!(out, "<p.dot>");
    }

    #[test]
    fn test_null_partials_reject_calls() {
        let section = compile("[[= partial('p.dot') ]]");
        let err = section
            .render(&bindings(json!({})), &NullPartials)
            .unwrap_err();
        assert!(err.to_string().contains("not available"));
    }
}
