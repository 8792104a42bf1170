/*
 * parser.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! Section compilation.
//!
//! A section is scanned with the generic directive pattern; each match is
//! classified against the specific patterns of the [`DirectiveSyntax`] table
//! and parsed into [`Node`]s, with a frame stack handling nested conditional
//! and iteration blocks. Embedded expressions go through a small recursive-
//! descent parser, and every reference root is validated against the
//! [`BindingSpec`] so that typos surface at build time, not render time.

use crate::ast::{CondBranch, Expr, Node};
use crate::bindings::BindingSpec;
use crate::error::{DirectiveError, DirectiveResult};
use crate::syntax::DirectiveSyntax;

/// A compiled section ready for evaluation.
///
/// Holds no external state; safe to invoke repeatedly with different
/// bindings.
#[derive(Debug, Clone)]
pub struct CompiledSection {
    nodes: Vec<Node>,
}

impl CompiledSection {
    /// Compile a section from source text.
    ///
    /// Stray define markers are dropped (the section splitter owns them),
    /// directives are parsed into an AST, and all reference roots are
    /// checked against `spec`.
    pub fn compile(
        source: &str,
        syntax: &DirectiveSyntax,
        spec: &BindingSpec,
    ) -> DirectiveResult<Self> {
        let source = syntax.define.replace_all(source, "");

        let mut stack: Vec<Frame> = vec![Frame::root()];
        let mut cursor = 0;
        for m in syntax.evaluate.find_iter(&source) {
            if m.start() > cursor {
                push_node(&mut stack, Node::Literal(source[cursor..m.start()].to_string()));
            }
            cursor = m.end();
            handle_directive(m.as_str(), syntax, &mut stack)?;
        }
        if cursor < source.len() {
            push_node(&mut stack, Node::Literal(source[cursor..].to_string()));
        }

        if stack.len() != 1 {
            return Err(parse_err("unclosed conditional or iteration directive"));
        }
        let nodes = match stack.pop() {
            Some(Frame::Root { nodes }) => nodes,
            _ => Vec::new(),
        };

        validate_nodes(&nodes, spec, &mut Vec::new())?;
        Ok(CompiledSection { nodes })
    }

    pub(crate) fn nodes(&self) -> &[Node] {
        &self.nodes
    }
}

/// Open block being collected during the scan.
enum Frame {
    Root {
        nodes: Vec<Node>,
    },
    Conditional {
        branches: Vec<CondBranch>,
        condition: Option<Expr>,
        body: Vec<Node>,
    },
    Iterate {
        list: Expr,
        var: String,
        index: Option<String>,
        body: Vec<Node>,
    },
}

impl Frame {
    fn root() -> Self {
        Frame::Root { nodes: Vec::new() }
    }
}

fn push_node(stack: &mut Vec<Frame>, node: Node) {
    match stack.last_mut() {
        Some(Frame::Root { nodes }) => nodes.push(node),
        Some(Frame::Conditional { body, .. }) | Some(Frame::Iterate { body, .. }) => {
            body.push(node)
        }
        None => {}
    }
}

fn parse_err(message: impl Into<String>) -> DirectiveError {
    DirectiveError::Parse {
        message: message.into(),
    }
}

fn cap_str<'t>(caps: &regex::Captures<'t>, i: usize) -> &'t str {
    caps.get(i).map_or("", |m| m.as_str())
}

/// Classify one directive token and fold it into the frame stack.
fn handle_directive(
    token: &str,
    syntax: &DirectiveSyntax,
    stack: &mut Vec<Frame>,
) -> DirectiveResult<()> {
    if let Some(caps) = syntax.interpolate.captures(token) {
        let expr = parse_expr(cap_str(&caps, 1))?;
        push_node(stack, Node::Interpolate { expr, encode: false });
        return Ok(());
    }

    if let Some(caps) = syntax.encode.captures(token) {
        let expr = parse_expr(cap_str(&caps, 1))?;
        push_node(stack, Node::Interpolate { expr, encode: true });
        return Ok(());
    }

    // Legacy helper access renders like a raw interpolation.
    if let Some(caps) = syntax.use_helper.captures(token) {
        let expr = parse_expr(cap_str(&caps, 1))?;
        push_node(stack, Node::Interpolate { expr, encode: false });
        return Ok(());
    }

    if let Some(caps) = syntax.conditional.captures(token) {
        let is_else = caps.get(1).is_some();
        let expr_src = cap_str(&caps, 2).trim();
        if is_else {
            // `[[?? expr ]]` else-if, `[[??]]` else
            let next = if expr_src.is_empty() {
                None
            } else {
                Some(parse_expr(expr_src)?)
            };
            match stack.last_mut() {
                Some(Frame::Conditional {
                    branches,
                    condition,
                    body,
                }) => {
                    branches.push(CondBranch {
                        condition: condition.take(),
                        body: std::mem::take(body),
                    });
                    *condition = next;
                }
                _ => return Err(parse_err("'[[??' outside of a conditional block")),
            }
        } else if !expr_src.is_empty() {
            // `[[? expr ]]` opens a chain
            stack.push(Frame::Conditional {
                branches: Vec::new(),
                condition: Some(parse_expr(expr_src)?),
                body: Vec::new(),
            });
        } else {
            // `[[?]]` closes it
            match stack.pop() {
                Some(Frame::Conditional {
                    mut branches,
                    condition,
                    body,
                }) => {
                    branches.push(CondBranch { condition, body });
                    push_node(stack, Node::Conditional { branches });
                }
                other => {
                    if let Some(frame) = other {
                        stack.push(frame);
                    }
                    return Err(parse_err("'[[?]]' without an open conditional"));
                }
            }
        }
        return Ok(());
    }

    if let Some(caps) = syntax.iterate.captures(token) {
        match caps.get(1) {
            Some(list) => {
                let list = parse_expr(list.as_str())?;
                let var = cap_str(&caps, 2).to_string();
                let index = caps.get(3).map(|m| m.as_str().to_string());
                stack.push(Frame::Iterate {
                    list,
                    var,
                    index,
                    body: Vec::new(),
                });
            }
            None => match stack.pop() {
                Some(Frame::Iterate {
                    list,
                    var,
                    index,
                    body,
                }) => push_node(
                    stack,
                    Node::Iterate {
                        list,
                        var,
                        index,
                        body,
                    },
                ),
                other => {
                    if let Some(frame) = other {
                        stack.push(frame);
                    }
                    return Err(parse_err("'[[~]]' without an open iteration"));
                }
            },
        }
        return Ok(());
    }

    // Bare `[[ expr ]]` evaluation
    if let Some(caps) = syntax.evaluate.captures(token) {
        let src = cap_str(&caps, 1).trim();
        if src.is_empty() {
            return Err(parse_err("empty directive"));
        }
        let expr = parse_expr(src)?;
        push_node(stack, Node::Evaluate { expr });
        return Ok(());
    }

    Err(parse_err(format!("unrecognized directive '{token}'")))
}

/// Parse a complete expression from directive text.
fn parse_expr(src: &str) -> DirectiveResult<Expr> {
    let mut parser = ExprParser { src, pos: 0 };
    let expr = parser.expression()?;
    parser.skip_ws();
    if parser.pos < parser.src.len() {
        return Err(parser.error("unexpected trailing input"));
    }
    Ok(expr)
}

struct ExprParser<'a> {
    src: &'a str,
    pos: usize,
}

impl ExprParser<'_> {
    fn error(&self, message: &str) -> DirectiveError {
        parse_err(format!("{message} in expression '{}'", self.src.trim()))
    }

    fn peek(&self) -> Option<char> {
        self.src[self.pos..].chars().next()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += c.len_utf8();
        Some(c)
    }

    fn skip_ws(&mut self) {
        while self.peek().is_some_and(|c| c.is_whitespace()) {
            self.bump();
        }
    }

    fn eat(&mut self, c: char) -> bool {
        if self.peek() == Some(c) {
            self.bump();
            true
        } else {
            false
        }
    }

    fn expect(&mut self, c: char) -> DirectiveResult<()> {
        if self.eat(c) {
            Ok(())
        } else {
            Err(self.error(&format!("expected '{c}'")))
        }
    }

    fn expression(&mut self) -> DirectiveResult<Expr> {
        self.skip_ws();
        if self.eat('!') {
            return Ok(Expr::Not(Box::new(self.expression()?)));
        }
        self.primary()
    }

    fn primary(&mut self) -> DirectiveResult<Expr> {
        self.skip_ws();
        match self.peek() {
            Some('\'') | Some('"') => Ok(Expr::Str(self.string_literal()?)),
            Some('{') => self.object(),
            Some(c) if c.is_ascii_digit() || c == '-' => self.number(),
            Some(c) if is_ident_start(c) => self.reference(),
            Some(c) => Err(self.error(&format!("unexpected character '{c}'"))),
            None => Err(self.error("unexpected end of expression")),
        }
    }

    fn string_literal(&mut self) -> DirectiveResult<String> {
        let quote = match self.bump() {
            Some(q) => q,
            None => return Err(self.error("unexpected end of expression")),
        };
        let mut out = String::new();
        loop {
            match self.bump() {
                Some(c) if c == quote => return Ok(out),
                Some('\\') => match self.bump() {
                    Some(escaped) => out.push(escaped),
                    None => return Err(self.error("unterminated string literal")),
                },
                Some(c) => out.push(c),
                None => return Err(self.error("unterminated string literal")),
            }
        }
    }

    fn number(&mut self) -> DirectiveResult<Expr> {
        let start = self.pos;
        if self.peek() == Some('-') {
            self.bump();
        }
        while self.peek().is_some_and(|c| c.is_ascii_digit() || c == '.') {
            self.bump();
        }
        self.src[start..self.pos]
            .parse::<f64>()
            .map(Expr::Num)
            .map_err(|_| self.error("invalid number literal"))
    }

    fn ident(&mut self) -> DirectiveResult<String> {
        self.skip_ws();
        let start = self.pos;
        if !self.peek().is_some_and(is_ident_start) {
            return Err(self.error("expected an identifier"));
        }
        while self.peek().is_some_and(is_ident_continue) {
            self.bump();
        }
        Ok(self.src[start..self.pos].to_string())
    }

    fn reference(&mut self) -> DirectiveResult<Expr> {
        let first = self.ident()?;
        match first.as_str() {
            "true" => return Ok(Expr::Bool(true)),
            "false" => return Ok(Expr::Bool(false)),
            "null" => return Ok(Expr::Null),
            _ => {}
        }

        let mut path = vec![first];
        while self.eat('.') {
            path.push(self.ident()?);
        }

        self.skip_ws();
        if self.eat('(') {
            let mut args = Vec::new();
            self.skip_ws();
            if !self.eat(')') {
                loop {
                    args.push(self.expression()?);
                    self.skip_ws();
                    if self.eat(')') {
                        break;
                    }
                    self.expect(',')?;
                }
            }
            return Ok(Expr::Call { target: path, args });
        }
        Ok(Expr::Ref(path))
    }

    fn object(&mut self) -> DirectiveResult<Expr> {
        self.expect('{')?;
        let mut entries = Vec::new();
        self.skip_ws();
        if self.eat('}') {
            return Ok(Expr::Object(entries));
        }
        loop {
            self.skip_ws();
            let key = match self.peek() {
                Some('\'') | Some('"') => self.string_literal()?,
                _ => self.ident()?,
            };
            self.skip_ws();
            self.expect(':')?;
            entries.push((key, self.expression()?));
            self.skip_ws();
            if self.eat('}') {
                break;
            }
            self.expect(',')?;
        }
        Ok(Expr::Object(entries))
    }
}

fn is_ident_start(c: char) -> bool {
    c.is_ascii_alphabetic() || c == '_' || c == '$'
}

fn is_ident_continue(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_' || c == '$'
}

/// Check every reference root against the binding spec, tracking loop
/// variables as they come into scope.
fn validate_nodes(
    nodes: &[Node],
    spec: &BindingSpec,
    locals: &mut Vec<String>,
) -> DirectiveResult<()> {
    for node in nodes {
        match node {
            Node::Literal(_) => {}
            Node::Interpolate { expr, .. } | Node::Evaluate { expr } => {
                validate_expr(expr, spec, locals)?
            }
            Node::Conditional { branches } => {
                for branch in branches {
                    if let Some(condition) = &branch.condition {
                        validate_expr(condition, spec, locals)?;
                    }
                    validate_nodes(&branch.body, spec, locals)?;
                }
            }
            Node::Iterate {
                list,
                var,
                index,
                body,
            } => {
                validate_expr(list, spec, locals)?;
                locals.push(var.clone());
                if let Some(index) = index {
                    locals.push(index.clone());
                }
                let result = validate_nodes(body, spec, locals);
                if index.is_some() {
                    locals.pop();
                }
                locals.pop();
                result?;
            }
        }
    }
    Ok(())
}

fn validate_expr(expr: &Expr, spec: &BindingSpec, locals: &[String]) -> DirectiveResult<()> {
    match expr {
        Expr::Str(_) | Expr::Num(_) | Expr::Bool(_) | Expr::Null => Ok(()),
        Expr::Not(inner) => validate_expr(inner, spec, locals),
        Expr::Object(entries) => {
            for (_, value) in entries {
                validate_expr(value, spec, locals)?;
            }
            Ok(())
        }
        Expr::Ref(path) => {
            let root = path[0].as_str();
            if root == "partial" || root == "def" {
                return Err(parse_err(format!(
                    "'{root}' can only be called, not referenced"
                )));
            }
            if locals.iter().any(|l| l == root) || spec.contains(root) {
                Ok(())
            } else {
                Err(parse_err(format!("unknown binding '{root}'")))
            }
        }
        Expr::Call { target, args } => {
            let is_partial = target.len() == 1 && target[0] == "partial";
            let is_legacy = target.len() == 2 && target[0] == "def" && target[1] == "partial";
            if !is_partial && !is_legacy {
                return Err(parse_err(format!(
                    "unknown function '{}'",
                    target.join(".")
                )));
            }
            if args.is_empty() || args.len() > 2 {
                return Err(parse_err(
                    "partial takes a path and optional extra data".to_string(),
                ));
            }
            for arg in args {
                validate_expr(arg, spec, locals)?;
            }
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn compile(source: &str) -> DirectiveResult<CompiledSection> {
        CompiledSection::compile(source, &DirectiveSyntax::default(), &BindingSpec::default())
    }

    #[test]
    fn test_compile_literal() {
        let section = compile("Hello, World!").unwrap();
        assert_eq!(
            section.nodes(),
            &[Node::Literal("Hello, World!".to_string())]
        );
    }

    #[test]
    fn test_compile_interpolation() {
        let section = compile("hi [[= model.test ]]").unwrap();
        assert_eq!(section.nodes().len(), 2);
        match &section.nodes()[1] {
            Node::Interpolate { expr, encode } => {
                assert!(!encode);
                assert_eq!(
                    expr,
                    &Expr::Ref(vec!["model".to_string(), "test".to_string()])
                );
            }
            other => panic!("expected interpolation, got {other:?}"),
        }
    }

    #[test]
    fn test_compile_encode() {
        let section = compile("[[! model.html ]]").unwrap();
        match &section.nodes()[0] {
            Node::Interpolate { encode, .. } => assert!(encode),
            other => panic!("expected interpolation, got {other:?}"),
        }
    }

    #[test]
    fn test_compile_conditional_chain() {
        let section = compile("[[? model.a]]A[[?? model.b]]B[[??]]C[[?]]").unwrap();
        match &section.nodes()[0] {
            Node::Conditional { branches } => {
                assert_eq!(branches.len(), 3);
                assert!(branches[0].condition.is_some());
                assert!(branches[1].condition.is_some());
                assert!(branches[2].condition.is_none());
            }
            other => panic!("expected conditional, got {other:?}"),
        }
    }

    #[test]
    fn test_compile_iteration() {
        let section = compile("[[~ model.items :item:i ]]([[=item]] [[=i]])[[~]]").unwrap();
        match &section.nodes()[0] {
            Node::Iterate {
                var, index, body, ..
            } => {
                assert_eq!(var, "item");
                assert_eq!(index.as_deref(), Some("i"));
                assert!(!body.is_empty());
            }
            other => panic!("expected iteration, got {other:?}"),
        }
    }

    #[test]
    fn test_compile_partial_call_shapes() {
        compile("[[= partial('p.dot') ]]").unwrap();
        compile("[[= partial('p.dot', { other: model.x }) ]]").unwrap();
        compile("[[# def.partial('p.dot') ]]").unwrap();
    }

    #[test]
    fn test_unknown_binding_rejected() {
        let err = compile("[[= mdel.test ]]").unwrap_err();
        assert!(err.to_string().contains("unknown binding 'mdel'"));
    }

    #[test]
    fn test_unknown_function_rejected() {
        let err = compile("[[= include('p.dot') ]]").unwrap_err();
        assert!(err.to_string().contains("unknown function 'include'"));
    }

    #[test]
    fn test_unclosed_conditional_rejected() {
        let err = compile("[[? model.a]]never closed").unwrap_err();
        assert!(err.to_string().contains("unclosed"));
    }

    #[test]
    fn test_stray_close_rejected() {
        assert!(compile("text [[?]]").is_err());
        assert!(compile("text [[~]]").is_err());
    }

    #[test]
    fn test_stray_define_markers_dropped() {
        let section = compile("a[[##section:ignored#]]b").unwrap();
        assert_eq!(section.nodes(), &[Node::Literal("ab".to_string())]);
    }

    #[test]
    fn test_loop_variable_in_scope() {
        compile("[[~ model.items :item ]][[= item.name ]][[~]]").unwrap();
        let err = compile("[[~ model.items :item ]][[~]][[= item ]]").unwrap_err();
        assert!(err.to_string().contains("unknown binding 'item'"));
    }

    #[test]
    fn test_expression_literals() {
        compile("[[= 'quoted' ]]").unwrap();
        compile("[[= 42 ]]").unwrap();
        compile("[[= true ]]").unwrap();
        compile("[[= !model.flag ]]").unwrap();
    }

    #[test]
    fn test_trailing_garbage_rejected() {
        let err = compile("[[= model.a model.b ]]").unwrap_err();
        assert!(err.to_string().contains("trailing"));
    }
}
