/*
 * ast.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! AST for compiled sections.

/// An expression embedded in a directive.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// A string literal: `'text'` or `"text"`.
    Str(String),

    /// A numeric literal.
    Num(f64),

    /// A boolean literal.
    Bool(bool),

    /// The `null` literal.
    Null,

    /// A dotted reference; the first segment is a binding or loop variable.
    Ref(Vec<String>),

    /// Logical negation: `!expr`.
    Not(Box<Expr>),

    /// An object literal: `{ key: expr, ... }`.
    Object(Vec<(String, Expr)>),

    /// A call; the only recognized targets are `partial` and the legacy
    /// `def.partial`, both feeding one partial-resolution routine.
    Call { target: Vec<String>, args: Vec<Expr> },
}

/// One branch of a conditional chain. `condition: None` is the else branch.
#[derive(Debug, Clone, PartialEq)]
pub struct CondBranch {
    pub condition: Option<Expr>,
    pub body: Vec<Node>,
}

/// A node of a compiled section.
#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    /// Plain text between directives.
    Literal(String),

    /// Interpolation, optionally HTML-encoded.
    Interpolate { expr: Expr, encode: bool },

    /// Bare evaluation: the expression runs, the result is discarded.
    Evaluate { expr: Expr },

    /// A conditional chain; branches are tried in order.
    Conditional { branches: Vec<CondBranch> },

    /// Iteration over a list value.
    Iterate {
        list: Expr,
        var: String,
        index: Option<String>,
        body: Vec<Node>,
    },
}
