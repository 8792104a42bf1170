/*
 * error.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! Error types for section compilation and evaluation.

use thiserror::Error;

/// Errors that can occur while compiling or evaluating a section.
#[derive(Debug, Error)]
pub enum DirectiveError {
    /// Error parsing the directive syntax or an embedded expression.
    #[error("parse error: {message}")]
    Parse { message: String },

    /// Error evaluating a compiled section.
    #[error("evaluation error: {message}")]
    Eval { message: String },
}

/// Result type for directive operations.
pub type DirectiveResult<T> = Result<T, DirectiveError>;
