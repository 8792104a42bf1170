//! Error types for strata-view

use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum EngineError {
    #[error("Failed to open view file ({path})")]
    FileRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse view configuration ({path}) - {message}")]
    ConfigParse { path: String, message: String },

    #[error("Failed to compile section '{section}' ({path}) - {message}")]
    Compile {
        path: String,
        section: String,
        message: String,
    },

    #[error("Failed to render section '{section}' ({path}) - {message}")]
    Render {
        path: String,
        section: String,
        message: String,
    },

    #[error("Layout cycle detected at {path} (chain: {})", chain.join(" -> "))]
    LayoutCycle { path: String, chain: Vec<String> },

    #[error("Render task failed: {message}")]
    Task { message: String },
}

pub type Result<T> = std::result::Result<T, EngineError>;
