//! Error types for rendering and configuration

use std::path::PathBuf;

use boilerplate_parser::TemplateError;
use thiserror::Error;

/// Errors raised by the renderer and the configuration loader
#[derive(Debug, Error)]
pub enum Error {
    /// The template itself failed: undefined name, bad expression or bad block structure
    #[error(transparent)]
    Template(#[from] TemplateError),

    /// Reading a template or writing a destination failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Walking a template directory failed
    #[error("failed to walk template directory: {0}")]
    Walk(#[from] walkdir::Error),

    /// A configuration file line is not `key=value`
    #[error("invalid configuration at {}:{line}: {message}", path.display())]
    Config {
        path: PathBuf,
        line: usize,
        message: String,
    },
}

/// Result type for rendering operations
pub type Result<T> = std::result::Result<T, Error>;
