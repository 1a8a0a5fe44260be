// src/errors.rs

//! Crate-wide error types.
//!
//! Configuration loading and validation return structured [`SitepipeError`]
//! variants; the orchestration layers use `anyhow` with context and convert
//! transparently via the `Other` variant.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum SitepipeError {
    #[error("configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("unknown task: {0}")]
    TaskNotFound(String),

    #[error("cycle detected in task graph involving '{0}'")]
    TaskCycle(String),

    #[error("TOML parsing error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub type Result<T> = std::result::Result<T, SitepipeError>;
