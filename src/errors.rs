// src/errors.rs

//! Crate-wide error aliases and helpers.

use thiserror::Error;

use crate::task::TaskId;

#[derive(Error, Debug)]
pub enum GavelError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Task not found: {0}")]
    TaskNotFound(TaskId),

    #[error("Task {0} cannot depend on itself")]
    SelfDependency(TaskId),

    #[error("Cycle detected in start-dependency graph: {0}")]
    DagCycle(String),

    #[error("No clients connected within the accept window")]
    NoClients,

    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub use anyhow::Error;
pub type Result<T> = std::result::Result<T, GavelError>;
