use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Config error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// Lock acquisition or release failed (contention, timeout, infra).
    #[error("Lock error: {0}")]
    Lock(String),

    /// Building a bot's trigger context failed.
    #[error("Context build error: {0}")]
    ContextBuild(String),

    /// A `when`/`condition` expression failed to compile or evaluate.
    #[error("Guard evaluation error: {0}")]
    Guard(String),

    #[error("Decision error: {0}")]
    Decision(String),

    #[error("Action execution error: {0}")]
    ActionExecution(String),

    #[error("Resource allocation error: {0}")]
    ResourceAllocation(String),

    #[error("Resource release error: {0}")]
    ResourceRelease(String),

    #[error("Cleanup error: {0}")]
    Cleanup(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Not found: {0}")]
    NotFound(String),
}

pub type Result<T> = std::result::Result<T, Error>;
