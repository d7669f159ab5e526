use thiserror::Error;

/// Errors that can occur while fitting abundance models or running workflows.
#[derive(Error, Debug)]
pub enum SadError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("Parse error: {0}")]
    ParseError(String),

    #[error("Invalid parameters: {0}")]
    InvalidParameters(String),

    #[error("Root error: {0}")]
    RootError(String),

    #[error("Integration error: {0}")]
    IntegrationError(String),

    #[error("Missing parameters: {0}")]
    MissingParameters(String),

    #[error("Workflow error: {0}")]
    WorkflowError(String),
}
