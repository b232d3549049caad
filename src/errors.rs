//! Custom error types for appliance database administration
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PgAdminError {
    /// an invoked database tool exited non-zero
    #[error("{command} exited with status {exit_code:?}: {stderr}")]
    ExternalCommand {
        command: String,
        exit_code: Option<i32>,
        stderr: String,
    },

    /// the database server could not be reached
    #[error("connection error: {0}")]
    Connection(String),

    /// a required parameter is missing or invalid
    #[error("configuration error: {0}")]
    Configuration(String),

    /// the tool could not be started at all
    #[error("failed to spawn {command}: {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("template error: {0}")]
    Template(#[from] tera::Error),

    /// a tool succeeded but printed something we could not interpret
    #[error("unexpected output from {command}: {output}")]
    UnexpectedOutput { command: String, output: String },

    /// the operator aborted the operation
    #[error("operation cancelled")]
    Cancelled,
}

impl PgAdminError {
    pub fn configuration(msg: impl Into<String>) -> Self {
        PgAdminError::Configuration(msg.into())
    }
}

pub type Result<T, E = PgAdminError> = std::result::Result<T, E>;
