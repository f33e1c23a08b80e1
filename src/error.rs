//! Error types for Flowfront.
//!
//! All errors in Flowfront are represented by the `FlowfrontError` enum.
//! A workflow without a matching trigger is not an error: the driver reports it
//! through [`crate::TransformOutcome::NoTriggerFound`].

use std::io::ErrorKind;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Unified error type for all Flowfront operations.
#[derive(Deserialize, Serialize, Error, Debug, Clone, PartialEq)]
pub enum FlowfrontError {
    /// Configuration parsing or validation errors.
    #[error("{0}")]
    Config(String),

    /// Data conversion errors (JSON, TOML).
    #[error("{0}")]
    Convert(String),

    /// The workflow document is structurally invalid (missing nodes, dangling edges).
    #[error("malformed workflow: {0}")]
    MalformedGraph(String),

    /// A node is present but lacks sub-keys its flavor requires.
    #[error("unexpected node shape: {0}")]
    UnexpectedShape(String),

    /// Chat flavor needs an agent node to attach the response path to.
    #[error("no agent node found in workflow '{0}'")]
    NoAgentNode(String),

    /// Any other failure while rewriting a workflow.
    #[error("transformation failed at {stage}: {message}")]
    Transform {
        stage: String,
        message: String,
    },

    /// The workflow server rejected the API key.
    #[error("{0}")]
    Auth(String),

    /// The requested workflow does not exist on the server.
    #[error("{0}")]
    NotFound(String),

    /// The workflow server refused the payload.
    #[error("{0}")]
    Validation(String),

    /// Transport level failure (DNS, connect, timeout).
    #[error("{0}")]
    Network(String),

    /// Non-success HTTP status not covered by a more specific variant.
    #[error("http status {status}: {message}")]
    Http {
        status: u16,
        message: String,
    },

    /// I/O operation errors.
    #[error("{0}")]
    IoError(String),
}

impl From<FlowfrontError> for String {
    fn from(val: FlowfrontError) -> Self {
        val.to_string()
    }
}

impl From<std::io::Error> for FlowfrontError {
    fn from(error: std::io::Error) -> Self {
        FlowfrontError::IoError(error.to_string())
    }
}

impl From<FlowfrontError> for std::io::Error {
    fn from(val: FlowfrontError) -> Self {
        #[allow(clippy::io_other_error)]
        std::io::Error::new(ErrorKind::Other, val.to_string())
    }
}

impl From<serde_json::Error> for FlowfrontError {
    fn from(error: serde_json::Error) -> Self {
        FlowfrontError::Convert(error.to_string())
    }
}

impl From<toml::de::Error> for FlowfrontError {
    fn from(error: toml::de::Error) -> Self {
        FlowfrontError::Config(error.to_string())
    }
}

impl From<jsonschema::ValidationError<'_>> for FlowfrontError {
    fn from(error: jsonschema::ValidationError<'_>) -> Self {
        FlowfrontError::MalformedGraph(error.to_string())
    }
}

impl From<reqwest::Error> for FlowfrontError {
    fn from(error: reqwest::Error) -> Self {
        match error.status() {
            Some(status) => FlowfrontError::Http {
                status: status.as_u16(),
                message: error.to_string(),
            },
            None => FlowfrontError::Network(error.to_string()),
        }
    }
}
