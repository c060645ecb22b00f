//! Errors returned by the transformation core.

use serde::Serialize;
use thiserror::Error;

/// Errors that abort a pipeline invocation. No partial results accompany either variant.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum Error {
    /// The input could not be normalized into a header-plus-rows dataset.
    #[error("Malformed input: {message}")]
    MalformedInput { message: String },

    /// A pipeline step is structurally invalid (unknown type, missing or ill-typed parameters).
    #[error("Operation {operation_index} is invalid: {reason}")]
    Transform {
        operation_index: usize,
        reason: String,
    },
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

impl Error {
    pub fn malformed(message: impl Into<String>) -> Self {
        Error::MalformedInput {
            message: message.into(),
        }
    }

    pub fn transform(operation_index: usize, reason: impl Into<String>) -> Self {
        Error::Transform {
            operation_index,
            reason: reason.into(),
        }
    }

    /// Index of the offending pipeline step, if the error came from one
    pub fn operation_index(&self) -> Option<usize> {
        match self {
            Error::Transform {
                operation_index, ..
            } => Some(*operation_index),
            Error::MalformedInput { .. } => None,
        }
    }

    /// Structured form handed to API layers.
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or_else(|_| serde_json::json!({ "kind": "unknown" }))
    }
}
