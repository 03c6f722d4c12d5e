/*
 * error.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! Error types for the collaborator boundaries.
//!
//! Evaluation itself never fails: resolution misses follow the fallback
//! policy and formatting anomalies are logged. Errors only appear at the
//! script host boundary.

use thiserror::Error;

/// Error returned by a script host when a snippet fails to evaluate.
///
/// The evaluator logs the error and contributes nothing for the node;
/// sibling and ancestor evaluation continues unaffected.
#[derive(Debug, Clone, Error, PartialEq)]
#[error("{message}")]
pub struct ScriptError {
    /// Host-provided description of the failure.
    pub message: String,
}

impl ScriptError {
    /// Create a script error from a description.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}
