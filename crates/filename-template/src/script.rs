/*
 * script.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! Embedded scripting boundary.
//!
//! The scripting language itself is external; the evaluator hands a script
//! snippet and a read-only context projection to a host and appends whatever
//! string comes back. A failing script contributes nothing.

use crate::context::TokenContext;
use crate::error::ScriptError;

/// Executes a script snippet against the token context.
pub trait ScriptHost {
    /// Run the script and return its output string.
    fn evaluate(&self, script: &str, context: &TokenContext) -> Result<String, ScriptError>;
}

impl<F> ScriptHost for F
where
    F: Fn(&str, &TokenContext) -> Result<String, ScriptError>,
{
    fn evaluate(&self, script: &str, context: &TokenContext) -> Result<String, ScriptError> {
        self(script, context)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_closure_as_host() {
        let host = |script: &str, _: &TokenContext| -> Result<String, ScriptError> {
            Ok(script.to_uppercase())
        };
        assert_eq!(
            host.evaluate("abc", &TokenContext::new()),
            Ok("ABC".to_string())
        );
    }

    #[test]
    fn test_error_host() {
        let host = |_: &str, _: &TokenContext| -> Result<String, ScriptError> {
            Err(ScriptError::new("boom"))
        };
        assert_eq!(
            host.evaluate("abc", &TokenContext::new()),
            Err(ScriptError::new("boom"))
        );
    }
}
