/*
 * settings.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! Read-only settings snapshot consulted during evaluation.
//!
//! Persistent configuration storage is out of scope; callers build a snapshot
//! up front and share it read-only across evaluations.

use std::collections::HashMap;

/// Global defaults for list joining and blank replacement.
#[derive(Debug, Clone)]
pub struct Settings {
    /// Separator used to join list elements when no override applies.
    default_separator: String,
    /// Per-token-name separator overrides.
    separators: HashMap<String, String>,
    /// When set, underscores in sanitized values are kept rather than
    /// replaced with spaces (unless the `spaces` option asks otherwise).
    replace_blanks: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            default_separator: " ".to_string(),
            separators: HashMap::new(),
            replace_blanks: false,
        }
    }
}

impl Settings {
    /// Create a settings snapshot with defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the global default separator.
    pub fn with_default_separator(mut self, separator: impl Into<String>) -> Self {
        self.default_separator = separator.into();
        self
    }

    /// Set a separator override for a specific token name.
    pub fn with_separator(
        mut self,
        name: impl Into<String>,
        separator: impl Into<String>,
    ) -> Self {
        self.separators.insert(name.into(), separator.into());
        self
    }

    /// Enable or disable the "replace blanks with underscore" behavior.
    pub fn with_replace_blanks(mut self, replace_blanks: bool) -> Self {
        self.replace_blanks = replace_blanks;
        self
    }

    /// The separator configured for a token name, falling back to the
    /// global default.
    pub fn separator_for(&self, name: &str) -> &str {
        self.separators
            .get(name)
            .map(String::as_str)
            .unwrap_or(&self.default_separator)
    }

    /// Whether underscores should be kept instead of replaced with spaces.
    pub fn replace_blanks(&self) -> bool {
        self.replace_blanks
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_separator() {
        let settings = Settings::new();
        assert_eq!(settings.separator_for("tags"), " ");
    }

    #[test]
    fn test_separator_override() {
        let settings = Settings::new()
            .with_default_separator("+")
            .with_separator("tags", ", ");

        assert_eq!(settings.separator_for("tags"), ", ");
        assert_eq!(settings.separator_for("artist"), "+");
    }

    #[test]
    fn test_replace_blanks_default_off() {
        assert!(!Settings::new().replace_blanks());
        assert!(Settings::new().with_replace_blanks(true).replace_blanks());
    }
}
