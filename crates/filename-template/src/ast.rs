/*
 * ast.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! Template tree types.
//!
//! This module defines the node tree produced by the external template parser
//! and consumed by the evaluator. The node kind set is closed, so the tree is
//! a plain enum rather than an open visitor hierarchy.

/// A parsed filename template: an ordered sequence of nodes.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Template {
    /// The top-level nodes, evaluated in order.
    pub nodes: Vec<TemplateNode>,
}

impl Template {
    /// Create a template from a list of nodes.
    pub fn new(nodes: Vec<TemplateNode>) -> Self {
        Self { nodes }
    }
}

/// A node in the template tree.
#[derive(Debug, Clone, PartialEq)]
pub enum TemplateNode {
    /// Literal text to be output as-is.
    Text(String),

    /// Token interpolation: `%name%` or `%name:opt1 opt2=val%`
    Variable(VariableRef),

    /// A token reference inside a condition expression. Same shape as
    /// [`TemplateNode::Variable`] and produces the same output.
    ConditionToken(VariableRef),

    /// A resolved tag's literal text inside a condition expression.
    /// No options apply; the text goes through the default sanitizer.
    ConditionTag(String),

    /// Structurally present in condition expressions but never contributes
    /// output.
    ConditionIgnore,

    /// Conditional block with optional branches.
    Conditional(Conditional),

    /// Embedded script snippet, delegated to the script host.
    Script(String),
}

/// Conditional block: condition expression plus optional branches.
///
/// Branches are optional owned subtrees; when the chosen branch is absent the
/// node contributes nothing.
#[derive(Debug, Clone, PartialEq)]
pub struct Conditional {
    /// The condition expression, delegated to the condition evaluator.
    pub condition: Vec<TemplateNode>,
    /// Nodes evaluated when the condition holds.
    pub if_true: Option<Vec<TemplateNode>>,
    /// Nodes evaluated when the condition does not hold.
    pub if_false: Option<Vec<TemplateNode>>,
}

/// A reference to a token, possibly dotted (`a.b.c`), with its options.
#[derive(Debug, Clone, PartialEq)]
pub struct VariableRef {
    /// Full dotted token name.
    pub name: String,
    /// Formatting options attached to this reference.
    pub options: Options,
}

impl VariableRef {
    /// Create a reference with no options.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            options: Options::new(),
        }
    }

    /// Create a reference with options.
    pub fn with_options(name: impl Into<String>, options: Options) -> Self {
        Self {
            name: name.into(),
            options,
        }
    }
}

/// Options attached to a token reference.
///
/// Keys are unique and kept in encounter order, which matters when an
/// unresolved token is re-serialized back to its literal syntax. The presence
/// of a key alone can be meaningful (a boolean flag), so values may be empty.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Options {
    entries: Vec<(String, String)>,
}

impl Options {
    /// Create an empty option map.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set an option, replacing any existing value for the same key.
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into();
        let value = value.into();
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some(entry) => entry.1 = value,
            None => self.entries.push((key, value)),
        }
    }

    /// Set a boolean flag (an option with an empty value).
    pub fn flag(&mut self, key: impl Into<String>) {
        self.set(key, "");
    }

    /// Get an option value by key.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Check whether a key is present, regardless of its value.
    pub fn has(&self, key: &str) -> bool {
        self.entries.iter().any(|(k, _)| k == key)
    }

    /// Check whether the map holds no options.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate over entries in encounter order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Options {
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        let mut options = Options::new();
        for (k, v) in iter {
            options.set(k, v);
        }
        options
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_options_encounter_order() {
        let mut options = Options::new();
        options.flag("sort");
        options.set("length", "6");
        options.flag("count");

        let keys: Vec<&str> = options.iter().map(|(k, _)| k).collect();
        assert_eq!(keys, vec!["sort", "length", "count"]);
    }

    #[test]
    fn test_options_set_replaces() {
        let mut options = Options::new();
        options.set("length", "3");
        options.set("length", "6");

        assert_eq!(options.get("length"), Some("6"));
        assert_eq!(options.iter().count(), 1);
    }

    #[test]
    fn test_options_flag_presence() {
        let mut options = Options::new();
        options.flag("count");

        assert!(options.has("count"));
        assert_eq!(options.get("count"), Some(""));
        assert!(!options.has("sort"));
    }

    #[test]
    fn test_options_from_iterator() {
        let options: Options = [("a", ""), ("b", "1")].into_iter().collect();

        assert!(options.has("a"));
        assert_eq!(options.get("b"), Some("1"));
    }

    #[test]
    fn test_variable_ref_new() {
        let var = VariableRef::new("artist");

        assert_eq!(var.name, "artist");
        assert!(var.options.is_empty());
    }
}
