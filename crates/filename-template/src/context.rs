/*
 * context.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! Token value and context types.
//!
//! A [`TokenContext`] maps token names to typed [`TokenValue`]s. Contexts nest
//! through [`TokenValue::Context`], which enables dotted access (`a.b.c`).
//! Contexts form a tree rooted at the evaluation's top-level context and are
//! read-only for the duration of a run.

use std::collections::HashMap;

use chrono::{DateTime, FixedOffset};

/// A typed value carried by a named token.
///
/// The kind set is fixed; formatting dispatch is an exhaustive match so no
/// kind silently falls through to the generic string case.
#[derive(Debug, Clone, PartialEq)]
pub enum TokenValue {
    /// Plain text.
    Text(String),

    /// Signed integer.
    Int(i64),

    /// Unsigned integer.
    UInt(u64),

    /// Floating-point number.
    Float(f64),

    /// Date and time, carrying the offset it was produced with.
    DateTime(DateTime<FixedOffset>),

    /// A list of text elements (e.g. tags).
    List(Vec<String>),

    /// A nested context, enabling dotted lookup through this token.
    Context(TokenContext),
}

impl TokenValue {
    /// Whether the value is empty for condition purposes.
    ///
    /// Numbers and datetimes are never empty; text, lists and nested contexts
    /// are empty when they hold nothing.
    pub fn is_empty(&self) -> bool {
        match self {
            TokenValue::Text(s) => s.is_empty(),
            TokenValue::List(items) => items.is_empty(),
            TokenValue::Context(context) => context.is_empty(),
            TokenValue::Int(_)
            | TokenValue::UInt(_)
            | TokenValue::Float(_)
            | TokenValue::DateTime(_) => false,
        }
    }
}

impl From<&str> for TokenValue {
    fn from(value: &str) -> Self {
        TokenValue::Text(value.to_string())
    }
}

impl From<String> for TokenValue {
    fn from(value: String) -> Self {
        TokenValue::Text(value)
    }
}

/// A mapping from token name (unique, case-sensitive) to value.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct TokenContext {
    tokens: HashMap<String, TokenValue>,
}

impl TokenContext {
    /// Create a new empty context.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a token into the context.
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<TokenValue>) {
        self.tokens.insert(name.into(), value.into());
    }

    /// Get a token at this context level only.
    pub fn get(&self, name: &str) -> Option<&TokenValue> {
        self.tokens.get(name)
    }

    /// Check whether the context holds no tokens.
    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    /// Resolve a possibly dotted token name.
    ///
    /// Every non-final segment must name an existing [`TokenValue::Context`];
    /// resolution fails the moment a segment is missing or a segment resolves
    /// to a non-context value while segments remain.
    pub fn resolve(&self, name: &str) -> Option<&TokenValue> {
        let mut context = self;
        let mut segments = name.split('.').peekable();
        loop {
            let segment = segments.next()?;
            let value = context.get(segment)?;
            if segments.peek().is_none() {
                return Some(value);
            }
            match value {
                TokenValue::Context(inner) => context = inner,
                _ => return None,
            }
        }
    }
}
