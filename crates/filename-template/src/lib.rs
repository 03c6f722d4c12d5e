/*
 * lib.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! Filename pattern evaluation engine.
//!
//! This crate turns an already-parsed filename template tree plus a per-item
//! metadata context into a concrete, filesystem-safe string. It supports:
//!
//! - Token interpolation: `%artist%`, `%search.score:length=6%`
//! - Dotted lookup through nested contexts
//! - Type-directed formatting: datetimes (timezone conversion, pattern
//!   rendering), zero-padded numbers, multi-stage list pipelines
//! - Conditionals, with the boolean decision delegated to a pluggable
//!   condition evaluator
//! - Embedded script snippets, delegated to a pluggable script host
//! - Sanitization of forbidden filesystem characters on every text path
//!
//! The template parser, the condition grammar and the scripting language are
//! external collaborators; this crate only fixes the contract at each
//! boundary. Evaluation never fails: unresolved tokens follow a fallback
//! policy, formatting anomalies are logged and a failing script contributes
//! an empty string.
//!
//! # Example
//!
//! ```
//! use filename_template::{
//!     Evaluator, Options, Settings, Template, TemplateNode, TokenContext, TokenValue,
//!     VariableRef,
//! };
//!
//! let mut context = TokenContext::new();
//! context.insert("artist", "bob_ross");
//! context.insert("ext", "jpg");
//!
//! let template = Template::new(vec![
//!     TemplateNode::Variable(VariableRef::new("artist")),
//!     TemplateNode::Text(".".to_string()),
//!     TemplateNode::Variable(VariableRef::new("ext")),
//! ]);
//!
//! let settings = Settings::new();
//! let output = Evaluator::new(&context, &settings).run(&template);
//! assert_eq!(output, "bob ross.jpg");
//! ```

pub mod ast;
pub mod conditions;
pub mod context;
pub mod error;
pub mod evaluator;
pub mod format;
pub mod sanitize;
pub mod script;
pub mod settings;

// Re-export main types at crate root
pub use ast::{Conditional, Options, Template, TemplateNode, VariableRef};
pub use conditions::{ConditionEvaluator, TokenPresence};
pub use context::{TokenContext, TokenValue};
pub use error::ScriptError;
pub use evaluator::{EscapeFn, Evaluator};
pub use format::{DEFAULT_DATE_FORMAT, format_value};
pub use sanitize::clean;
pub use script::ScriptHost;
pub use settings::Settings;
