/*
 * conditions.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! Condition evaluation boundary.
//!
//! The condition grammar itself lives outside this crate; the evaluator only
//! needs a yes/no answer for a conditional node's expression. [`TokenPresence`]
//! is the default: good enough for simple presence checks and for tests,
//! replaceable through [`crate::Evaluator::with_condition_evaluator`].

use crate::ast::TemplateNode;
use crate::context::TokenContext;
use crate::settings::Settings;

/// Decides whether a conditional node's condition expression holds.
pub trait ConditionEvaluator {
    /// Evaluate a condition expression against the context.
    fn evaluate(
        &self,
        condition: &[TemplateNode],
        context: &TokenContext,
        settings: &Settings,
    ) -> bool;
}

impl<F> ConditionEvaluator for F
where
    F: Fn(&[TemplateNode], &TokenContext, &Settings) -> bool,
{
    fn evaluate(
        &self,
        condition: &[TemplateNode],
        context: &TokenContext,
        settings: &Settings,
    ) -> bool {
        self(condition, context, settings)
    }
}

/// Default condition evaluator based on token presence.
///
/// A sequence of condition nodes holds when every node holds:
/// - a token reference holds when its path resolves to a non-empty value;
/// - a tag holds when the root `all` list contains its text;
/// - ignore markers and literal text are neutral;
/// - script nodes never hold (scripting inside conditions is not supported
///   here).
#[derive(Debug, Clone, Copy, Default)]
pub struct TokenPresence;

impl TokenPresence {
    fn holds(&self, node: &TemplateNode, context: &TokenContext, settings: &Settings) -> bool {
        match node {
            TemplateNode::Variable(var) | TemplateNode::ConditionToken(var) => context
                .resolve(&var.name)
                .is_some_and(|value| !value.is_empty()),
            TemplateNode::ConditionTag(tag) => matches!(
                context.get("all"),
                Some(crate::context::TokenValue::List(tags)) if tags.iter().any(|t| t == tag)
            ),
            TemplateNode::Conditional(inner) => {
                self.evaluate(&inner.condition, context, settings)
            }
            TemplateNode::ConditionIgnore | TemplateNode::Text(_) => true,
            TemplateNode::Script(_) => false,
        }
    }
}

impl ConditionEvaluator for TokenPresence {
    fn evaluate(
        &self,
        condition: &[TemplateNode],
        context: &TokenContext,
        settings: &Settings,
    ) -> bool {
        condition
            .iter()
            .all(|node| self.holds(node, context, settings))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::VariableRef;
    use crate::context::TokenValue;

    fn context() -> TokenContext {
        let mut context = TokenContext::new();
        context.insert("artist", "bob ross");
        context.insert("empty", "");
        context.insert(
            "all",
            TokenValue::List(vec!["landscape".to_string(), "oil".to_string()]),
        );
        context
    }

    fn token(name: &str) -> TemplateNode {
        TemplateNode::ConditionToken(VariableRef::new(name))
    }

    #[test]
    fn test_token_presence() {
        let evaluator = TokenPresence;
        let context = context();
        let settings = Settings::new();

        assert!(evaluator.evaluate(&[token("artist")], &context, &settings));
        assert!(!evaluator.evaluate(&[token("empty")], &context, &settings));
        assert!(!evaluator.evaluate(&[token("missing")], &context, &settings));
    }

    #[test]
    fn test_tag_membership() {
        let evaluator = TokenPresence;
        let context = context();
        let settings = Settings::new();

        let present = TemplateNode::ConditionTag("landscape".to_string());
        let absent = TemplateNode::ConditionTag("portrait".to_string());
        assert!(evaluator.evaluate(&[present], &context, &settings));
        assert!(!evaluator.evaluate(std::slice::from_ref(&absent), &context, &settings));
    }

    #[test]
    fn test_sequence_is_conjunction() {
        let evaluator = TokenPresence;
        let context = context();
        let settings = Settings::new();

        assert!(evaluator.evaluate(
            &[token("artist"), TemplateNode::ConditionIgnore],
            &context,
            &settings
        ));
        assert!(!evaluator.evaluate(&[token("artist"), token("missing")], &context, &settings));
    }

    #[test]
    fn test_closure_as_evaluator() {
        let always = |_: &[TemplateNode], _: &TokenContext, _: &Settings| true;
        assert!(always.evaluate(&[], &TokenContext::new(), &Settings::new()));
    }
}
