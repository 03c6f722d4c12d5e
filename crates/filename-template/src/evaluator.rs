/*
 * evaluator.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! Template evaluation engine.
//!
//! The evaluator walks an already-parsed template tree against a read-only
//! token context and accumulates output text. No error aborts an in-progress
//! run: resolution misses follow the fallback policy, formatting anomalies
//! are logged and script failures contribute nothing.

use crate::ast::{Options, Template, TemplateNode, VariableRef};
use crate::conditions::{ConditionEvaluator, TokenPresence};
use crate::context::{TokenContext, TokenValue};
use crate::format::format_value;
use crate::sanitize;
use crate::script::ScriptHost;
use crate::settings::Settings;

/// Injected escape strategy, applied when the `escape` option is present.
pub type EscapeFn = Box<dyn Fn(&str) -> String>;

/// Token names whose unresolved references are always kept as placeholders,
/// because a later pass fills them in (destination path, sequence number).
const KEPT_TOKENS: &[&str] = &["path", "num"];

/// Tree-walking evaluator turning a template plus a token context into
/// output text.
///
/// One evaluator owns one output accumulator; [`Evaluator::run`] resets it,
/// so an instance can be reused for sequential runs but never shared across
/// concurrent ones.
pub struct Evaluator<'a> {
    context: &'a TokenContext,
    settings: &'a Settings,
    keep_invalid_tokens: bool,
    escape: Option<EscapeFn>,
    conditions: Box<dyn ConditionEvaluator>,
    scripts: Option<Box<dyn ScriptHost>>,
    result: String,
}

impl<'a> Evaluator<'a> {
    /// Create an evaluator over a context and settings snapshot.
    pub fn new(context: &'a TokenContext, settings: &'a Settings) -> Self {
        Self {
            context,
            settings,
            keep_invalid_tokens: false,
            escape: None,
            conditions: Box::new(TokenPresence),
            scripts: None,
            result: String::new(),
        }
    }

    /// Keep unresolved token references as literal `%name%` placeholders so
    /// the user can see and debug the miss.
    pub fn with_keep_invalid_tokens(mut self, keep: bool) -> Self {
        self.keep_invalid_tokens = keep;
        self
    }

    /// Register an escape strategy, applied to values carrying the `escape`
    /// option. Defaults to identity (no strategy).
    pub fn with_escape(mut self, escape: impl Fn(&str) -> String + 'static) -> Self {
        self.escape = Some(Box::new(escape));
        self
    }

    /// Replace the condition evaluator collaborator.
    pub fn with_condition_evaluator(
        mut self,
        conditions: impl ConditionEvaluator + 'static,
    ) -> Self {
        self.conditions = Box::new(conditions);
        self
    }

    /// Register a script host collaborator. Without one, script nodes count
    /// as failed and contribute nothing.
    pub fn with_script_host(mut self, scripts: impl ScriptHost + 'static) -> Self {
        self.scripts = Some(Box::new(scripts));
        self
    }

    /// Evaluate a template to its output string.
    ///
    /// The accumulator is reset at the start of every call.
    pub fn run(&mut self, template: &Template) -> String {
        self.result.clear();
        self.visit_nodes(&template.nodes);
        std::mem::take(&mut self.result)
    }

    fn visit_nodes(&mut self, nodes: &[TemplateNode]) {
        for node in nodes {
            self.visit(node);
        }
    }

    fn visit(&mut self, node: &TemplateNode) {
        match node {
            TemplateNode::Text(text) => self.result.push_str(text),

            TemplateNode::Variable(var) | TemplateNode::ConditionToken(var) => {
                self.visit_variable(var);
            }

            TemplateNode::ConditionTag(tag) => {
                let cleaned = sanitize::clean(tag, &Options::new(), self.settings);
                self.result.push_str(&cleaned);
            }

            TemplateNode::ConditionIgnore => {}

            TemplateNode::Conditional(conditional) => {
                let valid =
                    self.conditions
                        .evaluate(&conditional.condition, self.context, self.settings);
                if valid {
                    if let Some(branch) = &conditional.if_true {
                        self.visit_nodes(branch);
                    }
                } else if let Some(branch) = &conditional.if_false {
                    self.visit_nodes(branch);
                }
            }

            TemplateNode::Script(script) => self.visit_script(script),
        }
    }

    fn visit_script(&mut self, script: &str) {
        let Some(host) = &self.scripts else {
            tracing::error!("script node without a registered script host");
            return;
        };
        match host.evaluate(script, self.context) {
            Ok(output) => self.result.push_str(&output),
            Err(error) => {
                tracing::error!(error = %error, "error in script evaluation");
            }
        }
    }

    fn visit_variable(&mut self, var: &VariableRef) {
        let leading = var.name.split('.').next().unwrap_or(&var.name);

        let Some(value) = self.context.resolve(&var.name) else {
            // The keep policy keys on the leading segment, but the
            // placeholder must reproduce the full reference as typed
            if self.keep_invalid_tokens || KEPT_TOKENS.contains(&leading) {
                self.result
                    .push_str(&reserialize_token(&var.name, &var.options));
            }
            return;
        };

        // Formatting and sanitize exemptions key off the final segment
        let name = var.name.rsplit('.').next().unwrap_or(&var.name);

        let mut result = format_value(name, value, &var.options, self.context, self.settings);
        // The list pipeline already cleaned its elements
        let already_clean = matches!(value, TokenValue::List(_));

        if let Some(maxlength) = var.options.get("maxlength") {
            let maxlength = maxlength.parse::<usize>().unwrap_or(0);
            result = result.chars().take(maxlength).collect();
        }
        if var.options.has("htmlescape") {
            result = escape_html(&result);
        }

        if !is_sanitize_exempt(name) && !already_clean {
            result = sanitize::clean(&result, &var.options, self.settings);
        }

        if var.options.has("escape") {
            if let Some(escape) = &self.escape {
                result = escape(&result);
            }
        }

        self.result.push_str(&result);
    }
}

/// Identity-like names that must survive untouched: they are either whole
/// paths, already-final filenames, or URLs.
fn is_sanitize_exempt(name: &str) -> bool {
    name == "allo"
        || name == "filename"
        || name == "directory"
        || name == "old_filename"
        || name == "old_directory"
        || name.starts_with("url_")
}

/// Reconstruct the literal token syntax for an unresolved reference:
/// `%name%` or `%name:opt1 opt2=val%`, options in encounter order.
fn reserialize_token(name: &str, options: &Options) -> String {
    let opts = options
        .iter()
        .map(|(key, value)| {
            if value.is_empty() {
                key.to_string()
            } else {
                format!("{key}={value}")
            }
        })
        .collect::<Vec<_>>()
        .join(" ");

    if opts.is_empty() {
        format!("%{name}%")
    } else {
        format!("%{name}:{opts}%")
    }
}

/// Escape markup-significant characters.
fn escape_html(value: &str) -> String {
    value
        .chars()
        .map(|c| match c {
            '&' => "&amp;".to_string(),
            '<' => "&lt;".to_string(),
            '>' => "&gt;".to_string(),
            '"' => "&quot;".to_string(),
            _ => c.to_string(),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::Conditional;
    use crate::error::ScriptError;
    use pretty_assertions::assert_eq;

    fn context() -> TokenContext {
        let mut context = TokenContext::new();
        context.insert("artist", "bob_ross");
        context.insert("md5", "0123456789abcdef");
        context.insert("website", "https://example.com/gallery");
        context
    }

    fn var(name: &str) -> TemplateNode {
        TemplateNode::Variable(VariableRef::new(name))
    }

    fn var_with(name: &str, options: Options) -> TemplateNode {
        TemplateNode::Variable(VariableRef::with_options(name, options))
    }

    fn run(nodes: Vec<TemplateNode>, context: &TokenContext) -> String {
        let settings = Settings::new();
        Evaluator::new(context, &settings).run(&Template::new(nodes))
    }

    #[test]
    fn test_text_identity() {
        let context = TokenContext::new();
        let output = run(vec![TemplateNode::Text("image.jpg".to_string())], &context);
        assert_eq!(output, "image.jpg");
    }

    #[test]
    fn test_variable_formats_and_sanitizes() {
        let output = run(
            vec![var("artist"), TemplateNode::Text(".jpg".to_string())],
            &context(),
        );
        assert_eq!(output, "bob ross.jpg");
    }

    #[test]
    fn test_unresolved_token_dropped_by_default() {
        let output = run(vec![var("missing"), var("artist")], &context());
        assert_eq!(output, "bob ross");
    }

    #[test]
    fn test_unresolved_token_kept_with_flag() {
        let settings = Settings::new();
        let context = context();
        let options: Options = [("a", ""), ("b", "1")].into_iter().collect();
        let template = Template::new(vec![TemplateNode::Variable(VariableRef::with_options(
            "foo", options,
        ))]);

        let mut evaluator = Evaluator::new(&context, &settings).with_keep_invalid_tokens(true);
        assert_eq!(evaluator.run(&template), "%foo:a b=1%");
    }

    #[test]
    fn test_placeholder_tokens_always_kept() {
        let output = run(vec![var("path"), var("num")], &context());
        assert_eq!(output, "%path%%num%");
    }

    #[test]
    fn test_unresolved_dotted_token_keeps_full_path() {
        let settings = Settings::new();
        let mut search = TokenContext::new();
        search.insert("query", "landscape");
        let mut context = TokenContext::new();
        context.insert("search", TokenValue::Context(search));

        let template = Template::new(vec![var("search.missing")]);

        let mut evaluator = Evaluator::new(&context, &settings).with_keep_invalid_tokens(true);
        assert_eq!(evaluator.run(&template), "%search.missing%");
    }

    #[test]
    fn test_maxlength_truncates() {
        let options: Options = [("maxlength", "4")].into_iter().collect();
        let output = run(vec![var_with("md5", options)], &context());
        assert_eq!(output, "0123");
    }

    #[test]
    fn test_htmlescape() {
        let mut context = TokenContext::new();
        context.insert("title", "a<b>&c");
        let options: Options = [("htmlescape", ""), ("unsafe", "")].into_iter().collect();
        let output = run(vec![var_with("title", options)], &context);
        assert_eq!(output, "a&lt;b&gt;&amp;c");
    }

    #[test]
    fn test_url_names_skip_sanitize() {
        let mut context = TokenContext::new();
        context.insert("url_file", "https://example.com/a_b.png");
        let output = run(vec![var("url_file")], &context);
        assert_eq!(output, "https://example.com/a_b.png");
    }

    #[test]
    fn test_filename_identity_skips_sanitize() {
        let mut context = TokenContext::new();
        context.insert("filename", "kept_as_is");
        let output = run(vec![var("filename")], &context);
        assert_eq!(output, "kept_as_is");
    }

    #[test]
    fn test_plain_text_is_sanitized() {
        // "website" is not an exempt name, so the URL gets mangled
        let output = run(vec![var("website")], &context());
        assert_eq!(output, "https example.com gallery");
    }

    #[test]
    fn test_escape_strategy() {
        let settings = Settings::new();
        let context = context();
        let options: Options = [("escape", "")].into_iter().collect();
        let template = Template::new(vec![TemplateNode::Variable(VariableRef::with_options(
            "artist", options,
        ))]);

        let mut evaluator =
            Evaluator::new(&context, &settings).with_escape(|s| format!("'{s}'"));
        assert_eq!(evaluator.run(&template), "'bob ross'");
    }

    #[test]
    fn test_escape_without_strategy_is_identity() {
        let options: Options = [("escape", "")].into_iter().collect();
        let output = run(vec![var_with("artist", options)], &context());
        assert_eq!(output, "bob ross");
    }

    #[test]
    fn test_condition_tag_sanitized() {
        let context = TokenContext::new();
        let output = run(
            vec![TemplateNode::ConditionTag("re:zero".to_string())],
            &context,
        );
        assert_eq!(output, "re zero");
    }

    #[test]
    fn test_condition_ignore_contributes_nothing() {
        let output = run(
            vec![
                TemplateNode::ConditionIgnore,
                TemplateNode::Text("x".to_string()),
            ],
            &context(),
        );
        assert_eq!(output, "x");
    }

    #[test]
    fn test_conditional_true_branch() {
        let conditional = TemplateNode::Conditional(Conditional {
            condition: vec![TemplateNode::ConditionToken(VariableRef::new("artist"))],
            if_true: Some(vec![TemplateNode::Text("yes".to_string())]),
            if_false: Some(vec![TemplateNode::Text("no".to_string())]),
        });
        assert_eq!(run(vec![conditional], &context()), "yes");
    }

    #[test]
    fn test_conditional_false_branch() {
        let conditional = TemplateNode::Conditional(Conditional {
            condition: vec![TemplateNode::ConditionToken(VariableRef::new("missing"))],
            if_true: Some(vec![TemplateNode::Text("yes".to_string())]),
            if_false: Some(vec![TemplateNode::Text("no".to_string())]),
        });
        assert_eq!(run(vec![conditional], &context()), "no");
    }

    #[test]
    fn test_conditional_absent_branch_is_empty() {
        let conditional = TemplateNode::Conditional(Conditional {
            condition: vec![TemplateNode::ConditionToken(VariableRef::new("missing"))],
            if_true: Some(vec![TemplateNode::Text("yes".to_string())]),
            if_false: None,
        });
        let output = run(
            vec![conditional, TemplateNode::Text("after".to_string())],
            &context(),
        );
        assert_eq!(output, "after");
    }

    #[test]
    fn test_injected_condition_evaluator() {
        let settings = Settings::new();
        let context = context();
        let conditional = TemplateNode::Conditional(Conditional {
            condition: vec![],
            if_true: Some(vec![TemplateNode::Text("yes".to_string())]),
            if_false: None,
        });
        let template = Template::new(vec![conditional]);

        let always_false =
            |_: &[TemplateNode], _: &TokenContext, _: &Settings| false;
        let mut evaluator =
            Evaluator::new(&context, &settings).with_condition_evaluator(always_false);
        assert_eq!(evaluator.run(&template), "");
    }

    #[test]
    fn test_script_output_appended() {
        let settings = Settings::new();
        let context = context();
        let template = Template::new(vec![
            TemplateNode::Script("name".to_string()),
            TemplateNode::Text(".jpg".to_string()),
        ]);

        let host = |script: &str, _: &TokenContext| -> Result<String, ScriptError> {
            Ok(format!("<{script}>"))
        };
        let mut evaluator = Evaluator::new(&context, &settings).with_script_host(host);
        assert_eq!(evaluator.run(&template), "<name>.jpg");
    }

    #[test]
    fn test_script_failure_contributes_nothing() {
        let settings = Settings::new();
        let context = context();
        let template = Template::new(vec![
            TemplateNode::Script("boom".to_string()),
            TemplateNode::Text(".jpg".to_string()),
        ]);

        let host = |_: &str, _: &TokenContext| -> Result<String, ScriptError> {
            Err(ScriptError::new("undefined variable"))
        };
        let mut evaluator = Evaluator::new(&context, &settings).with_script_host(host);
        assert_eq!(evaluator.run(&template), ".jpg");
    }

    #[test]
    fn test_script_without_host_contributes_nothing() {
        let output = run(
            vec![
                TemplateNode::Script("name".to_string()),
                TemplateNode::Text(".jpg".to_string()),
            ],
            &context(),
        );
        assert_eq!(output, ".jpg");
    }

    #[test]
    fn test_run_resets_accumulator() {
        let settings = Settings::new();
        let context = context();
        let template = Template::new(vec![TemplateNode::Text("once".to_string())]);

        let mut evaluator = Evaluator::new(&context, &settings);
        assert_eq!(evaluator.run(&template), "once");
        assert_eq!(evaluator.run(&template), "once");
    }

    #[test]
    fn test_dotted_resolution_formats_final_segment() {
        let mut details = TokenContext::new();
        details.insert("score", "1234");
        let mut context = TokenContext::new();
        context.insert("search", TokenValue::Context(details));

        let options: Options = [("length", "6")].into_iter().collect();
        let output = run(vec![var_with("search.score", options)], &context);
        assert_eq!(output, "001234");
    }

    #[test]
    fn test_reserialize_token_without_options() {
        assert_eq!(reserialize_token("foo", &Options::new()), "%foo%");
    }
}
