/*
 * format.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! Type-directed conversion of a token's value into a string.
//!
//! Dispatch is an exhaustive match over [`TokenValue`]. Datetime tokens get
//! timezone conversion and pattern rendering, numeric tokens get zero-padded
//! widths, and list tokens go through a multi-stage pipeline (count,
//! namespaces, sort, case, per-element sanitize, join).

use std::fmt::Display;
use std::str::FromStr;

use chrono::{DateTime, Datelike, FixedOffset, Local, NaiveDateTime, Timelike};
use chrono_tz::Tz;

use crate::ast::Options;
use crate::context::{TokenContext, TokenValue};
use crate::sanitize;
use crate::settings::Settings;

/// Default datetime rendering pattern.
pub const DEFAULT_DATE_FORMAT: &str = "MM-dd-yyyy HH.mm";

/// Name of the auxiliary list token holding one namespace per element of the
/// `all` tag list.
const ALL_NAMESPACES_TOKEN: &str = "all_namespaces";

/// Convert a token's value to a string using the given options.
///
/// Pure function of its inputs; `context` is the evaluation's root context,
/// needed only for the list pipeline's namespace cross-references.
pub fn format_value(
    name: &str,
    value: &TokenValue,
    options: &Options,
    context: &TokenContext,
    settings: &Settings,
) -> String {
    match value {
        TokenValue::DateTime(dt) => format_datetime(dt, options),
        TokenValue::Int(i) => format_integer(*i, options),
        TokenValue::UInt(u) => format_integer(*u, options),
        TokenValue::Float(f) => format_float(*f, options),
        TokenValue::List(items) => format_list(name, items, options, context, settings),
        // Score-like fields are kept as text to avoid precision loss but
        // still honor numeric zero-padding.
        TokenValue::Text(s) if name == "score" => format_numeric_text(s, options),
        TokenValue::Text(s) => s.clone(),
        TokenValue::Context(_) => String::new(),
    }
}

/// Apply the `timezone` option and render with the `format` option pattern.
fn format_datetime(value: &DateTime<FixedOffset>, options: &Options) -> String {
    let timezone = options.get("timezone").unwrap_or("");
    let local: NaiveDateTime = match timezone {
        "" | "server" => value.naive_local(),
        "local" => value.with_timezone(&Local).naive_local(),
        name => match Tz::from_str(name) {
            Ok(tz) => value.with_timezone(&tz).naive_local(),
            Err(_) => {
                tracing::error!(timezone = %name, "unknown timezone, leaving value unchanged");
                value.naive_local()
            }
        },
    };

    let pattern = options.get("format").unwrap_or(DEFAULT_DATE_FORMAT);
    render_date_pattern(&local, pattern)
}

/// Render a datetime using `yyyy`/`MM`/`dd`-style pattern tokens.
///
/// Repeated letters select zero-padded widths (`MM` vs `M`); `h` is the
/// 24-hour clock unless an `ap`/`AP` token is present; `zzz` is milliseconds;
/// single-quoted sections are literal, with `''` producing a quote character.
/// Unknown characters pass through.
fn render_date_pattern(dt: &NaiveDateTime, pattern: &str) -> String {
    let chars: Vec<char> = pattern.chars().collect();
    let twelve_hour = has_ampm_token(&chars);
    let mut out = String::new();
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];

        if c == '\'' {
            if chars.get(i + 1) == Some(&'\'') {
                out.push('\'');
                i += 2;
                continue;
            }
            i += 1;
            while i < chars.len() && chars[i] != '\'' {
                out.push(chars[i]);
                i += 1;
            }
            i += 1; // closing quote
            continue;
        }

        let run = chars[i..].iter().take_while(|&&x| x == c).count();
        let (text, consumed) = match c {
            'y' if run >= 4 => (format!("{:04}", dt.year()), 4),
            'y' if run >= 2 => (format!("{:02}", dt.year().rem_euclid(100)), 2),
            'y' => (dt.year().to_string(), 1),
            'M' => padded(dt.month(), run),
            'd' => padded(dt.day(), run),
            'H' => padded(dt.hour(), run),
            'h' if twelve_hour => padded(dt.hour12().1, run),
            'h' => padded(dt.hour(), run),
            'm' => padded(dt.minute(), run),
            's' => padded(dt.second(), run),
            'z' if run >= 3 => (format!("{:03}", dt.nanosecond() / 1_000_000), 3),
            'z' => ((dt.nanosecond() / 1_000_000).to_string(), 1),
            'a' => (
                if dt.hour12().0 { "pm" } else { "am" }.to_string(),
                if chars.get(i + 1) == Some(&'p') { 2 } else { 1 },
            ),
            'A' => (
                if dt.hour12().0 { "PM" } else { "AM" }.to_string(),
                if chars.get(i + 1) == Some(&'P') { 2 } else { 1 },
            ),
            _ => {
                out.push(c);
                i += 1;
                continue;
            }
        };
        out.push_str(&text);
        i += consumed;
    }

    out
}

fn padded(value: u32, run: usize) -> (String, usize) {
    if run >= 2 {
        (format!("{value:02}"), 2)
    } else {
        (value.to_string(), 1)
    }
}

/// Whether the pattern carries an am/pm token outside quoted literals, which
/// switches `h` to the 12-hour clock.
fn has_ampm_token(chars: &[char]) -> bool {
    let mut i = 0;
    while i < chars.len() {
        match chars[i] {
            '\'' => {
                i += 1;
                while i < chars.len() && chars[i] != '\'' {
                    i += 1;
                }
                i += 1;
            }
            'a' | 'A' => return true,
            _ => i += 1,
        }
    }
    false
}

/// Base-10 rendering with optional zero-padding to the `length` option.
fn format_integer<T: Display>(value: T, options: &Options) -> String {
    match length_option(options) {
        Some(width) => format!("{value:0width$}"),
        None => value.to_string(),
    }
}

/// Fixed-point rendering with the `precision` option (default 6 digits),
/// zero-padded as a whole (sign and point counted) when `length` is present.
fn format_float(value: f64, options: &Options) -> String {
    let precision = options
        .get("precision")
        .and_then(|v| v.parse::<usize>().ok())
        .unwrap_or(6);

    match length_option(options) {
        Some(width) => format!("{value:0width$.precision$}"),
        None => format!("{value:.precision$}"),
    }
}

/// Zero-padding for numeric values kept as text.
///
/// The `length` option counts the integer part only; the decimal point and
/// fractional digits widen the target so the fraction is preserved verbatim.
fn format_numeric_text(value: &str, options: &Options) -> String {
    let Some(length) = length_option(options) else {
        return value.to_string();
    };

    let fraction = value
        .find('.')
        .map(|i| value.chars().count() - value[..i].chars().count())
        .unwrap_or(0);
    let width = length + fraction;
    let current = value.chars().count();

    if current < width {
        let mut padded = "0".repeat(width - current);
        padded.push_str(value);
        padded
    } else {
        value.to_string()
    }
}

fn length_option(options: &Options) -> Option<usize> {
    options
        .get("length")
        .map(|v| v.parse::<usize>().unwrap_or(0))
}

/// Word-wise case transform over `_`-separated words.
#[derive(Debug, Clone, Copy, PartialEq)]
enum CaseFormat {
    Lower,
    UpperFirst,
    Upper,
    Caps,
}

impl CaseFormat {
    fn parse(value: &str) -> Option<Self> {
        match value {
            "lower" => Some(CaseFormat::Lower),
            "upper_first" => Some(CaseFormat::UpperFirst),
            "upper" => Some(CaseFormat::Upper),
            "caps" => Some(CaseFormat::Caps),
            _ => None,
        }
    }

    fn apply(self, value: &str) -> String {
        match self {
            CaseFormat::Lower => value.to_lowercase(),
            CaseFormat::Upper => value.to_uppercase(),
            CaseFormat::UpperFirst => capitalize(&value.to_lowercase()),
            CaseFormat::Caps => value
                .split('_')
                .map(|word| capitalize(&word.to_lowercase()))
                .collect::<Vec<_>>()
                .join("_"),
        }
    }
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// One element flowing through the list pipeline.
///
/// The namespace prefix is tracked separately from the element text so that
/// the `namespace:` separator inserted by the engine survives the sanitizer
/// while the tag text itself is still cleaned.
#[derive(Debug, Clone)]
struct ListElement {
    prefix: Option<String>,
    text: String,
}

impl ListElement {
    fn rendered(&self) -> String {
        match &self.prefix {
            Some(prefix) => format!("{prefix}:{}", self.text),
            None => self.text.clone(),
        }
    }
}

/// The multi-stage list pipeline: count short-circuit, namespace filtering
/// and prefixing, sort, case transform, per-element sanitize, join.
fn format_list(
    name: &str,
    elements: &[String],
    options: &Options,
    context: &TokenContext,
    settings: &Settings,
) -> String {
    if options.has("count") {
        return format_integer(elements.len(), options);
    }

    let mut items: Vec<ListElement> = elements
        .iter()
        .map(|text| ListElement {
            prefix: None,
            text: text.clone(),
        })
        .collect();
    let mut namespaces: Vec<String> = match context.get(ALL_NAMESPACES_TOKEN) {
        Some(TokenValue::List(list)) => list.clone(),
        _ => Vec::new(),
    };

    // Namespace of element i: the i-th auxiliary entry when this is the
    // "all" list, otherwise the token's own name.
    let namespace_of = |index: usize, namespaces: &[String]| -> String {
        if name == "all" {
            namespaces
                .get(index)
                .cloned()
                .unwrap_or_else(|| name.to_string())
        } else {
            name.to_string()
        }
    };

    if let Some(ignored) = options.get("ignorenamespace") {
        let ignored: Vec<&str> = ignored.split(' ').collect();
        let mut kept = Vec::new();
        let mut kept_namespaces = Vec::new();
        for (i, item) in items.iter().enumerate() {
            let namespace = namespace_of(i, &namespaces);
            if !ignored.contains(&namespace.as_str()) {
                kept.push(item.clone());
                // Store the resolved name so a missing auxiliary entry
                // keeps degrading to the variable name after the shift
                kept_namespaces.push(namespace);
            }
        }
        items = kept;
        namespaces = kept_namespaces;
    }

    if options.has("includenamespace") {
        let excluded: Vec<&str> = options
            .get("excludenamespace")
            .map(|v| v.split(' ').collect())
            .unwrap_or_default();

        for (i, item) in items.iter_mut().enumerate() {
            let namespace = namespace_of(i, &namespaces);
            if !excluded.contains(&namespace.as_str()) {
                item.prefix = Some(namespace);
            }
        }
    }

    // Sort on the full namespace-prefixed rendering
    if options.has("sort") {
        items.sort_by_key(ListElement::rendered);
    }

    if let Some(case) = options.get("case").and_then(CaseFormat::parse) {
        for item in &mut items {
            item.text = case.apply(&item.text);
        }
    }

    // Clean each element separately; source-prefixed families carry URLs and
    // are exempt.
    if !name.starts_with("source") {
        for item in &mut items {
            item.text = sanitize::clean(&item.text, options, settings);
        }
    }

    let separator = options
        .get("separator")
        .map(str::to_string)
        .unwrap_or_else(|| settings.separator_for(name).to_string())
        .replace("\\n", "\n")
        .replace("\\r", "\r");

    items
        .iter()
        .map(ListElement::rendered)
        .collect::<Vec<_>>()
        .join(&separator)
}
