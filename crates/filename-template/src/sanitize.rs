/*
 * sanitize.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! Forbidden-character and whitespace normalization shared by all
//! text-producing paths.

use crate::ast::Options;
use crate::settings::Settings;

/// Characters that are not allowed in filenames on common filesystems.
const FORBIDDEN: &[char] = &['\\', '%', '/', ':', '|', '*', '?', '"', '<', '>'];

/// Make a value filesystem-safe.
///
/// Unless the `unsafe` or `raw` option is present, each forbidden character is
/// replaced with `_`, doubled underscores are collapsed, and surrounding
/// whitespace is trimmed. The collapse pass runs exactly three times; this is
/// a bounded heuristic, not a fixed point, and runs of 8+ underscores can
/// leave doubles behind.
///
/// Unless `raw` or `underscores` is present, and provided the global
/// "replace blanks" setting is off or the `spaces` option is present,
/// underscores are then replaced with spaces.
pub fn clean(value: &str, options: &Options, settings: &Settings) -> String {
    let mut result = value.to_string();

    if !options.has("unsafe") && !options.has("raw") {
        for c in FORBIDDEN {
            result = result.replace(*c, "_");
        }
        for _ in 0..3 {
            result = result.replace("__", "_");
        }
        result = result.trim().to_string();
    }

    if !options.has("raw")
        && !options.has("underscores")
        && (!settings.replace_blanks() || options.has("spaces"))
    {
        result = result.replace('_', " ");
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;

    fn opts(keys: &[&str]) -> Options {
        keys.iter().map(|k| (*k, "")).collect()
    }

    #[test]
    fn test_forbidden_characters_replaced() {
        let settings = Settings::new();
        assert_eq!(
            clean("a/b\\c:d|e*f?g\"h<i>j%k", &opts(&["underscores"]), &settings),
            "a_b_c_d_e_f_g_h_i_j_k"
        );
    }

    #[test]
    fn test_doubled_underscores_collapsed() {
        let settings = Settings::new();
        assert_eq!(clean("a//b", &opts(&["underscores"]), &settings), "a_b");
        assert_eq!(clean("a::::b", &opts(&["underscores"]), &settings), "a_b");
    }

    #[test]
    fn test_whitespace_trimmed() {
        let settings = Settings::new();
        assert_eq!(clean("  hello  ", &Options::new(), &settings), "hello");
    }

    #[test]
    fn test_underscores_become_spaces_by_default() {
        let settings = Settings::new();
        assert_eq!(clean("bob_ross", &Options::new(), &settings), "bob ross");
    }

    #[test]
    fn test_replace_blanks_keeps_underscores() {
        let settings = Settings::new().with_replace_blanks(true);
        assert_eq!(clean("bob_ross", &Options::new(), &settings), "bob_ross");
        // The spaces option overrides the setting
        assert_eq!(clean("bob_ross", &opts(&["spaces"]), &settings), "bob ross");
    }

    #[test]
    fn test_raw_bypasses_everything() {
        let settings = Settings::new();
        assert_eq!(clean("a/b_c ", &opts(&["raw"]), &settings), "a/b_c ");
    }

    #[test]
    fn test_unsafe_keeps_forbidden_but_replaces_blanks() {
        let settings = Settings::new();
        assert_eq!(clean("a/b_c", &opts(&["unsafe"]), &settings), "a/b c");
    }

    #[test]
    fn test_idempotence_within_bound() {
        // Stable for inputs with up to 6 consecutive forbidden characters
        let settings = Settings::new();
        let options = opts(&["underscores"]);
        for input in ["a//////b", "x::y||z", "plain text", "a_b_c"] {
            let once = clean(input, &options, &settings);
            let twice = clean(&once, &options, &settings);
            assert_eq!(once, twice);
        }
    }
}
