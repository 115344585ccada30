//! Raw command-line splitting.
//!
//! Turns a `--key value --key2=value2 --flag` string into a key/value map.
//! Used when the gateway relays its own invocation arguments to the
//! directory for diagnostics; full CLI parsing lives with the caller.

use std::collections::HashMap;

/// Splits a raw argument string on `--` into a key→value map.
///
/// Three token forms are accepted: `key value` (space separated),
/// `key=value` (equals separated), and a bare `key` which maps to an empty
/// value. Whitespace around keys and values is trimmed; empty fragments
/// (leading `--`, doubled separators) are skipped.
pub fn extract_args_map(args: &str) -> HashMap<String, String> {
    let mut map = HashMap::new();

    for fragment in args.split("--") {
        let fragment = fragment.trim();
        if fragment.is_empty() {
            continue;
        }
        if let Some((key, value)) = fragment.split_once(' ') {
            map.insert(key.trim().to_string(), value.trim().to_string());
        } else if let Some((key, value)) = fragment.split_once('=') {
            map.insert(key.trim().to_string(), value.trim().to_string());
        } else {
            map.insert(fragment.to_string(), String::new());
        }
    }

    map
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_space_equals_and_bare_forms() {
        let map = extract_args_map("--relays auto --relay-limit=2 --no-stats");
        assert_eq!(map.get("relays").map(String::as_str), Some("auto"));
        assert_eq!(map.get("relay-limit").map(String::as_str), Some("2"));
        assert_eq!(map.get("no-stats").map(String::as_str), Some(""));
        assert_eq!(map.len(), 3);
    }

    #[test]
    fn trims_and_skips_empty_fragments() {
        let map = extract_args_map("  --  --datadir  /var/lib/gw  ");
        assert_eq!(map.get("datadir").map(String::as_str), Some("/var/lib/gw"));
        assert_eq!(map.len(), 1);
    }

    #[test]
    fn space_form_wins_over_equals_inside_value() {
        let map = extract_args_map("--env key=value");
        assert_eq!(map.get("env").map(String::as_str), Some("key=value"));
    }

    #[test]
    fn empty_input_yields_empty_map() {
        assert!(extract_args_map("").is_empty());
    }
}
