//! Decimal precision across JSON text
//!
//! `serde_json` reads JSON numbers into `f64`, which loses digits such as the
//! trailing zero of `25.0`. Decimals are therefore moved through the object
//! model as strings carrying an opaque marker. `protect_decimals` applies the
//! marker to JSON text before parsing and `unwrap_markers` turns marked strings
//! back into bare numerals after serializing.

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;
use std::borrow::Cow;

const MARKER: &str = "@ferrite:decimal@";

static MARKED: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#""@ferrite:decimal@(-?[0-9]+(?:\.[0-9]+)?(?:[eE][+-]?[0-9]+)?)""#)
        .expect("decimal marker regex must compile")
});

/// Marked string value for the decimal literal `text`
pub(crate) fn wrap(text: &str) -> Value {
    Value::String(format!("{}{}", MARKER, text))
}

/// Remove the marker, if any.
pub fn strip_marker(text: &str) -> &str {
    text.strip_prefix(MARKER).unwrap_or(text)
}

/// Replace every marked string in serialized JSON with its bare numeral.
pub(crate) fn unwrap_markers(json: &str) -> Cow<'_, str> {
    MARKED.replace_all(json, "$1")
}

/// Rewrite JSON numbers in `json` as marked strings so their exact lexical
/// form survives `serde_json` parsing. Integers that fit `i64` or `u64` are
/// left as numbers.
pub fn protect_decimals(json: &str) -> Cow<'_, str> {
    let bytes = json.as_bytes();
    let mut out = String::new();
    let mut copied = 0;
    let mut in_string = false;
    let mut escaped = false;
    let mut i = 0;

    while i < bytes.len() {
        let b = bytes[i];
        if in_string {
            if escaped {
                escaped = false;
            } else if b == b'\\' {
                escaped = true;
            } else if b == b'"' {
                in_string = false;
            }
            i += 1;
            continue;
        }
        match b {
            b'"' => {
                in_string = true;
                i += 1;
            }
            b'-' | b'0'..=b'9' => {
                let start = i;
                while i < bytes.len()
                    && matches!(bytes[i], b'0'..=b'9' | b'-' | b'+' | b'.' | b'e' | b'E')
                {
                    i += 1;
                }
                let token = &json[start..i];
                if token.parse::<i64>().is_err() && token.parse::<u64>().is_err() {
                    out.push_str(&json[copied..start]);
                    out.push('"');
                    out.push_str(MARKER);
                    out.push_str(token);
                    out.push('"');
                    copied = i;
                }
            }
            _ => i += 1,
        }
    }

    if copied == 0 {
        return Cow::Borrowed(json);
    }
    out.push_str(&json[copied..]);
    Cow::Owned(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn protects_only_non_integer_numbers_outside_strings() {
        let input = r#"{"a": 25.0, "b": 3, "c": "1.5", "d": [-0.10, 1e3], "e": "say \"2.0\""}"#;
        let protected = protect_decimals(input);
        let value: Value = serde_json::from_str(&protected).unwrap();

        assert_eq!(value["a"], Value::String(format!("{}25.0", MARKER)));
        assert_eq!(value["b"], 3);
        assert_eq!(value["c"], "1.5");
        assert_eq!(strip_marker(value["d"][0].as_str().unwrap()), "-0.10");
        assert_eq!(strip_marker(value["d"][1].as_str().unwrap()), "1e3");
        assert_eq!(value["e"], "say \"2.0\"");
    }

    #[test]
    fn integers_beyond_u64_are_protected() {
        let input = r#"{"big": 1234567890123456789012345678, "max": 18446744073709551615}"#;
        let value: Value = serde_json::from_str(&protect_decimals(input)).unwrap();

        assert_eq!(
            value["big"],
            Value::String(format!("{}1234567890123456789012345678", MARKER))
        );
        assert_eq!(value["max"], u64::MAX);
    }

    #[test]
    fn integer_only_text_is_borrowed() {
        assert!(matches!(protect_decimals(r#"{"n": 42}"#), Cow::Borrowed(_)));
    }

    #[test]
    fn markers_become_bare_numerals() {
        let value = serde_json::json!({ "value": wrap("25.0"), "unit": "kg" });
        let text = serde_json::to_string(&value).unwrap();
        assert_eq!(unwrap_markers(&text), r#"{"value":25.0,"unit":"kg"}"#);
    }
}
