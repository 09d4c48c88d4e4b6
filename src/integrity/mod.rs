// src/integrity/mod.rs
// Recovers a structured record from an LLM's free-text reply. The reply is
// supposed to contain a JSON block but frequently does not parse cleanly;
// recovery runs a chain of progressively more permissive repair steps and
// ends in a typed failure, never a retry of the provider call.
//
// This module knows nothing about test-case semantics.

mod repair;

pub use repair::{insert_missing_separators, rescue_array, strip_comments, strip_trailing_commas};

use serde_json::Value;
use tracing::debug;

/// Array fields worth a targeted second extraction pass when the reply as
/// a whole refuses to decode.
const KNOWN_ARRAY_FIELDS: &[&str] = &["testPoints", "testCases", "scenarios"];

#[derive(Debug, thiserror::Error)]
#[error("undecodable structured block in reply of {text_len} bytes (line {line}, column {column})")]
pub struct ResponseFormatError {
    pub text_len: usize,
    pub line: usize,
    pub column: usize,
}

/// Recover the structured record embedded in `raw`.
pub fn recover(raw: &str) -> Result<Value, ResponseFormatError> {
    let candidate = extract_fenced(raw)
        .or_else(|| extract_balanced(raw))
        .unwrap_or_else(|| raw.trim().to_string());
    let candidate = strip_stray_fences(&candidate);

    let repaired = strip_trailing_commas(&insert_missing_separators(&strip_comments(&candidate)));

    let first_err = match serde_json::from_str::<Value>(&repaired) {
        Ok(value) => return Ok(value),
        Err(e) => e,
    };

    for field in KNOWN_ARRAY_FIELDS {
        if let Some(rescued) = rescue_array(&repaired, field) {
            if let Ok(value) = serde_json::from_str::<Value>(&rescued) {
                debug!(field, "recovered reply via array rescue");
                return Ok(value);
            }
        }
    }

    Err(ResponseFormatError {
        text_len: raw.len(),
        line: first_err.line(),
        column: first_err.column(),
    })
}

/// First ```json (or bare ```) fenced block, if any.
fn extract_fenced(text: &str) -> Option<String> {
    let open = text.find("```")?;
    let after_fence = &text[open + 3..];
    let body_start = after_fence.find('\n')?;
    let tag = after_fence[..body_start].trim();
    if !tag.is_empty() && !tag.eq_ignore_ascii_case("json") {
        return None;
    }
    let body = &after_fence[body_start + 1..];
    let close = body.find("```").unwrap_or(body.len());
    Some(body[..close].trim().to_string())
}

/// First balanced `{...}` or `[...]` span, tracked through strings and
/// escapes.
fn extract_balanced(text: &str) -> Option<String> {
    let start = text.find(['{', '['])?;
    let bytes = text.as_bytes();
    let (open, close) = match bytes[start] {
        b'{' => (b'{', b'}'),
        _ => (b'[', b']'),
    };

    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;
    for (i, &b) in bytes.iter().enumerate().skip(start) {
        if in_string {
            if escaped {
                escaped = false;
            } else if b == b'\\' {
                escaped = true;
            } else if b == b'"' {
                in_string = false;
            }
            continue;
        }
        match b {
            b'"' => in_string = true,
            _ if b == open => depth += 1,
            _ if b == close => {
                depth -= 1;
                if depth == 0 {
                    return Some(text[start..=i].to_string());
                }
            }
            _ => {}
        }
    }
    None
}

/// Drop fence markers a model left dangling at either end.
fn strip_stray_fences(text: &str) -> String {
    let mut t = text.trim();
    for prefix in ["```json", "```JSON", "```"] {
        if let Some(rest) = t.strip_prefix(prefix) {
            t = rest.trim_start();
            break;
        }
    }
    if let Some(rest) = t.strip_suffix("```") {
        t = rest.trim_end();
    }
    t.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn clean_fenced_block_decodes() {
        let raw = "Here you go:\n```json\n{\"name\": \"login\"}\n```\nanything else?";
        assert_eq!(recover(raw).unwrap(), json!({"name": "login"}));
    }

    #[test]
    fn bare_balanced_span_decodes() {
        let raw = "prose {\"a\": [1, 2]} trailing prose";
        assert_eq!(recover(raw).unwrap(), json!({"a": [1, 2]}));
    }

    #[test]
    fn missing_separator_between_objects_is_repaired() {
        let raw = "```json\n{\"testPoints\": [\n{\"name\": \"a\"}\n{\"name\": \"b\"}\n]}\n```";
        let clean = "{\"testPoints\": [{\"name\": \"a\"}, {\"name\": \"b\"}]}";
        assert_eq!(
            recover(raw).unwrap(),
            serde_json::from_str::<Value>(clean).unwrap()
        );
    }

    #[test]
    fn comments_and_trailing_commas_are_stripped() {
        let raw = "{\n  // model commentary\n  \"a\": 1, /* huh */\n  \"b\": [1, 2,],\n}";
        assert_eq!(recover(raw).unwrap(), json!({"a": 1, "b": [1, 2]}));
    }

    #[test]
    fn hopeless_reply_yields_typed_error() {
        let raw = "I could not produce JSON this time, sorry.";
        let err = recover(raw).unwrap_err();
        assert_eq!(err.text_len, raw.len());
    }

    #[test]
    fn unclosed_fence_is_tolerated() {
        let raw = "```json\n{\"ok\": true}";
        assert_eq!(recover(raw).unwrap(), json!({"ok": true}));
    }
}
