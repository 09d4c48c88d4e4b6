// src/integrity/repair.rs
// Pure, independently testable repair steps for almost-JSON text.

use once_cell::sync::Lazy;
use regex::Regex;

/// Insert a comma between two values/objects that sit on consecutive lines
/// with no separator, a common LLM omission. Only fires when the current
/// line ends a value and the next line starts one, so already-valid text
/// passes through unchanged.
pub fn insert_missing_separators(text: &str) -> String {
    let lines: Vec<&str> = text.lines().collect();
    let mut out = String::with_capacity(text.len() + 16);
    for (i, line) in lines.iter().enumerate() {
        out.push_str(line);
        if let Some(next) = lines.get(i + 1) {
            if needs_separator(line, next) {
                out.push(',');
            }
            out.push('\n');
        }
    }
    if text.ends_with('\n') {
        out.push('\n');
    }
    out
}

fn needs_separator(line: &str, next: &str) -> bool {
    let tail = line.trim_end();
    let head = next.trim_start();
    let ends_value = tail.ends_with('"')
        || tail.ends_with('}')
        || tail.ends_with(']')
        || tail.ends_with("true")
        || tail.ends_with("false")
        || tail.ends_with("null")
        || tail.chars().last().is_some_and(|c| c.is_ascii_digit());
    let starts_value = head.starts_with('"') || head.starts_with('{');
    ends_value && starts_value
}

/// Strip `//` and `/* */` comments outside of string literals.
pub fn strip_comments(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars().peekable();
    let mut in_string = false;
    let mut escaped = false;
    while let Some(c) = chars.next() {
        if in_string {
            out.push(c);
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == '"' {
                in_string = false;
            }
            continue;
        }
        match c {
            '"' => {
                in_string = true;
                out.push('"');
            }
            '/' if chars.peek() == Some(&'/') => {
                for next in chars.by_ref() {
                    if next == '\n' {
                        out.push('\n');
                        break;
                    }
                }
            }
            '/' if chars.peek() == Some(&'*') => {
                chars.next();
                let mut prev = ' ';
                for next in chars.by_ref() {
                    if prev == '*' && next == '/' {
                        break;
                    }
                    prev = next;
                }
            }
            _ => out.push(c),
        }
    }
    out
}

static TRAILING_COMMA: Lazy<Regex> =
    Lazy::new(|| Regex::new(r",\s*([}\]])").expect("trailing comma pattern"));

/// Drop commas directly before a closing brace/bracket.
pub fn strip_trailing_commas(text: &str) -> String {
    TRAILING_COMMA.replace_all(text, "$1").to_string()
}

/// Re-extract the body of `"field": [...]`, normalize the separators
/// between its object elements, and splice it back. Returns `None` when
/// the field or its array is not found.
pub fn rescue_array(text: &str, field: &str) -> Option<String> {
    let needle = format!("\"{}\"", field);
    let field_pos = text.find(&needle)?;
    let open = text[field_pos..].find('[')? + field_pos;

    let bytes = text.as_bytes();
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;
    let mut close = None;
    for (i, &b) in bytes.iter().enumerate().skip(open) {
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
            b'[' => depth += 1,
            b']' => {
                depth -= 1;
                if depth == 0 {
                    close = Some(i);
                    break;
                }
            }
            _ => {}
        }
    }
    let close = close?;

    static GLUED_OBJECTS: Lazy<Regex> =
        Lazy::new(|| Regex::new(r"\}\s*\{").expect("glued objects pattern"));
    let body = &text[open + 1..close];
    let normalized = GLUED_OBJECTS.replace_all(body, "},{").to_string();
    if normalized == body {
        return None;
    }
    Some(format!(
        "{}[{}]{}",
        &text[..open],
        normalized,
        &text[close + 1..]
    ))
}
