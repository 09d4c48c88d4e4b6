// src/extract/mod.rs
// Generic entity-from-text extraction shared by the segmenter and the
// consistency validator. Pure functions over rule tables; no side effects.

use once_cell::sync::Lazy;
use regex::Regex;

/// Operator surrounding an extracted field token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldState {
    Empty,
    NotEmpty,
    Correct,
    Incorrect,
}

impl FieldState {
    /// Collapse the four operators into the two states the validator
    /// actually checks: a correct or incorrect value is still a value.
    pub fn asserts_empty(&self) -> bool {
        matches!(self, FieldState::Empty)
    }
}

/// A field name and the state its surrounding text asserts about it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldAssertion {
    pub field: String,
    pub state: FieldState,
}

/// One capture template: a regex with a `field` capture group, and the
/// state a match implies. Templates are evaluated in order and a later
/// template never re-claims text already matched by an earlier one, so
/// "not empty" patterns must precede their "empty" substrings.
#[derive(Debug, Clone)]
pub struct CaptureTemplate {
    pub pattern: Regex,
    pub state: FieldState,
}

/// Ordered capture templates plus the stop-list of abstract nouns that are
/// grammatically valid matches but never real field names.
#[derive(Debug, Clone)]
pub struct ExtractorRules {
    pub templates: Vec<CaptureTemplate>,
    pub stop_list: Vec<String>,
}

static DEFAULT_TEMPLATES: Lazy<Vec<CaptureTemplate>> = Lazy::new(|| {
    let tpl = |pattern: &str, state: FieldState| CaptureTemplate {
        pattern: Regex::new(pattern).expect("builtin capture template"),
        state,
    };
    vec![
        // Not-empty forms first so the bare "empty" templates cannot
        // claim the tail of "not empty" / "不为空".
        tpl(
            r"(?i)\b(?P<field>[A-Za-z][A-Za-z0-9_ ]*?)\s+(?:is|are)\s+not\s+(?:empty|blank)\b",
            FieldState::NotEmpty,
        ),
        tpl(r"(?P<field>[^\s,，、。;；:：]+?)不为空", FieldState::NotEmpty),
        tpl(
            r"(?i)\b(?P<field>[A-Za-z][A-Za-z0-9_ ]*?)\s+(?:is|are)\s+(?:filled|provided|present)\b",
            FieldState::NotEmpty,
        ),
        tpl(
            r"(?i)\b(?P<field>[A-Za-z][A-Za-z0-9_ ]*?)\s+(?:is|are)\s+(?:left\s+)?(?:empty|blank|unfilled|not\s+filled)\b",
            FieldState::Empty,
        ),
        tpl(r"(?P<field>[^\s,，、。;；:：]+?)为空", FieldState::Empty),
        tpl(r"(?P<field>[^\s,，、。;；:：]+?)未填写", FieldState::Empty),
        tpl(
            r"(?i)\b(?P<field>[A-Za-z][A-Za-z0-9_ ]*?)\s+(?:is|are)\s+(?:correct|valid)\b",
            FieldState::Correct,
        ),
        tpl(r"(?P<field>[^\s,，、。;；:：]+?)正确", FieldState::Correct),
        tpl(
            r"(?i)\b(?P<field>[A-Za-z][A-Za-z0-9_ ]*?)\s+(?:is|are)\s+(?:wrong|incorrect|invalid)\b",
            FieldState::Incorrect,
        ),
        tpl(r"(?P<field>[^\s,，、。;；:：]+?)(?:错误|不正确|无效)", FieldState::Incorrect),
    ]
});

static DEFAULT_STOP_LIST: Lazy<Vec<String>> = Lazy::new(|| {
    [
        "credentials",
        "credential",
        "information",
        "data",
        "details",
        "value",
        "values",
        "input",
        "field",
        "fields",
        "信息",
        "数据",
        "凭证",
        "内容",
        "字段",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
});

impl Default for ExtractorRules {
    fn default() -> Self {
        Self {
            templates: DEFAULT_TEMPLATES.clone(),
            stop_list: DEFAULT_STOP_LIST.clone(),
        }
    }
}

impl ExtractorRules {
    fn is_stop_word(&self, field: &str) -> bool {
        let lower = field.to_lowercase();
        self.stop_list.iter().any(|s| s == &lower || s == field)
    }
}

/// Extract `(field, state)` pairs from free text. Earlier templates win on
/// overlapping spans; stop-listed tokens and duplicate fields are dropped.
pub fn extract_assertions(text: &str, rules: &ExtractorRules) -> Vec<FieldAssertion> {
    let mut claimed: Vec<(usize, usize)> = Vec::new();
    let mut out: Vec<FieldAssertion> = Vec::new();

    for template in &rules.templates {
        for caps in template.pattern.captures_iter(text) {
            let whole = caps.get(0).expect("match 0 always present");
            let overlaps = claimed
                .iter()
                .any(|&(s, e)| whole.start() < e && s < whole.end());
            if overlaps {
                continue;
            }
            claimed.push((whole.start(), whole.end()));

            let field = match caps.name("field") {
                Some(m) => m.as_str().trim(),
                None => continue,
            };
            if field.is_empty() || rules.is_stop_word(field) {
                continue;
            }
            if out.iter().any(|a| a.field.eq_ignore_ascii_case(field)) {
                continue;
            }
            out.push(FieldAssertion {
                field: field.to_string(),
                state: template.state,
            });
        }
    }
    out
}

static QUOTED_VALUE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"['"“”‘’「」]([^'"“”‘’「」]+)['"“”‘’「」]"#).expect("quoted value pattern")
});

/// Literal values quoted in a line of text, e.g. input '123456'.
pub fn extract_quoted_values(text: &str) -> Vec<String> {
    QUOTED_VALUE
        .captures_iter(text)
        .map(|c| c[1].trim().to_string())
        .filter(|v| !v.is_empty())
        .collect()
}
