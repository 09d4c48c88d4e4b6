// src/validator/mod.rs
// Cross-checks a generated test case's name, test data and steps for
// mutual contradiction. A name like "username is empty" is a promise;
// the data and steps have to keep it.
//
// Pure and idempotent: validating the same unmodified case twice yields
// the same report.

use once_cell::sync::Lazy;
use regex::Regex;
use tracing::trace;

use crate::extract::{extract_assertions, extract_quoted_values, ExtractorRules, FieldAssertion};
use crate::pipeline::types::{ConsistencyReport, Severity, TestCase};

/// Values in test data that mean "deliberately left empty".
const EMPTY_MARKERS: &[&str] = &[
    "", "(empty)", "(blank)", "(空)", "（空）", "-", "n/a", "null", "none", "无",
];

/// Phrases in a step that say the field is intentionally kept empty.
/// Known gap: this list is fixed vocabulary and will not cover every
/// phrasing; see DESIGN.md.
const KEPT_EMPTY_PHRASES: &[&str] = &[
    "keep", "leave", "kept empty", "left empty", "left blank", "保持为空", "留空", "不填",
    "不输入",
];

/// Verbs that make a step an input action.
const INPUT_VERBS: &[&str] = &[
    "input", "enter", "type", "fill", "select", "choose", "输入", "填写", "填入", "选择",
];

/// Metadata fields excluded from the literal cross-checks.
const METADATA_FIELDS: &[&str] = &["remarks", "remark", "notes", "note", "备注", "说明"];

static BOTH_EN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)\b(?P<a>[A-Za-z][A-Za-z0-9_ ]*?)\s+and\s+(?P<b>[A-Za-z][A-Za-z0-9_ ]*?)\s+are\s+(?:both\s+)?(?P<state>correct|valid|empty|blank|wrong|invalid|filled|provided|not\s+empty)\b",
    )
    .expect("conjunction pattern")
});

static BOTH_CN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?P<a>[^\s,，、。;；:：]+?)[和与](?P<b>[^\s,，、。;；:：]+?)[均都]?(?P<state>不为空|为空|正确|错误|无效|有效)")
        .expect("cjk conjunction pattern")
});

/// Expand compressed conjunctions so each asserted field can be checked
/// independently: "X and Y are both correct" -> "X is correct, Y is correct".
pub fn normalize_name(name: &str) -> String {
    let step1 = BOTH_EN.replace_all(name, "$a is $state, $b is $state");
    BOTH_CN.replace_all(&step1, "$a$state，$b$state").into_owned()
}

/// Validate one test case. Severity is the maximum across all checks.
pub fn validate(case: &TestCase, rules: &ExtractorRules) -> ConsistencyReport {
    let mut report = ConsistencyReport::default();
    let normalized = normalize_name(&case.name);
    let assertions = extract_assertions(&normalized, rules);
    trace!(case = %case.name, count = assertions.len(), "name assertions");

    let data = TestData::parse(&case.test_data);

    for assertion in &assertions {
        if assertion.state.asserts_empty() {
            check_asserted_empty(case, &data, assertion, &mut report);
        } else {
            check_asserted_not_empty(case, &data, assertion, &mut report);
        }
    }

    cross_check_literals(case, &data, &mut report);
    report
}

/// Parsed `field: value` lines of a test-data block.
struct TestData {
    entries: Vec<(String, String)>,
}

impl TestData {
    fn parse(block: &str) -> Self {
        let entries = block
            .lines()
            .filter_map(|line| {
                let line = line.trim();
                let (field, value) = line.split_once([':', '：'])?;
                Some((field.trim().to_string(), value.trim().to_string()))
            })
            .collect();
        Self { entries }
    }

    fn value_of(&self, field: &str) -> Option<&str> {
        let needle = field.to_lowercase();
        self.entries
            .iter()
            .find(|(f, _)| {
                let f = f.to_lowercase();
                f == needle || f.contains(&needle) || needle.contains(&f)
            })
            .map(|(_, v)| v.as_str())
    }
}

fn is_empty_marker(value: &str) -> bool {
    let v = value.trim().to_lowercase();
    EMPTY_MARKERS.iter().any(|m| *m == v)
}

fn mentions(text: &str, field: &str) -> bool {
    text.to_lowercase().contains(&field.to_lowercase())
}

fn is_input_action(step: &str) -> bool {
    let lower = step.to_lowercase();
    INPUT_VERBS.iter().any(|v| lower.contains(v))
}

fn says_kept_empty(step: &str) -> bool {
    let lower = step.to_lowercase();
    KEPT_EMPTY_PHRASES.iter().any(|p| lower.contains(p))
        && (lower.contains("empty") || lower.contains("blank") || !step.is_ascii())
}

/// Steps that input a concrete value into the asserted field.
fn concrete_input_step<'a>(case: &'a TestCase, field: &str) -> Option<&'a String> {
    case.steps.iter().find(|step| {
        mentions(step, field)
            && is_input_action(step)
            && !says_kept_empty(step)
            && extract_quoted_values(step)
                .iter()
                .any(|v| !is_empty_marker(v))
    })
}

fn check_asserted_empty(
    case: &TestCase,
    data: &TestData,
    assertion: &FieldAssertion,
    report: &mut ConsistencyReport,
) {
    let field = &assertion.field;
    if let Some(value) = data.value_of(field) {
        if !is_empty_marker(value) {
            report.note(
                Severity::Error,
                format!("name asserts '{field}' is empty but test data supplies '{value}'"),
            );
        }
    }
    if let Some(step) = concrete_input_step(case, field) {
        report.note(
            Severity::Error,
            format!("name asserts '{field}' is empty but a step inputs a value: '{step}'"),
        );
    }
}

fn check_asserted_not_empty(
    case: &TestCase,
    data: &TestData,
    assertion: &FieldAssertion,
    report: &mut ConsistencyReport,
) {
    let field = &assertion.field;
    let data_value = data.value_of(field);
    if let Some(value) = data_value {
        if is_empty_marker(value) {
            report.note(
                Severity::Error,
                format!("name asserts '{field}' has a value but test data marks it empty"),
            );
            return;
        }
    }

    let has_input_step = case
        .steps
        .iter()
        .any(|step| mentions(step, field) && is_input_action(step));
    let has_data_value = data_value.map(|v| !is_empty_marker(v)).unwrap_or(false);
    if !has_input_step && !has_data_value {
        report.note(
            Severity::Error,
            format!("name asserts '{field}' has a value but neither steps nor test data supply one"),
        );
    }
}

/// Lower-severity cross-checks between quoted step literals and recorded
/// test-data values. Metadata fields are exempt.
fn cross_check_literals(case: &TestCase, data: &TestData, report: &mut ConsistencyReport) {
    for step in case.steps.iter().filter(|s| is_input_action(s)) {
        for literal in extract_quoted_values(step) {
            if is_empty_marker(&literal) {
                continue;
            }
            if !case.test_data.contains(&literal) {
                report.note(
                    Severity::Warning,
                    format!("step literal '{literal}' does not appear in test data"),
                );
            }
        }
    }

    for (field, value) in &data.entries {
        let lower = field.to_lowercase();
        if METADATA_FIELDS.iter().any(|m| lower.contains(m)) {
            continue;
        }
        if is_empty_marker(value) {
            continue;
        }
        let in_steps = case.steps.iter().any(|s| s.contains(value.as_str()));
        if !in_steps {
            report.note(
                Severity::Warning,
                format!("test data value '{value}' for '{field}' never appears in steps"),
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::types::TestCase;

    fn case(name: &str, test_data: &str, steps: &[&str]) -> TestCase {
        TestCase {
            name: name.to_string(),
            test_data: test_data.to_string(),
            steps: steps.iter().map(|s| s.to_string()).collect(),
            ..TestCase::default()
        }
    }

    #[test]
    fn empty_assertion_contradicted_by_input_step() {
        let rules = ExtractorRules::default();
        let c = case(
            "username is empty, password is not empty",
            "username: (empty)\npassword: 123456",
            &["input 'alice' into the username field", "input '123456' into the password field"],
        );
        let report = validate(&c, &rules);
        assert_eq!(report.severity, Severity::Error);
        assert!(report.warnings.iter().any(|w| w.contains("username")));
    }

    #[test]
    fn kept_empty_step_is_consistent() {
        let rules = ExtractorRules::default();
        let c = case(
            "username is empty",
            "username: (empty)",
            &["leave the username field empty", "click login"],
        );
        let report = validate(&c, &rules);
        assert_eq!(report.severity, Severity::Ok, "{:?}", report.warnings);
    }

    #[test]
    fn not_empty_assertion_needs_a_value_somewhere() {
        let rules = ExtractorRules::default();
        let c = case("password is not empty", "password: (empty)", &["click login"]);
        let report = validate(&c, &rules);
        assert_eq!(report.severity, Severity::Error);
    }

    #[test]
    fn step_literal_missing_from_data_is_a_warning() {
        let rules = ExtractorRules::default();
        let c = case(
            "password is not empty",
            "password: 123456",
            &["input '123456' into the password field", "select 'remember me'"],
        );
        let report = validate(&c, &rules);
        assert_eq!(report.severity, Severity::Warning);
        assert!(report.warnings.iter().any(|w| w.contains("remember me")));
    }

    #[test]
    fn conjunction_expands_per_field() {
        let normalized = normalize_name("username and password are both correct");
        assert!(normalized.contains("username is correct"));
        assert!(normalized.contains("password is correct"));
    }

    #[test]
    fn validate_is_idempotent() {
        let rules = ExtractorRules::default();
        let c = case(
            "username is empty",
            "username: alice",
            &["input 'alice' into username"],
        );
        assert_eq!(validate(&c, &rules), validate(&c, &rules));
    }
}
