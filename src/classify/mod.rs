// src/classify/mod.rs
// Main-flow detection, case-type tagging and deterministic presentation
// order. The vocabulary is data (ordered rule tables), not code, so the
// rules can be swapped or extended without touching control flow. All of
// this is pure and stateless.

use regex::Regex;

use crate::pipeline::types::{CaseType, Priority, RiskLevel, TestCase};

/// A keyword list where ASCII keywords match on word boundaries
/// (case-insensitive) and CJK keywords match by containment, since `\b`
/// does not separate adjacent han characters.
#[derive(Debug, Clone)]
pub struct KeywordSet {
    ascii: Vec<Regex>,
    cjk: Vec<String>,
}

impl KeywordSet {
    pub fn new<I: IntoIterator<Item = S>, S: AsRef<str>>(words: I) -> Self {
        let mut ascii = Vec::new();
        let mut cjk = Vec::new();
        for w in words {
            let w = w.as_ref();
            if w.is_ascii() {
                let pattern = format!(r"(?i)\b{}\b", regex::escape(w));
                ascii.push(Regex::new(&pattern).expect("keyword pattern"));
            } else {
                cjk.push(w.to_string());
            }
        }
        Self { ascii, cjk }
    }

    pub fn matches(&self, text: &str) -> bool {
        self.ascii.iter().any(|r| r.is_match(text))
            || self.cjk.iter().any(|w| text.contains(w.as_str()))
    }
}

/// Main-flow vocabulary, checked in priority order: strong positive wins
/// over negative, negative over weak positive, and the default is
/// main-flow (absence of a negative signal).
#[derive(Debug, Clone)]
pub struct MainFlowRules {
    pub strong_positive: KeywordSet,
    pub negative: KeywordSet,
    pub weak_positive: KeywordSet,
}

impl Default for MainFlowRules {
    fn default() -> Self {
        Self {
            strong_positive: KeywordSet::new([
                "correct",
                "valid",
                "success",
                "succeeds",
                "successfully",
                "不为空",
                "正确",
                "成功",
                "有效",
            ]),
            negative: KeywordSet::new([
                "empty",
                "blank",
                "invalid",
                "wrong",
                "incorrect",
                "fail",
                "fails",
                "failure",
                "error",
                "exceed",
                "exceeds",
                "overflow",
                "missing",
                "illegal",
                "timeout",
                "为空",
                "错误",
                "无效",
                "失败",
                "超过",
                "超出",
                "缺失",
                "非法",
                "超时",
            ]),
            weak_positive: KeywordSet::new([
                "normal",
                "nominal",
                "main flow",
                "happy path",
                "basic",
                "正常",
                "主流程",
                "基本",
            ]),
        }
    }
}

/// Ordered case-type categories evaluated first-match-wins; a case that
/// matches nothing is FULL.
#[derive(Debug, Clone)]
pub struct CaseTypeRules {
    pub categories: Vec<(CaseType, KeywordSet)>,
    /// Extra smoke trigger: core-path vocabulary, combined with high
    /// priority and high risk.
    pub smoke_core: KeywordSet,
}

impl Default for CaseTypeRules {
    fn default() -> Self {
        Self {
            categories: vec![
                (
                    CaseType::Performance,
                    KeywordSet::new([
                        "performance", "load", "stress", "concurrent", "concurrency",
                        "response time", "throughput", "性能", "压力", "并发", "响应时间",
                    ]),
                ),
                (
                    CaseType::Security,
                    KeywordSet::new([
                        "security", "injection", "xss", "csrf", "privilege", "unauthorized",
                        "encryption", "安全", "注入", "越权", "加密",
                    ]),
                ),
                (
                    CaseType::Compatibility,
                    KeywordSet::new([
                        "compatibility", "compatible", "browser", "resolution",
                        "cross-platform", "兼容", "浏览器", "分辨率",
                    ]),
                ),
                (
                    CaseType::Boundary,
                    KeywordSet::new([
                        "boundary", "limit", "maximum", "minimum", "max length",
                        "min length", "边界", "上限", "下限", "最大", "最小", "临界",
                    ]),
                ),
                (
                    CaseType::Abnormal,
                    KeywordSet::new([
                        "abnormal", "exception", "invalid", "illegal", "error", "empty",
                        "wrong", "fail", "fails", "failure", "异常", "非法", "错误",
                        "为空", "无效", "失败",
                    ]),
                ),
                (
                    CaseType::Usability,
                    KeywordSet::new([
                        "usability", "layout", "tooltip", "prompt text", "user experience",
                        "accessibility", "易用", "界面", "布局", "提示",
                    ]),
                ),
                (
                    CaseType::Reliability,
                    KeywordSet::new([
                        "reliability", "recovery", "failover", "stability", "可靠",
                        "恢复", "稳定",
                    ]),
                ),
                (
                    CaseType::Smoke,
                    KeywordSet::new(["smoke", "sanity", "冒烟"]),
                ),
            ],
            smoke_core: KeywordSet::new([
                "core", "basic", "main flow", "primary", "核心", "基本", "主流程",
            ]),
        }
    }
}

/// Whether a test point or case exercises the nominal path.
pub fn is_main_flow(text: &str, rules: &MainFlowRules) -> bool {
    if rules.strong_positive.matches(text) {
        return true;
    }
    if rules.negative.matches(text) {
        return false;
    }
    if rules.weak_positive.matches(text) {
        return true;
    }
    true
}

/// First-match-wins case-type tag over the concatenated name, description
/// and parent test-point name. High priority plus high risk plus core-path
/// vocabulary also qualifies as smoke.
pub fn case_type(
    text: &str,
    priority: Priority,
    risk_level: Option<RiskLevel>,
    rules: &CaseTypeRules,
) -> CaseType {
    for (ty, keywords) in &rules.categories {
        if keywords.matches(text) {
            return *ty;
        }
    }
    if priority == Priority::High
        && risk_level == Some(RiskLevel::High)
        && rules.smoke_core.matches(text)
    {
        return CaseType::Smoke;
    }
    CaseType::Full
}

/// Deterministic presentation order: main-flow first, then case-type
/// severity rank, then priority. Stable, so ties keep their original
/// relative order.
pub fn order_cases(cases: &mut [TestCase]) {
    cases.sort_by_key(|c| (!c.is_main_flow, c.case_type.rank(), c.priority.rank()));
}
