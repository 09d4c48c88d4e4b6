// src/pipeline/types.rs
// Output record shapes. Wire field names (`testPoint`, `expectedResult`,
// `riskLevel`, `caseType`, `sectionId`, ...) are part of the downstream
// contract and must not change.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    High,
    #[default]
    Medium,
    Low,
}

impl Priority {
    /// Sort rank: high first.
    pub fn rank(&self) -> u8 {
        match self {
            Priority::High => 0,
            Priority::Medium => 1,
            Priority::Low => 2,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    High,
    #[default]
    Medium,
    Low,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "UPPERCASE")]
pub enum CaseType {
    Smoke,
    #[default]
    Full,
    Boundary,
    Abnormal,
    Performance,
    Security,
    Usability,
    Compatibility,
    Reliability,
}

impl CaseType {
    /// Fixed severity rank used by the deterministic ordering.
    pub fn rank(&self) -> u8 {
        match self {
            CaseType::Smoke => 0,
            CaseType::Full => 1,
            CaseType::Boundary => 2,
            CaseType::Abnormal => 3,
            CaseType::Performance => 4,
            CaseType::Security => 5,
            CaseType::Usability => 6,
            CaseType::Compatibility => 7,
            CaseType::Reliability => 8,
        }
    }
}

/// Worst-case outcome of the consistency cross-checks, `ok < warning < error`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    #[default]
    Ok,
    Warning,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct ConsistencyReport {
    pub severity: Severity,
    pub warnings: Vec<String>,
}

impl ConsistencyReport {
    pub fn note(&mut self, severity: Severity, warning: String) {
        self.severity = self.severity.max(severity);
        self.warnings.push(warning);
    }
}

/// Coarse-grained test objective decomposed from requirement sections.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Scenario {
    pub id: String,
    pub name: String,
    pub priority: Priority,
    /// Must reference at least one existing section id.
    pub related_section_ids: Vec<String>,
    pub estimated_point_count: u32,
}

impl Default for Scenario {
    fn default() -> Self {
        Self {
            id: String::new(),
            name: String::new(),
            priority: Priority::Medium,
            related_section_ids: Vec::new(),
            estimated_point_count: 1,
        }
    }
}

/// Atomic, independently verifiable check within a scenario.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct TestPoint {
    pub id: String,
    pub scenario_id: String,
    pub name: String,
    pub steps: Vec<String>,
    pub expected_result: String,
    pub risk_level: RiskLevel,
    /// Derived by the classifier, never authored.
    pub is_main_flow: bool,
}

/// Concrete, executable instantiation of a test point.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct TestCase {
    pub id: String,
    pub test_point_id: String,
    pub scenario_id: String,
    pub section_id: String,
    pub section_name: String,
    pub name: String,
    pub description: String,
    /// One `field: value` pair per line.
    pub test_data: String,
    pub steps: Vec<String>,
    pub assertions: Vec<String>,
    pub case_type: CaseType,
    pub priority: Priority,
    pub is_main_flow: bool,
    pub consistency: ConsistencyReport,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct BatchCounts {
    pub scenarios: usize,
    pub test_points: usize,
    pub valid_cases: usize,
    pub filtered_cases: usize,
}

/// Ordered output of one full pipeline run. Owned by the caller; the
/// pipeline retains nothing after returning it.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationBatch {
    pub scenarios: Vec<Scenario>,
    pub test_points: Vec<TestPoint>,
    pub valid_cases: Vec<TestCase>,
    pub filtered_cases: Vec<TestCase>,
    pub counts: BatchCounts,
    pub generated_at: DateTime<Utc>,
}
