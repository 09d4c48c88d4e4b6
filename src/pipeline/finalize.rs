// src/pipeline/finalize.rs
// Post-processing passes over the full case list. Each pass is a pure
// transformation with one invariant it restores; they run in a fixed
// order and never touch the network.

use std::collections::HashMap;

use tracing::{debug, warn};

use crate::classify;
use crate::document::Section;
use crate::extract::ExtractorRules;
use crate::pipeline::types::{
    CaseType, GenerationBatch, Priority, Scenario, Severity, TestCase, TestPoint,
};
use crate::validator;

/// Invariant: every case carries its inherited scenario/section identifiers.
pub fn inherit_context(
    cases: &mut [TestCase],
    points: &[TestPoint],
    scenarios: &[Scenario],
    sections: &[Section],
) {
    let point_scenario: HashMap<&str, &str> = points
        .iter()
        .map(|p| (p.id.as_str(), p.scenario_id.as_str()))
        .collect();
    let scenario_by_id: HashMap<&str, &Scenario> =
        scenarios.iter().map(|s| (s.id.as_str(), s)).collect();

    for case in cases.iter_mut() {
        if case.scenario_id.is_empty() {
            if let Some(sid) = point_scenario.get(case.test_point_id.as_str()) {
                case.scenario_id = (*sid).to_string();
            }
        }
        if case.section_id.is_empty() {
            if let Some(scenario) = scenario_by_id.get(case.scenario_id.as_str()) {
                if let Some(section_id) = scenario.related_section_ids.first() {
                    case.section_id = section_id.clone();
                }
            }
        }
        if case.section_name.is_empty() && !case.section_id.is_empty() {
            if let Some(section) = sections.iter().find(|s| s.id == case.section_id) {
                case.section_name = section.title.clone();
            }
        }
    }
}

/// Invariant: the batch contains at least one SMOKE case. If none exists,
/// the first high-priority case (or, absent one, the first case) is
/// promoted and its priority forced to high.
pub fn ensure_smoke(cases: &mut [TestCase]) {
    if cases.is_empty() || cases.iter().any(|c| c.case_type == CaseType::Smoke) {
        return;
    }
    let idx = cases
        .iter()
        .position(|c| c.priority == Priority::High)
        .unwrap_or(0);
    debug!(case = %cases[idx].name, "promoting case to SMOKE");
    cases[idx].case_type = CaseType::Smoke;
    cases[idx].priority = Priority::High;
}

/// Invariant: every SMOKE case has high priority.
pub fn force_smoke_priority(cases: &mut [TestCase]) {
    for case in cases.iter_mut() {
        if case.case_type == CaseType::Smoke {
            case.priority = Priority::High;
        }
    }
}

/// Validate every case and split off those that contradict themselves.
/// If nothing survives, the unfiltered set is returned tagged with a
/// consistency warning rather than returning nothing.
pub fn partition_by_consistency(
    mut cases: Vec<TestCase>,
    rules: &ExtractorRules,
) -> (Vec<TestCase>, Vec<TestCase>) {
    for case in cases.iter_mut() {
        case.consistency = validator::validate(case, rules);
    }
    let (valid, filtered): (Vec<_>, Vec<_>) = cases
        .into_iter()
        .partition(|c| c.consistency.severity < Severity::Error);

    if valid.is_empty() && !filtered.is_empty() {
        warn!(
            filtered = filtered.len(),
            "every case failed consistency checks; returning them flagged"
        );
        let mut fallback = filtered;
        for case in fallback.iter_mut() {
            case.consistency
                .warnings
                .push("returned despite failed consistency checks".to_string());
        }
        return (fallback, Vec::new());
    }
    (valid, filtered)
}

/// Run all finalize passes in order and assemble the batch.
pub fn finalize(
    scenarios: Vec<Scenario>,
    points: Vec<TestPoint>,
    mut cases: Vec<TestCase>,
    sections: &[Section],
    rules: &ExtractorRules,
) -> GenerationBatch {
    inherit_context(&mut cases, &points, &scenarios, sections);
    ensure_smoke(&mut cases);
    force_smoke_priority(&mut cases);
    let (mut valid, filtered) = partition_by_consistency(cases, rules);
    classify::order_cases(&mut valid);

    let counts = crate::pipeline::types::BatchCounts {
        scenarios: scenarios.len(),
        test_points: points.len(),
        valid_cases: valid.len(),
        filtered_cases: filtered.len(),
    };
    GenerationBatch {
        scenarios,
        test_points: points,
        valid_cases: valid,
        filtered_cases: filtered,
        counts,
        generated_at: chrono::Utc::now(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn plain_case(name: &str, case_type: CaseType, priority: Priority) -> TestCase {
        TestCase {
            name: name.to_string(),
            case_type,
            priority,
            ..TestCase::default()
        }
    }

    #[test]
    fn promotes_exactly_one_case_to_smoke() {
        let mut cases = vec![
            plain_case("a", CaseType::Full, Priority::Medium),
            plain_case("b", CaseType::Boundary, Priority::High),
            plain_case("c", CaseType::Full, Priority::Low),
        ];
        ensure_smoke(&mut cases);
        force_smoke_priority(&mut cases);

        let smoke: Vec<_> = cases.iter().filter(|c| c.case_type == CaseType::Smoke).collect();
        assert_eq!(smoke.len(), 1);
        assert_eq!(smoke[0].name, "b");
        assert_eq!(smoke[0].priority, Priority::High);
    }

    #[test]
    fn existing_smoke_case_blocks_promotion() {
        let mut cases = vec![
            plain_case("a", CaseType::Smoke, Priority::Low),
            plain_case("b", CaseType::Full, Priority::High),
        ];
        ensure_smoke(&mut cases);
        force_smoke_priority(&mut cases);
        assert_eq!(cases.iter().filter(|c| c.case_type == CaseType::Smoke).count(), 1);
        // smoke priority is forced high even when not promoted
        assert_eq!(cases[0].priority, Priority::High);
    }

    #[test]
    fn contradicting_case_is_filtered_while_valid_cases_remain() {
        let rules = ExtractorRules::default();
        let consistent = TestCase {
            name: "username is empty".to_string(),
            test_data: "username: (empty)".to_string(),
            steps: vec!["leave the username field empty".to_string()],
            ..TestCase::default()
        };
        let contradiction = TestCase {
            name: "username is empty".to_string(),
            test_data: "username: alice".to_string(),
            ..TestCase::default()
        };
        let (valid, filtered) = partition_by_consistency(vec![consistent, contradiction], &rules);

        assert_eq!(valid.len(), 1);
        assert_eq!(valid[0].consistency.severity, Severity::Ok);

        assert_eq!(filtered.len(), 1);
        assert_eq!(filtered[0].consistency.severity, Severity::Error);
        assert_eq!(filtered[0].test_data, "username: alice");
        assert!(filtered[0]
            .consistency
            .warnings
            .iter()
            .any(|w| w.contains("username")));
    }

    #[test]
    fn all_error_cases_are_returned_flagged() {
        let rules = ExtractorRules::default();
        let contradiction = TestCase {
            name: "username is empty".to_string(),
            test_data: "username: alice".to_string(),
            ..TestCase::default()
        };
        let (valid, filtered) = partition_by_consistency(vec![contradiction], &rules);
        assert_eq!(valid.len(), 1);
        assert!(filtered.is_empty());
        assert!(valid[0]
            .consistency
            .warnings
            .iter()
            .any(|w| w.contains("despite failed consistency")));
    }
}
