// src/pipeline/template.rs
// Minimal templated records substituted when a generation stage cannot
// produce usable output. Same shape as the expected stage output,
// populated from whatever context is available, so downstream stages
// always receive a non-empty input and the batch is never fully empty.

use uuid::Uuid;

use crate::document::Section;
use crate::pipeline::types::{Priority, RiskLevel, Scenario, TestCase, TestPoint};

pub fn fallback_scenario(sections: &[Section]) -> Scenario {
    let first = sections.first();
    Scenario {
        id: Uuid::new_v4().to_string(),
        name: first
            .map(|s| format!("Basic verification of {}", s.title))
            .unwrap_or_else(|| "Basic verification".to_string()),
        priority: Priority::High,
        related_section_ids: first.map(|s| vec![s.id.clone()]).unwrap_or_default(),
        estimated_point_count: 1,
    }
}

pub fn fallback_test_point(scenario: &Scenario) -> TestPoint {
    TestPoint {
        id: Uuid::new_v4().to_string(),
        scenario_id: scenario.id.clone(),
        name: format!("Verify {}", scenario.name),
        steps: vec![
            "Prepare the preconditions described by the requirement".to_string(),
            "Execute the nominal flow".to_string(),
        ],
        expected_result: "The flow completes as specified".to_string(),
        risk_level: RiskLevel::Medium,
        is_main_flow: true,
    }
}

pub fn fallback_test_case(point: &TestPoint) -> TestCase {
    TestCase {
        id: Uuid::new_v4().to_string(),
        test_point_id: point.id.clone(),
        scenario_id: point.scenario_id.clone(),
        name: format!("{} - nominal execution", point.name),
        description: point.expected_result.clone(),
        test_data: String::new(),
        steps: point.steps.clone(),
        assertions: vec![point.expected_result.clone()],
        priority: Priority::Medium,
        is_main_flow: true,
        ..TestCase::default()
    }
}
