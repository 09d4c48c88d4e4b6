// src/pipeline/prompts.rs
// Prompt composition for the three generation stages. Wording here is not
// part of any contract; the reply just has to carry a JSON block with the
// documented field names.

use crate::document::Section;
use crate::knowledge::KnowledgeContext;
use crate::pipeline::types::{Scenario, TestPoint};

pub const SCENARIO_SYSTEM: &str = "You are a senior QA engineer. Decompose the \
requirement sections into test scenarios. Reply with a JSON object: \
{\"scenarios\": [{\"id\", \"name\", \"priority\" (high|medium|low), \
\"relatedSectionIds\", \"estimatedPointCount\"}]}.";

pub const TEST_POINT_SYSTEM: &str = "You are a senior QA engineer. Decompose the \
scenario into atomic test points. Reply with a JSON object: \
{\"testPoints\": [{\"name\", \"steps\", \"expectedResult\", \
\"riskLevel\" (high|medium|low)}]}.";

pub const TEST_CASE_SYSTEM: &str = "You are a senior QA engineer. Produce concrete \
test cases for the test point. Reply with a JSON object: \
{\"testCases\": [{\"name\", \"testData\", \"steps\", \"assertions\", \
\"priority\" (high|medium|low)}]}. testData is one 'field: value' pair per \
line; use (empty) for deliberately blank fields.";

pub fn scenario_user_prompt(
    document: &str,
    sections: &[Section],
    knowledge: &KnowledgeContext,
) -> String {
    let mut prompt = String::from("Requirement sections:\n");
    for section in sections {
        prompt.push_str(&format!(
            "[{}] {}\n{}\n\n",
            section.id,
            section.title,
            section.content(document).trim()
        ));
    }
    push_knowledge(&mut prompt, knowledge);
    prompt.push_str("Generate the test scenarios.");
    prompt
}

pub fn test_point_user_prompt(
    scenario: &Scenario,
    document: &str,
    sections: &[Section],
    knowledge: &KnowledgeContext,
) -> String {
    let mut prompt = format!(
        "Scenario: {} (priority {:?}, ~{} points)\n\nRelated requirement text:\n",
        scenario.name, scenario.priority, scenario.estimated_point_count
    );
    for section in sections
        .iter()
        .filter(|s| scenario.related_section_ids.contains(&s.id))
    {
        prompt.push_str(&format!(
            "[{}] {}\n{}\n\n",
            section.id,
            section.title,
            section.content(document).trim()
        ));
    }
    push_knowledge(&mut prompt, knowledge);
    prompt.push_str("Generate the test points for this scenario.");
    prompt
}

pub fn test_case_user_prompt(point: &TestPoint, scenario: &Scenario) -> String {
    format!(
        "Scenario: {}\nTest point: {}\nSteps: {}\nExpected result: {}\nRisk: {:?}\n\n\
         Generate the concrete test cases for this test point.",
        scenario.name,
        point.name,
        point.steps.join("; "),
        point.expected_result,
        point.risk_level
    )
}

fn push_knowledge(prompt: &mut String, knowledge: &KnowledgeContext) {
    if knowledge.is_empty() {
        return;
    }
    let groups = [
        ("Business rules", &knowledge.business_rules),
        ("Test patterns", &knowledge.test_patterns),
        ("Known pitfalls", &knowledge.known_pitfalls),
        ("Risk scenarios", &knowledge.risk_scenarios),
    ];
    for (label, entries) in groups {
        if entries.is_empty() {
            continue;
        }
        prompt.push_str(&format!("{label}:\n"));
        for entry in entries {
            prompt.push_str(&format!("- {}: {}\n", entry.title, entry.content));
        }
        prompt.push('\n');
    }
}
