// src/pipeline/mod.rs
// Generation orchestrator: SegmentDocument -> GenerateScenarios ->
// [per scenario] GenerateTestPoints -> [per test point] GenerateTestCases
// -> Finalize. Stage-level provider failures degrade to templated output;
// only auth/quota failures and an unparseable document abort the request.

pub mod types;

mod finalize;
mod prompts;
mod template;

pub use finalize::{ensure_smoke, force_smoke_priority, inherit_context, partition_by_consistency};

use std::sync::Arc;

use futures::stream::{self, StreamExt};
use serde::de::DeserializeOwned;
use serde_json::Value;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::classify::{self, CaseTypeRules, MainFlowRules};
use crate::config::CaseforgeConfig;
use crate::document::{self, DocumentError, Section};
use crate::extract::ExtractorRules;
use crate::integrity;
use crate::knowledge::{KnowledgeBase, KnowledgeContext};
use crate::llm::{LlmError, LlmProvider};
use types::{GenerationBatch, Scenario, TestCase, TestPoint};

#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("document could not be parsed: {0}")]
    Document(#[from] DocumentError),

    #[error("llm provider unusable ({}): {}", .0.category(), .0)]
    Provider(#[from] LlmError),

    #[error("generation cancelled")]
    Cancelled,
}

/// The rule tables consulted by classification, extraction and validation.
/// Data, not code: swap them without touching the pipeline.
#[derive(Debug, Clone, Default)]
pub struct RuleSet {
    pub extractor: ExtractorRules,
    pub main_flow: MainFlowRules,
    pub case_types: CaseTypeRules,
}

pub struct Orchestrator {
    config: CaseforgeConfig,
    provider: Arc<dyn LlmProvider>,
    knowledge: Arc<dyn KnowledgeBase>,
    rules: RuleSet,
}

impl Orchestrator {
    pub fn new(
        config: CaseforgeConfig,
        provider: Arc<dyn LlmProvider>,
        knowledge: Arc<dyn KnowledgeBase>,
    ) -> Self {
        Self {
            config,
            provider,
            knowledge,
            rules: RuleSet::default(),
        }
    }

    pub fn with_rules(mut self, rules: RuleSet) -> Self {
        self.rules = rules;
        self
    }

    /// Run the full pipeline over one requirement document. The returned
    /// batch is owned by the caller; nothing is retained here.
    pub async fn generate(
        &self,
        document: &str,
        cancel: CancellationToken,
    ) -> Result<GenerationBatch, PipelineError> {
        let (sections, degraded) = match document::segment(document) {
            Ok(sections) => (sections, false),
            Err(DocumentError::NoSectionsFound) => {
                warn!("no headings found; continuing with a synthetic section");
                (vec![document::fallback_section(document)], true)
            }
            Err(e) => return Err(e.into()),
        };
        info!(
            provider = self.provider.name(),
            sections = sections.len(),
            degraded,
            "generation started"
        );

        let knowledge = self.lookup_knowledge(&sections, document).await;

        let scenarios = if degraded {
            vec![template::fallback_scenario(&sections)]
        } else {
            self.generate_scenarios(document, &sections, &knowledge, &cancel)
                .await?
        };

        let concurrency = self.config.max_concurrent_requests.max(1);
        let results: Vec<Result<(Vec<TestPoint>, Vec<TestCase>), PipelineError>> =
            stream::iter(
                scenarios
                    .iter()
                    .map(|sc| self.expand_scenario(document, &sections, sc, &knowledge, &cancel)),
            )
            .buffered(concurrency)
            .collect()
            .await;

        let mut points = Vec::new();
        let mut cases = Vec::new();
        for result in results {
            let (p, c) = result?;
            points.extend(p);
            cases.extend(c);
        }

        let batch = finalize::finalize(scenarios, points, cases, &sections, &self.rules.extractor);
        info!(
            valid = batch.counts.valid_cases,
            filtered = batch.counts.filtered_cases,
            "generation finished"
        );
        Ok(batch)
    }

    async fn lookup_knowledge(&self, sections: &[Section], document: &str) -> KnowledgeContext {
        let query = sections
            .iter()
            .map(|s| s.title.as_str())
            .collect::<Vec<_>>()
            .join("; ");
        let query = if query.is_empty() { document } else { query.as_str() };
        match self
            .knowledge
            .lookup(query, self.config.kb_top_k, self.config.kb_score_threshold)
            .await
        {
            Ok(context) => context,
            Err(e) => {
                warn!(error = %e, "knowledge lookup failed; continuing without context");
                KnowledgeContext::default()
            }
        }
    }

    async fn generate_scenarios(
        &self,
        document: &str,
        sections: &[Section],
        knowledge: &KnowledgeContext,
        cancel: &CancellationToken,
    ) -> Result<Vec<Scenario>, PipelineError> {
        check_cancel(cancel)?;
        let user = prompts::scenario_user_prompt(document, sections, knowledge);
        let reply = self
            .stage_call(prompts::SCENARIO_SYSTEM, &user, self.config.scenario_max_tokens)
            .await?;
        let mut scenarios: Vec<Scenario> = reply
            .map(|value| decode_list(value, "scenarios"))
            .unwrap_or_default();
        if scenarios.is_empty() {
            warn!("scenario stage produced nothing usable; substituting template");
            scenarios.push(template::fallback_scenario(sections));
        }

        for scenario in scenarios.iter_mut() {
            if scenario.id.is_empty() {
                scenario.id = Uuid::new_v4().to_string();
            }
            if scenario.name.is_empty() {
                scenario.name = format!("Scenario {}", scenario.id);
            }
            scenario
                .related_section_ids
                .retain(|id| sections.iter().any(|s| &s.id == id));
            if scenario.related_section_ids.is_empty() {
                if let Some(first) = sections.first() {
                    scenario.related_section_ids.push(first.id.clone());
                }
            }
            if scenario.estimated_point_count == 0 {
                scenario.estimated_point_count = 1;
            }
        }
        Ok(scenarios)
    }

    async fn expand_scenario(
        &self,
        document: &str,
        sections: &[Section],
        scenario: &Scenario,
        knowledge: &KnowledgeContext,
        cancel: &CancellationToken,
    ) -> Result<(Vec<TestPoint>, Vec<TestCase>), PipelineError> {
        check_cancel(cancel)?;
        let user = prompts::test_point_user_prompt(scenario, document, sections, knowledge);
        let reply = self
            .stage_call(prompts::TEST_POINT_SYSTEM, &user, self.config.test_point_max_tokens)
            .await?;
        let mut points: Vec<TestPoint> = reply
            .map(|value| decode_list(value, "testPoints"))
            .unwrap_or_default();
        if points.is_empty() {
            warn!(scenario = %scenario.name, "test point stage degraded to template");
            points.push(template::fallback_test_point(scenario));
        }

        for point in points.iter_mut() {
            if point.id.is_empty() {
                point.id = Uuid::new_v4().to_string();
            }
            point.scenario_id = scenario.id.clone();
            point.is_main_flow = classify::is_main_flow(&point.name, &self.rules.main_flow);
        }
        debug!(scenario = %scenario.name, points = points.len(), "test points ready");

        let mut cases = Vec::new();
        for point in &points {
            check_cancel(cancel)?;
            cases.extend(self.generate_cases(point, scenario).await?);
        }
        Ok((points, cases))
    }

    async fn generate_cases(
        &self,
        point: &TestPoint,
        scenario: &Scenario,
    ) -> Result<Vec<TestCase>, PipelineError> {
        let user = prompts::test_case_user_prompt(point, scenario);
        let reply = self
            .stage_call(prompts::TEST_CASE_SYSTEM, &user, self.config.test_case_max_tokens)
            .await?;
        let mut cases: Vec<TestCase> = reply
            .map(|value| decode_list(value, "testCases"))
            .unwrap_or_default();
        if cases.is_empty() {
            warn!(point = %point.name, "test case stage degraded to template");
            cases.push(template::fallback_test_case(point));
        }

        for case in cases.iter_mut() {
            if case.id.is_empty() {
                case.id = Uuid::new_v4().to_string();
            }
            case.test_point_id = point.id.clone();
            case.scenario_id = scenario.id.clone();
            let classified_text = format!("{} {} {}", case.name, case.description, point.name);
            case.is_main_flow = classify::is_main_flow(&classified_text, &self.rules.main_flow);
            case.case_type = classify::case_type(
                &classified_text,
                case.priority,
                Some(point.risk_level),
                &self.rules.case_types,
            );
        }
        Ok(cases)
    }

    /// One provider round trip plus integrity recovery. Fatal provider
    /// errors propagate; everything else degrades to `None` and the stage
    /// substitutes its template.
    async fn stage_call(
        &self,
        system: &str,
        user: &str,
        max_tokens: usize,
    ) -> Result<Option<Value>, PipelineError> {
        let raw = match self.provider.complete(system, user, max_tokens).await {
            Ok(raw) => raw,
            Err(e) if e.is_fatal() => return Err(e.into()),
            Err(e) => {
                warn!(category = e.category(), error = %e, "provider call failed");
                return Ok(None);
            }
        };
        match integrity::recover(&raw) {
            Ok(value) => Ok(Some(value)),
            Err(e) => {
                warn!(error = %e, "reply did not decode");
                Ok(None)
            }
        }
    }
}

fn check_cancel(cancel: &CancellationToken) -> Result<(), PipelineError> {
    if cancel.is_cancelled() {
        return Err(PipelineError::Cancelled);
    }
    Ok(())
}

/// Decode a list of records from either a bare array or an object holding
/// the named array field. Elements that refuse to decode are skipped so
/// one bad record does not poison the stage.
fn decode_list<T: DeserializeOwned>(value: Value, field: &str) -> Vec<T> {
    let arr = match value {
        Value::Array(a) => a,
        Value::Object(mut o) => match o.remove(field) {
            Some(Value::Array(a)) => a,
            _ => return Vec::new(),
        },
        _ => return Vec::new(),
    };
    arr.into_iter()
        .filter_map(|v| match serde_json::from_value(v) {
            Ok(record) => Some(record),
            Err(e) => {
                warn!(field, error = %e, "dropping record that failed to decode");
                None
            }
        })
        .collect()
}
