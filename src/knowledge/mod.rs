// src/knowledge/mod.rs
// Knowledge-base collaborator: semantic lookup of previously stored domain
// knowledge, scoped to a named system. Results only enrich prompts; a
// failed lookup degrades silently to "no extra context".

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::debug;

/// One ranked entry from the knowledge base.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct KnowledgeEntry {
    pub score: f32,
    pub title: String,
    pub content: String,
}

/// Four categorized ranked lists returned by one lookup.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct KnowledgeContext {
    pub business_rules: Vec<KnowledgeEntry>,
    pub test_patterns: Vec<KnowledgeEntry>,
    pub known_pitfalls: Vec<KnowledgeEntry>,
    pub risk_scenarios: Vec<KnowledgeEntry>,
}

impl KnowledgeContext {
    pub fn is_empty(&self) -> bool {
        self.business_rules.is_empty()
            && self.test_patterns.is_empty()
            && self.known_pitfalls.is_empty()
            && self.risk_scenarios.is_empty()
    }
}

/// Read-only lookup collaborator, instantiated per logical request.
#[async_trait]
pub trait KnowledgeBase: Send + Sync {
    /// The system this knowledge base is scoped to.
    fn system(&self) -> &str;

    async fn lookup(
        &self,
        query: &str,
        top_k: usize,
        score_threshold: f32,
    ) -> anyhow::Result<KnowledgeContext>;
}

/// No knowledge base configured; every lookup is empty.
pub struct NoopKnowledgeBase;

#[async_trait]
impl KnowledgeBase for NoopKnowledgeBase {
    fn system(&self) -> &str {
        ""
    }

    async fn lookup(
        &self,
        _query: &str,
        _top_k: usize,
        _score_threshold: f32,
    ) -> anyhow::Result<KnowledgeContext> {
        Ok(KnowledgeContext::default())
    }
}

/// HTTP knowledge base speaking a simple search endpoint.
pub struct HttpKnowledgeBase {
    client: Client,
    base_url: String,
    system: String,
}

impl HttpKnowledgeBase {
    pub fn new(base_url: String, system: String) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            system,
        }
    }
}

#[async_trait]
impl KnowledgeBase for HttpKnowledgeBase {
    fn system(&self) -> &str {
        &self.system
    }

    async fn lookup(
        &self,
        query: &str,
        top_k: usize,
        score_threshold: f32,
    ) -> anyhow::Result<KnowledgeContext> {
        let response = self
            .client
            .post(format!("{}/api/knowledge/search", self.base_url))
            .json(&json!({
                "system": self.system,
                "query": query,
                "topK": top_k,
                "scoreThreshold": score_threshold,
            }))
            .send()
            .await?
            .error_for_status()?;

        let context: KnowledgeContext = response.json().await?;
        debug!(
            system = %self.system,
            rules = context.business_rules.len(),
            patterns = context.test_patterns.len(),
            pitfalls = context.known_pitfalls.len(),
            risks = context.risk_scenarios.len(),
            "knowledge lookup"
        );
        Ok(context)
    }
}
