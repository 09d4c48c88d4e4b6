// src/config/mod.rs
// Pipeline configuration, loaded once from the environment and handed to
// the orchestrator at construction time. Deliberately not a lazy global:
// created once per process, immutable afterward.

use std::str::FromStr;
use std::time::Duration;

use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct CaseforgeConfig {
    // ── LLM provider
    pub llm_base_url: String,
    pub llm_api_key: String,
    pub model: String,

    // ── Per-stage output budgets
    pub scenario_max_tokens: usize,
    pub test_point_max_tokens: usize,
    pub test_case_max_tokens: usize,

    // ── Bootstrap (the only timeout in the system)
    pub bootstrap_timeout_secs: u64,

    // ── Scenario fan-out bound, sized to the provider's rate limit
    pub max_concurrent_requests: usize,

    // ── Knowledge base (empty url disables lookups)
    pub kb_base_url: String,
    pub kb_top_k: usize,
    pub kb_score_threshold: f32,

    // ── Logging
    pub log_level: String,
}

fn env_var_or<T>(key: &str, default: T) -> T
where
    T: FromStr,
{
    match std::env::var(key) {
        Ok(val) => {
            let clean_val = val.split('#').next().unwrap_or("").trim();
            match clean_val.parse::<T>() {
                Ok(parsed) => parsed,
                Err(_) => {
                    eprintln!("Config: {} = '{}' (parse failed, using default)", key, val);
                    default
                }
            }
        }
        Err(_) => default,
    }
}

impl CaseforgeConfig {
    pub fn from_env() -> Self {
        if dotenvy::dotenv().is_err() {
            eprintln!("No .env file found; using environment variables and defaults.");
        }

        Self {
            llm_base_url: env_var_or("CASEFORGE_LLM_BASE_URL", "https://api.openai.com".to_string()),
            llm_api_key: env_var_or("CASEFORGE_LLM_API_KEY", String::new()),
            model: env_var_or("CASEFORGE_MODEL", "gpt-4o-mini".to_string()),
            scenario_max_tokens: env_var_or("CASEFORGE_SCENARIO_MAX_TOKENS", 2048),
            test_point_max_tokens: env_var_or("CASEFORGE_TEST_POINT_MAX_TOKENS", 2048),
            test_case_max_tokens: env_var_or("CASEFORGE_TEST_CASE_MAX_TOKENS", 4096),
            bootstrap_timeout_secs: env_var_or("CASEFORGE_BOOTSTRAP_TIMEOUT_SECS", 10),
            max_concurrent_requests: env_var_or("CASEFORGE_MAX_CONCURRENT_REQUESTS", 4),
            kb_base_url: env_var_or("CASEFORGE_KB_BASE_URL", String::new()),
            kb_top_k: env_var_or("CASEFORGE_KB_TOP_K", 5),
            kb_score_threshold: env_var_or("CASEFORGE_KB_SCORE_THRESHOLD", 0.6),
            log_level: env_var_or("CASEFORGE_LOG_LEVEL", "info".to_string()),
        }
    }

    pub fn bootstrap_timeout(&self) -> Duration {
        Duration::from_secs(self.bootstrap_timeout_secs)
    }
}

impl Default for CaseforgeConfig {
    /// In-process defaults for tests and embedding; identical to an
    /// environment with nothing set.
    fn default() -> Self {
        Self {
            llm_base_url: "https://api.openai.com".to_string(),
            llm_api_key: String::new(),
            model: "gpt-4o-mini".to_string(),
            scenario_max_tokens: 2048,
            test_point_max_tokens: 2048,
            test_case_max_tokens: 4096,
            bootstrap_timeout_secs: 10,
            max_concurrent_requests: 4,
            kb_base_url: String::new(),
            kb_top_k: 5,
            kb_score_threshold: 0.6,
            log_level: "info".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_sane() {
        let cfg = CaseforgeConfig::default();
        assert!(cfg.max_concurrent_requests >= 1);
        assert!(cfg.bootstrap_timeout() > Duration::ZERO);
    }
}
