// src/lib.rs

pub mod classify;
pub mod config;
pub mod document;
pub mod extract;
pub mod integrity;
pub mod knowledge;
pub mod llm;
pub mod pipeline;
pub mod validator;

pub use config::CaseforgeConfig;
pub use pipeline::types::{
    CaseType, ConsistencyReport, GenerationBatch, Priority, RiskLevel, Severity, TestCase,
    TestPoint,
};
pub use pipeline::{Orchestrator, PipelineError, RuleSet};
