//! Inference side of Sapwood
//!
//! This crate turns an [`sapwood_core::AnalysisPlan`] into summaries:
//! prompt construction from already-produced dependency summaries,
//! provider backends, retry and timeout handling, token accounting and
//! the level-by-level orchestrator.

pub mod bridge;
pub mod budget;
pub mod error;
pub mod orchestrator;
pub mod prompt;
pub mod providers;
pub mod response;
pub mod retry;


pub use bridge::{Completion, InferenceProvider, ProviderConfig};
pub use budget::{BudgetWarning, UsageSnapshot, UsageTracker};
pub use error::InferenceError;
pub use orchestrator::{Orchestrator, OrchestratorConfig, Outcome, RunOutput, RunReport};
pub use prompt::{ContextItem, ProjectContext, PromptLimits};
pub use providers::create_provider;
pub use response::{ParsedSummary, parse_summary};
pub use retry::RetryPolicy;
