//! Bottom-up summarization over processing levels
//!
//! Levels run strictly in order. Inside a level every entity is a task in a
//! `JoinSet`; a shared semaphore bounds how many inference calls are in
//! flight. The whole set is joined and the cache flushed before the next
//! level starts, so an entity only ever sees finished dependency summaries.

use crate::bridge::InferenceProvider;
use crate::budget::{BudgetWarning, UsageSnapshot, UsageTracker};
use crate::error::InferenceError;
use crate::prompt::{
    ARCHITECTURE_SYSTEM_PROMPT, ContextItem, ENTITY_SYSTEM_PROMPT, MODULE_SYSTEM_PROMPT, ProjectContext,
    PromptLimits, architecture_prompt, dependency_context, entity_prompt, module_prompt, truncate,
};
use crate::response::{ParsedSummary, parse_summary};
use crate::retry::RetryPolicy;
use dashmap::DashMap;
use sapwood_core::{
    ARCHITECTURE_ID, AnalysisPlan, ChangeSet, EntityStore, IncrementalCache, MODULE_PREFIX, ProcessingLevel,
    Summary, SummaryScope, TokenUsage, combined_hash, content_hash, group_by_directory,
};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

/// Orchestrator settings.
#[derive(Debug, Clone)]
pub struct OrchestratorConfig {
    /// Upper bound on concurrent inference calls.
    pub max_concurrent_calls: usize,
    pub retry: RetryPolicy,
    pub limits: PromptLimits,
    /// Directories with fewer summarized entities get no module summary.
    pub min_module_entities: usize,
    /// Produce one architecture summary over all modules.
    pub architecture: bool,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        OrchestratorConfig {
            max_concurrent_calls: 8,
            retry: RetryPolicy::default(),
            limits: PromptLimits::default(),
            min_module_entities: 2,
            architecture: true,
        }
    }
}

/// How one summary was obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    Cached,
    Generated,
    Fallback,
}

/// Counts for one run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunReport {
    pub entities: usize,
    pub levels: usize,
    pub forced_levels: usize,
    pub removed_edges: usize,
    pub cached: usize,
    pub generated: usize,
    pub fallbacks: usize,
    pub modules: usize,
    pub modules_cached: usize,
    pub module_fallbacks: usize,
    pub architecture: Option<Outcome>,
    pub usage: UsageSnapshot,
    pub elapsed_ms: u64,
}

impl RunReport {
    fn count(&mut self, outcome: Outcome) {
        match outcome {
            Outcome::Cached => self.cached += 1,
            Outcome::Generated => self.generated += 1,
            Outcome::Fallback => self.fallbacks += 1,
        }
    }

    fn count_module(&mut self, outcome: Outcome) {
        self.modules += 1;
        match outcome {
            Outcome::Cached => self.modules_cached += 1,
            Outcome::Generated => {}
            Outcome::Fallback => self.module_fallbacks += 1,
        }
    }
}

/// Everything a run produced.
#[derive(Debug, Clone, Default, Serialize)]
pub struct RunOutput {
    pub entities: BTreeMap<String, Summary>,
    pub modules: Vec<Summary>,
    pub architecture: Option<Summary>,
    pub report: RunReport,
}

/// Walks an [`AnalysisPlan`] and produces a summary for every entity.
#[derive(Clone)]
pub struct Orchestrator {
    provider: Arc<dyn InferenceProvider>,
    cache: Arc<IncrementalCache>,
    usage: Arc<UsageTracker>,
    config: Arc<OrchestratorConfig>,
}

impl std::fmt::Debug for Orchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Orchestrator")
            .field("provider", &self.provider.name())
            .field("cache", &self.cache)
            .field("config", &self.config)
            .finish()
    }
}

impl Orchestrator {
    pub fn new(
        provider: Arc<dyn InferenceProvider>,
        cache: Arc<IncrementalCache>,
        usage: Arc<UsageTracker>,
        config: OrchestratorConfig,
    ) -> Self {
        Orchestrator {
            provider,
            cache,
            usage,
            config: Arc::new(config),
        }
    }

    pub fn cache(&self) -> &Arc<IncrementalCache> {
        &self.cache
    }

    pub fn usage(&self) -> &Arc<UsageTracker> {
        &self.usage
    }

    /// Compare the store against the cache and invalidate whatever changed,
    /// transitively through dependents.
    pub fn sync_cache(&self, store: &EntityStore) -> ChangeSet {
        let current: HashMap<String, String> = store
            .entities()
            .map(|e| (e.id.clone(), content_hash(e)))
            .collect();
        let change = ChangeSet::detect(&current, &self.cache.entry_hashes());
        if !change.is_empty() {
            change.apply(&self.cache, store);
            self.cache.flush();
        }
        change
    }

    /// Summarize every entity in `plan`, then modules and architecture.
    /// Never fails: anything that cannot be generated becomes a fallback.
    pub async fn run(&self, store: Arc<EntityStore>, plan: &AnalysisPlan, project: &ProjectContext) -> RunOutput {
        let started = Instant::now();
        let produced: Arc<DashMap<String, Summary>> = Arc::new(DashMap::new());
        let semaphore = Arc::new(Semaphore::new(self.config.max_concurrent_calls.max(1)));
        let mut report = RunReport {
            entities: plan.schedule.entity_count(),
            levels: plan.schedule.len(),
            forced_levels: plan.schedule.levels().iter().filter(|l| l.forced).count(),
            removed_edges: plan.cycles.removed.len(),
            ..RunReport::default()
        };

        for level in plan.schedule.levels() {
            let outcomes = self.run_level(&store, level, &produced, &semaphore).await;
            let before = (report.cached, report.generated, report.fallbacks);
            for outcome in outcomes {
                report.count(outcome);
            }
            // Barrier: everything this level wrote is persisted before the next starts.
            self.cache.flush();
            tracing::info!(
                "Level {}/{}: {} entities ({} cached, {} generated, {} fallback){}",
                level.index + 1,
                plan.schedule.len(),
                level.len(),
                report.cached - before.0,
                report.generated - before.1,
                report.fallbacks - before.2,
                if level.forced { " [forced batch]" } else { "" }
            );
            if matches!(self.usage.warning_level(), BudgetWarning::Critical | BudgetWarning::Exhausted) {
                tracing::warn!("Token budget at {:.0}%", self.usage.usage_percentage());
            }
        }

        let entities: BTreeMap<String, Summary> = produced
            .iter()
            .map(|entry| (entry.key().clone(), entry.value().clone()))
            .collect();

        let mut modules = Vec::new();
        for (summary, outcome) in self.summarize_modules(&store, &entities, &semaphore).await {
            report.count_module(outcome);
            modules.push(summary);
        }
        self.prune_stale_modules(&modules);

        let architecture = if self.config.architecture && !modules.is_empty() {
            let (summary, outcome) = self.summarize_architecture(project, &modules, &semaphore).await;
            report.architecture = Some(outcome);
            Some(summary)
        } else {
            None
        };

        self.cache.flush();
        report.usage = self.usage.snapshot();
        report.elapsed_ms = started.elapsed().as_millis() as u64;
        tracing::info!(
            "Summarized {} entities: {} cached, {} generated, {} fallback; {} modules; {} tokens",
            report.entities,
            report.cached,
            report.generated,
            report.fallbacks,
            report.modules,
            report.usage.total_tokens()
        );

        RunOutput {
            entities,
            modules,
            architecture,
            report,
        }
    }

    async fn run_level(
        &self,
        store: &Arc<EntityStore>,
        level: &ProcessingLevel,
        produced: &Arc<DashMap<String, Summary>>,
        semaphore: &Arc<Semaphore>,
    ) -> Vec<Outcome> {
        let mut tasks = JoinSet::new();
        for id in &level.entity_ids {
            let this = self.clone();
            let store = Arc::clone(store);
            let produced = Arc::clone(produced);
            let semaphore = Arc::clone(semaphore);
            let id = id.clone();
            tasks.spawn(async move {
                let result = this.summarize_entity(&store, &id, &produced, &semaphore).await;
                result.map(|(summary, outcome)| {
                    produced.insert(id, summary);
                    outcome
                })
            });
        }

        let mut outcomes = Vec::with_capacity(level.len());
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(Some(outcome)) => outcomes.push(outcome),
                Ok(None) => {}
                Err(e) => tracing::error!("Summarization task failed: {}", e),
            }
        }

        // A task that panicked left no summary behind.
        for id in &level.entity_ids {
            if produced.contains_key(id) {
                continue;
            }
            if let Some(entity) = store.entity(id) {
                produced.insert(id.clone(), Summary::fallback_for(entity, content_hash(entity)));
                outcomes.push(Outcome::Fallback);
            }
        }
        outcomes
    }

    async fn summarize_entity(
        &self,
        store: &EntityStore,
        id: &str,
        produced: &DashMap<String, Summary>,
        semaphore: &Semaphore,
    ) -> Option<(Summary, Outcome)> {
        let Some(entity) = store.entity(id) else {
            tracing::warn!("Scheduled entity {} is not in the store", id);
            return None;
        };
        let hash = content_hash(entity);
        if let Some(hit) = self.cache.lookup(id, &hash) {
            return Some((hit, Outcome::Cached));
        }

        // Same-level entries of a forced batch are used when already present.
        let context = dependency_context(
            store,
            id,
            |dep| produced.get(dep).map(|s| s.value().clone()),
            &self.config.limits,
        );
        let prompt = entity_prompt(entity, &context, &self.config.limits);

        match self.infer(id, ENTITY_SYSTEM_PROMPT, &prompt, semaphore).await {
            Ok((parsed, usage)) => {
                let summary = self.generated(id, SummaryScope::Entity, parsed, usage, &hash);
                let dependencies = store.dependencies_of(id).into_iter().map(|(dep, _)| dep).collect();
                self.cache.store_with_dependencies(&summary, &hash, dependencies);
                Some((summary, Outcome::Generated))
            }
            Err(e) => {
                tracing::warn!("Using fallback summary for {}: {}", id, e);
                self.usage.record_failure();
                Some((Summary::fallback_for(entity, hash), Outcome::Fallback))
            }
        }
    }

    async fn summarize_modules(
        &self,
        store: &EntityStore,
        entities: &BTreeMap<String, Summary>,
        semaphore: &Arc<Semaphore>,
    ) -> Vec<(Summary, Outcome)> {
        let groups = group_by_directory(store, entities.keys().map(String::as_str), self.config.min_module_entities);
        let mut tasks = JoinSet::new();
        for group in groups {
            // Keyed on the members' short forms, so any regenerated member
            // invalidates the module.
            let hash = group.hash(|id| entities.get(id).map(|s| s.summary.as_str()));
            let members: Vec<ContextItem> = group
                .members
                .iter()
                .filter_map(|id| {
                    let entity = store.entity(id)?;
                    let summary = entities.get(id)?;
                    Some(ContextItem {
                        name: entity.name.clone(),
                        kind: entity.kind(),
                        summary: truncate(&summary.summary, self.config.limits.max_summary_chars),
                    })
                })
                .collect();
            let label = group.label();
            let prompt = module_prompt(&label, &members);
            let this = self.clone();
            let semaphore = Arc::clone(semaphore);
            tasks.spawn(async move {
                this.summarize_aggregate(
                    &group.id,
                    SummaryScope::Module,
                    &format!("Module `{}`", label),
                    &hash,
                    MODULE_SYSTEM_PROMPT,
                    &prompt,
                    &semaphore,
                )
                .await
            });
        }

        let mut modules = Vec::new();
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(result) => modules.push(result),
                Err(e) => tracing::error!("Module summarization task failed: {}", e),
            }
        }
        modules.sort_by(|a, b| a.0.entity_id.cmp(&b.0.entity_id));
        modules
    }

    /// Drop module entries whose directory is gone or fell below the
    /// member threshold.
    fn prune_stale_modules(&self, modules: &[Summary]) {
        let current: HashSet<&str> = modules.iter().map(|m| m.entity_id.as_str()).collect();
        let stale = self
            .cache
            .retain(|id| !id.starts_with(MODULE_PREFIX) || current.contains(id));
        if !stale.is_empty() {
            tracing::debug!("Dropped {} stale module entries", stale.len());
        }
    }

    async fn summarize_architecture(
        &self,
        project: &ProjectContext,
        modules: &[Summary],
        semaphore: &Semaphore,
    ) -> (Summary, Outcome) {
        let items: Vec<(String, String)> = modules
            .iter()
            .map(|m| {
                let label = m.entity_id.strip_prefix(MODULE_PREFIX).unwrap_or(m.entity_id.as_str());
                (label.to_string(), truncate(&m.summary, self.config.limits.max_summary_chars))
            })
            .collect();
        let hash = combined_hash(
            modules
                .iter()
                .map(|m| m.summary.as_str())
                .chain(std::iter::once(project.name.as_str())),
        );
        let prompt = architecture_prompt(project, &items);
        self.summarize_aggregate(
            ARCHITECTURE_ID,
            SummaryScope::Architecture,
            &format!("Architecture of `{}`", project.name),
            &hash,
            ARCHITECTURE_SYSTEM_PROMPT,
            &prompt,
            semaphore,
        )
        .await
    }

    #[allow(clippy::too_many_arguments)]
    async fn summarize_aggregate(
        &self,
        id: &str,
        scope: SummaryScope,
        label: &str,
        hash: &str,
        system_prompt: &str,
        prompt: &str,
        semaphore: &Semaphore,
    ) -> (Summary, Outcome) {
        if let Some(hit) = self.cache.lookup(id, hash) {
            return (hit, Outcome::Cached);
        }
        match self.infer(id, system_prompt, prompt, semaphore).await {
            Ok((parsed, usage)) => {
                let summary = self.generated(id, scope, parsed, usage, hash);
                self.cache.store(&summary, hash);
                (summary, Outcome::Generated)
            }
            Err(e) => {
                tracing::warn!("Using fallback summary for {}: {}", id, e);
                self.usage.record_failure();
                (Summary::fallback_aggregate(id, scope, label, hash), Outcome::Fallback)
            }
        }
    }

    /// One gated inference call with retry, timeout and response parsing.
    async fn infer(
        &self,
        label: &str,
        system_prompt: &str,
        user_prompt: &str,
        semaphore: &Semaphore,
    ) -> Result<(ParsedSummary, TokenUsage), InferenceError> {
        if self.usage.is_exhausted() {
            return Err(InferenceError::BudgetExhausted);
        }
        let _permit = semaphore
            .acquire()
            .await
            .map_err(|_| InferenceError::Transport("call limiter closed".to_string()))?;
        if self.usage.is_exhausted() {
            return Err(InferenceError::BudgetExhausted);
        }

        let provider = &self.provider;
        let usage = &self.usage;
        self.config
            .retry
            .run(label, || async move {
                let completion = provider.generate(system_prompt, user_prompt).await?;
                usage.record(&completion);
                let parsed = parse_summary(&completion.text)?;
                Ok((parsed, TokenUsage::new(completion.input_tokens, completion.output_tokens)))
            })
            .await
    }

    fn generated(&self, id: &str, scope: SummaryScope, parsed: ParsedSummary, usage: TokenUsage, hash: &str) -> Summary {
        Summary {
            entity_id: id.to_string(),
            scope,
            summary: parsed.summary,
            description: parsed.description,
            responsibilities: parsed.responsibilities,
            usage,
            model_identity: self.provider.model_identity(),
            content_hash: hash.to_string(),
            fallback: false,
        }
    }
}
