//! CLI command implementations

use crate::config::SapwoodConfig;
use crate::output;
use anyhow::Context;
use clap::Args;
use sapwood_ai::{Orchestrator, ProjectContext, UsageTracker, create_provider};
use sapwood_core::{AnalysisPlan, IncrementalCache, detect_workspace, project_name};
use sapwood_indexer::{IndexResult, index_repository};
use std::path::{Path, PathBuf};
use std::sync::Arc;

#[derive(Args, Debug, Default)]
pub struct SummarizeArgs {
    /// Inference provider (local, openai, anthropic, openrouter)
    #[arg(short, long)]
    pub provider: Option<String>,

    /// Model name passed to the provider
    #[arg(short, long)]
    pub model: Option<String>,

    /// Directory for summaries.json
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Ignore and do not update the persistent cache
    #[arg(long)]
    pub no_cache: bool,

    /// Maximum concurrent inference calls
    #[arg(long)]
    pub concurrency: Option<usize>,

    /// Token budget for this run
    #[arg(long)]
    pub budget: Option<u64>,

    /// Skip the architecture overview
    #[arg(long)]
    pub no_architecture: bool,
}

impl SummarizeArgs {
    fn apply(self, config: &mut SapwoodConfig) -> Option<PathBuf> {
        if let Some(provider) = self.provider {
            config.inference.provider = provider;
        }
        if let Some(model) = self.model {
            config.inference.model = Some(model);
        }
        if let Some(concurrency) = self.concurrency {
            config.inference.max_concurrent_calls = concurrency.max(1);
        }
        if self.budget.is_some() {
            config.inference.token_budget = self.budget;
        }
        if self.no_cache {
            config.cache.enabled = false;
        }
        if self.no_architecture {
            config.aggregation.architecture = false;
        }
        self.output
    }
}

async fn index(root: &Path, config: &SapwoodConfig) -> anyhow::Result<IndexResult> {
    tracing::info!("Indexing repository: {}", root.display());
    let root = root.to_path_buf();
    let options = config.index.clone();
    tokio::task::spawn_blocking(move || index_repository(&root, &options))
        .await
        .context("Indexing task failed")?
}

pub async fn summarize(root: &Path, mut config: SapwoodConfig, args: SummarizeArgs) -> anyhow::Result<()> {
    let output_override = args.apply(&mut config);
    config.validate()?;

    let IndexResult { mut store, stats } = index(root, &config).await?;
    let plan = AnalysisPlan::build(&mut store);
    tracing::info!(
        "Planned {} entities in {} levels ({} cyclic components)",
        plan.schedule.entity_count(),
        plan.schedule.len(),
        plan.cycles.cyclic_components
    );
    tracing::debug!("Index stats: {:?}", stats);

    let provider = create_provider(&config.provider_config())?;
    let model = provider.model_identity();
    let cache_options = config.cache_options(Some(model.clone()));
    let cache = if config.cache.enabled {
        IncrementalCache::open(config.cache_dir(root), cache_options)
    } else {
        IncrementalCache::in_memory(cache_options)
    };
    let usage = UsageTracker::new(config.inference.token_budget);
    let orchestrator = Orchestrator::new(
        provider,
        Arc::new(cache),
        Arc::new(usage),
        config.orchestrator_config(),
    );

    let changes = orchestrator.sync_cache(&store);
    let project = ProjectContext {
        name: project_name(root),
        workspace: detect_workspace(root),
    };
    let run = orchestrator.run(Arc::new(store), &plan, &project).await;

    let out_dir = match output_override {
        Some(dir) if dir.is_absolute() => dir,
        Some(dir) => root.join(dir),
        None => config.output_dir(root),
    };
    let path = output::write_summaries(&out_dir, &project.name, &model, &changes, &run)?;

    print!("{}", output::render_report(&run.report, &changes));
    println!("Summaries written to {}", path.display());
    Ok(())
}

pub async fn plan(root: &Path, config: &SapwoodConfig, json: bool) -> anyhow::Result<()> {
    let IndexResult { mut store, .. } = index(root, config).await?;
    let plan = AnalysisPlan::build(&mut store);

    if json {
        println!("{}", serde_json::to_string_pretty(&plan)?);
        return Ok(());
    }
    for level in plan.schedule.levels() {
        let marker = if level.forced { " (forced)" } else { "" };
        println!("Level {}{}: {} entities", level.index, marker, level.len());
        for id in &level.entity_ids {
            println!("  {}", id);
        }
    }
    if !plan.cycles.removed.is_empty() {
        println!("Removed {} edges to break cycles:", plan.cycles.removed.len());
        for edge in &plan.cycles.removed {
            println!("  {} -> {} ({:?}, weight {})", edge.source_id, edge.target_id, edge.kind, edge.weight);
        }
    }
    Ok(())
}

fn open_cache(root: &Path, config: &SapwoodConfig) -> IncrementalCache {
    IncrementalCache::open(config.cache_dir(root), config.cache_options(None))
}

pub fn cache_stats(root: &Path, config: &SapwoodConfig) -> anyhow::Result<()> {
    let cache = open_cache(root, config);
    let stats = cache.stats();
    println!("Cache: {}", config.cache_dir(root).display());
    println!("Entries: {} ({} expired)", stats.total_entries, stats.expired_entries);
    for (model, count) in &stats.by_model {
        println!("  {}: {}", model, count);
    }
    Ok(())
}

pub fn cache_clear(root: &Path, config: &SapwoodConfig) -> anyhow::Result<()> {
    tracing::info!("Clearing cache for: {}", root.display());
    let cache = open_cache(root, config);
    cache.clear();
    cache.flush();
    tracing::info!("Cache cleared");
    Ok(())
}

pub fn cache_cleanup(root: &Path, config: &SapwoodConfig) -> anyhow::Result<()> {
    let cache = open_cache(root, config);
    let removed = cache.cleanup_expired();
    cache.flush();
    println!("Removed {} expired entries", removed);
    Ok(())
}
