//! Integration tests for Sapwood
//!
//! These tests run the indexer, planner and orchestrator together against a
//! small repository on disk, then drive the binary the same way.

use sapwood_ai::{
    Completion, InferenceError, InferenceProvider, Orchestrator, OrchestratorConfig, Outcome, ProjectContext,
    RunOutput, UsageTracker,
};
use sapwood_core::{AnalysisPlan, CacheOptions, ChangeSet, IncrementalCache};
use sapwood_indexer::{IndexOptions, index_repository};
use std::fs;
use std::path::Path;
use std::process::Command;
use std::sync::{Arc, Mutex};

/// Answers every prompt with `summary of <Name>` and remembers the order.
#[derive(Default)]
struct ScriptedProvider {
    names: Mutex<Vec<String>>,
}

impl ScriptedProvider {
    fn names(&self) -> Vec<String> {
        self.names.lock().unwrap().clone()
    }

    fn position(&self, name: &str) -> usize {
        self.names().iter().position(|n| n == name).unwrap()
    }
}

#[async_trait::async_trait]
impl InferenceProvider for ScriptedProvider {
    async fn generate(&self, _system_prompt: &str, user_prompt: &str) -> Result<Completion, InferenceError> {
        let name = user_prompt
            .lines()
            .find_map(|l| l.strip_prefix("Name: "))
            .unwrap_or("unknown")
            .to_string();
        let text = format!(
            "{{\"summary\": \"summary of {}\", \"description\": \"\", \"responsibilities\": []}}",
            name
        );
        self.names.lock().unwrap().push(name);
        Ok(Completion::new(text, 10, 10))
    }

    fn name(&self) -> &str {
        "Scripted"
    }

    fn model_identity(&self) -> String {
        "test/scripted".to_string()
    }
}

fn write(root: &Path, relative: &str, content: &str) {
    let path = root.join(relative);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, content).unwrap();
}

fn sample_repo() -> tempfile::TempDir {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path();
    write(root, "Cargo.toml", "[package]\nname = \"demo\"\nversion = \"0.1.0\"\n");
    write(root, "src/lib.rs", "use crate::util::helper;\n\npub fn run() {\n    helper();\n}\n");
    write(root, "src/util.rs", "/// Does the work.\npub fn helper() {}\n");
    write(
        root,
        "src/cycle.rs",
        "pub fn ping(n: u32) {\n    pong(n);\n}\n\npub fn pong(n: u32) {\n    ping(n);\n}\n",
    );
    write(root, "scripts/report.py", "def report():\n    return 1\n");
    dir
}

async fn summarize(root: &Path, cache_dir: &Path, provider: Arc<ScriptedProvider>) -> (ChangeSet, RunOutput) {
    let mut store = index_repository(root, &IndexOptions::default()).unwrap().store;
    let plan = AnalysisPlan::build(&mut store);
    let cache = IncrementalCache::open(
        cache_dir,
        CacheOptions {
            ttl: None,
            model_identity: Some(provider.model_identity()),
        },
    );
    let orchestrator = Orchestrator::new(
        provider,
        Arc::new(cache),
        Arc::new(UsageTracker::unlimited()),
        OrchestratorConfig::default(),
    );
    let changes = orchestrator.sync_cache(&store);
    let project = ProjectContext {
        name: "demo".to_string(),
        workspace: None,
    };
    let output = orchestrator.run(Arc::new(store), &plan, &project).await;
    (changes, output)
}

/// Test that dependencies are summarized before their dependents and that
/// cycles do not stall the run
#[tokio::test]
async fn test_pipeline_summarizes_bottom_up() {
    let repo = sample_repo();
    let cache_dir = tempfile::tempdir().unwrap();
    let provider = Arc::new(ScriptedProvider::default());

    let (changes, output) = summarize(repo.path(), cache_dir.path(), Arc::clone(&provider)).await;
    let report = &output.report;

    assert!(changes.modified.is_empty());
    assert_eq!(changes.added.len(), report.entities);
    assert_eq!(report.fallbacks, 0);
    assert_eq!(report.cached, 0);
    assert_eq!(report.generated, report.entities);
    assert!(report.removed_edges >= 1);

    assert!(provider.position("helper") < provider.position("run"));
    for id in ["src/lib.rs::run", "src/util.rs::helper", "src/cycle.rs::ping", "src/cycle.rs::pong"] {
        let summary = &output.entities[id];
        assert!(!summary.fallback, "{} fell back", id);
        assert!(summary.summary.starts_with("summary of"));
    }
    assert!(output.modules.iter().any(|m| m.entity_id == "module:src"));
    assert_eq!(report.architecture, Some(Outcome::Generated));
    assert!(output.architecture.is_some());
}

/// Test that a second run is served entirely from the persisted cache
#[tokio::test]
async fn test_unchanged_rerun_makes_no_calls() {
    let repo = sample_repo();
    let cache_dir = tempfile::tempdir().unwrap();
    let (_, first) = summarize(repo.path(), cache_dir.path(), Arc::new(ScriptedProvider::default())).await;

    let provider = Arc::new(ScriptedProvider::default());
    let (changes, second) = summarize(repo.path(), cache_dir.path(), Arc::clone(&provider)).await;

    assert!(changes.is_empty());
    assert!(provider.names().is_empty());
    assert_eq!(second.report.cached, first.report.entities);
    assert_eq!(second.report.generated, 0);
    assert_eq!(second.report.modules_cached, second.report.modules);
    assert_eq!(second.report.architecture, Some(Outcome::Cached));
    assert_eq!(second.report.usage.calls, 0);
}

/// Test that editing a function regenerates it and its dependents only
#[tokio::test]
async fn test_edit_invalidates_dependents() {
    let repo = sample_repo();
    let cache_dir = tempfile::tempdir().unwrap();
    summarize(repo.path(), cache_dir.path(), Arc::new(ScriptedProvider::default())).await;

    write(repo.path(), "src/util.rs", "/// Does the work.\npub fn helper() {\n    let _ = 1;\n}\n");
    let provider = Arc::new(ScriptedProvider::default());
    let (changes, output) = summarize(repo.path(), cache_dir.path(), Arc::clone(&provider)).await;

    assert!(changes.modified.contains(&"src/util.rs::helper".to_string()));
    assert!(changes.unchanged.contains(&"src/cycle.rs::ping".to_string()));

    let names = provider.names();
    assert!(names.contains(&"helper".to_string()));
    assert!(names.contains(&"run".to_string()));
    assert!(!names.contains(&"ping".to_string()));
    assert!(!names.contains(&"pong".to_string()));
    assert!(output.report.cached >= 3);
    assert!(output.report.generated >= 2);
}

fn sapwood(root: &Path, args: &[&str]) -> std::process::Output {
    Command::new(env!("CARGO_BIN_EXE_sapwood"))
        .arg("--root")
        .arg(root)
        .args(args)
        .env("RUST_LOG", "warn")
        .output()
        .expect("Failed to execute sapwood")
}

/// Test that the CLI can be invoked
#[test]
fn test_cli_version() {
    let output = Command::new(env!("CARGO_BIN_EXE_sapwood")).arg("version").output().unwrap();
    assert!(output.status.success());
    assert!(String::from_utf8_lossy(&output.stdout).contains("Sapwood v"));
}

#[test]
fn test_cli_plan_json() {
    let repo = sample_repo();
    let output = sapwood(repo.path(), &["plan", "--json"]);
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));

    let plan: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert!(plan["schedule"].is_object());
    assert!(!plan["cycles"]["removed"].as_array().unwrap().is_empty());
}

#[test]
fn test_cli_summarize_writes_output() {
    let repo = sample_repo();
    let output = sapwood(repo.path(), &["summarize", "--provider", "local"]);
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));
    assert!(String::from_utf8_lossy(&output.stdout).contains("Summaries written to"));

    let path = repo.path().join(".sapwood/output/summaries.json");
    let document: serde_json::Value = serde_json::from_str(&fs::read_to_string(path).unwrap()).unwrap();
    assert_eq!(document["model"], "local/heuristic-v1");
    assert!(document["entities"]["src/util.rs::helper"]["summary"].is_string());
    assert!(repo.path().join(".sapwood/cache").exists());

    let stats = sapwood(repo.path(), &["cache", "stats"]);
    assert!(stats.status.success());
    assert!(String::from_utf8_lossy(&stats.stdout).contains("local/heuristic-v1"));
}
