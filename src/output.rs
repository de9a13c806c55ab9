//! Writing run results to disk

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use sapwood_ai::{RunOutput, RunReport};
use sapwood_core::{ChangeSet, Summary};
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

pub const SUMMARIES_FILE: &str = "summaries.json";

#[derive(Serialize)]
struct SummaryDocument<'a> {
    project: &'a str,
    generated_at: DateTime<Utc>,
    model: &'a str,
    changes: &'a ChangeSet,
    report: &'a RunReport,
    architecture: Option<&'a Summary>,
    modules: &'a [Summary],
    entities: &'a BTreeMap<String, Summary>,
}

/// Write every summary of a run to `<dir>/summaries.json`.
pub fn write_summaries(
    dir: &Path,
    project: &str,
    model: &str,
    changes: &ChangeSet,
    output: &RunOutput,
) -> Result<PathBuf> {
    std::fs::create_dir_all(dir).with_context(|| format!("Failed to create {}", dir.display()))?;
    let document = SummaryDocument {
        project,
        generated_at: Utc::now(),
        model,
        changes,
        report: &output.report,
        architecture: output.architecture.as_ref(),
        modules: &output.modules,
        entities: &output.entities,
    };
    let path = dir.join(SUMMARIES_FILE);
    let json = serde_json::to_string_pretty(&document).context("Failed to serialize summaries")?;
    std::fs::write(&path, json).with_context(|| format!("Failed to write {}", path.display()))?;
    Ok(path)
}

/// Human-readable run report for the terminal.
pub fn render_report(report: &RunReport, changes: &ChangeSet) -> String {
    let mut out = String::new();
    out.push_str(&format!(
        "Changes: {} added, {} modified, {} unchanged, {} removed\n",
        changes.added.len(),
        changes.modified.len(),
        changes.unchanged.len(),
        changes.removed.len()
    ));
    out.push_str(&format!(
        "Entities: {} in {} levels ({} forced, {} edges cut)\n",
        report.entities, report.levels, report.forced_levels, report.removed_edges
    ));
    out.push_str(&format!(
        "Summaries: {} cached, {} generated, {} fallback\n",
        report.cached, report.generated, report.fallbacks
    ));
    out.push_str(&format!(
        "Modules: {} ({} cached, {} fallback)\n",
        report.modules, report.modules_cached, report.module_fallbacks
    ));
    if let Some(outcome) = report.architecture {
        out.push_str(&format!("Architecture: {:?}\n", outcome));
    }
    out.push_str(&format!(
        "Usage: {} calls, {} failures, {} tokens in {} ms\n",
        report.usage.calls,
        report.usage.failures,
        report.usage.total_tokens(),
        report.elapsed_ms
    ));
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_write_summaries_creates_document() {
        let dir = tempfile::tempdir().unwrap();
        let out_dir = dir.path().join("out");
        let output = RunOutput::default();
        let path = write_summaries(&out_dir, "demo", "local/heuristic-v1", &ChangeSet::default(), &output).unwrap();

        let json: serde_json::Value = serde_json::from_str(&std::fs::read_to_string(path).unwrap()).unwrap();
        assert_eq!(json["project"], "demo");
        assert_eq!(json["model"], "local/heuristic-v1");
        assert!(json["architecture"].is_null());
        assert_eq!(json["report"]["generated"], 0);
    }

    #[test]
    fn test_render_report() {
        let report = RunReport {
            entities: 3,
            levels: 2,
            cached: 1,
            generated: 2,
            ..RunReport::default()
        };
        let text = render_report(&report, &ChangeSet::default());
        assert!(text.contains("Entities: 3 in 2 levels"));
        assert!(text.contains("1 cached, 2 generated, 0 fallback"));
    }
}
