//! Workspace/project detection

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkspaceType {
    Cargo,
    Npm,
    GoModules,
    Python,
    Maven,
    Gradle,
}

impl WorkspaceType {
    /// Manifest files in detection order.
    const MANIFESTS: [(&'static str, WorkspaceType); 7] = [
        ("Cargo.toml", WorkspaceType::Cargo),
        ("package.json", WorkspaceType::Npm),
        ("go.mod", WorkspaceType::GoModules),
        ("pyproject.toml", WorkspaceType::Python),
        ("setup.py", WorkspaceType::Python),
        ("pom.xml", WorkspaceType::Maven),
        ("build.gradle", WorkspaceType::Gradle),
    ];

    pub fn label(&self) -> &'static str {
        match self {
            WorkspaceType::Cargo => "Rust (Cargo)",
            WorkspaceType::Npm => "JavaScript/TypeScript (npm)",
            WorkspaceType::GoModules => "Go modules",
            WorkspaceType::Python => "Python",
            WorkspaceType::Maven => "Java (Maven)",
            WorkspaceType::Gradle => "JVM (Gradle)",
        }
    }
}

impl fmt::Display for WorkspaceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Detect the project type from the manifest at `root`.
pub fn detect_workspace(root: &Path) -> Option<WorkspaceType> {
    WorkspaceType::MANIFESTS
        .iter()
        .find(|(manifest, _)| root.join(manifest).exists())
        .map(|&(_, kind)| kind)
}

/// Repository name: the root directory's final component.
pub fn project_name(root: &Path) -> String {
    root.canonicalize()
        .ok()
        .as_deref()
        .unwrap_or(root)
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "project".to_string())
}
