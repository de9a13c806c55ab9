//! Source file discovery

use crate::config::{DEFAULT_EXCLUDES, IndexOptions};
use crate::languages::LanguageRegistry;
use anyhow::{Context, Result};
use globset::{Glob, GlobSet, GlobSetBuilder};
use ignore::WalkBuilder;
use std::path::{Path, PathBuf};

/// Compile the default excludes plus `extra` into one set.
pub fn exclude_set(extra: &[String]) -> Result<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for pattern in DEFAULT_EXCLUDES.iter().copied().chain(extra.iter().map(String::as_str)) {
        let glob = Glob::new(pattern).with_context(|| format!("Invalid exclude pattern {:?}", pattern))?;
        builder.add(glob);
    }
    builder.build().context("Failed to build exclude set")
}

/// Files under `root` that a registered parser understands, as paths
/// relative to `root`, sorted.
pub fn collect_files(root: &Path, options: &IndexOptions, registry: &LanguageRegistry) -> Result<Vec<PathBuf>> {
    let excludes = exclude_set(&options.exclude)?;
    let walker = WalkBuilder::new(root)
        .hidden(false)
        .git_ignore(options.respect_gitignore)
        .git_exclude(options.respect_gitignore)
        .ignore(options.respect_gitignore)
        .require_git(false)
        .filter_entry(|e| !matches!(e.file_name().to_str(), Some(".git" | ".sapwood")))
        .build();

    let mut files = Vec::new();
    let mut skipped = 0usize;
    for dent in walker {
        let dent = match dent {
            Ok(d) => d,
            Err(e) => {
                tracing::warn!("Walker error: {}", e);
                continue;
            }
        };
        if !dent.file_type().is_some_and(|t| t.is_file()) {
            continue;
        }
        let Ok(relative) = dent.path().strip_prefix(root) else {
            continue;
        };
        if excludes.is_match(relative) || !registry.supports(relative) {
            continue;
        }
        let size = dent.metadata().map(|m| m.len()).unwrap_or(0);
        if size > options.max_file_bytes {
            tracing::debug!("Skipping {} ({} bytes)", relative.display(), size);
            skipped += 1;
            continue;
        }
        files.push(relative.to_path_buf());
    }
    files.sort();
    tracing::info!("Found {} source files ({} too large)", files.len(), skipped);
    Ok(files)
}
