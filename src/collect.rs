//! Directory walking for `rag index`.

use anyhow::{bail, Result};
use globset::{Glob, GlobSet, GlobSetBuilder};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use crate::config::SourcesConfig;

const DEFAULT_EXCLUDES: [&str; 4] = [
    "**/.git/**",
    "**/target/**",
    "**/node_modules/**",
    "**/__pycache__/**",
];

/// Files under `dir` whose extension is in `extensions`, sorted by path.
///
/// Paths are returned as `dir` joined with the relative path, so the
/// stored identity reflects how the directory was named on the command
/// line. Exclude globs match against the path relative to `dir`.
pub fn collect_files(dir: &Path, extensions: &[String], sources: &SourcesConfig) -> Result<Vec<PathBuf>> {
    if !dir.is_dir() {
        bail!("Directory does not exist: {}", dir.display());
    }

    let mut excludes: Vec<String> = DEFAULT_EXCLUDES.iter().map(|s| s.to_string()).collect();
    excludes.extend(sources.exclude_globs.iter().cloned());
    let exclude_set = build_globset(&excludes)?;

    let wanted: Vec<String> = extensions
        .iter()
        .map(|e| e.trim_start_matches('.').to_ascii_lowercase())
        .collect();

    let mut files = Vec::new();
    for entry in WalkDir::new(dir).follow_links(sources.follow_symlinks) {
        let entry = entry?;
        if !entry.file_type().is_file() {
            continue;
        }

        let path = entry.path();
        let relative = path.strip_prefix(dir).unwrap_or(path);
        // Leading separator so `**/target/**` also matches a top-level target/
        let rel_str = format!("/{}", relative.to_string_lossy());
        if exclude_set.is_match(&rel_str) || exclude_set.is_match(relative) {
            continue;
        }

        let ext = path
            .extension()
            .map(|e| e.to_string_lossy().to_ascii_lowercase())
            .unwrap_or_default();
        if !wanted.iter().any(|w| *w == ext) {
            continue;
        }

        files.push(path.to_path_buf());
    }

    files.sort();
    Ok(files)
}

fn build_globset(patterns: &[String]) -> Result<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        builder.add(Glob::new(pattern)?);
    }
    Ok(builder.build()?)
}
