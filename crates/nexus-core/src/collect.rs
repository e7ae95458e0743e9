use crate::error::{Result, SyncError};
use globset::{GlobBuilder, GlobSet, GlobSetBuilder};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Compile include patterns. `*` stays within one path segment; `**` crosses them.
pub fn build_globset(patterns: &[String]) -> Result<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        let glob = GlobBuilder::new(pattern)
            .literal_separator(true)
            .build()
            .map_err(|e| SyncError::InvalidGlob {
                pattern: pattern.clone(),
                reason: e.kind().to_string(),
            })?;
        builder.add(glob);
    }
    builder.build().map_err(|e| SyncError::InvalidGlob {
        pattern: patterns.join(", "),
        reason: e.to_string(),
    })
}

/// `path` relative to `root`, joined with `/`.
pub fn relative_posix(root: &Path, path: &Path) -> Option<String> {
    let rel = path.strip_prefix(root).ok()?;
    let parts: Vec<String> = rel
        .components()
        .map(|c| c.as_os_str().to_string_lossy().into_owned())
        .collect();
    if parts.is_empty() {
        return None;
    }
    Some(parts.join("/"))
}

/// Files under `root` matching any of `patterns`, sorted and deduplicated by
/// relative path. The `.git` directory is never entered. A symlink is kept
/// under its own path when it resolves to a regular file; symlinked
/// directories are not descended.
pub fn collect_files(root: &Path, patterns: &[String]) -> Result<Vec<PathBuf>> {
    let set = build_globset(patterns)?;
    if set.is_empty() {
        return Ok(Vec::new());
    }

    let mut found = BTreeMap::new();
    let walker = WalkDir::new(root)
        .follow_links(false)
        .into_iter()
        .filter_entry(|e| !(e.depth() > 0 && e.file_type().is_dir() && e.file_name() == ".git"));

    for entry in walker {
        let entry = entry?;
        let file_type = entry.file_type();
        let is_file =
            file_type.is_file() || (file_type.is_symlink() && entry.path().is_file());
        if !is_file {
            continue;
        }
        let Some(rel) = relative_posix(root, entry.path()) else {
            continue;
        };
        if set.is_match(&rel) {
            found.insert(rel, entry.into_path());
        }
    }

    Ok(found.into_values().collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn touch(root: &Path, rel: &str) {
        let p = root.join(rel);
        std::fs::create_dir_all(p.parent().unwrap()).unwrap();
        std::fs::write(p, "x").unwrap();
    }

    fn tree() -> TempDir {
        let dir = TempDir::new().unwrap();
        for rel in [
            "README.md",
            "docs/intro.md",
            "docs/guide/setup.md",
            "docs/guide/diagram.png",
            "notes.txt",
            ".git/HEAD",
            ".git/info/exclude.md",
        ] {
            touch(dir.path(), rel);
        }
        dir
    }

    fn rels(root: &Path, files: &[PathBuf]) -> Vec<String> {
        files
            .iter()
            .map(|f| relative_posix(root, f).unwrap())
            .collect()
    }

    #[test]
    fn double_star_matches_root_and_nested() {
        let dir = tree();
        let files = collect_files(dir.path(), &["**/*.md".to_string()]).unwrap();
        assert_eq!(
            rels(dir.path(), &files),
            vec!["README.md", "docs/guide/setup.md", "docs/intro.md"]
        );
    }

    #[cfg(unix)]
    #[test]
    fn file_symlinks_are_kept_and_dir_symlinks_skipped() {
        let dir = tree();
        std::os::unix::fs::symlink("docs/intro.md", dir.path().join("INDEX.md")).unwrap();
        std::os::unix::fs::symlink("missing.md", dir.path().join("dangling.md")).unwrap();
        std::os::unix::fs::symlink("docs", dir.path().join("docs-link")).unwrap();

        let files = collect_files(dir.path(), &["**/*.md".to_string()]).unwrap();
        assert_eq!(
            rels(dir.path(), &files),
            vec!["INDEX.md", "README.md", "docs/guide/setup.md", "docs/intro.md"]
        );
    }

    #[test]
    fn single_star_stays_in_segment() {
        let dir = tree();
        let files = collect_files(dir.path(), &["docs/*.md".to_string()]).unwrap();
        assert_eq!(rels(dir.path(), &files), vec!["docs/intro.md"]);
    }

    #[test]
    fn overlapping_patterns_are_deduplicated() {
        let dir = tree();
        let files = collect_files(
            dir.path(),
            &["docs/**/*.md".to_string(), "**/*.md".to_string()],
        )
        .unwrap();
        assert_eq!(files.len(), 3);
    }

    #[test]
    fn match_all_skips_git_dir_and_directories() {
        let dir = tree();
        let files = collect_files(dir.path(), &["**/*".to_string()]).unwrap();
        let rels = rels(dir.path(), &files);
        assert_eq!(rels.len(), 5, "{rels:?}");
        assert!(rels.iter().all(|r| !r.starts_with(".git")));
        assert!(!rels.contains(&"docs".to_string()));
    }

    #[test]
    fn no_patterns_yields_nothing() {
        let dir = tree();
        assert!(collect_files(dir.path(), &[]).unwrap().is_empty());
    }

    #[test]
    fn invalid_pattern_is_an_error() {
        let dir = tree();
        let err = collect_files(dir.path(), &["docs/[".to_string()]).unwrap_err();
        assert!(matches!(err, SyncError::InvalidGlob { .. }));
    }

    #[test]
    fn relative_posix_uses_forward_slashes() {
        let root = Path::new("/work/repo");
        let file = root.join("docs").join("guide").join("a.md");
        assert_eq!(relative_posix(root, &file).unwrap(), "docs/guide/a.md");
        assert!(relative_posix(root, root).is_none());
    }
}
