//! Section sync: materialize → collect → extract → sort → write, one section
//! at a time. The first failure stops the run before anything later is written.

use crate::collect;
use crate::config::{SectionPlan, SyncPlan};
use crate::error::Result;
use crate::git::RepoSource;
use crate::io;
use crate::item::{build_item, ItemContext};
use crate::paths;
use crate::types::{RunManifest, SectionSummary, SyncItem};
use std::collections::BTreeMap;
use std::path::PathBuf;
use tracing::info;

#[derive(Debug, Clone)]
pub struct SectionOutcome {
    pub id: String,
    pub sha: String,
    pub count: usize,
    pub dest: PathBuf,
}

/// Order by triage name, then case-folded title. Stable, so equal keys keep
/// the collector's path order.
pub fn sort_items(items: &mut [SyncItem]) {
    items.sort_by_cached_key(|item| (item.triage.as_str(), item.title.to_lowercase()));
}

/// Sync one section and write its JSON array to `section.dest`.
pub fn sync_section(
    section: &SectionPlan,
    host: &str,
    source: &dyn RepoSource,
) -> Result<SectionOutcome> {
    let sha = source.materialize(&section.repo, &section.git_ref, &section.checkout)?;

    let files = collect::collect_files(&section.checkout, &section.include)?;
    let ctx = ItemContext {
        repo: &section.repo,
        git_ref: &section.git_ref,
        sha: &sha,
        host,
    };
    let mut items = files
        .iter()
        .map(|f| build_item(&ctx, &section.checkout, f))
        .collect::<Result<Vec<_>>>()?;
    sort_items(&mut items);

    io::write_json(&section.dest, &items)?;
    info!(
        section = %section.id,
        count = items.len(),
        dest = %section.dest.display(),
        "section synced"
    );

    Ok(SectionOutcome {
        id: section.id.clone(),
        sha,
        count: items.len(),
        dest: section.dest.clone(),
    })
}

/// Run every section in order, then write the manifest to `data/nexus.json`.
pub fn run(plan: &SyncPlan, source: &dyn RepoSource) -> Result<RunManifest> {
    run_with(plan, source, |_| {})
}

/// Like [`run`], calling `on_section` after each section is written.
pub fn run_with(
    plan: &SyncPlan,
    source: &dyn RepoSource,
    mut on_section: impl FnMut(&SectionOutcome),
) -> Result<RunManifest> {
    io::ensure_dir(&paths::data_dir(&plan.root))?;

    let mut sections = BTreeMap::new();
    for section in &plan.sections {
        let outcome = sync_section(section, &plan.git.host, source)?;
        on_section(&outcome);
        sections.insert(
            outcome.id.clone(),
            SectionSummary {
                count: outcome.count,
                dest: outcome.dest.display().to_string(),
            },
        );
    }

    let manifest = RunManifest::new(sections);
    io::write_json(&plan.manifest_path(), &manifest)?;
    info!(sections = manifest.sections.len(), "manifest written");
    Ok(manifest)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
