use crate::output::print_json;
use anyhow::Context;
use nexus_core::config::{SyncConfig, SyncPlan};
use nexus_core::git::GitSource;
use nexus_core::sync;
use std::path::Path;

/// Load the plan for `config_path`, resolving paths against its directory.
pub fn load_plan(config_path: &Path) -> anyhow::Result<SyncPlan> {
    let config = SyncConfig::load(config_path).context("failed to load sections config")?;
    let config_dir = config_path.parent().unwrap_or(Path::new("."));
    let git_ssh = std::env::var("GIT_SSH").ok();
    Ok(SyncPlan::from_config(&config, config_dir, git_ssh.as_deref()))
}

pub fn run(config_path: &Path, json: bool) -> anyhow::Result<()> {
    let plan = load_plan(config_path)?;
    let source = GitSource::new(plan.git.depth, plan.git.transport, plan.git.host.clone());

    let manifest = sync::run_with(&plan, &source, |outcome| {
        if !json {
            println!(
                "[ok] {}: {} → {}",
                outcome.id,
                outcome.count,
                outcome.dest.display()
            );
        }
    })
    .context("section sync failed")?;

    if json {
        print_json(&manifest)?;
    } else {
        println!("[ok] wrote {}", plan.manifest_path().display());
    }
    Ok(())
}
