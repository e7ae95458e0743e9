use crate::cmd::sections::load_plan;
use crate::output::{print_json, print_table};
use anyhow::Context;
use clap::Subcommand;
use nexus_core::config::{SyncConfig, WarnLevel};
use nexus_core::git::Transport;
use std::path::Path;

// ---------------------------------------------------------------------------
// Subcommand types
// ---------------------------------------------------------------------------

#[derive(Subcommand)]
pub enum ConfigSubcommand {
    /// Show the resolved sections plan
    Show,

    /// Validate the config for common mistakes
    Validate,
}

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

pub fn run(config_path: &Path, subcmd: ConfigSubcommand, json: bool) -> anyhow::Result<()> {
    match subcmd {
        ConfigSubcommand::Show => show(config_path, json),
        ConfigSubcommand::Validate => validate(config_path, json),
    }
}

// ---------------------------------------------------------------------------
// show
// ---------------------------------------------------------------------------

fn show(config_path: &Path, json: bool) -> anyhow::Result<()> {
    let plan = load_plan(config_path)?;

    if json {
        print_json(&plan)?;
        return Ok(());
    }

    let transport = match plan.git.transport {
        Transport::Ssh => "ssh",
        Transport::Https => "https",
    };
    println!("Root:          {}", plan.root.display());
    println!("Sources root:  {}", plan.sources_root.display());
    println!(
        "Git:           {} via {} (depth {})",
        plan.git.host, transport, plan.git.depth
    );
    println!();

    if plan.sections.is_empty() {
        println!("No sections configured.");
        return Ok(());
    }

    let rows = plan
        .sections
        .iter()
        .map(|s| {
            vec![
                s.id.clone(),
                s.repo.clone(),
                s.git_ref.clone(),
                s.include.join(", "),
                s.dest.display().to_string(),
            ]
        })
        .collect();
    print_table(&["ID", "REPO", "REF", "INCLUDE", "DEST"], rows);
    Ok(())
}

// ---------------------------------------------------------------------------
// validate
// ---------------------------------------------------------------------------

fn validate(config_path: &Path, json: bool) -> anyhow::Result<()> {
    let config = SyncConfig::load(config_path).context("failed to load sections config")?;
    let warnings = config.validate();

    if json {
        let value = serde_json::json!({
            "sections": config.sections.len(),
            "warnings": warnings,
        });
        print_json(&value)?;
    } else if warnings.is_empty() {
        println!(
            "Config is valid. {} section(s), no warnings.",
            config.sections.len()
        );
    } else {
        for w in &warnings {
            let prefix = match w.level {
                WarnLevel::Warning => "warning",
                WarnLevel::Error => "error",
            };
            println!("[{prefix}] {}", w.message);
        }
    }

    let has_errors = warnings.iter().any(|w| w.level == WarnLevel::Error);
    if has_errors {
        anyhow::bail!("config validation found errors");
    }

    Ok(())
}
