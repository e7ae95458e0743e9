use crate::output::print_json;
use anyhow::Context;
use nexus_core::{export, paths};
use std::path::Path;

pub fn run(root: &Path, database_url: Option<String>, json: bool) -> anyhow::Result<()> {
    let url = export::resolve_database_url(database_url);
    let out_dir = paths::data_dir(root);

    let rt = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;
    let summary = rt
        .block_on(export::export(&url, &out_dir))
        .context("record export failed")?;

    if json {
        print_json(&summary)?;
    } else {
        println!(
            "[ok] wrote {} and {}",
            summary.triage_counts_path.display(),
            summary.tasks_path.display()
        );
    }
    Ok(())
}
