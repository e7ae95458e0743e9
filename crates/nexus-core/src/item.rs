use crate::collect::relative_posix;
use crate::error::{Result, SyncError};
use crate::meta;
use crate::types::{SyncItem, Triage};
use std::path::Path;

/// Where a batch of files came from. Shared by every item of one section.
#[derive(Debug, Clone)]
pub struct ItemContext<'a> {
    pub repo: &'a str,
    pub git_ref: &'a str,
    pub sha: &'a str,
    pub host: &'a str,
}

/// Web link to a file at a ref: `https://<host>/<repo>/blob/<ref>/<path>`.
pub fn href(host: &str, repo: &str, git_ref: &str, path: &str) -> String {
    format!("https://{host}/{repo}/blob/{git_ref}/{path}")
}

/// Build the normalized record for `file`, which must live under `root`.
pub fn build_item(ctx: &ItemContext<'_>, root: &Path, file: &Path) -> Result<SyncItem> {
    let path = relative_posix(root, file).ok_or_else(|| {
        SyncError::Io(std::io::Error::new(
            std::io::ErrorKind::InvalidInput,
            format!("{} is not under {}", file.display(), root.display()),
        ))
    })?;

    let extracted = meta::extract(file)?;
    let title = extracted.title.unwrap_or_else(|| {
        file.file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default()
    });

    Ok(SyncItem {
        title,
        summary: extracted.summary,
        triage: Triage::normalize(extracted.triage.as_deref()),
        repo: ctx.repo.to_string(),
        git_ref: ctx.git_ref.to_string(),
        sha: ctx.sha.to_string(),
        href: href(ctx.host, ctx.repo, ctx.git_ref, &path),
        path,
    })
}
