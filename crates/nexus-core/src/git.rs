//! Repository materialization: make a local working copy match a remote ref.
//!
//! Everything here shells out to the `git` binary and blocks until it exits.
//! Credentials come from whatever agent git is already configured with.

use crate::error::{Result, SyncError};
use crate::paths;
use serde::Serialize;
use std::path::Path;
use std::process::Command;
use tracing::{debug, info};

// ---------------------------------------------------------------------------
// Transport
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Transport {
    Ssh,
    Https,
}

impl Transport {
    /// SSH unless the config disables it or `GIT_SSH=0` is set.
    pub fn resolve(config_ssh: bool, env_git_ssh: Option<&str>) -> Transport {
        if config_ssh && env_git_ssh != Some("0") {
            Transport::Ssh
        } else {
            Transport::Https
        }
    }
}

pub fn remote_url(repo: &str, transport: Transport, host: &str) -> String {
    match transport {
        Transport::Ssh => format!("git@{host}:{repo}.git"),
        Transport::Https => format!("https://{host}/{repo}.git"),
    }
}

// ---------------------------------------------------------------------------
// Command helpers
// ---------------------------------------------------------------------------

/// Run `git <args>` in `cwd`, returning trimmed stdout.
fn git(cwd: &Path, args: &[&str]) -> Result<String> {
    let command = format!("git {}", args.join(" "));
    debug!(cwd = %cwd.display(), %command, "running");
    let output = Command::new("git")
        .args(args)
        .current_dir(cwd)
        .output()
        .map_err(|e| SyncError::CommandSpawn {
            command: command.clone(),
            reason: e.to_string(),
        })?;

    if !output.status.success() {
        return Err(SyncError::CommandFailed {
            command,
            code: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        });
    }

    Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
}

/// Ensure `dest` holds a working tree of `url` checked out at `git_ref` and
/// return the resolved HEAD sha.
///
/// Clones shallowly when `dest` is missing, then always fetches the ref at
/// `depth` and force-checks out `FETCH_HEAD`, so a stale or dirty copy
/// converges and branches or tags outside the initial clone resolve.
pub fn ensure_checkout(url: &str, git_ref: &str, dest: &Path, depth: u32) -> Result<String> {
    let depth = depth.max(1).to_string();

    if !dest.exists() {
        let parent = match dest.parent() {
            Some(p) if !p.as_os_str().is_empty() => p,
            _ => Path::new("."),
        };
        std::fs::create_dir_all(parent)?;
        let name = dest
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .ok_or_else(|| {
                SyncError::Io(std::io::Error::new(
                    std::io::ErrorKind::InvalidInput,
                    format!("checkout path has no directory name: {}", dest.display()),
                ))
            })?;
        info!(%url, dest = %dest.display(), "cloning");
        git(
            parent,
            &["clone", "--depth", &depth, "--no-tags", url, &name],
        )?;
    }

    git(dest, &["fetch", "origin", git_ref, "--depth", &depth])?;
    git(dest, &["checkout", "-qf", "FETCH_HEAD"])?;
    git(dest, &["rev-parse", "HEAD"])
}

// ---------------------------------------------------------------------------
// RepoSource
// ---------------------------------------------------------------------------

/// Produces a working tree for `repo` at `git_ref` in `dest` and returns the
/// commit sha it resolved to.
pub trait RepoSource {
    fn materialize(&self, repo: &str, git_ref: &str, dest: &Path) -> Result<String>;
}

/// Materializes repositories from a git host over SSH or HTTPS.
#[derive(Debug, Clone)]
pub struct GitSource {
    pub depth: u32,
    pub transport: Transport,
    pub host: String,
}

impl GitSource {
    pub fn new(depth: u32, transport: Transport, host: impl Into<String>) -> Self {
        Self {
            depth,
            transport,
            host: host.into(),
        }
    }
}

impl RepoSource for GitSource {
    fn materialize(&self, repo: &str, git_ref: &str, dest: &Path) -> Result<String> {
        paths::validate_repo_slug(repo)?;
        let url = remote_url(repo, self.transport, &self.host);
        ensure_checkout(&url, git_ref, dest, self.depth)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use std::process::Command as StdCommand;
    use tempfile::TempDir;

    fn run_git(dir: &Path, args: &[&str]) -> String {
        let output = StdCommand::new("git")
            .args(args)
            .current_dir(dir)
            .output()
            .unwrap();
        assert!(
            output.status.success(),
            "git {:?} failed: {}",
            args,
            String::from_utf8_lossy(&output.stderr)
        );
        String::from_utf8_lossy(&output.stdout).trim().to_string()
    }

    /// A local upstream repo on branch `main` with one commit.
    fn make_upstream() -> TempDir {
        let dir = TempDir::new().unwrap();
        run_git(dir.path(), &["init", "-q"]);
        run_git(dir.path(), &["symbolic-ref", "HEAD", "refs/heads/main"]);
        run_git(dir.path(), &["config", "user.name", "test-user"]);
        run_git(dir.path(), &["config", "user.email", "test@example.com"]);
        std::fs::write(dir.path().join("README.md"), "# Upstream\n").unwrap();
        run_git(dir.path(), &["add", "."]);
        run_git(dir.path(), &["commit", "-q", "-m", "initial"]);
        dir
    }

    fn file_url(dir: &Path) -> String {
        format!("file://{}", dir.display())
    }

    #[test]
    fn transport_resolution() {
        assert_eq!(Transport::resolve(true, None), Transport::Ssh);
        assert_eq!(Transport::resolve(true, Some("1")), Transport::Ssh);
        assert_eq!(Transport::resolve(true, Some("0")), Transport::Https);
        assert_eq!(Transport::resolve(false, None), Transport::Https);
        assert_eq!(Transport::resolve(false, Some("1")), Transport::Https);
    }

    #[test]
    fn remote_urls() {
        assert_eq!(
            remote_url("o/r", Transport::Ssh, "github.com"),
            "git@github.com:o/r.git"
        );
        assert_eq!(
            remote_url("o/r", Transport::Https, "github.com"),
            "https://github.com/o/r.git"
        );
    }

    #[test]
    fn git_source_rejects_bad_slug_before_running_git() {
        let work = TempDir::new().unwrap();
        let dest = work.path().join("bad");
        let source = GitSource::new(1, Transport::Https, "github.com");
        let err = source.materialize("bad slug/repo", "main", &dest).unwrap_err();
        assert!(matches!(err, SyncError::InvalidRepoSlug(_)));
        assert!(!dest.exists());
    }

    #[test]
    fn ensure_checkout_clones_and_returns_head_sha() {
        let upstream = make_upstream();
        let expected = run_git(upstream.path(), &["rev-parse", "HEAD"]);

        let work = TempDir::new().unwrap();
        let dest = work.path().join("cache/o__r");
        let sha = ensure_checkout(&file_url(upstream.path()), "main", &dest, 1).unwrap();

        assert_eq!(sha, expected);
        assert_eq!(sha.len(), 40);
        assert!(dest.join("README.md").exists());
    }

    #[test]
    fn ensure_checkout_converges_on_rerun() {
        let upstream = make_upstream();
        let work = TempDir::new().unwrap();
        let dest = work.path().join("o__r");
        let url = file_url(upstream.path());

        ensure_checkout(&url, "main", &dest, 1).unwrap();
        // Dirty the working copy; the forced checkout must restore it.
        std::fs::write(dest.join("README.md"), "local edit\n").unwrap();
        let sha = ensure_checkout(&url, "main", &dest, 1).unwrap();

        assert_eq!(sha, run_git(upstream.path(), &["rev-parse", "HEAD"]));
        assert_eq!(
            std::fs::read_to_string(dest.join("README.md")).unwrap(),
            "# Upstream\n"
        );
    }

    #[test]
    fn ensure_checkout_follows_upstream_commits() {
        let upstream = make_upstream();
        let work = TempDir::new().unwrap();
        let dest = work.path().join("o__r");
        let url = file_url(upstream.path());

        ensure_checkout(&url, "main", &dest, 1).unwrap();
        std::fs::write(upstream.path().join("README.md"), "# Second\n").unwrap();
        run_git(upstream.path(), &["commit", "-qam", "second"]);
        let sha = ensure_checkout(&url, "main", &dest, 1).unwrap();

        assert_eq!(sha, run_git(upstream.path(), &["rev-parse", "HEAD"]));
        assert_eq!(
            std::fs::read_to_string(dest.join("README.md")).unwrap(),
            "# Second\n"
        );
    }

    #[test]
    fn ensure_checkout_resolves_non_default_branch() {
        let upstream = make_upstream();
        run_git(upstream.path(), &["checkout", "-q", "-b", "dev"]);
        std::fs::write(upstream.path().join("DEV.md"), "dev only\n").unwrap();
        run_git(upstream.path(), &["add", "."]);
        run_git(upstream.path(), &["commit", "-q", "-m", "dev"]);
        let dev_sha = run_git(upstream.path(), &["rev-parse", "HEAD"]);
        run_git(upstream.path(), &["checkout", "-q", "main"]);

        let work = TempDir::new().unwrap();
        let dest = work.path().join("o__r");
        let url = file_url(upstream.path());
        ensure_checkout(&url, "main", &dest, 1).unwrap();
        let sha = ensure_checkout(&url, "dev", &dest, 1).unwrap();

        assert_eq!(sha, dev_sha);
        assert!(dest.join("DEV.md").exists());
    }

    #[test]
    fn ensure_checkout_resolves_annotated_tag() {
        let upstream = make_upstream();
        run_git(upstream.path(), &["tag", "-a", "v2", "-m", "release"]);
        let tagged = run_git(upstream.path(), &["rev-parse", "HEAD"]);
        std::fs::write(upstream.path().join("README.md"), "# Later\n").unwrap();
        run_git(upstream.path(), &["commit", "-qam", "later"]);

        let work = TempDir::new().unwrap();
        let dest = work.path().join("o__r");
        let sha = ensure_checkout(&file_url(upstream.path()), "v2", &dest, 1).unwrap();

        assert_eq!(sha, tagged);
        assert_eq!(
            std::fs::read_to_string(dest.join("README.md")).unwrap(),
            "# Upstream\n"
        );
    }

    #[test]
    fn ensure_checkout_reports_failed_command() {
        let work = TempDir::new().unwrap();
        let missing: PathBuf = work.path().join("does-not-exist");
        let dest = work.path().join("clone");
        let err = ensure_checkout(&file_url(&missing), "main", &dest, 1).unwrap_err();
        match err {
            SyncError::CommandFailed { command, code, .. } => {
                assert!(command.starts_with("git clone"), "{command}");
                assert_ne!(code, Some(0));
            }
            other => panic!("expected CommandFailed, got {other:?}"),
        }
    }
}
