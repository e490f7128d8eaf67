// src/mirror/git.rs
// =============================================================================
// The two git commands the mirror needs, behind a small trait so the
// mirror logic can be tested without a network or a git binary.
// =============================================================================

use super::MirrorError;
use std::future::Future;
use std::path::Path;
use std::process::Output;
use tokio::process::Command;

pub trait GitRunner {
    /// `git clone <url>` run inside `parent`
    fn clone_repo(&self, url: &str, parent: &Path) -> impl Future<Output = Result<(), MirrorError>> + Send;

    /// `git checkout <version>` run inside `repo`
    fn checkout(&self, repo: &Path, version: &str) -> impl Future<Output = Result<(), MirrorError>> + Send;
}

/// Runs the real `git` executable found on PATH
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemGit;

impl GitRunner for SystemGit {
    async fn clone_repo(&self, url: &str, parent: &Path) -> Result<(), MirrorError> {
        tracing::info!(url, parent = %parent.display(), "git clone");
        let output = run_git(&["clone", url], parent).await?;
        check_output(&output, "clone", parent)
    }

    async fn checkout(&self, repo: &Path, version: &str) -> Result<(), MirrorError> {
        tracing::info!(repo = %repo.display(), version, "git checkout");
        let output = run_git(&["checkout", version], repo).await?;
        check_output(&output, "checkout", repo)
    }
}

async fn run_git(args: &[&str], cwd: &Path) -> Result<Output, MirrorError> {
    Command::new("git")
        .args(args)
        .current_dir(cwd)
        .output()
        .await
        .map_err(|source| MirrorError::Io {
            action: "running git in",
            path: cwd.to_path_buf(),
            source,
        })
}

fn check_output(output: &Output, operation: &'static str, cwd: &Path) -> Result<(), MirrorError> {
    let stdout = String::from_utf8_lossy(&output.stdout);
    if !stdout.trim().is_empty() {
        tracing::debug!(operation, "{}", stdout.trim());
    }

    if output.status.success() {
        return Ok(());
    }

    Err(MirrorError::Git {
        operation,
        path: cwd.to_path_buf(),
        status: output.status.to_string(),
        stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
    })
}
