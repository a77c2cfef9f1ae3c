//! Commit stamping for baselines.
//!
//! A baseline records the commit it was taken at so a later diff can say
//! what it is being compared against. Stamping is best-effort: a workspace
//! outside git, or a fresh repository with no commits, simply gets no stamp.

use std::path::Path;
use std::process::Command;

use crate::domain::error::{OdavlError, Result};

/// Characters shown when a commit id is printed next to a baseline.
pub const SHORT_SHA_LEN: usize = 8;

/// Full object id of the commit checked out in `workspace`.
pub fn head_commit(workspace: &Path) -> Result<String> {
    let output = Command::new("git")
        .args(["rev-parse", "--verify", "--quiet", "HEAD^{commit}"])
        .current_dir(workspace)
        .output()
        .map_err(|e| OdavlError::GitError(format!("failed to run git: {e}")))?;

    if !output.status.success() {
        return Err(OdavlError::GitError(format!(
            "{} has no HEAD commit",
            workspace.display()
        )));
    }

    let sha = String::from_utf8_lossy(&output.stdout).trim().to_string();
    if !is_object_id(&sha) {
        return Err(OdavlError::GitError(format!(
            "unexpected rev-parse output {sha:?}"
        )));
    }
    Ok(sha)
}

/// Commit to stamp on a new baseline, or `None` when there is nothing to stamp.
pub fn head_commit_if_available(workspace: &Path) -> Option<String> {
    match head_commit(workspace) {
        Ok(sha) => Some(sha),
        Err(e) => {
            tracing::debug!(workspace = %workspace.display(), error = %e, "baseline left unstamped");
            None
        }
    }
}

/// Display prefix of a commit id. Works on user-supplied ids of any shape.
pub fn short_sha(sha: &str) -> &str {
    match sha.char_indices().nth(SHORT_SHA_LEN) {
        Some((end, _)) => &sha[..end],
        None => sha,
    }
}

/// SHA-1 (40) or SHA-256 (64) hex object id.
fn is_object_id(sha: &str) -> bool {
    matches!(sha.len(), 40 | 64) && sha.bytes().all(|b| b.is_ascii_hexdigit())
}
