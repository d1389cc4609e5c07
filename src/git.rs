//! # Git Module
//!
//! Reads the branch (or detached commit) and dirty flag of the repository that
//! contains the session's working directory, using gix in-process.
//!
//! Inspection runs on a watchdog thread. If it does not answer within the
//! timeout the caller gets `None` and the worker is left to finish on its own;
//! the process exits right after rendering anyway.

use crate::models::git::GitInfo;
use std::path::{Path, PathBuf};
use std::sync::mpsc;
use std::thread;
use std::time::Duration;

/// Length of the abbreviated commit id shown for a detached HEAD.
const SHORT_COMMIT_LEN: usize = 7;

/// Inspect `dir`, giving up after `timeout`. Any failure means "no git info".
pub fn read_git_info(dir: &Path, timeout: Duration) -> Option<GitInfo> {
    if dir.as_os_str().is_empty() || !dir.is_dir() {
        return None;
    }

    let (tx, rx) = mpsc::channel();
    let dir: PathBuf = dir.to_path_buf();
    let spawned = thread::Builder::new()
        .name("git-inspect".into())
        .spawn(move || {
            let _ = tx.send(inspect(&dir));
        });
    if let Err(err) = spawned {
        tracing::debug!("could not spawn git inspector: {err}");
        return None;
    }

    match rx.recv_timeout(timeout) {
        Ok(info) => info,
        Err(_) => {
            tracing::debug!("git inspection exceeded {timeout:?}");
            None
        }
    }
}

fn inspect(dir: &Path) -> Option<GitInfo> {
    let repo = match gix::discover(dir) {
        Ok(repo) => repo,
        Err(err) => {
            tracing::debug!("not a git repository ({}): {err}", dir.display());
            return None;
        }
    };

    let mut head = repo.head().ok()?;
    // An unborn branch still has a referent name, so a fresh repo shows its branch.
    let label = match head.referent_name() {
        Some(name) => name.shorten().to_string(),
        None => {
            let id = head.try_peel_to_id().ok()??;
            id.to_hex().to_string().chars().take(SHORT_COMMIT_LEN).collect()
        }
    };
    if label.is_empty() {
        return None;
    }

    // Index vs worktree and HEAD vs index; untracked files do not count.
    let dirty = repo.is_dirty().unwrap_or_else(|err| {
        tracing::debug!("git dirty check failed: {err}");
        false
    });

    Some(GitInfo { label, dirty })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_or_missing_dir_has_no_info() {
        let timeout = Duration::from_secs(3);
        assert!(read_git_info(Path::new(""), timeout).is_none());
        assert!(read_git_info(Path::new("/definitely/not/here/ccus"), timeout).is_none());
    }

    #[test]
    fn plain_directory_has_no_info() {
        let dir = tempfile::tempdir().unwrap();
        assert!(read_git_info(dir.path(), Duration::from_secs(3)).is_none());
    }
}
