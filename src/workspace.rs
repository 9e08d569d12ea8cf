//! Versioned-workspace boundary using git2-rs
//!
//! All workers mutate one shared, git-tracked file tree. This module owns
//! the diff/revert primitives the verification pipeline relies on: the
//! change set since the last known-good commit (HEAD), an idempotent
//! revert back to it, and an accept operation that commits gated work and
//! advances the known-good point.

use git2::{
    build::CheckoutBuilder, DiffOptions, Error as GitError, IndexAddOption, Repository, ResetType,
    Signature, StatusOptions,
};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum WorkspaceError {
    #[error("Git error: {0}")]
    Git(#[from] GitError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Line-level diff stats for one file
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileLineStats {
    pub path: String,
    pub insertions: usize,
    pub deletions: usize,
}

/// Everything that changed since the last known-good commit
///
/// Derived fresh per verification pass; never persisted.
#[derive(Debug, Clone, Default)]
pub struct ChangeSet {
    /// Paths modified, created, or deleted
    pub files: BTreeSet<String>,
    /// Literal text of every added line (the secret scan input)
    pub added_lines: Vec<String>,
    /// Total inserted lines
    pub insertions: usize,
    /// Total deleted lines
    pub deletions: usize,
    /// Per-file line stats
    pub per_file: Vec<FileLineStats>,
}

impl ChangeSet {
    /// Insertions + deletions, the proportionality input
    pub fn changed_lines(&self) -> usize {
        self.insertions + self.deletions
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}

/// Handle to the shared workspace repository
pub struct Workspace {
    repo: Repository,
    root: PathBuf,
}

/// Paths under the tool's own dot directory are invisible to diffing,
/// revert, and accept; worker logs and result artifacts must never count
/// as workspace changes.
fn is_internal(path: &str) -> bool {
    path.strip_prefix(crate::config::DOT_DIR)
        .is_some_and(|rest| rest.is_empty() || rest.starts_with('/'))
}

fn delta_path(delta: &git2::DiffDelta<'_>) -> String {
    delta
        .new_file()
        .path()
        .or_else(|| delta.old_file().path())
        .map(|p| p.to_string_lossy().to_string())
        .unwrap_or_default()
}

impl Workspace {
    /// Open the workspace at the given path. The repository must have at
    /// least one commit (the known-good point).
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, WorkspaceError> {
        let repo = Repository::open(path.as_ref())?;
        let root = path.as_ref().to_path_buf();
        Ok(Self { repo, root })
    }

    /// The workspace root directory
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Compute the change set of the working tree against HEAD, untracked
    /// files included
    pub fn change_set(&self) -> Result<ChangeSet, WorkspaceError> {
        let head = self.repo.head()?.peel_to_commit()?;
        let tree = head.tree()?;

        let mut opts = DiffOptions::new();
        opts.include_untracked(true)
            .recurse_untracked_dirs(true)
            .show_untracked_content(true);

        let diff = self
            .repo
            .diff_tree_to_workdir_with_index(Some(&tree), Some(&mut opts))?;

        // The two callbacks must capture disjoint state, so per-file line
        // tallies are keyed off the delta the line callback receives and
        // merged afterwards.
        let mut files: BTreeSet<String> = BTreeSet::new();
        let mut added_lines: Vec<String> = Vec::new();
        let mut line_stats: BTreeMap<String, (usize, usize)> = BTreeMap::new();

        diff.foreach(
            &mut |delta, _| {
                let path = delta_path(&delta);
                if !is_internal(&path) {
                    files.insert(path);
                }
                true
            },
            None,
            None,
            Some(&mut |delta, _hunk, line| {
                let path = delta_path(&delta);
                if is_internal(&path) {
                    return true;
                }
                let (insertions, deletions) = line_stats.entry(path).or_insert((0, 0));
                match line.origin() {
                    '+' => {
                        *insertions += 1;
                        let text = String::from_utf8_lossy(line.content());
                        added_lines.push(text.trim_end_matches('\n').to_string());
                    }
                    '-' => *deletions += 1,
                    _ => {}
                }
                true
            }),
        )?;

        let mut change = ChangeSet {
            files,
            added_lines,
            ..ChangeSet::default()
        };
        for (path, (insertions, deletions)) in line_stats {
            change.insertions += insertions;
            change.deletions += deletions;
            change.per_file.push(FileLineStats {
                path,
                insertions,
                deletions,
            });
        }

        Ok(change)
    }

    /// Render the working-tree diff as unified patch text
    pub fn diff_text(&self) -> Result<String, WorkspaceError> {
        let head = self.repo.head()?.peel_to_commit()?;
        let tree = head.tree()?;

        let mut opts = DiffOptions::new();
        opts.include_untracked(true)
            .recurse_untracked_dirs(true)
            .show_untracked_content(true);

        let diff = self
            .repo
            .diff_tree_to_workdir_with_index(Some(&tree), Some(&mut opts))?;

        let mut text = String::new();
        diff.print(git2::DiffFormat::Patch, |delta, _hunk, line| {
            if is_internal(&delta_path(&delta)) {
                return true;
            }
            match line.origin() {
                '+' | '-' | ' ' => text.push(line.origin()),
                _ => {}
            }
            text.push_str(&String::from_utf8_lossy(line.content()));
            true
        })?;

        Ok(text)
    }

    /// Restore every tracked file to the last known-good commit and delete
    /// every file introduced since then.
    ///
    /// Idempotent: on an already-clean tree this is a no-op. Individual
    /// untracked removals that fail are logged and skipped so the revert
    /// always runs to completion.
    pub fn revert(&self) -> Result<(), WorkspaceError> {
        let head = self.repo.head()?.peel_to_commit()?;

        let mut checkout = CheckoutBuilder::new();
        checkout.force();
        self.repo
            .reset(head.as_object(), ResetType::Hard, Some(&mut checkout))?;

        // Hard reset leaves untracked additions behind; remove them too.
        let mut opts = StatusOptions::new();
        opts.include_untracked(true).recurse_untracked_dirs(true);

        let statuses = self.repo.statuses(Some(&mut opts))?;
        for entry in statuses.iter() {
            if !entry.status().contains(git2::Status::WT_NEW) {
                continue;
            }
            if let Some(path) = entry.path() {
                if is_internal(path) {
                    continue;
                }
                let full = self.root.join(path);
                if let Err(e) = std::fs::remove_file(&full) {
                    log::warn!(
                        "[Workspace] Failed to remove untracked file {:?}: {}",
                        full,
                        e
                    );
                }
            }
        }

        log::info!("[Workspace] Reverted to known-good state at {:?}", self.root);
        Ok(())
    }

    /// Stage everything and commit, making this the new known-good point.
    /// Returns the new commit id.
    pub fn accept(&self, message: &str) -> Result<String, WorkspaceError> {
        let mut index = self.repo.index()?;
        let mut skip_internal = |path: &Path, _spec: &[u8]| -> i32 {
            if is_internal(&path.to_string_lossy()) {
                1
            } else {
                0
            }
        };
        index.add_all(["*"].iter(), IndexAddOption::DEFAULT, Some(&mut skip_internal))?;
        // add_all does not record deletions of tracked files
        index.update_all(["*"].iter(), Some(&mut skip_internal))?;
        index.write()?;

        let tree_id = index.write_tree()?;
        let tree = self.repo.find_tree(tree_id)?;

        let parent = self.repo.head()?.peel_to_commit()?;
        let signature = Signature::now("swarmgate", "swarmgate@localhost")?;

        let oid = self.repo.commit(
            Some("HEAD"),
            &signature,
            &signature,
            message,
            &tree,
            &[&parent],
        )?;

        log::info!("[Workspace] Accepted change set as commit {}", oid);
        Ok(oid.to_string())
    }
}
