//! Shallow clone/fetch and commit comparison, grounded on the original
//! Python implementation's `pygit2`-based `git_utils.py` (both `pygit2` and
//! this module's `git2` are libgit2 bindings, so the capability mapping is
//! direct): ensure a shallow checkout exists, and diff two commits down to
//! per-file added/modified/deleted/renamed lists.

use std::path::Path;

use git2::{Cred, DeltaStatus, DiffFindOptions, FetchOptions, RemoteCallbacks, Repository};

use ingest_core::parser::languages::Language;
use ingest_core::{GitChanges, RenamedFile};

use crate::error::{OrchestratorError, Result};

pub struct RepoInfo {
    pub remote_origin_url: Option<String>,
    pub commit_hash: String,
    pub default_branch: String,
}

fn fetch_options(github_token: Option<&str>) -> FetchOptions<'static> {
    let token = github_token.map(str::to_string);
    let mut callbacks = RemoteCallbacks::new();
    callbacks.credentials(move |_url, username_from_url, _allowed| {
        if let Some(token) = &token {
            Cred::userpass_plaintext("x-access-token", token)
        } else {
            Cred::default().or_else(|_| Cred::username(username_from_url.unwrap_or("git")))
        }
    });
    let mut options = FetchOptions::new();
    options.remote_callbacks(callbacks);
    options.depth(1);
    options
}

/// Ensures `repo_path` has `remote_url`'s default branch checked out at
/// depth 1, cloning if the directory doesn't yet hold a repository,
/// otherwise fetching and fast-forwarding.
pub fn ensure_shallow_checkout(
    repo_path: &Path,
    remote_url: &str,
    branch: Option<&str>,
    github_token: Option<&str>,
) -> Result<RepoInfo> {
    let is_existing = repo_path.join(".git").is_dir();

    let repo = if !is_existing {
        std::fs::create_dir_all(repo_path)?;
        let mut builder = git2::build::RepoBuilder::new();
        builder.fetch_options(fetch_options(github_token));
        if let Some(branch) = branch {
            builder.branch(branch);
        }
        builder.clone(remote_url, repo_path)?
    } else {
        let repo = Repository::open(repo_path)?;
        {
            let mut origin = match repo.find_remote("origin") {
                Ok(remote) => remote,
                Err(_) => repo.remote("origin", remote_url)?,
            };
            let head = repo.head()?;
            let branch_name = branch
                .map(str::to_string)
                .unwrap_or_else(|| head.shorthand().unwrap_or("main").to_string());
            let refspec = format!("+refs/heads/{branch_name}:refs/remotes/origin/{branch_name}");
            origin.fetch(&[refspec], Some(&mut fetch_options(github_token)), None)?;

            let remote_ref = repo.find_reference(&format!("refs/remotes/origin/{branch_name}"))?;
            let target = remote_ref.target().ok_or_else(|| {
                OrchestratorError::Git(git2::Error::from_str("remote ref has no target"))
            })?;
            repo.reference(
                &format!("refs/heads/{branch_name}"),
                target,
                true,
                "fast-forward to origin",
            )?;
            repo.set_head(&format!("refs/heads/{branch_name}"))?;
            repo.checkout_head(Some(git2::build::CheckoutBuilder::new().force()))?;
        }
        repo
    };

    extract_repo_info(&repo)
}

fn extract_repo_info(repo: &Repository) -> Result<RepoInfo> {
    let head = repo.head()?;
    let commit_hash = head.peel_to_commit()?.id().to_string();
    let default_branch = head.shorthand().unwrap_or("main").to_string();
    let remote_origin_url = repo.find_remote("origin").ok().and_then(|r| r.url().map(str::to_string));

    Ok(RepoInfo { remote_origin_url, commit_hash, default_branch })
}

fn is_supported_path(path: &str) -> bool {
    Path::new(path)
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|ext| Language::from_extension(ext).is_some())
}

/// Diffs `before_commit` against `after_commit`, keeping only files with a
/// supported extension on either side.
pub fn compare_commits(
    repo_path: &Path,
    before_commit: &str,
    after_commit: &str,
) -> Result<GitChanges> {
    let repo = Repository::open(repo_path)?;

    let before = repo.revparse_single(before_commit)?.peel_to_commit()?;
    let after = repo.revparse_single(after_commit)?.peel_to_commit()?;

    let before_tree = before.tree()?;
    let after_tree = after.tree()?;

    let mut diff = repo.diff_tree_to_tree(Some(&before_tree), Some(&after_tree), None)?;
    let mut find_opts = DiffFindOptions::new();
    find_opts.renames(true).copies(true).rename_threshold(50);
    diff.find_similar(Some(&mut find_opts))?;

    let mut changes = GitChanges::default();

    for delta in diff.deltas() {
        let old_path = delta.old_file().path().and_then(|p| p.to_str()).unwrap_or_default();
        let new_path = delta.new_file().path().and_then(|p| p.to_str()).unwrap_or_default();
        let path_for_filter = if new_path.is_empty() { old_path } else { new_path };
        if path_for_filter.is_empty() || !is_supported_path(path_for_filter) {
            continue;
        }

        match delta.status() {
            DeltaStatus::Added => changes.added.push(new_path.to_string()),
            DeltaStatus::Modified => changes.modified.push(new_path.to_string()),
            DeltaStatus::Deleted => changes.deleted.push(old_path.to_string()),
            DeltaStatus::Renamed => {
                if is_supported_path(old_path) || is_supported_path(new_path) {
                    changes.renamed.push(RenamedFile { old: old_path.to_string(), new: new_path.to_string() });
                }
            }
            DeltaStatus::Copied => changes.added.push(new_path.to_string()),
            _ => {}
        }
    }

    Ok(changes)
}
