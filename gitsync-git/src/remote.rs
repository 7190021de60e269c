//! Network operations: fetch with a deadline, upstream integration
//! (fast-forward or rebase), and push.

use std::cell::RefCell;
use std::time::{Duration, Instant};

use git2::build::CheckoutBuilder;
use git2::{AnnotatedCommit, ErrorCode, FetchOptions, Oid, PushOptions, RemoteCallbacks, Repository};

use gitsync_core::WatchedRepo;

use crate::commit::synthetic_signature;
use crate::error::{GitError, Result};
use crate::repo::open_inner;

/// How local history was brought up to date with the fetched remote tip.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncAction {
    /// Local and remote tips already agree (or there is no upstream yet).
    UpToDate,
    /// Local is strictly ahead; nothing to integrate, push will catch up.
    AlreadyAhead,
    /// Local had no commits of its own and was fast-forwarded.
    FastForwarded,
    /// Local commits were replayed on top of the remote tip.
    Rebased(usize),
}

/// Fetch the watched branch from the configured remote.
///
/// libgit2 has no wall-clock timeout, so the transfer-progress callback
/// aborts the download once `timeout` has elapsed; expiry surfaces as an
/// ordinary fetch failure.
pub fn fetch(repo: &WatchedRepo, timeout: Duration) -> Result<()> {
    let Some(remote_name) = &repo.remote else {
        return Ok(());
    };
    let git = open_inner(&repo.path)?;
    let mut remote = git.find_remote(remote_name)?;

    let deadline = Instant::now() + timeout;
    let mut callbacks = RemoteCallbacks::new();
    callbacks.transfer_progress(move |_| Instant::now() < deadline);
    let mut opts = FetchOptions::new();
    opts.remote_callbacks(callbacks);

    remote
        .fetch(&[repo.branch.as_str()], Some(&mut opts), None)
        .map_err(|err| GitError::Network {
            context: format!("fetch from '{remote_name}'"),
            source: err,
        })
}

/// Bring the local branch up to date with the fetched remote-tracking tip:
/// no-op when equal or strictly ahead, fast-forward when strictly behind,
/// otherwise rebase local commits onto the remote tip.
///
/// A conflicting rebase is aborted in place (the branch and working tree
/// are restored) and reported as [`GitError::RebaseConflict`].
pub fn integrate_upstream(repo: &WatchedRepo) -> Result<SyncAction> {
    let Some(remote_name) = &repo.remote else {
        return Ok(SyncAction::UpToDate);
    };
    let git = open_inner(&repo.path)?;

    let upstream_ref = format!("refs/remotes/{remote_name}/{}", repo.branch);
    let upstream = match git.find_reference(&upstream_ref) {
        Ok(reference) => git.reference_to_annotated_commit(&reference)?,
        // Nothing fetched yet for this branch: no upstream to integrate.
        Err(err) if err.code() == ErrorCode::NotFound => return Ok(SyncAction::UpToDate),
        Err(err) => return Err(err.into()),
    };

    let local_refname = format!("refs/heads/{}", repo.branch);
    let local_tip: Option<Oid> = match git.find_reference(&local_refname) {
        Ok(reference) => reference.target(),
        Err(err) if err.code() == ErrorCode::NotFound => None,
        Err(err) => return Err(err.into()),
    };

    match local_tip {
        None => {
            // Unborn branch with an existing upstream: adopt the remote tip.
            git.reference(&local_refname, upstream.id(), true, "gitsync: initial checkout")?;
            git.set_head(&local_refname)?;
            git.checkout_head(Some(CheckoutBuilder::default().force()))?;
            Ok(SyncAction::FastForwarded)
        }
        Some(local_oid) if local_oid == upstream.id() => Ok(SyncAction::UpToDate),
        Some(local_oid) if git.graph_descendant_of(local_oid, upstream.id())? => {
            Ok(SyncAction::AlreadyAhead)
        }
        Some(local_oid) if git.graph_descendant_of(upstream.id(), local_oid)? => {
            fast_forward(&git, &local_refname, upstream.id())?;
            Ok(SyncAction::FastForwarded)
        }
        Some(_) => rebase_onto(&git, repo, &local_refname, &upstream),
    }
}

fn fast_forward(git: &Repository, refname: &str, target: Oid) -> Result<()> {
    let mut reference = git.find_reference(refname)?;
    reference.set_target(target, "gitsync: fast-forward")?;
    git.set_head(refname)?;
    git.checkout_head(Some(CheckoutBuilder::default().force()))?;
    Ok(())
}

fn rebase_onto(
    git: &Repository,
    repo: &WatchedRepo,
    local_refname: &str,
    upstream: &AnnotatedCommit,
) -> Result<SyncAction> {
    let local_ref = git.find_reference(local_refname)?;
    let local = git.reference_to_annotated_commit(&local_ref)?;
    let sig = synthetic_signature()?;

    let mut rebase = git.rebase(Some(&local), Some(upstream), None, None)?;
    let mut replayed = 0usize;
    while let Some(operation) = rebase.next() {
        operation?;
        if git.index()?.has_conflicts() {
            rebase.abort()?;
            return Err(GitError::RebaseConflict {
                path: repo.path.clone(),
            });
        }
        match rebase.commit(None, &sig, None) {
            Ok(_) => replayed += 1,
            // Patch already present upstream; skip it.
            Err(err) if err.code() == ErrorCode::Applied => {}
            Err(err) => {
                rebase.abort()?;
                return Err(err.into());
            }
        }
    }
    rebase.finish(Some(&sig))?;
    Ok(SyncAction::Rebased(replayed))
}

/// Push the watched branch to its remote. A rejected ref update (e.g. the
/// remote advanced again) is reported as [`GitError::PushRejected`].
pub fn push(repo: &WatchedRepo) -> Result<()> {
    let Some(remote_name) = &repo.remote else {
        return Ok(());
    };
    let git = open_inner(&repo.path)?;
    let mut remote = git.find_remote(remote_name)?;

    let rejection: RefCell<Option<(String, String)>> = RefCell::new(None);
    let mut callbacks = RemoteCallbacks::new();
    callbacks.push_update_reference(|refname, status| {
        if let Some(reason) = status {
            *rejection.borrow_mut() = Some((refname.to_string(), reason.to_string()));
        }
        Ok(())
    });
    let mut opts = PushOptions::new();
    opts.remote_callbacks(callbacks);

    let refspec = format!("refs/heads/{branch}:refs/heads/{branch}", branch = repo.branch);
    remote
        .push(&[refspec.as_str()], Some(&mut opts))
        .map_err(|err| GitError::Network {
            context: format!("push to '{remote_name}'"),
            source: err,
        })?;

    if let Some((refname, reason)) = rejection.borrow().clone() {
        return Err(GitError::PushRejected { refname, reason });
    }
    Ok(())
}
