//! Shared test fixtures: throwaway repositories wired to local bare remotes.

use std::fs;
use std::path::{Path, PathBuf};

use git2::{Repository, Signature};

fn test_signature() -> Signature<'static> {
    Signature::now("gitsync", "root@localhost").expect("signature")
}

pub fn init_repo(path: &Path) {
    Repository::init(path).expect("init repo");
}

/// Stage the whole working tree and commit it.
pub fn commit_all(path: &Path, message: &str) -> String {
    let git = Repository::open(path).expect("open repo");
    let mut index = git.index().expect("index");
    index
        .add_all(["*"].iter(), git2::IndexAddOption::DEFAULT, None)
        .expect("add all");
    // add_all does not pick up deletions; re-stage against the worktree.
    index
        .update_all(["*"].iter(), None)
        .expect("update all");
    index.write().expect("write index");
    let tree_id = index.write_tree().expect("write tree");
    let tree = git.find_tree(tree_id).expect("tree");
    let sig = test_signature();
    let parent = match git.head() {
        Ok(head) => Some(head.peel_to_commit().expect("parent")),
        Err(_) => None,
    };
    let parents: Vec<&git2::Commit> = parent.iter().collect();
    let oid = git
        .commit(Some("HEAD"), &sig, &sig, message, &tree, &parents)
        .expect("commit");
    oid.to_string()
}

pub fn head_revision(path: &Path) -> String {
    let git = Repository::open(path).expect("open repo");
    let rev = git
        .head()
        .expect("head")
        .peel_to_commit()
        .expect("commit")
        .id()
        .to_string();
    rev
}

/// A working repository with one seed commit, pushed to a sibling bare
/// remote registered as "origin". Returns (workdir, bare) paths.
pub fn init_repo_with_remote(root: &Path) -> (PathBuf, PathBuf) {
    let work = root.join("work");
    let bare = root.join("remote.git");
    fs::create_dir_all(&work).expect("mkdir work");
    Repository::init_bare(&bare).expect("init bare");
    init_repo(&work);
    fs::write(work.join("seed.txt"), "seed\n").expect("seed file");
    commit_all(&work, "seed");

    let git = Repository::open(&work).expect("open work");
    git.remote("origin", bare.to_str().expect("utf8 path"))
        .expect("add remote");
    let branch = git
        .head()
        .expect("head")
        .shorthand()
        .expect("branch")
        .to_string();
    let mut remote = git.find_remote("origin").expect("origin");
    let refspec = format!("refs/heads/{branch}:refs/heads/{branch}");
    remote.push(&[refspec.as_str()], None).expect("push seed");
    remote
        .fetch(&[branch.as_str()], None, None)
        .expect("fetch tracking ref");
    (work, bare)
}

/// Clone the bare remote into `path`, keeping "origin" configured.
pub fn clone_of(bare: &Path, path: PathBuf) -> PathBuf {
    Repository::clone(bare.to_str().expect("utf8 path"), &path).expect("clone");
    path
}
