//! Git context discovery for branchdex.
//!
//! Every operation shells out to the `git` binary in a workspace directory.
//! Kept read-only (branch, commit, diff, tracked files): never touches the
//! working tree.

mod diff;
mod probe;

pub use diff::{ChangeStatus, GitDiff};
pub use probe::{GitError, GitProbe};

pub const DEFAULT_BASE_BRANCH_CANDIDATES: [&str; 3] = ["main", "develop", "master"];
