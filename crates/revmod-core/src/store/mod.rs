//! Read-only access to per-app revision histories.
//!
//! The rest of the crate only sees [`ObjectStore`]; the git CLI backed
//! implementation is used in production and `MemoryStore` in tests.

mod git;
#[cfg(any(test, feature = "testing"))]
mod memory;

use std::fmt;

pub use git::GitCliStore;
#[cfg(any(test, feature = "testing"))]
pub use memory::MemoryStore;
pub use revmod_domain::Revision;

/// Hex id of a tree or blob.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectId(String);

impl ObjectId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into().trim().to_ascii_lowercase())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EntryKind {
    File,
    Subtree,
}

/// One child of a content tree.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TreeEntry {
    pub name: String,
    pub kind: EntryKind,
    pub id: ObjectId,
}

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("app '{app}' does not exist")]
    UnknownApp { app: String },
    #[error("reference '{reference}' does not resolve to a commit in app '{app}'")]
    ReferenceNotResolvable { app: String, reference: String },
    #[error("object {id} is missing from app '{app}'")]
    ObjectMissing { app: String, id: String },
    #[error("git is required to read app '{app}', but failed to invoke it: {error}")]
    GitInvocationFailed { app: String, error: String },
    #[error("git {command} failed for app '{app}': {stderr}")]
    GitFailed {
        app: String,
        command: String,
        stderr: String,
    },
    #[error("malformed {what} output for app '{app}'")]
    Malformed { app: String, what: &'static str },
}

impl StoreError {
    #[must_use]
    pub fn reason(&self) -> &'static str {
        match self {
            Self::UnknownApp { .. } => "unknown_app",
            Self::ReferenceNotResolvable { .. } => "reference_not_resolvable",
            Self::ObjectMissing { .. } => "object_missing",
            Self::GitInvocationFailed { .. } => "git_unavailable",
            Self::GitFailed { .. } => "git_failed",
            Self::Malformed { .. } => "git_output_malformed",
        }
    }
}

/// Resolves references and reads commit, tree and blob records.
///
/// Calls block; async callers run them on the blocking pool.
pub trait ObjectStore: Send + Sync {
    fn resolve_revision(&self, app: &str, reference: &str) -> Result<Revision, StoreError>;
    fn root_tree(&self, app: &str, revision: &Revision) -> Result<ObjectId, StoreError>;
    fn read_tree(&self, app: &str, tree: &ObjectId) -> Result<Vec<TreeEntry>, StoreError>;
    fn read_blob(&self, app: &str, blob: &ObjectId) -> Result<Vec<u8>, StoreError>;
}
