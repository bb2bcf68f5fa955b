use std::path::{Path, PathBuf};
use std::process::{Command, Output, Stdio};

use tracing::{debug, trace};

use super::{EntryKind, ObjectId, ObjectStore, Revision, StoreError, TreeEntry};

/// Reads `<root>/<app>` repositories through the `git` executable.
#[derive(Clone, Debug)]
pub struct GitCliStore {
    root: PathBuf,
    git: String,
}

impl GitCliStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            git: "git".to_string(),
        }
    }

    #[must_use]
    pub fn with_git(mut self, git: impl Into<String>) -> Self {
        self.git = git.into();
        self
    }

    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn repo_dir(&self, app: &str) -> Result<PathBuf, StoreError> {
        let unknown = || StoreError::UnknownApp {
            app: app.to_string(),
        };
        if app.is_empty() || app.starts_with('.') || app.contains(['/', '\\']) {
            return Err(unknown());
        }
        let dir = self.root.join(app);
        if dir.is_dir() {
            Ok(dir)
        } else {
            Err(unknown())
        }
    }

    fn run(&self, app: &str, args: &[&str]) -> Result<Output, StoreError> {
        let dir = self.repo_dir(app)?;
        trace!(app, ?args, "invoking git");
        Command::new(&self.git)
            .arg("-C")
            .arg(&dir)
            .args(args)
            .stdin(Stdio::null())
            .output()
            .map_err(|err| StoreError::GitInvocationFailed {
                app: app.to_string(),
                error: err.to_string(),
            })
    }

    fn rev_parse(&self, app: &str, spec: &str) -> Result<Option<String>, StoreError> {
        let output = self.run(app, &["rev-parse", "--verify", "--quiet", spec])?;
        if !output.status.success() {
            return Ok(None);
        }
        let id = String::from_utf8_lossy(&output.stdout).trim().to_string();
        if id.is_empty() || !id.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(StoreError::Malformed {
                app: app.to_string(),
                what: "rev-parse",
            });
        }
        Ok(Some(id))
    }
}

impl ObjectStore for GitCliStore {
    fn resolve_revision(&self, app: &str, reference: &str) -> Result<Revision, StoreError> {
        let unresolvable = || StoreError::ReferenceNotResolvable {
            app: app.to_string(),
            reference: reference.to_string(),
        };
        if reference.is_empty() || reference.starts_with('-') {
            return Err(unresolvable());
        }
        let id = self
            .rev_parse(app, &format!("{reference}^{{commit}}"))?
            .ok_or_else(unresolvable)?;
        debug!(app, reference, revision = %id, "resolved reference");
        Ok(Revision::new(id))
    }

    fn root_tree(&self, app: &str, revision: &Revision) -> Result<ObjectId, StoreError> {
        self.rev_parse(app, &format!("{revision}^{{tree}}"))?
            .map(ObjectId::new)
            .ok_or_else(|| StoreError::ObjectMissing {
                app: app.to_string(),
                id: revision.to_string(),
            })
    }

    fn read_tree(&self, app: &str, tree: &ObjectId) -> Result<Vec<TreeEntry>, StoreError> {
        let output = self.run(app, &["ls-tree", "-z", tree.as_str()])?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            if stderr.contains("not a tree object") || stderr.contains("Not a valid object name")
            {
                return Err(StoreError::ObjectMissing {
                    app: app.to_string(),
                    id: tree.to_string(),
                });
            }
            return Err(StoreError::GitFailed {
                app: app.to_string(),
                command: "ls-tree".into(),
                stderr: stderr.trim().to_string(),
            });
        }
        Ok(parse_ls_tree(&output.stdout))
    }

    fn read_blob(&self, app: &str, blob: &ObjectId) -> Result<Vec<u8>, StoreError> {
        let output = self.run(app, &["cat-file", "blob", blob.as_str()])?;
        if output.status.success() {
            Ok(output.stdout)
        } else {
            Err(StoreError::ObjectMissing {
                app: app.to_string(),
                id: blob.to_string(),
            })
        }
    }
}

/// Parses `git ls-tree -z` records: `<mode> SP <type> SP <id> TAB <name> NUL`.
///
/// Submodule (`commit`) entries have no content in this repository and are
/// dropped.
fn parse_ls_tree(stdout: &[u8]) -> Vec<TreeEntry> {
    let mut entries = Vec::new();
    for record in stdout.split(|b| *b == 0) {
        if record.is_empty() {
            continue;
        }
        let Ok(text) = std::str::from_utf8(record) else {
            continue;
        };
        let Some((meta, name)) = text.split_once('\t') else {
            continue;
        };
        let mut fields = meta.split_whitespace();
        let _mode = fields.next();
        let kind = match fields.next() {
            Some("blob") => EntryKind::File,
            Some("tree") => EntryKind::Subtree,
            _ => continue,
        };
        let Some(id) = fields.next() else {
            continue;
        };
        entries.push(TreeEntry {
            name: name.to_string(),
            kind,
            id: ObjectId::new(id),
        });
    }
    entries
}
