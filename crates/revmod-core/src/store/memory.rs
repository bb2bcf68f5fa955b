use std::collections::{BTreeMap, HashMap};
use std::sync::RwLock;

use sha2::{Digest, Sha256};

use super::{EntryKind, ObjectId, ObjectStore, Revision, StoreError, TreeEntry};

const MIN_PREFIX_LEN: usize = 4;

/// In-memory object store, used by tests and for embedding fixed content.
#[derive(Debug, Default)]
pub struct MemoryStore {
    apps: RwLock<HashMap<String, MemoryRepo>>,
}

#[derive(Debug, Default)]
struct MemoryRepo {
    refs: HashMap<String, Revision>,
    commits: HashMap<Revision, ObjectId>,
    trees: HashMap<ObjectId, Vec<TreeEntry>>,
    blobs: HashMap<ObjectId, Vec<u8>>,
}

enum Node<'f> {
    File(&'f [u8]),
    Dir(BTreeMap<&'f str, Node<'f>>),
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a commit containing `files` (slash-separated paths) and moves
    /// `HEAD` to it.
    pub fn commit(&self, app: &str, files: &[(&str, &str)]) -> Revision {
        let mut root = BTreeMap::new();
        for (path, contents) in files {
            insert(&mut root, path, contents.as_bytes());
        }
        let mut apps = self.apps.write().unwrap_or_else(|err| err.into_inner());
        let repo = apps.entry(app.to_string()).or_default();
        let tree = repo.store_dir(&root);
        let mut hasher = Sha256::new();
        hasher.update(b"commit\0");
        hasher.update(tree.as_str().as_bytes());
        hasher.update(repo.commits.len().to_le_bytes());
        let revision = Revision::new(hex::encode(hasher.finalize()));
        repo.commits.insert(revision.clone(), tree);
        repo.refs.insert("HEAD".to_string(), revision.clone());
        revision
    }

    /// Points a named reference at an existing revision.
    pub fn set_ref(&self, app: &str, name: &str, revision: &Revision) {
        let mut apps = self.apps.write().unwrap_or_else(|err| err.into_inner());
        apps.entry(app.to_string())
            .or_default()
            .refs
            .insert(name.to_string(), revision.clone());
    }

    fn with_repo<T>(
        &self,
        app: &str,
        f: impl FnOnce(&MemoryRepo) -> Result<T, StoreError>,
    ) -> Result<T, StoreError> {
        let apps = self.apps.read().unwrap_or_else(|err| err.into_inner());
        let repo = apps.get(app).ok_or_else(|| StoreError::UnknownApp {
            app: app.to_string(),
        })?;
        f(repo)
    }
}

fn insert<'f>(dir: &mut BTreeMap<&'f str, Node<'f>>, path: &'f str, contents: &'f [u8]) {
    let mut parts = path.split('/').filter(|part| !part.is_empty()).peekable();
    let mut current = dir;
    while let Some(part) = parts.next() {
        if parts.peek().is_none() {
            current.insert(part, Node::File(contents));
            return;
        }
        let node = current
            .entry(part)
            .or_insert_with(|| Node::Dir(BTreeMap::new()));
        if let Node::File(_) = node {
            *node = Node::Dir(BTreeMap::new());
        }
        let Node::Dir(next) = node else {
            return;
        };
        current = next;
    }
}

fn object_id(kind: &str, bytes: &[u8]) -> ObjectId {
    let mut hasher = Sha256::new();
    hasher.update(kind.as_bytes());
    hasher.update([0u8]);
    hasher.update(bytes);
    ObjectId::new(hex::encode(hasher.finalize()))
}

impl MemoryRepo {
    fn store_dir(&mut self, dir: &BTreeMap<&str, Node<'_>>) -> ObjectId {
        let mut entries = Vec::with_capacity(dir.len());
        let mut listing = Vec::new();
        for (name, node) in dir {
            let (kind, id) = match node {
                Node::File(contents) => {
                    let id = object_id("blob", contents);
                    self.blobs.insert(id.clone(), contents.to_vec());
                    (EntryKind::File, id)
                }
                Node::Dir(children) => (EntryKind::Subtree, self.store_dir(children)),
            };
            listing.extend_from_slice(name.as_bytes());
            listing.push(0);
            listing.extend_from_slice(id.as_str().as_bytes());
            entries.push(TreeEntry {
                name: (*name).to_string(),
                kind,
                id,
            });
        }
        let id = object_id("tree", &listing);
        self.trees.insert(id.clone(), entries);
        id
    }
}

impl ObjectStore for MemoryStore {
    fn resolve_revision(&self, app: &str, reference: &str) -> Result<Revision, StoreError> {
        self.with_repo(app, |repo| {
            if let Some(revision) = repo.refs.get(reference) {
                return Ok(revision.clone());
            }
            let unresolvable = || StoreError::ReferenceNotResolvable {
                app: app.to_string(),
                reference: reference.to_string(),
            };
            let prefix = reference.to_ascii_lowercase();
            if prefix.len() < MIN_PREFIX_LEN {
                return Err(unresolvable());
            }
            let mut matches = repo
                .commits
                .keys()
                .filter(|revision| revision.as_str().starts_with(&prefix));
            match (matches.next(), matches.next()) {
                (Some(revision), None) => Ok(revision.clone()),
                _ => Err(unresolvable()),
            }
        })
    }

    fn root_tree(&self, app: &str, revision: &Revision) -> Result<ObjectId, StoreError> {
        self.with_repo(app, |repo| {
            repo.commits
                .get(revision)
                .cloned()
                .ok_or_else(|| StoreError::ObjectMissing {
                    app: app.to_string(),
                    id: revision.to_string(),
                })
        })
    }

    fn read_tree(&self, app: &str, tree: &ObjectId) -> Result<Vec<TreeEntry>, StoreError> {
        self.with_repo(app, |repo| {
            repo.trees
                .get(tree)
                .cloned()
                .ok_or_else(|| StoreError::ObjectMissing {
                    app: app.to_string(),
                    id: tree.to_string(),
                })
        })
    }

    fn read_blob(&self, app: &str, blob: &ObjectId) -> Result<Vec<u8>, StoreError> {
        self.with_repo(app, |repo| {
            repo.blobs
                .get(blob)
                .cloned()
                .ok_or_else(|| StoreError::ObjectMissing {
                    app: app.to_string(),
                    id: blob.to_string(),
                })
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn commits_resolve_by_ref_and_prefix() {
        let store = MemoryStore::new();
        let first = store.commit("app", &[("mod.ts", "export {}")]);
        let second = store.commit("app", &[("mod.ts", "export const a = 1")]);
        store.set_ref("app", "v1", &first);

        assert_eq!(store.resolve_revision("app", "HEAD").unwrap(), second);
        assert_eq!(store.resolve_revision("app", "v1").unwrap(), first);
        assert_eq!(
            store.resolve_revision("app", first.short()).unwrap(),
            first
        );
        assert!(matches!(
            store.resolve_revision("app", "abc"),
            Err(StoreError::ReferenceNotResolvable { .. })
        ));
        assert!(matches!(
            store.resolve_revision("other", "HEAD"),
            Err(StoreError::UnknownApp { .. })
        ));
    }

    #[test]
    fn builds_nested_trees() {
        let store = MemoryStore::new();
        let revision = store.commit(
            "app",
            &[("src/a.ts", "a"), ("src/lib/b.ts", "b"), ("README.md", "r")],
        );
        let root = store.root_tree("app", &revision).unwrap();
        let entries = store.read_tree("app", &root).unwrap();
        let names = entries.iter().map(|e| e.name.as_str()).collect::<Vec<_>>();
        assert_eq!(names, vec!["README.md", "src"]);
        assert_eq!(entries[1].kind, EntryKind::Subtree);
        let src = store.read_tree("app", &entries[1].id).unwrap();
        assert_eq!(src.len(), 2);
        assert_eq!(store.read_blob("app", &src[0].id).unwrap(), b"a");
    }
}
