//! Descends a revision's content tree one level at a time.

use tracing::trace;

use crate::store::{EntryKind, ObjectId, ObjectStore, StoreError, TreeEntry};

/// Paths deeper than this are treated as missing.
pub const MAX_TREE_DEPTH: usize = 256;

#[derive(Debug, thiserror::Error)]
pub enum WalkError {
    #[error("'{path}' not found")]
    NotFound { path: String },
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Splits a logical path into tree components, dropping empty segments.
pub fn split_path(path: &str) -> Vec<&str> {
    path.split('/').filter(|part| !part.is_empty()).collect()
}

/// Finds the entry named by `components` below `root`.
///
/// An empty component list names the root tree itself.
pub fn locate<S>(
    store: &S,
    app: &str,
    root: &ObjectId,
    components: &[&str],
) -> Result<TreeEntry, WalkError>
where
    S: ObjectStore + ?Sized,
{
    let not_found = || WalkError::NotFound {
        path: components.join("/"),
    };
    if components.len() > MAX_TREE_DEPTH {
        return Err(not_found());
    }

    let mut current = TreeEntry {
        name: String::new(),
        kind: EntryKind::Subtree,
        id: root.clone(),
    };
    for component in components {
        if current.kind != EntryKind::Subtree {
            return Err(not_found());
        }
        trace!(app, tree = %current.id, component, "descending");
        let entries = store.read_tree(app, &current.id)?;
        current = entries
            .into_iter()
            .find(|entry| entry.name == *component)
            .ok_or_else(not_found)?;
    }
    Ok(current)
}

/// Reads the file at `path` below `root`.
pub fn read_file<S>(store: &S, app: &str, root: &ObjectId, path: &str) -> Result<Vec<u8>, WalkError>
where
    S: ObjectStore + ?Sized,
{
    let components = split_path(path);
    let entry = locate(store, app, root, &components)?;
    if entry.kind != EntryKind::File {
        return Err(WalkError::NotFound {
            path: path.to_string(),
        });
    }
    Ok(store.read_blob(app, &entry.id)?)
}

/// Whether `path` names a file below `root`. Store failures count as absent.
pub fn file_exists<S>(store: &S, app: &str, root: &ObjectId, path: &str) -> bool
where
    S: ObjectStore + ?Sized,
{
    matches!(
        locate(store, app, root, &split_path(path)),
        Ok(entry) if entry.kind == EntryKind::File
    )
}
