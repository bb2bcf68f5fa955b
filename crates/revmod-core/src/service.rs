//! Per-request resolution: one revision, one manifest, one file.

use std::path::Path;
use std::sync::Arc;

use revmod_domain::{normalize_target, resolve_root, resolve_subpath, AppRef, Revision};
use tracing::{debug, info};

use crate::manifest::load_manifest;
use crate::rewrite::{is_program_source, rewrite, RewriteError};
use crate::store::{ObjectStore, StoreError};
use crate::walker::{file_exists, read_file, WalkError};

pub const OCTET_STREAM: &str = "application/octet-stream";
pub const JAVASCRIPT: &str = "application/javascript; charset=utf-8";
pub const TYPESCRIPT: &str = "application/typescript; charset=utf-8";

/// What a file request resolved to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Served {
    Redirect(String),
    Source {
        content_type: &'static str,
        body: String,
    },
    Asset {
        content_type: String,
        bytes: Vec<u8>,
    },
}

#[derive(Debug, thiserror::Error)]
pub enum ServeError {
    #[error("app '{app}' does not exist (requested at '{reference}')")]
    UnknownApp { app: String, reference: String },
    #[error("could not resolve '{reference}' for app '{app}'")]
    ReferenceNotResolvable { app: String, reference: String },
    #[error("'{path}' does not exist in app '{app}' at '{reference}'")]
    EntryNotFound {
        app: String,
        reference: String,
        path: String,
    },
    #[error("app '{app}' at '{reference}' has no default export")]
    NoDefaultExport { app: String, reference: String },
    #[error("failed to rewrite '{path}' in app '{app}' at '{reference}': {source}")]
    RewriteFailed {
        app: String,
        reference: String,
        path: String,
        #[source]
        source: RewriteError,
    },
    #[error("failed to read app '{app}' at '{reference}': {source}")]
    Store {
        app: String,
        reference: String,
        #[source]
        source: StoreError,
    },
    #[error("{0}")]
    Internal(String),
}

impl ServeError {
    /// Whether the failure is the requester's (bad app, ref or path).
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            Self::UnknownApp { .. }
                | Self::ReferenceNotResolvable { .. }
                | Self::EntryNotFound { .. }
                | Self::NoDefaultExport { .. }
        )
    }

    #[must_use]
    pub fn reason(&self) -> &'static str {
        match self {
            Self::UnknownApp { .. } => "unknown_app",
            Self::ReferenceNotResolvable { .. } => "reference_not_resolvable",
            Self::EntryNotFound { .. } => "entry_not_found",
            Self::NoDefaultExport { .. } => "no_default_export",
            Self::RewriteFailed { .. } => "rewrite_failed",
            Self::Store { .. } => "store_failed",
            Self::Internal(_) => "internal",
        }
    }

    fn from_store(app: &AppRef, source: StoreError) -> Self {
        let reference = app.reference().to_string();
        match source {
            StoreError::UnknownApp { app } => Self::UnknownApp { app, reference },
            StoreError::ReferenceNotResolvable { app, reference } => {
                Self::ReferenceNotResolvable { app, reference }
            }
            source => Self::Store {
                app: app.app.clone(),
                reference,
                source,
            },
        }
    }

    fn from_walk(app: &AppRef, path: &str, source: WalkError) -> Self {
        match source {
            WalkError::NotFound { .. } => Self::EntryNotFound {
                app: app.app.clone(),
                reference: app.reference().to_string(),
                path: path.to_string(),
            },
            WalkError::Store(source) => Self::from_store(app, source),
        }
    }
}

/// Content type for a rewritten program source file.
pub fn source_content_type(path: &str) -> &'static str {
    match Path::new(path).extension().and_then(|ext| ext.to_str()) {
        Some("ts" | "tsx" | "mts" | "cts") => TYPESCRIPT,
        _ => JAVASCRIPT,
    }
}

/// Content type for any other file, from its extension.
pub fn asset_content_type(path: &str) -> String {
    mime_guess::from_path(path)
        .first_raw()
        .unwrap_or(OCTET_STREAM)
        .to_string()
}

/// Resolves requests against an [`ObjectStore`]. Holds no per-request state.
pub struct ModuleService<S: ?Sized> {
    store: Arc<S>,
}

impl<S: ?Sized> Clone for ModuleService<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
        }
    }
}

impl<S> ModuleService<S>
where
    S: ObjectStore + ?Sized,
{
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    #[must_use]
    pub fn store(&self) -> &S {
        &self.store
    }

    fn revision(&self, app: &AppRef) -> Result<Revision, ServeError> {
        self.store
            .resolve_revision(&app.app, app.reference())
            .map_err(|err| ServeError::from_store(app, err))
    }

    /// `GET /{app}[@{ref}]`: the canonical location of the root export.
    pub fn resolve_entry(&self, app: &AppRef) -> Result<String, ServeError> {
        let revision = self.revision(app)?;
        let root = self
            .store
            .root_tree(&app.app, &revision)
            .map_err(|err| ServeError::from_store(app, err))?;
        let manifest = load_manifest(self.store(), &app.app, &root);
        let target = resolve_root(&manifest, |candidate| {
            file_exists(self.store(), &app.app, &root, candidate)
        })
        .map_err(|_| ServeError::NoDefaultExport {
            app: app.app.clone(),
            reference: app.reference().to_string(),
        })?;
        let location = app.location(&revision, normalize_target(&target));
        info!(app = %app.app, reference = app.reference(), %location, "resolved entrypoint");
        Ok(location)
    }

    /// `GET /{app}[@{ref}]/{path}`.
    pub fn serve_path(&self, app: &AppRef, path: &str) -> Result<Served, ServeError> {
        let revision = self.revision(app)?;
        if !revision.is_addressed_by(app.reference()) {
            let location = app.location(&revision, path);
            debug!(app = %app.app, reference = app.reference(), %location, "canonicalizing reference");
            return Ok(Served::Redirect(location));
        }

        let root = self
            .store
            .root_tree(&app.app, &revision)
            .map_err(|err| ServeError::from_store(app, err))?;
        let manifest = load_manifest(self.store(), &app.app, &root);
        if let Some(target) = resolve_subpath(&manifest, path) {
            let target = normalize_target(target);
            if target != path {
                debug!(app = %app.app, path, target, "export subpath");
                return Ok(Served::Redirect(app.location(&revision, target)));
            }
        }

        let bytes = read_file(self.store(), &app.app, &root, path)
            .map_err(|err| ServeError::from_walk(app, path, err))?;
        if !is_program_source(path) {
            return Ok(Served::Asset {
                content_type: asset_content_type(path),
                bytes,
            });
        }

        let rewrite_failed = |source| ServeError::RewriteFailed {
            app: app.app.clone(),
            reference: app.reference().to_string(),
            path: path.to_string(),
            source,
        };
        let text = String::from_utf8(bytes).map_err(|_| {
            rewrite_failed(RewriteError::NotUtf8 {
                path: path.to_string(),
            })
        })?;
        let body = rewrite(&text, path, &manifest.imports).map_err(rewrite_failed)?;
        Ok(Served::Source {
            content_type: source_content_type(path),
            body,
        })
    }
}
