#![deny(clippy::all)]
#![allow(
    clippy::missing_errors_doc,
    clippy::missing_panics_doc,
    clippy::module_name_repetitions
)]

//! Serves files from git revisions as importable modules, rewriting bare
//! specifiers in program source through the revision's import map.

pub mod config;
pub mod http;
pub mod manifest;
pub mod rewrite;
pub mod service;
pub mod store;
pub mod walker;

pub use config::{Config, EnvSnapshot, Overrides};
pub use http::{router, serve};
pub use manifest::load_manifest;
pub use rewrite::{is_program_source, rewrite, RewriteError};
pub use service::{ModuleService, ServeError, Served};
#[cfg(any(test, feature = "testing"))]
pub use store::MemoryStore;
pub use store::{EntryKind, GitCliStore, ObjectId, ObjectStore, StoreError, TreeEntry};
pub use walker::{file_exists, locate, read_file, WalkError};
