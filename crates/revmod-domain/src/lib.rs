#![deny(clippy::all, warnings)]
#![allow(
    clippy::missing_errors_doc,
    clippy::missing_panics_doc,
    clippy::must_use_candidate
)]

//! Pure data and resolution rules for serving versioned modules.
//!
//! Nothing in this crate touches the object store or the network: it only
//! knows how a manifest is shaped, how exports map to files, and how a single
//! specifier is rewritten through an import table.

pub mod exports;
pub mod manifest;
pub mod request;
pub mod specifier;

pub use exports::{
    normalize_target, resolve_root, resolve_subpath, NoDefaultExport, ENTRYPOINT_CANDIDATES,
};
pub use manifest::{
    parse_manifest, Exports, ImportTable, Manifest, ManifestParseError, MANIFEST_CANDIDATES,
};
pub use request::{AppRef, InvalidAppName, Revision, DEFAULT_REFERENCE, SHORT_REVISION_LEN};
pub use specifier::resolve as resolve_specifier;
