use crate::manifest::{Exports, Manifest};

/// Conventional entrypoints tried when a manifest declares no root export.
pub const ENTRYPOINT_CANDIDATES: [&str; 8] = [
    "mod.ts", "mod.tsx", "mod.js", "mod.jsx", "main.ts", "main.tsx", "main.js", "main.jsx",
];

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("no default export: manifest has no root export and none of {} exist", ENTRYPOINT_CANDIDATES.join(", "))]
pub struct NoDefaultExport;

/// Resolves the root export of a revision.
///
/// `exists` answers whether a root-level file is present in the revision
/// being served; it is only consulted for the conventional fallbacks.
pub fn resolve_root<F>(manifest: &Manifest, mut exists: F) -> Result<String, NoDefaultExport>
where
    F: FnMut(&str) -> bool,
{
    match &manifest.exports {
        Some(Exports::Single(target)) => return Ok(target.clone()),
        Some(exports @ Exports::Map(_)) => {
            if let Some(target) = exports.get(".") {
                return Ok(target.to_string());
            }
        }
        None => {}
    }
    ENTRYPOINT_CANDIDATES
        .iter()
        .find(|candidate| exists(candidate))
        .map(|candidate| (*candidate).to_string())
        .ok_or(NoDefaultExport)
}

/// Looks up `"./" + requested` in an export map.
pub fn resolve_subpath<'m>(manifest: &'m Manifest, requested: &str) -> Option<&'m str> {
    let exports = manifest.exports.as_ref()?;
    exports.get(&format!("./{requested}"))
}

/// Turns an export target into a path relative to the revision root.
pub fn normalize_target(target: &str) -> &str {
    let mut target = target;
    while let Some(rest) = target.strip_prefix("./") {
        target = rest;
    }
    target.trim_start_matches('/')
}
