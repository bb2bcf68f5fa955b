use revmod_domain::{parse_manifest, Manifest, MANIFEST_CANDIDATES};
use tracing::debug;

use crate::store::{ObjectId, ObjectStore};
use crate::walker::read_file;

/// Loads the manifest at the root of a revision.
///
/// Candidates are tried in order and the first one that exists and parses
/// wins. A revision without a usable manifest yields the empty manifest.
pub fn load_manifest<S>(store: &S, app: &str, root: &ObjectId) -> Manifest
where
    S: ObjectStore + ?Sized,
{
    for candidate in MANIFEST_CANDIDATES {
        let bytes = match read_file(store, app, root, candidate) {
            Ok(bytes) => bytes,
            Err(err) => {
                debug!(app, candidate, %err, "manifest candidate unavailable");
                continue;
            }
        };
        let Ok(text) = std::str::from_utf8(&bytes) else {
            debug!(app, candidate, "manifest candidate is not utf-8");
            continue;
        };
        match parse_manifest(text) {
            Ok(manifest) => {
                debug!(
                    app,
                    candidate,
                    imports = manifest.imports.len(),
                    has_exports = manifest.exports.is_some(),
                    "loaded manifest"
                );
                return manifest;
            }
            Err(err) => {
                debug!(app, candidate, %err, "manifest candidate did not parse");
            }
        }
    }
    Manifest::default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use revmod_domain::Exports;

    fn load(files: &[(&str, &str)]) -> Manifest {
        let store = MemoryStore::new();
        let revision = store.commit("app", files);
        let root = store.root_tree("app", &revision).unwrap();
        load_manifest(&store, "app", &root)
    }

    #[test]
    fn plain_json_wins_over_jsonc() {
        let manifest = load(&[
            ("deno.json", r#"{ "exports": "./a.ts" }"#),
            ("deno.jsonc", r#"{ "exports": "./b.ts" }"#),
        ]);
        assert_eq!(manifest.exports, Some(Exports::Single("./a.ts".into())));
    }

    #[test]
    fn falls_through_to_jsonc_when_json_is_malformed() {
        let manifest = load(&[
            ("deno.json", "{ not json"),
            ("deno.jsonc", "{ // comment\n \"imports\": { \"a\": \"./a.ts\" } }"),
        ]);
        assert_eq!(manifest.imports.get("a"), Some("./a.ts"));
    }

    #[test]
    fn missing_manifest_is_empty() {
        assert_eq!(load(&[("mod.ts", "export {}")]), Manifest::default());
    }

    #[test]
    fn all_candidates_malformed_is_empty() {
        let manifest = load(&[("deno.json", "[1, 2"), ("deno.jsonc", "{\"imports\": 3}")]);
        assert_eq!(manifest, Manifest::default());
    }

    #[test]
    fn manifest_directory_is_skipped() {
        let manifest = load(&[
            ("deno.json/inner.txt", "x"),
            ("deno.jsonc", r#"{ "exports": { ".": "./mod.ts" } }"#),
        ]);
        assert_eq!(
            manifest.exports.and_then(|e| e.get(".").map(ToString::to_string)),
            Some("./mod.ts".to_string())
        );
    }
}
