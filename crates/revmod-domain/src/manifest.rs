use indexmap::IndexMap;
use jsonc_parser::ParseOptions;
use serde::{Deserialize, Serialize};

/// Manifest filenames probed at the root of a revision, in priority order.
pub const MANIFEST_CANDIDATES: [&str; 2] = ["deno.json", "deno.jsonc"];

/// The slice of a dependency manifest this server cares about.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Manifest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exports: Option<Exports>,
    #[serde(default)]
    pub imports: ImportTable,
}

/// `exports` is either a bare root path or a table keyed by `"."`/`"./sub"`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Exports {
    Single(String),
    Map(IndexMap<String, String>),
}

impl Exports {
    pub fn get(&self, key: &str) -> Option<&str> {
        match self {
            Self::Single(_) => None,
            Self::Map(map) => map.get(key).map(String::as_str),
        }
    }
}

/// Specifier prefix -> replacement, in declaration order.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ImportTable(IndexMap<String, String>);

impl ImportTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }
}

impl<K, V> FromIterator<(K, V)> for ImportTable
where
    K: Into<String>,
    V: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ManifestParseError {
    #[error("manifest is not valid JSON: {0}")]
    Syntax(String),
    #[error("manifest is empty")]
    Empty,
    #[error("manifest has an unexpected shape: {0}")]
    Shape(#[from] serde_json::Error),
}

/// Parses manifest text, tolerating comments and trailing commas.
pub fn parse_manifest(text: &str) -> Result<Manifest, ManifestParseError> {
    let value = jsonc_parser::parse_to_serde_value(text, &ParseOptions::default())
        .map_err(|err| ManifestParseError::Syntax(err.to_string()))?
        .ok_or(ManifestParseError::Empty)?;
    Ok(serde_json::from_value(value)?)
}
