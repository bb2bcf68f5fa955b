use std::fmt;

use percent_encoding::{utf8_percent_encode, AsciiSet, CONTROLS};

/// Reference used when a request names no revision.
pub const DEFAULT_REFERENCE: &str = "HEAD";

/// Width of the revision prefix used in canonical URLs.
pub const SHORT_REVISION_LEN: usize = 7;

/// Bytes escaped in one URL path segment (RFC 3986 `pchar` complement).
const PATH_SEGMENT: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'%')
    .add(b'/')
    .add(b'<')
    .add(b'>')
    .add(b'?')
    .add(b'[')
    .add(b'\\')
    .add(b']')
    .add(b'^')
    .add(b'`')
    .add(b'{')
    .add(b'|')
    .add(b'}');

/// Full hex object id of a commit.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Revision(String);

impl Revision {
    /// Wraps a full object id; hex digits are lowercased.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into().trim().to_ascii_lowercase())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn short(&self) -> &str {
        let end = self.0.len().min(SHORT_REVISION_LEN);
        &self.0[..end]
    }

    /// Whether `reference` already names this revision by an id prefix.
    pub fn is_addressed_by(&self, reference: &str) -> bool {
        !reference.is_empty() && self.0.starts_with(reference)
    }
}

impl fmt::Display for Revision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid app name '{name}' (requested at '{reference}')")]
pub struct InvalidAppName {
    pub name: String,
    pub reference: String,
}

/// The `{app}` or `{app}@{ref}` leading path segment of a request.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AppRef {
    pub app: String,
    pub reference: Option<String>,
}

impl AppRef {
    pub fn parse(segment: &str) -> Result<Self, InvalidAppName> {
        let (app, reference) = match segment.split_once('@') {
            Some((app, reference)) => (app, Some(reference)),
            None => (segment, None),
        };
        let reference = reference.filter(|reference| !reference.is_empty());
        if !is_valid_app_name(app) {
            return Err(InvalidAppName {
                name: app.to_string(),
                reference: reference.unwrap_or(DEFAULT_REFERENCE).to_string(),
            });
        }
        Ok(Self {
            app: app.to_string(),
            reference: reference.map(ToString::to_string),
        })
    }

    /// The reference to resolve, falling back to `HEAD`.
    pub fn reference(&self) -> &str {
        self.reference.as_deref().unwrap_or(DEFAULT_REFERENCE)
    }

    /// Canonical URL of `path` inside `revision`, percent-encoded per segment.
    pub fn location(&self, revision: &Revision, path: &str) -> String {
        let mut location = format!(
            "/{}@{}",
            utf8_percent_encode(&self.app, PATH_SEGMENT),
            revision.short()
        );
        for segment in path.split('/').filter(|segment| !segment.is_empty()) {
            location.push('/');
            location.extend(utf8_percent_encode(segment, PATH_SEGMENT));
        }
        location
    }
}

fn is_valid_app_name(name: &str) -> bool {
    !name.is_empty()
        && !name.starts_with('.')
        && !name
            .chars()
            .any(|c| matches!(c, '/' | '\\' | '\0') || c.is_control())
}
