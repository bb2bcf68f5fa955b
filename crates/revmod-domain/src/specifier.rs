use std::borrow::Cow;

use crate::manifest::ImportTable;

/// Rewrites one module specifier through an import table.
///
/// Surrounding quotes are ignored for matching and never re-added. An exact
/// key wins; otherwise the longest key `k` with `specifier` starting at
/// `k + "/"` maps to `value` (one trailing `/` dropped) followed by the rest
/// of the specifier. Keys written in directory form (`"std/"`) match the
/// same specifiers as their bare form (`"std"`).
pub fn resolve<'s>(table: &ImportTable, raw: &'s str) -> Cow<'s, str> {
    let specifier = strip_quotes(raw);
    if let Some(mapped) = table.get(specifier) {
        return Cow::Owned(mapped.to_string());
    }

    let mut best: Option<(&str, &str)> = None;
    for (key, value) in table.iter() {
        let base = key.strip_suffix('/').unwrap_or(key);
        if base.is_empty() {
            continue;
        }
        let Some(rest) = specifier.strip_prefix(base) else {
            continue;
        };
        if !rest.starts_with('/') {
            continue;
        }
        let longer = match best {
            Some((current, _)) => base.len() > current.len(),
            None => true,
        };
        if longer {
            best = Some((base, value));
        }
    }

    match best {
        Some((base, value)) => {
            let value = value.strip_suffix('/').unwrap_or(value);
            Cow::Owned(format!("{value}{}", &specifier[base.len()..]))
        }
        None => Cow::Borrowed(specifier),
    }
}

fn strip_quotes(raw: &str) -> &str {
    raw.trim_matches(|c| matches!(c, '"' | '\'' | '`'))
}
