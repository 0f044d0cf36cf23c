//! Translation tree flattening and reconstruction.

use serde_json::{
    Map,
    Value,
};
use thiserror::Error;

/// Nested translation data as read from a language file.
///
/// Leaves are strings; anything else is carried through untouched.
pub type TranslationTree = Map<String, Value>;

/// Flattened translation key map (e.g., "common.hello" -> "Hello").
///
/// Keeps insertion order, so the order of a flattened file is the order of the file itself.
pub type FlatKeys = Map<String, Value>;

/// A key path that cannot be mapped onto a tree.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Malformed translation key '{key}': {reason}")]
pub struct MalformedKeyError {
    /// The offending key path.
    pub key: String,
    /// What is wrong with it.
    pub reason: &'static str,
}

impl MalformedKeyError {
    /// Creates a new error for `key`.
    fn new(key: impl Into<String>, reason: &'static str) -> Self {
        Self { key: key.into(), reason }
    }
}

/// Flatten a nested translation tree into a separator-joined key map.
///
/// Empty nested objects produce no entries.
///
/// # Examples
/// ```
/// use serde_json::json;
/// use auto_translate::tree::flatten;
///
/// let json = json!({
///     "common": {
///         "hello": "Hello",
///         "goodbye": "Goodbye"
///     }
/// });
///
/// let flattened = flatten(json.as_object().unwrap(), ".").unwrap();
/// assert_eq!(flattened.get("common.hello"), Some(&json!("Hello")));
/// assert_eq!(flattened.get("common.goodbye"), Some(&json!("Goodbye")));
/// ```
///
/// # Errors
/// Returns [`MalformedKeyError`] if the tree contains an empty key, or a key containing
/// `separator` (such as the sentence key `"Hello."`), since neither could be rebuilt by
/// [`unflatten`].
pub fn flatten(tree: &TranslationTree, separator: &str) -> Result<FlatKeys, MalformedKeyError> {
    let mut result = FlatKeys::new();
    flatten_object(tree, separator, None, &mut result)?;
    Ok(result)
}

/// Recursive step of [`flatten`].
fn flatten_object(
    map: &Map<String, Value>,
    separator: &str,
    prefix: Option<&str>,
    result: &mut FlatKeys,
) -> Result<(), MalformedKeyError> {
    for (key, value) in map {
        let full_key = prefix.map_or_else(|| key.clone(), |p| format!("{p}{separator}{key}"));
        if key.is_empty() {
            return Err(MalformedKeyError::new(full_key, "empty key segment"));
        }
        // 区切り文字を含むキーは unflatten で別の形に戻ってしまう
        if key.contains(separator) {
            return Err(MalformedKeyError::new(full_key, "key contains the separator"));
        }

        match value {
            Value::Object(child) => flatten_object(child, separator, Some(&full_key), result)?,
            _ => {
                result.insert(full_key, value.clone());
            }
        }
    }
    Ok(())
}

/// Rebuild a nested tree from a flat key map.
///
/// Keys are applied in order. A key that extends a path previously holding a leaf replaces
/// that leaf with an object, and a key naming an existing branch replaces the branch with
/// its leaf. Sibling branches are never touched.
///
/// # Errors
/// Returns [`MalformedKeyError`] if a key is empty or contains an empty segment
/// (e.g. `".a"`, `"a."`, `"a..b"`).
pub fn unflatten(flat: &FlatKeys, separator: &str) -> Result<TranslationTree, MalformedKeyError> {
    let mut tree = TranslationTree::new();
    for (key, value) in flat {
        let segments = split_key(key, separator)?;
        insert_path(&mut tree, &segments, value.clone());
    }
    Ok(tree)
}

/// Split a flat key into its segments, rejecting empty ones.
///
/// # Errors
/// Returns [`MalformedKeyError`] for an empty key or an empty segment.
pub fn split_key<'k>(key: &'k str, separator: &str) -> Result<Vec<&'k str>, MalformedKeyError> {
    if key.is_empty() {
        return Err(MalformedKeyError::new(key, "empty key"));
    }
    let segments: Vec<&str> = key.split(separator).collect();
    if segments.iter().any(|segment| segment.is_empty()) {
        return Err(MalformedKeyError::new(key, "empty key segment"));
    }
    Ok(segments)
}

/// Set `value` at the path described by `segments`, creating objects on the way.
fn insert_path(tree: &mut TranslationTree, segments: &[&str], value: Value) {
    match segments {
        [] => {}
        [last] => {
            tree.insert((*last).to_string(), value);
        }
        [head, rest @ ..] => {
            let entry =
                tree.entry((*head).to_string()).or_insert_with(|| Value::Object(Map::new()));
            if !entry.is_object() {
                *entry = Value::Object(Map::new());
            }
            if let Value::Object(child) = entry {
                insert_path(child, rest, value);
            }
        }
    }
}
