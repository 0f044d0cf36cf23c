//! Missing-key computation between flattened translations.

use std::collections::{
    BTreeMap,
    HashSet,
};

use crate::tree::FlatKeys;

/// Flattened translations grouped by domain key.
pub type DomainKeys = BTreeMap<String, FlatKeys>;

/// Keys of `source` that do not exist in `target`.
///
/// Only key identity matters: an empty string in `target` still counts as present.
#[must_use]
pub fn missing_keys(source: &FlatKeys, target: &FlatKeys) -> HashSet<String> {
    source.keys().filter(|key| !target.contains_key(key.as_str())).cloned().collect()
}

/// Restrict `source` to `keys`, keeping source values and source order.
#[must_use]
pub fn project_only(source: &FlatKeys, keys: &HashSet<String>) -> FlatKeys {
    source
        .iter()
        .filter(|(key, _)| keys.contains(key.as_str()))
        .map(|(key, value)| (key.clone(), value.clone()))
        .collect()
}

/// Per-domain [`missing_keys`] + [`project_only`].
///
/// Domains absent from `target` contribute every source key. Domains with nothing missing
/// are dropped from the result.
#[must_use]
pub fn diff_domains(source: &DomainKeys, target: &DomainKeys) -> DomainKeys {
    let empty = FlatKeys::new();
    let mut result = DomainKeys::new();

    for (domain, source_keys) in source {
        let target_keys = target.get(domain).unwrap_or(&empty);
        let missing = missing_keys(source_keys, target_keys);
        if missing.is_empty() {
            continue;
        }
        tracing::debug!(domain = %domain, missing = missing.len(), "Found missing keys");
        result.insert(domain.clone(), project_only(source_keys, &missing));
    }

    result
}
