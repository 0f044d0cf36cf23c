//! Sequential translation of flat keys.
//!
//! Each (key, value) pair goes through one of three steps before the dispatcher moves on:
//!
//! - empty strings are copied as-is (there is nothing to translate),
//! - other strings are sent to the backend with their placeholders guarded,
//! - non-string values are passed through unchanged.
//!
//! Once every pair is handled, the flat result is folded back into a nested tree. A backend
//! failure aborts the dispatch and no partial result is returned. Keys are checked before the
//! first backend call, so a domain that could not be written back costs nothing.

use std::collections::BTreeMap;

use serde_json::Value;
use thiserror::Error;

use crate::diff::DomainKeys;
use crate::placeholder::{
    extract_placeholders,
    restore_placeholders,
};
use crate::translator::{
    Translator,
    TranslatorError,
};
use crate::tree::{
    FlatKeys,
    MalformedKeyError,
    TranslationTree,
    split_key,
    unflatten,
};

#[derive(Error, Debug)]
pub enum DispatchError {
    #[error("Failed to translate '{key}' into '{target}': {source}")]
    Backend {
        key: String,
        target: String,
        #[source]
        source: TranslatorError,
    },

    #[error(transparent)]
    MalformedKey(#[from] MalformedKeyError),
}

/// What happened to a single key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProgressOutcome {
    /// Empty source value, copied without a backend call.
    Skipped,
    Translated,
    /// Non-string value, copied unchanged.
    PassedThrough,
}

#[derive(Debug, Clone, Copy)]
pub struct ProgressEvent<'a> {
    pub domain: &'a str,
    pub key: &'a str,
    pub outcome: ProgressOutcome,
}

/// Receives one event per processed key.
pub trait ProgressSink {
    /// A batch of `total` keys is about to start.
    fn begin(&mut self, _total: usize) {}

    fn on_progress(&mut self, event: &ProgressEvent<'_>);

    /// The batch announced by [`ProgressSink::begin`] is done.
    fn finish(&mut self) {}
}

/// Discards every event.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoProgress;

impl ProgressSink for NoProgress {
    fn on_progress(&mut self, _event: &ProgressEvent<'_>) {}
}

/// Translates flat keys from the source language into one target at a time.
#[derive(Debug, Clone, Copy)]
pub struct Dispatcher<'a> {
    translator: &'a dyn Translator,
    source_language: &'a str,
    key_separator: &'a str,
}

impl<'a> Dispatcher<'a> {
    #[must_use]
    pub fn new(translator: &'a dyn Translator, source_language: &'a str, key_separator: &'a str) -> Self {
        Self { translator, source_language, key_separator }
    }

    /// Translate the values of one domain into `target`, in key order.
    ///
    /// # Errors
    /// Returns [`DispatchError::MalformedKey`] before any backend call if a key cannot be
    /// unflattened, or an error on the first backend failure.
    pub fn translate(
        &self,
        domain: &str,
        keys: &FlatKeys,
        target: &str,
        progress: &mut dyn ProgressSink,
    ) -> Result<TranslationTree, DispatchError> {
        for key in keys.keys() {
            split_key(key, self.key_separator)?;
        }

        let mut translated = FlatKeys::new();

        for (key, value) in keys {
            let (result, outcome) = match value {
                Value::String(text) if text.is_empty() => (value.clone(), ProgressOutcome::Skipped),
                Value::String(text) => {
                    let translation = self.translate_text(text, target).map_err(|source| {
                        DispatchError::Backend { key: key.clone(), target: target.to_string(), source }
                    })?;
                    (Value::String(translation), ProgressOutcome::Translated)
                }
                _ => (value.clone(), ProgressOutcome::PassedThrough),
            };

            tracing::debug!(domain = %domain, key = %key, ?outcome, "Dispatched key");
            translated.insert(key.clone(), result);
            progress.on_progress(&ProgressEvent { domain, key, outcome });
        }

        Ok(unflatten(&translated, self.key_separator)?)
    }

    /// [`Self::translate`] over every domain, in domain order.
    ///
    /// A domain with a malformed key is logged and left out of the result. The other domains
    /// are still translated.
    ///
    /// # Errors
    /// Stops at the first backend failure.
    pub fn translate_domains(
        &self,
        domains: &DomainKeys,
        target: &str,
        progress: &mut dyn ProgressSink,
    ) -> Result<BTreeMap<String, TranslationTree>, DispatchError> {
        let mut trees = BTreeMap::new();
        for (domain, keys) in domains {
            match self.translate(domain, keys, target, progress) {
                Ok(tree) => {
                    trees.insert(domain.clone(), tree);
                }
                Err(DispatchError::MalformedKey(err)) => {
                    tracing::warn!(domain = %domain, error = %err, "Skipping domain with malformed keys");
                }
                Err(err) => return Err(err),
            }
        }
        Ok(trees)
    }

    fn translate_text(&self, text: &str, target: &str) -> Result<String, TranslatorError> {
        let tokens = extract_placeholders(text);
        let translated = self.translator.translate(text, self.source_language, target)?;
        Ok(restore_placeholders(&tokens, &translated))
    }
}
