//! Missing-only and updated-only workflows over one or more search roots.

use std::collections::BTreeMap;
use std::io;
use std::path::{
    Path,
    PathBuf,
};

use serde_json::Value;
use thiserror::Error;

use crate::config::AutoTranslateSettings;
use crate::diff::{
    DomainKeys,
    diff_domains,
};
use crate::dispatcher::{
    DispatchError,
    Dispatcher,
    ProgressSink,
};
use crate::resources::{
    DomainFiles,
    JsonResourceStore,
    ResourceError,
    ResourceStore,
};
use crate::staleness::select_stale_domains;
use crate::translator::Translator;
use crate::tree::{
    FlatKeys,
    TranslationTree,
    flatten,
};

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("Search root '{}' is not a directory", path.display())]
    NotADirectory { path: PathBuf },

    #[error("Failed to list search roots in '{}': {source}", path.display())]
    SearchRoots {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error(transparent)]
    Resource(#[from] ResourceError),

    #[error(transparent)]
    Dispatch(#[from] DispatchError),
}

/// Which keys count as pending.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Workflow {
    /// Source keys absent from the target files.
    Missing,
    /// Like [`Workflow::Missing`], but the target content of each domain is chosen by
    /// comparing modification times of its files.
    Updated,
}

/// Pending work for one target language.
#[derive(Debug, Clone, Default)]
pub struct LanguagePlan {
    pub language: String,
    pub pending: DomainKeys,
    /// Number of pending keys.
    pub keys: usize,
    /// Characters of the pending string values.
    pub chars: usize,
}

impl LanguagePlan {
    fn new(language: &str, pending: DomainKeys) -> Self {
        let keys = pending.values().map(serde_json::Map::len).sum();
        let chars = pending
            .values()
            .flat_map(|keys| keys.values())
            .filter_map(Value::as_str)
            .map(|text| text.chars().count())
            .sum();
        Self { language: language.to_string(), pending, keys, chars }
    }
}

/// Pending work for every target language of one search root.
#[derive(Debug, Clone, Default)]
pub struct RootPlan {
    pub root: PathBuf,
    pub languages: Vec<LanguagePlan>,
}

impl RootPlan {
    #[must_use]
    pub fn total_keys(&self) -> usize {
        self.languages.iter().map(|plan| plan.keys).sum()
    }

    #[must_use]
    pub fn total_chars(&self) -> usize {
        self.languages.iter().map(|plan| plan.chars).sum()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.total_keys() == 0
    }
}

/// How a search root ended.
#[derive(Debug)]
pub enum RootOutcome {
    NothingMissing,
    /// The confirmation was declined.
    Declined,
    Translated { keys: usize },
    Failed(PipelineError),
}

#[derive(Debug)]
pub struct RootReport {
    pub root: PathBuf,
    pub outcome: RootOutcome,
}

#[derive(Debug, Default)]
pub struct RunReport {
    pub roots: Vec<RootReport>,
}

impl RunReport {
    #[must_use]
    pub fn has_failures(&self) -> bool {
        self.roots.iter().any(|report| matches!(report.outcome, RootOutcome::Failed(_)))
    }

    #[must_use]
    pub fn translated_keys(&self) -> usize {
        self.roots
            .iter()
            .map(|report| match report.outcome {
                RootOutcome::Translated { keys } => keys,
                _ => 0,
            })
            .sum()
    }
}

/// The primary path followed by every immediate subdirectory of `parent_path`, sorted.
///
/// # Errors
/// Returns an error if `parent_path` cannot be read.
pub fn search_roots(path: &Path, parent_path: Option<&Path>) -> Result<Vec<PathBuf>, PipelineError> {
    let mut roots = vec![path.to_path_buf()];

    let Some(parent) = parent_path else {
        return Ok(roots);
    };

    let to_error = |source| PipelineError::SearchRoots { path: parent.to_path_buf(), source };
    let mut children = Vec::new();
    for entry in std::fs::read_dir(parent).map_err(to_error)? {
        let entry = entry.map_err(to_error)?;
        if entry.file_type().map_err(to_error)?.is_dir() {
            children.push(entry.path());
        }
    }
    children.sort();

    for child in children {
        if !roots.contains(&child) {
            roots.push(child);
        }
    }
    Ok(roots)
}

/// Processes every search root in order.
///
/// `confirm` is asked once per root that has pending keys; a root whose confirmation is
/// declined is left untouched. A failing root is recorded and the remaining roots still run.
///
/// If `parent_path` cannot be listed, the primary path is still processed and the listing
/// failure is recorded as a failed root for `parent_path`.
pub fn run(
    settings: &AutoTranslateSettings,
    workflow: Workflow,
    translator: &dyn Translator,
    confirm: &mut dyn FnMut(&RootPlan) -> bool,
    progress: &mut dyn ProgressSink,
) -> RunReport {
    let (roots, listing_failure) = match search_roots(&settings.path, settings.parent_path.as_deref()) {
        Ok(roots) => (roots, None),
        Err(err) => {
            tracing::error!(error = %err, "Failed to list search roots, continuing with the primary path");
            let parent = settings.parent_path.clone().unwrap_or_default();
            (vec![settings.path.clone()], Some(RootReport { root: parent, outcome: RootOutcome::Failed(err) }))
        }
    };
    tracing::info!(roots = roots.len(), ?workflow, "Starting translation run");

    let mut report = RunReport::default();
    for root in roots {
        let outcome = match run_root(settings, workflow, translator, &root, confirm, progress) {
            Ok(outcome) => outcome,
            Err(err) => {
                tracing::error!(root = %root.display(), error = %err, "Search root failed");
                RootOutcome::Failed(err)
            }
        };
        report.roots.push(RootReport { root, outcome });
    }
    report.roots.extend(listing_failure);
    report
}

fn run_root(
    settings: &AutoTranslateSettings,
    workflow: Workflow,
    translator: &dyn Translator,
    root: &Path,
    confirm: &mut dyn FnMut(&RootPlan) -> bool,
    progress: &mut dyn ProgressSink,
) -> Result<RootOutcome, PipelineError> {
    if !root.is_dir() {
        return Err(PipelineError::NotADirectory { path: root.to_path_buf() });
    }
    tracing::info!(root = %root.display(), "Searching translations");

    let store =
        JsonResourceStore::new(root.to_path_buf(), &settings.translation_files, settings.languages())?;
    let pipeline = Pipeline::new(&store, translator, settings);

    let plan = pipeline.plan(root, workflow)?;
    if plan.is_empty() {
        tracing::info!(root = %root.display(), "No missing keys");
        return Ok(RootOutcome::NothingMissing);
    }
    if !confirm(&plan) {
        tracing::info!(root = %root.display(), "Skipped by user");
        return Ok(RootOutcome::Declined);
    }

    let keys = pipeline.execute(&plan, progress)?;
    Ok(RootOutcome::Translated { keys })
}

/// Workflows over a single search root.
#[derive(Debug, Clone, Copy)]
pub struct Pipeline<'a> {
    store: &'a dyn ResourceStore,
    translator: &'a dyn Translator,
    settings: &'a AutoTranslateSettings,
}

impl<'a> Pipeline<'a> {
    #[must_use]
    pub const fn new(
        store: &'a dyn ResourceStore,
        translator: &'a dyn Translator,
        settings: &'a AutoTranslateSettings,
    ) -> Self {
        Self { store, translator, settings }
    }

    /// Flattened content of every domain that has a file for `language`.
    ///
    /// A file with a malformed key is logged and its domain left out.
    ///
    /// # Errors
    /// Returns an error if a file cannot be read.
    pub fn translations(&self, files: &DomainFiles, language: &str) -> Result<DomainKeys, PipelineError> {
        let mut result = DomainKeys::new();
        for (domain, bindings) in files {
            let Some(path) = bindings.get(language) else {
                continue;
            };
            if let Some(keys) = self.flatten_file(domain, path)? {
                result.insert(domain.clone(), keys);
            }
        }
        Ok(result)
    }

    /// [`Self::translations`] of the source language.
    ///
    /// # Errors
    /// See [`Self::translations`].
    pub fn source_translations(&self, files: &DomainFiles) -> Result<DomainKeys, PipelineError> {
        self.translations(files, &self.settings.source_language)
    }

    /// Source keys without a counterpart in `target`.
    ///
    /// # Errors
    /// See [`Self::translations`].
    pub fn missing_translations(&self, files: &DomainFiles, target: &str) -> Result<DomainKeys, PipelineError> {
        let (source, existing) = self.comparable_translations(files, target)?;
        Ok(diff_domains(&source, &existing))
    }

    /// Source keys without a counterpart in `target`, with the target content of each
    /// domain selected by modification time.
    ///
    /// Domains whose source file is not newer than the target file are diffed against the
    /// target file. Every other domain falls back to the missing-key diff against whatever
    /// target content exists.
    ///
    /// # Errors
    /// Returns an error if a modification time or a file cannot be read.
    pub fn updated_translations(&self, files: &DomainFiles, target: &str) -> Result<DomainKeys, PipelineError> {
        let stale = select_stale_domains(self.store, files, &self.settings.source_language, target)?;
        for (domain, bindings) in files {
            if !bindings.contains_key(target) {
                continue;
            }
            if stale.contains(domain) {
                tracing::debug!(domain = %domain, target = %target, "Target is up to date, diffing");
            } else {
                tracing::debug!(domain = %domain, target = %target, "Source is newer, falling back to missing keys");
            }
        }

        let (source, existing) = self.comparable_translations(files, target)?;
        Ok(diff_domains(&source, &existing))
    }

    /// Source and `target` content of every domain whose files both flatten cleanly.
    ///
    /// A domain whose target file has a malformed key is dropped from both sides; diffing its
    /// source against nothing would overwrite the target file.
    fn comparable_translations(
        &self,
        files: &DomainFiles,
        target: &str,
    ) -> Result<(DomainKeys, DomainKeys), PipelineError> {
        let mut source = DomainKeys::new();
        let mut existing = DomainKeys::new();
        for (domain, bindings) in files {
            let Some(source_path) = bindings.get(&self.settings.source_language) else {
                continue;
            };
            let Some(source_keys) = self.flatten_file(domain, source_path)? else {
                continue;
            };
            if let Some(target_path) = bindings.get(target) {
                let Some(target_keys) = self.flatten_file(domain, target_path)? else {
                    continue;
                };
                existing.insert(domain.clone(), target_keys);
            }
            source.insert(domain.clone(), source_keys);
        }
        Ok((source, existing))
    }

    /// `None` (with a warning) if the file holds a key that cannot be flattened.
    fn flatten_file(&self, domain: &str, path: &Path) -> Result<Option<FlatKeys>, PipelineError> {
        let tree = self.store.read_file(path)?;
        match flatten(&tree, &self.settings.key_separator) {
            Ok(keys) => Ok(Some(keys)),
            Err(err) => {
                tracing::warn!(
                    domain = %domain,
                    path = %path.display(),
                    error = %err,
                    "Skipping domain with malformed keys"
                );
                Ok(None)
            }
        }
    }

    /// Pending keys of every target language.
    ///
    /// # Errors
    /// Returns an error if the files cannot be listed or read.
    pub fn plan(&self, root: &Path, workflow: Workflow) -> Result<RootPlan, PipelineError> {
        let files = self.store.list_files()?;

        let mut languages = Vec::with_capacity(self.settings.target_languages.len());
        for target in &self.settings.target_languages {
            let pending = match workflow {
                Workflow::Missing => self.missing_translations(&files, target)?,
                Workflow::Updated => self.updated_translations(&files, target)?,
            };
            let plan = LanguagePlan::new(target, pending);
            tracing::info!(language = %target, keys = plan.keys, "Found missing keys");
            languages.push(plan);
        }

        Ok(RootPlan { root: root.to_path_buf(), languages })
    }

    /// Translate `pending` into `target`.
    ///
    /// # Errors
    /// Returns an error on the first backend failure.
    pub fn translate(
        &self,
        pending: &DomainKeys,
        target: &str,
        progress: &mut dyn ProgressSink,
    ) -> Result<BTreeMap<String, TranslationTree>, PipelineError> {
        let dispatcher =
            Dispatcher::new(self.translator, &self.settings.source_language, &self.settings.key_separator);
        Ok(dispatcher.translate_domains(pending, target, progress)?)
    }

    /// Merge translated trees into the `language` files of their domains.
    ///
    /// # Errors
    /// Returns an error if a file cannot be written.
    pub fn fill_language_files(
        &self,
        language: &str,
        translated: BTreeMap<String, TranslationTree>,
    ) -> Result<(), PipelineError> {
        for (domain, tree) in translated {
            let updates = BTreeMap::from([(language.to_string(), tree)]);
            self.store.write_keys(&domain, &updates)?;
        }
        Ok(())
    }

    /// Translate and write every language of `plan`, one language at a time.
    ///
    /// Returns the number of keys written. `progress` is finished whether or not this
    /// succeeds.
    ///
    /// # Errors
    /// Stops at the first failure. Languages finished before it stay written.
    pub fn execute(&self, plan: &RootPlan, progress: &mut dyn ProgressSink) -> Result<usize, PipelineError> {
        progress.begin(plan.total_keys());
        let result = self.execute_languages(plan, progress);
        progress.finish();
        result
    }

    fn execute_languages(&self, plan: &RootPlan, progress: &mut dyn ProgressSink) -> Result<usize, PipelineError> {
        let mut written = 0;
        for language in &plan.languages {
            if language.pending.is_empty() {
                continue;
            }
            let translated = self.translate(&language.pending, &language.language, progress)?;
            // 不正なキーで飛ばされたドメインは数えない
            let keys: usize = translated
                .keys()
                .filter_map(|domain| language.pending.get(domain))
                .map(serde_json::Map::len)
                .sum();
            self.fill_language_files(&language.language, translated)?;
            tracing::info!(language = %language.language, keys, "Wrote translations");
            written += keys;
        }
        Ok(written)
    }
}
