//! Language resource files on disk.
//!
//! A search root holds one JSON file per (domain, language). The language of a file is the
//! last path segment (directory name or file stem) equal to a known language code, and the
//! domain key is the relative path with that segment replaced by [`LANG_PLACEHOLDER`]:
//!
//! - `en/auth.json` -> `{lang}/auth.json`
//! - `auth/en.json` -> `auth/{lang}.json`
//! - `en.json` -> `{lang}.json`

use std::collections::BTreeMap;
use std::io;
use std::path::{
    Component,
    Path,
    PathBuf,
};
use std::time::SystemTime;

use ignore::WalkBuilder;
use jsonc_parser::ParseOptions;
use jsonc_parser::cst::{
    CstInputValue,
    CstObject,
    CstRootNode,
};
use serde_json::{
    Map,
    Value,
};
use thiserror::Error;

use crate::config::{
    FileMatcher,
    MatcherError,
    TranslationFilesConfig,
};
use crate::tree::TranslationTree;

/// Stands for the language segment in a domain key.
pub const LANG_PLACEHOLDER: &str = "{lang}";

/// Domain key -> language code -> file.
pub type DomainFiles = BTreeMap<String, BTreeMap<String, PathBuf>>;

#[derive(Error, Debug)]
pub enum ResourceError {
    #[error("Failed to read '{}': {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Failed to write '{}': {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Failed to parse '{}': {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("'{}' must contain a JSON object at the top level", path.display())]
    NotAnObject { path: PathBuf },

    #[error("Failed to edit '{}': {message}", path.display())]
    Edit { path: PathBuf, message: String },

    #[error(transparent)]
    Matcher(#[from] MatcherError),
}

/// Storage of per-language, per-domain translation files.
pub trait ResourceStore: std::fmt::Debug {
    /// Every translation file, grouped by domain and language.
    fn list_files(&self) -> Result<DomainFiles, ResourceError>;

    /// Parse one translation file.
    fn read_file(&self, path: &Path) -> Result<TranslationTree, ResourceError>;

    /// Merge `updates` (language -> leaves) into the files of `domain`.
    ///
    /// Existing keys that are not part of `updates` are kept. Files that do not exist yet
    /// are created.
    fn write_keys(
        &self,
        domain: &str,
        updates: &BTreeMap<String, TranslationTree>,
    ) -> Result<(), ResourceError>;

    /// Last modification time of a file.
    fn modified(&self, path: &Path) -> Result<SystemTime, ResourceError> {
        std::fs::metadata(path)
            .and_then(|metadata| metadata.modified())
            .map_err(|source| ResourceError::Read { path: path.to_path_buf(), source })
    }
}

/// JSON files below one search root.
#[derive(Debug, Clone)]
pub struct JsonResourceStore {
    matcher: FileMatcher,
    /// Known language codes, used to tell languages apart from domain names.
    languages: Vec<String>,
}

impl JsonResourceStore {
    /// # Errors
    /// Returns an error if a file pattern is not a valid glob.
    pub fn new(
        root: PathBuf,
        files: &TranslationFilesConfig,
        languages: Vec<String>,
    ) -> Result<Self, ResourceError> {
        Ok(Self { matcher: FileMatcher::new(root, files)?, languages })
    }

    #[must_use]
    pub fn root(&self) -> &Path {
        self.matcher.root()
    }

    /// File holding `language` for `domain`.
    #[must_use]
    pub fn path_for(&self, domain: &str, language: &str) -> PathBuf {
        self.root().join(domain.replace(LANG_PLACEHOLDER, language))
    }
}

impl ResourceStore for JsonResourceStore {
    fn list_files(&self) -> Result<DomainFiles, ResourceError> {
        let root = self.root();
        let mut files = DomainFiles::new();

        for result in WalkBuilder::new(root)
            .hidden(false)
            .git_ignore(true)
            .git_global(false)
            .git_exclude(true)
            .follow_links(false)
            .build()
        {
            let entry = match result {
                Ok(entry) => entry,
                Err(err) => {
                    tracing::debug!(?err, "Failed to read directory entry");
                    continue;
                }
            };

            if !entry.file_type().is_some_and(|ft| ft.is_file()) {
                continue;
            }

            let path = entry.path();
            if !self.matcher.is_translation_file(path) {
                continue;
            }
            let Ok(relative_path) = path.strip_prefix(root) else {
                continue;
            };

            let Some((domain, language)) = domain_key(relative_path, &self.languages) else {
                tracing::debug!(path = %relative_path.display(), "No language in path, skipping");
                continue;
            };

            let bindings = files.entry(domain).or_default();
            if let Some(existing) = bindings.get(&language) {
                tracing::warn!(
                    existing = %existing.display(),
                    ignored = %path.display(),
                    "Two files for the same domain and language"
                );
                continue;
            }
            bindings.insert(language, path.to_path_buf());
        }

        tracing::debug!(root = %root.display(), domains = files.len(), "Listed translation files");
        Ok(files)
    }

    fn read_file(&self, path: &Path) -> Result<TranslationTree, ResourceError> {
        let content = std::fs::read_to_string(path)
            .map_err(|source| ResourceError::Read { path: path.to_path_buf(), source })?;

        if content.trim().is_empty() {
            return Ok(TranslationTree::new());
        }

        let json: Value = serde_json::from_str(&content)
            .map_err(|source| ResourceError::Parse { path: path.to_path_buf(), source })?;

        match json {
            Value::Object(map) => Ok(map),
            _ => Err(ResourceError::NotAnObject { path: path.to_path_buf() }),
        }
    }

    fn write_keys(
        &self,
        domain: &str,
        updates: &BTreeMap<String, TranslationTree>,
    ) -> Result<(), ResourceError> {
        for (language, tree) in updates {
            let path = self.path_for(domain, language);

            let original = match std::fs::read_to_string(&path) {
                Ok(content) if !content.trim().is_empty() => content,
                Ok(_) => "{}".to_string(),
                Err(err) if err.kind() == io::ErrorKind::NotFound => {
                    if let Some(parent) = path.parent() {
                        std::fs::create_dir_all(parent).map_err(|source| {
                            ResourceError::Write { path: parent.to_path_buf(), source }
                        })?;
                    }
                    tracing::info!(path = %path.display(), "Creating translation file");
                    "{}".to_string()
                }
                Err(source) => return Err(ResourceError::Read { path, source }),
            };

            let merged = merge_into_json_text(&original, tree)
                .map_err(|message| ResourceError::Edit { path: path.clone(), message })?;

            std::fs::write(&path, merged)
                .map_err(|source| ResourceError::Write { path: path.clone(), source })?;
            tracing::debug!(path = %path.display(), language = %language, "Wrote translations");
        }
        Ok(())
    }
}

/// Split a relative file path into its domain key and language.
///
/// Searches backwards for a segment that is one of `languages`. Returns `None` for files
/// that do not belong to any of them.
fn domain_key(relative_path: &Path, languages: &[String]) -> Option<(String, String)> {
    let segments: Vec<&str> = relative_path
        .components()
        .filter_map(|component| match component {
            Component::Normal(part) => part.to_str(),
            _ => None,
        })
        .collect();

    let (file_name, directories) = segments.split_last()?;
    let (stem, extension) = match file_name.rsplit_once('.') {
        Some((stem, extension)) => (stem, Some(extension)),
        None => (*file_name, None),
    };

    let is_language = |segment: &str| languages.iter().any(|language| language == segment);

    let with_extension = |name: &str| extension.map_or_else(|| name.to_string(), |e| format!("{name}.{e}"));

    if is_language(stem) {
        let mut parts: Vec<String> = directories.iter().map(|d| (*d).to_string()).collect();
        parts.push(with_extension(LANG_PLACEHOLDER));
        return Some((parts.join("/"), stem.to_string()));
    }

    let position = directories.iter().rposition(|directory| is_language(*directory))?;
    let language = directories.get(position)?.to_string();
    let mut parts: Vec<String> = directories
        .iter()
        .enumerate()
        .map(|(i, d)| if i == position { LANG_PLACEHOLDER.to_string() } else { (*d).to_string() })
        .collect();
    parts.push((*file_name).to_string());
    Some((parts.join("/"), language))
}

/// Merge a tree of leaves into JSON text using CST to preserve formatting.
///
/// Leaves overwrite existing values, missing objects are created, everything else stays.
fn merge_into_json_text(json_text: &str, updates: &TranslationTree) -> Result<String, String> {
    let root = CstRootNode::parse(json_text, &ParseOptions::default()).map_err(|e| e.to_string())?;
    let root_obj = root.object_value_or_set();
    merge_object(&root_obj, updates);
    Ok(root.to_string())
}

fn merge_object(obj: &CstObject, updates: &Map<String, Value>) {
    for (key, value) in updates {
        if let Value::Object(child) = value {
            let child_obj = obj.object_value_or_set(key);
            merge_object(&child_obj, child);
            continue;
        }

        match obj.get(key) {
            Some(prop) => prop.set_value(to_cst_value(value)),
            None => {
                obj.append(key, to_cst_value(value));
            }
        }
    }
}

fn to_cst_value(value: &Value) -> CstInputValue {
    match value {
        Value::Null => CstInputValue::Null,
        Value::Bool(b) => CstInputValue::Bool(*b),
        Value::Number(n) => CstInputValue::Number(n.to_string()),
        Value::String(s) => CstInputValue::String(s.clone()),
        Value::Array(items) => CstInputValue::Array(items.iter().map(to_cst_value).collect()),
        Value::Object(map) => CstInputValue::Object(
            map.iter().map(|(key, value)| (key.clone(), to_cst_value(value))).collect(),
        ),
    }
}
