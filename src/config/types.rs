use std::collections::HashSet;
use std::path::PathBuf;

use serde::{
    Deserialize,
    Serialize,
};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Configuration error in '{field_path}': {message}")]
pub struct ValidationError {
    /// JSON path to the field (e.g., "targetLanguages[0]")
    pub field_path: String,
    pub message: String,
}

impl ValidationError {
    #[must_use]
    pub fn new(field_path: impl Into<String>, message: impl Into<String>) -> Self {
        Self { field_path: field_path.into(), message: message.into() }
    }
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Configuration validation failed:\n{}", format_validation_errors(.0))]
    ValidationErrors(Vec<ValidationError>),

    #[error("Failed to load configuration file: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Failed to parse configuration: {0}")]
    ParseError(#[from] serde_json::Error),
}

fn format_validation_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .enumerate()
        .map(|(i, err)| format!("  {}. {} - {}", i + 1, err.field_path, err.message))
        .collect::<Vec<_>>()
        .join("\n")
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AutoTranslateSettings {
    /// Language every other language is translated from.
    pub source_language: String,

    /// Languages to fill in, processed in this order.
    pub target_languages: Vec<String>,

    /// Primary search root, relative to the workspace root unless absolute.
    pub path: PathBuf,

    /// Every immediate subdirectory of this path is an additional search root.
    pub parent_path: Option<PathBuf>,

    pub key_separator: String,

    pub translation_files: TranslationFilesConfig,

    pub translator: TranslatorSettings,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TranslationFilesConfig {
    /// Globs relative to a search root.
    pub include_patterns: Vec<String>,
    pub exclude_patterns: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum TranslatorProvider {
    /// Keyless Google Translate web endpoint.
    #[default]
    Google,
    /// DeepL API (requires `apiKey`).
    Deepl,
}

#[derive(Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TranslatorSettings {
    pub provider: TranslatorProvider,
    pub api_key: Option<String>,
    /// Overrides the provider's default URL.
    pub endpoint: Option<String>,
    /// Per-request timeout.
    pub timeout_secs: u64,
}

impl std::fmt::Debug for TranslatorSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TranslatorSettings")
            .field("provider", &self.provider)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("endpoint", &self.endpoint)
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

impl AutoTranslateSettings {
    /// Source language followed by the target languages.
    #[must_use]
    pub fn languages(&self) -> Vec<String> {
        std::iter::once(&self.source_language).chain(&self.target_languages).cloned().collect()
    }

    /// # Errors
    /// - Required field is empty
    /// - Target language list is empty, duplicated or contains the source language
    /// - Invalid glob pattern
    /// - Missing API key for a provider that needs one
    pub fn validate(&self) -> Result<(), Vec<ValidationError>> {
        let mut errors = Vec::new();

        if self.source_language.trim().is_empty() {
            errors.push(ValidationError::new(
                "sourceLanguage",
                "The source language cannot be empty. Example: \"en\"",
            ));
        }

        if self.target_languages.is_empty() {
            errors.push(ValidationError::new(
                "targetLanguages",
                "At least one target language is required. Example: [\"fr\", \"de\"]",
            ));
        }

        let mut seen = HashSet::new();
        for (index, language) in self.target_languages.iter().enumerate() {
            if language.trim().is_empty() {
                errors.push(ValidationError::new(
                    format!("targetLanguages[{index}]"),
                    "The language code cannot be empty",
                ));
            } else if *language == self.source_language {
                errors.push(ValidationError::new(
                    format!("targetLanguages[{index}]"),
                    format!("'{language}' is the source language and cannot be a target"),
                ));
            } else if !seen.insert(language.as_str()) {
                errors.push(ValidationError::new(
                    format!("targetLanguages[{index}]"),
                    format!("'{language}' is listed more than once"),
                ));
            }
        }

        if self.path.as_os_str().is_empty() {
            errors.push(ValidationError::new(
                "path",
                "The path cannot be empty. Example: \"lang\"",
            ));
        }

        if self.key_separator.is_empty() {
            errors.push(ValidationError::new(
                "keySeparator",
                "The separator cannot be empty. Please specify a separator, for example: \".\" (dot)",
            ));
        }

        if self.translation_files.include_patterns.is_empty() {
            errors.push(ValidationError::new(
                "translationFiles.includePatterns",
                "At least one pattern is required. Example: [\"**/*.json\"]",
            ));
        }

        for (index, pattern) in self.translation_files.include_patterns.iter().enumerate() {
            if let Err(e) = globset::Glob::new(pattern) {
                errors.push(ValidationError::new(
                    format!("translationFiles.includePatterns[{index}]"),
                    format!("Invalid glob pattern '{pattern}': {e}"),
                ));
            }
        }

        for (index, pattern) in self.translation_files.exclude_patterns.iter().enumerate() {
            if let Err(e) = globset::Glob::new(pattern) {
                errors.push(ValidationError::new(
                    format!("translationFiles.excludePatterns[{index}]"),
                    format!("Invalid glob pattern '{pattern}': {e}"),
                ));
            }
        }

        if self.translator.provider == TranslatorProvider::Deepl
            && self.translator.api_key.as_deref().is_none_or(str::is_empty)
        {
            errors.push(ValidationError::new(
                "translator.apiKey",
                "The deepl provider requires an API key",
            ));
        }

        if self.translator.timeout_secs == 0 {
            errors.push(ValidationError::new(
                "translator.timeoutSecs",
                "The timeout must be at least 1 second",
            ));
        }

        if errors.is_empty() { Ok(()) } else { Err(errors) }
    }
}

impl Default for TranslationFilesConfig {
    fn default() -> Self {
        Self { include_patterns: vec!["**/*.json".to_string()], exclude_patterns: Vec::new() }
    }
}

impl Default for TranslatorSettings {
    fn default() -> Self {
        Self {
            provider: TranslatorProvider::Google,
            api_key: None,
            endpoint: None,
            timeout_secs: 30,
        }
    }
}

impl Default for AutoTranslateSettings {
    fn default() -> Self {
        Self {
            source_language: "en".to_string(),
            target_languages: Vec::new(),
            path: PathBuf::from("lang"),
            parent_path: None,
            key_separator: ".".to_string(),
            translation_files: TranslationFilesConfig::default(),
            translator: TranslatorSettings::default(),
        }
    }
}
