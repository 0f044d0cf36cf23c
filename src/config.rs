//! Configuration: settings file, validation and translation file matching.
/// Configuration manager
mod manager;
/// Translation file pattern matcher
mod matcher;
/// Configuration types and settings
mod types;

pub use manager::{
    CONFIG_FILE_NAME,
    ConfigManager,
};
pub use matcher::{
    FileMatcher,
    MatcherError,
};
pub use types::{
    AutoTranslateSettings,
    ConfigError,
    TranslationFilesConfig,
    TranslatorProvider,
    TranslatorSettings,
    ValidationError,
};
