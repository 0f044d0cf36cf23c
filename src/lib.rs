//! auto-translate
//!
//! 翻訳リソースファイルの未翻訳キーを検出し、プレースホルダー（`:name` など）を保ったまま
//! 翻訳サービスで埋める

pub mod config;
pub mod diff;
pub mod dispatcher;
pub mod pipeline;
pub mod placeholder;
pub mod resources;
pub mod staleness;
pub mod translator;
pub mod tree;
