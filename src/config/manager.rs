//! 設定管理を行うモジュール

use std::path::{
    Path,
    PathBuf,
};

use super::{
    AutoTranslateSettings,
    ConfigError,
};

/// ワークスペース直下に置く設定ファイル名
pub const CONFIG_FILE_NAME: &str = ".auto-translate.json";

/// `workspace_root` 直下の設定ファイルを読む。ファイルがなければ `None`
fn read_settings_file(workspace_root: &Path) -> Result<Option<AutoTranslateSettings>, ConfigError> {
    let config_path = workspace_root.join(CONFIG_FILE_NAME);

    let content = match std::fs::read_to_string(&config_path) {
        Ok(content) => content,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            tracing::debug!(path = %config_path.display(), "No configuration file");
            return Ok(None);
        }
        Err(err) => return Err(err.into()),
    };

    tracing::debug!(path = %config_path.display(), "Read configuration file");
    Ok(Some(serde_json::from_str(&content)?))
}

/// 設定管理を行う
#[derive(Default, Debug, Clone)]
pub struct ConfigManager {
    /// 現在の設定
    current_settings: AutoTranslateSettings,

    /// ワークスペースのルートパス
    workspace_root: Option<PathBuf>,
}

impl ConfigManager {
    /// 新しい設定マネージャーを作成
    #[must_use]
    pub fn new() -> Self {
        Self { current_settings: AutoTranslateSettings::default(), workspace_root: None }
    }

    /// 設定を読み込む
    ///
    /// 設定ファイルがなければデフォルト値を使う。バリデーションは行わない
    /// （CLI 引数で上書きしてから [`Self::update_settings`] で検証する）。
    ///
    /// # Errors
    /// - ファイル読み込みエラー
    /// - JSON パースエラー
    pub fn load_settings(&mut self, workspace_root: Option<PathBuf>) -> Result<(), ConfigError> {
        tracing::debug!("Loading settings for workspace: {:?}", workspace_root);

        // ワークスペースの設定を読み込み
        let settings = if let Some(root) = &workspace_root {
            read_settings_file(root)?.map_or_else(AutoTranslateSettings::default, |ws| {
                tracing::debug!("Loaded workspace settings: {:?}", ws);
                ws
            })
        } else {
            AutoTranslateSettings::default()
        };

        self.current_settings = settings;
        self.workspace_root = workspace_root;
        tracing::debug!("Settings loaded: {:?}", self.current_settings);

        Ok(())
    }

    /// 設定を更新する
    ///
    /// # Errors
    /// バリデーションエラー（現在の設定は変更されない）
    pub fn update_settings(&mut self, new_settings: AutoTranslateSettings) -> Result<(), ConfigError> {
        tracing::debug!("Updating settings...");

        // バリデーション
        new_settings.validate().map_err(ConfigError::ValidationErrors)?;

        // 設定を更新
        self.current_settings = new_settings;
        tracing::debug!("Settings updated successfully");

        Ok(())
    }

    /// 現在の設定を取得
    #[must_use]
    pub const fn get_settings(&self) -> &AutoTranslateSettings {
        &self.current_settings
    }

    /// ワークスペースルートを取得
    #[must_use]
    pub const fn workspace_root(&self) -> Option<&PathBuf> {
        self.workspace_root.as_ref()
    }

    /// ワークスペースルートからの相対パスを絶対パスに解決する
    #[must_use]
    pub fn resolve(&self, path: &Path) -> PathBuf {
        match &self.workspace_root {
            Some(root) if path.is_relative() => root.join(path),
            _ => path.to_path_buf(),
        }
    }
}
