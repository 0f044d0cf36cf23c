//! Modification-time comparison between source and target files.

use std::collections::BTreeSet;

use crate::resources::{
    DomainFiles,
    ResourceError,
    ResourceStore,
};

/// Domains whose source file has not been modified after its target file.
///
/// Only domains holding both `source_language` and `target_language` take part. A domain
/// missing its source file is reported with a warning and left out.
///
/// # Errors
/// Returns an error if a modification time cannot be read.
pub fn select_stale_domains(
    store: &dyn ResourceStore,
    files: &DomainFiles,
    source_language: &str,
    target_language: &str,
) -> Result<BTreeSet<String>, ResourceError> {
    let mut selected = BTreeSet::new();

    for (domain, bindings) in files {
        let Some(source_path) = bindings.get(source_language) else {
            tracing::warn!(domain = %domain, language = source_language, "No source file for domain");
            continue;
        };
        let Some(target_path) = bindings.get(target_language) else {
            continue;
        };

        let source_modified = store.modified(source_path)?;
        let target_modified = store.modified(target_path)?;

        if source_modified > target_modified {
            tracing::debug!(domain = %domain, target = target_language, "Source is newer than target");
        } else {
            selected.insert(domain.clone());
        }
    }

    Ok(selected)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::collections::BTreeMap;
    use std::fs::File;
    use std::path::Path;
    use std::time::{
        Duration,
        SystemTime,
    };

    use googletest::prelude::*;
    use tempfile::TempDir;

    use super::*;
    use crate::config::TranslationFilesConfig;
    use crate::resources::JsonResourceStore;

    fn touch(path: &Path, modified: SystemTime) {
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, "{}").unwrap();
        File::options().write(true).open(path).unwrap().set_modified(modified).unwrap();
    }

    fn setup() -> (TempDir, JsonResourceStore) {
        let temp_dir = TempDir::new().unwrap();
        let store = JsonResourceStore::new(
            temp_dir.path().to_path_buf(),
            &TranslationFilesConfig::default(),
            vec!["en".to_string(), "fr".to_string()],
        )
        .unwrap();
        (temp_dir, store)
    }

    #[googletest::test]
    fn test_selects_only_domains_with_older_source() {
        let (temp_dir, store) = setup();
        let root = temp_dir.path();
        let base = SystemTime::UNIX_EPOCH + Duration::from_secs(1_700_000_000);

        // auth: 原文が後から更新された
        touch(&root.join("en/auth.json"), base + Duration::from_secs(60));
        touch(&root.join("fr/auth.json"), base);
        // pages: 翻訳の方が新しい
        touch(&root.join("en/pages.json"), base);
        touch(&root.join("fr/pages.json"), base + Duration::from_secs(60));
        // same: 同時刻
        touch(&root.join("en/same.json"), base);
        touch(&root.join("fr/same.json"), base);

        let files = store.list_files().unwrap();
        let selected = select_stale_domains(&store, &files, "en", "fr").unwrap();

        assert_that!(
            selected.iter().map(String::as_str).collect::<Vec<_>>(),
            elements_are![eq(&"{lang}/pages.json"), eq(&"{lang}/same.json")]
        );
    }

    #[googletest::test]
    fn test_skips_domains_without_both_files() {
        let (temp_dir, store) = setup();
        let root = temp_dir.path();
        let base = SystemTime::UNIX_EPOCH + Duration::from_secs(1_700_000_000);
        touch(&root.join("en/only_source.json"), base);
        touch(&root.join("fr/only_target.json"), base);

        let files = store.list_files().unwrap();
        let selected = select_stale_domains(&store, &files, "en", "fr").unwrap();

        expect_that!(selected.is_empty(), eq(true));
    }

    #[googletest::test]
    fn test_missing_file_metadata_is_an_error() {
        let (temp_dir, store) = setup();
        let mut bindings = BTreeMap::new();
        bindings.insert("en".to_string(), temp_dir.path().join("en/gone.json"));
        bindings.insert("fr".to_string(), temp_dir.path().join("fr/gone.json"));
        let mut files = DomainFiles::new();
        files.insert("{lang}/gone.json".to_string(), bindings);

        let result = select_stale_domains(&store, &files, "en", "fr");

        assert!(matches!(result, Err(ResourceError::Read { .. })));
    }
}
