//! Translation backends.

use std::time::Duration;

use reqwest::blocking::Client;
use serde::{
    Deserialize,
    Serialize,
};
use serde_json::Value;
use thiserror::Error;

use crate::config::{
    TranslatorProvider,
    TranslatorSettings,
};

/// Failure of a single translation call.
#[derive(Error, Debug)]
pub enum TranslatorError {
    #[error("Translation request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Translation service returned {status}: {body}")]
    Status { status: reqwest::StatusCode, body: String },

    #[error("Unexpected translation response: {0}")]
    InvalidResponse(String),

    #[error("Translator '{provider}' requires an API key")]
    MissingApiKey { provider: &'static str },
}

/// A service turning text from one language into another.
///
/// Calls are made one at a time; implementations need not be thread-safe.
pub trait Translator: std::fmt::Debug {
    /// Translate `text` from `source` to `target` (language codes as configured).
    ///
    /// # Errors
    /// Any backend failure. Callers treat it as fatal for the current batch.
    fn translate(&self, text: &str, source: &str, target: &str) -> Result<String, TranslatorError>;
}

/// Build the backend selected in the settings.
///
/// # Errors
/// Returns an error if the HTTP client cannot be created or a required key is missing.
pub fn build_translator(
    settings: &TranslatorSettings,
) -> Result<Box<dyn Translator>, TranslatorError> {
    let client = Client::builder().timeout(Duration::from_secs(settings.timeout_secs)).build()?;

    match settings.provider {
        TranslatorProvider::Google => Ok(Box::new(GoogleTranslator {
            client,
            endpoint: settings
                .endpoint
                .clone()
                .unwrap_or_else(|| GoogleTranslator::DEFAULT_ENDPOINT.to_string()),
        })),
        TranslatorProvider::Deepl => {
            let api_key = settings
                .api_key
                .clone()
                .filter(|key| !key.is_empty())
                .ok_or(TranslatorError::MissingApiKey { provider: "deepl" })?;
            let endpoint =
                settings.endpoint.clone().unwrap_or_else(|| deepl_endpoint(&api_key).to_string());
            Ok(Box::new(DeeplTranslator { client, endpoint, api_key }))
        }
    }
}

/// Keyless Google Translate web endpoint.
#[derive(Debug, Clone)]
pub struct GoogleTranslator {
    client: Client,
    endpoint: String,
}

impl GoogleTranslator {
    const DEFAULT_ENDPOINT: &'static str = "https://translate.googleapis.com/translate_a/single";
}

impl Translator for GoogleTranslator {
    fn translate(&self, text: &str, source: &str, target: &str) -> Result<String, TranslatorError> {
        tracing::debug!(source, target, chars = text.chars().count(), "Google translate request");

        let response = self
            .client
            .get(&self.endpoint)
            .query(&[("client", "gtx"), ("sl", source), ("tl", target), ("dt", "t"), ("q", text)])
            .send()?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(TranslatorError::Status { status, body });
        }

        let body: Value = response.json()?;
        parse_google_response(&body)
    }
}

/// Join the translated sentence fragments of a `translate_a/single` response.
///
/// The body looks like `[[["Bonjour", "Hello", ...], ["!", "!", ...]], ...]`.
fn parse_google_response(body: &Value) -> Result<String, TranslatorError> {
    let sentences = body
        .get(0)
        .and_then(Value::as_array)
        .ok_or_else(|| TranslatorError::InvalidResponse("missing sentence list".to_string()))?;

    let mut translated = String::new();
    for sentence in sentences {
        if let Some(fragment) = sentence.get(0).and_then(Value::as_str) {
            translated.push_str(fragment);
        }
    }
    Ok(translated)
}

/// DeepL `v2/translate` API.
#[derive(Clone)]
pub struct DeeplTranslator {
    client: Client,
    endpoint: String,
    api_key: String,
}

impl std::fmt::Debug for DeeplTranslator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeeplTranslator")
            .field("endpoint", &self.endpoint)
            .field("api_key", &"<redacted>")
            .finish_non_exhaustive()
    }
}

/// Free-plan keys carry a `:fx` suffix and live on a separate host.
fn deepl_endpoint(api_key: &str) -> &'static str {
    if api_key.ends_with(":fx") {
        "https://api-free.deepl.com/v2/translate"
    } else {
        "https://api.deepl.com/v2/translate"
    }
}

#[derive(Debug, Serialize)]
struct DeeplRequest<'a> {
    text: [&'a str; 1],
    source_lang: String,
    target_lang: String,
}

#[derive(Debug, Deserialize)]
struct DeeplResponse {
    translations: Vec<DeeplTranslation>,
}

#[derive(Debug, Deserialize)]
struct DeeplTranslation {
    text: String,
}

impl Translator for DeeplTranslator {
    fn translate(&self, text: &str, source: &str, target: &str) -> Result<String, TranslatorError> {
        tracing::debug!(source, target, chars = text.chars().count(), "DeepL translate request");

        let request = DeeplRequest {
            text: [text],
            source_lang: source.to_uppercase(),
            target_lang: target.to_uppercase(),
        };
        let response = self
            .client
            .post(&self.endpoint)
            .header(reqwest::header::AUTHORIZATION, format!("DeepL-Auth-Key {}", self.api_key))
            .json(&request)
            .send()?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(TranslatorError::Status { status, body });
        }

        let body: DeeplResponse = response.json()?;
        body.translations
            .into_iter()
            .next()
            .map(|translation| translation.text)
            .ok_or_else(|| TranslatorError::InvalidResponse("empty translations".to_string()))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use googletest::prelude::*;
    use rstest::rstest;
    use serde_json::json;

    use super::*;

    #[googletest::test]
    fn test_parse_google_response_joins_fragments() {
        let body = json!([
            [["Bonjour :X. ", "Hello :name. ", null, null, 10], ["Au revoir", "Bye", null, null, 10]],
            null,
            "en"
        ]);

        let result = parse_google_response(&body);

        assert_that!(result, ok(eq("Bonjour :X. Au revoir")));
    }

    #[googletest::test]
    fn test_parse_google_response_rejects_unexpected_shape() {
        let result = parse_google_response(&json!({ "error": "nope" }));

        assert_that!(result, err(anything()));
    }

    #[rstest]
    #[case("abc:fx", "https://api-free.deepl.com/v2/translate")]
    #[case("abc", "https://api.deepl.com/v2/translate")]
    fn test_deepl_endpoint(#[case] key: &str, #[case] expected: &str) {
        assert_eq!(deepl_endpoint(key), expected);
    }

    #[googletest::test]
    fn test_build_deepl_without_key_fails() {
        let settings = TranslatorSettings {
            provider: TranslatorProvider::Deepl,
            api_key: None,
            ..TranslatorSettings::default()
        };

        let result = build_translator(&settings);

        assert!(matches!(result, Err(TranslatorError::MissingApiKey { provider: "deepl" })));
    }

    #[googletest::test]
    fn test_build_google_by_default() {
        let result = build_translator(&TranslatorSettings::default());

        let translator = result.unwrap();
        expect_that!(format!("{translator:?}"), contains_substring("GoogleTranslator"));
    }

    #[googletest::test]
    fn test_deepl_debug_redacts_key() {
        let settings = TranslatorSettings {
            provider: TranslatorProvider::Deepl,
            api_key: Some("secret-key:fx".to_string()),
            ..TranslatorSettings::default()
        };

        let translator = build_translator(&settings).unwrap();
        let debug = format!("{translator:?}");

        expect_that!(debug, contains_substring("<redacted>"));
        expect_that!(debug, not(contains_substring("secret-key")));
    }
}
