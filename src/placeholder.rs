//! Placeholder protection for translated strings.
//!
//! Placeholders are `:`-prefixed markers such as `:name` or `:count`. Translation backends
//! are free to rename or reorder them, so the markers of the source string are put back
//! positionally: the Nth placeholder of the translated text becomes the Nth placeholder of
//! the source text.

use std::collections::VecDeque;
use std::sync::LazyLock;

use regex::{
    Captures,
    Regex,
};

/// A colon followed by non-whitespace, not ending in sentence punctuation.
const PLACEHOLDER_PATTERN: &str = r#":\S*[^\s.,;:!?)\]}"']"#;

#[allow(clippy::expect_used)] // 固定パターンなので失敗しない
static PLACEHOLDER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(PLACEHOLDER_PATTERN).expect("placeholder pattern is valid"));

/// Placeholders of `text` in order of appearance, duplicates included.
///
/// # Examples
/// ```
/// use auto_translate::placeholder::extract_placeholders;
///
/// let tokens = extract_placeholders("Hello :name, you have :count items");
/// assert_eq!(tokens, vec![":name".to_string(), ":count".to_string()]);
/// ```
#[must_use]
pub fn extract_placeholders(text: &str) -> Vec<String> {
    PLACEHOLDER.find_iter(text).map(|m| m.as_str().to_string()).collect()
}

/// Replace the placeholders of `translated`, left to right, with `tokens` in order.
///
/// Unused tokens are dropped. Placeholders of `translated` left over once `tokens` is
/// exhausted are kept as they are.
#[must_use]
pub fn restore_placeholders(tokens: &[String], translated: &str) -> String {
    let mut queue: VecDeque<&str> = tokens.iter().map(String::as_str).collect();

    PLACEHOLDER
        .replace_all(translated, |caps: &Captures<'_>| {
            queue.pop_front().map_or_else(
                || caps.get(0).map_or_else(String::new, |m| m.as_str().to_string()),
                str::to_string,
            )
        })
        .into_owned()
}
