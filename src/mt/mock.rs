//! Mock machine translator for testing
//!
//! A deterministic, offline backend for exercising the dispatcher and the
//! pipeline without credentials or network access. Every call is counted so
//! tests can assert that a cached run never reaches the backend.
//!
//! # Example
//!
//! ```ignore
//! use transmem::mt::{MachineTranslator, MockMode, MockTranslator};
//!
//! #[tokio::test]
//! async fn test_translation() {
//!     let mock = MockTranslator::new(MockMode::Suffix);
//!     let result = mock.translate("hello", "FR").await.unwrap();
//!     assert_eq!(result.text, "hello_FR");
//!     assert_eq!(mock.call_count(), 1);
//! }
//! ```

use crate::mt::error::{MtError, MtResult};
use crate::mt::translator::{MachineTranslator, Translation};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Mock translation modes for testing different scenarios
#[derive(Debug, Clone)]
pub enum MockMode {
    /// Append target suffix: "hello" → "hello_FR"
    Suffix,

    /// Use predefined mappings, keyed by (text, target_locale).
    /// Unknown texts fall back to suffix mode.
    Mappings(HashMap<(String, String), String>),

    /// Every call fails with this message
    Error(String),

    /// Every call fails as if the credentials were rejected
    Unauthorized,

    /// Return input unchanged
    NoOp,
}

/// Mock translator that simulates a detecting backend
#[derive(Debug, Clone)]
pub struct MockTranslator {
    mode: MockMode,
    /// Language reported for texts without an explicit override
    detected_locale: String,
    /// Per-text detected language overrides
    detections: HashMap<String, String>,
    /// Any call that includes one of these texts fails
    fail_markers: Vec<String>,
    calls: Arc<AtomicUsize>,
}

impl MockTranslator {
    /// Create a new MockTranslator with the given mode. Every text is
    /// reported as detected English (`EN`, as DeepL spells it).
    pub fn new(mode: MockMode) -> Self {
        Self {
            mode,
            detected_locale: "EN".to_string(),
            detections: HashMap::new(),
            fail_markers: Vec::new(),
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Convenience constructor for the mappings mode
    pub fn with_mappings<I, S>(target_locale: &str, pairs: I) -> Self
    where
        I: IntoIterator<Item = (S, S)>,
        S: Into<String>,
    {
        let map = pairs
            .into_iter()
            .map(|(source, translated)| {
                ((source.into(), target_locale.to_string()), translated.into())
            })
            .collect();
        Self::new(MockMode::Mappings(map))
    }

    /// Report `locale` as the detected language for every text
    pub fn detecting(mut self, locale: &str) -> Self {
        self.detected_locale = locale.to_string();
        self
    }

    /// Report `locale` as the detected language of `text` only
    pub fn detect_as(mut self, text: &str, locale: &str) -> Self {
        self.detections.insert(text.to_string(), locale.to_string());
        self
    }

    /// Fail any call whose input contains `text`
    pub fn fail_on(mut self, text: &str) -> Self {
        self.fail_markers.push(text.to_string());
        self
    }

    /// Number of backend calls made so far (single and batch calls alike)
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn record_call(&self) {
        self.calls.fetch_add(1, Ordering::SeqCst);
    }

    fn check_markers<'a>(&self, mut texts: impl Iterator<Item = &'a str>) -> MtResult<()> {
        match texts.find(|text| self.fail_markers.iter().any(|marker| marker.as_str() == *text)) {
            Some(text) => Err(MtError::TranslationError(format!(
                "mock failure triggered by {:?}",
                text
            ))),
            None => Ok(()),
        }
    }

    fn detected_for(&self, text: &str) -> String {
        // Detection calls only see a prefix of the text, so a prefix of an
        // overridden text reports the override too.
        self.detections
            .get(text)
            .or_else(|| {
                self.detections
                    .iter()
                    .find(|(known, _)| !text.is_empty() && known.starts_with(text))
                    .map(|(_, locale)| locale)
            })
            .cloned()
            .unwrap_or_else(|| self.detected_locale.clone())
    }

    /// Apply translation logic based on the mode
    fn apply_translation(&self, text: &str, target: &str) -> MtResult<Translation> {
        let translated = match &self.mode {
            MockMode::Suffix => format!("{}_{}", text, target),
            MockMode::Mappings(map) => {
                let key = (text.to_string(), target.to_string());
                map.get(&key)
                    .cloned()
                    .unwrap_or_else(|| format!("{}_{}", text, target))
            }
            MockMode::Error(msg) => return Err(MtError::TranslationError(msg.clone())),
            MockMode::Unauthorized => {
                return Err(MtError::Unauthorized("mock credentials rejected".to_string()));
            }
            MockMode::NoOp => text.to_string(),
        };
        Ok(Translation::new(translated, self.detected_for(text)))
    }
}

#[async_trait]
impl MachineTranslator for MockTranslator {
    async fn translate(&self, text: &str, target_locale: &str) -> MtResult<Translation> {
        self.record_call();
        self.check_markers(std::iter::once(text))?;
        self.apply_translation(text, target_locale)
    }

    async fn translate_batch(
        &self,
        texts: &[String],
        target_locale: &str,
    ) -> MtResult<Vec<Translation>> {
        self.record_call();
        self.check_markers(texts.iter().map(String::as_str))?;
        texts
            .iter()
            .map(|text| self.apply_translation(text, target_locale))
            .collect()
    }

    fn provider_name(&self) -> &str {
        "Mock Translator"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_suffix_single_translation() {
        let mock = MockTranslator::new(MockMode::Suffix);
        let result = mock.translate("hello", "FR").await.unwrap();
        assert_eq!(result, Translation::new("hello_FR", "EN"));
    }

    #[tokio::test]
    async fn test_suffix_batch_preserves_order() {
        let mock = MockTranslator::new(MockMode::Suffix);
        let texts = vec![
            "first".to_string(),
            "second".to_string(),
            "third".to_string(),
        ];
        let results = mock.translate_batch(&texts, "FR").await.unwrap();
        let texts: Vec<_> = results.into_iter().map(|t| t.text).collect();
        assert_eq!(texts, vec!["first_FR", "second_FR", "third_FR"]);
    }

    #[tokio::test]
    async fn test_mapping_with_fallback() {
        let mock = MockTranslator::with_mappings("FR", [("Hello", "Bonjour")]);
        assert_eq!(mock.translate("Hello", "FR").await.unwrap().text, "Bonjour");
        assert_eq!(mock.translate("Bye", "FR").await.unwrap().text, "Bye_FR");
    }

    #[tokio::test]
    async fn test_error_mode_returns_error() {
        let mock = MockTranslator::new(MockMode::Error("API unavailable".to_string()));
        match mock.translate("hello", "FR").await {
            Err(MtError::TranslationError(msg)) => assert_eq!(msg, "API unavailable"),
            _ => panic!("Expected TranslationError"),
        }
    }

    #[tokio::test]
    async fn test_unauthorized_mode_rejects_credentials() {
        let mock = MockTranslator::new(MockMode::Unauthorized);
        let err = mock.translate("hello", "FR").await.unwrap_err();
        assert!(err.is_config());
        assert!(err.disables_backend());
    }

    #[tokio::test]
    async fn test_noop_batch_returns_unchanged() {
        let mock = MockTranslator::new(MockMode::NoOp);
        let texts = vec!["hello".to_string(), "world".to_string()];
        let results = mock.translate_batch(&texts, "FR").await.unwrap();
        assert_eq!(results[0].text, "hello");
        assert_eq!(results[1].text, "world");
    }

    #[tokio::test]
    async fn test_fail_on_marker_only_affects_calls_containing_it() {
        let mock = MockTranslator::new(MockMode::Suffix).fail_on("boom");
        let bad = vec!["ok".to_string(), "boom".to_string()];
        let good = vec!["ok".to_string(), "fine".to_string()];
        assert!(mock.translate_batch(&bad, "FR").await.is_err());
        assert!(mock.translate_batch(&good, "FR").await.is_ok());
        assert!(mock.translate("boom", "FR").await.is_err());
    }

    #[tokio::test]
    async fn test_detection_overrides() {
        let mock = MockTranslator::new(MockMode::Suffix)
            .detecting("de")
            .detect_as("Bonjour tout le monde", "FR");
        assert_eq!(
            mock.translate("Hallo", "EN").await.unwrap().detected_source_locale,
            "de"
        );
        // Prefixes of an overridden text report the same language
        assert_eq!(
            mock.translate("Bonjour", "EN").await.unwrap().detected_source_locale,
            "FR"
        );
    }

    #[tokio::test]
    async fn test_call_counter_is_shared_between_clones() {
        let mock = MockTranslator::new(MockMode::Suffix);
        let clone = mock.clone();
        clone.translate("a", "FR").await.unwrap();
        mock.translate_batch(&["b".to_string()], "FR").await.unwrap();
        let _ = MockTranslator::new(MockMode::Error("x".into())).translate("c", "FR").await;
        assert_eq!(mock.call_count(), 2);
        assert_eq!(clone.call_count(), 2);
    }

    #[test]
    fn test_provider_name() {
        let mock = MockTranslator::new(MockMode::Suffix);
        assert_eq!(mock.provider_name(), "Mock Translator");
    }
}
