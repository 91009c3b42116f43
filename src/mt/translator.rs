//! Machine translation trait and locale utilities
//!
//! This module defines the `MachineTranslator` trait for backend abstraction,
//! so the dispatcher can talk to DeepL in production and to the mock in tests
//! without knowing which one it holds.
//!
//! # Example
//!
//! ```ignore
//! use transmem::mt::{DeepLProvider, MachineTranslator};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let provider = DeepLProvider::from_env()?;
//!
//!     let result = provider.translate("Hello, world!", "FR").await?;
//!     println!("{} (detected {})", result.text, result.detected_source_locale);
//!
//!     let texts = vec!["Hello".to_string(), "Goodbye".to_string()];
//!     let results = provider.translate_batch(&texts, "FR").await?;
//!     println!("{:?}", results);
//!
//!     Ok(())
//! }
//! ```

use crate::mt::error::{MtError, MtResult};
use async_trait::async_trait;

/// One translated string together with the language the backend detected
/// for its source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Translation {
    pub text: String,
    pub detected_source_locale: String,
}

impl Translation {
    pub fn new(text: impl Into<String>, detected_source_locale: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            detected_source_locale: detected_source_locale.into(),
        }
    }
}

/// Generic trait for machine translation backends
///
/// The source language is never passed in: backends auto-detect it and
/// report it back in every [`Translation`]. The dispatcher relies on that to
/// run its admission policy.
#[async_trait]
pub trait MachineTranslator: Send + Sync {
    /// Translate a single text string into `target_locale`
    ///
    /// # Returns
    ///
    /// * `Ok(Translation)` - The translated text and detected source language
    /// * `Err(MtError)` - If translation fails
    async fn translate(&self, text: &str, target_locale: &str) -> MtResult<Translation>;

    /// Translate multiple strings in one logical call
    ///
    /// Implementations may split the request internally to respect
    /// per-request limits.
    ///
    /// # Guarantees
    ///
    /// - Output order matches input order
    /// - Output length equals input length
    async fn translate_batch(
        &self,
        texts: &[String],
        target_locale: &str,
    ) -> MtResult<Vec<Translation>>;

    /// Name used in log lines
    fn provider_name(&self) -> &str;
}

/// Normalize a locale code by stripping region information
///
/// - `en-US` → `en`
/// - `EN-GB` → `en`
/// - `pt_BR` → `pt`
/// - `fr` → `fr`
pub fn normalize_locale(locale: &str) -> String {
    locale
        .trim()
        .split(['-', '_'])
        .next()
        .unwrap_or(locale)
        .to_lowercase()
}

/// Convert a locale code to the form DeepL expects for `target_lang`
///
/// DeepL wants upper case and a hyphen before the variant: `en_gb` → `EN-GB`.
pub fn deepl_target_code(locale: &str) -> String {
    locale.trim().replace('_', "-").to_uppercase()
}

/// Validate that a locale code is in acceptable format
///
/// Only alphanumeric characters, hyphens and underscores are allowed.
pub fn validate_locale(locale: &str) -> MtResult<()> {
    if locale.is_empty() {
        return Err(MtError::InvalidLocale("Locale code is empty".to_string()));
    }

    if !locale
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
    {
        return Err(MtError::InvalidLocale(format!(
            "Invalid characters in locale code: {}",
            locale
        )));
    }

    Ok(())
}
