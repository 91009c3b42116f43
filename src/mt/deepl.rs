//! DeepL API provider
//!
//! Talks to the DeepL v2 `translate` endpoint. The source language is left
//! out of every request so DeepL detects it and reports it back as
//! `detected_source_language`.
//!
//! # Authentication
//!
//! The provider loads the key from the `DEEPL_AUTH_KEY` environment
//! variable. Keys ending in `:fx` belong to the free plan and are sent to
//! `api-free.deepl.com`. `DEEPL_API_URL` overrides the endpoint.

use crate::mt::error::{MtError, MtResult};
use crate::mt::translator::{MachineTranslator, Translation, deepl_target_code, validate_locale};
use async_trait::async_trait;
use reqwest::StatusCode;
use serde_json::json;

/// Environment variable holding the DeepL authentication key
pub const AUTH_KEY_VAR: &str = "DEEPL_AUTH_KEY";
/// Environment variable overriding the DeepL endpoint
pub const API_URL_VAR: &str = "DEEPL_API_URL";

const PRO_URL: &str = "https://api.deepl.com/v2/translate";
const FREE_URL: &str = "https://api-free.deepl.com/v2/translate";

/// DeepL API v2 provider
#[derive(Clone)]
pub struct DeepLProvider {
    auth_key: String,
    client: reqwest::Client,
    base_url: String,
}

impl DeepLProvider {
    /// DeepL accepts at most 50 `text` entries per request
    const MAX_BATCH_SIZE: usize = 50;

    /// The whole request body may not exceed 128 KiB
    const MAX_REQUEST_BYTES: usize = 128 * 1024;

    /// Room kept for `target_lang`, `preserve_formatting` and JSON framing
    const REQUEST_OVERHEAD_BYTES: usize = 1024;

    /// Largest encoded text that fits in a request on its own
    const MAX_BYTES_PER_STRING: usize = Self::MAX_REQUEST_BYTES - Self::REQUEST_OVERHEAD_BYTES;

    /// Create a provider with an explicit key
    ///
    /// # Returns
    ///
    /// * `Ok(Self)` - New provider instance
    /// * `Err(MtError)` - If the key is empty or the HTTP client cannot be built
    pub fn new(auth_key: String) -> MtResult<Self> {
        if auth_key.trim().is_empty() {
            return Err(MtError::ConfigError(
                "DeepL auth key cannot be empty".to_string(),
            ));
        }

        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(60))
            .build()
            .map_err(|e| MtError::NetworkError(format!("Failed to create HTTP client: {}", e)))?;

        let base_url = if auth_key.trim_end().ends_with(":fx") {
            FREE_URL
        } else {
            PRO_URL
        };

        Ok(Self {
            auth_key,
            client,
            base_url: base_url.to_string(),
        })
    }

    /// Create a provider from `DEEPL_AUTH_KEY` (and `DEEPL_API_URL` if set)
    pub fn from_env() -> MtResult<Self> {
        Self::from_vars(
            std::env::var(AUTH_KEY_VAR).ok(),
            std::env::var(API_URL_VAR).ok(),
        )
    }

    /// Build a provider from already-looked-up configuration values
    pub fn from_vars(auth_key: Option<String>, api_url: Option<String>) -> MtResult<Self> {
        let auth_key = auth_key.ok_or_else(|| {
            MtError::ConfigError(format!("{} environment variable not set", AUTH_KEY_VAR))
        })?;

        let provider = Self::new(auth_key)?;
        Ok(match api_url.filter(|url| !url.trim().is_empty()) {
            Some(url) => provider.with_base_url(url),
            None => provider,
        })
    }

    /// Point the provider at a different endpoint (proxies, test servers)
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Size of `text` once encoded as a JSON string, plus its separator
    fn encoded_len(text: &str) -> usize {
        serde_json::to_string(text).map_or(text.len() * 6 + 2, |encoded| encoded.len()) + 1
    }

    /// Split into consecutive chunks that respect both the text count and
    /// the request body limits. Texts must already pass `check_length`.
    fn chunk_batch(texts: &[String]) -> Vec<&[String]> {
        let budget = Self::MAX_REQUEST_BYTES - Self::REQUEST_OVERHEAD_BYTES;
        let mut chunks = Vec::new();
        let mut start = 0;
        let mut bytes = 0;

        for (i, text) in texts.iter().enumerate() {
            let len = Self::encoded_len(text);
            let full = i - start == Self::MAX_BATCH_SIZE || bytes + len > budget;
            if full && i > start {
                chunks.push(&texts[start..i]);
                start = i;
                bytes = 0;
            }
            bytes += len;
        }
        if start < texts.len() {
            chunks.push(&texts[start..]);
        }
        chunks
    }

    fn check_length(text: &str) -> MtResult<()> {
        if Self::encoded_len(text) > Self::MAX_BYTES_PER_STRING {
            return Err(MtError::TranslationError(format!(
                "Text exceeds maximum request size of {} bytes",
                Self::MAX_BYTES_PER_STRING
            )));
        }
        Ok(())
    }

    /// Send one request of at most `MAX_BATCH_SIZE` texts
    async fn translate_chunk(
        &self,
        texts: &[String],
        target_locale: &str,
    ) -> MtResult<Vec<Translation>> {
        let body = json!({
            "text": texts,
            "target_lang": deepl_target_code(target_locale),
            "preserve_formatting": true
        });

        let response = self
            .client
            .post(&self.base_url)
            .header(
                reqwest::header::AUTHORIZATION,
                format!("DeepL-Auth-Key {}", self.auth_key),
            )
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(Self::status_error(status, error_text));
        }

        let json: serde_json::Value = response.json().await.map_err(|e| {
            MtError::TranslationError(format!("Failed to parse API response: {}", e))
        })?;

        Self::parse_translations(&json, texts.len())
    }

    fn status_error(status: StatusCode, error_text: String) -> MtError {
        match status.as_u16() {
            403 => MtError::Unauthorized(format!("DeepL rejected the auth key: {}", error_text)),
            429 => MtError::RateLimited,
            456 => MtError::QuotaExceeded,
            // Anything else is about this request's content; later requests may still succeed
            _ if status.is_client_error() => {
                MtError::TranslationError(format!("API client error ({}): {}", status, error_text))
            }
            _ => MtError::TranslationError(format!("API server error ({}): {}", status, error_text)),
        }
    }

    fn parse_translations(json: &serde_json::Value, expected: usize) -> MtResult<Vec<Translation>> {
        let translations = json["translations"].as_array().ok_or_else(|| {
            MtError::TranslationError(
                "Invalid API response: missing 'translations' array".to_string(),
            )
        })?;

        if translations.len() != expected {
            return Err(MtError::TranslationError(format!(
                "API returned {} translations for {} texts",
                translations.len(),
                expected
            )));
        }

        translations
            .iter()
            .map(|t| {
                let text = t["text"].as_str().ok_or_else(|| {
                    MtError::TranslationError(
                        "Invalid API response: missing 'text' field".to_string(),
                    )
                })?;
                let detected = t["detected_source_language"].as_str().unwrap_or_default();
                Ok(Translation::new(text, detected))
            })
            .collect()
    }
}

impl std::fmt::Debug for DeepLProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeepLProvider")
            .field("auth_key", &"***")
            .field("base_url", &self.base_url)
            .finish()
    }
}

#[async_trait]
impl MachineTranslator for DeepLProvider {
    async fn translate(&self, text: &str, target_locale: &str) -> MtResult<Translation> {
        validate_locale(target_locale)?;

        if text.is_empty() {
            return Ok(Translation::new("", ""));
        }
        Self::check_length(text)?;

        let results = self
            .translate_chunk(&[text.to_string()], target_locale)
            .await?;

        results.into_iter().next().ok_or_else(|| {
            MtError::TranslationError("API returned no translation".to_string())
        })
    }

    async fn translate_batch(
        &self,
        texts: &[String],
        target_locale: &str,
    ) -> MtResult<Vec<Translation>> {
        validate_locale(target_locale)?;

        if texts.is_empty() {
            return Ok(Vec::new());
        }

        for (i, text) in texts.iter().enumerate() {
            Self::check_length(text).map_err(|_| {
                MtError::TranslationError(format!(
                    "Text at index {} exceeds maximum request size of {} bytes",
                    i,
                    Self::MAX_BYTES_PER_STRING
                ))
            })?;
        }

        let mut all_results = Vec::with_capacity(texts.len());
        for chunk in Self::chunk_batch(texts) {
            let chunk_results = self.translate_chunk(chunk, target_locale).await?;
            all_results.extend(chunk_results);
        }

        Ok(all_results)
    }

    fn provider_name(&self) -> &str {
        "DeepL"
    }
}
