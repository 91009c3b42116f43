//! Batch dispatch of cache misses to the translation backend
//!
//! Misses are cut into fixed-size batches and sent one batch at a time.
//! Two policies are supported:
//!
//! - [`DispatchPolicy::DetectThenTranslate`]: one detection call per batch
//!   over a short prefix of every item, then one full translate call per
//!   admitted item. Items whose detected language is outside the allow-list
//!   are passed through unchanged.
//! - [`DispatchPolicy::BulkTranslate`]: one translate call for the whole
//!   batch, results applied positionally. The allow-list is checked against
//!   the language detected for each item in that same call.
//!
//! A failing batch never aborts the run: every item of that batch resolves
//! to its original text and nothing from it reaches the memory.

use crate::document::{Token, TranslatableMap};
use crate::extract::MissItem;
use crate::memory::MemoryStore;
use crate::mt::{MachineTranslator, MtError, MtResult, normalize_locale};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use tracing::{debug, info, warn};

/// Items per batch. Kept well under backend per-request count and size limits.
pub const DEFAULT_BATCH_SIZE: usize = 330;

/// Characters of each item sent with the detection call
pub const DEFAULT_DETECTION_PREFIX: usize = 100;

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "kebab-case")]
pub enum DispatchPolicy {
    /// Detect each item's language on a prefix, then translate admitted items one by one
    #[default]
    #[value(name = "detect")]
    DetectThenTranslate,
    /// Translate the whole batch in one call
    #[value(name = "bulk")]
    BulkTranslate,
}

/// Source languages the backend may translate from
///
/// Comparison is case-insensitive on the base language (`EN-GB` matches
/// `en`). An empty allow-list admits everything.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AdmissionPolicy {
    allowed: BTreeSet<String>,
}

impl AdmissionPolicy {
    pub fn allow_all() -> Self {
        Self::default()
    }

    /// Build from language codes; blank entries are ignored
    pub fn from_languages<I, S>(languages: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let allowed = languages
            .into_iter()
            .map(|lang| normalize_locale(lang.as_ref()))
            .filter(|lang| !lang.is_empty())
            .collect();
        Self { allowed }
    }

    pub fn is_unrestricted(&self) -> bool {
        self.allowed.is_empty()
    }

    pub fn admits(&self, detected_locale: &str) -> bool {
        self.is_unrestricted() || self.allowed.contains(&normalize_locale(detected_locale))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DispatchConfig {
    pub policy: DispatchPolicy,
    pub batch_size: usize,
    pub detection_prefix_chars: usize,
    pub admission: AdmissionPolicy,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            policy: DispatchPolicy::default(),
            batch_size: DEFAULT_BATCH_SIZE,
            detection_prefix_chars: DEFAULT_DETECTION_PREFIX,
            admission: AdmissionPolicy::allow_all(),
        }
    }
}

/// What happened to one item of a completed batch
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ItemOutcome {
    Translated(String),
    PassedThrough,
}

/// Result of one batch: either an outcome per item, positionally aligned
/// with the request, or the error that made the whole batch pass through.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BatchOutcome {
    Completed(Vec<ItemOutcome>),
    Failed(MtError),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchFailure {
    pub index: usize,
    pub size: usize,
    pub error: MtError,
}

/// Counters for one dispatch run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DispatchReport {
    pub batches: usize,
    pub translated: usize,
    pub passed_through: usize,
    pub failures: Vec<BatchFailure>,
    /// Source texts newly added to the memory, in dispatch order
    pub added: Vec<String>,
}

impl DispatchReport {
    pub fn failed_batches(&self) -> usize {
        self.failures.len()
    }
}

/// Sends cache misses to a backend batch by batch
pub struct BatchDispatcher<'a> {
    translator: &'a dyn MachineTranslator,
    config: &'a DispatchConfig,
}

impl<'a> BatchDispatcher<'a> {
    pub fn new(translator: &'a dyn MachineTranslator, config: &'a DispatchConfig) -> Self {
        Self { translator, config }
    }

    /// Consecutive slices of at most `batch_size` items
    pub fn batches<'m>(&self, misses: &'m [MissItem]) -> std::slice::Chunks<'m, MissItem> {
        misses.chunks(self.config.batch_size.max(1))
    }

    /// Translate `misses` into `translatable_map`, recording genuinely
    /// translated strings in `memory`.
    ///
    /// Every miss ends up in `translatable_map`: translated text, or the
    /// original when the item was not admitted or its batch failed.
    pub async fn dispatch(
        &self,
        misses: &[MissItem],
        target_locale: &str,
        translatable_map: &mut TranslatableMap,
        memory: &mut MemoryStore,
    ) -> DispatchReport {
        let mut report = DispatchReport::default();
        let mut backend_unusable = false;

        for (index, batch) in self.batches(misses).enumerate() {
            report.batches += 1;

            let outcome = if backend_unusable {
                BatchOutcome::Failed(MtError::Other(
                    "skipped after the backend rejected the credentials".to_string(),
                ))
            } else {
                self.run_batch(batch, target_locale).await
            };

            match outcome {
                BatchOutcome::Completed(items) => {
                    debug!("Batch {} completed ({} items)", index, batch.len());
                    for (item, item_outcome) in batch.iter().zip(items) {
                        match item_outcome {
                            ItemOutcome::Translated(text) => {
                                if !memory.contains(&item.text) {
                                    report.added.push(item.text.clone());
                                }
                                memory.insert(item.text.clone(), text.clone());
                                translatable_map.insert(item.token.clone(), text);
                                report.translated += 1;
                            }
                            ItemOutcome::PassedThrough => {
                                translatable_map.insert(item.token.clone(), item.text.clone());
                                report.passed_through += 1;
                            }
                        }
                    }
                }
                BatchOutcome::Failed(error) => {
                    warn!(
                        "Translation skipped for batch {} ({} items): {}",
                        index,
                        batch.len(),
                        error
                    );
                    if error.disables_backend() && !backend_unusable {
                        warn!("Backend rejected the credentials; remaining batches pass through");
                        backend_unusable = true;
                    }
                    pass_through(batch, translatable_map);
                    report.passed_through += batch.len();
                    report.failures.push(BatchFailure {
                        index,
                        size: batch.len(),
                        error,
                    });
                }
            }
        }

        info!(
            "{} dispatched {} batches: {} translated, {} passed through, {} failed batches",
            self.translator.provider_name(),
            report.batches,
            report.translated,
            report.passed_through,
            report.failed_batches()
        );
        report
    }

    /// Run one batch under the configured policy
    pub async fn run_batch(&self, batch: &[MissItem], target_locale: &str) -> BatchOutcome {
        let result = match self.config.policy {
            DispatchPolicy::DetectThenTranslate => {
                self.detect_then_translate(batch, target_locale).await
            }
            DispatchPolicy::BulkTranslate => self.bulk_translate(batch, target_locale).await,
        };

        match result {
            Ok(items) if items.len() == batch.len() => BatchOutcome::Completed(items),
            Ok(items) => BatchOutcome::Failed(MtError::TranslationError(format!(
                "backend returned {} results for {} items",
                items.len(),
                batch.len()
            ))),
            Err(error) => BatchOutcome::Failed(error),
        }
    }

    async fn detect_then_translate(
        &self,
        batch: &[MissItem],
        target_locale: &str,
    ) -> MtResult<Vec<ItemOutcome>> {
        let admission = &self.config.admission;

        // Detection only matters when something can be refused
        let admitted: Vec<bool> = if admission.is_unrestricted() {
            vec![true; batch.len()]
        } else {
            let prefixes: Vec<String> = batch
                .iter()
                .map(|item| prefix(&item.text, self.config.detection_prefix_chars))
                .collect();
            let detections = self.translator.translate_batch(&prefixes, target_locale).await?;
            if detections.len() != batch.len() {
                return Err(MtError::TranslationError(format!(
                    "detection returned {} results for {} items",
                    detections.len(),
                    batch.len()
                )));
            }
            detections
                .iter()
                .map(|d| admission.admits(&d.detected_source_locale))
                .collect()
        };

        let mut outcomes = Vec::with_capacity(batch.len());
        for (item, admitted) in batch.iter().zip(admitted) {
            if admitted {
                let translation = self.translator.translate(&item.text, target_locale).await?;
                outcomes.push(ItemOutcome::Translated(translation.text));
            } else {
                debug!("Passing through {} (source language not allowed)", item.token);
                outcomes.push(ItemOutcome::PassedThrough);
            }
        }
        Ok(outcomes)
    }

    async fn bulk_translate(
        &self,
        batch: &[MissItem],
        target_locale: &str,
    ) -> MtResult<Vec<ItemOutcome>> {
        let texts: Vec<String> = batch.iter().map(|item| item.text.clone()).collect();
        let translations = self.translator.translate_batch(&texts, target_locale).await?;

        Ok(translations
            .into_iter()
            .map(|t| {
                if self.config.admission.admits(&t.detected_source_locale) {
                    ItemOutcome::Translated(t.text)
                } else {
                    ItemOutcome::PassedThrough
                }
            })
            .collect())
    }
}

fn pass_through(batch: &[MissItem], translatable_map: &mut TranslatableMap) {
    for item in batch {
        translatable_map.insert(item.token.clone(), item.text.clone());
    }
}

/// First `chars` characters of `text`
fn prefix(text: &str, chars: usize) -> String {
    text.chars().take(chars).collect()
}

/// Convenience for tests and callers holding plain `(token, text)` pairs
pub fn miss_items<I, T, S>(pairs: I) -> Vec<MissItem>
where
    I: IntoIterator<Item = (T, S)>,
    T: Into<Token>,
    S: Into<String>,
{
    pairs
        .into_iter()
        .map(|(token, text)| MissItem {
            token: token.into(),
            text: text.into(),
        })
        .collect()
}
