//! The translation run, end to end
//!
//! ```text
//! Loaded → Partitioned → Dispatched → Merged → Reconciled → Persisted
//! ```
//!
//! The memory file is written as soon as dispatch is over, before any
//! output document, so translations already paid for survive a failure in
//! a later stage.

use crate::dispatch::{
    AdmissionPolicy, BatchDispatcher, DEFAULT_BATCH_SIZE, DEFAULT_DETECTION_PREFIX,
    DispatchConfig, DispatchPolicy,
};
use crate::document::{
    Document, TranslatableMap, count_chars, load_document, read_json, write_json,
};
use crate::error::{PipelineError, PipelineResult};
use crate::extract::partition;
use crate::memory::{MemoryStore, memory_file_name};
use crate::mt::{MachineTranslator, validate_locale};
use crate::reconcile::{reconcile, segment_export, token_map_from_flat};
use crate::usage::UsageLog;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Files a run writes besides the memory
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputTargets {
    /// Translated document, same shape as the input
    pub output: PathBuf,
    /// Flat `segment_id → text` export
    pub segments: Option<PathBuf>,
    /// Flat `token → text` export, re-appliable with [`apply_token_map`]
    pub token_map: Option<PathBuf>,
    /// `{ "reused": [...], "added": [...] }`
    pub usage: Option<PathBuf>,
    /// Extra copy of the reconciled document
    pub applied: Option<PathBuf>,
}

impl Default for OutputTargets {
    fn default() -> Self {
        Self {
            output: PathBuf::from("translations.json"),
            segments: None,
            token_map: None,
            usage: None,
            applied: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub target_lang: String,
    pub primary_lang: Option<String>,
    pub secondary_lang: Option<String>,
    pub memory_dir: PathBuf,
    pub policy: DispatchPolicy,
    pub batch_size: usize,
    pub detection_prefix_chars: usize,
    /// Reject documents with more characters of text than this
    pub max_chars: Option<usize>,
    /// Skip dispatch and memory persistence when every string is cached
    pub skip_if_cached: bool,
    pub outputs: OutputTargets,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            target_lang: "FR".to_string(),
            primary_lang: None,
            secondary_lang: None,
            memory_dir: PathBuf::from("translation_memory"),
            policy: DispatchPolicy::default(),
            batch_size: DEFAULT_BATCH_SIZE,
            detection_prefix_chars: DEFAULT_DETECTION_PREFIX,
            max_chars: None,
            skip_if_cached: false,
            outputs: OutputTargets::default(),
        }
    }
}

impl PipelineConfig {
    pub fn validate(&self) -> PipelineResult<()> {
        validate_locale(self.target_lang.trim())
            .map_err(|e| PipelineError::Config(format!("target language: {}", e)))?;
        if self.batch_size == 0 {
            return Err(PipelineError::Config(
                "batch size must be at least 1".to_string(),
            ));
        }
        if self.detection_prefix_chars == 0 {
            return Err(PipelineError::Config(
                "detection prefix must be at least 1 character".to_string(),
            ));
        }
        Ok(())
    }

    pub fn memory_path(&self) -> PathBuf {
        self.memory_dir.join(memory_file_name(&self.target_lang))
    }

    pub fn admission(&self) -> AdmissionPolicy {
        AdmissionPolicy::from_languages(
            [&self.primary_lang, &self.secondary_lang]
                .into_iter()
                .flatten(),
        )
    }

    pub fn dispatch_config(&self) -> DispatchConfig {
        DispatchConfig {
            policy: self.policy,
            batch_size: self.batch_size,
            detection_prefix_chars: self.detection_prefix_chars,
            admission: self.admission(),
        }
    }
}

/// Counters describing one run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    pub tokens: usize,
    pub cached: usize,
    pub misses: usize,
    pub batches: usize,
    pub failed_batches: usize,
    pub translated: usize,
    pub passed_through: usize,
    pub memory_entries: usize,
    /// Every string was cached and dispatch was skipped entirely
    pub short_circuited: bool,
    pub token_collisions: usize,
}

/// In-memory result of translating one document
#[derive(Debug, Clone, PartialEq)]
pub struct Translated {
    pub document: Document,
    pub translatable_map: TranslatableMap,
    pub usage: UsageLog,
    pub summary: RunSummary,
}

pub struct Pipeline<'a> {
    config: PipelineConfig,
    dispatch: DispatchConfig,
    translator: &'a dyn MachineTranslator,
}

impl<'a> Pipeline<'a> {
    pub fn new(config: PipelineConfig, translator: &'a dyn MachineTranslator) -> PipelineResult<Self> {
        config.validate()?;
        let dispatch = config.dispatch_config();
        Ok(Self {
            config,
            dispatch,
            translator,
        })
    }

    /// Translate `document` against `memory`, growing the memory with new
    /// translations. Does no file I/O.
    pub async fn translate_document(
        &self,
        document: &Document,
        memory: &mut MemoryStore,
    ) -> PipelineResult<Translated> {
        if let Some(limit) = self.config.max_chars {
            let chars = count_chars(document);
            if chars > limit {
                return Err(PipelineError::DocumentTooLarge { chars, limit });
            }
        }

        let target = self.config.target_lang.trim();
        let mut parts = partition(document, memory);
        let mut usage = UsageLog::new();
        usage.record_reused(parts.reused.iter().cloned());

        let mut summary = RunSummary {
            tokens: parts.token_count(),
            cached: parts.hit_count(),
            misses: parts.misses.len(),
            token_collisions: parts.collisions.len(),
            ..RunSummary::default()
        };

        if parts.is_fully_cached() && self.config.skip_if_cached {
            info!("All text blocks found in memory, skipping translation backend");
            summary.short_circuited = true;
        } else {
            let dispatcher = BatchDispatcher::new(self.translator, &self.dispatch);
            let report = dispatcher
                .dispatch(&parts.misses, target, &mut parts.translatable_map, memory)
                .await;
            usage.record_added(report.added.iter().cloned());
            summary.batches = report.batches;
            summary.failed_batches = report.failed_batches();
            summary.translated = report.translated;
            summary.passed_through = report.passed_through;
        }
        summary.memory_entries = memory.len();

        let translated = reconcile(document, &parts.translatable_map);
        Ok(Translated {
            document: translated,
            translatable_map: parts.translatable_map,
            usage,
            summary,
        })
    }

    /// Full run over files: load, translate, persist memory, write outputs
    pub async fn run(&self, input: &Path) -> PipelineResult<RunSummary> {
        let document = load_document(input)?;
        info!("Loaded {} blocks from {}", document.len(), input.display());

        let mut memory = MemoryStore::load(self.config.memory_path());
        let translated = self.translate_document(&document, &mut memory).await?;

        if !translated.summary.short_circuited {
            if let Err(e) = memory.save() {
                warn!("Could not persist translation memory: {}", e);
            }
        }

        let outputs = &self.config.outputs;
        write_json(&outputs.output, &translated.document)?;
        info!("Translation written to {}", outputs.output.display());

        if let Some(path) = &outputs.segments {
            write_json(path, &segment_export(&translated.document))?;
            info!("Segment-only translations exported to {}", path.display());
        }
        if let Some(path) = &outputs.token_map {
            write_json(path, &translated.translatable_map)?;
            info!("Token map exported to {}", path.display());
        }
        if let Some(path) = &outputs.usage {
            write_json(path, &translated.usage)?;
            info!("Usage log written to {}", path.display());
        }
        if let Some(path) = &outputs.applied {
            write_json(path, &translated.document)?;
            info!("Applied translations to {}", path.display());
        }

        Ok(translated.summary)
    }
}

/// `translated_<name>` next to `input`
pub fn applied_path(input: &Path) -> PathBuf {
    let name = input
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "output.json".to_string());
    input.with_file_name(format!("translated_{}", name))
}

/// Re-apply a flat token map export onto the original document and write
/// the result to `output`
pub fn apply_token_map(original: &Path, translations: &Path, output: &Path) -> PipelineResult<Document> {
    let document = load_document(original)?;
    let flat: IndexMap<String, String> = read_json(translations)?;
    let merged = reconcile(&document, &token_map_from_flat(flat));
    write_json(output, &merged)?;
    info!("Applied translations to {}", output.display());
    Ok(merged)
}
