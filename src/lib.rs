//! Translation memoization and batch dispatch for block/segment JSON documents
//!
//! A document maps block ids to blocks carrying a `text`, a map of
//! `segments`, or both. Every string is looked up in a per-language
//! translation memory first; only misses are sent to the machine translation
//! backend, in fixed-size batches. A failed batch leaves its strings in the
//! source language instead of failing the run.
//!
//! ```no_run
//! use std::path::Path;
//! use transmem::{MockMode, MockTranslator, Pipeline, PipelineConfig};
//!
//! # async fn demo() -> Result<(), transmem::PipelineError> {
//! let translator = MockTranslator::new(MockMode::Suffix);
//! let pipeline = Pipeline::new(PipelineConfig::default(), &translator)?;
//! let summary = pipeline.run(Path::new("translatable_flat.json")).await?;
//! println!("{} strings translated", summary.translated);
//! # Ok(())
//! # }
//! ```

pub mod dispatch;
pub mod document;
pub mod error;
pub mod extract;
pub mod memory;
pub mod mt;
pub mod pipeline;
pub mod reconcile;
pub mod usage;


pub use dispatch::{
    AdmissionPolicy, BatchDispatcher, BatchOutcome, DispatchConfig, DispatchPolicy,
    DispatchReport, ItemOutcome,
};
pub use document::{Block, Document, DocumentError, Token, TranslatableMap};
pub use error::{PipelineError, PipelineResult};
pub use extract::{MissItem, Partition, partition};
pub use memory::{MemoryError, MemoryStore};
pub use mt::{
    DeepLProvider, MachineTranslator, MockMode, MockTranslator, MtError, MtResult, Translation,
};
pub use pipeline::{
    OutputTargets, Pipeline, PipelineConfig, RunSummary, Translated, applied_path,
    apply_token_map,
};
pub use reconcile::{reconcile, segment_export};
pub use usage::UsageLog;
