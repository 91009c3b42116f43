use crate::document::DocumentError;
use crate::mt::MtError;
use thiserror::Error;

/// Errors that abort a run
///
/// Backend failures inside a batch never show up here: they are contained
/// by the dispatcher and turned into passthrough.
#[derive(Error, Debug)]
pub enum PipelineError {
    /// Invalid pipeline settings
    #[error("Configuration error: {0}")]
    Config(String),

    /// The backend could not be set up (missing credential, bad key)
    #[error(transparent)]
    Backend(#[from] MtError),

    /// Input or output document could not be read or written
    #[error(transparent)]
    Document(#[from] DocumentError),

    #[error("Document has {chars} characters of text, above the limit of {limit}")]
    DocumentTooLarge { chars: usize, limit: usize },
}

pub type PipelineResult<T> = Result<T, PipelineError>;
