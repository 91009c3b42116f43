//! Translation backends
//!
//! The dispatcher only ever sees the [`MachineTranslator`] trait. Two
//! implementations ship with the crate:
//!
//! 1. **DeepL** - the production backend, authenticated with `DEEPL_AUTH_KEY`
//! 2. **Mock** - deterministic and offline, used by tests and `--mock`
//!
//! Every result carries the source language the backend detected, which is
//! what the source-language allow-list is checked against.
pub mod deepl;
pub mod error;
pub mod mock;
pub mod translator;

pub use deepl::DeepLProvider;
pub use error::{MtError, MtResult};
pub use mock::{MockMode, MockTranslator};
pub use translator::{
    MachineTranslator, Translation, deepl_target_code, normalize_locale, validate_locale,
};
