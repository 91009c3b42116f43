//! Diagnostic record of which strings came from memory and which were new

use indexmap::IndexSet;
use serde::{Deserialize, Serialize};

/// `{ "reused": [...], "added": [...] }`, each list de-duplicated in
/// first-seen order
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UsageLog {
    pub reused: IndexSet<String>,
    pub added: IndexSet<String>,
}

impl UsageLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_reused<I, S>(&mut self, texts: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.reused.extend(texts.into_iter().map(Into::into));
    }

    pub fn record_added<I, S>(&mut self, texts: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.added.extend(texts.into_iter().map(Into::into));
    }
}
