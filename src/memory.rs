//! Persistent translation memory
//!
//! One JSON file per target language maps exact source strings to the
//! translation obtained for them:
//!
//! ```json
//! { "Hello": "Bonjour", "Goodbye": "Au revoir" }
//! ```
//!
//! Keys are the exact source text. No whitespace or case normalization is
//! applied, so near-duplicates are cached independently.

use indexmap::IndexMap;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info, warn};

#[derive(Error, Debug)]
pub enum MemoryError {
    #[error("Failed to write translation memory '{}': {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to encode translation memory: {0}")]
    Encode(#[from] serde_json::Error),
}

/// File name of the memory for `target_lang` inside the memory directory
pub fn memory_file_name(target_lang: &str) -> String {
    format!("translation_memory_{}.json", target_lang.trim().to_lowercase())
}

/// Text → text cache scoped to one target language
///
/// Loaded once at the start of a run, grown in place while batches are
/// dispatched, written once at the end. Entries are never evicted.
#[derive(Debug, Clone, PartialEq)]
pub struct MemoryStore {
    path: PathBuf,
    entries: IndexMap<String, String>,
}

impl MemoryStore {
    /// Empty store that will persist to `path`
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            entries: IndexMap::new(),
        }
    }

    /// Load the memory of `target_lang` from `memory_dir`
    pub fn open(memory_dir: &Path, target_lang: &str) -> Self {
        Self::load(memory_dir.join(memory_file_name(target_lang)))
    }

    /// Load the memory stored at `path`
    ///
    /// A missing file is a cold start. An unreadable or unparsable file is
    /// logged and also treated as a cold start: a corrupted cache must never
    /// fail the run.
    pub fn load(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let content = match fs::read_to_string(&path) {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!("No translation memory at {}, starting empty", path.display());
                return Self::new(path);
            }
            Err(e) => {
                warn!(
                    "Could not read translation memory {}: {}. Starting empty",
                    path.display(),
                    e
                );
                return Self::new(path);
            }
        };

        match serde_json::from_str::<IndexMap<String, String>>(&content) {
            Ok(entries) => {
                info!(
                    "Loaded {} cached translations from {}",
                    entries.len(),
                    path.display()
                );
                Self { path, entries }
            }
            Err(e) => {
                warn!(
                    "Corrupted translation memory file {}: {}. Starting empty",
                    path.display(),
                    e
                );
                Self::new(path)
            }
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn get(&self, source: &str) -> Option<&str> {
        self.entries.get(source).map(String::as_str)
    }

    pub fn contains(&self, source: &str) -> bool {
        self.entries.contains_key(source)
    }

    /// Record a translation. Callers only insert genuinely translated
    /// strings, never passthrough results.
    pub fn insert(&mut self, source: impl Into<String>, translated: impl Into<String>) {
        self.entries.insert(source.into(), translated.into());
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &IndexMap<String, String> {
        &self.entries
    }

    /// Write the full map, pretty-printed with non-ASCII kept literal,
    /// creating parent directories as needed. An empty store writes `{}`.
    pub fn save(&self) -> Result<(), MemoryError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|source| MemoryError::Io {
                path: parent.to_path_buf(),
                source,
            })?;
        }

        let json = serde_json::to_string_pretty(&self.entries)?;
        fs::write(&self.path, json).map_err(|source| MemoryError::Io {
            path: self.path.clone(),
            source,
        })?;

        info!(
            "Saved translation memory with {} entries to {}",
            self.entries.len(),
            self.path.display()
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_memory_file_name_is_lowercased() {
        assert_eq!(memory_file_name("FR"), "translation_memory_fr.json");
        assert_eq!(memory_file_name("en-GB"), "translation_memory_en-gb.json");
    }

    #[test]
    fn test_open_uses_language_specific_path() {
        let dir = TempDir::new().unwrap();
        let store = MemoryStore::open(dir.path(), "DE");
        assert_eq!(store.path(), dir.path().join("translation_memory_de.json"));
        assert!(store.is_empty());
    }

    #[test]
    fn test_load_missing_file_is_empty() {
        let dir = TempDir::new().unwrap();
        let store = MemoryStore::load(dir.path().join("nope.json"));
        assert!(store.is_empty());
    }

    #[test]
    fn test_load_corrupted_file_is_empty() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("translation_memory_fr.json");
        fs::write(&path, "{\"Hello\": \"Bonj").unwrap();
        let store = MemoryStore::load(&path);
        assert!(store.is_empty());
        assert_eq!(store.path(), path);
    }

    #[test]
    fn test_load_wrong_shape_is_empty() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("m.json");
        fs::write(&path, r#"{"Hello": 3}"#).unwrap();
        assert!(MemoryStore::load(&path).is_empty());
    }

    #[test]
    fn test_save_then_load() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("deep/er/translation_memory_fr.json");
        let mut store = MemoryStore::new(&path);
        store.insert("Hello", "Bonjour");
        store.insert("Coffee", "Café");
        store.save().unwrap();

        let raw = fs::read_to_string(&path).unwrap();
        assert!(raw.contains("Café"), "non-ASCII must not be escaped: {}", raw);
        assert!(raw.contains("\n  \"Hello\""));

        let loaded = MemoryStore::load(&path);
        assert_eq!(loaded, store);
        assert_eq!(loaded.get("Hello"), Some("Bonjour"));
    }

    #[test]
    fn test_keys_are_exact() {
        let mut store = MemoryStore::new("unused.json");
        store.insert("Hello", "Bonjour");
        assert!(store.contains("Hello"));
        assert!(!store.contains("hello"));
        assert!(!store.contains("Hello "));
    }

    #[test]
    fn test_save_empty_writes_valid_object() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("empty.json");
        MemoryStore::new(&path).save().unwrap();
        let value: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(value, serde_json::json!({}));
    }
}
