//! Block/segment documents and the tokens that address their strings
//!
//! An extracted document is a JSON object of blocks:
//!
//! ```json
//! {
//!     "b1": { "text": "Hello" },
//!     "b2": { "segments": { "s1": "Hi", "s2": "Bye" } }
//! }
//! ```
//!
//! Iteration order is the file order and is preserved on output.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// A unit of extracted content
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Block {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub segments: Option<IndexMap<String, String>>,
    /// Anything else the extractor attached to the block, passed through untouched
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Block {
    pub fn with_text(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
            ..Self::default()
        }
    }

    pub fn with_segments<I, K, V>(segments: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            segments: Some(
                segments
                    .into_iter()
                    .map(|(k, v)| (k.into(), v.into()))
                    .collect(),
            ),
            ..Self::default()
        }
    }
}

/// Block id → block, in document order
pub type Document = IndexMap<String, Block>;

/// Address of one translatable string: the block id for block text,
/// `{block_id}_{segment_id}` for a segment.
///
/// A block id that literally equals another block's `{id}_{segment}` yields
/// the same token. Collisions are reported by the extractor but not
/// resolved.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Token(String);

impl Token {
    pub fn block(block_id: &str) -> Self {
        Token(block_id.to_string())
    }

    pub fn segment(block_id: &str, segment_id: &str) -> Self {
        Token(format!("{}_{}", block_id, segment_id))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Token {
    fn from(value: &str) -> Self {
        Token(value.to_string())
    }
}

/// Run-scoped token → final text map
pub type TranslatableMap = IndexMap<Token, String>;

/// Visit every translatable string in document order: block text first,
/// then the block's segments in their own order.
pub fn for_each_text<'a>(document: &'a Document, mut visit: impl FnMut(Token, &'a str)) {
    for (block_id, block) in document {
        if let Some(text) = &block.text {
            visit(Token::block(block_id), text);
        }
        if let Some(segments) = &block.segments {
            for (segment_id, text) in segments {
                visit(Token::segment(block_id, segment_id), text);
            }
        }
    }
}

/// Total number of characters across all block and segment texts
pub fn count_chars(document: &Document) -> usize {
    let mut total = 0;
    for_each_text(document, |_, text| total += text.chars().count());
    total
}

#[derive(Error, Debug)]
pub enum DocumentError {
    #[error("Failed to read or write '{}': {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to parse JSON from '{}': {source}", .path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("Failed to encode JSON for '{}': {source}", .path.display())]
    Encode {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

impl DocumentError {
    fn io(path: &Path, source: std::io::Error) -> Self {
        DocumentError::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}

/// Read and deserialize a JSON file
pub fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T, DocumentError> {
    let content = fs::read_to_string(path).map_err(|e| DocumentError::io(path, e))?;
    serde_json::from_str(&content).map_err(|source| DocumentError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

/// Load an extracted document
pub fn load_document(path: &Path) -> Result<Document, DocumentError> {
    read_json(path)
}

/// Write `value` as pretty-printed JSON, creating parent directories.
/// Non-ASCII characters are written literally.
pub fn write_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<(), DocumentError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|e| DocumentError::io(parent, e))?;
    }
    let json = serde_json::to_string_pretty(value).map_err(|source| DocumentError::Encode {
        path: path.to_path_buf(),
        source,
    })?;
    fs::write(path, json).map_err(|e| DocumentError::io(path, e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_parse_preserves_order_and_extra_fields() {
        let json = r#"{
            "z": {"text": "last letter", "tag": "h1"},
            "a": {"segments": {"s2": "two", "s1": "one"}}
        }"#;
        let document: Document = serde_json::from_str(json).unwrap();

        let ids: Vec<_> = document.keys().cloned().collect();
        assert_eq!(ids, vec!["z", "a"]);
        assert_eq!(document["z"].extra["tag"], "h1");

        let segment_ids: Vec<_> = document["a"]
            .segments
            .as_ref()
            .unwrap()
            .keys()
            .cloned()
            .collect();
        assert_eq!(segment_ids, vec!["s2", "s1"]);

        let round = serde_json::to_value(&document).unwrap();
        assert_eq!(round["z"]["tag"], "h1");
        assert!(round["a"].get("text").is_none());
    }

    #[test]
    fn test_tokens() {
        assert_eq!(Token::block("b1").as_str(), "b1");
        assert_eq!(Token::segment("b2", "s1").to_string(), "b2_s1");
    }

    #[test]
    fn test_for_each_text_order() {
        let mut document = Document::new();
        let mut block = Block::with_segments([("s1", "Hi"), ("s2", "Bye")]);
        block.text = Some("Title".to_string());
        document.insert("b1".to_string(), block);
        document.insert("b0".to_string(), Block::with_text("Second"));

        let mut seen = Vec::new();
        for_each_text(&document, |token, text| seen.push((token.to_string(), text)));
        assert_eq!(
            seen,
            vec![
                ("b1".to_string(), "Title"),
                ("b1_s1".to_string(), "Hi"),
                ("b1_s2".to_string(), "Bye"),
                ("b0".to_string(), "Second"),
            ]
        );
    }

    #[test]
    fn test_count_chars_counts_characters_not_bytes() {
        let mut document = Document::new();
        document.insert("b1".to_string(), Block::with_text("héllo"));
        document.insert("b2".to_string(), Block::with_segments([("s1", "日本")]));
        assert_eq!(count_chars(&document), 7);
    }

    #[test]
    fn test_write_json_creates_dirs_and_keeps_unicode() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested/out.json");
        let mut document = Document::new();
        document.insert("b1".to_string(), Block::with_text("Café"));

        write_json(&path, &document).unwrap();
        let raw = fs::read_to_string(&path).unwrap();
        assert!(raw.contains("Café"));
        assert!(raw.contains("\n  "));

        let back = load_document(&path).unwrap();
        assert_eq!(back, document);
    }

    #[test]
    fn test_load_document_errors() {
        let dir = TempDir::new().unwrap();
        let missing = dir.path().join("missing.json");
        assert!(matches!(
            load_document(&missing),
            Err(DocumentError::Io { .. })
        ));

        let broken = dir.path().join("broken.json");
        fs::write(&broken, "{ not json").unwrap();
        let err = load_document(&broken).unwrap_err();
        assert!(matches!(err, DocumentError::Parse { .. }));
        assert!(err.to_string().contains("broken.json"));
    }
}
