//! Merge a token → text map back into the document structure

use crate::document::{Document, Token, TranslatableMap};
use indexmap::IndexMap;

/// Build a translated copy of `document`
///
/// Block text is replaced by `translatable_map[block_id]`, each segment by
/// `translatable_map["{block_id}_{segment_id}"]`. Anything without an
/// entry keeps its original text, so no content is ever dropped. The input
/// is left untouched.
pub fn reconcile(document: &Document, translatable_map: &TranslatableMap) -> Document {
    document
        .iter()
        .map(|(block_id, block)| {
            let mut translated = block.clone();

            if let Some(text) = translated.text.as_mut() {
                if let Some(value) = translatable_map.get(&Token::block(block_id)) {
                    *text = value.clone();
                }
            }

            if let Some(segments) = translated.segments.as_mut() {
                for (segment_id, text) in segments.iter_mut() {
                    if let Some(value) = translatable_map.get(&Token::segment(block_id, segment_id)) {
                        *text = value.clone();
                    }
                }
            }

            (block_id.clone(), translated)
        })
        .collect()
}

/// Flat `segment_id → text` export of every segment in `document`
///
/// Segment ids are only unique within their block; when they repeat across
/// blocks the last one in document order wins.
pub fn segment_export(document: &Document) -> IndexMap<String, String> {
    let mut export = IndexMap::new();
    for block in document.values() {
        if let Some(segments) = &block.segments {
            for (segment_id, text) in segments {
                export.insert(segment_id.clone(), text.clone());
            }
        }
    }
    export
}

/// Token map read back from a flat JSON export (`{ token: text }`)
pub fn token_map_from_flat(flat: IndexMap<String, String>) -> TranslatableMap {
    flat.into_iter()
        .map(|(token, text)| (Token::from(token.as_str()), text))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::Block;

    fn sample() -> Document {
        let mut document = Document::new();
        document.insert("b1".to_string(), Block::with_text("Hello"));
        document.insert(
            "b2".to_string(),
            Block::with_segments([("s1", "Hi"), ("s2", "Bye")]),
        );
        document
    }

    #[test]
    fn test_reconcile_replaces_text_and_segments() {
        let document = sample();
        let mut map = TranslatableMap::new();
        map.insert(Token::block("b1"), "Bonjour".to_string());
        map.insert(Token::segment("b2", "s1"), "Salut".to_string());
        map.insert(Token::segment("b2", "s2"), "Au revoir".to_string());

        let translated = reconcile(&document, &map);

        assert_eq!(translated["b1"].text.as_deref(), Some("Bonjour"));
        let segments = translated["b2"].segments.as_ref().unwrap();
        assert_eq!(segments["s1"], "Salut");
        assert_eq!(segments["s2"], "Au revoir");
        assert!(translated["b2"].text.is_none());
    }

    #[test]
    fn test_reconcile_falls_back_to_original() {
        let document = sample();
        let mut map = TranslatableMap::new();
        map.insert(Token::segment("b2", "s2"), "Au revoir".to_string());

        let translated = reconcile(&document, &map);

        assert_eq!(translated["b1"].text.as_deref(), Some("Hello"));
        assert_eq!(translated["b2"].segments.as_ref().unwrap()["s1"], "Hi");
    }

    #[test]
    fn test_reconcile_does_not_mutate_input_and_keeps_extra_fields() {
        let mut document = sample();
        document["b1"]
            .extra
            .insert("tag".to_string(), serde_json::json!("p"));
        let before = document.clone();
        let mut map = TranslatableMap::new();
        map.insert(Token::block("b1"), "Bonjour".to_string());

        let translated = reconcile(&document, &map);

        assert_eq!(document, before);
        assert_eq!(translated["b1"].extra["tag"], "p");
        assert_eq!(translated.keys().collect::<Vec<_>>(), document.keys().collect::<Vec<_>>());
    }

    #[test]
    fn test_entries_for_absent_fields_are_ignored() {
        let document = sample();
        let mut map = TranslatableMap::new();
        // b2 has no block text; a stray entry must not invent one
        map.insert(Token::block("b2"), "ghost".to_string());

        let translated = reconcile(&document, &map);
        assert!(translated["b2"].text.is_none());
    }

    #[test]
    fn test_segment_export_last_write_wins() {
        let mut document = sample();
        document.insert("b3".to_string(), Block::with_segments([("s1", "Again")]));

        let export = segment_export(&document);

        assert_eq!(export.len(), 2);
        assert_eq!(export["s1"], "Again");
        assert_eq!(export["s2"], "Bye");
    }

    #[test]
    fn test_token_map_from_flat() {
        let mut flat = IndexMap::new();
        flat.insert("b2_s1".to_string(), "Salut".to_string());
        let map = token_map_from_flat(flat);
        assert_eq!(map[&Token::segment("b2", "s1")], "Salut");
    }
}
