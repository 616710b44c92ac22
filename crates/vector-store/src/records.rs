//! Field lookup on loosely shaped chunk records.
//!
//! Chunk files are read as plain JSON so producers that name the text field
//! `content`, `body` or `text` instead of `code` still embed.

use serde_json::Value;
use sha1::{Digest, Sha1};

const TEXT_KEYS: &[&str] = &["code", "content", "body", "text"];
const PATH_KEYS: &[&str] = &["file_path", "path", "filepath"];

/// Metadata fields copied from a chunk into its embedding record
pub const METADATA_KEYS: &[&str] = &["language", "type", "name", "imports", "loc", "size"];

fn first_string<'a>(record: &'a Value, keys: &[&str]) -> Option<&'a str> {
    keys.iter()
        .filter_map(|key| record.get(*key).and_then(Value::as_str))
        .find(|value| !value.is_empty())
}

/// Text to embed, trimmed; empty when no text field is set
pub fn chunk_text(record: &Value) -> &str {
    first_string(record, TEXT_KEYS).unwrap_or_default().trim()
}

pub fn chunk_path(record: &Value) -> &str {
    first_string(record, PATH_KEYS).unwrap_or_default()
}

/// Record id, or the sha1 hex of its path when it has none
pub fn chunk_id(record: &Value) -> String {
    match first_string(record, &["id"]) {
        Some(id) => id.to_string(),
        None => hex::encode(Sha1::digest(chunk_path(record).as_bytes())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn text_falls_back_across_keys() {
        assert_eq!(chunk_text(&json!({"code": "  x = 1\n"})), "x = 1");
        assert_eq!(chunk_text(&json!({"code": "", "content": "body"})), "body");
        assert_eq!(chunk_text(&json!({"body": "b", "text": "t"})), "b");
        assert_eq!(chunk_text(&json!({"text": "t"})), "t");
        assert_eq!(chunk_text(&json!({"code": null})), "");
        assert_eq!(chunk_text(&json!({})), "");
    }

    #[test]
    fn path_falls_back_across_keys() {
        assert_eq!(chunk_path(&json!({"file_path": "a.py", "path": "b"})), "a.py");
        assert_eq!(chunk_path(&json!({"filepath": "c.py"})), "c.py");
        assert_eq!(chunk_path(&json!({})), "");
    }

    #[test]
    fn id_prefers_record_id() {
        assert_eq!(chunk_id(&json!({"id": "abc", "file_path": "a.py"})), "abc");
        assert_eq!(
            chunk_id(&json!({"file_path": "a.py"})),
            hex::encode(Sha1::digest(b"a.py"))
        );
    }
}
