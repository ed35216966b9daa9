// Structured-object (JSON) reader
//
// Accepts either `{"items": [ {...}, ... ]}` or a bare `[ {...}, ... ]`.
// Headers come from the first item only; later items may carry extra keys
// that stay in their rows but never become columns.

use crate::error::{Error, Result};
use crate::parser::entry::{ContentEntry, Row};
use serde_json::{Map, Value};
use std::path::Path;

/// Key holding the item sequence when the root is an object
pub const ITEMS_KEY: &str = "items";

/// Parser for JSON documents
pub struct StructuredParser;

impl StructuredParser {
    /// Parse the file at `path`
    pub fn parse_file(&self, path: &Path, content_type: &str) -> Result<ContentEntry> {
        let text = std::fs::read_to_string(path).map_err(|e| Error::SourceRead {
            path: path.to_path_buf(),
            source: e,
        })?;
        self.parse_str(&text, path, content_type)
    }

    /// Parse a JSON document; `path` names the source in the entry
    pub fn parse_str(&self, text: &str, path: &Path, content_type: &str) -> Result<ContentEntry> {
        let root: Value =
            serde_json::from_str(text).map_err(|e| Error::malformed(path, e.to_string()))?;

        let items = collection(&root).unwrap_or(&[]);

        let headers = match items.first() {
            Some(Value::Object(first)) => first.keys().cloned().collect(),
            _ => Vec::new(),
        };

        let rows = items
            .iter()
            .filter_map(Value::as_object)
            .map(row_from_object)
            .collect();

        Ok(ContentEntry::new(path.to_path_buf(), content_type, headers, rows).with_raw(root))
    }
}

/// Locate the item sequence in the document
fn collection(root: &Value) -> Option<&[Value]> {
    match root {
        Value::Array(items) => Some(items),
        Value::Object(map) => match map.get(ITEMS_KEY) {
            Some(Value::Array(items)) => Some(items),
            _ => None,
        },
        _ => None,
    }
}

fn row_from_object(object: &Map<String, Value>) -> Row {
    object
        .iter()
        .map(|(key, value)| (key.clone(), text_of(value)))
        .collect()
}

/// Default textual form of a value.
///
/// Nested sequences and objects become compact JSON so option lists stay
/// machine-readable for `parse_options`.
pub fn text_of(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        Value::String(s) => s.clone(),
        Value::Array(_) | Value::Object(_) => value.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn parse(text: &str) -> Result<ContentEntry> {
        StructuredParser.parse_str(text, Path::new("data/grammar/g1.json"), "grammar")
    }

    #[test]
    fn test_items_object() {
        let entry = parse(
            r#"{"items": [
                {"question": "Q1", "answer": "A"},
                {"question": "Q2", "answer": "B"}
            ]}"#,
        )
        .unwrap();

        assert_eq!(entry.headers(), ["question", "answer"]);
        assert_eq!(entry.rows().len(), 2);
        assert_eq!(entry.rows()[1]["answer"], "B");
        assert_eq!(entry.id(), "g1");
        assert!(entry.raw().is_some());
    }

    #[test]
    fn test_bare_array() {
        let entry = parse(r#"[{"word": "本"}, {"word": "水"}]"#).unwrap();
        assert_eq!(entry.headers(), ["word"]);
        assert_eq!(entry.rows().len(), 2);
    }

    #[test]
    fn test_headers_come_from_first_item_only() {
        let entry = parse(r#"[{"a": 1, "b": 2}, {"a": 3, "b": 4, "c": 5}]"#).unwrap();

        assert_eq!(entry.headers(), ["a", "b"]);
        // the extra key survives in its own row
        assert_eq!(entry.rows()[1]["c"], "5");
    }

    #[test]
    fn test_header_order_follows_document() {
        let entry = parse(r#"[{"zeta": "z", "alpha": "a", "mid": "m"}]"#).unwrap();
        assert_eq!(entry.headers(), ["zeta", "alpha", "mid"]);
    }

    #[test]
    fn test_scalars_become_text() {
        let entry = parse(
            r#"[{"n": 3, "f": 1.5, "t": true, "z": null, "s": "x", "o": ["a", "b"]}]"#,
        )
        .unwrap();

        let row = &entry.rows()[0];
        assert_eq!(row["n"], "3");
        assert_eq!(row["f"], "1.5");
        assert_eq!(row["t"], "true");
        assert_eq!(row["z"], "");
        assert_eq!(row["s"], "x");
        assert_eq!(row["o"], r#"["a","b"]"#);
    }

    #[test]
    fn test_non_object_items_are_skipped() {
        let entry = parse(r#"{"items": [{"a": "1"}, 42, "text", {"a": "2"}]}"#).unwrap();
        assert_eq!(entry.rows().len(), 2);
        assert_eq!(entry.rows()[1]["a"], "2");
    }

    #[test]
    fn test_non_object_first_item_gives_no_headers() {
        let entry = parse(r#"["loose", {"a": "1"}]"#).unwrap();
        assert!(entry.headers().is_empty());
        assert_eq!(entry.rows().len(), 1);
    }

    #[test]
    fn test_object_without_items_has_no_rows() {
        let entry = parse(r#"{"title": "Lesson 1"}"#).unwrap();
        assert!(entry.is_empty());
        assert_eq!(entry.raw(), Some(&json!({"title": "Lesson 1"})));
    }

    #[test]
    fn test_syntax_error_is_malformed() {
        let result = parse(r#"{"items": [ {"a": 1}, ]"#);
        assert!(matches!(result, Err(Error::MalformedInput { .. })));
    }

    #[test]
    fn test_text_of_nested_object() {
        assert_eq!(text_of(&json!({"k": 1})), r#"{"k":1}"#);
    }
}
