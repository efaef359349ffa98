//! ABI document loading.
//!
//! A document is a JSON array of entries. Entries are decoded one at a time:
//! an element that does not match the model is recorded as an
//! [`EntryIssue`] and skipped while the rest of the document loads.

use crate::model::{AbiEntry, FunctionDef};
use nucleus_core::{Error, Result};
use serde::Serialize;
use serde_json::Value;
use std::path::Path;

/// An ABI element that could not be decoded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EntryIssue {
    /// Position of the element in the document.
    pub index: usize,
    /// Value of the element's `name` key, when present.
    pub name: Option<String>,
    /// Decoding error.
    pub message: String,
}

/// A decoded ABI document.
///
/// # Examples
///
/// ```
/// use nucleus_abi::AbiDocument;
///
/// let doc = AbiDocument::from_json(r#"[
///     {"type": "type_alias", "name": "Balance", "target": {"kind": "path", "path": ["u128"]}},
///     {"type": "mystery", "name": "Broken"}
/// ]"#).unwrap();
///
/// assert_eq!(doc.entries.len(), 1);
/// assert_eq!(doc.issues.len(), 1);
/// assert_eq!(doc.issues[0].name.as_deref(), Some("Broken"));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct AbiDocument {
    /// Successfully decoded entries in document order.
    pub entries: Vec<AbiEntry>,
    /// Elements that were skipped.
    pub issues: Vec<EntryIssue>,
}

impl AbiDocument {
    /// Builds a document from already decoded entries.
    #[must_use]
    pub const fn from_entries(entries: Vec<AbiEntry>) -> Self {
        Self {
            entries,
            issues: Vec::new(),
        }
    }

    /// Parses a document from JSON text.
    ///
    /// # Errors
    ///
    /// Returns [`Error::SerializationError`] if the text is not JSON or the
    /// top level is neither an array nor an object with an `abi` array.
    pub fn from_json(text: &str) -> Result<Self> {
        let value: Value = serde_json::from_str(text).map_err(|e| Error::SerializationError {
            message: "ABI document is not valid JSON".to_string(),
            source: Some(e),
        })?;
        Self::from_value(value)
    }

    /// Decodes a document from a JSON value.
    ///
    /// # Errors
    ///
    /// Returns [`Error::SerializationError`] if the value is neither an array
    /// nor an object with an `abi` array.
    pub fn from_value(value: Value) -> Result<Self> {
        let elements = match value {
            Value::Array(elements) => elements,
            Value::Object(mut map) => match map.remove("abi") {
                Some(Value::Array(elements)) => elements,
                _ => {
                    return Err(Error::SerializationError {
                        message: "ABI object has no 'abi' array".to_string(),
                        source: None,
                    });
                }
            },
            other => {
                return Err(Error::SerializationError {
                    message: format!("ABI document must be an array, found {}", json_kind(&other)),
                    source: None,
                });
            }
        };

        Ok(Self::from_elements(elements))
    }

    /// Decodes each element independently.
    #[must_use]
    pub fn from_elements(elements: Vec<Value>) -> Self {
        let mut document = Self::default();

        for (index, element) in elements.into_iter().enumerate() {
            let name = element
                .get("name")
                .and_then(Value::as_str)
                .map(ToString::to_string);

            match serde_json::from_value::<AbiEntry>(element) {
                Ok(entry) => {
                    tracing::debug!(index, name = entry.name(), kind = entry.kind(), "decoded ABI entry");
                    document.entries.push(entry);
                }
                Err(e) => {
                    tracing::warn!(index, name = ?name, error = %e, "skipping malformed ABI entry");
                    document.issues.push(EntryIssue {
                        index,
                        name,
                        message: e.to_string(),
                    });
                }
            }
        }

        document
    }

    /// Reads and parses a document from a file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|source| Error::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_json(&text)
    }

    /// Looks up an entry by name; the first match wins.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&AbiEntry> {
        self.entries.iter().find(|entry| entry.name() == name)
    }

    /// Iterates over the function entries.
    pub fn functions(&self) -> impl Iterator<Item = &FunctionDef> {
        self.entries.iter().filter_map(|entry| match entry {
            AbiEntry::Function(def) => Some(def),
            _ => None,
        })
    }

    /// Number of decoded entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if no entry was decoded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

const fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::io::Write;

    #[test]
    fn test_rejects_scalar_document() {
        let err = AbiDocument::from_json("42").unwrap_err();
        assert!(err.to_string().contains("a number"));
    }

    #[test]
    fn test_accepts_wrapped_document() {
        let doc = AbiDocument::from_value(json!({
            "abi": [{"type": "struct", "name": "Unit"}]
        }))
        .unwrap();
        assert_eq!(doc.len(), 1);
        assert!(doc.get("Unit").is_some());
    }

    #[test]
    fn test_malformed_entry_does_not_abort_load() {
        let doc = AbiDocument::from_elements(vec![
            json!({"type": "struct", "name": "A", "fields": []}),
            json!({"type": "fn", "name": "f"}),
            json!({"type": "struct", "name": "B", "fields": []}),
        ]);
        assert_eq!(doc.len(), 2);
        assert_eq!(doc.issues.len(), 1);
        assert_eq!(doc.issues[0].index, 1);
        assert!(doc.issues[0].message.contains("method"));
    }

    #[test]
    fn test_functions_iterator() {
        let doc = AbiDocument::from_elements(vec![
            json!({"type": "fn", "name": "init", "method": "init"}),
            json!({"type": "struct", "name": "S"}),
            json!({"type": "fn", "name": "get_s", "method": "get"}),
        ]);
        let names: Vec<_> = doc.functions().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec!["init", "get_s"]);
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"[{{"type": "type_alias", "name": "Id", "target": {{"kind": "path", "path": ["u64"]}}}}]"#
        )
        .unwrap();
        let doc = AbiDocument::load(file.path()).unwrap();
        assert!(!doc.is_empty());
    }
}
