//! Document bodies and field-level updates.
//!
//! Documents are JSON objects. Field paths address nested values with dots,
//! so `completions.7` is the key `"7"` inside the `completions` object.

use exn::{OptionExt, ResultExt};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

use crate::error::{ErrorKind, Result};
use crate::path::DocPath;

/// A stored document body.
pub type Document = Map<String, Value>;

/// Field-path assignments applied by [`update`](crate::DocumentStore::update).
pub type FieldUpdates = Vec<(String, Value)>;

/// A document as returned from a read or query.
#[derive(Debug, Clone, PartialEq)]
pub struct DocumentSnapshot {
    pub path: DocPath,
    pub data: Document,
}
impl DocumentSnapshot {
    pub fn new(path: DocPath, data: Document) -> Self {
        Self { path, data }
    }

    pub fn id(&self) -> &str {
        self.path.id()
    }

    /// Decode the body into a typed record.
    pub fn decode<T: DeserializeOwned>(&self) -> Result<T> {
        from_document(self.data.clone())
    }
}

/// Encode a typed record as a document body.
pub fn to_document<T: Serialize>(value: &T) -> Result<Document> {
    match serde_json::to_value(value).or_raise(|| ErrorKind::InvalidData("not serializable"))? {
        Value::Object(map) => Ok(map),
        _ => exn::bail!(ErrorKind::InvalidData("document must be an object")),
    }
}

/// Decode a document body into a typed record.
pub fn from_document<T: DeserializeOwned>(document: Document) -> Result<T> {
    serde_json::from_value(Value::Object(document)).or_raise(|| ErrorKind::InvalidData("unexpected document shape"))
}

/// Read a possibly nested field.
pub fn get_field<'a>(document: &'a Document, field: &str) -> Option<&'a Value> {
    let mut parts = field.split('.');
    let mut current = document.get(parts.next()?)?;
    for part in parts {
        current = current.as_object()?.get(part)?;
    }
    Some(current)
}

/// Assign a possibly nested field.
///
/// Missing intermediate objects are created; an intermediate that exists but
/// is not an object is replaced by one.
pub fn set_field(document: &mut Document, field: &str, value: Value) -> Result<()> {
    let mut parts: Vec<&str> = field.split('.').collect();
    if parts.iter().any(|part| part.is_empty()) {
        exn::bail!(ErrorKind::InvalidData("empty field path segment"));
    }
    let Some(last) = parts.pop() else {
        exn::bail!(ErrorKind::InvalidData("empty field path"));
    };
    let mut current = document;
    for part in parts {
        let slot = current.entry(part).or_insert_with(|| Value::Object(Map::new()));
        if !slot.is_object() {
            *slot = Value::Object(Map::new());
        }
        current = slot.as_object_mut().ok_or_raise(|| ErrorKind::InvalidData("field path parent"))?;
    }
    current.insert(last.to_string(), value);
    Ok(())
}

/// Apply every assignment in order.
pub fn apply_updates(document: &mut Document, updates: &FieldUpdates) -> Result<()> {
    for (field, value) in updates {
        set_field(document, field, value.clone())?;
    }
    Ok(())
}
