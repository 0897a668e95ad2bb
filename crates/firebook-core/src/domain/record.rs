use serde::Serialize;
use serde_json::{Map, Value};

/// A schemaless resource record: field name to JSON value.
pub type Record = Map<String, Value>;

/// Every record carries its identifier under this field.
pub const ID_FIELD: &str = "id";

/// Canonical string form of an identifier value.
///
/// Ids may be stored as JSON strings or numbers, so `"7"` and `7` both
/// resolve to the key `"7"`. Other JSON types are not valid ids.
pub fn id_key(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Generate an id for a record created without one.
pub fn new_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

/// Serialize a typed entity into a record.
pub fn to_record<T: Serialize>(entity: &T) -> Result<Record, serde_json::Error> {
    match serde_json::to_value(entity)? {
        Value::Object(map) => Ok(map),
        other => Err(serde::ser::Error::custom(format!(
            "expected an object, got {other}"
        ))),
    }
}

/// Lookup helpers on records.
pub trait RecordExt {
    /// The record's id in canonical string form.
    fn id_key(&self) -> Option<String>;

    /// A field's value in canonical id form, e.g. a foreign key.
    fn key_of(&self, field: &str) -> Option<String>;

    /// Whether the field's canonical form equals `expected`.
    fn field_matches(&self, field: &str, expected: &str) -> bool;
}

impl RecordExt for Record {
    fn id_key(&self) -> Option<String> {
        self.key_of(ID_FIELD)
    }

    fn key_of(&self, field: &str) -> Option<String> {
        self.get(field).and_then(id_key)
    }

    fn field_matches(&self, field: &str, expected: &str) -> bool {
        match self.get(field) {
            Some(Value::String(s)) => s == expected,
            Some(Value::Bool(b)) => b.to_string() == expected,
            Some(Value::Null) => expected == "null",
            Some(Value::Number(n)) => n.to_string() == expected,
            _ => false,
        }
    }
}
