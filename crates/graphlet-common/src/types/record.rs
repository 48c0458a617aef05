//! Dynamically shaped entity records.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use super::{TYPE_PREDICATE, Uid, Value};

/// An entity as an ordered map of field name to value.
///
/// Records are the intermediate form between typed application objects and
/// graph triples. Field order follows declaration order so encoded
/// mutations and decoded results are deterministic.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Record {
    /// Entity id, if already assigned.
    pub uid: Option<Uid>,
    /// Type name, if the record belongs to a declared type.
    pub type_name: Option<String>,
    /// Field values in declaration order.
    pub fields: IndexMap<String, Value>,
}

impl Record {
    /// Creates an empty untyped record.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an empty record of the given type.
    #[must_use]
    pub fn typed(type_name: impl Into<String>) -> Self {
        Self {
            type_name: Some(type_name.into()),
            ..Self::default()
        }
    }

    /// Sets the entity id.
    #[must_use]
    pub fn with_uid(mut self, uid: Uid) -> Self {
        self.uid = Some(uid);
        self
    }

    /// Adds a field.
    #[must_use]
    pub fn with_field(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.fields.insert(name.into(), value.into());
        self
    }

    /// Sets a field, replacing any previous value.
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        self.fields.insert(name.into(), value.into());
    }

    /// Gets a field value.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.fields.get(name)
    }

    /// Returns the assigned entity id, if any.
    #[must_use]
    pub fn assigned_uid(&self) -> Option<Uid> {
        self.uid.filter(Uid::is_assigned)
    }

    /// Returns true if the record has no id and no non-empty field.
    #[must_use]
    pub fn is_blank(&self) -> bool {
        self.assigned_uid().is_none() && self.fields.values().all(Value::is_empty)
    }

    /// Renders the record as a JSON object.
    #[must_use]
    pub fn to_json(&self) -> serde_json::Value {
        let mut map = serde_json::Map::new();
        if let Some(uid) = self.uid {
            map.insert("uid".to_string(), serde_json::Value::String(uid.to_string()));
        }
        if let Some(type_name) = &self.type_name {
            map.insert(
                TYPE_PREDICATE.to_string(),
                serde_json::json!([type_name.as_str()]),
            );
        }
        for (name, value) in &self.fields {
            map.insert(name.clone(), value.to_json());
        }
        serde_json::Value::Object(map)
    }

    /// Builds a record from a JSON object, inferring value kinds.
    ///
    /// The `uid` key becomes the entity id and the first `dgraph.type` entry
    /// becomes the type name. Non-object input yields an empty record.
    #[must_use]
    pub fn from_json_inferred(json: &serde_json::Value) -> Self {
        let mut record = Self::new();
        let Some(map) = json.as_object() else {
            return record;
        };
        for (key, value) in map {
            match key.as_str() {
                "uid" => record.uid = value.as_str().and_then(|s| s.parse().ok()),
                TYPE_PREDICATE => {
                    record.type_name = value
                        .as_array()
                        .and_then(|types| types.first())
                        .and_then(|t| t.as_str())
                        .map(str::to_string);
                }
                _ => {
                    record
                        .fields
                        .insert(key.clone(), Value::infer_from_json(value));
                }
            }
        }
        record
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blank_record() {
        assert!(Record::new().is_blank());
        assert!(Record::new().with_field("name", "").is_blank());
        assert!(!Record::new().with_field("name", "x").is_blank());
        assert!(!Record::new().with_uid(Uid::new(5)).is_blank());
    }

    #[test]
    fn test_json_shape() {
        let record = Record::typed("User")
            .with_uid(Uid::new(2))
            .with_field("User.name", "A");
        let json = record.to_json();
        assert_eq!(json["uid"], "0x2");
        assert_eq!(json["dgraph.type"][0], "User");
        assert_eq!(json["User.name"], "A");
    }

    #[test]
    fn test_from_json_inferred() {
        let json = serde_json::json!({
            "uid": "0x7",
            "dgraph.type": ["Doc"],
            "Doc.n": 4,
        });
        let record = Record::from_json_inferred(&json);
        assert_eq!(record.uid, Some(Uid::new(7)));
        assert_eq!(record.type_name.as_deref(), Some("Doc"));
        assert_eq!(record.get("Doc.n"), Some(&Value::Int(4)));
    }
}
