//! Decode path: query results to records and objects.

use serde_json::Value as Json;

use graphlet_common::types::{Record, TYPE_PREDICATE, Uid, Value, ValueKind};
use graphlet_common::utils::error::{Error, Result, ValidationError};

use crate::object::Object;
use crate::schema::{ResolvedType, SchemaResolver};

/// Turns query results into records and typed objects.
pub struct ResultMapper<'a> {
    resolver: &'a SchemaResolver,
}

impl<'a> ResultMapper<'a> {
    /// Creates a mapper resolving nested types through `resolver`.
    #[must_use]
    pub fn new(resolver: &'a SchemaResolver) -> Self {
        Self { resolver }
    }

    /// Decodes the first entity of `block` as `T`, with its id.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] if the block is missing or empty, and
    /// decode errors for malformed entities.
    pub fn decode_one<T: Object>(&self, json: &Json, block: &str) -> Result<(Uid, T)> {
        let first = entities(json, block)?.first().ok_or(Error::NotFound)?;
        let resolved = self.resolver.resolve(T::descriptor())?;
        self.typed(first, &resolved)
    }

    /// Decodes every entity of `block` as `T`, in result order.
    ///
    /// A missing block decodes as empty.
    ///
    /// # Errors
    ///
    /// Returns decode errors for malformed entities.
    pub fn decode_many<T: Object>(&self, json: &Json, block: &str) -> Result<Vec<(Uid, T)>> {
        let resolved = self.resolver.resolve(T::descriptor())?;
        entities(json, block)?
            .iter()
            .map(|item| self.typed(item, &resolved))
            .collect()
    }

    fn typed<T: Object>(&self, json: &Json, resolved: &ResolvedType) -> Result<(Uid, T)> {
        let record = self.record(json, resolved)?;
        let uid = record
            .assigned_uid()
            .ok_or_else(|| Error::Serialization(format!("result entity without uid: {json}")))?;
        Ok((uid, T::decode(&record)?))
    }

    /// Decodes the first entity of `block` as an untyped record.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] if the block is missing or empty.
    pub fn raw_one(&self, json: &Json, block: &str) -> Result<Record> {
        let first = entities(json, block)?.first().ok_or(Error::NotFound)?;
        expect_object(first)?;
        Ok(Record::from_json_inferred(first))
    }

    /// Reads one entity as a record of `resolved`.
    ///
    /// Declared fields are read with their declared kind; nested objects
    /// and reverse edges are read recursively. Keys that match no field are
    /// ignored.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::ExpectedStruct`] if `json` is not an
    /// object, and serialization errors for values of the wrong shape.
    pub fn record(&self, json: &Json, resolved: &ResolvedType) -> Result<Record> {
        let map = expect_object(json)?;
        let mut record = Record::new();
        record.uid = map
            .get("uid")
            .and_then(Json::as_str)
            .and_then(|s| s.parse().ok());
        record.type_name = resolved.type_name.clone().or_else(|| {
            map.get(TYPE_PREDICATE)
                .and_then(Json::as_array)
                .and_then(|types| types.first())
                .and_then(Json::as_str)
                .map(str::to_string)
        });

        for field in &resolved.fields {
            let Some(raw) = map.get(&field.predicate).filter(|v| !v.is_null()) else {
                continue;
            };
            let value = match field.nested {
                Some(desc) => {
                    let nested = self.resolver.resolve(desc)?;
                    let inner = match raw {
                        Json::Array(items) => match items.first() {
                            Some(first) => first,
                            None => continue,
                        },
                        other => other,
                    };
                    Value::Object(Box::new(self.record(inner, &nested)?))
                }
                None if field.list => read_list(raw, field.kind)?,
                None => Value::from_json(raw, field.kind)?,
            };
            record.fields.insert(field.predicate.clone(), value);
        }

        for edge in &resolved.reverse {
            let Some(Json::Array(items)) = map.get(&edge.key) else {
                continue;
            };
            let target = self.resolver.resolve(edge.target)?;
            let objects = items
                .iter()
                .map(|item| Ok(Value::Object(Box::new(self.record(item, &target)?))))
                .collect::<Result<Vec<_>>>()?;
            record.fields.insert(edge.key.clone(), Value::List(objects));
        }
        Ok(record)
    }
}

/// Returns the entities of a named result block.
fn entities<'j>(json: &'j Json, block: &str) -> Result<&'j [Json]> {
    match json.get(block) {
        None | Some(Json::Null) => Ok(&[]),
        Some(Json::Array(items)) => Ok(items),
        Some(other) => Err(Error::Serialization(format!(
            "block {block} is not a list: {other}"
        ))),
    }
}

fn expect_object(json: &Json) -> Result<&serde_json::Map<String, Json>> {
    json.as_object().ok_or_else(|| {
        ValidationError::ExpectedStruct {
            found: json_kind(json).to_string(),
        }
        .into()
    })
}

fn json_kind(json: &Json) -> &'static str {
    match json {
        Json::Null => "null",
        Json::Bool(_) => "bool",
        Json::Number(_) => "number",
        Json::String(_) => "string",
        Json::Array(_) => "list",
        Json::Object(_) => "object",
    }
}

fn read_list(raw: &Json, kind: ValueKind) -> Result<Value> {
    let items = match raw {
        Json::Array(items) => items
            .iter()
            .map(|item| Value::from_json(item, kind))
            .collect::<Result<Vec<_>>>()?,
        single => vec![Value::from_json(single, kind)?],
    };
    Ok(Value::List(items))
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::graph_object;

    graph_object! {
        #[derive(Debug, Clone, Default, PartialEq)]
        struct Project {
            #[uid]
            uid: Uid,
            #[index(exact)]
            name: String,
            #[reverse(Branch, proj)]
            branches: Vec<Branch>,
        }
    }

    graph_object! {
        #[derive(Debug, Clone, Default, PartialEq)]
        struct Branch {
            #[uid]
            uid: Uid,
            #[index(exact)]
            name: String,
            tags: Vec<String>,
            proj: Option<Project>,
        }
    }

    #[test]
    fn test_decode_nested_and_lists() {
        let resolver = SchemaResolver::new();
        let result = json!({ "obj": [{
            "uid": "0x5",
            "dgraph.type": ["Branch"],
            "Branch.name": "main",
            "Branch.tags": ["a", "b"],
            "Branch.proj": { "uid": "0x2", "Project.name": "P", "dgraph.type": ["Project"] },
            "unknown": 1,
        }]});
        let (uid, branch): (Uid, Branch) =
            ResultMapper::new(&resolver).decode_one(&result, "obj").unwrap();
        assert_eq!(uid, Uid::new(5));
        assert_eq!(branch.uid, uid);
        assert_eq!(branch.tags, ["a", "b"]);
        let project = branch.proj.unwrap();
        assert_eq!(project.uid, Uid::new(2));
        assert_eq!(project.name, "P");
    }

    #[test]
    fn test_decode_reverse_edges() {
        let resolver = SchemaResolver::new();
        let result = json!({ "obj": [{
            "uid": "0x2",
            "Project.name": "P",
            "Project.branches": [
                { "uid": "0x3", "Branch.name": "main" },
                { "uid": "0x4", "Branch.name": "dev" },
            ],
        }]});
        let (_, project): (Uid, Project) =
            ResultMapper::new(&resolver).decode_one(&result, "obj").unwrap();
        let names: Vec<&str> = project.branches.iter().map(|b| b.name.as_str()).collect();
        assert_eq!(names, ["main", "dev"]);
        assert_eq!(project.branches[1].uid, Uid::new(4));
    }

    #[test]
    fn test_empty_block_is_not_found() {
        let resolver = SchemaResolver::new();
        let mapper = ResultMapper::new(&resolver);
        let err = mapper
            .decode_one::<Branch>(&json!({ "obj": [] }), "obj")
            .unwrap_err();
        assert!(err.is_not_found());
        assert!(mapper.raw_one(&json!({}), "obj").unwrap_err().is_not_found());
        assert!(
            mapper
                .decode_many::<Branch>(&json!({}), "objs")
                .unwrap()
                .is_empty()
        );
    }

    #[test]
    fn test_non_object_entity() {
        let resolver = SchemaResolver::new();
        let err = ResultMapper::new(&resolver)
            .decode_one::<Branch>(&json!({ "obj": ["x"] }), "obj")
            .unwrap_err();
        assert_eq!(err.to_string(), "expected struct, got string");
    }

    #[test]
    fn test_raw_record_infers_kinds() {
        let resolver = SchemaResolver::new();
        let result = json!({ "obj": [{ "uid": "0x9", "email": "a@b.c", "age": 30 }] });
        let record = ResultMapper::new(&resolver).raw_one(&result, "obj").unwrap();
        assert_eq!(record.uid, Some(Uid::new(9)));
        assert_eq!(record.get("age"), Some(&Value::Int(30)));
        assert_eq!(record.get("email"), Some(&Value::from("a@b.c")));
    }
}
