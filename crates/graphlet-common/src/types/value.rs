//! Property values and their scalar kinds.
//!
//! [`Value`] is the tagged-variant representation used everywhere a field
//! crosses a layer boundary: encoded objects, stored postings, query literals
//! and decoded results.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;

use super::{Record, Uid};
use crate::utils::error::{Error, Result, ValidationError};

/// A geographic point in longitude/latitude order.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Point {
    /// Longitude in degrees.
    pub lon: f64,
    /// Latitude in degrees.
    pub lat: f64,
}

impl Point {
    /// Creates a new point.
    #[must_use]
    pub const fn new(lon: f64, lat: f64) -> Self {
        Self { lon, lat }
    }

    /// Renders the point as a GeoJSON geometry.
    #[must_use]
    pub fn to_geojson(&self) -> serde_json::Value {
        serde_json::json!({ "type": "Point", "coordinates": [self.lon, self.lat] })
    }

    /// Parses a GeoJSON point geometry.
    #[must_use]
    pub fn from_geojson(json: &serde_json::Value) -> Option<Self> {
        let obj = json.as_object()?;
        if obj.get("type")?.as_str()? != "Point" {
            return None;
        }
        let coords = obj.get("coordinates")?.as_array()?;
        match coords.as_slice() {
            [lon, lat] => Some(Self::new(lon.as_f64()?, lat.as_f64()?)),
            _ => None,
        }
    }
}

/// Scalar kind of a predicate, as declared in the schema.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum ValueKind {
    /// Untyped; values are kept as given.
    #[default]
    Default,
    /// UTF-8 string.
    String,
    /// 64-bit signed integer.
    Int,
    /// 64-bit float.
    Float,
    /// Boolean.
    Bool,
    /// Raw bytes.
    Binary,
    /// UTC timestamp.
    DateTime,
    /// Geographic point.
    Geo,
    /// 32-bit float vector.
    Vector,
    /// Reference to another entity.
    Uid,
}

impl ValueKind {
    /// Returns the schema-language name of this kind.
    #[must_use]
    pub const fn schema_name(&self) -> &'static str {
        match self {
            Self::Default => "default",
            Self::String => "string",
            Self::Int => "int",
            Self::Float => "float",
            Self::Bool => "bool",
            Self::Binary => "binary",
            Self::DateTime => "datetime",
            Self::Geo => "geo",
            Self::Vector => "float32vector",
            Self::Uid => "uid",
        }
    }

    /// Parses a schema-language type name.
    #[must_use]
    pub fn from_schema_name(name: &str) -> Option<Self> {
        Some(match name {
            "default" => Self::Default,
            "string" | "password" => Self::String,
            "int" => Self::Int,
            "float" => Self::Float,
            "bool" => Self::Bool,
            "binary" => Self::Binary,
            "datetime" => Self::DateTime,
            "geo" => Self::Geo,
            "float32vector" => Self::Vector,
            "uid" => Self::Uid,
            _ => return None,
        })
    }

    /// Determines the kind of a value.
    ///
    /// Lists take the kind of their elements, which must all agree. Nested
    /// objects are references and report [`ValueKind::Uid`].
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::UnsupportedType`] for nulls, empty lists,
    /// and lists of mixed kinds.
    pub fn of(value: &Value) -> Result<Self> {
        Ok(match value {
            Value::Null => {
                return Err(ValidationError::UnsupportedType("null".to_string()).into());
            }
            Value::Bool(_) => Self::Bool,
            Value::Int(_) => Self::Int,
            Value::Float(_) => Self::Float,
            Value::String(_) => Self::String,
            Value::Bytes(_) => Self::Binary,
            Value::DateTime(_) => Self::DateTime,
            Value::Geo(_) => Self::Geo,
            Value::Vector(_) => Self::Vector,
            Value::Uid(_) | Value::Object(_) => Self::Uid,
            Value::List(items) => {
                let mut kinds = items.iter().map(Self::of);
                let first = kinds.next().ok_or_else(|| {
                    Error::from(ValidationError::UnsupportedType("empty list".to_string()))
                })??;
                for kind in kinds {
                    if kind? != first {
                        return Err(ValidationError::UnsupportedType(
                            "list with mixed element types".to_string(),
                        )
                        .into());
                    }
                }
                first
            }
        })
    }
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.schema_name())
    }
}

/// A dynamically typed property value.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub enum Value {
    /// Absent value.
    #[default]
    Null,
    /// Boolean.
    Bool(bool),
    /// Integer.
    Int(i64),
    /// Float.
    Float(f64),
    /// String.
    String(String),
    /// Raw bytes.
    Bytes(Vec<u8>),
    /// UTC timestamp.
    DateTime(DateTime<Utc>),
    /// Geographic point.
    Geo(Point),
    /// Float vector.
    Vector(Vec<f32>),
    /// Reference to another entity by id.
    Uid(Uid),
    /// A nested entity, used on the mapping paths.
    Object(Box<Record>),
    /// A list of values of one kind.
    List(Vec<Value>),
}

impl Value {
    /// Returns true if this is [`Value::Null`].
    #[must_use]
    pub const fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Returns true for values that carry no information: null, empty
    /// strings, empty lists, and blank nested objects.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        match self {
            Self::Null => true,
            Self::String(s) => s.is_empty(),
            Self::List(items) => items.is_empty(),
            Self::Object(record) => record.is_blank(),
            _ => false,
        }
    }

    /// Returns the string slice, if this is a string.
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    /// Returns the integer, if this is an int.
    #[must_use]
    pub const fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Int(v) => Some(*v),
            _ => None,
        }
    }

    /// Returns the entity id, if this is a reference.
    #[must_use]
    pub const fn as_uid(&self) -> Option<Uid> {
        match self {
            Self::Uid(uid) => Some(*uid),
            _ => None,
        }
    }

    /// Converts this value to `kind`, parsing strings where needed.
    ///
    /// Used to coerce query literals and untyped writes to a predicate's
    /// declared type.
    ///
    /// # Errors
    ///
    /// Returns a validation error when the value cannot be represented as
    /// `kind`.
    pub fn convert(&self, kind: ValueKind) -> Result<Value> {
        let fail = || {
            Error::from(ValidationError::UnsupportedType(format!(
                "cannot convert {} to {}",
                self.type_name(),
                kind
            )))
        };
        let converted = match (kind, self) {
            (ValueKind::Default, v) => v.clone(),
            (_, Value::List(items)) => Value::List(
                items
                    .iter()
                    .map(|item| item.convert(kind))
                    .collect::<Result<_>>()?,
            ),
            (ValueKind::String, Value::String(_)) => self.clone(),
            (ValueKind::String, Value::Int(v)) => Value::String(v.to_string()),
            (ValueKind::String, Value::Float(v)) => Value::String(v.to_string()),
            (ValueKind::String, Value::Bool(v)) => Value::String(v.to_string()),
            (ValueKind::Int, Value::Int(_)) => self.clone(),
            (ValueKind::Int, Value::Float(v)) if v.fract() == 0.0 => Value::Int(*v as i64),
            (ValueKind::Int, Value::String(s)) => {
                Value::Int(s.trim().parse().map_err(|_| fail())?)
            }
            (ValueKind::Float, Value::Float(_)) => self.clone(),
            (ValueKind::Float, Value::Int(v)) => Value::Float(*v as f64),
            (ValueKind::Float, Value::String(s)) => {
                Value::Float(s.trim().parse().map_err(|_| fail())?)
            }
            (ValueKind::Bool, Value::Bool(_)) => self.clone(),
            (ValueKind::Bool, Value::String(s)) => {
                Value::Bool(s.trim().parse().map_err(|_| fail())?)
            }
            (ValueKind::Binary, Value::Bytes(_)) => self.clone(),
            (ValueKind::Binary, Value::String(s)) => Value::Bytes(s.as_bytes().to_vec()),
            (ValueKind::DateTime, Value::DateTime(_)) => self.clone(),
            (ValueKind::DateTime, Value::String(s)) => Value::DateTime(
                DateTime::parse_from_rfc3339(s.trim())
                    .map_err(|_| fail())?
                    .with_timezone(&Utc),
            ),
            (ValueKind::Geo, Value::Geo(_)) => self.clone(),
            (ValueKind::Vector, Value::Vector(_)) => self.clone(),
            (ValueKind::Vector, Value::String(s)) => Value::Vector(parse_vector(s).ok_or_else(fail)?),
            (ValueKind::Uid, Value::Uid(_)) => self.clone(),
            (ValueKind::Uid, Value::String(s)) => Value::Uid(s.parse().map_err(|_| fail())?),
            _ => return Err(fail()),
        };
        Ok(converted)
    }

    /// Compares two values of the same scalar kind.
    ///
    /// Returns `None` for values of different kinds or kinds without an
    /// order (geo, vectors, lists, objects).
    #[must_use]
    pub fn compare(&self, other: &Value) -> Option<Ordering> {
        match (self, other) {
            (Self::Bool(a), Self::Bool(b)) => Some(a.cmp(b)),
            (Self::Int(a), Self::Int(b)) => Some(a.cmp(b)),
            (Self::Float(a), Self::Float(b)) => a.partial_cmp(b),
            (Self::Int(a), Self::Float(b)) => (*a as f64).partial_cmp(b),
            (Self::Float(a), Self::Int(b)) => a.partial_cmp(&(*b as f64)),
            (Self::String(a), Self::String(b)) => Some(a.cmp(b)),
            (Self::Bytes(a), Self::Bytes(b)) => Some(a.cmp(b)),
            (Self::DateTime(a), Self::DateTime(b)) => Some(a.cmp(b)),
            (Self::Uid(a), Self::Uid(b)) => Some(a.cmp(b)),
            _ => None,
        }
    }

    /// Returns a short name for the variant, used in error messages.
    #[must_use]
    pub const fn type_name(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Bool(_) => "bool",
            Self::Int(_) => "int",
            Self::Float(_) => "float",
            Self::String(_) => "string",
            Self::Bytes(_) => "bytes",
            Self::DateTime(_) => "datetime",
            Self::Geo(_) => "geo",
            Self::Vector(_) => "vector",
            Self::Uid(_) => "uid",
            Self::Object(_) => "object",
            Self::List(_) => "list",
        }
    }

    /// Renders the value as JSON the way query results carry it.
    ///
    /// Entity ids become `{"uid": "0x.."}` objects, datetimes RFC 3339
    /// strings, points GeoJSON, and bytes integer arrays.
    #[must_use]
    pub fn to_json(&self) -> serde_json::Value {
        use serde_json::Value as Json;
        match self {
            Self::Null => Json::Null,
            Self::Bool(v) => Json::Bool(*v),
            Self::Int(v) => Json::from(*v),
            Self::Float(v) => Json::from(*v),
            Self::String(s) => Json::String(s.clone()),
            Self::Bytes(bytes) => Json::Array(bytes.iter().map(|b| Json::from(*b)).collect()),
            Self::DateTime(dt) => Json::String(dt.to_rfc3339_opts(SecondsFormat::AutoSi, true)),
            Self::Geo(point) => point.to_geojson(),
            Self::Vector(v) => Json::Array(v.iter().map(|f| Json::from(f64::from(*f))).collect()),
            Self::Uid(uid) => serde_json::json!({ "uid": uid.to_string() }),
            Self::Object(record) => record.to_json(),
            Self::List(items) => Json::Array(items.iter().map(Self::to_json).collect()),
        }
    }

    /// Reads a JSON value as `kind`.
    ///
    /// Returns `Ok(Value::Null)` for JSON `null`.
    ///
    /// # Errors
    ///
    /// Returns a serialization error when the JSON shape does not match the
    /// requested kind.
    pub fn from_json(json: &serde_json::Value, kind: ValueKind) -> Result<Value> {
        use serde_json::Value as Json;
        let mismatch = || Error::Serialization(format!("cannot read {json} as {kind}"));
        if json.is_null() {
            return Ok(Value::Null);
        }
        Ok(match kind {
            ValueKind::Default => Self::infer_from_json(json),
            ValueKind::String => Value::String(json.as_str().ok_or_else(mismatch)?.to_string()),
            ValueKind::Int => Value::Int(json.as_i64().ok_or_else(mismatch)?),
            ValueKind::Float => Value::Float(json.as_f64().ok_or_else(mismatch)?),
            ValueKind::Bool => Value::Bool(json.as_bool().ok_or_else(mismatch)?),
            ValueKind::Binary => match json {
                Json::Array(items) => Value::Bytes(
                    items
                        .iter()
                        .map(|b| b.as_u64().and_then(|b| u8::try_from(b).ok()))
                        .collect::<Option<_>>()
                        .ok_or_else(mismatch)?,
                ),
                Json::String(s) => Value::Bytes(s.as_bytes().to_vec()),
                _ => return Err(mismatch()),
            },
            ValueKind::DateTime => Value::DateTime(
                DateTime::parse_from_rfc3339(json.as_str().ok_or_else(mismatch)?)
                    .map_err(|_| mismatch())?
                    .with_timezone(&Utc),
            ),
            ValueKind::Geo => Value::Geo(Point::from_geojson(json).ok_or_else(mismatch)?),
            ValueKind::Vector => Value::Vector(
                json.as_array()
                    .ok_or_else(mismatch)?
                    .iter()
                    .map(|f| f.as_f64().map(|f| f as f32))
                    .collect::<Option<_>>()
                    .ok_or_else(mismatch)?,
            ),
            ValueKind::Uid => match json {
                Json::Object(map) => {
                    let uid = map.get("uid").and_then(Json::as_str).ok_or_else(mismatch)?;
                    Value::Uid(uid.parse().map_err(|_| mismatch())?)
                }
                Json::String(s) => Value::Uid(s.parse().map_err(|_| mismatch())?),
                _ => return Err(mismatch()),
            },
        })
    }

    /// Infers a value from JSON when no kind is known.
    ///
    /// Integers stay integers, other numbers become floats, arrays of
    /// numbers become vectors, and objects with a `uid` key become
    /// references.
    #[must_use]
    pub fn infer_from_json(json: &serde_json::Value) -> Value {
        use serde_json::Value as Json;
        match json {
            Json::Null => Value::Null,
            Json::Bool(b) => Value::Bool(*b),
            Json::Number(n) => n
                .as_i64()
                .map(Value::Int)
                .unwrap_or_else(|| Value::Float(n.as_f64().unwrap_or_default())),
            Json::String(s) => Value::String(s.clone()),
            Json::Array(items) if !items.is_empty() && items.iter().all(Json::is_number) => {
                Value::Vector(
                    items
                        .iter()
                        .map(|f| f.as_f64().unwrap_or_default() as f32)
                        .collect(),
                )
            }
            Json::Array(items) => Value::List(items.iter().map(Self::infer_from_json).collect()),
            Json::Object(map) => match map.get("uid").and_then(Json::as_str) {
                Some(uid) if map.len() == 1 => uid
                    .parse()
                    .map(Value::Uid)
                    .unwrap_or_else(|_| Value::String(uid.to_string())),
                _ => Value::Object(Box::new(Record::from_json_inferred(json))),
            },
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::String(s) => f.write_str(s),
            Self::Uid(uid) => write!(f, "{uid}"),
            other => write!(f, "{}", other.to_json()),
        }
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Self::Int(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Self::Int(i64::from(v))
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Self::Float(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Self::String(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Self::String(v)
    }
}

impl From<Vec<f32>> for Value {
    fn from(v: Vec<f32>) -> Self {
        Self::Vector(v)
    }
}

impl From<Uid> for Value {
    fn from(v: Uid) -> Self {
        Self::Uid(v)
    }
}

impl From<DateTime<Utc>> for Value {
    fn from(v: DateTime<Utc>) -> Self {
        Self::DateTime(v)
    }
}

impl From<Point> for Value {
    fn from(v: Point) -> Self {
        Self::Geo(v)
    }
}

/// Parses a vector literal such as `"[0.1, 0.2]"`.
#[must_use]
pub(crate) fn parse_vector(s: &str) -> Option<Vec<f32>> {
    let inner = s.trim().strip_prefix('[')?.strip_suffix(']')?;
    if inner.trim().is_empty() {
        return Some(Vec::new());
    }
    inner.split(',').map(|f| f.trim().parse::<f32>().ok()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_kind_of_scalars() {
        assert_eq!(ValueKind::of(&Value::from("a")).unwrap(), ValueKind::String);
        assert_eq!(ValueKind::of(&Value::Int(1)).unwrap(), ValueKind::Int);
        assert_eq!(
            ValueKind::of(&Value::Vector(vec![0.1])).unwrap(),
            ValueKind::Vector
        );
        assert!(ValueKind::of(&Value::Null).is_err());
    }

    #[test]
    fn test_kind_of_mixed_list_fails() {
        let list = Value::List(vec![Value::Int(1), Value::from("x")]);
        let err = ValueKind::of(&list).unwrap_err();
        assert!(err.to_string().contains("unsupported type"));
    }

    #[test]
    fn test_convert_literals() {
        assert_eq!(Value::from("20").convert(ValueKind::Int).unwrap(), Value::Int(20));
        assert_eq!(
            Value::from("2.5").convert(ValueKind::Float).unwrap(),
            Value::Float(2.5)
        );
        assert_eq!(
            Value::from("[0.1, 0.2]").convert(ValueKind::Vector).unwrap(),
            Value::Vector(vec![0.1, 0.2])
        );
        assert!(Value::from("abc").convert(ValueKind::Int).is_err());
    }

    #[test]
    fn test_compare_mixed_numbers() {
        assert_eq!(Value::Int(2).compare(&Value::Float(2.5)), Some(Ordering::Less));
        assert_eq!(Value::from("a").compare(&Value::Int(1)), None);
    }

    #[test]
    fn test_json_rendering() {
        let dt = Utc.with_ymd_and_hms(2024, 1, 2, 3, 4, 5).unwrap();
        assert_eq!(Value::DateTime(dt).to_json(), "2024-01-02T03:04:05Z");
        assert_eq!(Value::Bytes(vec![1, 2]).to_json(), serde_json::json!([1, 2]));
        assert_eq!(
            Value::Uid(Uid::new(10)).to_json(),
            serde_json::json!({ "uid": "0xa" })
        );
    }

    #[test]
    fn test_from_json_by_kind() {
        let json = serde_json::json!({ "type": "Point", "coordinates": [1.5, -2.0] });
        assert_eq!(
            Value::from_json(&json, ValueKind::Geo).unwrap(),
            Value::Geo(Point::new(1.5, -2.0))
        );
        let dt = serde_json::json!("2024-01-02T03:04:05Z");
        assert!(matches!(
            Value::from_json(&dt, ValueKind::DateTime).unwrap(),
            Value::DateTime(_)
        ));
        assert!(Value::from_json(&serde_json::json!("x"), ValueKind::Int).is_err());
        assert_eq!(
            Value::from_json(&serde_json::Value::Null, ValueKind::Int).unwrap(),
            Value::Null
        );
    }

    #[test]
    fn test_infer_from_json() {
        assert_eq!(Value::infer_from_json(&serde_json::json!(3)), Value::Int(3));
        assert_eq!(
            Value::infer_from_json(&serde_json::json!({ "uid": "0x3" })),
            Value::Uid(Uid::new(3))
        );
        assert_eq!(
            Value::infer_from_json(&serde_json::json!([0.5, 1])),
            Value::Vector(vec![0.5, 1.0])
        );
    }
}
