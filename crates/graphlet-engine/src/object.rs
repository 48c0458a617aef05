//! Typed objects and their descriptors.
//!
//! A typed object is an ordinary struct declared through [`graph_object!`].
//! The macro builds a [`TypeDescriptor`] once per type and implements
//! [`Encodable`] and [`Decodable`], which convert between the struct and a
//! [`Record`] keyed by predicate names (`"<Type>.<field>"`).
//!
//! Field values go through [`FieldType`], implemented here for the scalar
//! kinds the engine stores and by the macro for every declared type, so a
//! declared type can be nested inside another.
//!
//! [`graph_object!`]: crate::graph_object

use chrono::{DateTime, Utc};

use graphlet_common::types::{IndexKind, Point, Record, Uid, Value, ValueKind};
use graphlet_common::utils::error::{Error, Result, ValidationError};

/// How a field's value is stored.
#[derive(Debug, Clone, Copy)]
pub enum FieldShape {
    /// A scalar predicate, or a list of scalars.
    Scalar {
        /// Scalar kind.
        kind: ValueKind,
        /// Whether the field holds a list.
        list: bool,
    },
    /// An edge to a nested declared type.
    Object(fn() -> &'static TypeDescriptor),
}

impl FieldShape {
    /// A single scalar of `kind`.
    #[must_use]
    pub const fn scalar(kind: ValueKind) -> Self {
        Self::Scalar { kind, list: false }
    }

    /// A list of scalars of `kind`.
    #[must_use]
    pub const fn list(kind: ValueKind) -> Self {
        Self::Scalar { kind, list: true }
    }
}

/// What a declared field is for.
#[derive(Debug, Clone, Copy)]
pub enum FieldRole {
    /// Holds the entity id.
    Uid,
    /// Stored as a predicate.
    Value(FieldShape),
    /// Read-only list of the entities pointing here through
    /// `<type_name>.<field>`.
    Reverse {
        /// Type owning the forward edge.
        type_name: &'static str,
        /// Field of the forward edge.
        field: &'static str,
        /// Descriptor of the pointing type.
        target: fn() -> &'static TypeDescriptor,
    },
}

/// One declared field.
#[derive(Debug, Clone)]
pub struct FieldDescriptor {
    /// Field name as written in the struct.
    pub name: &'static str,
    /// Predicate name, `"<Type>.<field>"`.
    pub predicate: &'static str,
    /// What the field is for.
    pub role: FieldRole,
    /// Index marker, if any.
    pub index: Option<IndexKind>,
}

/// The declared shape of a typed object, built once per type.
#[derive(Debug, Clone)]
pub struct TypeDescriptor {
    /// Type name, also the predicate prefix.
    pub name: &'static str,
    /// Fields in declaration order.
    pub fields: Vec<FieldDescriptor>,
}

impl TypeDescriptor {
    /// Looks up a field by its struct name.
    #[must_use]
    pub fn field(&self, name: &str) -> Option<&FieldDescriptor> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Returns true if any stored field carries an index marker.
    #[must_use]
    pub fn has_constraint(&self) -> bool {
        self.fields
            .iter()
            .any(|f| f.index.is_some() && matches!(f.role, FieldRole::Value(_)))
    }
}

/// Converts a typed value into its [`Record`] form.
pub trait Encodable {
    /// Encodes the value.
    ///
    /// # Errors
    ///
    /// Returns a validation error for field values the engine cannot store.
    fn encode(&self) -> Result<Record>;
}

/// Rebuilds a typed value from its [`Record`] form.
pub trait Decodable: Sized {
    /// Decodes a record. Missing fields take their default value.
    ///
    /// # Errors
    ///
    /// Returns an error when a present field has the wrong shape.
    fn decode(record: &Record) -> Result<Self>;
}

impl Encodable for Record {
    fn encode(&self) -> Result<Record> {
        Ok(self.clone())
    }
}

impl Decodable for Record {
    fn decode(record: &Record) -> Result<Self> {
        Ok(record.clone())
    }
}

/// A declared graph type.
///
/// Implemented by [`graph_object!`](crate::graph_object); not meant to be
/// implemented by hand.
pub trait Object: Encodable + Decodable + Default + 'static {
    /// Returns the type's descriptor.
    fn descriptor() -> &'static TypeDescriptor;

    /// Returns the entity id, if assigned.
    fn uid(&self) -> Option<Uid>;
}

/// A value that can be stored in a declared field.
pub trait FieldType: Sized {
    /// How the value is stored.
    fn shape() -> FieldShape;

    /// Converts to a stored value; `None` leaves the predicate unset.
    ///
    /// # Errors
    ///
    /// Returns a validation error when the value has no stored form.
    fn to_value(&self) -> Result<Option<Value>>;

    /// Converts back from a stored value; `None` means the predicate was
    /// absent.
    ///
    /// # Errors
    ///
    /// Returns a serialization error when the stored value has the wrong
    /// kind.
    fn from_value(value: Option<&Value>) -> Result<Self>;
}

/// A field holding the entity id.
pub trait UidField {
    /// Returns the id, if assigned.
    fn to_uid(&self) -> Option<Uid>;
    /// Builds the field from an id.
    fn from_uid(uid: Option<Uid>) -> Self;
}

impl UidField for Uid {
    fn to_uid(&self) -> Option<Uid> {
        Some(*self).filter(Uid::is_assigned)
    }

    fn from_uid(uid: Option<Uid>) -> Self {
        uid.unwrap_or_default()
    }
}

impl UidField for Option<Uid> {
    fn to_uid(&self) -> Option<Uid> {
        self.filter(Uid::is_assigned)
    }

    fn from_uid(uid: Option<Uid>) -> Self {
        uid
    }
}

/// A reverse-edge field: the entities of another type that point here.
pub trait ReverseField: Sized {
    /// Descriptor of the pointing type.
    fn target() -> &'static TypeDescriptor;

    /// Decodes the reverse-edge results.
    ///
    /// # Errors
    ///
    /// Returns an error when an element cannot be decoded.
    fn from_value(value: Option<&Value>) -> Result<Self>;
}

impl<T: Object> ReverseField for Vec<T> {
    fn target() -> &'static TypeDescriptor {
        T::descriptor()
    }

    fn from_value(value: Option<&Value>) -> Result<Self> {
        match value {
            None | Some(Value::Null) => Ok(Vec::new()),
            Some(Value::List(items)) => items.iter().map(decode_nested::<T>).collect(),
            Some(other) => Ok(vec![decode_nested::<T>(other)?]),
        }
    }
}

/// Decodes a nested object from an embedded record or a bare reference.
///
/// # Errors
///
/// Returns a serialization error for values that are neither.
pub fn decode_nested<T: Decodable>(value: &Value) -> Result<T> {
    match value {
        Value::Object(record) => T::decode(record),
        Value::Uid(uid) => T::decode(&Record::new().with_uid(*uid)),
        Value::List(items) => match items.first() {
            Some(first) => decode_nested(first),
            None => T::decode(&Record::new()),
        },
        other => Err(mismatch(other, "object")),
    }
}

/// Encodes a nested object, omitting it when it carries nothing.
///
/// # Errors
///
/// Propagates the nested object's encode errors.
pub fn encode_nested<T: Encodable>(value: &T) -> Result<Option<Value>> {
    let record = value.encode()?;
    Ok(if record.is_blank() {
        None
    } else {
        Some(Value::Object(Box::new(record)))
    })
}

fn mismatch(value: &Value, expected: &str) -> Error {
    Error::Serialization(format!("expected {expected}, found {}", value.type_name()))
}

fn unsupported(what: String) -> Error {
    ValidationError::UnsupportedType(what).into()
}

impl<T: FieldType> FieldType for Option<T> {
    fn shape() -> FieldShape {
        T::shape()
    }

    fn to_value(&self) -> Result<Option<Value>> {
        match self {
            Some(value) => value.to_value(),
            None => Ok(None),
        }
    }

    fn from_value(value: Option<&Value>) -> Result<Self> {
        match value {
            None | Some(Value::Null) => Ok(None),
            some => T::from_value(some).map(Some),
        }
    }
}

impl FieldType for String {
    fn shape() -> FieldShape {
        FieldShape::scalar(ValueKind::String)
    }

    fn to_value(&self) -> Result<Option<Value>> {
        Ok((!self.is_empty()).then(|| Value::String(self.clone())))
    }

    fn from_value(value: Option<&Value>) -> Result<Self> {
        match value {
            None | Some(Value::Null) => Ok(String::new()),
            Some(Value::String(s)) => Ok(s.clone()),
            Some(other) => match other.convert(ValueKind::String)? {
                Value::String(s) => Ok(s),
                other => Err(mismatch(&other, "string")),
            },
        }
    }
}

macro_rules! int_field {
    ($($t:ty),* $(,)?) => {
        $(
            impl FieldType for $t {
                fn shape() -> FieldShape {
                    FieldShape::scalar(ValueKind::Int)
                }

                fn to_value(&self) -> Result<Option<Value>> {
                    let value = i64::try_from(*self).map_err(|_| {
                        unsupported(format!("{} value {} out of int range", stringify!($t), self))
                    })?;
                    Ok(Some(Value::Int(value)))
                }

                fn from_value(value: Option<&Value>) -> Result<Self> {
                    match value {
                        None | Some(Value::Null) => Ok(0),
                        Some(value) => {
                            let Value::Int(int) = value.convert(ValueKind::Int)? else {
                                return Err(mismatch(value, "int"));
                            };
                            <$t>::try_from(int).map_err(|_| {
                                Error::Serialization(format!(
                                    "int {int} does not fit in {}",
                                    stringify!($t)
                                ))
                            })
                        }
                    }
                }
            }
        )*
    };
}

int_field!(i8, i16, i32, i64, u8, u16, u32, u64, isize, usize);

impl FieldType for f64 {
    fn shape() -> FieldShape {
        FieldShape::scalar(ValueKind::Float)
    }

    fn to_value(&self) -> Result<Option<Value>> {
        Ok(Some(Value::Float(*self)))
    }

    fn from_value(value: Option<&Value>) -> Result<Self> {
        match value {
            None | Some(Value::Null) => Ok(0.0),
            Some(value) => match value.convert(ValueKind::Float)? {
                Value::Float(f) => Ok(f),
                _ => Err(mismatch(value, "float")),
            },
        }
    }
}

impl FieldType for f32 {
    fn shape() -> FieldShape {
        FieldShape::scalar(ValueKind::Float)
    }

    fn to_value(&self) -> Result<Option<Value>> {
        Ok(Some(Value::Float(f64::from(*self))))
    }

    #[allow(clippy::cast_possible_truncation)]
    fn from_value(value: Option<&Value>) -> Result<Self> {
        f64::from_value(value).map(|f| f as f32)
    }
}

impl FieldType for bool {
    fn shape() -> FieldShape {
        FieldShape::scalar(ValueKind::Bool)
    }

    fn to_value(&self) -> Result<Option<Value>> {
        Ok(Some(Value::Bool(*self)))
    }

    fn from_value(value: Option<&Value>) -> Result<Self> {
        match value {
            None | Some(Value::Null) => Ok(false),
            Some(value) => match value.convert(ValueKind::Bool)? {
                Value::Bool(b) => Ok(b),
                _ => Err(mismatch(value, "bool")),
            },
        }
    }
}

impl FieldType for Vec<u8> {
    fn shape() -> FieldShape {
        FieldShape::scalar(ValueKind::Binary)
    }

    fn to_value(&self) -> Result<Option<Value>> {
        Ok((!self.is_empty()).then(|| Value::Bytes(self.clone())))
    }

    fn from_value(value: Option<&Value>) -> Result<Self> {
        match value {
            None | Some(Value::Null) => Ok(Vec::new()),
            Some(Value::Bytes(bytes)) => Ok(bytes.clone()),
            Some(other) => Err(mismatch(other, "bytes")),
        }
    }
}

impl FieldType for Vec<f32> {
    fn shape() -> FieldShape {
        FieldShape::scalar(ValueKind::Vector)
    }

    fn to_value(&self) -> Result<Option<Value>> {
        Ok((!self.is_empty()).then(|| Value::Vector(self.clone())))
    }

    #[allow(clippy::cast_possible_truncation)]
    fn from_value(value: Option<&Value>) -> Result<Self> {
        match value {
            None | Some(Value::Null) => Ok(Vec::new()),
            Some(Value::Vector(v)) => Ok(v.clone()),
            Some(Value::List(items)) => items
                .iter()
                .map(|item| match item {
                    Value::Float(f) => Ok(*f as f32),
                    Value::Int(i) => Ok(*i as f32),
                    other => Err(mismatch(other, "float")),
                })
                .collect(),
            Some(other) => Err(mismatch(other, "vector")),
        }
    }
}

impl FieldType for DateTime<Utc> {
    fn shape() -> FieldShape {
        FieldShape::scalar(ValueKind::DateTime)
    }

    fn to_value(&self) -> Result<Option<Value>> {
        Ok(Some(Value::DateTime(*self)))
    }

    fn from_value(value: Option<&Value>) -> Result<Self> {
        match value {
            None | Some(Value::Null) => Ok(DateTime::<Utc>::default()),
            Some(value) => match value.convert(ValueKind::DateTime)? {
                Value::DateTime(dt) => Ok(dt),
                _ => Err(mismatch(value, "datetime")),
            },
        }
    }
}

impl FieldType for Point {
    fn shape() -> FieldShape {
        FieldShape::scalar(ValueKind::Geo)
    }

    fn to_value(&self) -> Result<Option<Value>> {
        Ok(Some(Value::Geo(*self)))
    }

    fn from_value(value: Option<&Value>) -> Result<Self> {
        match value {
            None | Some(Value::Null) => Ok(Point::default()),
            Some(Value::Geo(point)) => Ok(*point),
            Some(other) => Err(mismatch(other, "geo")),
        }
    }
}

macro_rules! list_field {
    ($($t:ty => $kind:expr),* $(,)?) => {
        $(
            impl FieldType for Vec<$t> {
                fn shape() -> FieldShape {
                    FieldShape::list($kind)
                }

                fn to_value(&self) -> Result<Option<Value>> {
                    let mut items = Vec::with_capacity(self.len());
                    for item in self {
                        if let Some(value) = item.to_value()? {
                            items.push(value);
                        }
                    }
                    Ok((!items.is_empty()).then_some(Value::List(items)))
                }

                fn from_value(value: Option<&Value>) -> Result<Self> {
                    match value {
                        None | Some(Value::Null) => Ok(Vec::new()),
                        Some(Value::List(items)) => items
                            .iter()
                            .map(|item| <$t>::from_value(Some(item)))
                            .collect(),
                        Some(single) => Ok(vec![<$t>::from_value(Some(single))?]),
                    }
                }
            }
        )*
    };
}

list_field!(
    String => ValueKind::String,
    i64 => ValueKind::Int,
    i32 => ValueKind::Int,
    f64 => ValueKind::Float,
    bool => ValueKind::Bool,
    DateTime<Utc> => ValueKind::DateTime,
);

/// Declares a typed graph object.
///
/// Wraps an ordinary struct definition. Every field is stored as the
/// predicate `"<Type>.<field>"` unless it carries a marker:
///
/// - `#[uid]` holds the entity id (`Uid` or `Option<Uid>`);
/// - `#[index(exact|hash|term|fulltext|trigram|unique|vector)]` declares an
///   index; `exact`, `hash` and `unique` fields are also link keys for
///   nested-object deduplication;
/// - `#[reverse(Type, field)]` declares a read-only `Vec<Type>` filled with
///   the entities whose `Type.field` edge points here.
///
/// Fields take at most one marker and no other attributes. The struct must
/// implement `Default`.
///
/// ```
/// use graphlet_engine::{graph_object, Uid};
///
/// graph_object! {
///     #[derive(Debug, Clone, Default, PartialEq)]
///     pub struct Project {
///         #[uid]
///         pub uid: Uid,
///         #[index(exact)]
///         pub name: String,
///         #[reverse(Branch, proj)]
///         pub branches: Vec<Branch>,
///     }
/// }
///
/// graph_object! {
///     #[derive(Debug, Clone, Default, PartialEq)]
///     pub struct Branch {
///         #[uid]
///         pub uid: Uid,
///         #[index(exact)]
///         pub name: String,
///         pub proj: Option<Project>,
///     }
/// }
/// ```
#[macro_export]
macro_rules! graph_object {
    (
        $(#[$meta:meta])*
        $vis:vis struct $name:ident {
            $(
                $(#[$($marker:tt)*])*
                $fvis:vis $field:ident : $fty:ty
            ),* $(,)?
        }
    ) => {
        $(#[$meta])*
        $vis struct $name {
            $( $fvis $field: $fty, )*
        }

        impl $crate::object::Object for $name {
            fn descriptor() -> &'static $crate::object::TypeDescriptor {
                static DESCRIPTOR: ::std::sync::OnceLock<$crate::object::TypeDescriptor> =
                    ::std::sync::OnceLock::new();
                DESCRIPTOR.get_or_init(|| $crate::object::TypeDescriptor {
                    name: stringify!($name),
                    fields: vec![
                        $(
                            $crate::object::FieldDescriptor {
                                name: stringify!($field),
                                predicate: concat!(stringify!($name), ".", stringify!($field)),
                                role: $crate::graph_object!(@role $fty; $($($marker)*)*),
                                index: $crate::graph_object!(@index $($($marker)*)*),
                            },
                        )*
                    ],
                })
            }

            fn uid(&self) -> ::std::option::Option<$crate::Uid> {
                #[allow(unused_mut)]
                let mut uid = None;
                $( $crate::graph_object!(@uid self, uid, $field; $($($marker)*)*); )*
                uid
            }
        }

        impl $crate::object::Encodable for $name {
            fn encode(&self) -> $crate::Result<$crate::Record> {
                #[allow(unused_mut)]
                let mut record = $crate::Record::typed(stringify!($name));
                $(
                    $crate::graph_object!(
                        @encode self, record, $field, $fty,
                        concat!(stringify!($name), ".", stringify!($field));
                        $($($marker)*)*
                    );
                )*
                Ok(record)
            }
        }

        impl $crate::object::Decodable for $name {
            fn decode(record: &$crate::Record) -> $crate::Result<Self> {
                Ok(Self {
                    $(
                        $field: $crate::graph_object!(
                            @decode record, $fty,
                            concat!(stringify!($name), ".", stringify!($field));
                            $($($marker)*)*
                        ),
                    )*
                })
            }
        }

        impl $crate::object::FieldType for $name {
            fn shape() -> $crate::object::FieldShape {
                $crate::object::FieldShape::Object(
                    <$name as $crate::object::Object>::descriptor,
                )
            }

            fn to_value(&self) -> $crate::Result<::std::option::Option<$crate::Value>> {
                $crate::object::encode_nested(self)
            }

            fn from_value(
                value: ::std::option::Option<&$crate::Value>,
            ) -> $crate::Result<Self> {
                match value {
                    None | Some($crate::Value::Null) => Ok(Self::default()),
                    Some(value) => $crate::object::decode_nested(value),
                }
            }
        }
    };

    (@role $fty:ty;) => {
        $crate::object::FieldRole::Value(<$fty as $crate::object::FieldType>::shape())
    };
    (@role $fty:ty; index($kind:ident)) => {
        $crate::object::FieldRole::Value(<$fty as $crate::object::FieldType>::shape())
    };
    (@role $fty:ty; uid) => {
        $crate::object::FieldRole::Uid
    };
    (@role $fty:ty; reverse($ty:ident, $f:ident)) => {
        $crate::object::FieldRole::Reverse {
            type_name: stringify!($ty),
            field: stringify!($f),
            target: <$fty as $crate::object::ReverseField>::target,
        }
    };

    (@index) => { None };
    (@index uid) => { None };
    (@index reverse($ty:ident, $f:ident)) => { None };
    (@index index(exact)) => { Some($crate::IndexKind::Exact) };
    (@index index(hash)) => { Some($crate::IndexKind::Hash) };
    (@index index(term)) => { Some($crate::IndexKind::Term) };
    (@index index(fulltext)) => { Some($crate::IndexKind::Fulltext) };
    (@index index(trigram)) => { Some($crate::IndexKind::Trigram) };
    (@index index(unique)) => { Some($crate::IndexKind::Unique) };
    (@index index(vector)) => { Some($crate::IndexKind::Vector) };

    (@uid $this:ident, $out:ident, $field:ident; uid) => {
        $out = <_ as $crate::object::UidField>::to_uid(&$this.$field)
    };
    (@uid $this:ident, $out:ident, $field:ident; $($other:tt)*) => {};

    (@encode $this:ident, $rec:ident, $field:ident, $fty:ty, $pred:expr; uid) => {
        $rec.uid = <$fty as $crate::object::UidField>::to_uid(&$this.$field)
    };
    (@encode $this:ident, $rec:ident, $field:ident, $fty:ty, $pred:expr; reverse($ty:ident, $f:ident)) => {};
    (@encode $this:ident, $rec:ident, $field:ident, $fty:ty, $pred:expr; $($other:tt)*) => {
        if let Some(value) = <$fty as $crate::object::FieldType>::to_value(&$this.$field)? {
            $rec.set($pred, value);
        }
    };

    (@decode $rec:ident, $fty:ty, $pred:expr; uid) => {
        <$fty as $crate::object::UidField>::from_uid($rec.uid)
    };
    (@decode $rec:ident, $fty:ty, $pred:expr; reverse($ty:ident, $f:ident)) => {
        <$fty as $crate::object::ReverseField>::from_value($rec.get($pred))?
    };
    (@decode $rec:ident, $fty:ty, $pred:expr; $($other:tt)*) => {
        <$fty as $crate::object::FieldType>::from_value($rec.get($pred))?
    };
}

#[cfg(test)]
mod tests {
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
            uid: Option<Uid>,
            #[index(term)]
            name: String,
            tags: Vec<String>,
            weight: f64,
            proj: Option<Project>,
        }
    }

    #[test]
    fn test_descriptor() {
        let desc = Branch::descriptor();
        assert_eq!(desc.name, "Branch");
        assert_eq!(desc.fields.len(), 5);
        assert!(matches!(desc.fields[0].role, FieldRole::Uid));
        assert_eq!(desc.fields[1].predicate, "Branch.name");
        assert_eq!(desc.fields[1].index, Some(IndexKind::Term));
        assert!(matches!(
            desc.fields[2].role,
            FieldRole::Value(FieldShape::Scalar {
                kind: ValueKind::String,
                list: true
            })
        ));
        let FieldRole::Value(FieldShape::Object(nested)) = desc.fields[4].role else {
            panic!("proj should be a nested object");
        };
        assert_eq!(nested().name, "Project");
        assert!(desc.has_constraint());

        let FieldRole::Reverse {
            type_name, field, ..
        } = Project::descriptor().fields[2].role
        else {
            panic!("branches should be a reverse field");
        };
        assert_eq!((type_name, field), ("Branch", "proj"));
    }

    #[test]
    fn test_encode_omits_empty_fields() {
        let branch = Branch {
            name: "main".into(),
            ..Branch::default()
        };
        let record = branch.encode().unwrap();
        assert_eq!(record.type_name.as_deref(), Some("Branch"));
        assert_eq!(record.uid, None);
        assert_eq!(record.get("Branch.name"), Some(&Value::from("main")));
        assert_eq!(record.get("Branch.weight"), Some(&Value::Float(0.0)));
        assert!(record.get("Branch.tags").is_none());
        assert!(record.get("Branch.proj").is_none());
    }

    #[test]
    fn test_nested_encode_and_decode() {
        let branch = Branch {
            uid: Some(Uid::new(9)),
            name: "main".into(),
            tags: vec!["a".into(), "b".into()],
            weight: 1.5,
            proj: Some(Project {
                name: "graphlet".into(),
                ..Project::default()
            }),
        };
        let record = branch.encode().unwrap();
        let Some(Value::Object(nested)) = record.get("Branch.proj") else {
            panic!("nested project should be embedded");
        };
        assert_eq!(nested.get("Project.name"), Some(&Value::from("graphlet")));
        assert_eq!(Branch::decode(&record).unwrap(), branch);
        assert_eq!(branch.uid(), Some(Uid::new(9)));
    }

    #[test]
    fn test_decode_reference_and_reverse() {
        let mut record = Record::typed("Project").with_uid(Uid::new(2));
        record.set(
            "Project.branches",
            Value::List(vec![Value::Object(Box::new(
                Record::typed("Branch")
                    .with_uid(Uid::new(3))
                    .with_field("Branch.name", "dev")
                    .with_field("Branch.proj", Uid::new(2)),
            ))]),
        );
        let project = Project::decode(&record).unwrap();
        assert_eq!(project.uid, Uid::new(2));
        assert_eq!(project.branches.len(), 1);
        assert_eq!(project.branches[0].name, "dev");
        assert_eq!(
            project.branches[0].proj.as_ref().map(|p| p.uid),
            Some(Uid::new(2))
        );
    }

    #[test]
    fn test_scalar_conversions() {
        assert_eq!(u8::from_value(Some(&Value::Int(7))).unwrap(), 7);
        assert!(u8::from_value(Some(&Value::Int(300))).is_err());
        assert!(u64::MAX.to_value().is_err());
        assert_eq!(i64::from_value(None).unwrap(), 0);
        assert_eq!(String::from_value(Some(&Value::Int(3))).unwrap(), "3");
        assert_eq!(Option::<i64>::from_value(Some(&Value::Null)).unwrap(), None);
        assert_eq!(
            Vec::<f32>::from_value(Some(&Value::List(vec![Value::Float(0.5), Value::Int(1)])))
                .unwrap(),
            vec![0.5, 1.0]
        );
        assert!(bool::from_value(Some(&Value::Geo(Point::new(0.0, 0.0)))).is_err());
    }
}
