//! Dynamic values accepted by the [`Serializer`](crate::Serializer).
//!
//! Built-in kinds form a closed set of [`Value`] variants; everything else is a
//! [`UserObject`] carrying its type name, which is resolved against the
//! serializer's converter registry.

use crate::core::Tag;
use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use smol_str::SmolStr;
use std::fmt;

/// A dynamically typed value.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Value {
    Null,
    #[default]
    Undefined,
    Bool(bool),
    Number(f64),
    String(String),
    Date(DateTime<Utc>),
    RegExp(RegExp),
    Array(Vec<Value>),
    Object(Object),
    User(UserObject),
}

impl Value {
    /// Classifies the value.
    ///
    /// Classification follows a fixed priority: null, undefined, boolean,
    /// number, string, date, regexp, array, plain object, then user-defined.
    /// Each variant maps to exactly one tag, so the first match is the only match.
    pub fn tag(&self) -> Tag {
        match self {
            Value::Null => Tag::Null,
            Value::Undefined => Tag::Undefined,
            Value::Bool(_) => Tag::Boolean,
            Value::Number(_) => Tag::Number,
            Value::String(_) => Tag::String,
            Value::Date(_) => Tag::Date,
            Value::RegExp(_) => Tag::RegExp,
            Value::Array(_) => Tag::Array,
            Value::Object(_) => Tag::Object,
            Value::User(_) => Tag::UserDefined,
        }
    }

    /// Human-readable kind name, used in error messages.
    pub fn kind_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Undefined => "undefined",
            Value::Bool(_) => "boolean",
            Value::Number(_) => "number",
            Value::String(_) => "string",
            Value::Date(_) => "date",
            Value::RegExp(_) => "regexp",
            Value::Array(_) => "array",
            Value::Object(_) => "object",
            Value::User(_) => "user-defined",
        }
    }

    /// Wraps `properties` as an instance of the named user type.
    pub fn user(type_name: impl Into<SmolStr>, properties: Object) -> Self {
        Value::User(UserObject::new(type_name, properties))
    }

    /// Builds a date from milliseconds since the Unix epoch.
    pub fn date_from_millis(millis: i64) -> Option<Self> {
        DateTime::from_timestamp_millis(millis).map(Value::Date)
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn is_undefined(&self) -> bool {
        matches!(self, Value::Undefined)
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&[Value]> {
        match self {
            Value::Array(items) => Some(items),
            _ => None,
        }
    }

    /// Property storage of a plain object or a user-defined instance.
    pub fn as_object(&self) -> Option<&Object> {
        match self {
            Value::Object(object) => Some(object),
            Value::User(user) => Some(user.properties()),
            _ => None,
        }
    }

    /// Type name of a user-defined instance.
    pub fn type_name(&self) -> Option<&str> {
        match self {
            Value::User(user) => Some(user.type_name()),
            _ => None,
        }
    }
}

macro_rules! value_from_number {
    ($($t:ty),*) => {
        $(
            impl From<$t> for Value {
                fn from(n: $t) -> Self {
                    Value::Number(f64::from(n))
                }
            }
        )*
    };
}

value_from_number!(i8, u8, i16, u16, i32, u32, f32, f64);

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<DateTime<Utc>> for Value {
    fn from(date: DateTime<Utc>) -> Self {
        Value::Date(date)
    }
}

impl From<RegExp> for Value {
    fn from(regexp: RegExp) -> Self {
        Value::RegExp(regexp)
    }
}

impl From<Vec<Value>> for Value {
    fn from(items: Vec<Value>) -> Self {
        Value::Array(items)
    }
}

impl From<Object> for Value {
    fn from(object: Object) -> Self {
        Value::Object(object)
    }
}

impl From<UserObject> for Value {
    fn from(user: UserObject) -> Self {
        Value::User(user)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(value: Option<T>) -> Self {
        value.map_or(Value::Null, Into::into)
    }
}

/// Attributes of a single object property.
///
/// Only properties that are both writable and enumerable are written to the
/// wire; the rest are skipped silently.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PropertyFlags {
    pub writable: bool,
    pub enumerable: bool,
}

impl PropertyFlags {
    pub const DEFAULT: Self = Self {
        writable: true,
        enumerable: true,
    };
    pub const READONLY: Self = Self {
        writable: false,
        enumerable: true,
    };
    pub const HIDDEN: Self = Self {
        writable: true,
        enumerable: false,
    };

    pub fn is_serializable(self) -> bool {
        self.writable && self.enumerable
    }
}

impl Default for PropertyFlags {
    fn default() -> Self {
        Self::DEFAULT
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Property {
    pub value: Value,
    pub flags: PropertyFlags,
}

/// Insertion-ordered property storage.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Object {
    properties: IndexMap<SmolStr, Property>,
}

impl Object {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            properties: IndexMap::with_capacity(capacity),
        }
    }

    /// Sets a writable, enumerable property, returning the previous value.
    pub fn insert(&mut self, key: impl Into<SmolStr>, value: impl Into<Value>) -> Option<Value> {
        self.define(key, value, PropertyFlags::DEFAULT)
    }

    /// Sets a property with explicit flags, returning the previous value.
    pub fn define(
        &mut self,
        key: impl Into<SmolStr>,
        value: impl Into<Value>,
        flags: PropertyFlags,
    ) -> Option<Value> {
        self.properties
            .insert(
                key.into(),
                Property {
                    value: value.into(),
                    flags,
                },
            )
            .map(|previous| previous.value)
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.properties.get(key).map(|property| &property.value)
    }

    pub fn get_mut(&mut self, key: &str) -> Option<&mut Value> {
        self.properties
            .get_mut(key)
            .map(|property| &mut property.value)
    }

    pub fn property(&self, key: &str) -> Option<&Property> {
        self.properties.get(key)
    }

    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.properties
            .shift_remove(key)
            .map(|property| property.value)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.properties.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.properties.len()
    }

    pub fn is_empty(&self) -> bool {
        self.properties.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.properties.keys().map(SmolStr::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.properties
            .iter()
            .map(|(key, property)| (key.as_str(), &property.value))
    }

    pub fn properties(&self) -> impl Iterator<Item = (&str, &Property)> {
        self.properties
            .iter()
            .map(|(key, property)| (key.as_str(), property))
    }

    /// Own properties that are both writable and enumerable, in insertion order.
    pub fn serializable(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.properties()
            .filter(|(_, property)| property.flags.is_serializable())
            .map(|(key, property)| (key, &property.value))
    }
}

impl<K: Into<SmolStr>, V: Into<Value>> FromIterator<(K, V)> for Object {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut object = Object::new();
        for (key, value) in iter {
            object.insert(key, value);
        }
        object
    }
}

/// A regular expression literal.
///
/// Only the pattern text is carried; no matching engine is attached.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RegExp {
    pub source: String,
    pub flags: String,
}

impl RegExp {
    pub fn new(source: impl Into<String>, flags: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            flags: flags.into(),
        }
    }
}

impl fmt::Display for RegExp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let source = if self.source.is_empty() {
            "(?:)"
        } else {
            &self.source
        };
        write!(f, "/{}/{}", source, self.flags)
    }
}

/// An instance of a type outside the built-in set.
#[derive(Debug, Clone, PartialEq)]
pub struct UserObject {
    type_name: SmolStr,
    properties: Object,
}

impl UserObject {
    pub fn new(type_name: impl Into<SmolStr>, properties: Object) -> Self {
        Self {
            type_name: type_name.into(),
            properties,
        }
    }

    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    pub fn properties(&self) -> &Object {
        &self.properties
    }

    pub fn properties_mut(&mut self) -> &mut Object {
        &mut self.properties
    }

    pub fn into_properties(self) -> Object {
        self.properties
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.properties.get(key)
    }
}
