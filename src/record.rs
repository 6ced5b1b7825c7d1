//! Conversions between Rust types and [`Value`], and typed user-defined kinds.
//!
//! A [`Record`] is a Rust struct that travels on the wire as a user-defined
//! value. Most users derive it:
//!
//! ```rust
//! use polybin::{Record, Serializer, ToValue, FromValue};
//!
//! #[derive(Record, Debug, PartialEq)]
//! #[polybin(name = "Vector3")]
//! struct Vector3 {
//!     x: f64,
//!     y: f64,
//!     z: f64,
//! }
//!
//! let serializer = Serializer::new();
//! serializer.register::<Vector3>();
//! let v = Vector3 { x: 1.0, y: 2.0, z: 3.0 };
//! let bytes = serializer.serialize(&v.to_value()).unwrap();
//! let decoded = Vector3::from_value(&serializer.deserialize(&bytes).unwrap()).unwrap();
//! assert_eq!(v, decoded);
//! ```

use crate::core::{read_object, write_object};
use crate::cursor::{Reader, Writer};
use crate::serializer::{Converter, Serializer, TypeConverter};
use crate::value::{Object, RegExp, UserObject, Value};
use crate::{CodecError, Result};
use chrono::{DateTime, Utc};
use std::marker::PhantomData;

/// Conversion into a [`Value`].
pub trait ToValue {
    fn to_value(&self) -> Value;
}

/// Fallible conversion out of a [`Value`].
pub trait FromValue: Sized {
    fn from_value(value: &Value) -> Result<Self>;
}

fn unexpected(expected: &str, value: &Value) -> CodecError {
    CodecError::Decode(format!(
        "Expected {}, got {}",
        expected,
        value.kind_name()
    ))
}

fn expect_number(value: &Value) -> Result<f64> {
    value.as_f64().ok_or_else(|| unexpected("number", value))
}

// --- numbers ---
macro_rules! impl_small_integer {
    ($($t:ty),*) => {
        $(
            impl ToValue for $t {
                fn to_value(&self) -> Value {
                    Value::Number(f64::from(*self))
                }
            }

            impl FromValue for $t {
                fn from_value(value: &Value) -> Result<Self> {
                    let n = expect_number(value)?;
                    if n.fract() != 0.0 || n < <$t>::MIN as f64 || n > <$t>::MAX as f64 {
                        return Err(CodecError::Decode(format!(
                            "{} is not a valid {}",
                            n,
                            stringify!($t)
                        )));
                    }
                    Ok(n as $t)
                }
            }
        )*
    };
}

impl_small_integer!(i8, u8, i16, u16, i32, u32);

/// Largest integer magnitude an `f64` represents exactly.
const MAX_SAFE_INTEGER: f64 = 9_007_199_254_740_991.0;

/// Values beyond 2^53 round to the nearest representable float.
impl ToValue for i64 {
    fn to_value(&self) -> Value {
        Value::Number(*self as f64)
    }
}

impl FromValue for i64 {
    fn from_value(value: &Value) -> Result<Self> {
        let n = expect_number(value)?;
        if n.fract() != 0.0 || n.abs() > MAX_SAFE_INTEGER {
            return Err(CodecError::Decode(format!("{} is not a safe i64", n)));
        }
        Ok(n as i64)
    }
}

/// Values beyond 2^53 round to the nearest representable float.
impl ToValue for u64 {
    fn to_value(&self) -> Value {
        Value::Number(*self as f64)
    }
}

impl FromValue for u64 {
    fn from_value(value: &Value) -> Result<Self> {
        let n = expect_number(value)?;
        if n.fract() != 0.0 || !(0.0..=MAX_SAFE_INTEGER).contains(&n) {
            return Err(CodecError::Decode(format!("{} is not a safe u64", n)));
        }
        Ok(n as u64)
    }
}

impl ToValue for f32 {
    fn to_value(&self) -> Value {
        Value::Number(f64::from(*self))
    }
}

impl FromValue for f32 {
    fn from_value(value: &Value) -> Result<Self> {
        Ok(expect_number(value)? as f32)
    }
}

impl ToValue for f64 {
    fn to_value(&self) -> Value {
        Value::Number(*self)
    }
}

impl FromValue for f64 {
    fn from_value(value: &Value) -> Result<Self> {
        expect_number(value)
    }
}

// --- other scalars ---
impl ToValue for bool {
    fn to_value(&self) -> Value {
        Value::Bool(*self)
    }
}

impl FromValue for bool {
    fn from_value(value: &Value) -> Result<Self> {
        value.as_bool().ok_or_else(|| unexpected("boolean", value))
    }
}

impl ToValue for str {
    fn to_value(&self) -> Value {
        Value::String(self.to_string())
    }
}

impl ToValue for String {
    fn to_value(&self) -> Value {
        Value::String(self.clone())
    }
}

impl FromValue for String {
    fn from_value(value: &Value) -> Result<Self> {
        value
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| unexpected("string", value))
    }
}

impl ToValue for DateTime<Utc> {
    fn to_value(&self) -> Value {
        Value::Date(*self)
    }
}

impl FromValue for DateTime<Utc> {
    fn from_value(value: &Value) -> Result<Self> {
        match value {
            Value::Date(date) => Ok(*date),
            other => Err(unexpected("date", other)),
        }
    }
}

impl ToValue for RegExp {
    fn to_value(&self) -> Value {
        Value::RegExp(self.clone())
    }
}

impl FromValue for RegExp {
    fn from_value(value: &Value) -> Result<Self> {
        match value {
            Value::RegExp(regexp) => Ok(regexp.clone()),
            other => Err(unexpected("regexp", other)),
        }
    }
}

// --- containers ---
impl ToValue for Value {
    fn to_value(&self) -> Value {
        self.clone()
    }
}

impl FromValue for Value {
    fn from_value(value: &Value) -> Result<Self> {
        Ok(value.clone())
    }
}

impl ToValue for Object {
    fn to_value(&self) -> Value {
        Value::Object(self.clone())
    }
}

impl FromValue for Object {
    fn from_value(value: &Value) -> Result<Self> {
        value
            .as_object()
            .cloned()
            .ok_or_else(|| unexpected("object", value))
    }
}

impl<T: ToValue> ToValue for Vec<T> {
    fn to_value(&self) -> Value {
        Value::Array(self.iter().map(ToValue::to_value).collect())
    }
}

impl<T: FromValue> FromValue for Vec<T> {
    fn from_value(value: &Value) -> Result<Self> {
        value
            .as_array()
            .ok_or_else(|| unexpected("array", value))?
            .iter()
            .map(T::from_value)
            .collect()
    }
}

/// `None` becomes null; null and undefined both decode to `None`.
impl<T: ToValue> ToValue for Option<T> {
    fn to_value(&self) -> Value {
        self.as_ref().map_or(Value::Null, ToValue::to_value)
    }
}

impl<T: FromValue> FromValue for Option<T> {
    fn from_value(value: &Value) -> Result<Self> {
        match value {
            Value::Null | Value::Undefined => Ok(None),
            other => T::from_value(other).map(Some),
        }
    }
}

/// A Rust type carried on the wire as a named user-defined value.
///
/// Usually implemented with `#[derive(Record)]`, which also implements
/// [`ToValue`] and [`FromValue`] through [`record_to_value`] and
/// [`record_from_value`].
pub trait Record: Sized {
    /// Type name written on the wire and used as the registry key.
    const TYPE_NAME: &'static str;

    /// Property view of the record, including property flags.
    fn to_object(&self) -> Object;

    /// Rebuilds the record from decoded properties.
    fn from_object(object: &Object) -> Result<Self>;
}

pub fn record_to_value<T: Record>(record: &T) -> Value {
    Value::User(UserObject::new(T::TYPE_NAME, record.to_object()))
}

/// Accepts an instance of `T`'s user type, or a plain object with matching properties.
pub fn record_from_value<T: Record>(value: &Value) -> Result<T> {
    match value {
        Value::User(user) if user.type_name() == T::TYPE_NAME => T::from_object(user.properties()),
        Value::Object(object) => T::from_object(object),
        other => Err(CodecError::Decode(format!(
            "Expected {}, got {}",
            T::TYPE_NAME,
            other.type_name().unwrap_or(other.kind_name())
        ))),
    }
}

/// Reads a required property. Missing properties are read as undefined, so
/// only `Option` fields tolerate them.
pub fn field<T: FromValue>(object: &Object, key: &str, record: &str) -> Result<T> {
    let value = object.get(key).unwrap_or(&Value::Undefined);
    T::from_value(value)
        .map_err(|e| CodecError::Decode(format!("{}.{}: {}", record, key, e)))
}

/// Reads a property that never travels on the wire; missing means default.
pub fn field_or_default<T: FromValue + Default>(
    object: &Object,
    key: &str,
    record: &str,
) -> Result<T> {
    match object.get(key) {
        Some(_) => field(object, key, record),
        None => Ok(T::default()),
    }
}

/// Converter that rebuilds decoded values through `T`.
///
/// Decoding goes through [`Record::from_object`], so the result always has
/// exactly `T`'s shape.
pub struct RecordConverter<T> {
    _marker: PhantomData<fn() -> T>,
}

impl<T> RecordConverter<T> {
    pub fn new() -> Self {
        Self {
            _marker: PhantomData,
        }
    }
}

impl<T> Default for RecordConverter<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Record> Converter for RecordConverter<T> {
    fn encode(&self, serializer: &Serializer, writer: &mut Writer, value: &Value) -> Result<()> {
        let record: T = record_from_value(value)?;
        write_object(serializer, writer, &record.to_object())
    }

    fn decode(&self, serializer: &Serializer, reader: &mut Reader) -> Result<Value> {
        let object = read_object(serializer, reader)?;
        let record = T::from_object(&object)?;
        Ok(record_to_value(&record))
    }
}

impl<T: Record> TypeConverter for RecordConverter<T> {
    fn type_name(&self) -> &str {
        T::TYPE_NAME
    }
}
