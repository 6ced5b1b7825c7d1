#[cfg(feature = "serde_json")]
use crate::core::date_to_text;
#[cfg(feature = "serde_json")]
use crate::value::{Object, Value};
#[cfg(feature = "serde_json")]
use crate::{CodecError, Result};
#[cfg(feature = "serde_json")]
use serde_json::{Map, Number};

// --- serde_json::Value -> Value ---
/// Converts JSON into a dynamic value. Numbers become 64-bit floats.
#[cfg(feature = "serde_json")]
impl From<serde_json::Value> for Value {
    fn from(json: serde_json::Value) -> Self {
        match json {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Bool(b),
            serde_json::Value::Number(n) => Value::Number(n.as_f64().unwrap_or(0.0)),
            serde_json::Value::String(s) => Value::String(s),
            serde_json::Value::Array(items) => {
                Value::Array(items.into_iter().map(Value::from).collect())
            }
            serde_json::Value::Object(map) => {
                let mut object = Object::with_capacity(map.len());
                for (key, value) in map {
                    object.insert(key, Value::from(value));
                }
                Value::Object(object)
            }
        }
    }
}

// --- Value -> serde_json::Value ---
/// Converts a dynamic value into JSON.
///
/// - undefined becomes null
/// - dates become their canonical text and regexps their `/source/flags` form
/// - user-defined instances become plain JSON objects
/// - only writable, enumerable properties are kept, as on the wire
///
/// # Errors
/// Returns an error for NaN or infinite numbers, which JSON cannot hold.
#[cfg(feature = "serde_json")]
impl TryFrom<&Value> for serde_json::Value {
    type Error = CodecError;

    fn try_from(value: &Value) -> Result<Self> {
        match value {
            Value::Null | Value::Undefined => Ok(serde_json::Value::Null),
            Value::Bool(b) => Ok(serde_json::Value::Bool(*b)),
            Value::Number(n) => Number::from_f64(*n)
                .map(serde_json::Value::Number)
                .ok_or_else(|| {
                    CodecError::Encode(format!("{} cannot be represented in JSON", n))
                }),
            Value::String(s) => Ok(serde_json::Value::String(s.clone())),
            Value::Date(date) => Ok(serde_json::Value::String(date_to_text(date))),
            Value::RegExp(regexp) => Ok(serde_json::Value::String(regexp.to_string())),
            Value::Array(items) => items
                .iter()
                .map(serde_json::Value::try_from)
                .collect::<Result<Vec<_>>>()
                .map(serde_json::Value::Array),
            Value::Object(object) => object_to_json(object),
            Value::User(user) => object_to_json(user.properties()),
        }
    }
}

#[cfg(feature = "serde_json")]
fn object_to_json(object: &Object) -> Result<serde_json::Value> {
    let mut map = Map::with_capacity(object.len());
    for (key, value) in object.serializable() {
        map.insert(key.to_string(), serde_json::Value::try_from(value)?);
    }
    Ok(serde_json::Value::Object(map))
}
