use crate::cursor::{Reader, Writer};
use crate::serializer::{Converter, Serializer, TypeConverter};
use crate::value::{Object, RegExp, UserObject, Value};
use crate::{CodecError, Result};
use chrono::{DateTime, SecondsFormat, Utc};
use smol_str::SmolStr;

/// Type tags used in the polybin wire format.
///
/// Every encoded value starts with one of these bytes. Tags are stable and
/// part of the wire format; most users never need them directly.
pub const TAG_NULL: u8 = 0;
pub const TAG_UNDEFINED: u8 = 1;
pub const TAG_BOOLEAN: u8 = 2;
///< 64-bit float, always
pub const TAG_NUMBER: u8 = 3;
///< u32 length + one byte per character
pub const TAG_STRING: u8 = 4;
///< A full string unit holding the canonical date text
pub const TAG_DATE: u8 = 5;
pub const TAG_REGEXP: u8 = 6;
pub const TAG_ARRAY: u8 = 7;
pub const TAG_OBJECT: u8 = 8;
///< Followed by a one-byte-length type name
pub const TAG_USER_DEFINED: u8 = 255;

/// Closed set of wire kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(u8)]
pub enum Tag {
    Null = TAG_NULL,
    Undefined = TAG_UNDEFINED,
    Boolean = TAG_BOOLEAN,
    Number = TAG_NUMBER,
    String = TAG_STRING,
    Date = TAG_DATE,
    RegExp = TAG_REGEXP,
    Array = TAG_ARRAY,
    Object = TAG_OBJECT,
    UserDefined = TAG_USER_DEFINED,
}

impl From<Tag> for u8 {
    fn from(tag: Tag) -> u8 {
        tag as u8
    }
}

impl TryFrom<u8> for Tag {
    type Error = CodecError;

    fn try_from(byte: u8) -> Result<Self> {
        match byte {
            TAG_NULL => Ok(Tag::Null),
            TAG_UNDEFINED => Ok(Tag::Undefined),
            TAG_BOOLEAN => Ok(Tag::Boolean),
            TAG_NUMBER => Ok(Tag::Number),
            TAG_STRING => Ok(Tag::String),
            TAG_DATE => Ok(Tag::Date),
            TAG_REGEXP => Ok(Tag::RegExp),
            TAG_ARRAY => Ok(Tag::Array),
            TAG_OBJECT => Ok(Tag::Object),
            TAG_USER_DEFINED => Ok(Tag::UserDefined),
            other => Err(CodecError::Decode(format!("Unknown type tag: {}", other))),
        }
    }
}

fn mismatch(expected: &str, value: &Value) -> CodecError {
    CodecError::Encode(format!(
        "Expected {} value, got {}",
        expected,
        value.kind_name()
    ))
}

/// Canonical text form of a date: RFC 3339, UTC, millisecond precision.
pub fn date_to_text(date: &DateTime<Utc>) -> String {
    date.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Parses text produced by [`date_to_text`] (or any RFC 3339 timestamp).
pub fn date_from_text(text: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(text)
        .map(|date| date.with_timezone(&Utc))
        .map_err(|e| CodecError::Decode(format!("Invalid date text {:?}: {}", text, e)))
}

// --- null / undefined ---
/// Zero-byte payload; decodes to `Value::Null`.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullConverter;

impl Converter for NullConverter {
    fn encode(&self, _: &Serializer, _: &mut Writer, _: &Value) -> Result<()> {
        Ok(())
    }

    fn decode(&self, _: &Serializer, _: &mut Reader) -> Result<Value> {
        Ok(Value::Null)
    }
}

/// Zero-byte payload; decodes to `Value::Undefined`.
#[derive(Debug, Default, Clone, Copy)]
pub struct UndefinedConverter;

impl Converter for UndefinedConverter {
    fn encode(&self, _: &Serializer, _: &mut Writer, _: &Value) -> Result<()> {
        Ok(())
    }

    fn decode(&self, _: &Serializer, _: &mut Reader) -> Result<Value> {
        Ok(Value::Undefined)
    }
}

// --- boolean ---
#[derive(Debug, Default, Clone, Copy)]
pub struct BooleanConverter;

impl Converter for BooleanConverter {
    fn encode(&self, _: &Serializer, writer: &mut Writer, value: &Value) -> Result<()> {
        let b = value.as_bool().ok_or_else(|| mismatch("boolean", value))?;
        writer.write_bool(b);
        Ok(())
    }

    fn decode(&self, _: &Serializer, reader: &mut Reader) -> Result<Value> {
        Ok(Value::Bool(reader.read_bool()?))
    }
}

// --- number ---
/// Always a 64-bit float; integers are not compacted.
#[derive(Debug, Default, Clone, Copy)]
pub struct NumberConverter;

impl Converter for NumberConverter {
    fn encode(&self, _: &Serializer, writer: &mut Writer, value: &Value) -> Result<()> {
        let n = value.as_f64().ok_or_else(|| mismatch("number", value))?;
        writer.write_f64(n);
        Ok(())
    }

    fn decode(&self, _: &Serializer, reader: &mut Reader) -> Result<Value> {
        Ok(Value::Number(reader.read_f64()?))
    }
}

// --- string ---
#[derive(Debug, Default, Clone, Copy)]
pub struct StringConverter;

impl Converter for StringConverter {
    fn encode(&self, _: &Serializer, writer: &mut Writer, value: &Value) -> Result<()> {
        let s = value.as_str().ok_or_else(|| mismatch("string", value))?;
        writer.write_prefixed_string(s)
    }

    fn decode(&self, _: &Serializer, reader: &mut Reader) -> Result<Value> {
        Ok(Value::String(reader.read_prefixed_string()?))
    }
}

// --- date ---
/// Writes the canonical date text as a full string unit.
#[derive(Debug, Default, Clone, Copy)]
pub struct DateConverter;

impl Converter for DateConverter {
    fn encode(&self, serializer: &Serializer, writer: &mut Writer, value: &Value) -> Result<()> {
        let Value::Date(date) = value else {
            return Err(mismatch("date", value));
        };
        serializer.encode_value(writer, &Value::String(date_to_text(date)))
    }

    fn decode(&self, serializer: &Serializer, reader: &mut Reader) -> Result<Value> {
        match serializer.decode_value(reader)? {
            Value::String(text) => Ok(Value::Date(date_from_text(&text)?)),
            other => Err(CodecError::Decode(format!(
                "Expected date text, got {}",
                other.kind_name()
            ))),
        }
    }
}

// --- regexp ---
/// Decode-only: yields an empty pattern without consuming bytes.
///
/// Encoding is not supported and fails with [`CodecError::NotImplemented`].
#[derive(Debug, Default, Clone, Copy)]
pub struct RegExpConverter;

impl Converter for RegExpConverter {
    fn encode(&self, _: &Serializer, _: &mut Writer, _: &Value) -> Result<()> {
        Err(CodecError::NotImplemented("RegExp encoding"))
    }

    fn decode(&self, _: &Serializer, _: &mut Reader) -> Result<Value> {
        Ok(Value::RegExp(RegExp::default()))
    }
}

// --- array ---
/// A `u32` element count followed by each element as a full unit.
#[derive(Debug, Default, Clone, Copy)]
pub struct ArrayConverter;

impl Converter for ArrayConverter {
    fn encode(&self, serializer: &Serializer, writer: &mut Writer, value: &Value) -> Result<()> {
        let items = value.as_array().ok_or_else(|| mismatch("array", value))?;
        let count = u32::try_from(items.len()).map_err(|_| {
            CodecError::Encode(format!("Array of {} elements is too long", items.len()))
        })?;
        writer.write_u32(count);
        for item in items {
            serializer.encode_value(writer, item)?;
        }
        Ok(())
    }

    fn decode(&self, serializer: &Serializer, reader: &mut Reader) -> Result<Value> {
        let count = reader.read_u32()? as usize;
        // every element takes at least its tag byte
        let mut items = Vec::with_capacity(count.min(reader.remaining()));
        for _ in 0..count {
            items.push(serializer.decode_value(reader)?);
        }
        Ok(Value::Array(items))
    }
}

// --- object ---
/// Writes the serializable properties of `object`.
///
/// Layout: a one-byte property count, then for each property a `u32`-prefixed
/// key and the value as a full unit. Read-only and non-enumerable properties
/// are skipped.
pub fn write_object(serializer: &Serializer, writer: &mut Writer, object: &Object) -> Result<()> {
    let entries: Vec<_> = object.serializable().collect();
    let count = u8::try_from(entries.len()).map_err(|_| {
        CodecError::Encode(format!(
            "Object has {} serializable properties; at most {} fit the count byte",
            entries.len(),
            u8::MAX
        ))
    })?;
    writer.write_u8(count);
    for (key, value) in entries {
        writer.write_prefixed_string(key)?;
        serializer.encode_value(writer, value)?;
    }
    Ok(())
}

/// Reads properties written by [`write_object`] into a fresh object.
pub fn read_object(serializer: &Serializer, reader: &mut Reader) -> Result<Object> {
    let count = reader.read_u8()? as usize;
    let mut object = Object::with_capacity(count);
    for _ in 0..count {
        let key = reader.read_prefixed_string()?;
        let value = serializer.decode_value(reader)?;
        object.insert(key, value);
    }
    Ok(object)
}

/// Plain objects: decodes to a bare `Value::Object`.
#[derive(Debug, Default, Clone, Copy)]
pub struct ObjectConverter;

impl Converter for ObjectConverter {
    fn encode(&self, serializer: &Serializer, writer: &mut Writer, value: &Value) -> Result<()> {
        let object = value.as_object().ok_or_else(|| mismatch("object", value))?;
        write_object(serializer, writer, object)
    }

    fn decode(&self, serializer: &Serializer, reader: &mut Reader) -> Result<Value> {
        Ok(Value::Object(read_object(serializer, reader)?))
    }
}

// --- user-defined fallback ---
/// Object-layout converter bound to one user type name.
///
/// The serializer creates one of these the first time it encodes an instance
/// of a type with no registered converter, and keeps it for later decodes.
#[derive(Debug, Clone)]
pub struct UserObjectConverter {
    type_name: SmolStr,
}

impl UserObjectConverter {
    pub fn new(type_name: impl Into<SmolStr>) -> Self {
        Self {
            type_name: type_name.into(),
        }
    }
}

impl Converter for UserObjectConverter {
    fn encode(&self, serializer: &Serializer, writer: &mut Writer, value: &Value) -> Result<()> {
        let object = value.as_object().ok_or_else(|| mismatch(&self.type_name, value))?;
        write_object(serializer, writer, object)
    }

    fn decode(&self, serializer: &Serializer, reader: &mut Reader) -> Result<Value> {
        let properties = read_object(serializer, reader)?;
        Ok(Value::User(UserObject::new(
            self.type_name.clone(),
            properties,
        )))
    }
}

impl TypeConverter for UserObjectConverter {
    fn type_name(&self) -> &str {
        &self.type_name
    }
}

/// Writes a user type name: one length byte, then one byte per character.
pub fn write_type_name(writer: &mut Writer, name: &str) -> Result<()> {
    let bytes = crate::cursor::text_to_bytes(name)?;
    let len = u8::try_from(bytes.len()).map_err(|_| {
        CodecError::Encode(format!(
            "Type name {:?} is longer than {} characters",
            name,
            u8::MAX
        ))
    })?;
    writer.write_u8(len);
    writer.write_bytes(&bytes);
    Ok(())
}

pub fn read_type_name(reader: &mut Reader) -> Result<SmolStr> {
    let len = reader.read_u8()? as usize;
    Ok(SmolStr::new(reader.read_string(len, false)?))
}
