//! # polybin
//!
//! A self-describing binary serializer for dynamic values.
//!
//! - Positioned, endian-aware byte cursors ([`Reader`], [`Writer`]) with peek
//!   variants for every read and bit-level access on top of byte access
//! - A closed set of built-in kinds (null, undefined, boolean, number, string,
//!   date, regexp, array, object), each written as a one-byte tag and a payload
//! - An open set of user-defined kinds, resolved by type name against a
//!   per-[`Serializer`] converter registry
//! - Typed user kinds through `#[derive(Record)]`
//!
//! ## Wire format
//!
//! ```text
//! value    := tag:u8 payload
//! Null, Undefined := (empty)
//! Boolean  := u8                      (least-significant bit)
//! Number   := f64
//! String   := len:u32 len*u8
//! Date     := value                   (String unit of the RFC 3339 text)
//! Array    := count:u32 count*value
//! Object   := count:u8 count*(keylen:u32 keylen*u8 value)
//! User     := namelen:u8 namelen*u8 payload-of-resolved-converter
//! ```
//!
//! Multi-byte fields are little-endian unless the serializer is configured
//! otherwise. Characters are one byte each; code points above U+00FF cannot
//! be encoded.
//!
//! ## Attribute Macros
//!
//! `#[derive(Record)]` accepts:
//!
//! - `#[polybin(name = "Name")]` on the struct: wire type name (defaults to the struct name).
//! - `#[polybin(rename = "key")]`: property key for a field.
//! - `#[polybin(readonly)]`: property is non-writable, so it is not written; decodes to `Default::default()`.
//! - `#[polybin(hidden)]`: property is non-enumerable, so it is not written; decodes to `Default::default()`.
//!
//! ## Feature Flags
//!
//! - `serde_json`: conversions between [`Value`] and `serde_json::Value`.
//! - `serde`: `Serialize`/`Deserialize` for [`Endian`] and [`SerializerOptions`].

mod bits;
pub mod core;
pub mod cursor;
mod features;
pub mod record;
pub mod serializer;
pub mod value;

pub use crate::core::Tag;
pub use cursor::{CursorOptions, Endian, Reader, Scalar, Writer};
pub use polybin_derive::Record;
pub use record::{FromValue, Record, RecordConverter, ToValue};
pub use serializer::{Converter, Serializer, SerializerOptions, TypeConverter};
pub use value::{Object, Property, PropertyFlags, RegExp, UserObject, Value};

use bytes::Bytes;

/// Errors that can occur while reading, writing, encoding or decoding.
#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    /// Cursor options were inconsistent (offset or length out of range).
    #[error("Invalid cursor configuration: {0}")]
    Config(String),
    /// The value could not be encoded.
    #[error("Encode error: {0}")]
    Encode(String),
    /// The bytes could not be decoded into a value.
    #[error("Decode error: {0}")]
    Decode(String),
    /// The operation has no implementation (RegExp encoding).
    #[error("Not implemented: {0}")]
    NotImplemented(&'static str),
    /// A user-defined type name has no registered converter.
    #[error("No appropriate converter for user-defined type {name:?}")]
    NoConverter { name: String },
    /// A read would pass the declared length.
    #[error("Insufficient data in buffer: needed {needed} bytes, {remaining} remaining")]
    InsufficientData { needed: usize, remaining: usize },
    /// A seek target lies past the declared length.
    #[error("Offset {offset} is out of bounds for length {length}")]
    OutOfBounds { offset: usize, length: usize },
    /// A bit operation asked for more bits than the window holds.
    #[error("Bit range error: requested {requested} bits, {available} available")]
    BitRange { requested: u32, available: u32 },
    /// `deserialize` was handed no bytes.
    #[error("Nothing to decode")]
    Empty,
}

/// The result type used throughout this crate.
pub type Result<T> = std::result::Result<T, CodecError>;

thread_local! {
    static DEFAULT_SERIALIZER: Serializer = Serializer::new();
}

/// Runs `f` with this thread's default serializer.
///
/// Converters registered here are visible to [`serialize`] and [`deserialize`]
/// on the same thread.
///
/// # Example
/// ```rust
/// use polybin::{with_default, Record};
///
/// #[derive(Record)]
/// struct Tick {
///     frame: u32,
/// }
///
/// with_default(|serializer| serializer.register::<Tick>());
/// assert!(with_default(|serializer| serializer.has_converter("Tick")));
/// ```
pub fn with_default<R>(f: impl FnOnce(&Serializer) -> R) -> R {
    DEFAULT_SERIALIZER.with(f)
}

/// Serializes `value` with this thread's default serializer.
///
/// # Example
/// ```rust
/// use polybin::{serialize, deserialize, Value};
///
/// let value = Value::Array(vec![Value::from(1.0), Value::from("a")]);
/// let bytes = serialize(&value).unwrap();
/// assert_eq!(deserialize(&bytes).unwrap(), value);
/// ```
pub fn serialize(value: &Value) -> Result<Bytes> {
    with_default(|serializer| serializer.serialize(value))
}

/// Deserializes one value with this thread's default serializer.
pub fn deserialize(bytes: &[u8]) -> Result<Value> {
    with_default(|serializer| serializer.deserialize(bytes))
}
