//! The [`Serializer`] orchestrator and the [`Converter`] extension point.

use crate::core::{
    read_type_name, write_type_name, ArrayConverter, BooleanConverter, DateConverter,
    NullConverter, NumberConverter, ObjectConverter, RegExpConverter, StringConverter, Tag,
    UndefinedConverter, UserObjectConverter,
};
use crate::cursor::{Endian, Reader, Writer, DEFAULT_WRITER_CAPACITY, GROWTH_INCREMENT};
use crate::record::{Record, RecordConverter};
use crate::value::Value;
use crate::{CodecError, Result};
use ahash::AHashMap;
use bytes::Bytes;
use smol_str::SmolStr;
use std::cell::RefCell;
use std::collections::BTreeMap;
use std::fmt;
use std::rc::Rc;
use tracing::{debug, trace};

/// Encodes and decodes the payload of one value kind.
///
/// A converter never writes or reads the leading type tag; the serializer
/// owns that. Composite converters call back into the serializer they are
/// given for nested values, so each call works against whichever serializer
/// is driving it.
pub trait Converter {
    /// Writes the payload of `value`.
    fn encode(&self, serializer: &Serializer, writer: &mut Writer, value: &Value) -> Result<()>;

    /// Reads exactly the bytes a matching `encode` wrote and rebuilds the value.
    fn decode(&self, serializer: &Serializer, reader: &mut Reader) -> Result<Value>;
}

/// A converter for a named user-defined type.
pub trait TypeConverter: Converter {
    /// The type name this converter is registered under.
    fn type_name(&self) -> &str;
}

/// Serializer settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct SerializerOptions {
    pub endian: Endian,
    /// Writer buffer size at the start of each `serialize` call.
    pub initial_capacity: usize,
    /// Bytes added each time the writer buffer runs out.
    pub growth: usize,
}

impl Default for SerializerOptions {
    fn default() -> Self {
        Self {
            endian: Endian::Little,
            initial_capacity: DEFAULT_WRITER_CAPACITY,
            growth: GROWTH_INCREMENT,
        }
    }
}

/// Self-describing binary serializer for [`Value`]s.
///
/// Built-in kinds are handled by a fixed converter table. User-defined kinds
/// are looked up by type name in a registry owned by this instance. The
/// registry is the only state shared between calls, and it is not
/// synchronized: a `Serializer` is neither `Send` nor `Sync`.
///
/// # Example
/// ```rust
/// use polybin::{Serializer, Value};
///
/// let serializer = Serializer::new();
/// let bytes = serializer.serialize(&Value::from("hi")).unwrap();
/// assert_eq!(&bytes[..], &[4, 2, 0, 0, 0, b'h', b'i']);
/// assert_eq!(serializer.deserialize(&bytes).unwrap(), Value::from("hi"));
/// ```
pub struct Serializer {
    options: SerializerOptions,
    builtins: BTreeMap<Tag, Box<dyn Converter>>,
    user: RefCell<AHashMap<SmolStr, Rc<dyn Converter>>>,
}

impl Default for Serializer {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Serializer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let user = self.user.borrow();
        let mut names: Vec<&str> = user.keys().map(SmolStr::as_str).collect();
        names.sort_unstable();
        f.debug_struct("Serializer")
            .field("options", &self.options)
            .field("builtins", &self.builtins.keys().collect::<Vec<_>>())
            .field("user", &names)
            .finish()
    }
}

impl Serializer {
    pub fn new() -> Self {
        Self::with_options(SerializerOptions::default())
    }

    pub fn with_options(options: SerializerOptions) -> Self {
        let mut builtins: BTreeMap<Tag, Box<dyn Converter>> = BTreeMap::new();
        builtins.insert(Tag::Null, Box::new(NullConverter));
        builtins.insert(Tag::Undefined, Box::new(UndefinedConverter));
        builtins.insert(Tag::Boolean, Box::new(BooleanConverter));
        builtins.insert(Tag::Number, Box::new(NumberConverter));
        builtins.insert(Tag::String, Box::new(StringConverter));
        builtins.insert(Tag::Date, Box::new(DateConverter));
        builtins.insert(Tag::RegExp, Box::new(RegExpConverter));
        builtins.insert(Tag::Array, Box::new(ArrayConverter));
        builtins.insert(Tag::Object, Box::new(ObjectConverter));
        Self {
            options,
            builtins,
            user: RefCell::new(AHashMap::new()),
        }
    }

    pub fn options(&self) -> &SerializerOptions {
        &self.options
    }

    /// Encodes `value` and returns exactly the bytes written.
    ///
    /// # Errors
    /// Fails if some nested value cannot be encoded: a RegExp, a character
    /// above U+00FF, or an object with more than 255 serializable properties.
    pub fn serialize(&self, value: &Value) -> Result<Bytes> {
        let mut writer = Writer::with_capacity(self.options.initial_capacity, self.options.endian)
            .with_growth(self.options.growth);
        self.encode_value(&mut writer, value)?;
        let bytes = writer.into_bytes();
        trace!(tag = ?value.tag(), len = bytes.len(), "serialized value");
        Ok(bytes)
    }

    /// Decodes one value from the start of `bytes`.
    ///
    /// # Errors
    /// Returns [`CodecError::Empty`] for an empty input, and
    /// [`CodecError::NoConverter`] for a user type name with no converter.
    pub fn deserialize(&self, bytes: &[u8]) -> Result<Value> {
        if bytes.is_empty() {
            return Err(CodecError::Empty);
        }
        let mut reader = Reader::with_endian(Bytes::copy_from_slice(bytes), self.options.endian);
        let value = self.decode_value(&mut reader)?;
        trace!(tag = ?value.tag(), consumed = reader.offset(), "deserialized value");
        Ok(value)
    }

    /// Writes `value` as a full unit: tag byte, then payload.
    ///
    /// User-defined values also carry their type name between tag and payload.
    pub fn encode_value(&self, writer: &mut Writer, value: &Value) -> Result<()> {
        let tag = value.tag();
        writer.write_u8(tag.into());
        match value {
            Value::User(user) => {
                write_type_name(writer, user.type_name())?;
                let converter = self.user_converter_or_insert(user.type_name());
                converter.encode(self, writer, value)
            }
            _ => self.builtin(tag)?.encode(self, writer, value),
        }
    }

    /// Reads one full unit written by [`Serializer::encode_value`].
    pub fn decode_value(&self, reader: &mut Reader) -> Result<Value> {
        let tag = Tag::try_from(reader.read_u8()?)?;
        match tag {
            Tag::UserDefined => {
                let name = read_type_name(reader)?;
                let converter = self
                    .user_converter(&name)
                    .ok_or_else(|| CodecError::NoConverter {
                        name: name.to_string(),
                    })?;
                converter.decode(self, reader)
            }
            _ => self.builtin(tag)?.decode(self, reader),
        }
    }

    fn builtin(&self, tag: Tag) -> Result<&dyn Converter> {
        self.builtins
            .get(&tag)
            .map(|converter| &**converter)
            .ok_or_else(|| CodecError::Decode(format!("No built-in converter for {:?}", tag)))
    }

    fn user_converter(&self, name: &str) -> Option<Rc<dyn Converter>> {
        self.user.borrow().get(name).cloned()
    }

    fn user_converter_or_insert(&self, name: &str) -> Rc<dyn Converter> {
        if let Some(converter) = self.user_converter(name) {
            return converter;
        }
        debug!(type_name = name, "creating fallback converter");
        let converter: Rc<dyn Converter> = Rc::new(UserObjectConverter::new(name));
        self.user
            .borrow_mut()
            .insert(SmolStr::new(name), Rc::clone(&converter));
        converter
    }

    /// Registers `converter` under its type name, returning any converter it replaces.
    pub fn add_converter<C: TypeConverter + 'static>(
        &self,
        converter: C,
    ) -> Option<Rc<dyn Converter>> {
        let name = SmolStr::new(converter.type_name());
        debug!(type_name = %name, "registering converter");
        self.user.borrow_mut().insert(name, Rc::new(converter))
    }

    /// Unregisters the converter for `type_name`, including a lazily created one.
    pub fn remove_converter(&self, type_name: &str) -> Option<Rc<dyn Converter>> {
        let removed = self.user.borrow_mut().remove(type_name);
        if removed.is_some() {
            debug!(type_name, "removed converter");
        }
        removed
    }

    pub fn has_converter(&self, type_name: &str) -> bool {
        self.user.borrow().contains_key(type_name)
    }

    /// Registers a [`RecordConverter`] for `T`.
    pub fn register<T: Record + 'static>(&self) -> Option<Rc<dyn Converter>> {
        self.add_converter(RecordConverter::<T>::new())
    }
}
