//! Positioned, endian-aware byte cursors.
//!
//! [`Reader`] and [`Writer`] own a byte buffer, a current offset and a fixed
//! [`Endian`] setting. Every scalar operation has an advancing form
//! (`read_*` / `write_*`) and a non-advancing form (`peek_*` / `patch_*`).
//! Array variants apply the same rule to a whole run of values: a peek leaves
//! the offset where it was before the run started.

use crate::{CodecError, Result};
use bytes::{Buf, BufMut, Bytes, BytesMut};

/// Initial size of a writer buffer when no buffer is supplied.
pub const DEFAULT_WRITER_CAPACITY: usize = 1024;
/// Number of bytes a writer buffer grows by each time it runs out of room.
pub const GROWTH_INCREMENT: usize = 1024;

/// Byte order used by a cursor. Fixed for the lifetime of the cursor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum Endian {
    #[default]
    Little,
    Big,
}

/// A fixed-width value that can be read from and written to a cursor.
///
/// Implemented for all integer widths up to 64 bits, `f32`, `f64` and `bool`.
/// Callers guarantee that `src`/`dst` hold at least [`Scalar::SIZE`] bytes.
pub trait Scalar: Sized + Copy {
    /// Width of the value on the wire, in bytes.
    const SIZE: usize;

    /// Decodes a value from the first `SIZE` bytes of `src`.
    fn read_from(src: &[u8], endian: Endian) -> Self;

    /// Encodes the value into the first `SIZE` bytes of `dst`.
    fn write_to(self, dst: &mut [u8], endian: Endian);
}

macro_rules! impl_scalar {
    ($t:ty, $get_le:ident, $get_be:ident, $put_le:ident, $put_be:ident) => {
        impl Scalar for $t {
            const SIZE: usize = std::mem::size_of::<$t>();

            #[inline]
            fn read_from(mut src: &[u8], endian: Endian) -> Self {
                match endian {
                    Endian::Little => src.$get_le(),
                    Endian::Big => src.$get_be(),
                }
            }

            #[inline]
            fn write_to(self, mut dst: &mut [u8], endian: Endian) {
                match endian {
                    Endian::Little => dst.$put_le(self),
                    Endian::Big => dst.$put_be(self),
                }
            }
        }
    };
}

impl_scalar!(u8, get_u8, get_u8, put_u8, put_u8);
impl_scalar!(i8, get_i8, get_i8, put_i8, put_i8);
impl_scalar!(u16, get_u16_le, get_u16, put_u16_le, put_u16);
impl_scalar!(i16, get_i16_le, get_i16, put_i16_le, put_i16);
impl_scalar!(u32, get_u32_le, get_u32, put_u32_le, put_u32);
impl_scalar!(i32, get_i32_le, get_i32, put_i32_le, put_i32);
impl_scalar!(u64, get_u64_le, get_u64, put_u64_le, put_u64);
impl_scalar!(i64, get_i64_le, get_i64, put_i64_le, put_i64);
impl_scalar!(f32, get_f32_le, get_f32, put_f32_le, put_f32);
impl_scalar!(f64, get_f64_le, get_f64, put_f64_le, put_f64);

/// A boolean is one byte; only the least-significant bit carries the value.
impl Scalar for bool {
    const SIZE: usize = 1;

    #[inline]
    fn read_from(src: &[u8], _endian: Endian) -> Self {
        src[0] & 1 == 1
    }

    #[inline]
    fn write_to(self, dst: &mut [u8], _endian: Endian) {
        dst[0] = u8::from(self);
    }
}

/// Converts a character to its one-byte wire form.
///
/// # Errors
/// Returns [`CodecError::Encode`] for code points above U+00FF.
pub fn char_to_byte(c: char) -> Result<u8> {
    u8::try_from(u32::from(c)).map_err(|_| {
        CodecError::Encode(format!(
            "Character {:?} (U+{:04X}) does not fit in a single byte",
            c,
            u32::from(c)
        ))
    })
}

/// Encodes text as one byte per character.
pub fn text_to_bytes(text: &str) -> Result<Vec<u8>> {
    text.chars().map(char_to_byte).collect()
}

/// Decodes one-byte-per-character text, optionally trimming trailing whitespace.
pub fn bytes_to_text(bytes: &[u8], trim: bool) -> String {
    let text: String = bytes.iter().copied().map(char::from).collect();
    if trim {
        text.trim_end().to_string()
    } else {
        text
    }
}

/// Construction options shared by [`Reader`] and [`Writer`].
///
/// Unset fields fall back to role-specific defaults: a reader starts with an
/// empty buffer, a writer with [`DEFAULT_WRITER_CAPACITY`] zero bytes.
#[derive(Debug, Clone, Default)]
pub struct CursorOptions {
    pub buffer: Option<Bytes>,
    pub offset: usize,
    pub length: Option<usize>,
    pub endian: Endian,
}

impl CursorOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn buffer(mut self, buffer: impl Into<Bytes>) -> Self {
        self.buffer = Some(buffer.into());
        self
    }

    pub fn offset(mut self, offset: usize) -> Self {
        self.offset = offset;
        self
    }

    pub fn length(mut self, length: usize) -> Self {
        self.length = Some(length);
        self
    }

    pub fn endian(mut self, endian: Endian) -> Self {
        self.endian = endian;
        self
    }

    /// Validates the options and returns `(buffer, offset, length)`.
    fn resolve(self, default_buffer: impl FnOnce() -> Bytes) -> Result<(Bytes, usize, usize)> {
        let buffer = self.buffer.unwrap_or_else(default_buffer);
        let length = self.length.unwrap_or(buffer.len());
        if length > buffer.len() {
            return Err(CodecError::Config(format!(
                "length {} exceeds buffer size {}",
                length,
                buffer.len()
            )));
        }
        if self.offset > length {
            return Err(CodecError::Config(format!(
                "offset {} exceeds length {}",
                self.offset, length
            )));
        }
        Ok((buffer, self.offset, length))
    }
}

/// Reading half of the byte cursor.
///
/// Reads never pass the declared length; an attempt to do so returns
/// [`CodecError::InsufficientData`] and leaves the cursor untouched.
#[derive(Debug, Clone)]
pub struct Reader {
    pub(crate) buffer: Bytes,
    pub(crate) offset: usize,
    pub(crate) length: usize,
    pub(crate) endian: Endian,
    pub(crate) bits: Option<crate::bits::BitWindow>,
}

impl Reader {
    /// Creates a reader from validated options.
    ///
    /// # Errors
    /// Returns [`CodecError::Config`] if the declared length exceeds the
    /// buffer or the offset exceeds the declared length.
    pub fn new(options: CursorOptions) -> Result<Self> {
        let endian = options.endian;
        let (buffer, offset, length) = options.resolve(Bytes::new)?;
        Ok(Self {
            buffer,
            offset,
            length,
            endian,
            bits: None,
        })
    }

    /// Creates a little-endian reader over the whole of `bytes`.
    pub fn from_bytes(bytes: impl Into<Bytes>) -> Self {
        Self::with_endian(bytes, Endian::Little)
    }

    /// Creates a reader over the whole of `bytes` with the given byte order.
    pub fn with_endian(bytes: impl Into<Bytes>, endian: Endian) -> Self {
        let buffer = bytes.into();
        let length = buffer.len();
        Self {
            buffer,
            offset: 0,
            length,
            endian,
            bits: None,
        }
    }

    pub fn endian(&self) -> Endian {
        self.endian
    }

    pub fn offset(&self) -> usize {
        self.offset
    }

    /// Declared usable length.
    pub fn len(&self) -> usize {
        self.length
    }

    pub fn is_empty(&self) -> bool {
        self.length == 0
    }

    pub fn remaining(&self) -> usize {
        self.length - self.offset
    }

    /// True when the offset has reached the declared length.
    pub fn is_eof(&self) -> bool {
        self.offset == self.length
    }

    /// Moves to an absolute offset.
    pub fn seek(&mut self, offset: usize) -> Result<()> {
        if offset > self.length {
            return Err(CodecError::OutOfBounds {
                offset,
                length: self.length,
            });
        }
        self.bits = None;
        self.offset = offset;
        Ok(())
    }

    /// Moves forward by `count` bytes.
    pub fn skip(&mut self, count: usize) -> Result<()> {
        self.ensure(self.offset, count)?;
        self.bits = None;
        self.offset += count;
        Ok(())
    }

    #[inline]
    fn ensure(&self, at: usize, needed: usize) -> Result<()> {
        let remaining = self.length.saturating_sub(at);
        if remaining < needed {
            return Err(CodecError::InsufficientData { needed, remaining });
        }
        Ok(())
    }

    #[inline]
    fn scalar_at<T: Scalar>(&self, at: usize) -> Result<T> {
        self.ensure(at, T::SIZE)?;
        Ok(T::read_from(&self.buffer[at..at + T::SIZE], self.endian))
    }

    /// Reads a scalar and advances, leaving any bit window in place.
    #[inline]
    pub(crate) fn fetch<T: Scalar>(&mut self) -> Result<T> {
        let value = self.scalar_at::<T>(self.offset)?;
        self.offset += T::SIZE;
        Ok(value)
    }

    /// Reads a scalar and advances past it.
    pub fn read<T: Scalar>(&mut self) -> Result<T> {
        self.bits = None;
        self.fetch()
    }

    /// Reads a scalar without moving the offset.
    pub fn peek<T: Scalar>(&self) -> Result<T> {
        self.scalar_at(self.offset)
    }

    /// Reads `count` consecutive scalars and advances past all of them.
    pub fn read_array<T: Scalar>(&mut self, count: usize) -> Result<Vec<T>> {
        let values = self.peek_array(count)?;
        self.bits = None;
        self.offset += count * T::SIZE;
        Ok(values)
    }

    /// Reads `count` consecutive scalars without moving the offset.
    pub fn peek_array<T: Scalar>(&self, count: usize) -> Result<Vec<T>> {
        let total = count
            .checked_mul(T::SIZE)
            .ok_or(CodecError::InsufficientData {
                needed: usize::MAX,
                remaining: self.remaining(),
            })?;
        self.ensure(self.offset, total)?;
        Ok((0..count)
            .map(|i| {
                let at = self.offset + i * T::SIZE;
                T::read_from(&self.buffer[at..at + T::SIZE], self.endian)
            })
            .collect())
    }

    /// Reads one byte as a character code point.
    pub fn read_char(&mut self) -> Result<char> {
        self.read::<u8>().map(char::from)
    }

    pub fn peek_char(&self) -> Result<char> {
        self.peek::<u8>().map(char::from)
    }

    /// Reads `len` one-byte characters.
    pub fn read_string(&mut self, len: usize, trim: bool) -> Result<String> {
        let text = self.peek_string(len, trim)?;
        self.bits = None;
        self.offset += len;
        Ok(text)
    }

    pub fn peek_string(&self, len: usize, trim: bool) -> Result<String> {
        self.ensure(self.offset, len)?;
        Ok(bytes_to_text(
            &self.buffer[self.offset..self.offset + len],
            trim,
        ))
    }

    /// Reads a `u32` character count followed by that many characters.
    pub fn read_prefixed_string(&mut self) -> Result<String> {
        let start = self.offset;
        let len = self.read::<u32>()? as usize;
        match self.read_string(len, false) {
            Ok(text) => Ok(text),
            Err(e) => {
                self.offset = start;
                Err(e)
            }
        }
    }

    /// Returns the next `count` bytes and advances past them.
    ///
    /// The returned [`Bytes`] shares storage with the reader; it is immutable,
    /// so later cursor movement never affects it.
    pub fn read_bytes(&mut self, count: usize) -> Result<Bytes> {
        let bytes = self.peek_bytes(count)?;
        self.bits = None;
        self.offset += count;
        Ok(bytes)
    }

    pub fn peek_bytes(&self, count: usize) -> Result<Bytes> {
        self.ensure(self.offset, count)?;
        Ok(self.buffer.slice(self.offset..self.offset + count))
    }
}

macro_rules! reader_accessors {
    ($($t:ty => $read:ident, $peek:ident, $read_array:ident, $peek_array:ident;)*) => {
        impl Reader {
            $(
                pub fn $read(&mut self) -> Result<$t> {
                    self.read::<$t>()
                }

                pub fn $peek(&self) -> Result<$t> {
                    self.peek::<$t>()
                }

                pub fn $read_array(&mut self, count: usize) -> Result<Vec<$t>> {
                    self.read_array::<$t>(count)
                }

                pub fn $peek_array(&self, count: usize) -> Result<Vec<$t>> {
                    self.peek_array::<$t>(count)
                }
            )*
        }
    };
}

reader_accessors! {
    u8 => read_u8, peek_u8, read_u8_array, peek_u8_array;
    i8 => read_i8, peek_i8, read_i8_array, peek_i8_array;
    u16 => read_u16, peek_u16, read_u16_array, peek_u16_array;
    i16 => read_i16, peek_i16, read_i16_array, peek_i16_array;
    u32 => read_u32, peek_u32, read_u32_array, peek_u32_array;
    i32 => read_i32, peek_i32, read_i32_array, peek_i32_array;
    u64 => read_u64, peek_u64, read_u64_array, peek_u64_array;
    i64 => read_i64, peek_i64, read_i64_array, peek_i64_array;
    f32 => read_f32, peek_f32, read_f32_array, peek_f32_array;
    f64 => read_f64, peek_f64, read_f64_array, peek_f64_array;
    bool => read_bool, peek_bool, read_bool_array, peek_bool_array;
}

/// Writing half of the byte cursor.
///
/// The buffer grows in [`GROWTH_INCREMENT`] steps whenever a write would pass
/// its end. Growth keeps every byte already written at its position.
#[derive(Debug)]
pub struct Writer {
    buffer: BytesMut,
    offset: usize,
    endian: Endian,
    growth: usize,
}

impl Default for Writer {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_WRITER_CAPACITY, Endian::Little)
    }
}

impl Writer {
    /// Creates a writer from validated options.
    ///
    /// A supplied buffer is copied; the declared length truncates it.
    pub fn new(options: CursorOptions) -> Result<Self> {
        let endian = options.endian;
        let (buffer, offset, length) =
            options.resolve(|| Bytes::from(vec![0u8; DEFAULT_WRITER_CAPACITY]))?;
        Ok(Self {
            buffer: BytesMut::from(&buffer[..length]),
            offset,
            endian,
            growth: GROWTH_INCREMENT,
        })
    }

    /// Creates a writer with `capacity` zeroed bytes.
    pub fn with_capacity(capacity: usize, endian: Endian) -> Self {
        let mut buffer = BytesMut::with_capacity(capacity);
        buffer.resize(capacity, 0);
        Self {
            buffer,
            offset: 0,
            endian,
            growth: GROWTH_INCREMENT,
        }
    }

    /// Sets the growth step. A step of zero is treated as one byte.
    pub fn with_growth(mut self, growth: usize) -> Self {
        self.growth = growth.max(1);
        self
    }

    pub fn endian(&self) -> Endian {
        self.endian
    }

    pub fn offset(&self) -> usize {
        self.offset
    }

    /// Current allocated size, including bytes not yet written.
    pub fn capacity(&self) -> usize {
        self.buffer.len()
    }

    /// Moves to an absolute offset, growing the buffer if needed.
    pub fn seek(&mut self, offset: usize) {
        self.offset = offset;
        self.reserve(0);
    }

    /// Moves forward by `count` bytes. Skipped bytes keep their previous contents.
    pub fn skip(&mut self, count: usize) {
        self.seek(self.offset + count);
    }

    fn reserve(&mut self, needed: usize) {
        let target = self.offset + needed;
        if target <= self.buffer.len() {
            return;
        }
        let mut len = self.buffer.len();
        while len < target {
            len += self.growth;
        }
        self.buffer.resize(len, 0);
    }

    /// Writes a scalar and advances past it.
    pub fn write<T: Scalar>(&mut self, value: T) {
        self.patch(value);
        self.offset += T::SIZE;
    }

    /// Writes a scalar at the current offset without advancing.
    pub fn patch<T: Scalar>(&mut self, value: T) {
        self.reserve(T::SIZE);
        value.write_to(
            &mut self.buffer[self.offset..self.offset + T::SIZE],
            self.endian,
        );
    }

    pub fn write_array<T: Scalar>(&mut self, values: &[T]) {
        for value in values {
            self.write(*value);
        }
    }

    /// Writes a run of scalars, then restores the offset to where the run began.
    pub fn patch_array<T: Scalar>(&mut self, values: &[T]) {
        let start = self.offset;
        self.write_array(values);
        self.offset = start;
    }

    pub fn write_char(&mut self, c: char) -> Result<()> {
        let byte = char_to_byte(c)?;
        self.write(byte);
        Ok(())
    }

    /// Writes the characters of `text`, one byte each, with no length prefix.
    pub fn write_string(&mut self, text: &str) -> Result<()> {
        let bytes = text_to_bytes(text)?;
        self.write_bytes(&bytes);
        Ok(())
    }

    /// Writes a `u32` character count followed by the characters.
    pub fn write_prefixed_string(&mut self, text: &str) -> Result<()> {
        let bytes = text_to_bytes(text)?;
        let len = u32::try_from(bytes.len()).map_err(|_| {
            CodecError::Encode(format!("String of {} characters is too long", bytes.len()))
        })?;
        self.write(len);
        self.write_bytes(&bytes);
        Ok(())
    }

    pub fn write_bytes(&mut self, bytes: &[u8]) {
        self.reserve(bytes.len());
        self.buffer[self.offset..self.offset + bytes.len()].copy_from_slice(bytes);
        self.offset += bytes.len();
    }

    /// The bytes from the start of the buffer up to the current offset.
    pub fn as_slice(&self) -> &[u8] {
        &self.buffer[..self.offset]
    }

    /// Freezes the written range; over-allocated capacity is dropped.
    pub fn into_bytes(mut self) -> Bytes {
        self.buffer.truncate(self.offset);
        self.buffer.freeze()
    }
}

macro_rules! writer_accessors {
    ($($t:ty => $write:ident, $patch:ident, $write_array:ident, $patch_array:ident;)*) => {
        impl Writer {
            $(
                pub fn $write(&mut self, value: $t) {
                    self.write::<$t>(value)
                }

                pub fn $patch(&mut self, value: $t) {
                    self.patch::<$t>(value)
                }

                pub fn $write_array(&mut self, values: &[$t]) {
                    self.write_array::<$t>(values)
                }

                pub fn $patch_array(&mut self, values: &[$t]) {
                    self.patch_array::<$t>(values)
                }
            )*
        }
    };
}

writer_accessors! {
    u8 => write_u8, patch_u8, write_u8_array, patch_u8_array;
    i8 => write_i8, patch_i8, write_i8_array, patch_i8_array;
    u16 => write_u16, patch_u16, write_u16_array, patch_u16_array;
    i16 => write_i16, patch_i16, write_i16_array, patch_i16_array;
    u32 => write_u32, patch_u32, write_u32_array, patch_u32_array;
    i32 => write_i32, patch_i32, write_i32_array, patch_i32_array;
    u64 => write_u64, patch_u64, write_u64_array, patch_u64_array;
    i64 => write_i64, patch_i64, write_i64_array, patch_i64_array;
    f32 => write_f32, patch_f32, write_f32_array, patch_f32_array;
    f64 => write_f64, patch_f64, write_f64_array, patch_f64_array;
    bool => write_bool, patch_bool, write_bool_array, patch_bool_array;
}
