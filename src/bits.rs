//! Bit-level reads layered over [`Reader`].
//!
//! Single-bit reads are served from a staged byte or word (the bit window)
//! fetched with the matching byte-level read. Bits are handed out
//! least-significant first. The window is dropped by any byte-level read,
//! seek or skip, and refetched when exhausted or when the requested width
//! changes.

use crate::cursor::Reader;
use crate::{CodecError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct BitWindow {
    value: u32,
    width: u32,
    consumed: u32,
}

impl BitWindow {
    fn is_exhausted(&self) -> bool {
        self.consumed >= self.width
    }
}

impl Reader {
    fn fetch_window(&mut self, width: u32) -> Result<BitWindow> {
        let value = match width {
            8 => u32::from(self.fetch::<u8>()?),
            16 => u32::from(self.fetch::<u16>()?),
            _ => self.fetch::<u32>()?,
        };
        Ok(BitWindow {
            value,
            width,
            consumed: 0,
        })
    }

    fn current_window(&mut self, width: u32) -> Result<BitWindow> {
        match self.bits {
            Some(window) if window.width == width && !window.is_exhausted() => Ok(window),
            _ => self.fetch_window(width),
        }
    }

    fn next_bit(&mut self, width: u32) -> Result<u32> {
        let window = self.current_window(width)?;
        let bit = (window.value >> window.consumed) & 1;
        self.bits = Some(BitWindow {
            consumed: window.consumed + 1,
            ..window
        });
        Ok(bit)
    }

    fn take_bits(&mut self, width: u32, count: u32) -> Result<u32> {
        if count > u32::BITS {
            return Err(CodecError::BitRange {
                requested: count,
                available: u32::BITS,
            });
        }
        let mut value = 0u32;
        for i in 0..count {
            value |= self.next_bit(width)? << i;
        }
        Ok(value)
    }

    /// Runs `f` and restores both the byte offset and the bit window afterwards.
    fn restoring<T>(&mut self, f: impl FnOnce(&mut Self) -> Result<T>) -> Result<T> {
        let offset = self.offset;
        let bits = self.bits;
        let result = f(self);
        self.offset = offset;
        self.bits = bits;
        result
    }

    fn skip_bits_with(&mut self, width: u32, count: u32) -> Result<()> {
        let start = self.offset;
        let window = self.current_window(width)?;
        let available = window.width - window.consumed;
        if count > available {
            self.offset = start;
            return Err(CodecError::BitRange {
                requested: count,
                available,
            });
        }
        self.bits = Some(BitWindow {
            consumed: window.consumed + count,
            ..window
        });
        Ok(())
    }

    /// Number of bits already consumed from the current window.
    pub fn bit_offset(&self) -> u32 {
        self.bits.map_or(0, |window| window.consumed)
    }

    pub fn read_bit8(&mut self) -> Result<bool> {
        Ok(self.next_bit(8)? == 1)
    }

    pub fn read_bit16(&mut self) -> Result<bool> {
        Ok(self.next_bit(16)? == 1)
    }

    pub fn read_bit32(&mut self) -> Result<bool> {
        Ok(self.next_bit(32)? == 1)
    }

    /// Reads `count` bits from byte windows; bit `i` lands at position `i`.
    pub fn read_bits8(&mut self, count: u32) -> Result<u32> {
        self.take_bits(8, count)
    }

    pub fn read_bits16(&mut self, count: u32) -> Result<u32> {
        self.take_bits(16, count)
    }

    pub fn read_bits32(&mut self, count: u32) -> Result<u32> {
        self.take_bits(32, count)
    }

    pub fn peek_bits8(&mut self, count: u32) -> Result<u32> {
        self.restoring(|reader| reader.take_bits(8, count))
    }

    pub fn peek_bits16(&mut self, count: u32) -> Result<u32> {
        self.restoring(|reader| reader.take_bits(16, count))
    }

    pub fn peek_bits32(&mut self, count: u32) -> Result<u32> {
        self.restoring(|reader| reader.take_bits(32, count))
    }

    /// Skips `count` bits of the current byte window.
    ///
    /// # Errors
    /// Returns [`CodecError::BitRange`] if fewer than `count` bits are left in
    /// the window.
    pub fn skip_bits8(&mut self, count: u32) -> Result<()> {
        self.skip_bits_with(8, count)
    }

    pub fn skip_bits16(&mut self, count: u32) -> Result<()> {
        self.skip_bits_with(16, count)
    }

    pub fn skip_bits32(&mut self, count: u32) -> Result<()> {
        self.skip_bits_with(32, count)
    }
}
