//! # Bit Stream Codec
//!
//! Bit-addressable read/write buffer reproducing the RakNet-derived wire
//! encoding: arbitrary bit-width fields, big-endian bit order within each
//! byte (bit 0 is the most significant bit of byte 0), byte alignment, and
//! the compressed byte-elision integer encoding used for length fields.
//!
//! ## Endianness
//! Integer writers serialize the value little-endian into a scratch array
//! and then copy it onto the stream bit by bit; integer readers reassemble
//! the extracted bytes big-endian. This asymmetry is a property of the wire
//! format and is preserved exactly: a full-width multi-byte value byte-swaps
//! on read-after-write, while write-after-read is the identity on wire
//! bytes (which is what makes the message-id echo work).
//!
//! ## Failure Modes
//! Every read that would pass the end of the buffer fails with
//! [`ProtocolError::BufferUnderrun`]; there is no silent truncation. Writes
//! grow the buffer first (amortized `Vec` growth) and cannot fail.

use crate::error::{ProtocolError, Result};

/// A growable byte buffer with a bit cursor.
///
/// The cursor only moves forward; the buffer only grows. After any read the
/// invariant `offset <= buffer.len() * 8` holds.
#[derive(Debug, Clone, Default)]
pub struct BitStream {
    buffer: Vec<u8>,
    offset: usize,
}

impl BitStream {
    /// Create an empty stream for writing.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Wrap an owned byte buffer for reading, cursor at bit 0.
    #[must_use]
    pub fn from_bytes(bytes: Vec<u8>) -> Self {
        Self {
            buffer: bytes,
            offset: 0,
        }
    }

    /// Current bit cursor position.
    #[must_use]
    pub fn bit_offset(&self) -> usize {
        self.offset
    }

    /// Number of bytes in the underlying buffer.
    #[must_use]
    pub fn byte_len(&self) -> usize {
        self.buffer.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    /// Bits left between the cursor and the end of the buffer.
    #[must_use]
    pub fn remaining_bits(&self) -> usize {
        (self.buffer.len() * 8).saturating_sub(self.offset)
    }

    /// Borrow the raw bytes accumulated so far.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.buffer
    }

    /// Consume the stream and return the raw bytes.
    #[must_use]
    pub fn into_bytes(self) -> Vec<u8> {
        self.buffer
    }

    /// Advance the cursor to the next byte boundary. No-op if aligned.
    pub fn align(&mut self) {
        self.offset = (self.offset + 7) & !7;
    }

    /// Skip `bits` without interpreting them.
    pub fn ignore_bits(&mut self, bits: usize) {
        self.offset += bits;
    }

    fn check_available(&self, needed: usize) -> Result<()> {
        let available = self.remaining_bits();
        if needed > available {
            return Err(ProtocolError::BufferUnderrun { needed, available });
        }
        Ok(())
    }

    /// Grow the buffer so that `bits` more bits fit at the cursor.
    fn reserve_bits(&mut self, bits: usize) {
        let needed_bytes = (self.offset + bits + 7) / 8;
        if needed_bytes > self.buffer.len() {
            self.buffer.resize(needed_bytes, 0);
        }
    }

    // ---- single bits ----

    pub fn read_bit(&mut self) -> Result<bool> {
        self.check_available(1)?;
        let bit = self.buffer[self.offset >> 3] & (0x80 >> (self.offset & 7)) != 0;
        self.offset += 1;
        Ok(bit)
    }

    pub fn write_bit(&mut self, on: bool) {
        self.reserve_bits(1);
        let mask = 0x80 >> (self.offset & 7);
        if on {
            self.buffer[self.offset >> 3] |= mask;
        } else {
            self.buffer[self.offset >> 3] &= !mask;
        }
        self.offset += 1;
    }

    // ---- partial bytes ----

    /// Read `width` bits (1-8) into the low bits of a byte, MSB first.
    pub fn read_partial_byte(&mut self, width: usize) -> Result<u8> {
        debug_assert!(width >= 1 && width <= 8);
        self.check_available(width)?;

        let mut value = 0u8;
        for i in 0..width {
            if self.read_bit()? {
                value |= 1 << (width - 1 - i);
            }
        }
        Ok(value)
    }

    /// Write the low `width` bits (1-8) of `value`, MSB first.
    pub fn write_partial_byte(&mut self, value: u8, width: usize) {
        debug_assert!(width >= 1 && width <= 8);
        self.reserve_bits(width);

        if width == 8 && self.offset & 7 == 0 {
            self.buffer[self.offset >> 3] = value;
            self.offset += 8;
            return;
        }
        for i in (8 - width)..8 {
            self.write_bit(value & (0x80 >> i) != 0);
        }
    }

    // ---- bit and byte spans ----

    /// Read `bit_len` bits into a fresh byte buffer. A trailing partial byte
    /// lands in the low bits of the final output byte.
    pub fn read_bits(&mut self, bit_len: usize) -> Result<Vec<u8>> {
        self.check_available(bit_len)?;

        let whole = bit_len >> 3;
        let rem = bit_len & 7;

        // Fast path: straight byte copy when everything is aligned.
        if rem == 0 && self.offset & 7 == 0 {
            let start = self.offset >> 3;
            let out = self.buffer[start..start + whole].to_vec();
            self.offset += bit_len;
            return Ok(out);
        }

        let mut out = Vec::with_capacity(whole + usize::from(rem > 0));
        for _ in 0..whole {
            out.push(self.read_partial_byte(8)?);
        }
        if rem > 0 {
            out.push(self.read_partial_byte(rem)?);
        }
        Ok(out)
    }

    pub fn read_bytes(&mut self, len: usize) -> Result<Vec<u8>> {
        self.read_bits(len << 3)
    }

    /// Write the first `bit_len` bits of `data` onto the stream.
    pub fn write_bits(&mut self, data: &[u8], bit_len: usize) {
        debug_assert!(bit_len <= data.len() * 8);

        let whole = bit_len >> 3;
        let rem = bit_len & 7;

        if rem == 0 && self.offset & 7 == 0 {
            self.reserve_bits(bit_len);
            let start = self.offset >> 3;
            self.buffer[start..start + whole].copy_from_slice(&data[..whole]);
            self.offset += bit_len;
            return;
        }

        for &byte in &data[..whole] {
            self.write_partial_byte(byte, 8);
        }
        if rem > 0 {
            self.write_partial_byte(data[whole], rem);
        }
    }

    pub fn write_bytes(&mut self, data: &[u8]) {
        self.write_bits(data, data.len() << 3);
    }

    // ---- fixed-length ASCII strings ----

    pub fn write_str(&mut self, s: &str) {
        self.write_bytes(s.as_bytes());
    }

    pub fn read_str(&mut self, len: usize) -> Result<String> {
        let bytes = self.read_bytes(len)?;
        Ok(bytes.iter().map(|&b| char::from(b & 0x7F)).collect())
    }

    // ---- integer accessors (LE scratch on write, BE reassembly on read) ----

    pub fn write_u8(&mut self, value: u8) {
        self.write_partial_byte(value, 8);
    }

    pub fn write_i8(&mut self, value: i8) {
        self.write_partial_byte(value as u8, 8);
    }

    pub fn write_u16(&mut self, value: u16) {
        self.write_bits(&value.to_le_bytes(), 16);
    }

    pub fn write_i16(&mut self, value: i16) {
        self.write_bits(&value.to_le_bytes(), 16);
    }

    pub fn write_u32(&mut self, value: u32) {
        self.write_bits(&value.to_le_bytes(), 32);
    }

    pub fn write_i32(&mut self, value: i32) {
        self.write_bits(&value.to_le_bytes(), 32);
    }

    pub fn write_f32(&mut self, value: f32) {
        self.write_bits(&value.to_le_bytes(), 32);
    }

    pub fn read_u8(&mut self) -> Result<u8> {
        self.read_partial_byte(8)
    }

    pub fn read_i8(&mut self) -> Result<i8> {
        Ok(self.read_partial_byte(8)? as i8)
    }

    pub fn read_u16(&mut self) -> Result<u16> {
        let b = self.read_bits(16)?;
        Ok(u16::from_be_bytes([b[0], b[1]]))
    }

    pub fn read_i16(&mut self) -> Result<i16> {
        let b = self.read_bits(16)?;
        Ok(i16::from_be_bytes([b[0], b[1]]))
    }

    pub fn read_u32(&mut self) -> Result<u32> {
        let b = self.read_bits(32)?;
        Ok(u32::from_be_bytes([b[0], b[1], b[2], b[3]]))
    }

    pub fn read_i32(&mut self) -> Result<i32> {
        let b = self.read_bits(32)?;
        Ok(i32::from_be_bytes([b[0], b[1], b[2], b[3]]))
    }

    pub fn read_f32(&mut self) -> Result<f32> {
        let b = self.read_bits(32)?;
        Ok(f32::from_be_bytes([b[0], b[1], b[2], b[3]]))
    }

    // ---- compressed integers ----

    /// Write a little-endian byte array with the byte-elision encoding.
    ///
    /// Walks from the most significant byte down. For each byte except the
    /// last: one control bit, `1` if the byte equals the match byte (0x00
    /// unsigned, 0xFF signed) and compression continues, `0` followed by
    /// every remaining byte written plain. The final byte gets a nibble
    /// variant: `1` plus the low 4 bits when the upper nibble also matches,
    /// else `0` plus the full 8 bits.
    pub fn write_compressed(&mut self, input_le: &[u8], unsigned: bool) {
        let byte_match: u8 = if unsigned { 0x00 } else { 0xFF };
        let mut current = input_le.len() - 1;

        while current > 0 {
            if input_le[current] == byte_match {
                self.write_bit(true);
                current -= 1;
            } else {
                self.write_bit(false);
                self.write_bits(input_le, (current + 1) << 3);
                return;
            }
        }

        let nibble_match: u8 = if unsigned { 0x00 } else { 0xF0 };
        if input_le[0] & 0xF0 == nibble_match {
            self.write_bit(true);
            self.write_partial_byte(input_le[0], 4);
        } else {
            self.write_bit(false);
            self.write_partial_byte(input_le[0], 8);
        }
    }

    /// Decode `byte_len` little-endian bytes written by [`write_compressed`],
    /// reconstructing elided bytes from the match byte/nibble.
    ///
    /// [`write_compressed`]: Self::write_compressed
    pub fn read_compressed(&mut self, byte_len: usize, unsigned: bool) -> Result<Vec<u8>> {
        let byte_match: u8 = if unsigned { 0x00 } else { 0xFF };
        let mut out = vec![0u8; byte_len];
        let mut current = byte_len - 1;

        while current > 0 {
            if self.read_bit()? {
                out[current] = byte_match;
                current -= 1;
            } else {
                let head = self.read_bits((current + 1) << 3)?;
                out[..=current].copy_from_slice(&head);
                return Ok(out);
            }
        }

        if self.read_bit()? {
            let nibble = self.read_partial_byte(4)?;
            out[0] = nibble | if unsigned { 0x00 } else { 0xF0 };
        } else {
            out[0] = self.read_partial_byte(8)?;
        }
        Ok(out)
    }

    pub fn write_compressed_u16(&mut self, value: u16) {
        self.write_compressed(&value.to_le_bytes(), true);
    }

    pub fn read_compressed_u16(&mut self) -> Result<u16> {
        let b = self.read_compressed(2, true)?;
        Ok(u16::from_le_bytes([b[0], b[1]]))
    }

    pub fn write_compressed_u32(&mut self, value: u32) {
        self.write_compressed(&value.to_le_bytes(), true);
    }

    pub fn read_compressed_u32(&mut self) -> Result<u32> {
        let b = self.read_compressed(4, true)?;
        Ok(u32::from_le_bytes([b[0], b[1], b[2], b[3]]))
    }
}
