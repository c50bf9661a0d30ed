/// Cursor-based reader over a block of register data
use crate::sensor::error::CodecError;
use crate::sensor::format::{decode, decode_parts, FixedPointFormat};

/// An enumerated field or setting with a single-byte wire encoding.
pub trait WireEnum: Sized + Copy {
    /// Human readable name of the enumeration, used in error messages.
    const KIND: &'static str;

    fn from_byte(byte: u8) -> Option<Self>;

    fn to_byte(self) -> u8;

    /// Symbolic name of the variant, as persisted.
    fn name(self) -> &'static str;
}

/// Read cursor over one block of data read from the sensor.
///
/// Every successful read advances the cursor by exactly the width of the
/// field. A failed read leaves the cursor where it was.
#[derive(Debug)]
pub struct Frame<'a> {
    data: &'a [u8],
    cursor: usize,
}

impl<'a> Frame<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, cursor: 0 }
    }

    pub fn position(&self) -> usize {
        self.cursor
    }

    pub fn remaining(&self) -> usize {
        self.data.len().saturating_sub(self.cursor)
    }

    fn peek(&self, width: usize) -> Result<&'a [u8], CodecError> {
        self.data
            .get(self.cursor..)
            .and_then(|rest| rest.get(..width))
            .ok_or(CodecError::BufferUnderrun {
                needed: width,
                remaining: self.remaining(),
            })
    }

    /// Read one fixed-point value.
    pub fn read_single(&mut self, format: FixedPointFormat) -> Result<f64, CodecError> {
        let bytes = self.peek(format.width())?;
        let value = decode(&format, bytes)?;
        self.cursor += bytes.len();
        Ok(value)
    }

    /// Read one byte and map it to a variant of `V`.
    pub fn read_enum<V: WireEnum>(&mut self) -> Result<V, CodecError> {
        let byte = self.peek(1)?[0];
        let variant = V::from_byte(byte).ok_or(CodecError::UnknownVariant {
            kind: V::KIND,
            byte,
        })?;
        self.cursor += 1;
        Ok(variant)
    }

    /// Read `N` values stored as a structure of arrays.
    ///
    /// The region holds the `N` integer sub-blocks back to back, followed by
    /// the `N` fractional bytes (absent when the format has no fraction).
    /// Value `i` pairs integer sub-block `i` with fractional byte `i`.
    pub fn read_striped<const N: usize>(
        &mut self,
        format: FixedPointFormat,
    ) -> Result<[f64; N], CodecError> {
        format.check()?;
        let region = self.peek(format.width() * N)?;
        let (integers, fractions) = region.split_at(format.integer_bytes * N);

        let mut values = [0.0; N];
        for (index, (value, integer)) in values
            .iter_mut()
            .zip(integers.chunks_exact(format.integer_bytes))
            .enumerate()
        {
            *value = decode_parts(&format, integer, fractions.get(index).copied());
        }

        self.cursor += region.len();
        Ok(values)
    }
}
