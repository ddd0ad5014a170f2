//! This module contains the pure, stateless kernels for LEB128 (Little-Endian
//! Base 128) variable-length integer encoding and decoding.
//!
//! The routing core uses it for its bookkeeping arrays (dispatch tags, segment
//! sizes and cluster member sizes): they are mostly small numbers, so one byte
//! per value is the common case. Fully panic-free.

use num_traits::{PrimInt, Unsigned};
use std::io::Cursor;

use crate::error::tambakError;

//==================================================================================
// 1. Public API for Single-Value Operations
//==================================================================================

/// Encodes a single unsigned integer into a LEB128 byte sequence, writing to a buffer.
pub fn encode_one<T>(value: T, buffer: &mut Vec<u8>) -> Result<(), tambakError>
where
    T: PrimInt + Unsigned,
{
    let zero = T::zero();
    let seven_bit_mask = T::from(0x7F).ok_or_else(|| {
        tambakError::Leb128DecodeError("Failed to create 7-bit mask for type".to_string())
    })?;

    let mut current_value = value;
    loop {
        let low_bits = (current_value & seven_bit_mask).to_u8().ok_or_else(|| {
            tambakError::Leb128DecodeError("Failed to convert generic integer to u8".to_string())
        })?;
        current_value = current_value >> 7;

        if current_value == zero {
            buffer.push(low_bits);
            return Ok(());
        }
        buffer.push(low_bits | 0x80);
    }
}

/// Decodes a single unsigned integer from a LEB128 byte stream cursor.
pub fn decode_one<T>(cursor: &mut Cursor<&[u8]>) -> Result<T, tambakError>
where
    T: PrimInt + Unsigned,
{
    let mut result = T::zero();
    let mut shift = 0;
    let total_bits = std::mem::size_of::<T>() * 8;

    loop {
        let pos = cursor.position() as usize;
        let byte = *cursor.get_ref().get(pos).ok_or_else(|| {
            tambakError::Leb128DecodeError("Unexpected end of buffer".to_string())
        })?;
        cursor.set_position((pos + 1) as u64);

        if shift >= total_bits {
            return Err(tambakError::Leb128DecodeError(
                "Integer overflow during decoding".to_string(),
            ));
        }

        let seven_bit_payload = T::from(byte & 0x7F).ok_or_else(|| {
            tambakError::Leb128DecodeError("Failed to create 7-bit payload from byte".to_string())
        })?;

        // The last group may only use the bits the type still has room for.
        if shift + 7 > total_bits && ((byte & 0x7F) >> (total_bits - shift)) > 0 {
            return Err(tambakError::Leb128DecodeError(
                "Integer overflow during decoding".to_string(),
            ));
        }

        result = result | (seven_bit_payload << shift);

        if byte & 0x80 == 0 {
            return Ok(result);
        }
        shift += 7;
    }
}

//==================================================================================
// 2. Public API for Slice Operations
//==================================================================================

/// Encodes a whole slice into a fresh buffer.
pub fn encode<T>(values: &[T]) -> Result<Vec<u8>, tambakError>
where
    T: PrimInt + Unsigned,
{
    let mut output = Vec::with_capacity(values.len());
    for &val in values {
        encode_one(val, &mut output)?;
    }
    Ok(output)
}

/// Decodes exactly `num_values` integers. Trailing bytes are an error.
pub fn decode<T>(input_bytes: &[u8], num_values: usize) -> Result<Vec<T>, tambakError>
where
    T: PrimInt + Unsigned,
{
    // Every value takes at least one byte, so this bounds the allocation.
    if num_values > input_bytes.len() {
        return Err(tambakError::Leb128DecodeError(format!(
            "Cannot decode {} values from {} bytes",
            num_values,
            input_bytes.len()
        )));
    }

    let mut cursor = Cursor::new(input_bytes);
    let mut output = Vec::with_capacity(num_values);
    for _ in 0..num_values {
        output.push(decode_one::<T>(&mut cursor)?);
    }

    if (cursor.position() as usize) != input_bytes.len() {
        return Err(tambakError::Leb128DecodeError(
            "Did not consume entire input buffer. Trailing bytes detected.".to_string(),
        ));
    }

    Ok(output)
}
