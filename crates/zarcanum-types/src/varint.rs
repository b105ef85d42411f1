//! CryptoNote varint (unsigned LEB128).

use crate::TypesError;

/// Append the varint encoding of `value` to `out`.
pub fn write_varint(out: &mut Vec<u8>, mut value: u64) {
    loop {
        let mut byte = (value & 0x7F) as u8;
        value >>= 7;
        if value > 0 {
            byte |= 0x80;
        }
        out.push(byte);
        if value == 0 {
            break;
        }
    }
}

/// Encode a varint into a fresh buffer.
pub fn encode_varint(value: u64) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(10);
    write_varint(&mut bytes, value);
    bytes
}

/// Decode a varint from the start of data. Returns (value, bytes_read).
pub fn decode_varint(data: &[u8]) -> Result<(u64, usize), TypesError> {
    let mut value: u64 = 0;
    let mut shift: u32 = 0;

    for (i, &byte) in data.iter().enumerate().take(10) {
        let chunk = (byte & 0x7F) as u64;
        if shift == 63 && chunk > 1 {
            return Err(TypesError::Varint);
        }
        value |= chunk << shift;
        if byte & 0x80 == 0 {
            return Ok((value, i + 1));
        }
        shift += 7;
    }

    Err(TypesError::Varint)
}
