//! The big-endian 7-bits-per-byte variable-length integer encoding

use crate::{Error, Result};

/// Read a variable-length integer from the front of `data`.
///
/// Bytes 1..8 each contribute their low seven bits, most significant group
/// first; a clear high bit stops decoding. A ninth byte, if reached,
/// contributes all eight bits, giving a full 64-bit value.
///
/// Returns the decoded value and the number of bytes consumed.
pub fn read_varint(data: &[u8]) -> Result<(i64, usize)> {
    let mut value = 0i64;

    for i in 0..9 {
        let Some(&byte) = data.get(i) else {
            return Err(Error::Malformed("truncated varint".into()));
        };

        if i < 8 {
            value = (value << 7) | i64::from(byte & 0x7f);
            if byte < 0x80 {
                return Ok((value, i + 1));
            }
        } else {
            value = (value << 8) | i64::from(byte);
            return Ok((value, 9));
        }
    }

    unreachable!("loop always returns within nine bytes")
}

/// Encode `value` as a varint. Used when constructing records in tests and
/// fixtures; the inverse of [`read_varint`].
#[must_use]
pub fn write_varint(value: i64) -> Vec<u8> {
    let v = value as u64;

    if v >> 56 != 0 {
        // Nine bytes: eight 7-bit groups of the upper 56 bits, then the low
        // byte whole.
        let mut out = Vec::with_capacity(9);
        let high = v >> 8;
        for i in (0..8).rev() {
            out.push(((high >> (7 * i)) & 0x7f) as u8 | 0x80);
        }
        out.push((v & 0xff) as u8);
        return out;
    }

    let mut groups = Vec::with_capacity(8);
    let mut rest = v;
    loop {
        groups.push((rest & 0x7f) as u8);
        rest >>= 7;
        if rest == 0 {
            break;
        }
    }
    groups.reverse();
    let last = groups.len() - 1;
    for (i, group) in groups.iter_mut().enumerate() {
        if i != last {
            *group |= 0x80;
        }
    }
    groups
}
