//! `SQLite` record parsing
//!
//! A record payload is a varint header length, a run of serial-type varints,
//! then the concatenated field contents.

use crate::varint::read_varint;
use crate::{Error, Result};

/// Serial type codes from a record header. The set is closed; codes 10 and
/// 11 are reserved and everything else maps onto one of these.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SerialType {
    Null,
    I8,
    I16,
    I24,
    I32,
    I48,
    I64,
    F64,
    /// The constant integer 0
    Zero,
    /// The constant integer 1
    One,
    Blob(usize),
    Text(usize),
}

impl SerialType {
    /// Map a raw header code to its serial type.
    pub fn from_code(code: i64) -> Result<Self> {
        match code {
            0 => Ok(Self::Null),
            1 => Ok(Self::I8),
            2 => Ok(Self::I16),
            3 => Ok(Self::I24),
            4 => Ok(Self::I32),
            5 => Ok(Self::I48),
            6 => Ok(Self::I64),
            7 => Ok(Self::F64),
            8 => Ok(Self::Zero),
            9 => Ok(Self::One),
            n if n >= 12 && n % 2 == 0 => Ok(Self::Blob(((n - 12) / 2) as usize)),
            n if n >= 13 => Ok(Self::Text(((n - 13) / 2) as usize)),
            n => Err(Error::Malformed(format!("unknown serial type {n}"))),
        }
    }

    /// Declared content size in bytes.
    #[must_use]
    pub const fn content_size(&self) -> usize {
        match self {
            Self::Null | Self::Zero | Self::One => 0,
            Self::I8 => 1,
            Self::I16 => 2,
            Self::I24 => 3,
            Self::I32 => 4,
            Self::I48 => 6,
            Self::I64 | Self::F64 => 8,
            Self::Blob(n) | Self::Text(n) => *n,
        }
    }
}

/// One decoded field: its serial type and raw content bytes.
///
/// The bytes may be shorter than the declared content size when the record
/// decoder clamped the read at the end of the payload.
#[derive(Debug, Clone)]
pub struct Field {
    serial_type: SerialType,
    data: Vec<u8>,
    /// Set on the column that aliases the rowid; rendering then substitutes
    /// the cell's rowid for the stored NULL.
    pub is_rowid_alias: bool,
}

impl Field {
    #[must_use]
    pub const fn serial_type(&self) -> SerialType {
        self.serial_type
    }

    #[must_use]
    pub fn bytes(&self) -> &[u8] {
        &self.data
    }

    /// Big-endian integer value, sign-extended from the stored width.
    #[must_use]
    pub fn integer(&self) -> i64 {
        match self.serial_type {
            SerialType::Zero => 0,
            SerialType::One => 1,
            _ => {
                let mut value = 0i64;
                for &byte in &self.data {
                    value = (value << 8) | i64::from(byte);
                }
                let bits = self.data.len() * 8;
                if bits == 0 || bits >= 64 {
                    value
                } else {
                    (value << (64 - bits)) >> (64 - bits)
                }
            }
        }
    }

    /// Text content, if this field is TEXT.
    #[must_use]
    pub fn text(&self) -> Option<&str> {
        match self.serial_type {
            SerialType::Text(_) => core::str::from_utf8(&self.data).ok(),
            _ => None,
        }
    }

    /// Render the field for output and predicate comparison.
    ///
    /// TEXT yields its UTF-8 bytes, NULL the literal `<null>`, the constant
    /// serial types `0`/`1`, integers their decimal form, BLOB lowercase hex.
    /// F64 passes its raw bits through the integer path undecoded.
    #[must_use]
    pub fn render(&self) -> String {
        match self.serial_type {
            SerialType::Text(_) => String::from_utf8_lossy(&self.data).into_owned(),
            SerialType::Null => "<null>".to_string(),
            SerialType::Zero => "0".to_string(),
            SerialType::One => "1".to_string(),
            SerialType::Blob(_) => {
                let mut out = String::with_capacity(self.data.len() * 2);
                for byte in &self.data {
                    out.push_str(&format!("{byte:02x}"));
                }
                out
            }
            _ => self.integer().to_string(),
        }
    }
}

/// Decode a record payload into its ordered field sequence.
///
/// `payload_size` is the cell's declared payload size; when a field's
/// declared content would extend past it (observed in real files), the read
/// is clamped to what remains and later fields come back zero-length.
pub fn parse_record(payload: &[u8], payload_size: i64) -> Result<Vec<Field>> {
    let limit = usize::try_from(payload_size.max(0))
        .unwrap_or(usize::MAX)
        .min(payload.len());

    let (header_len, header_len_bytes) = read_varint(payload)?;
    if header_len < header_len_bytes as i64 {
        return Err(Error::Malformed(format!(
            "record header length {header_len} too small"
        )));
    }
    let header_end = usize::try_from(header_len)
        .map_err(|_| Error::Malformed(format!("record header length {header_len} out of range")))?;
    if header_end > limit {
        return Err(Error::Malformed(format!(
            "record header length {header_len} exceeds payload of {limit} bytes"
        )));
    }

    let mut offset = header_len_bytes;
    let mut types = Vec::new();
    while offset < header_end {
        let (code, consumed) = read_varint(&payload[offset..header_end])?;
        offset += consumed;
        types.push(SerialType::from_code(code)?);
    }

    let mut fields = Vec::with_capacity(types.len());
    for serial_type in types {
        let declared = serial_type.content_size();
        let take = declared.min(limit.saturating_sub(offset));
        let data = payload[offset..offset + take].to_vec();
        offset += take;
        fields.push(Field {
            serial_type,
            data,
            is_rowid_alias: false,
        });
    }

    Ok(fields)
}

/// Encode a field sequence back into record-payload bytes. The inverse of
/// [`parse_record`] for well-formed input; used by tests and fixtures.
#[must_use]
pub fn build_record(fields: &[(i64, &[u8])]) -> Vec<u8> {
    use crate::varint::write_varint;

    let mut type_bytes = Vec::new();
    for (code, _) in fields {
        type_bytes.extend_from_slice(&write_varint(*code));
    }
    // The header length varint counts itself; a one-byte length is enough
    // for every record this crate constructs.
    let header_len = type_bytes.len() + 1;
    assert!(header_len < 0x80, "record header too large for fixture");

    let mut out = Vec::new();
    out.extend_from_slice(&write_varint(header_len as i64));
    out.extend_from_slice(&type_bytes);
    for (_, data) in fields {
        out.extend_from_slice(data);
    }
    out
}
