//! Record codec: the wire/disk byte format.
//!
//! A log entry is a self-delimiting framed record:
//!
//! ```text
//! ┌─────────────────┬─────────┬─────────┬────────────────────┬────────────┐
//! │ Length (4, LE)  │ Ver (1) │ Tag (1) │ Payload (variable) │ CRC32 (4)  │
//! └─────────────────┴─────────┴─────────┴────────────────────┴────────────┘
//! ```
//!
//! `Length` counts everything after itself. The CRC covers version, tag and
//! payload. Put entries carry the record's external JSON as payload; delete
//! entries carry the deleted id as UTF-8.
//!
//! The codec is total for the accepted value subset (null, bool, int,
//! finite float, string, array, object) and `decode_record` is the exact
//! inverse of `encode_record` over that subset.

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use crc32fast::Hasher;
use dynamickv_core::{Error, Record, Result, Value};
use std::io::Cursor;

/// Current framing format version
pub const RECORD_FORMAT_VERSION: u8 = 1;

/// Upper bound on a single framed entry's length field.
///
/// Anything larger is treated as corruption rather than an allocation
/// request.
pub const MAX_ENTRY_LEN: u32 = 16 * 1024 * 1024;

/// Entry tag: record put (create or update)
const TAG_PUT: u8 = 0x01;
/// Entry tag: record delete
const TAG_DELETE: u8 = 0x02;

/// Overhead after the length field: version + tag + CRC
const ENTRY_OVERHEAD: usize = 1 + 1 + 4;

/// One mutation in a collection's log
#[derive(Debug, Clone, PartialEq)]
pub enum LogEntry {
    /// Full record state after a create or update
    Put(Record),
    /// Tombstone for a removed record
    Delete {
        /// Id of the removed record
        id: String,
    },
}

/// Framing-level decode failure.
///
/// Distinguishes a truncated tail (expected after an unclean shutdown) from
/// real corruption, so the log reader can truncate the former and refuse
/// the latter.
#[derive(Debug, Clone, PartialEq)]
pub enum FrameError {
    /// The buffer ends mid-entry; more bytes were expected
    InsufficientData,
    /// CRC verification failed
    ChecksumMismatch {
        /// CRC stored in the entry
        expected: u32,
        /// CRC computed over the entry bytes
        actual: u32,
    },
    /// Structurally invalid entry (bad version, tag, length, or payload)
    Malformed(String),
}

/// Encode a record to its wire payload (external JSON shape, UTF-8).
///
/// Fails with `Error::Encode` if the record holds a non-finite float -
/// the JSON wire format cannot represent it.
pub fn encode_record(record: &Record) -> Result<Vec<u8>> {
    for (name, value) in &record.fields {
        ensure_encodable(name, value)?;
    }
    serde_json::to_vec(&record.to_json()).map_err(|e| Error::Encode(e.to_string()))
}

/// Decode a record from its wire payload.
///
/// Exact inverse of [`encode_record`] for every record it accepts.
pub fn decode_record(bytes: &[u8]) -> Result<Record> {
    let json: serde_json::Value =
        serde_json::from_slice(bytes).map_err(|e| Error::Decode(e.to_string()))?;
    Record::from_json(json)
}

/// Encode a log entry as a framed, CRC-protected byte sequence.
pub fn encode_entry(entry: &LogEntry) -> Result<Vec<u8>> {
    let (tag, payload) = match entry {
        LogEntry::Put(record) => (TAG_PUT, encode_record(record)?),
        LogEntry::Delete { id } => (TAG_DELETE, id.as_bytes().to_vec()),
    };

    let mut body = Vec::with_capacity(2 + payload.len());
    body.push(RECORD_FORMAT_VERSION);
    body.push(tag);
    body.extend_from_slice(&payload);

    let mut hasher = Hasher::new();
    hasher.update(&body);
    let crc = hasher.finalize();

    let len = (body.len() + 4) as u32;
    let mut out = Vec::with_capacity(4 + len as usize);
    out.write_u32::<LittleEndian>(len)
        .map_err(|e| Error::Encode(e.to_string()))?;
    out.extend_from_slice(&body);
    out.write_u32::<LittleEndian>(crc)
        .map_err(|e| Error::Encode(e.to_string()))?;
    Ok(out)
}

/// Decode one framed entry from the front of `buf`.
///
/// Returns the entry and the number of bytes consumed so callers can walk
/// a log incrementally.
pub fn decode_entry(buf: &[u8]) -> std::result::Result<(LogEntry, usize), FrameError> {
    if buf.len() < 4 {
        return Err(FrameError::InsufficientData);
    }
    let mut cursor = Cursor::new(buf);
    let len = cursor
        .read_u32::<LittleEndian>()
        .map_err(|_| FrameError::InsufficientData)? as usize;

    if len < ENTRY_OVERHEAD {
        return Err(FrameError::Malformed(format!(
            "entry length {} below minimum {}",
            len, ENTRY_OVERHEAD
        )));
    }
    if len > MAX_ENTRY_LEN as usize {
        return Err(FrameError::Malformed(format!(
            "entry length {} exceeds maximum {}",
            len, MAX_ENTRY_LEN
        )));
    }
    if buf.len() < 4 + len {
        return Err(FrameError::InsufficientData);
    }

    let body = &buf[4..4 + len - 4];
    let stored_crc = u32::from_le_bytes(buf[4 + len - 4..4 + len].try_into().unwrap());

    let mut hasher = Hasher::new();
    hasher.update(body);
    let actual_crc = hasher.finalize();
    if actual_crc != stored_crc {
        return Err(FrameError::ChecksumMismatch {
            expected: stored_crc,
            actual: actual_crc,
        });
    }

    let version = body[0];
    if version != RECORD_FORMAT_VERSION {
        return Err(FrameError::Malformed(format!(
            "unsupported format version {}",
            version
        )));
    }

    let payload = &body[2..];
    let entry = match body[1] {
        TAG_PUT => {
            let record = decode_record(payload)
                .map_err(|e| FrameError::Malformed(format!("bad put payload: {}", e)))?;
            LogEntry::Put(record)
        }
        TAG_DELETE => {
            let id = std::str::from_utf8(payload)
                .map_err(|e| FrameError::Malformed(format!("bad delete payload: {}", e)))?;
            LogEntry::Delete { id: id.to_string() }
        }
        other => {
            return Err(FrameError::Malformed(format!("unknown entry tag {:#04x}", other)));
        }
    };

    Ok((entry, 4 + len))
}

/// Reject values the wire format cannot represent faithfully
fn ensure_encodable(field: &str, value: &Value) -> Result<()> {
    match value {
        Value::Float(f) if !f.is_finite() => Err(Error::Encode(format!(
            "field '{}' holds a non-finite float",
            field
        ))),
        Value::Array(items) => {
            for item in items {
                ensure_encodable(field, item)?;
            }
            Ok(())
        }
        Value::Object(map) => {
            for (name, nested) in map {
                ensure_encodable(name, nested)?;
            }
            Ok(())
        }
        _ => Ok(()),
    }
}
