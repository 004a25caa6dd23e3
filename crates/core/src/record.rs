//! Record model
//!
//! A record is a store-assigned id, two store-managed timestamps, and an
//! arbitrary map of JSON-compatible fields. The id is immutable after
//! creation; `updated_at` never moves backwards.
//!
//! The external JSON shape flattens the metadata next to the user fields:
//!
//! ```json
//! { "id": "...", "createdAt": "...", "updatedAt": "...", "name": "Widget" }
//! ```
//!
//! `id`, `createdAt` and `updatedAt` are therefore reserved field names;
//! they are stripped from incoming values so a client can never overwrite
//! store-managed metadata.

use crate::error::{Error, Result};
use crate::value::Value;
use chrono::{DateTime, Duration, SecondsFormat, Utc};
use std::collections::HashMap;

/// Field map of a record: field name to JSON-compatible value
pub type Fields = HashMap<String, Value>;

/// Field names owned by the store, never by the caller
pub const RESERVED_FIELDS: [&str; 3] = ["id", "createdAt", "updatedAt"];

/// Current UTC time truncated to microsecond precision.
///
/// The wire format carries timestamps as RFC 3339 with microseconds, so
/// anything finer would not survive a codec round-trip.
pub fn current_timestamp() -> DateTime<Utc> {
    let now = Utc::now();
    DateTime::from_timestamp_micros(now.timestamp_micros()).unwrap_or(now)
}

/// A single stored entity: generated id + field map + timestamps
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    /// Store-assigned identifier, unique within the record's collection
    pub id: String,
    /// Creation time (UTC), set once by the store
    pub created_at: DateTime<Utc>,
    /// Last modification time (UTC); `updated_at >= created_at`
    pub updated_at: DateTime<Utc>,
    /// User fields
    pub fields: Fields,
}

impl Record {
    /// Create a new record with `created_at == updated_at == now`.
    ///
    /// Reserved field names in `fields` are dropped.
    pub fn new(id: impl Into<String>, fields: Fields) -> Self {
        let now = current_timestamp();
        Record {
            id: id.into(),
            created_at: now,
            updated_at: now,
            fields: strip_reserved(fields),
        }
    }

    /// Look up a single field
    pub fn field(&self, name: &str) -> Option<&Value> {
        self.fields.get(name)
    }

    /// Shallow-merge `partial` into the record's fields and advance
    /// `updated_at`.
    ///
    /// Provided top-level fields replace existing ones; omitted fields are
    /// preserved. Reserved field names are ignored.
    pub fn merge(&mut self, partial: Fields) {
        for (name, value) in strip_reserved(partial) {
            self.fields.insert(name, value);
        }
        self.touch();
    }

    /// Advance `updated_at` to now, strictly past its previous value.
    ///
    /// Two mutations within the same microsecond still produce distinct,
    /// ordered timestamps.
    pub fn touch(&mut self) {
        let now = current_timestamp();
        self.updated_at = if now > self.updated_at {
            now
        } else {
            self.updated_at + Duration::microseconds(1)
        };
    }

    /// External JSON shape: metadata flattened next to the user fields
    pub fn to_json(&self) -> serde_json::Value {
        let mut obj = serde_json::Map::new();
        obj.insert("id".to_string(), serde_json::Value::String(self.id.clone()));
        obj.insert(
            "createdAt".to_string(),
            serde_json::Value::String(format_timestamp(&self.created_at)),
        );
        obj.insert(
            "updatedAt".to_string(),
            serde_json::Value::String(format_timestamp(&self.updated_at)),
        );
        for (name, value) in &self.fields {
            obj.insert(name.clone(), value.clone().into());
        }
        serde_json::Value::Object(obj)
    }

    /// Parse a record from its external JSON shape.
    ///
    /// Fails with `Error::Decode` if the value is not an object or the
    /// metadata fields are missing or malformed.
    pub fn from_json(value: serde_json::Value) -> Result<Self> {
        let serde_json::Value::Object(obj) = value else {
            return Err(Error::Decode("record is not a JSON object".to_string()));
        };

        let mut id = None;
        let mut created_at = None;
        let mut updated_at = None;
        let mut fields = Fields::new();

        for (name, value) in obj {
            match name.as_str() {
                "id" => match value {
                    serde_json::Value::String(s) => id = Some(s),
                    other => {
                        return Err(Error::Decode(format!(
                            "record id must be a string, got {}",
                            other
                        )))
                    }
                },
                "createdAt" => created_at = Some(parse_timestamp(&value)?),
                "updatedAt" => updated_at = Some(parse_timestamp(&value)?),
                _ => {
                    fields.insert(name, Value::from(value));
                }
            }
        }

        let id = id.ok_or_else(|| Error::Decode("record is missing 'id'".to_string()))?;
        let created_at =
            created_at.ok_or_else(|| Error::Decode("record is missing 'createdAt'".to_string()))?;
        let updated_at =
            updated_at.ok_or_else(|| Error::Decode("record is missing 'updatedAt'".to_string()))?;

        Ok(Record {
            id,
            created_at,
            updated_at,
            fields,
        })
    }
}

/// Drop reserved field names from a field map
pub fn strip_reserved(mut fields: Fields) -> Fields {
    for name in RESERVED_FIELDS {
        fields.remove(name);
    }
    fields
}

fn format_timestamp(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn parse_timestamp(value: &serde_json::Value) -> Result<DateTime<Utc>> {
    let serde_json::Value::String(s) = value else {
        return Err(Error::Decode(format!(
            "timestamp must be a string, got {}",
            value
        )));
    };
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| Error::Decode(format!("invalid timestamp '{}': {}", s, e)))
}
