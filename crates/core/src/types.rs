use std::fmt;
use std::str::FromStr;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::OnceLock;

use chrono::{TimeZone, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// All timestamps are UTC.
pub type Timestamp = chrono::DateTime<chrono::Utc>;

/// Raw byte length of an [`ObjectId`].
pub const OBJECT_ID_LEN: usize = 12;

/// Length of the hex rendering of an [`ObjectId`].
pub const OBJECT_ID_HEX_LEN: usize = OBJECT_ID_LEN * 2;

/// 12-byte identifier used for stories, content records, and user accounts.
///
/// Layout: 4-byte big-endian seconds timestamp, 5 bytes of per-process
/// randomness, 3-byte wrapping counter. Rendered (and serialized) as 24
/// lowercase hex characters, which is also the format the identity service
/// and the token `sub` claim use for user ids.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectId([u8; OBJECT_ID_LEN]);

/// Reasons a string is not a valid [`ObjectId`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ObjectIdError {
    #[error("expected {OBJECT_ID_HEX_LEN} hex characters, got {0}")]
    InvalidLength(usize),

    #[error("invalid hex character at position {0}")]
    InvalidHex(usize),
}

static PROCESS_UNIQUE: OnceLock<[u8; 5]> = OnceLock::new();
static COUNTER: OnceLock<AtomicU32> = OnceLock::new();

const COUNTER_MASK: u32 = 0x00ff_ffff;

impl ObjectId {
    /// Mint a fresh identifier stamped with the current time.
    pub fn new() -> Self {
        let secs = u32::try_from(Utc::now().timestamp()).unwrap_or(u32::MAX);
        let process = *PROCESS_UNIQUE.get_or_init(rand::random::<[u8; 5]>);
        let counter = COUNTER
            .get_or_init(|| AtomicU32::new(rand::random::<u32>() & COUNTER_MASK))
            .fetch_add(1, Ordering::Relaxed)
            & COUNTER_MASK;
        Self::from_parts(secs, process, counter)
    }

    fn from_parts(secs: u32, process: [u8; 5], counter: u32) -> Self {
        let mut bytes = [0u8; OBJECT_ID_LEN];
        bytes[..4].copy_from_slice(&secs.to_be_bytes());
        bytes[4..9].copy_from_slice(&process);
        bytes[9..].copy_from_slice(&counter.to_be_bytes()[1..]);
        Self(bytes)
    }

    pub const fn from_bytes(bytes: [u8; OBJECT_ID_LEN]) -> Self {
        Self(bytes)
    }

    pub const fn bytes(&self) -> [u8; OBJECT_ID_LEN] {
        self.0
    }

    /// Parse a 24-character hex string (either case).
    pub fn parse_str(s: &str) -> Result<Self, ObjectIdError> {
        if s.len() != OBJECT_ID_HEX_LEN {
            return Err(ObjectIdError::InvalidLength(s.len()));
        }
        let mut bytes = [0u8; OBJECT_ID_LEN];
        for (i, pair) in s.as_bytes().chunks_exact(2).enumerate() {
            let hi = hex_value(pair[0]).ok_or(ObjectIdError::InvalidHex(i * 2))?;
            let lo = hex_value(pair[1]).ok_or(ObjectIdError::InvalidHex(i * 2 + 1))?;
            bytes[i] = (hi << 4) | lo;
        }
        Ok(Self(bytes))
    }

    /// Lowercase hex rendering.
    pub fn to_hex(&self) -> String {
        self.to_string()
    }

    /// The creation time encoded in the first four bytes.
    pub fn timestamp(&self) -> Timestamp {
        let secs = u32::from_be_bytes([self.0[0], self.0[1], self.0[2], self.0[3]]);
        Utc.timestamp_opt(i64::from(secs), 0)
            .single()
            .unwrap_or_default()
    }
}

impl Default for ObjectId {
    fn default() -> Self {
        Self::new()
    }
}

fn hex_value(c: u8) -> Option<u8> {
    match c {
        b'0'..=b'9' => Some(c - b'0'),
        b'a'..=b'f' => Some(c - b'a' + 10),
        b'A'..=b'F' => Some(c - b'A' + 10),
        _ => None,
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for b in self.0 {
            write!(f, "{b:02x}")?;
        }
        Ok(())
    }
}

impl fmt::Debug for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ObjectId({self})")
    }
}

impl FromStr for ObjectId {
    type Err = ObjectIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse_str(s)
    }
}

impl TryFrom<String> for ObjectId {
    type Error = ObjectIdError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse_str(&value)
    }
}

impl Serialize for ObjectId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for ObjectId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::parse_str(&s).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hex_round_trip_is_lowercase() {
        let id = ObjectId::parse_str("65A1B2C3D4E5F60718293A4B").unwrap();
        assert_eq!(id.to_hex(), "65a1b2c3d4e5f60718293a4b");
    }

    #[test]
    fn rejects_wrong_length() {
        assert_eq!(
            ObjectId::parse_str("abc"),
            Err(ObjectIdError::InvalidLength(3))
        );
        assert_eq!(ObjectId::parse_str(""), Err(ObjectIdError::InvalidLength(0)));
    }

    #[test]
    fn rejects_non_hex() {
        assert_eq!(
            ObjectId::parse_str("65a1b2c3d4e5f60718293a4z"),
            Err(ObjectIdError::InvalidHex(23))
        );
    }

    #[test]
    fn fresh_ids_are_distinct_and_carry_the_current_time() {
        let before = Utc::now().timestamp();
        let a = ObjectId::new();
        let b = ObjectId::new();
        assert_ne!(a, b);
        let stamped = a.timestamp().timestamp();
        assert!(stamped >= before - 1 && stamped <= Utc::now().timestamp());
    }

    #[test]
    fn ids_minted_in_one_process_share_the_random_segment() {
        let a = ObjectId::new().bytes();
        let b = ObjectId::new().bytes();
        assert_eq!(a[4..9], b[4..9]);
    }

    #[test]
    fn serializes_as_hex_string() {
        let id = ObjectId::from_bytes([0xab; OBJECT_ID_LEN]);
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, "\"abababababababababababab\"");
        let back: ObjectId = serde_json::from_str(&json).unwrap();
        assert_eq!(back, id);
    }

    #[test]
    fn deserialize_rejects_garbage() {
        let result: Result<ObjectId, _> = serde_json::from_str("\"not-an-id\"");
        assert!(result.is_err());
    }
}
