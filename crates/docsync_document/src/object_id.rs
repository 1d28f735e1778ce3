//! Store-native document identifier.

use crate::error::{DocumentError, DocumentResult};
use std::fmt;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::OnceLock;
use std::time::{SystemTime, UNIX_EPOCH};
use uuid::Uuid;

/// Number of bytes in an ObjectId.
pub const OBJECT_ID_LEN: usize = 12;

/// Unique identifier for a stored document.
///
/// ObjectIds are 12 bytes:
/// - 4 bytes: seconds since the UNIX epoch (big-endian)
/// - 5 bytes: random value fixed for the lifetime of the process
/// - 3 bytes: incrementing counter (big-endian), seeded randomly
///
/// Ids generated by one process are therefore unique and roughly ordered
/// by creation time.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ObjectId([u8; OBJECT_ID_LEN]);

fn process_unique() -> &'static [u8; 5] {
    static UNIQUE: OnceLock<[u8; 5]> = OnceLock::new();
    UNIQUE.get_or_init(|| {
        let seed = Uuid::new_v4().into_bytes();
        [seed[0], seed[1], seed[2], seed[3], seed[4]]
    })
}

fn next_counter() -> u32 {
    static COUNTER: OnceLock<AtomicU32> = OnceLock::new();
    let counter = COUNTER.get_or_init(|| {
        let seed = Uuid::new_v4().into_bytes();
        AtomicU32::new(u32::from_be_bytes([0, seed[5], seed[6], seed[7]]))
    });
    counter.fetch_add(1, Ordering::Relaxed) & 0x00ff_ffff
}

impl ObjectId {
    /// Generates a fresh ObjectId.
    #[must_use]
    pub fn new() -> Self {
        #[allow(clippy::cast_possible_truncation)]
        let secs = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs() as u32)
            .unwrap_or(0);
        let counter = next_counter().to_be_bytes();

        let mut bytes = [0u8; OBJECT_ID_LEN];
        bytes[0..4].copy_from_slice(&secs.to_be_bytes());
        bytes[4..9].copy_from_slice(process_unique());
        bytes[9..12].copy_from_slice(&counter[1..4]);
        Self(bytes)
    }

    /// Creates an ObjectId from raw bytes.
    #[inline]
    #[must_use]
    pub const fn from_bytes(bytes: [u8; OBJECT_ID_LEN]) -> Self {
        Self(bytes)
    }

    /// Creates an ObjectId from a slice.
    ///
    /// Returns `None` if the slice is not exactly 12 bytes.
    #[must_use]
    pub fn from_slice(slice: &[u8]) -> Option<Self> {
        <[u8; OBJECT_ID_LEN]>::try_from(slice).ok().map(Self)
    }

    /// Parses a 24 character hexadecimal string.
    pub fn parse_str(s: &str) -> DocumentResult<Self> {
        if s.len() != OBJECT_ID_LEN * 2 || !s.is_ascii() {
            return Err(DocumentError::invalid_object_id(s));
        }
        let mut bytes = [0u8; OBJECT_ID_LEN];
        for (i, byte) in bytes.iter_mut().enumerate() {
            *byte = u8::from_str_radix(&s[i * 2..i * 2 + 2], 16)
                .map_err(|_| DocumentError::invalid_object_id(s))?;
        }
        Ok(Self(bytes))
    }

    /// Returns the raw bytes.
    #[inline]
    #[must_use]
    pub const fn as_bytes(&self) -> &[u8; OBJECT_ID_LEN] {
        &self.0
    }

    /// Returns the creation time in seconds since the UNIX epoch.
    #[must_use]
    pub fn timestamp(&self) -> u32 {
        u32::from_be_bytes([self.0[0], self.0[1], self.0[2], self.0[3]])
    }

    /// Returns the lowercase hexadecimal form.
    #[must_use]
    pub fn to_hex(&self) -> String {
        self.0.iter().map(|b| format!("{b:02x}")).collect()
    }
}

impl Default for ObjectId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ObjectId({})", self.to_hex())
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl std::str::FromStr for ObjectId {
    type Err = DocumentError;

    fn from_str(s: &str) -> DocumentResult<Self> {
        Self::parse_str(s)
    }
}

impl From<[u8; OBJECT_ID_LEN]> for ObjectId {
    fn from(bytes: [u8; OBJECT_ID_LEN]) -> Self {
        Self::from_bytes(bytes)
    }
}

impl From<ObjectId> for [u8; OBJECT_ID_LEN] {
    fn from(id: ObjectId) -> Self {
        id.0
    }
}

impl serde::Serialize for ObjectId {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_is_unique() {
        let id1 = ObjectId::new();
        let id2 = ObjectId::new();
        assert_ne!(id1, id2);
    }

    #[test]
    fn same_process_part() {
        let id1 = ObjectId::new();
        let id2 = ObjectId::new();
        assert_eq!(id1.as_bytes()[4..9], id2.as_bytes()[4..9]);
    }

    #[test]
    fn hex_roundtrip() {
        let id = ObjectId::new();
        let parsed = ObjectId::parse_str(&id.to_hex()).unwrap();
        assert_eq!(parsed, id);
        assert_eq!(id.to_string().len(), 24);
    }

    #[test]
    fn parse_rejects_garbage() {
        assert!(ObjectId::parse_str("falseID").is_err());
        assert!(ObjectId::parse_str("zz0000000000000000000000").is_err());
        assert!(ObjectId::parse_str("").is_err());
    }

    #[test]
    fn from_slice() {
        assert!(ObjectId::from_slice(&[0u8; 12]).is_some());
        assert!(ObjectId::from_slice(&[0u8; 11]).is_none());
        assert!(ObjectId::from_slice(&[0u8; 16]).is_none());
    }

    #[test]
    fn timestamp_is_recent() {
        let id = ObjectId::new();
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap()
            .as_secs() as u32;
        assert!(now - id.timestamp() < 5);
    }

    #[test]
    fn serializes_as_hex() {
        let id = ObjectId::from_bytes([0xab; 12]);
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, "\"abababababababababababab\"");
    }
}
