use std::fmt;
use std::str::FromStr;

use serde::de::{self, Unexpected, Visitor};
use serde::Deserialize;
use serde::Deserializer;
use serde::Serialize;
use serde::Serializer;

use crate::error::Error;

/// Length of an object id in raw bytes.
pub const ID_RAW_LEN: usize = 20;

/// Length of an object id in its hex text form.
pub const ID_HEX_LEN: usize = 40;

/// Hex form of the reserved "empty object" id.
pub const ZERO_OBJ_ID: &str = "0000000000000000000000000000000000000000";

/// Content address of a stored object.
///
/// Always rendered as 40 lowercase hex characters. The all-zero id is the
/// sentinel for an empty directory or a zero byte file and is never looked up
/// in a backend.
#[derive(PartialEq, Eq, Clone, Copy, Hash, PartialOrd, Ord)]
pub struct ObjectId([u8; ID_RAW_LEN]);

impl ObjectId {
    pub const fn zero() -> Self {
        ObjectId([0; ID_RAW_LEN])
    }

    pub fn is_zero(&self) -> bool {
        self.0 == [0; ID_RAW_LEN]
    }

    /// Parse the 40 character hex form, uppercase digits are accepted and
    /// normalised.
    pub fn from_hex<T: AsRef<[u8]>>(hex_id: T) -> Result<Self, Error> {
        let hex_id = hex_id.as_ref();
        if hex_id.len() != ID_HEX_LEN {
            return Err(Error::InvalidId(format!(
                "expected {} hex characters, got {}",
                ID_HEX_LEN,
                hex_id.len()
            )));
        }

        let mut raw = [0u8; ID_RAW_LEN];
        hex::decode_to_slice(hex_id, &mut raw)
            .map_err(|e| Error::InvalidId(format!("{}: {:?}", e, String::from_utf8_lossy(hex_id))))?;
        Ok(ObjectId(raw))
    }

    pub fn as_bytes(&self) -> &[u8; ID_RAW_LEN] {
        &self.0
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Split into the two character fan-out directory and the remainder, the
    /// way on-disk object stores shard their files.
    pub fn fan_out(&self) -> (String, String) {
        let mut hex_id = self.to_hex();
        let rest = hex_id.split_off(2);
        (hex_id, rest)
    }
}

impl From<[u8; ID_RAW_LEN]> for ObjectId {
    fn from(bytes: [u8; ID_RAW_LEN]) -> Self {
        ObjectId(bytes)
    }
}

impl FromStr for ObjectId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ObjectId::from_hex(s)
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

impl fmt::Debug for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ObjectId({})", self.to_hex())
    }
}

// Serde impls, the wire form is always the hex string
impl Serialize for ObjectId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

struct ObjectIdVisitor;

impl<'de> Visitor<'de> for ObjectIdVisitor {
    type Value = ObjectId;

    fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
        write!(formatter, "a string of {} hex characters", ID_HEX_LEN)
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<Self::Value, E> {
        ObjectId::from_hex(v).map_err(|_| de::Error::invalid_value(Unexpected::Str(v), &self))
    }
}

impl<'de> Deserialize<'de> for ObjectId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<ObjectId, D::Error> {
        deserializer.deserialize_str(ObjectIdVisitor)
    }
}
