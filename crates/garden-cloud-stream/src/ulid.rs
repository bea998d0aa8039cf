use std::fmt;
use std::str::FromStr;
use std::sync::{Mutex, PoisonError};

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;

const ENCODED_LEN: usize = 26;
const RANDOM_BITS: u32 = 80;
const RANDOM_MASK: u128 = (1u128 << RANDOM_BITS) - 1;
const CROCKFORD: &[u8; 32] = b"0123456789ABCDEFGHJKMNPQRSTVWXYZ";

/// Time-sortable 128-bit identifier: 48 bits of Unix milliseconds followed by
/// 80 bits of randomness, rendered as 26 Crockford base32 characters.
///
/// Used both as the buffer key of an outbound event and as the wire session
/// identifier.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Ulid(u128);

#[derive(Error, Debug, PartialEq, Eq)]
pub enum UlidError {
    #[error("ULID must be 26 characters, got {0}")]
    Length(usize),

    #[error("invalid ULID character '{0}'")]
    InvalidChar(char),

    #[error("ULID value exceeds 128 bits")]
    Overflow,
}

impl Ulid {
    pub fn from_parts(timestamp_ms: u64, random: u128) -> Self {
        Self(((timestamp_ms as u128) << RANDOM_BITS) | (random & RANDOM_MASK))
    }

    pub fn timestamp_ms(&self) -> u64 {
        (self.0 >> RANDOM_BITS) as u64
    }

    pub fn random(&self) -> u128 {
        self.0 & RANDOM_MASK
    }

    pub fn as_u128(&self) -> u128 {
        self.0
    }
}

impl fmt::Display for Ulid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut buf = [0u8; ENCODED_LEN];
        let mut value = self.0;
        for slot in buf.iter_mut().rev() {
            *slot = CROCKFORD[(value & 0x1f) as usize];
            value >>= 5;
        }
        // Every byte comes from CROCKFORD, which is ASCII.
        f.write_str(std::str::from_utf8(&buf).map_err(|_| fmt::Error)?)
    }
}

impl fmt::Debug for Ulid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Ulid({})", self)
    }
}

fn decode_char(c: char) -> Result<u128, UlidError> {
    let upper = c.to_ascii_uppercase();
    let normalized = match upper {
        'O' => '0',
        'I' | 'L' => '1',
        other => other,
    };
    CROCKFORD
        .iter()
        .position(|&b| b as char == normalized)
        .map(|p| p as u128)
        .ok_or(UlidError::InvalidChar(c))
}

impl FromStr for Ulid {
    type Err = UlidError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let len = s.chars().count();
        if len != ENCODED_LEN {
            return Err(UlidError::Length(len));
        }

        let mut chars = s.chars();
        let mut value: u128 = 0;
        if let Some(first) = chars.next() {
            let head = decode_char(first)?;
            // 26 * 5 = 130 bits; the leading character may only carry 3.
            if head > 7 {
                return Err(UlidError::Overflow);
            }
            value = head;
        }
        for c in chars {
            value = (value << 5) | decode_char(c)?;
        }
        Ok(Self(value))
    }
}

impl Serialize for Ulid {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Ulid {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

fn wall_clock_ms() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}

/// Monotonic ULID source.
///
/// Guarantees strictly increasing identifiers within the process: when the
/// wall clock has not advanced past the previous identifier (same millisecond,
/// or a clock step backwards) the previous value is incremented instead of
/// drawing fresh randomness. An increment that overflows the random part
/// carries into the timestamp.
pub struct UlidGenerator {
    last: Mutex<u128>,
}

impl UlidGenerator {
    pub fn new() -> Self {
        Self {
            last: Mutex::new(0),
        }
    }

    pub fn next(&self) -> Ulid {
        self.next_at(wall_clock_ms())
    }

    fn next_at(&self, now_ms: u64) -> Ulid {
        let mut last = self.last.lock().unwrap_or_else(PoisonError::into_inner);
        let previous = Ulid(*last);

        let next = if *last == 0 || now_ms > previous.timestamp_ms() {
            Ulid::from_parts(now_ms, rand::random::<u128>())
        } else {
            Ulid(last.wrapping_add(1))
        };

        *last = next.0;
        next
    }
}

impl Default for UlidGenerator {
    fn default() -> Self {
        Self::new()
    }
}
