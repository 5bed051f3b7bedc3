// Entity keys and identifiers
//
// `EntityKey` is the stable handle used for every non-owning reference in the
// model (event → instrument, page slot → pattern). Keys are never reused, so a
// reference to a deleted entity simply resolves to nothing.
//
// `EntityId` is the user-visible two-character token ("01", "BD", ...).

use crate::error::{ModelError, ModelResult};
use std::fmt;
use std::num::NonZeroU64;
use std::str::FromStr;
use std::sync::atomic::{AtomicU64, Ordering};

/// Global key generator (atomic for thread-safety)
static NEXT_ENTITY_KEY: AtomicU64 = AtomicU64::new(1);

/// Process-unique, never-reused handle to a model entity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EntityKey(NonZeroU64);

impl EntityKey {
    /// Generate a fresh key
    pub fn generate() -> Self {
        let raw = NEXT_ENTITY_KEY.fetch_add(1, Ordering::Relaxed);
        // The counter starts at 1 and would need 2^64 allocations to wrap
        Self(NonZeroU64::new(raw).unwrap_or(NonZeroU64::MIN))
    }

    pub fn get(self) -> u64 {
        self.0.get()
    }

    /// Rebuild a key from its raw value, `0` meaning "no entity"
    pub fn from_raw(raw: u64) -> Option<Self> {
        NonZeroU64::new(raw).map(Self)
    }
}

/// Number of distinct identifiers `EntityId::from_index` produces before wrapping
pub const ID_SPACE: usize = 100 + 26 * 36;

/// Two-character identifier, unique within its owning collection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EntityId([u8; 2]);

impl EntityId {
    pub fn new(text: &str) -> ModelResult<Self> {
        match text.as_bytes() {
            [a, b] if a.is_ascii_graphic() && b.is_ascii_graphic() => Ok(Self([*a, *b])),
            _ => Err(ModelError::InvalidId(text.to_string())),
        }
    }

    /// Identifier for the n-th entity of a collection: "01".."99", then "A0".."ZZ"
    pub fn from_index(index: usize) -> Self {
        const DIGITS: &[u8; 36] = b"0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZ";
        let n = (index + 1) % ID_SPACE;
        if n < 100 {
            Self([b'0' + (n / 10) as u8, b'0' + (n % 10) as u8])
        } else {
            let m = n - 100;
            Self([DIGITS[10 + m / DIGITS.len()], DIGITS[m % DIGITS.len()]])
        }
    }

    pub(crate) fn to_bits(self) -> u16 {
        u16::from_le_bytes(self.0)
    }

    pub(crate) fn from_bits(bits: u16) -> Self {
        Self(bits.to_le_bytes())
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.0[0] as char, self.0[1] as char)
    }
}

impl FromStr for EntityId {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}
