// Atomic fields - Lock-free storage for entity properties
//
// Every scalar the render thread reads lives in one of these cells, so a read
// is a single torn-free observation. Composite invariants (loop start <= end,
// key ranges) are not guaranteed across cells; readers re-validate.

use super::key::{EntityId, EntityKey};
use std::marker::PhantomData;
use std::sync::atomic::{AtomicU8, AtomicU16, AtomicU32, AtomicU64, Ordering};

/// Thread-safe f32 cell
/// Stores the f32 bit pattern in an AtomicU32
#[derive(Debug)]
pub struct AtomicF32 {
    inner: AtomicU32,
}

impl AtomicF32 {
    pub fn new(value: f32) -> Self {
        Self {
            inner: AtomicU32::new(value.to_bits()),
        }
    }

    /// Set the value (edit thread)
    pub fn set(&self, value: f32) {
        self.inner.store(value.to_bits(), Ordering::Relaxed);
    }

    /// Get the value (render thread)
    pub fn get(&self) -> f32 {
        f32::from_bits(self.inner.load(Ordering::Relaxed))
    }
}

impl Default for AtomicF32 {
    fn default() -> Self {
        Self::new(0.0)
    }
}

/// Optional reference to another entity, `0` encodes "none"
#[derive(Debug, Default)]
pub struct AtomicKey {
    inner: AtomicU64,
}

impl AtomicKey {
    pub fn new(key: Option<EntityKey>) -> Self {
        Self {
            inner: AtomicU64::new(key.map_or(0, EntityKey::get)),
        }
    }

    pub fn set(&self, key: Option<EntityKey>) {
        self.inner.store(key.map_or(0, EntityKey::get), Ordering::Relaxed);
    }

    pub fn get(&self) -> Option<EntityKey> {
        EntityKey::from_raw(self.inner.load(Ordering::Relaxed))
    }

    /// Clear the reference if it currently points at `key`
    pub fn clear_if(&self, key: EntityKey) {
        let _ = self
            .inner
            .compare_exchange(key.get(), 0, Ordering::Relaxed, Ordering::Relaxed);
    }
}

/// Two-character identifier cell
#[derive(Debug)]
pub struct AtomicId {
    inner: AtomicU16,
}

impl AtomicId {
    pub fn new(id: EntityId) -> Self {
        Self {
            inner: AtomicU16::new(id.to_bits()),
        }
    }

    pub fn set(&self, id: EntityId) {
        self.inner.store(id.to_bits(), Ordering::Relaxed);
    }

    pub fn get(&self) -> EntityId {
        EntityId::from_bits(self.inner.load(Ordering::Relaxed))
    }
}

/// Enums stored as a one-byte code
pub trait AtomicCode: Copy + Default {
    fn to_code(self) -> u8;
    /// Unknown codes map to the default variant
    fn from_code(code: u8) -> Self;
}

#[derive(Debug)]
pub struct AtomicEnum<T: AtomicCode> {
    code: AtomicU8,
    _marker: PhantomData<T>,
}

impl<T: AtomicCode> AtomicEnum<T> {
    pub fn new(value: T) -> Self {
        Self {
            code: AtomicU8::new(value.to_code()),
            _marker: PhantomData,
        }
    }

    pub fn set(&self, value: T) {
        self.code.store(value.to_code(), Ordering::Relaxed);
    }

    pub fn get(&self) -> T {
        T::from_code(self.code.load(Ordering::Relaxed))
    }
}

/// Implements `AtomicCode` for a fieldless enum; unknown codes read as `Default::default()`
macro_rules! atomic_code_enum {
    ($ty:ty { $($variant:ident = $code:literal),+ $(,)? }) => {
        impl $crate::model::atomic::AtomicCode for $ty {
            fn to_code(self) -> u8 {
                match self {
                    $(Self::$variant => $code,)+
                }
            }

            fn from_code(code: u8) -> Self {
                match code {
                    $($code => Self::$variant,)+
                    _ => Self::default(),
                }
            }
        }
    };
}

pub(crate) use atomic_code_enum;

/// Clamp a value read from the UI boundary, mapping NaN to `fallback`
#[inline]
pub(crate) fn clamp_finite(value: f32, min: f32, max: f32, fallback: f32) -> f32 {
    if value.is_nan() {
        fallback
    } else {
        value.clamp(min, max)
    }
}
