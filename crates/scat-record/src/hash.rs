//! Record hashing primitives
//!
//! Provides [`RecordHash`], a strongly-typed 32-byte Blake3 hash used to
//! detect unsaved changes, and [`RecordHasher`], the field-by-field encoder
//! every hashable record part feeds into.

use std::fmt::{self, Display, Formatter};
use std::str::FromStr;

/// A 32-byte record hash (Blake3)
///
/// Immutable and cheap to clone (Copy).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RecordHash([u8; 32]);

impl RecordHash {
    /// Create a new RecordHash from raw bytes
    #[inline]
    #[must_use]
    pub const fn new(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Get reference to the underlying bytes
    #[inline]
    #[must_use]
    pub const fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Create hash from byte slice
    ///
    /// # Errors
    /// Returns error if slice length is not exactly 32 bytes
    #[inline]
    pub fn from_slice(bytes: &[u8]) -> Result<Self, HashError> {
        if bytes.len() != 32 {
            return Err(HashError::InvalidLength {
                expected: 32,
                actual: bytes.len(),
            });
        }
        let mut arr = [0u8; 32];
        arr.copy_from_slice(bytes);
        Ok(Self(arr))
    }

    /// Compute Blake3 hash of arbitrary data
    #[inline]
    #[must_use]
    pub fn compute(data: &[u8]) -> Self {
        Self::new(*blake3::hash(data).as_bytes())
    }

    /// Hash any value that knows how to feed a [`RecordHasher`]
    #[inline]
    #[must_use]
    pub fn of<T: HashInto + ?Sized>(value: &T) -> Self {
        let mut hasher = RecordHasher::new();
        value.hash_into(&mut hasher);
        hasher.finish()
    }

    /// Combine an ordered list of part hashes into one
    ///
    /// Order matters: `combine([a, b]) != combine([b, a])`.
    #[must_use]
    pub fn combine(parts: &[RecordHash]) -> Self {
        let mut hasher = blake3::Hasher::new();
        hasher.update(b"scat.record.v1");
        for part in parts {
            hasher.update(&part.0);
        }
        Self::new(*hasher.finalize().as_bytes())
    }

    /// Short string representation (first 16 hex chars)
    #[inline]
    #[must_use]
    pub fn short(&self) -> String {
        hex::encode(&self.0[..8])
    }
}

impl Display for RecordHash {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", hex::encode(self.0))
    }
}

impl FromStr for RecordHash {
    type Err = HashError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bytes = hex::decode(s)?;
        Self::from_slice(&bytes)
    }
}

impl serde::Serialize for RecordHash {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> serde::Deserialize<'de> for RecordHash {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// Incremental Blake3 encoder for record parts
///
/// Every variable-length field is length-prefixed so adjacent fields can
/// never collide (`"ab" + "c"` hashes differently from `"a" + "bc"`).
#[derive(Debug, Clone, Default)]
pub struct RecordHasher {
    inner: blake3::Hasher,
}

impl RecordHasher {
    /// Create an empty hasher
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed a single tag byte
    #[inline]
    pub fn byte(&mut self, b: u8) -> &mut Self {
        self.inner.update(&[b]);
        self
    }

    /// Feed a u32 (little endian)
    #[inline]
    pub fn u32(&mut self, v: u32) -> &mut Self {
        self.inner.update(&v.to_le_bytes());
        self
    }

    /// Feed a u64 (little endian)
    #[inline]
    pub fn u64(&mut self, v: u64) -> &mut Self {
        self.inner.update(&v.to_le_bytes());
        self
    }

    /// Feed a length-prefixed string
    #[inline]
    pub fn str(&mut self, s: &str) -> &mut Self {
        self.u64(s.len() as u64);
        self.inner.update(s.as_bytes());
        self
    }

    /// Feed an optional string (presence byte, then the value)
    #[inline]
    pub fn opt_str(&mut self, s: Option<&str>) -> &mut Self {
        match s {
            Some(s) => self.byte(1).str(s),
            None => self.byte(0),
        }
    }

    /// Finish and produce the hash
    #[inline]
    #[must_use]
    pub fn finish(&self) -> RecordHash {
        RecordHash::new(*self.inner.finalize().as_bytes())
    }
}

/// Types that can feed themselves into a [`RecordHasher`]
pub trait HashInto {
    /// Feed every field that contributes to equality
    fn hash_into(&self, hasher: &mut RecordHasher);
}

/// Errors that can occur when working with record hashes
#[derive(Debug, thiserror::Error)]
pub enum HashError {
    /// Invalid hash length
    #[error("invalid hash length: expected {expected}, got {actual}")]
    InvalidLength { expected: usize, actual: usize },

    /// Hex encoding error
    #[error("hex decode error: {0}")]
    HexDecode(#[from] hex::FromHexError),
}
