pub mod hasher;
pub mod hashers;
pub mod merkle;

pub use hasher::{sha256, HashWriter};
pub use hashers::{Hasher, HasherBase, HasherExtensions};
pub use merkle::calc_merkle_root;

use serde::{Deserialize, Serialize};
use std::fmt;
use std::hash::Hash as StdHash;
use std::str::FromStr;

pub const HASH_SIZE: usize = 32;

/// The all-zero hash. Used as the parent of the genesis block in tree-shaped stores.
pub const ZERO_HASH: Hash = Hash([0u8; HASH_SIZE]);

/// A 32-byte hash wrapper used across the project.
///
/// Ordering is byte-lexicographic; consensus tie-breaks ("smaller hash wins")
/// rely on it being a total order.
#[derive(Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Hash([u8; HASH_SIZE]);

impl Hash {
    pub const fn from_bytes(bytes: [u8; HASH_SIZE]) -> Self {
        Self(bytes)
    }

    /// Returns raw bytes
    pub fn as_bytes(&self) -> &[u8; HASH_SIZE] {
        &self.0
    }

    pub fn to_bytes(self) -> [u8; HASH_SIZE] {
        self.0
    }

    /// Constructs a hash from four little-endian u64s (used in tests)
    pub const fn from_le_u64(parts: [u64; 4]) -> Self {
        let mut bytes = [0u8; HASH_SIZE];
        let mut i = 0;
        while i < 4 {
            let le = parts[i].to_le_bytes();
            let mut j = 0;
            while j < 8 {
                bytes[i * 8 + j] = le[j];
                j += 1;
            }
            i += 1;
        }
        Self(bytes)
    }

    pub fn to_le_u64(&self) -> [u64; 4] {
        let mut out = [0u64; 4];
        for (i, chunk) in self.0.chunks_exact(8).enumerate() {
            let mut word = [0u8; 8];
            word.copy_from_slice(chunk);
            out[i] = u64::from_le_bytes(word);
        }
        out
    }

    /// Shorthand for test fixtures: a hash whose first word is `word`
    pub const fn from_u64_word(word: u64) -> Self {
        Self::from_le_u64([word, 0, 0, 0])
    }

    pub fn try_from_slice(slice: &[u8]) -> Result<Self, std::array::TryFromSliceError> {
        let array: [u8; HASH_SIZE] = slice.try_into()?;
        Ok(Self(array))
    }
}

impl From<[u8; HASH_SIZE]> for Hash {
    fn from(bytes: [u8; HASH_SIZE]) -> Self {
        Self(bytes)
    }
}

impl From<Hash> for [u8; HASH_SIZE] {
    fn from(h: Hash) -> Self {
        h.0
    }
}

impl TryFrom<&[u8]> for Hash {
    type Error = std::array::TryFromSliceError;

    fn try_from(slice: &[u8]) -> Result<Self, Self::Error> {
        Self::try_from_slice(slice)
    }
}

impl AsRef<[u8]> for Hash {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Display for Hash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode(self.0))
    }
}

impl fmt::Debug for Hash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Hash({})", hex::encode(self.0))
    }
}

impl FromStr for Hash {
    type Err = hex::FromHexError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut bytes = [0u8; HASH_SIZE];
        hex::decode_to_slice(s, &mut bytes)?;
        Ok(Self(bytes))
    }
}

impl StdHash for Hash {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        // Hashes are uniformly distributed, one word is enough for map bucketing
        let mut le = [0u8; 8];
        le.copy_from_slice(&self.0[0..8]);
        u64::from_le_bytes(le).hash(state);
    }
}

#[cfg(test)]
mod tests {
    use super::Hash;
    use std::str::FromStr;

    #[test]
    fn from_le_u64_layout() {
        let h = Hash::from_le_u64([1, 2, 3, 4]);
        let bytes = h.as_bytes();
        assert_eq!(&bytes[0..8], &1u64.to_le_bytes());
        assert_eq!(&bytes[8..16], &2u64.to_le_bytes());
        assert_eq!(&bytes[24..32], &4u64.to_le_bytes());
        assert_eq!(h.to_le_u64(), [1, 2, 3, 4]);
    }

    #[test]
    fn hex_display_parses_back() {
        let h = Hash::from_le_u64([0xdead_beef, 7, 0, u64::MAX]);
        assert_eq!(Hash::from_str(&h.to_string()).unwrap(), h);
        assert!(Hash::from_str("abcd").is_err());
    }

    #[test]
    fn ordering_is_bytewise() {
        let a = Hash::from_bytes([0u8; 32]);
        let mut raw = [0u8; 32];
        raw[31] = 1;
        let b = Hash::from_bytes(raw);
        assert!(a < b);
    }
}
