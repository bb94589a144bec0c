//! Elliptic curve multiset hash for UTXO set commitments.
//!
//! Each element is mapped onto a secp256k1 point (try-and-increment over a
//! domain separated BLAKE2b hash); the multiset is the sum of its points. Adding
//! and removing are point addition and subtraction, so updates commute and an
//! element may be removed before it is added. Finding two multisets with the
//! same sum reduces to the discrete log problem on the curve.

use crypto_hashes::hashers::{MultisetElementHash, MultisetFinalizeHash};
use crypto_hashes::{Hash, Hasher, HasherBase, HasherExtensions};
use once_cell::sync::Lazy;
use secp256k1::{Parity, PublicKey, Secp256k1, VerifyOnly, XOnlyPublicKey};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;

/// Uncompressed point coordinates `x || y`, big endian
pub const SERIALIZED_MULTISET_SIZE: usize = 64;

static SECP: Lazy<Secp256k1<VerifyOnly>> = Lazy::new(Secp256k1::verification_only);

/// Finalized hash of the empty multiset
pub static EMPTY_MULTISET_HASH: Lazy<Hash> = Lazy::new(|| EcMultiset::new().finalize());

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MultisetError {
    #[error("serialized multiset is not a point on secp256k1")]
    InvalidPoint,
}

/// Stored form of an [`EcMultiset`]. All zeros is the empty multiset.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SerializedMultiset([u8; SERIALIZED_MULTISET_SIZE]);

impl SerializedMultiset {
    pub const fn from_bytes(bytes: [u8; SERIALIZED_MULTISET_SIZE]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; SERIALIZED_MULTISET_SIZE] {
        &self.0
    }

    fn halves(&self) -> ([u8; 32], [u8; 32]) {
        let mut x = [0u8; 32];
        let mut y = [0u8; 32];
        x.copy_from_slice(&self.0[..32]);
        y.copy_from_slice(&self.0[32..]);
        (x, y)
    }
}

impl Default for SerializedMultiset {
    fn default() -> Self {
        Self([0u8; SERIALIZED_MULTISET_SIZE])
    }
}

impl Serialize for SerializedMultiset {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.halves().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for SerializedMultiset {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let (x, y) = <([u8; 32], [u8; 32])>::deserialize(deserializer)?;
        let mut bytes = [0u8; SERIALIZED_MULTISET_SIZE];
        bytes[..32].copy_from_slice(&x);
        bytes[32..].copy_from_slice(&y);
        Ok(Self(bytes))
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct EcMultiset {
    /// `None` is the point at infinity
    point: Option<PublicKey>,
}

impl EcMultiset {
    pub fn new() -> Self {
        Self { point: None }
    }

    pub fn add_element(&mut self, data: &[u8]) {
        self.add_point(element_to_point(data));
    }

    pub fn remove_element(&mut self, data: &[u8]) {
        self.add_point(element_to_point(data).negate(&*SECP));
    }

    /// Merges another multiset into this one, removals of both sides included
    pub fn combine(&mut self, other: &Self) {
        if let Some(point) = other.point {
            self.add_point(point);
        }
    }

    pub fn is_empty(&self) -> bool {
        self.point.is_none()
    }

    fn add_point(&mut self, point: PublicKey) {
        self.point = match self.point {
            None => Some(point),
            // Fails only when the sum is the point at infinity
            Some(current) => current.combine(&point).ok(),
        };
    }

    pub fn serialize(&self) -> SerializedMultiset {
        let mut bytes = [0u8; SERIALIZED_MULTISET_SIZE];
        if let Some(point) = self.point {
            bytes.copy_from_slice(&point.serialize_uncompressed()[1..]);
        }
        SerializedMultiset(bytes)
    }

    pub fn deserialize(serialized: SerializedMultiset) -> Result<Self, MultisetError> {
        if serialized == SerializedMultiset::default() {
            return Ok(Self::new());
        }
        let mut uncompressed = [0u8; SERIALIZED_MULTISET_SIZE + 1];
        uncompressed[0] = 0x04;
        uncompressed[1..].copy_from_slice(serialized.as_bytes());
        let point = PublicKey::from_slice(&uncompressed).map_err(|_| MultisetError::InvalidPoint)?;
        Ok(Self { point: Some(point) })
    }

    pub fn finalize(&self) -> Hash {
        MultisetFinalizeHash::hash(self.serialize().as_bytes())
    }
}

fn element_to_point(data: &[u8]) -> PublicKey {
    let mut counter = 0u64;
    loop {
        let mut hasher = MultisetElementHash::new();
        hasher.write_u64(counter).update(data);
        // About half of all x coordinates lie on the curve
        if let Ok(x) = XOnlyPublicKey::from_slice(hasher.finalize().as_bytes()) {
            return PublicKey::from_x_only_public_key(x, Parity::Even);
        }
        counter += 1;
    }
}
