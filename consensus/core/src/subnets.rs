use serde::{Deserialize, Serialize};
use std::fmt;

/// Size of a subnetwork ID in bytes
pub const SUBNETWORK_ID_SIZE: usize = 20;

/// Subnetwork of ordinary value transfers
pub const SUBNETWORK_ID_NATIVE: SubnetworkId = SubnetworkId::from_byte(0);

/// Subnetwork ID for coinbase transactions
pub const SUBNETWORK_ID_COINBASE: SubnetworkId = SubnetworkId::from_byte(1);

/// Represents a unique identifier for a subnetwork
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SubnetworkId([u8; SUBNETWORK_ID_SIZE]);

impl SubnetworkId {
    pub const fn new(bytes: [u8; SUBNETWORK_ID_SIZE]) -> Self {
        Self(bytes)
    }

    /// An id whose first byte is `b` and the rest zero
    pub const fn from_byte(b: u8) -> Self {
        let mut bytes = [0u8; SUBNETWORK_ID_SIZE];
        bytes[0] = b;
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; SUBNETWORK_ID_SIZE] {
        &self.0
    }

    /// Built-in subnetworks are the native and coinbase ones; they carry no gas
    pub fn is_builtin(&self) -> bool {
        *self == SUBNETWORK_ID_COINBASE
    }

    pub fn is_native(&self) -> bool {
        *self == SUBNETWORK_ID_NATIVE
    }

    pub fn is_builtin_or_native(&self) -> bool {
        self.is_native() || self.is_builtin()
    }
}

impl AsRef<[u8]> for SubnetworkId {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Display for SubnetworkId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", hex::encode(self.0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ordering_is_bytewise() {
        assert!(SUBNETWORK_ID_NATIVE < SUBNETWORK_ID_COINBASE);
        assert!(SUBNETWORK_ID_COINBASE < SubnetworkId::from_byte(2));
        assert!(SUBNETWORK_ID_NATIVE.is_builtin_or_native());
        assert!(!SubnetworkId::from_byte(9).is_builtin_or_native());
    }
}
