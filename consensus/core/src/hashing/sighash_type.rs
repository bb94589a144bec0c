use serde::{Deserialize, Serialize};

pub const SIG_HASH_ALL: SigHashType = SigHashType(0b0000_0001);
pub const SIG_HASH_NONE: SigHashType = SigHashType(0b0000_0010);
pub const SIG_HASH_SINGLE: SigHashType = SigHashType(0b0000_0100);
pub const SIG_HASH_ANY_ONE_CAN_PAY: SigHashType = SigHashType(0b1000_0000);

const SIG_HASH_MASK: u8 = 0b0000_0111;

const ALLOWED_SIG_HASH_TYPES_VALUES: [u8; 6] = [
    SIG_HASH_ALL.0,
    SIG_HASH_NONE.0,
    SIG_HASH_SINGLE.0,
    SIG_HASH_ALL.0 | SIG_HASH_ANY_ONE_CAN_PAY.0,
    SIG_HASH_NONE.0 | SIG_HASH_ANY_ONE_CAN_PAY.0,
    SIG_HASH_SINGLE.0 | SIG_HASH_ANY_ONE_CAN_PAY.0,
];

/// Selects which inputs and outputs a signature commits to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SigHashType(u8);

impl SigHashType {
    pub fn is_sighash_all(self) -> bool {
        self.0 & SIG_HASH_MASK == SIG_HASH_ALL.0
    }

    pub fn is_sighash_none(self) -> bool {
        self.0 & SIG_HASH_MASK == SIG_HASH_NONE.0
    }

    pub fn is_sighash_single(self) -> bool {
        self.0 & SIG_HASH_MASK == SIG_HASH_SINGLE.0
    }

    pub fn is_sighash_anyone_can_pay(self) -> bool {
        self.0 & SIG_HASH_ANY_ONE_CAN_PAY.0 == SIG_HASH_ANY_ONE_CAN_PAY.0
    }

    pub fn to_u8(self) -> u8 {
        self.0
    }

    /// Only the six defined combinations are accepted
    pub fn from_u8(val: u8) -> Option<Self> {
        ALLOWED_SIG_HASH_TYPES_VALUES.contains(&val).then_some(Self(val))
    }
}

impl Default for SigHashType {
    fn default() -> Self {
        SIG_HASH_ALL
    }
}
