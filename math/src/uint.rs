use primitive_types::U256;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign};

/// 192-bit unsigned integer stored as 3 little-endian u64 limbs.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Uint192([u64; 3]);

impl Uint192 {
    pub const ZERO: Uint192 = Uint192([0; 3]);
    pub const MAX: Uint192 = Uint192([u64::MAX; 3]);

    pub const fn from_limbs(limbs: [u64; 3]) -> Self {
        Self(limbs)
    }

    pub fn limbs(&self) -> [u64; 3] {
        self.0
    }

    /// Returns little-endian bytes (24 bytes)
    pub fn to_le_bytes(&self) -> [u8; 24] {
        let mut out = [0u8; 24];
        out[0..8].copy_from_slice(&self.0[0].to_le_bytes());
        out[8..16].copy_from_slice(&self.0[1].to_le_bytes());
        out[16..24].copy_from_slice(&self.0[2].to_le_bytes());
        out
    }

    pub fn from_le_bytes(bytes: [u8; 24]) -> Self {
        let mut limbs = [0u64; 3];
        for (i, limb) in limbs.iter_mut().enumerate() {
            let mut word = [0u8; 8];
            word.copy_from_slice(&bytes[i * 8..(i + 1) * 8]);
            *limb = u64::from_le_bytes(word);
        }
        Self(limbs)
    }

    pub fn is_zero(&self) -> bool {
        self.0 == [0; 3]
    }

    pub fn checked_add(self, rhs: Self) -> Option<Self> {
        let (r0, c0) = self.0[0].overflowing_add(rhs.0[0]);
        let (r1a, c1a) = self.0[1].overflowing_add(rhs.0[1]);
        let (r1, c1b) = r1a.overflowing_add(c0 as u64);
        let (r2a, c2a) = self.0[2].overflowing_add(rhs.0[2]);
        let (r2, c2b) = r2a.overflowing_add((c1a || c1b) as u64);
        if c2a || c2b {
            None
        } else {
            Some(Self([r0, r1, r2]))
        }
    }

    pub fn saturating_add(self, rhs: Self) -> Self {
        self.checked_add(rhs).unwrap_or(Self::MAX)
    }

    /// Narrows a 256-bit value, saturating at `Uint192::MAX`.
    pub fn saturating_from_u256(value: U256) -> Self {
        let U256(limbs) = value;
        if limbs[3] != 0 {
            return Self::MAX;
        }
        Self([limbs[0], limbs[1], limbs[2]])
    }
}

impl From<u64> for Uint192 {
    fn from(v: u64) -> Self {
        Self([v, 0, 0])
    }
}

impl From<Uint192> for U256 {
    fn from(v: Uint192) -> Self {
        U256([v.0[0], v.0[1], v.0[2], 0])
    }
}

impl Ord for Uint192 {
    fn cmp(&self, other: &Self) -> Ordering {
        // most significant limb first
        self.0.iter().rev().cmp(other.0.iter().rev())
    }
}

impl PartialOrd for Uint192 {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Blue work never realistically exceeds 192 bits; overflow saturates instead of wrapping.
impl AddAssign for Uint192 {
    fn add_assign(&mut self, rhs: Self) {
        *self = self.saturating_add(rhs);
    }
}

impl Add for Uint192 {
    type Output = Uint192;
    fn add(self, rhs: Self) -> Self::Output {
        self.saturating_add(rhs)
    }
}

impl Sum for Uint192 {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::ZERO, |acc, x| acc + x)
    }
}

impl fmt::Display for Uint192 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x")?;
        let bytes = self.to_le_bytes();
        let mut started = false;
        for byte in bytes.iter().rev() {
            if !started && *byte == 0 {
                continue;
            }
            if started {
                write!(f, "{:02x}", byte)?;
            } else {
                write!(f, "{:x}", byte)?;
                started = true;
            }
        }
        if !started {
            write!(f, "0")?;
        }
        Ok(())
    }
}
