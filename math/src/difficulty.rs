use crate::Uint192;
use primitive_types::U256;

/// Decodes compact difficulty `bits` into a 256-bit target.
///
/// Returns `None` for negative or overflowing encodings.
pub fn compact_to_target(bits: u32) -> Option<U256> {
    let exponent = bits >> 24;
    let mantissa = bits & 0x007f_ffff;
    if bits & 0x0080_0000 != 0 && mantissa != 0 {
        return None;
    }
    if exponent <= 3 {
        return Some(U256::from(mantissa >> (8 * (3 - exponent))));
    }
    let overflows = mantissa != 0 && (exponent > 34 || (mantissa > 0xff && exponent > 33) || (mantissa > 0xffff && exponent > 32));
    if overflows {
        return None;
    }
    Some(U256::from(mantissa) << (8 * (exponent - 3) as usize))
}

/// Encodes a target into compact `bits`, dropping precision below the top 3 bytes.
pub fn target_to_compact(target: U256) -> u32 {
    let mut size = ((target.bits() + 7) / 8) as u32;
    let mut compact = if size <= 3 {
        (target.low_u64() << (8 * (3 - size))) as u32
    } else {
        (target >> (8 * (size - 3) as usize)).low_u64() as u32
    };
    if compact & 0x0080_0000 != 0 {
        compact >>= 8;
        size += 1;
    }
    compact | (size << 24)
}

/// Expected number of hashes needed to hit the target encoded in `bits`,
/// i.e. `2^256 / (target + 1)`. Invalid or zero targets carry no work.
pub fn calc_work(bits: u32) -> Uint192 {
    let target = match compact_to_target(bits) {
        Some(target) if !target.is_zero() => target,
        _ => return Uint192::ZERO,
    };
    let (denominator, overflow) = target.overflowing_add(U256::one());
    if overflow {
        return Uint192::from(1u64);
    }
    // (2^256 - target - 1) / (target + 1) + 1 == 2^256 / (target + 1)
    let work = (!target / denominator) + U256::one();
    Uint192::saturating_from_u256(work)
}
