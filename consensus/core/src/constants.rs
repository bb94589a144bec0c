use crate::KType;

/// Current block version
pub const BLOCK_VERSION: u16 = 1;

/// Current transaction version
pub const TX_VERSION: u16 = 0;

/// Number of sompi (base units) in one Jiocoin
pub const SOMPI_PER_JIO: u64 = 100_000_000;

/// Upper bound on the amount any single output or sum of outputs may carry
pub const MAX_SOMPI: u64 = 29_000_000_000 * SOMPI_PER_JIO;

/// GhostDAG K parameter used by the default configuration
pub const DEFAULT_GHOSTDAG_K: KType = 18;

/// Lock times below this value are interpreted as DAA/blue-score heights, above as
/// millisecond timestamps.
pub const LOCK_TIME_THRESHOLD: u64 = 500_000_000_000;

/// An input with this sequence is final and ignores lock times
pub const MAX_TX_IN_SEQUENCE_NUM: u64 = u64::MAX;

/// When set on an input sequence, relative lock time is disabled for that input
pub const SEQUENCE_LOCK_TIME_DISABLED: u64 = 1 << 63;

/// Mask extracting the relative lock time from an input sequence
pub const SEQUENCE_LOCK_TIME_MASK: u64 = 0x0000_0000_ffff_ffff;

/// Length of the blue score prefix every coinbase payload starts with
pub const COINBASE_PAYLOAD_BLUE_SCORE_LEN: usize = 8;
