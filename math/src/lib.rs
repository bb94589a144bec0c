//! Fixed-width integers used by consensus.
//!
//! `Uint192` carries accumulated blue work; the `difficulty` module converts compact
//! `bits` into 256-bit targets and per-block work.

pub mod difficulty;
mod uint;

pub use difficulty::{calc_work, compact_to_target, target_to_compact};
pub use primitive_types::{U256, U512};
pub use uint::Uint192;
