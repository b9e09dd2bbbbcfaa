//! Join-code generation.

use rand::Rng;

/// All join codes are this many digits.
pub const CODE_LENGTH: usize = 6;

/// Produces a fixed-length numeric code, uniformly distributed over the
/// full range including leading zeros. Uniqueness among currently valid
/// sessions is the store's job, not this function's.
pub fn generate() -> String {
    let n: u32 = rand::thread_rng().gen_range(0..1_000_000);
    format!("{n:06}")
}
