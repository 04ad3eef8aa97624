//! Helpers for reading bit-packed fields out of fixed-width words.
//!
//! Waters stores many small values packed into a single 16 or 32 bit word.
//! All masking here is done on unsigned integers, with the signed/unsigned
//! reinterpretation kept in [`to_unsigned32`] and [`to_signed32`].

/// Build a mask covering the inclusive bit range `start_bit..=end_bit` of a
/// 32-bit word.
///
/// The mask is built in a 64-bit register so that ranges touching bit 31 never
/// produce a sign-extended or overflowing intermediate.
///
/// # Panics
/// In debug builds, if `start_bit > end_bit` or `end_bit > 31`.
#[inline]
pub const fn mask(start_bit: u32, end_bit: u32) -> u32 {
    debug_assert!(start_bit <= end_bit && end_bit < 32);
    let width = end_bit - start_bit + 1;
    let ones = (1u64 << width) - 1;
    (ones << start_bit) as u32
}

/// Extract the inclusive bit range `start_bit..=end_bit` of `word`, shifted
/// down so that `start_bit` becomes bit 0.
#[inline]
pub const fn extract(word: u32, start_bit: u32, end_bit: u32) -> u32 {
    (word & mask(start_bit, end_bit)) >> start_bit
}

/// Reinterpret a 32-bit signed pattern as unsigned without changing its bits
#[inline]
pub const fn to_unsigned32(value: i32) -> u32 {
    value as u32
}

/// Reinterpret a 32-bit unsigned pattern as signed without changing its bits
#[inline]
pub const fn to_signed32(value: u32) -> i32 {
    value as i32
}
