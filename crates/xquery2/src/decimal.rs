//! Fixed-point decimal helpers.
//!
//! `bigdecimal::BigDecimal` gives us arbitrary-precision decimal arithmetic, never
//! binary floating point, at half-up rounding. There's no global rounding context to
//! carry (`BigDecimal` is always exact until you explicitly round), so every call
//! site that needs the canonical 38-fractional-digit representation goes through
//! [`quantize`].

use bigdecimal::{BigDecimal, RoundingMode};
use num::BigInt;

/// Maximum number of fractional decimal places a token amount or derived price is
/// stored with: token decimals are asserted `<= MAX_DECIMAL_PLACES`, and prices are
/// quantized to `MAX_DECIMAL_PLACES` fractional digits.
pub const MAX_DECIMAL_PLACES: u32 = 38;

/// Rounding mode used throughout: half-up, matching `ROUND_HALF_UP`.
pub const ROUNDING: RoundingMode = RoundingMode::HalfUp;

/// Quantize `value` to `MAX_DECIMAL_PLACES` fractional digits, half-up.
pub fn quantize(value: &BigDecimal) -> BigDecimal {
    value.with_scale_round(MAX_DECIMAL_PLACES as i64, ROUNDING)
}

/// Convert a raw on-chain token amount (an integer number of the smallest unit) into a
/// decimal value scaled by `decimals` fractional digits.
///
/// Mirrors `token_to_decimal(value, decimals)`.
pub fn token_to_decimal(value: impl Into<BigInt>, decimals: u32) -> BigDecimal {
    let unscaled: BigInt = value.into();
    BigDecimal::new(unscaled, decimals as i64)
}
