//! Numeric helpers for tool output

use crate::{Error, Result};

/// Bytes per megabyte (binary).
pub const BYTES_PER_MB: f64 = 1024.0 * 1024.0;

/// Parse an integer printed with thousands separators, e.g. `2,513,972`.
///
/// # Errors
///
/// Returns [`Error::ParseError`] naming `field` if the digits don't fit.
pub fn parse_grouped_u64(field: &str, raw: &str) -> Result<u64> {
    let digits: String = raw.chars().filter(|c| *c != ',').collect();
    digits.parse().map_err(|e| Error::parse(field, raw, e))
}

/// Parse a float printed with thousands separators, e.g. `1,024.5`.
///
/// # Errors
///
/// Returns [`Error::ParseError`] naming `field` on malformed input.
pub fn parse_grouped_f64(field: &str, raw: &str) -> Result<f64> {
    let digits: String = raw.chars().filter(|c| *c != ',').collect();
    digits.parse().map_err(|e| Error::parse(field, raw, e))
}

/// Which multiplier a `K/M/G` suffix stands for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scale {
    /// Powers of 1000
    Decimal,
    /// Powers of 1024
    Binary,
}

impl Scale {
    const fn base(self) -> f64 {
        match self {
            Self::Decimal => 1000.0,
            Self::Binary => 1024.0,
        }
    }
}

/// Parse a number with an optional `K`, `M`, or `G` suffix.
///
/// # Errors
///
/// Returns [`Error::ParseError`] naming `field` if the mantissa is not a number.
pub fn parse_scaled(field: &str, raw: &str, scale: Scale) -> Result<f64> {
    let raw = raw.trim();
    let (number, exponent) = match raw.chars().last() {
        Some('K') => (&raw[..raw.len() - 1], 1),
        Some('M') => (&raw[..raw.len() - 1], 2),
        Some('G') => (&raw[..raw.len() - 1], 3),
        _ => (raw, 0),
    };
    let mantissa: f64 = number
        .trim()
        .parse()
        .map_err(|e| Error::parse(field, raw, e))?;
    Ok(mantissa * scale.base().powi(exponent))
}

/// Bytes to MB (1024²).
#[must_use]
pub fn bytes_to_mb(bytes: f64) -> f64 {
    bytes / BYTES_PER_MB
}
