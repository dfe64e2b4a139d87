//! Cell formatting for result rows

use std::fmt;

/// Bandwidth unit of a value handed to [`fmt_bw`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BwUnit {
    /// Megabytes per second; promoted to GB/s at 1000
    MegabytesPerSec,
    /// Gigabits per second; promoted to Tb/s at 1000
    GigabitsPerSec,
}

impl BwUnit {
    const fn label(self) -> &'static str {
        match self {
            Self::MegabytesPerSec => "MB/s",
            Self::GigabitsPerSec => "Gb/s",
        }
    }

    const fn promoted(self) -> &'static str {
        match self {
            Self::MegabytesPerSec => "GB/s",
            Self::GigabitsPerSec => "Tb/s",
        }
    }
}

impl fmt::Display for BwUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// `2.5M`, `1.5K`, or the integer part below 1000.
#[must_use]
#[allow(clippy::cast_possible_truncation)]
pub fn fmt_count(n: f64) -> String {
    if n >= 1_000_000.0 {
        format!("{:.1}M", n / 1_000_000.0)
    } else if n >= 1_000.0 {
        format!("{:.1}K", n / 1_000.0)
    } else {
        format!("{}", n.trunc() as i64)
    }
}

/// One decimal from 0.1 up; below that, enough decimals to show the first
/// significant digit, at most 6.
#[must_use]
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn fmt_small_value(value: f64, unit: &str) -> String {
    if value == 0.0 {
        return format!("0{unit}");
    }
    if value >= 0.1 {
        return format!("{value:.1}{unit}");
    }
    let decimals = (-value.abs().log10().floor()).clamp(1.0, 6.0) as usize;
    format!("{value:.decimals$}{unit}")
}

/// Shortest round-trip form; whole numbers keep one decimal (`14.0`, `0.8`).
#[must_use]
pub fn fmt_float(value: f64) -> String {
    if value.is_finite() && value.fract() == 0.0 {
        format!("{value:.1}")
    } else {
        value.to_string()
    }
}

/// Two decimals with unit promotion at 1000.
#[must_use]
pub fn fmt_bw(value: f64, unit: BwUnit) -> String {
    if value >= 1000.0 {
        format!("{:.2}{}", value / 1000.0, unit.promoted())
    } else {
        format!("{value:.2}{unit}")
    }
}
