//! Packet rates and losses

use super::series::round_to;

/// Packets per second in millions, 3 decimals; 0 for a zero duration.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn mpps(packets: u64, duration_secs: u64) -> f64 {
    if duration_secs == 0 {
        return 0.0;
    }
    round_to(packets as f64 / (duration_secs as f64 * 1e6), 3)
}

/// Packets lost between `upstream` and `downstream`, in millions, 3
/// decimals. Negative when downstream saw more.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn loss_millions(upstream: u64, downstream: u64) -> f64 {
    let loss = round_to((upstream as f64 - downstream as f64) / 1e6, 3);
    // avoid rendering "-0"
    if loss == 0.0 {
        0.0
    } else {
        loss
    }
}
