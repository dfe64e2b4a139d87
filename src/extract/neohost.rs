//! Mellanox NeoHost device counters
//!
//! ```text
//! || Outbound Stalled Reads        || 1,234        ||
//! ||| PCIe Inbound Used BW         || 38.2015 [Gb/s] ||
//! ||| PCIe Outbound Used BW        || 12.5 [Gb/s]    ||
//! ```

use regex::Regex;

use super::series::{round_to, SampleSeries};
use super::units::{parse_grouped_f64, parse_grouped_u64};
use crate::Result;

/// Averaged NeoHost counters, 3 decimals.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct NeohostSummary {
    /// Outbound stalled reads
    pub outbound_stalled_reads: f64,
    /// PCIe inbound used bandwidth, Gb/s
    pub inbound_bw: f64,
    /// PCIe outbound used bandwidth, Gb/s
    pub outbound_bw: f64,
    /// Largest number of samples seen for any counter
    pub samples: usize,
}

impl NeohostSummary {
    /// True if no counter was sampled.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.samples == 0
    }
}

/// Parses NeoHost counter tables.
#[derive(Debug)]
pub struct NeohostParser {
    stalled: Regex,
    inbound: Regex,
    outbound: Regex,
}

impl NeohostParser {
    /// Compile the counter patterns.
    ///
    /// # Errors
    ///
    /// Fails only if a pattern does not compile.
    pub fn new() -> Result<Self> {
        Ok(Self {
            stalled: Regex::new(r"\|\|\s*Outbound Stalled Reads\s*\|\|\s*([\d,]+)\s*\|\|")?,
            inbound: Regex::new(r"\|\|\|\s*PCIe Inbound Used BW\s*\|\|\s*([\d,.]+)\s*\[Gb/s\]")?,
            outbound: Regex::new(r"\|\|\|\s*PCIe Outbound Used BW\s*\|\|\s*([\d,.]+)\s*\[Gb/s\]")?,
        })
    }

    /// Warm-up filtered averages; unparseable values are skipped.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn summarize(&self, text: &str) -> NeohostSummary {
        let mut stalled = SampleSeries::new();
        let mut inbound = SampleSeries::new();
        let mut outbound = SampleSeries::new();

        for line in text.lines() {
            if let Some(caps) = self.stalled.captures(line) {
                if let Ok(v) = parse_grouped_u64("Outbound Stalled Reads", &caps[1]) {
                    stalled.push_indexed(v as f64);
                }
            }
            if let Some(caps) = self.inbound.captures(line) {
                if let Ok(v) = parse_grouped_f64("PCIe Inbound Used BW", &caps[1]) {
                    inbound.push_indexed(v);
                }
            }
            if let Some(caps) = self.outbound.captures(line) {
                if let Ok(v) = parse_grouped_f64("PCIe Outbound Used BW", &caps[1]) {
                    outbound.push_indexed(v);
                }
            }
        }

        NeohostSummary {
            outbound_stalled_reads: round_to(stalled.warmup_mean(), 3),
            inbound_bw: round_to(inbound.warmup_mean(), 3),
            outbound_bw: round_to(outbound.warmup_mean(), 3),
            samples: stalled.len().max(inbound.len()).max(outbound.len()),
        }
    }
}
