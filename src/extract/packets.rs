//! Packet counters from l3fwd and pktgen logs
//!
//! Both applications print a final summary on exit:
//!
//! ```text
//! ======== PKTGEN Packet Statistics Summary ========
//! Core     RX           TX           RX Mpps    TX Mpps    TX %
//! 1        50349059     0            10.0       0.0        100.0
//! Total    384740568    611909280                          59.0
//! ==================================================
//! ```
//!
//! When the run is cut short the summary is missing, but the periodic
//! per-core rows are still there; those are summed as a fallback.

use std::collections::BTreeMap;

use regex::Regex;

use super::strategy::{first_success, Strategy};
use crate::experiment::{LogKind, TrialStatus};
use crate::Result;

/// DPDK application whose log is being read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum App {
    /// `dpdk-l3fwd`
    L3fwd,
    /// `pktgen`
    Pktgen,
}

impl App {
    /// Name printed in the statistics banner.
    #[must_use]
    pub const fn banner(self) -> &'static str {
        match self {
            Self::L3fwd => "L3FWD",
            Self::Pktgen => "PKTGEN",
        }
    }

    /// Log this application writes.
    #[must_use]
    pub const fn log_kind(self) -> LogKind {
        match self {
            Self::L3fwd => LogKind::L3fwd,
            Self::Pktgen => LogKind::Pktgen,
        }
    }
}

/// Total received and transmitted packets.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PacketTotals {
    /// Received packets
    pub rx: u64,
    /// Transmitted packets
    pub tx: u64,
}

/// `Total RX TX` line inside the application's summary section.
#[derive(Debug)]
pub struct SummaryTotal {
    re: Regex,
}

impl SummaryTotal {
    /// Strategy for `app`'s summary banner.
    ///
    /// # Errors
    ///
    /// Fails only if the pattern does not compile.
    pub fn new(app: App) -> Result<Self> {
        let pattern = format!(
            r"(?s){} Packet Statistics Summary.*?Total\s+(\d+)\s+(\d+).*?=====",
            app.banner()
        );
        Ok(Self {
            re: Regex::new(&pattern)?,
        })
    }
}

impl Strategy<PacketTotals> for SummaryTotal {
    fn name(&self) -> &'static str {
        "summary-total"
    }

    fn apply(&self, text: &str) -> Option<PacketTotals> {
        let caps = self.re.captures(text)?;
        Some(PacketTotals {
            rx: caps[1].parse().ok()?,
            tx: caps[2].parse().ok()?,
        })
    }
}

/// Sum of the last reported `core rx tx f f f` row of every core.
#[derive(Debug)]
pub struct PerCoreSum {
    re: Regex,
}

impl PerCoreSum {
    /// Build the per-core row matcher.
    ///
    /// # Errors
    ///
    /// Fails only if the pattern does not compile.
    pub fn new() -> Result<Self> {
        Ok(Self {
            re: Regex::new(r"(?m)^\s*(\d+)\s+(\d+)\s+(\d+)\s+[\d.]+\s+[\d.]+\s+[\d.]+")?,
        })
    }

    /// Last `(rx, tx)` seen for each core id.
    #[must_use]
    pub fn latest_per_core(&self, text: &str) -> BTreeMap<u32, PacketTotals> {
        let mut cores = BTreeMap::new();
        for caps in self.re.captures_iter(text) {
            let (Ok(core), Ok(rx), Ok(tx)) = (
                caps[1].parse::<u32>(),
                caps[2].parse::<u64>(),
                caps[3].parse::<u64>(),
            ) else {
                continue;
            };
            cores.insert(core, PacketTotals { rx, tx });
        }
        cores
    }
}

impl Strategy<PacketTotals> for PerCoreSum {
    fn name(&self) -> &'static str {
        "per-core-sum"
    }

    fn apply(&self, text: &str) -> Option<PacketTotals> {
        let cores = self.latest_per_core(text);
        if cores.is_empty() {
            return None;
        }
        Some(cores.values().fold(PacketTotals::default(), |acc, c| PacketTotals {
            rx: acc.rx.saturating_add(c.rx),
            tx: acc.tx.saturating_add(c.tx),
        }))
    }
}

/// Packet totals plus how they were obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PacketCount {
    /// Totals, zero unless `status` is success
    pub totals: PacketTotals,
    /// Outcome for this log
    pub status: TrialStatus,
    /// Winning strategy, if any
    pub strategy: Option<&'static str>,
}

impl PacketCount {
    /// Result for a log that does not exist.
    #[must_use]
    pub const fn missing() -> Self {
        Self {
            totals: PacketTotals { rx: 0, tx: 0 },
            status: TrialStatus::Unknown,
            strategy: None,
        }
    }
}

/// Packet counters for one application.
#[derive(Debug)]
pub struct PacketParser {
    app: App,
    summary: SummaryTotal,
    per_core: PerCoreSum,
    hw_missed: Regex,
}

impl PacketParser {
    /// Compile the patterns for `app`.
    ///
    /// # Errors
    ///
    /// Fails only if a pattern does not compile.
    pub fn new(app: App) -> Result<Self> {
        Ok(Self {
            app,
            summary: SummaryTotal::new(app)?,
            per_core: PerCoreSum::new()?,
            hw_missed: Regex::new(r"Hardware RX Missed:\s+(\d+)")?,
        })
    }

    /// Application this parser reads.
    #[must_use]
    pub const fn app(&self) -> App {
        self.app
    }

    /// Summary total, else per-core sum, else a status guess from the text.
    #[must_use]
    pub fn totals(&self, text: &str) -> PacketCount {
        match first_success(text, &[&self.summary, &self.per_core]) {
            Some(found) => PacketCount {
                totals: found.value,
                status: TrialStatus::Success,
                strategy: Some(found.strategy),
            },
            None => PacketCount {
                totals: PacketTotals::default(),
                status: if text.contains("Error") || text.contains("error") {
                    TrialStatus::Error
                } else {
                    TrialStatus::Running
                },
                strategy: None,
            },
        }
    }

    /// `Hardware RX Missed` counter, 0 when absent.
    #[must_use]
    pub fn hw_rx_missed(&self, text: &str) -> u64 {
        self.hw_missed
            .captures(text)
            .and_then(|caps| caps[1].parse().ok())
            .unwrap_or(0)
    }
}
