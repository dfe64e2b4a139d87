//! `pcm-pcie -B -e` output
//!
//! Column order varies between machines, so the three columns of interest
//! are located by name in the header row:
//!
//! ```text
//!  Skt | PCIRdCur | RFO | CRd | DRd | ItoM | PRd | WiL | PCIe Rd (B) | PCIe Wr (B)
//!  0 (Total)  12 M     ...                               1024 M        512 M
//!  0 (Miss)   345 K    ...
//!  0 (Hit)    11 M     ...
//! ```
//!
//! Only socket 0 (where the NIC sits) is used.

use regex::Regex;

use super::series::{round_to, SampleSeries};
use super::units::{bytes_to_mb, parse_scaled, Scale};
use crate::Result;

/// Averaged PCIe read-current and byte counters.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct PcmSummary {
    /// PCIRdCur total, millions
    pub rdcur_total_m: f64,
    /// PCIRdCur misses, millions
    pub rdcur_miss_m: f64,
    /// Miss / total, percent (0 when total is 0)
    pub ddio_miss_rate: f64,
    /// PCIe read bytes, MB
    pub rd_mb: f64,
    /// PCIe written bytes, MB
    pub wr_mb: f64,
    /// Socket-0 total rows seen
    pub samples: usize,
}

#[derive(Debug, Clone, Copy)]
struct Columns {
    rdcur: usize,
    rd: usize,
    wr: usize,
}

impl Columns {
    fn from_header(line: &str) -> Option<Self> {
        let names: Vec<&str> = line.split('|').map(str::trim).collect();
        let index = |name: &str| names.iter().position(|n| *n == name);
        Some(Self {
            rdcur: index("PCIRdCur")?,
            rd: index("PCIe Rd (B)")?,
            wr: index("PCIe Wr (B)")?,
        })
    }

    fn width(self) -> usize {
        self.rdcur.max(self.rd).max(self.wr) + 1
    }
}

/// Parses `pcm-pcie` event tables.
#[derive(Debug)]
pub struct PcmParser {
    socket: Regex,
    value: Regex,
}

impl PcmParser {
    /// Compile the row patterns.
    ///
    /// # Errors
    ///
    /// Fails only if a pattern does not compile.
    pub fn new() -> Result<Self> {
        Ok(Self {
            socket: Regex::new(r"^\s*(\d+)\s+")?,
            value: Regex::new(r"(\d+(?:\.\d+)?)\s*([KMG]?)")?,
        })
    }

    /// Warm-up filtered averages, or `None` when the header lacks a
    /// required column or no socket-0 total row exists.
    #[must_use]
    pub fn summarize(&self, text: &str) -> Option<PcmSummary> {
        let columns = text
            .lines()
            .find(|l| l.contains("Skt") && l.contains("PCIRdCur") && l.contains("PCIe Rd (B)"))
            .and_then(Columns::from_header)?;

        let mut total = SampleSeries::new();
        let mut miss = SampleSeries::new();
        let mut rd = SampleSeries::new();
        let mut wr = SampleSeries::new();

        for line in text.lines() {
            if line.contains("Skt") || line.contains("---") || line.trim().is_empty() {
                continue;
            }
            let Some(caps) = self.socket.captures(line) else {
                continue;
            };
            if caps[1].parse::<u32>().ok() != Some(0) {
                continue;
            }
            let is_total = line.contains("(Total)") || line.contains("(Aggregate)");
            let is_miss = line.contains("(Miss)");
            if !is_total && !is_miss {
                continue;
            }

            let values: Vec<String> = self
                .value
                .captures_iter(line)
                .map(|c| format!("{}{}", &c[1], &c[2]))
                .collect();
            if values.len() < columns.width() {
                continue;
            }
            let Ok(rdcur) = parse_scaled("PCIRdCur", &values[columns.rdcur], Scale::Decimal) else {
                continue;
            };
            if is_total {
                let (Ok(rd_bytes), Ok(wr_bytes)) = (
                    parse_scaled("PCIe Rd (B)", &values[columns.rd], Scale::Binary),
                    parse_scaled("PCIe Wr (B)", &values[columns.wr], Scale::Binary),
                ) else {
                    continue;
                };
                total.push_indexed(rdcur);
                rd.push_indexed(rd_bytes);
                wr.push_indexed(wr_bytes);
            } else {
                miss.push_indexed(rdcur);
            }
        }

        if total.is_empty() {
            return None;
        }
        let rdcur_total_m = round_to(total.warmup_mean() / 1e6, 3);
        let rdcur_miss_m = round_to(miss.warmup_mean() / 1e6, 3);
        let ddio_miss_rate = if rdcur_total_m > 0.0 {
            round_to(rdcur_miss_m / rdcur_total_m * 100.0, 2)
        } else {
            0.0
        };
        Some(PcmSummary {
            rdcur_total_m,
            rdcur_miss_m,
            ddio_miss_rate,
            rd_mb: round_to(bytes_to_mb(rd.warmup_mean()), 3),
            wr_mb: round_to(bytes_to_mb(wr.warmup_mean()), 3),
            samples: total.len(),
        })
    }
}
