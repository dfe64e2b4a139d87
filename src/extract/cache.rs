//! Per-core cache statistics from the embedded PCM report
//!
//! ```text
//! Intel PCM Core Performance Statistics
//! Core  Cycles      Instructions  IPC   L3 Misses  L2 Hit%  L3 Hit%  Freq  CPU%  Energy
//! ----  ----------  ------------  ----  ---------  -------  -------  ----  ----  ------
//! 0     123456789   98765432      0.80  1024       95.1     40.2     2.1   3.0   1.2
//! 1     ...
//! ----  ----------  ------------  ----  ---------  -------  -------  ----  ----  ------
//! ```

use regex::Regex;

use super::series::{mean, round_to};
use crate::Result;

const CORE_STATS_BANNER: &str = "Intel PCM Core Performance Statistics";

/// One parsed core row.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CoreCacheRow {
    /// Logical core id
    pub core: u32,
    /// Unhalted cycles
    pub cycles: u64,
    /// Retired instructions
    pub instructions: u64,
    /// Instructions per cycle
    pub ipc: f64,
    /// L3 misses
    pub l3_misses: u64,
    /// L2 hit ratio, percent
    pub l2_hit: f64,
    /// L3 hit ratio, percent
    pub l3_hit: f64,
}

/// Averages over a group of cores, rounded to one decimal.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct CacheAverages {
    /// Mean L3 misses
    pub l3_misses: f64,
    /// Mean L2 hit percentage
    pub l2_hit: f64,
    /// Mean L3 hit percentage
    pub l3_hit: f64,
}

/// Reads the core table out of a PCM report.
#[derive(Debug)]
pub struct CoreStatsParser {
    row: Regex,
}

impl CoreStatsParser {
    /// Compile the row pattern.
    ///
    /// # Errors
    ///
    /// Fails only if the pattern does not compile.
    pub fn new() -> Result<Self> {
        Ok(Self {
            row: Regex::new(
                r"^\s*(\d+)\s+(\d+)\s+(\d+)\s+([\d.]+)\s+(\d+)\s+([\d.]+)\s+([\d.]+)",
            )?,
        })
    }

    /// Rows between the first and second dashed separator after the banner.
    ///
    /// Malformed rows are skipped. No banner, or no closing separator,
    /// yields no rows.
    #[must_use]
    pub fn rows(&self, text: &str) -> Vec<CoreCacheRow> {
        let Some(start) = text.find(CORE_STATS_BANNER) else {
            return Vec::new();
        };
        let mut lines = text[start..].lines().skip_while(|l| !is_separator(l));
        if lines.next().is_none() {
            return Vec::new();
        }

        let mut rows = Vec::new();
        for line in lines {
            if is_separator(line) {
                return rows;
            }
            if let Some(row) = self.parse_row(line) {
                rows.push(row);
            }
        }
        Vec::new()
    }

    fn parse_row(&self, line: &str) -> Option<CoreCacheRow> {
        let caps = self.row.captures(line)?;
        Some(CoreCacheRow {
            core: caps[1].parse().ok()?,
            cycles: caps[2].parse().ok()?,
            instructions: caps[3].parse().ok()?,
            ipc: caps[4].parse().ok()?,
            l3_misses: caps[5].parse().ok()?,
            l2_hit: caps[6].parse().ok()?,
            l3_hit: caps[7].parse().ok()?,
        })
    }
}

/// Average the rows whose core id satisfies `in_bucket`; `None` when no
/// row falls in the bucket.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn bucket_average<F: Fn(u32) -> bool>(rows: &[CoreCacheRow], in_bucket: F) -> Option<CacheAverages> {
    let bucket: Vec<&CoreCacheRow> = rows.iter().filter(|r| in_bucket(r.core)).collect();
    if bucket.is_empty() {
        return None;
    }
    Some(CacheAverages {
        l3_misses: round_to(mean(bucket.iter().map(|r| r.l3_misses as f64)), 1),
        l2_hit: round_to(mean(bucket.iter().map(|r| r.l2_hit)), 1),
        l3_hit: round_to(mean(bucket.iter().map(|r| r.l3_hit)), 1),
    })
}

fn is_separator(line: &str) -> bool {
    let trimmed = line.trim();
    trimmed.starts_with("---") && trimmed.chars().all(|c| c == '-' || c.is_whitespace())
}

#[cfg(test)]
mod tests {
    use super::*;

    const REPORT: &str = "\
Intel PCM Core Performance Statistics
Core  Cycles      Instructions  IPC   L3 Misses  L2 Hit%  L3 Hit%  Freq  CPU%  Energy
----  ----------  ------------  ----  ---------  -------  -------  ----  ----  ------
0     123456789   98765432      0.80  1000       95.0     40.0     2.1   3.0   1.2
1     223456789   198765432     0.89  2000       90.0     50.0     2.1   99.0  1.2
2     223456789   198765432     0.89  3001       80.0     60.0     2.1   99.0  1.2
garbage line
----  ----------  ------------  ----  ---------  -------  -------  ----  ----  ------
9     1           1             1.0   99999      1.0      1.0
";

    #[test]
    fn test_rows_between_separators() {
        let parser = CoreStatsParser::new().unwrap();
        let rows = parser.rows(REPORT);
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[2].core, 2);
        assert_eq!(rows[2].l3_misses, 3001);
        assert!((rows[1].ipc - 0.89).abs() < 1e-12);
    }

    #[test]
    fn test_no_banner_no_rows() {
        let parser = CoreStatsParser::new().unwrap();
        assert!(parser.rows("Core Cycles\n----\n1 2 3 4.0 5 6.0 7.0\n----\n").is_empty());
    }

    #[test]
    fn test_unterminated_table_no_rows() {
        let parser = CoreStatsParser::new().unwrap();
        let cut = &REPORT[..REPORT.find("garbage").unwrap()];
        assert!(parser.rows(cut).is_empty());
    }

    #[test]
    fn test_bucket_average_excluding_core_zero() {
        let parser = CoreStatsParser::new().unwrap();
        let rows = parser.rows(REPORT);
        let avg = bucket_average(&rows, |core| core != 0).unwrap();
        assert!((avg.l3_misses - 2500.5).abs() < 1e-9);
        assert!((avg.l2_hit - 85.0).abs() < 1e-9);
        assert!((avg.l3_hit - 55.0).abs() < 1e-9);
    }

    #[test]
    fn test_empty_bucket_is_none() {
        assert_eq!(bucket_average(&[], |_| true), None);
    }
}
