//! `perf stat -I 1000 -a --per-socket` interval output
//!
//! ```text
//! #           time socket cpus             counts unit events
//!      1.001096320 S0       32            571,500      LLC-load-misses
//!      1.001096320 S0        1          2,513,972      UNC_CHA_REQUESTS.WRITES_LOCAL #    160.9 MB/s  llc_miss_local_memory_bandwidth_write
//! ```

use std::collections::HashMap;

use regex::Regex;

use super::series::{round_to, SampleSeries};
use super::units::{bytes_to_mb, parse_grouped_u64};
use crate::config::PerfEventSpec;
use crate::Result;

/// Averaged perf values in configuration order.
#[derive(Debug, Clone, PartialEq)]
pub struct PerfSummary {
    /// One average per configured event (MB for byte events), 3 decimals
    pub events: Vec<(PerfEventSpec, f64)>,
    /// One average per configured metric, MB/s, 3 decimals
    pub metrics: Vec<(String, f64)>,
    /// Timestamps that carried every configured event
    pub complete_samples: usize,
}

impl PerfSummary {
    /// Every configured field at 0.
    #[must_use]
    pub fn zeroed(events: &[PerfEventSpec], metrics: &[String]) -> Self {
        Self {
            events: events.iter().map(|e| (e.clone(), 0.0)).collect(),
            metrics: metrics.iter().map(|m| (m.clone(), 0.0)).collect(),
            complete_samples: 0,
        }
    }

    /// True if nothing was sampled.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.complete_samples == 0 && self.metrics.iter().all(|(_, v)| *v == 0.0)
    }
}

/// Parses `perf stat` interval lines.
#[derive(Debug)]
pub struct PerfParser {
    count: Regex,
    bandwidth: Regex,
}

impl PerfParser {
    /// Compile the line patterns.
    ///
    /// # Errors
    ///
    /// Fails only if a pattern does not compile.
    pub fn new() -> Result<Self> {
        Ok(Self {
            count: Regex::new(r"^\s*([\d.]+)\s+S\d+\s+\d+\s+([\d,]+)\s+(?:(Bytes)\s+)?(\S+)")?,
            bandwidth: Regex::new(
                r"^\s*([\d.]+)\s+S\d+\s+\d+\s+([\d,]+)\s+\S+\s+#\s+([\d.]+)\s+MB/s\s+(\S+)",
            )?,
        })
    }

    /// Average each configured event over complete timestamps and each
    /// configured metric over its own samples, after warm-up discard.
    #[must_use]
    pub fn summarize(&self, text: &str, events: &[PerfEventSpec], metrics: &[String]) -> PerfSummary {
        let mut order: Vec<&str> = Vec::new();
        let mut by_timestamp: HashMap<&str, HashMap<&str, f64>> = HashMap::new();
        let mut metric_series: HashMap<&str, SampleSeries> =
            metrics.iter().map(|m| (m.as_str(), SampleSeries::new())).collect();

        for line in text.lines() {
            if let Some(caps) = self.bandwidth.captures(line) {
                let metric = caps.get(4).map_or("", |m| m.as_str());
                if let (Some(series), Ok(at), Ok(bw)) = (
                    metric_series.get_mut(metric),
                    caps[1].parse::<f64>(),
                    caps[3].parse::<f64>(),
                ) {
                    series.push(at, bw);
                }
            }

            let Some(caps) = self.count.captures(line) else {
                continue;
            };
            let event = caps.get(4).map_or("", |m| m.as_str());
            if event.contains('%') || event.starts_with('#') {
                continue;
            }
            let Ok(raw) = parse_grouped_u64(event, &caps[2]) else {
                continue;
            };
            #[allow(clippy::cast_precision_loss)]
            let mut value = raw as f64;
            if caps.get(3).is_some() {
                value = bytes_to_mb(value);
            }
            let timestamp = caps.get(1).map_or("", |m| m.as_str());
            by_timestamp
                .entry(timestamp)
                .or_insert_with(|| {
                    order.push(timestamp);
                    HashMap::new()
                })
                .insert(event, value);
        }

        let mut event_series: Vec<SampleSeries> = vec![SampleSeries::new(); events.len()];
        let mut complete_samples = 0;
        for timestamp in order.into_iter().filter(|_| !events.is_empty()) {
            let Some(sample) = by_timestamp.get(timestamp) else {
                continue;
            };
            let values: Option<Vec<f64>> = events
                .iter()
                .map(|e| sample.get(e.name.as_str()).copied())
                .collect();
            let Some(values) = values else {
                continue;
            };
            complete_samples += 1;
            let at = timestamp.parse().unwrap_or_default();
            for (series, value) in event_series.iter_mut().zip(values) {
                series.push(at, value);
            }
        }

        PerfSummary {
            events: events
                .iter()
                .zip(&event_series)
                .map(|(e, s)| (e.clone(), round_to(s.warmup_mean(), 3)))
                .collect(),
            metrics: metrics
                .iter()
                .map(|m| {
                    let avg = metric_series
                        .get(m.as_str())
                        .map_or(0.0, SampleSeries::warmup_mean);
                    (m.clone(), round_to(avg, 3))
                })
                .collect(),
            complete_samples,
        }
    }
}
