//! Metrics extraction from per-trial tool logs
//!
//! Every trial leaves plaintext logs named after its [`TrialId`]:
//!
//! ```text
//! results/
//! ├── <id>.pktgen     generator stdout (+ embedded PCM report)
//! ├── <id>.l3fwd      forwarder stdout (+ embedded PCM report)   pipeline mode
//! ├── <id>.perf       perf stat -I 1000                          profile mode
//! ├── <id>.pcm-pcie   pcm-pcie -B -e                             profile mode
//! └── <id>.neohost    NeoHost counters                           profile mode
//! ```
//!
//! [`MetricsExtractor`] reads whichever of these exist and turns them into
//! one [`ResultRow`]. Each tool is handled in isolation: a missing log
//! yields zeros and `unknown`, an unreadable one zeros and `error`, and
//! neither affects the other tools' columns.

pub mod bandwidth;
pub mod cache;
pub mod format;
pub mod neohost;
pub mod packets;
pub mod pcm;
pub mod perf;
pub mod rates;
pub mod series;
pub mod strategy;
pub mod units;

pub use bandwidth::{SocketTraffic, TrafficParser, TrafficSection};
pub use cache::{bucket_average, CacheAverages, CoreCacheRow, CoreStatsParser};
pub use format::{fmt_bw, fmt_count, fmt_float, fmt_small_value, BwUnit};
pub use neohost::{NeohostParser, NeohostSummary};
pub use packets::{App, PacketCount, PacketParser, PacketTotals};
pub use pcm::{PcmParser, PcmSummary};
pub use perf::{PerfParser, PerfSummary};
pub use rates::{loss_millions, mpps};
pub use series::{SampleSeries, WARMUP_SAMPLES};
pub use strategy::{first_success, Extracted, Strategy};

use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::config::{generator_rx_cores, generator_tx_cores, PerfEventSpec, ProfilerSettings};
use crate::experiment::{LogKind, ResultRow, TrialId, TrialRecord, TrialStatus};
use crate::Result;

/// Sweep point of a profile-mode trial.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfileParams {
    /// `txqs_min_inline` of the generator NIC
    pub txqs_min_inline: u32,
    /// Generator TX cores
    pub tx_cores: u32,
    /// Generator TX descriptors
    pub tx_desc: u32,
    /// Generator run length, seconds
    pub duration_secs: u64,
}

impl fmt::Display for ProfileParams {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "tx_cores={} tx_desc={} txqs_min_inline={} duration={}s",
            self.tx_cores, self.tx_desc, self.txqs_min_inline, self.duration_secs
        )
    }
}

/// Sweep point of a pipeline-mode trial.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineParams {
    /// Generated packet size, bytes
    pub packet_size: u32,
    /// Forwarder TX queue size
    pub l3fwd_tx_desc: u32,
    /// Forwarder RX queue size
    pub l3fwd_rx_desc: u32,
    /// Generator TX descriptors
    pub pktgen_tx_desc: u32,
    /// Forwarder worker cores
    pub l3fwd_lcores: u32,
    /// Generator TX cores
    pub pktgen_tx_cores: u32,
    /// Generator run length, seconds
    pub duration_secs: u64,
}

impl fmt::Display for PipelineParams {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "size={} l3fwd_lcores={} l3fwd_txd={} l3fwd_rxd={} pktgen_tx_cores={} pktgen_txd={}",
            self.packet_size,
            self.l3fwd_lcores,
            self.l3fwd_tx_desc,
            self.l3fwd_rx_desc,
            self.pktgen_tx_cores,
            self.pktgen_tx_desc
        )
    }
}

/// Columns of a pipeline-mode row.
pub const PIPELINE_HEADER: [&str; 40] = [
    "EXPTID",
    "Packet size",
    "L3FWD TX desc",
    "L3FWD RX desc",
    "PKTGEN TX desc",
    "L3FWD lcores",
    "PKTGEN TX cores",
    "PKTGEN RX rate (Mpps)",
    "PKTGEN TX rate (Mpps)",
    "PKTGEN RX fails (M)",
    "L3FWD RX rate (Mpps)",
    "L3FWD TX rate (Mpps)",
    "L3FWD TX fails (M)",
    "PKTGEN HW RX missed",
    "L3FWD HW RX missed",
    "PKTGEN RX L3 misses",
    "PKTGEN RX L2 hit (%)",
    "PKTGEN RX L3 hit (%)",
    "PKTGEN TX L3 misses",
    "PKTGEN TX L2 hit (%)",
    "PKTGEN TX L3 hit (%)",
    "L3FWD L3 misses",
    "L3FWD L2 hit (%)",
    "L3FWD L3 hit (%)",
    "PKTGEN DRAM read",
    "PKTGEN DRAM write",
    "PKTGEN DRAM read (MB/s)",
    "PKTGEN DRAM write (MB/s)",
    "L3FWD DRAM read",
    "L3FWD DRAM write",
    "L3FWD DRAM read (MB/s)",
    "L3FWD DRAM write (MB/s)",
    "PKTGEN PCIe read",
    "PKTGEN PCIe write",
    "PKTGEN PCIe read (MB/s)",
    "PKTGEN PCIe write (MB/s)",
    "L3FWD PCIe read",
    "L3FWD PCIe write",
    "L3FWD PCIe read (MB/s)",
    "L3FWD PCIe write (MB/s)",
];

/// Outcome of extracting one trial.
#[derive(Debug, Clone, PartialEq)]
pub struct TrialReport {
    /// Result row
    pub row: ResultRow,
    /// Diagnostics, in the order they were produced
    pub messages: Vec<String>,
    /// Status of every log that was looked at
    pub statuses: BTreeMap<LogKind, TrialStatus>,
    /// Winning packet-total strategy per application log
    pub strategies: BTreeMap<LogKind, &'static str>,
}

impl TrialReport {
    fn new(trial_id: TrialId) -> Self {
        Self {
            row: ResultRow::new(trial_id),
            messages: Vec::new(),
            statuses: BTreeMap::new(),
            strategies: BTreeMap::new(),
        }
    }

    /// Status recorded for `kind`, `Unknown` if it was never looked at.
    #[must_use]
    pub fn status(&self, kind: LogKind) -> TrialStatus {
        self.statuses.get(&kind).copied().unwrap_or_default()
    }

    /// Copy statuses, strategies and messages into `record`.
    pub fn apply_to(&self, record: &mut TrialRecord) {
        for (kind, status) in &self.statuses {
            record.set_status(*kind, *status);
        }
        for (kind, strategy) in &self.strategies {
            record.set_strategy(*kind, *strategy);
        }
        record.extend_messages(self.messages.iter().cloned());
    }

    fn note(&mut self, kind: LogKind, message: impl Into<String>) {
        let message = message.into();
        debug!(trial = %self.row.trial_id(), tool = kind.suffix(), "{message}");
        self.messages.push(format!("{kind}: {message}"));
    }

    fn set_status(&mut self, kind: LogKind, status: TrialStatus) {
        self.statuses.insert(kind, status);
    }
}

/// Reads the logs of a trial and builds its result row.
#[derive(Debug)]
pub struct MetricsExtractor {
    data_dir: PathBuf,
    profilers: ProfilerSettings,
    l3fwd: PacketParser,
    pktgen: PacketParser,
    cores: CoreStatsParser,
    traffic: TrafficParser,
    perf: PerfParser,
    pcm: PcmParser,
    neohost: NeohostParser,
}

impl MetricsExtractor {
    /// Extractor for logs under `data_dir`.
    ///
    /// `profilers` decides which profile-mode columns exist; its
    /// `perf_events` should already be filtered if events are auto-detected.
    ///
    /// # Errors
    ///
    /// Fails only if a log pattern does not compile.
    pub fn new(data_dir: impl Into<PathBuf>, profilers: ProfilerSettings) -> Result<Self> {
        Ok(Self {
            data_dir: data_dir.into(),
            profilers,
            l3fwd: PacketParser::new(App::L3fwd)?,
            pktgen: PacketParser::new(App::Pktgen)?,
            cores: CoreStatsParser::new()?,
            traffic: TrafficParser::new()?,
            perf: PerfParser::new()?,
            pcm: PcmParser::new()?,
            neohost: NeohostParser::new()?,
        })
    }

    /// Directory the logs are read from.
    #[must_use]
    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    /// Perf events sampled in profile mode.
    #[must_use]
    pub fn perf_events(&self) -> &[PerfEventSpec] {
        &self.profilers.perf_events
    }

    /// Header of a profile-mode row.
    #[must_use]
    pub fn profile_header(&self) -> Vec<String> {
        let mut header: Vec<String> = [
            "EXPTID",
            "txqs_min_inline",
            "# TX cores",
            "DEFAULT_RX/TX_DESC",
            "TX rate (Mpps)",
        ]
        .iter()
        .map(ToString::to_string)
        .collect();
        if self.profilers.enable_perf {
            header.extend(self.profilers.perf_events.iter().map(PerfEventSpec::column));
            header.extend(self.profilers.perf_metrics.iter().map(|m| format!("{m} (MB/s)")));
        }
        if self.profilers.enable_pcm {
            header.extend(
                [
                    "PCIRdCur Total (M)",
                    "PCIRdCur Miss (M)",
                    "DDIO Miss Rate (%)",
                    "PCIe Rd (MB)",
                    "PCIe Wr (MB)",
                ]
                .iter()
                .map(ToString::to_string),
            );
        }
        if self.profilers.enable_neohost {
            header.extend(
                [
                    "Outbound Stalled Reads",
                    "PCIe Inbound Used BW (Gb/s)",
                    "PCIe Outbound Used BW (Gb/s)",
                ]
                .iter()
                .map(ToString::to_string),
            );
        }
        header
    }

    /// Header of a pipeline-mode row.
    #[must_use]
    pub fn pipeline_header() -> Vec<String> {
        PIPELINE_HEADER.iter().map(ToString::to_string).collect()
    }

    /// Read `<id>.<kind>` as lossy UTF-8; `Ok(None)` if it does not exist.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Io`] for any other read failure.
    pub fn read_log(&self, trial_id: &TrialId, kind: LogKind) -> Result<Option<String>> {
        let path = trial_id.log_path(&self.data_dir, kind);
        match fs::read(&path) {
            Ok(bytes) => Ok(Some(String::from_utf8_lossy(&bytes).into_owned())),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Load a log, recording `unknown` when absent and `error` when unreadable.
    fn load(&self, report: &mut TrialReport, kind: LogKind) -> Option<String> {
        let trial_id = report.row.trial_id().clone();
        match self.read_log(&trial_id, kind) {
            Ok(Some(text)) => Some(text),
            Ok(None) => {
                report.set_status(kind, TrialStatus::Unknown);
                report.note(kind, format!("{} not found", trial_id.log_file_name(kind)));
                None
            }
            Err(e) => {
                warn!(trial = %trial_id, tool = kind.suffix(), error = %e, "cannot read log");
                report.set_status(kind, TrialStatus::Error);
                report.note(kind, format!("read failed: {e}"));
                None
            }
        }
    }

    fn packets(&self, report: &mut TrialReport, parser: &PacketParser) -> (PacketCount, Option<String>) {
        let kind = parser.app().log_kind();
        let Some(text) = self.load(report, kind) else {
            return (PacketCount::missing(), None);
        };
        let count = parser.totals(&text);
        report.set_status(kind, count.status);
        match count.strategy {
            Some(strategy) => {
                report.strategies.insert(kind, strategy);
                report.note(
                    kind,
                    format!("{strategy}: RX={} TX={}", count.totals.rx, count.totals.tx),
                );
            }
            None => report.note(kind, format!("no packet totals ({})", count.status)),
        }
        (count, Some(text))
    }

    fn perf_summary(&self, report: &mut TrialReport) -> PerfSummary {
        let events = &self.profilers.perf_events;
        let metrics = &self.profilers.perf_metrics;
        let Some(text) = self.load(report, LogKind::Perf) else {
            return PerfSummary::zeroed(events, metrics);
        };
        let summary = self.perf.summarize(&text, events, metrics);
        if summary.is_empty() {
            report.set_status(LogKind::Perf, TrialStatus::Running);
            report.note(LogKind::Perf, "no complete samples");
        } else {
            report.set_status(LogKind::Perf, TrialStatus::Success);
            report.note(
                LogKind::Perf,
                format!("{} complete samples", summary.complete_samples),
            );
        }
        summary
    }

    fn pcm_summary(&self, report: &mut TrialReport) -> PcmSummary {
        let Some(text) = self.load(report, LogKind::PcmPcie) else {
            return PcmSummary::default();
        };
        if let Some(summary) = self.pcm.summarize(&text) {
            report.set_status(LogKind::PcmPcie, TrialStatus::Success);
            report.note(
                LogKind::PcmPcie,
                format!(
                    "{} samples, PCIRdCur total={}M miss={}M",
                    summary.samples, summary.rdcur_total_m, summary.rdcur_miss_m
                ),
            );
            summary
        } else {
            report.set_status(LogKind::PcmPcie, TrialStatus::Running);
            report.note(LogKind::PcmPcie, "required columns or socket-0 rows not found");
            PcmSummary::default()
        }
    }

    fn neohost_summary(&self, report: &mut TrialReport) -> NeohostSummary {
        let Some(text) = self.load(report, LogKind::Neohost) else {
            return NeohostSummary::default();
        };
        let summary = self.neohost.summarize(&text);
        if summary.is_empty() {
            report.set_status(LogKind::Neohost, TrialStatus::Running);
            report.note(LogKind::Neohost, "no counters found");
        } else {
            report.set_status(LogKind::Neohost, TrialStatus::Success);
            report.note(LogKind::Neohost, format!("{} samples", summary.samples));
        }
        summary
    }

    /// Row of a profiled generator run.
    ///
    /// ```text
    /// EXPTID, txqs_min_inline, # TX cores, DEFAULT_RX/TX_DESC, TX rate,
    ///   [perf events, perf metrics], [pcm-pcie x5], [neohost x3]
    /// ```
    #[must_use]
    pub fn extract_profiled_trial(&self, trial_id: &TrialId, params: &ProfileParams) -> TrialReport {
        let mut report = TrialReport::new(trial_id.clone());
        let (pktgen, _) = self.packets(&mut report, &self.pktgen);
        let tx_rate = mpps(pktgen.totals.tx, params.duration_secs);

        let row = &mut report.row;
        row.push(params.txqs_min_inline);
        row.push(params.tx_cores);
        row.push(params.tx_desc);
        if pktgen.totals.tx == 0 {
            row.push("0Mpps");
        } else {
            row.push(format!("{}Mpps", fmt_float(tx_rate)));
        }

        if self.profilers.enable_perf {
            let summary = self.perf_summary(&mut report);
            for (_, value) in &summary.events {
                report.row.push(fmt_count(*value));
            }
            for (_, value) in &summary.metrics {
                report.row.push(fmt_bw(*value, BwUnit::MegabytesPerSec));
            }
        }
        if self.profilers.enable_pcm {
            let pcm = self.pcm_summary(&mut report);
            let row = &mut report.row;
            row.push(format!("{:.1}M", pcm.rdcur_total_m));
            row.push(fmt_small_value(pcm.rdcur_miss_m, "M"));
            row.push(format!("{:.2}%", pcm.ddio_miss_rate));
            row.push(fmt_bw(pcm.rd_mb, BwUnit::MegabytesPerSec));
            row.push(fmt_bw(pcm.wr_mb, BwUnit::MegabytesPerSec));
        }
        if self.profilers.enable_neohost {
            let neohost = self.neohost_summary(&mut report);
            let row = &mut report.row;
            row.push(fmt_count(neohost.outbound_stalled_reads));
            row.push(fmt_bw(neohost.inbound_bw, BwUnit::GigabitsPerSec));
            row.push(fmt_bw(neohost.outbound_bw, BwUnit::GigabitsPerSec));
        }
        report
    }

    /// Row of a forwarder + generator run, laid out as [`PIPELINE_HEADER`].
    #[must_use]
    pub fn extract_pipeline_trial(&self, trial_id: &TrialId, params: &PipelineParams) -> TrialReport {
        let mut report = TrialReport::new(trial_id.clone());
        let (l3fwd, l3fwd_text) = self.packets(&mut report, &self.l3fwd);
        let (pktgen, pktgen_text) = self.packets(&mut report, &self.pktgen);
        let l3fwd_text = l3fwd_text.unwrap_or_default();
        let pktgen_text = pktgen_text.unwrap_or_default();

        let duration = params.duration_secs;
        let l3fwd_hw_missed = self.l3fwd.hw_rx_missed(&l3fwd_text);
        let pktgen_hw_missed = self.pktgen.hw_rx_missed(&pktgen_text);

        let l3fwd_rows = self.cores.rows(&l3fwd_text);
        let pktgen_rows = self.cores.rows(&pktgen_text);
        report.note(
            LogKind::L3fwd,
            format!("{} PCM core rows, HW RX missed={l3fwd_hw_missed}", l3fwd_rows.len()),
        );
        report.note(
            LogKind::Pktgen,
            format!("{} PCM core rows, HW RX missed={pktgen_hw_missed}", pktgen_rows.len()),
        );
        let rx_bucket = generator_rx_cores();
        let tx_bucket = generator_tx_cores(params.pktgen_tx_cores);
        let pktgen_rx_cache = bucket_average(&pktgen_rows, |core| rx_bucket.contains(&core));
        let pktgen_tx_cache = bucket_average(&pktgen_rows, |core| tx_bucket.contains(&core));
        let l3fwd_cache = bucket_average(&l3fwd_rows, |core| core != 0);

        let traffic = |text: &str, section| self.traffic.socket1(text, section);
        let pktgen_dram = traffic(&pktgen_text, TrafficSection::Memory);
        let l3fwd_dram = traffic(&l3fwd_text, TrafficSection::Memory);
        let pktgen_pcie = traffic(&pktgen_text, TrafficSection::Io);
        let l3fwd_pcie = traffic(&l3fwd_text, TrafficSection::Io);

        let row = &mut report.row;
        row.push(params.packet_size);
        row.push(params.l3fwd_tx_desc);
        row.push(params.l3fwd_rx_desc);
        row.push(params.pktgen_tx_desc);
        row.push(params.l3fwd_lcores);
        row.push(params.pktgen_tx_cores);
        for rate in [
            mpps(pktgen.totals.rx, duration),
            mpps(pktgen.totals.tx, duration),
            loss_millions(l3fwd.totals.tx, pktgen.totals.rx),
            mpps(l3fwd.totals.rx, duration),
            mpps(l3fwd.totals.tx, duration),
            loss_millions(l3fwd.totals.rx, l3fwd.totals.tx),
        ] {
            row.push(fmt_float(rate));
        }
        row.push(pktgen_hw_missed);
        row.push(l3fwd_hw_missed);
        // sections that were never found stay a plain 0
        for cache in [pktgen_rx_cache, pktgen_tx_cache, l3fwd_cache] {
            match cache {
                Some(cache) => {
                    row.push(fmt_float(cache.l3_misses));
                    row.push(fmt_float(cache.l2_hit));
                    row.push(fmt_float(cache.l3_hit));
                }
                None => {
                    for _ in 0..3 {
                        row.push(0);
                    }
                }
            }
        }
        for traffic in [pktgen_dram, l3fwd_dram, pktgen_pcie, l3fwd_pcie] {
            match traffic {
                Some(traffic) => {
                    row.push(traffic.read);
                    row.push(traffic.write);
                    row.push(fmt_float(traffic.read_bw));
                    row.push(fmt_float(traffic.write_bw));
                }
                None => {
                    for _ in 0..4 {
                        row.push(0);
                    }
                }
            }
        }
        report
    }
}
