//! Sweep and profiler settings

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::cluster::MissingValuePolicy;
use super::kv::{split_list, KeyValueFile};
use crate::{Error, Result};

/// Hardware events sampled by `perf stat` unless overridden.
pub const DEFAULT_PERF_EVENTS: [&str; 6] = [
    "LLC-load-misses",
    "LLC-store-misses",
    "unc_cha_llc_lookup.data_read",
    "unc_cha_llc_lookup.writes_and_other",
    "unc_cha_llc_lookup.data_read_miss",
    "unc_cha_llc_lookup.rfo_miss",
];

/// Derived `perf stat -M` metrics unless overridden.
pub const DEFAULT_PERF_METRICS: [&str; 2] = [
    "llc_miss_local_memory_bandwidth_read",
    "llc_miss_local_memory_bandwidth_write",
];

/// Descriptor count DPDK applications use when none is given.
pub const DEFAULT_DESC: u32 = 1024;

/// Which trial shape the sweep runs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SweepMode {
    /// Generator alone with the profiler chain; sweeps TX cores x TX descriptors.
    #[default]
    Profile,
    /// Forwarder plus generator; sweeps every descriptor and core dimension.
    Pipeline,
}

impl FromStr for SweepMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "profile" => Ok(Self::Profile),
            "pipeline" => Ok(Self::Pipeline),
            other => Err(Error::InvalidConfig {
                key: "SWEEP_MODE".to_string(),
                value: other.to_string(),
            }),
        }
    }
}

/// Where the sampled perf event list comes from.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PerfEventSource {
    /// Use `PERF_EVENTS` verbatim.
    #[default]
    Static,
    /// Keep only configured events that `perf list` reports.
    Auto,
}

impl FromStr for PerfEventSource {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "static" => Ok(Self::Static),
            "auto" => Ok(Self::Auto),
            other => Err(Error::InvalidConfig {
                key: "PERF_EVENT_SOURCE".to_string(),
                value: other.to_string(),
            }),
        }
    }
}

/// Unit a perf event is reported in.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PerfUnit {
    /// Plain event count
    #[default]
    Count,
    /// Byte counter, reported in MB
    Bytes,
}

impl PerfUnit {
    /// Column label suffix.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Count => "count",
            Self::Bytes => "MB",
        }
    }
}

/// One configured perf event: `name` or `name:bytes`.
///
/// Any other suffix is an event modifier (`cycles:u`) and stays part of
/// the name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PerfEventSpec {
    /// Event name as passed to `perf stat -e`
    pub name: String,
    /// Reporting unit
    pub unit: PerfUnit,
}

impl PerfEventSpec {
    /// A count event.
    #[must_use]
    pub fn count(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            unit: PerfUnit::Count,
        }
    }

    /// Result-table column header, e.g. `LLC-load-misses (count)`.
    #[must_use]
    pub fn column(&self) -> String {
        format!("{} ({})", self.name, self.unit.label())
    }
}

impl FromStr for PerfEventSpec {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let (name, unit) = match s.rsplit_once(':') {
            Some((name, "bytes" | "B" | "MB")) => (name, PerfUnit::Bytes),
            Some((name, "count")) => (name, PerfUnit::Count),
            Some(_) | None => (s, PerfUnit::Count),
        };
        if name.is_empty() {
            return Err(Error::InvalidConfig {
                key: "PERF_EVENTS".to_string(),
                value: s.to_string(),
            });
        }
        Ok(Self {
            name: name.to_string(),
            unit,
        })
    }
}

impl fmt::Display for PerfEventSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

/// Which profilers run and for how long (seconds).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfilerSettings {
    /// Run `perf stat`
    pub enable_perf: bool,
    /// Run `pcm-pcie`
    pub enable_pcm: bool,
    /// Run the NeoHost SDK
    pub enable_neohost: bool,
    /// Seconds before the first profiler starts
    pub warmup_delay: u64,
    /// Seconds between profilers, and the trailing buffer
    pub tool_interval: u64,
    /// `perf stat` run length
    pub perf_duration: u64,
    /// `pcm-pcie` run length
    pub pcm_duration: u64,
    /// NeoHost run length
    pub neohost_duration: u64,
    /// Events for `perf stat -e`
    pub perf_events: Vec<PerfEventSpec>,
    /// Metrics for `perf stat -M`
    pub perf_metrics: Vec<String>,
    /// Static list or `perf list` filtering
    pub perf_event_source: PerfEventSource,
}

impl Default for ProfilerSettings {
    fn default() -> Self {
        Self {
            enable_perf: true,
            enable_pcm: true,
            enable_neohost: false,
            warmup_delay: 10,
            tool_interval: 5,
            perf_duration: 15,
            pcm_duration: 15,
            neohost_duration: 20,
            perf_events: DEFAULT_PERF_EVENTS
                .iter()
                .map(|name| PerfEventSpec::count(*name))
                .collect(),
            perf_metrics: DEFAULT_PERF_METRICS.iter().map(ToString::to_string).collect(),
            perf_event_source: PerfEventSource::Static,
        }
    }
}

/// Everything the sweep needs besides cluster identity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BenchConfig {
    /// Trial shape
    pub sweep_mode: SweepMode,
    /// Packet size in bytes
    pub packet_size: u32,
    /// Generator TX-core counts to sweep
    pub tx_core_values: Vec<u32>,
    /// Generator TX descriptor counts to sweep
    pub pktgen_tx_desc_values: Vec<u32>,
    /// Forwarder worker-core counts to sweep (pipeline mode)
    pub l3fwd_lcore_values: Vec<u32>,
    /// Forwarder TX queue sizes to sweep (pipeline mode)
    pub l3fwd_tx_desc_values: Vec<u32>,
    /// Forwarder RX queue sizes to sweep (pipeline mode)
    pub l3fwd_rx_desc_values: Vec<u32>,
    /// Generator run length in pipeline mode, seconds
    pub pipeline_duration: u64,
    /// Profiler chain
    pub profilers: ProfilerSettings,
    /// Handling of absent NIC settings
    pub missing_value_policy: MissingValuePolicy,
}

impl Default for BenchConfig {
    fn default() -> Self {
        Self {
            sweep_mode: SweepMode::Profile,
            packet_size: 64,
            tx_core_values: vec![1, 2, 4, 8],
            pktgen_tx_desc_values: vec![DEFAULT_DESC],
            l3fwd_lcore_values: vec![2],
            l3fwd_tx_desc_values: vec![DEFAULT_DESC],
            l3fwd_rx_desc_values: vec![DEFAULT_DESC],
            pipeline_duration: 5,
            profilers: ProfilerSettings::default(),
            missing_value_policy: MissingValuePolicy::Require,
        }
    }
}

impl BenchConfig {
    /// Apply overrides from `test.config` on top of the defaults.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidConfig`] naming the first malformed key.
    pub fn from_key_values(file: &KeyValueFile) -> Result<Self> {
        let mut cfg = Self::default();
        let p = &mut cfg.profilers;

        if let Some(mode) = file.parse_value("SWEEP_MODE")? {
            cfg.sweep_mode = mode;
        }
        if let Some(size) = file.parse_value("PKTGEN_PACKET_SIZE")? {
            cfg.packet_size = size;
        }
        if let Some(values) = file.parse_list("PKTGEN_TX_CORE_VALUES")? {
            cfg.tx_core_values = values;
        }
        if let Some(values) = file.parse_list("PKTGEN_TX_DESC_VALUES")? {
            cfg.pktgen_tx_desc_values = values;
        }
        if let Some(values) = file.parse_list("L3FWD_LCORE_VALUES")? {
            cfg.l3fwd_lcore_values = values;
        }
        if let Some(values) = file.parse_list("L3FWD_TX_DESC_VALUES")? {
            cfg.l3fwd_tx_desc_values = values;
        }
        if let Some(values) = file.parse_list("L3FWD_RX_DESC_VALUES")? {
            cfg.l3fwd_rx_desc_values = values;
        }
        if let Some(secs) = file.parse_value("PKTGEN_DURATION")? {
            cfg.pipeline_duration = secs;
        }

        if let Some(on) = file.parse_flag("ENABLE_PERF")? {
            p.enable_perf = on;
        }
        if let Some(on) = file.parse_flag("ENABLE_PCM")? {
            p.enable_pcm = on;
        }
        if let Some(on) = file.parse_flag("ENABLE_NEOHOST")? {
            p.enable_neohost = on;
        }
        if let Some(secs) = file.parse_value("WARMUP_DELAY")? {
            p.warmup_delay = secs;
        }
        if let Some(secs) = file.parse_value("TOOL_INTERVAL")? {
            p.tool_interval = secs;
        }
        if let Some(secs) = file.parse_value("PERF_DURATION")? {
            p.perf_duration = secs;
        }
        if let Some(secs) = file.parse_value("PCM_DURATION")? {
            p.pcm_duration = secs;
        }
        if let Some(secs) = file.parse_value("NEOHOST_DURATION")? {
            p.neohost_duration = secs;
        }
        if let Some(events) = file.parse_list::<PerfEventSpec>("PERF_EVENTS")? {
            p.perf_events = events;
        }
        if let Some(raw) = file.get("PERF_METRICS") {
            p.perf_metrics = split_list(raw).map(str::to_string).collect();
        }
        if let Some(source) = file.parse_value("PERF_EVENT_SOURCE")? {
            p.perf_event_source = source;
        }
        if let Some(policy) = file.parse_value("MISSING_VALUE_POLICY")? {
            cfg.missing_value_policy = policy;
        }

        cfg.validate()?;
        Ok(cfg)
    }

    fn validate(&self) -> Result<()> {
        let lists = [
            ("PKTGEN_TX_CORE_VALUES", &self.tx_core_values),
            ("PKTGEN_TX_DESC_VALUES", &self.pktgen_tx_desc_values),
            ("L3FWD_LCORE_VALUES", &self.l3fwd_lcore_values),
            ("L3FWD_TX_DESC_VALUES", &self.l3fwd_tx_desc_values),
            ("L3FWD_RX_DESC_VALUES", &self.l3fwd_rx_desc_values),
        ];
        for (key, values) in lists {
            if values.is_empty() || values.contains(&0) {
                return Err(Error::InvalidConfig {
                    key: key.to_string(),
                    value: format!("{values:?}"),
                });
            }
        }
        Ok(())
    }
}
