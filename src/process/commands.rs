//! Command lines launched during a trial
//!
//! Pure string builders; nothing here runs anything.

use std::collections::HashSet;
use std::path::Path;

use crate::config::{BenchPaths, ForwarderConfig, GeneratorConfig, PerfEventSpec, ProfilerSettings};
use crate::experiment::{LogKind, TrialId};
use crate::schedule::{PhaseKind, PhaseSchedule};

/// Descriptor count the generator uses when `--txd` is absent.
pub const DEFAULT_GENERATOR_TXD: u32 = 1024;

/// Stops every local pktgen.
pub const KILL_GENERATOR: &str = "sudo pkill -f pktgen";

/// Stops l3fwd on the forwarder node.
pub const KILL_FORWARDER: &str = "sudo pkill dpdk-l3fwd";

/// Lists the events `perf stat` accepts.
pub const PERF_LIST: &str = "perf list";

/// Load an ARP table file.
#[must_use]
pub fn arp(table: &Path) -> String {
    format!("sudo arp -f {}", table.display())
}

/// Configure and compile a meson project.
#[must_use]
pub fn build(dir: &Path) -> String {
    format!("cd {} && meson build && ninja -C build", dir.display())
}

/// Configured events that `perf list` knows, in configuration order.
///
/// Matching is case-insensitive on whole tokens, since uncore events are
/// listed in lowercase.
#[must_use]
pub fn available_events(configured: &[PerfEventSpec], perf_list: &str) -> Vec<PerfEventSpec> {
    let known: HashSet<String> = perf_list
        .split_whitespace()
        .map(|token| token.trim_matches(|c: char| c == ',' || c == ';').to_lowercase())
        .collect();
    configured
        .iter()
        .filter(|event| known.contains(&event.name.to_lowercase()))
        .cloned()
        .collect()
}

/// How long and with what packets the generator runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GeneratorRun {
    /// `PKTGEN_DURATION`, seconds
    pub duration_secs: u64,
    /// `PKTGEN_PACKET_SIZE`, bytes
    pub packet_size: u32,
    /// TX descriptors; `--txd` only when not the default
    pub tx_desc: u32,
}

/// Builds the command lines of one trial.
#[derive(Debug, Clone, Copy)]
pub struct TrialCommands<'a> {
    paths: &'a BenchPaths,
    trial_id: &'a TrialId,
}

impl<'a> TrialCommands<'a> {
    /// Commands writing `trial_id`'s logs under the results directory.
    #[must_use]
    pub const fn new(paths: &'a BenchPaths, trial_id: &'a TrialId) -> Self {
        Self { paths, trial_id }
    }

    fn redirect(&self, kind: LogKind) -> String {
        format!(
            "> {} 2>&1",
            self.trial_id.log_path(&self.paths.results(), kind).display()
        )
    }

    /// Background l3fwd launch on the forwarder node.
    #[must_use]
    pub fn forwarder(
        &self,
        config: &ForwarderConfig,
        tx_desc: Option<u32>,
        rx_desc: Option<u32>,
    ) -> String {
        let bin_dir = config.binary.parent().unwrap_or_else(|| Path::new("."));
        let mut cmd = format!(
            "cd {} && sudo -E {} {} -l {} -n {} -a {} -- -p {} --config=\"{}\" --eth-dest=0,{}",
            bin_dir.display(),
            self.paths.library_env(),
            config.binary.display(),
            config.core_list(),
            config.memory_channels,
            config.device.allow_arg(),
            config.port_mask,
            config.queue_bindings(),
            config.eth_dest,
        );
        if let Some(txd) = tx_desc {
            cmd.push_str(&format!(" --tx-queue-size={txd}"));
        }
        if let Some(rxd) = rx_desc {
            cmd.push_str(&format!(" --rx-queue-size={rxd}"));
        }
        cmd.push(' ');
        cmd.push_str(&self.redirect(LogKind::L3fwd));
        cmd
    }

    /// Foreground pktgen launch.
    #[must_use]
    pub fn generator(&self, config: &GeneratorConfig, run: &GeneratorRun) -> String {
        let txd = if run.tx_desc == DEFAULT_GENERATOR_TXD {
            String::new()
        } else {
            format!(" --txd={}", run.tx_desc)
        };
        format!(
            "cd {} && sudo -E {} ENABLE_PCM=0 PKTGEN_DURATION={} PKTGEN_PACKET_SIZE={} {} -l {} -n {} -a {} \
             --proc-type {} --file-prefix={} -- -m \"{}\" {}{} -f {} {}",
            config.working_dir.display(),
            self.paths.library_env(),
            run.duration_secs,
            run.packet_size,
            config.binary.display(),
            config.core_list(),
            config.memory_channels,
            config.device.allow_arg(),
            config.proc_type,
            config.file_prefix,
            config.port_map(),
            config.app_args,
            txd,
            config.script_file,
            self.redirect(LogKind::Pktgen),
        )
    }

    /// `perf stat` over the configured events and metrics.
    #[must_use]
    pub fn perf(&self, seconds: u64, events: &[PerfEventSpec], metrics: &[String]) -> String {
        let mut cmd = format!("sudo timeout {seconds} perf stat");
        if !events.is_empty() {
            let names: Vec<&str> = events.iter().map(|e| e.name.as_str()).collect();
            cmd.push_str(&format!(" -e {}", names.join(",")));
        }
        if !metrics.is_empty() {
            cmd.push_str(&format!(" -M {}", metrics.join(",")));
        }
        cmd.push_str(" -I 1000 -a --per-socket ");
        cmd.push_str(&self.redirect(LogKind::Perf));
        cmd
    }

    /// `pcm-pcie` in bandwidth + event mode.
    #[must_use]
    pub fn pcm(&self, seconds: u64) -> String {
        format!(
            "sudo timeout {seconds} {} -B -e {}",
            self.paths.pcm_pcie_binary().display(),
            self.redirect(LogKind::PcmPcie)
        )
    }

    /// NeoHost counter loop with ANSI colour codes stripped.
    #[must_use]
    pub fn neohost(&self, seconds: u64, pci_address: &str) -> String {
        format!(
            r#"sudo timeout {seconds} {} {} --dev-uid={pci_address} --get-analysis --run-loop 2>&1 | sed "s/\x1b\[[0-9;]*m//g" > {}"#,
            self.paths.neohost_python().display(),
            self.paths.neohost_sdk().display(),
            self.trial_id
                .log_path(&self.paths.results(), LogKind::Neohost)
                .display()
        )
    }

    /// One shell pipeline: pktgen in the background, the profilers in
    /// schedule order, then wait for pktgen.
    #[must_use]
    pub fn profiled_generator(
        &self,
        config: &GeneratorConfig,
        run: &GeneratorRun,
        schedule: &PhaseSchedule,
        profilers: &ProfilerSettings,
    ) -> String {
        let mut cmd = self.generator(config, run);
        cmd.push_str(" & PKTGEN_PID=$!; ");
        for phase in schedule.phases() {
            let step = match phase.kind {
                PhaseKind::Warmup | PhaseKind::Interval => format!("sleep {}", phase.seconds),
                PhaseKind::Perf => {
                    self.perf(phase.seconds, &profilers.perf_events, &profilers.perf_metrics)
                }
                PhaseKind::Pcm => self.pcm(phase.seconds),
                PhaseKind::Neohost => self.neohost(phase.seconds, &config.device.pci_address),
                PhaseKind::Trailing => continue,
            };
            cmd.push_str(&step);
            cmd.push_str("; ");
        }
        cmd.push_str("wait $PKTGEN_PID 2>/dev/null");
        cmd
    }
}
