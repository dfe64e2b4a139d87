//! Trial process lifecycle
//!
//! ```text
//! prepare_trial()  stop stale processes -> load ARP tables -> Prepared
//!      │
//!      ├── launch_forwarder(&Prepared, ..)         remote, background, +3s
//!      ├── run_generator(&Prepared, ..)            local, foreground
//!      └── run_profiled_generator(&Prepared, ..)   local, foreground
//!      │
//! teardown()       stop again, +3s
//! ```
//!
//! A launch needs the [`Prepared`] token, which only `prepare_trial` hands
//! out, so nothing can start before the previous trial's processes are gone.

use tracing::{info, warn};

use super::commands::{self, GeneratorRun, TrialCommands, KILL_FORWARDER, KILL_GENERATOR, PERF_LIST};
use super::runner::{CommandOutcome, CommandRunner, RunMode};
use crate::config::{
    BenchPaths, ClusterSettings, ForwarderConfig, GeneratorConfig, PerfEventSpec, ProfilerSettings,
    RunConfig,
};
use crate::experiment::TrialId;
use crate::schedule::{PhaseKind, PhaseSchedule};

/// Seconds to let processes start up or die.
pub const SETTLE_SECS: u64 = 3;

/// Proof that stale processes were stopped and ARP tables loaded.
#[derive(Debug)]
pub struct Prepared {
    _private: (),
}

/// Starts and stops the DPDK applications and profilers of a trial.
#[derive(Debug)]
pub struct ProcessController<R> {
    paths: BenchPaths,
    cluster: ClusterSettings,
    runner: R,
}

impl<R: CommandRunner> ProcessController<R> {
    /// Controller for `config` executing through `runner`.
    pub fn new(config: &RunConfig, runner: R) -> Self {
        Self {
            paths: config.paths.clone(),
            cluster: config.cluster.clone(),
            runner,
        }
    }

    /// Underlying runner.
    #[must_use]
    pub const fn runner(&self) -> &R {
        &self.runner
    }

    /// Underlying runner, mutably.
    pub fn runner_mut(&mut self) -> &mut R {
        &mut self.runner
    }

    /// Consume the controller and return its runner.
    #[must_use]
    pub fn into_runner(self) -> R {
        self.runner
    }

    fn local(&mut self, command: &str) -> Option<CommandOutcome> {
        self.runner.run_local(command).ok()
    }

    fn remote(&mut self, host: &str, command: &str, mode: RunMode) -> Option<CommandOutcome> {
        self.runner.run_remote(host, command, mode).ok()
    }

    /// Kill pktgen locally and l3fwd on the forwarder node.
    pub fn stop(&mut self) {
        self.local(KILL_GENERATOR);
        if let Some(host) = self.cluster.forwarder_node().map(str::to_string) {
            self.remote(&host, KILL_FORWARDER, RunMode::Foreground);
        }
    }

    /// Load the ARP table locally if present, and on a distinct forwarder node.
    pub fn setup_arp(&mut self) {
        let table = self.paths.arp_table();
        let command = commands::arp(&table);
        if table.exists() {
            self.local(&command);
        }
        if self.cluster.forwarder_is_remote() {
            if let Some(host) = self.cluster.forwarder_node().map(str::to_string) {
                self.remote(&host, &command, RunMode::Foreground);
            }
        }
    }

    /// Stop, then ARP. The returned token gates every launch.
    #[must_use]
    pub fn prepare_trial(&mut self) -> Prepared {
        self.stop();
        self.setup_arp();
        Prepared { _private: () }
    }

    /// Start l3fwd in the background on its node and let it settle.
    pub fn launch_forwarder(
        &mut self,
        _prepared: &Prepared,
        trial_id: &TrialId,
        config: &ForwarderConfig,
        tx_desc: Option<u32>,
        rx_desc: Option<u32>,
    ) {
        let command = TrialCommands::new(&self.paths, trial_id).forwarder(config, tx_desc, rx_desc);
        info!(trial = %trial_id, host = %config.host, workers = config.worker_cores, "launching l3fwd");
        self.remote(&config.host, &command, RunMode::Background);
        self.runner.sleep(SETTLE_SECS);
    }

    /// Run pktgen to completion.
    pub fn run_generator(
        &mut self,
        _prepared: &Prepared,
        trial_id: &TrialId,
        config: &GeneratorConfig,
        run: &GeneratorRun,
    ) -> Option<CommandOutcome> {
        let command = TrialCommands::new(&self.paths, trial_id).generator(config, run);
        info!(trial = %trial_id, tx_cores = config.tx_cores, duration = run.duration_secs, "running pktgen");
        self.local(&command)
    }

    /// Run pktgen with the profiler chain of `schedule` alongside.
    pub fn run_profiled_generator(
        &mut self,
        _prepared: &Prepared,
        trial_id: &TrialId,
        config: &GeneratorConfig,
        run: &GeneratorRun,
        schedule: &PhaseSchedule,
        profilers: &ProfilerSettings,
    ) -> Option<CommandOutcome> {
        if profilers.enable_neohost && !schedule.includes(PhaseKind::Neohost) {
            warn!(
                python = %self.paths.neohost_python().display(),
                "NeoHost enabled but not installed, skipping"
            );
        }
        let names: Vec<&str> = schedule.profilers().map(PhaseKind::as_str).collect();
        let chain = if names.is_empty() {
            "none".to_string()
        } else {
            names.join("+")
        };
        info!(
            trial = %trial_id,
            tx_cores = config.tx_cores,
            duration = run.duration_secs,
            profilers = %chain,
            "running pktgen with profilers"
        );
        let command =
            TrialCommands::new(&self.paths, trial_id).profiled_generator(config, run, schedule, profilers);
        self.local(&command)
    }

    /// Stop everything and let it die.
    pub fn teardown(&mut self) {
        self.stop();
        self.runner.join_background();
        self.runner.sleep(SETTLE_SECS);
    }

    /// Configured events that `perf list` reports, or all of them if
    /// `perf list` cannot be run.
    pub fn detect_perf_events(&mut self, configured: &[PerfEventSpec]) -> Vec<PerfEventSpec> {
        match self.runner.capture(PERF_LIST) {
            Ok(list) => {
                let available = commands::available_events(configured, &list);
                for event in configured.iter().filter(|e| !available.contains(e)) {
                    warn!(event = %event, "perf event not available, dropping");
                }
                available
            }
            Err(e) => {
                warn!(error = %e, "perf list failed, using configured events");
                configured.to_vec()
            }
        }
    }

    /// Build DPDK, then Pktgen-DPDK. Returns the first non-zero exit code.
    pub fn run_build(&mut self) -> i32 {
        for (name, dir) in [("DPDK", self.paths.dpdk()), ("Pktgen", self.paths.pktgen())] {
            info!(project = name, dir = %dir.display(), "building");
            let code = match self.local(&commands::build(&dir)) {
                Some(outcome) => outcome.code().unwrap_or(1),
                None => 1,
            };
            if code != 0 {
                warn!(project = name, code, "build failed");
                return code;
            }
        }
        info!("build completed");
        0
    }
}
