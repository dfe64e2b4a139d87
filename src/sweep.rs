//! Parameter sweep and result aggregation
//!
//! ```text
//! for point in sweep_points():
//!     prepare_trial -> launch -> teardown -> extract -> table.push
//!     (stop early if interrupted; the running trial always completes)
//! finish(): results/dpdk_perf_results.txt + .json, echoed to stdout
//! ```
//!
//! The table is written exactly once: by [`SweepController::finish`], or by
//! `Drop` if the sweep ends through an error or a panic.

use std::fmt;
use std::fs;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tracing::{info, warn};

use crate::config::{PerfEventSource, ProfilerSettings, RunConfig, SweepMode};
use crate::experiment::{ResultTable, TrialId, TrialRecord};
use crate::extract::{MetricsExtractor, PipelineParams, ProfileParams, TrialReport};
use crate::process::{CommandRunner, GeneratorRun, ProcessController};
use crate::schedule::PhaseSchedule;
use crate::{Error, Result};

/// Pause between two trials, seconds.
pub const INTER_TRIAL_SECS: u64 = 5;

/// One parameter combination.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SweepPoint {
    /// Generator alone, under the profiler chain
    Profile(ProfileParams),
    /// Forwarder and generator
    Pipeline(PipelineParams),
}

impl fmt::Display for SweepPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Profile(params) => fmt::Display::fmt(params, f),
            Self::Pipeline(params) => fmt::Display::fmt(params, f),
        }
    }
}

/// Single-value overrides for [`replay`]; unset fields take the first
/// configured sweep value.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PointOverrides {
    /// Generator TX cores
    pub tx_cores: Option<u32>,
    /// Generator TX descriptors
    pub tx_desc: Option<u32>,
    /// Forwarder worker cores
    pub l3fwd_lcores: Option<u32>,
    /// Forwarder TX queue size
    pub l3fwd_tx_desc: Option<u32>,
    /// Forwarder RX queue size
    pub l3fwd_rx_desc: Option<u32>,
}

fn first(values: &[u32], key: &str) -> Result<u32> {
    values.first().copied().ok_or_else(|| Error::InvalidConfig {
        key: key.to_string(),
        value: String::new(),
    })
}

fn header(mode: SweepMode, extractor: &MetricsExtractor) -> Vec<String> {
    match mode {
        SweepMode::Profile => extractor.profile_header(),
        SweepMode::Pipeline => MetricsExtractor::pipeline_header(),
    }
}

fn extract(extractor: &MetricsExtractor, trial_id: &TrialId, point: &SweepPoint) -> TrialReport {
    match point {
        SweepPoint::Profile(params) => extractor.extract_profiled_trial(trial_id, params),
        SweepPoint::Pipeline(params) => extractor.extract_pipeline_trial(trial_id, params),
    }
}

/// Every sweep point of `config`, outer dimension first.
///
/// Profile mode sweeps TX cores × TX descriptors. Pipeline mode sweeps
/// l3fwd lcores × pktgen TX cores × pktgen TX descriptors × l3fwd TX
/// descriptors × l3fwd RX descriptors.
///
/// # Errors
///
/// Fails if the generator NIC is not configured.
pub fn sweep_points(config: &RunConfig, schedule: &PhaseSchedule) -> Result<Vec<SweepPoint>> {
    let bench = &config.bench;
    let mut points = Vec::new();
    match bench.sweep_mode {
        SweepMode::Profile => {
            let txqs_min_inline = config.cluster.generator_device()?.txqs_min_inline();
            for &tx_cores in &bench.tx_core_values {
                for &tx_desc in &bench.pktgen_tx_desc_values {
                    points.push(SweepPoint::Profile(ProfileParams {
                        txqs_min_inline,
                        tx_cores,
                        tx_desc,
                        duration_secs: schedule.total(),
                    }));
                }
            }
        }
        SweepMode::Pipeline => {
            for &l3fwd_lcores in &bench.l3fwd_lcore_values {
                for &pktgen_tx_cores in &bench.tx_core_values {
                    for &pktgen_tx_desc in &bench.pktgen_tx_desc_values {
                        for &l3fwd_tx_desc in &bench.l3fwd_tx_desc_values {
                            for &l3fwd_rx_desc in &bench.l3fwd_rx_desc_values {
                                points.push(SweepPoint::Pipeline(PipelineParams {
                                    packet_size: bench.packet_size,
                                    l3fwd_tx_desc,
                                    l3fwd_rx_desc,
                                    pktgen_tx_desc,
                                    l3fwd_lcores,
                                    pktgen_tx_cores,
                                    duration_secs: bench.pipeline_duration,
                                }));
                            }
                        }
                    }
                }
            }
        }
    }
    Ok(points)
}

/// Runs every sweep point and aggregates the rows.
pub struct SweepController<R: CommandRunner> {
    config: RunConfig,
    controller: ProcessController<R>,
    extractor: MetricsExtractor,
    schedule: PhaseSchedule,
    profilers: ProfilerSettings,
    table: ResultTable,
    interrupted: Arc<AtomicBool>,
    last_trial: Option<TrialId>,
    written: Option<PathBuf>,
}

impl<R: CommandRunner> SweepController<R> {
    /// Prepare a sweep over `config`.
    ///
    /// Creates the results directory and, with `PERF_EVENT_SOURCE=auto`,
    /// narrows the perf events to those `perf list` reports.
    ///
    /// # Errors
    ///
    /// Fails if the results directory cannot be created.
    pub fn new(config: RunConfig, runner: R) -> Result<Self> {
        fs::create_dir_all(config.paths.results())?;
        let mut controller = ProcessController::new(&config, runner);

        let mut profilers = config.bench.profilers.clone();
        if profilers.enable_perf && profilers.perf_event_source == PerfEventSource::Auto {
            profilers.perf_events = controller.detect_perf_events(&profilers.perf_events);
        }
        let schedule = PhaseSchedule::new(&profilers, config.paths.neohost_available());
        let extractor = MetricsExtractor::new(config.paths.results(), profilers.clone())?;
        let table = ResultTable::new(header(config.bench.sweep_mode, &extractor));

        Ok(Self {
            config,
            controller,
            extractor,
            schedule,
            profilers,
            table,
            interrupted: Arc::new(AtomicBool::new(false)),
            last_trial: None,
            written: None,
        })
    }

    /// Flag that stops the sweep after the current trial once set.
    #[must_use]
    pub fn interrupt_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.interrupted)
    }

    /// Rows collected so far.
    #[must_use]
    pub const fn table(&self) -> &ResultTable {
        &self.table
    }

    /// Profiling schedule of every profile-mode trial.
    #[must_use]
    pub const fn schedule(&self) -> &PhaseSchedule {
        &self.schedule
    }

    /// Process controller, e.g. to inspect a test runner.
    #[must_use]
    pub const fn controller(&self) -> &ProcessController<R> {
        &self.controller
    }

    fn interrupted(&self) -> bool {
        self.interrupted.load(Ordering::SeqCst)
    }

    /// Run every sweep point, then write the table.
    ///
    /// # Errors
    ///
    /// Fails on configuration errors (e.g. a missing NIC address under the
    /// `require` policy) or if the table cannot be written. Tool failures
    /// during a trial are logged and never abort the sweep.
    pub fn run(&mut self) -> Result<PathBuf> {
        let points = sweep_points(&self.config, &self.schedule)?;
        info!(
            mode = ?self.config.bench.sweep_mode,
            points = points.len(),
            "starting sweep"
        );
        for (index, point) in points.iter().enumerate() {
            if self.interrupted() {
                info!(completed = index, "interrupted, stopping sweep");
                break;
            }
            if index > 0 {
                self.controller.runner_mut().sleep(INTER_TRIAL_SECS);
            }
            self.run_trial(point)?;
        }
        self.finish()
    }

    /// Run one trial and append its row.
    ///
    /// # Errors
    ///
    /// Fails if the launch configuration for `point` cannot be resolved.
    pub fn run_trial(&mut self, point: &SweepPoint) -> Result<TrialId> {
        let trial_id = TrialId::after(self.last_trial.as_ref());
        self.last_trial = Some(trial_id.clone());
        info!(trial = %trial_id, point = %point, "trial start");

        let mut record = TrialRecord::new(trial_id.clone(), point.to_string());
        record.start();
        let launched = self.launch(&trial_id, point);
        self.controller.teardown();
        record.finish();
        launched?;

        let report = extract(&self.extractor, &trial_id, point);
        report.apply_to(&mut record);
        info!(trial = %trial_id, row = %report.row, "trial complete");
        self.table.push(report.row, record);
        Ok(trial_id)
    }

    fn launch(&mut self, trial_id: &TrialId, point: &SweepPoint) -> Result<()> {
        match point {
            SweepPoint::Profile(params) => {
                let generator = self.config.generator(params.tx_cores)?;
                let run = GeneratorRun {
                    duration_secs: params.duration_secs,
                    packet_size: self.config.bench.packet_size,
                    tx_desc: params.tx_desc,
                };
                let prepared = self.controller.prepare_trial();
                self.controller.run_profiled_generator(
                    &prepared,
                    trial_id,
                    &generator,
                    &run,
                    &self.schedule,
                    &self.profilers,
                );
            }
            SweepPoint::Pipeline(params) => {
                let generator = self.config.generator(params.pktgen_tx_cores)?;
                let forwarder = if self.config.cluster.forwarder_node().is_some() {
                    Some(self.config.forwarder(params.l3fwd_lcores)?)
                } else {
                    warn!("L3FWD_NODE is empty, running pktgen alone");
                    None
                };
                let run = GeneratorRun {
                    duration_secs: params.duration_secs,
                    packet_size: params.packet_size,
                    tx_desc: params.pktgen_tx_desc,
                };
                let prepared = self.controller.prepare_trial();
                if let Some(forwarder) = &forwarder {
                    self.controller.launch_forwarder(
                        &prepared,
                        trial_id,
                        forwarder,
                        Some(params.l3fwd_tx_desc),
                        Some(params.l3fwd_rx_desc),
                    );
                }
                self.controller.run_generator(&prepared, trial_id, &generator, &run);
            }
        }
        Ok(())
    }

    /// Write the table and its JSON sidecar, and echo the table to stdout.
    ///
    /// Only the first call writes; later calls return the same path.
    ///
    /// # Errors
    ///
    /// Fails if the results directory cannot be written.
    pub fn finish(&mut self) -> Result<PathBuf> {
        if let Some(path) = &self.written {
            return Ok(path.clone());
        }
        let path = self.table.write_to(&self.config.paths.results())?;
        println!("{}", self.table.render());
        self.written = Some(path.clone());
        Ok(path)
    }
}

impl<R: CommandRunner> Drop for SweepController<R> {
    fn drop(&mut self) {
        // an empty table never replaces results already on disk
        if self.written.is_none() && !self.table.is_empty() {
            if let Err(e) = self.finish() {
                warn!(error = %e, "could not write results on exit");
            }
        }
    }
}

/// Re-extract existing logs of `trial_ids` into a table.
///
/// Every trial is read with the same sweep point: the first configured
/// value of each dimension unless overridden. Perf events are taken
/// verbatim from the configuration. Nothing is written.
///
/// # Errors
///
/// Fails on configuration errors or if a log pattern does not compile.
pub fn replay(
    config: &RunConfig,
    trial_ids: &[TrialId],
    overrides: PointOverrides,
) -> Result<ResultTable> {
    let bench = &config.bench;
    let profilers = bench.profilers.clone();
    let schedule = PhaseSchedule::new(&profilers, config.paths.neohost_available());
    let extractor = MetricsExtractor::new(config.paths.results(), profilers)?;

    let tx_cores = match overrides.tx_cores {
        Some(v) => v,
        None => first(&bench.tx_core_values, "PKTGEN_TX_CORE_VALUES")?,
    };
    let tx_desc = match overrides.tx_desc {
        Some(v) => v,
        None => first(&bench.pktgen_tx_desc_values, "PKTGEN_TX_DESC_VALUES")?,
    };
    let point = match bench.sweep_mode {
        SweepMode::Profile => SweepPoint::Profile(ProfileParams {
            txqs_min_inline: config.cluster.generator_device()?.txqs_min_inline(),
            tx_cores,
            tx_desc,
            duration_secs: schedule.total(),
        }),
        SweepMode::Pipeline => SweepPoint::Pipeline(PipelineParams {
            packet_size: bench.packet_size,
            l3fwd_tx_desc: match overrides.l3fwd_tx_desc {
                Some(v) => v,
                None => first(&bench.l3fwd_tx_desc_values, "L3FWD_TX_DESC_VALUES")?,
            },
            l3fwd_rx_desc: match overrides.l3fwd_rx_desc {
                Some(v) => v,
                None => first(&bench.l3fwd_rx_desc_values, "L3FWD_RX_DESC_VALUES")?,
            },
            pktgen_tx_desc: tx_desc,
            l3fwd_lcores: match overrides.l3fwd_lcores {
                Some(v) => v,
                None => first(&bench.l3fwd_lcore_values, "L3FWD_LCORE_VALUES")?,
            },
            pktgen_tx_cores: tx_cores,
            duration_secs: bench.pipeline_duration,
        }),
    };

    let mut table = ResultTable::new(header(bench.sweep_mode, &extractor));
    for trial_id in trial_ids {
        let report = extract(&extractor, trial_id, &point);
        let mut record = TrialRecord::new(trial_id.clone(), point.to_string());
        report.apply_to(&mut record);
        table.push(report.row, record);
    }
    Ok(table)
}
