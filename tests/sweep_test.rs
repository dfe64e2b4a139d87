//! Full sweeps against a recording runner that drops fixture logs

mod common;

use std::cell::RefCell;
use std::fs;
use std::path::Path;
use std::rc::Rc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use common::{app_summary, pcm_pcie_block, write_home, Call, RecordingRunner, SYSTEM_CONFIG};
use dpdk_bench::config::{BenchPaths, RunConfig};
use dpdk_bench::experiment::{LogKind, TrialId, TrialStatus, RECORDS_FILE_NAME};
use dpdk_bench::extract::ProfileParams;
use dpdk_bench::sweep::{replay, PointOverrides, SweepController, SweepPoint, INTER_TRIAL_SECS};
use regex::Regex;
use tempfile::TempDir;

const PROFILE_TEST_CONFIG: &str = "\
PKTGEN_NIC_DEVARGS=txqs_min_inline=0
L3FWD_NIC_DEVARGS=
PKTGEN_TX_CORE_VALUES=1,2
ENABLE_PERF=false
";

fn home(test: &str) -> (TempDir, RunConfig) {
    let home = TempDir::new().unwrap();
    write_home(home.path(), "PKTGEN_NODE=node7\nL3FWD_NODE=node8\n", SYSTEM_CONFIG, test);
    let config = RunConfig::load(BenchPaths::new(home.path())).unwrap();
    (home, config)
}

/// Runner whose local commands write a pktgen log (70M packets sent) and a
/// pcm-pcie log wherever they redirect to.
fn fixture_runner() -> RecordingRunner {
    let pktgen = Regex::new(r"> (\S+\.pktgen) 2>&1").unwrap();
    let pcm = Regex::new(r"> (\S+\.pcm-pcie) 2>&1").unwrap();
    RecordingRunner::with_hook(move |command| {
        if let Some(caps) = pktgen.captures(command) {
            fs::write(&caps[1], app_summary("PKTGEN", 0, 70_000_000)).unwrap();
        }
        if let Some(caps) = pcm.captures(command) {
            fs::write(&caps[1], pcm_pcie_block("12 M", "3 M", "1024 M", "512 M")).unwrap();
        }
    })
}

fn results_lines(home: &Path) -> Vec<String> {
    fs::read_to_string(home.join("results/dpdk_perf_results.txt"))
        .unwrap()
        .lines()
        .map(str::to_string)
        .collect()
}

#[test]
fn test_profile_sweep_writes_one_row_per_point() {
    let (home, config) = home(PROFILE_TEST_CONFIG);
    let mut sweep = SweepController::new(config, fixture_runner()).unwrap();
    assert_eq!(sweep.schedule().total(), 35);

    let path = sweep.run().unwrap();
    assert_eq!(path, home.path().join("results/dpdk_perf_results.txt"));
    assert_eq!(sweep.table().len(), 2);

    let lines = results_lines(home.path());
    assert_eq!(lines.len(), 3);
    assert!(lines[0].starts_with("EXPTID, txqs_min_inline, # TX cores"));
    for (line, tx_cores) in lines[1..].iter().zip(["1", "2"]) {
        let cells: Vec<&str> = line.split(", ").collect();
        assert_eq!(cells.len(), 10);
        assert_eq!(cells[1..5], ["0", tx_cores, "1024", "2.0Mpps"]);
        assert_eq!(cells[5..], ["12.0M", "3.0M", "25.00%", "1.02GB/s", "512.00MB/s"]);
    }

    let records = sweep.table().records();
    assert_eq!(records[0].status(LogKind::Pktgen), TrialStatus::Success);
    assert!(records[0].trial_id() < records[1].trial_id());
    assert!(home.path().join("results").join(RECORDS_FILE_NAME).exists());

    let runner = sweep.controller().runner();
    assert_eq!(runner.sleeps().iter().filter(|s| **s == INTER_TRIAL_SECS).count(), 1);
    let profiled: Vec<&str> = runner
        .locals()
        .into_iter()
        .filter(|cmd| cmd.contains("PKTGEN_PID"))
        .collect();
    assert_eq!(profiled.len(), 2);
    assert!(profiled[0].contains("PKTGEN_DURATION=35 "));
    assert!(!profiled[0].contains("perf stat"));
}

#[test]
fn test_interrupt_before_first_trial_writes_header_only() {
    let (home, config) = home(PROFILE_TEST_CONFIG);
    let mut sweep = SweepController::new(config, fixture_runner()).unwrap();
    sweep.interrupt_flag().store(true, Ordering::SeqCst);
    sweep.run().unwrap();

    assert!(sweep.table().is_empty());
    assert!(sweep.controller().runner().calls.is_empty());
    assert_eq!(results_lines(home.path()).len(), 1);
}

#[test]
fn test_interrupt_between_trials_keeps_finished_rows() {
    let (home, config) = home(PROFILE_TEST_CONFIG);
    let flag: Rc<RefCell<Option<Arc<AtomicBool>>>> = Rc::default();
    let hook_flag = Rc::clone(&flag);
    let pktgen = Regex::new(r"> (\S+\.pktgen) 2>&1").unwrap();
    // ^C arrives while the first trial is running
    let runner = RecordingRunner::with_hook(move |command| {
        if let Some(caps) = pktgen.captures(command) {
            fs::write(&caps[1], app_summary("PKTGEN", 0, 35_000_000)).unwrap();
            if let Some(flag) = hook_flag.borrow().as_ref() {
                flag.store(true, Ordering::SeqCst);
            }
        }
    });
    let mut sweep = SweepController::new(config, runner).unwrap();
    *flag.borrow_mut() = Some(sweep.interrupt_flag());
    sweep.run().unwrap();

    assert_eq!(sweep.table().len(), 1);
    assert!(!sweep.controller().runner().sleeps().contains(&INTER_TRIAL_SECS));
    let lines = results_lines(home.path());
    assert_eq!(lines.len(), 2);
    assert!(lines[1].contains(", 1.0Mpps"));
}

#[test]
fn test_drop_flushes_after_manual_trial() {
    let (home, config) = home(PROFILE_TEST_CONFIG);
    {
        let mut sweep = SweepController::new(config, fixture_runner()).unwrap();
        let point = SweepPoint::Profile(ProfileParams {
            txqs_min_inline: 0,
            tx_cores: 1,
            tx_desc: 1024,
            duration_secs: 35,
        });
        sweep.run_trial(&point).unwrap();
    }
    let lines = results_lines(home.path());
    assert_eq!(lines.len(), 2);
    assert!(lines[1].contains("2.0Mpps"));
}

#[test]
fn test_drop_without_trials_keeps_previous_results() {
    let (home, config) = home(PROFILE_TEST_CONFIG);
    let results = home.path().join("results");
    fs::create_dir_all(&results).unwrap();
    let previous = "EXPTID, txqs_min_inline\n20240101-120000.000001, 0\n";
    fs::write(results.join("dpdk_perf_results.txt"), previous).unwrap();

    {
        let _sweep = SweepController::new(config, fixture_runner()).unwrap();
        // setup failed before the first trial
    }
    assert_eq!(
        fs::read_to_string(results.join("dpdk_perf_results.txt")).unwrap(),
        previous
    );
    assert!(!results.join(RECORDS_FILE_NAME).exists());
}

#[test]
fn test_pipeline_sweep_without_forwarder_runs_pktgen_alone() {
    let home = TempDir::new().unwrap();
    write_home(
        home.path(),
        "L3FWD_NODE=\n",
        SYSTEM_CONFIG,
        "SWEEP_MODE=pipeline\nPKTGEN_NIC_DEVARGS=\nL3FWD_NIC_DEVARGS=\nPKTGEN_TX_CORE_VALUES=1\n",
    );
    let config = RunConfig::load(BenchPaths::new(home.path())).unwrap();
    let mut sweep = SweepController::new(config, fixture_runner()).unwrap();
    sweep.run().unwrap();

    let runner = sweep.controller().runner();
    assert!(runner.calls.iter().all(|c| !matches!(c, Call::Remote { .. })));
    let row = &sweep.table().rows()[0];
    assert_eq!(row.width(), 40);
    // 70M sent over the 5 s pipeline run
    assert_eq!(row.cells()[7], "14.0");
    assert_eq!(
        sweep.table().records()[0].status(LogKind::L3fwd),
        TrialStatus::Unknown
    );
}

#[test]
fn test_replay_reads_existing_logs_without_writing() {
    let (home, config) = home(PROFILE_TEST_CONFIG);
    let results = home.path().join("results");
    fs::create_dir_all(&results).unwrap();
    let ids: Vec<TrialId> = ["20240101-120000.000001", "20240101-120100.000002"]
        .iter()
        .map(|s| s.parse().unwrap())
        .collect();
    fs::write(
        ids[0].log_path(&results, LogKind::Pktgen),
        app_summary("PKTGEN", 0, 35_000_000),
    )
    .unwrap();

    let overrides = PointOverrides {
        tx_cores: Some(4),
        ..PointOverrides::default()
    };
    let table = replay(&config, &ids, overrides).unwrap();
    assert_eq!(table.len(), 2);
    assert_eq!(table.rows()[0].cells()[..4], ["0", "4", "1024", "1.0Mpps"]);
    assert_eq!(table.rows()[1].cells()[3], "0Mpps");
    assert_eq!(table.records()[1].status(LogKind::Pktgen), TrialStatus::Unknown);
    assert!(!results.join("dpdk_perf_results.txt").exists());
}
