//! End-to-end extraction over fixture logs

mod common;

use std::fs;
use std::path::Path;

use common::{app_summary, neohost_log, pcm_pcie_block, pcm_report, perf_log};
use dpdk_bench::config::{PerfEventSpec, ProfilerSettings};
use dpdk_bench::experiment::{LogKind, TrialId, TrialRecord, TrialStatus};
use dpdk_bench::extract::{MetricsExtractor, PipelineParams, ProfileParams};
use tempfile::TempDir;

fn trial() -> TrialId {
    "20240101-120000.000001".parse().unwrap()
}

fn write_log(dir: &Path, id: &TrialId, kind: LogKind, text: &str) {
    fs::write(id.log_path(dir, kind), text).unwrap();
}

fn profile_params(duration_secs: u64) -> ProfileParams {
    ProfileParams {
        txqs_min_inline: 0,
        tx_cores: 1,
        tx_desc: 1024,
        duration_secs,
    }
}

fn pipeline_params() -> PipelineParams {
    PipelineParams {
        packet_size: 64,
        l3fwd_tx_desc: 1024,
        l3fwd_rx_desc: 2048,
        pktgen_tx_desc: 512,
        l3fwd_lcores: 2,
        pktgen_tx_cores: 2,
        duration_secs: 5,
    }
}

// ============================================================================
// Profile mode
// ============================================================================

#[test]
fn test_profile_row_tx_rate_and_missing_perf() {
    let dir = TempDir::new().unwrap();
    let id = trial();
    write_log(dir.path(), &id, LogKind::Pktgen, &app_summary("PKTGEN", 1_000_000, 2_000_000));
    write_log(
        dir.path(),
        &id,
        LogKind::PcmPcie,
        &pcm_pcie_block("12 M", "3 M", "1024 M", "512 M"),
    );

    let extractor = MetricsExtractor::new(dir.path(), ProfilerSettings::default()).unwrap();
    let report = extractor.extract_profiled_trial(&id, &profile_params(10));
    let cells = report.row.cells();

    assert_eq!(&cells[..4], ["0", "1", "1024", "0.2Mpps"]);
    // six default events, two default metrics, all zero
    assert!(cells[4..10].iter().all(|c| c == "0"));
    assert_eq!(&cells[10..12], ["0.00MB/s", "0.00MB/s"]);
    assert_eq!(
        &cells[12..],
        ["12.0M", "3.0M", "25.00%", "1.02GB/s", "512.00MB/s"]
    );
    assert_eq!(report.row.width(), extractor.profile_header().len());

    assert_eq!(report.status(LogKind::Pktgen), TrialStatus::Success);
    assert_eq!(report.status(LogKind::Perf), TrialStatus::Unknown);
    assert_eq!(report.status(LogKind::PcmPcie), TrialStatus::Success);
    assert_eq!(report.strategies.get(&LogKind::Pktgen), Some(&"summary-total"));
}

#[test]
fn test_profile_row_with_perf_and_neohost() {
    let dir = TempDir::new().unwrap();
    let id = trial();
    let settings = ProfilerSettings {
        enable_pcm: false,
        enable_neohost: true,
        perf_events: vec![PerfEventSpec::count("LLC-load-misses")],
        perf_metrics: Vec::new(),
        ..ProfilerSettings::default()
    };
    write_log(dir.path(), &id, LogKind::Pktgen, &app_summary("PKTGEN", 0, 50_000_000));
    write_log(
        dir.path(),
        &id,
        LogKind::Perf,
        &perf_log(&[
            (1, "LLC-load-misses", 1),
            (2, "LLC-load-misses", 1),
            (3, "LLC-load-misses", 2_000_000),
            (4, "LLC-load-misses", 3_000_000),
        ]),
    );
    write_log(
        dir.path(),
        &id,
        LogKind::Neohost,
        &neohost_log(&[(1, 1.0, 1.0), (1, 1.0, 1.0), (1_500, 900.0, 1.0), (500, 1300.0, 2.0)]),
    );

    let extractor = MetricsExtractor::new(dir.path(), settings).unwrap();
    let report = extractor.extract_profiled_trial(&id, &profile_params(50));
    assert_eq!(
        report.row.cells(),
        ["0", "1", "1024", "1.0Mpps", "2.5M", "1.0K", "1.10Tb/s", "1.50Gb/s"]
    );
    assert_eq!(report.status(LogKind::Perf), TrialStatus::Success);
    assert_eq!(report.status(LogKind::Neohost), TrialStatus::Success);
    assert_eq!(report.status(LogKind::PcmPcie), TrialStatus::Unknown);
}

#[test]
fn test_profile_truncated_pktgen_uses_per_core_rows() {
    let dir = TempDir::new().unwrap();
    let id = trial();
    let log = "\
2        100          3000000      0.0        1.0        100.0
3        100          2000000      0.0        1.0        100.0
2        100          4000000      0.0        1.0        100.0
";
    write_log(dir.path(), &id, LogKind::Pktgen, log);
    let extractor = MetricsExtractor::new(dir.path(), ProfilerSettings::default()).unwrap();
    let report = extractor.extract_profiled_trial(&id, &profile_params(10));
    assert_eq!(report.row.cells()[3], "0.6Mpps");
    assert_eq!(report.strategies.get(&LogKind::Pktgen), Some(&"per-core-sum"));
}

#[test]
fn test_profile_error_status_from_text() {
    let dir = TempDir::new().unwrap();
    let id = trial();
    write_log(dir.path(), &id, LogKind::Pktgen, "EAL: Error - no such device\n");
    let extractor = MetricsExtractor::new(dir.path(), ProfilerSettings::default()).unwrap();
    let report = extractor.extract_profiled_trial(&id, &profile_params(10));
    assert_eq!(report.status(LogKind::Pktgen), TrialStatus::Error);
    assert_eq!(report.row.cells()[3], "0Mpps");
}

#[test]
fn test_invalid_utf8_is_read_lossily() {
    let dir = TempDir::new().unwrap();
    let id = trial();
    let mut bytes = vec![0xff, 0xfe, b'\n'];
    bytes.extend_from_slice(app_summary("PKTGEN", 0, 3_000_000).as_bytes());
    fs::write(id.log_path(dir.path(), LogKind::Pktgen), bytes).unwrap();

    let extractor = MetricsExtractor::new(dir.path(), ProfilerSettings::default()).unwrap();
    let report = extractor.extract_profiled_trial(&id, &profile_params(10));
    assert_eq!(report.row.cells()[3], "0.3Mpps");
}

#[test]
fn test_unreadable_log_is_error_and_others_survive() {
    let dir = TempDir::new().unwrap();
    let id = trial();
    write_log(dir.path(), &id, LogKind::Pktgen, &app_summary("PKTGEN", 0, 2_000_000));
    // a directory where the perf log should be cannot be read as a file
    fs::create_dir(id.log_path(dir.path(), LogKind::Perf)).unwrap();

    let extractor = MetricsExtractor::new(dir.path(), ProfilerSettings::default()).unwrap();
    let report = extractor.extract_profiled_trial(&id, &profile_params(10));
    assert_eq!(report.status(LogKind::Perf), TrialStatus::Error);
    assert_eq!(report.status(LogKind::Pktgen), TrialStatus::Success);
    assert_eq!(report.row.cells()[3], "0.2Mpps");
    assert!(report.row.cells()[4..10].iter().all(|c| c == "0"));
}

// ============================================================================
// Pipeline mode
// ============================================================================

fn write_pipeline_logs(dir: &Path, id: &TrialId) {
    let pktgen = format!(
        "{}Hardware RX Missed: 42\n{}",
        app_summary("PKTGEN", 4_000_000, 10_000_000),
        pcm_report(
            &[(0, 10, 50.0, 50.0), (1, 100, 90.0, 40.0), (2, 200, 80.0, 30.0), (3, 300, 70.0, 20.0)],
            (849_920, 1_364_032, 81.1, 130.1),
            (288_364, 398_784, 27.5, 38.0),
        )
    );
    let l3fwd = format!(
        "{}{}",
        app_summary("L3FWD", 9_000_000, 5_000_000),
        pcm_report(
            &[(0, 999, 1.0, 1.0), (1, 1_000, 60.0, 10.0), (2, 2_000, 40.0, 30.0)],
            (1, 2, 3.0, 4.0),
            (5, 6, 7.0, 8.0),
        )
    );
    write_log(dir, id, LogKind::Pktgen, &pktgen);
    write_log(dir, id, LogKind::L3fwd, &l3fwd);
}

#[test]
fn test_pipeline_row_layout() {
    let dir = TempDir::new().unwrap();
    let id = trial();
    write_pipeline_logs(dir.path(), &id);

    let extractor = MetricsExtractor::new(dir.path(), ProfilerSettings::default()).unwrap();
    let report = extractor.extract_pipeline_trial(&id, &pipeline_params());
    let expected = [
        // sweep parameters
        "64", "1024", "2048", "512", "2", "2",
        // pktgen rx/tx rate, pktgen rx fails, l3fwd rx/tx rate, l3fwd tx fails
        "0.8", "2.0", "1.0", "1.8", "1.0", "4.0",
        // hw rx missed
        "42", "0",
        // pktgen RX core, pktgen TX cores, l3fwd workers
        "100.0", "90.0", "40.0", "250.0", "75.0", "25.0", "1500.0", "50.0", "20.0",
        // DRAM pktgen, DRAM l3fwd
        "849920", "1364032", "81.1", "130.1", "1", "2", "3.0", "4.0",
        // PCIe pktgen, PCIe l3fwd
        "288364", "398784", "27.5", "38.0", "5", "6", "7.0", "8.0",
    ];
    assert_eq!(report.row.cells(), expected);
    assert_eq!(report.row.width(), MetricsExtractor::pipeline_header().len());
    assert_eq!(report.status(LogKind::L3fwd), TrialStatus::Success);
    assert_eq!(report.status(LogKind::Pktgen), TrialStatus::Success);
}

#[test]
fn test_pipeline_missing_forwarder_log() {
    let dir = TempDir::new().unwrap();
    let id = trial();
    write_log(dir.path(), &id, LogKind::Pktgen, &app_summary("PKTGEN", 1_000_000, 5_000_000));

    let extractor = MetricsExtractor::new(dir.path(), ProfilerSettings::default()).unwrap();
    let report = extractor.extract_pipeline_trial(&id, &pipeline_params());
    let cells = report.row.cells();
    assert_eq!(report.status(LogKind::L3fwd), TrialStatus::Unknown);
    // pktgen RX fails = l3fwd TX (0) - pktgen RX
    assert_eq!(cells[8], "-1.0");
    assert_eq!(cells[9], "0.0");
    // no PCM sections in either log
    assert!(cells[14..].iter().all(|c| c == "0"));
    assert!(report.messages.iter().any(|m| m.contains("not found")));
}

#[test]
fn test_reextraction_is_idempotent() {
    let dir = TempDir::new().unwrap();
    let id = trial();
    write_pipeline_logs(dir.path(), &id);
    let extractor = MetricsExtractor::new(dir.path(), ProfilerSettings::default()).unwrap();

    let first = extractor.extract_pipeline_trial(&id, &pipeline_params());
    let second = extractor.extract_pipeline_trial(&id, &pipeline_params());
    assert_eq!(first, second);
}

#[test]
fn test_report_applies_to_record() {
    let dir = TempDir::new().unwrap();
    let id = trial();
    write_pipeline_logs(dir.path(), &id);
    let extractor = MetricsExtractor::new(dir.path(), ProfilerSettings::default()).unwrap();
    let report = extractor.extract_pipeline_trial(&id, &pipeline_params());

    let mut record = TrialRecord::new(id, "pipeline");
    report.apply_to(&mut record);
    assert_eq!(record.status(LogKind::L3fwd), TrialStatus::Success);
    assert_eq!(record.strategy(LogKind::Pktgen), Some("summary-total"));
    assert_eq!(record.messages(), report.messages.as_slice());
}
