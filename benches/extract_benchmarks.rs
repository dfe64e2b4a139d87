//! Log extraction benchmarks
//!
//! A profile-mode trial reads one log per tool; a long `perf stat -I 1000`
//! run is the largest. These cover each parser on synthetic logs sized like
//! a real trial, plus a full trial extraction from disk.
//!
//! Run with: cargo bench --bench extract_benchmarks

use std::fmt::Write as _;

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use dpdk_bench::config::{PerfEventSpec, ProfilerSettings};
use dpdk_bench::experiment::{LogKind, TrialId};
use dpdk_bench::extract::{App, MetricsExtractor, PacketParser, PcmParser, PerfParser, ProfileParams};

const EVENTS: [&str; 4] = [
    "LLC-load-misses",
    "LLC-store-misses",
    "unc_cha_llc_lookup.data_read",
    "unc_cha_llc_lookup.rfo_miss",
];

fn pktgen_log(periodic_rows: usize) -> String {
    let mut log = String::from("EAL: Detected 64 lcore(s)\n");
    for i in 0..periodic_rows {
        let core = 1 + i % 8;
        let _ = writeln!(log, "{core}        {}     {}     10.0       9.0        90.0", i * 1000, i * 900);
    }
    log.push_str(
        "======== PKTGEN Packet Statistics Summary ========\n\
         Core     RX           TX           RX Mpps    TX Mpps    TX %\n\
         Total    384740568    611909280                          59.0\n\
         ==================================================\n",
    );
    log
}

fn perf_log(seconds: usize) -> String {
    let mut log = String::from("#           time socket cpus             counts unit events\n");
    for s in 1..=seconds {
        for (i, event) in EVENTS.iter().enumerate() {
            let _ = writeln!(log, "{s:>6}.001096320 S0       32          {},{:03}      {event}", s + i, s % 1000);
        }
        let _ = writeln!(
            log,
            "{s:>6}.001096320 S0        1          2,513,972      UNC_CHA_REQUESTS.WRITES_LOCAL #    160.9 MB/s  llc_miss_local_memory_bandwidth_write"
        );
    }
    log
}

fn pcm_log(blocks: usize) -> String {
    let mut log = String::new();
    for b in 0..blocks {
        let _ = write!(
            log,
            " Skt | PCIRdCur | RFO | CRd | DRd | ItoM | PRd | WiL | PCIe Rd (B) | PCIe Wr (B)\n \
             0 (Total)  {} M  10 K  0  0  0  0  0  1024 M  512 M\n \
             0 (Miss)   {} K  1 K   0  0  0  0  0  0       0\n \
             0 (Hit)    1 M   9 K   0  0  0  0  0  0       0\n \
             1 (Total)  9 M   9 K   0  0  0  0  0  9 G     9 G\n",
            12 + b % 3,
            300 + b
        );
    }
    log
}

fn events() -> Vec<PerfEventSpec> {
    EVENTS.iter().map(|e| PerfEventSpec::count(*e)).collect()
}

/// Benchmark packet totals: summary line vs per-core fallback
fn bench_packet_totals(c: &mut Criterion) {
    let mut group = c.benchmark_group("packet_totals");
    let parser = PacketParser::new(App::Pktgen).unwrap();

    for rows in [100, 10_000] {
        let log = pktgen_log(rows);
        group.bench_with_input(BenchmarkId::new("summary", rows), &log, |b, log| {
            b.iter(|| parser.totals(black_box(log)));
        });
        let truncated = &log[..log.find("========").unwrap()];
        group.bench_with_input(BenchmarkId::new("per_core", rows), truncated, |b, log| {
            b.iter(|| parser.totals(black_box(log)));
        });
    }
    group.finish();
}

/// Benchmark perf interval averaging
fn bench_perf(c: &mut Criterion) {
    let mut group = c.benchmark_group("perf_summary");
    let parser = PerfParser::new().unwrap();
    let events = events();
    let metrics = vec!["llc_miss_local_memory_bandwidth_write".to_string()];

    for seconds in [15, 600] {
        let log = perf_log(seconds);
        group.bench_with_input(BenchmarkId::from_parameter(seconds), &log, |b, log| {
            b.iter(|| parser.summarize(black_box(log), &events, &metrics));
        });
    }
    group.finish();
}

/// Benchmark pcm-pcie column lookup and averaging
fn bench_pcm(c: &mut Criterion) {
    let parser = PcmParser::new().unwrap();
    let log = pcm_log(15);
    c.bench_function("pcm_summary_15_blocks", |b| {
        b.iter(|| parser.summarize(black_box(&log)));
    });
}

/// Benchmark a whole profile-mode trial read from disk
fn bench_profiled_trial(c: &mut Criterion) {
    let dir = tempfile::tempdir().unwrap();
    let id: TrialId = "20240101-120000.000001".parse().unwrap();
    std::fs::write(id.log_path(dir.path(), LogKind::Pktgen), pktgen_log(1_000)).unwrap();
    std::fs::write(id.log_path(dir.path(), LogKind::Perf), perf_log(15)).unwrap();
    std::fs::write(id.log_path(dir.path(), LogKind::PcmPcie), pcm_log(15)).unwrap();

    let settings = ProfilerSettings {
        perf_events: events(),
        ..ProfilerSettings::default()
    };
    let extractor = MetricsExtractor::new(dir.path(), settings).unwrap();
    let params = ProfileParams {
        txqs_min_inline: 0,
        tx_cores: 4,
        tx_desc: 1024,
        duration_secs: 50,
    };
    c.bench_function("extract_profiled_trial", |b| {
        b.iter(|| extractor.extract_profiled_trial(black_box(&id), &params));
    });
}

criterion_group!(
    benches,
    bench_packet_totals,
    bench_perf,
    bench_pcm,
    bench_profiled_trial
);
criterion_main!(benches);
