//! # dpdk-bench: DPDK pktgen/l3fwd Benchmark Orchestrator
//!
//! **Version**: 0.2.0
//!
//! dpdk-bench launches DPDK packet generation (pktgen) and forwarding
//! (l3fwd) on the testbed nodes, runs hardware profilers alongside
//! (`perf stat`, Intel PCM `pcm-pcie`, NeoHost), and scrapes the captured
//! logs into one result row per trial.
//!
//! ## Pipeline
//!
//! ```text
//! config ──> sweep ──> process (kill → ARP → launch → profile → kill)
//!                  └─> extract (logs → ResultRow) ──> experiment (ResultTable)
//! ```
//!
//! - **Single-threaded**: the only concurrency is the background DPDK and
//!   profiler processes, sequenced by `sleep` and `timeout`
//! - **Tolerant extraction**: a missing or malformed log zeroes its own
//!   columns and never aborts the sweep
//! - **Write once**: the table is written at the end of the sweep, on ^C
//!   after the running trial, or on unwind
//!
//! ## Example Usage
//!
//! ```rust,no_run
//! use dpdk_bench::config::{BenchPaths, RunConfig};
//! use dpdk_bench::process::ShellRunner;
//! use dpdk_bench::sweep::SweepController;
//!
//! let config = RunConfig::load(BenchPaths::resolve(None)?)?;
//! let runner = ShellRunner::new(config.cluster.ssh_user());
//! let mut sweep = SweepController::new(config, runner)?;
//! let table = sweep.run()?;
//! println!("results in {}", table.display());
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]

pub mod config;
pub mod error;
pub mod experiment;
pub mod extract;
pub mod process;
pub mod schedule;
pub mod sweep;

pub use error::{Error, Result};
