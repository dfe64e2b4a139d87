//! Process control for DPDK trials
//!
//! - [`runner`]: the [`CommandRunner`] seam; `sh -c` locally, `spurs` shells remotely
//! - [`commands`]: command-line builders
//! - [`controller`]: the per-trial lifecycle

pub mod commands;
pub mod controller;
pub mod runner;

pub use commands::{available_events, GeneratorRun, TrialCommands};
pub use controller::{Prepared, ProcessController, SETTLE_SECS};
pub use runner::{ssh_address, CommandOutcome, CommandRunner, RunMode, ShellRunner};
