//! `dpdk-bench` command-line entry point

use std::path::PathBuf;
use std::sync::atomic::Ordering;

use anyhow::Context;
use clap::{Parser, Subcommand};
use dpdk_bench::config::{BenchPaths, RunConfig};
use dpdk_bench::experiment::TrialId;
use dpdk_bench::process::{ProcessController, ShellRunner};
use dpdk_bench::sweep::{replay, PointOverrides, SweepController};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

/// DPDK pktgen/l3fwd benchmark runner
///
/// Without a subcommand, runs the sweep configured in
/// `<home>/config/test.config` and writes `results/dpdk_perf_results.txt`.
#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Cli {
    /// Bench home directory (defaults to $DPDK_BENCH_HOME, then the current directory)
    #[arg(long, value_name = "DIR", global = true)]
    home: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Compile DPDK and Pktgen-DPDK; exits with the build's exit code
    Build,

    /// Re-extract the logs of finished trials and print the table
    Extract(ExtractArgs),
}

#[derive(Parser, Debug)]
struct ExtractArgs {
    /// Trial ids, e.g. 20240101-120000.000001
    #[arg(required = true, value_name = "TRIAL_ID")]
    trial_ids: Vec<TrialId>,

    /// Generator TX cores (defaults to the first configured value)
    #[arg(long)]
    tx_cores: Option<u32>,

    /// Generator TX descriptors
    #[arg(long)]
    tx_desc: Option<u32>,

    /// Forwarder worker cores (pipeline mode)
    #[arg(long)]
    l3fwd_lcores: Option<u32>,

    /// Forwarder TX queue size (pipeline mode)
    #[arg(long)]
    l3fwd_tx_desc: Option<u32>,

    /// Forwarder RX queue size (pipeline mode)
    #[arg(long)]
    l3fwd_rx_desc: Option<u32>,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();
    let paths = BenchPaths::resolve(cli.home).context("resolve bench home")?;
    let config = RunConfig::load(paths).context("load configuration")?;

    match cli.command {
        Some(Command::Build) => {
            let runner = ShellRunner::new(config.cluster.ssh_user());
            let mut controller = ProcessController::new(&config, runner);
            std::process::exit(controller.run_build());
        }
        Some(Command::Extract(args)) => {
            let overrides = PointOverrides {
                tx_cores: args.tx_cores,
                tx_desc: args.tx_desc,
                l3fwd_lcores: args.l3fwd_lcores,
                l3fwd_tx_desc: args.l3fwd_tx_desc,
                l3fwd_rx_desc: args.l3fwd_rx_desc,
            };
            let table = replay(&config, &args.trial_ids, overrides).context("re-extract trials")?;
            print!("{}", table.render());
        }
        None => {
            let runner = ShellRunner::new(config.cluster.ssh_user());
            let mut sweep = SweepController::new(config, runner).context("prepare sweep")?;
            let interrupted = sweep.interrupt_flag();
            ctrlc::set_handler(move || {
                warn!("interrupt received, finishing the current trial");
                interrupted.store(true, Ordering::SeqCst);
            })
            .context("install Ctrl-C handler")?;

            let path = sweep.run().context("run sweep")?;
            info!(path = %path.display(), rows = sweep.table().len(), "sweep complete");
        }
    }
    Ok(())
}
