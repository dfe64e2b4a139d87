//! Per-application launch configuration
//!
//! Both records are built fresh for each sweep point and never mutated.
//!
//! ```text
//! l3fwd  (N workers):  core 0 control | cores 1..=N  one RX/TX queue each
//! pktgen (T TX cores): core 0 control | core 1 RX    | cores 2..=1+T TX
//! ```

use std::ops::RangeInclusive;
use std::path::PathBuf;

use super::cluster::{ClusterSettings, DeviceSpec};
use super::paths::BenchPaths;
use crate::{Error, Result};

/// Memory channels passed to EAL (`-n`).
pub const MEMORY_CHANNELS: u32 = 4;

/// RX core of every generator layout.
#[must_use]
pub const fn generator_rx_cores() -> RangeInclusive<u32> {
    1..=1
}

/// TX cores of a generator with `tx_cores` TX cores.
#[must_use]
pub const fn generator_tx_cores(tx_cores: u32) -> RangeInclusive<u32> {
    2..=1 + tx_cores
}

/// l3fwd launch parameters for a given worker-core count.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ForwarderConfig {
    /// Path to `dpdk-l3fwd`
    pub binary: PathBuf,
    /// Node the forwarder runs on
    pub host: String,
    /// Number of forwarding cores (N)
    pub worker_cores: u32,
    /// Forwarder NIC
    pub device: DeviceSpec,
    /// MAC address forwarded packets are sent to
    pub eth_dest: String,
    /// EAL memory channels
    pub memory_channels: u32,
    /// Enabled port mask
    pub port_mask: &'static str,
}

impl ForwarderConfig {
    /// Build the forwarder layout for `worker_cores` cores.
    ///
    /// # Errors
    ///
    /// Fails with [`Error::InvalidInput`] for zero cores or when the
    /// forwarder is disabled, and propagates missing NIC settings.
    pub fn resolve(
        paths: &BenchPaths,
        cluster: &ClusterSettings,
        worker_cores: u32,
    ) -> Result<Self> {
        if worker_cores == 0 {
            return Err(Error::InvalidInput(
                "l3fwd needs at least one worker core".to_string(),
            ));
        }
        let host = cluster
            .forwarder_node()
            .ok_or_else(|| Error::InvalidInput("forwarder node is disabled".to_string()))?;
        Ok(Self {
            binary: paths.forwarder_binary(),
            host: host.to_string(),
            worker_cores,
            device: cluster.forwarder_device()?,
            eth_dest: cluster.forwarder_eth_dest()?,
            memory_channels: MEMORY_CHANNELS,
            port_mask: "0x1",
        })
    }

    /// EAL core list, `0-N`.
    #[must_use]
    pub fn core_list(&self) -> String {
        format!("0-{}", self.worker_cores)
    }

    /// Cores doing forwarding work.
    #[must_use]
    pub const fn worker_core_ids(&self) -> RangeInclusive<u32> {
        1..=self.worker_cores
    }

    /// `--config` bindings: `(port,queue,core)` per worker, queue = core - 1.
    #[must_use]
    pub fn queue_bindings(&self) -> String {
        self.worker_core_ids()
            .map(|core| format!("(0,{},{core})", core - 1))
            .collect::<Vec<_>>()
            .join(",")
    }
}

/// pktgen launch parameters for a given TX-core count.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratorConfig {
    /// Path to the `pktgen` binary
    pub binary: PathBuf,
    /// Directory pktgen is started from (resolves the Lua script)
    pub working_dir: PathBuf,
    /// Number of TX cores (T)
    pub tx_cores: u32,
    /// Generator NIC
    pub device: DeviceSpec,
    /// EAL memory channels
    pub memory_channels: u32,
    /// EAL process type
    pub proc_type: &'static str,
    /// Hugepage file prefix
    pub file_prefix: &'static str,
    /// Extra pktgen flags (`-P` promiscuous, `-T` themed output)
    pub app_args: &'static str,
    /// Lua script relative to `working_dir`
    pub script_file: &'static str,
}

impl GeneratorConfig {
    /// Build the generator layout for `tx_cores` TX cores.
    ///
    /// # Errors
    ///
    /// Fails with [`Error::InvalidInput`] for zero cores and propagates
    /// missing NIC settings.
    pub fn resolve(paths: &BenchPaths, cluster: &ClusterSettings, tx_cores: u32) -> Result<Self> {
        if tx_cores == 0 {
            return Err(Error::InvalidInput(
                "pktgen needs at least one TX core".to_string(),
            ));
        }
        Ok(Self {
            binary: paths.generator_binary(),
            working_dir: paths.pktgen(),
            tx_cores,
            device: cluster.generator_device()?,
            memory_channels: MEMORY_CHANNELS,
            proc_type: "auto",
            file_prefix: "pktgen1",
            app_args: "-P -T",
            script_file: "scripts/simple-tx-test.lua",
        })
    }

    /// EAL core list, `0-(1+T)`.
    #[must_use]
    pub fn core_list(&self) -> String {
        format!("0-{}", 1 + self.tx_cores)
    }

    /// The single RX core.
    #[must_use]
    pub const fn rx_core_ids(&self) -> RangeInclusive<u32> {
        generator_rx_cores()
    }

    /// TX cores, 2 through 1+T.
    #[must_use]
    pub const fn tx_core_ids(&self) -> RangeInclusive<u32> {
        generator_tx_cores(self.tx_cores)
    }

    /// `-m` port map: `[1:2].0` for one TX core, else `[1:2-(1+T)].0`.
    #[must_use]
    pub fn port_map(&self) -> String {
        if self.tx_cores == 1 {
            "[1:2].0".to_string()
        } else {
            format!("[1:2-{}].0", 1 + self.tx_cores)
        }
    }
}
