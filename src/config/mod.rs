//! Configuration resolution
//!
//! Loads the `KEY=value` files under the bench home and turns them into typed,
//! immutable records:
//!
//! - [`BenchPaths`]: filesystem layout
//! - [`ClusterSettings`]: nodes and NIC identities
//! - [`BenchConfig`]: sweep dimensions and profiler settings
//! - [`GeneratorConfig`] / [`ForwarderConfig`]: per-sweep-point launch layouts

pub mod app;
pub mod bench;
pub mod cluster;
pub mod kv;
pub mod paths;

pub use app::{generator_rx_cores, generator_tx_cores, ForwarderConfig, GeneratorConfig};
pub use bench::{
    BenchConfig, PerfEventSource, PerfEventSpec, PerfUnit, ProfilerSettings, SweepMode,
};
pub use cluster::{ClusterSettings, DeviceSpec, MissingValuePolicy};
pub use kv::{ConfigFiles, KeyValueFile};
pub use paths::BenchPaths;

use tracing::debug;

use crate::Result;

/// Fully resolved configuration for one bench home.
#[derive(Debug, Clone)]
pub struct RunConfig {
    /// Filesystem layout
    pub paths: BenchPaths,
    /// Nodes and NICs
    pub cluster: ClusterSettings,
    /// Sweep and profiler settings
    pub bench: BenchConfig,
}

impl RunConfig {
    /// Load `cluster.config`, `config/system.config` and `config/test.config`.
    ///
    /// # Errors
    ///
    /// Returns an error if a file cannot be read or a value is malformed.
    pub fn load(paths: BenchPaths) -> Result<Self> {
        let files = ConfigFiles::load(paths.home())?;
        Self::from_files(paths, &files)
    }

    /// Resolve from already-parsed files.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::InvalidConfig`] for malformed values.
    pub fn from_files(paths: BenchPaths, files: &ConfigFiles) -> Result<Self> {
        let bench = BenchConfig::from_key_values(&files.test)?;
        let cluster = ClusterSettings::from_files(files, bench.missing_value_policy);
        debug!(
            generator = cluster.generator_node(),
            forwarder = ?cluster.forwarder_node(),
            mode = ?bench.sweep_mode,
            "configuration resolved"
        );
        Ok(Self {
            paths,
            cluster,
            bench,
        })
    }

    /// Generator layout for `tx_cores` TX cores.
    ///
    /// # Errors
    ///
    /// See [`GeneratorConfig::resolve`].
    pub fn generator(&self, tx_cores: u32) -> Result<GeneratorConfig> {
        GeneratorConfig::resolve(&self.paths, &self.cluster, tx_cores)
    }

    /// Forwarder layout for `worker_cores` cores.
    ///
    /// # Errors
    ///
    /// See [`ForwarderConfig::resolve`].
    pub fn forwarder(&self, worker_cores: u32) -> Result<ForwarderConfig> {
        ForwarderConfig::resolve(&self.paths, &self.cluster, worker_cores)
    }
}
