//! Filesystem layout of a bench checkout

use std::path::{Path, PathBuf};

use crate::Result;

/// Environment variable that overrides the bench home directory.
pub const HOME_ENV_VAR: &str = "DPDK_BENCH_HOME";

/// Name of the aggregated result table inside the results directory.
pub const RESULTS_FILE_NAME: &str = "dpdk_perf_results.txt";

/// Paths derived from the bench home directory.
///
/// ```text
/// <home>/
///   dpdk/          Pktgen-DPDK/        results/
///   scripts/arp_table                  pcm/build/bin/pcm-pcie
///   neohost/miniconda3/envs/py27/bin/python
///   neohost/sdk/opt/neohost/sdk/get_device_performance_counters.py
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BenchPaths {
    home: PathBuf,
}

impl BenchPaths {
    /// Layout rooted at `home`.
    #[must_use]
    pub fn new(home: impl Into<PathBuf>) -> Self {
        Self { home: home.into() }
    }

    /// Resolve the home directory: explicit override, then
    /// `DPDK_BENCH_HOME`, then the current directory.
    ///
    /// # Errors
    ///
    /// Fails only if the current directory cannot be determined.
    pub fn resolve(explicit: Option<PathBuf>) -> Result<Self> {
        if let Some(home) = explicit {
            return Ok(Self::new(home));
        }
        if let Some(home) = std::env::var_os(HOME_ENV_VAR) {
            return Ok(Self::new(home));
        }
        Ok(Self::new(std::env::current_dir()?))
    }

    /// Bench home directory.
    #[must_use]
    pub fn home(&self) -> &Path {
        &self.home
    }

    /// DPDK source tree.
    #[must_use]
    pub fn dpdk(&self) -> PathBuf {
        self.home.join("dpdk")
    }

    /// Pktgen-DPDK source tree (also the generator's working directory).
    #[must_use]
    pub fn pktgen(&self) -> PathBuf {
        self.home.join("Pktgen-DPDK")
    }

    /// Directory holding raw per-tool logs and the result table.
    #[must_use]
    pub fn results(&self) -> PathBuf {
        self.home.join("results")
    }

    /// The aggregated result table.
    #[must_use]
    pub fn results_file(&self) -> PathBuf {
        self.results().join(RESULTS_FILE_NAME)
    }

    /// l3fwd binary.
    #[must_use]
    pub fn forwarder_binary(&self) -> PathBuf {
        self.dpdk().join("build/examples/dpdk-l3fwd")
    }

    /// pktgen binary.
    #[must_use]
    pub fn generator_binary(&self) -> PathBuf {
        self.pktgen().join("build/app/pktgen")
    }

    /// Static ARP table loaded before every trial.
    #[must_use]
    pub fn arp_table(&self) -> PathBuf {
        self.home.join("scripts/arp_table")
    }

    /// `pcm-pcie` binary.
    #[must_use]
    pub fn pcm_pcie_binary(&self) -> PathBuf {
        self.home.join("pcm/build/bin/pcm-pcie")
    }

    /// Python 2 interpreter used by the NeoHost SDK.
    #[must_use]
    pub fn neohost_python(&self) -> PathBuf {
        self.home.join("neohost/miniconda3/envs/py27/bin/python")
    }

    /// NeoHost SDK counter script.
    #[must_use]
    pub fn neohost_sdk(&self) -> PathBuf {
        self.home
            .join("neohost/sdk/opt/neohost/sdk/get_device_performance_counters.py")
    }

    /// True when both the NeoHost interpreter and SDK script exist.
    #[must_use]
    pub fn neohost_available(&self) -> bool {
        self.neohost_python().exists() && self.neohost_sdk().exists()
    }

    /// `LD_LIBRARY_PATH=...` assignment for launching DPDK binaries.
    #[must_use]
    pub fn library_env(&self) -> String {
        let dpdk = self.dpdk();
        format!(
            "LD_LIBRARY_PATH={}/build/lib:{}/build/lib/x86_64-linux-gnu",
            dpdk.display(),
            dpdk.display()
        )
    }
}
