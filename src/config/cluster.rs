//! Cluster topology and NIC identity

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::kv::ConfigFiles;
use crate::{Error, Result};

/// Default generator node name.
pub const DEFAULT_GENERATOR_NODE: &str = "node7";
/// Default forwarder node name.
pub const DEFAULT_FORWARDER_NODE: &str = "node8";
/// Remote login when neither `SSH_USER` nor `$USER` is set.
pub const DEFAULT_SSH_USER: &str = "root";
/// `txqs_min_inline` reported when the device arguments do not set it.
pub const DEFAULT_TXQS_MIN_INLINE: u32 = 8;

/// What to do when a PCI address or device-argument string is absent.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MissingValuePolicy {
    /// Fail with [`Error::MissingConfig`].
    #[default]
    Require,
    /// Substitute an empty string.
    Empty,
}

impl FromStr for MissingValuePolicy {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "require" | "required" => Ok(Self::Require),
            "empty" => Ok(Self::Empty),
            other => Err(Error::InvalidConfig {
                key: "MISSING_VALUE_POLICY".to_string(),
                value: other.to_string(),
            }),
        }
    }
}

/// NIC identity handed to EAL's `-a` allow-list option.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceSpec {
    /// PCI address, e.g. `0000:31:00.1`
    pub pci_address: String,
    /// Driver arguments, e.g. `txqs_min_inline=0`
    pub devargs: String,
}

impl DeviceSpec {
    /// Create a device spec.
    #[must_use]
    pub fn new(pci_address: impl Into<String>, devargs: impl Into<String>) -> Self {
        Self {
            pci_address: pci_address.into(),
            devargs: devargs.into(),
        }
    }

    /// The `pci,devargs` allow-list argument (`pci` alone without devargs).
    #[must_use]
    pub fn allow_arg(&self) -> String {
        if self.devargs.is_empty() {
            self.pci_address.clone()
        } else {
            format!("{},{}", self.pci_address, self.devargs)
        }
    }

    /// `txqs_min_inline` from the device arguments, 8 when absent.
    #[must_use]
    pub fn txqs_min_inline(&self) -> u32 {
        const KEY: &str = "txqs_min_inline=";
        self.devargs
            .find(KEY)
            .map(|at| &self.devargs[at + KEY.len()..])
            .and_then(|rest| {
                let end = rest
                    .find(|c: char| !c.is_ascii_digit())
                    .unwrap_or(rest.len());
                rest[..end].parse().ok()
            })
            .unwrap_or(DEFAULT_TXQS_MIN_INLINE)
    }
}

impl fmt::Display for DeviceSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.allow_arg())
    }
}

/// Node names and NIC identities for one generator/forwarder pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClusterSettings {
    generator_node: String,
    forwarder_node: Option<String>,
    ssh_user: String,
    generator_mac: Option<String>,
    generator_pci: Option<String>,
    forwarder_pci: Option<String>,
    generator_devargs: Option<String>,
    forwarder_devargs: Option<String>,
    policy: MissingValuePolicy,
    system_origin: String,
    test_origin: String,
}

impl ClusterSettings {
    /// Read cluster, system, and test settings.
    ///
    /// Nothing is required at this point; each accessor applies the
    /// missing-value policy when an application actually needs the value.
    #[must_use]
    pub fn from_files(files: &ConfigFiles, policy: MissingValuePolicy) -> Self {
        let owned = |v: Option<&str>| v.map(str::to_string);
        let forwarder_node = match files.cluster.get("L3FWD_NODE") {
            Some("") => None,
            Some(node) => Some(node.to_string()),
            None => Some(DEFAULT_FORWARDER_NODE.to_string()),
        };
        Self {
            generator_node: files
                .cluster
                .get("PKTGEN_NODE")
                .filter(|node| !node.is_empty())
                .unwrap_or(DEFAULT_GENERATOR_NODE)
                .to_string(),
            forwarder_node,
            ssh_user: files
                .cluster
                .get("SSH_USER")
                .filter(|user| !user.is_empty())
                .map(str::to_string)
                .or_else(|| std::env::var("USER").ok())
                .unwrap_or_else(|| DEFAULT_SSH_USER.to_string()),
            generator_mac: owned(files.system.get("PKTGEN_NIC_MAC")),
            generator_pci: owned(files.system.get("PKTGEN_NIC_PCI")),
            forwarder_pci: owned(files.system.get("L3FWD_NIC_PCI")),
            generator_devargs: owned(files.test.get("PKTGEN_NIC_DEVARGS")),
            forwarder_devargs: owned(files.test.get("L3FWD_NIC_DEVARGS")),
            policy,
            system_origin: files.system.origin().to_string(),
            test_origin: files.test.origin().to_string(),
        }
    }

    /// Node that runs the generator (this host).
    #[must_use]
    pub fn generator_node(&self) -> &str {
        &self.generator_node
    }

    /// Node that runs the forwarder; `None` when disabled.
    #[must_use]
    pub fn forwarder_node(&self) -> Option<&str> {
        self.forwarder_node.as_deref()
    }

    /// Login for shells on the forwarder node.
    #[must_use]
    pub fn ssh_user(&self) -> &str {
        &self.ssh_user
    }

    /// True when the forwarder runs on a different node than the generator.
    #[must_use]
    pub fn forwarder_is_remote(&self) -> bool {
        self.forwarder_node
            .as_deref()
            .is_some_and(|node| node != self.generator_node)
    }

    /// Active missing-value policy.
    #[must_use]
    pub const fn policy(&self) -> MissingValuePolicy {
        self.policy
    }

    /// Generator NIC.
    ///
    /// # Errors
    ///
    /// Under [`MissingValuePolicy::Require`], fails when the PCI address or
    /// device arguments are absent.
    pub fn generator_device(&self) -> Result<DeviceSpec> {
        Ok(DeviceSpec::new(
            self.resolve(self.generator_pci.as_deref(), "PKTGEN_NIC_PCI", &self.system_origin)?,
            self.resolve(self.generator_devargs.as_deref(), "PKTGEN_NIC_DEVARGS", &self.test_origin)?,
        ))
    }

    /// Forwarder NIC.
    ///
    /// # Errors
    ///
    /// Same policy as [`Self::generator_device`].
    pub fn forwarder_device(&self) -> Result<DeviceSpec> {
        Ok(DeviceSpec::new(
            self.resolve(self.forwarder_pci.as_deref(), "L3FWD_NIC_PCI", &self.system_origin)?,
            self.resolve(self.forwarder_devargs.as_deref(), "L3FWD_NIC_DEVARGS", &self.test_origin)?,
        ))
    }

    /// Destination MAC for forwarded packets: the generator NIC.
    ///
    /// # Errors
    ///
    /// Same policy as [`Self::generator_device`].
    pub fn forwarder_eth_dest(&self) -> Result<String> {
        self.resolve(self.generator_mac.as_deref(), "PKTGEN_NIC_MAC", &self.system_origin)
    }

    fn resolve(&self, value: Option<&str>, key: &str, file: &str) -> Result<String> {
        match (value, self.policy) {
            (Some(v), _) => Ok(v.to_string()),
            (None, MissingValuePolicy::Empty) => Ok(String::new()),
            (None, MissingValuePolicy::Require) => Err(Error::MissingConfig {
                key: key.to_string(),
                file: file.to_string(),
            }),
        }
    }
}
