//! Shell-style `KEY=value` configuration files

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use tracing::debug;

use crate::{Error, Result};

/// A parsed `KEY=value` file.
///
/// Lines starting with `#` and blank lines are ignored. Each remaining line
/// is split at its first `=`; lines without one are skipped.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KeyValueFile {
    origin: String,
    entries: HashMap<String, String>,
}

impl KeyValueFile {
    /// Parse key=value text. `origin` names the source in error messages.
    #[must_use]
    pub fn parse(origin: impl Into<String>, text: &str) -> Self {
        let mut entries = HashMap::new();
        for line in text.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            if let Some((key, value)) = line.split_once('=') {
                entries.insert(key.trim().to_string(), unquote(value.trim()).to_string());
            }
        }
        Self {
            origin: origin.into(),
            entries,
        }
    }

    /// Load a file from disk. A missing file yields an empty map.
    ///
    /// # Errors
    ///
    /// Returns an IO error if the file exists but cannot be read.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let origin = path.display().to_string();
        if !path.exists() {
            debug!(file = %origin, "config file not found, using defaults");
            return Ok(Self {
                origin,
                entries: HashMap::new(),
            });
        }
        let text = std::fs::read_to_string(path)?;
        Ok(Self::parse(origin, &text))
    }

    /// Where the entries came from.
    #[must_use]
    pub fn origin(&self) -> &str {
        &self.origin
    }

    /// Number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True when no entries were loaded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Raw value for `key`.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries.get(key).map(String::as_str)
    }

    /// Value for `key`, or a [`Error::MissingConfig`] naming this file.
    ///
    /// # Errors
    ///
    /// Fails when the key is absent.
    pub fn require(&self, key: &str) -> Result<&str> {
        self.get(key).ok_or_else(|| Error::MissingConfig {
            key: key.to_string(),
            file: self.origin.clone(),
        })
    }

    /// Parse the value for `key` with [`FromStr`]; `None` when absent.
    ///
    /// # Errors
    ///
    /// Fails with [`Error::InvalidConfig`] when the value does not parse.
    pub fn parse_value<T: FromStr>(&self, key: &str) -> Result<Option<T>> {
        self.get(key)
            .map(|raw| {
                raw.parse::<T>().map_err(|_| Error::InvalidConfig {
                    key: key.to_string(),
                    value: raw.to_string(),
                })
            })
            .transpose()
    }

    /// Parse a boolean flag (`1/0`, `true/false`, `yes/no`, `on/off`).
    ///
    /// # Errors
    ///
    /// Fails with [`Error::InvalidConfig`] for any other spelling.
    pub fn parse_flag(&self, key: &str) -> Result<Option<bool>> {
        self.get(key)
            .map(|raw| match raw.to_ascii_lowercase().as_str() {
                "1" | "true" | "yes" | "on" => Ok(true),
                "0" | "false" | "no" | "off" => Ok(false),
                _ => Err(Error::InvalidConfig {
                    key: key.to_string(),
                    value: raw.to_string(),
                }),
            })
            .transpose()
    }

    /// Parse a comma-separated list, e.g. `1,2,4,8`.
    ///
    /// # Errors
    ///
    /// Fails with [`Error::InvalidConfig`] if any element does not parse.
    pub fn parse_list<T: FromStr>(&self, key: &str) -> Result<Option<Vec<T>>> {
        let Some(raw) = self.get(key) else {
            return Ok(None);
        };
        split_list(raw)
            .map(|item| {
                item.parse::<T>().map_err(|_| Error::InvalidConfig {
                    key: key.to_string(),
                    value: raw.to_string(),
                })
            })
            .collect::<Result<Vec<T>>>()
            .map(Some)
    }
}

/// Split a comma list, dropping empty items and surrounding brackets.
pub(crate) fn split_list(raw: &str) -> impl Iterator<Item = &str> {
    raw.trim_matches(|c| c == '[' || c == ']' || c == '(' || c == ')')
        .split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
}

fn unquote(value: &str) -> &str {
    for quote in ['"', '\''] {
        if value.len() >= 2 && value.starts_with(quote) && value.ends_with(quote) {
            return &value[1..value.len() - 1];
        }
    }
    value
}

/// Location of the three config files under a bench home.
#[derive(Debug, Clone)]
pub struct ConfigFiles {
    /// `cluster.config`: node names
    pub cluster: KeyValueFile,
    /// `config/system.config`: NIC PCI addresses and MACs
    pub system: KeyValueFile,
    /// `config/test.config`: device arguments and sweep overrides
    pub test: KeyValueFile,
}

impl ConfigFiles {
    /// Load all three files relative to `home`.
    ///
    /// # Errors
    ///
    /// Returns an IO error if an existing file cannot be read.
    pub fn load(home: &Path) -> Result<Self> {
        Ok(Self {
            cluster: KeyValueFile::load(cluster_config_path(home))?,
            system: KeyValueFile::load(home.join("config").join("system.config"))?,
            test: KeyValueFile::load(home.join("config").join("test.config"))?,
        })
    }
}

fn cluster_config_path(home: &Path) -> PathBuf {
    home.join("cluster.config")
}
