//! Trial identifiers and per-tool log names

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use chrono::{Local, NaiveDateTime};
use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// `strftime` layout of a trial id, e.g. `20250114-153012.048213`.
pub const TRIAL_ID_FORMAT: &str = "%Y%m%d-%H%M%S%.6f";

/// Timestamp naming every log of one trial.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TrialId(String);

impl TrialId {
    /// Id for the current local time.
    #[must_use]
    pub fn now() -> Self {
        Self(Local::now().format(TRIAL_ID_FORMAT).to_string())
    }

    /// A fresh id guaranteed to differ from `previous`.
    #[must_use]
    pub fn after(previous: Option<&Self>) -> Self {
        loop {
            let id = Self::now();
            if previous != Some(&id) {
                return id;
            }
            std::thread::yield_now();
        }
    }

    /// The id as written in file names and the result table.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// File name of this trial's log for `kind`.
    #[must_use]
    pub fn log_file_name(&self, kind: LogKind) -> String {
        format!("{}.{}", self.0, kind.suffix())
    }

    /// Path of this trial's log for `kind` under `dir`.
    #[must_use]
    pub fn log_path(&self, dir: &Path, kind: LogKind) -> PathBuf {
        dir.join(self.log_file_name(kind))
    }
}

impl FromStr for TrialId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let has_micros = s
            .split_once('.')
            .is_some_and(|(_, frac)| frac.len() == 6 && frac.bytes().all(|b| b.is_ascii_digit()));
        if !has_micros {
            return Err(Error::InvalidInput(format!(
                "not a trial id: {s:?} (expected YYYYMMDD-HHMMSS.ffffff)"
            )));
        }
        NaiveDateTime::parse_from_str(s, TRIAL_ID_FORMAT)
            .map(|_| Self(s.to_string()))
            .map_err(|e| Error::InvalidInput(format!("not a trial id: {s:?} ({e})")))
    }
}

impl fmt::Display for TrialId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Which tool produced a log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum LogKind {
    /// Forwarder stdout/stderr
    L3fwd,
    /// Generator stdout/stderr
    Pktgen,
    /// `perf stat` interval output
    Perf,
    /// `pcm-pcie` output
    PcmPcie,
    /// NeoHost analysis output with ANSI codes stripped
    Neohost,
}

impl LogKind {
    /// All kinds, in extraction order.
    pub const ALL: [Self; 5] = [
        Self::L3fwd,
        Self::Pktgen,
        Self::Perf,
        Self::PcmPcie,
        Self::Neohost,
    ];

    /// File suffix after the trial id.
    #[must_use]
    pub const fn suffix(self) -> &'static str {
        match self {
            Self::L3fwd => "l3fwd",
            Self::Pktgen => "pktgen",
            Self::Perf => "perf",
            Self::PcmPcie => "pcm-pcie",
            Self::Neohost => "neohost",
        }
    }
}

impl fmt::Display for LogKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.suffix())
    }
}
