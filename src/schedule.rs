//! Profiling phase schedule
//!
//! One profiled trial runs the generator in the background while the
//! profilers take turns:
//!
//! ```text
//! |-- warmup --|-- perf --|- interval -|-- pcm --|- interval -|-- neohost --|- trailing -|
//! |<------------------------------ generator duration ---------------------------------->|
//! ```
//!
//! Disabled profilers drop out together with their leading interval. The
//! generator is told to run for [`PhaseSchedule::total`] seconds so it outlives
//! the whole chain.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::config::ProfilerSettings;

/// Kind of a scheduled phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PhaseKind {
    /// Traffic ramp-up before any profiler starts
    Warmup,
    /// `perf stat`
    Perf,
    /// Gap between two profilers
    Interval,
    /// `pcm-pcie`
    Pcm,
    /// NeoHost SDK
    Neohost,
    /// Buffer after the last profiler
    Trailing,
}

impl PhaseKind {
    /// Short lowercase name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Warmup => "warmup",
            Self::Perf => "perf",
            Self::Interval => "interval",
            Self::Pcm => "pcm",
            Self::Neohost => "neohost",
            Self::Trailing => "trailing",
        }
    }

    /// True for phases that run a profiler.
    #[must_use]
    pub const fn is_profiler(self) -> bool {
        matches!(self, Self::Perf | Self::Pcm | Self::Neohost)
    }
}

impl fmt::Display for PhaseKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A named phase and its length in seconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Phase {
    /// What happens during the phase
    pub kind: PhaseKind,
    /// Length in seconds
    pub seconds: u64,
}

/// Ordered phases of one profiled trial; computed once per sweep.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhaseSchedule {
    phases: Vec<Phase>,
}

impl PhaseSchedule {
    /// Build the schedule from profiler settings.
    ///
    /// `neohost_available` gates the NeoHost phase on the SDK being installed.
    #[must_use]
    pub fn new(settings: &ProfilerSettings, neohost_available: bool) -> Self {
        let mut phases = vec![Phase {
            kind: PhaseKind::Warmup,
            seconds: settings.warmup_delay,
        }];
        let interval = Phase {
            kind: PhaseKind::Interval,
            seconds: settings.tool_interval,
        };

        if settings.enable_perf {
            phases.push(Phase {
                kind: PhaseKind::Perf,
                seconds: settings.perf_duration,
            });
        }
        if settings.enable_pcm {
            phases.push(interval);
            phases.push(Phase {
                kind: PhaseKind::Pcm,
                seconds: settings.pcm_duration,
            });
        }
        if settings.enable_neohost && neohost_available {
            phases.push(interval);
            phases.push(Phase {
                kind: PhaseKind::Neohost,
                seconds: settings.neohost_duration,
            });
        }
        phases.push(Phase {
            kind: PhaseKind::Trailing,
            seconds: settings.tool_interval,
        });

        Self { phases }
    }

    /// Phases in execution order.
    #[must_use]
    pub fn phases(&self) -> &[Phase] {
        &self.phases
    }

    /// Sum of all phase lengths: the generator run length.
    #[must_use]
    pub fn total(&self) -> u64 {
        self.phases.iter().map(|p| p.seconds).sum()
    }

    /// True if a phase of `kind` is scheduled.
    #[must_use]
    pub fn includes(&self, kind: PhaseKind) -> bool {
        self.phases.iter().any(|p| p.kind == kind)
    }

    /// Profilers that will run, in order.
    pub fn profilers(&self) -> impl Iterator<Item = PhaseKind> + '_ {
        self.phases
            .iter()
            .map(|p| p.kind)
            .filter(|kind| kind.is_profiler())
    }
}
