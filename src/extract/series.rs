//! Sample series with warm-up discard

/// Leading samples dropped before averaging.
pub const WARMUP_SAMPLES: usize = 2;

/// One `(timestamp, value)` sample.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sample {
    /// Seconds since the tool started, or the sample index when the tool
    /// prints no timestamp
    pub at: f64,
    /// Sampled value
    pub value: f64,
}

/// Ordered samples of one counter.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SampleSeries {
    samples: Vec<Sample>,
}

impl SampleSeries {
    /// Empty series.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            samples: Vec::new(),
        }
    }

    /// Append a timestamped sample.
    pub fn push(&mut self, at: f64, value: f64) {
        self.samples.push(Sample { at, value });
    }

    /// Append a sample stamped with its position.
    #[allow(clippy::cast_precision_loss)]
    pub fn push_indexed(&mut self, value: f64) {
        let at = self.samples.len() as f64;
        self.push(at, value);
    }

    /// Number of samples.
    #[must_use]
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    /// True when empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Samples in insertion order.
    #[must_use]
    pub fn samples(&self) -> &[Sample] {
        &self.samples
    }

    /// Samples that survive the warm-up discard.
    #[must_use]
    pub fn steady(&self) -> &[Sample] {
        if self.samples.len() > WARMUP_SAMPLES {
            &self.samples[WARMUP_SAMPLES..]
        } else {
            &self.samples
        }
    }

    /// Mean after dropping the first [`WARMUP_SAMPLES`] samples.
    ///
    /// A series of at most [`WARMUP_SAMPLES`] is averaged whole; an empty
    /// series averages to 0.
    #[must_use]
    pub fn warmup_mean(&self) -> f64 {
        mean(self.steady().iter().map(|s| s.value))
    }
}

impl FromIterator<f64> for SampleSeries {
    fn from_iter<I: IntoIterator<Item = f64>>(iter: I) -> Self {
        let mut series = Self::new();
        for value in iter {
            series.push_indexed(value);
        }
        series
    }
}

/// Arithmetic mean; 0 for no values.
#[allow(clippy::cast_precision_loss)]
pub fn mean<I: IntoIterator<Item = f64>>(values: I) -> f64 {
    let (sum, n) = values
        .into_iter()
        .fold((0.0, 0usize), |(sum, n), v| (sum + v, n + 1));
    if n == 0 {
        0.0
    } else {
        sum / n as f64
    }
}

/// Round half away from zero to `decimals` places.
#[must_use]
pub fn round_to(value: f64, decimals: i32) -> f64 {
    let scale = 10f64.powi(decimals);
    (value * scale).round() / scale
}
