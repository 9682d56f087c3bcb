//! Core value types flowing through the pipeline.

use itertools::{Itertools, MinMaxResult};

use crate::error::{Error, Result};

/// Rejects sampling intervals that cannot scale an index difference into seconds.
pub(crate) fn check_sample_interval(sample_interval: f64) -> Result<()> {
    if !sample_interval.is_finite() || sample_interval <= 0.0 {
        return Err(Error::invalid(format!(
            "sample_interval must be positive and finite, got {sample_interval}"
        )));
    }
    Ok(())
}

/// A raw contraction trace together with its sampling interval.
///
/// The samples are validated once on construction and never mutated afterwards.
#[derive(Debug, Clone, PartialEq)]
pub struct Signal {
    samples: Vec<f64>,
    /// Seconds between consecutive samples
    sample_interval: f64,
}

impl Signal {
    /// Creates a signal from samples spaced `sample_interval` seconds apart.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidParameter`] if the sample sequence is empty,
    /// contains a non-finite value, or the interval is not positive.
    pub fn new(samples: Vec<f64>, sample_interval: f64) -> Result<Self> {
        check_sample_interval(sample_interval)?;
        if samples.is_empty() {
            return Err(Error::invalid("signal must contain at least one sample"));
        }
        if let Some(position) = samples.iter().position(|s| !s.is_finite()) {
            return Err(Error::invalid(format!(
                "sample {position} is not a finite number"
            )));
        }
        Ok(Self {
            samples,
            sample_interval,
        })
    }

    /// Creates a signal from samples acquired at `sample_rate` Hz (frames per second).
    pub fn from_rate(samples: Vec<f64>, sample_rate: f64) -> Result<Self> {
        if !sample_rate.is_finite() || sample_rate <= 0.0 {
            return Err(Error::invalid(format!(
                "sample_rate must be positive and finite, got {sample_rate}"
            )));
        }
        Self::new(samples, sample_rate.recip())
    }

    pub fn samples(&self) -> &[f64] {
        &self.samples
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn sample_interval(&self) -> f64 {
        self.sample_interval
    }

    pub fn sample_rate(&self) -> f64 {
        self.sample_interval.recip()
    }

    /// Total recording length in seconds.
    pub fn duration(&self) -> f64 {
        self.samples.len() as f64 * self.sample_interval
    }

    /// Time in seconds of the sample at `index`.
    pub fn time_of(&self, index: usize) -> f64 {
        index as f64 * self.sample_interval
    }

    /// Mean amplitude of the trace.
    pub fn mean(&self) -> f64 {
        mean(&self.samples)
    }
}

pub(crate) fn mean(values: &[f64]) -> f64 {
    values.iter().sum::<f64>() / values.len() as f64
}

/// A single detected contraction.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Beat {
    /// Index of the peak in the smoothed signal
    pub index: usize,
    /// Time of the peak in seconds from the start of the trace
    pub time_seconds: f64,
    /// Smoothed amplitude at the peak
    pub amplitude: f64,
}

impl Beat {
    pub fn new(index: usize, time_seconds: f64, amplitude: f64) -> Self {
        Self {
            index,
            time_seconds,
            amplitude,
        }
    }
}

/// Prominence of a peak and the bases it was measured against.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PeakProminence {
    pub prominence: f64,
    /// Index of the lowest sample between the peak and the next higher sample on the left
    pub left_base: usize,
    /// Index of the lowest sample between the peak and the next higher sample on the right
    pub right_base: usize,
}

/// Rate derived from a peak set.
#[derive(Debug, Clone, PartialEq)]
pub struct RateEstimate {
    /// Beats per minute, `60 / mean(intervals)`
    pub bpm: f64,
    /// Inter-beat intervals in seconds
    pub intervals: Vec<f64>,
    /// Number of peaks the estimate was derived from
    pub n_beats: usize,
}

impl RateEstimate {
    /// Summary statistics of the inter-beat intervals.
    pub fn stats(&self) -> IntervalStats {
        IntervalStats::from_intervals(&self.intervals)
    }

    /// Instantaneous rate of each interval, in beats per minute.
    pub fn instantaneous_bpm(&self) -> Vec<f64> {
        self.intervals.iter().map(|interval| 60.0 / interval).collect()
    }
}

/// Summary statistics over a non-empty interval sequence.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IntervalStats {
    pub mean: f64,
    /// Sample standard deviation (zero for a single interval)
    pub std_dev: f64,
    pub min: f64,
    pub max: f64,
}

impl IntervalStats {
    pub(crate) fn from_intervals(intervals: &[f64]) -> Self {
        let mean = mean(intervals);
        let std_dev = if intervals.len() > 1 {
            let sum_sq = intervals.iter().map(|i| (i - mean).powi(2)).sum::<f64>();
            (sum_sq / (intervals.len() - 1) as f64).sqrt()
        } else {
            0.0
        };
        let (min, max) = match intervals.iter().copied().minmax() {
            MinMaxResult::NoElements => (f64::NAN, f64::NAN),
            MinMaxResult::OneElement(only) => (only, only),
            MinMaxResult::MinMax(min, max) => (min, max),
        };
        Self {
            mean,
            std_dev,
            min,
            max,
        }
    }

    /// Coefficient of variation, `std_dev / mean`.
    pub fn coefficient_of_variation(&self) -> f64 {
        self.std_dev / self.mean
    }
}
