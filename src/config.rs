//! Configuration types for the beat-rate pipeline.

use crate::{
    dsp::Smoother,
    error::{Error, Result},
    types::mean,
};

/// Default minimum spacing between peaks, in samples
const MIN_DISTANCE: usize = 10;

/// Frame rate of the usual calcium-imaging acquisitions (frames per second)
pub const DEFAULT_FRAME_RATE: f64 = 25.0;

/// Minimum value a smoothed sample must reach to count as a peak.
#[derive(Clone, Debug, Copy, PartialEq)]
pub enum HeightThreshold {
    /// A fixed amplitude.
    Absolute(f64),
    /// The mean of the smoothed signal being analysed.
    SignalMean,
}

impl HeightThreshold {
    /// Resolves the threshold against a smoothed signal.
    pub fn resolve(&self, smoothed: &[f64]) -> f64 {
        match *self {
            HeightThreshold::Absolute(height) => height,
            HeightThreshold::SignalMean => mean(smoothed),
        }
    }
}

/// Configuration for the beat-rate pipeline.
///
/// Unset thresholds impose no constraint. Use the builder pattern to
/// customize parameters:
///
/// # Example
///
/// ```
/// use cardio_bpm::{AnalyzerConfig, HeightThreshold, dsp::Smoother};
///
/// let config = AnalyzerConfig::builder()
///     .smoother(Smoother::savgol(11, 3))
///     .min_height(HeightThreshold::SignalMean)
///     .min_distance(10)
///     .build();
/// assert!(config.validate().is_ok());
/// ```
#[derive(Clone, Debug, Copy, PartialEq, bon::Builder)]
pub struct AnalyzerConfig {
    /// Smoother applied before detection (default: Savitzky-Golay, 11 samples, order 3)
    #[builder(default)]
    smoother: Smoother,
    /// Minimum peak height (default: none)
    min_height: Option<HeightThreshold>,
    /// Minimum spacing between peaks in samples (default: 10)
    #[builder(default = MIN_DISTANCE)]
    min_distance: usize,
    /// Minimum peak prominence (default: none)
    min_prominence: Option<f64>,
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        Self::builder().build()
    }
}

impl AnalyzerConfig {
    /// Preset used for 25 fps Fiji exports: Savitzky-Golay (11, 3), peaks above
    /// the trace mean, at least 10 frames apart.
    pub fn fiji_trace() -> Self {
        Self::builder()
            .smoother(Smoother::savgol(11, 3))
            .min_height(HeightThreshold::SignalMean)
            .min_distance(MIN_DISTANCE)
            .build()
    }

    /// Returns a copy of this configuration using a different smoother.
    pub fn with_smoother(mut self, smoother: Smoother) -> Self {
        self.smoother = smoother;
        self
    }

    /// Returns the smoother setting.
    pub fn smoother(&self) -> Smoother {
        self.smoother
    }

    /// Returns the minimum peak height setting.
    pub fn min_height(&self) -> Option<HeightThreshold> {
        self.min_height
    }

    /// Returns the minimum peak spacing setting.
    pub fn min_distance(&self) -> usize {
        self.min_distance
    }

    /// Returns the minimum peak prominence setting.
    pub fn min_prominence(&self) -> Option<f64> {
        self.min_prominence
    }

    /// Validates the configuration and returns an error if invalid.
    pub fn validate(&self) -> Result<()> {
        self.smoother.validate()?;
        if self.min_distance == 0 {
            return Err(Error::invalid("min_distance must be at least 1"));
        }
        if let Some(HeightThreshold::Absolute(height)) = self.min_height
            && height.is_nan()
        {
            return Err(Error::invalid("min_height must be a number"));
        }
        if self.min_prominence.is_some_and(f64::is_nan) {
            return Err(Error::invalid("min_prominence must be a number"));
        }
        Ok(())
    }
}
