//! Core beat-rate analysis pipeline.

use crate::{
    config::AnalyzerConfig,
    error::Result,
    peaks::{self, detect_peaks},
    rate,
    types::{Beat, PeakProminence, RateEstimate, Signal},
};

/// One pipeline invocation: the raw trace, the configuration it ran with,
/// and everything derived from them.
///
/// Smoothing and peak detection results stay available even when no rate
/// can be derived from the peaks.
#[derive(Debug, Clone)]
pub struct Analysis {
    signal: Signal,
    config: AnalyzerConfig,
    smoothed: Vec<f64>,
    /// Height threshold after resolving it against the smoothed trace
    min_height: Option<f64>,
    peaks: Vec<usize>,
}

/// Smooths a trace and detects its contraction peaks.
///
/// This function:
/// 1. Validates the configuration
/// 2. Applies the configured smoother
/// 3. Resolves the height threshold against the smoothed trace
/// 4. Detects peaks subject to the height, prominence and spacing limits
///
/// # Errors
///
/// Returns [`Error::InvalidParameter`](crate::Error::InvalidParameter) if the
/// configuration is invalid or the smoother's window does not fit the trace.
/// Nothing is computed in that case.
///
/// # Example
///
/// ```
/// use cardio_bpm::{AnalyzerConfig, Signal, analyze};
///
/// let raw = (0..250)
///     .map(|i| (2.0 * std::f64::consts::PI * i as f64 / 25.0).sin())
///     .collect::<Vec<_>>();
/// let signal = Signal::from_rate(raw, 25.0)?;
///
/// let analysis = analyze(signal, AnalyzerConfig::fiji_trace())?;
/// let estimate = analysis.rate()?;
/// assert!((estimate.bpm - 60.0).abs() < 1.0);
/// # Ok::<(), cardio_bpm::Error>(())
/// ```
pub fn analyze(signal: Signal, config: AnalyzerConfig) -> Result<Analysis> {
    config.validate()?;

    let smoother = config.smoother();
    let smoothed = smoother.apply(signal.samples())?;

    let min_height = config.min_height().map(|height| height.resolve(&smoothed));

    let peaks = detect_peaks(
        &smoothed,
        min_height,
        config.min_distance(),
        config.min_prominence(),
    )?;

    tracing::info!(
        "Detected {} peaks in {} samples using {} smoothing",
        peaks.len(),
        signal.len(),
        smoother.name()
    );

    Ok(Analysis {
        signal,
        config,
        smoothed,
        min_height,
        peaks,
    })
}

impl Analysis {
    /// Returns the raw trace.
    pub fn signal(&self) -> &Signal {
        &self.signal
    }

    /// Returns the configuration this analysis ran with.
    pub fn config(&self) -> &AnalyzerConfig {
        &self.config
    }

    /// Returns the smoothed trace, index-aligned with the raw samples.
    pub fn smoothed(&self) -> &[f64] {
        &self.smoothed
    }

    /// Returns the resolved height threshold, if one was configured.
    pub fn min_height(&self) -> Option<f64> {
        self.min_height
    }

    /// Returns the detected peak indices in ascending order.
    pub fn peaks(&self) -> &[usize] {
        &self.peaks
    }

    /// Returns each peak with its time and smoothed amplitude.
    pub fn beats(&self) -> Vec<Beat> {
        self.peaks
            .iter()
            .map(|&index| Beat::new(index, self.signal.time_of(index), self.smoothed[index]))
            .collect()
    }

    /// Returns the prominence of each detected peak, measured on the smoothed trace.
    pub fn prominences(&self) -> Result<Vec<PeakProminence>> {
        peaks::peak_prominences(&self.smoothed, &self.peaks)
    }

    /// Derives intervals and beats per minute from the detected peaks.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InsufficientPeaks`](crate::Error::InsufficientPeaks)
    /// when fewer than two peaks were found.
    pub fn rate(&self) -> Result<RateEstimate> {
        rate::estimate_bpm(&self.peaks, self.signal.sample_interval())
    }

    /// Peaks per minute over the whole recording.
    pub fn count_rate(&self) -> Result<f64> {
        rate::count_rate(
            self.peaks.len(),
            self.signal.len(),
            self.signal.sample_interval(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{HeightThreshold, dsp::Smoother, error::Error};

    fn pulse_train(period: usize, beats: usize) -> Vec<f64> {
        (0..period * beats)
            .map(|i| if i % period == period / 2 { 1.0 } else { 0.0 })
            .collect()
    }

    #[test]
    fn test_pulse_train_rate() {
        let signal = Signal::new(pulse_train(20, 6), 0.05).unwrap();
        let config = AnalyzerConfig::builder()
            .smoother(Smoother::Identity)
            .min_distance(5)
            .build();
        let analysis = analyze(signal, config).unwrap();
        assert_eq!(analysis.peaks(), &[10, 30, 50, 70, 90, 110]);

        // 20 samples * 0.05 s = 1 s per beat
        let estimate = analysis.rate().unwrap();
        assert!((estimate.bpm - 60.0).abs() < 1e-9);
        assert_eq!(estimate.n_beats, 6);

        let beats = analysis.beats();
        assert!((beats[1].time_seconds - 1.5).abs() < 1e-12);
        assert_eq!(beats[1].amplitude, 1.0);
    }

    #[test]
    fn test_insufficient_peaks_keeps_partial_results() {
        let signal = Signal::new(vec![0.0, 0.0, 1.0, 0.0, 0.0], 1.0).unwrap();
        let config = AnalyzerConfig::builder()
            .smoother(Smoother::Identity)
            .min_distance(1)
            .build();
        let analysis = analyze(signal, config).unwrap();
        assert_eq!(analysis.peaks(), &[2]);
        assert_eq!(analysis.smoothed().len(), 5);
        assert!(matches!(
            analysis.rate(),
            Err(Error::InsufficientPeaks { found: 1 })
        ));
        assert!(analysis.count_rate().unwrap() > 0.0);
    }

    #[test]
    fn test_mean_height_threshold_is_resolved() {
        let signal = Signal::new(vec![0.0, 4.0, 0.0, 1.0, 0.0, 4.0, 0.0], 1.0).unwrap();
        let config = AnalyzerConfig::builder()
            .smoother(Smoother::Identity)
            .min_height(HeightThreshold::SignalMean)
            .min_distance(1)
            .build();
        let analysis = analyze(signal, config).unwrap();
        assert!((analysis.min_height().unwrap() - 9.0 / 7.0).abs() < 1e-12);
        assert_eq!(analysis.peaks(), &[1, 5]);
    }

    #[test]
    fn test_invalid_window_fails_eagerly() {
        let signal = Signal::new(vec![1.0, 2.0, 3.0], 1.0).unwrap();
        let config = AnalyzerConfig::builder()
            .smoother(Smoother::savgol(11, 3))
            .build();
        assert!(matches!(
            analyze(signal, config),
            Err(Error::InvalidParameter(_))
        ));
    }

    #[test]
    fn test_prominences_align_with_peaks() {
        let signal = Signal::new(vec![0.0, 3.0, 1.0, 2.0, 0.0], 1.0).unwrap();
        let config = AnalyzerConfig::builder()
            .smoother(Smoother::Identity)
            .min_distance(1)
            .build();
        let analysis = analyze(signal, config).unwrap();
        let prominences = analysis.prominences().unwrap();
        assert_eq!(prominences.len(), 2);
        assert_eq!(prominences[1].prominence, 1.0);
    }
}
