//! # Cardio BPM
//!
//! Beat-rate estimation for cardiomyocyte contraction traces. A trace (for
//! example the mean intensity of a region of interest in a calcium-imaging
//! recording) is smoothed, its contraction peaks are located, and the
//! inter-beat intervals are turned into a beats-per-minute estimate.
//!
//! ## Features
//!
//! - Savitzky-Golay smoothing with explicit least-squares coefficients
//! - Alternative smoothers for comparison (moving average, Gaussian, median)
//! - Peak detection with height, prominence and spacing constraints
//! - Interval statistics and beats-per-minute estimation
//! - Loading of Fiji CSV exports
//!
//! ## Example
//!
//! ```
//! use cardio_bpm::{AnalyzerConfig, Signal, analyze};
//!
//! // Configure the pipeline with the Fiji preset
//! let config = AnalyzerConfig::fiji_trace();
//!
//! // A 1.5 Hz contraction sampled at 25 frames per second
//! let raw = (0..500)
//!     .map(|i| (2.0 * std::f64::consts::PI * 1.5 * i as f64 / 25.0).sin())
//!     .collect::<Vec<_>>();
//! let signal = Signal::from_rate(raw, 25.0)?;
//!
//! let analysis = analyze(signal, config)?;
//! let estimate = analysis.rate()?;
//! println!("{:.1} BPM from {} beats", estimate.bpm, estimate.n_beats);
//! # Ok::<(), cardio_bpm::Error>(())
//! ```

pub mod analyzer;
pub mod config;
pub mod dsp;
pub mod error;
pub mod peaks;
pub mod rate;
pub mod trace;
pub mod types;

pub use analyzer::{Analysis, analyze};
pub use config::{AnalyzerConfig, DEFAULT_FRAME_RATE, HeightThreshold};
pub use dsp::{BoundaryMode, SavitzkyGolay, Smoother};
pub use error::{Error, Result};
pub use peaks::detect_peaks;
pub use rate::{count_rate, estimate_bpm};
pub use trace::Trace;
pub use types::{Beat, IntervalStats, PeakProminence, RateEstimate, Signal};
