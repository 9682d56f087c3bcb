//! Beat-rate estimation from detected peaks.

use itertools::Itertools;

use crate::{
    error::{Error, Result},
    types::{RateEstimate, check_sample_interval, mean},
};

/// Derives inter-beat intervals and beats per minute from ascending peak indices.
///
/// Intervals are the differences between consecutive peaks scaled by
/// `sample_interval`; the rate is `60 / mean(intervals)`. Irregular beats are
/// not rejected.
///
/// # Errors
///
/// Returns [`Error::InsufficientPeaks`] for fewer than two peaks and
/// [`Error::InvalidParameter`] if the interval is not positive or the indices
/// are not strictly increasing.
///
/// # Example
///
/// ```
/// use cardio_bpm::rate::estimate_bpm;
///
/// let estimate = estimate_bpm(&[10, 35, 60], 0.04)?;
/// assert_eq!(estimate.n_beats, 3);
/// assert!((estimate.bpm - 60.0).abs() < 1e-9);
/// # Ok::<(), cardio_bpm::Error>(())
/// ```
pub fn estimate_bpm(peak_indices: &[usize], sample_interval: f64) -> Result<RateEstimate> {
    check_sample_interval(sample_interval)?;
    if peak_indices.len() < 2 {
        return Err(Error::InsufficientPeaks {
            found: peak_indices.len(),
        });
    }

    let intervals = peak_indices
        .iter()
        .tuple_windows()
        .map(|(&earlier, &later)| {
            if later <= earlier {
                return Err(Error::invalid(format!(
                    "peak indices must be strictly increasing, got {earlier} then {later}"
                )));
            }
            Ok((later - earlier) as f64 * sample_interval)
        })
        .collect::<Result<Vec<_>>>()?;

    let bpm = 60.0 / mean(&intervals);

    tracing::debug!(
        bpm,
        n_beats = peak_indices.len(),
        "Estimated rate from peak intervals"
    );

    Ok(RateEstimate {
        bpm,
        intervals,
        n_beats: peak_indices.len(),
    })
}

/// Peaks per minute of recording: `n_peaks / (n_samples * sample_interval / 60)`.
///
/// Unlike [`estimate_bpm`] this is defined for any peak count, but it is biased
/// by the partial beats at either end of the recording.
///
/// # Errors
///
/// Returns [`Error::InvalidParameter`] for an empty recording or an interval
/// that is not positive.
pub fn count_rate(n_peaks: usize, n_samples: usize, sample_interval: f64) -> Result<f64> {
    check_sample_interval(sample_interval)?;
    if n_samples == 0 {
        return Err(Error::invalid("recording must contain at least one sample"));
    }
    let minutes = n_samples as f64 * sample_interval / 60.0;
    Ok(n_peaks as f64 / minutes)
}
