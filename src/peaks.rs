//! Peak detection on a smoothed contraction trace.
//!
//! Detection runs in four steps:
//!
//! 1. Find interior local maxima (a flat top is reported once, at its first sample)
//! 2. Drop maxima below `min_height`
//! 3. Drop maxima whose prominence is below `min_prominence`
//! 4. Enforce `min_distance` by keeping the tallest peak of every crowded group
//!
//! Unset thresholds impose no constraint.

use crate::{
    error::{Error, Result},
    types::PeakProminence,
};

/// Locates peaks in `signal`, returning their indices in ascending order.
///
/// # Arguments
///
/// * `signal` - The (usually smoothed) trace
/// * `min_height` - Minimum value a peak must reach, if any
/// * `min_distance` - Minimum index spacing between returned peaks (at least 1)
/// * `min_prominence` - Minimum prominence a peak must have, if any
///
/// Empty, constant and monotonic signals yield no peaks. The first and last
/// sample are never peaks.
///
/// # Errors
///
/// Returns [`Error::InvalidParameter`] if `min_distance` is zero or a
/// threshold is NaN.
///
/// # Example
///
/// ```
/// use cardio_bpm::peaks::detect_peaks;
///
/// let signal = [0.0, 2.0, 0.0, 3.0, 0.0, 1.0, 0.0];
/// let peaks = detect_peaks(&signal, Some(1.5), 1, None)?;
/// assert_eq!(peaks, vec![1, 3]);
/// # Ok::<(), cardio_bpm::Error>(())
/// ```
pub fn detect_peaks(
    signal: &[f64],
    min_height: Option<f64>,
    min_distance: usize,
    min_prominence: Option<f64>,
) -> Result<Vec<usize>> {
    if min_distance == 0 {
        return Err(Error::invalid("min_distance must be at least 1"));
    }
    if min_height.is_some_and(f64::is_nan) {
        return Err(Error::invalid("min_height must be a number"));
    }
    if min_prominence.is_some_and(f64::is_nan) {
        return Err(Error::invalid("min_prominence must be a number"));
    }

    let mut peaks = local_maxima(signal);
    let candidates = peaks.len();

    if let Some(height) = min_height {
        peaks.retain(|&i| signal[i] >= height);
    }
    let after_height = peaks.len();

    if let Some(prominence) = min_prominence {
        peaks.retain(|&i| prominence_of(signal, i).prominence >= prominence);
    }
    let after_prominence = peaks.len();

    let peaks = select_by_distance(signal, &peaks, min_distance);

    tracing::debug!(
        candidates,
        after_height,
        after_prominence,
        retained = peaks.len(),
        "Peak detection finished"
    );

    Ok(peaks)
}

/// Interior local maxima of `signal`.
///
/// A sample qualifies when it rises strictly above its left neighbour and the
/// run of equal values starting at it is followed by a strictly lower sample.
pub fn local_maxima(signal: &[f64]) -> Vec<usize> {
    let mut maxima = Vec::new();
    let n = signal.len();
    if n < 3 {
        return maxima;
    }

    let mut i = 1;
    while i < n - 1 {
        if signal[i] > signal[i - 1] {
            let mut ahead = i + 1;
            while ahead < n - 1 && signal[ahead] == signal[i] {
                ahead += 1;
            }
            if signal[ahead] < signal[i] {
                maxima.push(i);
            }
            i = ahead;
        } else {
            i += 1;
        }
    }

    maxima
}

/// Computes the prominence of each peak in `peaks`.
///
/// # Errors
///
/// Returns [`Error::InvalidParameter`] if an index lies outside the signal.
pub fn peak_prominences(signal: &[f64], peaks: &[usize]) -> Result<Vec<PeakProminence>> {
    if let Some(&bad) = peaks.iter().find(|&&i| i >= signal.len()) {
        return Err(Error::invalid(format!(
            "peak index {bad} is out of bounds for a signal of length {}",
            signal.len()
        )));
    }
    Ok(peaks.iter().map(|&i| prominence_of(signal, i)).collect())
}

/// Walks outwards from `peak` until a strictly higher sample or the boundary,
/// tracking the lowest sample on each side.
fn prominence_of(signal: &[f64], peak: usize) -> PeakProminence {
    let height = signal[peak];

    let (left_min, left_base) = lowest_until_higher(signal, height, (0..=peak).rev(), peak);
    let (right_min, right_base) = lowest_until_higher(signal, height, peak..signal.len(), peak);

    PeakProminence {
        prominence: height - left_min.max(right_min),
        left_base,
        right_base,
    }
}

fn lowest_until_higher(
    signal: &[f64],
    height: f64,
    walk: impl Iterator<Item = usize>,
    peak: usize,
) -> (f64, usize) {
    walk.take_while(|&j| signal[j] <= height)
        .fold((height, peak), |(lowest, base), j| {
            if signal[j] < lowest {
                (signal[j], j)
            } else {
                (lowest, base)
            }
        })
}

/// Keeps the tallest peak of every group closer than `min_distance`.
///
/// Peaks are visited by descending value (ties: lower index first); each
/// surviving peak removes every neighbour within the distance.
fn select_by_distance(signal: &[f64], peaks: &[usize], min_distance: usize) -> Vec<usize> {
    if min_distance <= 1 || peaks.len() < 2 {
        return peaks.to_vec();
    }

    let mut priority = (0..peaks.len()).collect::<Vec<_>>();
    priority.sort_by(|&a, &b| {
        signal[peaks[b]]
            .total_cmp(&signal[peaks[a]])
            .then(peaks[a].cmp(&peaks[b]))
    });

    let mut keep = vec![true; peaks.len()];
    for &current in &priority {
        if !keep[current] {
            continue;
        }

        let mut k = current;
        while k > 0 && peaks[current] - peaks[k - 1] < min_distance {
            keep[k - 1] = false;
            k -= 1;
        }

        let mut k = current + 1;
        while k < peaks.len() && peaks[k] - peaks[current] < min_distance {
            keep[k] = false;
            k += 1;
        }
    }

    peaks
        .iter()
        .zip(keep)
        .filter_map(|(&peak, kept)| kept.then_some(peak))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_local_maxima_simple() {
        let signal = [0.0, 1.0, 0.0, 2.0, 1.0, 3.0, 0.0];
        assert_eq!(local_maxima(&signal), vec![1, 3, 5]);
    }

    #[test]
    fn test_plateau_reported_at_first_sample() {
        let signal = [0.0, 2.0, 2.0, 2.0, 1.0];
        assert_eq!(local_maxima(&signal), vec![1]);
    }

    #[test]
    fn test_rising_plateau_is_not_a_peak() {
        let signal = [0.0, 2.0, 2.0, 3.0, 1.0];
        assert_eq!(local_maxima(&signal), vec![3]);
    }

    #[test]
    fn test_plateau_touching_end_is_not_a_peak() {
        let signal = [0.0, 1.0, 2.0, 2.0];
        assert!(local_maxima(&signal).is_empty());
    }

    #[test]
    fn test_edges_are_never_peaks() {
        let signal = [5.0, 1.0, 0.0, 1.0, 5.0];
        assert!(local_maxima(&signal).is_empty());
    }

    #[test]
    fn test_degenerate_inputs_have_no_peaks() {
        assert!(detect_peaks(&[], None, 1, None).unwrap().is_empty());
        assert!(detect_peaks(&[1.0], None, 1, None).unwrap().is_empty());
        assert!(detect_peaks(&[1.0, 2.0], None, 1, None).unwrap().is_empty());
        assert!(detect_peaks(&[3.0; 10], None, 1, None).unwrap().is_empty());
        let rising = (0..10).map(f64::from).collect::<Vec<_>>();
        assert!(detect_peaks(&rising, None, 1, None).unwrap().is_empty());
    }

    #[test]
    fn test_min_height() {
        let signal = [0.0, 1.0, 0.0, 2.0, 0.0, 3.0, 0.0];
        let peaks = detect_peaks(&signal, Some(2.0), 1, None).unwrap();
        assert_eq!(peaks, vec![3, 5]);
    }

    #[test]
    fn test_prominences() {
        let signal = [0.0, 3.0, 1.0, 2.0, 0.0];
        let prominences = peak_prominences(&signal, &[1, 3]).unwrap();
        assert_eq!(prominences[0].prominence, 3.0);
        assert_eq!(prominences[0].left_base, 0);
        assert_eq!(prominences[0].right_base, 4);
        assert_eq!(prominences[1].prominence, 1.0);
        assert_eq!(prominences[1].left_base, 2);
        assert_eq!(prominences[1].right_base, 4);
    }

    #[test]
    fn test_prominence_out_of_bounds() {
        assert!(peak_prominences(&[0.0, 1.0, 0.0], &[3]).is_err());
    }

    #[test]
    fn test_min_prominence_drops_shoulder() {
        let signal = [0.0, 3.0, 1.0, 2.0, 0.0];
        let peaks = detect_peaks(&signal, None, 1, Some(1.5)).unwrap();
        assert_eq!(peaks, vec![1]);
    }

    #[test]
    fn test_distance_keeps_tallest() {
        let signal = [0.0, 2.0, 0.0, 3.0, 0.0, 2.0, 0.0];
        let peaks = detect_peaks(&signal, None, 3, None).unwrap();
        assert_eq!(peaks, vec![3]);
    }

    #[test]
    fn test_distance_tie_prefers_lower_index() {
        let signal = [0.0, 2.0, 0.0, 2.0, 0.0];
        let peaks = detect_peaks(&signal, None, 3, None).unwrap();
        assert_eq!(peaks, vec![1]);
    }

    #[test]
    fn test_distance_chain_resolves_greedily() {
        // 3 removes its neighbours 1 and 5; 7 sits four samples away and survives.
        let signal = [0.0, 1.0, 0.0, 5.0, 0.0, 4.0, 0.0, 3.0, 0.0];
        let peaks = detect_peaks(&signal, None, 3, None).unwrap();
        assert_eq!(peaks, vec![3, 7]);
    }

    #[test]
    fn test_invalid_parameters() {
        let signal = [0.0, 1.0, 0.0];
        assert!(matches!(
            detect_peaks(&signal, None, 0, None),
            Err(Error::InvalidParameter(_))
        ));
        assert!(detect_peaks(&signal, Some(f64::NAN), 1, None).is_err());
        assert!(detect_peaks(&signal, None, 1, Some(f64::NAN)).is_err());
    }
}
