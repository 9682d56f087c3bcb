use cardio_bpm::{
    BoundaryMode, Error, SavitzkyGolay, detect_peaks, estimate_bpm, peaks::peak_prominences,
};
use proptest::prelude::*;

/// A signal together with a Savitzky-Golay window and order that fit it.
fn signal_and_window() -> impl Strategy<Value = (Vec<f64>, usize, usize)> {
    prop::collection::vec(-100.0f64..100.0, 3..150).prop_flat_map(|signal| {
        let max_half = ((signal.len() - 1) / 2).min(15);
        (Just(signal), 1..=max_half).prop_flat_map(|(signal, half)| {
            let window_length = 2 * half + 1;
            (Just(signal), Just(window_length), 0..window_length)
        })
    })
}

fn boundary_mode() -> impl Strategy<Value = BoundaryMode> {
    prop_oneof![
        Just(BoundaryMode::Interp),
        Just(BoundaryMode::Mirror),
        Just(BoundaryMode::Nearest),
    ]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    #[test]
    fn test_smoothing_preserves_length(
        (signal, window_length, polyorder) in signal_and_window(),
        mode in boundary_mode(),
    ) {
        let filter = SavitzkyGolay::new(window_length, polyorder).unwrap().with_mode(mode);
        let smoothed = filter.apply(&signal).unwrap();
        prop_assert_eq!(smoothed.len(), signal.len());
    }

    #[test]
    fn test_smoothing_is_deterministic((signal, window_length, polyorder) in signal_and_window()) {
        let first = SavitzkyGolay::new(window_length, polyorder).unwrap().apply(&signal).unwrap();
        let second = SavitzkyGolay::new(window_length, polyorder).unwrap().apply(&signal).unwrap();
        prop_assert_eq!(
            first.iter().map(|v| v.to_bits()).collect::<Vec<_>>(),
            second.iter().map(|v| v.to_bits()).collect::<Vec<_>>()
        );
    }

    #[test]
    fn test_constant_signal_is_unchanged(
        value in -1000.0f64..1000.0,
        len in 3usize..80,
        half in 1usize..10,
        polyorder in 0usize..19,
        mode in boundary_mode(),
    ) {
        let window_length = (2 * half + 1).min(if len % 2 == 1 { len } else { len - 1 });
        prop_assume!(polyorder < window_length);

        let signal = vec![value; len];
        let smoothed = SavitzkyGolay::new(window_length, polyorder)
            .unwrap()
            .with_mode(mode)
            .apply(&signal)
            .unwrap();
        let tolerance = 1e-9 * value.abs().max(1.0);
        for s in smoothed {
            prop_assert!((s - value).abs() <= tolerance, "{} drifted to {}", value, s);
        }
    }

    #[test]
    fn test_peaks_are_interior_ordered_and_spaced(
        signal in prop::collection::vec(-10.0f64..10.0, 0..200),
        min_distance in 1usize..25,
        min_height in prop::option::of(-10.0f64..10.0),
        min_prominence in prop::option::of(0.0f64..5.0),
    ) {
        let peaks = detect_peaks(&signal, min_height, min_distance, min_prominence).unwrap();
        for &peak in &peaks {
            prop_assert!(peak > 0 && peak < signal.len() - 1);
            if let Some(height) = min_height {
                prop_assert!(signal[peak] >= height);
            }
        }
        if let Some(threshold) = min_prominence {
            for prominence in peak_prominences(&signal, &peaks).unwrap() {
                prop_assert!(prominence.prominence >= threshold);
            }
        }
        for pair in peaks.windows(2) {
            prop_assert!(pair[0] < pair[1]);
            prop_assert!(pair[1] - pair[0] >= min_distance);
        }
    }

    #[test]
    fn test_peak_detection_is_deterministic(
        signal in prop::collection::vec(-10.0f64..10.0, 0..200),
        min_distance in 1usize..25,
    ) {
        let first = detect_peaks(&signal, None, min_distance, None).unwrap();
        let second = detect_peaks(&signal, None, min_distance, None).unwrap();
        prop_assert_eq!(first, second);
    }

    #[test]
    fn test_monotonic_signal_has_no_peaks(
        start in -100.0f64..100.0,
        steps in prop::collection::vec(0.0f64..5.0, 0..100),
        rising in any::<bool>(),
    ) {
        let mut signal = steps
            .iter()
            .scan(start, |level, step| {
                *level += step;
                Some(*level)
            })
            .collect::<Vec<_>>();
        if !rising {
            signal.reverse();
        }
        prop_assert!(detect_peaks(&signal, None, 1, None).unwrap().is_empty());
    }

    #[test]
    fn test_regular_peaks_round_trip(
        start in 0usize..100,
        spacing in 1usize..200,
        count in 2usize..40,
        sample_interval in 0.001f64..1.0,
    ) {
        let peaks = (0..count).map(|k| start + k * spacing).collect::<Vec<_>>();
        let estimate = estimate_bpm(&peaks, sample_interval).unwrap();
        let expected_interval = spacing as f64 * sample_interval;

        prop_assert_eq!(estimate.n_beats, count);
        prop_assert_eq!(estimate.intervals.len(), count - 1);
        for interval in &estimate.intervals {
            prop_assert!((interval - expected_interval).abs() <= 1e-12 * expected_interval.max(1.0));
        }
        let expected_bpm = 60.0 / expected_interval;
        prop_assert!((estimate.bpm - expected_bpm).abs() <= 1e-9 * expected_bpm);
    }

    #[test]
    fn test_fewer_than_two_peaks_is_insufficient(
        peaks in prop::collection::vec(0usize..1000, 0..2),
        sample_interval in 0.001f64..1.0,
    ) {
        let result = estimate_bpm(&peaks, sample_interval);
        prop_assert!(
            matches!(result, Err(Error::InsufficientPeaks { found }) if found == peaks.len()),
            "unexpected result {:?}",
            result
        );
    }
}
