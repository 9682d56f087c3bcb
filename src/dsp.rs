//! Smoothing filters for contraction traces.
//!
//! The primary filter is [`SavitzkyGolay`], a local least-squares polynomial
//! fit that keeps peak height and timing intact. The remaining smoothers exist
//! so traces can be compared across the filters commonly used on this data:
//!
//! - [`Smoother::Identity`]: the raw trace
//! - [`Smoother::MovingAverage`]: centred rolling mean
//! - [`Smoother::SavitzkyGolay`]: local polynomial regression
//! - [`Smoother::Gaussian`]: Gaussian kernel convolution
//! - [`Smoother::Median`]: running median for outlier removal
//!
//! Every smoother returns a sequence of the same length as its input.
//!
//! # Example
//!
//! ```
//! use cardio_bpm::dsp::savgol;
//!
//! let raw = [0.0, 1.0, 0.0, 1.0, 0.0, 3.0, 0.0, 1.0, 0.0];
//! let smoothed = savgol(&raw, 3, 1)?;
//! assert_eq!(smoothed.len(), raw.len());
//! # Ok::<(), cardio_bpm::Error>(())
//! ```

use nalgebra::{DMatrix, DVector};

use crate::error::{Error, Result};

/// Gaussian kernels are cut off at this many standard deviations.
const GAUSSIAN_TRUNCATE: f64 = 4.0;

/// How the Savitzky-Golay filter produces values where a centred window
/// would run past either end of the signal.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum BoundaryMode {
    /// Fit one polynomial to the first (last) full window and evaluate it at
    /// each edge position.
    #[default]
    Interp,
    /// Reflect about the edge sample: `x[-k] = x[k]`.
    Mirror,
    /// Repeat the edge sample.
    Nearest,
}

/// Savitzky-Golay smoothing filter.
///
/// Convolution weights are derived once from an orthonormal polynomial basis
/// over the window, so applying the filter costs `window_length`
/// multiply-adds per sample.
#[derive(Debug, Clone)]
pub struct SavitzkyGolay {
    window_length: usize,
    polyorder: usize,
    mode: BoundaryMode,
    /// Weights yielding the fitted value at the window centre
    central: Vec<f64>,
    /// Weights evaluating the first window's fit at positions `0..half`
    leading: Vec<Vec<f64>>,
    /// Weights evaluating the last window's fit at positions `half + 1..window_length`
    trailing: Vec<Vec<f64>>,
}

impl SavitzkyGolay {
    /// Creates a filter fitting polynomials of degree `polyorder` over
    /// `window_length` samples, using [`BoundaryMode::Interp`] at the edges.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidParameter`] if `window_length` is even or less
    /// than 3, or if `polyorder >= window_length`.
    pub fn new(window_length: usize, polyorder: usize) -> Result<Self> {
        validate_savgol(window_length, polyorder)?;

        let half = window_length / 2;
        let basis = orthonormal_basis(window_length, polyorder)?;
        let transposed = basis.transpose();
        // Row `position` of the projection onto the fitted polynomials
        let weights_at = |position: usize| {
            (basis.row(position) * &transposed)
                .iter()
                .copied()
                .collect::<Vec<_>>()
        };

        Ok(Self {
            window_length,
            polyorder,
            mode: BoundaryMode::default(),
            central: weights_at(half),
            leading: (0..half).map(&weights_at).collect(),
            trailing: (half + 1..window_length).map(&weights_at).collect(),
        })
    }

    /// Selects the boundary strategy.
    pub fn with_mode(mut self, mode: BoundaryMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn window_length(&self) -> usize {
        self.window_length
    }

    pub fn polyorder(&self) -> usize {
        self.polyorder
    }

    pub fn mode(&self) -> BoundaryMode {
        self.mode
    }

    /// Convolution weights producing the centre value of a full window.
    pub fn coefficients(&self) -> &[f64] {
        &self.central
    }

    /// Smooths `raw`, returning a sequence of the same length.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidParameter`] if the signal is shorter than the window.
    pub fn apply(&self, raw: &[f64]) -> Result<Vec<f64>> {
        let n = raw.len();
        check_window_fits(self.window_length, n)?;

        tracing::debug!(
            window_length = self.window_length,
            polyorder = self.polyorder,
            mode = ?self.mode,
            samples = n,
            "Applying Savitzky-Golay filter"
        );

        let half = self.window_length / 2;
        let mut smoothed = vec![0.0; n];

        for (i, window) in raw.windows(self.window_length).enumerate() {
            smoothed[i + half] = dot(&self.central, window);
        }

        match self.mode {
            BoundaryMode::Interp => {
                let first = &raw[..self.window_length];
                let last = &raw[n - self.window_length..];
                for (i, weights) in self.leading.iter().enumerate() {
                    smoothed[i] = dot(weights, first);
                }
                for (k, weights) in self.trailing.iter().enumerate() {
                    smoothed[n - half + k] = dot(weights, last);
                }
            }
            BoundaryMode::Mirror | BoundaryMode::Nearest => {
                let edges = (0..half).chain(n - half..n);
                for i in edges {
                    smoothed[i] = self
                        .central
                        .iter()
                        .enumerate()
                        .map(|(j, weight)| {
                            let offset = i as isize + j as isize - half as isize;
                            let source = match self.mode {
                                BoundaryMode::Mirror => mirror_index(offset, n),
                                _ => offset.clamp(0, n as isize - 1) as usize,
                            };
                            weight * raw[source]
                        })
                        .sum();
                }
            }
        }

        Ok(smoothed)
    }
}

/// Smooths `raw` with a Savitzky-Golay filter using the default boundary mode.
///
/// # Errors
///
/// Returns [`Error::InvalidParameter`] if `window_length` is even, less than 3,
/// larger than the signal, or not greater than `polyorder`.
pub fn savgol(raw: &[f64], window_length: usize, polyorder: usize) -> Result<Vec<f64>> {
    validate_savgol(window_length, polyorder)?;
    check_window_fits(window_length, raw.len())?;
    SavitzkyGolay::new(window_length, polyorder)?.apply(raw)
}

fn check_window_fits(window_length: usize, n: usize) -> Result<()> {
    if window_length > n {
        return Err(Error::invalid(format!(
            "window_length ({window_length}) exceeds signal length ({n})"
        )));
    }
    Ok(())
}

fn validate_savgol(window_length: usize, polyorder: usize) -> Result<()> {
    if window_length < 3 {
        return Err(Error::invalid(format!(
            "window_length must be at least 3, got {window_length}"
        )));
    }
    if window_length % 2 == 0 {
        return Err(Error::invalid(format!(
            "window_length must be odd, got {window_length}"
        )));
    }
    if polyorder >= window_length {
        return Err(Error::invalid(format!(
            "polyorder ({polyorder}) must be less than window_length ({window_length})"
        )));
    }
    Ok(())
}

/// Maps a window position onto [-1, 1].
fn scaled_position(position: usize, half: usize) -> f64 {
    (position as f64 - half as f64) / half as f64
}

/// Orthonormal basis of the polynomials of degree `<= polyorder` sampled on
/// the window, one column per degree.
///
/// Each column is the previous one multiplied by the sample positions and
/// orthogonalised twice against all earlier columns. The result is
/// orthonormal to working precision for every `polyorder < window_length`.
fn orthonormal_basis(window_length: usize, polyorder: usize) -> Result<DMatrix<f64>> {
    let half = window_length / 2;
    let positions = DVector::from_fn(window_length, |row, _| scaled_position(row, half));

    let mut basis: DMatrix<f64> = DMatrix::zeros(window_length, polyorder + 1);
    basis.fill_column(0, (window_length as f64).sqrt().recip());

    for degree in 1..=polyorder {
        let mut column = basis.column(degree - 1).component_mul(&positions);
        for _ in 0..2 {
            for earlier in 0..degree {
                let previous = basis.column(earlier);
                let overlap = previous.dot(&column);
                column.axpy(-overlap, &previous, 1.0);
            }
        }

        let norm = column.norm();
        if !(norm.is_finite() && norm > f64::EPSILON) {
            return Err(Error::Numerical("polynomial basis became rank deficient"));
        }
        basis.set_column(degree, &(column / norm));
    }

    Ok(basis)
}

fn dot(weights: &[f64], samples: &[f64]) -> f64 {
    weights.iter().zip(samples).map(|(w, x)| w * x).sum()
}

/// Whole-sample symmetric reflection: `x[-k] = x[k]`, `x[n-1+k] = x[n-1-k]`.
fn mirror_index(index: isize, n: usize) -> usize {
    if n == 1 {
        return 0;
    }
    let period = 2 * (n as isize - 1);
    let folded = index.rem_euclid(period);
    if folded < n as isize {
        folded as usize
    } else {
        (period - folded) as usize
    }
}

/// Half-sample symmetric reflection: `x[-1] = x[0]`, `x[n] = x[n-1]`.
fn reflect_index(index: isize, n: usize) -> usize {
    let period = 2 * n as isize;
    let folded = index.rem_euclid(period);
    if folded < n as isize {
        folded as usize
    } else {
        (period - 1 - folded) as usize
    }
}

/// Smoothing strategy applied before peak detection.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Smoother {
    /// Pass the raw trace through unchanged.
    Identity,
    /// Centred rolling mean over `window` samples.
    MovingAverage { window: usize },
    /// Savitzky-Golay local polynomial regression.
    SavitzkyGolay {
        window_length: usize,
        polyorder: usize,
        mode: BoundaryMode,
    },
    /// Convolution with a Gaussian kernel of standard deviation `sigma` samples.
    Gaussian { sigma: f64 },
    /// Running median over an odd `kernel_size`, zero-padded at the edges.
    Median { kernel_size: usize },
}

impl Default for Smoother {
    fn default() -> Self {
        Smoother::SavitzkyGolay {
            window_length: 11,
            polyorder: 3,
            mode: BoundaryMode::Interp,
        }
    }
}

impl Smoother {
    /// Savitzky-Golay smoother with the default boundary mode.
    pub fn savgol(window_length: usize, polyorder: usize) -> Self {
        Smoother::SavitzkyGolay {
            window_length,
            polyorder,
            mode: BoundaryMode::default(),
        }
    }

    /// The comparison set: every smoother with its customary parameters.
    pub fn comparison_set() -> [Smoother; 5] {
        [
            Smoother::Identity,
            Smoother::MovingAverage { window: 5 },
            Smoother::default(),
            Smoother::Gaussian { sigma: 2.0 },
            Smoother::Median { kernel_size: 5 },
        ]
    }

    /// Short stable name used in logs and result tables.
    pub fn name(&self) -> &'static str {
        match self {
            Smoother::Identity => "none",
            Smoother::MovingAverage { .. } => "moving-avg",
            Smoother::SavitzkyGolay { .. } => "savgol",
            Smoother::Gaussian { .. } => "gaussian",
            Smoother::Median { .. } => "median",
        }
    }

    /// Checks the parameters that do not depend on the signal length.
    pub fn validate(&self) -> Result<()> {
        match *self {
            Smoother::Identity => Ok(()),
            Smoother::MovingAverage { window } if window == 0 => {
                Err(Error::invalid("moving average window must be positive"))
            }
            Smoother::MovingAverage { .. } => Ok(()),
            Smoother::SavitzkyGolay {
                window_length,
                polyorder,
                ..
            } => validate_savgol(window_length, polyorder),
            Smoother::Gaussian { sigma } if !(sigma.is_finite() && sigma > 0.0) => Err(
                Error::invalid(format!("gaussian sigma must be positive, got {sigma}")),
            ),
            Smoother::Gaussian { .. } => Ok(()),
            Smoother::Median { kernel_size } if kernel_size % 2 == 0 => Err(Error::invalid(
                format!("median kernel_size must be odd, got {kernel_size}"),
            )),
            Smoother::Median { .. } => Ok(()),
        }
    }

    /// Smooths `raw`, returning a sequence of the same length.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidParameter`] if the parameters are out of range
    /// or a window does not fit the signal.
    pub fn apply(&self, raw: &[f64]) -> Result<Vec<f64>> {
        self.validate()?;
        match *self {
            Smoother::Identity => Ok(raw.to_vec()),
            Smoother::MovingAverage { window } => moving_average(raw, window),
            Smoother::SavitzkyGolay {
                window_length,
                polyorder,
                mode,
            } => {
                check_window_fits(window_length, raw.len())?;
                SavitzkyGolay::new(window_length, polyorder)?
                    .with_mode(mode)
                    .apply(raw)
            }
            Smoother::Gaussian { sigma } => Ok(gaussian(raw, sigma)),
            Smoother::Median { kernel_size } => Ok(median(raw, kernel_size)),
        }
    }
}

/// Centred rolling mean; positions without a complete window take the value
/// of the nearest complete one.
fn moving_average(raw: &[f64], window: usize) -> Result<Vec<f64>> {
    let n = raw.len();
    if window > n {
        return Err(Error::invalid(format!(
            "moving average window ({window}) exceeds signal length ({n})"
        )));
    }

    let lead = (window - 1) / 2;
    let mut means = Vec::with_capacity(n - window + 1);
    let mut sum: f64 = raw[..window].iter().sum();
    means.push(sum / window as f64);
    for i in window..n {
        sum += raw[i] - raw[i - window];
        means.push(sum / window as f64);
    }

    let last = means.len() - 1;
    Ok((0..n)
        .map(|i| means[i.saturating_sub(lead).min(last)])
        .collect())
}

/// Gaussian convolution with half-sample reflection at the edges. The kernel
/// reach is capped at the signal length.
fn gaussian(raw: &[f64], sigma: f64) -> Vec<f64> {
    let n = raw.len();
    let radius = (GAUSSIAN_TRUNCATE * sigma + 0.5).min(n as f64) as isize;
    let mut kernel = (-radius..=radius)
        .map(|x| (-0.5 * (x as f64 / sigma).powi(2)).exp())
        .collect::<Vec<_>>();
    let total: f64 = kernel.iter().sum();
    kernel.iter_mut().for_each(|k| *k /= total);

    (0..n as isize)
        .map(|i| {
            kernel
                .iter()
                .zip(-radius..=radius)
                .map(|(weight, offset)| weight * raw[reflect_index(i + offset, n)])
                .sum()
        })
        .collect()
}

/// Running median over a zero-padded signal.
///
/// Only the samples inside the signal are collected; the padding zeros are
/// accounted for by count, so the kernel may be longer than the signal.
fn median(raw: &[f64], kernel_size: usize) -> Vec<f64> {
    let n = raw.len();
    let half = kernel_size / 2;
    let mut window = Vec::with_capacity(n.min(kernel_size));

    (0..n)
        .map(|i| {
            let lo = i.saturating_sub(half);
            let hi = i.saturating_add(half).min(n - 1);
            window.clear();
            window.extend_from_slice(&raw[lo..=hi]);
            window.sort_by(f64::total_cmp);

            let zeros = kernel_size - window.len();
            let negatives = window.partition_point(|&v| v < 0.0);
            match half {
                rank if rank < negatives => window[rank],
                rank if rank < negatives + zeros => 0.0,
                rank => window[rank - zeros],
            }
        })
        .collect()
}
