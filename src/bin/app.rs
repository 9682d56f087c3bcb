use std::{
    fmt::Write as _,
    fs,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use cardio_bpm::{
    Analysis, AnalyzerConfig, BoundaryMode, DEFAULT_FRAME_RATE, Error, HeightThreshold, Signal,
    Smoother, Trace, analyze,
};
use clap::{Parser, ValueEnum};
use itertools::Itertools;
use plotters::prelude::*;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
enum FilterKind {
    None,
    MovingAvg,
    Savgol,
    Gaussian,
    Median,
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
enum Boundary {
    Interp,
    Mirror,
    Nearest,
}

impl From<Boundary> for BoundaryMode {
    fn from(boundary: Boundary) -> Self {
        match boundary {
            Boundary::Interp => BoundaryMode::Interp,
            Boundary::Mirror => BoundaryMode::Mirror,
            Boundary::Nearest => BoundaryMode::Nearest,
        }
    }
}

#[derive(clap::Parser, Debug)]
struct Args {
    /// CSV export with one column per region of interest
    #[clap(short, long)]
    input: PathBuf,
    /// Column to analyse (default: the first Region column)
    #[clap(short, long)]
    column: Option<String>,
    /// Acquisition frame rate in frames per second
    #[clap(short = 'r', long, default_value_t = DEFAULT_FRAME_RATE)]
    frame_rate: f64,
    /// Smoothers to run
    #[clap(short, long = "filter", value_enum, default_values_t = [FilterKind::Savgol])]
    filters: Vec<FilterKind>,
    /// Run every smoother
    #[clap(long, conflicts_with = "filters")]
    compare: bool,
    #[clap(short = 'w', long, default_value_t = 11)]
    window_length: usize,
    #[clap(short = 'p', long, default_value_t = 3)]
    polyorder: usize,
    #[clap(long, value_enum, default_value_t = Boundary::Interp)]
    boundary: Boundary,
    /// Minimum spacing between peaks in frames
    #[clap(short = 'd', long, default_value_t = 10)]
    min_distance: usize,
    /// Minimum peak height
    #[clap(long, conflicts_with = "mean_height")]
    min_height: Option<f64>,
    /// Require peaks to exceed the mean of the smoothed trace
    #[clap(long)]
    mean_height: bool,
    #[clap(long)]
    min_prominence: Option<f64>,
    /// Results table (default: stdout)
    #[clap(short, long)]
    output: Option<PathBuf>,
    /// Directory for `<filter>_plot.png` overlays
    #[clap(long)]
    plot_dir: Option<PathBuf>,
}

impl Args {
    fn smoother(&self, kind: FilterKind) -> Smoother {
        match kind {
            FilterKind::None => Smoother::Identity,
            FilterKind::MovingAvg => Smoother::MovingAverage { window: 5 },
            FilterKind::Savgol => Smoother::SavitzkyGolay {
                window_length: self.window_length,
                polyorder: self.polyorder,
                mode: self.boundary.into(),
            },
            FilterKind::Gaussian => Smoother::Gaussian { sigma: 2.0 },
            FilterKind::Median => Smoother::Median { kernel_size: 5 },
        }
    }

    fn smoothers(&self) -> Vec<Smoother> {
        let kinds = if self.compare {
            FilterKind::value_variants()
        } else {
            self.filters.as_slice()
        };
        kinds.iter().map(|&kind| self.smoother(kind)).collect()
    }

    fn height(&self) -> Option<HeightThreshold> {
        if self.mean_height {
            Some(HeightThreshold::SignalMean)
        } else {
            self.min_height.map(HeightThreshold::Absolute)
        }
    }
}

/// Columns of the results table.
const REPORT_HEADER: &str = "column,filter,n_beats,interval_bpm,count_bpm";

/// One results row; a missing interval rate leaves its field empty.
fn report_row(
    column: &str,
    filter: &str,
    n_beats: usize,
    interval_bpm: Option<f64>,
    count_bpm: f64,
) -> String {
    format!(
        "{column},{filter},{n_beats},{},{count_bpm:.3}",
        interval_bpm.map(|bpm| format!("{bpm:.3}")).unwrap_or_default()
    )
}

fn render_plot(path: &Path, column: &str, analysis: &Analysis, rate_label: &str) -> Result<()> {
    let raw = analysis.signal().samples();
    let smoothed = analysis.smoothed();
    let (low, high) = raw
        .iter()
        .chain(smoothed)
        .copied()
        .minmax()
        .into_option()
        .unwrap_or((0.0, 1.0));
    let pad = if high > low { (high - low) * 0.05 } else { 1.0 };

    let root = BitMapBackend::new(path, (1200, 600)).into_drawing_area();
    root.fill(&WHITE)?;

    let mut chart = ChartBuilder::on(&root)
        .caption(
            format!(
                "Beat Detection - {} ({rate_label})",
                analysis.config().smoother().name()
            ),
            ("sans-serif", 24),
        )
        .margin(10)
        .x_label_area_size(40)
        .y_label_area_size(60)
        .build_cartesian_2d(0usize..raw.len(), (low - pad)..(high + pad))?;

    chart
        .configure_mesh()
        .x_desc("Frame Index")
        .y_desc("Region Intensity")
        .draw()?;

    chart.draw_series(LineSeries::new(
        raw.iter().copied().enumerate(),
        &BLACK.mix(0.25),
    ))?;
    chart
        .draw_series(LineSeries::new(smoothed.iter().copied().enumerate(), &BLUE))?
        .label(column)
        .legend(|(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], &BLUE));
    chart.draw_series(
        analysis
            .peaks()
            .iter()
            .map(|&i| Circle::new((i, smoothed[i]), 4, RED.filled())),
    )?;

    chart
        .configure_series_labels()
        .background_style(&WHITE.mix(0.8))
        .border_style(&BLACK)
        .draw()?;

    root.present()?;
    Ok(())
}

fn main() -> Result<()> {
    let fmt_layer = fmt::layer().with_target(false);
    let filter_layer = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new("info"))
        .context("Failed to build log filter")?;

    tracing_subscriber::registry()
        .with(filter_layer)
        .with(fmt_layer)
        .init();

    let args = Args::parse();

    let trace = Trace::from_path(&args.input)
        .with_context(|| format!("Failed to load {}", args.input.display()))?;

    let column = match &args.column {
        Some(column) => column.clone(),
        None => trace
            .region_columns()
            .first()
            .map(|name| name.to_string())
            .context("No Region column found; pass --column")?,
    };

    let samples = trace
        .column(&column)
        .with_context(|| format!("Column {column:?} not found"))?
        .to_vec();
    let signal = Signal::from_rate(samples, args.frame_rate)?;

    tracing::info!(
        "Analysing {} ({} frames, {:.1} s)",
        column,
        signal.len(),
        signal.duration()
    );

    let base = AnalyzerConfig::builder()
        .maybe_min_height(args.height())
        .min_distance(args.min_distance)
        .maybe_min_prominence(args.min_prominence)
        .build();

    if let Some(dir) = &args.plot_dir {
        fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create {}", dir.display()))?;
    }

    let mut report = format!("{REPORT_HEADER}\n");

    for smoother in args.smoothers() {
        let analysis = analyze(signal.clone(), base.with_smoother(smoother))?;
        let count_bpm = analysis.count_rate()?;

        let interval_bpm = match analysis.rate() {
            Ok(estimate) => {
                let stats = estimate.stats();
                tracing::info!(
                    "{}: {:.1} BPM from {} beats (interval {:.3} ± {:.3} s)",
                    smoother.name(),
                    estimate.bpm,
                    estimate.n_beats,
                    stats.mean,
                    stats.std_dev
                );
                Some(estimate.bpm)
            }
            Err(Error::InsufficientPeaks { found }) => {
                tracing::warn!(
                    "{}: only {} peak(s) detected, no interval rate",
                    smoother.name(),
                    found
                );
                None
            }
            Err(e) => return Err(e.into()),
        };

        writeln!(
            report,
            "{}",
            report_row(
                &column,
                smoother.name(),
                analysis.peaks().len(),
                interval_bpm,
                count_bpm
            )
        )?;

        if let Some(dir) = &args.plot_dir {
            let path = dir.join(format!("{}_plot.png", smoother.name()));
            let label = interval_bpm
                .map(|bpm| format!("{} BPM", bpm.round()))
                .unwrap_or_else(|| "no rate".to_string());
            render_plot(&path, &column, &analysis, &label)
                .with_context(|| format!("Failed to render {}", path.display()))?;
            tracing::info!("Saved plot to {}", path.display());
        }
    }

    match &args.output {
        Some(path) => {
            fs::write(path, &report)
                .with_context(|| format!("Failed to write {}", path.display()))?;
            tracing::info!("Results saved to {}", path.display());
        }
        None => print!("{report}"),
    }

    Ok(())
}
