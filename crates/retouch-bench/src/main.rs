//! retouch-bench: CLI tool for pipeline timing and diagnostics.
//!
//! Loads an image, builds a pipeline from presets and `--op` arguments,
//! renders it (full resolution or through the interaction proxy) and
//! prints per-stage diagnostics. Useful for:
//!
//! - Measuring per-operation durations to find slow stages
//! - Comparing proxy renders against full renders at various qualities
//! - Checking what the analysis engine reports for a rendered image
//!
//! # Usage
//!
//! ```text
//! cargo run --release --bin retouch-bench -- [OPTIONS] <IMAGE_PATH>
//! ```
//!
//! Logging honours `RUST_LOG` and defaults to `info`.

#![allow(clippy::print_stdout, clippy::print_stderr)]

mod op_spec;

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::{Duration, Instant};

use clap::{Parser, ValueEnum};
use retouch_analysis::{AnalysisConfig, AnalysisEngine, AnalysisError, ResultBundle};
use retouch_io::IoError;
use retouch_pipeline::{
    Command, DownsampleFilter, EditSession, PipelineError, ProxyConfig, RenderOutput, RenderReport,
    SessionConfig,
};
use serde::{Deserialize, Serialize};
use tracing_subscriber::EnvFilter;

/// Pipeline timing and diagnostics for retouch.
///
/// Presets are applied first, in order, followed by every `--op`.
#[derive(Parser)]
#[command(name = "retouch-bench", version)]
struct Cli {
    /// Path to the input image (PNG, JPEG, BMP, WebP, TIFF).
    image_path: PathBuf,

    /// Pipeline preset (JSON record list) to append.
    #[arg(long)]
    preset: Vec<PathBuf>,

    /// Operation to append, as `KIND[:key=value,...]`.
    #[arg(long = "op", value_parser = op_spec::parse)]
    ops: Vec<op_spec::OpSpec>,

    /// Interaction proxy quality in (0.1, 1.0].
    #[arg(long, default_value_t = ProxyConfig::DEFAULT_QUALITY)]
    quality: f64,

    /// Longest axis of the main-view proxy.
    #[arg(long, default_value_t = ProxyConfig::DEFAULT_VIEW_MAX_DIMENSION, value_parser = clap::builder::RangedU64ValueParser::<u32>::new().range(1..))]
    view_max_dimension: u32,

    /// Downsample filter (nearest, triangle, catmull-rom, gaussian, lanczos3).
    #[arg(long, value_enum, default_value_t = CLI_DEFAULT_FILTER)]
    downsample_filter: Filter,

    /// Render through the interaction proxy instead of at full resolution.
    #[arg(long)]
    interactive: bool,

    /// Write the rendered image of the first run to file.
    #[arg(long)]
    output: Option<PathBuf>,

    /// Run the analysis engine on the rendered image.
    #[arg(long)]
    analysis: bool,

    /// Longest axis of the analysis copy.
    #[arg(long, default_value_t = AnalysisConfig::DEFAULT_MAX_DIMENSION, value_parser = clap::builder::RangedU64ValueParser::<u32>::new().range(1..))]
    analysis_max_dimension: u32,

    /// Analysis worker threads.
    #[arg(long, default_value_t = AnalysisConfig::DEFAULT_WORKERS, value_parser = clap::builder::RangedU64ValueParser::<usize>::new().range(1..))]
    workers: usize,

    /// Number of runs for averaging.
    #[arg(long, default_value_t = 1, value_parser = clap::builder::RangedU64ValueParser::<usize>::new().range(1..))]
    runs: usize,

    /// Output diagnostics as JSON instead of human-readable report.
    #[arg(long)]
    json: bool,

    /// Full bench config as a JSON string.
    ///
    /// When provided, the proxy and analysis flags are ignored. Missing
    /// fields take their defaults.
    #[arg(long)]
    config_json: Option<String>,
}

/// Downsample resampling filter selection.
#[derive(Clone, Copy, ValueEnum)]
enum Filter {
    /// Nearest-neighbor (fastest, blocky).
    Nearest,
    /// Bilinear interpolation (fast, decent quality).
    Triangle,
    /// Bicubic Catmull-Rom (moderate, good quality).
    CatmullRom,
    /// Gaussian (moderate, smooth).
    Gaussian,
    /// Lanczos with 3 lobes (slowest, sharpest).
    Lanczos3,
}

impl From<Filter> for DownsampleFilter {
    fn from(filter: Filter) -> Self {
        match filter {
            Filter::Nearest => Self::Nearest,
            Filter::Triangle => Self::Triangle,
            Filter::CatmullRom => Self::CatmullRom,
            Filter::Gaussian => Self::Gaussian,
            Filter::Lanczos3 => Self::Lanczos3,
        }
    }
}

const fn filter_from_pipeline(filter: DownsampleFilter) -> Filter {
    match filter {
        DownsampleFilter::Nearest => Filter::Nearest,
        DownsampleFilter::Triangle => Filter::Triangle,
        DownsampleFilter::CatmullRom => Filter::CatmullRom,
        DownsampleFilter::Gaussian => Filter::Gaussian,
        DownsampleFilter::Lanczos3 => Filter::Lanczos3,
    }
}

/// Derived from [`ProxyConfig::DEFAULT_FILTER`] so the two cannot drift.
const CLI_DEFAULT_FILTER: Filter = filter_from_pipeline(ProxyConfig::DEFAULT_FILTER);

/// Everything `--config-json` can set.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
#[serde(default)]
struct BenchConfig {
    proxy: ProxyConfig,
    analysis: AnalysisConfig,
}

#[derive(Debug, thiserror::Error)]
enum BenchError {
    #[error("error parsing --config-json: {0}")]
    ConfigJson(#[source] serde_json::Error),
    #[error(transparent)]
    Io(#[from] IoError),
    #[error(transparent)]
    Pipeline(#[from] PipelineError),
    #[error(transparent)]
    Analysis(#[from] AnalysisError),
    #[error("error serializing diagnostics: {0}")]
    Json(#[from] serde_json::Error),
}

fn config_from_cli(cli: &Cli) -> Result<BenchConfig, BenchError> {
    if let Some(ref json) = cli.config_json {
        return serde_json::from_str(json).map_err(BenchError::ConfigJson);
    }
    Ok(BenchConfig {
        proxy: ProxyConfig {
            quality: cli.quality,
            view_max_dimension: cli.view_max_dimension,
            filter: cli.downsample_filter.into(),
        },
        analysis: AnalysisConfig {
            max_dimension: cli.analysis_max_dimension,
            workers: cli.workers,
            ..AnalysisConfig::default()
        },
    })
}

fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    // A second init (only possible in tests) keeps the first subscriber.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(true)
        .try_init();
}

fn main() -> ExitCode {
    init_logging();
    let cli = Cli::parse();
    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{e}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: &Cli) -> Result<(), BenchError> {
    let config = config_from_cli(cli)?;
    let loaded = retouch_io::load_image(&cli.image_path)?;

    eprintln!(
        "Image: {} ({}x{}, {:?})",
        loaded.path.display(),
        loaded.image.width(),
        loaded.image.height(),
        loaded.image.color(),
    );
    eprintln!("Config: {config:#?}");
    eprintln!("Runs: {}", cli.runs);
    eprintln!();

    let mut session = EditSession::new(SessionConfig {
        proxy: config.proxy,
        ..SessionConfig::default()
    })?;
    let label = loaded.source_label();
    session.load_image(loaded.image, Some(label));
    build_pipeline(&mut session, cli)?;
    eprintln!("Pipeline: {:?}", session.pipeline().kinds());

    if cli.interactive && !session.start_interaction() {
        tracing::warn!("could not enter interactive mode");
    }

    let engine = if cli.analysis {
        Some(AnalysisEngine::new(config.analysis)?)
    } else {
        None
    };

    let mut reports = Vec::with_capacity(cli.runs);
    let mut analysis_durations = Vec::new();

    for run in 0..cli.runs {
        if cli.runs > 1 && !cli.json {
            eprintln!("--- Run {}/{} ---", run + 1, cli.runs);
        }

        let RenderOutput { image, report } = if cli.interactive {
            session.view_snapshot().render_with_report()
        } else {
            session.render_export_with_report()
        };

        let analysis = match &engine {
            Some(engine) => {
                let start = Instant::now();
                let bundle = engine.analyze(Some(&image))?;
                analysis_durations.push(start.elapsed());
                Some(bundle)
            }
            None => None,
        };

        if cli.json {
            let mut value = serde_json::json!({ "run": run + 1, "render": &report });
            if let Some(bundle) = &analysis {
                value["analysis"] = analysis_summary(bundle);
            }
            println!("{}", serde_json::to_string_pretty(&value)?);
        } else {
            println!("{}", report.report());
            if let Some(bundle) = &analysis {
                print_analysis(bundle);
            }
        }

        // Write the image on the first run only.
        if run == 0
            && let Some(ref path) = cli.output
        {
            retouch_io::save_image(&image, path)?;
            eprintln!(
                "Image written to {} ({}x{})",
                path.display(),
                image.width(),
                image.height()
            );
        }

        reports.push(report);
    }

    if cli.runs > 1 && !cli.json {
        print_multi_run_summary(&reports, &analysis_durations);
    }
    Ok(())
}

fn build_pipeline(session: &mut EditSession, cli: &Cli) -> Result<(), BenchError> {
    for path in &cli.preset {
        let (pipeline, skipped) = retouch_io::load_preset(path, session.catalog())?;
        for record in &skipped {
            eprintln!(
                "Skipped preset record {} ({}): {}",
                record.index, record.kind, record.error
            );
        }
        for operation in &pipeline {
            session.execute(Command::Add(operation.clone()))?;
        }
    }
    for spec in &cli.ops {
        session.add_operation(&spec.kind, &spec.params)?;
    }
    Ok(())
}

fn analysis_summary(bundle: &ResultBundle) -> serde_json::Value {
    let mut summary = serde_json::Map::new();
    if let Some(hist) = bundle.histogram() {
        summary.insert(
            "histogram".to_owned(),
            serde_json::json!({
                "channels": hist.channels.len(),
                "pixels": hist.total(),
                "peak": hist.peak(),
                "mean_luminance": hist.mean_luminance(),
            }),
        );
    }
    if let Some(parade) = bundle.parade() {
        summary.insert(
            "parade".to_owned(),
            serde_json::json!({ "width": parade.width, "channels": parade.channels.len() }),
        );
    }
    if let Some(hs) = bundle.hue_saturation() {
        summary.insert(
            "hue_saturation".to_owned(),
            serde_json::json!({
                "chromatic_pixels": hs.chromatic_count(),
                "dominant_hue": hs.dominant_hue(),
            }),
        );
    }
    if let Some(chroma) = bundle.chromaticity() {
        summary.insert(
            "chromaticity".to_owned(),
            serde_json::json!({
                "points_2d": chroma.points_2d.len(),
                "points_3d": chroma.points_3d.len(),
            }),
        );
    }
    serde_json::Value::Object(summary)
}

fn print_analysis(bundle: &ResultBundle) {
    println!("Analysis\n{}", "=".repeat(60));
    if let Some(hist) = bundle.histogram() {
        let mean = hist
            .mean_luminance()
            .map_or_else(|| "-".to_owned(), |m| format!("{m:.1}"));
        println!(
            "{:<24} {} channel(s), {} px, peak {}, mean luma {mean}",
            "Histogram",
            hist.channels.len(),
            hist.total(),
            hist.peak(),
        );
    }
    if let Some(parade) = bundle.parade() {
        println!(
            "{:<24} {} channel(s) x {} columns",
            "Parade",
            parade.channels.len(),
            parade.width
        );
    }
    if let Some(hs) = bundle.hue_saturation() {
        let hue = hs
            .dominant_hue()
            .map_or_else(|| "none".to_owned(), |h| format!("{h}°"));
        println!(
            "{:<24} {} chromatic px, dominant hue {hue}",
            "Hue/Saturation",
            hs.chromatic_count()
        );
    }
    if let Some(chroma) = bundle.chromaticity() {
        println!(
            "{:<24} {} (a,b) / {} (L,a,b) samples",
            "Chromaticity",
            chroma.points_2d.len(),
            chroma.points_3d.len()
        );
    }
    println!();
}

fn millis(duration: Duration) -> f64 {
    duration.as_secs_f64() * 1000.0
}

/// `(min, mean, max)` in milliseconds.
#[allow(clippy::cast_precision_loss)]
fn spread(durations: &[f64]) -> (f64, f64, f64) {
    let min = durations.iter().copied().reduce(f64::min).unwrap_or(0.0);
    let max = durations.iter().copied().reduce(f64::max).unwrap_or(0.0);
    let mean = if durations.is_empty() {
        0.0
    } else {
        durations.iter().sum::<f64>() / durations.len() as f64
    };
    (min, mean, max)
}

/// Print aggregated statistics across multiple runs.
fn print_multi_run_summary(reports: &[RenderReport], analysis: &[Duration]) {
    println!();
    println!("Summary ({} runs)\n{}", reports.len(), "=".repeat(60));

    if reports.is_empty() {
        println!("Warning: no diagnostics to summarize");
        return;
    }

    let totals: Vec<f64> = reports.iter().map(|r| millis(r.total_duration)).collect();
    let (min, mean, max) = spread(&totals);
    println!("Render duration: min={min:.3}ms  mean={mean:.3}ms  max={max:.3}ms");

    if !analysis.is_empty() {
        let durations: Vec<f64> = analysis.iter().copied().map(millis).collect();
        let (min, mean, max) = spread(&durations);
        println!("Analysis duration: min={min:.3}ms  mean={mean:.3}ms  max={max:.3}ms");
    }

    // Per-stage means, keyed by position so repeated kinds stay apart.
    let mut per_stage: BTreeMap<(usize, String), Vec<f64>> = BTreeMap::new();
    for report in reports {
        for stage in &report.stages {
            let index = stage.index.unwrap_or(usize::MAX);
            per_stage
                .entry((index, stage.kind.clone()))
                .or_default()
                .push(millis(stage.duration));
        }
    }

    println!();
    println!("{:<4} {:<24} {:>12}", "#", "Stage", "Mean (ms)");
    println!("{}", "-".repeat(44));
    for ((index, kind), durations) in &per_stage {
        let (_, stage_mean, _) = spread(durations);
        println!("{index:<4} {kind:<24} {stage_mean:>10.3}ms");
    }
}
