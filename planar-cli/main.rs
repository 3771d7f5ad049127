use anyhow::{Context, Result};
use clap::error::ErrorKind;
use clap::Parser;
use log::{error, info};
use planar_cli::display::{compose_views, PngSink, ViewSink};
use planar_cli::planar_core::PipelineConfig;
use planar_cli::report::{format_distance_stats, format_localization, RunSummary};
use planar_cli::{load_image, LoadedImage, PlanarPipeline};
use std::path::PathBuf;
use std::process::ExitCode;

const FAILURE: u8 = 255;

#[derive(Parser, Debug)]
#[command(name = "planar-match")]
#[command(about = "Locate a planar object in a scene with keypoint matching and a RANSAC homography")]
#[command(version)]
struct Cli {
    /// Image of the object to locate
    object: PathBuf,

    /// Image of the scene containing the object
    scene: PathBuf,

    /// TOML pipeline configuration
    #[arg(long)]
    config: Option<PathBuf>,

    /// Directory receiving the rendered views
    #[arg(long, default_value = "planar-views")]
    output_dir: PathBuf,

    /// Seed of the display subsampling (overrides the configuration)
    #[arg(long)]
    seed: Option<u64>,

    /// Write a JSON run summary to this file
    #[arg(long)]
    report: Option<PathBuf>,

    /// Log filter, e.g. `debug` or `planar_homography=trace`
    #[arg(long)]
    log_level: Option<String>,

    /// Show the views in windows instead of writing PNG files
    #[cfg(feature = "display-window")]
    #[arg(long)]
    window: bool,
}

fn resolve_log_level(cli: &Cli) -> String {
    if let Some(level) = &cli.log_level {
        return level.clone();
    }
    if let Ok(level) = std::env::var("RUST_LOG") {
        if !level.trim().is_empty() {
            return level;
        }
    }
    "info".to_string()
}

fn init_logger(level: &str) {
    let mut builder = env_logger::Builder::new();
    builder.target(env_logger::Target::Stderr);
    builder.filter_level(log::LevelFilter::Info);
    builder.parse_filters(level);
    builder.format(|buf, record| {
        use std::io::Write;
        let module = record.module_path().unwrap_or(record.target());
        writeln!(
            buf,
            "{} [{}] {}: {}",
            buf.timestamp_millis(),
            record.level(),
            module,
            record.args()
        )
    });

    if let Err(err) = builder.try_init() {
        eprintln!("Failed to initialize logger: {}", err);
    }
}

fn load_config(cli: &Cli) -> Result<PipelineConfig> {
    let mut config = match &cli.config {
        Some(path) => PipelineConfig::load_toml(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => PipelineConfig::default(),
    };
    if let Some(seed) = cli.seed {
        config.display.seed = seed;
    }
    Ok(config)
}

fn view_sink(cli: &Cli, config: &PipelineConfig) -> Box<dyn ViewSink> {
    #[cfg(feature = "display-window")]
    if cli.window {
        return Box::new(planar_cli::display::WindowSink::from_config(&config.display));
    }
    let _ = config;
    Box::new(PngSink::new(&cli.output_dir))
}

fn run(cli: &Cli, object: &LoadedImage, scene: &LoadedImage) -> Result<()> {
    let config = load_config(cli)?;
    info!("{}", config.summary());

    let pipeline = PlanarPipeline::new(config.clone()).context("building pipeline")?;
    let stage = pipeline
        .match_features(&object.gray, &scene.gray)
        .context("matching features")?;
    print!("{}", format_distance_stats(&stage.stats));

    let localization = pipeline.localize(&stage).context("locating object")?;
    print!("{}", format_localization(&localization));
    println!();

    let output = pipeline
        .finish(stage, localization)
        .context("sampling matches for display")?;

    if let Some(path) = &cli.report {
        let summary = RunSummary::new(&output, config.display.seed);
        std::fs::write(path, summary.to_json()?)
            .with_context(|| format!("writing report {}", path.display()))?;
        info!("wrote report {}", path.display());
    }

    let views = compose_views(object, scene, &output, config.display.seed)?;
    view_sink(cli, &config).show(&views)?;
    Ok(())
}

fn main() -> ExitCode {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) if matches!(e.kind(), ErrorKind::DisplayHelp | ErrorKind::DisplayVersion) => {
            let _ = e.print();
            return ExitCode::SUCCESS;
        }
        Err(e) => {
            println!(" Usage: planar-match <img1> <img2>");
            eprintln!("{e}");
            return ExitCode::from(FAILURE);
        }
    };
    init_logger(&resolve_log_level(&cli));

    let images = load_image(&cli.object).and_then(|o| Ok((o, load_image(&cli.scene)?)));
    let (object, scene) = match images {
        Ok(pair) => pair,
        Err(e) => {
            println!(" --(!) Error reading images ");
            error!("{e}");
            return ExitCode::from(FAILURE);
        }
    };

    match run(&cli, &object, &scene) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{e:#}");
            ExitCode::from(FAILURE)
        }
    }
}
