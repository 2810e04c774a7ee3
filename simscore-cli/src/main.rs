use clap::Parser;
use simscore::io::{list_candidates, load_gray_image};
use simscore::{
    BatchConfig, BatchCoordinator, BatchEvent, CropRect, MetricRegistry, ResultSink, RunSummary,
};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

const SCHEMA_JSON: &str = include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/config.schema.json"));
const EXAMPLE_JSON: &str =
    include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/config.example.json"));

#[derive(Parser, Debug)]
#[command(author, version, about = "SimScore CLI (JSON config driven)")]
struct Cli {
    /// Path to the JSON configuration file.
    #[arg(short, long, value_name = "FILE", default_value = "config.json")]
    config: PathBuf,
    /// Print the JSON schema and exit.
    #[arg(long)]
    print_schema: bool,
    /// Print an example config and exit.
    #[arg(long)]
    print_example: bool,
    /// Print the registered metric names and exit.
    #[arg(long)]
    list_metrics: bool,
    /// Enable tracing output for performance profiling.
    #[arg(long)]
    trace: bool,
}

#[derive(Debug, Deserialize)]
struct CropJson {
    x: usize,
    y: usize,
    width: usize,
    height: usize,
}

impl From<CropJson> for CropRect {
    fn from(value: CropJson) -> Self {
        CropRect::new(value.x, value.y, value.width, value.height)
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
struct Config {
    reference_path: String,
    candidate_dir: Option<String>,
    candidates: Vec<String>,
    output_dir: String,
    metrics: Vec<String>,
    workers: usize,
    crop: Option<CropJson>,
    summary_path: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            reference_path: String::new(),
            candidate_dir: None,
            candidates: Vec::new(),
            output_dir: "results".to_owned(),
            metrics: Vec::new(),
            workers: 0,
            crop: None,
            summary_path: None,
        }
    }
}

#[derive(Debug, Serialize)]
struct SummaryRecord {
    output_dir: String,
    metrics: Vec<String>,
    total_files: usize,
    expected_results: usize,
    received: usize,
    saved: usize,
    dropped: usize,
    skipped: usize,
    outstanding: usize,
    errors: usize,
    cancelled: bool,
    glcm_computations: usize,
}

impl SummaryRecord {
    fn new(output_dir: String, metrics: Vec<String>, summary: RunSummary) -> Self {
        Self {
            output_dir,
            metrics,
            total_files: summary.total_files,
            expected_results: summary.expected_results,
            received: summary.received,
            saved: summary.saved,
            dropped: summary.dropped,
            skipped: summary.skipped,
            outstanding: summary.outstanding,
            errors: summary.errors,
            cancelled: summary.cancelled,
            glcm_computations: summary.glcm_computations,
        }
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    if cli.trace {
        tracing_subscriber::fmt()
            .with_env_filter(EnvFilter::from_default_env().add_directive("simscore=info".parse()?))
            .with_target(false)
            .init();
    }

    if cli.print_schema {
        println!("{SCHEMA_JSON}");
        return Ok(());
    }
    if cli.print_example {
        println!("{EXAMPLE_JSON}");
        return Ok(());
    }

    let registry = MetricRegistry::with_builtin();
    if cli.list_metrics {
        for name in registry.names() {
            println!("{name}");
        }
        return Ok(());
    }

    let config_text = fs::read_to_string(&cli.config)?;
    let config: Config = serde_json::from_str(&config_text)?;
    if config.reference_path.is_empty() {
        return Err("reference_path must be set in the config".into());
    }

    let mut files: Vec<PathBuf> = config.candidates.iter().map(PathBuf::from).collect();
    if let Some(dir) = &config.candidate_dir {
        files.extend(list_candidates(dir)?);
    }
    if files.is_empty() {
        eprintln!("no candidate images found");
    }

    let metrics = if config.metrics.is_empty() {
        registry.names().into_iter().map(str::to_owned).collect()
    } else {
        config.metrics
    };

    let reference = load_gray_image(&config.reference_path)?.view().to_f32();
    let sink = Arc::new(ResultSink::new(&config.output_dir));
    let batch_cfg = BatchConfig {
        workers: config.workers,
        crop: config.crop.map(CropRect::from),
    };
    let (coordinator, events) = BatchCoordinator::new(Arc::new(registry), sink, batch_cfg)?;

    tracing::info!(files = files.len(), metrics = metrics.len(), "starting batch");
    let handle = coordinator.start(reference.view(), files, metrics.as_slice())?;

    for event in events.iter() {
        match event {
            BatchEvent::Progress { completed, total } => {
                eprintln!("[{completed}/{total}]");
            }
            BatchEvent::Error { file, message } if file.is_empty() => {
                eprintln!("error: {message}");
            }
            BatchEvent::Error { file, message } => {
                eprintln!("error: {file}: {message}");
            }
            BatchEvent::Completed(_) => break,
            BatchEvent::Result(_) | BatchEvent::Skipped { .. } => {}
        }
    }

    let summary = handle.wait();
    let record = SummaryRecord::new(config.output_dir, metrics, summary);
    let json = serde_json::to_string_pretty(&record)?;

    match config.summary_path {
        Some(path) => fs::write(path, json)?,
        None => println!("{json}"),
    }

    Ok(())
}
