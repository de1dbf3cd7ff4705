//! CLI entry point for the mobility choropleth dashboard.
//!
//! Loads a country boundary, averages regional mobility data over time, and
//! renders the result as a choropleth SVG. Every flag has a default, so a bare
//! invocation reproduces the standard Indonesia workplace-mobility figure.

use anyhow::Result;
use clap::Parser;
use mobility_choropleth::config::{self, PipelineConfig};
use mobility_choropleth::fetch::BasicClient;
use mobility_choropleth::pipeline::{self, StageOutcome};
use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use tracing::info;
use tracing_subscriber::{
    EnvFilter, Layer,
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};

#[derive(Parser)]
#[command(name = "mobility_choropleth")]
#[command(about = "Render a regional mobility choropleth for one country", long_about = None)]
struct Cli {
    /// Country boundary dataset (.shp or .geojson)
    #[arg(long, default_value = config::DEFAULT_BOUNDARY_PATH)]
    boundary: PathBuf,

    /// Country to keep from the boundary dataset
    #[arg(long, default_value = config::DEFAULT_COUNTRY)]
    country: String,

    /// Boundary attribute holding the country name
    #[arg(long, default_value = config::DEFAULT_NAME_FIELD)]
    name_field: String,

    /// Mobility CSV path or URL; repeat for each reporting year
    #[arg(short, long = "source", value_name = "FILE_OR_URL")]
    sources: Vec<String>,

    /// Mobility column holding the region name
    #[arg(long, default_value = config::DEFAULT_REGION_COLUMN)]
    region_column: String,

    /// Metric column to average and plot
    #[arg(short, long, default_value = config::DEFAULT_METRIC)]
    metric: String,

    /// SVG file to write the figure to
    #[arg(short, long, default_value = config::DEFAULT_OUTPUT)]
    output: PathBuf,

    /// Figure title
    #[arg(long, default_value = config::DEFAULT_TITLE)]
    title: String,

    /// Legend label
    #[arg(long, default_value = config::DEFAULT_LEGEND_LABEL)]
    legend_label: String,
}

impl Cli {
    fn into_config(self) -> PipelineConfig {
        let mut config = PipelineConfig {
            boundary_path: self.boundary,
            name_field: self.name_field,
            country: self.country,
            region_column: self.region_column,
            metric: self.metric,
            ..PipelineConfig::default()
        };
        if !self.sources.is_empty() {
            config.sources = self.sources;
        }
        config.render.output = self.output;
        config.render.title = self.title;
        config.render.legend_label = self.legend_label;
        config
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok(); // Load .env file

    // Logging setup: colored stderr + JSON rolling log file
    let log_file_path = std::env::var("LOG_FILE_PATH")
        .unwrap_or_else(|_| "logs/mobility_choropleth.log".to_string());
    let log_dir = Path::new(&log_file_path)
        .parent()
        .unwrap_or(Path::new("logs"));
    let log_file_name = Path::new(&log_file_path)
        .file_name()
        .unwrap_or(OsStr::new("mobility_choropleth.log"));

    let file_appender = tracing_appender::rolling::daily(log_dir, log_file_name);
    let (non_blocking_file, _file_guard) = tracing_appender::non_blocking(file_appender);

    let stderr_layer = fmt::layer()
        .with_target(true)
        .with_span_events(FmtSpan::CLOSE)
        .with_ansi(true)
        .with_writer(std::io::stderr)
        .with_filter(EnvFilter::from_env("RUST_LOG").add_directive("info".parse()?));

    let json_layer = fmt::layer()
        .json()
        .with_current_span(true)
        .with_span_list(true)
        .with_writer(non_blocking_file)
        .with_filter(EnvFilter::from_env("RUST_LOG_JSON").add_directive("debug".parse()?));

    tracing_subscriber::registry()
        .with(stderr_layer)
        .with(json_layer)
        .init();

    let config = Cli::parse().into_config();
    let client = BasicClient::new();

    let report = pipeline::run(&client, &config).await;

    for stage in &report.stages {
        let status = match stage.outcome {
            StageOutcome::Completed(_) => "ok",
            StageOutcome::Skipped(_) => "skipped",
            StageOutcome::Failed(_) => "failed",
        };
        info!(stage = %stage.stage, status, detail = stage.outcome.detail(), "Summary");
    }
    match &report.figure {
        Some(path) => info!(figure = %path.display(), "Dashboard rendered"),
        None => info!("No figure was rendered"),
    }

    Ok(())
}
