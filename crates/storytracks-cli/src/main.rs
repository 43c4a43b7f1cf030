use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use storytracks_core::{
    markers_for_zoom, ClusterSource, FileClusterSource, HttpClusterSource, IngestOptions, Settings,
};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "storytracks",
    version,
    about = "Geotag travel photos and size their map clusters"
)]
struct Cli {
    /// Settings file (TOML)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Read EXIF from photos and print their image records as JSON
    Scan {
        /// Photos, in upload order
        #[arg(required = true)]
        files: Vec<PathBuf>,

        /// Pretty-print the JSON output
        #[arg(long)]
        pretty: bool,
    },
    /// Fetch clusters for a zoom level and print sized markers as JSON
    Markers {
        /// Current map zoom
        #[arg(short, long)]
        zoom: f64,

        /// Read clusters from a saved endpoint response instead of the backend
        #[arg(short, long, conflicts_with = "endpoint")]
        input: Option<PathBuf>,

        /// Cluster endpoint URL (overrides the settings file)
        #[arg(long)]
        endpoint: Option<String>,

        /// Pretty-print the JSON output
        #[arg(long)]
        pretty: bool,
    },
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let settings = match &cli.config {
        Some(path) => Settings::load(path)?,
        None => Settings::default(),
    };

    match cli.command {
        Command::Scan { files, pretty } => scan(files, pretty),
        Command::Markers {
            zoom,
            input,
            endpoint,
            pretty,
        } => markers(&settings, zoom, input, endpoint, pretty),
    }
}

fn scan(files: Vec<PathBuf>, pretty: bool) -> anyhow::Result<()> {
    let t_total = std::time::Instant::now();
    let bar = ProgressBar::new(files.len() as u64);
    bar.set_style(
        ProgressStyle::default_bar()
            .template("[{elapsed_precise}] {bar:40.cyan/blue} {pos}/{len} {msg}")
            .context("progress template")?,
    );

    let options = IngestOptions { files };
    let result = storytracks_core::ingest(&options, &|_stage, current, _total, message| {
        bar.set_position(current + 1);
        bar.set_message(message.to_string());
    });
    bar.finish_and_clear();

    for record in result.needs_review() {
        warn!(filename = %record.filename, "no usable GPS/date in EXIF, set the location manually");
    }

    let json = if pretty {
        serde_json::to_string_pretty(&result)?
    } else {
        serde_json::to_string(&result)?
    };
    println!("{json}");

    eprintln!(
        "Done! {} images, {} need review, {} rejected ({:.2}s)",
        result.records.len(),
        result.needs_review().count(),
        result.rejected.len(),
        t_total.elapsed().as_secs_f64()
    );

    Ok(())
}

fn markers(
    settings: &Settings,
    zoom: f64,
    input: Option<PathBuf>,
    endpoint: Option<String>,
    pretty: bool,
) -> anyhow::Result<()> {
    let endpoint = endpoint.or_else(|| settings.clusters.endpoint.clone());
    let source: Box<dyn ClusterSource> = match (input, endpoint) {
        (Some(path), _) => Box::new(FileClusterSource::new(path)),
        (None, Some(url)) => Box::new(
            HttpClusterSource::new(url, settings.clusters.timeout())
                .context("build HTTP client")?,
        ),
        (None, None) => {
            anyhow::bail!("no cluster source: pass --input, --endpoint or set clusters.endpoint")
        }
    };

    let markers = markers_for_zoom(source.as_ref(), zoom, &settings.markers);
    info!(zoom, markers = markers.len(), "markers rendered");

    let json = if pretty {
        serde_json::to_string_pretty(&markers)?
    } else {
        serde_json::to_string(&markers)?
    };
    println!("{json}");

    Ok(())
}
