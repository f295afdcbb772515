use anyhow::{Context, Result};
use clap::Parser;
use rate_report::continent::CountryTable;
use rate_report::{ReportConfig, ReportContext, Variant};
use std::io::{self, Write};
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "rate-report")]
#[command(about = "Aggregate suicide-rate CSV data and render a chart catalog", long_about = None)]
struct Args {
    /// TOML configuration file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Pipeline variant (overrides the config file)
    #[arg(long, value_enum)]
    variant: Option<Variant>,

    /// Input CSV file; repeat to concatenate several files
    #[arg(long = "data")]
    data: Vec<PathBuf>,

    /// Output directory for charts and catalog.json
    #[arg(long)]
    output: Option<PathBuf>,

    /// Row cap before rendering (0 disables it)
    #[arg(long)]
    max_rows: Option<usize>,

    /// Seed for downsampling
    #[arg(long)]
    seed: Option<u64>,
}

fn init_logging() {
    let filter = EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy();
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

fn main() -> Result<()> {
    init_logging();
    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => ReportConfig::from_file(path)
            .with_context(|| format!("Failed to load config {}", path.display()))?,
        None => ReportConfig::default(),
    };
    if let Some(variant) = args.variant {
        config.variant = variant;
    }
    if !args.data.is_empty() {
        config.data = args.data;
    }
    if args.output.is_some() {
        config.output_dir = args.output;
    }
    if args.max_rows.is_some() {
        config.max_rows = args.max_rows;
    }
    if let Some(seed) = args.seed {
        config.seed = seed;
    }

    let lookup = CountryTable::builtin();
    let context = ReportContext::load(&config, &lookup).context("Failed to load dataset")?;
    let catalog = context.build_catalog();

    match config.output_dir() {
        Some(dir) => {
            std::fs::create_dir_all(&dir)
                .with_context(|| format!("Failed to create {}", dir.display()))?;
            let manifest = dir.join("catalog.json");
            catalog
                .write_manifest(&manifest)
                .context("Failed to write catalog")?;
            info!(path = %manifest.display(), "wrote catalog");
        }
        None => {
            let json = catalog.to_json().context("Failed to serialize catalog")?;
            let stdout = io::stdout();
            let mut handle = stdout.lock();
            handle
                .write_all(json.as_bytes())
                .context("Failed to write catalog to stdout")?;
            handle.flush().context("Failed to flush stdout")?;
        }
    }

    Ok(())
}
