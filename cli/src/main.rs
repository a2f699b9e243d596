//! Graphcat CLI: command-line tools for a local graph catalog
//!
//! Opens the catalog's RocksDB directory directly; `serve` starts the HTTP API
//! over it.

use clap::{Parser, Subcommand};
use comfy_table::{ContentArrangement, Table};
use graphcat::catalog::{CatalogQuery, CatalogStore, FilterSpec, GraphRecord, Metric, Page};
use graphcat::export::{ArchiveExporter, FILTERED_ARCHIVE_NAME, SAMPLE_ARCHIVE_NAME};
use graphcat::ingest::{import_csv_file, refresh_payloads, IngestOptions};
use graphcat::sampling::{sample_catalog, SamplingMethod};
use graphcat::{HttpServer, ServerConfig};
use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "graphcat", version, about = "Graphcat graph catalog CLI")]
struct Cli {
    /// Catalog data directory
    #[arg(long, global = true, env = "GRAPHCAT_DATA")]
    data: Option<PathBuf>,

    /// Output format
    #[arg(long, default_value = "table", global = true)]
    format: OutputFormat,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, clap::ValueEnum)]
enum OutputFormat {
    Table,
    Json,
    Csv,
}

#[derive(Subcommand)]
enum Commands {
    /// Import graph metrics from a CSV file
    Import {
        /// Metrics CSV
        csv: PathBuf,

        /// Directory holding the graph files named in the CSV
        #[arg(long)]
        graphs_dir: Option<PathBuf>,

        /// Skip rows whose graph file is missing
        #[arg(long)]
        require_payload: bool,
    },
    /// Re-read every graph file and reset images
    RefreshPayloads {
        /// Directory holding the graph files
        graphs_dir: PathBuf,
    },
    /// List cataloged graphs
    List {
        #[arg(long, default_value_t = 1)]
        page: usize,

        #[arg(long, default_value_t = 10)]
        limit: usize,
    },
    /// List graphs matching a filter document
    Filter {
        /// Filter JSON, or @path to a JSON file
        #[arg(long, default_value = "{}")]
        filters: String,

        #[arg(long, default_value_t = 1)]
        page: usize,

        #[arg(long, default_value_t = 10)]
        limit: usize,
    },
    /// Write the graph files matching a filter to a zip
    Export {
        #[arg(long, default_value = "{}")]
        filters: String,

        #[arg(long, default_value = FILTERED_ARCHIVE_NAME)]
        out: PathBuf,
    },
    /// Sample graphs matching a filter and write them to a zip
    Sample {
        #[arg(long, default_value_t = 100)]
        size: i64,

        /// random, representative or cluster
        #[arg(long, default_value = "random")]
        method: SamplingMethod,

        #[arg(long, default_value = "{}")]
        filters: String,

        /// Seed for a reproducible sample
        #[arg(long)]
        seed: Option<u64>,

        #[arg(long, default_value = SAMPLE_ARCHIVE_NAME)]
        out: PathBuf,
    },
    /// Start the HTTP API
    Serve {
        /// YAML configuration file
        #[arg(long)]
        config: Option<PathBuf>,

        #[arg(long, env = "PORT")]
        port: Option<u16>,
    },
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Import {
            csv,
            graphs_dir,
            require_payload,
        } => run_import(cli.data.as_deref(), &csv, graphs_dir, require_payload),
        Commands::RefreshPayloads { graphs_dir } => run_refresh(cli.data.as_deref(), &graphs_dir),
        Commands::List { page, limit } => open_store(cli.data.as_deref())
            .map(|store| store.page(&CatalogQuery::all(), page, limit))
            .and_then(|page| print_page(&page, &cli.format)),
        Commands::Filter { filters, page, limit } => run_filter(cli.data.as_deref(), &filters, page, limit, &cli.format),
        Commands::Export { filters, out } => run_export(cli.data.as_deref(), &filters, &out),
        Commands::Sample {
            size,
            method,
            filters,
            seed,
            out,
        } => run_sample(cli.data.as_deref(), size, method, &filters, seed, &out),
        Commands::Serve { config, port } => run_serve(cli.data.as_deref(), config.as_deref(), port).await,
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn open_store(data: Option<&Path>) -> Result<CatalogStore, Box<dyn std::error::Error>> {
    let data = data.ok_or("no catalog directory: pass --data or set GRAPHCAT_DATA")?;
    Ok(CatalogStore::open(data)?)
}

/// Inline JSON, or `@path` to read it from a file
fn parse_filters(text: &str) -> Result<FilterSpec, Box<dyn std::error::Error>> {
    let json = match text.strip_prefix('@') {
        Some(path) => std::fs::read_to_string(path)?,
        None => text.to_string(),
    };
    Ok(serde_json::from_str(&json)?)
}

fn run_import(
    data: Option<&Path>,
    csv: &Path,
    graphs_dir: Option<PathBuf>,
    require_payload: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut store = open_store(data)?;
    let options = IngestOptions {
        data_dir: graphs_dir,
        require_payload,
    };
    let report = import_csv_file(&mut store, csv, &options)?;
    store.flush()?;

    println!(
        "Imported {} graphs ({} skipped, {} failed); catalog now holds {}",
        report.imported,
        report.skipped,
        report.failed,
        store.len()
    );
    Ok(())
}

fn run_refresh(data: Option<&Path>, graphs_dir: &Path) -> Result<(), Box<dyn std::error::Error>> {
    let mut store = open_store(data)?;
    let report = refresh_payloads(&mut store, graphs_dir)?;
    store.flush()?;
    println!("Refreshed {} graphs ({} without a graph file)", report.updated, report.missing);
    Ok(())
}

fn run_filter(
    data: Option<&Path>,
    filters: &str,
    page: usize,
    limit: usize,
    format: &OutputFormat,
) -> Result<(), Box<dyn std::error::Error>> {
    let query = parse_filters(filters)?.compile()?;
    let store = open_store(data)?;
    print_page(&store.page(&query, page, limit), format)
}

fn run_export(data: Option<&Path>, filters: &str, out: &Path) -> Result<(), Box<dyn std::error::Error>> {
    let query = parse_filters(filters)?.compile()?;
    let store = open_store(data)?;
    let records = store.find(&query);

    let summary = ArchiveExporter::new().write(&records, File::create(out)?)?;
    println!(
        "Wrote {} graph files to {} ({} matches had no file)",
        summary.written,
        out.display(),
        summary.skipped
    );
    Ok(())
}

fn run_sample(
    data: Option<&Path>,
    size: i64,
    method: SamplingMethod,
    filters: &str,
    seed: Option<u64>,
    out: &Path,
) -> Result<(), Box<dyn std::error::Error>> {
    let filters = parse_filters(filters)?;
    let store = open_store(data)?;
    let config = ServerConfig::load(None)?;

    let sample = sample_catalog(&store, &filters, size, method, seed, &config.sampling)?;
    let summary = ArchiveExporter::new().write(&sample.records, File::create(out)?)?;

    let strategy = sample.strategy.map(|s| s.to_string()).unwrap_or_else(|| "none".to_string());
    println!(
        "Sampled {} graphs (strategy: {}), wrote {} files to {}",
        sample.len(),
        strategy,
        summary.written,
        out.display()
    );
    Ok(())
}

async fn run_serve(
    data: Option<&Path>,
    config_path: Option<&Path>,
    port: Option<u16>,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut config = ServerConfig::load(config_path)?;
    if let Some(port) = port {
        config.port = port;
    }
    if let Some(data) = data {
        config.data_path = Some(data.display().to_string());
    }

    let store = match &config.data_path {
        Some(path) => CatalogStore::open(path)?,
        None => CatalogStore::new(),
    };
    let store = Arc::new(RwLock::new(store));

    HttpServer::new(Arc::clone(&store), config).start().await?;
    store.read().await.flush()?;
    Ok(())
}

fn header() -> Vec<String> {
    let mut columns = vec!["ID".to_string(), "Filename".to_string()];
    columns.extend(Metric::ALL.iter().map(|m| m.csv_header().to_string()));
    columns.push("Is Planar".to_string());
    columns
}

fn row(record: &GraphRecord) -> Vec<String> {
    let mut cells = vec![record.id.as_u64().to_string(), record.file_name.clone()];
    cells.extend(Metric::ALL.iter().map(|m| record.metric(*m).to_string()));
    cells.push(record.is_planar.to_string());
    cells
}

fn print_page(page: &Page, format: &OutputFormat) -> Result<(), Box<dyn std::error::Error>> {
    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(page)?);
        }
        OutputFormat::Csv => {
            println!("{}", header().join(","));
            for record in &page.graphs {
                let cells: Vec<String> = row(record).iter().map(|c| format_csv_value(c)).collect();
                println!("{}", cells.join(","));
            }
        }
        OutputFormat::Table => {
            if page.graphs.is_empty() {
                println!("(no graphs)");
                return Ok(());
            }

            let mut table = Table::new();
            table.set_content_arrangement(ContentArrangement::Dynamic);
            table.set_header(header());
            for record in &page.graphs {
                table.add_row(row(record));
            }

            println!("{}", table);
            println!(
                "page {} of {} ({} graph(s))",
                page.current_page, page.total_pages, page.total_records
            );
        }
    }

    Ok(())
}

fn format_csv_value(s: &str) -> String {
    if s.contains(',') || s.contains('"') || s.contains('\n') {
        format!("\"{}\"", s.replace('"', "\"\""))
    } else {
        s.to_string()
    }
}
